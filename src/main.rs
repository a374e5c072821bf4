#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tent_gateway::server;
use tent_gateway::server::bootstrap::BootstrapArgs;

#[derive(Parser)]
#[command(name = "tent-gateway", about = "Rule-based HTTP gateway with an on-disk response cache")]
struct Cli {
    /// Path to gateway config file (.toml or .json)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Listen address, overrides server.listen
    #[arg(short, long)]
    listen: Option<String>,

    /// Admin listen address, overrides server.admin_listen ("" disables)
    #[arg(long)]
    admin_listen: Option<String>,

    /// Tokio worker threads, overrides server.workers / TENT_WORKERS
    #[arg(long)]
    workers: Option<usize>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    server::bootstrap::init_tracing();

    let config = server::bootstrap::load_config(&BootstrapArgs {
        config_path: cli.config,
        listen: cli.listen,
        admin_listen: cli.admin_listen,
        workers: cli.workers,
    })?;

    let worker_threads = server::runtime::worker_threads(config.server.workers);
    tracing::info!("server: runtime starting, workers={}", worker_threads);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .build()?;

    rt.block_on(server::bootstrap::run(config))
}
