use crate::client::ReqwestHttpClient;
use crate::config::GatewayConfig;
use crate::metrics::Metrics;
use crate::server;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// CLI arguments forwarded from `main()`. `None` keeps the file value.
pub struct BootstrapArgs {
    pub config_path: PathBuf,
    pub listen: Option<String>,
    pub admin_listen: Option<String>,
    pub workers: Option<usize>,
}

/// Load the config file and layer the CLI overrides on top.
pub fn load_config(args: &BootstrapArgs) -> Result<GatewayConfig> {
    let mut config = GatewayConfig::load(&args.config_path)
        .with_context(|| format!("loading {}", args.config_path.display()))?;

    if let Some(ref listen) = args.listen {
        config.server.listen = listen.clone();
    }
    if let Some(ref admin) = args.admin_listen {
        config.server.admin_listen = admin.clone();
    }
    if args.workers.is_some() {
        config.server.workers = args.workers;
    }
    config.validate()?;
    Ok(config)
}

/// Gateway lifecycle: build → serve → shutdown.
pub async fn run(config: GatewayConfig) -> Result<()> {
    let metrics = Metrics::install()?;
    let client = ReqwestHttpClient::new(&config.upstream)
        .context("building upstream client")?;
    let state = server::GatewayState::new(config, metrics, Arc::new(client))?;

    let shutdown = Arc::new(Notify::new());
    start_admin_server(&state);

    let listen = state.config.server.listen.clone();
    tracing::info!(
        "server: starting gateway, listen={}, rules={}",
        listen,
        state.registry().len()
    );

    let mut proxy_handle = tokio::spawn({
        let state = state.clone();
        let shutdown = shutdown.clone();
        async move { server::run_proxy_server(&listen, state, shutdown).await }
    });

    // A listener that fails to bind ends the process instead of waiting for
    // a signal.
    let finished = tokio::select! {
        _ = wait_for_shutdown(&shutdown) => None,
        res = &mut proxy_handle => Some(res),
    };
    let result = match finished {
        Some(res) => res,
        None => proxy_handle.await,
    };

    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(e),
        Err(e) => tracing::error!("server: gateway task error: {}", e),
    }

    tracing::info!("server: shutdown complete");
    Ok(())
}

pub fn init_tracing() {
    let (non_blocking, _guard) = tracing_appender::non_blocking::NonBlockingBuilder::default()
        .buffered_lines_limit(128_000)
        .lossy(true)
        .finish(std::io::stdout());

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false)
                .json(),
        )
        .init();

    std::mem::forget(_guard);
}

fn start_admin_server(state: &server::GatewayState) {
    let admin_addr = state.config.server.admin_listen.clone();
    if admin_addr.is_empty() {
        tracing::info!("server: admin listener disabled");
        return;
    }
    let s = state.clone();
    tokio::spawn(async move {
        if let Err(e) = server::run_admin_server(&admin_addr, s).await {
            tracing::error!("server: admin failed, error={}", e);
        }
    });
}

async fn wait_for_shutdown(shutdown: &Arc<Notify>) {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("server: SIGTERM handler unavailable, error={}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("server: received SIGINT, shutting down"),
        _ = terminate => tracing::info!("server: received SIGTERM, shutting down"),
    }

    shutdown.notify_waiters();
}
