use crate::client::HttpClient;
use crate::config::GatewayConfig;
use crate::metrics::Metrics;
use crate::processor::RequestProcessor;
use crate::routing::Registry;
use anyhow::Result;
use std::sync::Arc;

/// Shared gateway state, cheaply cloneable.
///
/// Everything in here is built once at startup and never mutated, so the
/// request path reads it without locking.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<GatewayConfig>,
    pub metrics: Metrics,
    pub processor: RequestProcessor,
}

impl GatewayState {
    pub fn new(config: GatewayConfig, metrics: Metrics, client: Arc<dyn HttpClient>) -> Result<Self> {
        let registry = Registry::from_config(&config, client)?;
        let processor =
            RequestProcessor::new(Arc::new(registry)).with_max_body_bytes(config.server.max_body_bytes);
        Ok(Self {
            config: Arc::new(config),
            metrics,
            processor,
        })
    }

    pub fn registry(&self) -> &Registry {
        self.processor.registry()
    }
}
