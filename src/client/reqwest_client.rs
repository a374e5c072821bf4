use crate::client::{is_supported, HttpClient, UpstreamResponse};
use crate::config::UpstreamClientConfig;
use crate::error::{GatewayError, Result};
use crate::message::headers::remove_hop_headers;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_LENGTH;
use http::{HeaderMap, Method};
use reqwest::redirect::Policy;

/// Pooled HTTP/1.1 client. One instance is shared by every proxy handler.
///
/// Redirects are followed up to `max_redirects`. Bodies pass through
/// verbatim: no automatic decompression is enabled.
#[derive(Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new(cfg: &UpstreamClientConfig) -> Result<Self> {
        let config_err = |e: anyhow::Error| GatewayError::Config(e.to_string());
        let policy = if cfg.max_redirects == 0 {
            Policy::none()
        } else {
            Policy::limited(cfg.max_redirects)
        };

        let client = reqwest::Client::builder()
            .timeout(cfg.timeout().map_err(config_err)?)
            .connect_timeout(cfg.connect_timeout().map_err(config_err)?)
            .pool_idle_timeout(cfg.pool_idle_timeout().map_err(config_err)?)
            .pool_max_idle_per_host(cfg.pool_max_idle_per_host)
            .redirect(policy)
            .build()
            .map_err(|e| GatewayError::Config(format!("build upstream client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn request(
        &self,
        method: &Method,
        url: &str,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<UpstreamResponse> {
        if !is_supported(method) {
            return Err(GatewayError::UnsupportedMethod(method.to_string()));
        }

        let mut outbound = headers.clone();
        remove_hop_headers(&mut outbound);
        // Recomputed from the buffered body.
        outbound.remove(CONTENT_LENGTH);

        let mut builder = self
            .client
            .request(method.clone(), url)
            .headers(outbound);
        if *method == Method::POST || !body.is_empty() {
            builder = builder.body(body);
        }

        let resp = builder.send().await.map_err(GatewayError::from_transport)?;
        let status = resp.status();
        let mut headers = resp.headers().clone();
        remove_hop_headers(&mut headers);
        let body = resp.bytes().await.map_err(GatewayError::from_transport)?;

        tracing::debug!(
            "client: upstream responded, method={}, url={}, status={}, bytes={}",
            method,
            url,
            status.as_u16(),
            body.len()
        );

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}
