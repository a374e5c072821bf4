//! Outbound HTTP used by the proxy handler.

mod reqwest_client;

pub use reqwest_client::ReqwestHttpClient;

use crate::error::Result;
use crate::message::headers;
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};

/// The outbound client forwards GET and POST. Anything else is
/// [`GatewayError::UnsupportedMethod`](crate::error::GatewayError::UnsupportedMethod).
pub fn is_supported(method: &Method) -> bool {
    *method == Method::GET || *method == Method::POST
}

/// What came back from the upstream, after redirects.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn header_lines(&self) -> Vec<String> {
        headers::to_lines(&self.headers)
    }
}

/// Transport seam between the proxy handler and the network.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn request(
        &self,
        method: &Method,
        url: &str,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<UpstreamResponse>;
}
