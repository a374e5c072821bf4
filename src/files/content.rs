use crate::error::Result;
use crate::message::{Request, Response};
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use std::sync::Arc;

/// Read contract shared by static files and cache entries.
///
/// Implementations load lazily and memoize, so repeated calls are cheap.
#[async_trait]
pub trait ResponseContent: Send + Sync {
    async fn exists(&self) -> bool;

    async fn content(&self) -> Result<Bytes>;

    async fn headers(&self) -> HeaderMap;

    async fn http_code(&self) -> StatusCode;

    async fn to_response(&self, request: Arc<Request>) -> Result<Response> {
        let body = self.content().await?;
        let status = self.http_code().await;
        let headers = self.headers().await;
        Ok(Response::new(status, headers, body).with_request(request))
    }
}
