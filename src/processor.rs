use crate::message::body::{full_body, into_hyper, BoxBody};
use crate::message::{ProcessingRequest, Request};
use crate::routing::Registry;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::{BodyExt, Limited};
use std::sync::Arc;
use std::time::Instant;

/// Entry point for every inbound request: select the first matching rule and
/// run its handler pipeline.
#[derive(Clone)]
pub struct RequestProcessor {
    registry: Arc<Registry>,
    max_body_bytes: Option<u64>,
}

impl RequestProcessor {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            max_body_bytes: None,
        }
    }

    pub fn with_max_body_bytes(mut self, limit: Option<u64>) -> Self {
        self.max_body_bytes = limit;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub async fn process(&self, request: Request) -> crate::message::Response {
        let start = Instant::now();
        let request = Arc::new(request);
        let rule = self.registry.find(&request);

        let handled = rule
            .handler()
            .handle(ProcessingRequest::new(request.clone()))
            .await;
        let response = handled.response;

        let elapsed = start.elapsed();
        let mut buf = itoa::Buffer::new();
        let status_str = buf.format(response.status().as_u16());

        metrics::counter!(
            "tent_http_requests_total",
            "rule" => rule.label().to_string(),
            "method" => request.method().as_str().to_string(),
            "status_code" => status_str.to_owned(),
        )
        .increment(1);
        metrics::histogram!(
            "tent_http_request_duration_seconds",
            "rule" => rule.label().to_string(),
        )
        .record(elapsed.as_secs_f64());

        tracing::info!(
            target: "access",
            method = %request.method(),
            path = request.path(),
            query = request.query(),
            status = response.status().as_u16(),
            rule = rule.label(),
            handler = rule.handler().kind_name(),
            answered_by = handled.answered_by.unwrap_or("handler"),
            bytes = response.body().len(),
            latency_ms = elapsed.as_secs_f64() * 1000.0,
            "access"
        );

        response
    }

    /// Adapter for the hyper server: buffer the body, process, convert back.
    pub async fn serve<B>(&self, req: hyper::Request<B>) -> hyper::Response<BoxBody>
    where
        B: hyper::body::Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (parts, body) = req.into_parts();

        if let Some(limit) = self.max_body_bytes {
            let declared = parts
                .headers
                .get(CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            if declared.is_some_and(|len| len > limit) {
                return self.reject_body(&parts, StatusCode::PAYLOAD_TOO_LARGE);
            }
        }

        let limit = self
            .max_body_bytes
            .and_then(|l| usize::try_from(l).ok())
            .unwrap_or(usize::MAX);
        let body = match Limited::new(body, limit).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                let status = if e.is::<http_body_util::LengthLimitError>() {
                    StatusCode::PAYLOAD_TOO_LARGE
                } else {
                    StatusCode::BAD_REQUEST
                };
                tracing::debug!(
                    "processor: inbound body rejected, path={}, error={}",
                    parts.uri.path(),
                    e
                );
                return self.reject_body(&parts, status);
            }
        };

        let request = Request::new(
            parts.method,
            parts.uri.path(),
            parts.uri.query().unwrap_or(""),
            parts.headers,
            body,
        );
        into_hyper(self.process(request).await)
    }

    fn reject_body(&self, parts: &http::request::Parts, status: StatusCode) -> hyper::Response<BoxBody> {
        metrics::counter!("tent_http_request_body_rejected_total").increment(1);
        tracing::warn!(
            "processor: request rejected, method={}, path={}, status={}",
            parts.method,
            parts.uri.path(),
            status.as_u16()
        );
        let msg = if status == StatusCode::PAYLOAD_TOO_LARGE {
            r#"{"error":"payload too large"}"#
        } else {
            r#"{"error":"bad request"}"#
        };
        let mut resp = hyper::Response::new(full_body(msg));
        *resp.status_mut() = status;
        resp.headers_mut().insert(
            CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );
        resp
    }
}
