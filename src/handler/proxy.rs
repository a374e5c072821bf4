use crate::client::{is_supported, HttpClient};
use crate::error::{GatewayError, Result};
use crate::message::{ProcessingRequest, Response};
use std::sync::Arc;
use std::time::Instant;

/// Forwards the (possibly rewritten) request to a fixed upstream base URL.
pub struct ProxyRequestHandler {
    host: String,
    client: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for ProxyRequestHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyRequestHandler")
            .field("host", &self.host)
            .finish()
    }
}

impl ProxyRequestHandler {
    pub fn new(host: &str, client: Arc<dyn HttpClient>) -> Result<Self> {
        let host = host.trim().trim_end_matches('/');
        if !(host.starts_with("http://") || host.starts_with("https://")) {
            return Err(GatewayError::Config(format!(
                "proxy host '{}' must be an http:// or https:// URL",
                host
            )));
        }
        Ok(Self {
            host: host.to_string(),
            client,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn upstream_url(&self, req: &ProcessingRequest) -> String {
        format!("{}{}", self.host, req.path_and_query())
    }

    pub async fn process(&self, req: &ProcessingRequest) -> Response {
        let origin = req.origin();
        let method = req.method();

        // Routing only pins GET/POST for proxy rules; wildcard matchers can
        // still deliver anything else.
        if !is_supported(method) {
            let err = GatewayError::UnsupportedMethod(method.to_string());
            tracing::warn!(
                "handler: proxy: method not forwarded, method={}, path={}",
                method,
                req.path()
            );
            return Response::from_error(&err).with_request(origin);
        }

        let url = self.upstream_url(req);
        let start = Instant::now();
        let result = self
            .client
            .request(method, &url, req.headers(), req.body().clone())
            .await;

        metrics::histogram!(
            "tent_upstream_request_duration_seconds",
            "host" => self.host.clone(),
        )
        .record(start.elapsed().as_secs_f64());

        match result {
            Ok(up) => Response::new(up.status, up.headers, up.body).with_request(origin),
            Err(e) => {
                let kind = match e {
                    GatewayError::UpstreamTimeout => "timeout",
                    GatewayError::UpstreamConnect(_) => "connect",
                    _ => "transport",
                };
                metrics::counter!(
                    "tent_upstream_errors_total",
                    "host" => self.host.clone(),
                    "kind" => kind,
                )
                .increment(1);
                tracing::warn!(
                    "handler: proxy: upstream failed, method={}, url={}, error={}",
                    method,
                    url,
                    e
                );
                Response::from_error(&e).with_request(origin)
            }
        }
    }
}
