use super::GatewayState;
use crate::message::body::{full_body, BoxBody};
use hyper::{Request, Response, StatusCode};

pub fn handle_admin<B>(req: Request<B>, state: GatewayState) -> Result<Response<BoxBody>, hyper::Error> {
    let resp = match req.uri().path() {
        "/health" | "/healthz" => json(StatusCode::OK, r#"{"status":"ok"}"#.to_string()),

        "/ready" | "/readyz" => {
            let registry = state.registry();
            json(
                StatusCode::OK,
                serde_json::json!({
                    "status": "ready",
                    "rules": registry.len(),
                })
                .to_string(),
            )
        }

        "/metrics" => {
            let mut resp = Response::new(full_body(state.metrics.render()));
            resp.headers_mut().insert(
                http::header::CONTENT_TYPE,
                http::HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
            );
            resp
        }

        "/rules" => {
            let rules: Vec<serde_json::Value> = state
                .registry()
                .rules()
                .map(|r| {
                    serde_json::json!({
                        "name": r.label(),
                        "matchers": r.matchers().iter().map(|m| m.to_string()).collect::<Vec<_>>(),
                        "handler": r.handler().kind_name(),
                        "middlewares": r.handler().middlewares().iter().map(|m| m.name()).collect::<Vec<_>>(),
                    })
                })
                .collect();
            json(
                StatusCode::OK,
                serde_json::to_string_pretty(&rules).unwrap_or_default(),
            )
        }

        _ => json(StatusCode::NOT_FOUND, r#"{"error":"not found"}"#.to_string()),
    };
    Ok(resp)
}

fn json(status: StatusCode, body: String) -> Response<BoxBody> {
    let mut resp = Response::new(full_body(body));
    *resp.status_mut() = status;
    resp.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/json"),
    );
    resp
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{HttpClient, UpstreamResponse};
    use crate::config::GatewayConfig;
    use crate::metrics::Metrics;
    use async_trait::async_trait;
    use bytes::Bytes;
    use http::{HeaderMap, Method};
    use http_body_util::{BodyExt, Empty};
    use std::sync::Arc;

    struct Offline;

    #[async_trait]
    impl HttpClient for Offline {
        async fn request(
            &self,
            _method: &Method,
            _url: &str,
            _headers: &HeaderMap,
            _body: Bytes,
        ) -> crate::error::Result<UpstreamResponse> {
            Err(crate::error::GatewayError::UpstreamConnect("offline".into()))
        }
    }

    fn state() -> GatewayState {
        let cfg = GatewayConfig::parse(
            r#"
[[rules]]
name = "api"
matchers = [{ method = "GET", uri = "/api", type = "begins_with" }]
handler = { type = "proxy", host = "http://api:80" }
middlewares = [{ class = "SetPathMiddleware", path = "/v1" }]
"#,
            Some("toml"),
        )
        .unwrap();
        GatewayState::new(cfg, Metrics::detached(), Arc::new(Offline)).unwrap()
    }

    async fn get(path: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .uri(path)
            .body(Empty::<Bytes>::new())
            .unwrap();
        let resp = handle_admin(req, state()).unwrap();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap_or_default())
    }

    #[tokio::test]
    async fn health_and_ready() {
        let (status, body) = get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, body) = get("/ready").await;
        assert_eq!(status, StatusCode::OK);
        // user rule plus the catch-all
        assert_eq!(body["rules"], 2);
    }

    #[tokio::test]
    async fn rules_listing() {
        let (status, body) = get("/rules").await;
        assert_eq!(status, StatusCode::OK);
        let rules = body.as_array().unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0]["name"], "api");
        assert_eq!(rules[0]["matchers"][0], "GET /api*");
        assert_eq!(rules[0]["handler"], "proxy");
        assert_eq!(rules[0]["middlewares"][0], "set_path");
        assert_eq!(rules[1]["name"], "_default");
        assert_eq!(rules[1]["handler"], "missing");
    }

    #[tokio::test]
    async fn unknown_path_is_404() {
        let (status, body) = get("/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not found");
    }
}
