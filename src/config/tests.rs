use super::types::*;
use super::GatewayConfig;
use std::path::Path;

const TOML_RULES: &str = r#"
[server]
listen = "127.0.0.1:8080"
max_body_bytes = 1024

[upstream]
timeout = "2s"
max_redirects = 3

[[rules]]
name = "api"
matchers = [
  { method = "get", uri = "/persons" },
  { uri = "/assets", type = "begins_with" },
]
handler = { type = "proxy", host = "http://api:80" }
middlewares = [
  { class = "SetHeadersMiddleware", headers = { Host = "api" } },
  { class = "FileCacheMiddleware", location = "./cache", httpCodes = [200, "3xx"] },
]

[[rules]]
handler = { type = "StaticFileHandler", location = "./public" }
"#;

#[test]
fn test_parse_toml_rules() {
    let cfg = tokio_test::assert_ok!(GatewayConfig::parse(TOML_RULES, Some("toml")));
    tokio_test::assert_ok!(cfg.validate());

    assert_eq!(cfg.server.listen, "127.0.0.1:8080");
    assert_eq!(cfg.server.max_body_bytes, Some(1024));
    assert_eq!(cfg.upstream.max_redirects, 3);
    assert_eq!(cfg.rules.len(), 2);

    let api = &cfg.rules[0];
    assert_eq!(api.label(0), "api");
    assert_eq!(api.matchers[0].method.as_deref(), Some("get"));
    assert_eq!(api.matchers[0].match_type, MatchType::Exact);
    assert_eq!(api.matchers[1].match_type, MatchType::BeginsWith);
    assert!(api.matchers[1].method.is_none());
    assert_eq!(api.handler.kind(), "proxy");
    assert_eq!(api.middlewares.len(), 2);

    match &api.middlewares[1] {
        MiddlewareConfig::FileCache(fc) => {
            assert!(fc.matchers.is_none());
            assert_eq!(
                fc.http_codes.as_deref(),
                Some(&[StatusCodeSpec::Code(200), StatusCodeSpec::Pattern("3xx".into())][..])
            );
        }
        other => panic!("unexpected middleware {:?}", other),
    }

    let fallback = &cfg.rules[1];
    assert_eq!(fallback.label(1), "#1");
    assert!(fallback.matchers.is_empty());
    assert_eq!(fallback.handler.kind(), "static");
}

#[test]
fn test_parse_json_with_cache_matchers() {
    let json = r#"{
        "rules": [{
            "name": "cached",
            "matchers": [{"method": "GET", "uri": "/persons", "type": "ExactRequestMatcher"}],
            "handler": {
                "type": "ProxyRequestHandler",
                "host": "https://api.example.com",
                "middlewares": [{
                    "class": "FileCacheMiddleware",
                    "location": "/var/cache/tent",
                    "matchers": [
                        {"class": "StatusCodeMatcher", "codes": [200, "2xx"]},
                        {"class": "RequestMethodMatcher", "methods": ["GET"]},
                        {"class": "NegativeMatcher", "matcher": {
                            "class": "ResponseHeaderMatcher",
                            "headers": {"Cache-Control": "no-store"}
                        }}
                    ]
                }]
            }
        }]
    }"#;
    let cfg = GatewayConfig::parse(json, Some("json")).unwrap();
    cfg.validate().unwrap();

    let handler_mw = cfg.rules[0].handler.middlewares();
    assert_eq!(handler_mw.len(), 1);
    let MiddlewareConfig::FileCache(fc) = &handler_mw[0] else {
        panic!("expected file cache");
    };
    let matchers = fc.matchers.as_ref().unwrap();
    assert_eq!(matchers.len(), 3);
    assert!(matches!(
        &matchers[2],
        CacheMatcherConfig::Negative { matcher } if matches!(**matcher, CacheMatcherConfig::ResponseHeader { .. })
    ));
}

#[test]
fn test_defaults() {
    let cfg = GatewayConfig::parse("", Some("toml")).unwrap();
    cfg.validate().unwrap();
    assert_eq!(cfg.server.listen, "0.0.0.0:8080");
    assert_eq!(cfg.server.admin_listen, "0.0.0.0:9091");
    assert!(cfg.server.max_body_bytes.is_none());
    assert_eq!(cfg.upstream.timeout, "30s");
    assert_eq!(cfg.upstream.max_redirects, 10);
    assert!(cfg.rules.is_empty());
}

#[test]
fn test_json_null_rules_and_middlewares() {
    let json = r#"{
        "rules": [{"handler": {"type": "missing", "middlewares": null}, "matchers": null, "middlewares": null}]
    }"#;
    let cfg = GatewayConfig::parse(json, Some("json")).unwrap();
    assert!(cfg.rules[0].matchers.is_empty());
    assert!(cfg.rules[0].middlewares.is_empty());
    assert!(cfg.rules[0].handler.middlewares().is_empty());
}

#[test]
fn test_unknown_discriminators_are_rejected() {
    let bad_handler = r#"[[rules]]
handler = { type = "RedirectHandler", host = "http://x" }
"#;
    assert!(GatewayConfig::parse(bad_handler, Some("toml")).is_err());

    let bad_middleware = r#"[[rules]]
handler = { type = "missing" }
middlewares = [{ class = "GzipMiddleware" }]
"#;
    assert!(GatewayConfig::parse(bad_middleware, Some("toml")).is_err());
}

#[test]
fn test_unsupported_extension() {
    assert!(GatewayConfig::parse("{}", Some("yaml")).is_err());
    assert!(GatewayConfig::parse("{}", None).is_err());
}

#[test]
fn test_validate_rejects_bad_proxy_host() {
    let cfg = GatewayConfig::parse(
        r#"[[rules]]
handler = { type = "proxy", host = "api:80" }
"#,
        Some("toml"),
    )
    .unwrap();
    let err = cfg.validate().unwrap_err().to_string();
    assert!(err.contains("#0"), "{}", err);
}

#[test]
fn test_validate_rejects_duplicates_and_empty_values() {
    let dup = GatewayConfig::parse(
        r#"[[rules]]
name = "a"
handler = { type = "missing" }
[[rules]]
name = "a"
handler = { type = "missing" }
"#,
        Some("toml"),
    )
    .unwrap();
    assert!(dup.validate().is_err());

    let empty_uri = GatewayConfig::parse(
        r#"[[rules]]
matchers = [{ uri = "" }]
handler = { type = "missing" }
"#,
        Some("toml"),
    )
    .unwrap();
    assert!(empty_uri.validate().is_err());

    let mut no_listen = GatewayConfig::default();
    no_listen.server.listen.clear();
    assert!(no_listen.validate().is_err());

    let mut zero_workers = GatewayConfig::default();
    zero_workers.server.workers = Some(0);
    assert!(zero_workers.validate().is_err());
}

#[test]
fn test_validate_rejects_bad_duration() {
    let mut cfg = GatewayConfig::default();
    cfg.upstream.timeout = "soon".into();
    let err = cfg.validate().unwrap_err().to_string();
    assert!(err.contains("upstream.timeout"), "{}", err);
}

#[test]
fn test_load_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = GatewayConfig::load(&dir.path().join("absent.toml")).unwrap();
    assert!(cfg.rules.is_empty());
}

#[test]
fn test_load_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gateway.json");
    std::fs::write(
        &path,
        r#"{"rules": [{"name": "home", "handler": {"type": "static", "location": "./public"}}]}"#,
    )
    .unwrap();
    let cfg = GatewayConfig::load(&path).unwrap();
    assert_eq!(cfg.rules.len(), 1);
    assert_eq!(cfg.rules[0].name.as_deref(), Some("home"));
}

#[test]
fn test_load_sample_config() {
    let cfg = GatewayConfig::load(Path::new("config.toml")).unwrap();
    assert!(!cfg.rules.is_empty());
}

#[test]
fn test_env_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gateway.toml");
    std::fs::write(&path, "[server]\nadmin_listen = \"127.0.0.1:9999\"\n").unwrap();

    std::env::set_var("TENT_ADMIN_LISTEN", "");
    std::env::set_var("TENT_MAX_BODY_BYTES", "2048");
    std::env::set_var("TENT_UPSTREAM_TIMEOUT", "750ms");
    let cfg = GatewayConfig::load(&path);
    std::env::remove_var("TENT_ADMIN_LISTEN");
    std::env::remove_var("TENT_MAX_BODY_BYTES");
    std::env::remove_var("TENT_UPSTREAM_TIMEOUT");

    let cfg = cfg.unwrap();
    assert_eq!(cfg.server.admin_listen, "");
    assert_eq!(cfg.server.max_body_bytes, Some(2048));
    assert_eq!(
        cfg.upstream.timeout().unwrap(),
        std::time::Duration::from_millis(750)
    );
}
