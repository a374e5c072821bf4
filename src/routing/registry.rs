use crate::client::{self, HttpClient};
use crate::config::{GatewayConfig, HandlerConfig, RuleConfig};
use crate::error::{GatewayError, Result};
use crate::handler::RequestHandler;
use crate::message::Request;
use crate::routing::{RequestMatcher, Rule};
use std::sync::Arc;

/// Label of the implicit catch-all rule.
pub const CATCH_ALL: &str = "_default";

/// Ordered rule set consulted for every request.
///
/// Built once at startup and shared read-only behind an `Arc`. User rules are
/// evaluated in declaration order, followed by an implicit catch-all whose
/// handler answers 404, so every lookup terminates.
pub struct Registry {
    rules: Vec<Rule>,
    catch_all: Rule,
    client: Arc<dyn HttpClient>,
}

impl Registry {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self {
            rules: Vec::new(),
            catch_all: catch_all(),
            client,
        }
    }

    /// Build every rule of `config`, failing on the first invalid one.
    pub fn from_config(config: &GatewayConfig, client: Arc<dyn HttpClient>) -> Result<Self> {
        let mut registry = Self::new(client);
        for rule in &config.rules {
            registry.build_rule(rule)?;
        }
        tracing::info!(
            "routing: registry built, rules={}",
            registry.rules.len()
        );
        metrics::gauge!("tent_config_rules_total").set(registry.len() as f64);
        Ok(registry)
    }

    /// Drop all user rules. Only meant for building a fresh rule set.
    pub fn reset(&mut self) {
        self.rules.clear();
    }

    /// Compile `cfg` into a rule, append it and return it.
    pub fn build_rule(&mut self, cfg: &RuleConfig) -> Result<&Rule> {
        let idx = self.rules.len();
        let label = cfg.name.clone().unwrap_or_else(|| format!("#{}", idx));

        if let Some(ref name) = cfg.name {
            if self.rule_by_name(name).is_some() {
                return Err(GatewayError::Config(format!("duplicate rule name '{}'", name)));
            }
        }

        let matchers = cfg
            .matchers
            .iter()
            .map(RequestMatcher::from_config)
            .collect::<Result<Vec<_>>>()
            .map_err(|e| prefix(&label, e))?;

        if let HandlerConfig::Proxy { .. } = cfg.handler {
            if let Some(method) = matchers
                .iter()
                .filter_map(RequestMatcher::method)
                .find(|m| !client::is_supported(m))
            {
                return Err(GatewayError::Config(format!(
                    "rule '{}': proxy handler cannot forward method {}",
                    label, method
                )));
            }
        }

        let handler = RequestHandler::build(&cfg.handler, &cfg.middlewares, self.client.clone())
            .map_err(|e| prefix(&label, e))?;

        tracing::debug!(
            "routing: compiled rule, label={}, handler={}, matchers={}, middlewares={}",
            label,
            handler.kind_name(),
            matchers.len(),
            handler.middlewares().len()
        );

        Ok(self.add_rule(Rule::new(cfg.name.clone(), label, matchers, handler)))
    }

    /// Append an already built rule.
    pub fn add_rule(&mut self, rule: Rule) -> &Rule {
        self.rules.push(rule);
        &self.rules[self.rules.len() - 1]
    }

    /// User rules in declaration order, then the catch-all.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().chain(std::iter::once(&self.catch_all))
    }

    /// Number of rules including the catch-all.
    pub fn len(&self) -> usize {
        self.rules.len() + 1
    }

    /// User rules only.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First rule matching `req`. Always succeeds thanks to the catch-all.
    pub fn find(&self, req: &Request) -> &Rule {
        self.rules
            .iter()
            .find(|rule| rule.matches(req))
            .unwrap_or(&self.catch_all)
    }

    pub fn rule_by_name(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name() == Some(name))
    }
}

fn catch_all() -> Rule {
    Rule::new(None, CATCH_ALL, Vec::new(), RequestHandler::missing())
}

fn prefix(label: &str, err: GatewayError) -> GatewayError {
    match err {
        GatewayError::Config(msg) => GatewayError::Config(format!("rule '{}': {}", label, msg)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::UpstreamResponse;
    use crate::config::{MatchType, MatcherConfig};
    use async_trait::async_trait;
    use bytes::Bytes;
    use http::{HeaderMap, Method, StatusCode};

    struct NoNetwork;

    #[async_trait]
    impl HttpClient for NoNetwork {
        async fn request(
            &self,
            _method: &Method,
            _url: &str,
            _headers: &HeaderMap,
            _body: Bytes,
        ) -> Result<UpstreamResponse> {
            Err(GatewayError::UpstreamConnect("offline".into()))
        }
    }

    fn registry() -> Registry {
        Registry::new(Arc::new(NoNetwork))
    }

    fn matcher(method: &str, uri: &str) -> MatcherConfig {
        MatcherConfig {
            method: Some(method.into()),
            uri: Some(uri.into()),
            match_type: MatchType::Exact,
        }
    }

    fn proxy_rule(name: &str, matchers: Vec<MatcherConfig>) -> RuleConfig {
        RuleConfig {
            name: Some(name.into()),
            matchers,
            handler: HandlerConfig::Proxy {
                host: "http://api:80".into(),
                middlewares: Vec::new(),
            },
            middlewares: Vec::new(),
        }
    }

    #[test]
    fn catch_all_is_always_last() {
        let mut reg = registry();
        assert_eq!(reg.rules().count(), 1);
        reg.build_rule(&proxy_rule("api", vec![matcher("GET", "/persons")]))
            .unwrap();
        let labels: Vec<_> = reg.rules().map(|r| r.label().to_string()).collect();
        assert_eq!(labels, vec!["api", CATCH_ALL]);
        assert!(reg.rules().last().unwrap().matchers().is_empty());
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn first_match_wins() {
        let mut reg = registry();
        reg.build_rule(&proxy_rule("first", vec![matcher("GET", "/a")]))
            .unwrap();
        reg.build_rule(&proxy_rule("second", vec![matcher("GET", "/a")]))
            .unwrap();
        let rule = reg.find(&Request::from_target(Method::GET, "/a"));
        assert_eq!(rule.name(), Some("first"));
    }

    #[test]
    fn unmatched_falls_through_to_catch_all() {
        let mut reg = registry();
        reg.build_rule(&proxy_rule("api", vec![matcher("GET", "/a")]))
            .unwrap();
        let rule = reg.find(&Request::from_target(Method::POST, "/a"));
        assert_eq!(rule.label(), CATCH_ALL);
        assert_eq!(rule.handler().kind_name(), "missing");
    }

    #[tokio::test]
    async fn catch_all_answers_404() {
        let reg = registry();
        let req = Arc::new(Request::from_target(Method::GET, "/nowhere"));
        let resp = reg
            .find(&req)
            .handler()
            .handle_request(crate::message::ProcessingRequest::new(req.clone()))
            .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(resp.body().as_ref(), b"Not Found");
    }

    #[test]
    fn lookup_by_name() {
        let mut reg = registry();
        reg.build_rule(&proxy_rule("api", vec![matcher("GET", "/a")]))
            .unwrap();
        assert!(reg.rule_by_name("api").is_some());
        assert!(reg.rule_by_name("nope").is_none());
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut reg = registry();
        reg.build_rule(&proxy_rule("api", vec![])).unwrap();
        assert!(matches!(
            reg.build_rule(&proxy_rule("api", vec![])),
            Err(GatewayError::Config(_))
        ));
    }

    #[test]
    fn proxy_with_unsupported_method_rejected() {
        let mut reg = registry();
        let err = reg
            .build_rule(&proxy_rule("api", vec![matcher("PUT", "/a")]))
            .err()
            .unwrap();
        let msg = err.to_string();
        assert!(msg.contains("rule 'api'"), "{}", msg);
        assert!(msg.contains("PUT"), "{}", msg);
    }

    #[test]
    fn forwardable_methods_follow_the_client() {
        let mut reg = registry();
        let err = reg
            .build_rule(&proxy_rule("delete", vec![matcher("delete", "/persons")]))
            .err()
            .unwrap();
        assert!(err.to_string().contains("DELETE"), "{}", err);

        reg.build_rule(&proxy_rule("api", vec![matcher("post", "/persons")]))
            .unwrap();

        // Static rules may pin any method.
        reg.build_rule(&RuleConfig {
            name: Some("home".into()),
            matchers: vec![matcher("HEAD", "/")],
            handler: HandlerConfig::Static {
                location: std::env::temp_dir(),
                middlewares: Vec::new(),
            },
            middlewares: Vec::new(),
        })
        .unwrap();
    }

    #[test]
    fn reset_keeps_catch_all() {
        let mut reg = registry();
        reg.build_rule(&proxy_rule("api", vec![])).unwrap();
        reg.reset();
        assert!(reg.is_empty());
        assert_eq!(reg.rules().count(), 1);
    }
}
