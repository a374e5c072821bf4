use crate::handler::RequestHandler;
use crate::message::Request;
use crate::routing::RequestMatcher;

/// Matchers bound to one handler.
///
/// A rule matches when *any* of its matchers does; a rule with no matchers
/// matches every request.
#[derive(Debug)]
pub struct Rule {
    name: Option<String>,
    label: String,
    matchers: Vec<RequestMatcher>,
    handler: RequestHandler,
}

impl Rule {
    pub fn new(
        name: Option<String>,
        label: impl Into<String>,
        matchers: Vec<RequestMatcher>,
        handler: RequestHandler,
    ) -> Self {
        Self {
            name,
            label: label.into(),
            matchers,
            handler,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name for logs and metrics: the configured name, or a positional label.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn matchers(&self) -> &[RequestMatcher] {
        &self.matchers
    }

    pub fn handler(&self) -> &RequestHandler {
        &self.handler
    }

    pub fn matches(&self, req: &Request) -> bool {
        self.matchers.is_empty() || self.matchers.iter().any(|m| m.matches(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn or_semantics() {
        let rule = Rule::new(
            None,
            "#0",
            vec![
                RequestMatcher::exact(Some(Method::GET), Some("/a")),
                RequestMatcher::exact(Some(Method::POST), Some("/b")),
            ],
            RequestHandler::missing(),
        );
        assert!(rule.matches(&Request::from_target(Method::GET, "/a")));
        assert!(rule.matches(&Request::from_target(Method::POST, "/b")));
        assert!(!rule.matches(&Request::from_target(Method::POST, "/a")));
        assert!(!rule.matches(&Request::from_target(Method::GET, "/b")));
    }

    #[test]
    fn empty_matchers_match_everything() {
        let rule = Rule::new(None, "_default", Vec::new(), RequestHandler::missing());
        assert!(rule.matches(&Request::from_target(Method::PATCH, "/anything")));
    }
}
