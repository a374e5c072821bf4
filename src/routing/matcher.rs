use crate::config::{MatchType, MatcherConfig};
use crate::error::{GatewayError, Result};
use crate::message::Request;
use http::Method;
use std::fmt;

/// Routing predicate over method and path. `None` on either side is a wildcard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMatcher {
    method: Option<Method>,
    uri: Option<String>,
    match_type: MatchType,
}

impl RequestMatcher {
    pub fn exact(method: Option<Method>, uri: Option<&str>) -> Self {
        Self {
            method,
            uri: uri.map(str::to_string),
            match_type: MatchType::Exact,
        }
    }

    pub fn begins_with(method: Option<Method>, uri: Option<&str>) -> Self {
        Self {
            method,
            uri: uri.map(str::to_string),
            match_type: MatchType::BeginsWith,
        }
    }

    pub fn from_config(cfg: &MatcherConfig) -> Result<Self> {
        let method = match cfg.method.as_deref().map(str::trim) {
            None | Some("") | Some("*") => None,
            Some(m) => Some(
                Method::from_bytes(m.to_ascii_uppercase().as_bytes())
                    .map_err(|_| GatewayError::Config(format!("invalid matcher method '{}'", m)))?,
            ),
        };
        Ok(Self {
            method,
            uri: cfg.uri.clone(),
            match_type: cfg.match_type,
        })
    }

    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub fn match_type(&self) -> MatchType {
        self.match_type
    }

    pub fn matches(&self, req: &Request) -> bool {
        if let Some(ref method) = self.method {
            if method != req.method() {
                return false;
            }
        }
        match (&self.uri, self.match_type) {
            (None, _) => true,
            (Some(uri), MatchType::Exact) => req.path() == uri,
            (Some(uri), MatchType::BeginsWith) => req.path().starts_with(uri.as_str()),
        }
    }
}

impl fmt::Display for RequestMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let method = self.method.as_ref().map(Method::as_str).unwrap_or("*");
        let uri = self.uri.as_deref().unwrap_or("*");
        match self.match_type {
            MatchType::Exact => write!(f, "{} {}", method, uri),
            MatchType::BeginsWith => write!(f, "{} {}*", method, uri),
        }
    }
}
