//! Cache-eligibility predicates.
//!
//! Each matcher may constrain the request side (checked before a cache read),
//! the response side (checked before a cache write), or both. A side a matcher
//! does not constrain is vacuously true.

use crate::config::{CacheMatcherConfig, StatusCodeSpec};
use crate::error::{GatewayError, Result};
use crate::message::{ProcessingRequest, Response};
use http::HeaderName;
use std::fmt;
use std::str::FromStr;

/// A three-position status pattern. Each position is a digit or a wildcard
/// (`x`/`X`), so `"4xx"` covers 400–499 and `"30x"` covers 300–309.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPattern([Option<u8>; 3]);

impl StatusPattern {
    pub fn matches(&self, code: u16) -> bool {
        if !(100..=999).contains(&code) {
            return false;
        }
        let digits = [
            (code / 100) as u8,
            ((code / 10) % 10) as u8,
            (code % 10) as u8,
        ];
        self.0
            .iter()
            .zip(digits)
            .all(|(want, got)| want.map_or(true, |w| w == got))
    }
}

impl FromStr for StatusPattern {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let bytes = s.as_bytes();
        if bytes.len() != 3 {
            return Err(GatewayError::Config(format!(
                "invalid status code pattern '{}': expected three digits or x",
                s
            )));
        }
        let mut out = [None; 3];
        for (slot, b) in out.iter_mut().zip(bytes) {
            *slot = match b {
                b'0'..=b'9' => Some(b - b'0'),
                b'x' | b'X' => None,
                _ => {
                    return Err(GatewayError::Config(format!(
                        "invalid status code pattern '{}'",
                        s
                    )))
                }
            };
        }
        if out[0] == Some(0) {
            return Err(GatewayError::Config(format!(
                "invalid status code pattern '{}': leading digit must be 1-9",
                s
            )));
        }
        Ok(Self(out))
    }
}

impl fmt::Display for StatusPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for slot in self.0 {
            match slot {
                Some(d) => write!(f, "{}", d)?,
                None => write!(f, "x")?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub enum ResponseMatcher {
    StatusCode(Vec<StatusPattern>),
    /// Upper-cased method names.
    RequestMethod(Vec<String>),
    /// Header name to expected trimmed value; any entry matching is enough.
    ResponseHeader(Vec<(HeaderName, String)>),
    Negative(Box<ResponseMatcher>),
}

impl ResponseMatcher {
    pub fn status_codes(codes: &[StatusCodeSpec]) -> Result<Self> {
        let patterns = codes
            .iter()
            .map(|c| c.as_pattern().parse())
            .collect::<Result<Vec<StatusPattern>>>()?;
        Ok(ResponseMatcher::StatusCode(patterns))
    }

    pub fn request_methods<S: AsRef<str>>(methods: &[S]) -> Self {
        ResponseMatcher::RequestMethod(
            methods
                .iter()
                .map(|m| m.as_ref().trim().to_ascii_uppercase())
                .collect(),
        )
    }

    pub fn response_headers<'a, I>(headers: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let entries = headers
            .into_iter()
            .map(|(name, value)| {
                HeaderName::from_bytes(name.trim().as_bytes())
                    .map(|n| (n, value.trim().to_string()))
                    .map_err(|_| GatewayError::Config(format!("invalid header name '{}'", name)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ResponseMatcher::ResponseHeader(entries))
    }

    pub fn from_config(cfg: &CacheMatcherConfig) -> Result<Self> {
        match cfg {
            CacheMatcherConfig::StatusCode { codes } => Self::status_codes(codes),
            CacheMatcherConfig::RequestMethod { methods } => Ok(Self::request_methods(methods)),
            CacheMatcherConfig::ResponseHeader { headers } => Self::response_headers(headers),
            CacheMatcherConfig::Negative { matcher } => Ok(ResponseMatcher::Negative(Box::new(
                Self::from_config(matcher)?,
            ))),
        }
    }

    fn request_side(&self, req: &ProcessingRequest) -> Option<bool> {
        match self {
            ResponseMatcher::StatusCode(_) | ResponseMatcher::ResponseHeader(_) => None,
            ResponseMatcher::RequestMethod(methods) => {
                Some(method_listed(methods, req.method().as_str()))
            }
            ResponseMatcher::Negative(inner) => inner.request_side(req).map(|b| !b),
        }
    }

    fn response_side(&self, resp: &Response) -> Option<bool> {
        match self {
            ResponseMatcher::StatusCode(patterns) => {
                let code = resp.status().as_u16();
                Some(patterns.iter().any(|p| p.matches(code)))
            }
            ResponseMatcher::RequestMethod(methods) => Some(
                resp.request()
                    .map(|r| method_listed(methods, r.method().as_str()))
                    .unwrap_or(false),
            ),
            ResponseMatcher::ResponseHeader(entries) => Some(entries.iter().any(|(name, want)| {
                resp.headers()
                    .get_all(name)
                    .iter()
                    .any(|v| v.to_str().map(|s| s.trim() == want).unwrap_or(false))
            })),
            ResponseMatcher::Negative(inner) => inner.response_side(resp).map(|b| !b),
        }
    }

    pub fn match_request(&self, req: &ProcessingRequest) -> bool {
        self.request_side(req).unwrap_or(true)
    }

    pub fn match_response(&self, resp: &Response) -> bool {
        self.response_side(resp).unwrap_or(true)
    }
}

fn method_listed(methods: &[String], method: &str) -> bool {
    let upper = method.to_ascii_uppercase();
    methods.iter().any(|m| *m == upper)
}

/// AND-combination of cache matchers.
#[derive(Debug, Clone, Default)]
pub struct MatcherSet {
    matchers: Vec<ResponseMatcher>,
}

impl MatcherSet {
    pub fn new(matchers: Vec<ResponseMatcher>) -> Self {
        Self { matchers }
    }

    pub fn matchers(&self) -> &[ResponseMatcher] {
        &self.matchers
    }

    pub fn match_request(&self, req: &ProcessingRequest) -> bool {
        self.matchers.iter().all(|m| m.match_request(req))
    }

    pub fn match_response(&self, resp: &Response) -> bool {
        self.matchers.iter().all(|m| m.match_response(resp))
    }
}
