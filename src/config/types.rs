use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Deserialize a `T` that implements `Default`, treating JSON `null` the same as
/// a missing field (returns `T::default()`).  Use with:
///   `#[serde(default, deserialize_with = "deserialize_null_default")]`
fn deserialize_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Top-level gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Outbound client used by every proxy handler.
    #[serde(default)]
    pub upstream: UpstreamClientConfig,

    /// Routing rules in declaration order. A catch-all 404 rule is always
    /// appended after these at build time.
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Empty string disables the admin listener.
    #[serde(default = "default_admin_listen")]
    pub admin_listen: String,

    /// Inbound bodies above this size are rejected with 413. `None` means no limit.
    #[serde(default)]
    pub max_body_bytes: Option<u64>,

    /// Tokio worker threads. `None` means one per available core.
    #[serde(default)]
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            admin_listen: default_admin_listen(),
            max_body_bytes: None,
            workers: None,
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_admin_listen() -> String {
    "0.0.0.0:9091".to_string()
}

/// Durations are humantime strings (`"30s"`, `"1m 30s"`, `"500ms"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamClientConfig {
    /// Whole-transfer timeout, including redirects.
    #[serde(default = "default_upstream_timeout")]
    pub timeout: String,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: String,

    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    #[serde(default = "default_pool_idle_timeout")]
    pub pool_idle_timeout: String,

    #[serde(default = "default_pool_max_idle_per_host")]
    pub pool_max_idle_per_host: usize,
}

impl Default for UpstreamClientConfig {
    fn default() -> Self {
        Self {
            timeout: default_upstream_timeout(),
            connect_timeout: default_connect_timeout(),
            max_redirects: default_max_redirects(),
            pool_idle_timeout: default_pool_idle_timeout(),
            pool_max_idle_per_host: default_pool_max_idle_per_host(),
        }
    }
}

fn default_upstream_timeout() -> String {
    "30s".to_string()
}

fn default_connect_timeout() -> String {
    "5s".to_string()
}

fn default_max_redirects() -> usize {
    10
}

fn default_pool_idle_timeout() -> String {
    "60s".to_string()
}

fn default_pool_max_idle_per_host() -> usize {
    32
}

/// One routing rule: matchers (OR semantics), a handler and its middlewares.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    #[serde(default)]
    pub name: Option<String>,

    /// Empty means the rule matches every request.
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub matchers: Vec<MatcherConfig>,

    pub handler: HandlerConfig,

    /// Appended after the handler's own `middlewares`.
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub middlewares: Vec<MiddlewareConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// `None` matches any method.
    #[serde(default)]
    pub method: Option<String>,

    /// `None` matches any path.
    #[serde(default)]
    pub uri: Option<String>,

    #[serde(rename = "type", default)]
    pub match_type: MatchType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    #[default]
    #[serde(alias = "ExactRequestMatcher")]
    Exact,
    #[serde(alias = "BeginsWithRequestMatcher", alias = "begins-with", alias = "prefix")]
    BeginsWith,
}

/// Handler config, discriminated by `type`. Class names are accepted as aliases.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HandlerConfig {
    #[serde(rename = "proxy", alias = "ProxyRequestHandler")]
    Proxy {
        /// Upstream base URL, e.g. `http://api:80`.
        host: String,
        #[serde(default, deserialize_with = "deserialize_null_default")]
        middlewares: Vec<MiddlewareConfig>,
    },
    #[serde(rename = "static", alias = "StaticFileHandler")]
    Static {
        location: PathBuf,
        #[serde(default, deserialize_with = "deserialize_null_default")]
        middlewares: Vec<MiddlewareConfig>,
    },
    #[serde(rename = "missing", alias = "MissingRequestHandler")]
    Missing {
        #[serde(default, deserialize_with = "deserialize_null_default")]
        middlewares: Vec<MiddlewareConfig>,
    },
}

impl HandlerConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            HandlerConfig::Proxy { .. } => "proxy",
            HandlerConfig::Static { .. } => "static",
            HandlerConfig::Missing { .. } => "missing",
        }
    }

    pub fn middlewares(&self) -> &[MiddlewareConfig] {
        match self {
            HandlerConfig::Proxy { middlewares, .. }
            | HandlerConfig::Static { middlewares, .. }
            | HandlerConfig::Missing { middlewares } => middlewares,
        }
    }
}

/// Middleware config, discriminated by `class`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "class")]
pub enum MiddlewareConfig {
    #[serde(rename = "SetHeadersMiddleware", alias = "set_headers")]
    SetHeaders { headers: BTreeMap<String, String> },
    #[serde(rename = "SetPathMiddleware", alias = "set_path")]
    SetPath { path: String },
    #[serde(rename = "FileCacheMiddleware", alias = "file_cache")]
    FileCache(FileCacheConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileCacheConfig {
    pub location: PathBuf,

    /// Eligibility matchers, AND-combined. Takes precedence over the legacy
    /// `httpCodes` / `requestMethods` shorthand.
    #[serde(default)]
    pub matchers: Option<Vec<CacheMatcherConfig>>,

    /// Deprecated shorthand for a `StatusCodeMatcher`. Defaults to `[200]`.
    #[serde(default, rename = "httpCodes", alias = "http_codes")]
    pub http_codes: Option<Vec<StatusCodeSpec>>,

    /// Deprecated shorthand for a `RequestMethodMatcher`. Defaults to `["GET"]`.
    #[serde(default, rename = "requestMethods", alias = "request_methods")]
    pub request_methods: Option<Vec<String>>,
}

/// Cache-eligibility matcher config, discriminated by `class`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "class")]
pub enum CacheMatcherConfig {
    #[serde(rename = "StatusCodeMatcher", alias = "status_code")]
    StatusCode {
        #[serde(alias = "httpCodes")]
        codes: Vec<StatusCodeSpec>,
    },
    #[serde(rename = "RequestMethodMatcher", alias = "request_method")]
    RequestMethod {
        #[serde(alias = "requestMethods")]
        methods: Vec<String>,
    },
    #[serde(rename = "ResponseHeaderMatcher", alias = "response_header")]
    ResponseHeader { headers: BTreeMap<String, String> },
    #[serde(rename = "NegativeMatcher", alias = "negative")]
    Negative { matcher: Box<CacheMatcherConfig> },
}

/// A status code as written in config: `200` or a pattern such as `"4xx"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusCodeSpec {
    Code(u16),
    Pattern(String),
}

impl StatusCodeSpec {
    pub fn as_pattern(&self) -> String {
        match self {
            StatusCodeSpec::Code(c) => c.to_string(),
            StatusCodeSpec::Pattern(p) => p.trim().to_string(),
        }
    }
}
