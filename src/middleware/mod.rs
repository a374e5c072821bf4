pub mod file_cache;
pub mod set_headers;
pub mod set_path;

use crate::cache::CacheKey;
use crate::config::MiddlewareConfig;
use crate::error::Result;
use crate::message::{ProcessingRequest, Response};
use file_cache::FileCacheMiddleware;
use http::{HeaderName, HeaderValue};

/// Outcome of a middleware's request phase.
pub enum Flow {
    /// Continue to the next middleware / the handler's core operation.
    Continue,
    /// Short-circuit: this response answers the request. Remaining request-phase
    /// middlewares and the handler's core operation are skipped.
    Answer(Response),
}

/// What a middleware's request phase leaves behind for its response phase.
/// One slot per middleware per request.
#[derive(Debug, Default)]
pub enum Carry {
    #[default]
    Nothing,
    /// Cache identity as seen by the cache middleware, before any later rewrite.
    CacheKey(CacheKey),
}

/// Enum-based middleware: static dispatch over a closed set of variants.
///
/// Middlewares are built once when the rule is built (at config load), never
/// per request.
///
/// Adding a new middleware:
/// 1. Add a module under `middleware/`
/// 2. Add a variant here and a `MiddlewareConfig` variant for its spec
/// 3. Implement the match arms in `process_request` / `process_response`
/// 4. Add construction logic in `build_middlewares`
pub enum Middleware {
    SetHeaders(Vec<(HeaderName, HeaderValue)>),
    SetPath(String),
    FileCache(FileCacheMiddleware),
}

impl std::fmt::Debug for Middleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Middleware::SetHeaders(headers) => f
                .debug_struct("SetHeaders")
                .field("count", &headers.len())
                .finish(),
            Middleware::SetPath(path) => f.debug_struct("SetPath").field("path", path).finish(),
            Middleware::FileCache(cache) => f
                .debug_struct("FileCache")
                .field("location", &cache.location().path())
                .finish(),
        }
    }
}

impl Middleware {
    pub fn name(&self) -> &'static str {
        match self {
            Middleware::SetHeaders(_) => "set_headers",
            Middleware::SetPath(_) => "set_path",
            Middleware::FileCache(_) => "file_cache",
        }
    }

    /// Request phase. May rewrite the request or answer it outright.
    pub async fn process_request(&self, req: &mut ProcessingRequest, carry: &mut Carry) -> Flow {
        match self {
            Middleware::SetHeaders(headers) => {
                set_headers::set_headers_on_request(headers, req);
                Flow::Continue
            }
            Middleware::SetPath(path) => {
                set_path::set_path_on_request(path, req);
                Flow::Continue
            }
            Middleware::FileCache(cache) => {
                let key = cache.key_for(req);
                let flow = cache.on_request(req, &key).await;
                *carry = Carry::CacheKey(key);
                flow
            }
        }
    }

    /// Response phase. Runs for every response, including short-circuited ones.
    /// A middleware whose request phase was skipped gets `Carry::Nothing` and
    /// sees the request as it stood when the chain stopped.
    pub async fn process_response(
        &self,
        req: &ProcessingRequest,
        carry: &Carry,
        resp: &mut Response,
    ) {
        match self {
            Middleware::SetHeaders(_) | Middleware::SetPath(_) => {}
            Middleware::FileCache(cache) => match carry {
                Carry::CacheKey(key) => cache.on_response(key, resp).await,
                Carry::Nothing => cache.on_response(&cache.key_for(req), resp).await,
            },
        }
    }
}

/// Build a middleware chain from its declarative specs, preserving order.
pub fn build_middlewares(specs: &[MiddlewareConfig]) -> Result<Vec<Middleware>> {
    specs.iter().map(build_middleware).collect()
}

fn build_middleware(spec: &MiddlewareConfig) -> Result<Middleware> {
    Ok(match spec {
        MiddlewareConfig::SetHeaders { headers } => {
            Middleware::SetHeaders(set_headers::compile_headers(headers)?)
        }
        MiddlewareConfig::SetPath { path } => Middleware::SetPath(set_path::compile_path(path)?),
        MiddlewareConfig::FileCache(cfg) => {
            Middleware::FileCache(FileCacheMiddleware::from_config(cfg)?)
        }
    })
}
