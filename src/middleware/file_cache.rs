use crate::cache::{CacheKey, FileCache, MatcherSet, ResponseMatcher};
use crate::config::{FileCacheConfig, StatusCodeSpec};
use crate::error::Result;
use crate::files::{FolderLocation, ResponseContent};
use crate::message::{ProcessingRequest, Response};
use crate::middleware::Flow;
use std::sync::Arc;

const LEGACY_HTTP_CODES: &[u16] = &[200];
const LEGACY_METHODS: &[&str] = &["GET"];

/// Read/write gate in front of the on-disk cache.
///
/// Request phase: answers from the cache when the request passes every
/// matcher and an entry exists. Response phase: stores the response when it
/// passes every matcher. Both phases use the key taken when the request
/// reached this middleware, so rewrites further down the chain do not move
/// the slot. Stores are write-once, so re-running the response phase on a
/// cached answer is a no-op.
pub struct FileCacheMiddleware {
    location: Arc<FolderLocation>,
    matchers: MatcherSet,
}

impl FileCacheMiddleware {
    pub fn new(location: Arc<FolderLocation>, matchers: MatcherSet) -> Self {
        Self { location, matchers }
    }

    pub fn from_config(cfg: &FileCacheConfig) -> Result<Self> {
        let location = Arc::new(FolderLocation::new(&cfg.location)?);

        let matchers = match &cfg.matchers {
            Some(specs) => {
                if cfg.http_codes.is_some() || cfg.request_methods.is_some() {
                    tracing::warn!(
                        "middleware: file_cache: httpCodes/requestMethods ignored because matchers is set, location={}",
                        location.path().display()
                    );
                }
                specs
                    .iter()
                    .map(ResponseMatcher::from_config)
                    .collect::<Result<Vec<_>>>()?
            }
            None => {
                tracing::warn!(
                    "middleware: file_cache: httpCodes/requestMethods shorthand is deprecated, use matchers instead, location={}",
                    location.path().display()
                );
                let codes = match &cfg.http_codes {
                    Some(codes) => ResponseMatcher::status_codes(codes)?,
                    None => {
                        let defaults: Vec<StatusCodeSpec> =
                            LEGACY_HTTP_CODES.iter().map(|c| StatusCodeSpec::Code(*c)).collect();
                        ResponseMatcher::status_codes(&defaults)?
                    }
                };
                let methods = match &cfg.request_methods {
                    Some(methods) => ResponseMatcher::request_methods(methods),
                    None => ResponseMatcher::request_methods(LEGACY_METHODS),
                };
                vec![codes, methods]
            }
        };

        Ok(Self::new(location, MatcherSet::new(matchers)))
    }

    pub fn location(&self) -> &FolderLocation {
        &self.location
    }

    pub fn matchers(&self) -> &MatcherSet {
        &self.matchers
    }

    /// Cache identity of `req` in its current, possibly rewritten, state.
    pub fn key_for(&self, req: &ProcessingRequest) -> CacheKey {
        CacheKey::for_request(req)
    }

    fn entry(&self, key: &CacheKey) -> FileCache {
        FileCache::new(key.clone(), self.location.clone())
    }

    pub async fn on_request(&self, req: &ProcessingRequest, key: &CacheKey) -> Flow {
        if !self.matchers.match_request(req) {
            return Flow::Continue;
        }

        let entry = self.entry(key);
        if !entry.exists().await {
            metrics::counter!("tent_cache_lookups_total", "result" => "miss").increment(1);
            return Flow::Continue;
        }

        match entry.to_response(req.origin()).await {
            Ok(resp) => {
                metrics::counter!("tent_cache_lookups_total", "result" => "hit").increment(1);
                tracing::debug!(
                    "middleware: file_cache: hit, method={}, path={}, key={}",
                    req.method(),
                    req.path(),
                    entry.key().digest()
                );
                Flow::Answer(resp)
            }
            Err(e) => {
                metrics::counter!("tent_cache_lookups_total", "result" => "miss").increment(1);
                tracing::warn!(
                    "middleware: file_cache: unreadable entry, treating as miss, path={}, error={}",
                    entry.body_path().display(),
                    e
                );
                Flow::Continue
            }
        }
    }

    pub async fn on_response(&self, key: &CacheKey, resp: &Response) {
        if !self.matchers.match_response(resp) {
            return;
        }

        let entry = self.entry(key);
        let result = match entry.store(resp).await {
            Ok(true) => "stored",
            Ok(false) => "skipped",
            Err(e) => {
                tracing::warn!(
                    "middleware: file_cache: store failed, path={}, error={}",
                    entry.body_path().display(),
                    e
                );
                "failed"
            }
        };
        metrics::counter!("tent_cache_stores_total", "result" => result).increment(1);
    }
}
