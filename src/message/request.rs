use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use std::sync::{Arc, OnceLock};

static DEFAULT_METHOD: Method = Method::GET;
static EMPTY_BODY: Bytes = Bytes::new();

fn empty_headers() -> &'static HeaderMap {
    static EMPTY: OnceLock<HeaderMap> = OnceLock::new();
    EMPTY.get_or_init(HeaderMap::new)
}

/// Immutable snapshot of an inbound request.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query: String,
    headers: HeaderMap,
    body: Bytes,
}

impl Request {
    pub fn new(
        method: Method,
        path: impl Into<String>,
        query: impl Into<String>,
        headers: HeaderMap,
        body: impl Into<Bytes>,
    ) -> Self {
        let path = path.into();
        Self {
            method,
            path: if path.is_empty() { "/".to_string() } else { path },
            query: query.into(),
            headers,
            body: body.into(),
        }
    }

    /// Build from a method and a `path?query` target with no headers or body.
    pub fn from_target(method: Method, target: &str) -> Self {
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        Self::new(method, path, query, HeaderMap::new(), Bytes::new())
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

/// Mutable pipeline view over a [`Request`].
///
/// Every field resolves from the wrapped request unless a middleware has
/// overridden it. A view with nothing wrapped behaves like an empty `GET /`.
#[derive(Debug, Clone, Default)]
pub struct ProcessingRequest {
    request: Option<Arc<Request>>,
    method: Option<Method>,
    path: Option<String>,
    query: Option<String>,
    headers: Option<HeaderMap>,
    body: Option<Bytes>,
}

impl ProcessingRequest {
    pub fn new(request: Arc<Request>) -> Self {
        Self {
            request: Some(request),
            ..Self::default()
        }
    }

    pub fn request(&self) -> Option<&Arc<Request>> {
        self.request.as_ref()
    }

    pub fn method(&self) -> &Method {
        match (&self.method, &self.request) {
            (Some(m), _) => m,
            (None, Some(r)) => r.method(),
            (None, None) => &DEFAULT_METHOD,
        }
    }

    pub fn path(&self) -> &str {
        match (&self.path, &self.request) {
            (Some(p), _) => p,
            (None, Some(r)) => r.path(),
            (None, None) => "/",
        }
    }

    pub fn query(&self) -> &str {
        match (&self.query, &self.request) {
            (Some(q), _) => q,
            (None, Some(r)) => r.query(),
            (None, None) => "",
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        match (&self.headers, &self.request) {
            (Some(h), _) => h,
            (None, Some(r)) => r.headers(),
            (None, None) => empty_headers(),
        }
    }

    pub fn body(&self) -> &Bytes {
        match (&self.body, &self.request) {
            (Some(b), _) => b,
            (None, Some(r)) => r.body(),
            (None, None) => &EMPTY_BODY,
        }
    }

    /// `path` plus `?query` when the query is non-empty.
    pub fn path_and_query(&self) -> String {
        let query = self.query();
        if query.is_empty() {
            self.path().to_string()
        } else {
            format!("{}?{}", self.path(), query)
        }
    }

    pub fn set_method(&mut self, method: Method) {
        self.method = Some(method);
    }

    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = Some(path.into());
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = Some(query.into());
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = Some(body.into());
    }

    /// Insert or replace one header, copying the wrapped headers on first write.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers_mut().insert(name, value);
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        if self.headers.is_none() {
            let inherited = self
                .request
                .as_ref()
                .map(|r| r.headers().clone())
                .unwrap_or_default();
            self.headers = Some(inherited);
        }
        self.headers.get_or_insert_with(HeaderMap::new)
    }

    fn is_overridden(&self) -> bool {
        self.method.is_some()
            || self.path.is_some()
            || self.query.is_some()
            || self.headers.is_some()
            || self.body.is_some()
    }

    /// The request a response produced from this view is bound to: the
    /// wrapped request itself when untouched, otherwise a resolved snapshot.
    pub fn origin(&self) -> Arc<Request> {
        match &self.request {
            Some(r) if !self.is_overridden() => r.clone(),
            _ => Arc::new(Request::new(
                self.method().clone(),
                self.path(),
                self.query(),
                self.headers().clone(),
                self.body().clone(),
            )),
        }
    }
}
