//! Request handlers and the middleware pipeline they own.

pub mod missing;
pub mod proxy;
pub mod static_file;

pub use proxy::ProxyRequestHandler;
pub use static_file::StaticFileHandler;

use crate::client::HttpClient;
use crate::config::{HandlerConfig, MiddlewareConfig};
use crate::error::Result;
use crate::files::FolderLocation;
use crate::message::{ProcessingRequest, Response};
use crate::middleware::{build_middlewares, Carry, Flow, Middleware};
use std::sync::Arc;

/// The core operation of a handler.
#[derive(Debug)]
pub enum HandlerKind {
    Proxy(ProxyRequestHandler),
    Static(StaticFileHandler),
    Missing,
}

/// Result of running the full pipeline.
pub struct Handled {
    pub response: Response,
    /// Middleware that answered in the request phase, if any.
    pub answered_by: Option<&'static str>,
}

/// A handler plus its ordered middleware chain.
#[derive(Debug)]
pub struct RequestHandler {
    kind: HandlerKind,
    middlewares: Vec<Middleware>,
}

impl RequestHandler {
    pub fn new(kind: HandlerKind, middlewares: Vec<Middleware>) -> Self {
        Self { kind, middlewares }
    }

    pub fn missing() -> Self {
        Self::new(HandlerKind::Missing, Vec::new())
    }

    /// Build from a handler spec. The handler's own middlewares run first,
    /// followed by the rule-level `extra` ones.
    pub fn build(
        cfg: &HandlerConfig,
        extra: &[MiddlewareConfig],
        client: Arc<dyn HttpClient>,
    ) -> Result<Self> {
        let kind = match cfg {
            HandlerConfig::Proxy { host, .. } => {
                HandlerKind::Proxy(ProxyRequestHandler::new(host, client)?)
            }
            HandlerConfig::Static { location, .. } => HandlerKind::Static(StaticFileHandler::new(
                Arc::new(FolderLocation::new(location)?),
            )),
            HandlerConfig::Missing { .. } => HandlerKind::Missing,
        };

        let mut middlewares = build_middlewares(cfg.middlewares())?;
        middlewares.extend(build_middlewares(extra)?);
        Ok(Self::new(kind, middlewares))
    }

    pub fn kind(&self) -> &HandlerKind {
        &self.kind
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            HandlerKind::Proxy(_) => "proxy",
            HandlerKind::Static(_) => "static",
            HandlerKind::Missing => "missing",
        }
    }

    pub fn middlewares(&self) -> &[Middleware] {
        &self.middlewares
    }

    pub async fn handle_request(&self, req: ProcessingRequest) -> Response {
        self.handle(req).await.response
    }

    /// Run the pipeline:
    /// 1. request phase, in order, until a middleware answers;
    /// 2. the core operation, unless a middleware answered;
    /// 3. response phase, in order, over every middleware.
    pub async fn handle(&self, mut req: ProcessingRequest) -> Handled {
        let mut answered_by = None;
        let mut answer = None;
        let mut carries: Vec<Carry> = self.middlewares.iter().map(|_| Carry::default()).collect();
        for (mw, carry) in self.middlewares.iter().zip(carries.iter_mut()) {
            if let Flow::Answer(resp) = mw.process_request(&mut req, carry).await {
                answered_by = Some(mw.name());
                answer = Some(resp);
                break;
            }
        }

        let mut response = match answer {
            Some(resp) => resp,
            None => self.process(&req).await,
        };

        for (mw, carry) in self.middlewares.iter().zip(&carries) {
            mw.process_response(&req, carry, &mut response).await;
        }

        Handled {
            response,
            answered_by,
        }
    }

    async fn process(&self, req: &ProcessingRequest) -> Response {
        match &self.kind {
            HandlerKind::Proxy(h) => h.process(req).await,
            HandlerKind::Static(h) => h.process(req).await,
            HandlerKind::Missing => missing::process(req),
        }
    }
}
