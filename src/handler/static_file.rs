use crate::error::GatewayError;
use crate::files::{File, FolderLocation, ResponseContent};
use crate::message::{ProcessingRequest, Response};
use std::sync::Arc;

/// Serves files below a folder. Traversal attempts answer 403, anything that
/// is not an existing regular file answers 404.
#[derive(Debug)]
pub struct StaticFileHandler {
    location: Arc<FolderLocation>,
}

impl StaticFileHandler {
    pub fn new(location: Arc<FolderLocation>) -> Self {
        Self { location }
    }

    pub fn location(&self) -> &FolderLocation {
        &self.location
    }

    pub async fn process(&self, req: &ProcessingRequest) -> Response {
        let origin = req.origin();
        let file = File::new(req.path(), self.location.clone());

        let outcome = match file.check().await {
            Ok(true) => file.to_response(origin.clone()).await,
            Ok(false) => Err(GatewayError::NotFound(req.path().to_string())),
            Err(e) => Err(e),
        };

        let (result, resp) = match outcome {
            Ok(resp) => ("served", resp),
            Err(GatewayError::InvalidPath(path)) => {
                tracing::warn!("handler: static: rejected path, path={}", path);
                ("forbidden", Response::forbidden())
            }
            Err(GatewayError::NotFound(_)) => ("missing", Response::not_found()),
            Err(e) => {
                tracing::error!(
                    "handler: static: read failed, path={}, error={}",
                    req.path(),
                    e
                );
                ("failed", Response::from_error(&e))
            }
        };

        metrics::counter!("tent_static_files_total", "result" => result).increment(1);
        resp.with_request(origin)
    }
}
