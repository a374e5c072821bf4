use crate::message::{ProcessingRequest, Response};

/// Fixed `404 Not Found`, plain text.
pub fn process(req: &ProcessingRequest) -> Response {
    tracing::debug!("handler: missing, method={}, path={}", req.method(), req.path());
    Response::not_found().with_request(req.origin())
}
