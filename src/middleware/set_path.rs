use crate::error::{GatewayError, Result};
use crate::message::ProcessingRequest;

pub fn compile_path(path: &str) -> Result<String> {
    let path = path.trim();
    if path.is_empty() {
        return Err(GatewayError::Config("set_path: path must not be empty".into()));
    }
    if path.contains('?') {
        return Err(GatewayError::Config(format!(
            "set_path: '{}' must not carry a query string",
            path
        )));
    }
    if path.starts_with('/') {
        Ok(path.to_string())
    } else {
        Ok(format!("/{}", path))
    }
}

/// Overwrite the request path. The query string is left as is.
pub fn set_path_on_request(path: &str, req: &mut ProcessingRequest) {
    tracing::trace!("middleware: set_path: {} -> {}", req.path(), path);
    req.set_path(path);
}
