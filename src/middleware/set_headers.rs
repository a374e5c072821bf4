use crate::error::{GatewayError, Result};
use crate::message::ProcessingRequest;
use http::{HeaderName, HeaderValue};
use std::collections::BTreeMap;

/// Validate a configured header map into typed pairs.
pub fn compile_headers(headers: &BTreeMap<String, String>) -> Result<Vec<(HeaderName, HeaderValue)>> {
    headers
        .iter()
        .map(|(name, value)| {
            let name = HeaderName::from_bytes(name.trim().as_bytes())
                .map_err(|_| GatewayError::Config(format!("set_headers: invalid header name '{}'", name)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| GatewayError::Config(format!("set_headers: invalid value for '{}'", name)))?;
            Ok((name, value))
        })
        .collect()
}

/// Insert or replace each configured header on the request.
pub fn set_headers_on_request(headers: &[(HeaderName, HeaderValue)], req: &mut ProcessingRequest) {
    for (name, value) in headers {
        req.set_header(name.clone(), value.clone());
    }
    tracing::trace!("middleware: set_headers: applied, count={}", headers.len());
}
