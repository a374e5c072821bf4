use crate::error::{GatewayError, Result};
use crate::files::FolderLocation;
use percent_encoding::percent_decode_str;
use std::path::PathBuf;

/// Maps request paths onto a [`FolderLocation`] without letting them escape it.
///
/// Validation happens in two steps. [`validate`](Self::validate) is purely
/// lexical and never touches the filesystem; [`resolve`](Self::resolve)
/// additionally canonicalizes the target so symlinks cannot leave the base.
pub struct RequestPathValidator<'a> {
    location: &'a FolderLocation,
}

impl<'a> RequestPathValidator<'a> {
    pub fn new(location: &'a FolderLocation) -> Self {
        Self { location }
    }

    pub fn validate(&self, request_path: &str) -> Result<PathBuf> {
        let decoded = percent_decode_str(request_path)
            .decode_utf8()
            .map_err(|_| GatewayError::InvalidPath(request_path.to_string()))?;

        if decoded.contains('\0') || decoded.contains('\\') {
            return Err(GatewayError::InvalidPath(request_path.to_string()));
        }

        let mut relative = PathBuf::new();
        for segment in decoded.split('/') {
            match segment {
                "" | "." => continue,
                ".." => return Err(GatewayError::InvalidPath(request_path.to_string())),
                s => relative.push(s),
            }
        }
        Ok(self.location.join(relative))
    }

    /// Validate, then confirm the canonical target stays under the base.
    pub async fn resolve(&self, request_path: &str) -> Result<PathBuf> {
        let candidate = self.validate(request_path)?;

        let canonical = tokio::fs::canonicalize(&candidate)
            .await
            .map_err(|_| GatewayError::NotFound(request_path.to_string()))?;
        let base = tokio::fs::canonicalize(self.location.path())
            .await
            .map_err(|_| GatewayError::NotFound(request_path.to_string()))?;

        if !canonical.starts_with(&base) {
            return Err(GatewayError::InvalidPath(request_path.to_string()));
        }
        Ok(canonical)
    }
}
