use crate::error::{GatewayError, Result};
use crate::files::{FolderLocation, RequestPathValidator, ResponseContent};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, StatusCode};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Types the generic guess reports as `text/plain` or
/// `application/octet-stream` but browsers need spelled out.
const MIME_OVERRIDES: &[(&str, &str)] = &[
    ("html", "text/html"),
    ("htm", "text/html"),
    ("js", "text/javascript"),
    ("mjs", "text/javascript"),
    ("css", "text/css"),
    ("json", "application/json"),
    ("map", "application/json"),
    ("svg", "image/svg+xml"),
    ("wasm", "application/wasm"),
    ("webmanifest", "application/manifest+json"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("ico", "image/x-icon"),
];

/// A file under a [`FolderLocation`], addressed by request path.
pub struct File {
    relative: String,
    location: Arc<FolderLocation>,
    resolved: OnceCell<Option<PathBuf>>,
    content: OnceCell<Bytes>,
}

impl File {
    pub fn new(relative: impl Into<String>, location: Arc<FolderLocation>) -> Self {
        Self {
            relative: relative.into(),
            location,
            resolved: OnceCell::new(),
            content: OnceCell::new(),
        }
    }

    pub fn relative_path(&self) -> &str {
        &self.relative
    }

    /// Lexically validated absolute path. Fails on traversal attempts.
    pub fn path(&self) -> Result<PathBuf> {
        RequestPathValidator::new(&self.location).validate(&self.relative)
    }

    pub fn mime_type(&self) -> String {
        mime_for(Path::new(&self.relative))
    }

    /// Canonical path of an existing regular file, if there is one.
    /// Rejected paths are reported as errors and not memoized.
    async fn resolved(&self) -> Result<Option<&PathBuf>> {
        let resolved = self
            .resolved
            .get_or_try_init(|| async {
                let validator = RequestPathValidator::new(&self.location);
                let path = match validator.resolve(&self.relative).await {
                    Ok(p) => p,
                    Err(GatewayError::NotFound(_)) => return Ok(None),
                    Err(e) => return Err(e),
                };
                match tokio::fs::metadata(&path).await {
                    Ok(meta) if meta.is_file() => Ok(Some(path)),
                    _ => Ok(None),
                }
            })
            .await?;
        Ok(resolved.as_ref())
    }

    /// Like [`ResponseContent::exists`] but distinguishes a rejected path.
    pub async fn check(&self) -> Result<bool> {
        Ok(self.resolved().await?.is_some())
    }
}

#[async_trait]
impl ResponseContent for File {
    async fn exists(&self) -> bool {
        matches!(self.check().await, Ok(true))
    }

    async fn content(&self) -> Result<Bytes> {
        let path = self
            .resolved()
            .await?
            .ok_or_else(|| GatewayError::NotFound(self.relative.clone()))?;
        self.content
            .get_or_try_init(|| async {
                let bytes = tokio::fs::read(path).await?;
                Ok::<_, GatewayError>(Bytes::from(bytes))
            })
            .await
            .cloned()
    }

    async fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(v) = HeaderValue::from_str(&self.mime_type()) {
            headers.insert(CONTENT_TYPE, v);
        }
        if let Ok(body) = self.content().await {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
        }
        headers
    }

    async fn http_code(&self) -> StatusCode {
        StatusCode::OK
    }
}

/// Extension-derived MIME type with the web-asset override table applied.
pub fn mime_for(path: &Path) -> String {
    let guess = mime_guess::from_path(path).first_or_octet_stream();
    let mut essence = guess.essence_str().to_string();

    if essence == "text/plain" || essence == "application/octet-stream" {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        if let Some(ext) = ext {
            if let Some((_, mime)) = MIME_OVERRIDES.iter().find(|(e, _)| *e == ext) {
                essence = (*mime).to_string();
            }
        }
    }

    if essence.starts_with("text/") || essence == "application/json" {
        format!("{}; charset=utf-8", essence)
    } else {
        essence
    }
}
