use crate::message::ProcessingRequest;
use http::Method;
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Longest path segment kept verbatim in the partition directory.
const MAX_SEGMENT_LEN: usize = 100;
const MAX_EXT_LEN: usize = 8;
const DEFAULT_EXT: &str = "bin";

/// Deterministic identity of a cacheable request.
///
/// The digest covers method, normalized path and query. Artifacts live under
/// `<path segments>/<METHOD>/`, so a GET and a POST to the same URL never
/// share a slot even before the digest is compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    method: String,
    path: String,
    query: String,
    digest: String,
    extension: String,
}

impl CacheKey {
    pub fn new(method: &Method, path: &str, query: &str) -> Self {
        let method = method.as_str().to_ascii_uppercase();
        let path = normalize_path(path);

        let mut hasher = Sha256::new();
        hasher.update(method.as_bytes());
        hasher.update(b"\n");
        hasher.update(path.as_bytes());
        hasher.update(b"\n");
        hasher.update(query.as_bytes());
        let digest = format!("{:x}", hasher.finalize());

        let extension = extension_of(&path);
        Self {
            method,
            path,
            query: query.to_string(),
            digest,
            extension,
        }
    }

    pub fn for_request(req: &ProcessingRequest) -> Self {
        Self::new(req.method(), req.path(), req.query())
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Normalized request path, always starting with `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Hex SHA-256 of the request identity.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Directory of this entry relative to the cache root.
    pub fn partition(&self) -> PathBuf {
        let mut dir = PathBuf::new();
        let segments: Vec<&str> = self.path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            dir.push("_root");
        } else {
            for segment in segments {
                dir.push(sanitize_segment(segment));
            }
        }
        dir.push(sanitize_segment(&self.method));
        dir
    }

    pub fn body_file_name(&self) -> String {
        format!("{}.body.{}", self.digest, self.extension)
    }

    pub fn meta_file_name(&self) -> String {
        format!("{}.meta.json", self.digest)
    }
}

/// Collapse empty and `.` segments and resolve `..` lexically, never above root.
fn normalize_path(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            s => out.push(s),
        }
    }
    format!("/{}", out.join("/"))
}

/// Keep filesystem-safe characters; everything else becomes `_`.
fn sanitize_segment(segment: &str) -> String {
    let mut cleaned: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~' | '%') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_SEGMENT_LEN)
        .collect();
    if cleaned.chars().all(|c| c == '.') {
        cleaned = "_".repeat(cleaned.len().max(1));
    }
    cleaned
}

fn extension_of(path: &str) -> String {
    let last = path.rsplit('/').next().unwrap_or("");
    match last.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.len() <= MAX_EXT_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_ascii_lowercase()
        }
        _ => DEFAULT_EXT.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn digest_is_deterministic() {
        let a = CacheKey::new(&Method::GET, "/persons", "page=1");
        let b = CacheKey::new(&Method::GET, "/persons", "page=1");
        assert_eq!(a, b);
        assert_eq!(a.digest().len(), 64);
    }

    #[test]
    fn query_changes_digest() {
        let a = CacheKey::new(&Method::GET, "/persons", "page=1");
        let b = CacheKey::new(&Method::GET, "/persons", "page=2");
        assert_ne!(a.digest(), b.digest());
        assert_eq!(a.partition(), b.partition());
    }

    #[test]
    fn methods_are_isolated() {
        let get = CacheKey::new(&Method::GET, "/persons", "");
        let post = CacheKey::new(&Method::POST, "/persons", "");
        assert_ne!(get.digest(), post.digest());
        assert_ne!(get.partition(), post.partition());
        assert_eq!(get.partition(), Path::new("persons/GET"));
        assert_eq!(post.partition(), Path::new("persons/POST"));
    }

    #[test]
    fn equivalent_paths_share_a_key() {
        let a = CacheKey::new(&Method::GET, "/a//b/./c", "");
        let b = CacheKey::new(&Method::GET, "/a/b/c/", "");
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.path(), "/a/b/c");
    }

    #[test]
    fn root_partition() {
        let key = CacheKey::new(&Method::GET, "/", "");
        assert_eq!(key.partition(), Path::new("_root/GET"));
    }

    #[test]
    fn dot_dot_never_escapes_the_cache_root() {
        let key = CacheKey::new(&Method::GET, "/../../etc/passwd", "");
        assert_eq!(key.path(), "/etc/passwd");
        assert_eq!(key.partition(), Path::new("etc/passwd/GET"));
    }

    #[test]
    fn unsafe_characters_are_replaced() {
        let key = CacheKey::new(&Method::GET, "/a b/c:d", "");
        assert_eq!(key.partition(), Path::new("a_b/c_d/GET"));
    }

    #[test]
    fn file_names() {
        let key = CacheKey::new(&Method::GET, "/assets/app.JS", "v=3");
        assert_eq!(key.body_file_name(), format!("{}.body.js", key.digest()));
        assert_eq!(key.meta_file_name(), format!("{}.meta.json", key.digest()));

        let key = CacheKey::new(&Method::GET, "/persons", "");
        assert!(key.body_file_name().ends_with(".body.bin"));

        let key = CacheKey::new(&Method::GET, "/.hidden", "");
        assert!(key.body_file_name().ends_with(".body.bin"));
    }

    #[test]
    fn method_is_uppercased() {
        let m = Method::from_bytes(b"get").unwrap();
        let key = CacheKey::new(&m, "/x", "");
        assert_eq!(key.method(), "GET");
    }
}
