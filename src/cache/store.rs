use crate::cache::CacheKey;
use crate::error::{GatewayError, Result};
use crate::files::{FolderLocation, ResponseContent};
use crate::message::{headers, ProcessingRequest, Response};
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// A body file without metadata younger than this belongs to a writer that
/// is still publishing. Older ones are left over from an interrupted store.
const ORPHAN_GRACE: Duration = Duration::from_secs(30);

/// On-disk metadata document stored next to each cached body.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheMeta {
    #[serde(default)]
    headers: Vec<String>,
    #[serde(rename = "httpCode", default = "default_http_code")]
    http_code: u16,
}

impl Default for CacheMeta {
    fn default() -> Self {
        Self {
            headers: Vec::new(),
            http_code: default_http_code(),
        }
    }
}

fn default_http_code() -> u16 {
    200
}

/// One cache slot: a request identity bound to a cache directory.
///
/// Entries are write-once. [`FileCache::store`] never replaces an existing
/// body or metadata file, and an entry only [`exists`](ResponseContent::exists)
/// once both files are in place.
pub struct FileCache {
    key: CacheKey,
    location: Arc<FolderLocation>,
    content: OnceCell<Bytes>,
    meta: OnceCell<CacheMeta>,
}

impl FileCache {
    pub fn new(key: CacheKey, location: Arc<FolderLocation>) -> Self {
        Self {
            key,
            location,
            content: OnceCell::new(),
            meta: OnceCell::new(),
        }
    }

    pub fn for_request(req: &ProcessingRequest, location: Arc<FolderLocation>) -> Self {
        Self::new(CacheKey::for_request(req), location)
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn dir(&self) -> PathBuf {
        self.location.join(self.key.partition())
    }

    pub fn body_path(&self) -> PathBuf {
        self.dir().join(self.key.body_file_name())
    }

    pub fn meta_path(&self) -> PathBuf {
        self.dir().join(self.key.meta_file_name())
    }

    /// Persist `response` unless an entry is already present.
    ///
    /// Returns `Ok(true)` when this call published the entry and `Ok(false)`
    /// when another writer got there first. Concurrent writers race on
    /// `hard_link`, which refuses to replace an existing target. The metadata
    /// file commits the entry: once it exists every later store is a no-op.
    pub async fn store(&self, response: &Response) -> Result<bool> {
        let dir = self.dir();
        tokio::fs::create_dir_all(&dir).await?;

        let body_path = self.body_path();
        let meta_path = self.meta_path();
        if path_exists(&meta_path).await {
            return Ok(false);
        }
        if !self.reclaim_orphan_body(&body_path).await? {
            return Ok(false);
        }

        let nonce: u64 = rand::random();
        let body_tmp = dir.join(format!(".{}.body.{:016x}.tmp", self.key.digest(), nonce));
        let meta_tmp = dir.join(format!(".{}.meta.{:016x}.tmp", self.key.digest(), nonce));

        let result = self
            .publish(response, &body_tmp, &meta_tmp, &body_path, &meta_path)
            .await;

        let _ = tokio::fs::remove_file(&body_tmp).await;
        let _ = tokio::fs::remove_file(&meta_tmp).await;

        if let Ok(true) = result {
            tracing::debug!(
                "cache: stored entry, key={}, path={}, status={}",
                self.key.digest(),
                self.key.path(),
                response.status().as_u16()
            );
        }
        result
    }

    async fn publish(
        &self,
        response: &Response,
        body_tmp: &Path,
        meta_tmp: &Path,
        body_path: &Path,
        meta_path: &Path,
    ) -> Result<bool> {
        let meta = CacheMeta {
            headers: headers::to_lines(response.headers()),
            http_code: response.status().as_u16(),
        };
        let meta_json = serde_json::to_vec(&meta)
            .map_err(|e| GatewayError::Internal(format!("encode cache metadata: {}", e)))?;

        tokio::fs::write(body_tmp, response.body()).await?;
        tokio::fs::write(meta_tmp, &meta_json).await?;

        // Body first, metadata last: readers treat a body without metadata as absent.
        match tokio::fs::hard_link(body_tmp, body_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(e.into()),
        }

        match tokio::fs::hard_link(meta_tmp, meta_path).await {
            Ok(()) => Ok(true),
            Err(e) => {
                let _ = tokio::fs::remove_file(body_path).await;
                if e.kind() == ErrorKind::AlreadyExists {
                    Ok(false)
                } else {
                    Err(e.into())
                }
            }
        }
    }

    /// Clear a body file left without metadata by an interrupted store.
    /// Returns whether the body slot is free for this writer.
    async fn reclaim_orphan_body(&self, body_path: &Path) -> Result<bool> {
        let meta = match tokio::fs::metadata(body_path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(e.into()),
        };
        let age = meta
            .modified()
            .ok()
            .and_then(|t| t.elapsed().ok())
            .unwrap_or_default();
        if age < ORPHAN_GRACE {
            return Ok(false);
        }

        tracing::warn!(
            "cache: removing body without metadata, path={}, age_secs={}",
            body_path.display(),
            age.as_secs()
        );
        match tokio::fs::remove_file(body_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete both artifacts. Returns whether anything was removed.
    pub async fn remove(&self) -> Result<bool> {
        let mut removed = false;
        for path in [self.meta_path(), self.body_path()] {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed = true,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }

    async fn meta(&self) -> &CacheMeta {
        self.meta
            .get_or_init(|| async {
                let path = self.meta_path();
                let raw = match tokio::fs::read(&path).await {
                    Ok(raw) => raw,
                    Err(e) => {
                        tracing::debug!(
                            "cache: metadata unavailable, path={}, error={}",
                            path.display(),
                            e
                        );
                        return CacheMeta::default();
                    }
                };
                match serde_json::from_slice::<CacheMeta>(&raw) {
                    Ok(meta) => meta,
                    Err(e) => {
                        tracing::warn!(
                            "cache: corrupt metadata, using defaults, path={}, error={}",
                            path.display(),
                            e
                        );
                        CacheMeta::default()
                    }
                }
            })
            .await
    }
}

#[async_trait]
impl ResponseContent for FileCache {
    async fn exists(&self) -> bool {
        tokio::fs::File::open(self.body_path()).await.is_ok()
            && tokio::fs::File::open(self.meta_path()).await.is_ok()
    }

    async fn content(&self) -> Result<Bytes> {
        self.content
            .get_or_try_init(|| async {
                match tokio::fs::read(self.body_path()).await {
                    Ok(bytes) => Ok(Bytes::from(bytes)),
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        Err(GatewayError::NotFound(self.key.path().to_string()))
                    }
                    Err(e) => Err(GatewayError::Io(e)),
                }
            })
            .await
            .cloned()
    }

    async fn headers(&self) -> HeaderMap {
        headers::parse_lines(&self.meta().await.headers)
    }

    async fn http_code(&self) -> StatusCode {
        StatusCode::from_u16(self.meta().await.http_code).unwrap_or(StatusCode::OK)
    }
}

async fn path_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Request;
    use http::header::CONTENT_TYPE;
    use http::{HeaderValue, Method};

    fn location() -> (tempfile::TempDir, Arc<FolderLocation>) {
        let dir = tempfile::tempdir().unwrap();
        let loc = Arc::new(FolderLocation::new(dir.path()).unwrap());
        (dir, loc)
    }

    fn json_response(status: StatusCode, body: &'static str) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Response::new(status, headers, body)
    }

    fn cache(loc: &Arc<FolderLocation>, method: Method, target: &str) -> FileCache {
        let req = ProcessingRequest::new(Arc::new(Request::from_target(method, target)));
        FileCache::for_request(&req, loc.clone())
    }

    #[tokio::test]
    async fn store_then_read() {
        let (_dir, loc) = location();
        let entry = cache(&loc, Method::GET, "/persons?page=1");
        assert!(!entry.exists().await);

        let stored = entry
            .store(&json_response(StatusCode::OK, r#"{"a":1}"#))
            .await
            .unwrap();
        assert!(stored);

        let fresh = cache(&loc, Method::GET, "/persons?page=1");
        assert!(fresh.exists().await);
        assert_eq!(fresh.content().await.unwrap().as_ref(), br#"{"a":1}"#);
        assert_eq!(fresh.http_code().await, StatusCode::OK);
        assert_eq!(
            fresh.headers().await.get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[tokio::test]
    async fn layout_on_disk() {
        let (dir, loc) = location();
        let entry = cache(&loc, Method::GET, "/persons");
        entry
            .store(&json_response(StatusCode::CREATED, "[]"))
            .await
            .unwrap();

        let partition = dir.path().join("persons").join("GET");
        assert_eq!(entry.dir(), partition);
        assert!(entry.body_path().starts_with(&partition));

        let raw = std::fs::read_to_string(entry.meta_path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["httpCode"], 201);
        assert_eq!(json["headers"][0], "Content-Type: application/json");

        // Temporary files are cleaned up.
        let leftovers: Vec<_> = std::fs::read_dir(&partition)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn write_once() {
        let (_dir, loc) = location();
        let entry = cache(&loc, Method::GET, "/persons");
        assert!(entry
            .store(&json_response(StatusCode::OK, "first"))
            .await
            .unwrap());

        let again = cache(&loc, Method::GET, "/persons");
        let mut second = json_response(StatusCode::ACCEPTED, "second");
        second.set_header(
            http::HeaderName::from_static("x-extra"),
            HeaderValue::from_static("1"),
        );
        assert!(!again.store(&second).await.unwrap());

        let reader = cache(&loc, Method::GET, "/persons");
        assert_eq!(reader.content().await.unwrap().as_ref(), b"first");
        assert_eq!(reader.http_code().await, StatusCode::OK);
        assert!(reader.headers().await.get("x-extra").is_none());
    }

    #[tokio::test]
    async fn methods_do_not_share_entries() {
        let (_dir, loc) = location();
        let get = cache(&loc, Method::GET, "/persons?x=1");
        get.store(&json_response(StatusCode::OK, "get"))
            .await
            .unwrap();

        let post = cache(&loc, Method::POST, "/persons?x=1");
        assert!(!post.exists().await);
        assert_ne!(get.body_path(), post.body_path());
    }

    #[tokio::test]
    async fn body_without_metadata_is_not_an_entry() {
        let (_dir, loc) = location();
        let entry = cache(&loc, Method::GET, "/half");
        std::fs::create_dir_all(entry.dir()).unwrap();
        std::fs::write(entry.body_path(), "orphan").unwrap();
        assert!(!entry.exists().await);
    }

    fn age(path: &Path, by: Duration) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(std::time::SystemTime::now() - by).unwrap();
    }

    #[tokio::test]
    async fn stale_orphan_body_is_replaced() {
        let (_dir, loc) = location();
        let entry = cache(&loc, Method::GET, "/half");
        std::fs::create_dir_all(entry.dir()).unwrap();
        std::fs::write(entry.body_path(), "orphan").unwrap();
        age(&entry.body_path(), ORPHAN_GRACE * 2);

        assert!(entry
            .store(&json_response(StatusCode::OK, "fresh"))
            .await
            .unwrap());

        let reader = cache(&loc, Method::GET, "/half");
        assert!(reader.exists().await);
        assert_eq!(reader.content().await.unwrap().as_ref(), b"fresh");
        assert_eq!(
            reader.headers().await.get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[tokio::test]
    async fn recent_orphan_body_is_left_to_its_writer() {
        let (_dir, loc) = location();
        let entry = cache(&loc, Method::GET, "/inflight");
        std::fs::create_dir_all(entry.dir()).unwrap();
        std::fs::write(entry.body_path(), "inflight").unwrap();

        assert!(!entry
            .store(&json_response(StatusCode::OK, "other"))
            .await
            .unwrap());
        assert_eq!(std::fs::read(entry.body_path()).unwrap(), b"inflight");
    }

    #[tokio::test]
    async fn corrupt_metadata_degrades() {
        let (_dir, loc) = location();
        let entry = cache(&loc, Method::GET, "/broken");
        std::fs::create_dir_all(entry.dir()).unwrap();
        std::fs::write(entry.body_path(), "payload").unwrap();
        std::fs::write(entry.meta_path(), "{not json").unwrap();

        assert!(entry.exists().await);
        assert!(entry.headers().await.is_empty());
        assert_eq!(entry.http_code().await, StatusCode::OK);
        assert_eq!(entry.content().await.unwrap().as_ref(), b"payload");
    }

    #[tokio::test]
    async fn missing_metadata_degrades() {
        let (_dir, loc) = location();
        let entry = cache(&loc, Method::GET, "/nometa");
        assert!(entry.headers().await.is_empty());
        assert_eq!(entry.http_code().await, StatusCode::OK);
        assert!(matches!(
            entry.content().await,
            Err(GatewayError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn remove_clears_entry() {
        let (_dir, loc) = location();
        let entry = cache(&loc, Method::GET, "/gone");
        entry
            .store(&json_response(StatusCode::OK, "x"))
            .await
            .unwrap();
        assert!(entry.remove().await.unwrap());
        assert!(!entry.exists().await);
        assert!(!entry.remove().await.unwrap());

        let again = cache(&loc, Method::GET, "/gone");
        assert!(again
            .store(&json_response(StatusCode::OK, "y"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn concurrent_writers_publish_one_entry() {
        let (_dir, loc) = location();
        let mut tasks = Vec::new();
        for i in 0..16 {
            let loc = loc.clone();
            tasks.push(tokio::spawn(async move {
                let entry = cache(&loc, Method::GET, "/race");
                let resp = Response::new(StatusCode::OK, HeaderMap::new(), format!("body-{}", i));
                entry.store(&resp).await.unwrap()
            }));
        }
        let mut winners = 0;
        for t in tasks {
            if t.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);

        let reader = cache(&loc, Method::GET, "/race");
        assert!(reader.exists().await);
        let body = reader.content().await.unwrap();
        assert!(body.starts_with(b"body-"));
    }
}
