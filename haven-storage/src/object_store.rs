//! Object store gateway.
//!
//! Blobs are addressed by path-style public URLs `<endpoint>/<bucket>/<key>`.
//! Deletion parses that structure back and refuses URLs that do not belong
//! to the configured storage host.

use async_trait::async_trait;
use reqwest::Url;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use tokio::sync::Mutex;

use haven_core::ObjectStoreError;

#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Upload `bytes` and return the public URL of the new object.
    async fn put(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        name: &str,
    ) -> Result<String, ObjectStoreError>;

    /// Delete the object behind a public URL.
    async fn delete(&self, url: &str) -> Result<(), ObjectStoreError>;
}

/// Bucket and key decoded from a public object URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageUrl {
    pub bucket: String,
    pub key: String,
}

impl StorageUrl {
    /// Parse a public URL, requiring `expected_host` and at least a bucket
    /// and a key segment. The key is percent-decoded.
    pub fn parse(url: &str, expected_host: &str) -> Result<Self, ObjectStoreError> {
        let invalid = |reason: &str| ObjectStoreError::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        let parsed = Url::parse(url).map_err(|e| invalid(&e.to_string()))?;
        match parsed.host_str() {
            Some(host) if host.eq_ignore_ascii_case(expected_host) => {}
            Some(_) => return Err(invalid("host is not the storage host")),
            None => return Err(invalid("missing host")),
        }

        let segments: Vec<&str> = parsed
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();
        if segments.len() < 2 {
            return Err(invalid("expected /<bucket>/<key>"));
        }

        let bucket = segments[0].to_string();
        let raw_key = segments[1..].join("/");
        let key = urlencoding::decode(&raw_key)
            .map_err(|e| invalid(&e.to_string()))?
            .into_owned();

        Ok(Self { bucket, key })
    }
}

/// Object key for an upload: `<unix-millis>_<sanitised name>`.
pub fn object_key(millis: i64, original_name: &str) -> String {
    let base = original_name.rsplit(['/', '\\']).next().unwrap_or_default();
    let mut sanitised: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitised.trim_matches(['_', '.']).is_empty() {
        sanitised = "file".to_string();
    }
    format!("{}_{}", millis, sanitised)
}

/// Host portion of an endpoint URL, used to validate object URLs.
pub fn endpoint_host(endpoint: &str) -> Result<String, ObjectStoreError> {
    let parsed = Url::parse(endpoint).map_err(|e| ObjectStoreError::NotConfigured {
        reason: format!("invalid endpoint '{}': {}", endpoint, e),
    })?;
    parsed
        .host_str()
        .map(str::to_string)
        .ok_or_else(|| ObjectStoreError::NotConfigured {
            reason: format!("endpoint '{}' has no host", endpoint),
        })
}

// ============================================================================
// IN-MEMORY OBJECT STORE
// ============================================================================

/// Object store kept in memory, with failure injection for tests.
#[derive(Debug)]
pub struct InMemoryObjectStore {
    endpoint: String,
    host: String,
    bucket: String,
    objects: Mutex<HashMap<String, Vec<u8>>>,
    clock: AtomicI64,
    uploads_before_failure: AtomicUsize,
    fail_uploads: AtomicBool,
    fail_deletes: AtomicBool,
    delete_calls: AtomicUsize,
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new("https://storage.test", "haven")
    }
}

impl InMemoryObjectStore {
    pub fn new(endpoint: &str, bucket: &str) -> Self {
        let endpoint = endpoint.trim_end_matches('/').to_string();
        let host = endpoint_host(&endpoint).unwrap_or_default();
        Self {
            endpoint,
            host,
            bucket: bucket.to_string(),
            objects: Mutex::new(HashMap::new()),
            clock: AtomicI64::new(1_700_000_000_000),
            uploads_before_failure: AtomicUsize::new(usize::MAX),
            fail_uploads: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
            delete_calls: AtomicUsize::new(0),
        }
    }

    /// Let `n` more uploads succeed, then fail every upload.
    pub fn fail_uploads_after(&self, n: usize) {
        self.uploads_before_failure.store(n, Ordering::SeqCst);
        self.fail_uploads.store(true, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub async fn contains(&self, url: &str) -> bool {
        self.objects.lock().await.contains_key(url)
    }

    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of delete calls that reached the store, successful or not.
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(
        &self,
        bytes: Vec<u8>,
        _content_type: &str,
        name: &str,
    ) -> Result<String, ObjectStoreError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            let remaining = self.uploads_before_failure.load(Ordering::SeqCst);
            if remaining == 0 {
                return Err(ObjectStoreError::Upload {
                    name: name.to_string(),
                    reason: "injected upload failure".to_string(),
                });
            }
            self.uploads_before_failure
                .store(remaining - 1, Ordering::SeqCst);
        }

        let millis = self.clock.fetch_add(1, Ordering::SeqCst);
        let key = object_key(millis, name);
        let url = format!("{}/{}/{}", self.endpoint, self.bucket, key);
        self.objects.lock().await.insert(url.clone(), bytes);
        Ok(url)
    }

    async fn delete(&self, url: &str) -> Result<(), ObjectStoreError> {
        StorageUrl::parse(url, &self.host)?;
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Delete {
                url: url.to_string(),
                reason: "injected delete failure".to_string(),
            });
        }
        self.objects.lock().await.remove(url);
        Ok(())
    }
}
