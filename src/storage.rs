//! Storage locations (S3 or local filesystem)
//!
//! Both the input root and the output root are addressed by URL. A
//! `StorageLocation` pairs an `ObjectStore` with the key prefix the URL
//! points at, so callers only deal in keys relative to that root.

use crate::config::Credentials;
use crate::error::{Error, Result};
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectMeta, ObjectStore};
use std::fmt;
use std::sync::Arc;

/// An object store plus the prefix a URL resolved to
#[derive(Clone)]
pub struct StorageLocation {
    /// The object store implementation
    store: Arc<dyn ObjectStore>,
    /// Base path prefix within the bucket (no leading or trailing slash)
    prefix: String,
    /// Original URL scheme for logging
    scheme: String,
}

impl fmt::Debug for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageLocation")
            .field("scheme", &self.scheme)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl StorageLocation {
    /// Resolve a location that must already exist (an input root)
    ///
    /// Supported formats:
    /// - `s3://bucket/path/` - AWS S3 (or a compatible endpoint)
    /// - `/local/path/`, `./path/` or `file:///path/` - Local filesystem
    pub fn open(url: &str, credentials: &Credentials) -> Result<Self> {
        if url.starts_with("s3://") || url.starts_with("s3a://") {
            Self::parse_s3(url, credentials)
        } else {
            Self::parse_local(url, false)
        }
    }

    /// Resolve a location that may be created on demand (an output root)
    pub fn create(url: &str, credentials: &Credentials) -> Result<Self> {
        if url.starts_with("s3://") || url.starts_with("s3a://") {
            Self::parse_s3(url, credentials)
        } else {
            Self::parse_local(url, true)
        }
    }

    /// Wrap an existing store, e.g. `object_store::memory::InMemory`
    pub fn from_store(store: Arc<dyn ObjectStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into().trim_matches('/').to_string(),
            scheme: "memory".to_string(),
        }
    }

    /// Parse an S3 URL, authenticating with explicit credentials
    fn parse_s3(url: &str, credentials: &Credentials) -> Result<Self> {
        let without_scheme = url
            .strip_prefix("s3://")
            .or_else(|| url.strip_prefix("s3a://"))
            .ok_or_else(|| Error::config(format!("Invalid s3 URL: {url}")))?;

        let (bucket, prefix) = match without_scheme.find('/') {
            Some(idx) => (
                &without_scheme[..idx],
                without_scheme[idx + 1..].trim_matches('/').to_string(),
            ),
            None => (without_scheme, String::new()),
        };
        if bucket.is_empty() {
            return Err(Error::config(format!("Missing bucket in s3 URL: {url}")));
        }

        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(bucket)
            .with_region(&credentials.region)
            .with_access_key_id(&credentials.access_key_id)
            .with_secret_access_key(&credentials.secret_access_key);

        if let Some(endpoint) = &credentials.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }

        let store = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to create s3 client: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            prefix,
            scheme: "s3".to_string(),
        })
    }

    /// Parse local filesystem path
    fn parse_local(path: &str, create_missing: bool) -> Result<Self> {
        let path = path.strip_prefix("file://").unwrap_or(path);

        if create_missing {
            std::fs::create_dir_all(path)
                .map_err(|e| Error::config(format!("Failed to create directory {path}: {e}")))?;
        } else if !std::path::Path::new(path).is_dir() {
            return Err(Error::source_read(path, "directory does not exist"));
        }

        let store = LocalFileSystem::new_with_prefix(path)
            .map_err(|e| Error::config(format!("Failed to create local store: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            prefix: String::new(),
            scheme: "file".to_string(),
        })
    }

    /// Check if this is a cloud location (not local)
    pub fn is_cloud(&self) -> bool {
        self.scheme == "s3"
    }

    /// Get the scheme (s3, file, memory)
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Absolute store key for a key relative to this location
    ///
    /// Keys that are already valid store paths (including percent-escaped
    /// partition values) are taken as-is; anything else is encoded.
    pub fn key(&self, relative: &str) -> ObjectPath {
        let relative = relative.trim_matches('/');
        let joined = match (self.prefix.is_empty(), relative.is_empty()) {
            (true, _) => relative.to_string(),
            (false, true) => self.prefix.clone(),
            (false, false) => format!("{}/{relative}", self.prefix),
        };
        ObjectPath::parse(&joined).unwrap_or_else(|_| ObjectPath::from(joined))
    }

    /// Strip this location's prefix from an absolute store key
    pub fn relative(&self, path: &ObjectPath) -> String {
        let full = path.as_ref();
        if self.prefix.is_empty() {
            return full.to_string();
        }
        full.strip_prefix(self.prefix.as_str())
            .map_or(full, |rest| rest.trim_start_matches('/'))
            .to_string()
    }

    /// Display form of a relative key, for logs and summaries
    pub fn display_key(&self, relative: &str) -> String {
        format!("{}://{}", self.scheme, self.key(relative))
    }

    /// Recursively list every object under a relative prefix
    pub async fn list(&self, relative_prefix: &str) -> Result<Vec<ObjectMeta>> {
        let prefix = self.key(relative_prefix);
        let prefix = (!prefix.as_ref().is_empty()).then_some(prefix);
        let objects: Vec<ObjectMeta> = self.store.list(prefix.as_ref()).try_collect().await?;
        Ok(objects)
    }

    /// Read a whole object
    pub async fn get(&self, relative: &str) -> Result<Bytes> {
        let result = self.store.get(&self.key(relative)).await?;
        Ok(result.bytes().await?)
    }

    /// Write a whole object, replacing any existing one
    pub async fn put(&self, relative: &str, data: Bytes) -> Result<String> {
        let path = self.key(relative);
        self.store.put(&path, data.into()).await?;
        Ok(format!("{}://{path}", self.scheme))
    }

    /// Delete every object under a relative prefix, returning how many went
    pub async fn delete_prefix(&self, relative_prefix: &str) -> Result<usize> {
        let objects = self.list(relative_prefix).await?;
        for meta in &objects {
            self.store.delete(&meta.location).await?;
        }
        Ok(objects.len())
    }
}
