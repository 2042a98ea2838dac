//! Image object storage
//!
//! [`ImageStore`] hides the bucket behind two calls: `get` (body + metadata)
//! and `head` (metadata only). [`S3ImageStore`] is the production backend,
//! [`MemoryImageStore`] serves tests.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use axum::body::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Object metadata returned by both `get` and `head`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageMeta {
    pub etag: Option<String>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    /// Unix seconds
    pub last_modified: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct StoredImage {
    pub meta: ImageMeta,
    pub body: Bytes,
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// `Ok(None)` when the object does not exist
    async fn get(&self, key: &str) -> Result<Option<StoredImage>, StorageError>;

    async fn head(&self, key: &str) -> Result<Option<ImageMeta>, StorageError>;
}

/// S3 bucket (optionally under a key prefix)
pub struct S3ImageStore {
    client: S3Client,
    bucket: String,
    prefix: String,
}

impl S3ImageStore {
    pub fn new(client: S3Client, bucket: impl Into<String>, prefix: &str) -> Self {
        let prefix = prefix.trim_matches('/');
        Self {
            client,
            bucket: bucket.into(),
            prefix: if prefix.is_empty() {
                String::new()
            } else {
                format!("{prefix}/")
            },
        }
    }

    fn object_key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn get(&self, key: &str) -> Result<Option<StoredImage>, StorageError> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(self.object_key(key))
            .send()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_no_such_key()) =>
            {
                return Ok(None);
            }
            Err(err) => return Err(StorageError::Backend(err.to_string())),
        };

        let meta = ImageMeta {
            etag: output.e_tag().map(String::from),
            content_type: output.content_type().map(String::from),
            content_length: output.content_length().and_then(|l| u64::try_from(l).ok()),
            last_modified: output.last_modified().map(|t| t.secs()),
        };
        let body = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?
            .into_bytes();

        Ok(Some(StoredImage { meta, body }))
    }

    async fn head(&self, key: &str) -> Result<Option<ImageMeta>, StorageError> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(self.object_key(key))
            .send()
            .await;

        match result {
            Ok(o) => Ok(Some(ImageMeta {
                etag: o.e_tag().map(String::from),
                content_type: o.content_type().map(String::from),
                content_length: o.content_length().and_then(|l| u64::try_from(l).ok()),
                last_modified: o.last_modified().map(|t| t.secs()),
            })),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(None),
            Err(err) => Err(StorageError::Backend(err.to_string())),
        }
    }
}

/// In-memory store keyed by object key
#[derive(Default)]
pub struct MemoryImageStore {
    objects: RwLock<HashMap<String, StoredImage>>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, body: impl Into<Bytes>, meta: ImageMeta) {
        let body = body.into();
        let meta = ImageMeta {
            content_length: Some(body.len() as u64),
            ..meta
        };
        if let Ok(mut objects) = self.objects.write() {
            objects.insert(key.to_string(), StoredImage { meta, body });
        }
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn get(&self, key: &str) -> Result<Option<StoredImage>, StorageError> {
        let objects = self
            .objects
            .read()
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(objects.get(key).cloned())
    }

    async fn head(&self, key: &str) -> Result<Option<ImageMeta>, StorageError> {
        Ok(self.get(key).await?.map(|o| o.meta))
    }
}
