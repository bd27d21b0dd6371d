use async_trait::async_trait;
use thiserror::Error;

use crate::clients::s3_client::S3Client;
use crate::config::Settings;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("object store error: {0}")]
    Remote(String),
}

/// Capability over the S3-compatible bucket. Tests substitute an in-memory
/// implementation.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        public: bool,
    ) -> Result<(), StorageError>;

    /// `Ok(None)` when the key does not exist.
    async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    fn object_url(&self, key: &str) -> String;
}

pub struct S3Storage {
    client: S3Client,
}

impl S3Storage {
    pub fn new(settings: &Settings) -> Self {
        Self {
            client: S3Client::new(settings),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Storage {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        public: bool,
    ) -> Result<(), StorageError> {
        self.client
            .put_object(key, bytes, content_type, public)
            .await
            .map_err(StorageError::Remote)
    }

    async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.client.get_object(key).await.map_err(StorageError::Remote)
    }

    fn object_url(&self, key: &str) -> String {
        self.client.object_url(key)
    }
}
