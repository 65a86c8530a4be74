// services/storage.rs - object storage collaborator used for avatars and thumbnails

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use url::Url;

use crate::config::StorageConfig;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid object key or bucket URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Object storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Object storage rejected {key} with status {status}")]
    Rejected { key: String, status: u16 },
}

/// Minimal object storage surface: upload bytes, mint a time-limited link
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError>;

    async fn share(&self, key: &str) -> Result<String, StorageError>;
}

pub fn avatar_key(display_name: &str) -> String {
    format!("avatars/{}", display_name)
}

pub fn thumbnail_key(identifier: &str) -> String {
    format!("thumbnails/{}", identifier)
}

/// Bucket exposed over plain HTTP. Shared links carry an `expires` hint that the
/// gateway in front of the bucket enforces.
pub struct PublicBucket {
    base: Url,
    share_ttl_secs: u64,
    client: reqwest::Client,
}

impl PublicBucket {
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let mut base = Url::parse(&config.bucket_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            base,
            share_ttl_secs: config.share_ttl_secs,
            client: reqwest::Client::new(),
        })
    }

    fn object_url(&self, key: &str) -> Result<Url, StorageError> {
        Ok(self.base.join(key)?)
    }
}

#[async_trait]
impl ObjectStore for PublicBucket {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        let url = self.object_url(key)?;
        let response = self.client.put(url).body(bytes).send().await?;
        if !response.status().is_success() {
            return Err(StorageError::Rejected {
                key: key.to_string(),
                status: response.status().as_u16(),
            });
        }
        tracing::debug!("Stored object {}", key);
        Ok(())
    }

    async fn share(&self, key: &str) -> Result<String, StorageError> {
        let mut url = self.object_url(key)?;
        let expires = chrono::Utc::now().timestamp() + self.share_ttl_secs as i64;
        url.query_pairs_mut().append_pair("expires", &expires.to_string());
        Ok(url.into())
    }
}

/// Object store kept entirely in memory, for tests and local runs
#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(key).cloned()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        self.objects.write().await.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn share(&self, key: &str) -> Result<String, StorageError> {
        Ok(format!("memory://objects/{}", key))
    }
}
