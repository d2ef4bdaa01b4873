//! Whole-value key/blob persistence.
//!
//! A [`BlobStore`] knows nothing about transactions: it loads and saves one
//! opaque string per key. Readers get `None` for keys never written.

use async_trait::async_trait;
use dashmap::DashMap;
use redis::AsyncCommands;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Invalid store key: {0:?}")]
    InvalidKey(String),
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<String>, BlobStoreError>;

    async fn save(&self, key: &str, blob: String) -> Result<(), BlobStoreError>;
}

/// Process-local store, lost on restart.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<String, String>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn load(&self, key: &str) -> Result<Option<String>, BlobStoreError> {
        Ok(self.blobs.get(key).map(|entry| entry.value().clone()))
    }

    async fn save(&self, key: &str, blob: String) -> Result<(), BlobStoreError> {
        self.blobs.insert(key.to_string(), blob);
        Ok(())
    }
}

/// One `<key>.json` file per key under `dir`.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// crash mid-write leaves the previous blob intact.
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, BlobStoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(BlobStoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn load(&self, key: &str) -> Result<Option<String>, BlobStoreError> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, key: &str, blob: String) -> Result<(), BlobStoreError> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, blob.as_bytes()).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        Ok(())
    }
}

/// Plain `GET`/`SET` on a Redis key.
pub struct RedisBlobStore {
    connection: redis::aio::ConnectionManager,
}

impl RedisBlobStore {
    pub async fn connect(url: &str) -> Result<Self, BlobStoreError> {
        let client = redis::Client::open(url)?;
        let connection = redis::aio::ConnectionManager::new(client).await?;
        tracing::info!("Connected to Redis blob store");
        Ok(Self { connection })
    }
}

#[async_trait]
impl BlobStore for RedisBlobStore {
    async fn load(&self, key: &str) -> Result<Option<String>, BlobStoreError> {
        let mut connection = self.connection.clone();
        let blob: Option<String> = connection.get(key).await?;
        Ok(blob)
    }

    async fn save(&self, key: &str, blob: String) -> Result<(), BlobStoreError> {
        let mut connection = self.connection.clone();
        connection.set::<_, _, ()>(key, blob).await?;
        Ok(())
    }
}
