use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("blob io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid blob key `{0}`")]
    InvalidKey(String),
}

/// Keyed binary object storage for quote documents.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), BlobStoreError>;

    /// `Ok(None)` when nothing is stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BlobStoreError>;
}

/// Keys are flat file names. Anything that could escape the root is refused.
pub fn validate_key(key: &str) -> Result<(), BlobStoreError> {
    let invalid = key.is_empty()
        || key.contains('/')
        || key.contains('\\')
        || key.contains("..")
        || key.chars().any(char::is_control);
    if invalid {
        return Err(BlobStoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Stores each blob as a file under `root`.
#[derive(Clone, Debug)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the root directory if needed.
    pub async fn ensure_root(&self) -> Result<(), BlobStoreError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, BlobStoreError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, bytes: &[u8], _content_type: &str) -> Result<(), BlobStoreError> {
        let path = self.path_for(key)?;
        self.ensure_root().await?;

        // Write then rename so readers never observe a partial file.
        let staging = self.root.join(format!(".{key}.partial"));
        tokio::fs::write(&staging, bytes).await?;
        tokio::fs::rename(&staging, &path).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BlobStoreError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, key: &str, bytes: &[u8], _content_type: &str) -> Result<(), BlobStoreError> {
        validate_key(key)?;
        self.blobs.write().await.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BlobStoreError> {
        validate_key(key)?;
        Ok(self.blobs.read().await.get(key).cloned())
    }
}
