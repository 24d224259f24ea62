//! Filesystem blob storage
//!
//! Stores blobs as plain files, one subdirectory per container:
//! "<root>/<container>/<key>". Objects are addressed through a public base
//! URL under which the HTTP server exposes the root directory.
//!
//! Example: key "1b4e...d2.png" in container "images" is stored at
//! "<root>/images/1b4e...d2.png" and served as "<base>/images/1b4e...d2.png".

use crate::error::{AppError, Result};
use crate::storage::{object_url, BlobStorage};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Directory-backed blob store
#[derive(Clone)]
pub struct BlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl BlobStore {
    /// Create a new blob store at the given root directory
    pub fn new(root: PathBuf, public_base_url: impl Into<String>) -> Self {
        Self {
            root,
            public_base_url: public_base_url.into(),
        }
    }

    /// Initialize the blob store (create directory if needed)
    pub async fn initialize(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        tracing::info!("Blob store initialized at: {:?}", self.root);
        Ok(())
    }

    /// Write data under a key, replacing any previous object
    pub async fn write(&self, container: &str, key: &str, data: &[u8]) -> Result<PathBuf> {
        let path = self.get_path(container, key)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write to temp file first (atomic write)
        let temp_path = path.with_file_name(format!(".{}.tmp", key));
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;

        // Rename to final location
        fs::rename(temp_path, &path).await?;

        tracing::debug!("Wrote blob: {}/{} ({} bytes)", container, key, data.len());

        Ok(path)
    }

    /// Read data from blob store
    pub async fn read(&self, container: &str, key: &str) -> Result<Vec<u8>> {
        let path = self.get_path(container, key)?;

        if !path.exists() {
            return Err(AppError::Storage(format!(
                "Blob not found: {}/{}",
                container, key
            )));
        }

        let mut file = fs::File::open(&path).await?;
        let mut data = Vec::new();
        file.read_to_end(&mut data).await?;

        tracing::debug!("Read blob: {}/{} ({} bytes)", container, key, data.len());

        Ok(data)
    }

    /// Check if a blob exists
    pub async fn exists(&self, container: &str, key: &str) -> Result<bool> {
        let path = self.get_path(container, key)?;
        Ok(path.exists())
    }

    /// Public URL of an object
    pub fn url_for(&self, container: &str, key: &str) -> String {
        object_url(&self.public_base_url, container, key)
    }

    /// Resolve the file path of an object, rejecting anything that would
    /// escape its container directory
    fn get_path(&self, container: &str, key: &str) -> Result<PathBuf> {
        validate_segment(container)?;
        validate_segment(key)?;
        Ok(self.root.join(container).join(key))
    }

    /// Get blob store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\', '\0'])
    {
        return Err(AppError::Storage(format!(
            "Invalid blob path segment: {:?}",
            segment
        )));
    }
    Ok(())
}

#[async_trait]
impl BlobStorage for BlobStore {
    async fn ensure_container(&self, container: &str) -> Result<()> {
        validate_segment(container)?;
        fs::create_dir_all(self.root.join(container)).await?;
        Ok(())
    }

    async fn upload(
        &self,
        container: &str,
        key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> Result<String> {
        self.write(container, key, &data).await?;
        Ok(self.url_for(container, key))
    }
}
