use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;

use super::{is_safe_path, join_path, url_for, BlobStorage};
use crate::errors::ServiceError;

/// Files under a local root directory, served publicly under `public_url_prefix`.
#[derive(Clone)]
pub struct LocalDiskStorage {
    root: PathBuf,
    public_url_prefix: String,
}

impl LocalDiskStorage {
    /// Initialize the storage at `root`. Creates the directory if missing.
    pub async fn new<P: Into<PathBuf>>(root: P, public_url_prefix: impl Into<String>) -> Result<Arc<Self>, ServiceError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| ServiceError::storage(&root.to_string_lossy(), e))?;
        Ok(Arc::new(Self { root, public_url_prefix: public_url_prefix.into() }))
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, ServiceError> {
        if !is_safe_path(path) {
            return Err(ServiceError::Storage(format!("unsafe storage path: {path}")));
        }
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl BlobStorage for LocalDiskStorage {
    async fn store(&self, directory: &str, filename: &str, content: &[u8]) -> Result<String, ServiceError> {
        let rel = join_path(directory, filename);
        let full = self.resolve(&rel)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).await.map_err(|e| ServiceError::storage(&rel, e))?;
        }
        // write-then-rename so readers never see a half-written asset
        let tmp = full.with_extension(format!("{}.part", tmp_suffix()));
        fs::write(&tmp, content).await.map_err(|e| ServiceError::storage(&rel, e))?;
        if let Err(e) = fs::rename(&tmp, &full).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(ServiceError::storage(&rel, e));
        }
        Ok(rel)
    }

    async fn exists(&self, path: &str) -> Result<bool, ServiceError> {
        let full = self.resolve(path)?;
        fs::try_exists(&full).await.map_err(|e| ServiceError::storage(path, e))
    }

    async fn delete(&self, path: &str) -> Result<(), ServiceError> {
        let full = self.resolve(path)?;
        fs::remove_file(&full).await.map_err(|e| ServiceError::storage(path, e))
    }

    async fn last_modified(&self, path: &str) -> Result<DateTime<Utc>, ServiceError> {
        let full = self.resolve(path)?;
        let meta = fs::metadata(&full).await.map_err(|e| ServiceError::storage(path, e))?;
        let modified = meta.modified().map_err(|e| ServiceError::storage(path, e))?;
        Ok(DateTime::<Utc>::from(modified))
    }

    fn public_url(&self, path: &str) -> String {
        url_for(&self.public_url_prefix, path)
    }
}

fn tmp_suffix() -> String {
    format!("{}", Utc::now().timestamp_nanos_opt().unwrap_or_default())
}
