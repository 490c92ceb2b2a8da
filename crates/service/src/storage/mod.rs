//! Blob storage for uploaded brand assets.
//!
//! Paths are relative, `/`-separated and never escape the backend root.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::ServiceError;

pub mod local_disk;
pub mod memory;

pub use local_disk::LocalDiskStorage;

#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Write `content` as `directory/filename`, replacing any existing file; returns the relative path.
    async fn store(&self, directory: &str, filename: &str, content: &[u8]) -> Result<String, ServiceError>;
    async fn exists(&self, path: &str) -> Result<bool, ServiceError>;
    async fn delete(&self, path: &str) -> Result<(), ServiceError>;
    async fn last_modified(&self, path: &str) -> Result<DateTime<Utc>, ServiceError>;
    /// Publicly servable URL for a stored path.
    fn public_url(&self, path: &str) -> String;
}

/// Join a directory and file name into a relative storage path.
pub fn join_path(directory: &str, filename: &str) -> String {
    let directory = directory.trim_matches('/');
    if directory.is_empty() {
        filename.to_string()
    } else {
        format!("{directory}/{filename}")
    }
}

/// Relative paths made only of plain components are accepted.
pub fn is_safe_path(path: &str) -> bool {
    !path.is_empty()
        && !path.starts_with('/')
        && path.split('/').all(|c| !c.is_empty() && c != "." && c != ".." && !c.contains('\\'))
}

pub(crate) fn url_for(prefix: &str, path: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), path.trim_start_matches('/'))
}
