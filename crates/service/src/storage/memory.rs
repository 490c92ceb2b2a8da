use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{join_path, url_for, BlobStorage};
use crate::errors::ServiceError;

/// In-memory blob storage for tests, with switchable failures.
pub struct MemoryStorage {
    files: Mutex<HashMap<String, (Vec<u8>, DateTime<Utc>)>>,
    public_url_prefix: String,
    fail_metadata: AtomicBool,
    fail_delete: AtomicBool,
}

impl MemoryStorage {
    pub fn new(public_url_prefix: impl Into<String>) -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            public_url_prefix: public_url_prefix.into(),
            fail_metadata: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
        }
    }

    /// Seed a file with an explicit modification time.
    pub fn put(&self, path: &str, content: &[u8], modified: DateTime<Utc>) {
        self.files.lock().unwrap().insert(path.to_string(), (content.to_vec(), modified));
    }

    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).map(|(c, _)| c.clone())
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.files.lock().unwrap().keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Make `exists` and `last_modified` fail.
    pub fn set_fail_metadata(&self, fail: bool) {
        self.fail_metadata.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    fn check_metadata(&self, path: &str) -> Result<(), ServiceError> {
        if self.fail_metadata.load(Ordering::SeqCst) {
            return Err(ServiceError::storage(path, "backend unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStorage for MemoryStorage {
    async fn store(&self, directory: &str, filename: &str, content: &[u8]) -> Result<String, ServiceError> {
        let path = join_path(directory, filename);
        self.put(&path, content, Utc::now());
        Ok(path)
    }

    async fn exists(&self, path: &str) -> Result<bool, ServiceError> {
        self.check_metadata(path)?;
        Ok(self.files.lock().unwrap().contains_key(path))
    }

    async fn delete(&self, path: &str) -> Result<(), ServiceError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(ServiceError::storage(path, "permission denied"));
        }
        match self.files.lock().unwrap().remove(path) {
            Some(_) => Ok(()),
            None => Err(ServiceError::storage(path, "no such file")),
        }
    }

    async fn last_modified(&self, path: &str) -> Result<DateTime<Utc>, ServiceError> {
        self.check_metadata(path)?;
        self.files
            .lock()
            .unwrap()
            .get(path)
            .map(|(_, m)| *m)
            .ok_or_else(|| ServiceError::storage(path, "no such file"))
    }

    fn public_url(&self, path: &str) -> String {
        url_for(&self.public_url_prefix, path)
    }
}
