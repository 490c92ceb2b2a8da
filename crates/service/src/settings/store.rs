use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use super::patch::SettingsPatch;
use super::repository::SettingsRepository;
use super::SettingsMap;
use crate::errors::ServiceError;
use crate::metrics;

/// Durable per-user key/value settings.
///
/// Sanitizes every write at this boundary; cache eviction is the caller's job.
#[derive(Clone)]
pub struct SettingsStore {
    repo: Arc<dyn SettingsRepository>,
}

impl SettingsStore {
    pub fn new(repo: Arc<dyn SettingsRepository>) -> Self { Self { repo } }

    /// Every stored key for `user_id`; empty when nothing is stored.
    pub async fn get_all(&self, user_id: i32) -> Result<SettingsMap, ServiceError> {
        self.repo.get_all(user_id).await
    }

    /// Stored entries among `keys`. An empty key set returns immediately.
    pub async fn get_keys(&self, user_id: i32, keys: &[&str]) -> Result<SettingsMap, ServiceError> {
        if keys.is_empty() {
            return Ok(SettingsMap::new());
        }
        let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        self.repo.get_keys(user_id, &keys).await
    }

    /// Filter a raw bag of inbound values and persist the survivors.
    ///
    /// Returns the entries actually written.
    pub async fn upsert(&self, user_id: i32, raw: &Map<String, Value>) -> Result<SettingsPatch, ServiceError> {
        let patch = SettingsPatch::sanitize(raw);
        self.upsert_patch(user_id, patch).await
    }

    #[instrument(skip(self, patch), fields(key_count = patch.len()))]
    pub async fn upsert_patch(&self, user_id: i32, patch: SettingsPatch) -> Result<SettingsPatch, ServiceError> {
        if patch.is_empty() {
            debug!("nothing survived filtering; skipping write");
            return Ok(patch);
        }
        let written = self.repo.upsert(user_id, patch.clone().into_entries()).await?;
        metrics::SETTINGS_WRITTEN_TOTAL.inc_by(written as u64);
        info!(user_id, written, "settings_upserted");
        Ok(patch)
    }
}
