use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{info, instrument};

use super::cache::{branding_key, salary_slip_defaults_key, CacheScope, CachedAdminDirectory, SettingsCache};
use super::patch::SettingsPatch;
use super::repository::{AdminDirectory, SettingsRepository};
use super::resolver::FallbackResolver;
use super::store::SettingsStore;
use super::{ResolvedBundle, SettingsMap};
use crate::best_effort::best_effort;
use crate::errors::ServiceError;
use crate::identity::Requester;

/// Settings business service independent of web framework.
///
/// Page rendering reads bundles through the cache; every write path goes
/// through [`SettingsService::apply`], which evicts before returning.
#[derive(Clone)]
pub struct SettingsService {
    store: SettingsStore,
    resolver: FallbackResolver,
    cache: SettingsCache,
}

impl SettingsService {
    pub fn new(repo: Arc<dyn SettingsRepository>, directory: Arc<dyn AdminDirectory>, cache: SettingsCache) -> Self {
        let store = SettingsStore::new(repo);
        let directory: Arc<dyn AdminDirectory> = Arc::new(CachedAdminDirectory::new(directory, cache.clone()));
        let resolver = FallbackResolver::new(store.clone(), directory);
        Self { store, resolver, cache }
    }

    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    /// The requester's own stored settings, without fallback.
    pub async fn own_settings(&self, requester: &Requester) -> Result<SettingsMap, ServiceError> {
        self.store.get_all(requester.id).await
    }

    /// Sanitize an inbound settings bag and apply it.
    pub async fn update(&self, requester: &Requester, raw: &Map<String, Value>) -> Result<SettingsPatch, ServiceError> {
        self.apply(requester, SettingsPatch::sanitize(raw)).await
    }

    /// Persist `patch` for the requester and evict the bundles it can change.
    #[instrument(skip(self, requester, patch), fields(user_id = requester.id, key_count = patch.len()))]
    pub async fn apply(&self, requester: &Requester, patch: SettingsPatch) -> Result<SettingsPatch, ServiceError> {
        let written = self.store.upsert_patch(requester.id, patch).await?;
        if written.affects_cached_bundles() {
            self.cache.invalidate_bundles(CacheScope::User(requester.id)).await;
            // anonymous pages resolve from the designated admin
            let designated = best_effort("resolve_designated_admin", self.resolver.resolve_admin_id(None)).await;
            if designated.flatten() == Some(requester.id) {
                self.cache.invalidate_bundles(CacheScope::Guest).await;
            }
            info!(user_id = requester.id, "settings_bundles_invalidated");
        }
        Ok(written)
    }

    /// Branding bundle for the requester (or an anonymous visitor), cached.
    pub async fn branding(&self, requester: Option<&Requester>) -> Result<ResolvedBundle, ServiceError> {
        let key = branding_key(CacheScope::of(requester));
        self.cache.remember(&key, || self.resolver.resolve_branding(requester)).await
    }

    /// Salary slip defaults bundle for the requester, cached.
    pub async fn salary_slip_defaults(&self, requester: Option<&Requester>) -> Result<ResolvedBundle, ServiceError> {
        let key = salary_slip_defaults_key(CacheScope::of(requester));
        self.cache.remember(&key, || self.resolver.resolve_salary_slip_defaults(requester)).await
    }
}
