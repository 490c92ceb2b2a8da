use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use super::assets::{brand_directory, canonical_filename, BrandSlot, UploadedFile};
use crate::best_effort::best_effort;
use crate::errors::ServiceError;
use crate::identity::Requester;
use crate::metrics;
use crate::props::BrandingView;
use crate::settings::keys::{COMPANY_ADDRESS, COMPANY_NAME, FAVICON, FAVICON_V, LOGO_DARK, LOGO_LIGHT};
use crate::settings::patch::SettingsPatch;
use crate::settings::{ResolvedBundle, SettingsService};
use crate::storage::BlobStorage;

/// One branding form submission, already validated by the request adapter.
#[derive(Debug, Clone, Default)]
pub struct BrandingUpdate {
    pub files: Vec<(BrandSlot, UploadedFile)>,
    pub company_name: Option<String>,
    pub company_address: Option<String>,
}

impl BrandingUpdate {
    pub fn with_file(mut self, slot: BrandSlot, file: UploadedFile) -> Self {
        self.files.retain(|(s, _)| *s != slot);
        self.files.push((slot, file));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.company_name.is_none() && self.company_address.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BrandingUpdateOutcome {
    /// New stored path per uploaded slot.
    pub stored: Vec<(BrandSlot, String)>,
    /// Entries written to the settings store.
    pub written: SettingsPatch,
    /// Previous asset paths that were removed from storage.
    pub orphans_deleted: Vec<String>,
}

/// Persists brand files and keeps the branding settings pointing at them.
#[derive(Clone)]
pub struct BrandingAssetManager {
    storage: Arc<dyn BlobStorage>,
    settings: SettingsService,
}

impl BrandingAssetManager {
    pub fn new(storage: Arc<dyn BlobStorage>, settings: SettingsService) -> Self {
        Self { storage, settings }
    }

    pub fn settings(&self) -> &SettingsService {
        &self.settings
    }

    /// Write `file` under the user's brand directory with the slot's canonical name.
    #[instrument(skip(self, file), fields(size = file.bytes.len()))]
    pub async fn store_asset(&self, user_id: i32, slot: BrandSlot, file: &UploadedFile) -> Result<String, ServiceError> {
        let filename = canonical_filename(slot, file);
        let path = self.storage.store(&brand_directory(user_id), &filename, &file.bytes).await?;
        debug!(%path, "brand_asset_stored");
        Ok(path)
    }

    /// Store uploaded files, write their paths and the text fields in one
    /// batch, then remove assets the batch orphaned.
    #[instrument(skip(self, requester, update), fields(user_id = requester.id, files = update.files.len()))]
    pub async fn apply_update(&self, requester: &Requester, update: BrandingUpdate) -> Result<BrandingUpdateOutcome, ServiceError> {
        let slot_keys: Vec<&str> = update.files.iter().map(|(slot, _)| slot.setting_key()).collect();
        let previous = self.settings.store().get_keys(requester.id, &slot_keys).await?;

        let mut patch = SettingsPatch::new();
        let mut stored = Vec::with_capacity(update.files.len());
        for (slot, file) in &update.files {
            let path = self.store_asset(requester.id, *slot, file).await?;
            patch.insert(slot.setting_key(), Some(path.clone()));
            if *slot == BrandSlot::Favicon {
                patch.insert(FAVICON_V, Some(Utc::now().timestamp_millis().to_string()));
            }
            stored.push((*slot, path));
        }
        if let Some(name) = update.company_name {
            patch.insert(COMPANY_NAME, Some(name));
        }
        if let Some(address) = update.company_address {
            patch.insert(COMPANY_ADDRESS, Some(address));
        }

        // eviction happens inside apply; orphans go only after both succeeded
        let written = self.settings.apply(requester, patch).await?;

        let mut orphans_deleted = Vec::new();
        for (slot, path) in &stored {
            let Some(Some(old)) = previous.get(slot.setting_key()) else { continue };
            if old.is_empty() || old == path {
                continue;
            }
            if self.delete_orphan(requester.id, old).await {
                orphans_deleted.push(old.clone());
            }
        }

        info!(stored = stored.len(), orphans = orphans_deleted.len(), "branding_updated");
        Ok(BrandingUpdateOutcome { stored, written, orphans_deleted })
    }

    /// Only files under `owner`'s brand directory are ever removed; a slot may
    /// point at someone else's upload.
    async fn delete_orphan(&self, owner: i32, path: &str) -> bool {
        if !path.starts_with(&format!("{}/", brand_directory(owner))) {
            debug!(%path, owner, "previous asset not owned by requester; kept");
            return false;
        }
        if best_effort("orphan_exists", self.storage.exists(path)).await != Some(true) {
            return false;
        }
        match best_effort("orphan_delete", self.storage.delete(path)).await {
            Some(()) => {
                metrics::ORPHANS_DELETED_TOTAL.inc();
                true
            }
            None => {
                warn!(%path, "orphaned brand asset left behind");
                false
            }
        }
    }

    /// Public URL for a stored path; `None` when absent or empty.
    pub fn resolve_url(&self, path: Option<&str>) -> Option<String> {
        path.filter(|p| !p.is_empty()).map(|p| self.storage.public_url(p))
    }

    /// Explicit `favicon_v`, else the favicon file's mtime in unix seconds.
    pub async fn resolve_favicon_version(&self, bundle: &ResolvedBundle) -> Option<String> {
        if let Some(v) = bundle.get(FAVICON_V).filter(|v| !v.is_empty()) {
            return Some(v.clone());
        }
        let path = bundle.get(FAVICON).filter(|p| !p.is_empty())?;
        if best_effort("favicon_exists", self.storage.exists(path)).await != Some(true) {
            return None;
        }
        best_effort("favicon_last_modified", self.storage.last_modified(path))
            .await
            .map(|modified| modified.timestamp().to_string())
    }

    /// Presentation-ready URLs for a resolved branding bundle.
    pub async fn present(&self, bundle: &ResolvedBundle) -> BrandingView {
        let url = |key: &str| self.resolve_url(bundle.get(key).map(String::as_str));
        BrandingView {
            logo_dark_url: url(LOGO_DARK),
            logo_light_url: url(LOGO_LIGHT),
            favicon_url: url(FAVICON),
            favicon_v: self.resolve_favicon_version(bundle).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::cache::SettingsCache;
    use crate::settings::repository::mock::{MockSettingsRepository, StaticAdminDirectory};
    use crate::storage::memory::MemoryStorage;
    use chrono::TimeZone;

    const ADMIN: i32 = 1;
    const USER: i32 = 7;
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\nrest";

    struct Fixture {
        storage: Arc<MemoryStorage>,
        repo: Arc<MockSettingsRepository>,
        manager: BrandingAssetManager,
    }

    fn fixture() -> Fixture {
        let storage = Arc::new(MemoryStorage::new("/storage"));
        let repo = Arc::new(MockSettingsRepository::default());
        let directory = Arc::new(StaticAdminDirectory::new(Some(ADMIN)));
        let settings = SettingsService::new(repo.clone(), directory, SettingsCache::in_memory(SettingsCache::DEFAULT_TTL, 100));
        let manager = BrandingAssetManager::new(storage.clone(), settings);
        Fixture { storage, repo, manager }
    }

    fn user() -> Requester {
        Requester::new(USER, Vec::<String>::new())
    }

    fn upload(name: &str, bytes: &[u8]) -> UploadedFile {
        UploadedFile::new(Some(name.to_string()), Some("image/png".into()), bytes.to_vec())
    }

    fn bundle(pairs: &[(&str, &str)]) -> ResolvedBundle {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[tokio::test]
    async fn extension_change_deletes_the_orphan() -> anyhow::Result<()> {
        let f = fixture();
        let first = BrandingUpdate::default().with_file(BrandSlot::LogoDark, upload("logo.png", PNG));
        f.manager.apply_update(&user(), first).await?;
        assert!(f.storage.contents("brand/7/logo-dark.png").is_some());

        let second = BrandingUpdate::default().with_file(BrandSlot::LogoDark, upload("logo.jpeg", b"jpg"));
        let outcome = f.manager.apply_update(&user(), second).await?;

        assert_eq!(outcome.stored, vec![(BrandSlot::LogoDark, "brand/7/logo-dark.jpg".to_string())]);
        assert_eq!(outcome.orphans_deleted, vec!["brand/7/logo-dark.png".to_string()]);
        assert_eq!(f.storage.paths(), vec!["brand/7/logo-dark.jpg".to_string()]);

        let own = f.manager.settings().own_settings(&user()).await?;
        assert_eq!(own.get(LOGO_DARK), Some(&Some("brand/7/logo-dark.jpg".to_string())));
        assert!(!own.contains_key(FAVICON_V));
        Ok(())
    }

    #[tokio::test]
    async fn same_name_overwrites_without_deleting() -> anyhow::Result<()> {
        let f = fixture();
        f.manager.apply_update(&user(), BrandingUpdate::default().with_file(BrandSlot::LogoLight, upload("a.png", b"one"))).await?;
        let outcome = f
            .manager
            .apply_update(&user(), BrandingUpdate::default().with_file(BrandSlot::LogoLight, upload("b.png", b"two")))
            .await?;
        assert!(outcome.orphans_deleted.is_empty());
        assert_eq!(f.storage.contents("brand/7/logo-light.png"), Some(b"two".to_vec()));
        Ok(())
    }

    #[tokio::test]
    async fn favicon_upload_sets_version_and_text_fields_ride_along() -> anyhow::Result<()> {
        let f = fixture();
        let update = BrandingUpdate {
            company_name: Some("Acme".into()),
            company_address: Some("1 Road".into()),
            ..BrandingUpdate::default()
        }
        .with_file(BrandSlot::Favicon, upload("icon.ico", b"\0\0\x01\0"));
        let before = Utc::now().timestamp_millis();
        let outcome = f.manager.apply_update(&user(), update).await?;

        let version: i64 = outcome.written.get(FAVICON_V).cloned().flatten().unwrap_or_default().parse()?;
        assert!(version >= before);
        assert_eq!(outcome.written.get(COMPANY_NAME), Some(&Some("Acme".to_string())));
        assert_eq!(outcome.written.get(COMPANY_ADDRESS), Some(&Some("1 Road".to_string())));
        assert_eq!(f.repo.writes(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn failed_orphan_delete_does_not_fail_the_update() -> anyhow::Result<()> {
        let f = fixture();
        f.manager.apply_update(&user(), BrandingUpdate::default().with_file(BrandSlot::LogoDark, upload("a.png", PNG))).await?;
        f.storage.set_fail_delete(true);
        let outcome = f
            .manager
            .apply_update(&user(), BrandingUpdate::default().with_file(BrandSlot::LogoDark, upload("a.gif", b"GIF89a")))
            .await?;
        assert!(outcome.orphans_deleted.is_empty());
        assert!(f.storage.contents("brand/7/logo-dark.png").is_some());
        Ok(())
    }

    #[tokio::test]
    async fn foreign_asset_is_never_deleted() -> anyhow::Result<()> {
        let f = fixture();
        let admin = Requester::new(ADMIN, ["admin"]);
        let first = BrandingUpdate::default().with_file(BrandSlot::LogoDark, upload("logo.png", PNG));
        f.manager.apply_update(&admin, first).await?;
        assert!(f.storage.contents("brand/1/logo-dark.png").is_some());

        f.manager.settings().update(&user(), serde_json::json!({"logo_dark": "brand/1/logo-dark.png"}).as_object().unwrap()).await?;
        let outcome = f
            .manager
            .apply_update(&user(), BrandingUpdate::default().with_file(BrandSlot::LogoDark, upload("m.png", PNG)))
            .await?;

        assert!(outcome.orphans_deleted.is_empty());
        assert!(f.storage.contents("brand/1/logo-dark.png").is_some());
        assert!(f.storage.contents("brand/7/logo-dark.png").is_some());
        Ok(())
    }

    #[tokio::test]
    async fn missing_orphan_is_skipped() -> anyhow::Result<()> {
        let f = fixture();
        f.manager.settings().update(&user(), serde_json::json!({"logo_dark": "brand/7/gone.png"}).as_object().unwrap()).await?;
        let outcome = f
            .manager
            .apply_update(&user(), BrandingUpdate::default().with_file(BrandSlot::LogoDark, upload("a.png", PNG)))
            .await?;
        assert!(outcome.orphans_deleted.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn settings_failure_keeps_previous_assets() {
        let f = fixture();
        f.storage.put("brand/7/logo-dark.png", PNG, Utc::now());
        f.repo.set_failing(true);
        let result = f
            .manager
            .apply_update(&user(), BrandingUpdate::default().with_file(BrandSlot::LogoDark, upload("a.jpg", b"x")))
            .await;
        assert!(result.is_err());
        assert!(f.storage.contents("brand/7/logo-dark.png").is_some());
    }

    #[test]
    fn resolve_url_handles_absent_paths() {
        let f = fixture();
        assert_eq!(f.manager.resolve_url(Some("brand/7/favicon.ico")).as_deref(), Some("/storage/brand/7/favicon.ico"));
        assert_eq!(f.manager.resolve_url(Some("")), None);
        assert_eq!(f.manager.resolve_url(None), None);
    }

    #[tokio::test]
    async fn favicon_version_prefers_explicit_token() {
        let f = fixture();
        let explicit = bundle(&[(FAVICON, "brand/7/favicon.ico"), (FAVICON_V, "1700000000000")]);
        assert_eq!(f.manager.resolve_favicon_version(&explicit).await.as_deref(), Some("1700000000000"));
    }

    #[tokio::test]
    async fn favicon_version_falls_back_to_mtime() {
        let f = fixture();
        let modified = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        f.storage.put("brand/7/favicon.ico", b"ico", modified);
        let b = bundle(&[(FAVICON, "brand/7/favicon.ico"), (FAVICON_V, "")]);
        assert_eq!(f.manager.resolve_favicon_version(&b).await, Some(modified.timestamp().to_string()));

        assert_eq!(f.manager.resolve_favicon_version(&bundle(&[(FAVICON, "brand/7/none.ico")])).await, None);
        assert_eq!(f.manager.resolve_favicon_version(&bundle(&[])).await, None);
    }

    #[tokio::test]
    async fn favicon_version_swallows_backend_errors() {
        let f = fixture();
        f.storage.put("brand/7/favicon.ico", b"ico", Utc::now());
        f.storage.set_fail_metadata(true);
        assert_eq!(f.manager.resolve_favicon_version(&bundle(&[(FAVICON, "brand/7/favicon.ico")])).await, None);
    }

    #[tokio::test]
    async fn present_builds_urls() {
        let f = fixture();
        let b = bundle(&[(LOGO_DARK, "admin/logo.png"), (FAVICON, "brand/7/favicon.ico"), (FAVICON_V, "42")]);
        let view = f.manager.present(&b).await;
        assert_eq!(view.logo_dark_url.as_deref(), Some("/storage/admin/logo.png"));
        assert_eq!(view.logo_light_url, None);
        assert_eq!(view.favicon_url.as_deref(), Some("/storage/brand/7/favicon.ico"));
        assert_eq!(view.favicon_v.as_deref(), Some("42"));
    }
}
