use std::sync::Arc;
use std::time::Duration;

use sea_orm::DatabaseConnection;

use configs::AppConfig;
use service::branding::BrandingAssetManager;
use service::settings::cache::SettingsCache;
use service::settings::repo::seaorm::{SeaOrmAdminDirectory, SeaOrmSettingsRepository};
use service::settings::SettingsService;
use service::storage::LocalDiskStorage;

/// Shared handler state; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub settings: SettingsService,
    pub branding: BrandingAssetManager,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    /// Wire the SeaORM repositories, the moka cache and local disk storage.
    pub async fn build(db: DatabaseConnection, cfg: &AppConfig) -> anyhow::Result<Self> {
        let cache = SettingsCache::in_memory(Duration::from_secs(cfg.cache.ttl_secs), cfg.cache.max_capacity);
        let settings = SettingsService::new(
            Arc::new(SeaOrmSettingsRepository { db: db.clone() }),
            Arc::new(SeaOrmAdminDirectory { db }),
            cache,
        );
        let storage = LocalDiskStorage::new(&cfg.storage.root, cfg.storage.public_url_prefix.clone()).await?;
        let branding = BrandingAssetManager::new(storage, settings.clone());
        Ok(Self { settings, branding, jwt_secret: Arc::from(cfg.auth.jwt_secret.as_str()) })
    }
}
