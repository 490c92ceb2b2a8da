//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use tracing::{info, warn};

/// Ensure the public asset root exists (brand files land there) and warn
/// when the optional frontend bundle directory is missing.
pub async fn ensure_env(frontend_dir: &str, storage_root: &str) -> anyhow::Result<()> {
    if tokio::fs::metadata(frontend_dir).await.is_err() {
        warn!(%frontend_dir, "frontend assets directory not found; static assets may 404");
    }
    tokio::fs::create_dir_all(storage_root)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {storage_root}: {e}"))?;
    info!(%storage_root, "storage root ready");
    Ok(())
}
