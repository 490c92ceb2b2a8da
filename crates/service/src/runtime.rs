//! Runtime environment helpers
//!
//! Thin wrapper around `common::env` to keep binary crates importing
//! `service::runtime::ensure_env` without depending directly on `common`.

/// Ensure the storage root exists; warn on a missing frontend bundle.
pub async fn ensure_env(frontend_dir: &str, storage_root: &str) -> anyhow::Result<()> {
    common::env::ensure_env(frontend_dir, storage_root).await
}
