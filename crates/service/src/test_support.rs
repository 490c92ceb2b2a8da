#![cfg(test)]
use std::path::PathBuf;

use sea_orm::DatabaseConnection;
use migration::MigratorTrait;

/// Fresh migrated in-memory database; every test gets its own.
pub async fn get_db() -> Result<DatabaseConnection, anyhow::Error> {
    let db = models::db::connect_memory().await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// Insert a user holding `roles`; returns its id.
pub async fn create_user(db: &DatabaseConnection, handle: &str, roles: &[&str]) -> Result<i32, anyhow::Error> {
    let user = models::user::create(db, &format!("{handle}@example.com"), handle).await?;
    for role in roles {
        models::user_role::assign(db, user.id, role).await?;
    }
    Ok(user.id)
}

/// Unique scratch directory under the system temp dir.
pub fn temp_dir(prefix: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{prefix}_{}", uuid::Uuid::new_v4()))
}
