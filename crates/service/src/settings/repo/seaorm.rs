use sea_orm::DatabaseConnection;

use crate::errors::ServiceError;
use crate::settings::repository::{AdminDirectory, SettingsRepository};
use crate::settings::SettingsMap;

pub struct SeaOrmSettingsRepository {
    pub db: DatabaseConnection,
}

fn to_map(rows: Vec<models::setting::Model>) -> SettingsMap {
    rows.into_iter().map(|r| (r.key, r.value)).collect()
}

#[async_trait::async_trait]
impl SettingsRepository for SeaOrmSettingsRepository {
    async fn get_all(&self, user_id: i32) -> Result<SettingsMap, ServiceError> {
        let rows = models::setting::find_all_for_user(&self.db, user_id).await?;
        Ok(to_map(rows))
    }

    async fn get_keys(&self, user_id: i32, keys: &[String]) -> Result<SettingsMap, ServiceError> {
        let rows = models::setting::find_keys_for_user(&self.db, user_id, keys).await?;
        Ok(to_map(rows))
    }

    async fn upsert(&self, user_id: i32, entries: Vec<(String, Option<String>)>) -> Result<usize, ServiceError> {
        let written = models::setting::upsert_many(&self.db, user_id, entries).await?;
        Ok(written)
    }
}

/// Designated-admin lookup over the `user_role` table.
pub struct SeaOrmAdminDirectory {
    pub db: DatabaseConnection,
}

#[async_trait::async_trait]
impl AdminDirectory for SeaOrmAdminDirectory {
    async fn find_admin_user_id(&self) -> Result<Option<i32>, ServiceError> {
        let id = models::user_role::lowest_user_with_role(&self.db, models::user_role::ROLE_ADMIN).await?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[tokio::test]
    async fn round_trips_through_sqlite() -> anyhow::Result<()> {
        let db = test_support::get_db().await?;
        let owner = test_support::create_user(&db, "owner", &[]).await?;
        let repo = SeaOrmSettingsRepository { db: db.clone() };

        repo.upsert(owner, vec![("logo_dark".into(), Some("brand/1/logo-dark.png".into()))]).await?;
        repo.upsert(owner, vec![("logo_dark".into(), Some("brand/1/logo-dark.jpg".into()))]).await?;

        let all = repo.get_all(owner).await?;
        assert_eq!(all.len(), 1);
        assert_eq!(all.get("logo_dark"), Some(&Some("brand/1/logo-dark.jpg".to_string())));

        let picked = repo.get_keys(owner, &["logo_dark".to_string(), "favicon".to_string()]).await?;
        assert_eq!(picked.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn directory_finds_lowest_admin() -> anyhow::Result<()> {
        let db = test_support::get_db().await?;
        let directory = SeaOrmAdminDirectory { db: db.clone() };
        assert_eq!(directory.find_admin_user_id().await?, None);

        let _plain = test_support::create_user(&db, "plain", &[]).await?;
        let first_admin = test_support::create_user(&db, "first-admin", &["admin"]).await?;
        let _second_admin = test_support::create_user(&db, "second-admin", &["admin"]).await?;

        assert_eq!(directory.find_admin_user_id().await?, Some(first_admin));
        Ok(())
    }
}
