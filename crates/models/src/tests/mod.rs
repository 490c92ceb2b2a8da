use migration::MigratorTrait;
use sea_orm::DatabaseConnection;




/// Fresh migrated in-memory database for a single test.
pub(crate) async fn setup_test_db() -> anyhow::Result<DatabaseConnection> {
    let db = crate::db::connect_memory().await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}
