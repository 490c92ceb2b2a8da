use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Setting: composite unique (user_id, key), target of the upsert conflict clause
        manager
            .create_index(
                Index::create()
                    .name("uniq_setting_user_key")
                    .table(Setting::Table)
                    .col(Setting::UserId)
                    .col(Setting::Key)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // UserRole: one row per (user_id, role)
        manager
            .create_index(
                Index::create()
                    .name("uniq_user_role_user_role")
                    .table(UserRole::Table)
                    .col(UserRole::UserId)
                    .col(UserRole::Role)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // UserRole: role lookup for the designated-admin query
        manager
            .create_index(
                Index::create()
                    .name("idx_user_role_role")
                    .table(UserRole::Table)
                    .col(UserRole::Role)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_user_role_role").table(UserRole::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("uniq_user_role_user_role").table(UserRole::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("uniq_setting_user_key").table(Setting::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Setting { Table, UserId, Key }

#[derive(DeriveIden)]
enum UserRole { Table, UserId, Role }
