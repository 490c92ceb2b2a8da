//! Create `setting` table: one row per (user, key) pair.
//!
//! `value` is nullable text; uniqueness of (user_id, key) lives in the index migration.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Setting::Table)
                    .if_not_exists()
                    .col(pk_auto(Setting::Id))
                    .col(integer(Setting::UserId).not_null())
                    .col(string_len(Setting::Key, 191).not_null())
                    .col(text_null(Setting::Value))
                    .col(timestamp_with_time_zone(Setting::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Setting::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_setting_user")
                            .from(Setting::Table, Setting::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Setting::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Setting { Table, Id, UserId, Key, Value, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum User { Table, Id }
