//! Per-user key/value settings rows.
//!
//! Persistence only: callers hand in already-sanitized entries. The unique
//! (user_id, key) index turns every write into an overwrite of the same row.

use sea_orm::{entity::prelude::*, sea_query::OnConflict, ConnectionTrait, Set};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors;
use crate::user;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "setting")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub key: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub value: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { User }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::User => Entity::belongs_to(user::Entity)
                .from(Column::UserId)
                .to(user::Column::Id)
                .into(),
        }
    }
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef { Relation::User.def() }
}

impl ActiveModelBehavior for ActiveModel {}

pub async fn find_all_for_user<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Vec<Model>, errors::ModelError> {
    Entity::find()
        .filter(Column::UserId.eq(user_id))
        .all(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))
}

/// Rows for the requested keys only. No query is issued for an empty key list.
pub async fn find_keys_for_user<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    keys: &[String],
) -> Result<Vec<Model>, errors::ModelError> {
    if keys.is_empty() {
        return Ok(Vec::new());
    }
    Entity::find()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::Key.is_in(keys.iter().cloned()))
        .all(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))
}

/// Insert or overwrite `entries` for `user_id` in one statement.
///
/// On a (user_id, key) conflict only `value` and `updated_at` change, so
/// `created_at` keeps the first-write time. Returns the number of entries
/// written; an empty batch issues no statement.
pub async fn upsert_many<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    entries: Vec<(String, Option<String>)>,
) -> Result<usize, errors::ModelError> {
    if entries.is_empty() {
        return Ok(0);
    }
    if entries.iter().any(|(k, _)| k.is_empty()) {
        return Err(errors::ModelError::Validation("setting key required".into()));
    }
    let count = entries.len();
    let now: DateTimeWithTimeZone = Utc::now().into();
    let rows = entries.into_iter().map(|(key, value)| ActiveModel {
        user_id: Set(user_id),
        key: Set(key),
        value: Set(value),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    });
    Entity::insert_many(rows)
        .on_conflict(
            OnConflict::columns([Column::UserId, Column::Key])
                .update_columns([Column::Value, Column::UpdatedAt])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))?;
    Ok(count)
}
