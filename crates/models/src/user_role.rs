use sea_orm::{entity::prelude::*, sea_query::OnConflict, DatabaseConnection, QueryOrder, Set};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors;
use crate::user;

/// Role name of the designated admin that other users inherit settings from.
pub const ROLE_ADMIN: &str = "admin";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_role")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub role: String,
    pub created_at: DateTimeWithTimeZone,
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

impl ActiveModelBehavior for ActiveModel {}

/// Grant `role` to `user_id`; granting twice is a no-op.
pub async fn assign(db: &DatabaseConnection, user_id: i32, role: &str) -> Result<(), errors::ModelError> {
    if role.trim().is_empty() { return Err(errors::ModelError::Validation("role required".into())); }
    let am = ActiveModel {
        user_id: Set(user_id),
        role: Set(role.to_string()),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    };
    Entity::insert(am)
        .on_conflict(OnConflict::columns([Column::UserId, Column::Role]).do_nothing().to_owned())
        .exec_without_returning(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))?;
    Ok(())
}

pub async fn roles_for_user(db: &DatabaseConnection, user_id: i32) -> Result<Vec<String>, errors::ModelError> {
    let rows = Entity::find()
        .filter(Column::UserId.eq(user_id))
        .all(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))?;
    Ok(rows.into_iter().map(|r| r.role).collect())
}

/// Lowest user id holding `role`, if any.
pub async fn lowest_user_with_role(db: &DatabaseConnection, role: &str) -> Result<Option<i32>, errors::ModelError> {
    let row = Entity::find()
        .filter(Column::Role.eq(role))
        .order_by_asc(Column::UserId)
        .one(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))?;
    Ok(row.map(|r| r.user_id))
}
