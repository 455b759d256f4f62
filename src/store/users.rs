use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
};

use crate::entity::users::{self, Role};
use crate::error::AppResult;

pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub api_key: String,
}

pub async fn find_by_email<C: ConnectionTrait>(
    db: &C,
    email: &str,
) -> AppResult<Option<users::Model>> {
    Ok(users::Entity::find()
        .filter(users::Column::Email.eq(email))
        .one(db)
        .await?)
}

pub async fn find_by_api_key<C: ConnectionTrait>(
    db: &C,
    api_key: &str,
) -> AppResult<Option<users::Model>> {
    Ok(users::Entity::find()
        .filter(users::Column::ApiKey.eq(api_key))
        .one(db)
        .await?)
}

pub async fn insert<C: ConnectionTrait>(db: &C, user: NewUser) -> AppResult<users::Model> {
    let model = users::ActiveModel {
        username: Set(user.username),
        email: Set(user.email),
        password_hash: Set(user.password_hash),
        role: Set(user.role),
        api_key: Set(Some(user.api_key)),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    Ok(model.insert(db).await?)
}

/// Replace the user's API key. The previous key stops matching immediately.
pub async fn set_api_key<C: ConnectionTrait>(db: &C, user_id: i32, api_key: &str) -> AppResult<()> {
    users::Entity::update_many()
        .col_expr(users::Column::ApiKey, api_key.into())
        .filter(users::Column::Id.eq(user_id))
        .exec(db)
        .await?;
    Ok(())
}

pub async fn set_password_hash<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    password_hash: &str,
) -> AppResult<()> {
    users::Entity::update_many()
        .col_expr(users::Column::PasswordHash, password_hash.into())
        .filter(users::Column::Id.eq(user_id))
        .exec(db)
        .await?;
    Ok(())
}
