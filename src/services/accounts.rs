//! User accounts: registration, password login and API key rotation.

use rand::{Rng, distributions::Alphanumeric};
use sea_orm::ConnectionTrait;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::entity::users::{self, Role};
use crate::error::{AppError, AppResult};
use crate::store;
use crate::store::users::NewUser;

const API_KEY_PREFIX: &str = "key_";
const API_KEY_RANDOM_LEN: usize = 20;

/// `key_` followed by 20 random alphanumerics.
#[must_use]
pub fn generate_api_key() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(API_KEY_RANDOM_LEN)
        .map(char::from)
        .collect();
    format!("{API_KEY_PREFIX}{suffix}")
}

async fn hash_password(password: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| AppError::Internal(format!("password hashing task failed: {e}")))?
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

async fn verify_password(password: String, hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("password check task failed: {e}")))?
        .map_err(|e| AppError::Internal(format!("password check failed: {e}")))
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct Registration {
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Farmer
}

/// Create a user with a bcrypt password hash and a fresh API key.
///
/// # Errors
///
/// `AppError::Validation` for malformed input, `AppError::Conflict` when the
/// email is already registered.
pub async fn register<C: ConnectionTrait>(db: &C, registration: Registration) -> AppResult<users::Model> {
    registration.validate()?;

    if store::users::find_by_email(db, &registration.email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let password_hash = hash_password(registration.password).await?;
    let user = store::users::insert(
        db,
        NewUser {
            username: registration.username,
            email: registration.email,
            password_hash,
            role: registration.role,
            api_key: generate_api_key(),
        },
    )
    .await?;

    tracing::info!(user_id = user.id, role = ?user.role, "user_registered");
    Ok(user)
}

async fn check_password<C: ConnectionTrait>(
    db: &C,
    email: &str,
    password: &str,
) -> AppResult<users::Model> {
    let rejected = || AppError::Unauthorized("Invalid email or password".to_string());
    let Some(user) = store::users::find_by_email(db, email.trim()).await? else {
        return Err(rejected());
    };

    if verify_password(password.to_string(), user.password_hash.clone()).await? {
        Ok(user)
    } else {
        tracing::debug!(user_id = user.id, "password_rejected");
        Err(rejected())
    }
}

/// Email and password check.
///
/// # Errors
///
/// `AppError::Unauthorized` for an unknown email or a wrong password.
pub async fn verify_credentials<C: ConnectionTrait>(
    db: &C,
    email: &str,
    password: &str,
) -> AppResult<CurrentUser> {
    check_password(db, email, password).await.map(CurrentUser::from)
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Exchange email and password for the user's API key. A key is issued when
/// the account has none; an existing key is returned unchanged.
///
/// # Errors
///
/// `AppError::Unauthorized` for an unknown email or a wrong password.
pub async fn login<C: ConnectionTrait>(db: &C, credentials: Credentials) -> AppResult<String> {
    let user = check_password(db, &credentials.email, &credentials.password).await?;
    tracing::info!(user_id = user.id, "user_logged_in");

    if let Some(api_key) = user.api_key.clone() {
        return Ok(api_key);
    }
    regenerate_api_key(db, &CurrentUser::from(user)).await
}

/// Issue a new API key; the old one stops working.
pub async fn regenerate_api_key<C: ConnectionTrait>(db: &C, user: &CurrentUser) -> AppResult<String> {
    let api_key = generate_api_key();
    store::users::set_api_key(db, user.id, &api_key).await?;
    tracing::info!(user_id = user.id, "api_key_regenerated");
    Ok(api_key)
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PasswordChange {
    pub new_password: String,
    pub confirm_password: String,
}

/// # Errors
///
/// `AppError::BadRequest` when the password is empty or the confirmation differs.
pub async fn update_password<C: ConnectionTrait>(
    db: &C,
    user: &CurrentUser,
    change: PasswordChange,
) -> AppResult<()> {
    if change.new_password.is_empty() {
        return Err(AppError::BadRequest("Password cannot be empty".to_string()));
    }
    if change.new_password != change.confirm_password {
        return Err(AppError::BadRequest("Passwords do not match".to_string()));
    }

    let password_hash = hash_password(change.new_password).await?;
    store::users::set_password_hash(db, user.id, &password_hash).await?;
    tracing::info!(user_id = user.id, "password_updated");
    Ok(())
}
