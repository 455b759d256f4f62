//! API key authentication.
//!
//! Every `/api` endpoint takes a [`CurrentUser`], which resolves the
//! `X-API-Key` header to its owning user. The user is then passed
//! explicitly into each service call; there is no ambient session.

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::Serialize;
use utoipa::ToSchema;

use crate::common::AppState;
use crate::entity::users::{self, Role};
use crate::error::{AppError, AppResult};
use crate::store;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Authenticated caller; every query is scoped to `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CurrentUser {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl From<users::Model> for CurrentUser {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
        }
    }
}

/// Resolve a raw API key to its user.
///
/// # Errors
///
/// `AppError::Unauthorized` for an empty or unknown key.
pub async fn authenticate<C: sea_orm::ConnectionTrait>(db: &C, api_key: &str) -> AppResult<CurrentUser> {
    let api_key = api_key.trim();
    if api_key.is_empty() {
        return Err(AppError::Unauthorized("Missing API Key".to_string()));
    }

    store::users::find_by_api_key(db, api_key)
        .await?
        .map(CurrentUser::from)
        .ok_or_else(|| AppError::Unauthorized("Invalid API Key".to_string()))
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(API_KEY_HEADER) else {
            return Err(AppError::Unauthorized("Missing API Key".to_string()));
        };
        let api_key = header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid API Key".to_string()))?;

        let user = authenticate(&state.db, api_key).await?;
        tracing::debug!(user_id = user.id, "api_key_authenticated");
        Ok(user)
    }
}
