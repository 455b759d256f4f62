use axum::{extract::State, http::StatusCode, Json};

use crate::auth::CurrentUser;
use crate::common::AppState;
use crate::error::{AppJson, AppResult};
use crate::services::accounts::{self, Credentials, PasswordChange};

use super::types::ApiKeyResponse;

/// Exchange email and password for an API key
#[utoipa::path(
    post,
    path = "/api/account/login",
    request_body = Credentials,
    responses(
        (status = 200, description = "API key of the account", body = ApiKeyResponse),
        (status = 401, description = "Invalid email or password"),
    ),
    tag = "account"
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(body): AppJson<Credentials>,
) -> AppResult<Json<ApiKeyResponse>> {
    let api_key = accounts::login(&state.db, body).await?;
    Ok(Json(ApiKeyResponse { api_key }))
}

/// Profile of the caller
#[utoipa::path(
    get,
    path = "/api/account",
    responses(
        (status = 200, description = "Current user", body = CurrentUser),
        (status = 401, description = "Missing or invalid API key"),
    ),
    security(("api_key" = [])),
    tag = "account"
)]
pub async fn profile(user: CurrentUser) -> Json<CurrentUser> {
    Json(user)
}

/// Issue a new API key; the current key stops working
#[utoipa::path(
    post,
    path = "/api/account/api-key",
    responses(
        (status = 200, description = "New API key", body = ApiKeyResponse),
    ),
    security(("api_key" = [])),
    tag = "account"
)]
pub async fn regenerate_api_key(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<ApiKeyResponse>> {
    let api_key = accounts::regenerate_api_key(&state.db, &user).await?;
    Ok(Json(ApiKeyResponse { api_key }))
}

/// Change the caller's password
#[utoipa::path(
    put,
    path = "/api/account/password",
    request_body = PasswordChange,
    responses(
        (status = 204, description = "Password updated"),
        (status = 400, description = "Empty password or confirmation mismatch"),
    ),
    security(("api_key" = [])),
    tag = "account"
)]
pub async fn update_password(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(body): AppJson<PasswordChange>,
) -> AppResult<StatusCode> {
    accounts::update_password(&state.db, &user, body).await?;
    Ok(StatusCode::NO_CONTENT)
}
