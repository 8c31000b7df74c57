//! Demo account routes under `/auth`.
//!
//! No hashing, no sessions: the bearer token accepted by `/auth/me` is the
//! user id returned from register or login.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Json,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    error::{ApiError, ApiJson},
    state::AppState,
};
use crate::error::SnapTexError;
use crate::users::{authenticate, Credentials, NewUser, UserResponse};

#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(user): ApiJson<NewUser>,
) -> Result<Json<UserResponse>, ApiError> {
    if user.name.trim().is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Name must not be empty"));
    }
    if !user.email.contains('@') {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Invalid email address"));
    }
    if user.password.is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Password must not be empty"));
    }

    let created = state.users.create(user).await?;
    Ok(Json(created.into()))
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(creds): ApiJson<Credentials>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = authenticate(state.users.as_ref(), &creds).await?;
    info!("Demo user {} logged in", user.id);
    Ok(Json(user.into()))
}

pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<UserResponse>, ApiError> {
    let id = bearer_user_id(&headers).ok_or(SnapTexError::Unauthorized)?;
    let user = state
        .users
        .find_by_id(id)
        .await
        .ok_or(SnapTexError::Unauthorized)?;
    Ok(Json(user.into()))
}

/// Parse `Authorization: Bearer <uuid>`.
fn bearer_user_id(headers: &HeaderMap) -> Option<Uuid> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Uuid::parse_str(token.trim()).ok()
}
