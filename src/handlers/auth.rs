// src/handlers/auth.rs

use axum::{
    Json,
    extract::{Extension, State, rejection::JsonRejection},
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{LoginRequest, User, UserResponse},
    state::SharedStore,
    utils::jwt::sign_jwt,
};

const INVALID_CREDENTIALS: &str = "Invalid username, password, or role";

/// Authenticates a user and returns a JWT token.
///
/// Username, password and role must all match. Every mismatch, including a
/// malformed body or an unknown role, reports the same message so callers
/// cannot tell which part was wrong.
pub async fn login(
    State(store): State<SharedStore>,
    State(config): State<Config>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Ok(Json(payload)) = payload else {
        return Err(AppError::AuthError(INVALID_CREDENTIALS.to_string()));
    };
    if payload.validate().is_err() {
        return Err(AppError::AuthError(INVALID_CREDENTIALS.to_string()));
    }

    let user = store
        .find_user_by_username(payload.username.trim())
        .await?
        .filter(|u| u.password == payload.password && u.role == payload.role)
        .ok_or_else(|| {
            tracing::info!("Failed login for '{}'", payload.username);
            AppError::AuthError(INVALID_CREDENTIALS.to_string())
        })?;

    let token = sign_jwt(
        user.id,
        user.role,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "user": UserResponse::from(user),
    })))
}

/// Returns the user bound to the current session.
pub async fn me(Extension(user): Extension<User>) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}
