// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    error::AppError,
    models::user::{Role, User},
    state::SharedStore,
};

const UNAUTHORIZED: &str = "Unauthorized";
const FORBIDDEN: &str = "Forbidden";

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the User ID (as string).
    pub sub: String,
    /// User's role at sign-in time.
    pub role: Role,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

/// Signs a new session token for the user.
pub fn sign_jwt(
    id: i64,
    role: Role,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    // Calculate expiration: current time + expiration_seconds
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize
        + expiration_seconds as usize;

    let claims = Claims {
        sub: id.to_string(), // Store User ID in 'sub' claim
        role,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a JWT string.
///
/// Returns the `Claims` if valid, otherwise returns an `AppError`.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError(UNAUTHORIZED.to_string()))?;

    Ok(token_data.claims)
}

/// Access Gate: the caller must be signed in and hold exactly `required`.
///
/// No session is 401, wrong role is 403. Nothing else is revealed.
pub fn authorize(user: Option<&User>, required: Role) -> Result<User, AppError> {
    let user = user.ok_or_else(|| AppError::AuthError(UNAUTHORIZED.to_string()))?;
    if user.role != required {
        return Err(AppError::Forbidden(FORBIDDEN.to_string()));
    }
    Ok(user.clone())
}

/// Axum Middleware: Authentication.
///
/// Validates the 'Authorization: Bearer <token>' header and loads the user it
/// names. The current `User` record (not the token claims) is injected into
/// the request extensions, so a deleted user loses access immediately.
pub async fn auth_middleware(
    State(config): State<Config>,
    State(store): State<SharedStore>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => &header[7..],
        _ => return Err(AppError::AuthError(UNAUTHORIZED.to_string())),
    };

    let claims = verify_jwt(token, &config.jwt_secret)?;
    let user_id = claims
        .sub
        .parse::<i64>()
        .map_err(|_| AppError::AuthError(UNAUTHORIZED.to_string()))?;

    let user = store
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::AuthError(UNAUTHORIZED.to_string()))?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

async fn require_role(role: Role, req: Request<Body>, next: Next) -> Result<Response, AppError> {
    authorize(req.extensions().get::<User>(), role)?;
    Ok(next.run(req).await)
}

/// Axum Middleware: Admin Authorization.
///
/// Must be used AFTER `auth_middleware`.
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    require_role(Role::Admin, req, next).await
}

/// Axum Middleware: Faculty Authorization. Must be used AFTER `auth_middleware`.
pub async fn faculty_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    require_role(Role::Faculty, req, next).await
}

/// Axum Middleware: Student Authorization. Must be used AFTER `auth_middleware`.
pub async fn student_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    require_role(Role::Student, req, next).await
}
