//! Authentication API Endpoints
//! Mission: Signup, login, refresh, logout and current-user endpoints

use crate::auth::{
    error::AuthError,
    middleware::{extract_bearer, CurrentUser},
    models::{LoginRequest, RefreshRequest, SignupRequest, TokenPair, UserResponse},
    service::AuthService,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::error;
use validator::Validate;

/// Signup endpoint - POST /auth/signup
pub async fn signup(
    State(auth): State<Arc<AuthService>>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), AuthApiError> {
    let Json(payload) = payload?;
    let user = auth.signup(&payload.email, &payload.password).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from_user(&user))))
}

/// Login endpoint - POST /auth/login
pub async fn login(
    State(auth): State<Arc<AuthService>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenPair>, AuthApiError> {
    let Json(payload) = payload?;
    let pair = auth.login(&payload.email, &payload.password).await?;
    Ok(Json(pair))
}

/// Refresh endpoint - POST /auth/refresh
pub async fn refresh(
    State(auth): State<Arc<AuthService>>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<TokenPair>, AuthApiError> {
    let Json(payload) = payload?;
    payload
        .validate()
        .map_err(|e| AuthApiError::InvalidInput(e.to_string()))?;

    let pair = auth.refresh_token(&payload.refresh_token).await?;
    Ok(Json(pair))
}

/// Logout endpoint - POST /auth/logout
///
/// Revokes the bearer token as presented; no validation beyond reading the header.
pub async fn logout(
    State(auth): State<Arc<AuthService>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AuthApiError> {
    let token = extract_bearer(&headers)?;
    auth.logout(&token).await?;
    Ok(Json(json!({ "message": "Successfully logged out" })))
}

/// Current user endpoint - GET /auth/me
pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from_user(&user))
}

/// Auth API errors
#[derive(Debug)]
pub enum AuthApiError {
    InvalidInput(String),
    EmailAlreadyExists,
    InvalidCredentials,
    MissingToken,
    InvalidAuthHeader,
    InvalidToken(String),
    Unauthorized,
    Forbidden,
    InternalError,
}

impl From<AuthError> for AuthApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidInput(msg) => AuthApiError::InvalidInput(msg),
            AuthError::DuplicateEmail => AuthApiError::EmailAlreadyExists,
            AuthError::InvalidCredentials => AuthApiError::InvalidCredentials,
            AuthError::Unexpected(e) => {
                error!("Auth operation failed: {:#}", e);
                AuthApiError::InternalError
            }
            other => AuthApiError::InvalidToken(other.to_string()),
        }
    }
}

impl From<JsonRejection> for AuthApiError {
    fn from(rejection: JsonRejection) -> Self {
        AuthApiError::InvalidInput(rejection.body_text())
    }
}

impl IntoResponse for AuthApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AuthApiError::EmailAlreadyExists => {
                (StatusCode::CONFLICT, "Email already exists".to_string())
            }
            AuthApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "Invalid email or password".to_string(),
            ),
            AuthApiError::MissingToken => (
                StatusCode::UNAUTHORIZED,
                "Missing authorization token".to_string(),
            ),
            AuthApiError::InvalidAuthHeader => (
                StatusCode::UNAUTHORIZED,
                "Invalid authorization format. Use: Bearer {token}".to_string(),
            ),
            AuthApiError::InvalidToken(reason) => (StatusCode::UNAUTHORIZED, reason),
            AuthApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
            ),
            AuthApiError::Forbidden => {
                (StatusCode::FORBIDDEN, "Insufficient permissions".to_string())
            }
            AuthApiError::InternalError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unexpected error".to_string(),
            ),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
