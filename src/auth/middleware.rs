//! Authentication Middleware
//! Mission: Protect API endpoints with JWT validation and role gates

use crate::auth::{
    api::AuthApiError,
    models::{User, UserRole},
    service::AuthService,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Caller resolved by [`auth_middleware`], available to downstream handlers.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AuthApiError::Unauthorized)
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header.
pub fn extract_bearer(headers: &HeaderMap) -> Result<String, AuthApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthApiError::MissingToken)?
        .to_str()
        .map_err(|_| AuthApiError::InvalidAuthHeader)?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme == "Bearer" && !token.trim().is_empty() => {
            Ok(token.trim().to_string())
        }
        _ => Err(AuthApiError::InvalidAuthHeader),
    }
}

/// Validate the bearer access token and attach the store-fresh user.
pub async fn auth_middleware(
    State(auth): State<Arc<AuthService>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthApiError> {
    let token = extract_bearer(req.headers())?;

    let user = auth.get_user_from_token(&token).await.map_err(|e| {
        if e.is_token_rejection() {
            debug!("Rejected access token on {}: {}", req.uri().path(), e);
        }
        AuthApiError::from(e)
    })?;

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

/// Roles admitted by [`require_roles`].
#[derive(Debug, Clone)]
pub struct AllowedRoles(Arc<[UserRole]>);

impl AllowedRoles {
    pub fn new(roles: impl IntoIterator<Item = UserRole>) -> Self {
        Self(roles.into_iter().collect())
    }

    pub fn admits(&self, role: UserRole) -> bool {
        self.0.contains(&role)
    }
}

/// Role gate. Must run after [`auth_middleware`] has attached the caller.
pub async fn require_roles(
    State(allowed): State<AllowedRoles>,
    req: Request,
    next: Next,
) -> Result<Response, AuthApiError> {
    let Some(CurrentUser(user)) = req.extensions().get::<CurrentUser>() else {
        return Err(AuthApiError::Unauthorized);
    };

    if !allowed.admits(user.role) {
        warn!(
            "Forbidden: user {} ({}) on {}",
            user.id,
            user.role,
            req.uri().path()
        );
        return Err(AuthApiError::Forbidden);
    }

    Ok(next.run(req).await)
}
