//! Auth Service
//! Mission: Signup, login, token rotation, token resolution and logout

use crate::auth::{
    blacklist::TokenBlacklist,
    error::{AuthError, AuthResult},
    jwt::JwtHandler,
    models::{Claims, SignupRequest, TokenKind, TokenPair, User, UserRole},
    user_store::UserStore,
};
use crate::db::StoreError;
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use validator::Validate;

/// Expiry recorded for a logged-out token whose claims cannot be read.
const FALLBACK_BLACKLIST_TTL_SECS: i64 = 3600;

/// Role for the next signup given the current live user count.
pub fn role_for_population(live_users: i64) -> UserRole {
    if live_users == 0 {
        UserRole::Admin
    } else {
        UserRole::User
    }
}

pub struct AuthService {
    users: Arc<dyn UserStore>,
    blacklist: Arc<dyn TokenBlacklist>,
    jwt: Arc<JwtHandler>,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        blacklist: Arc<dyn TokenBlacklist>,
        jwt: Arc<JwtHandler>,
    ) -> Self {
        Self {
            users,
            blacklist,
            jwt,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }

    /// Override the bcrypt work factor (tests use the minimum).
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    /// Register a new account. The first live user becomes `admin`.
    pub async fn signup(&self, email: &str, password: &str) -> AuthResult<User> {
        validate_credentials(email, password)?;

        let cost = self.bcrypt_cost;
        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .context("password hashing task failed")?
            .context("failed to hash password")?;

        match self
            .users
            .create_user(email, &password_hash, &role_for_population)
        {
            Ok(user) => {
                info!("Signup: {} registered as {}", user.email, user.role);
                Ok(user)
            }
            Err(StoreError::Duplicate) => Err(AuthError::DuplicateEmail),
            Err(e) => Err(e.into()),
        }
    }

    /// Check credentials and mint a token pair. No session row is written.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<TokenPair> {
        validate_credentials(email, password)?;

        let Some(user) = self.users.find_by_email(email)? else {
            warn!("Failed login attempt: {} (unknown email)", email);
            return Err(AuthError::InvalidCredentials);
        };

        let password = password.to_string();
        let hash = user.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .context("password verification task failed")?
            .context("failed to verify password hash")?;

        if !valid {
            warn!("Failed login attempt: {} (wrong password)", email);
            return Err(AuthError::InvalidCredentials);
        }

        let pair = self.jwt.issue_pair(&user)?;
        info!("Login successful: {} ({})", user.email, user.role);
        Ok(pair)
    }

    /// Exchange a refresh token for a new pair and revoke the one presented.
    ///
    /// The new pair carries the role currently in the store, not the one in
    /// the presented token. A failure to record the revocation is logged and
    /// does not undo the issued pair.
    pub async fn refresh_token(&self, refresh_token: &str) -> AuthResult<TokenPair> {
        let claims = self.verify(refresh_token, TokenKind::Refresh)?;
        let user = self.current_user(&claims)?;

        let pair = self.jwt.issue_pair(&user)?;

        if let Err(e) = self.blacklist.add(refresh_token, claims.exp) {
            warn!(
                "Failed to blacklist consumed refresh token for user {}: {}",
                claims.sub, e
            );
        }

        info!("Refreshed token pair for {} ({})", user.email, user.role);
        Ok(pair)
    }

    /// Resolve the caller behind an access token, freshly loaded from the store.
    pub async fn get_user_from_token(&self, access_token: &str) -> AuthResult<User> {
        let claims = self.verify(access_token, TokenKind::Access)?;
        let user = self.current_user(&claims)?;
        debug!(
            "Resolved access token to user id={} email={} role={}",
            user.id, user.email, user.role
        );
        Ok(user)
    }

    /// Revoke whatever token string is presented, access or refresh.
    pub async fn logout(&self, token: &str) -> AuthResult<()> {
        let expires_at = match self.jwt.decode_allow_expired(token) {
            Ok(claims) => claims.exp,
            Err(e) => {
                debug!("Logout with unreadable token ({}), using fallback expiry", e);
                Utc::now().timestamp() + FALLBACK_BLACKLIST_TTL_SECS
            }
        };

        match self.blacklist.add(token, expires_at) {
            Ok(()) => {
                info!("Token revoked, blacklisted until {}", expires_at);
                Ok(())
            }
            Err(StoreError::Duplicate) => {
                warn!("Logout of an already blacklisted token");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Drop blacklist entries whose tokens have expired. Maintenance only.
    pub fn purge_expired_tokens(&self) -> AuthResult<usize> {
        let purged = self.blacklist.purge_expired(Utc::now().timestamp())?;
        if purged > 0 {
            info!("Purged {} expired blacklist entries", purged);
        }
        Ok(purged)
    }

    /// Signature, kind, revocation, then expiry. A revoked token reports
    /// `Blacklisted` even after it has expired.
    fn verify(&self, token: &str, expected: TokenKind) -> AuthResult<Claims> {
        let claims = self.jwt.decode_allow_expired(token)?;

        if claims.kind != expected {
            return Err(AuthError::InvalidTokenType { expected });
        }

        if self.blacklist.is_blacklisted(token)? {
            warn!("Attempted use of blacklisted {} token (user {})", expected, claims.sub);
            return Err(AuthError::Blacklisted);
        }

        if claims.is_expired_at(Utc::now()) {
            return Err(AuthError::Expired);
        }

        Ok(claims)
    }

    fn current_user(&self, claims: &Claims) -> AuthResult<User> {
        match self.users.find_by_email(&claims.email)? {
            Some(user) if user.id == claims.sub => Ok(user),
            _ => Err(AuthError::UserNotFound),
        }
    }
}

fn validate_credentials(email: &str, password: &str) -> AuthResult<()> {
    SignupRequest {
        email: email.to_string(),
        password: password.to_string(),
    }
    .validate()
    .map_err(|e| AuthError::InvalidInput(e.to_string()))
}
