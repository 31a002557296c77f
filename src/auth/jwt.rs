//! JWT Token Handler
//! Mission: Issue and verify HS256 access/refresh tokens with a shared secret

use crate::auth::error::TokenError;
use crate::auth::models::{Claims, TokenKind, TokenPair, User, UserRole};
use chrono::{DateTime, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use tracing::debug;
use uuid::Uuid;

/// JWT Handler for token operations
pub struct JwtHandler {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtHandler {
    /// Create a new JWT handler with secret key
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Sign a token of `kind` for the given subject, expiring `kind.ttl()` from now
    pub fn issue(
        &self,
        kind: TokenKind,
        user_id: i64,
        email: &str,
        role: UserRole,
    ) -> Result<String, TokenError> {
        self.issue_at(kind, user_id, email, role, Utc::now())
    }

    /// Same as [`issue`](Self::issue) with an explicit issuance instant.
    pub fn issue_at(
        &self,
        kind: TokenKind,
        user_id: i64,
        email: &str,
        role: UserRole,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            role,
            kind,
            iat: issued_at.timestamp(),
            exp: (issued_at + kind.ttl()).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        debug!(
            "Issuing {} token for user {} ({}), exp={}",
            kind, email, user_id, claims.exp
        );

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Encoding)
    }

    /// Issue a fresh access + refresh pair for a user
    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, TokenError> {
        let access_token = self.issue(TokenKind::Access, user.id, &user.email, user.role)?;
        let refresh_token = self.issue(TokenKind::Refresh, user.id, &user.email, user.role)?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Verify signature and structure, and reject tokens past `exp`
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        self.decode_with(token, true)
    }

    /// Verify signature and structure without enforcing `exp`.
    ///
    /// Callers that need to report revocation ahead of expiry, or that only
    /// want the expiry value itself, use this and check `exp` on their own.
    pub fn decode_allow_expired(&self, token: &str) -> Result<Claims, TokenError> {
        self.decode_with(token, false)
    }

    fn decode_with(&self, token: &str, check_exp: bool) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = check_exp;

        let decoded = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidAlgorithmName => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            }
        })?;

        Ok(decoded.claims)
    }
}
