//! Error taxonomy for the token codec and the auth service.

use crate::auth::models::TokenKind;
use crate::db::StoreError;
use thiserror::Error;

/// Token codec failures.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Signature or algorithm does not match the HS256 shared-secret scheme.
    #[error("invalid token signature")]
    InvalidSignature,

    /// Not a JWT, or its claims cannot be parsed.
    #[error("malformed token")]
    Malformed,

    /// Validly signed but past `exp`.
    #[error("token is expired")]
    Expired,

    #[error("failed to sign token: {0}")]
    Encoding(#[source] jsonwebtoken::errors::Error),
}

/// Auth service failures.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("email already exists")]
    DuplicateEmail,

    /// Unknown email or wrong password; deliberately indistinguishable.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The token's subject no longer exists in the credential store.
    #[error("user not found")]
    UserNotFound,

    #[error("invalid token type: {expected} token required")]
    InvalidTokenType { expected: TokenKind },

    #[error("token is expired")]
    Expired,

    #[error("token is blacklisted")]
    Blacklisted,

    #[error("invalid token")]
    MalformedToken,

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type AuthResult<T> = Result<T, AuthError>;

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::Expired,
            TokenError::InvalidSignature | TokenError::Malformed => AuthError::MalformedToken,
            TokenError::Encoding(e) => AuthError::Unexpected(anyhow::Error::new(e)),
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::Unexpected(anyhow::Error::new(err))
    }
}

impl AuthError {
    /// Token-validation failures, as opposed to input, credential or infrastructure errors.
    pub fn is_token_rejection(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidTokenType { .. }
                | AuthError::Expired
                | AuthError::Blacklisted
                | AuthError::MalformedToken
                | AuthError::UserNotFound
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_errors_collapse_to_service_errors() {
        assert!(matches!(
            AuthError::from(TokenError::Expired),
            AuthError::Expired
        ));
        assert!(matches!(
            AuthError::from(TokenError::InvalidSignature),
            AuthError::MalformedToken
        ));
        assert!(matches!(
            AuthError::from(TokenError::Malformed),
            AuthError::MalformedToken
        ));
    }

    #[test]
    fn test_store_errors_are_unexpected() {
        let err = AuthError::from(StoreError::NotFound);
        assert!(matches!(err, AuthError::Unexpected(_)));
        assert!(!err.is_token_rejection());
    }

    #[test]
    fn test_invalid_token_type_message() {
        let err = AuthError::InvalidTokenType {
            expected: TokenKind::Refresh,
        };
        assert_eq!(err.to_string(), "invalid token type: refresh token required");
        assert!(err.is_token_rejection());
    }
}
