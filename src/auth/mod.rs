//! Authentication Module
//! Mission: JWT access/refresh tokens, revocation, and role-based route protection

pub mod api;
pub mod blacklist;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod service;
pub mod user_store;

pub use blacklist::{InMemoryTokenBlacklist, SqliteTokenBlacklist, TokenBlacklist};
pub use error::{AuthError, AuthResult, TokenError};
pub use jwt::JwtHandler;
pub use middleware::{auth_middleware, require_roles, AllowedRoles, CurrentUser};
pub use models::{Claims, TokenKind, TokenPair, User, UserRole};
pub use service::AuthService;
pub use user_store::{SqliteUserStore, UserStore};
