//! Fleamarket Backend Library
//!
//! Marketplace REST backend: JWT access/refresh authentication with token
//! revocation, role-gated routes, and item listings. Exposed as a library so
//! the binary and the integration tests share the same router.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod items;
pub mod middleware;

pub use api::create_router;
pub use config::{Command, Config};
