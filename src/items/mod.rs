//! Item Listings
//! Mission: Marketplace item CRUD owned by authenticated users

pub mod api;
pub mod models;
pub mod store;

pub use models::{CreateItemRequest, Item, UpdateItemRequest};
pub use store::{ItemStore, SqliteItemStore};
