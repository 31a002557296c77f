use axum::{
    middleware,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::auth::{self, auth_middleware, require_roles, AllowedRoles, AuthService, UserRole};
use crate::items::{self, ItemStore};
use crate::middleware::request_logging;

/// Create the API router
///
/// Public: `/health`, `/auth/{signup,login,refresh,logout}`, `GET /items`.
/// Bearer access token: `/auth/me`, `GET|PUT /items/:id`, `POST /items`.
/// Bearer access token + admin role: `DELETE /items/:id`.
pub fn create_router(auth_service: Arc<AuthService>, item_store: Arc<dyn ItemStore>) -> Router {
    let require_auth = middleware::from_fn_with_state(auth_service.clone(), auth_middleware);
    let admin_only =
        middleware::from_fn_with_state(AllowedRoles::new([UserRole::Admin]), require_roles);

    let auth_routes = Router::new()
        .route("/auth/signup", post(auth::api::signup))
        .route("/auth/login", post(auth::api::login))
        .route("/auth/refresh", post(auth::api::refresh))
        .route("/auth/logout", post(auth::api::logout))
        .with_state(auth_service);

    let me_route = Router::new()
        .route("/auth/me", get(auth::api::me))
        .route_layer(require_auth.clone());

    let public_items = Router::new().route("/items", get(items::api::list_items));

    let owned_items = Router::new()
        .route("/items", post(items::api::create_item))
        .route(
            "/items/:id",
            get(items::api::get_item).put(items::api::update_item),
        )
        .route_layer(require_auth.clone());

    // Layers added last run first: authenticate, then check the role.
    let admin_items = Router::new()
        .route("/items/:id", delete(items::api::delete_item))
        .route_layer(admin_only)
        .route_layer(require_auth);

    let item_routes = public_items
        .merge(owned_items)
        .merge(admin_items)
        .with_state(item_store);

    Router::new()
        .route("/health", get(health_check))
        .merge(auth_routes)
        .merge(me_route)
        .merge(item_routes)
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive())
}

// ===== Route Handlers =====

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}
