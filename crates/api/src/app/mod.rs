//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: infrastructure wiring (store, bus, stock service)
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router with freshly-wired services.
pub async fn build_app() -> Router {
    let services = Arc::new(services::build_services().await);
    build_app_with(services)
}

/// Build the router around explicitly-provided services (tests inject
/// their own wiring here).
pub fn build_app_with(services: Arc<services::AppServices>) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api/v1/inventory", routes::stock::router())
        .layer(Extension(services))
        .layer(ServiceBuilder::new())
}
