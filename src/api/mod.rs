//! HTTP boundary: routing, request binding, and error rendering. The engine
//! emits structured errors; everything message-shaped lives here.

pub mod error;

mod blocks;
mod bookings;

use std::sync::Arc;

use axum::{
    http::{header, Method},
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::engine::Engine;

/// Create the API router with all routes and middleware.
pub fn create_router(engine: Arc<Engine>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(Any);

    Router::new()
        .route("/healthz", get(health))
        .nest("/api/bookings", bookings::routes())
        .nest("/api/blocks", blocks::routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(engine)
}

async fn health() -> &'static str {
    "ok"
}
