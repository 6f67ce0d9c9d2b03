//! Axum router configuration with middleware.
//!
//! API routes live under `/api/`. Every other path falls through to the
//! static dashboard directory (`index.html` for `/`) when it exists; without
//! it only the API is served and unknown paths answer 404.

use std::path::Path;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState, static_dir: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/entry", post(handlers::entry::record_entry))
        .route("/occupancy", get(handlers::occupancy::get_occupancy))
        .route("/latest", get(handlers::occupancy::get_latest))
        .route("/settings", get(handlers::occupancy::get_settings))
        .route("/bus", get(handlers::bus::get_bus_status))
        .route("/health", get(handlers::health::health_check));

    let mut router = Router::new().nest("/api", api_routes);

    if static_dir.is_dir() {
        router = router.fallback_service(ServeDir::new(static_dir));
        tracing::info!(path = %static_dir.display(), "Static file serving enabled");
    } else {
        tracing::warn!(
            path = %static_dir.display(),
            "Static directory not found, serving API only"
        );
    }

    // Layers go on after the fallback so static requests are traced too.
    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
