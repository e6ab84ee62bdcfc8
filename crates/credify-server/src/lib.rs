//! Credify Server Library
//!
//! HTTP surface for credential verification and admin batch issuance.
//! The library exposes modules for integration testing while the binary
//! handles startup.

pub mod admin;
pub mod config;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Admin sub-router (behind auth middleware)
fn admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/issuance/batches",
            get(admin::list_batches).post(admin::submit_batch),
        )
        .route("/issuance/batches/:id", get(admin::get_batch))
        .route("/issuance/batches/:id/cancel", post(admin::cancel_batch))
        .layer(axum_middleware::from_fn_with_state(
            state,
            admin::admin_auth_middleware,
        ))
}

/// CORS layer from the configured origins.
///
/// `*` allows any origin; otherwise only the listed ones.
fn cors_layer(origins: &str) -> CorsLayer {
    let allow_origin = if origins.trim() == "*" {
        AllowOrigin::any()
    } else {
        let parsed: Vec<_> = origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .max_age(std::time::Duration::from_secs(3600))
}

/// Create the main router with all routes configured
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/health", get(routes::health))
        .route("/authority", get(routes::authority))
        .route("/verify/:asset_id", get(routes::verify))
        .nest("/admin", admin_router(state.clone()))
        .with_state(state)
        .layer(axum_middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
