//! Test utilities for integration tests

use axum::Router;
use credify_issuer::IssuanceConfig;
use credify_server::{config::ServerConfig, state::AppState};
use credify_verifier::VerifierConfig;
use std::time::Duration;

pub const ADMIN_KEY: &str = "test-admin-key";

/// Test application wrapper over the mock ledger and in-memory store
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_admin_key(Some(ADMIN_KEY)).await
    }

    pub async fn with_admin_key(admin_key: Option<&str>) -> Self {
        let server = ServerConfig {
            admin_key: admin_key.map(str::to_string),
            ..ServerConfig::default()
        };
        let issuance = IssuanceConfig {
            inter_batch_delay: Duration::ZERO,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            ..IssuanceConfig::default()
        };

        let state = AppState::build(server, &issuance, &VerifierConfig::default())
            .await
            .unwrap();
        let router = credify_server::create_router(state.clone());

        Self { router, state }
    }

    /// Get the router for making requests
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}
