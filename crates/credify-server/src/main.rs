//! Credify Server
//!
//! HTTP server for credential verification and batch issuance.

use anyhow::Context;
use credify_issuer::IssuanceConfig;
use credify_server::{config::ServerConfig, create_router, state::AppState};
use credify_verifier::VerifierConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "credify=info,credify_server=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let server = ServerConfig::from_env().context("server config")?;
    let issuance = IssuanceConfig::from_env().context("issuance config")?;
    let verifier = VerifierConfig::from_env().context("verifier config")?;
    if server.admin_key.is_none() {
        tracing::warn!("CREDIFY_ADMIN_KEY is not set; admin routes are disabled");
    }

    let bind = server.bind;
    let state = AppState::build(server, &issuance, &verifier)
        .await
        .context("failed to wire issuance and verification")?;
    let app = create_router(state.clone());

    tracing::info!("Starting Credify server on {}", bind);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {}", bind))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    state.shutdown().await?;
    tracing::info!("Server stopped");
    Ok(())
}
