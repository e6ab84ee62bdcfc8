//! Public HTTP route handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use credify_core::CredifyError;
use credify_verifier::VerificationOutcome;
use serde::Serialize;

use crate::state::AppState;

/// JSON error body with a status derived from the error class
pub struct ApiError(pub CredifyError);

impl From<CredifyError> for ApiError {
    fn from(err: CredifyError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CredifyError::Validation(_) | CredifyError::Serialization(_) => StatusCode::BAD_REQUEST,
            CredifyError::PolicyRejection(_) => StatusCode::FORBIDDEN,
            CredifyError::Proof(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CredifyError::Transport(_) => StatusCode::BAD_GATEWAY,
            CredifyError::Cancelled(_) => StatusCode::CONFLICT,
            CredifyError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(serde_json::json!({
                "error": format!("{:?}", self.0.class()),
                "error_description": self.0.to_string(),
            })),
        )
            .into_response()
    }
}

/// Health check
pub async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorityInfo {
    pub program_id: String,
    pub authority: String,
    pub bump: u8,
    pub chain_backend: String,
    pub tree_id: String,
    pub collection_id: String,
}

/// `GET /authority`
pub async fn authority(State(state): State<AppState>) -> Json<AuthorityInfo> {
    let authority = state.coordinator.authority();
    Json(AuthorityInfo {
        program_id: authority.program_id.to_base58(),
        authority: authority.address.to_base58(),
        bump: authority.bump,
        chain_backend: state.coordinator.chain_name().to_string(),
        tree_id: state.tree_id.clone(),
        collection_id: state.collection_id.clone(),
    })
}

/// `GET /verify/:asset_id`
///
/// `verified` and `invalid` are answers and return 200; `error` means the
/// answer could not be determined and returns 503.
pub async fn verify(
    State(state): State<AppState>,
    Path(asset_id): Path<String>,
) -> (StatusCode, Json<VerificationOutcome>) {
    let outcome = state.verifier.verify(&asset_id).await;
    let status = match outcome {
        VerificationOutcome::Error { .. } => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };
    (status, Json(outcome))
}
