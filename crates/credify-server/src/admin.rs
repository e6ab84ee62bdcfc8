//! Admin API routes
//!
//! All admin endpoints require the `X-Admin-Key` header to match the
//! configured admin key.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use credify_core::{CredifyError, StudentRecord};
use credify_issuer::BatchRequest;
use serde::Deserialize;
use uuid::Uuid;

use crate::routes::ApiError;
use crate::state::{AppState, BatchRecord};

// ── Auth middleware ──────────────────────────────────────────────

/// Checks `X-Admin-Key` against the configured key
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(admin_key) = state.config.admin_key.as_deref() else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let provided = request
        .headers()
        .get("X-Admin-Key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if provided != admin_key {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}

// ── Issuance batches ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBatch {
    pub tree_id: Option<String>,
    pub collection_id: Option<String>,
    pub rows: Vec<StudentRecord>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubmitParams {
    /// Run the batch inside the request and return its outcome
    #[serde(default)]
    pub wait: bool,
}

/// `POST /admin/issuance/batches`
pub async fn submit_batch(
    State(state): State<AppState>,
    Query(params): Query<SubmitParams>,
    Json(body): Json<SubmitBatch>,
) -> Result<Response, ApiError> {
    if body.rows.is_empty() {
        return Err(CredifyError::validation("no students to issue").into());
    }
    let request = BatchRequest {
        tree_id: body.tree_id.unwrap_or_else(|| state.tree_id.clone()),
        collection_id: body
            .collection_id
            .unwrap_or_else(|| state.collection_id.clone()),
        rows: body.rows,
    };

    if params.wait {
        let record = state
            .submit_and_wait(request)
            .await
            .ok_or_else(|| CredifyError::Serialization("batch record vanished".into()))?;
        return Ok((StatusCode::OK, Json(record)).into_response());
    }

    let id = state.submit(request).await;
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "id": id, "status": "running" })),
    )
        .into_response())
}

/// `GET /admin/issuance/batches`
pub async fn list_batches(State(state): State<AppState>) -> Json<Vec<BatchRecord>> {
    Json(state.batches().await)
}

/// `GET /admin/issuance/batches/:id`
pub async fn get_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BatchRecord>, StatusCode> {
    state.batch(id).await.map(Json).ok_or(StatusCode::NOT_FOUND)
}

/// `POST /admin/issuance/batches/:id/cancel`
pub async fn cancel_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> StatusCode {
    if state.cancel(id).await {
        StatusCode::ACCEPTED
    } else {
        StatusCode::NOT_FOUND
    }
}
