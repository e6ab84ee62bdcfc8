//! Application state

use chrono::{DateTime, Utc};
use credify_core::{AssetQuery, BatchOutcome, CredifyError};
use credify_issuer::{build_stack, BatchIssuanceCoordinator, BatchRequest, IssuanceConfig};
use credify_verifier::{DasAssetQuery, VerificationEngine, VerifierConfig};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::ServerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Running,
    Completed,
    Cancelled,
    Failed,
}

/// A submitted issuance batch
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRecord {
    pub id: Uuid,
    pub status: BatchStatus,
    pub submitted_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub students: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<BatchOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    cancel: CancellationToken,
}

/// Drop the oldest finished records beyond `keep`; running batches stay
fn prune_finished(batches: &mut HashMap<Uuid, BatchRecord>, keep: usize) {
    let mut finished: Vec<(DateTime<Utc>, Uuid)> = batches
        .values()
        .filter_map(|r| r.finished_at.map(|at| (at, r.id)))
        .collect();
    if finished.len() <= keep {
        return;
    }
    finished.sort();
    let excess = finished.len() - keep;
    for (_, id) in finished.into_iter().take(excess) {
        batches.remove(&id);
    }
    debug!(dropped = excess, kept = keep, "Pruned finished batches");
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub coordinator: Arc<BatchIssuanceCoordinator>,
    pub verifier: Arc<VerificationEngine>,
    /// Defaults for requests that omit the tree or collection
    pub tree_id: String,
    pub collection_id: String,
    batches: Arc<RwLock<HashMap<Uuid, BatchRecord>>>,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        coordinator: Arc<BatchIssuanceCoordinator>,
        verifier: Arc<VerificationEngine>,
        tree_id: String,
        collection_id: String,
    ) -> Self {
        Self {
            config: Arc::new(config),
            coordinator,
            verifier,
            tree_id,
            collection_id,
            batches: Arc::new(RwLock::new(HashMap::new())),
            shutdown: CancellationToken::new(),
        }
    }

    /// Wire issuance and verification from config.
    ///
    /// Verification queries the DAS endpoint when one is configured and
    /// otherwise the mock ledger the issuance stack mints into.
    pub async fn build(
        config: ServerConfig,
        issuance: &IssuanceConfig,
        verifier: &VerifierConfig,
    ) -> Result<Self, CredifyError> {
        let stack = build_stack(issuance).await?;

        let query: Arc<dyn AssetQuery> = match (&verifier.das_url, &stack.ledger) {
            (Some(url), _) => Arc::new(DasAssetQuery::new(url)?),
            (None, Some(ledger)) => ledger.clone() as Arc<dyn AssetQuery>,
            (None, None) => {
                return Err(CredifyError::Config(
                    "CREDIFY_DAS_URL is required with the live chain backend".into(),
                ))
            }
        };
        let engine = VerificationEngine::from_config(verifier, query)?;

        Ok(Self::new(
            config,
            stack.coordinator,
            Arc::new(engine),
            stack.tree_id.to_base58(),
            stack.collection_id.to_base58(),
        ))
    }

    pub async fn batch(&self, id: Uuid) -> Option<BatchRecord> {
        self.batches.read().await.get(&id).cloned()
    }

    /// Batches, newest first
    pub async fn batches(&self) -> Vec<BatchRecord> {
        let mut all: Vec<_> = self.batches.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        all
    }

    async fn register(&self, students: usize) -> (Uuid, CancellationToken) {
        let cancel = self.shutdown.child_token();
        let id = Uuid::new_v4();
        self.batches.write().await.insert(
            id,
            BatchRecord {
                id,
                status: BatchStatus::Running,
                submitted_at: Utc::now(),
                finished_at: None,
                students,
                outcome: None,
                error: None,
                cancel: cancel.clone(),
            },
        );
        info!(batch = %id, students, "Batch submitted");
        (id, cancel)
    }

    /// Register a batch and run it in the background
    pub async fn submit(&self, request: BatchRequest) -> Uuid {
        let (id, cancel) = self.register(request.rows.len()).await;
        self.spawn_run(id, request, cancel);
        id
    }

    /// Run a batch to completion before returning.
    ///
    /// The run itself is a background task. Dropping this future (the
    /// client went away) cancels the run, and the task still records the
    /// cancelled outcome.
    pub async fn submit_and_wait(&self, request: BatchRequest) -> Option<BatchRecord> {
        let (id, cancel) = self.register(request.rows.len()).await;
        let guard = cancel.clone().drop_guard();
        let record = match self.spawn_run(id, request, cancel).await {
            Ok(record) => record,
            Err(err) => {
                error!(batch = %id, error = %err, "Batch task aborted");
                None
            }
        };
        guard.disarm();
        record
    }

    fn spawn_run(
        &self,
        id: Uuid,
        request: BatchRequest,
        cancel: CancellationToken,
    ) -> JoinHandle<Option<BatchRecord>> {
        let state = self.clone();
        tokio::spawn(async move {
            let result = state.coordinator.issue(&request, &cancel).await;
            state.finish(id, result).await
        })
    }

    async fn finish(
        &self,
        id: Uuid,
        result: Result<BatchOutcome, CredifyError>,
    ) -> Option<BatchRecord> {
        let mut batches = self.batches.write().await;
        let record = batches.get_mut(&id)?;
        record.finished_at = Some(Utc::now());

        match result {
            Ok(outcome) => {
                record.status = if outcome.cancelled {
                    BatchStatus::Cancelled
                } else {
                    BatchStatus::Completed
                };
                info!(
                    batch = %id,
                    successful = outcome.successful,
                    failed = outcome.failed,
                    "Batch finished"
                );
                record.outcome = Some(outcome);
            }
            Err(err) => {
                error!(batch = %id, error = %err, "Batch rejected");
                record.status = BatchStatus::Failed;
                record.error = Some(err.to_string());
            }
        }
        let record = record.clone();

        prune_finished(&mut batches, self.config.batch_retention);
        Some(record)
    }

    /// Request cancellation; `false` when the batch is unknown
    pub async fn cancel(&self, id: Uuid) -> bool {
        match self.batches.read().await.get(&id) {
            Some(record) => {
                record.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every running batch and release the issuance backends
    pub async fn shutdown(&self) -> Result<(), CredifyError> {
        self.shutdown.cancel();
        self.coordinator.shutdown().await
    }
}
