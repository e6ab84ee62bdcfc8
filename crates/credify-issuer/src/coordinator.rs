//! Batch issuance coordinator
//!
//! Students are split into groups of `concurrency`. Each group runs its
//! per-student pipelines concurrently
//! (render -> upload image -> build metadata -> upload metadata -> mint)
//! and groups run one after another with a fixed delay between them. A
//! failing student becomes an error result and never aborts the batch.

use credify_core::{
    Address, BatchOutcome, ChainMintAdapter, ContentStore, CredifyError, IssuanceResult,
    IssuanceStage, MintRequest, StudentRecord,
};
use credify_crypto::ProgramAuthority;
use credify_render::CertificateRenderer;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::IssuanceConfig;
use crate::content_store::{image_tags, metadata_tags};
use crate::metadata::MetadataBuilder;
use crate::progress::{ProgressObserver, ProgressTracker, TracingObserver};
use crate::retry::RetryPolicy;

/// Input of the batch issuance entrypoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub tree_id: String,
    pub collection_id: String,
    pub rows: Vec<StudentRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    pub concurrency: usize,
    pub inter_batch_delay: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: 5,
            inter_batch_delay: Duration::from_millis(1000),
        }
    }
}

/// Per-run state shared by every student pipeline
struct RunContext<'a> {
    tree_id: Address,
    collection_id: Address,
    metadata: MetadataBuilder,
    tracker: ProgressTracker,
    cancel: &'a CancellationToken,
}

pub struct BatchIssuanceCoordinator {
    renderer: Arc<CertificateRenderer>,
    metadata: MetadataBuilder,
    content_store: Arc<dyn ContentStore>,
    chain: Arc<dyn ChainMintAdapter>,
    retry: RetryPolicy,
    authority: ProgramAuthority,
    observer: Arc<dyn ProgressObserver>,
    options: BatchOptions,
    batch_token: Option<String>,
}

impl BatchIssuanceCoordinator {
    pub fn new(
        renderer: Arc<CertificateRenderer>,
        content_store: Arc<dyn ContentStore>,
        chain: Arc<dyn ChainMintAdapter>,
        authority: ProgramAuthority,
    ) -> Self {
        Self {
            renderer,
            metadata: MetadataBuilder::default(),
            content_store,
            chain,
            retry: RetryPolicy::default(),
            authority,
            observer: Arc::new(TracingObserver),
            options: BatchOptions::default(),
            batch_token: None,
        }
    }

    /// Coordinator wired from config with the given collaborators
    pub fn from_config(
        config: &IssuanceConfig,
        content_store: Arc<dyn ContentStore>,
        chain: Arc<dyn ChainMintAdapter>,
    ) -> Result<Self, CredifyError> {
        config.validate()?;
        let authority = ProgramAuthority::for_program(&config.program_id)?;
        let renderer = Arc::new(config.renderer()?);

        Ok(Self::new(renderer, content_store, chain, authority)
            .with_metadata_builder(config.metadata_builder())
            .with_retry(RetryPolicy::new(config.retry_options()))
            .with_options(BatchOptions {
                concurrency: config.concurrency,
                inter_batch_delay: config.inter_batch_delay,
            }))
    }

    pub fn with_metadata_builder(mut self, metadata: MetadataBuilder) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_options(mut self, options: BatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Use a fixed uniqueness token instead of drawing one per run
    pub fn with_batch_token(mut self, token: impl Into<String>) -> Self {
        self.batch_token = Some(token.into());
        self
    }

    pub fn authority(&self) -> &ProgramAuthority {
        &self.authority
    }

    pub fn options(&self) -> BatchOptions {
        self.options
    }

    pub fn chain_name(&self) -> &str {
        self.chain.name()
    }

    /// Refuse any mint whose delegate is not the program authority
    pub fn ensure_soulbound(&self, request: &MintRequest) -> Result<(), CredifyError> {
        if request.leaf_delegate != self.authority.address {
            return Err(CredifyError::policy(format!(
                "leaf delegate {} is not the program authority {}",
                request.leaf_delegate, self.authority.address
            )));
        }
        Ok(())
    }

    /// Run a batch with the coordinator's default options
    pub async fn issue(
        &self,
        request: &BatchRequest,
        cancel: &CancellationToken,
    ) -> Result<BatchOutcome, CredifyError> {
        self.run(
            &request.rows,
            &request.tree_id,
            &request.collection_id,
            self.options,
            cancel,
        )
        .await
    }

    /// Issue one credential per student.
    ///
    /// Only a structurally invalid request is an `Err`; every per-student
    /// failure is reported inside the outcome.
    pub async fn run(
        &self,
        students: &[StudentRecord],
        tree_id: &str,
        collection_id: &str,
        options: BatchOptions,
        cancel: &CancellationToken,
    ) -> Result<BatchOutcome, CredifyError> {
        if students.is_empty() {
            return Err(CredifyError::validation("no students to issue"));
        }
        if options.concurrency == 0 {
            return Err(CredifyError::validation("concurrency must be at least 1"));
        }
        let tree_id = Address::parse(tree_id)
            .map_err(|e| CredifyError::validation(format!("tree id: {}", e)))?;
        let collection_id = Address::parse(collection_id)
            .map_err(|e| CredifyError::validation(format!("collection id: {}", e)))?;

        let token = self
            .batch_token
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string()[..8].to_string());

        let ctx = RunContext {
            tree_id,
            collection_id,
            metadata: self.metadata.clone().with_token(token.clone()),
            tracker: ProgressTracker::new(self.observer.clone(), students.len()),
            cancel,
        };

        let groups = students.len().div_ceil(options.concurrency);
        info!(
            students = students.len(),
            groups,
            concurrency = options.concurrency,
            chain = self.chain.name(),
            token = %token,
            "Starting batch issuance"
        );

        let mut results = Vec::with_capacity(students.len());
        let mut transport_retries = 0u64;
        let mut cancelled = false;

        for (group_index, group) in students.chunks(options.concurrency).enumerate() {
            let offset = group_index * options.concurrency;

            if group_index > 0 && !cancel.is_cancelled() {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(options.inter_batch_delay) => {}
                }
            }
            if cancel.is_cancelled() {
                cancelled = true;
                info!(remaining = students.len() - offset, "Batch cancelled");
                for (i, student) in students.iter().enumerate().skip(offset) {
                    let key = student.key();
                    ctx.tracker.stage(i, &key, IssuanceStage::Error);
                    results.push(IssuanceResult::error(
                        i,
                        key,
                        IssuanceStage::Pending,
                        CredifyError::Cancelled("batch cancelled".into()).to_string(),
                    ));
                }
                break;
            }

            info!(group = group_index + 1, groups, size = group.len(), "Processing group");
            let outcomes = join_all(
                group
                    .iter()
                    .enumerate()
                    .map(|(i, student)| self.process_student(&ctx, offset + i, student)),
            )
            .await;

            for (result, retries) in outcomes {
                transport_retries += retries;
                results.push(result);
            }
        }

        let outcome = BatchOutcome::from_results(results, transport_retries, cancelled);
        info!(
            total = outcome.total,
            successful = outcome.successful,
            failed = outcome.failed,
            transport_retries = outcome.transport_retries,
            cancelled = outcome.cancelled,
            "Batch issuance finished"
        );
        Ok(outcome)
    }

    async fn process_student(
        &self,
        ctx: &RunContext<'_>,
        index: usize,
        student: &StudentRecord,
    ) -> (IssuanceResult, u64) {
        let key = student.key();
        let mut stage = IssuanceStage::Pending;
        let mut retries = 0u64;
        ctx.tracker.stage(index, &key, stage);

        match self
            .pipeline(ctx, index, student, &key, &mut stage, &mut retries)
            .await
        {
            Ok(result) => {
                ctx.tracker.stage(index, &key, IssuanceStage::Done);
                (result, retries)
            }
            Err(err) => {
                error!(index, student = %key, stage = %stage, error = %err, "Issuance failed");
                ctx.tracker.stage(index, &key, IssuanceStage::Error);
                (IssuanceResult::error(index, key, stage, err.to_string()), retries)
            }
        }
    }

    async fn pipeline(
        &self,
        ctx: &RunContext<'_>,
        index: usize,
        student: &StudentRecord,
        key: &str,
        stage: &mut IssuanceStage,
        retries: &mut u64,
    ) -> Result<IssuanceResult, CredifyError> {
        let mut advance = |next: IssuanceStage| {
            *stage = next;
            ctx.tracker.stage(index, key, next);
        };

        let owner = student.validate()?;
        let certificate_id = ctx.metadata.certificate_id(student);
        let resolved = student.clone().with_certificate_id(certificate_id.clone());

        advance(IssuanceStage::Generating);
        let renderer = self.renderer.clone();
        let to_render = resolved.clone();
        let artifact = tokio::task::spawn_blocking(move || renderer.render(&to_render))
            .await
            .map_err(|e| CredifyError::Serialization(format!("render task failed: {}", e)))??;

        advance(IssuanceStage::UploadingImage);
        let tags = image_tags(&certificate_id);
        let outcome = self
            .retry
            .execute("upload-image", ctx.cancel, || {
                self.content_store.upload(&artifact.bytes, &tags)
            })
            .await;
        *retries += u64::from(outcome.retries());
        let image_uri = outcome.into_result()?;

        advance(IssuanceStage::UploadingMetadata);
        let record = ctx.metadata.build(&resolved, &image_uri)?;
        let json = record.to_json_bytes()?;
        let tags = metadata_tags(&certificate_id);
        let outcome = self
            .retry
            .execute("upload-metadata", ctx.cancel, || {
                self.content_store.upload(&json, &tags)
            })
            .await;
        *retries += u64::from(outcome.retries());
        let metadata_uri = outcome.into_result()?;

        advance(IssuanceStage::Minting);
        let request = MintRequest {
            leaf_owner: owner,
            leaf_delegate: self.authority.address,
            tree_id: ctx.tree_id,
            metadata_uri: metadata_uri.clone(),
            collection_id: ctx.collection_id,
            name: record.name.clone(),
            symbol: record.symbol.clone(),
        };
        self.ensure_soulbound(&request)?;

        let outcome = self
            .retry
            .execute("mint", ctx.cancel, || self.chain.mint(&request))
            .await;
        *retries += u64::from(outcome.retries());
        let receipt = outcome.into_result()?;

        Ok(IssuanceResult::done(
            index,
            key,
            receipt.signature,
            certificate_id,
            metadata_uri,
        )
        .with_asset_id(receipt.asset_id))
    }

    /// Release the content store and chain adapter
    pub async fn shutdown(&self) -> Result<(), CredifyError> {
        self.content_store.shutdown().await?;
        self.chain.shutdown().await?;
        info!("Issuance coordinator shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{InMemoryLedger, MockChainMintAdapter};
    use crate::content_store::InMemoryContentStore;
    use crate::retry::RetryOptions;
    use credify_core::UploadTags;
    use credify_render::CertificateTemplate;
    use std::sync::atomic::{AtomicU32, Ordering};

    const WALLET: &str = "11111111111111111111111111111111";

    fn tree() -> Address {
        Address::new([9u8; 32])
    }

    fn collection() -> Address {
        Address::new([8u8; 32])
    }

    fn renderer() -> Arc<CertificateRenderer> {
        Arc::new(CertificateRenderer::with_builtin_font(CertificateTemplate {
            width: 300,
            height: 200,
            include_qr: false,
            ..CertificateTemplate::default()
        }))
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(RetryOptions {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            ..RetryOptions::default()
        })
    }

    fn coordinator(store: Arc<dyn ContentStore>) -> BatchIssuanceCoordinator {
        let ledger = Arc::new(InMemoryLedger::new(tree(), collection()));
        let authority = ProgramAuthority::for_program(WALLET).unwrap();
        BatchIssuanceCoordinator::new(
            renderer(),
            store,
            Arc::new(MockChainMintAdapter::new(ledger)),
            authority,
        )
        .with_retry(fast_retry())
        .with_batch_token("t1")
        .with_options(BatchOptions {
            concurrency: 2,
            inter_batch_delay: Duration::ZERO,
        })
    }

    fn students(n: usize) -> Vec<StudentRecord> {
        (0..n)
            .map(|i| {
                StudentRecord::new(
                    format!("Student {}", i),
                    format!("s{}@apec.edu", i),
                    "CS",
                    "2025-01-15",
                    WALLET,
                )
            })
            .collect()
    }

    /// Fails the first `failures` uploads with a transport error
    struct FlakyStore {
        inner: InMemoryContentStore,
        failures: AtomicU32,
    }

    #[async_trait::async_trait]
    impl ContentStore for FlakyStore {
        async fn upload(&self, bytes: &[u8], tags: &UploadTags) -> Result<String, CredifyError> {
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(CredifyError::transport("ETIMEDOUT"));
            }
            self.inner.upload(bytes, tags).await
        }
    }

    async fn run(
        coordinator: &BatchIssuanceCoordinator,
        rows: &[StudentRecord],
    ) -> Result<BatchOutcome, CredifyError> {
        coordinator
            .run(
                rows,
                &tree().to_base58(),
                &collection().to_base58(),
                coordinator.options(),
                &CancellationToken::new(),
            )
            .await
    }

    #[tokio::test]
    async fn test_empty_batch_is_structural_error() {
        let c = coordinator(Arc::new(InMemoryContentStore::default()));
        assert!(matches!(run(&c, &[]).await, Err(CredifyError::Validation(_))));
    }

    #[tokio::test]
    async fn test_bad_tree_is_structural_error() {
        let c = coordinator(Arc::new(InMemoryContentStore::default()));
        let err = c
            .run(&students(1), "", &collection().to_base58(), c.options(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("tree id"));
    }

    #[tokio::test]
    async fn test_transport_retries_are_counted() {
        let store = Arc::new(FlakyStore {
            inner: InMemoryContentStore::default(),
            failures: AtomicU32::new(2),
        });
        let c = coordinator(store);
        let outcome = run(&c, &students(1)).await.unwrap();
        assert_eq!(outcome.successful, 1);
        assert_eq!(outcome.transport_retries, 2);
    }

    #[tokio::test]
    async fn test_quota_rejection_fails_only_that_student() {
        let store = Arc::new(InMemoryContentStore::default().with_quota(1));
        let c = coordinator(store);
        let outcome = run(&c, &students(2)).await.unwrap();
        assert_eq!(outcome.failed, 2);
        assert_eq!(outcome.transport_retries, 0);
        let first = &outcome.results[0];
        assert_eq!(first.failed_stage, Some(IssuanceStage::UploadingImage));
        assert!(first.error_message.as_deref().unwrap().starts_with("PolicyRejection"));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_records_every_student() {
        let c = coordinator(Arc::new(InMemoryContentStore::default()));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = c
            .run(
                &students(3),
                &tree().to_base58(),
                &collection().to_base58(),
                c.options(),
                &cancel,
            )
            .await
            .unwrap();
        assert!(outcome.cancelled);
        assert_eq!(outcome.failed, 3);
        assert!(outcome.results[2]
            .error_message
            .as_deref()
            .unwrap()
            .starts_with("Cancelled"));
    }

    #[test]
    fn test_foreign_delegate_refused() {
        let c = coordinator(Arc::new(InMemoryContentStore::default()));
        let request = MintRequest {
            leaf_owner: Address::new([1u8; 32]),
            leaf_delegate: Address::new([1u8; 32]),
            tree_id: tree(),
            metadata_uri: "https://arweave.net/m".into(),
            collection_id: collection(),
            name: "n".into(),
            symbol: "s".into(),
        };
        assert!(matches!(
            c.ensure_soulbound(&request),
            Err(CredifyError::PolicyRejection(_))
        ));
    }
}
