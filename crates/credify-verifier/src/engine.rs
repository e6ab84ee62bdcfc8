//! Credential verification
//!
//! `invalid` means the credential is not authentic; `error` means
//! authenticity could not be determined (e.g. the asset API is down).
//! Proof failures are always `invalid`.

use credify_core::{AssetProof, AssetQuery, CredentialAsset, CredifyError, ErrorClass};
use credify_crypto::merkle;
use credify_issuer::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{SoulboundMode, VerifierConfig};
use crate::soulbound::SoulboundPolicyChecker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStatus {
    Compliant,
    NonCompliant,
    Unchecked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedCredential {
    pub asset_id: String,
    pub owner: String,
    pub metadata_uri: String,
    pub tree_id: String,
    pub root: String,
    pub policy: PolicyStatus,
    /// Set only when an expected collection is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_match: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum VerificationOutcome {
    Verified(VerifiedCredential),
    Invalid { reason: String },
    Error { reason: String },
}

impl VerificationOutcome {
    fn invalid(reason: impl Into<String>) -> Self {
        VerificationOutcome::Invalid {
            reason: reason.into(),
        }
    }

    /// Proof errors are a negative answer; anything else is a failure to answer
    fn from_error(err: CredifyError) -> Self {
        match err.class() {
            ErrorClass::Proof => VerificationOutcome::invalid(err.to_string()),
            _ => VerificationOutcome::Error {
                reason: err.to_string(),
            },
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, VerificationOutcome::Verified(_))
    }

    pub fn status(&self) -> &'static str {
        match self {
            VerificationOutcome::Verified(_) => "verified",
            VerificationOutcome::Invalid { .. } => "invalid",
            VerificationOutcome::Error { .. } => "error",
        }
    }
}

pub struct VerificationEngine {
    query: Arc<dyn AssetQuery>,
    checker: SoulboundPolicyChecker,
    retry: RetryPolicy,
    mode: SoulboundMode,
    expected_collection: Option<String>,
}

impl VerificationEngine {
    pub fn new(query: Arc<dyn AssetQuery>, checker: SoulboundPolicyChecker) -> Self {
        Self {
            query,
            checker,
            retry: RetryPolicy::default(),
            mode: SoulboundMode::default(),
            expected_collection: None,
        }
    }

    pub fn from_config(
        config: &VerifierConfig,
        query: Arc<dyn AssetQuery>,
    ) -> Result<Self, CredifyError> {
        config.validate()?;
        let checker = SoulboundPolicyChecker::for_program(&config.program_id)?;
        let mut engine = Self::new(query, checker).with_mode(config.soulbound_mode);
        if let Some(collection) = &config.collection {
            engine = engine.with_expected_collection(collection.clone());
        }
        Ok(engine)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_mode(mut self, mode: SoulboundMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_expected_collection(mut self, collection: impl Into<String>) -> Self {
        self.expected_collection = Some(collection.into());
        self
    }

    pub fn checker(&self) -> &SoulboundPolicyChecker {
        &self.checker
    }

    pub fn mode(&self) -> SoulboundMode {
        self.mode
    }

    pub async fn verify(&self, asset_id: &str) -> VerificationOutcome {
        self.verify_with_cancel(asset_id, &CancellationToken::new())
            .await
    }

    pub async fn verify_with_cancel(
        &self,
        asset_id: &str,
        cancel: &CancellationToken,
    ) -> VerificationOutcome {
        let asset_id = asset_id.trim();
        let outcome = if asset_id.is_empty() {
            VerificationOutcome::invalid("asset id required")
        } else {
            match self.fetch(asset_id, cancel).await {
                Ok(Some((asset, proof))) => self.evaluate(asset, proof),
                Ok(None) => VerificationOutcome::invalid("asset or proof not found"),
                Err(err) => VerificationOutcome::from_error(err),
            }
        };

        match &outcome {
            VerificationOutcome::Verified(v) => {
                info!(asset_id, policy = ?v.policy, "Credential verified")
            }
            VerificationOutcome::Invalid { reason } => {
                info!(asset_id, reason = %reason, "Credential invalid")
            }
            VerificationOutcome::Error { reason } => {
                warn!(asset_id, reason = %reason, "Verification failed")
            }
        }
        outcome
    }

    async fn fetch(
        &self,
        asset_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<(CredentialAsset, AssetProof)>, CredifyError> {
        let asset = self
            .retry
            .execute("get-asset", cancel, || self.query.get_asset(asset_id))
            .await
            .into_result()?;
        let Some(asset) = asset else {
            return Ok(None);
        };

        let proof = self
            .retry
            .execute("get-asset-proof", cancel, || {
                self.query.get_asset_proof(asset_id)
            })
            .await
            .into_result()?;

        Ok(proof.map(|proof| (asset, proof)))
    }

    fn evaluate(&self, asset: CredentialAsset, proof: AssetProof) -> VerificationOutcome {
        if let Some(tree) = asset.tree() {
            if !proof.tree_id.is_empty() && tree != proof.tree_id {
                return VerificationOutcome::invalid(format!(
                    "asset tree {} does not match proof tree {}",
                    tree, proof.tree_id
                ));
            }
        }

        match merkle::verify_encoded(&proof.leaf, &proof.proof[..], &proof.root) {
            Ok(true) => {}
            Ok(false) => {
                return VerificationOutcome::invalid(
                    "computed Merkle root does not match the claimed root",
                )
            }
            Err(err) => return VerificationOutcome::from_error(err.into()),
        }

        let policy = match self.mode {
            SoulboundMode::Ignore => PolicyStatus::Unchecked,
            _ if self.checker.is_soulbound(&asset) => PolicyStatus::Compliant,
            SoulboundMode::Enforce => {
                return VerificationOutcome::invalid("credential is not soulbound")
            }
            SoulboundMode::Warn => {
                warn!(asset_id = %asset.id, "Authentic credential is not soulbound");
                PolicyStatus::NonCompliant
            }
        };

        let collection_match = self
            .expected_collection
            .as_deref()
            .map(|expected| asset.collection() == Some(expected));

        VerificationOutcome::Verified(VerifiedCredential {
            owner: asset.ownership.owner,
            metadata_uri: asset.content.json_uri,
            tree_id: proof.tree_id,
            root: proof.root,
            policy,
            collection_match,
            asset_id: asset.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credify_core::asset::Compression;
    use credify_core::Ownership;
    use credify_crypto::merkle::{encode_node, MerkleTree};
    use credify_crypto::sha256;
    use credify_issuer::RetryOptions;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct FakeQuery {
        assets: HashMap<String, CredentialAsset>,
        proofs: HashMap<String, AssetProof>,
        transport_failures: AtomicU32,
    }

    #[async_trait::async_trait]
    impl AssetQuery for FakeQuery {
        async fn get_asset(&self, id: &str) -> Result<Option<CredentialAsset>, CredifyError> {
            if self.transport_failures.load(Ordering::SeqCst) > 0 {
                self.transport_failures.fetch_sub(1, Ordering::SeqCst);
                return Err(CredifyError::transport("connection reset"));
            }
            Ok(self.assets.get(id).cloned())
        }

        async fn get_asset_proof(&self, id: &str) -> Result<Option<AssetProof>, CredifyError> {
            Ok(self.proofs.get(id).cloned())
        }
    }

    fn checker() -> SoulboundPolicyChecker {
        SoulboundPolicyChecker::for_program(credify_crypto::DEFAULT_PROGRAM_ID).unwrap()
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(RetryOptions {
            max_retries: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            ..RetryOptions::default()
        })
    }

    /// One asset backed by a real two-leaf tree
    fn fake(delegate: Option<String>) -> FakeQuery {
        let mut tree = MerkleTree::new(4);
        tree.append(sha256(b"other"));
        let index = tree.append(sha256(b"asset-X")).unwrap();
        let proof = tree.prove(index).unwrap();

        let asset = CredentialAsset {
            id: "asset-X".into(),
            content: Default::default(),
            grouping: vec![credify_core::Grouping {
                group_key: "collection".into(),
                group_value: "Col1".into(),
            }],
            ownership: Ownership {
                owner: "Owner1".into(),
                delegate,
                delegated: true,
                frozen: false,
            },
            compression: Some(Compression {
                tree: "Tree1".into(),
                leaf_id: index,
                compressed: true,
            }),
        };
        let proof = AssetProof {
            root: encode_node(&tree.root()),
            proof: proof.encoded_siblings(),
            leaf: encode_node(&proof.leaf),
            tree_id: "Tree1".into(),
            node_index: Some(index),
        };

        let mut query = FakeQuery::default();
        query.assets.insert("asset-X".into(), asset);
        query.proofs.insert("asset-X".into(), proof);
        query
    }

    fn engine(query: FakeQuery) -> VerificationEngine {
        VerificationEngine::new(Arc::new(query), checker()).with_retry(fast_retry())
    }

    fn authority() -> String {
        checker().authority().address.to_base58()
    }

    #[tokio::test]
    async fn test_soulbound_credential_verifies() {
        let outcome = engine(fake(Some(authority()))).verify("asset-X").await;
        match outcome {
            VerificationOutcome::Verified(v) => {
                assert_eq!(v.policy, PolicyStatus::Compliant);
                assert_eq!(v.owner, "Owner1");
                assert_eq!(v.collection_match, None);
            }
            other => panic!("expected verified, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_asset_is_invalid() {
        let outcome = engine(fake(None)).verify("asset-Y").await;
        assert_eq!(outcome.status(), "invalid");
        assert_eq!(engine(fake(None)).verify("  ").await.status(), "invalid");
    }

    #[tokio::test]
    async fn test_root_mismatch_is_invalid_not_error() {
        let mut query = fake(Some(authority()));
        let proof = query.proofs.get_mut("asset-X").unwrap();
        proof.root = encode_node(&sha256(b"forged root"));

        let outcome = engine(query).verify("asset-X").await;
        assert_eq!(
            outcome,
            VerificationOutcome::Invalid {
                reason: "computed Merkle root does not match the claimed root".into()
            }
        );
    }

    #[tokio::test]
    async fn test_malformed_proof_is_invalid() {
        let mut query = fake(Some(authority()));
        query.proofs.get_mut("asset-X").unwrap().proof[0] = "abc".into();
        let outcome = engine(query).verify("asset-X").await;
        match outcome {
            VerificationOutcome::Invalid { reason } => assert!(reason.starts_with("ProofError")),
            other => panic!("expected invalid, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_tree_mismatch_is_invalid() {
        let mut query = fake(Some(authority()));
        query.proofs.get_mut("asset-X").unwrap().tree_id = "Tree2".into();
        assert_eq!(engine(query).verify("asset-X").await.status(), "invalid");
    }

    #[tokio::test]
    async fn test_soulbound_modes() {
        let warn = engine(fake(None)).verify("asset-X").await;
        match warn {
            VerificationOutcome::Verified(v) => assert_eq!(v.policy, PolicyStatus::NonCompliant),
            other => panic!("expected verified, got {:?}", other),
        }

        let enforce = engine(fake(None))
            .with_mode(SoulboundMode::Enforce)
            .verify("asset-X")
            .await;
        assert_eq!(
            enforce,
            VerificationOutcome::Invalid {
                reason: "credential is not soulbound".into()
            }
        );

        let ignore = engine(fake(None))
            .with_mode(SoulboundMode::Ignore)
            .verify("asset-X")
            .await;
        match ignore {
            VerificationOutcome::Verified(v) => assert_eq!(v.policy, PolicyStatus::Unchecked),
            other => panic!("expected verified, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transport_failures_are_retried_then_error() {
        let query = fake(Some(authority()));
        query.transport_failures.store(2, Ordering::SeqCst);
        assert!(engine(query).verify("asset-X").await.is_verified());

        let query = fake(Some(authority()));
        query.transport_failures.store(10, Ordering::SeqCst);
        let outcome = engine(query).verify("asset-X").await;
        match outcome {
            VerificationOutcome::Error { reason } => assert!(reason.starts_with("TransportError")),
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_collection_match_reported() {
        let outcome = engine(fake(Some(authority())))
            .with_expected_collection("Col1")
            .verify("asset-X")
            .await;
        match outcome {
            VerificationOutcome::Verified(v) => assert_eq!(v.collection_match, Some(true)),
            other => panic!("expected verified, got {:?}", other),
        }

        let outcome = engine(fake(Some(authority())))
            .with_expected_collection("Col2")
            .verify("asset-X")
            .await;
        match outcome {
            VerificationOutcome::Verified(v) => assert_eq!(v.collection_match, Some(false)),
            other => panic!("expected verified, got {:?}", other),
        }
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(VerificationOutcome::invalid("nope")).unwrap();
        assert_eq!(json["status"], "invalid");
        assert_eq!(json["reason"], "nope");
    }
}
