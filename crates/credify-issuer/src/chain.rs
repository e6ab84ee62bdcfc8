//! Chain mint adapters
//!
//! - [`MockChainMintAdapter`]: mints into an [`InMemoryLedger`], which also
//!   answers asset queries so issuance and verification work offline
//! - [`LiveChainMintAdapter`]: forwards mint requests to an HTTP mint relay

use credify_core::asset::{AssetContent, Compression};
use credify_core::{
    Address, AssetProof, AssetQuery, ChainMintAdapter, CredentialAsset, CredifyError, ErrorClass,
    Grouping, MintReceipt, MintRequest, Ownership,
};
use credify_crypto::merkle::{encode_node, MerkleTree};
use credify_crypto::{find_program_address, sha256, sha256_multi};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Default depth of the in-memory ledger tree
pub const LEDGER_DEPTH: usize = 14;

// A writer panicked mid-update; the tree cannot be trusted again.
fn poisoned() -> CredifyError {
    CredifyError::policy("ledger state is unusable: lock poisoned")
}

#[derive(Debug, Clone)]
struct LedgerEntry {
    asset: CredentialAsset,
    leaf_index: u64,
}

#[derive(Debug)]
struct LedgerState {
    tree: MerkleTree,
    entries: HashMap<String, LedgerEntry>,
}

/// Append-only credential ledger backed by a sorted-pair Merkle tree
#[derive(Debug)]
pub struct InMemoryLedger {
    tree_id: Address,
    collection_id: Address,
    state: RwLock<LedgerState>,
}

impl InMemoryLedger {
    pub fn new(tree_id: Address, collection_id: Address) -> Self {
        Self::with_depth(tree_id, collection_id, LEDGER_DEPTH)
    }

    pub fn with_depth(tree_id: Address, collection_id: Address, depth: usize) -> Self {
        Self {
            tree_id,
            collection_id,
            state: RwLock::new(LedgerState {
                tree: MerkleTree::new(depth),
                entries: HashMap::new(),
            }),
        }
    }

    pub fn tree_id(&self) -> Address {
        self.tree_id
    }

    pub fn collection_id(&self) -> Address {
        self.collection_id
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, LedgerState>, CredifyError> {
        self.state.read().map_err(|_| poisoned())
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, LedgerState>, CredifyError> {
        self.state.write().map_err(|_| poisoned())
    }

    /// Asset id of the leaf minted with `nonce`
    pub fn asset_id(&self, nonce: u64) -> Result<Address, CredifyError> {
        let (address, _) = find_program_address(&[&b"asset"[..], &nonce.to_le_bytes()[..]], &self.tree_id)?;
        Ok(address)
    }

    /// Number of minted leaves
    pub fn len(&self) -> u64 {
        self.read().map(|s| s.tree.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current root, base58
    pub fn root(&self) -> Result<String, CredifyError> {
        Ok(encode_node(&self.read()?.tree.root()))
    }

    /// Asset ids in mint order
    pub fn asset_ids(&self) -> Vec<String> {
        let Ok(state) = self.read() else {
            return Vec::new();
        };
        let mut entries: Vec<_> = state.entries.values().collect();
        entries.sort_by_key(|e| e.leaf_index);
        entries.into_iter().map(|e| e.asset.id.clone()).collect()
    }

    /// Replace the delegate an asset reports, as a transfer-delegate change
    /// would. Returns false when the asset is unknown.
    pub fn override_delegate(&self, asset_id: &str, delegate: Option<Address>) -> bool {
        let Ok(mut state) = self.write() else {
            return false;
        };
        match state.entries.get_mut(asset_id) {
            Some(entry) => {
                entry.asset.ownership.delegated = delegate.is_some();
                entry.asset.ownership.delegate = delegate.map(|d| d.to_base58());
                true
            }
            None => false,
        }
    }

    /// Append one credential leaf
    pub fn mint(&self, request: &MintRequest) -> Result<MintReceipt, CredifyError> {
        if request.tree_id != self.tree_id {
            return Err(CredifyError::policy(format!(
                "unknown tree {}",
                request.tree_id
            )));
        }
        if request.metadata_uri.trim().is_empty() {
            return Err(CredifyError::validation("metadata URI required"));
        }

        let mut state = self.write()?;
        let nonce = state.tree.len();
        let asset_id = self.asset_id(nonce)?;
        let uri_hash = sha256(request.metadata_uri.as_bytes());

        let leaf = sha256_multi(&[
            &b"credify-leaf"[..],
            &asset_id.as_bytes()[..],
            &request.leaf_owner.as_bytes()[..],
            &request.leaf_delegate.as_bytes()[..],
            &uri_hash[..],
            &nonce.to_le_bytes()[..],
        ]);

        let leaf_index = state
            .tree
            .append(leaf)
            .ok_or_else(|| CredifyError::policy("tree is full"))?;

        let asset = CredentialAsset {
            id: asset_id.to_base58(),
            content: AssetContent {
                json_uri: request.metadata_uri.clone(),
                metadata: serde_json::json!({
                    "name": request.name,
                    "symbol": request.symbol,
                }),
            },
            grouping: vec![Grouping {
                group_key: "collection".to_string(),
                group_value: request.collection_id.to_base58(),
            }],
            ownership: Ownership {
                owner: request.leaf_owner.to_base58(),
                delegate: Some(request.leaf_delegate.to_base58()),
                delegated: true,
                frozen: false,
            },
            compression: Some(Compression {
                tree: self.tree_id.to_base58(),
                leaf_id: leaf_index,
                compressed: true,
            }),
        };

        let digest = sha256_multi(&[&leaf[..], &b"signature"[..]]);
        let signature = bs58::encode([leaf, digest].concat()).into_string();

        debug!(asset_id = %asset.id, leaf_index, "Appended credential leaf");
        state.entries.insert(
            asset.id.clone(),
            LedgerEntry {
                asset: asset.clone(),
                leaf_index,
            },
        );

        Ok(MintReceipt {
            signature,
            asset_id: Some(asset.id),
        })
    }
}

#[async_trait::async_trait]
impl AssetQuery for InMemoryLedger {
    async fn get_asset(&self, id: &str) -> Result<Option<CredentialAsset>, CredifyError> {
        Ok(self.read()?.entries.get(id).map(|e| e.asset.clone()))
    }

    async fn get_asset_proof(&self, id: &str) -> Result<Option<AssetProof>, CredifyError> {
        let state = self.read()?;
        let Some(entry) = state.entries.get(id) else {
            return Ok(None);
        };
        let Some(proof) = state.tree.prove(entry.leaf_index) else {
            return Ok(None);
        };

        Ok(Some(AssetProof {
            root: encode_node(&state.tree.root()),
            proof: proof.encoded_siblings(),
            leaf: encode_node(&proof.leaf),
            tree_id: self.tree_id.to_base58(),
            node_index: Some(entry.leaf_index),
        }))
    }
}

/// Mint adapter over an [`InMemoryLedger`]
pub struct MockChainMintAdapter {
    ledger: Arc<InMemoryLedger>,
}

impl MockChainMintAdapter {
    pub fn new(ledger: Arc<InMemoryLedger>) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> Arc<InMemoryLedger> {
        self.ledger.clone()
    }
}

#[async_trait::async_trait]
impl ChainMintAdapter for MockChainMintAdapter {
    async fn mint(&self, request: &MintRequest) -> Result<MintReceipt, CredifyError> {
        self.ledger.mint(request)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelayFailure {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

/// Mint adapter that posts requests to an HTTP mint relay
pub struct LiveChainMintAdapter {
    client: reqwest::Client,
    endpoint: url::Url,
}

impl LiveChainMintAdapter {
    pub fn new(relay_url: &str) -> Result<Self, CredifyError> {
        Self::with_timeout(relay_url, Duration::from_secs(30))
    }

    pub fn with_timeout(relay_url: &str, timeout: Duration) -> Result<Self, CredifyError> {
        let mut endpoint = url::Url::parse(relay_url)
            .map_err(|e| CredifyError::Config(format!("invalid mint relay URL: {}", e)))?;
        endpoint
            .path_segments_mut()
            .map_err(|_| {
                CredifyError::Config(format!("mint relay URL '{}' cannot be a base", relay_url))
            })?
            .pop_if_empty()
            .push("mint");
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CredifyError::Config(e.to_string()))?;

        info!(endpoint = %endpoint, "Using live mint relay");
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &url::Url {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl ChainMintAdapter for LiveChainMintAdapter {
    async fn mint(&self, request: &MintRequest) -> Result<MintReceipt, CredifyError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| CredifyError::transport(format!("mint relay unreachable: {}", e)))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        // A 2xx means the leaf exists; failures past this point are never retryable.
        if status.is_success() {
            return serde_json::from_str::<MintReceipt>(&body).map_err(|e| {
                error!(
                    status = status.as_u16(),
                    body = %body,
                    "Mint relay acknowledged with an unreadable receipt"
                );
                CredifyError::Serialization(format!(
                    "mint relay accepted the request but its receipt is unreadable ({}): {}",
                    e, body
                ))
            });
        }

        if status.as_u16() == 429 || status.is_server_error() {
            warn!(status = status.as_u16(), "Mint relay temporarily unavailable");
            return Err(CredifyError::transport(format!(
                "mint relay returned {}: {}",
                status, body
            )));
        }

        let failure: RelayFailure = serde_json::from_str(&body).unwrap_or(RelayFailure {
            error_code: None,
            error_message: Some(body.clone()),
        });
        let message = failure
            .error_message
            .unwrap_or_else(|| format!("mint relay returned {}", status));
        let class = ErrorClass::classify_message(
            failure.error_code.as_deref(),
            &message,
            ErrorClass::TRANSIENT_PATTERNS,
        );
        let message = match failure.error_code {
            Some(code) => format!("{}: {}", code, message),
            None => message,
        };
        Err(class.into_error(message))
    }

    fn name(&self) -> &str {
        "live"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::{RetryOptions, RetryPolicy};
    use credify_crypto::merkle::verify_encoded;
    use tokio_util::sync::CancellationToken;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(ledger: &InMemoryLedger) -> MintRequest {
        MintRequest {
            leaf_owner: Address::new([1u8; 32]),
            leaf_delegate: Address::new([2u8; 32]),
            tree_id: ledger.tree_id(),
            metadata_uri: "https://arweave.net/meta".to_string(),
            collection_id: ledger.collection_id(),
            name: "APEC Credential: Alice".to_string(),
            symbol: "APEC-CRED".to_string(),
        }
    }

    fn ledger() -> InMemoryLedger {
        InMemoryLedger::with_depth(Address::new([9u8; 32]), Address::new([8u8; 32]), 4)
    }

    #[tokio::test]
    async fn test_minted_asset_has_valid_proof() {
        let ledger = ledger();
        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(ledger.mint(&request(&ledger)).unwrap().asset_id.unwrap());
        }
        assert_eq!(ledger.asset_ids(), ids);

        for id in &ids {
            let proof = ledger.get_asset_proof(id).await.unwrap().unwrap();
            assert!(verify_encoded(&proof.leaf, &proof.proof[..], &proof.root).unwrap());
        }

        let asset = ledger.get_asset(&ids[0]).await.unwrap().unwrap();
        assert_eq!(asset.ownership.delegate, Some(Address::new([2u8; 32]).to_base58()));
        assert_eq!(asset.collection(), Some(Address::new([8u8; 32]).to_base58().as_str()));
    }

    #[tokio::test]
    async fn test_unknown_asset_is_none() {
        let ledger = ledger();
        assert!(ledger.get_asset("missing").await.unwrap().is_none());
        assert!(ledger.get_asset_proof("missing").await.unwrap().is_none());
    }

    #[test]
    fn test_wrong_tree_rejected() {
        let ledger = ledger();
        let mut req = request(&ledger);
        req.tree_id = Address::new([3u8; 32]);
        assert!(matches!(ledger.mint(&req), Err(CredifyError::PolicyRejection(_))));
    }

    #[test]
    fn test_full_tree_rejected() {
        let ledger = InMemoryLedger::with_depth(Address::new([9u8; 32]), Address::new([8u8; 32]), 1);
        ledger.mint(&request(&ledger)).unwrap();
        ledger.mint(&request(&ledger)).unwrap();
        let err = ledger.mint(&request(&ledger)).unwrap_err();
        assert_eq!(err, CredifyError::policy("tree is full"));
    }

    #[test]
    fn test_asset_ids_are_distinct() {
        let ledger = ledger();
        assert_ne!(ledger.asset_id(0).unwrap(), ledger.asset_id(1).unwrap());
    }

    #[tokio::test]
    async fn test_live_adapter_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mint"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"signature": "sig123", "assetId": "A1"})),
            )
            .mount(&server)
            .await;

        let adapter = LiveChainMintAdapter::new(&format!("{}/", server.uri())).unwrap();
        let receipt = adapter.mint(&request(&ledger())).await.unwrap();
        assert_eq!(receipt.signature, "sig123");
        assert_eq!(receipt.asset_id.as_deref(), Some("A1"));
    }

    #[test]
    fn test_relay_path_prefix_is_kept() {
        let adapter = LiveChainMintAdapter::new("https://relay.example/api").unwrap();
        assert_eq!(adapter.endpoint().as_str(), "https://relay.example/api/mint");
        let adapter = LiveChainMintAdapter::new("https://relay.example/api/").unwrap();
        assert_eq!(adapter.endpoint().as_str(), "https://relay.example/api/mint");
        let adapter = LiveChainMintAdapter::new("https://relay.example").unwrap();
        assert_eq!(adapter.endpoint().as_str(), "https://relay.example/mint");
        assert!(LiveChainMintAdapter::new("mailto:relay@example.com").is_err());
    }

    #[tokio::test]
    async fn test_live_adapter_posts_under_relay_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/relay/mint"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"signature": "sig9"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let adapter = LiveChainMintAdapter::new(&format!("{}/v1/relay", server.uri())).unwrap();
        let receipt = adapter.mint(&request(&ledger())).await.unwrap();
        assert_eq!(receipt.signature, "sig9");
    }

    #[tokio::test]
    async fn test_unreadable_receipt_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mint"))
            .respond_with(ResponseTemplate::new(200).set_body_string("minted ok"))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = LiveChainMintAdapter::new(&server.uri()).unwrap();
        let retry = RetryPolicy::new(RetryOptions {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            ..RetryOptions::default()
        });
        let req = request(&ledger());
        let outcome = retry
            .execute("mint", &CancellationToken::new(), || adapter.mint(&req))
            .await;

        assert_eq!(outcome.attempts, 1);
        let err = outcome.into_result().unwrap_err();
        assert!(matches!(err, CredifyError::Serialization(_)));
        assert!(err.to_string().contains("minted ok"));
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[test]
    fn test_poisoned_ledger_is_not_retryable() {
        let ledger = Arc::new(ledger());
        let holder = ledger.clone();
        let _ = std::thread::spawn(move || {
            let _guard = holder.state.write().unwrap();
            panic!("writer died");
        })
        .join();

        let err = ledger.mint(&request(&ledger)).unwrap_err();
        assert!(matches!(err, CredifyError::PolicyRejection(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_live_adapter_rate_limit_is_transport() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mint"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let adapter = LiveChainMintAdapter::new(&server.uri()).unwrap();
        let err = adapter.mint(&request(&ledger())).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_live_adapter_business_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mint"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "errorCode": "InsufficientFunds",
                "errorMessage": "signer balance too low"
            })))
            .mount(&server)
            .await;

        let adapter = LiveChainMintAdapter::new(&server.uri()).unwrap();
        let err = adapter.mint(&request(&ledger())).await.unwrap_err();
        assert_eq!(
            err,
            CredifyError::policy("InsufficientFunds: signer balance too low")
        );
    }

    #[tokio::test]
    async fn test_live_adapter_blockhash_is_transport() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mint"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "errorMessage": "Blockhash not found"
            })))
            .mount(&server)
            .await;

        let adapter = LiveChainMintAdapter::new(&server.uri()).unwrap();
        let err = adapter.mint(&request(&ledger())).await.unwrap_err();
        assert!(matches!(err, CredifyError::Transport(_)));
    }
}
