//! Composition root for the issuance side
//!
//! Picks the content store and chain backend from config and wires them
//! into a coordinator.

use credify_core::{Address, ChainMintAdapter, ContentStore, CredifyError};
use std::sync::Arc;
use tracing::info;

use crate::chain::{InMemoryLedger, LiveChainMintAdapter, MockChainMintAdapter};
use crate::config::{ChainBackend, IssuanceConfig};
use crate::content_store::{FsContentStore, InMemoryContentStore};
use crate::coordinator::BatchIssuanceCoordinator;

pub struct IssuanceStack {
    pub coordinator: Arc<BatchIssuanceCoordinator>,
    /// Present with the mock backend; doubles as the asset query for verification
    pub ledger: Option<Arc<InMemoryLedger>>,
    pub tree_id: Address,
    pub collection_id: Address,
}

pub async fn build_stack(config: &IssuanceConfig) -> Result<IssuanceStack, CredifyError> {
    config.validate()?;
    let tree_id = config.resolved_tree_id()?;
    let collection_id = config.resolved_collection_id()?;

    let store: Arc<dyn ContentStore> = match &config.content_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "Using filesystem content store");
            Arc::new(FsContentStore::open(dir.clone(), config.content_base_uri.clone()).await?)
        }
        None => Arc::new(InMemoryContentStore::new(config.content_base_uri.clone())),
    };

    let mut ledger = None;
    let chain: Arc<dyn ChainMintAdapter> = match config.chain_backend {
        ChainBackend::Mock => {
            let mock = Arc::new(InMemoryLedger::new(tree_id, collection_id));
            ledger = Some(mock.clone());
            Arc::new(MockChainMintAdapter::new(mock))
        }
        ChainBackend::Live => {
            let relay = config.mint_relay_url.as_deref().ok_or_else(|| {
                CredifyError::Config("live chain backend requires CREDIFY_MINT_RELAY_URL".into())
            })?;
            Arc::new(LiveChainMintAdapter::new(relay)?)
        }
    };

    let coordinator = BatchIssuanceCoordinator::from_config(config, store, chain)?;
    info!(
        backend = %config.chain_backend,
        tree = %tree_id,
        authority = %coordinator.authority().address,
        "Issuance stack ready"
    );

    Ok(IssuanceStack {
        coordinator: Arc::new(coordinator),
        ledger,
        tree_id,
        collection_id,
    })
}
