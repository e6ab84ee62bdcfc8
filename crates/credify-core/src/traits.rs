//! Collaborator interfaces consumed by the issuance and verification cores.
//!
//! Concrete clients are injected as `Arc<dyn Trait>` handles; nothing in the
//! cores reaches for a global client.

use crate::asset::{AssetProof, CredentialAsset};
use crate::error::CredifyError;
use crate::issuance::{MintReceipt, MintRequest, UploadTags};

// ---------------------------------------------------------------------------
// ContentStore: immutable content-addressed storage
//
// Re-uploading identical bytes must be safe. Failures are Transport
// (retryable) or PolicyRejection (quota/auth, fatal).
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
pub trait ContentStore: Send + Sync {
    /// Persist `bytes` and return a stable URI
    async fn upload(&self, bytes: &[u8], tags: &UploadTags) -> Result<String, CredifyError>;

    /// Release any held resources
    async fn shutdown(&self) -> Result<(), CredifyError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ChainMintAdapter: submits one credential leaf to the ledger
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
pub trait ChainMintAdapter: Send + Sync {
    async fn mint(&self, request: &MintRequest) -> Result<MintReceipt, CredifyError>;

    /// Backend name for logs and status output
    fn name(&self) -> &str;

    async fn shutdown(&self) -> Result<(), CredifyError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// AssetQuery: read side of the ledger
//
// `Ok(None)` means "not found", which is a legitimate answer and distinct
// from a transport failure.
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
pub trait AssetQuery: Send + Sync {
    async fn get_asset(&self, id: &str) -> Result<Option<CredentialAsset>, CredifyError>;

    async fn get_asset_proof(&self, id: &str) -> Result<Option<AssetProof>, CredifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_content_store_object_safe(_: &dyn ContentStore) {}
    fn _assert_chain_object_safe(_: &dyn ChainMintAdapter) {}
    fn _assert_query_object_safe(_: &dyn AssetQuery) {}
}
