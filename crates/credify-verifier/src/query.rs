//! DAS JSON-RPC asset query client

use credify_core::{AssetProof, AssetQuery, CredentialAsset, CredifyError, ErrorClass};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    #[serde(default)]
    error: Option<RpcError>,
}

fn is_not_found(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("not found") || message.contains("no asset")
}

/// Asset query over a DAS-compatible JSON-RPC endpoint
pub struct DasAssetQuery {
    client: reqwest::Client,
    endpoint: url::Url,
}

impl DasAssetQuery {
    pub fn new(endpoint: &str) -> Result<Self, CredifyError> {
        Self::with_timeout(endpoint, Duration::from_secs(15))
    }

    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self, CredifyError> {
        let endpoint = url::Url::parse(endpoint)
            .map_err(|e| CredifyError::Config(format!("invalid DAS URL: {}", e)))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CredifyError::Config(e.to_string()))?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &url::Url {
        &self.endpoint
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, id: &str) -> Result<Option<T>, CredifyError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": "credify",
            "method": method,
            "params": { "id": id },
        });

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| CredifyError::transport(format!("{} request failed: {}", method, e)))?;

        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            warn!(method, status = status.as_u16(), "DAS endpoint unavailable");
            return Err(CredifyError::transport(format!("{} returned {}", method, status)));
        }
        if status.as_u16() == 404 {
            return Ok(None);
        }

        let reply: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| CredifyError::transport(format!("malformed {} reply: {}", method, e)))?;

        if let Some(err) = reply.error {
            if is_not_found(&err.message) {
                debug!(method, id, "Asset not found");
                return Ok(None);
            }
            let code = err.code.to_string();
            let class = ErrorClass::classify_message(
                Some(&code),
                &err.message,
                ErrorClass::TRANSIENT_PATTERNS,
            );
            return Err(class.into_error(format!("{} error {}: {}", method, err.code, err.message)));
        }

        Ok(reply.result)
    }
}

#[async_trait::async_trait]
impl AssetQuery for DasAssetQuery {
    async fn get_asset(&self, id: &str) -> Result<Option<CredentialAsset>, CredifyError> {
        self.call("getAsset", id).await
    }

    async fn get_asset_proof(&self, id: &str) -> Result<Option<AssetProof>, CredifyError> {
        self.call("getAssetProof", id).await
    }
}
