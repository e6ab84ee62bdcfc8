//! Issuance requests, per-student results and batch outcomes

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::address::Address;

/// Per-student pipeline state.
///
/// `Pending -> Generating -> UploadingImage -> UploadingMetadata -> Minting -> Done`,
/// with `Error` reachable from any non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssuanceStage {
    Pending,
    Generating,
    UploadingImage,
    UploadingMetadata,
    Minting,
    Done,
    Error,
}

impl IssuanceStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, IssuanceStage::Done | IssuanceStage::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IssuanceStage::Pending => "pending",
            IssuanceStage::Generating => "generating",
            IssuanceStage::UploadingImage => "uploading-image",
            IssuanceStage::UploadingMetadata => "uploading-metadata",
            IssuanceStage::Minting => "minting",
            IssuanceStage::Done => "done",
            IssuanceStage::Error => "error",
        }
    }
}

impl std::fmt::Display for IssuanceStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssuanceStatus {
    Done,
    Error,
}

/// Outcome for one student in one batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuanceResult {
    /// Position of the student in the input rows
    pub index: usize,

    #[serde(rename = "student")]
    pub student_key: String,

    pub status: IssuanceStatus,

    #[serde(rename = "tx", default, skip_serializing_if = "Option::is_none")]
    pub transaction_signature: Option<String>,

    #[serde(rename = "error", default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Stage the pipeline was in when it failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<IssuanceStage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_uri: Option<String>,

    /// Minted asset, when the backend reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
}

impl IssuanceResult {
    pub fn done(
        index: usize,
        student_key: impl Into<String>,
        signature: impl Into<String>,
        certificate_id: impl Into<String>,
        metadata_uri: impl Into<String>,
    ) -> Self {
        Self {
            index,
            student_key: student_key.into(),
            status: IssuanceStatus::Done,
            transaction_signature: Some(signature.into()),
            error_message: None,
            failed_stage: None,
            certificate_id: Some(certificate_id.into()),
            metadata_uri: Some(metadata_uri.into()),
            asset_id: None,
        }
    }

    pub fn with_asset_id(mut self, asset_id: Option<String>) -> Self {
        self.asset_id = asset_id;
        self
    }

    pub fn error(
        index: usize,
        student_key: impl Into<String>,
        stage: IssuanceStage,
        message: impl Into<String>,
    ) -> Self {
        Self {
            index,
            student_key: student_key.into(),
            status: IssuanceStatus::Error,
            transaction_signature: None,
            error_message: Some(message.into()),
            failed_stage: Some(stage),
            certificate_id: None,
            metadata_uri: None,
            asset_id: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == IssuanceStatus::Done
    }
}

/// Aggregated report for one issuance run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Results in input order
    pub results: Vec<IssuanceResult>,
    /// Transport retries spent across the whole run
    #[serde(default)]
    pub transport_retries: u64,
    #[serde(default)]
    pub cancelled: bool,
}

impl BatchOutcome {
    pub fn from_results(mut results: Vec<IssuanceResult>, transport_retries: u64, cancelled: bool) -> Self {
        results.sort_by_key(|r| r.index);
        let successful = results.iter().filter(|r| r.is_done()).count();
        Self {
            total: results.len(),
            successful,
            failed: results.len() - successful,
            results,
            transport_retries,
            cancelled,
        }
    }
}

/// Request handed to the chain mint adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintRequest {
    pub leaf_owner: Address,
    pub leaf_delegate: Address,
    pub tree_id: Address,
    pub metadata_uri: String,
    pub collection_id: Address,
    /// Display name and symbol carried into the on-chain metadata
    pub name: String,
    pub symbol: String,
}

/// Successful mint acknowledgement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintReceipt {
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
}

/// Tags attached to a content-store upload
pub type UploadTags = BTreeMap<String, String>;
