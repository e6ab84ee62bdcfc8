//! Minted credential assets as reported by the asset query API
//!
//! These mirror the JSON shapes returned by `getAsset` / `getAssetProof`.
//! The ledger owns the data; Credify only reads it.

use serde::{Deserialize, Serialize};

/// Ownership block of an asset
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Ownership {
    pub owner: String,

    /// Current transfer delegate. Absent means no delegate is set.
    #[serde(default)]
    pub delegate: Option<String>,

    #[serde(default)]
    pub delegated: bool,

    #[serde(default)]
    pub frozen: bool,
}

/// Collection membership entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grouping {
    pub group_key: String,
    pub group_value: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AssetContent {
    #[serde(default)]
    pub json_uri: String,

    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Compression details of a leaf-backed asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compression {
    pub tree: String,

    #[serde(default)]
    pub leaf_id: u64,

    #[serde(default)]
    pub compressed: bool,
}

/// A credential asset as observed after minting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialAsset {
    pub id: String,

    #[serde(default)]
    pub content: AssetContent,

    #[serde(default)]
    pub grouping: Vec<Grouping>,

    pub ownership: Ownership,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<Compression>,
}

impl CredentialAsset {
    /// Collection the asset is grouped under, if any
    pub fn collection(&self) -> Option<&str> {
        self.grouping
            .iter()
            .find(|g| g.group_key.eq_ignore_ascii_case("collection"))
            .map(|g| g.group_value.as_str())
    }

    /// Tree holding the asset's leaf, if reported
    pub fn tree(&self) -> Option<&str> {
        self.compression.as_ref().map(|c| c.tree.as_str())
    }
}

/// Merkle proof for one asset, base58-encoded nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetProof {
    pub root: String,

    /// Sibling hashes ordered from leaf to root
    pub proof: Vec<String>,

    pub leaf: String,

    pub tree_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_index: Option<u64>,
}
