//! Credential metadata records
//!
//! The JSON document uploaded next to each certificate image and referenced
//! by the minted leaf.

use serde::{Deserialize, Serialize};

use crate::error::CredifyError;

/// A single `(trait_type, value)` attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub trait_type: String,
    pub value: String,
}

impl Attribute {
    pub fn new(trait_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            trait_type: trait_type.into(),
            value: value.into(),
        }
    }
}

/// File entry under `properties.files`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFile {
    pub uri: String,
    #[serde(rename = "type")]
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MetadataProperties {
    #[serde(default)]
    pub files: Vec<MetadataFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Standardized metadata record for one credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub name: String,
    pub symbol: String,
    pub description: String,
    /// URI of the rendered certificate image
    pub image: String,
    pub external_url: String,
    /// Ordered attribute list
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub properties: MetadataProperties,
}

impl MetadataRecord {
    /// Look up an attribute value by trait type
    pub fn attribute(&self, trait_type: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.trait_type == trait_type)
            .map(|a| a.value.as_str())
    }

    /// Structural checks applied before upload
    pub fn validate(&self) -> Result<(), CredifyError> {
        if self.name.trim().is_empty() {
            return Err(CredifyError::validation("metadata must have a name"));
        }
        if self.symbol.trim().is_empty() {
            return Err(CredifyError::validation("metadata must have a symbol"));
        }
        if self.description.trim().is_empty() {
            return Err(CredifyError::validation("metadata must have a description"));
        }
        if self.image.trim().is_empty() {
            return Err(CredifyError::validation("metadata must have an image URI"));
        }
        for (index, attr) in self.attributes.iter().enumerate() {
            if attr.trait_type.trim().is_empty() {
                return Err(CredifyError::validation(format!(
                    "attribute at index {} must have a trait_type",
                    index
                )));
            }
        }
        Ok(())
    }

    /// Canonical JSON bytes for upload
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, CredifyError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> MetadataRecord {
        MetadataRecord {
            name: "APEC Credential: Alice".into(),
            symbol: "APEC-CRED".into(),
            description: "Academic credential".into(),
            image: "https://arweave.net/abc".into(),
            external_url: "https://apec.edu.vn/verify/APEC-alice-1".into(),
            attributes: vec![Attribute::new("Major", "CS")],
            properties: MetadataProperties::default(),
        }
    }

    #[test]
    fn test_wire_field_names() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["attributes"][0]["trait_type"], "Major");
        assert!(json.get("external_url").is_some());
    }

    #[test]
    fn test_validate_rejects_blank_trait() {
        let mut rec = record();
        rec.attributes.push(Attribute::new(" ", "x"));
        let err = rec.validate().unwrap_err();
        assert!(err.to_string().contains("index 1"));
    }
}
