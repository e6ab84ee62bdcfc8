//! Verifier configuration

use credify_core::{Address, CredifyError};
use credify_crypto::DEFAULT_PROGRAM_ID;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How an authentic credential that fails the soulbound check is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoulboundMode {
    /// Skip the check
    Ignore,
    /// Verified, flagged non-compliant
    #[default]
    Warn,
    /// Invalid
    Enforce,
}

impl FromStr for SoulboundMode {
    type Err = CredifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(SoulboundMode::Ignore),
            "warn" => Ok(SoulboundMode::Warn),
            "enforce" => Ok(SoulboundMode::Enforce),
            other => Err(CredifyError::Config(format!(
                "unknown soulbound mode '{}', expected ignore, warn or enforce",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// DAS JSON-RPC endpoint; the in-memory ledger is queried when unset
    pub das_url: Option<String>,
    pub program_id: String,
    pub soulbound_mode: SoulboundMode,
    /// Expected collection address
    pub collection: Option<String>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            das_url: None,
            program_id: DEFAULT_PROGRAM_ID.to_string(),
            soulbound_mode: SoulboundMode::Warn,
            collection: None,
        }
    }
}

impl VerifierConfig {
    pub fn from_env() -> Result<Self, CredifyError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CredifyError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let config = Self {
            das_url: get("CREDIFY_DAS_URL"),
            program_id: get("CREDIFY_PROGRAM_ID").unwrap_or_else(|| DEFAULT_PROGRAM_ID.to_string()),
            soulbound_mode: get("CREDIFY_SOULBOUND_MODE")
                .map(|v| v.parse())
                .transpose()?
                .unwrap_or_default(),
            collection: get("CREDIFY_COLLECTION"),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CredifyError> {
        Address::parse(&self.program_id)
            .map_err(|e| CredifyError::Config(format!("program id: {}", e)))?;
        if let Some(collection) = &self.collection {
            Address::parse(collection)
                .map_err(|e| CredifyError::Config(format!("collection: {}", e)))?;
        }
        if let Some(das) = &self.das_url {
            url::Url::parse(das)
                .map_err(|e| CredifyError::Config(format!("invalid DAS URL '{}': {}", das, e)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_warn() {
        let config = VerifierConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.soulbound_mode, SoulboundMode::Warn);
        assert!(config.das_url.is_none());
        assert_eq!(config.program_id, DEFAULT_PROGRAM_ID);
    }

    #[test]
    fn test_reads_mode_and_urls() {
        let config = VerifierConfig::from_lookup(|key| match key {
            "CREDIFY_SOULBOUND_MODE" => Some("Enforce".into()),
            "CREDIFY_DAS_URL" => Some("https://rpc.example.com".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.soulbound_mode, SoulboundMode::Enforce);
        assert_eq!(config.das_url.as_deref(), Some("https://rpc.example.com"));
    }

    #[test]
    fn test_rejects_unknown_mode() {
        let err = VerifierConfig::from_lookup(|key| {
            (key == "CREDIFY_SOULBOUND_MODE").then(|| "strict".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, CredifyError::Config(_)));
    }
}
