//! Issuance configuration
//!
//! Read once at the composition root; the chain backend and content store
//! chosen here are injected into the coordinator.

use credify_core::{Address, CredifyError};
use credify_crypto::find_program_address;
use credify_render::{CertificateRenderer, CertificateTemplate};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::content_store::DEFAULT_BASE_URI;
use crate::metadata::MetadataBuilder;
use crate::retry::RetryOptions;

pub const DEFAULT_PROGRAM_ID: &str = credify_crypto::DEFAULT_PROGRAM_ID;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainBackend {
    Mock,
    Live,
}

impl FromStr for ChainBackend {
    type Err = CredifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(ChainBackend::Mock),
            "live" => Ok(ChainBackend::Live),
            other => Err(CredifyError::Config(format!(
                "unknown chain backend '{}', expected mock or live",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ChainBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainBackend::Mock => write!(f, "mock"),
            ChainBackend::Live => write!(f, "live"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuanceConfig {
    /// Program whose derived authority becomes every leaf's delegate
    pub program_id: String,
    pub chain_backend: ChainBackend,
    pub mint_relay_url: Option<String>,
    /// Merkle tree receiving new leaves; derived from the program when unset
    pub tree_id: Option<String>,
    pub collection_id: Option<String>,
    /// Filesystem content store directory; in-memory when unset
    pub content_dir: Option<PathBuf>,
    pub content_base_uri: String,
    /// TrueType/OpenType font for certificates; built-in bitmap font when unset
    pub font_path: Option<PathBuf>,
    /// Students processed concurrently per group
    pub concurrency: usize,
    pub inter_batch_delay: Duration,
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub institution: String,
    pub symbol: String,
    pub verify_base_url: String,
}

impl Default for IssuanceConfig {
    fn default() -> Self {
        Self {
            program_id: DEFAULT_PROGRAM_ID.to_string(),
            chain_backend: ChainBackend::Mock,
            mint_relay_url: None,
            tree_id: None,
            collection_id: None,
            content_dir: None,
            content_base_uri: DEFAULT_BASE_URI.to_string(),
            font_path: None,
            concurrency: 5,
            inter_batch_delay: Duration::from_millis(1000),
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            backoff_multiplier: 2.0,
            institution: "APEC University".to_string(),
            symbol: "APEC-CRED".to_string(),
            verify_base_url: "https://apec.edu.vn".to_string(),
        }
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, CredifyError> {
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| CredifyError::Config(format!("{} has invalid value '{}'", key, raw))),
        None => Ok(default),
    }
}

impl IssuanceConfig {
    /// Load config from `CREDIFY_*` environment variables
    pub fn from_env() -> Result<Self, CredifyError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load config through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CredifyError> {
        let default = Self::default();
        let text = |key: &str, default: String| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };

        let config = Self {
            program_id: text("CREDIFY_PROGRAM_ID", default.program_id),
            chain_backend: parse_var(&lookup, "CREDIFY_CHAIN_BACKEND", default.chain_backend)?,
            mint_relay_url: lookup("CREDIFY_MINT_RELAY_URL").filter(|v| !v.trim().is_empty()),
            tree_id: lookup("CREDIFY_TREE_ID").filter(|v| !v.trim().is_empty()),
            collection_id: lookup("CREDIFY_COLLECTION").filter(|v| !v.trim().is_empty()),
            content_dir: lookup("CREDIFY_CONTENT_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            content_base_uri: text("CREDIFY_CONTENT_BASE_URI", default.content_base_uri),
            font_path: lookup("CREDIFY_FONT_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            concurrency: parse_var(&lookup, "CREDIFY_CONCURRENCY", default.concurrency)?,
            inter_batch_delay: Duration::from_millis(parse_var(
                &lookup,
                "CREDIFY_INTER_BATCH_DELAY_MS",
                default.inter_batch_delay.as_millis() as u64,
            )?),
            max_retries: parse_var(&lookup, "CREDIFY_MAX_RETRIES", default.max_retries)?,
            initial_delay: Duration::from_millis(parse_var(
                &lookup,
                "CREDIFY_INITIAL_DELAY_MS",
                default.initial_delay.as_millis() as u64,
            )?),
            max_delay: Duration::from_millis(parse_var(
                &lookup,
                "CREDIFY_MAX_DELAY_MS",
                default.max_delay.as_millis() as u64,
            )?),
            backoff_multiplier: parse_var(
                &lookup,
                "CREDIFY_BACKOFF_MULTIPLIER",
                default.backoff_multiplier,
            )?,
            institution: text("CREDIFY_INSTITUTION", default.institution),
            symbol: text("CREDIFY_SYMBOL", default.symbol),
            verify_base_url: text("CREDIFY_VERIFY_BASE_URL", default.verify_base_url),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CredifyError> {
        if self.concurrency == 0 {
            return Err(CredifyError::Config("concurrency must be at least 1".into()));
        }
        if self.backoff_multiplier.is_nan() || self.backoff_multiplier <= 0.0 {
            return Err(CredifyError::Config("backoff multiplier must be positive".into()));
        }
        if self.initial_delay > self.max_delay {
            return Err(CredifyError::Config(
                "initial retry delay exceeds max delay".into(),
            ));
        }
        Address::parse(&self.program_id)
            .map_err(|e| CredifyError::Config(format!("program id: {}", e)))?;
        for (what, value) in [("tree id", &self.tree_id), ("collection id", &self.collection_id)] {
            if let Some(value) = value {
                Address::parse(value)
                    .map_err(|e| CredifyError::Config(format!("{}: {}", what, e)))?;
            }
        }

        if self.chain_backend == ChainBackend::Live {
            let relay = self.mint_relay_url.as_deref().ok_or_else(|| {
                CredifyError::Config("live chain backend requires CREDIFY_MINT_RELAY_URL".into())
            })?;
            check_url("mint relay URL", relay)?;
        }
        check_url("content base URI", &self.content_base_uri)?;
        check_url("verify base URL", &self.verify_base_url)?;
        Ok(())
    }

    /// Configured tree, or the one derived from the program id
    pub fn resolved_tree_id(&self) -> Result<Address, CredifyError> {
        self.resolve_account(self.tree_id.as_deref(), b"tree")
    }

    pub fn resolved_collection_id(&self) -> Result<Address, CredifyError> {
        self.resolve_account(self.collection_id.as_deref(), b"collection")
    }

    fn resolve_account(&self, configured: Option<&str>, seed: &[u8]) -> Result<Address, CredifyError> {
        if let Some(value) = configured {
            return Address::parse(value).map_err(|e| CredifyError::Config(e.to_string()));
        }
        let program = Address::parse(&self.program_id)
            .map_err(|e| CredifyError::Config(format!("program id: {}", e)))?;
        let (address, _) = find_program_address(&[seed], &program)?;
        Ok(address)
    }

    pub fn retry_options(&self) -> RetryOptions {
        RetryOptions {
            max_retries: self.max_retries,
            initial_delay: self.initial_delay,
            max_delay: self.max_delay,
            backoff_multiplier: self.backoff_multiplier,
            ..RetryOptions::default()
        }
    }

    pub fn template(&self) -> CertificateTemplate {
        CertificateTemplate::default()
            .with_institution(self.institution.clone())
            .with_verify_base_url(self.verify_base_url.clone())
    }

    /// Renderer over the configured font, or the built-in one
    pub fn renderer(&self) -> Result<CertificateRenderer, CredifyError> {
        match &self.font_path {
            Some(path) => Ok(CertificateRenderer::with_font_file(self.template(), path)?),
            None => {
                tracing::warn!("CREDIFY_FONT_PATH is not set; certificates use the ASCII bitmap font");
                Ok(CertificateRenderer::with_builtin_font(self.template()))
            }
        }
    }

    pub fn metadata_builder(&self) -> MetadataBuilder {
        MetadataBuilder::new(
            self.institution.clone(),
            self.symbol.clone(),
            self.verify_base_url.clone(),
        )
    }
}

fn check_url(what: &str, value: &str) -> Result<(), CredifyError> {
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|e| CredifyError::Config(format!("invalid {} '{}': {}", what, value, e)))
}
