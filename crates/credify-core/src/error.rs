//! Error types for Credify
//!
//! Every failure is tagged with its class where it happens, so retry and
//! reporting decisions are a match on the variant rather than on message text.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Credify operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredifyError {
    /// Missing or malformed input. Never retried.
    #[error("ValidationError: {0}")]
    Validation(String),

    /// Network, timeout or RPC failure. Retried with backoff.
    #[error("TransportError: {0}")]
    Transport(String),

    /// A remote service or local policy refused the operation. Never retried.
    #[error("PolicyRejection: {0}")]
    PolicyRejection(String),

    /// Malformed or mismatched Merkle proof.
    #[error("ProofError: {0}")]
    Proof(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CredifyError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn policy(msg: impl Into<String>) -> Self {
        Self::PolicyRejection(msg.into())
    }

    /// The class this error belongs to
    pub fn class(&self) -> ErrorClass {
        match self {
            CredifyError::Validation(_) => ErrorClass::Validation,
            CredifyError::Transport(_) => ErrorClass::Transport,
            CredifyError::PolicyRejection(_) => ErrorClass::PolicyRejection,
            CredifyError::Proof(_) => ErrorClass::Proof,
            CredifyError::Cancelled(_) => ErrorClass::Cancelled,
            CredifyError::Config(_) => ErrorClass::Config,
            CredifyError::Serialization(_) => ErrorClass::Serialization,
        }
    }

    /// Whether the default retry policy would retry this error
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Transport
    }
}

impl From<serde_json::Error> for CredifyError {
    fn from(err: serde_json::Error) -> Self {
        CredifyError::Serialization(err.to_string())
    }
}

/// Coarse classification of a [`CredifyError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Validation,
    Transport,
    PolicyRejection,
    Proof,
    Cancelled,
    Config,
    Serialization,
}

impl ErrorClass {
    /// Message fragments that mark a remote failure as transient.
    pub const TRANSIENT_PATTERNS: &'static [&'static str] = &[
        "network",
        "timeout",
        "timed out",
        "econnreset",
        "etimedout",
        "enotfound",
        "blockhash",
        "rpc",
        "429",
        "rate limit",
        "too many requests",
    ];

    /// Classify raw error text received from a remote service.
    ///
    /// Only adapters that turn an untyped remote reply into a
    /// [`CredifyError`] call this; business logic matches on variants.
    pub fn classify_message(code: Option<&str>, message: &str, patterns: &[&str]) -> ErrorClass {
        let message = message.to_lowercase();
        let code = code.unwrap_or_default().to_lowercase();

        let transient = patterns.iter().any(|p| {
            let p = p.to_lowercase();
            message.contains(&p) || (!code.is_empty() && code.contains(&p))
        });

        if transient {
            ErrorClass::Transport
        } else {
            ErrorClass::PolicyRejection
        }
    }

    /// Build an error of this class carrying `msg`
    pub fn into_error(self, msg: impl Into<String>) -> CredifyError {
        let msg = msg.into();
        match self {
            ErrorClass::Validation => CredifyError::Validation(msg),
            ErrorClass::Transport => CredifyError::Transport(msg),
            ErrorClass::PolicyRejection => CredifyError::PolicyRejection(msg),
            ErrorClass::Proof => CredifyError::Proof(msg),
            ErrorClass::Cancelled => CredifyError::Cancelled(msg),
            ErrorClass::Config => CredifyError::Config(msg),
            ErrorClass::Serialization => CredifyError::Serialization(msg),
        }
    }
}
