//! Credify Issuer
//!
//! Batch issuance of soulbound academic credentials: certificate
//! rendering, content upload, metadata assembly and minting, each stage
//! retried on transient failures.

pub mod chain;
pub mod config;
pub mod content_store;
pub mod coordinator;
pub mod metadata;
pub mod progress;
pub mod retry;
pub mod stack;

pub use chain::{InMemoryLedger, LiveChainMintAdapter, MockChainMintAdapter};
pub use config::{ChainBackend, IssuanceConfig};
pub use content_store::{FsContentStore, InMemoryContentStore};
pub use coordinator::{BatchIssuanceCoordinator, BatchOptions, BatchRequest};
pub use metadata::MetadataBuilder;
pub use progress::{ProgressObserver, ProgressTracker, RecordingObserver, TracingObserver};
pub use retry::{RetryOptions, RetryOutcome, RetryPolicy};
pub use stack::{build_stack, IssuanceStack};
