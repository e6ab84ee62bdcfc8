//! Credify Verifier
//!
//! Checks a minted credential: fetch the asset and its Merkle proof,
//! recompute the root, then apply the soulbound policy.

pub mod config;
pub mod engine;
pub mod query;
pub mod soulbound;

pub use config::{SoulboundMode, VerifierConfig};
pub use engine::{PolicyStatus, VerificationEngine, VerificationOutcome, VerifiedCredential};
pub use query::DasAssetQuery;
pub use soulbound::SoulboundPolicyChecker;
