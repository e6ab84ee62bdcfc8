//! Credify Crypto
//!
//! Hashing, sorted-pair Merkle proofs and program-derived addresses for
//! Credify credentials.

pub mod authority;
pub mod hash;
pub mod merkle;

pub use authority::{
    create_program_address, find_program_address, is_on_curve, DerivationError,
    ProgramAuthority, AUTHORITY_SEED, DEFAULT_PROGRAM_ID,
};
pub use hash::{hash_pair, hash_sorted_pair, sha256, sha256_multi};
pub use merkle::{MerkleProof, MerkleTree, Node, NodePosition, ProofError};
