//! Merkle tree and proof verification for the credential ledger
//!
//! Interior nodes hash their two children with the byte-wise smaller child
//! on the left, so a proof is just the ordered sibling list from leaf to
//! root. No left/right flags travel with the proof.

use crate::hash::hash_sorted_pair;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Width of every node in bytes
pub const NODE_LEN: usize = 32;

/// Maximum depth of the Merkle tree
pub const MERKLE_DEPTH: usize = 20;

/// A 32-byte tree node
pub type Node = [u8; NODE_LEN];

/// Where in a proof a bad node was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodePosition {
    Leaf,
    Root,
    Sibling(usize),
}

impl std::fmt::Display for NodePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodePosition::Leaf => write!(f, "leaf"),
            NodePosition::Root => write!(f, "root"),
            NodePosition::Sibling(i) => write!(f, "proof node {}", i),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofError {
    #[error("proof path is empty")]
    EmptyPath,

    #[error("invalid {position} length: {len}, expected 32")]
    InvalidLength { position: NodePosition, len: usize },

    #[error("failed to decode {position}: {reason}")]
    Decode {
        position: NodePosition,
        reason: String,
    },
}

impl From<ProofError> for credify_core::CredifyError {
    fn from(err: ProofError) -> Self {
        credify_core::CredifyError::Proof(err.to_string())
    }
}

/// Decode one base58 node into its fixed-width form
pub fn decode_node(encoded: &str, position: NodePosition) -> Result<Node, ProofError> {
    let bytes = bs58::decode(encoded.trim())
        .into_vec()
        .map_err(|e| ProofError::Decode {
            position,
            reason: e.to_string(),
        })?;

    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| ProofError::InvalidLength { position, len })
}

/// Encode a node as base58
pub fn encode_node(node: &Node) -> String {
    bs58::encode(node).into_string()
}

/// Recompute the root from a leaf and its sibling path
pub fn compute_root(leaf: &Node, path: &[Node]) -> Result<Node, ProofError> {
    if path.is_empty() {
        return Err(ProofError::EmptyPath);
    }

    Ok(path
        .iter()
        .fold(*leaf, |current, sibling| hash_sorted_pair(&current, sibling)))
}

/// Check a leaf and path against a claimed root
pub fn verify(leaf: &Node, path: &[Node], claimed_root: &Node) -> Result<bool, ProofError> {
    Ok(&compute_root(leaf, path)? == claimed_root)
}

/// Decode a base58 leaf and path, then recompute the root
pub fn compute_root_encoded<S: AsRef<str>>(leaf: &str, path: &[S]) -> Result<Node, ProofError> {
    if path.is_empty() {
        return Err(ProofError::EmptyPath);
    }

    let leaf = decode_node(leaf, NodePosition::Leaf)?;
    let path = path
        .iter()
        .enumerate()
        .map(|(i, node)| decode_node(node.as_ref(), NodePosition::Sibling(i)))
        .collect::<Result<Vec<_>, _>>()?;

    compute_root(&leaf, &path)
}

/// Base58 counterpart of [`verify`]
pub fn verify_encoded<S: AsRef<str>>(
    leaf: &str,
    path: &[S],
    claimed_root: &str,
) -> Result<bool, ProofError> {
    let computed = compute_root_encoded(leaf, path)?;
    let claimed = decode_node(claimed_root, NodePosition::Root)?;
    Ok(computed == claimed)
}

/// A Merkle proof for inclusion verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// The leaf being proven
    pub leaf: Node,
    /// Sibling hashes from leaf to root
    pub siblings: Vec<Node>,
    /// Leaf position in the tree
    pub index: u64,
}

impl MerkleProof {
    /// Verify this proof against a root
    pub fn verify(&self, root: &Node) -> bool {
        matches!(verify(&self.leaf, &self.siblings, root), Ok(true))
    }

    /// Sibling path as base58 strings, the form the asset API serves
    pub fn encoded_siblings(&self) -> Vec<String> {
        self.siblings.iter().map(encode_node).collect()
    }
}

/// Append-only sparse Merkle tree
#[derive(Debug, Clone)]
pub struct MerkleTree {
    depth: usize,
    /// Non-empty nodes: (level, index) -> hash
    nodes: HashMap<(usize, u64), Node>,
    /// Hash of an empty subtree at each level
    default_hashes: Vec<Node>,
    leaf_count: u64,
}

impl MerkleTree {
    /// Create a new empty tree
    pub fn new(depth: usize) -> Self {
        assert!(depth > 0 && depth <= MERKLE_DEPTH, "depth must be in 1..=20");

        let mut default_hashes = vec![[0u8; NODE_LEN]; depth + 1];
        for i in 1..=depth {
            default_hashes[i] = hash_sorted_pair(&default_hashes[i - 1], &default_hashes[i - 1]);
        }

        Self {
            depth,
            nodes: HashMap::new(),
            default_hashes,
            leaf_count: 0,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of leaves the tree can hold
    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    pub fn root(&self) -> Node {
        self.get_node(self.depth, 0)
    }

    /// Append a leaf at the next free index; `None` when the tree is full
    pub fn append(&mut self, leaf: Node) -> Option<u64> {
        let index = self.leaf_count;
        if index >= self.capacity() {
            return None;
        }
        self.nodes.insert((0, index), leaf);
        self.update_path(index);
        self.leaf_count += 1;
        Some(index)
    }

    pub fn leaf(&self, index: u64) -> Option<Node> {
        self.nodes.get(&(0, index)).copied()
    }

    fn get_node(&self, level: usize, index: u64) -> Node {
        self.nodes
            .get(&(level, index))
            .copied()
            .unwrap_or(self.default_hashes[level])
    }

    fn update_path(&mut self, leaf_index: u64) {
        let mut current_index = leaf_index;

        for level in 0..self.depth {
            let current = self.get_node(level, current_index);
            let sibling = self.get_node(level, current_index ^ 1);
            let parent_index = current_index / 2;

            let parent_hash = hash_sorted_pair(&current, &sibling);
            if parent_hash == self.default_hashes[level + 1] {
                self.nodes.remove(&(level + 1, parent_index));
            } else {
                self.nodes.insert((level + 1, parent_index), parent_hash);
            }

            current_index = parent_index;
        }
    }

    /// Generate a proof for an appended leaf
    pub fn prove(&self, index: u64) -> Option<MerkleProof> {
        if index >= self.leaf_count {
            return None;
        }

        let leaf = self.get_node(0, index);
        let mut siblings = Vec::with_capacity(self.depth);
        let mut current_index = index;

        for level in 0..self.depth {
            siblings.push(self.get_node(level, current_index ^ 1));
            current_index /= 2;
        }

        Some(MerkleProof {
            leaf,
            siblings,
            index,
        })
    }

    pub fn len(&self) -> u64 {
        self.leaf_count
    }

    pub fn is_empty(&self) -> bool {
        self.leaf_count == 0
    }
}

impl Default for MerkleTree {
    fn default() -> Self {
        Self::new(MERKLE_DEPTH)
    }
}
