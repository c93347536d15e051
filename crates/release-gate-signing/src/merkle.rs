// crates/release-gate-signing/src/merkle.rs
// ============================================================================
// Module: Merkle Tree
// Description: RFC 6962 Merkle tree hashing and inclusion proofs.
// Purpose: Prove a signature entry is committed to a transparency log root.
// Dependencies: sha2, serde
// ============================================================================

//! ## Overview
//! Leaves hash as `SHA-256(0x00 || data)` and interior nodes as
//! `SHA-256(0x01 || left || right)`. Trees of `n` leaves split at the largest
//! power of two below `n`, so proofs are interchangeable with RFC 6962 logs.
//! Proof hashes travel as lowercase hex.

// ============================================================================
// SECTION: Imports
// ============================================================================

use release_gate_core::hex_encode;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest as _;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Hashing
// ============================================================================

/// SHA-256 output.
pub type MerkleHash = [u8; 32];

/// Domain separation prefix for leaves.
const LEAF_PREFIX: u8 = 0x00;
/// Domain separation prefix for interior nodes.
const NODE_PREFIX: u8 = 0x01;

/// Hashes leaf data.
#[must_use]
pub fn leaf_hash(data: &[u8]) -> MerkleHash {
    let mut hasher = Sha256::new();
    hasher.update([LEAF_PREFIX]);
    hasher.update(data);
    hasher.finalize().into()
}

/// Hashes two child nodes.
#[must_use]
pub fn node_hash(left: &MerkleHash, right: &MerkleHash) -> MerkleHash {
    let mut hasher = Sha256::new();
    hasher.update([NODE_PREFIX]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Root of the empty tree.
#[must_use]
pub fn empty_root() -> MerkleHash {
    Sha256::digest(b"").into()
}

/// Encodes a hash as lowercase hex.
#[must_use]
pub fn encode_hash(hash: &MerkleHash) -> String {
    hex_encode(hash)
}

/// Decodes a 64-character lowercase or uppercase hex hash.
#[must_use]
pub fn decode_hash(value: &str) -> Option<MerkleHash> {
    if value.len() != 64 || !value.is_ascii() {
        return None;
    }
    let mut out = [0_u8; 32];
    for (slot, pair) in out.iter_mut().zip(value.as_bytes().chunks(2)) {
        let text = std::str::from_utf8(pair).ok()?;
        *slot = u8::from_str_radix(text, 16).ok()?;
    }
    Some(out)
}

// ============================================================================
// SECTION: Tree
// ============================================================================

/// Append-only Merkle tree over leaf hashes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MerkleTree {
    /// Leaf hashes in append order.
    leaves: Vec<MerkleHash>,
}

impl MerkleTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of leaves.
    #[must_use]
    pub fn size(&self) -> u64 {
        u64::try_from(self.leaves.len()).unwrap_or(u64::MAX)
    }

    /// Returns true when the tree has no leaves.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Appends leaf data and returns its index.
    pub fn append(&mut self, data: &[u8]) -> u64 {
        self.leaves.push(leaf_hash(data));
        self.size().saturating_sub(1)
    }

    /// Returns the current root hash.
    #[must_use]
    pub fn root(&self) -> MerkleHash {
        subtree_root(&self.leaves)
    }

    /// Builds an inclusion proof for `index` against the current tree size.
    #[must_use]
    pub fn inclusion_proof(&self, index: u64) -> Option<InclusionProof> {
        let position = usize::try_from(index).ok()?;
        if position >= self.leaves.len() {
            return None;
        }
        let mut path = Vec::new();
        audit_path(position, &self.leaves, &mut path);
        Some(InclusionProof {
            log_index: index,
            tree_size: self.size(),
            hashes: path.iter().map(encode_hash).collect(),
        })
    }
}

/// Largest power of two strictly below `n` (`n >= 2`).
fn split_point(n: usize) -> usize {
    let mut k = 1;
    while k << 1 < n {
        k <<= 1;
    }
    k
}

/// Computes the Merkle tree hash of a leaf range.
fn subtree_root(leaves: &[MerkleHash]) -> MerkleHash {
    match leaves {
        [] => empty_root(),
        [single] => *single,
        _ => {
            let (left, right) = leaves.split_at(split_point(leaves.len()));
            node_hash(&subtree_root(left), &subtree_root(right))
        }
    }
}

/// Appends the audit path for `index` within `leaves`, deepest sibling first.
fn audit_path(index: usize, leaves: &[MerkleHash], path: &mut Vec<MerkleHash>) {
    if leaves.len() <= 1 {
        return;
    }
    let k = split_point(leaves.len());
    let (left, right) = leaves.split_at(k);
    if index < k {
        audit_path(index, left, path);
        path.push(subtree_root(right));
    } else {
        audit_path(index - k, right, path);
        path.push(subtree_root(left));
    }
}

// ============================================================================
// SECTION: Proofs
// ============================================================================

/// Inclusion proof for one leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionProof {
    /// Zero-based leaf index.
    pub log_index: u64,
    /// Tree size the proof was computed against.
    pub tree_size: u64,
    /// Sibling hashes from the leaf upward (hex).
    pub hashes: Vec<String>,
}

/// Inclusion proof verification failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MerkleError {
    /// Leaf index is outside the tree.
    #[error("leaf index {index} is outside a tree of size {tree_size}")]
    IndexOutOfRange {
        /// Claimed leaf index.
        index: u64,
        /// Claimed tree size.
        tree_size: u64,
    },
    /// A proof hash is not 32 bytes of hex.
    #[error("proof hash is malformed")]
    MalformedHash,
    /// Proof has the wrong number of hashes for its index and size.
    #[error("proof path length does not match the tree shape")]
    PathLength,
    /// Recomputed root differs from the expected root.
    #[error("recomputed root does not match")]
    RootMismatch,
}

/// Verifies that `leaf` sits at `proof.log_index` in the tree with `root`.
///
/// # Errors
///
/// Returns [`MerkleError`] when the proof is malformed or does not hash to `root`.
pub fn verify_inclusion(
    leaf: &MerkleHash,
    proof: &InclusionProof,
    root: &MerkleHash,
) -> Result<(), MerkleError> {
    if proof.log_index >= proof.tree_size {
        return Err(MerkleError::IndexOutOfRange {
            index: proof.log_index,
            tree_size: proof.tree_size,
        });
    }
    let mut index = proof.log_index;
    let mut last = proof.tree_size - 1;
    let mut current = *leaf;
    for encoded in &proof.hashes {
        let sibling = decode_hash(encoded).ok_or(MerkleError::MalformedHash)?;
        if last == 0 {
            return Err(MerkleError::PathLength);
        }
        if index & 1 == 1 || index == last {
            current = node_hash(&sibling, &current);
            while index & 1 == 0 && index != 0 {
                index >>= 1;
                last >>= 1;
            }
        } else {
            current = node_hash(&current, &sibling);
        }
        index >>= 1;
        last >>= 1;
    }
    if last != 0 {
        return Err(MerkleError::PathLength);
    }
    if current != *root {
        return Err(MerkleError::RootMismatch);
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
