//! # BLAKE3 Merkle Tree
//!
//! Flat binary hash tree over an ordered list of byte strings.
//!
//! ## Construction
//!
//! - Leaf: `BLAKE3(item)`.
//! - Node: `BLAKE3(left || right)`, raw 32-byte digests concatenated.
//! - A level with an odd count pairs its last node with itself.
//! - One leaf: the root is that leaf's hash.
//! - No leaves: the root is the sentinel `BLAKE3(b"empty")`.
//!
//! There is no leaf/node domain separation byte. Roots are compared only
//! against roots produced by this same construction, never against an
//! external tree.

use blake3::Hash;

/// Input hashed to produce the root of an empty tree.
pub const EMPTY_SENTINEL_INPUT: &[u8] = b"empty";

/// A fully materialized Merkle tree.
///
/// `levels[0]` holds the leaf hashes and the last level holds the single
/// root. An empty tree has no levels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    levels: Vec<Vec<Hash>>,
}

impl MerkleTree {
    /// Build the tree over `items` in order.
    pub fn build<T: AsRef<[u8]>>(items: &[T]) -> Self {
        if items.is_empty() {
            return Self { levels: Vec::new() };
        }

        let mut levels = vec![items.iter().map(|i| blake3::hash(i.as_ref())).collect::<Vec<_>>()];
        while let Some(current) = levels.last() {
            if current.len() <= 1 {
                break;
            }
            let next = current
                .chunks(2)
                .map(|pair| {
                    let left = &pair[0];
                    let right = pair.get(1).unwrap_or(left);
                    node_hash(left, right)
                })
                .collect();
            levels.push(next);
        }
        Self { levels }
    }

    /// The root hash. The empty sentinel for a tree without leaves.
    pub fn root(&self) -> Hash {
        self.levels
            .last()
            .and_then(|top| top.first().copied())
            .unwrap_or_else(empty_root)
    }

    /// The root as 64 lowercase hex characters.
    pub fn root_hex(&self) -> String {
        self.root().to_hex().to_string()
    }

    /// All levels, leaves first.
    pub fn levels(&self) -> &[Vec<Hash>] {
        &self.levels
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }
}

/// Merkle root over `items`, hex-encoded.
pub fn merkle_root<T: AsRef<[u8]>>(items: &[T]) -> String {
    MerkleTree::build(items).root_hex()
}

fn node_hash(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    hasher.finalize()
}

fn empty_root() -> Hash {
    blake3::hash(EMPTY_SENTINEL_INPUT)
}
