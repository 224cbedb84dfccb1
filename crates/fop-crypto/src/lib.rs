//! # fop-crypto: Merkle Accumulator
//!
//! Every receipt carries a `merkle_root` next to its `payload_hash`: a BLAKE3
//! binary hash tree over the string form of each top-level envelope field.
//! The root is a second integrity artifact, independent of the dual hash.
//!
//! [`MerkleTree`] keeps every level of the tree, leaves first.

pub mod merkle;

pub use merkle::{merkle_root, MerkleTree};
