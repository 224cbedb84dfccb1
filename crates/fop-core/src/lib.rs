//! # fop-core: Foundational Types for the Receipts Stack
//!
//! This crate is the leaf of the FishOilProof workspace. It defines the
//! primitives every other crate builds on: the canonical byte form used for
//! hashing, the dual-hash digest, UTC timestamps, identifier newtypes,
//! explicit ledger configuration, and the error hierarchy.
//!
//! ## Key Design Principles
//!
//! 1. **`CanonicalBytes` newtype.** Every receipt hash is computed over bytes
//!    produced by `CanonicalBytes::new()` (RFC 8785 JCS: sorted keys, compact
//!    separators, stable number formatting). No ad hoc `to_vec()` for hashing.
//!
//! 2. **Dual hash.** `DualHash` carries a SHA-256 and a BLAKE3 digest of the
//!    same bytes and renders as `SHA256_<hex>:BLAKE3_<hex>`.
//!
//! 3. **Tagged stop rules.** Domain failures are `StopRule` values with an
//!    explicit `StopKind` and an optional evidence hash, never bare strings.
//!
//! 4. **Explicit configuration.** The ledger location and tenant id travel as
//!    a `LedgerConfig` value through every call. Nothing reads a global.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `fop-*` crates.
//! - No `unsafe` code.
//! - No `.unwrap()` outside tests.

pub mod canonical;
pub mod config;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use config::{FopConfig, LedgerConfig};
pub use digest::{
    dual_hash, hash_document, is_dual_hash_shaped, verify_dual_hash, DigestAlgorithm, DualHash,
};
pub use error::{CanonicalizationError, FopError, StopKind, StopRule};
pub use identity::{BatchId, LotNumber, TenantId};
pub use temporal::Timestamp;
