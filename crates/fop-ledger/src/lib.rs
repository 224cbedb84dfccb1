//! # fop-ledger: Receipts and the Append-Only Ledger
//!
//! - [`payload`]: the per-stage payload structs and their closed vocabularies.
//! - [`receipt`]: the sealed envelope, hash recomputation, Merkle leaves.
//! - [`emit`]: seal + durable append.
//! - [`ledger`]: JSONL load, lookup, query, and the hash-indexed snapshot.
//!
//! Every emitting call takes a [`LedgerConfig`](fop_core::LedgerConfig);
//! nothing in this crate reads a default path or tenant on its own.

pub mod emit;
pub mod ledger;
pub mod payload;
pub mod receipt;

pub use emit::{emit, emit_at};
pub use ledger::{Ledger, LedgerSnapshot, MalformedLine, ReceiptFilter, StoredRecord};
pub use payload::{
    AnomalyPayload, AnomalyType, CatchPayload, ColdChain, ContaminantResult, DistributionPayload,
    EncapsulationPayload, ExtractionMethod, FacilityCertType, FisheryCertType, GmpCertType,
    LabCertType, OxidationResult, Payload, PotencyResult, ProcessingPayload, ReceiptKind,
    Severity, TestingPayload, YieldStatus,
};
pub use receipt::{verify_receipt, Receipt};
