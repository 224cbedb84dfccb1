//! # fop-audit: Verification and Fraud Detection
//!
//! Read side of the receipts stack:
//!
//! - [`chain`]: walks a lot's five receipts backwards and recomputes every
//!   hash, collecting problems into a [`ChainReport`].
//! - [`summary`]: the consumer-facing digest and the QR payload.
//! - [`fraud`]: per-receipt detectors that append `anomaly` receipts.
//!
//! Fraud detection is the one write path here; everything else only loads
//! the ledger.

pub mod chain;
pub mod fraud;
pub mod summary;

#[cfg(test)]
mod testutil;

pub use chain::{verify_chain, verify_lot, ChainReport, FULL_CHAIN_LENGTH};
pub use fraud::{
    detect_cold_chain_degradation, detect_contaminant_exceed, detect_label_fraud,
    detect_yield_anomaly, run_all_fraud_checks, run_fraud_checks_for_lot,
};
pub use summary::{
    chain_summary, qr_for_lot, qr_payload, summarize_lot, ChainSummary, FailedSummary, QrPayload,
    VerifiedSummary,
};
