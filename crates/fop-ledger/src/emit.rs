//! # Receipt Emission
//!
//! Seal a payload into a receipt and append it to the configured ledger.
//! The receipt is durable on disk before it is returned, so callers that go
//! on to raise a stop rule can cite its hash as evidence.

use fop_core::{FopError, LedgerConfig, Timestamp};

use crate::ledger::Ledger;
use crate::payload::Payload;
use crate::receipt::Receipt;

/// Seal `payload` at the current UTC time and append it.
pub fn emit(payload: impl Into<Payload>, config: &LedgerConfig) -> Result<Receipt, FopError> {
    emit_at(payload, config, Timestamp::now())
}

/// Seal `payload` at `ts` and append it.
pub fn emit_at(
    payload: impl Into<Payload>,
    config: &LedgerConfig,
    ts: Timestamp,
) -> Result<Receipt, FopError> {
    let receipt = Receipt::seal(payload.into(), config.tenant_id.clone(), ts)?;
    Ledger::new(&config.ledger_path).append(&receipt)?;
    tracing::info!(
        receipt_type = %receipt.kind(),
        hash = %short_hash(&receipt.payload_hash),
        ledger = %config.ledger_path.display(),
        "receipt emitted"
    );
    Ok(receipt)
}

/// The leading part of a dual hash, for log lines.
pub fn short_hash(hash: &str) -> &str {
    hash.get(..24).unwrap_or(hash)
}
