//! # Chain Verification
//!
//! A lot is verified by walking its receipts backwards:
//!
//! ```text
//! distribution ──lot──▶ encapsulation ──prev──▶ testing ──prev──▶ processing ──prev──▶ catch
//! ```
//!
//! The distribution and encapsulation receipts are located by lot number;
//! the distribution's `previous_hash` must equal the encapsulation's
//! `payload_hash`. The remaining three hops follow `previous_hash` through
//! the whole ledger, checking the type found at each hop. Every visited
//! receipt then has its hash recomputed from its stored fields.
//!
//! A ledger line that does not read as a receipt still takes part in the
//! walk by its stored `receipt_type`, `lot_number` and `previous_hash`. It
//! never verifies and is left out of the report's receipts.
//!
//! Problems are collected, not raised. A missing distribution or
//! encapsulation receipt ends the walk immediately; an unresolvable link
//! ends it at that hop. Either way the report carries every error found.

use fop_core::{FopError, LotNumber, Timestamp};
use fop_ledger::{Ledger, LedgerSnapshot, Receipt, ReceiptKind, StoredRecord};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Hops walked by `previous_hash` after the encapsulation receipt.
const BACKWARD_HOPS: [ReceiptKind; 3] = [
    ReceiptKind::Testing,
    ReceiptKind::Processing,
    ReceiptKind::Catch,
];

/// Length of a complete chain.
pub const FULL_CHAIN_LENGTH: usize = 5;

/// Outcome of verifying one lot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainReport {
    pub lot_number: LotNumber,
    pub chain_length: usize,
    pub chain_valid: bool,
    /// Visited receipts keyed by receipt type, in walk order.
    #[serde(serialize_with = "receipts_by_kind")]
    pub receipts: Vec<Receipt>,
    pub errors: Vec<String>,
    pub verified_at: Timestamp,
}

impl ChainReport {
    fn start(lot: &str) -> Self {
        Self {
            lot_number: LotNumber::from(lot),
            chain_length: 0,
            chain_valid: false,
            receipts: Vec::new(),
            errors: Vec::new(),
            verified_at: Timestamp::now(),
        }
    }

    fn error(&mut self, message: String) {
        tracing::warn!(lot = %self.lot_number, error = %message, "chain verification error");
        self.errors.push(message);
    }

    /// The visited receipt of `kind`. If a hop returned the wrong type the
    /// same kind can appear twice; the later one wins.
    pub fn receipt(&self, kind: ReceiptKind) -> Option<&Receipt> {
        self.receipts.iter().rev().find(|r| r.kind() == kind)
    }

    /// One entry per receipt type, positioned where that type was first
    /// visited and holding the last receipt of that type.
    pub fn by_kind(&self) -> Vec<(ReceiptKind, &Receipt)> {
        group_by_kind(&self.receipts)
    }
}

fn group_by_kind(receipts: &[Receipt]) -> Vec<(ReceiptKind, &Receipt)> {
    let mut out: Vec<(ReceiptKind, &Receipt)> = Vec::new();
    for r in receipts {
        match out.iter_mut().find(|(k, _)| *k == r.kind()) {
            Some(slot) => slot.1 = r,
            None => out.push((r.kind(), r)),
        }
    }
    out
}

fn receipts_by_kind<S: Serializer>(receipts: &[Receipt], serializer: S) -> Result<S::Ok, S::Error> {
    let entries = group_by_kind(receipts);
    let mut map = serializer.serialize_map(Some(entries.len()))?;
    for (kind, receipt) in entries {
        map.serialize_entry(kind.as_str(), receipt)?;
    }
    map.end()
}

/// Load `ledger` once and verify the chain for `lot`.
pub fn verify_lot(lot: &str, ledger: &Ledger) -> Result<ChainReport, FopError> {
    let snapshot = ledger.snapshot()?;
    Ok(verify_chain(lot, &snapshot))
}

/// Verify the five-receipt chain for `lot` against an already loaded ledger.
pub fn verify_chain(lot: &str, snapshot: &LedgerSnapshot) -> ChainReport {
    let mut report = ChainReport::start(lot);

    let Some(dist) = snapshot.record_by_lot(ReceiptKind::Distribution, lot) else {
        report.error(format!("No distribution receipt found for lot {lot}"));
        return report;
    };
    let Some(encap) = snapshot.record_by_lot(ReceiptKind::Encapsulation, lot) else {
        report.error(format!("No encapsulation receipt found for lot {lot}"));
        return report;
    };

    if encap.payload_hash().is_none() || dist.previous_hash() != encap.payload_hash() {
        report.error(
            "Distribution previous_hash does not match encapsulation payload_hash".to_string(),
        );
    }

    let mut chain: Vec<StoredRecord<'_>> = vec![dist, encap];
    let mut current = encap;
    for expected in BACKWARD_HOPS {
        let prev_hash = match current.previous_hash() {
            Some(h) if !h.is_empty() => h,
            _ => {
                report.error(format!(
                    "Missing previous_hash on {} receipt",
                    current.receipt_type()
                ));
                break;
            }
        };
        let Some(prev) = snapshot.record(prev_hash) else {
            report.error(format!(
                "Cannot find receipt with hash {}...",
                prefix(prev_hash, 40)
            ));
            break;
        };
        if prev.receipt_type() != expected.as_str() {
            report.error(format!(
                "Expected {expected} receipt but found {}",
                prev.receipt_type()
            ));
        }
        chain.push(prev);
        current = prev;
    }

    for r in &chain {
        if !r.verify() {
            report.error(format!("Hash verification failed for {} receipt", r.receipt_type()));
        }
    }

    report.chain_length = chain.len();
    report.receipts = chain.iter().filter_map(StoredRecord::receipt).cloned().collect();
    report.chain_valid = report.errors.is_empty() && report.chain_length == FULL_CHAIN_LENGTH;
    tracing::debug!(
        lot = %report.lot_number,
        chain_length = report.chain_length,
        valid = report.chain_valid,
        "chain verified"
    );
    report
}

fn prefix(s: &str, chars: usize) -> &str {
    match s.char_indices().nth(chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
