//! # Ledger Store
//!
//! Append-only JSONL file, one sealed receipt per line. Reads are full
//! linear scans: there is no persistent index. A [`LedgerSnapshot`] keeps
//! the receipts of one load in memory together with a `payload_hash` →
//! position map so chain walks resolve each hop without rescanning.
//!
//! ## Malformed lines
//!
//! A line that is not a JSON object makes the whole load fail with
//! [`FopError::CorruptLedger`]. A line that is a JSON object but does not
//! read as a receipt (an unknown enum value, a wrong value type, a missing
//! required key) is kept as a [`MalformedLine`]. [`Ledger::load`] skips it
//! with a warning; a snapshot keeps it, so a chain walk that reaches it can
//! report it against its lot.
//!
//! ## Write discipline
//!
//! Each append opens the file in append mode and writes the serialized
//! line and its newline with a single `write_all`, then flushes. A line is
//! written whole or not at all from this process's point of view. Nothing
//! coordinates concurrent writers to the same file.

use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use fop_core::FopError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::payload::ReceiptKind;
use crate::receipt::{verify_receipt, Receipt, PAYLOAD_HASH_FIELD};

/// Handle on a ledger file. Cheap to construct; holds no open descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    /// Ledger at `path`. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the ledger file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one sealed receipt, creating the file and its parent
    /// directories if needed.
    pub fn append(&self, receipt: &Receipt) -> Result<(), FopError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut line = serde_json::to_string(&receipt.to_ledger_value()?)?;
        line.push('\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// Every receipt in file order. A missing file is an empty ledger; blank
    /// lines and malformed lines are skipped.
    ///
    /// # Errors
    ///
    /// [`FopError::CorruptLedger`] with the 1-based line number if a line
    /// is not a JSON object.
    pub fn load(&self) -> Result<Vec<Receipt>, FopError> {
        let receipts: Vec<Receipt> = self
            .read_lines()?
            .into_iter()
            .filter_map(|line| match line {
                Line::Receipt(r) => Some(r),
                Line::Malformed(m) => {
                    tracing::warn!(line = m.line, reason = %m.reason, "skipping malformed ledger line");
                    None
                }
            })
            .collect();
        Ok(receipts)
    }

    fn read_lines(&self) -> Result<Vec<Line>, FopError> {
        let file = match fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "ledger absent, treating as empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut lines = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let fields: Map<String, Value> = serde_json::from_str(trimmed)
                .map_err(|source| FopError::CorruptLedger { line: idx + 1, source })?;
            lines.push(match Receipt::from_stored(&fields) {
                Ok(receipt) => Line::Receipt(receipt),
                Err(e) => Line::Malformed(MalformedLine {
                    line: idx + 1,
                    fields,
                    reason: e.to_string(),
                }),
            });
        }
        tracing::debug!(path = %self.path.display(), count = lines.len(), "ledger loaded");
        Ok(lines)
    }

    /// First receipt of `kind` whose top-level `field` equals `value`.
    pub fn find(&self, kind: ReceiptKind, field: &str, value: &str) -> Result<Option<Receipt>, FopError> {
        Ok(self
            .load()?
            .into_iter()
            .find(|r| matches_field(r, kind, field, value)))
    }

    /// All receipts matching `filter`, in file order.
    pub fn query(&self, filter: &ReceiptFilter) -> Result<Vec<Receipt>, FopError> {
        let all = self.load()?;
        let hits: Vec<Receipt> = all.into_iter().filter(|r| filter.matches(r)).collect();
        tracing::debug!(matched = hits.len(), ?filter, "ledger query");
        Ok(hits)
    }

    /// Load once and index by `payload_hash`. Malformed lines are kept.
    pub fn snapshot(&self) -> Result<LedgerSnapshot, FopError> {
        Ok(LedgerSnapshot::from_lines(self.read_lines()?))
    }
}

enum Line {
    Receipt(Receipt),
    Malformed(MalformedLine),
}

/// A ledger line that is a JSON object but does not read as a receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct MalformedLine {
    /// 1-based line number.
    pub line: usize,
    /// The fields as stored.
    pub fields: Map<String, Value>,
    /// Why the line did not read as a receipt.
    pub reason: String,
}

impl MalformedLine {
    fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Stored `receipt_type`, or an empty string.
    pub fn receipt_type(&self) -> &str {
        self.text("receipt_type").unwrap_or("")
    }

    pub fn payload_hash(&self) -> Option<&str> {
        self.text(PAYLOAD_HASH_FIELD)
    }

    pub fn previous_hash(&self) -> Option<&str> {
        self.text("previous_hash")
    }

    pub fn lot_number(&self) -> Option<&str> {
        self.text("lot_number")
    }
}

/// One stored line of a snapshot, whether or not it reads as a receipt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StoredRecord<'a> {
    Receipt(&'a Receipt),
    Malformed(&'a MalformedLine),
}

impl<'a> StoredRecord<'a> {
    pub fn receipt_type(&self) -> &'a str {
        match *self {
            Self::Receipt(r) => r.kind().as_str(),
            Self::Malformed(m) => m.receipt_type(),
        }
    }

    pub fn payload_hash(&self) -> Option<&'a str> {
        match *self {
            Self::Receipt(r) => Some(r.payload_hash.as_str()),
            Self::Malformed(m) => m.payload_hash(),
        }
    }

    pub fn previous_hash(&self) -> Option<&'a str> {
        match *self {
            Self::Receipt(r) => r.previous_hash(),
            Self::Malformed(m) => m.previous_hash(),
        }
    }

    pub fn lot_number(&self) -> Option<&'a str> {
        match *self {
            Self::Receipt(r) => r.payload.lot_number().map(|l| l.as_str()),
            Self::Malformed(m) => m.lot_number(),
        }
    }

    /// The typed receipt, if the line read as one.
    pub fn receipt(&self) -> Option<&'a Receipt> {
        match *self {
            Self::Receipt(r) => Some(r),
            Self::Malformed(_) => None,
        }
    }

    /// Hash check over the stored line. A malformed line never verifies.
    pub fn verify(&self) -> bool {
        match *self {
            Self::Receipt(r) => verify_receipt(r),
            Self::Malformed(_) => false,
        }
    }
}

/// Optional filters for [`Ledger::query`]. Unset filters match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptFilter {
    /// Only receipts of this type.
    #[serde(default)]
    pub receipt_type: Option<ReceiptKind>,
    /// Only receipts whose `lot_number` equals this.
    #[serde(default)]
    pub lot_number: Option<String>,
    /// Only receipts whose `batch_id` equals this.
    #[serde(default)]
    pub batch_id: Option<String>,
}

impl ReceiptFilter {
    /// Whether `receipt` passes every set filter.
    pub fn matches(&self, receipt: &Receipt) -> bool {
        if self.receipt_type.is_some_and(|k| k != receipt.kind()) {
            return false;
        }
        if let Some(lot) = &self.lot_number {
            if receipt.payload.lot_number().map(|l| l.as_str()) != Some(lot.as_str()) {
                return false;
            }
        }
        if let Some(batch) = &self.batch_id {
            if receipt.payload.batch_id().map(|b| b.as_str()) != Some(batch.as_str()) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Receipt(usize),
    Malformed(usize),
}

/// Lines from a single ledger load plus an in-memory hash index.
#[derive(Debug, Clone, Default)]
pub struct LedgerSnapshot {
    receipts: Vec<Receipt>,
    malformed: Vec<MalformedLine>,
    order: Vec<Slot>,
    by_hash: HashMap<String, Slot>,
}

impl LedgerSnapshot {
    /// Index `lines`. If two lines share a hash, the first wins.
    fn from_lines(lines: Vec<Line>) -> Self {
        let mut snapshot = Self::default();
        for line in lines {
            let (slot, hash) = match line {
                Line::Receipt(r) => {
                    let hash = Some(r.payload_hash.clone());
                    snapshot.receipts.push(r);
                    (Slot::Receipt(snapshot.receipts.len() - 1), hash)
                }
                Line::Malformed(m) => {
                    let hash = m.payload_hash().map(str::to_string);
                    snapshot.malformed.push(m);
                    (Slot::Malformed(snapshot.malformed.len() - 1), hash)
                }
            };
            snapshot.order.push(slot);
            if let Some(hash) = hash {
                snapshot.by_hash.entry(hash).or_insert(slot);
            }
        }
        snapshot
    }

    fn resolve(&self, slot: Slot) -> StoredRecord<'_> {
        match slot {
            Slot::Receipt(i) => StoredRecord::Receipt(&self.receipts[i]),
            Slot::Malformed(i) => StoredRecord::Malformed(&self.malformed[i]),
        }
    }

    /// All receipts in file order, without malformed lines.
    pub fn receipts(&self) -> &[Receipt] {
        &self.receipts
    }

    /// Lines that did not read as receipts.
    pub fn malformed(&self) -> &[MalformedLine] {
        &self.malformed
    }

    /// Every stored line in file order.
    pub fn records(&self) -> impl Iterator<Item = StoredRecord<'_>> + '_ {
        self.order.iter().map(|&slot| self.resolve(slot))
    }

    /// The stored line whose `payload_hash` is `hash`.
    pub fn record(&self, hash: &str) -> Option<StoredRecord<'_>> {
        self.by_hash.get(hash).map(|&slot| self.resolve(slot))
    }

    /// First stored line of `kind` carrying `lot`, malformed or not.
    pub fn record_by_lot(&self, kind: ReceiptKind, lot: &str) -> Option<StoredRecord<'_>> {
        self.records()
            .find(|r| r.receipt_type() == kind.as_str() && r.lot_number() == Some(lot))
    }

    /// Number of receipts.
    pub fn len(&self) -> usize {
        self.receipts.len()
    }

    /// True if the ledger held no receipts.
    pub fn is_empty(&self) -> bool {
        self.receipts.is_empty()
    }

    /// The receipt whose `payload_hash` is `hash`.
    pub fn by_hash(&self, hash: &str) -> Option<&Receipt> {
        self.record(hash).and_then(|r| r.receipt())
    }

    /// First receipt of `kind` whose top-level `field` equals `value`.
    pub fn find(&self, kind: ReceiptKind, field: &str, value: &str) -> Option<&Receipt> {
        self.receipts
            .iter()
            .find(|r| matches_field(r, kind, field, value))
    }

    /// First receipt of `kind` carrying `lot`.
    pub fn find_by_lot(&self, kind: ReceiptKind, lot: &str) -> Option<&Receipt> {
        self.receipts
            .iter()
            .find(|r| r.kind() == kind && r.payload.lot_number().map(|l| l.as_str()) == Some(lot))
    }

    /// All receipts matching `filter`.
    pub fn query(&self, filter: &ReceiptFilter) -> Vec<&Receipt> {
        self.receipts.iter().filter(|r| filter.matches(r)).collect()
    }
}

fn matches_field(receipt: &Receipt, kind: ReceiptKind, field: &str, value: &str) -> bool {
    receipt.kind() == kind && receipt.field(field) == Some(Value::String(value.to_string()))
}
