//! # Error Types: Structured Error Hierarchy
//!
//! Two families of failure exist in the receipts stack and they are never
//! conflated:
//!
//! - **Stop rules** ([`StopRule`]) are domain outcomes: a disallowed species,
//!   a duplicate lot, a contaminant ceiling breach. Each carries a
//!   [`StopKind`] and, for regulatory breaches, the hash of the receipt that
//!   was persisted before the stop was raised.
//! - **Operational errors** (I/O, a ledger line that does not parse,
//!   canonicalization failure, bad configuration) are the remaining
//!   [`FopError`] variants.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for the receipts stack.
#[derive(Error, Debug)]
pub enum FopError {
    /// A domain stop condition.
    #[error(transparent)]
    Stop(#[from] StopRule),

    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// A ledger line could not be parsed as a receipt.
    #[error("corrupt ledger line {line}: {source}")]
    CorruptLedger {
        /// 1-based line number in the ledger file.
        line: usize,
        /// The underlying parse failure.
        source: serde_json::Error,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration could not be loaded or is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl FopError {
    /// Returns the stop rule if this error is a domain stop condition.
    pub fn as_stop(&self) -> Option<&StopRule> {
        match self {
            Self::Stop(rule) => Some(rule),
            _ => None,
        }
    }
}

/// Classification of a domain stop condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopKind {
    /// Input failed validation (enumerations, hash shape, species, dates).
    InvalidInput,
    /// A regulatory ceiling was exceeded. Evidence was persisted first.
    RegulatoryBreach,
    /// A uniqueness constraint was violated (lot numbers).
    Duplicate,
    /// Required ledger structure is missing (e.g. no receipts for a lot).
    Structural,
}

impl StopKind {
    /// Returns the wire identifier of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::RegulatoryBreach => "REGULATORY_BREACH",
            Self::Duplicate => "DUPLICATE",
            Self::Structural => "STRUCTURAL",
        }
    }
}

impl fmt::Display for StopKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A domain stop condition. Raised immediately, never absorbed.
///
/// When `evidence_hash` is present the rendered message ends with
/// `Receipt emitted: <hash>` so that log lines and CLI output carry the
/// proof as well as the structured field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopRule {
    /// What class of failure this is.
    pub kind: StopKind,
    /// Human-readable description.
    pub message: String,
    /// `payload_hash` of the receipt persisted before the stop was raised.
    pub evidence_hash: Option<String>,
}

impl StopRule {
    /// Create a stop rule without persisted evidence.
    pub fn new(kind: StopKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            evidence_hash: None,
        }
    }

    /// Shorthand for an [`StopKind::InvalidInput`] stop.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(StopKind::InvalidInput, message)
    }

    /// Shorthand for a [`StopKind::Duplicate`] stop.
    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::new(StopKind::Duplicate, message)
    }

    /// Shorthand for a [`StopKind::Structural`] stop.
    pub fn structural(message: impl Into<String>) -> Self {
        Self::new(StopKind::Structural, message)
    }

    /// A regulatory breach whose evidence receipt has already been appended.
    pub fn regulatory_breach(message: impl Into<String>, evidence_hash: impl Into<String>) -> Self {
        Self {
            kind: StopKind::RegulatoryBreach,
            message: message.into(),
            evidence_hash: Some(evidence_hash.into()),
        }
    }
}

impl fmt::Display for StopRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(hash) = &self.evidence_hash {
            write!(f, ". Receipt emitted: {hash}")?;
        }
        Ok(())
    }
}

impl std::error::Error for StopRule {}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// The value did not serialize to JSON.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    /// The value is not an object where an envelope was expected.
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),
}
