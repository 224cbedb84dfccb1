//! # Receipt Envelope
//!
//! A receipt is a payload wrapped in metadata and sealed with two integrity
//! artifacts:
//!
//! ```text
//! envelope     = { receipt_type, ts, tenant_id, <payload fields...> }
//! payload_hash = DualHash(JCS(envelope))
//! merkle_root  = Merkle([str(v) for v in envelope.values()])
//! ```
//!
//! The ledger line is the envelope followed by `payload_hash` and
//! `merkle_root`. Verification strips those two fields, rebuilds the
//! canonical bytes, and compares. Any change to any envelope field, including
//! `ts`, changes `payload_hash`.
//!
//! A receipt read back from the ledger keeps the line it was parsed from, and
//! verification hashes that line rather than the typed fields. A key added to
//! or removed from a stored line therefore breaks the hash even when the
//! typed form reads the same.
//!
//! Merkle leaves are the top-level values in envelope order: strings
//! verbatim, every other value as compact JSON (`null` for absent values).

use fop_core::{CanonicalBytes, CanonicalizationError, DualHash, FopError, TenantId, Timestamp};
use fop_crypto::MerkleTree;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::payload::{Payload, ReceiptKind};

/// Name of the dual-hash field on a ledger line.
pub const PAYLOAD_HASH_FIELD: &str = "payload_hash";

/// Name of the Merkle root field on a ledger line.
pub const MERKLE_ROOT_FIELD: &str = "merkle_root";

/// A sealed receipt as stored in the ledger.
///
/// Serializes to the ledger line form: `receipt_type`, `ts`, `tenant_id`,
/// the payload fields, then `payload_hash` and `merkle_root`.
///
/// Equality compares the typed fields only.
#[derive(Debug, Clone, Deserialize)]
pub struct Receipt {
    /// Emission time, UTC.
    pub ts: Timestamp,
    /// Tenant the receipt was emitted for.
    pub tenant_id: TenantId,
    /// Stage-specific payload, including the `receipt_type` tag.
    #[serde(flatten)]
    pub payload: Payload,
    /// `SHA256_<hex>:BLAKE3_<hex>` over the canonical envelope.
    pub payload_hash: String,
    /// Hex BLAKE3 Merkle root over the envelope values.
    pub merkle_root: String,
    #[serde(skip)]
    stored: Option<Map<String, Value>>,
}

impl PartialEq for Receipt {
    fn eq(&self, other: &Self) -> bool {
        self.ts == other.ts
            && self.tenant_id == other.tenant_id
            && self.payload == other.payload
            && self.payload_hash == other.payload_hash
            && self.merkle_root == other.merkle_root
    }
}

impl Receipt {
    /// Build the envelope for `payload` and compute both integrity fields.
    pub fn seal(payload: Payload, tenant_id: TenantId, ts: Timestamp) -> Result<Self, FopError> {
        let mut receipt = Self {
            ts,
            tenant_id,
            payload,
            payload_hash: String::new(),
            merkle_root: String::new(),
            stored: None,
        };
        let envelope = receipt.envelope()?;
        receipt.merkle_root = merkle_root_of(&envelope);
        receipt.payload_hash = payload_hash_of(envelope)?;
        Ok(receipt)
    }

    /// Parse a stored ledger line, keeping its fields for verification.
    pub fn from_stored(fields: &Map<String, Value>) -> Result<Self, serde_json::Error> {
        let mut receipt: Self = serde_json::from_value(Value::Object(fields.clone()))?;
        receipt.stored = Some(fields.clone());
        Ok(receipt)
    }

    /// Fields of the ledger line this receipt was read from.
    pub fn stored_fields(&self) -> Option<&Map<String, Value>> {
        self.stored.as_ref()
    }

    /// The receipt type.
    pub fn kind(&self) -> ReceiptKind {
        self.payload.kind()
    }

    /// `previous_hash` of stage receipts after catch.
    pub fn previous_hash(&self) -> Option<&str> {
        self.payload.previous_hash()
    }

    /// The envelope without the two integrity fields, in field order.
    pub fn envelope(&self) -> Result<Map<String, Value>, FopError> {
        let payload = match serde_json::to_value(&self.payload)? {
            Value::Object(map) => map,
            other => {
                return Err(CanonicalizationError::NotAnObject(json_type_name(&other)).into());
            }
        };

        let mut env = Map::with_capacity(payload.len() + 2);
        env.insert("receipt_type".into(), Value::String(self.kind().as_str().into()));
        env.insert("ts".into(), Value::String(self.ts.to_iso8601()));
        env.insert("tenant_id".into(), Value::String(self.tenant_id.0.clone()));
        for (k, v) in payload {
            if k != "receipt_type" {
                env.insert(k, v);
            }
        }
        Ok(env)
    }

    /// The full ledger line value: envelope plus integrity fields.
    pub fn to_ledger_value(&self) -> Result<Value, FopError> {
        let mut env = self.envelope()?;
        env.insert(PAYLOAD_HASH_FIELD.into(), Value::String(self.payload_hash.clone()));
        env.insert(MERKLE_ROOT_FIELD.into(), Value::String(self.merkle_root.clone()));
        Ok(Value::Object(env))
    }

    /// The fields covered by the integrity artifacts: the stored line minus
    /// its hash fields when read from the ledger, otherwise the envelope.
    pub fn hashed_fields(&self) -> Result<Map<String, Value>, FopError> {
        match &self.stored {
            Some(fields) => Ok(strip_integrity_fields(fields)),
            None => self.envelope(),
        }
    }

    /// Recompute `payload_hash` from the hashed fields.
    pub fn compute_payload_hash(&self) -> Result<String, FopError> {
        payload_hash_of(self.hashed_fields()?)
    }

    /// Recompute `merkle_root` from the hashed fields.
    pub fn compute_merkle_root(&self) -> Result<String, FopError> {
        Ok(merkle_root_of(&self.hashed_fields()?))
    }

    /// Top-level field lookup by name, across envelope and integrity fields.
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            PAYLOAD_HASH_FIELD => Some(Value::String(self.payload_hash.clone())),
            MERKLE_ROOT_FIELD => Some(Value::String(self.merkle_root.clone())),
            _ => self.envelope().ok()?.remove(name),
        }
    }
}

impl Serialize for Receipt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_ledger_value()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

/// Recompute the receipt's hash from its stored fields and compare with the
/// stored `payload_hash`. A receipt that cannot be canonicalized fails.
pub fn verify_receipt(receipt: &Receipt) -> bool {
    if receipt.payload_hash.is_empty() {
        return false;
    }
    match receipt.compute_payload_hash() {
        Ok(computed) => computed == receipt.payload_hash,
        Err(e) => {
            tracing::warn!(error = %e, "receipt could not be canonicalized for verification");
            false
        }
    }
}

/// A copy of `fields` without `payload_hash` and `merkle_root`.
fn strip_integrity_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .filter(|(k, _)| k.as_str() != PAYLOAD_HASH_FIELD && k.as_str() != MERKLE_ROOT_FIELD)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Dual hash of the canonical form of an envelope.
pub fn payload_hash_of(envelope: Map<String, Value>) -> Result<String, FopError> {
    let canonical = CanonicalBytes::from_value(Value::Object(envelope))?;
    Ok(DualHash::of_canonical(&canonical).to_string())
}

/// Merkle root over the envelope values in insertion order.
pub fn merkle_root_of(envelope: &Map<String, Value>) -> String {
    let leaves: Vec<String> = envelope.values().map(leaf_string).collect();
    MerkleTree::build(&leaves).root_hex()
}

/// String form of one envelope value for the Merkle tree.
pub fn leaf_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
