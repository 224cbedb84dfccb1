//! # Canonical Serialization: JCS Byte Production
//!
//! `CanonicalBytes` is the sole construction path for bytes that feed a
//! receipt hash. The inner `Vec<u8>` is private; the only constructors run
//! the value through RFC 8785 (JSON Canonicalization Scheme) via `serde_jcs`:
//!
//! 1. Object keys are sorted (UTF-16 code unit order), at every depth.
//! 2. Separators are compact, no whitespace.
//! 3. Numbers use ECMAScript formatting, so `1000.0` and `1000` produce the
//!    same bytes and a value re-read from the ledger canonicalizes exactly as
//!    it did when it was emitted.
//! 4. Nested objects and arrays are canonicalized recursively; strings are
//!    emitted as UTF-8 without ASCII escaping.
//!
//! The routine is type-agnostic: every payload variant flows through the same
//! function, so there is no per-stage formatting to drift.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization.
///
/// # Invariants
///
/// - Keys are sorted at every level.
/// - Serialization is compact and deterministic for equal JSON values.
/// - Constructed only by [`CanonicalBytes::new`] or [`CanonicalBytes::from_value`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::SerializationFailed` if the value
    /// cannot be represented as JSON.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        Self::from_value(value)
    }

    /// Construct canonical bytes from an already-built JSON value.
    ///
    /// Used when a receipt is re-hashed from its stored form: the envelope is
    /// edited as a `Value` (hash fields removed) and canonicalized directly.
    pub fn from_value(value: Value) -> Result<Self, CanonicalizationError> {
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    /// The bytes fed to both digests.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume and return the inner bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon(value: Value) -> String {
        let cb = CanonicalBytes::from_value(value).expect("should canonicalize");
        String::from_utf8(cb.into_bytes()).unwrap()
    }

    #[test]
    fn sorted_keys_compact_separators() {
        let data = serde_json::json!({"b": 2, "a": 1, "c": "hello"});
        assert_eq!(canon(data), r#"{"a":1,"b":2,"c":"hello"}"#);
    }

    #[test]
    fn nested_objects_are_sorted() {
        let data = serde_json::json!({
            "outer": {"b": 2, "a": 1},
            "list": [3, 2, 1]
        });
        assert_eq!(canon(data), r#"{"list":[3,2,1],"outer":{"a":1,"b":2}}"#);
    }

    #[test]
    fn floats_are_accepted_and_stable() {
        let data = serde_json::json!({"mercury_ppm": 0.02, "ratio": 0.147});
        assert_eq!(canon(data), r#"{"mercury_ppm":0.02,"ratio":0.147}"#);
    }

    #[test]
    fn integral_float_matches_integer() {
        let as_float = canon(serde_json::json!({"kg": 1000.0}));
        let as_int = canon(serde_json::json!({"kg": 1000}));
        assert_eq!(as_float, as_int);
        assert_eq!(as_float, r#"{"kg":1000}"#);
    }

    #[test]
    fn null_and_bool_passthrough() {
        let data = serde_json::json!({"flag": true, "cert": null});
        assert_eq!(canon(data), r#"{"cert":null,"flag":true}"#);
    }

    #[test]
    fn unicode_passthrough() {
        let data = serde_json::json!({"temp": "2.0\u{00b0}C"});
        assert!(canon(data).contains('\u{00b0}'));
    }

    #[test]
    fn reparsed_ledger_text_canonicalizes_identically() {
        // The ledger stores `1000.0`; canonical form must not depend on that.
        let original = serde_json::json!({"yield_input_kg": 1000.0, "yield_output_kg": 147.0});
        let stored = serde_json::to_string(&original).unwrap();
        let reparsed: Value = serde_json::from_str(&stored).unwrap();
        assert_eq!(
            CanonicalBytes::from_value(original).unwrap(),
            CanonicalBytes::from_value(reparsed).unwrap()
        );
    }

    #[test]
    fn empty_object() {
        let cb = CanonicalBytes::new(&serde_json::json!({})).unwrap();
        assert_eq!(cb.as_bytes(), b"{}");
        assert!(!cb.is_empty());
        assert_eq!(cb.len(), 2);
    }
}
