//! # Dual-Hash Digest
//!
//! A receipt fingerprint is two independent digests of the same bytes,
//! SHA-256 and BLAKE3, rendered with algorithm tags:
//!
//! ```text
//! SHA256_<64 hex>:BLAKE3_<64 hex>
//! ```
//!
//! Both halves must match for two fingerprints to be equal. The function is
//! pure: identical bytes always produce an identical string.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;
use crate::error::{FopError, StopRule};

/// Separator between the two tagged halves of a dual hash.
pub const DUAL_HASH_SEPARATOR: char = ':';

/// The hash algorithms combined in a [`DualHash`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// SHA-256.
    Sha256,
    /// BLAKE3 (256-bit output).
    Blake3,
}

impl DigestAlgorithm {
    /// Returns the tag used in the rendered dual hash.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Sha256 => "SHA256",
            Self::Blake3 => "BLAKE3",
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A SHA-256 digest and a BLAKE3 digest computed over the same bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DualHash {
    sha256: [u8; 32],
    blake3: [u8; 32],
}

impl DualHash {
    /// Hash arbitrary bytes with both algorithms.
    pub fn compute(data: &[u8]) -> Self {
        let mut sha256 = [0u8; 32];
        sha256.copy_from_slice(&Sha256::digest(data));
        let blake3 = *blake3::hash(data).as_bytes();
        Self { sha256, blake3 }
    }

    /// Hash canonical bytes. This is the receipt `payload_hash` path.
    pub fn of_canonical(data: &CanonicalBytes) -> Self {
        Self::compute(data.as_bytes())
    }

    /// The SHA-256 half.
    pub fn sha256(&self) -> &[u8; 32] {
        &self.sha256
    }

    /// The BLAKE3 half.
    pub fn blake3(&self) -> &[u8; 32] {
        &self.blake3
    }
}

impl fmt::Display for DualHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}{}{}_{}",
            DigestAlgorithm::Sha256,
            to_hex(&self.sha256),
            DUAL_HASH_SEPARATOR,
            DigestAlgorithm::Blake3,
            to_hex(&self.blake3)
        )
    }
}

impl FromStr for DualHash {
    type Err = FopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || FopError::from(StopRule::invalid_input(format!("malformed dual hash: {s:?}")));
        let (left, right) = s.split_once(DUAL_HASH_SEPARATOR).ok_or_else(malformed)?;
        let sha_hex = left
            .strip_prefix("SHA256_")
            .ok_or_else(malformed)?;
        let blake_hex = right
            .strip_prefix("BLAKE3_")
            .ok_or_else(malformed)?;
        Ok(Self {
            sha256: hex_to_32bytes(sha_hex).ok_or_else(malformed)?,
            blake3: hex_to_32bytes(blake_hex).ok_or_else(malformed)?,
        })
    }
}

impl Serialize for DualHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DualHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Compute the dual hash of `data` in its rendered string form.
pub fn dual_hash(data: &[u8]) -> String {
    DualHash::compute(data).to_string()
}

/// Returns true if `data` hashes to `expected`.
pub fn verify_dual_hash(data: &[u8], expected: &str) -> bool {
    dual_hash(data) == expected
}

/// Structural check used by the stage validators for certificate hashes:
/// the value must contain the dual-hash separator.
pub fn is_dual_hash_shaped(s: &str) -> bool {
    s.contains(DUAL_HASH_SEPARATOR)
}

/// Dual-hash a document on disk (certificates, import papers).
///
/// # Errors
///
/// Returns an `INVALID_INPUT` stop rule if the file does not exist, or an
/// I/O error if it cannot be read.
pub fn hash_document(path: &Path) -> Result<String, FopError> {
    if !path.exists() {
        return Err(StopRule::invalid_input(format!("Document not found: {}", path.display())).into());
    }
    let data = std::fs::read(path)?;
    Ok(dual_hash(&data))
}

/// Encode bytes as lowercase hex.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hex_to_32bytes(hex: &str) -> Option<[u8; 32]> {
    if hex.len() != 64 || !hex.is_ascii() {
        return None;
    }
    let mut out = [0u8; 32];
    for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
        let s = std::str::from_utf8(chunk).ok()?;
        out[i] = u8::from_str_radix(s, 16).ok()?;
    }
    Some(out)
}
