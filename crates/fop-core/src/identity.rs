//! # Domain Identity Newtypes
//!
//! Newtype wrappers for the identifiers that thread a supply chain together.
//! A `LotNumber` cannot be passed where a `BatchId` is expected.
//!
//! - **Batch**: internal identifier linking catch → processing → testing.
//! - **Lot**: consumer-facing identifier for one encapsulation batch and its
//!   downstream distribution.
//! - **Tenant**: the organization on whose behalf receipts are emitted.
//!
//! All three serialize as bare JSON strings.

use serde::{Deserialize, Serialize};

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Wrap a string value.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_newtype!(
    /// Consumer-facing lot number, e.g. `LOT-2025-0131-01`.
    LotNumber
);

string_newtype!(
    /// Internal batch identifier, e.g. `BP-2025-0131`.
    BatchId
);

string_newtype!(
    /// Tenant on whose behalf a receipt was emitted.
    TenantId
);
