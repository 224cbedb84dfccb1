//! # fop-cli: FishOilProof Command-Line Interface
//!
//! Provides the `fop` binary. Handlers parse arguments, resolve a
//! [`FopConfig`](fop_core::FopConfig), and delegate to the library crates;
//! no validation or verification logic lives here.
//!
//! ## Subcommands
//!
//! - `fop ingest <stage> <file>`: validate a stage input file and emit its receipt.
//! - `fop verify <lot>`: verify a lot's chain; fraud checks run on a valid chain.
//! - `fop summary <lot>` / `fop qr <lot>`: consumer digest and QR payload.
//! - `fop fraud <lot>`: run every fraud detector over a lot.
//! - `fop query [--type] [--lot] [--batch]`: list matching receipts.
//! - `fop serve`: line-based JSON tool server on stdin/stdout.
//! - `fop hash <file>`: dual hash of a document.
//!
//! ## Output
//!
//! Results go to stdout as JSON; logs go to stderr. Exit codes: `0` success,
//! `1` failure (including stop rules), `2` a lot whose chain did not verify.

pub mod hash;
pub mod ingest;
pub mod lot;
pub mod query;
pub mod serve;

use std::io::Write;

use anyhow::Result;
use serde::Serialize;

/// Exit code for success.
pub const EXIT_OK: u8 = 0;

/// Exit code for a lot whose chain did not verify.
pub const EXIT_CHAIN_INVALID: u8 = 2;

/// Write `value` as pretty JSON followed by a newline.
pub fn print_json<W: Write>(out: &mut W, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
