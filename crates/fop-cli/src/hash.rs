//! # Hash Subcommand
//!
//! Prints the dual hash of a document, for use as a `*_hash` field in stage
//! input files.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use fop_core::hash_document;

use crate::EXIT_OK;

/// Arguments for the hash subcommand.
#[derive(Args, Debug)]
pub struct HashArgs {
    /// Document to hash (certificate, import papers, logger export).
    pub file: PathBuf,
}

/// Execute the hash subcommand.
pub fn run_hash<W: Write>(args: &HashArgs, out: &mut W) -> Result<u8> {
    let hash = hash_document(&args.file)?;
    tracing::debug!(file = %args.file.display(), "hashed document");
    writeln!(out, "{hash}")?;
    Ok(EXIT_OK)
}
