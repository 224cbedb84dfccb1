//! # Query Subcommand
//!
//! Lists receipts matching optional type, lot, and batch filters.

use std::io::Write;

use anyhow::Result;
use clap::Args;
use fop_core::LedgerConfig;
use fop_ledger::{Ledger, ReceiptFilter, ReceiptKind};

use crate::{print_json, EXIT_OK};

/// Arguments for the query subcommand.
#[derive(Args, Debug, Default)]
pub struct QueryArgs {
    /// Only receipts of this type (catch, processing, testing,
    /// encapsulation, distribution, anomaly).
    #[arg(long = "type", value_parser = parse_kind)]
    pub receipt_type: Option<ReceiptKind>,

    /// Only receipts carrying this lot number.
    #[arg(long = "lot")]
    pub lot_number: Option<String>,

    /// Only receipts carrying this batch id.
    #[arg(long = "batch")]
    pub batch_id: Option<String>,
}

impl QueryArgs {
    pub fn filter(&self) -> ReceiptFilter {
        ReceiptFilter {
            receipt_type: self.receipt_type,
            lot_number: self.lot_number.clone(),
            batch_id: self.batch_id.clone(),
        }
    }
}

fn parse_kind(s: &str) -> Result<ReceiptKind, String> {
    ReceiptKind::from_wire(s).ok_or_else(|| {
        let valid: Vec<&str> = ReceiptKind::ALL.iter().map(ReceiptKind::as_str).collect();
        format!("unknown receipt type '{s}' (expected one of: {})", valid.join(", "))
    })
}

/// Execute the query subcommand.
pub fn run_query<W: Write>(args: &QueryArgs, config: &LedgerConfig, out: &mut W) -> Result<u8> {
    let receipts = Ledger::new(&config.ledger_path).query(&args.filter())?;
    print_json(out, &receipts)?;
    Ok(EXIT_OK)
}
