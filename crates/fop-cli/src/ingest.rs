//! # Ingest Subcommand
//!
//! Reads one stage input file (JSON), runs that stage's emitting validator,
//! and prints the sealed receipt.
//!
//! Inputs after catch may omit `previous_hash`; it is then resolved from
//! the ledger through the parent stage's link (by `batch_id`, or by
//! `lot_number` for distribution).

use std::fmt;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use fop_core::LedgerConfig;
use fop_ledger::{Ledger, Receipt};
use fop_stages::{catch, distribution, encapsulation, processing, testing};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{print_json, EXIT_OK};

/// Arguments for the ingest subcommand.
#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Supply chain stage the file belongs to.
    #[arg(value_enum)]
    pub stage: Stage,

    /// Path to the JSON input file.
    pub file: PathBuf,
}

/// A supply chain stage that accepts input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Stage {
    Catch,
    Processing,
    Testing,
    Encapsulation,
    Distribution,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Catch => "catch",
            Self::Processing => "processing",
            Self::Testing => "testing",
            Self::Encapsulation => "encapsulation",
            Self::Distribution => "distribution",
        };
        f.write_str(name)
    }
}

/// Execute the ingest subcommand.
pub fn run_ingest<W: Write>(args: &IngestArgs, config: &LedgerConfig, out: &mut W) -> Result<u8> {
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read input file: {}", args.file.display()))?;
    let data: Value = serde_json::from_str(&text)
        .with_context(|| format!("input file is not valid JSON: {}", args.file.display()))?;
    let receipt = ingest_value(args.stage, data, config)?;
    print_json(out, &receipt)?;
    Ok(EXIT_OK)
}

/// Validate and emit one stage input already parsed as JSON.
pub fn ingest_value(stage: Stage, mut data: Value, config: &LedgerConfig) -> Result<Receipt> {
    if !data.is_object() {
        bail!("{stage} input must be a JSON object");
    }
    if stage != Stage::Catch {
        resolve_previous_hash(stage, &mut data, config)?;
    }

    let receipt = match stage {
        Stage::Catch => catch::create_catch_receipt(&parse(stage, data)?, config)?,
        Stage::Processing => processing::create_processing_receipt(&parse(stage, data)?, config)?,
        Stage::Testing => testing::create_testing_receipt(&parse(stage, data)?, config)?,
        Stage::Encapsulation => {
            encapsulation::create_encapsulation_receipt(&parse(stage, data)?, config)?
        }
        Stage::Distribution => {
            distribution::create_distribution_receipt(&parse(stage, data)?, config)?
        }
    };
    Ok(receipt)
}

fn parse<T: DeserializeOwned>(stage: Stage, data: Value) -> Result<T> {
    serde_json::from_value(data).with_context(|| format!("invalid {stage} input"))
}

fn resolve_previous_hash(stage: Stage, data: &mut Value, config: &LedgerConfig) -> Result<()> {
    if data.get("previous_hash").is_some_and(|v| !v.is_null()) {
        return Ok(());
    }

    let key = if stage == Stage::Distribution { "lot_number" } else { "batch_id" };
    let Some(value) = data.get(key).and_then(Value::as_str).map(str::to_owned) else {
        bail!("{stage} input needs previous_hash or {key}");
    };

    let ledger = Ledger::new(&config.ledger_path);
    let (parent, found) = match stage {
        Stage::Processing => ("catch", processing::link_to_catch(&value, &ledger)?),
        Stage::Testing => ("processing", testing::link_to_processing(&value, &ledger)?),
        Stage::Encapsulation => ("testing", encapsulation::link_to_testing(&value, &ledger)?),
        Stage::Distribution => (
            "encapsulation",
            distribution::link_to_encapsulation(&value, &ledger)?,
        ),
        Stage::Catch => return Ok(()),
    };
    let Some(parent_receipt) = found else {
        bail!("no {parent} receipt found for {key} {value}; supply previous_hash explicitly");
    };

    tracing::info!(%stage, parent, %key, %value, "linked to parent receipt");
    if let Some(obj) = data.as_object_mut() {
        obj.insert("previous_hash".into(), Value::String(parent_receipt.payload_hash));
    }
    Ok(())
}
