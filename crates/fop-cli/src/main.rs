//! # fop CLI entry point
//!
//! Parses command-line arguments, resolves configuration (YAML file, then
//! `FOP_*` environment, then flags), and dispatches to subcommand handlers.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use fop_core::{FopConfig, TenantId};
use tracing_subscriber::EnvFilter;

use fop_cli::hash::{run_hash, HashArgs};
use fop_cli::ingest::{run_ingest, IngestArgs};
use fop_cli::lot::{run_fraud, run_qr, run_summary, run_verify, LotArgs};
use fop_cli::query::{run_query, QueryArgs};
use fop_cli::serve::serve;

/// FishOilProof receipts ledger
///
/// Records each stage of a fish oil supply chain as a hash-linked receipt,
/// verifies lots end to end, and flags fraud patterns.
#[derive(Parser, Debug)]
#[command(name = "fop", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ledger file, overriding configuration and FOP_LEDGER_PATH.
    #[arg(long, global = true)]
    ledger: Option<PathBuf>,

    /// Tenant stamped on emitted receipts, overriding FOP_TENANT_ID.
    #[arg(long, global = true)]
    tenant: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a stage input file and append its receipt.
    Ingest(IngestArgs),

    /// Verify the receipt chain of a lot and run fraud checks on it.
    Verify(LotArgs),

    /// Consumer-facing summary of a lot.
    Summary(LotArgs),

    /// Compact JSON payload for a lot's QR code.
    Qr(LotArgs),

    /// Run every fraud detector over a lot and record anomalies.
    Fraud(LotArgs),

    /// List receipts matching the given filters.
    Query(QueryArgs),

    /// Serve the line-based JSON tool protocol on stdin/stdout.
    Serve,

    /// Print the dual hash of a document.
    Hash(HashArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = match resolve_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("{e:#}");
            return ExitCode::from(1);
        }
    };
    tracing::debug!(
        ledger = %config.ledger.ledger_path.display(),
        tenant = %config.ledger.tenant_id,
        "resolved configuration"
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = match &cli.command {
        Commands::Ingest(args) => run_ingest(args, &config.ledger, &mut out),
        Commands::Verify(args) => run_verify(args, &config, &mut out),
        Commands::Summary(args) => run_summary(args, &config, &mut out),
        Commands::Qr(args) => run_qr(args, &config, &mut out),
        Commands::Fraud(args) => run_fraud(args, &config, &mut out),
        Commands::Query(args) => run_query(args, &config.ledger, &mut out),
        Commands::Serve => serve(std::io::stdin().lock(), &mut out, &config),
        Commands::Hash(args) => run_hash(args, &mut out),
    };
    let _ = out.flush();

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

/// Layer command-line overrides on top of the loaded configuration.
fn resolve_config(cli: &Cli) -> anyhow::Result<FopConfig> {
    let mut config = FopConfig::load(cli.config.as_deref())?;
    if let Some(path) = &cli.ledger {
        config.ledger.ledger_path = path.clone();
    }
    if let Some(tenant) = &cli.tenant {
        config.ledger.tenant_id = TenantId(tenant.clone());
    }
    Ok(config)
}
