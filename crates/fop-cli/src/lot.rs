//! # Lot Subcommands
//!
//! `verify`, `summary`, `qr`, and `fraud` all take a single lot number.

use std::io::Write;

use anyhow::Result;
use clap::Args;
use fop_audit::{
    chain_summary, qr_payload, run_all_fraud_checks, run_fraud_checks_for_lot, verify_lot,
    ChainReport, ChainSummary,
};
use fop_core::FopConfig;
use fop_ledger::{Ledger, Payload, Receipt};
use serde::Serialize;

use crate::{print_json, EXIT_CHAIN_INVALID, EXIT_OK};

/// Arguments shared by the lot subcommands.
#[derive(Args, Debug)]
pub struct LotArgs {
    /// Consumer-facing lot number, e.g. LOT-2025-0214-31.
    pub lot_number: String,
}

#[derive(Serialize)]
struct VerifyOutput<'a> {
    #[serde(flatten)]
    report: &'a ChainReport,
    anomalies: Vec<Receipt>,
}

/// Verify a lot. When the chain is valid, fraud checks run over it and
/// their findings are included in the output.
pub fn run_verify<W: Write>(args: &LotArgs, config: &FopConfig, out: &mut W) -> Result<u8> {
    let report = verify_lot(&args.lot_number, &Ledger::new(&config.ledger.ledger_path))?;

    let anomalies = if report.chain_valid {
        let chain: Vec<Receipt> = report.by_kind().into_iter().map(|(_, r)| r.clone()).collect();
        run_all_fraud_checks(&chain, &config.ledger)?
    } else {
        Vec::new()
    };
    for a in &anomalies {
        if let Payload::Anomaly(p) = &a.payload {
            let message = p.details.get("message").and_then(|m| m.as_str()).unwrap_or("");
            tracing::warn!(anomaly_type = %p.anomaly_type, severity = %p.severity, "{message}");
        }
    }

    print_json(
        out,
        &VerifyOutput {
            report: &report,
            anomalies,
        },
    )?;
    Ok(exit_for(report.chain_valid))
}

/// Print the consumer summary of a lot.
pub fn run_summary<W: Write>(args: &LotArgs, config: &FopConfig, out: &mut W) -> Result<u8> {
    let summary = summarize(args, config)?;
    print_json(out, &summary)?;
    Ok(exit_for(summary.is_valid()))
}

/// Print the compact QR payload of a lot.
pub fn run_qr<W: Write>(args: &LotArgs, config: &FopConfig, out: &mut W) -> Result<u8> {
    let summary = summarize(args, config)?;
    let payload = qr_payload(&summary, &config.verification_base_url)?;
    writeln!(out, "{payload}")?;
    Ok(exit_for(summary.is_valid()))
}

/// Run the fraud detectors over a lot and print the anomalies recorded.
pub fn run_fraud<W: Write>(args: &LotArgs, config: &FopConfig, out: &mut W) -> Result<u8> {
    let anomalies = run_fraud_checks_for_lot(&args.lot_number, &config.ledger)?;
    tracing::info!(lot = %args.lot_number, count = anomalies.len(), "fraud checks complete");
    print_json(out, &anomalies)?;
    Ok(EXIT_OK)
}

fn summarize(args: &LotArgs, config: &FopConfig) -> Result<ChainSummary> {
    let report = verify_lot(&args.lot_number, &Ledger::new(&config.ledger.ledger_path))?;
    Ok(chain_summary(&report))
}

fn exit_for(valid: bool) -> u8 {
    if valid {
        EXIT_OK
    } else {
        EXIT_CHAIN_INVALID
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{ingest_value, Stage};
    use fop_core::{dual_hash, LedgerConfig};
    use serde_json::{json, Value};

    const LOT: &str = "LOT-2025-0301-42";

    fn seeded(dir: &tempfile::TempDir, yield_output_kg: f64) -> FopConfig {
        let config = FopConfig {
            ledger: LedgerConfig::new(dir.path().join("receipts.jsonl"), "cli-test"),
            ..FopConfig::default()
        };
        let l = &config.ledger;
        ingest_value(
            Stage::Catch,
            json!({
                "species": "Sardina pilchardus",
                "fishery_registry": "DGRM Portugal",
                "import_docs_hash": dual_hash(b"docs"),
                "fishery_cert_type": "FriendOfSea",
                "fishery_cert_hash": dual_hash(b"fos"),
                "batch_id": "BN-0042",
            }),
            l,
        )
        .unwrap();
        ingest_value(
            Stage::Processing,
            json!({
                "facility_id": "FAC-PT-1", "facility_name": "Peniche Oils",
                "gmp_cert_type": "NSF", "gmp_cert_id": "NSF-9", "gmp_cert_hash": dual_hash(b"gmp"),
                "batch_id": "BN-0042", "extraction_method": "SupercriticalCO2",
                "extraction_temp_c": 40.0, "yield_input_kg": 1000.0, "yield_output_kg": yield_output_kg,
            }),
            l,
        )
        .unwrap();
        ingest_value(
            Stage::Testing,
            json!({
                "lab_name": "SGS Porto", "lab_cert_type": "ISO17025", "lab_cert_id": "L-1",
                "lab_cert_hash": dual_hash(b"lab"), "batch_id": "BN-0042",
                "mercury_ppm": 0.01, "pcbs_ppm": 0.01, "dioxins_pg_per_g": 0.2,
                "epa_mg": 360.0, "dha_mg": 240.0, "label_claim_mg": 600.0,
                "peroxide_meq_per_kg": 1.5, "anisidine": 6.0,
            }),
            l,
        )
        .unwrap();
        ingest_value(
            Stage::Encapsulation,
            json!({
                "facility_id": "ENC-1", "facility_name": "Softgel Lisboa",
                "facility_cert_type": "NSF", "facility_cert_id": "NSF-E-2",
                "facility_cert_hash": dual_hash(b"enc"), "lot_number": LOT,
                "fill_date": "2025-03-01T08:00:00Z", "batch_id": "BN-0042",
                "capsule_count": 6000, "mg_per_capsule": 1200.0,
            }),
            l,
        )
        .unwrap();
        ingest_value(
            Stage::Distribution,
            json!({
                "distributor_id": "D-1", "distributor_name": "Iberia Health",
                "warehouse_id": "WH-1", "warehouse_location": "Madrid",
                "lot_number": LOT, "cold_chain_temps": [4.0, 5.0, 6.0],
                "cold_chain_duration_days": 9,
            }),
            l,
        )
        .unwrap();
        config
    }

    fn args(lot: &str) -> LotArgs {
        LotArgs {
            lot_number: lot.into(),
        }
    }

    #[test]
    fn verify_valid_lot() {
        let dir = tempfile::tempdir().unwrap();
        let config = seeded(&dir, 150.0);
        let mut out = Vec::new();
        assert_eq!(run_verify(&args(LOT), &config, &mut out).unwrap(), EXIT_OK);
        let v: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(v["chain_valid"], true);
        assert_eq!(v["chain_length"], 5);
        assert_eq!(v["anomalies"], json!([]));
    }

    #[test]
    fn verify_reports_anomalies_on_valid_chain() {
        let dir = tempfile::tempdir().unwrap();
        let config = seeded(&dir, 220.0);
        let mut out = Vec::new();
        run_verify(&args(LOT), &config, &mut out).unwrap();
        let v: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(v["anomalies"][0]["anomaly_type"], "YIELD_HIGH");
    }

    #[test]
    fn verify_unknown_lot_exits_2() {
        let dir = tempfile::tempdir().unwrap();
        let config = seeded(&dir, 150.0);
        let mut out = Vec::new();
        assert_eq!(
            run_verify(&args("LOT-NONE"), &config, &mut out).unwrap(),
            EXIT_CHAIN_INVALID
        );
    }

    #[test]
    fn summary_and_qr() {
        let dir = tempfile::tempdir().unwrap();
        let config = seeded(&dir, 150.0);

        let mut out = Vec::new();
        run_summary(&args(LOT), &config, &mut out).unwrap();
        let v: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(v["species"], "European Sardine");
        assert_eq!(v["fishery_cert"], "FriendOfSea");

        let mut out = Vec::new();
        run_qr(&args(LOT), &config, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
        let v: Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(
            v["verification_url"],
            format!("https://verify.fishoilproof.io/{LOT}")
        );
    }

    #[test]
    fn fraud_on_unknown_lot_is_structural_stop() {
        let dir = tempfile::tempdir().unwrap();
        let config = seeded(&dir, 150.0);
        let mut out = Vec::new();
        let err = run_fraud(&args("LOT-NONE"), &config, &mut out).unwrap_err();
        assert!(err.to_string().starts_with("STRUCTURAL"));
    }
}
