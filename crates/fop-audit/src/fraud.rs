//! # Fraud Detection
//!
//! Stateless checks over single receipts. A finding is sealed as an
//! `anomaly` receipt and appended to the same ledger, under the tenant of
//! the receipt it is about, so detector output is part of the
//! tamper-evident record. Re-running a detector appends a fresh anomaly.
//!
//! | Source       | Condition                         | Finding                            |
//! |--------------|-----------------------------------|------------------------------------|
//! | processing   | yield `HIGH_DILUTION_FLAG`        | `YIELD_HIGH` / FLAG                |
//! | processing   | yield `LOW`                       | `YIELD_LOW` / WARNING              |
//! | testing      | potency below 95% of label        | `LABEL_FRAUD` / FLAG               |
//! | testing      | any contaminant over its ceiling  | `CONTAMINANT_EXCEED` / REJECT      |
//! | distribution | max temperature above 8 °C        | `COLD_CHAIN_DEGRADATION` / FLAG    |
//! | distribution | more than 3 deviations            | `COLD_CHAIN_DEGRADATION` / WARNING |

use fop_core::{FopError, LedgerConfig, StopRule};
use fop_ledger::{
    emit, AnomalyPayload, AnomalyType, Ledger, Payload, Receipt, Severity, YieldStatus,
};
use fop_stages::constants::{COLD_CHAIN_MAX_C, COLD_CHAIN_MAX_DEVIATIONS};
use serde_json::{json, Map, Value};

use crate::chain::verify_lot;

fn details(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn record(
    source: &Receipt,
    anomaly_type: AnomalyType,
    severity: Severity,
    details: Map<String, Value>,
    config: &LedgerConfig,
) -> Result<Receipt, FopError> {
    let payload = AnomalyPayload {
        anomaly_type,
        severity,
        source_receipt_hash: source.payload_hash.clone(),
        details,
    };
    let anomaly = emit(payload, &config.with_tenant(source.tenant_id.clone()))?;
    tracing::info!(
        anomaly_type = %anomaly_type,
        severity = %severity,
        source = %source.kind(),
        "anomaly recorded"
    );
    Ok(anomaly)
}

/// Yield outside the expected band on a processing receipt.
pub fn detect_yield_anomaly(receipt: &Receipt, config: &LedgerConfig) -> Result<Option<Receipt>, FopError> {
    let Payload::Processing(p) = &receipt.payload else {
        return Ok(None);
    };
    let pct = p.yield_ratio * 100.0;
    let finding = match p.yield_status {
        YieldStatus::HighDilutionFlag => Some((
            AnomalyType::YieldHigh,
            Severity::Flag,
            json!({
                "yield_ratio": p.yield_ratio,
                "yield_input_kg": p.yield_input_kg,
                "yield_output_kg": p.yield_output_kg,
                "expected_max": p.yield_expected_max,
                "message": format!(
                    "Yield {pct:.1}% exceeds expected max 18%. Possible dilution with cheaper oils."
                ),
            }),
        )),
        YieldStatus::Low => Some((
            AnomalyType::YieldLow,
            Severity::Warning,
            json!({
                "yield_ratio": p.yield_ratio,
                "yield_input_kg": p.yield_input_kg,
                "yield_output_kg": p.yield_output_kg,
                "expected_min": p.yield_expected_min,
                "message": format!(
                    "Yield {pct:.1}% below expected min 12%. Possible extraction issue."
                ),
            }),
        )),
        YieldStatus::Normal => None,
    };
    finding
        .map(|(kind, severity, d)| record(receipt, kind, severity, details(d), config))
        .transpose()
}

/// Measured omega-3 below 95% of the label claim.
pub fn detect_label_fraud(receipt: &Receipt, config: &LedgerConfig) -> Result<Option<Receipt>, FopError> {
    let Payload::Testing(t) = &receipt.payload else {
        return Ok(None);
    };
    if t.potency.potency_pass {
        return Ok(None);
    }
    let total = t.potency.total_omega3_mg;
    let claim = t.potency.label_claim_mg;
    let pct = if claim > 0.0 { total / claim * 100.0 } else { 0.0 };
    let d = json!({
        "actual_mg": total,
        "label_claim_mg": claim,
        "percentage_of_claim": (pct * 10.0).round() / 10.0,
        "threshold": "95%",
        "message": format!(
            "Actual potency {total:.0}mg is {pct:.1}% of label claim {claim:.0}mg (below 95% threshold)."
        ),
    });
    record(receipt, AnomalyType::LabelFraud, Severity::Flag, details(d), config).map(Some)
}

/// Any contaminant over its ceiling. The product cannot ship.
pub fn detect_contaminant_exceed(
    receipt: &Receipt,
    config: &LedgerConfig,
) -> Result<Option<Receipt>, FopError> {
    let Payload::Testing(t) = &receipt.payload else {
        return Ok(None);
    };
    if t.contaminants.all_pass {
        return Ok(None);
    }
    let failed: Map<String, Value> = t
        .contaminants
        .failures()
        .into_iter()
        .map(|(name, value)| (name.to_string(), json!(value)))
        .collect();
    let d = json!({
        "failed_contaminants": failed,
        "message": "One or more contaminants exceed FDA/GOED limits. Product cannot ship.",
    });
    record(receipt, AnomalyType::ContaminantExceed, Severity::Reject, details(d), config).map(Some)
}

/// Temperature excursion above the band, or too many readings outside it.
/// A distribution without cold-chain tracking is not a finding.
pub fn detect_cold_chain_degradation(
    receipt: &Receipt,
    config: &LedgerConfig,
) -> Result<Option<Receipt>, FopError> {
    let Payload::Distribution(dist) = &receipt.payload else {
        return Ok(None);
    };
    let cc = &dist.cold_chain;
    if !cc.enabled {
        return Ok(None);
    }

    if let Some(max) = cc.max_temp_c.filter(|&m| m > COLD_CHAIN_MAX_C) {
        let d = json!({
            "max_temp_c": max,
            "avg_temp_c": cc.avg_temp_c,
            "deviations_count": cc.deviations_count,
            "threshold_max_c": COLD_CHAIN_MAX_C,
            "message": format!("Max temperature {max:?}°C exceeds 8°C threshold. Oxidation risk."),
        });
        return record(receipt, AnomalyType::ColdChainDegradation, Severity::Flag, details(d), config)
            .map(Some);
    }

    if cc.deviations_count > COLD_CHAIN_MAX_DEVIATIONS {
        let d = json!({
            "max_temp_c": cc.max_temp_c,
            "deviations_count": cc.deviations_count,
            "threshold_deviations": COLD_CHAIN_MAX_DEVIATIONS,
            "message": format!(
                "{} temperature deviations exceed threshold of {COLD_CHAIN_MAX_DEVIATIONS}.",
                cc.deviations_count
            ),
        });
        return record(receipt, AnomalyType::ColdChainDegradation, Severity::Warning, details(d), config)
            .map(Some);
    }

    Ok(None)
}

/// Run every detector over `chain`, dispatching in stage order regardless
/// of input order. Label fraud is checked before contaminants.
pub fn run_all_fraud_checks(chain: &[Receipt], config: &LedgerConfig) -> Result<Vec<Receipt>, FopError> {
    let mut ordered: Vec<&Receipt> = chain.iter().collect();
    ordered.sort_by_key(|r| r.kind().stage_index().unwrap_or(usize::MAX));

    let mut anomalies = Vec::new();
    for receipt in ordered {
        let found = match &receipt.payload {
            Payload::Processing(_) => vec![detect_yield_anomaly(receipt, config)?],
            Payload::Testing(_) => vec![
                detect_label_fraud(receipt, config)?,
                detect_contaminant_exceed(receipt, config)?,
            ],
            Payload::Distribution(_) => vec![detect_cold_chain_degradation(receipt, config)?],
            _ => Vec::new(),
        };
        anomalies.extend(found.into_iter().flatten());
    }
    Ok(anomalies)
}

/// Verify `lot` and run every detector over the receipts the walk reached.
///
/// # Errors
///
/// A `STRUCTURAL` stop if no receipts were found for the lot.
pub fn run_fraud_checks_for_lot(lot: &str, config: &LedgerConfig) -> Result<Vec<Receipt>, FopError> {
    let report = verify_lot(lot, &Ledger::new(&config.ledger_path))?;
    if report.receipts.is_empty() {
        let stop = StopRule::structural(format!("No receipts found for lot {lot}"));
        tracing::warn!(lot, "fraud check on lot without receipts");
        return Err(stop.into());
    }
    let chain: Vec<Receipt> = report.by_kind().into_iter().map(|(_, r)| r.clone()).collect();
    run_all_fraud_checks(&chain, config)
}
