//! Stage 3: testing. Proves safety, potency, and freshness.
//!
//! Potency and mild oxidation failures are recorded with
//! `overall_pass = false` and do not stop the chain. Contaminant and TOTOX
//! ceiling breaches do: the receipt is appended first, then the stop rule is
//! returned carrying its hash.

use fop_core::{BatchId, FopError, LedgerConfig, StopRule};
use fop_ledger::{
    emit, ContaminantResult, LabCertType, Ledger, OxidationResult, PotencyResult, Receipt,
    ReceiptKind, TestingPayload,
};
use serde::Deserialize;

use crate::constants::{
    ANISIDINE_MAX, DIOXINS_MAX_PG_PER_G, MERCURY_MAX_PPM, PCBS_MAX_PPM, PEROXIDE_MAX_MEQ_PER_KG,
    POTENCY_THRESHOLD, TOTOX_MAX,
};
use crate::validate::{log_stop, require_dual_hash, require_finite, round_to};

/// Raw lab results for one batch.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TestingInput {
    pub lab_name: String,
    pub lab_cert_type: String,
    pub lab_cert_id: String,
    pub lab_cert_hash: String,
    pub batch_id: String,
    pub mercury_ppm: f64,
    pub pcbs_ppm: f64,
    pub dioxins_pg_per_g: f64,
    pub epa_mg: f64,
    pub dha_mg: f64,
    /// Total omega-3 printed on the label.
    pub label_claim_mg: f64,
    pub peroxide_meq_per_kg: f64,
    pub anisidine: f64,
    /// `payload_hash` of the processing receipt.
    pub previous_hash: String,
}

/// Each contaminant against its ceiling. Values at the ceiling pass.
pub fn check_contaminants(mercury_ppm: f64, pcbs_ppm: f64, dioxins_pg_per_g: f64) -> ContaminantResult {
    let mercury_pass = mercury_ppm <= MERCURY_MAX_PPM;
    let pcbs_pass = pcbs_ppm <= PCBS_MAX_PPM;
    let dioxins_pass = dioxins_pg_per_g <= DIOXINS_MAX_PG_PER_G;
    ContaminantResult {
        mercury_ppm,
        mercury_pass,
        pcbs_ppm,
        pcbs_pass,
        dioxins_pg_per_g,
        dioxins_pass,
        all_pass: mercury_pass && pcbs_pass && dioxins_pass,
    }
}

/// EPA + DHA must reach 95% of the label claim.
pub fn check_potency(epa_mg: f64, dha_mg: f64, label_claim_mg: f64) -> PotencyResult {
    let total = epa_mg + dha_mg;
    PotencyResult {
        epa_mg,
        dha_mg,
        total_omega3_mg: total,
        label_claim_mg,
        potency_pass: total >= label_claim_mg * POTENCY_THRESHOLD,
    }
}

/// Peroxide, anisidine and TOTOX each within their ceilings.
///
/// The pass flag uses the exact TOTOX; the stored value is rounded to 2
/// places.
pub fn check_oxidation(peroxide_meq_per_kg: f64, anisidine: f64) -> OxidationResult {
    let totox = 2.0 * peroxide_meq_per_kg + anisidine;
    OxidationResult {
        peroxide_meq_per_kg,
        anisidine,
        totox: round_to(totox, 2),
        oxidation_pass: peroxide_meq_per_kg <= PEROXIDE_MAX_MEQ_PER_KG
            && anisidine <= ANISIDINE_MAX
            && totox <= TOTOX_MAX,
    }
}

/// Validate lab results into a payload. A failing test is still a valid
/// payload; see [`breach_message`] for the ones that stop the chain.
pub fn validate_testing(input: &TestingInput) -> Result<TestingPayload, StopRule> {
    let lab_cert_type = LabCertType::from_wire(&input.lab_cert_type).ok_or_else(|| {
        StopRule::invalid_input(format!("Invalid lab cert type: {}", input.lab_cert_type))
    })?;
    require_dual_hash("Lab", &input.lab_cert_hash)?;
    for (field, value) in [
        ("mercury_ppm", input.mercury_ppm),
        ("pcbs_ppm", input.pcbs_ppm),
        ("dioxins_pg_per_g", input.dioxins_pg_per_g),
        ("epa_mg", input.epa_mg),
        ("dha_mg", input.dha_mg),
        ("label_claim_mg", input.label_claim_mg),
        ("peroxide_meq_per_kg", input.peroxide_meq_per_kg),
        ("anisidine", input.anisidine),
    ] {
        require_finite(field, value)?;
    }

    let contaminants = check_contaminants(input.mercury_ppm, input.pcbs_ppm, input.dioxins_pg_per_g);
    let potency = check_potency(input.epa_mg, input.dha_mg, input.label_claim_mg);
    let oxidation = check_oxidation(input.peroxide_meq_per_kg, input.anisidine);
    let overall_pass = contaminants.all_pass && potency.potency_pass && oxidation.oxidation_pass;

    Ok(TestingPayload {
        lab_name: input.lab_name.clone(),
        lab_cert_type,
        lab_cert_id: input.lab_cert_id.clone(),
        lab_cert_hash: input.lab_cert_hash.clone(),
        batch_id: BatchId(input.batch_id.clone()),
        contaminants,
        potency,
        oxidation,
        overall_pass,
        previous_hash: input.previous_hash.clone(),
    })
}

/// The regulatory breach a payload represents, if any. Contaminants are
/// checked before TOTOX.
pub fn breach_message(payload: &TestingPayload) -> Option<String> {
    let c = &payload.contaminants;
    if !c.all_pass {
        let mut failed = Vec::new();
        if !c.mercury_pass {
            failed.push(format!("mercury={:?}ppm (limit {MERCURY_MAX_PPM:?})", c.mercury_ppm));
        }
        if !c.pcbs_pass {
            failed.push(format!("pcbs={:?}ppm (limit {PCBS_MAX_PPM:?})", c.pcbs_ppm));
        }
        if !c.dioxins_pass {
            failed.push(format!(
                "dioxins={:?}pg/g (limit {DIOXINS_MAX_PG_PER_G:?})",
                c.dioxins_pg_per_g
            ));
        }
        return Some(format!("CONTAMINANT_EXCEED: {}", failed.join(", ")));
    }
    if payload.oxidation.totox > TOTOX_MAX {
        return Some(format!(
            "TOTOX_EXCEED: {:?} > {TOTOX_MAX:?}",
            payload.oxidation.totox
        ));
    }
    None
}

/// Validate and emit a testing receipt.
///
/// # Errors
///
/// A `REGULATORY_BREACH` stop if a contaminant or TOTOX ceiling is
/// exceeded. The receipt is already in the ledger by then and its hash is
/// the stop rule's `evidence_hash`.
pub fn create_testing_receipt(input: &TestingInput, config: &LedgerConfig) -> Result<Receipt, FopError> {
    let payload = validate_testing(input).map_err(|stop| log_stop("testing", stop))?;
    let breach = breach_message(&payload);
    let receipt = emit(payload, config)?;
    match breach {
        Some(message) => {
            let stop = StopRule::regulatory_breach(message, receipt.payload_hash.as_str());
            Err(log_stop("testing", stop).into())
        }
        None => Ok(receipt),
    }
}

/// The processing receipt for `batch_id`.
pub fn link_to_processing(batch_id: &str, ledger: &Ledger) -> Result<Option<Receipt>, FopError> {
    ledger.find(ReceiptKind::Processing, "batch_id", batch_id)
}
