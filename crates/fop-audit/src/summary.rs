//! # Consumer Summary and QR Payload
//!
//! A verified chain condensed to the points a shopper can check: origin,
//! certification, safety, potency, freshness, yield, and cold chain. The QR
//! payload is a subset of the summary plus a verification link, serialized
//! as compact JSON so it fits in a printed code.

use fop_core::config::verification_url;
use fop_core::{FopError, LotNumber};
use fop_ledger::{Ledger, Payload, ReceiptKind, YieldStatus};
use serde::Serialize;

use crate::chain::{verify_lot, ChainReport};

/// Pass/fail digest of a verified chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifiedSummary {
    pub lot: LotNumber,
    pub valid: bool,
    pub chain_length: usize,
    /// Common name.
    pub species: String,
    pub species_scientific: String,
    pub fishery_certified: bool,
    pub fishery_cert: String,
    pub contaminants_pass: bool,
    /// e.g. `600mg EPA+DHA (label: 600mg)`.
    pub potency_verified: String,
    pub potency_pass: bool,
    pub totox: f64,
    pub oxidation_pass: bool,
    pub yield_status: String,
    pub yield_normal: bool,
    pub cold_chain_verified: bool,
    pub cold_chain_enabled: bool,
}

/// The summary of a chain that did not verify.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedSummary {
    pub lot: LotNumber,
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Summary of one lot, shaped by whether the chain verified.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChainSummary {
    Verified(VerifiedSummary),
    Failed(FailedSummary),
}

impl ChainSummary {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Verified(_))
    }
}

/// Fields encoded into the on-pack QR code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QrPayload {
    pub lot: LotNumber,
    pub chain_length: usize,
    pub species: String,
    pub fishery_certified: bool,
    pub fishery_cert: String,
    pub contaminants_pass: bool,
    pub potency_verified: String,
    pub totox: f64,
    pub cold_chain_verified: bool,
    pub yield_normal: bool,
    pub verification_url: String,
}

/// Condense a chain report. An invalid chain yields only its errors.
pub fn chain_summary(report: &ChainReport) -> ChainSummary {
    if !report.chain_valid {
        return ChainSummary::Failed(FailedSummary {
            lot: report.lot_number.clone(),
            valid: false,
            errors: report.errors.clone(),
        });
    }

    let mut s = VerifiedSummary {
        lot: report.lot_number.clone(),
        valid: true,
        chain_length: report.chain_length,
        species: "Unknown".into(),
        species_scientific: "Unknown".into(),
        fishery_certified: false,
        fishery_cert: "None".into(),
        contaminants_pass: false,
        potency_verified: potency_text(0.0, 0.0),
        potency_pass: false,
        totox: 0.0,
        oxidation_pass: false,
        yield_status: "UNKNOWN".into(),
        yield_normal: false,
        cold_chain_verified: false,
        cold_chain_enabled: false,
    };

    if let Some(Payload::Catch(c)) = report.receipt(ReceiptKind::Catch).map(|r| &r.payload) {
        s.species = c.species_common.clone();
        s.species_scientific = c.species.clone();
        s.fishery_certified = c.fishery_cert_type != fop_ledger::FisheryCertType::Uncertified;
        s.fishery_cert = c.fishery_cert_type.to_string();
    }
    if let Some(Payload::Processing(p)) = report.receipt(ReceiptKind::Processing).map(|r| &r.payload) {
        s.yield_status = p.yield_status.to_string();
        s.yield_normal = p.yield_status == YieldStatus::Normal;
    }
    if let Some(Payload::Testing(t)) = report.receipt(ReceiptKind::Testing).map(|r| &r.payload) {
        s.contaminants_pass = t.contaminants.all_pass;
        s.potency_verified = potency_text(t.potency.total_omega3_mg, t.potency.label_claim_mg);
        s.potency_pass = t.potency.potency_pass;
        s.totox = t.oxidation.totox;
        s.oxidation_pass = t.oxidation.oxidation_pass;
    }
    if let Some(Payload::Distribution(d)) = report.receipt(ReceiptKind::Distribution).map(|r| &r.payload) {
        s.cold_chain_verified = d.cold_chain.cold_chain_pass;
        s.cold_chain_enabled = d.cold_chain.enabled;
    }

    ChainSummary::Verified(s)
}

fn potency_text(total_mg: f64, claim_mg: f64) -> String {
    format!("{total_mg:.0}mg EPA+DHA (label: {claim_mg:.0}mg)")
}

/// Verify `lot` and summarize it.
pub fn summarize_lot(lot: &str, ledger: &Ledger) -> Result<ChainSummary, FopError> {
    Ok(chain_summary(&verify_lot(lot, ledger)?))
}

/// Compact JSON for the QR code. A failed summary is encoded as-is.
pub fn qr_payload(summary: &ChainSummary, base_url: &str) -> Result<String, FopError> {
    let text = match summary {
        ChainSummary::Verified(s) => serde_json::to_string(&QrPayload {
            lot: s.lot.clone(),
            chain_length: s.chain_length,
            species: s.species.clone(),
            fishery_certified: s.fishery_certified,
            fishery_cert: s.fishery_cert.clone(),
            contaminants_pass: s.contaminants_pass,
            potency_verified: s.potency_verified.clone(),
            totox: s.totox,
            cold_chain_verified: s.cold_chain_verified,
            yield_normal: s.yield_normal,
            verification_url: verification_url(base_url, s.lot.as_str()),
        })?,
        ChainSummary::Failed(f) => serde_json::to_string(f)?,
    };
    Ok(text)
}

/// Verify `lot`, summarize it, and encode the QR payload.
pub fn qr_for_lot(lot: &str, ledger: &Ledger, base_url: &str) -> Result<String, FopError> {
    qr_payload(&summarize_lot(lot, ledger)?, base_url)
}
