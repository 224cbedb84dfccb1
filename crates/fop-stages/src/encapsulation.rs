//! Stage 4: encapsulation. Proves GMP bottling and assigns the consumer lot.
//!
//! The lot number printed on the bottle is the key the whole chain is
//! verified under, so it must be unique across every encapsulation receipt
//! in the ledger.

use chrono::{Datelike, NaiveDate, Utc};
use fop_core::{BatchId, FopError, LedgerConfig, LotNumber, StopRule, Timestamp};
use fop_ledger::{
    emit, EncapsulationPayload, FacilityCertType, Ledger, Payload, Receipt, ReceiptKind,
};
use serde::Deserialize;

use crate::validate::{log_stop, require_dual_hash, require_finite};

/// Raw bottling data.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EncapsulationInput {
    pub facility_id: String,
    pub facility_name: String,
    pub facility_cert_type: String,
    pub facility_cert_id: String,
    pub facility_cert_hash: String,
    pub lot_number: String,
    /// ISO 8601 date or date-time.
    pub fill_date: String,
    pub batch_id: String,
    pub capsule_count: u64,
    pub mg_per_capsule: f64,
    /// `payload_hash` of the testing receipt.
    pub previous_hash: String,
}

/// `LOT-YYYY-MMDD-XX`, where `XX` is the last two characters of the batch
/// id upper-cased, or literally `XX` for a shorter batch id.
pub fn generate_lot_number(batch_id: &str, date: NaiveDate) -> LotNumber {
    let chars: Vec<char> = batch_id.chars().collect();
    let suffix = if chars.len() >= 2 {
        chars[chars.len() - 2..].iter().collect::<String>().to_uppercase()
    } else {
        "XX".to_string()
    };
    LotNumber(format!(
        "LOT-{}-{:02}{:02}-{suffix}",
        date.year(),
        date.month(),
        date.day()
    ))
}

/// [`generate_lot_number`] for today's UTC date.
pub fn generate_lot_number_today(batch_id: &str) -> LotNumber {
    generate_lot_number(batch_id, Utc::now().date_naive())
}

/// Validate bottling data against the receipts already in the ledger.
pub fn validate_encapsulation(
    input: &EncapsulationInput,
    existing: &[Receipt],
) -> Result<EncapsulationPayload, StopRule> {
    let facility_cert_type = FacilityCertType::from_wire(&input.facility_cert_type).ok_or_else(|| {
        StopRule::invalid_input(format!(
            "Invalid facility cert type: {}",
            input.facility_cert_type
        ))
    })?;
    require_dual_hash("Facility", &input.facility_cert_hash)?;

    let taken = existing.iter().any(|r| {
        matches!(&r.payload, Payload::Encapsulation(p) if p.lot_number.as_str() == input.lot_number)
    });
    if taken {
        return Err(StopRule::duplicate(format!(
            "Lot number already exists: {}",
            input.lot_number
        )));
    }

    Timestamp::parse_calendar(&input.fill_date)?;
    require_finite("mg_per_capsule", input.mg_per_capsule)?;

    Ok(EncapsulationPayload {
        facility_id: input.facility_id.clone(),
        facility_name: input.facility_name.clone(),
        facility_cert_type,
        facility_cert_id: input.facility_cert_id.clone(),
        facility_cert_hash: input.facility_cert_hash.clone(),
        lot_number: LotNumber(input.lot_number.clone()),
        fill_date: input.fill_date.clone(),
        batch_id: BatchId(input.batch_id.clone()),
        capsule_count: input.capsule_count,
        mg_per_capsule: input.mg_per_capsule,
        previous_hash: input.previous_hash.clone(),
    })
}

/// Validate against the configured ledger and emit an encapsulation receipt.
pub fn create_encapsulation_receipt(
    input: &EncapsulationInput,
    config: &LedgerConfig,
) -> Result<Receipt, FopError> {
    let existing = Ledger::new(&config.ledger_path).load()?;
    let payload =
        validate_encapsulation(input, &existing).map_err(|stop| log_stop("encapsulation", stop))?;
    emit(payload, config)
}

/// The testing receipt for `batch_id`.
pub fn link_to_testing(batch_id: &str, ledger: &Ledger) -> Result<Option<Receipt>, FopError> {
    ledger.find(ReceiptKind::Testing, "batch_id", batch_id)
}
