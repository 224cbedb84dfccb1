//! Stage 2: processing. Proves GMP compliance and reconciles yield.
//!
//! Fish oil extraction returns roughly 12-18% of input mass. A ratio above
//! the band means more oil left the facility than the fish could have
//! produced, which is the signature of dilution with cheaper oils.

use fop_core::{BatchId, FopError, LedgerConfig, StopRule};
use fop_ledger::{
    emit, ExtractionMethod, GmpCertType, Ledger, ProcessingPayload, Receipt, ReceiptKind,
    YieldStatus,
};
use serde::Deserialize;

use crate::constants::{YIELD_MAX, YIELD_MIN};
use crate::validate::{log_stop, require_dual_hash, require_finite, round_to};

/// Raw processing data.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProcessingInput {
    pub facility_id: String,
    pub facility_name: String,
    pub gmp_cert_type: String,
    pub gmp_cert_id: String,
    pub gmp_cert_hash: String,
    pub batch_id: String,
    pub extraction_method: String,
    pub extraction_temp_c: f64,
    pub yield_input_kg: f64,
    pub yield_output_kg: f64,
    /// `payload_hash` of the catch receipt.
    pub previous_hash: String,
}

/// Compute `output / input` and classify it against the expected band.
///
/// # Errors
///
/// `INVALID_INPUT` if either mass is not strictly positive.
pub fn classify_yield(input_kg: f64, output_kg: f64) -> Result<(f64, YieldStatus), StopRule> {
    // NaN fails both comparisons, so test for positivity rather than <= 0.
    if !(input_kg > 0.0 && output_kg > 0.0) {
        return Err(StopRule::invalid_input(format!(
            "Invalid yield values: input={input_kg:?}, output={output_kg:?}"
        )));
    }
    let ratio = output_kg / input_kg;
    let status = if ratio < YIELD_MIN {
        YieldStatus::Low
    } else if ratio > YIELD_MAX {
        YieldStatus::HighDilutionFlag
    } else {
        YieldStatus::Normal
    };
    Ok((ratio, status))
}

/// Validate processing data into a payload.
pub fn validate_processing(input: &ProcessingInput) -> Result<ProcessingPayload, StopRule> {
    let gmp_cert_type = GmpCertType::from_wire(&input.gmp_cert_type).ok_or_else(|| {
        StopRule::invalid_input(format!("Invalid GMP cert type: {}", input.gmp_cert_type))
    })?;
    let extraction_method = ExtractionMethod::from_wire(&input.extraction_method).ok_or_else(|| {
        StopRule::invalid_input(format!(
            "Invalid extraction method: {}",
            input.extraction_method
        ))
    })?;
    require_dual_hash("GMP", &input.gmp_cert_hash)?;
    require_finite("extraction_temp_c", input.extraction_temp_c)?;
    require_finite("yield_input_kg", input.yield_input_kg)?;
    require_finite("yield_output_kg", input.yield_output_kg)?;

    let (ratio, yield_status) = classify_yield(input.yield_input_kg, input.yield_output_kg)?;

    Ok(ProcessingPayload {
        facility_id: input.facility_id.clone(),
        facility_name: input.facility_name.clone(),
        gmp_cert_type,
        gmp_cert_id: input.gmp_cert_id.clone(),
        gmp_cert_hash: input.gmp_cert_hash.clone(),
        batch_id: BatchId(input.batch_id.clone()),
        extraction_method,
        extraction_temp_c: input.extraction_temp_c,
        yield_input_kg: input.yield_input_kg,
        yield_output_kg: input.yield_output_kg,
        yield_ratio: round_to(ratio, 4),
        yield_expected_min: YIELD_MIN,
        yield_expected_max: YIELD_MAX,
        yield_status,
        previous_hash: input.previous_hash.clone(),
    })
}

/// Validate and emit a processing receipt.
pub fn create_processing_receipt(
    input: &ProcessingInput,
    config: &LedgerConfig,
) -> Result<Receipt, FopError> {
    let payload = validate_processing(input).map_err(|stop| log_stop("processing", stop))?;
    if payload.yield_status != YieldStatus::Normal {
        tracing::info!(
            batch_id = %payload.batch_id,
            yield_ratio = payload.yield_ratio,
            status = %payload.yield_status,
            "yield outside expected band"
        );
    }
    emit(payload, config)
}

/// The catch receipt landed under `batch_id`.
pub fn link_to_catch(batch_id: &str, ledger: &Ledger) -> Result<Option<Receipt>, FopError> {
    ledger.find(ReceiptKind::Catch, "batch_id", batch_id)
}
