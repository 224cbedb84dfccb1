//! Stage 5: distribution. Proves chain of custody and cold-chain integrity.

use fop_core::{FopError, LedgerConfig, LotNumber, StopRule};
use fop_ledger::{emit, ColdChain, DistributionPayload, Ledger, Receipt, ReceiptKind};
use serde::Deserialize;

use crate::constants::{COLD_CHAIN_MAX_C, COLD_CHAIN_MAX_DEVIATIONS, COLD_CHAIN_MIN_C};
use crate::validate::{log_stop, require_finite, round_to};

/// Raw custody data. Temperature readings are optional; without them the
/// receipt records cold-chain tracking as disabled.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DistributionInput {
    pub distributor_id: String,
    pub distributor_name: String,
    pub warehouse_id: String,
    pub warehouse_location: String,
    pub lot_number: String,
    /// `payload_hash` of the encapsulation receipt.
    pub previous_hash: String,
    #[serde(default)]
    pub cold_chain_temps: Option<Vec<f64>>,
    #[serde(default)]
    pub cold_chain_duration_days: u64,
    #[serde(default)]
    pub cold_chain_temp_log_hash: Option<String>,
}

/// Summarize temperature readings against the 2-8 °C band.
///
/// An empty series yields a disabled block that still records the duration
/// and log hash. Averages and extremes are rounded to 2 places.
pub fn validate_cold_chain(
    temps: &[f64],
    duration_days: u64,
    temp_log_hash: Option<String>,
) -> ColdChain {
    if temps.is_empty() {
        return ColdChain {
            duration_days,
            temp_log_hash,
            ..ColdChain::disabled()
        };
    }

    let avg = temps.iter().sum::<f64>() / temps.len() as f64;
    let min = temps.iter().copied().fold(f64::INFINITY, f64::min);
    let max = temps.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let deviations = temps
        .iter()
        .filter(|&&t| !(COLD_CHAIN_MIN_C..=COLD_CHAIN_MAX_C).contains(&t))
        .count() as u64;

    ColdChain {
        enabled: true,
        avg_temp_c: Some(round_to(avg, 2)),
        min_temp_c: Some(round_to(min, 2)),
        max_temp_c: Some(round_to(max, 2)),
        duration_days,
        deviations_count: deviations,
        temp_log_hash,
        cold_chain_pass: max <= COLD_CHAIN_MAX_C && deviations <= COLD_CHAIN_MAX_DEVIATIONS,
    }
}

/// Validate custody data into a payload. A cold-chain failure is recorded,
/// not stopped; the fraud detector reports it.
pub fn validate_distribution(input: &DistributionInput) -> Result<DistributionPayload, StopRule> {
    let cold_chain = match &input.cold_chain_temps {
        Some(temps) => {
            for &t in temps {
                require_finite("cold_chain_temps", t)?;
            }
            validate_cold_chain(
                temps,
                input.cold_chain_duration_days,
                input.cold_chain_temp_log_hash.clone(),
            )
        }
        None => ColdChain::disabled(),
    };

    Ok(DistributionPayload {
        distributor_id: input.distributor_id.clone(),
        distributor_name: input.distributor_name.clone(),
        warehouse_id: input.warehouse_id.clone(),
        warehouse_location: input.warehouse_location.clone(),
        lot_number: LotNumber(input.lot_number.clone()),
        cold_chain,
        previous_hash: input.previous_hash.clone(),
    })
}

/// Validate and emit a distribution receipt.
pub fn create_distribution_receipt(
    input: &DistributionInput,
    config: &LedgerConfig,
) -> Result<Receipt, FopError> {
    let payload = validate_distribution(input).map_err(|stop| log_stop("distribution", stop))?;
    if payload.cold_chain.enabled && !payload.cold_chain.cold_chain_pass {
        tracing::info!(
            lot_number = %payload.lot_number,
            max_temp_c = ?payload.cold_chain.max_temp_c,
            deviations = payload.cold_chain.deviations_count,
            "cold chain outside band"
        );
    }
    emit(payload, config)
}

/// The encapsulation receipt that assigned `lot_number`.
pub fn link_to_encapsulation(lot_number: &str, ledger: &Ledger) -> Result<Option<Receipt>, FopError> {
    ledger.find(ReceiptKind::Encapsulation, "lot_number", lot_number)
}
