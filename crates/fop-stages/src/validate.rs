//! Checks shared by several stages.

use fop_core::{is_dual_hash_shaped, StopRule};

/// Reject NaN and infinities. They have no JSON form and would be written
/// to the ledger as `null`.
pub(crate) fn require_finite(field: &str, value: f64) -> Result<(), StopRule> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(StopRule::invalid_input(format!("{field} must be a finite number, got {value}")))
    }
}

/// `what` is the certificate label used in the message, e.g. `"GMP"`.
pub(crate) fn require_dual_hash(what: &str, hash: &str) -> Result<(), StopRule> {
    if is_dual_hash_shaped(hash) {
        Ok(())
    } else {
        Err(StopRule::invalid_input(format!(
            "{what} cert hash must be dual-hash format (SHA256:BLAKE3)"
        )))
    }
}

/// Log a stop rule on its way out of a stage entry point.
pub(crate) fn log_stop(stage: &str, stop: StopRule) -> StopRule {
    tracing::warn!(stage, kind = %stop.kind, message = %stop.message, "stop rule");
    stop
}

/// Round half away from zero to `places` decimal places.
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
