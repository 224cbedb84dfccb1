//! Regulatory limits (FDA / GOED) and process bands.

/// Lower bound of the expected fish-to-oil yield ratio.
pub const YIELD_MIN: f64 = 0.12;
/// Upper bound of the expected fish-to-oil yield ratio.
pub const YIELD_MAX: f64 = 0.18;

/// Mercury ceiling, ppm.
pub const MERCURY_MAX_PPM: f64 = 0.1;
/// PCB ceiling, ppm.
pub const PCBS_MAX_PPM: f64 = 0.09;
/// Dioxin ceiling, pg/g.
pub const DIOXINS_MAX_PG_PER_G: f64 = 3.0;

/// Peroxide value ceiling, meq/kg.
pub const PEROXIDE_MAX_MEQ_PER_KG: f64 = 5.0;
/// p-Anisidine value ceiling.
pub const ANISIDINE_MAX: f64 = 20.0;
/// TOTOX (`2 * peroxide + anisidine`) ceiling.
pub const TOTOX_MAX: f64 = 26.0;

/// Minimum EPA+DHA as a fraction of the label claim.
pub const POTENCY_THRESHOLD: f64 = 0.95;

/// Cold-chain band, degrees C.
pub const COLD_CHAIN_MIN_C: f64 = 2.0;
/// Cold-chain band, degrees C.
pub const COLD_CHAIN_MAX_C: f64 = 8.0;
/// Readings outside the band tolerated before the leg fails.
pub const COLD_CHAIN_MAX_DEVIATIONS: u64 = 3;
