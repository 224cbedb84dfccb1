//! Stage 1: catch. Proves origin and sustainability.

use fop_core::{BatchId, FopError, LedgerConfig, StopRule};
use fop_ledger::{emit, CatchPayload, FisheryCertType, Receipt};
use serde::Deserialize;

use crate::validate::log_stop;

/// Species approved for fish oil: `(scientific name, common name)`.
pub const APPROVED_SPECIES: &[(&str, &str)] = &[
    ("Engraulis ringens", "Peruvian Anchoveta"),
    ("Sardina pilchardus", "European Sardine"),
    ("Brevoortia tyrannus", "Atlantic Menhaden"),
    ("Brevoortia patronus", "Gulf Menhaden"),
    ("Clupea harengus", "Atlantic Herring"),
    ("Scomber scombrus", "Atlantic Mackerel"),
    ("Mallotus villosus", "Capelin"),
    ("Salmo salar", "Atlantic Salmon"),
    ("Oncorhynchus mykiss", "Rainbow Trout"),
    ("Gadus morhua", "Atlantic Cod"),
    ("Pollachius virens", "Pollock"),
    ("Thunnus albacares", "Yellowfin Tuna"),
    ("Katsuwonus pelamis", "Skipjack Tuna"),
    ("Sprattus sprattus", "European Sprat"),
    ("Micromesistius poutassou", "Blue Whiting"),
];

/// Common name of an approved species, `None` if not on the list.
pub fn species_common_name(species: &str) -> Option<&'static str> {
    APPROVED_SPECIES
        .iter()
        .find(|(scientific, _)| *scientific == species)
        .map(|(_, common)| *common)
}

/// Raw catch data.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatchInput {
    /// Scientific name.
    pub species: String,
    /// Registry the fishery is listed in, e.g. `PRODUCE Peru`.
    pub fishery_registry: String,
    pub import_docs_hash: String,
    #[serde(default = "uncertified")]
    pub fishery_cert_type: String,
    #[serde(default)]
    pub fishery_cert_id: Option<String>,
    #[serde(default)]
    pub fishery_cert_hash: Option<String>,
    #[serde(default)]
    pub batch_id: Option<String>,
}

fn uncertified() -> String {
    FisheryCertType::Uncertified.as_str().to_string()
}

/// Validate catch data into a payload.
pub fn validate_catch(input: &CatchInput) -> Result<CatchPayload, StopRule> {
    let species_common = species_common_name(&input.species).ok_or_else(|| {
        StopRule::invalid_input(format!(
            "Species not FDA-approved for fish oil: {}",
            input.species
        ))
    })?;

    let cert_type = FisheryCertType::from_wire(&input.fishery_cert_type).ok_or_else(|| {
        StopRule::invalid_input(format!(
            "Invalid fishery cert type: {}",
            input.fishery_cert_type
        ))
    })?;

    let has_hash = input.fishery_cert_hash.as_deref().is_some_and(|h| !h.is_empty());
    if cert_type != FisheryCertType::Uncertified && !has_hash {
        return Err(StopRule::invalid_input(format!(
            "Fishery cert type {cert_type} claimed but no cert hash provided"
        )));
    }

    Ok(CatchPayload {
        species: input.species.clone(),
        species_common: species_common.to_string(),
        fishery_approved: true,
        fishery_registry: input.fishery_registry.clone(),
        import_docs_hash: input.import_docs_hash.clone(),
        fishery_cert_type: cert_type,
        fishery_cert_id: input.fishery_cert_id.clone(),
        fishery_cert_hash: input.fishery_cert_hash.clone(),
        batch_id: input.batch_id.clone().map(BatchId),
    })
}

/// Validate and emit a catch receipt.
pub fn create_catch_receipt(input: &CatchInput, config: &LedgerConfig) -> Result<Receipt, FopError> {
    let payload = validate_catch(input).map_err(|stop| log_stop("catch", stop))?;
    emit(payload, config)
}
