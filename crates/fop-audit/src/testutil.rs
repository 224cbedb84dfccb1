//! Builds a five-stage chain in a throwaway ledger.

use fop_core::{dual_hash, FopError, LedgerConfig};
use fop_ledger::Receipt;
use fop_stages::{
    create_catch_receipt, create_distribution_receipt, create_encapsulation_receipt,
    create_processing_receipt, create_testing_receipt, CatchInput, DistributionInput,
    EncapsulationInput, ProcessingInput, TestingInput,
};

pub(crate) const LOT: &str = "LOT-2025-0214-31";

#[derive(Debug, Default)]
pub(crate) struct ChainOverrides {
    pub yield_output_kg: Option<f64>,
    pub epa_mg: Option<f64>,
    pub mercury_ppm: Option<f64>,
    pub cold_chain_temps: Option<Vec<f64>>,
    pub testing_previous_hash: Option<String>,
    pub testing_links_to_catch: bool,
}

/// Receipts persisted before a regulatory stop still count as emitted.
fn emitted_hash(result: Result<Receipt, FopError>) -> String {
    match result {
        Ok(r) => r.payload_hash,
        Err(e) => e
            .as_stop()
            .and_then(|s| s.evidence_hash.clone())
            .unwrap_or_else(|| panic!("stage failed: {e}")),
    }
}

pub(crate) fn build_chain(o: ChainOverrides) -> (tempfile::TempDir, LedgerConfig, String) {
    let dir = tempfile::tempdir().unwrap();
    let config = LedgerConfig::new(dir.path().join("receipts.jsonl"), "acme-omega");

    let catch = create_catch_receipt(
        &CatchInput {
            species: "Engraulis ringens".into(),
            fishery_registry: "PRODUCE Peru".into(),
            import_docs_hash: dual_hash(b"import docs"),
            fishery_cert_type: "MSC".into(),
            fishery_cert_id: Some("MSC-C-55102".into()),
            fishery_cert_hash: Some(dual_hash(b"msc")),
            batch_id: Some("BP-2025-0131".into()),
        },
        &config,
    )
    .unwrap();

    let processing = create_processing_receipt(
        &ProcessingInput {
            facility_id: "FAC-PE-001".into(),
            facility_name: "Pisco Marine Oils".into(),
            gmp_cert_type: "NSF".into(),
            gmp_cert_id: "NSF-GMP-7781".into(),
            gmp_cert_hash: dual_hash(b"gmp"),
            batch_id: "BP-2025-0131".into(),
            extraction_method: "MolecularDistillation".into(),
            extraction_temp_c: 180.0,
            yield_input_kg: 1000.0,
            yield_output_kg: o.yield_output_kg.unwrap_or(150.0),
            previous_hash: catch.payload_hash.clone(),
        },
        &config,
    )
    .unwrap();

    let testing_prev = match (&o.testing_previous_hash, o.testing_links_to_catch) {
        (Some(h), _) => h.clone(),
        (None, true) => catch.payload_hash.clone(),
        (None, false) => processing.payload_hash.clone(),
    };
    let testing = emitted_hash(create_testing_receipt(
        &TestingInput {
            lab_name: "Eurofins Lima".into(),
            lab_cert_type: "ISO17025".into(),
            lab_cert_id: "ISO-17025-PE-221".into(),
            lab_cert_hash: dual_hash(b"lab"),
            batch_id: "BP-2025-0131".into(),
            mercury_ppm: o.mercury_ppm.unwrap_or(0.02),
            pcbs_ppm: 0.01,
            dioxins_pg_per_g: 0.5,
            epa_mg: o.epa_mg.unwrap_or(400.0),
            dha_mg: 200.0,
            label_claim_mg: 600.0,
            peroxide_meq_per_kg: 2.5,
            anisidine: 8.0,
            previous_hash: testing_prev,
        },
        &config,
    ));

    let encapsulation = create_encapsulation_receipt(
        &EncapsulationInput {
            facility_id: "ENC-US-014".into(),
            facility_name: "Pacific Softgel".into(),
            facility_cert_type: "USP".into(),
            facility_cert_id: "USP-GMP-3310".into(),
            facility_cert_hash: dual_hash(b"facility"),
            lot_number: LOT.into(),
            fill_date: "2025-02-14".into(),
            batch_id: "BP-2025-0131".into(),
            capsule_count: 12000,
            mg_per_capsule: 1000.0,
            previous_hash: testing,
        },
        &config,
    )
    .unwrap();

    create_distribution_receipt(
        &DistributionInput {
            distributor_id: "DIST-US-02".into(),
            distributor_name: "Coastal Nutrition Logistics".into(),
            warehouse_id: "WH-OAK-7".into(),
            warehouse_location: "Oakland, CA".into(),
            lot_number: LOT.into(),
            previous_hash: encapsulation.payload_hash,
            cold_chain_temps: Some(o.cold_chain_temps.unwrap_or_else(|| vec![3.8, 4.1, 4.4, 3.9])),
            cold_chain_duration_days: 12,
            cold_chain_temp_log_hash: Some(dual_hash(b"iot")),
        },
        &config,
    )
    .unwrap();

    (dir, config, LOT.to_string())
}
