//! Shared fixtures: a complete five-stage chain in a throwaway ledger.

#![allow(dead_code)]

use fop_core::{dual_hash, FopError, LedgerConfig};
use fop_ledger::Receipt;
use fop_stages::{
    create_catch_receipt, create_distribution_receipt, create_encapsulation_receipt,
    create_processing_receipt, create_testing_receipt, CatchInput, DistributionInput,
    EncapsulationInput, ProcessingInput, TestingInput,
};

pub const LOT: &str = "LOT-2025-0131-01";
pub const BATCH: &str = "BP-2025-0131";

pub struct Chain {
    pub dir: tempfile::TempDir,
    pub config: LedgerConfig,
    pub catch: Receipt,
    pub processing: Receipt,
    /// Hash of the testing receipt, which may have been emitted before a stop.
    pub testing_hash: String,
    pub encapsulation: Receipt,
    pub distribution: Receipt,
}

pub struct Params {
    pub yield_output_kg: f64,
    pub mercury_ppm: f64,
    pub epa_mg: f64,
    pub cold_chain_temps: Vec<f64>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            yield_output_kg: 150.0,
            mercury_ppm: 0.02,
            epa_mg: 400.0,
            cold_chain_temps: vec![3.5, 4.0, 4.2, 3.9, 4.1],
        }
    }
}

pub fn config(dir: &tempfile::TempDir) -> LedgerConfig {
    LedgerConfig::new(dir.path().join("receipts.jsonl"), "nordic-omega")
}

pub fn catch_input() -> CatchInput {
    CatchInput {
        species: "Engraulis ringens".into(),
        fishery_registry: "PRODUCE Peru".into(),
        import_docs_hash: dual_hash(b"bill of lading 2025-0131"),
        fishery_cert_type: "MSC".into(),
        fishery_cert_id: Some("MSC-F-31337".into()),
        fishery_cert_hash: Some(dual_hash(b"msc certificate")),
        batch_id: Some(BATCH.into()),
    }
}

pub fn processing_input(previous_hash: &str, yield_output_kg: f64) -> ProcessingInput {
    ProcessingInput {
        facility_id: "FAC-PE-007".into(),
        facility_name: "Callao Refining".into(),
        gmp_cert_type: "USP".into(),
        gmp_cert_id: "USP-GMP-2231".into(),
        gmp_cert_hash: dual_hash(b"usp gmp"),
        batch_id: BATCH.into(),
        extraction_method: "MolecularDistillation".into(),
        extraction_temp_c: 190.0,
        yield_input_kg: 1000.0,
        yield_output_kg,
        previous_hash: previous_hash.into(),
    }
}

pub fn testing_input(previous_hash: &str, mercury_ppm: f64, epa_mg: f64) -> TestingInput {
    TestingInput {
        lab_name: "Eurofins".into(),
        lab_cert_type: "ISO17025".into(),
        lab_cert_id: "ISO-17025-4410".into(),
        lab_cert_hash: dual_hash(b"lab accreditation"),
        batch_id: BATCH.into(),
        mercury_ppm,
        pcbs_ppm: 0.02,
        dioxins_pg_per_g: 0.4,
        epa_mg,
        dha_mg: 200.0,
        label_claim_mg: 600.0,
        peroxide_meq_per_kg: 2.0,
        anisidine: 7.0,
        previous_hash: previous_hash.into(),
    }
}

/// Receipts persisted before a regulatory stop still count as emitted.
pub fn emitted_hash(result: Result<Receipt, FopError>) -> String {
    match result {
        Ok(r) => r.payload_hash,
        Err(e) => e
            .as_stop()
            .and_then(|s| s.evidence_hash.clone())
            .unwrap_or_else(|| panic!("stage failed: {e}")),
    }
}

pub fn encapsulation_input(lot: &str, previous_hash: &str) -> EncapsulationInput {
    EncapsulationInput {
        facility_id: "ENC-NO-2".into(),
        facility_name: "Bergen Softgel".into(),
        facility_cert_type: "NSF".into(),
        facility_cert_id: "NSF-ENC-118".into(),
        facility_cert_hash: dual_hash(b"nsf facility"),
        lot_number: lot.into(),
        fill_date: "2025-01-31T09:30:00Z".into(),
        batch_id: BATCH.into(),
        capsule_count: 24000,
        mg_per_capsule: 1000.0,
        previous_hash: previous_hash.into(),
    }
}

pub fn distribution_input(lot: &str, previous_hash: &str, temps: Vec<f64>) -> DistributionInput {
    DistributionInput {
        distributor_id: "DIST-EU-9".into(),
        distributor_name: "NordPharma Logistics".into(),
        warehouse_id: "WH-OSL-1".into(),
        warehouse_location: "Oslo, NO".into(),
        lot_number: lot.into(),
        previous_hash: previous_hash.into(),
        cold_chain_temps: Some(temps),
        cold_chain_duration_days: 21,
        cold_chain_temp_log_hash: Some(dual_hash(b"logger export")),
    }
}

pub fn build_chain(p: Params) -> Chain {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir);

    let catch = create_catch_receipt(&catch_input(), &config).unwrap();
    let processing = create_processing_receipt(
        &processing_input(&catch.payload_hash, p.yield_output_kg),
        &config,
    )
    .unwrap();
    let testing_hash = emitted_hash(create_testing_receipt(
        &testing_input(&processing.payload_hash, p.mercury_ppm, p.epa_mg),
        &config,
    ));
    let encapsulation =
        create_encapsulation_receipt(&encapsulation_input(LOT, &testing_hash), &config).unwrap();
    let distribution = create_distribution_receipt(
        &distribution_input(LOT, &encapsulation.payload_hash, p.cold_chain_temps),
        &config,
    )
    .unwrap();

    Chain {
        dir,
        config,
        catch,
        processing,
        testing_hash,
        encapsulation,
        distribution,
    }
}
