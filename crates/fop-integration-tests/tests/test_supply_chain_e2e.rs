//! # Supply Chain End to End
//!
//! Five stages emitted through the validators, then verified, summarized,
//! and run through the fraud detectors.

mod common;

use common::{build_chain, Params, BATCH, LOT};
use fop_audit::{
    chain_summary, qr_payload, run_fraud_checks_for_lot, verify_lot, ChainSummary,
    FULL_CHAIN_LENGTH,
};
use fop_core::StopKind;
use fop_ledger::{
    AnomalyType, Ledger, Payload, ReceiptFilter, ReceiptKind, Severity, YieldStatus,
};
use fop_stages::create_testing_receipt;
use serde_json::{json, Value};

#[test]
fn full_chain_verifies() {
    let chain = build_chain(Params::default());
    let report = verify_lot(LOT, &Ledger::new(&chain.config.ledger_path)).unwrap();

    assert!(report.chain_valid, "errors: {:?}", report.errors);
    assert!(report.errors.is_empty());
    assert_eq!(report.chain_length, FULL_CHAIN_LENGTH);
    assert_eq!(
        report.receipt(ReceiptKind::Catch).unwrap().payload_hash,
        chain.catch.payload_hash
    );
    assert_eq!(
        report.receipt(ReceiptKind::Distribution).unwrap().payload_hash,
        chain.distribution.payload_hash
    );

    let v = serde_json::to_value(&report).unwrap();
    let keys: Vec<&String> = v["receipts"].as_object().unwrap().keys().collect();
    assert_eq!(
        keys,
        ["distribution", "encapsulation", "testing", "processing", "catch"]
    );
}

#[test]
fn clean_chain_has_no_anomalies() {
    let chain = build_chain(Params::default());
    let anomalies = run_fraud_checks_for_lot(LOT, &chain.config).unwrap();
    assert!(anomalies.is_empty());
}

#[test]
fn summary_and_qr_for_verified_lot() {
    let chain = build_chain(Params::default());
    let report = verify_lot(LOT, &Ledger::new(&chain.config.ledger_path)).unwrap();
    let summary = chain_summary(&report);

    let ChainSummary::Verified(s) = &summary else {
        panic!("expected verified summary");
    };
    assert_eq!(s.species, "Peruvian Anchoveta");
    assert_eq!(s.fishery_cert, "MSC");
    assert!(s.fishery_certified);
    assert_eq!(s.potency_verified, "600mg EPA+DHA (label: 600mg)");
    assert_eq!(s.totox, 11.0);
    assert_eq!(s.yield_status, "NORMAL");
    assert!(s.cold_chain_verified);

    let qr = qr_payload(&summary, "https://verify.example.org/").unwrap();
    assert!(!qr.contains('\n'));
    let v: Value = serde_json::from_str(&qr).unwrap();
    assert_eq!(v["lot"], LOT);
    assert_eq!(v["verification_url"], format!("https://verify.example.org/{LOT}"));
    assert_eq!(v.as_object().unwrap().len(), 11);
}

#[test]
fn high_yield_is_flagged_as_dilution() {
    let chain = build_chain(Params {
        yield_output_kg: 220.0,
        ..Params::default()
    });
    let Payload::Processing(p) = &chain.processing.payload else {
        panic!("expected processing payload");
    };
    assert_eq!(p.yield_ratio, 0.22);
    assert_eq!(p.yield_status, YieldStatus::HighDilutionFlag);

    let anomalies = run_fraud_checks_for_lot(LOT, &chain.config).unwrap();
    assert_eq!(anomalies.len(), 1);
    let Payload::Anomaly(a) = &anomalies[0].payload else {
        panic!("expected anomaly payload");
    };
    assert_eq!(a.anomaly_type, AnomalyType::YieldHigh);
    assert_eq!(a.severity, Severity::Flag);
    assert_eq!(a.source_receipt_hash, chain.processing.payload_hash);
    assert_eq!(anomalies[0].tenant_id, chain.processing.tenant_id);

    let stored = Ledger::new(&chain.config.ledger_path)
        .query(&ReceiptFilter {
            receipt_type: Some(ReceiptKind::Anomaly),
            ..ReceiptFilter::default()
        })
        .unwrap();
    assert_eq!(stored, anomalies);
}

#[test]
fn cold_chain_excursion_is_flagged() {
    let chain = build_chain(Params {
        cold_chain_temps: vec![2.1, 2.3, 12.0, 2.2, 2.1],
        ..Params::default()
    });
    let Payload::Distribution(d) = &chain.distribution.payload else {
        panic!("expected distribution payload");
    };
    let cc = &d.cold_chain;
    assert!(cc.enabled);
    assert_eq!(cc.max_temp_c, Some(12.0));
    assert_eq!(cc.min_temp_c, Some(2.1));
    assert_eq!(cc.avg_temp_c, Some(4.14));
    assert_eq!(cc.deviations_count, 1);
    assert!(!cc.cold_chain_pass);

    let anomalies = run_fraud_checks_for_lot(LOT, &chain.config).unwrap();
    assert_eq!(anomalies.len(), 1);
    let Payload::Anomaly(a) = &anomalies[0].payload else {
        panic!("expected anomaly payload");
    };
    assert_eq!(a.anomaly_type, AnomalyType::ColdChainDegradation);
    assert_eq!(a.severity, Severity::Flag);
    assert_eq!(a.details["max_temp_c"], json!(12.0));
}

#[test]
fn mercury_breach_persists_receipt_then_stops() {
    let chain = build_chain(Params::default());
    let dir = tempfile::tempdir().unwrap();
    let config = common::config(&dir);

    let err = create_testing_receipt(
        &common::testing_input(&chain.processing.payload_hash, 0.15, 400.0),
        &config,
    )
    .unwrap_err();
    let stop = err.as_stop().unwrap();
    assert_eq!(stop.kind, StopKind::RegulatoryBreach);
    assert_eq!(stop.message, "CONTAMINANT_EXCEED: mercury=0.15ppm (limit 0.1)");

    let stored = Ledger::new(&config.ledger_path).load().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stop.evidence_hash.as_deref(), Some(stored[0].payload_hash.as_str()));
    let Payload::Testing(t) = &stored[0].payload else {
        panic!("expected testing payload");
    };
    assert!(!t.contaminants.mercury_pass);
    assert!(!t.overall_pass);
}

#[test]
fn contaminated_lot_still_chains_and_is_rejected_by_fraud_checks() {
    let chain = build_chain(Params {
        mercury_ppm: 0.15,
        ..Params::default()
    });
    let report = verify_lot(LOT, &Ledger::new(&chain.config.ledger_path)).unwrap();
    assert!(report.chain_valid);

    let ChainSummary::Verified(s) = chain_summary(&report) else {
        panic!("expected verified summary");
    };
    assert!(!s.contaminants_pass);

    let anomalies = run_fraud_checks_for_lot(LOT, &chain.config).unwrap();
    let Payload::Anomaly(a) = &anomalies[0].payload else {
        panic!("expected anomaly payload");
    };
    assert_eq!(a.anomaly_type, AnomalyType::ContaminantExceed);
    assert_eq!(a.severity, Severity::Reject);
    assert_eq!(a.source_receipt_hash, chain.testing_hash);
}

#[test]
fn low_potency_is_label_fraud() {
    let chain = build_chain(Params {
        epa_mg: 340.0,
        ..Params::default()
    });
    let anomalies = run_fraud_checks_for_lot(LOT, &chain.config).unwrap();
    let Payload::Anomaly(a) = &anomalies[0].payload else {
        panic!("expected anomaly payload");
    };
    assert_eq!(a.anomaly_type, AnomalyType::LabelFraud);
    assert_eq!(a.severity, Severity::Flag);
    assert_eq!(a.details["actual_mg"], json!(540.0));
}

#[test]
fn query_filters_by_batch_and_lot() {
    let chain = build_chain(Params::default());
    let ledger = Ledger::new(&chain.config.ledger_path);

    let by_batch = ledger
        .query(&ReceiptFilter {
            batch_id: Some(BATCH.into()),
            ..ReceiptFilter::default()
        })
        .unwrap();
    let kinds: Vec<ReceiptKind> = by_batch.iter().map(|r| r.kind()).collect();
    assert_eq!(
        kinds,
        [
            ReceiptKind::Catch,
            ReceiptKind::Processing,
            ReceiptKind::Testing,
            ReceiptKind::Encapsulation
        ]
    );

    let by_lot = ledger
        .query(&ReceiptFilter {
            lot_number: Some(LOT.into()),
            ..ReceiptFilter::default()
        })
        .unwrap();
    assert_eq!(by_lot.len(), 2);
}
