//! # Stage Payloads
//!
//! One struct per receipt type, gathered in the [`Payload`] tagged union.
//! The union serializes with its `receipt_type` tag first, followed by the
//! variant's fields in declaration order. That order is the Merkle leaf
//! order of the envelope, so field declaration order here is part of the
//! on-disk format and must not be rearranged.
//!
//! Closed vocabularies (certification bodies, extraction methods, yield
//! classes, anomaly kinds) are enums whose wire names match the ledger text
//! exactly.

use std::fmt;

use fop_core::{BatchId, LotNumber};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $wire)] $variant),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The ledger spelling of this value.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }

            /// Parse the ledger spelling. Matching is exact and case-sensitive.
            pub fn from_wire(s: &str) -> Option<Self> {
                match s {
                    $($wire => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum! {
    /// The `receipt_type` discriminator.
    pub enum ReceiptKind {
        /// Stage 1: origin and fishery certification.
        Catch => "catch",
        /// Stage 2: extraction and yield reconciliation.
        Processing => "processing",
        /// Stage 3: contaminants, potency, oxidation.
        Testing => "testing",
        /// Stage 4: bottling under a consumer lot number.
        Encapsulation => "encapsulation",
        /// Stage 5: custody and cold chain.
        Distribution => "distribution",
        /// Fraud detector finding.
        Anomaly => "anomaly",
    }
}

impl ReceiptKind {
    /// The five supply-chain stages, catch first.
    pub const STAGES: [ReceiptKind; 5] = [
        ReceiptKind::Catch,
        ReceiptKind::Processing,
        ReceiptKind::Testing,
        ReceiptKind::Encapsulation,
        ReceiptKind::Distribution,
    ];

    /// Position in the supply chain, `None` for anomalies.
    pub fn stage_index(&self) -> Option<usize> {
        Self::STAGES.iter().position(|k| k == self)
    }
}

wire_enum! {
    /// Fishery sustainability certification.
    pub enum FisheryCertType {
        /// Marine Stewardship Council.
        Msc => "MSC",
        /// Friend of the Sea.
        FriendOfSea => "FriendOfSea",
        /// No certification claimed.
        Uncertified => "None",
    }
}

wire_enum! {
    /// GMP certification body for processing and encapsulation facilities.
    pub enum GmpCertType {
        Nsf => "NSF",
        Usp => "USP",
        Other => "Other",
    }
}

/// Encapsulation facilities are certified by the same bodies as processors.
pub type FacilityCertType = GmpCertType;

wire_enum! {
    /// Oil extraction process.
    pub enum ExtractionMethod {
        MolecularDistillation => "MolecularDistillation",
        Winterization => "Winterization",
        SupercriticalCo2 => "SupercriticalCO2",
    }
}

wire_enum! {
    /// Yield ratio classification against the expected band.
    pub enum YieldStatus {
        /// Inside the expected band.
        Normal => "NORMAL",
        /// Below the band.
        Low => "LOW",
        /// Above the band: more oil out than the fish can yield.
        HighDilutionFlag => "HIGH_DILUTION_FLAG",
    }
}

wire_enum! {
    /// Laboratory accreditation.
    pub enum LabCertType {
        Iso17025 => "ISO17025",
        Other => "Other",
    }
}

wire_enum! {
    /// Fraud detector finding kind.
    pub enum AnomalyType {
        YieldHigh => "YIELD_HIGH",
        YieldLow => "YIELD_LOW",
        LabelFraud => "LABEL_FRAUD",
        ContaminantExceed => "CONTAMINANT_EXCEED",
        ColdChainDegradation => "COLD_CHAIN_DEGRADATION",
    }
}

wire_enum! {
    /// How serious a finding is.
    pub enum Severity {
        Warning => "WARNING",
        Flag => "FLAG",
        Reject => "REJECT",
    }
}

/// Stage 1 payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchPayload {
    /// Scientific name, from the approved list.
    pub species: String,
    /// Common name looked up from the approved list.
    pub species_common: String,
    /// Always true on a persisted receipt; validation fails otherwise.
    pub fishery_approved: bool,
    pub fishery_registry: String,
    pub import_docs_hash: String,
    pub fishery_cert_type: FisheryCertType,
    pub fishery_cert_id: Option<String>,
    pub fishery_cert_hash: Option<String>,
    /// Internal batch the catch was landed under, if assigned yet.
    pub batch_id: Option<BatchId>,
}

/// Stage 2 payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingPayload {
    pub facility_id: String,
    pub facility_name: String,
    pub gmp_cert_type: GmpCertType,
    pub gmp_cert_id: String,
    pub gmp_cert_hash: String,
    pub batch_id: BatchId,
    pub extraction_method: ExtractionMethod,
    pub extraction_temp_c: f64,
    pub yield_input_kg: f64,
    pub yield_output_kg: f64,
    /// `output / input`, rounded to 4 places.
    pub yield_ratio: f64,
    pub yield_expected_min: f64,
    pub yield_expected_max: f64,
    pub yield_status: YieldStatus,
    pub previous_hash: String,
}

/// Contaminant measurements and per-limit outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContaminantResult {
    pub mercury_ppm: f64,
    pub mercury_pass: bool,
    pub pcbs_ppm: f64,
    pub pcbs_pass: bool,
    pub dioxins_pg_per_g: f64,
    pub dioxins_pass: bool,
    pub all_pass: bool,
}

impl ContaminantResult {
    /// `(field name, measured value)` for each contaminant over its limit.
    pub fn failures(&self) -> Vec<(&'static str, f64)> {
        let mut out = Vec::new();
        if !self.mercury_pass {
            out.push(("mercury_ppm", self.mercury_ppm));
        }
        if !self.pcbs_pass {
            out.push(("pcbs_ppm", self.pcbs_ppm));
        }
        if !self.dioxins_pass {
            out.push(("dioxins_pg_per_g", self.dioxins_pg_per_g));
        }
        out
    }
}

/// Omega-3 content against the label claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PotencyResult {
    pub epa_mg: f64,
    pub dha_mg: f64,
    pub total_omega3_mg: f64,
    pub label_claim_mg: f64,
    pub potency_pass: bool,
}

/// Oxidation markers. `totox = 2 * peroxide + anisidine`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OxidationResult {
    pub peroxide_meq_per_kg: f64,
    pub anisidine: f64,
    /// Rounded to 2 places.
    pub totox: f64,
    pub oxidation_pass: bool,
}

/// Stage 3 payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestingPayload {
    pub lab_name: String,
    pub lab_cert_type: LabCertType,
    pub lab_cert_id: String,
    pub lab_cert_hash: String,
    pub batch_id: BatchId,
    pub contaminants: ContaminantResult,
    pub potency: PotencyResult,
    pub oxidation: OxidationResult,
    pub overall_pass: bool,
    pub previous_hash: String,
}

/// Stage 4 payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncapsulationPayload {
    pub facility_id: String,
    pub facility_name: String,
    pub facility_cert_type: FacilityCertType,
    pub facility_cert_id: String,
    pub facility_cert_hash: String,
    pub lot_number: LotNumber,
    /// The fill date exactly as supplied; validated as a calendar timestamp.
    pub fill_date: String,
    pub batch_id: BatchId,
    pub capsule_count: u64,
    pub mg_per_capsule: f64,
    pub previous_hash: String,
}

/// Cold-chain statistics for a distribution leg.
///
/// When tracking is disabled the temperatures are null, deviations zero and
/// `cold_chain_pass` false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColdChain {
    pub enabled: bool,
    pub avg_temp_c: Option<f64>,
    pub min_temp_c: Option<f64>,
    pub max_temp_c: Option<f64>,
    pub duration_days: u64,
    pub deviations_count: u64,
    pub temp_log_hash: Option<String>,
    pub cold_chain_pass: bool,
}

impl ColdChain {
    /// The block recorded when no temperature readings were supplied.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            avg_temp_c: None,
            min_temp_c: None,
            max_temp_c: None,
            duration_days: 0,
            deviations_count: 0,
            temp_log_hash: None,
            cold_chain_pass: false,
        }
    }
}

/// Stage 5 payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionPayload {
    pub distributor_id: String,
    pub distributor_name: String,
    pub warehouse_id: String,
    pub warehouse_location: String,
    pub lot_number: LotNumber,
    pub cold_chain: ColdChain,
    pub previous_hash: String,
}

/// Fraud detector finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyPayload {
    pub anomaly_type: AnomalyType,
    pub severity: Severity,
    /// `payload_hash` of the receipt the finding is about.
    pub source_receipt_hash: String,
    /// Finding-specific values plus a human-readable `message`.
    pub details: Map<String, Value>,
}

/// The stage-specific part of a receipt, tagged by `receipt_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "receipt_type", rename_all = "snake_case")]
pub enum Payload {
    Catch(CatchPayload),
    Processing(ProcessingPayload),
    Testing(TestingPayload),
    Encapsulation(EncapsulationPayload),
    Distribution(DistributionPayload),
    Anomaly(AnomalyPayload),
}

impl Payload {
    /// The `receipt_type` this payload is written under.
    pub fn kind(&self) -> ReceiptKind {
        match self {
            Self::Catch(_) => ReceiptKind::Catch,
            Self::Processing(_) => ReceiptKind::Processing,
            Self::Testing(_) => ReceiptKind::Testing,
            Self::Encapsulation(_) => ReceiptKind::Encapsulation,
            Self::Distribution(_) => ReceiptKind::Distribution,
            Self::Anomaly(_) => ReceiptKind::Anomaly,
        }
    }

    /// Link to the preceding stage. `None` for catch and anomaly payloads.
    pub fn previous_hash(&self) -> Option<&str> {
        match self {
            Self::Processing(p) => Some(&p.previous_hash),
            Self::Testing(p) => Some(&p.previous_hash),
            Self::Encapsulation(p) => Some(&p.previous_hash),
            Self::Distribution(p) => Some(&p.previous_hash),
            Self::Catch(_) | Self::Anomaly(_) => None,
        }
    }

    /// Consumer lot number, carried by encapsulation and distribution.
    pub fn lot_number(&self) -> Option<&LotNumber> {
        match self {
            Self::Encapsulation(p) => Some(&p.lot_number),
            Self::Distribution(p) => Some(&p.lot_number),
            _ => None,
        }
    }

    /// Internal batch id, carried by catch (optionally) through encapsulation.
    pub fn batch_id(&self) -> Option<&BatchId> {
        match self {
            Self::Catch(p) => p.batch_id.as_ref(),
            Self::Processing(p) => Some(&p.batch_id),
            Self::Testing(p) => Some(&p.batch_id),
            Self::Encapsulation(p) => Some(&p.batch_id),
            Self::Distribution(_) | Self::Anomaly(_) => None,
        }
    }
}

impl From<CatchPayload> for Payload {
    fn from(p: CatchPayload) -> Self {
        Self::Catch(p)
    }
}

impl From<ProcessingPayload> for Payload {
    fn from(p: ProcessingPayload) -> Self {
        Self::Processing(p)
    }
}

impl From<TestingPayload> for Payload {
    fn from(p: TestingPayload) -> Self {
        Self::Testing(p)
    }
}

impl From<EncapsulationPayload> for Payload {
    fn from(p: EncapsulationPayload) -> Self {
        Self::Encapsulation(p)
    }
}

impl From<DistributionPayload> for Payload {
    fn from(p: DistributionPayload) -> Self {
        Self::Distribution(p)
    }
}

impl From<AnomalyPayload> for Payload {
    fn from(p: AnomalyPayload) -> Self {
        Self::Anomaly(p)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_comes_first_then_fields_in_order() {
        let value = serde_json::to_value(Payload::from(fixtures::catch())).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "receipt_type",
                "species",
                "species_common",
                "fishery_approved",
                "fishery_registry",
                "import_docs_hash",
                "fishery_cert_type",
                "fishery_cert_id",
                "fishery_cert_hash",
                "batch_id",
            ]
        );
        assert_eq!(value["receipt_type"], "catch");
    }

    #[test]
    fn wire_names_match_ledger_text() {
        assert_eq!(
            serde_json::to_string(&FisheryCertType::Uncertified).unwrap(),
            "\"None\""
        );
        assert_eq!(
            serde_json::to_string(&ExtractionMethod::SupercriticalCo2).unwrap(),
            "\"SupercriticalCO2\""
        );
        assert_eq!(
            serde_json::to_string(&YieldStatus::HighDilutionFlag).unwrap(),
            "\"HIGH_DILUTION_FLAG\""
        );
        assert_eq!(serde_json::to_string(&LabCertType::Iso17025).unwrap(), "\"ISO17025\"");
        assert_eq!(
            serde_json::to_string(&AnomalyType::ColdChainDegradation).unwrap(),
            "\"COLD_CHAIN_DEGRADATION\""
        );
    }

    #[test]
    fn from_wire_is_exact() {
        assert_eq!(GmpCertType::from_wire("NSF"), Some(GmpCertType::Nsf));
        assert_eq!(GmpCertType::from_wire("nsf"), None);
        assert_eq!(ReceiptKind::from_wire("anomaly"), Some(ReceiptKind::Anomaly));
        for kind in ReceiptKind::ALL {
            assert_eq!(ReceiptKind::from_wire(kind.as_str()), Some(*kind));
        }
    }

    #[test]
    fn stage_index_orders_stages() {
        assert_eq!(ReceiptKind::Catch.stage_index(), Some(0));
        assert_eq!(ReceiptKind::Distribution.stage_index(), Some(4));
        assert_eq!(ReceiptKind::Anomaly.stage_index(), None);
    }

    #[test]
    fn accessors() {
        let catch = Payload::from(fixtures::catch());
        assert_eq!(catch.kind(), ReceiptKind::Catch);
        assert!(catch.previous_hash().is_none());
        assert_eq!(catch.batch_id().map(BatchId::as_str), Some("BP-2025-0131"));

        let proc = Payload::from(fixtures::processing("SHA256_a:BLAKE3_b"));
        assert_eq!(proc.previous_hash(), Some("SHA256_a:BLAKE3_b"));
        assert!(proc.lot_number().is_none());
    }

    #[test]
    fn contaminant_failures_listed_in_order() {
        let c = ContaminantResult {
            mercury_ppm: 0.15,
            mercury_pass: false,
            pcbs_ppm: 0.01,
            pcbs_pass: true,
            dioxins_pg_per_g: 4.0,
            dioxins_pass: false,
            all_pass: false,
        };
        assert_eq!(c.failures(), vec![("mercury_ppm", 0.15), ("dioxins_pg_per_g", 4.0)]);
    }

    #[test]
    fn disabled_cold_chain_shape() {
        let v = serde_json::to_value(ColdChain::disabled()).unwrap();
        assert_eq!(v["enabled"], false);
        assert!(v["max_temp_c"].is_null());
        assert_eq!(v["deviations_count"], 0);
        assert_eq!(v["cold_chain_pass"], false);
    }
}
