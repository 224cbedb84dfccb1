//! # fop-stages: Supply Chain Stage Validators
//!
//! One module per stage. Each exposes:
//!
//! - an input struct, deserializable from the JSON files suppliers send;
//! - a pure `validate_*` function returning the stage payload or a
//!   [`StopRule`](fop_core::StopRule);
//! - a `create_*_receipt` entry point that validates, emits through
//!   [`fop_ledger::emit`], and returns the sealed receipt;
//! - a `link_to_*` lookup for the preceding stage's receipt.
//!
//! Testing is the one stage that emits on failure: a contaminant or TOTOX
//! ceiling breach is persisted first and the stop rule carries the hash of
//! the persisted receipt.
//!
//! Regulatory limits live in [`constants`] and are not configurable.

pub mod catch;
pub mod constants;
pub mod distribution;
pub mod encapsulation;
pub mod processing;
pub mod testing;

mod validate;

pub use catch::{
    create_catch_receipt, species_common_name, validate_catch, CatchInput, APPROVED_SPECIES,
};
pub use distribution::{
    create_distribution_receipt, link_to_encapsulation, validate_cold_chain,
    validate_distribution, DistributionInput,
};
pub use encapsulation::{
    create_encapsulation_receipt, generate_lot_number, generate_lot_number_today, link_to_testing,
    validate_encapsulation, EncapsulationInput,
};
pub use processing::{
    classify_yield, create_processing_receipt, link_to_catch, validate_processing,
    ProcessingInput,
};
pub use testing::{
    breach_message, create_testing_receipt, link_to_processing, validate_testing, TestingInput,
};
