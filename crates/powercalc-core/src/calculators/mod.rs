//! Electrical calculators behind a name-keyed registry.
//!
//! This module provides the fixed set of calculators the form offers:
//!
//! - Power Factor, Reactive Power, Phase Angle (from kW and kVA)
//! - Ohm's Law (solve the missing one of V, I, R)
//! - Single- and three-phase load in kW
//!
//! Each calculator describes its input fields, computes from parsed
//! `InputValues`, and formats its `ComputationResult` for display.

pub mod error;
pub mod formulas;
pub mod registry;

pub use error::CalcError;
pub use registry::{
    compute, format_result, get_spec, list_calculators, Calculator, CalculatorSpec,
    ComputationResult, InputField, InputValues,
};
