use std::collections::HashMap;

use tracing::debug;

use super::formulas;
use super::CalcError;
use crate::utils::{format_fixed, parse_number};

// ============================================================================
// Field Descriptors
// ============================================================================

/// One labeled text input on the calculator form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputField {
    pub key: &'static str,
    pub label: &'static str,
    pub hint: &'static str,
}

const fn field(key: &'static str, label: &'static str, hint: &'static str) -> InputField {
    InputField { key, label, hint }
}

const KW_KVA_FIELDS: [InputField; 2] = [
    field("P", "Real Power (kW)", "e.g. 80"),
    field("S", "Apparent Power (kVA)", "e.g. 100"),
];

const KVA_KW_FIELDS: [InputField; 2] = [
    field("S", "Apparent Power (kVA)", "e.g. 100"),
    field("P", "Real Power (kW)", "e.g. 80"),
];

const OHMS_FIELDS: [InputField; 3] = [
    field("V", "Voltage (V)", "leave one blank"),
    field("I", "Current (A)", "leave one blank"),
    field("R", "Resistance (Ω)", "leave one blank"),
];

const SINGLE_PHASE_FIELDS: [InputField; 3] = [
    field("V", "Voltage (V)", "e.g. 240"),
    field("I", "Current (A)", "e.g. 16"),
    field("pf", "Power Factor", "0 to 1, e.g. 0.9"),
];

const THREE_PHASE_FIELDS: [InputField; 3] = [
    field("V", "Line Voltage (V)", "e.g. 480"),
    field("I", "Line Current (A)", "e.g. 10"),
    field("pf", "Power Factor", "0 to 1, e.g. 0.8"),
];

// ============================================================================
// Values In, Values Out
// ============================================================================

/// Parsed form values keyed by field key. NaN marks a missing value.
#[derive(Debug, Clone, Default)]
pub struct InputValues {
    values: HashMap<&'static str, f64>,
    labels: HashMap<&'static str, &'static str>,
}

impl InputValues {
    /// Parse raw text for every field. Fields absent from `raw` count as empty.
    pub fn parse(fields: &[InputField], raw: &HashMap<String, String>) -> Self {
        let mut parsed = Self::default();
        for f in fields {
            let text = raw.get(f.key).map(String::as_str).unwrap_or("");
            parsed.values.insert(f.key, parse_number(text));
            parsed.labels.insert(f.key, f.label);
        }
        parsed
    }

    /// The value for `key`, NaN when missing.
    pub fn get(&self, key: &str) -> f64 {
        self.values.get(key).copied().unwrap_or(f64::NAN)
    }

    /// The value for a field every calculation needs.
    fn require(&self, key: &str) -> Result<f64, CalcError> {
        let value = self.get(key);
        if value.is_nan() {
            let field = self.labels.get(key).copied().unwrap_or(key);
            return Err(CalcError::NotANumber {
                field: field.to_string(),
            });
        }
        Ok(value)
    }
}

/// Computed outputs in display order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComputationResult {
    outputs: Vec<(&'static str, f64)>,
}

impl ComputationResult {
    fn single(key: &'static str, value: f64) -> Self {
        Self {
            outputs: vec![(key, value)],
        }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.outputs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }

    fn value(&self, key: &str) -> f64 {
        self.get(key).unwrap_or(f64::NAN)
    }
}

// ============================================================================
// Calculators
// ============================================================================

/// The fixed set of calculators, in selector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Calculator {
    PowerFactor,
    ReactivePower,
    PhaseAngle,
    OhmsLaw,
    LoadSinglePhase,
    LoadThreePhase,
}

impl Calculator {
    pub const ALL: [Calculator; 6] = [
        Calculator::PowerFactor,
        Calculator::ReactivePower,
        Calculator::PhaseAngle,
        Calculator::OhmsLaw,
        Calculator::LoadSinglePhase,
        Calculator::LoadThreePhase,
    ];

    /// Get the display name, which is also the registry key.
    pub fn name(&self) -> &'static str {
        match self {
            Calculator::PowerFactor => "Power Factor",
            Calculator::ReactivePower => "Reactive Power",
            Calculator::PhaseAngle => "Phase Angle",
            Calculator::OhmsLaw => "Ohm's Law",
            Calculator::LoadSinglePhase => "Load (Single-Phase)",
            Calculator::LoadThreePhase => "Load (Three-Phase)",
        }
    }

    pub fn inputs(&self) -> &'static [InputField] {
        match self {
            Calculator::PowerFactor => &KW_KVA_FIELDS,
            Calculator::ReactivePower | Calculator::PhaseAngle => &KVA_KW_FIELDS,
            Calculator::OhmsLaw => &OHMS_FIELDS,
            Calculator::LoadSinglePhase => &SINGLE_PHASE_FIELDS,
            Calculator::LoadThreePhase => &THREE_PHASE_FIELDS,
        }
    }

    pub fn compute(&self, values: &InputValues) -> Result<ComputationResult, CalcError> {
        match self {
            Calculator::PowerFactor => {
                let pf = formulas::power_factor(values.require("P")?, values.require("S")?)?;
                Ok(ComputationResult::single("pf", pf))
            }
            Calculator::ReactivePower => {
                let q = formulas::reactive_power(values.require("S")?, values.require("P")?)?;
                Ok(ComputationResult::single("Q", q))
            }
            Calculator::PhaseAngle => {
                let theta = formulas::phase_angle(values.require("S")?, values.require("P")?)?;
                Ok(ComputationResult::single("theta", theta))
            }
            Calculator::OhmsLaw => {
                // Blank fields are the unknown here, so NaN goes straight through
                let solved =
                    formulas::ohms_law(values.get("V"), values.get("I"), values.get("R"))?;
                Ok(ComputationResult {
                    outputs: vec![("V", solved.volts), ("I", solved.amps), ("R", solved.ohms)],
                })
            }
            Calculator::LoadSinglePhase | Calculator::LoadThreePhase => {
                let volts = values.require("V")?;
                let amps = values.require("I")?;
                let pf = values.require("pf")?;
                let kw = if *self == Calculator::LoadThreePhase {
                    formulas::load_three(volts, amps, pf)?
                } else {
                    formulas::load_single(volts, amps, pf)?
                };
                Ok(ComputationResult::single("P", kw))
            }
        }
    }

    pub fn format(&self, result: &ComputationResult) -> String {
        match self {
            Calculator::PowerFactor => format!("PF = {}", format_fixed(result.value("pf"), 4)),
            Calculator::ReactivePower => {
                format!("Q = {} kVAr", format_fixed(result.value("Q"), 3))
            }
            Calculator::PhaseAngle => format!("θ = {}°", format_fixed(result.value("theta"), 2)),
            Calculator::OhmsLaw => format!(
                "V={} V, I={} A, R={} Ω",
                format_fixed(result.value("V"), 3),
                format_fixed(result.value("I"), 3),
                format_fixed(result.value("R"), 3),
            ),
            Calculator::LoadSinglePhase | Calculator::LoadThreePhase => {
                format!("P = {} kW", format_fixed(result.value("P"), 3))
            }
        }
    }
}

/// Everything the form needs to know about one calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalculatorSpec {
    pub calculator: Calculator,
}

impl CalculatorSpec {
    pub fn name(&self) -> &'static str {
        self.calculator.name()
    }

    pub fn inputs(&self) -> &'static [InputField] {
        self.calculator.inputs()
    }

    pub fn compute(&self, values: &InputValues) -> Result<ComputationResult, CalcError> {
        self.calculator.compute(values)
    }

    pub fn format(&self, result: &ComputationResult) -> String {
        self.calculator.format(result)
    }
}

/// One spec per calculator, in `Calculator::ALL` order.
static SPECS: [CalculatorSpec; Calculator::ALL.len()] = {
    let mut specs = [CalculatorSpec {
        calculator: Calculator::PowerFactor,
    }; Calculator::ALL.len()];
    let mut i = 0;
    while i < specs.len() {
        specs[i].calculator = Calculator::ALL[i];
        i += 1;
    }
    specs
};

// ============================================================================
// Registry Operations
// ============================================================================

/// Calculator names in selector order.
pub fn list_calculators() -> Vec<&'static str> {
    SPECS.iter().map(CalculatorSpec::name).collect()
}

pub fn get_spec(name: &str) -> Result<&'static CalculatorSpec, CalcError> {
    SPECS
        .iter()
        .find(|spec| spec.name() == name)
        .ok_or_else(|| CalcError::NotFound(name.to_string()))
}

/// Parse the raw form text and run the named calculator.
pub fn compute(
    name: &str,
    raw_inputs: &HashMap<String, String>,
) -> Result<ComputationResult, CalcError> {
    let spec = get_spec(name)?;
    let values = InputValues::parse(spec.inputs(), raw_inputs);
    let result = spec.compute(&values);
    debug!(calculator = name, ok = result.is_ok(), "Computed");
    result
}

pub fn format_result(name: &str, result: &ComputationResult) -> Result<String, CalcError> {
    Ok(get_spec(name)?.format(result))
}

// ============================================================================
// Tests
// ============================================================================
