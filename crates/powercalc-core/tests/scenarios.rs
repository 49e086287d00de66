//! End-to-end calculator runs: raw form text in, display string out.

use std::collections::HashMap;

use powercalc_core::calculators::{self, CalcError};

fn raw(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Compute and format the way the form does, including error prefixes.
fn display(name: &str, pairs: &[(&str, &str)]) -> String {
    match calculators::compute(name, &raw(pairs)) {
        Ok(result) => calculators::format_result(name, &result).unwrap(),
        Err(e) => e.display(),
    }
}

#[test]
fn power_factor_scenario() {
    assert_eq!(display("Power Factor", &[("P", "80"), ("S", "100")]), "PF = 0.8000");
}

#[test]
fn reactive_power_scenario() {
    assert_eq!(
        display("Reactive Power", &[("S", "100"), ("P", "80")]),
        "Q = 60.000 kVAr"
    );
}

#[test]
fn phase_angle_scenario() {
    assert_eq!(display("Phase Angle", &[("S", "100"), ("P", "80")]), "θ = 36.87°");
}

#[test]
fn ohms_law_scenario() {
    assert_eq!(
        display("Ohm's Law", &[("V", "120"), ("I", "10"), ("R", "")]),
        "V=120.000 V, I=10.000 A, R=12.000 Ω"
    );
}

#[test]
fn three_phase_load_scenario() {
    assert_eq!(
        display("Load (Three-Phase)", &[("V", "480"), ("I", "10"), ("pf", "0.8")]),
        "P = 6.651 kW"
    );
}

#[test]
fn power_factor_exceeding_kva_is_rejected() {
    let err = calculators::compute("Power Factor", &raw(&[("P", "120"), ("S", "100")]))
        .unwrap_err();
    assert_eq!(err, CalcError::Validation("kW cannot exceed kVA".to_string()));
    assert_eq!(
        display("Power Factor", &[("P", "120"), ("S", "100")]),
        "[error] kW cannot exceed kVA"
    );
}

#[test]
fn ohms_law_with_one_or_three_values_is_rejected() {
    for pairs in [
        &[("V", "120"), ("I", "10"), ("R", "12")][..],
        &[("V", "120"), ("I", ""), ("R", "")][..],
        &[][..],
    ] {
        let err = calculators::compute("Ohm's Law", &raw(pairs)).unwrap_err();
        assert!(err.is_validation(), "{:?}", pairs);
    }
}

#[test]
fn garbage_in_required_field_is_unexpected() {
    assert_eq!(
        display("Load (Single-Phase)", &[("V", "two-forty"), ("I", "10"), ("pf", "1")]),
        "[unexpected] Voltage (V) is not a number"
    );
}

#[test]
fn recomputing_gives_identical_display() {
    for name in calculators::list_calculators() {
        let spec = calculators::get_spec(name).unwrap();
        let pairs: Vec<(&str, &str)> = spec
            .inputs()
            .iter()
            .enumerate()
            .map(|(i, f)| (f.key, ["2", "3", ""][i.min(2)]))
            .collect();
        assert_eq!(display(name, &pairs), display(name, &pairs), "{}", name);
    }
}

#[test]
fn every_listed_calculator_has_a_spec() {
    let names = calculators::list_calculators();
    assert_eq!(names.len(), 6);
    for name in names {
        let spec = calculators::get_spec(name).unwrap();
        assert_eq!(spec.name(), name);
        assert!(!spec.inputs().is_empty());
    }
}
