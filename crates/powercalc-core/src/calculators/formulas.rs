//! Closed-form electrical formulas.
//!
//! Each function validates its inputs and returns `CalcError::Validation`
//! with a display-ready message when a rule is broken. NaN never passes a
//! check.

use super::CalcError;

/// Real power in kW, apparent power in kVA.
pub fn power_factor(kw: f64, kva: f64) -> Result<f64, CalcError> {
    check_power_pair(kw, kva)?;
    Ok(kw / kva)
}

/// Reactive power in kVAr from apparent (kVA) and real (kW) power.
pub fn reactive_power(kva: f64, kw: f64) -> Result<f64, CalcError> {
    check_power_pair(kw, kva)?;
    Ok((kva * kva - kw * kw).max(0.0).sqrt())
}

/// Phase angle in degrees from apparent (kVA) and real (kW) power.
pub fn phase_angle(kva: f64, kw: f64) -> Result<f64, CalcError> {
    let pf = power_factor(kw, kva)?;
    Ok(pf.clamp(0.0, 1.0).acos().to_degrees())
}

/// Single-phase load in kW.
pub fn load_single(volts: f64, amps: f64, pf: f64) -> Result<f64, CalcError> {
    check_load_inputs(volts, amps, pf)?;
    Ok(volts * amps * pf / 1000.0)
}

/// Balanced three-phase load in kW, line-to-line voltage.
pub fn load_three(volts: f64, amps: f64, pf: f64) -> Result<f64, CalcError> {
    check_load_inputs(volts, amps, pf)?;
    Ok(3f64.sqrt() * volts * amps * pf / 1000.0)
}

/// All three quantities of V = I * R once the missing one is solved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OhmsLaw {
    pub volts: f64,
    pub amps: f64,
    pub ohms: f64,
}

/// Solve V = I * R for whichever quantity is NaN.
///
/// Exactly two of the three must be given.
pub fn ohms_law(volts: f64, amps: f64, ohms: f64) -> Result<OhmsLaw, CalcError> {
    let given = [volts, amps, ohms].iter().filter(|v| !v.is_nan()).count();
    if given != 2 {
        return Err(CalcError::validation("Provide exactly two of V, I, R"));
    }

    if volts.is_nan() {
        return Ok(OhmsLaw {
            volts: amps * ohms,
            amps,
            ohms,
        });
    }

    if amps.is_nan() {
        if ohms == 0.0 {
            return Err(CalcError::validation(
                "Resistance cannot be zero when solving for I",
            ));
        }
        return Ok(OhmsLaw {
            volts,
            amps: volts / ohms,
            ohms,
        });
    }

    if amps == 0.0 {
        return Err(CalcError::validation(
            "Current cannot be zero when solving for R",
        ));
    }
    Ok(OhmsLaw {
        volts,
        amps,
        ohms: volts / amps,
    })
}

fn check_power_pair(kw: f64, kva: f64) -> Result<(), CalcError> {
    if kva.is_nan() || kva <= 0.0 {
        return Err(CalcError::validation("kVA must be greater than 0"));
    }
    if kw.is_nan() || kw < 0.0 {
        return Err(CalcError::validation("kW cannot be negative"));
    }
    if kw > kva {
        return Err(CalcError::validation("kW cannot exceed kVA"));
    }
    Ok(())
}

fn check_load_inputs(volts: f64, amps: f64, pf: f64) -> Result<(), CalcError> {
    if volts.is_nan() || volts <= 0.0 {
        return Err(CalcError::validation("Voltage must be greater than 0"));
    }
    if amps.is_nan() || amps <= 0.0 {
        return Err(CalcError::validation("Current must be greater than 0"));
    }
    if !(0.0..=1.0).contains(&pf) {
        return Err(CalcError::validation("Power factor must be between 0 and 1"));
    }
    Ok(())
}
