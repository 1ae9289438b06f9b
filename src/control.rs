//! Flow-rate control: Nernst-based SOC estimate and the current-proportional
//! flow law.
//!
//! Nothing in this module returns an error. Numeric edge cases — zero
//! current, a saturating exponent, a vanishing SOC term — degrade to a
//! defined flow value instead.

use crate::constants::{
    CURRENT_EPSILON, DEFAULT_CONCENTRATION_MOLAR, DEFAULT_TEMPERATURE_C, FARADAY_CONSTANT,
    GAS_CONSTANT_R, KELVIN_OFFSET, NERNST_REFERENCE_OCV, SOC_EPSILON, SOC_EXP_SATURATION,
};
use crate::error::SimdosError;
use crate::types::FlowRateLimits;
use serde::{Deserialize, Serialize};

/// Operator-configured parameters of the automatic flow controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowControlConfig {
    /// Stoichiometric excess factor applied while charging
    pub lambda_charge: f64,
    /// Stoichiometric excess factor applied while discharging
    pub lambda_discharge: f64,
    /// Number of cells in the stack
    pub cell_count: u32,
    /// Operator floor on the applied flow rate (µl/min)
    pub min_flow_ul_min: u32,
    /// Operator ceiling on the applied flow rate (µl/min)
    pub max_flow_ul_min: u32,
    /// Electrolyte concentration (mol/l)
    pub concentration_molar: f64,
}

impl Default for FlowControlConfig {
    fn default() -> Self {
        FlowControlConfig {
            lambda_charge: 4.5,
            lambda_discharge: 4.5,
            cell_count: 1,
            min_flow_ul_min: 1_000,
            max_flow_ul_min: 100_000,
            concentration_molar: DEFAULT_CONCENTRATION_MOLAR,
        }
    }
}

impl FlowControlConfig {
    /// Check the invariants that must hold before the controller activates.
    pub fn validate(&self) -> Result<(), SimdosError> {
        if self.min_flow_ul_min > self.max_flow_ul_min {
            return Err(SimdosError::Validation(format!(
                "min flow {} exceeds max flow {}",
                self.min_flow_ul_min, self.max_flow_ul_min
            )));
        }
        if self.lambda_charge <= 0.0 || self.lambda_discharge <= 0.0 {
            return Err(SimdosError::Validation(
                "lambda factors must be positive".to_string(),
            ));
        }
        if self.cell_count == 0 {
            return Err(SimdosError::Validation(
                "cell count must be positive".to_string(),
            ));
        }
        if self.concentration_molar <= 0.0 {
            return Err(SimdosError::Validation(
                "electrolyte concentration must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// One observation gathered per control interval.
#[derive(Debug, Clone, Copy)]
pub struct ControlSample {
    /// Instantaneous current in mA; positive means charging
    pub current_ma: f64,
    /// Open-circuit voltage in V
    pub ocv_volts: f64,
    /// Electrolyte temperature in °C; `None` falls back to 25 °C
    pub temperature_c: Option<f64>,
}

/// Source of control samples (in practice the cycler's CSV export plus a
/// temperature probe; abstracted here so the loop does not care).
pub trait SampleSource {
    fn sample(&mut self) -> Option<ControlSample>;
}

/// State of charge from open-circuit voltage via the Nernst logistic.
///
/// Symmetric around the 1.4 V reference: `soc_from_ocv(1.4, t) == 0.5` for
/// any positive temperature. An exponent beyond ±700 saturates the result
/// to exactly 0 or 1 instead of overflowing, and a non-positive absolute
/// temperature degenerates to 0.
pub fn soc_from_ocv(ocv_volts: f64, temp_k: f64) -> f64 {
    if temp_k <= 0.0 {
        return 0.0;
    }
    let exponent =
        (-FARADAY_CONSTANT / (2.0 * GAS_CONSTANT_R * temp_k)) * (ocv_volts - NERNST_REFERENCE_OCV);
    if exponent > SOC_EXP_SATURATION {
        return 0.0;
    }
    if exponent < -SOC_EXP_SATURATION {
        return 1.0;
    }
    let soc = 1.0 / (1.0 + exponent.exp());
    if soc.is_nan() {
        0.0
    } else {
        soc
    }
}

/// Unclamped flow demand in µl/min for one sample.
///
/// `λ · (|I| · n_cell) / (F · soc_term · C_mol_per_µl) · 60`, where the SOC
/// term is `1 − soc` while charging and `soc` while discharging, with the
/// SOC clamped into `[1e-5, 1 − 1e-5]` first. Zero current or a vanishing
/// SOC term yields a flow of exactly 0.
pub fn flow_ul_min(sample: &ControlSample, config: &FlowControlConfig) -> f64 {
    let current_a = sample.current_ma / 1000.0;
    let charging = current_a >= 0.0;
    let temp_c = sample.temperature_c.unwrap_or(DEFAULT_TEMPERATURE_C);
    let soc = soc_from_ocv(sample.ocv_volts, temp_c + KELVIN_OFFSET);

    let safe_soc = soc.clamp(SOC_EPSILON, 1.0 - SOC_EPSILON);
    let soc_term = if charging { 1.0 - safe_soc } else { safe_soc };
    let lambda = if charging {
        config.lambda_charge
    } else {
        config.lambda_discharge
    };

    if current_a.abs() < CURRENT_EPSILON || soc_term.abs() < CURRENT_EPSILON {
        return 0.0;
    }
    let mol_per_ul = config.concentration_molar * 1e-6;
    lambda * (current_a.abs() * config.cell_count as f64)
        / (FARADAY_CONSTANT * soc_term * mol_per_ul)
        * 60.0
}

/// Intersect the operator's bounds with the hardware envelope.
///
/// The operator's limits apply only within the hardware's: the result is
/// `[max(user_min, hw_min), min(user_max, hw_max)]`. An empty intersection
/// falls back to the hardware envelope, since the device range always wins.
pub fn effective_bounds(
    config: &FlowControlConfig,
    hardware: Option<FlowRateLimits>,
) -> FlowRateLimits {
    let user = FlowRateLimits::new(config.min_flow_ul_min, config.max_flow_ul_min);
    let Some(hw) = hardware else {
        return user;
    };
    let min = user.min_ul_min.max(hw.min_ul_min);
    let max = user.max_ul_min.min(hw.max_ul_min);
    if min > max {
        log::warn!(
            "operator bounds {}..={} do not overlap hardware bounds {}..={}; \
             using hardware bounds",
            user.min_ul_min,
            user.max_ul_min,
            hw.min_ul_min,
            hw.max_ul_min
        );
        return hw;
    }
    FlowRateLimits::new(min, max)
}

/// Clamp a flow demand into bounds and round to the integer µl/min the
/// protocol carries.
pub fn target_flow(flow_ul_min: f64, bounds: &FlowRateLimits) -> u32 {
    flow_ul_min
        .clamp(bounds.min_ul_min as f64, bounds.max_ul_min as f64)
        .round() as u32
}
