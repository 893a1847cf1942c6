//! Fidelity metrics over (direct, projected) value pairs.
//!
//! Both trackers only accumulate: `max_error` and `mismatch_count` never
//! decrease.

use serde::{Deserialize, Serialize};

use fidelity_runtime::Sample;

/// Tolerance-bound tracker for a float quantity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FloatMetric {
    pub name: String,
    pub tolerance: f64,
    pub max_error: f64,
    /// Step of the largest error seen so far.
    pub worst_step: Option<usize>,
    pub tracked: usize,
}

impl FloatMetric {
    pub fn new(name: impl Into<String>, tolerance: f64) -> Self {
        Self {
            name: name.into(),
            tolerance,
            max_error: 0.0,
            worst_step: None,
            tracked: 0,
        }
    }

    /// Record one pair and return its absolute error.
    pub fn track(&mut self, step: usize, direct: f64, projected: f64) -> f64 {
        let error = (projected - direct).abs();
        self.tracked += 1;
        // NaN never compares greater, so treat it as an unbounded error.
        let error = if error.is_nan() { f64::INFINITY } else { error };
        if error > self.max_error {
            self.max_error = error;
            self.worst_step = Some(step);
        }
        error
    }

    pub fn passed(&self) -> bool {
        self.max_error <= self.tolerance
    }
}

/// Exact-match tracker for a discrete quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscreteMetric {
    pub name: String,
    pub mismatch_count: usize,
    pub first_mismatch_step: Option<usize>,
    pub tracked: usize,
}

impl DiscreteMetric {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mismatch_count: 0,
            first_mismatch_step: None,
            tracked: 0,
        }
    }

    /// Record one pair; returns whether the values matched.
    pub fn track<T: PartialEq + ?Sized>(&mut self, step: usize, direct: &T, projected: &T) -> bool {
        self.tracked += 1;
        if direct == projected {
            return true;
        }
        self.mismatch_count += 1;
        self.first_mismatch_step.get_or_insert(step);
        false
    }

    pub fn passed(&self) -> bool {
        self.mismatch_count == 0
    }
}

/// Tolerances for comparing the direct state against the engine's projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParityTolerances {
    pub pressure_psia: f64,
    pub coolant_mass_lbm: f64,
}

impl Default for ParityTolerances {
    fn default() -> Self {
        Self {
            pressure_psia: 0.05,
            coolant_mass_lbm: 1e-3,
        }
    }
}

/// Parity between the direct fields of each sample and its projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParityTracker {
    pub pressure: FloatMetric,
    pub coolant_mass: FloatMetric,
    pub writer: DiscreteMetric,
    pub transport_units: DiscreteMetric,
    pub two_phase: DiscreteMetric,
}

impl ParityTracker {
    pub fn new(tolerances: ParityTolerances) -> Self {
        Self {
            pressure: FloatMetric::new("pressure_psia", tolerances.pressure_psia),
            coolant_mass: FloatMetric::new("coolant_mass_lbm", tolerances.coolant_mass_lbm),
            writer: DiscreteMetric::new("writer"),
            transport_units: DiscreteMetric::new("transport_units"),
            two_phase: DiscreteMetric::new("two_phase"),
        }
    }

    pub fn observe(&mut self, sample: &Sample) {
        let step = sample.step;
        let direct = &sample.plant;
        let projected = &direct.projection;
        self.pressure
            .track(step, direct.pressure_psia, projected.pressure_psia);
        self.coolant_mass
            .track(step, direct.coolant_mass_lbm, projected.coolant_mass_lbm);
        self.writer.track(step, &direct.writer, &projected.writer);
        self.transport_units
            .track(step, &direct.transport_units, &projected.transport_units);
        self.two_phase
            .track(step, &direct.two_phase, &projected.two_phase);
    }

    pub fn passed(&self) -> bool {
        self.pressure.passed()
            && self.coolant_mass.passed()
            && self.writer.passed()
            && self.transport_units.passed()
            && self.two_phase.passed()
    }

    /// Names of the metrics that failed, with their worst value.
    pub fn failures(&self) -> Vec<String> {
        let mut out = Vec::new();
        for metric in [&self.pressure, &self.coolant_mass] {
            if !metric.passed() {
                out.push(format!(
                    "{} max error {:.4} > {} at step {}",
                    metric.name,
                    metric.max_error,
                    metric.tolerance,
                    metric.worst_step.unwrap_or_default()
                ));
            }
        }
        for metric in [&self.writer, &self.transport_units, &self.two_phase] {
            if !metric.passed() {
                out.push(format!(
                    "{} mismatched {} times, first at step {}",
                    metric.name,
                    metric.mismatch_count,
                    metric.first_mismatch_step.unwrap_or_default()
                ));
            }
        }
        out
    }
}
