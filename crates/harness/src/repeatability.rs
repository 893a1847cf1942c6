//! Repeatability comparison between two runs of the same scenario.

use serde::Serialize;
use sha2::{Digest, Sha256};

use fidelity_runtime::{PlantState, Sample};

/// Default per-field tolerance. A deterministic engine should hit zero.
pub const DEFAULT_REPEATABILITY_EPSILON: f64 = 1e-9;

fn float_fields(p: &PlantState) -> [(&'static str, f64); 14] {
    [
        ("time_hours", p.time_hours),
        ("pressure_psia", p.pressure_psia),
        ("rcs_temp_f", p.rcs_temp_f),
        ("pzr_temp_f", p.pzr_temp_f),
        ("heatup_rate_f_per_hr", p.heatup_rate_f_per_hr),
        ("transport_flow_gpm", p.transport_flow_gpm),
        ("injection_flow_gpm", p.injection_flow_gpm),
        ("letdown_flow_gpm", p.letdown_flow_gpm),
        ("net_boundary_flow_gpm", p.net_boundary_flow_gpm),
        ("surge_flow_gpm", p.surge_flow_gpm),
        ("coolant_mass_lbm", p.coolant_mass_lbm),
        ("aux_heat_kw", p.aux_heat_kw),
        ("projection.pressure_psia", p.projection.pressure_psia),
        ("projection.coolant_mass_lbm", p.projection.coolant_mass_lbm),
    ]
}

fn discrete_mismatch(a: &Sample, b: &Sample) -> Option<&'static str> {
    let (x, y) = (&a.plant, &b.plant);
    if a.step != b.step {
        Some("step")
    } else if x.transport_units != y.transport_units {
        Some("transport_units")
    } else if x.two_phase != y.two_phase || x.solid != y.solid {
        Some("phase")
    } else if x.writer != y.writer {
        Some("writer")
    } else if x.mode != y.mode {
        Some("mode")
    } else if x.projection.writer != y.projection.writer
        || x.projection.transport_units != y.projection.transport_units
        || x.projection.two_phase != y.projection.two_phase
    {
        Some("projection")
    } else {
        None
    }
}

/// SHA-256 over every tracked field of every sample, hex encoded.
pub fn samples_digest(samples: &[Sample]) -> String {
    let mut hasher = Sha256::new();
    for sample in samples {
        hasher.update((sample.step as u64).to_le_bytes());
        for (_, value) in float_fields(&sample.plant) {
            hasher.update(value.to_le_bytes());
        }
        let p = &sample.plant;
        hasher.update(p.transport_units.to_le_bytes());
        hasher.update([p.two_phase as u8, p.solid as u8]);
        hasher.update(p.writer.label().as_bytes());
        hasher.update(p.mode.label().as_bytes());
        hasher.update(p.projection.writer.label().as_bytes());
        hasher.update(p.projection.transport_units.to_le_bytes());
        hasher.update([p.projection.two_phase as u8]);
    }
    format!("{:x}", hasher.finalize())
}

/// Field-wise comparison of two sample sequences.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepeatabilityReport {
    pub epsilon: f64,
    pub compared: usize,
    pub length_a: usize,
    pub length_b: usize,
    pub max_float_delta: f64,
    /// Step and field of the largest float difference.
    pub worst: Option<(usize, String)>,
    pub discrete_mismatches: usize,
    pub first_discrete_mismatch: Option<(usize, String)>,
    pub digest_a: String,
    pub digest_b: String,
}

impl RepeatabilityReport {
    pub fn compare(a: &[Sample], b: &[Sample], epsilon: f64) -> Self {
        let mut report = Self {
            epsilon,
            compared: 0,
            length_a: a.len(),
            length_b: b.len(),
            max_float_delta: 0.0,
            worst: None,
            discrete_mismatches: 0,
            first_discrete_mismatch: None,
            digest_a: samples_digest(a),
            digest_b: samples_digest(b),
        };

        for (x, y) in a.iter().zip(b) {
            report.compared += 1;
            let pairs = float_fields(&x.plant)
                .into_iter()
                .zip(float_fields(&y.plant));
            for ((name, va), (_, vb)) in pairs {
                let delta = (va - vb).abs();
                let delta = if delta.is_nan() && va.to_bits() != vb.to_bits() {
                    f64::INFINITY
                } else if delta.is_nan() {
                    0.0
                } else {
                    delta
                };
                if delta > report.max_float_delta {
                    report.max_float_delta = delta;
                    report.worst = Some((x.step, name.to_string()));
                }
            }
            if let Some(field) = discrete_mismatch(x, y) {
                report.discrete_mismatches += 1;
                report
                    .first_discrete_mismatch
                    .get_or_insert((x.step, field.to_string()));
            }
        }
        report
    }

    pub fn identical(&self) -> bool {
        self.digest_a == self.digest_b
    }

    pub fn within_tolerance(&self) -> bool {
        self.length_a == self.length_b
            && self.discrete_mismatches == 0
            && self.max_float_delta <= self.epsilon
    }

    pub fn summary(&self) -> String {
        let mut text = format!(
            "compared {} samples, max float delta {:.3e} (epsilon {:.1e}), {} discrete mismatches",
            self.compared, self.max_float_delta, self.epsilon, self.discrete_mismatches
        );
        if self.length_a != self.length_b {
            text.push_str(&format!(", lengths {} vs {}", self.length_a, self.length_b));
        }
        if let Some((step, field)) = &self.worst {
            text.push_str(&format!(", worst {field} at step {step}"));
        }
        text
    }
}
