//! Run validity gate.
//!
//! Reads the isolated hold and decides whether any check result may be
//! trusted. Conditions are evaluated in order and every failing one adds a
//! reason. A probe the engine fails to reject is not a reason but a fatal
//! error: the audit counters the gate relies on are meaningless then.

use serde::Serialize;
use tracing::{debug, info, warn};

use fidelity_foundation::SourceLabel;
use fidelity_runtime::{PlantConfig, PlantEngine, Sample, StateWrite};

use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};
use crate::scenario::ScenarioResult;

/// Source label of the negative-test override.
pub const PROBE_SOURCE: &str = "validity.probe";

/// Slack on the elapsed-time comparison.
const ELAPSED_SLACK_HOURS: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunValidity {
    pub is_valid: bool,
    pub reasons: Vec<String>,
}

impl RunValidity {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            reasons: Vec::new(),
        }
    }

    fn fail(&mut self, reason: String) {
        warn!(%reason, "run validity condition failed");
        self.is_valid = false;
        self.reasons.push(reason);
    }

    /// All reasons joined for display.
    pub fn reason(&self) -> String {
        if self.reasons.is_empty() {
            "run valid".to_string()
        } else {
            self.reasons.join("; ")
        }
    }
}

/// Minimums and epsilon the gate checks the hold against.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidityEvaluator {
    pub min_hours: f64,
    pub min_samples: usize,
    pub zero_epsilon: f64,
    /// Value the probe tries to force. Far enough from any hold pressure that
    /// an accepted probe is unmistakable.
    pub probe_pressure_psia: f64,
}

impl ValidityEvaluator {
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            min_hours: config.hold.min_hours,
            min_samples: config.hold.min_samples,
            zero_epsilon: config.thresholds.zero_epsilon,
            probe_pressure_psia: 2_500.0,
        }
    }

    /// Evaluate the gate. `probe_config` reinitializes the engine for the
    /// probe so no scenario state leaks into it.
    pub fn evaluate(
        &self,
        hold: &ScenarioResult,
        engine: &mut dyn PlantEngine,
        probe_config: &PlantConfig,
    ) -> Result<RunValidity> {
        let mut validity = RunValidity::valid();
        self.check_sufficiency(hold, &mut validity);
        self.check_zero_perturbation(hold, &mut validity);
        let probe_consistent = self.probe(engine, probe_config)?;
        if !probe_consistent {
            validity.fail("audit counters did not register the rejected probe".to_string());
        }
        check_audit(hold, &mut validity);

        info!(
            valid = validity.is_valid,
            reasons = validity.reasons.len(),
            "run validity evaluated"
        );
        Ok(validity)
    }

    fn check_sufficiency(&self, hold: &ScenarioResult, validity: &mut RunValidity) {
        let summary = hold.summary();
        if summary.elapsed_hours < self.min_hours - ELAPSED_SLACK_HOURS {
            validity.fail(format!(
                "insufficient hold duration: {:.4} h < {:.4} h",
                summary.elapsed_hours, self.min_hours
            ));
        }
        if summary.sample_count < self.min_samples {
            validity.fail(format!(
                "insufficient hold samples: {} < {}",
                summary.sample_count, self.min_samples
            ));
        }
    }

    fn check_zero_perturbation(&self, hold: &ScenarioResult, validity: &mut RunValidity) {
        let samples = hold.samples();

        let unit_violations: Vec<_> = samples
            .iter()
            .filter(|s| s.plant.transport_units != 0)
            .collect();
        if let Some(first) = unit_violations.first() {
            let max = unit_violations
                .iter()
                .map(|s| s.plant.transport_units)
                .max()
                .unwrap_or(0);
            validity.fail(format!(
                "transport unit count boundary violated: nonzero in {} samples (first at step {}, max {})",
                unit_violations.len(),
                first.step,
                max
            ));
        }

        let channels: [(&str, fn(&Sample) -> f64); 3] = [
            ("injection flow", |s| s.plant.injection_flow_gpm),
            ("letdown flow", |s| s.plant.letdown_flow_gpm),
            ("auxiliary heat", |s| s.plant.aux_heat_kw),
        ];
        for (name, read) in channels {
            let first = samples
                .iter()
                .map(|s| (s.step, read(s).abs()))
                .find(|(_, v)| v.is_nan() || *v > self.zero_epsilon);
            if let Some((step, value)) = first {
                validity.fail(format!(
                    "{name} boundary violated: {value:.6} > {} at step {step}",
                    self.zero_epsilon
                ));
            }
        }
    }

    /// Attempt an illegal override inside an audit window. Returns whether
    /// the counters recorded exactly one blocked attempt.
    fn probe(&self, engine: &mut dyn PlantEngine, config: &PlantConfig) -> Result<bool> {
        engine
            .initialize(config)
            .map_err(HarnessError::EngineUnavailable)?;
        engine.begin_audit();
        let before = engine.audit_counters();
        let label = SourceLabel::from(PROBE_SOURCE);
        let accepted = engine.apply_state_write(&StateWrite::pressure(
            self.probe_pressure_psia,
            label.clone(),
            false,
        ));
        let delta = engine.audit_counters().since(&before);
        engine.end_audit();

        if accepted {
            return Err(HarnessError::ProbeNotRejected { label });
        }
        debug!(?delta, "probe rejected");
        Ok(delta.override_attempts == 1 && delta.blocked_overrides == 1)
    }
}

fn check_audit(hold: &ScenarioResult, validity: &mut RunValidity) {
    let audit = hold.summary().audit;
    if audit.blocked_overrides > audit.override_attempts {
        validity.fail(format!(
            "audit counters inconsistent: {} blocked of {} attempts",
            audit.blocked_overrides, audit.override_attempts
        ));
    } else if audit.leaked_overrides() > 0 {
        validity.fail(format!(
            "{} direct override(s) accepted during the hold",
            audit.leaked_overrides()
        ));
    }
}
