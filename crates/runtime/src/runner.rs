//! Scenario runner
//!
//! One generic runner covers every scenario kind. A scenario is a
//! [`RunSpec`] (configuration, termination policy, audit flag) plus optional
//! [`Enforcement`]. The runner owns the engine for the duration of the run
//! and always starts from a fresh `initialize`.
//!
//! Runs are strictly sequential: each step depends on the state left by the
//! previous one. The hard step cap is the only thing that guarantees
//! termination.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};

use fidelity_foundation::{DtHours, ScenarioId};

use crate::enforcement::{Enforcement, EnforcementContext, StepPhase};
use crate::engine::PlantEngine;
use crate::error::{Result, RunError};
use crate::termination::{Progress, Termination, TerminationTracker};
use crate::types::{AuditCounters, PlantConfig, Sample};

/// Step cap used when none is configured.
pub const DEFAULT_MAX_STEPS: usize = 20_000;

/// What to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSpec {
    pub id: ScenarioId,
    pub config: PlantConfig,
    pub termination: Termination,
    /// Keep an audit window open for the whole run.
    #[serde(default)]
    pub audited: bool,
}

/// What a run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub id: ScenarioId,
    pub dt_hours: DtHours,
    /// `step_count + 1` samples, step 0 first.
    pub samples: Vec<Sample>,
    /// False when the step cap was reached before the policy was satisfied.
    pub completed: bool,
    pub step_count: usize,
    /// Step at which a condition or edge policy fired.
    pub trigger_step: Option<usize>,
    /// Audit counters accumulated during the run.
    pub audit: AuditCounters,
}

/// Drives an engine through fixed steps.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioRunner {
    max_steps: usize,
}

impl Default for ScenarioRunner {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_STEPS)
    }
}

impl ScenarioRunner {
    pub fn new(max_steps: usize) -> Self {
        Self { max_steps }
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Run without observing samples as they are captured.
    pub fn run(
        &self,
        engine: &mut dyn PlantEngine,
        spec: &RunSpec,
        enforcement: Option<&dyn Enforcement>,
    ) -> Result<RunOutcome> {
        self.run_observed(engine, spec, enforcement, &mut |_| {})
    }

    /// Run, handing every captured sample to `observer` in order.
    #[instrument(skip_all, fields(scenario = %spec.id))]
    pub fn run_observed(
        &self,
        engine: &mut dyn PlantEngine,
        spec: &RunSpec,
        enforcement: Option<&dyn Enforcement>,
        observer: &mut dyn FnMut(&Sample),
    ) -> Result<RunOutcome> {
        let dt = spec.config.dt_hours;
        if dt <= 0.0 || !dt.is_finite() {
            return Err(RunError::InvalidDt(dt));
        }

        engine.initialize(&spec.config)?;
        if spec.audited {
            engine.begin_audit();
        }
        let audit_start = engine.audit_counters();

        let mut tracker = TerminationTracker::new(spec.termination.clone(), dt);
        let first = Sample::capture(0, engine.state());
        observer(&first);
        let mut completed = tracker.observe(&first) == Progress::Done;
        let mut samples = vec![first];
        let mut step_count = 0usize;

        debug!(dt, max_steps = self.max_steps, "starting scenario loop");
        while !completed {
            if step_count >= self.max_steps {
                warn!(step_count, "step cap reached before termination policy");
                break;
            }
            let step = step_count + 1;

            if let Some(enforcement) = enforcement {
                enforcement.apply(engine, &context(step, dt, StepPhase::Before))?;
            }
            engine.advance(dt)?;
            if let Some(enforcement) = enforcement {
                enforcement.apply(engine, &context(step, dt, StepPhase::After))?;
            }
            step_count = step;

            let sample = Sample::capture(step, engine.state());
            trace!(step, t = sample.time_hours(), writer = %sample.writer(), "captured");
            observer(&sample);
            completed = tracker.observe(&sample) == Progress::Done;
            samples.push(sample);
        }

        let audit = engine.audit_counters().since(&audit_start);
        if spec.audited {
            engine.end_audit();
        }

        info!(
            step_count,
            completed,
            trigger_step = ?tracker.trigger_step(),
            "scenario finished"
        );

        Ok(RunOutcome {
            id: spec.id.clone(),
            dt_hours: dt,
            samples,
            completed,
            step_count,
            trigger_step: tracker.trigger_step(),
            audit,
        })
    }
}

fn context(step: usize, dt_hours: DtHours, phase: StepPhase) -> EnforcementContext {
    EnforcementContext {
        step,
        dt_hours,
        phase,
    }
}

#[cfg(test)]
mod tests;
