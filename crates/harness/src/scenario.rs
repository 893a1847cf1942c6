//! Scenario catalogue and frozen scenario results.
//!
//! Every scenario is the same generic runner with a different descriptor:
//! plant configuration, termination policy and channel forcing. The result
//! of a run is frozen into a [`ScenarioResult`] carrying the samples, the
//! projection parity metrics, the writer legality report and a summary of
//! derived statistics.

use std::fmt;

use serde::Serialize;
use tracing::{info, instrument};

use fidelity_foundation::ScenarioId;
use fidelity_runtime::{
    AuditCounters, ChannelForcing, CountEdge, Enforcement, PlantConfig, PlantEngine, RunOutcome,
    RunSpec, Sample, ScenarioRunner, Termination, UnitForcing,
};

use crate::config::HarnessConfig;
use crate::error::Result;
use crate::metrics::ParityTracker;
use crate::series::{self, Extrema, SignConsistency};
use crate::writer::{WriterLegality, WriterReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    IsolatedHold,
    IsolatedHoldRepeat,
    StressCycling,
    TransitionWindow,
}

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 4] = [
        ScenarioKind::IsolatedHold,
        ScenarioKind::IsolatedHoldRepeat,
        ScenarioKind::StressCycling,
        ScenarioKind::TransitionWindow,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ScenarioKind::IsolatedHold => "isolated_hold",
            ScenarioKind::IsolatedHoldRepeat => "isolated_hold_repeat",
            ScenarioKind::StressCycling => "stress_cycling",
            ScenarioKind::TransitionWindow => "transition_window",
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A runnable scenario descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioPlan {
    pub kind: ScenarioKind,
    pub spec: RunSpec,
    pub forcing: Option<ChannelForcing>,
}

impl ScenarioPlan {
    /// Build the descriptor for `kind` from the harness configuration.
    pub fn for_kind(kind: ScenarioKind, config: &HarnessConfig) -> Self {
        let base = PlantConfig {
            seed: config.seed,
            dt_hours: config.dt_hours,
            ..PlantConfig::default()
        };
        let (plant, termination, forcing, audited) = match kind {
            ScenarioKind::IsolatedHold | ScenarioKind::IsolatedHoldRepeat => {
                let hold = &config.hold;
                let plant = PlantConfig {
                    rcs_temp_f: hold.rcs_temp_f,
                    pressure_psia: hold.pressure_psia,
                    pzr_temp_f: hold.pzr_temp_f,
                    ..base
                };
                let forcing = (!hold.forcing.is_empty()).then(|| hold.forcing.clone());
                (plant, Termination::Duration { hours: hold.hours }, forcing, true)
            }
            ScenarioKind::StressCycling => {
                let cycling = &config.cycling;
                let plant = PlantConfig {
                    rcs_temp_f: cycling.rcs_temp_f,
                    pressure_psia: cycling.pressure_psia,
                    two_phase: true,
                    ..base
                };
                let forcing = ChannelForcing {
                    units: Some(UnitForcing::Cycle {
                        on_units: cycling.on_units,
                        period_hours: cycling.period_hours,
                    }),
                    zero_boundary_flows: true,
                    aux_heat_off: true,
                    pressure_write: None,
                };
                (
                    plant,
                    Termination::Duration {
                        hours: cycling.hours,
                    },
                    Some(forcing),
                    false,
                )
            }
            ScenarioKind::TransitionWindow => {
                let transition = &config.transition;
                let plant = PlantConfig {
                    rcs_temp_f: transition.rcs_temp_f,
                    pressure_psia: transition.pressure_psia,
                    pzr_temp_f: transition.pzr_temp_f,
                    bubble_heaters: true,
                    auto_unit_start: transition.auto_unit_start,
                    ..base
                };
                let termination = Termination::UntilEdge {
                    edge: CountEdge::rising(transition.edge_units),
                    follow_on_hours: transition.follow_on_hours,
                };
                (plant, termination, None, false)
            }
        };
        Self {
            kind,
            spec: RunSpec {
                id: ScenarioId::from(kind.name()),
                config: plant,
                termination,
                audited,
            },
            forcing,
        }
    }

    /// Run the plan and freeze the result.
    #[instrument(skip_all, fields(scenario = %self.kind))]
    pub fn execute(
        &self,
        runner: &ScenarioRunner,
        engine: &mut dyn PlantEngine,
        config: &HarnessConfig,
    ) -> Result<ScenarioResult> {
        let mut parity = ParityTracker::new(config.parity);
        let enforcement = self
            .forcing
            .as_ref()
            .map(|f| f as &dyn Enforcement);
        let outcome = runner.run_observed(engine, &self.spec, enforcement, &mut |sample| {
            parity.observe(sample)
        })?;
        let legality =
            WriterLegality::new(outcome.dt_hours).with_warmup(config.writer_warmup_steps);
        let result = ScenarioResult::freeze(
            self.kind,
            outcome,
            parity,
            &legality,
            config.thresholds.surge_magnitude_floor,
        );
        info!(
            steps = result.summary.step_count,
            completed = result.summary.completed,
            writer_pass = result.writer.writer_rule_pass,
            parity_pass = result.summary.parity_pass,
            "scenario frozen"
        );
        Ok(result)
    }
}

/// Derived statistics over one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioSummary {
    pub kind: ScenarioKind,
    pub completed: bool,
    pub step_count: usize,
    pub sample_count: usize,
    pub elapsed_hours: f64,
    pub trigger_step: Option<usize>,
    pub pressure: Option<Extrema>,
    pub pressure_peak_to_peak: f64,
    pub pressure_max_step_delta: f64,
    pub rcs_temp_slope_f_per_hr: f64,
    pub mass_drift_lbm: f64,
    pub surge_consistency: SignConsistency,
    pub max_transport_units: u32,
    /// First step at which a steam bubble is present.
    pub two_phase_step: Option<usize>,
    pub parity_pass: bool,
    pub writer_rule_pass: bool,
    pub audit: AuditCounters,
}

/// A finished scenario. Read-only once built.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    kind: ScenarioKind,
    outcome: RunOutcome,
    parity: ParityTracker,
    writer: WriterReport,
    summary: ScenarioSummary,
}

impl ScenarioResult {
    pub fn freeze(
        kind: ScenarioKind,
        outcome: RunOutcome,
        parity: ParityTracker,
        legality: &WriterLegality,
        surge_floor: f64,
    ) -> Self {
        let samples = &outcome.samples;
        let writer = legality.check(samples);
        let elapsed_hours = match (samples.first(), samples.last()) {
            (Some(first), Some(last)) => last.time_hours() - first.time_hours(),
            _ => 0.0,
        };
        let mass_drift_lbm = match (samples.first(), samples.last()) {
            (Some(first), Some(last)) => (last.plant.coolant_mass_lbm - first.plant.coolant_mass_lbm).abs(),
            _ => 0.0,
        };
        let summary = ScenarioSummary {
            kind,
            completed: outcome.completed,
            step_count: outcome.step_count,
            sample_count: samples.len(),
            elapsed_hours,
            trigger_step: outcome.trigger_step,
            pressure: series::extrema(samples, pressure),
            pressure_peak_to_peak: series::peak_to_peak(samples, pressure),
            pressure_max_step_delta: series::max_step_delta(samples, pressure),
            rcs_temp_slope_f_per_hr: series::slope(samples, |s| s.plant.rcs_temp_f),
            mass_drift_lbm,
            surge_consistency: series::sign_consistency(
                samples,
                |s| s.plant.surge_flow_gpm,
                |s| s.plant.heatup_rate_f_per_hr,
                surge_floor,
            ),
            max_transport_units: samples
                .iter()
                .map(|s| s.plant.transport_units)
                .max()
                .unwrap_or(0),
            two_phase_step: samples.iter().find(|s| s.plant.two_phase).map(|s| s.step),
            parity_pass: parity.passed(),
            writer_rule_pass: writer.writer_rule_pass,
            audit: outcome.audit,
        };
        Self {
            kind,
            outcome,
            parity,
            writer,
            summary,
        }
    }

    pub fn kind(&self) -> ScenarioKind {
        self.kind
    }

    pub fn samples(&self) -> &[Sample] {
        &self.outcome.samples
    }

    pub fn outcome(&self) -> &RunOutcome {
        &self.outcome
    }

    pub fn parity(&self) -> &ParityTracker {
        &self.parity
    }

    pub fn writer(&self) -> &WriterReport {
        &self.writer
    }

    pub fn summary(&self) -> &ScenarioSummary {
        &self.summary
    }

    pub fn completed(&self) -> bool {
        self.outcome.completed
    }

    pub fn dt_hours(&self) -> f64 {
        self.outcome.dt_hours
    }

    /// Samples from `from_step` through `to_step` inclusive, clamped.
    pub fn window(&self, from_step: usize, to_step: usize) -> &[Sample] {
        let samples = self.samples();
        if samples.is_empty() || from_step >= samples.len() || to_step < from_step {
            return &[];
        }
        let end = to_step.min(samples.len() - 1);
        &samples[from_step..=end]
    }
}

fn pressure(sample: &Sample) -> f64 {
    sample.plant.pressure_psia
}
