//! Termination policies
//!
//! Every scenario ends either when its policy is satisfied or when the
//! runner's hard step cap is reached, whichever comes first.

use serde::{Deserialize, Serialize};

use fidelity_foundation::{steps_for, DtHours};

use crate::types::Sample;

/// When a scenario is done.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    /// Fixed total simulated duration.
    Duration { hours: f64 },
    /// Until a condition over the captured state holds.
    UntilCondition { condition: Condition },
    /// Until the unit count crosses a boundary, then a further follow-on
    /// window.
    UntilEdge {
        edge: CountEdge,
        #[serde(default)]
        follow_on_hours: f64,
    },
}

/// Condition over a single sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Condition {
    TwoPhaseFormed,
    RcsTempAtLeast(f64),
    PressureAtLeast(f64),
    TransportUnitsAtLeast(u32),
}

impl Condition {
    pub fn holds(&self, sample: &Sample) -> bool {
        let p = &sample.plant;
        match *self {
            Condition::TwoPhaseFormed => p.two_phase,
            Condition::RcsTempAtLeast(t) => p.rcs_temp_f >= t,
            Condition::PressureAtLeast(v) => p.pressure_psia >= v,
            Condition::TransportUnitsAtLeast(n) => p.transport_units >= n,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeDirection {
    Rising,
    Falling,
}

/// Unit-count boundary crossing.
///
/// Rising fires on `prev < boundary <= current`; falling fires on
/// `prev >= boundary > current`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountEdge {
    pub boundary: u32,
    pub direction: EdgeDirection,
}

impl CountEdge {
    pub fn rising(boundary: u32) -> Self {
        Self {
            boundary,
            direction: EdgeDirection::Rising,
        }
    }

    pub fn crossed(&self, prev: u32, current: u32) -> bool {
        match self.direction {
            EdgeDirection::Rising => prev < self.boundary && current >= self.boundary,
            EdgeDirection::Falling => prev >= self.boundary && current < self.boundary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Continue,
    Done,
}

/// Per-run evaluation state for a [`Termination`].
#[derive(Debug, Clone)]
pub struct TerminationTracker {
    policy: Termination,
    target_steps: usize,
    follow_on_steps: usize,
    prev_units: Option<u32>,
    trigger_step: Option<usize>,
}

impl TerminationTracker {
    pub fn new(policy: Termination, dt: DtHours) -> Self {
        let (target_steps, follow_on_steps) = match &policy {
            Termination::Duration { hours } => (steps_for(*hours, dt), 0),
            Termination::UntilCondition { .. } => (0, 0),
            Termination::UntilEdge {
                follow_on_hours, ..
            } => (0, steps_for(*follow_on_hours, dt)),
        };
        Self {
            policy,
            target_steps,
            follow_on_steps,
            prev_units: None,
            trigger_step: None,
        }
    }

    /// Step at which the condition or edge was first observed.
    pub fn trigger_step(&self) -> Option<usize> {
        self.trigger_step
    }

    /// Feed the next captured sample, starting with step 0.
    pub fn observe(&mut self, sample: &Sample) -> Progress {
        let step = sample.step;
        let progress = match &self.policy {
            Termination::Duration { .. } => {
                if step >= self.target_steps {
                    Progress::Done
                } else {
                    Progress::Continue
                }
            }
            Termination::UntilCondition { condition } => {
                if condition.holds(sample) {
                    self.trigger_step.get_or_insert(step);
                    Progress::Done
                } else {
                    Progress::Continue
                }
            }
            Termination::UntilEdge { edge, .. } => {
                let units = sample.plant.transport_units;
                if self.trigger_step.is_none() {
                    if let Some(prev) = self.prev_units {
                        if edge.crossed(prev, units) {
                            self.trigger_step = Some(step);
                        }
                    }
                }
                let done_at = self
                    .trigger_step
                    .map(|edge_step| edge_step.saturating_add(self.follow_on_steps));
                match done_at {
                    Some(done_at) if step >= done_at => Progress::Done,
                    _ => Progress::Continue,
                }
            }
        };
        self.prev_units = Some(sample.plant.transport_units);
        progress
    }
}
