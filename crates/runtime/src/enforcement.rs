//! Per-step boundary enforcement
//!
//! Enforcement forces engine channels to fixed values before and after each
//! step. It is how the harness builds boundary scenarios the engine would
//! never reach on its own: a fully isolated hold, a forced start/stop cycle,
//! a one-step unit pulse.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use fidelity_foundation::{steps_for, DtHours, SourceLabel};

use crate::engine::PlantEngine;
use crate::error::Result;
use crate::types::StateWrite;

/// Which side of `advance` the enforcement runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPhase {
    Before,
    After,
}

/// Context available to enforcement.
#[derive(Debug, Clone, Copy)]
pub struct EnforcementContext {
    /// 1-based index of the step in progress. Both phases of one step see
    /// the same index.
    pub step: usize,
    pub dt_hours: DtHours,
    pub phase: StepPhase,
}

/// Forces channels around each engine step.
pub trait Enforcement {
    fn apply(&self, engine: &mut dyn PlantEngine, ctx: &EnforcementContext) -> Result<()>;
}

impl<F> Enforcement for F
where
    F: Fn(&mut dyn PlantEngine, &EnforcementContext) -> Result<()>,
{
    fn apply(&self, engine: &mut dyn PlantEngine, ctx: &EnforcementContext) -> Result<()> {
        self(engine, ctx)
    }
}

/// How the transport unit count is forced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnitForcing {
    /// Same count on every step.
    Constant { units: u32 },
    /// `on_units` for `period_hours`, zero for `period_hours`, repeating.
    Cycle { on_units: u32, period_hours: f64 },
    /// `base` everywhere except `width_steps` steps starting at `at_step`.
    Pulse {
        base: u32,
        pulse_units: u32,
        at_step: usize,
        #[serde(default = "default_pulse_width")]
        width_steps: usize,
    },
}

fn default_pulse_width() -> usize {
    1
}

impl UnitForcing {
    /// Unit count for the 1-based step in progress.
    pub fn units_for(&self, step: usize, dt: DtHours) -> u32 {
        match *self {
            UnitForcing::Constant { units } => units,
            UnitForcing::Cycle {
                on_units,
                period_hours,
            } => {
                let period = steps_for(period_hours, dt).max(1);
                if (step.saturating_sub(1) / period) % 2 == 0 {
                    on_units
                } else {
                    0
                }
            }
            UnitForcing::Pulse {
                base,
                pulse_units,
                at_step,
                width_steps,
            } => {
                if step >= at_step && step < at_step.saturating_add(width_steps) {
                    pulse_units
                } else {
                    base
                }
            }
        }
    }
}

/// A labelled pressure write issued on every enforcement pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForcedWrite {
    pub value_psia: f64,
    pub source: SourceLabel,
    #[serde(default)]
    pub state_derived: bool,
}

/// Data-driven enforcement, loadable from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ChannelForcing {
    pub units: Option<UnitForcing>,
    pub zero_boundary_flows: bool,
    pub aux_heat_off: bool,
    pub pressure_write: Option<ForcedWrite>,
}

impl ChannelForcing {
    /// Zero units, zero boundary flows, auxiliary heat off.
    pub fn isolated() -> Self {
        Self {
            units: Some(UnitForcing::Constant { units: 0 }),
            zero_boundary_flows: true,
            aux_heat_off: true,
            pressure_write: None,
        }
    }

    pub fn with_units(mut self, units: UnitForcing) -> Self {
        self.units = Some(units);
        self
    }

    pub fn with_pressure_write(mut self, write: ForcedWrite) -> Self {
        self.pressure_write = Some(write);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_none()
            && !self.zero_boundary_flows
            && !self.aux_heat_off
            && self.pressure_write.is_none()
    }
}

impl Enforcement for ChannelForcing {
    fn apply(&self, engine: &mut dyn PlantEngine, ctx: &EnforcementContext) -> Result<()> {
        trace!(step = ctx.step, phase = ?ctx.phase, "enforcing channels");
        if let Some(units) = &self.units {
            engine.command_transport_units(units.units_for(ctx.step, ctx.dt_hours));
        }
        if self.zero_boundary_flows {
            engine.command_boundary_flows(0.0, 0.0);
        }
        if self.aux_heat_off {
            engine.command_aux_heat(false);
        }
        if let Some(forced) = &self.pressure_write {
            let write = StateWrite::pressure(
                forced.value_psia,
                forced.source.clone(),
                forced.state_derived,
            );
            if !engine.apply_state_write(&write) {
                debug!(step = ctx.step, source = %forced.source, "forced write refused");
            }
        }
        Ok(())
    }
}
