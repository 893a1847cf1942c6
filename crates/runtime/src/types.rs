//! Core data model
//!
//! A [`Sample`] is the immutable per-step capture of everything the harness
//! tracks. Engines report a [`PlantState`]; the runner stamps it with the
//! step index and never touches it again.

use std::fmt;

use serde::{Deserialize, Serialize};

use fidelity_foundation::{DtHours, SourceLabel};

/// Which internal computation path owns the tracked quantities.
///
/// `Unset` and `Init` are sentinels: they carry no rank and are legal on
/// either side of any transition. The remaining tags are ordered by
/// increasing coupling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WriterTag {
    #[default]
    Unset,
    Init,
    SolidIsolated,
    BubbleIsolated,
    PartialCoupled,
    FullyCoupled,
}

impl WriterTag {
    /// Rank in the ownership order, `None` for sentinels.
    pub fn rank(self) -> Option<u8> {
        match self {
            WriterTag::Unset | WriterTag::Init => None,
            WriterTag::SolidIsolated => Some(0),
            WriterTag::BubbleIsolated => Some(1),
            WriterTag::PartialCoupled => Some(2),
            WriterTag::FullyCoupled => Some(3),
        }
    }

    pub fn is_sentinel(self) -> bool {
        self.rank().is_none()
    }

    pub fn label(self) -> &'static str {
        match self {
            WriterTag::Unset => "UNSET",
            WriterTag::Init => "INIT",
            WriterTag::SolidIsolated => "SOLID_ISOLATED",
            WriterTag::BubbleIsolated => "BUBBLE_ISOLATED",
            WriterTag::PartialCoupled => "PARTIAL_COUPLED",
            WriterTag::FullyCoupled => "FULLY_COUPLED",
        }
    }
}

impl fmt::Display for WriterTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Subsystem operating mode reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlantMode {
    #[default]
    SolidPressureControl,
    BubblePressureControl,
    ForcedCirculation,
}

impl PlantMode {
    pub fn label(self) -> &'static str {
        match self {
            PlantMode::SolidPressureControl => "SOLID_PRESSURE_CONTROL",
            PlantMode::BubblePressureControl => "BUBBLE_PRESSURE_CONTROL",
            PlantMode::ForcedCirculation => "FORCED_CIRCULATION",
        }
    }
}

impl fmt::Display for PlantMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Values produced by the engine's derived-state path.
///
/// These are expected to agree with the directly reported fields, exactly
/// for discrete values and within a tight tolerance for floats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Projection {
    pub pressure_psia: f64,
    pub coolant_mass_lbm: f64,
    pub writer: WriterTag,
    pub transport_units: u32,
    pub two_phase: bool,
}

/// Everything the engine exposes through its read accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PlantState {
    pub time_hours: f64,
    pub pressure_psia: f64,
    pub rcs_temp_f: f64,
    pub pzr_temp_f: f64,
    pub heatup_rate_f_per_hr: f64,
    pub transport_flow_gpm: f64,
    pub injection_flow_gpm: f64,
    pub letdown_flow_gpm: f64,
    pub net_boundary_flow_gpm: f64,
    pub surge_flow_gpm: f64,
    pub coolant_mass_lbm: f64,
    pub aux_heat_kw: f64,
    pub transport_units: u32,
    pub two_phase: bool,
    pub solid: bool,
    pub writer: WriterTag,
    pub mode: PlantMode,
    pub projection: Projection,
}

/// Immutable capture of one step.
///
/// Step 0 is the state right after `initialize`; step `n` follows the n-th
/// `advance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub step: usize,
    #[serde(flatten)]
    pub plant: PlantState,
}

impl Sample {
    pub fn capture(step: usize, plant: PlantState) -> Self {
        Self { step, plant }
    }

    pub fn time_hours(&self) -> f64 {
        self.plant.time_hours
    }

    pub fn writer(&self) -> WriterTag {
        self.plant.writer
    }

    /// The physical flags the writer predicates depend on.
    pub fn flags(&self) -> PhaseFlags {
        PhaseFlags {
            transport_units: self.plant.transport_units,
            two_phase: self.plant.two_phase,
            solid: self.plant.solid,
        }
    }
}

/// Unit count plus phase flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhaseFlags {
    pub transport_units: u32,
    pub two_phase: bool,
    pub solid: bool,
}

/// Deterministic starting point for one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantConfig {
    /// Seed every engine-side random stream is derived from.
    pub seed: u64,
    pub dt_hours: DtHours,
    pub rcs_temp_f: f64,
    pub pressure_psia: f64,
    pub pzr_temp_f: f64,
    pub coolant_mass_lbm: f64,
    pub two_phase: bool,
    pub transport_units: u32,
    pub injection_flow_gpm: f64,
    pub letdown_flow_gpm: f64,
    pub aux_heat: bool,
    /// Pressurizer heaters used to draw a steam bubble from a solid plant.
    pub bubble_heaters: bool,
    /// Let the engine start transport units once its permissives are met.
    pub auto_unit_start: bool,
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            dt_hours: 1.0 / 360.0,
            rcs_temp_f: 160.0,
            pressure_psia: 350.0,
            pzr_temp_f: 200.0,
            coolant_mass_lbm: 550_000.0,
            two_phase: false,
            transport_units: 0,
            injection_flow_gpm: 0.0,
            letdown_flow_gpm: 0.0,
            aux_heat: false,
            bubble_heaters: false,
            auto_unit_start: false,
        }
    }
}

/// Quantity targeted by a state write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WriteTarget {
    #[default]
    Pressure,
    CoolantMass,
}

/// A tagged override of a tracked quantity.
///
/// Writes not derived from engine state are overrides; the engine must
/// refuse them while an audit window is open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateWrite {
    pub target: WriteTarget,
    pub value: f64,
    pub source: SourceLabel,
    pub state_derived: bool,
}

impl StateWrite {
    pub fn pressure(value: f64, source: impl Into<SourceLabel>, state_derived: bool) -> Self {
        Self {
            target: WriteTarget::Pressure,
            value,
            source: source.into(),
            state_derived,
        }
    }
}

/// Write/override bookkeeping exposed by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AuditCounters {
    /// Every `apply_state_write` call.
    pub writes: u64,
    /// Non-state-derived writes issued inside an audit window.
    pub override_attempts: u64,
    /// Override attempts the engine refused.
    pub blocked_overrides: u64,
}

impl AuditCounters {
    /// Counters accumulated since `earlier`.
    pub fn since(&self, earlier: &AuditCounters) -> AuditCounters {
        AuditCounters {
            writes: self.writes.saturating_sub(earlier.writes),
            override_attempts: self
                .override_attempts
                .saturating_sub(earlier.override_attempts),
            blocked_overrides: self
                .blocked_overrides
                .saturating_sub(earlier.blocked_overrides),
        }
    }

    /// Overrides that got through an open audit window.
    pub fn leaked_overrides(&self) -> u64 {
        self.override_attempts.saturating_sub(self.blocked_overrides)
    }
}
