//! Harness configuration.
//!
//! A `HarnessConfig` fixes everything a campaign needs: step size, seed,
//! the scenario catalogue settings, check thresholds and the blocking
//! policy. Files carry an `apiVersion`/`kind` header and every other field
//! falls back to the default campaign.
//!
//! ```yaml
//! apiVersion: fidelity/v1
//! kind: Harness
//! seed: 42
//! hold:
//!   hours: 3.0
//! thresholds:
//!   holdTempSlopeFPerHr: 0.25
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use fidelity_foundation::DtHours;
use fidelity_runtime::{ChannelForcing, DEFAULT_MAX_STEPS};

use crate::error::ConfigError;
use crate::metrics::ParityTolerances;
use crate::policy::BlockingPolicy;
use crate::repeatability::DEFAULT_REPEATABILITY_EPSILON;
use crate::writer::DEFAULT_WARMUP_STEPS;

pub const API_VERSION: &str = "fidelity/v1";
pub const KIND: &str = "Harness";

fn default_api_version() -> String {
    API_VERSION.to_string()
}

fn default_kind() -> String {
    KIND.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarnessConfig {
    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_kind")]
    pub kind: String,

    /// Seed every scenario's engine configuration is derived from.
    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default = "default_dt")]
    pub dt_hours: DtHours,

    /// Hard step cap applied to every scenario.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    #[serde(default)]
    pub hold: HoldSettings,

    #[serde(default)]
    pub cycling: CyclingSettings,

    #[serde(default)]
    pub transition: TransitionSettings,

    #[serde(default)]
    pub thresholds: Thresholds,

    #[serde(default)]
    pub parity: ParityTolerances,

    #[serde(default = "default_repeatability_epsilon")]
    pub repeatability_epsilon: f64,

    #[serde(default = "default_warmup")]
    pub writer_warmup_steps: usize,

    #[serde(default)]
    pub policy: BlockingPolicy,
}

fn default_seed() -> u64 {
    42
}

fn default_dt() -> DtHours {
    1.0 / 360.0
}

fn default_max_steps() -> usize {
    DEFAULT_MAX_STEPS
}

fn default_repeatability_epsilon() -> f64 {
    DEFAULT_REPEATABILITY_EPSILON
}

fn default_warmup() -> usize {
    DEFAULT_WARMUP_STEPS
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            seed: default_seed(),
            dt_hours: default_dt(),
            max_steps: default_max_steps(),
            hold: HoldSettings::default(),
            cycling: CyclingSettings::default(),
            transition: TransitionSettings::default(),
            thresholds: Thresholds::default(),
            parity: ParityTolerances::default(),
            repeatability_epsilon: default_repeatability_epsilon(),
            writer_warmup_steps: default_warmup(),
            policy: BlockingPolicy::default(),
        }
    }
}

/// Isolated hold: the reference scenario the validity gate reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HoldSettings {
    pub hours: f64,
    /// Minimum elapsed time for the run to count as sufficient.
    pub min_hours: f64,
    pub min_samples: usize,
    pub rcs_temp_f: f64,
    pub pressure_psia: f64,
    pub pzr_temp_f: f64,
    /// Channels forced on every step. Isolated unless overridden.
    pub forcing: ChannelForcing,
}

impl Default for HoldSettings {
    fn default() -> Self {
        Self {
            hours: 3.0,
            min_hours: 3.0,
            min_samples: 1081,
            rcs_temp_f: 160.0,
            pressure_psia: 350.0,
            pzr_temp_f: 200.0,
            forcing: ChannelForcing::isolated(),
        }
    }
}

/// Forced unit start/stop cycling with a steam bubble present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CyclingSettings {
    pub hours: f64,
    pub on_units: u32,
    pub period_hours: f64,
    pub rcs_temp_f: f64,
    pub pressure_psia: f64,
}

impl Default for CyclingSettings {
    fn default() -> Self {
        Self {
            hours: 4.0,
            on_units: 2,
            period_hours: 0.5,
            rcs_temp_f: 200.0,
            pressure_psia: 420.0,
        }
    }
}

/// Heatup from solid plant through bubble formation and the first unit start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransitionSettings {
    pub rcs_temp_f: f64,
    pub pressure_psia: f64,
    pub pzr_temp_f: f64,
    pub auto_unit_start: bool,
    /// Unit count whose rising edge starts the follow-on window.
    pub edge_units: u32,
    pub follow_on_hours: f64,
}

impl Default for TransitionSettings {
    fn default() -> Self {
        Self {
            rcs_temp_f: 160.0,
            pressure_psia: 350.0,
            pzr_temp_f: 380.0,
            auto_unit_start: true,
            edge_units: 1,
            follow_on_hours: 1.0,
        }
    }
}

/// Acceptance thresholds for the named checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Thresholds {
    pub hold_temp_slope_f_per_hr: f64,
    pub hold_mass_drift_lbm: f64,
    pub pressure_band_min_psi: f64,
    pub pressure_band_max_psi: f64,
    /// Readback ceiling for channels forced to zero.
    pub zero_epsilon: f64,
    pub cycling_max_pressure_step_psi: f64,
    pub surge_magnitude_floor: f64,
    pub surge_min_consistency: f64,
    pub transition_max_pressure_step_psi: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            hold_temp_slope_f_per_hr: 0.25,
            hold_mass_drift_lbm: 5.0,
            pressure_band_min_psi: 3.0,
            pressure_band_max_psi: 25.0,
            zero_epsilon: 1e-6,
            cycling_max_pressure_step_psi: 5.0,
            surge_magnitude_floor: 0.5,
            surge_min_consistency: 0.9,
            transition_max_pressure_step_psi: 5.0,
        }
    }
}

impl HarnessConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: HarnessConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_version != API_VERSION {
            return Err(ConfigError::InvalidApiVersion(self.api_version.clone()));
        }
        if self.kind != KIND {
            return Err(ConfigError::InvalidKind(self.kind.clone()));
        }
        if !(self.dt_hours.is_finite() && self.dt_hours > 0.0) {
            return Err(invalid(format!("dtHours must be positive, got {}", self.dt_hours)));
        }
        if self.max_steps == 0 {
            return Err(invalid("maxSteps must be at least 1"));
        }
        for (name, hours) in [
            ("hold.hours", self.hold.hours),
            ("cycling.hours", self.cycling.hours),
            ("cycling.periodHours", self.cycling.period_hours),
        ] {
            if !(hours.is_finite() && hours > 0.0) {
                return Err(invalid(format!("{name} must be positive, got {hours}")));
            }
        }
        if self.transition.follow_on_hours < 0.0 {
            return Err(invalid("transition.followOnHours must not be negative"));
        }
        let t = &self.thresholds;
        if t.pressure_band_min_psi > t.pressure_band_max_psi {
            return Err(invalid(format!(
                "pressure band is inverted: {} > {}",
                t.pressure_band_min_psi, t.pressure_band_max_psi
            )));
        }
        if !(0.0..=1.0).contains(&t.surge_min_consistency) {
            return Err(invalid("surgeMinConsistency must lie in [0, 1]"));
        }
        if self.repeatability_epsilon < 0.0 {
            return Err(invalid("repeatabilityEpsilon must not be negative"));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}
