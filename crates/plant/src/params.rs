//! Model constants.

use serde::{Deserialize, Serialize};

/// Physical and control constants of the reference plant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantParameters {
    pub ambient_f: f64,
    /// Fractional heat loss per hour towards ambient.
    pub loss_coeff_per_hr: f64,
    /// Heat added by each running transport unit.
    pub unit_heat_f_per_hr: f64,
    pub aux_heat_f_per_hr: f64,
    pub aux_heat_kw: f64,
    pub bubble_heater_f_per_hr: f64,

    pub solid_setpoint_psia: f64,
    pub bubble_setpoint_psia: f64,
    /// Half-width of the pressure controller deadband.
    pub deadband_psi: f64,
    pub heater_rate_psi_per_hr: f64,
    pub decay_rate_psi_per_hr: f64,
    pub solid_expansion_psi_per_f: f64,
    pub bubble_expansion_psi_per_f: f64,

    pub surge_gpm_per_f_per_hr: f64,
    pub flow_per_unit_gpm: f64,
    pub lbm_per_gpm_hour: f64,

    pub unit_permissive_psia: f64,
    pub unit_start_interval_hours: f64,
    pub max_auto_units: u32,
    /// Pressure dip applied when a unit starts.
    pub unit_start_kick_psi: f64,

    pub pressure_noise_psi: f64,
    /// Refuse non-state-derived writes inside an audit window. Turning this
    /// off models a broken engine.
    pub enforce_audit: bool,
}

impl Default for PlantParameters {
    fn default() -> Self {
        Self {
            ambient_f: 70.0,
            loss_coeff_per_hr: 0.0005,
            unit_heat_f_per_hr: 10.0,
            aux_heat_f_per_hr: 5.0,
            aux_heat_kw: 250.0,
            bubble_heater_f_per_hr: 60.0,

            solid_setpoint_psia: 350.0,
            bubble_setpoint_psia: 420.0,
            deadband_psi: 5.0,
            heater_rate_psi_per_hr: 40.0,
            decay_rate_psi_per_hr: 20.0,
            solid_expansion_psi_per_f: 2.0,
            bubble_expansion_psi_per_f: 0.2,

            surge_gpm_per_f_per_hr: 1.5,
            flow_per_unit_gpm: 90_000.0,
            lbm_per_gpm_hour: 500.0,

            unit_permissive_psia: 400.0,
            unit_start_interval_hours: 0.25,
            max_auto_units: 2,
            unit_start_kick_psi: 2.0,

            pressure_noise_psi: 0.01,
            enforce_audit: true,
        }
    }
}
