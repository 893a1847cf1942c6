//! The reference plant engine.

use tracing::{debug, trace};

use fidelity_foundation::{DtHours, RngStream};
use fidelity_runtime::{
    AuditCounters, EngineError, PlantConfig, PlantEngine, PlantMode, PlantState, Projection,
    StateWrite, WriteTarget, WriterTag, ENGINE_INTERFACE_VERSION,
};

use crate::ownership::{classify, Ownership};
use crate::params::PlantParameters;

/// Approximate saturation temperature for a pressure.
pub fn saturation_temp_f(pressure_psia: f64) -> f64 {
    100.0 * pressure_psia.max(0.0).powf(0.25)
}

/// Mutable model state, present only after `initialize`.
#[derive(Debug, Clone)]
struct Core {
    tick: u64,
    time_hours: f64,
    pressure_psia: f64,
    rcs_temp_f: f64,
    pzr_temp_f: f64,
    heatup_rate: f64,
    coolant_mass_lbm: f64,
    ledger_start_lbm: f64,
    ledger_net_lbm: f64,
    units: u32,
    injection_gpm: f64,
    letdown_gpm: f64,
    aux_heat: bool,
    two_phase: bool,
    bubble_formed_at: Option<f64>,
    bubble_heaters: bool,
    pressure_heaters_on: bool,
    auto_unit_start: bool,
    last_unit_start: Option<f64>,
    ownership: Ownership,
    noise: RngStream,
    pressure_noise: f64,
}

/// Deterministic lumped coolant-system model.
#[derive(Debug, Clone, Default)]
pub struct ReferencePlant {
    params: PlantParameters,
    core: Option<Core>,
    auditing: bool,
    counters: AuditCounters,
}

impl ReferencePlant {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parameters(params: PlantParameters) -> Self {
        Self {
            params,
            core: None,
            auditing: false,
            counters: AuditCounters::default(),
        }
    }

    fn setpoint(&self, two_phase: bool) -> f64 {
        if two_phase {
            self.params.bubble_setpoint_psia
        } else {
            self.params.solid_setpoint_psia
        }
    }

    fn set_units(&mut self, units: u32) {
        let kick = self.params.unit_start_kick_psi;
        if let Some(core) = self.core.as_mut() {
            if units > core.units {
                core.pressure_psia -= kick;
                core.last_unit_start = Some(core.time_hours);
            }
            core.units = units;
            core.ownership.reassign(classify(units, core.two_phase), core.tick);
        }
    }
}

fn validate(config: &PlantConfig) -> Result<(), EngineError> {
    let checks = [
        ("dt_hours", config.dt_hours),
        ("rcs_temp_f", config.rcs_temp_f),
        ("pressure_psia", config.pressure_psia),
        ("pzr_temp_f", config.pzr_temp_f),
        ("coolant_mass_lbm", config.coolant_mass_lbm),
        ("injection_flow_gpm", config.injection_flow_gpm),
        ("letdown_flow_gpm", config.letdown_flow_gpm),
    ];
    for (name, value) in checks {
        if !value.is_finite() {
            return Err(EngineError::InvalidConfig(format!("{name} is not finite")));
        }
    }
    if config.dt_hours <= 0.0 {
        return Err(EngineError::InvalidConfig("dt_hours must be positive".into()));
    }
    if config.pressure_psia <= 0.0 || config.coolant_mass_lbm <= 0.0 {
        return Err(EngineError::InvalidConfig(
            "pressure and coolant mass must be positive".into(),
        ));
    }
    Ok(())
}

impl PlantEngine for ReferencePlant {
    fn interface_version(&self) -> u32 {
        ENGINE_INTERFACE_VERSION
    }

    fn initialize(&mut self, config: &PlantConfig) -> Result<(), EngineError> {
        validate(config)?;
        let two_phase = config.two_phase;
        let pzr_temp_f = if two_phase {
            saturation_temp_f(config.pressure_psia)
        } else {
            config.pzr_temp_f
        };
        let setpoint = self.setpoint(two_phase);
        let mut noise = RngStream::derive(config.seed, "plant.pressure_noise");
        let pressure_noise = noise.symmetric(self.params.pressure_noise_psi);

        self.core = Some(Core {
            tick: 0,
            time_hours: 0.0,
            pressure_psia: config.pressure_psia,
            rcs_temp_f: config.rcs_temp_f,
            pzr_temp_f,
            heatup_rate: 0.0,
            coolant_mass_lbm: config.coolant_mass_lbm,
            ledger_start_lbm: config.coolant_mass_lbm,
            ledger_net_lbm: 0.0,
            units: config.transport_units,
            injection_gpm: config.injection_flow_gpm,
            letdown_gpm: config.letdown_flow_gpm,
            aux_heat: config.aux_heat,
            two_phase,
            bubble_formed_at: two_phase.then_some(0.0),
            bubble_heaters: config.bubble_heaters,
            pressure_heaters_on: config.pressure_psia < setpoint,
            auto_unit_start: config.auto_unit_start,
            last_unit_start: None,
            ownership: Ownership::initializing(classify(config.transport_units, two_phase)),
            noise,
            pressure_noise,
        });
        self.auditing = false;
        self.counters = AuditCounters::default();
        debug!(seed = config.seed, two_phase, "reference plant initialized");
        Ok(())
    }

    fn advance(&mut self, dt: DtHours) -> Result<(), EngineError> {
        if dt <= 0.0 || !dt.is_finite() {
            return Err(EngineError::InvalidStep { dt });
        }
        let p = self.params.clone();
        let setpoint_solid = p.solid_setpoint_psia;
        let setpoint_bubble = p.bubble_setpoint_psia;
        let core = self.core.as_mut().ok_or(EngineError::NotInitialized)?;

        core.ownership.release(core.tick);

        // Thermal
        let heat = core.units as f64 * p.unit_heat_f_per_hr
            + if core.aux_heat { p.aux_heat_f_per_hr } else { 0.0 }
            - p.loss_coeff_per_hr * (core.rcs_temp_f - p.ambient_f);
        let d_temp = heat * dt;
        core.rcs_temp_f += d_temp;
        core.heatup_rate = heat;

        // Pressure controller
        let setpoint = if core.two_phase {
            setpoint_bubble
        } else {
            setpoint_solid
        };
        if core.pressure_psia < setpoint - p.deadband_psi {
            core.pressure_heaters_on = true;
        } else if core.pressure_psia > setpoint + p.deadband_psi {
            core.pressure_heaters_on = false;
        }
        let control = if core.pressure_heaters_on {
            p.heater_rate_psi_per_hr
        } else {
            -p.decay_rate_psi_per_hr
        };
        let expansion = if core.two_phase {
            p.bubble_expansion_psi_per_f
        } else {
            p.solid_expansion_psi_per_f
        };
        core.pressure_psia += control * dt + expansion * d_temp;

        // Pressurizer and bubble formation
        let t_sat = saturation_temp_f(core.pressure_psia);
        if core.two_phase {
            core.pzr_temp_f = t_sat;
        } else {
            let heaters = if core.bubble_heaters {
                p.bubble_heater_f_per_hr
            } else {
                0.0
            };
            core.pzr_temp_f += (heaters - p.loss_coeff_per_hr * (core.pzr_temp_f - p.ambient_f)) * dt;
            if core.pzr_temp_f >= t_sat {
                core.pzr_temp_f = t_sat;
                core.two_phase = true;
                core.bubble_formed_at = Some(core.time_hours + dt);
                debug!(
                    t = core.time_hours + dt,
                    pressure = core.pressure_psia,
                    "steam bubble formed"
                );
            }
        }

        // Inventory
        let delta_mass = (core.injection_gpm - core.letdown_gpm) * p.lbm_per_gpm_hour * dt;
        core.coolant_mass_lbm += delta_mass;
        core.ledger_net_lbm += delta_mass;

        core.tick += 1;
        core.time_hours += dt;

        // Unit sequencing
        if core.auto_unit_start
            && core.two_phase
            && core.units < p.max_auto_units
            && core.pressure_psia >= p.unit_permissive_psia
            && core
                .last_unit_start
                .map_or(true, |t| core.time_hours - t >= p.unit_start_interval_hours - 1e-9)
        {
            core.units += 1;
            core.pressure_psia -= p.unit_start_kick_psi;
            core.last_unit_start = Some(core.time_hours);
            debug!(units = core.units, t = core.time_hours, "transport unit started");
        }

        core.ownership
            .reassign(classify(core.units, core.two_phase), core.tick);
        core.pressure_noise = core.noise.symmetric(p.pressure_noise_psi);

        for (quantity, value) in [
            ("pressure", core.pressure_psia),
            ("rcs_temp", core.rcs_temp_f),
            ("coolant_mass", core.coolant_mass_lbm),
        ] {
            if !value.is_finite() {
                return Err(EngineError::NumericFault {
                    quantity,
                    tick: core.tick,
                    value,
                });
            }
        }
        trace!(tick = core.tick, pressure = core.pressure_psia, temp = core.rcs_temp_f, "advanced");
        Ok(())
    }

    fn state(&self) -> PlantState {
        let Some(core) = self.core.as_ref() else {
            return PlantState::default();
        };
        let p = &self.params;
        let writer = core.ownership.reported();
        let projected_writer = if writer.is_sentinel() {
            writer
        } else {
            classify(core.units, core.two_phase)
        };
        let mode = if core.units > 0 {
            PlantMode::ForcedCirculation
        } else if core.two_phase {
            PlantMode::BubblePressureControl
        } else {
            PlantMode::SolidPressureControl
        };
        PlantState {
            time_hours: core.time_hours,
            pressure_psia: core.pressure_psia + core.pressure_noise,
            rcs_temp_f: core.rcs_temp_f,
            pzr_temp_f: core.pzr_temp_f,
            heatup_rate_f_per_hr: core.heatup_rate,
            transport_flow_gpm: core.units as f64 * p.flow_per_unit_gpm,
            injection_flow_gpm: core.injection_gpm,
            letdown_flow_gpm: core.letdown_gpm,
            net_boundary_flow_gpm: core.injection_gpm - core.letdown_gpm,
            surge_flow_gpm: p.surge_gpm_per_f_per_hr * core.heatup_rate,
            coolant_mass_lbm: core.coolant_mass_lbm,
            aux_heat_kw: if core.aux_heat { p.aux_heat_kw } else { 0.0 },
            transport_units: core.units,
            two_phase: core.two_phase,
            solid: !core.two_phase,
            writer,
            mode,
            projection: Projection {
                pressure_psia: core.pressure_psia,
                coolant_mass_lbm: core.ledger_start_lbm + core.ledger_net_lbm,
                writer: projected_writer,
                transport_units: core.units,
                two_phase: core.bubble_formed_at.is_some(),
            },
        }
    }

    fn command_transport_units(&mut self, units: u32) {
        self.set_units(units);
    }

    fn command_boundary_flows(&mut self, injection_gpm: f64, letdown_gpm: f64) {
        if let Some(core) = self.core.as_mut() {
            core.injection_gpm = injection_gpm;
            core.letdown_gpm = letdown_gpm;
        }
    }

    fn command_aux_heat(&mut self, enabled: bool) {
        if let Some(core) = self.core.as_mut() {
            core.aux_heat = enabled;
        }
    }

    fn apply_state_write(&mut self, write: &StateWrite) -> bool {
        let Some(core) = self.core.as_mut() else {
            return false;
        };
        self.counters.writes += 1;
        if self.auditing && !write.state_derived {
            self.counters.override_attempts += 1;
            if self.params.enforce_audit {
                self.counters.blocked_overrides += 1;
                debug!(source = %write.source, "override refused inside audit window");
                return false;
            }
        }
        match write.target {
            WriteTarget::Pressure => core.pressure_psia = write.value,
            WriteTarget::CoolantMass => core.coolant_mass_lbm = write.value,
        }
        true
    }

    fn begin_audit(&mut self) {
        self.auditing = true;
    }

    fn end_audit(&mut self) {
        self.auditing = false;
    }

    fn audit_counters(&self) -> AuditCounters {
        self.counters
    }
}

#[cfg(test)]
mod tests;
