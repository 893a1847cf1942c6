use super::*;

use fidelity_runtime::{PlantConfig, StateWrite};

const DT: f64 = 1.0 / 360.0;

fn solid_hold() -> PlantConfig {
    PlantConfig::default()
}

fn bubble_with_units(units: u32) -> PlantConfig {
    PlantConfig {
        two_phase: true,
        pressure_psia: 420.0,
        rcs_temp_f: 200.0,
        transport_units: units,
        ..PlantConfig::default()
    }
}

fn initialized(config: &PlantConfig) -> ReferencePlant {
    let mut plant = ReferencePlant::new();
    plant.initialize(config).unwrap();
    plant
}

fn advance_n(plant: &mut ReferencePlant, steps: usize) {
    for _ in 0..steps {
        plant.advance(DT).unwrap();
    }
}

#[test]
fn saturation_curve_is_monotonic() {
    assert!(saturation_temp_f(400.0) > saturation_temp_f(350.0));
    assert!((saturation_temp_f(10_000.0) - 1000.0).abs() < 1e-9);
}

#[test]
fn uninitialized_plant_reports_unset() {
    let mut plant = ReferencePlant::new();
    assert_eq!(plant.state().writer, WriterTag::Unset);
    assert_eq!(plant.advance(DT), Err(EngineError::NotInitialized));
    assert!(!plant.apply_state_write(&StateWrite::pressure(400.0, "test", true)));
}

#[test]
fn invalid_config_is_rejected() {
    let mut plant = ReferencePlant::new();
    let config = PlantConfig {
        dt_hours: 0.0,
        ..PlantConfig::default()
    };
    assert!(matches!(
        plant.initialize(&config),
        Err(EngineError::InvalidConfig(_))
    ));

    let config = PlantConfig {
        rcs_temp_f: f64::NAN,
        ..PlantConfig::default()
    };
    assert!(matches!(
        plant.initialize(&config),
        Err(EngineError::InvalidConfig(_))
    ));
}

#[test]
fn invalid_step_is_rejected() {
    let mut plant = initialized(&solid_hold());
    assert!(matches!(
        plant.advance(-1.0),
        Err(EngineError::InvalidStep { .. })
    ));
}

#[test]
fn same_seed_same_trajectory() {
    let mut a = initialized(&solid_hold());
    let mut b = initialized(&solid_hold());
    for _ in 0..200 {
        a.advance(DT).unwrap();
        b.advance(DT).unwrap();
        assert_eq!(a.state(), b.state());
    }
}

#[test]
fn different_seed_changes_only_noise() {
    let mut a = initialized(&solid_hold());
    let mut b = initialized(&PlantConfig {
        seed: 7,
        ..solid_hold()
    });
    advance_n(&mut a, 50);
    advance_n(&mut b, 50);
    assert_ne!(a.state().pressure_psia, b.state().pressure_psia);
    assert_eq!(a.state().projection, b.state().projection);
}

#[test]
fn solid_hold_stays_in_controller_band() {
    let mut plant = initialized(&solid_hold());
    let mut min = f64::MAX;
    let mut max = f64::MIN;
    for _ in 0..1080 {
        plant.advance(DT).unwrap();
        let p = plant.state().pressure_psia;
        min = min.min(p);
        max = max.max(p);
    }
    assert!(min > 340.0 && max < 360.0, "band [{min}, {max}]");
    assert!(max - min > 8.0 && max - min < 12.0);
    let state = plant.state();
    assert!(state.rcs_temp_f < 160.0 && state.rcs_temp_f > 159.8);
    assert_eq!(state.coolant_mass_lbm, 550_000.0);
    assert_eq!(state.writer, WriterTag::SolidIsolated);
}

#[test]
fn initial_writer_is_init_until_one_step_passes() {
    let mut plant = initialized(&solid_hold());
    assert_eq!(plant.state().writer, WriterTag::Init);
    plant.advance(DT).unwrap();
    assert_eq!(plant.state().writer, WriterTag::Init);
    plant.advance(DT).unwrap();
    assert_eq!(plant.state().writer, WriterTag::SolidIsolated);
}

#[test]
fn unit_stop_passes_through_init() {
    let mut plant = initialized(&bubble_with_units(2));
    advance_n(&mut plant, 3);
    assert_eq!(plant.state().writer, WriterTag::FullyCoupled);

    plant.command_transport_units(0);
    assert_eq!(plant.state().writer, WriterTag::Init);
    plant.advance(DT).unwrap();
    assert_eq!(plant.state().writer, WriterTag::Init);
    plant.advance(DT).unwrap();
    assert_eq!(plant.state().writer, WriterTag::BubbleIsolated);
}

#[test]
fn unit_start_takes_ownership_immediately() {
    let mut plant = initialized(&bubble_with_units(0));
    advance_n(&mut plant, 3);
    assert_eq!(plant.state().writer, WriterTag::BubbleIsolated);

    let before = plant.state().projection.pressure_psia;
    plant.command_transport_units(1);
    let state = plant.state();
    assert_eq!(state.writer, WriterTag::PartialCoupled);
    assert_eq!(state.mode, PlantMode::ForcedCirculation);
    assert!((before - state.projection.pressure_psia - 2.0).abs() < 1e-9);
    assert_eq!(state.transport_flow_gpm, 90_000.0);
}

#[test]
fn bubble_forms_under_heaters() {
    let mut plant = initialized(&PlantConfig {
        pzr_temp_f: 380.0,
        bubble_heaters: true,
        ..PlantConfig::default()
    });
    advance_n(&mut plant, 720);
    let state = plant.state();
    assert!(state.two_phase);
    assert!(!state.solid);
    assert_eq!(state.writer, WriterTag::BubbleIsolated);
    assert_eq!(state.mode, PlantMode::BubblePressureControl);
}

#[test]
fn auto_start_sequences_two_units() {
    let mut plant = initialized(&PlantConfig {
        pzr_temp_f: 380.0,
        bubble_heaters: true,
        auto_unit_start: true,
        ..PlantConfig::default()
    });
    let mut starts = Vec::new();
    let mut units = 0;
    for _ in 0..1440 {
        plant.advance(DT).unwrap();
        let state = plant.state();
        if state.transport_units > units {
            starts.push(state.time_hours);
            units = state.transport_units;
        }
    }
    assert_eq!(units, 2);
    assert_eq!(starts.len(), 2);
    assert!(starts[1] - starts[0] >= 0.25 - 1e-6);
}

#[test]
fn boundary_flows_move_mass_and_ledger_together() {
    let mut plant = initialized(&solid_hold());
    plant.command_boundary_flows(10.0, 4.0);
    advance_n(&mut plant, 36);
    let state = plant.state();
    assert!((state.coolant_mass_lbm - 550_300.0).abs() < 1e-6);
    assert!((state.projection.coolant_mass_lbm - state.coolant_mass_lbm).abs() < 1e-6);
    assert_eq!(state.net_boundary_flow_gpm, 6.0);
}

#[test]
fn overrides_are_refused_inside_audit_window() {
    let mut plant = initialized(&solid_hold());
    assert!(plant.apply_state_write(&StateWrite::pressure(360.0, "outside", false)));

    plant.begin_audit();
    assert!(!plant.apply_state_write(&StateWrite::pressure(500.0, "probe", false)));
    assert!(plant.apply_state_write(&StateWrite::pressure(352.0, "derived", true)));
    plant.end_audit();

    let counters = plant.audit_counters();
    assert_eq!(counters.writes, 3);
    assert_eq!(counters.override_attempts, 1);
    assert_eq!(counters.blocked_overrides, 1);
    assert_eq!(counters.leaked_overrides(), 0);
    assert_eq!(plant.state().projection.pressure_psia, 352.0);
}

#[test]
fn broken_audit_leaks_overrides() {
    let mut plant = ReferencePlant::with_parameters(PlantParameters {
        enforce_audit: false,
        ..PlantParameters::default()
    });
    plant.initialize(&solid_hold()).unwrap();
    plant.begin_audit();
    assert!(plant.apply_state_write(&StateWrite::pressure(500.0, "probe", false)));
    assert_eq!(plant.audit_counters().leaked_overrides(), 1);
}

#[test]
fn initialize_resets_audit_state() {
    let mut plant = initialized(&solid_hold());
    plant.begin_audit();
    plant.apply_state_write(&StateWrite::pressure(500.0, "probe", false));
    plant.initialize(&solid_hold()).unwrap();
    assert_eq!(plant.audit_counters(), AuditCounters::default());
    // No longer auditing: overrides go through uncounted.
    assert!(plant.apply_state_write(&StateWrite::pressure(500.0, "probe", false)));
    assert_eq!(plant.audit_counters().override_attempts, 0);
}
