//! End-to-end tests for the fidelity campaign.
//!
//! Each test runs the full pipeline against the reference plant:
//! scenarios → validity gate → verdicts → recommendation.

use std::io::Write;

use fidelity_harness::{
    CheckStatus, HarnessConfig, HarnessError, Recommendation, ScenarioKind, CHECKS,
};
use fidelity_plant::ReferencePlant;
use fidelity_runtime::{
    AuditCounters, EngineError, PlantConfig, PlantEngine, PlantState, StateWrite, UnitForcing,
    WriterTag,
};
use fidelity_tests::{status, TestHarness};

/// Three-hour isolated hold at dt = 1/360 h with every perturbation forced
/// off closes the campaign.
#[test]
fn test_isolated_hold_closes() {
    let report = TestHarness::new().run();

    let hold = &report.scenarios[0];
    assert_eq!(hold.kind, ScenarioKind::IsolatedHold);
    assert_eq!(hold.step_count, 1080);
    assert_eq!(hold.sample_count, 1081);
    assert_eq!(hold.max_transport_units, 0);
    assert!(hold.rcs_temp_slope_f_per_hr.abs() <= 0.25);
    assert!(hold.mass_drift_lbm <= 5.0);
    assert!(hold.pressure_peak_to_peak >= 3.0 && hold.pressure_peak_to_peak <= 25.0);

    for id in [
        "hold.isolation",
        "hold.thermal_drift",
        "hold.mass_conservation",
        "hold.pressure_band",
        "hold.projection_parity",
    ] {
        assert_eq!(status(&report, id), CheckStatus::Pass, "{id}");
    }
    assert!(report.validity.is_valid);
    assert_eq!(report.recommendation(), Recommendation::CloseRecommended);
    assert_eq!(report.decision.reason, "all 12 checks passed");
}

/// A single forced unit start during the hold invalidates the whole run.
#[test]
fn test_unit_pulse_invalidates_run() {
    let report = TestHarness::new()
        .configure(|c| {
            c.hold.forcing = c.hold.forcing.clone().with_units(UnitForcing::Pulse {
                base: 0,
                pulse_units: 1,
                at_step: 500,
                width_steps: 1,
            });
        })
        .run();

    assert!(!report.validity.is_valid);
    assert_eq!(report.recommendation(), Recommendation::InvalidRun);
    assert!(report.decision.reason.contains("transport unit count"));
    assert_eq!(report.checks.len(), CHECKS.len());
    assert!(report
        .checks
        .values()
        .all(|v| v.status == CheckStatus::NoData && v.blocking));
}

/// An engine that accepts overrides inside an audit window is a fatal
/// configuration error, not an invalid run.
#[test]
fn test_accepted_probe_aborts() {
    let err = TestHarness::new()
        .plant(|p| p.enforce_audit = false)
        .try_run()
        .unwrap_err();
    assert!(matches!(err, HarnessError::ProbeNotRejected { .. }));
}

#[test]
fn test_repeated_campaigns_are_identical() {
    let harness = TestHarness::new().configure(|c| c.hold.hours = 3.0);
    let a = harness.run();
    let b = harness.run();
    assert!(a.repeatability.identical());
    assert_eq!(a.repeatability.digest_a, b.repeatability.digest_a);

    let other = TestHarness::new().configure(|c| c.seed = 7).run();
    assert_ne!(a.repeatability.digest_a, other.repeatability.digest_a);
    assert_eq!(other.recommendation(), Recommendation::CloseRecommended);
}

/// Without automatic unit starts the transition never reaches its edge.
/// The pump-start check is a named NOT_REACHED exception and does not block.
#[test]
fn test_missing_pump_start_is_waived() {
    let harness = TestHarness::new().configure(|c| {
        c.transition.auto_unit_start = false;
        c.max_steps = 2000;
    });
    let report = harness.run();

    assert_eq!(status(&report, "transition.pump_start_transient"), CheckStatus::NotReached);
    assert_eq!(status(&report, "transition.bubble_formation"), CheckStatus::Pass);
    assert_eq!(report.recommendation(), Recommendation::CloseRecommended);
    assert!(report
        .decision
        .reason
        .contains("transition.pump_start_transient=NOT_REACHED"));

    let strict = harness.configure(|c| c.policy = fidelity_harness::BlockingPolicy::strict());
    let report = strict.run();
    assert_eq!(report.recommendation(), Recommendation::RemediationRequired);
}

#[test]
fn test_tight_pressure_band_requires_remediation() {
    let report = TestHarness::new()
        .configure(|c| c.thresholds.pressure_band_max_psi = 5.0)
        .run();
    assert_eq!(status(&report, "hold.pressure_band"), CheckStatus::Fail);
    assert_eq!(report.recommendation(), Recommendation::RemediationRequired);
    assert_eq!(report.decision.reason, "blocking: hold.pressure_band=FAIL");
}

#[test]
fn test_cycling_writer_reinitializes_on_every_stop() {
    let cycling = TestHarness::new().scenario(ScenarioKind::StressCycling);
    let tags: Vec<WriterTag> = cycling.samples().iter().map(|s| s.writer()).collect();
    let stops = cycling
        .samples()
        .windows(2)
        .filter(|w| w[0].plant.transport_units > 0 && w[1].plant.transport_units == 0)
        .count();
    let inits = tags.windows(2).filter(|w| w[0] == WriterTag::FullyCoupled && w[1] == WriterTag::Init).count();
    assert_eq!(stops, 4);
    assert_eq!(inits, stops);
    assert!(cycling.writer().writer_rule_pass);
    assert_eq!(cycling.writer().conflict_count, 0);
}

#[test]
fn test_transition_ownership_climbs() {
    let transition = TestHarness::new().scenario(ScenarioKind::TransitionWindow);
    let mut ranked: Vec<WriterTag> = transition
        .samples()
        .iter()
        .map(|s| s.writer())
        .filter(|t| !t.is_sentinel())
        .collect();
    ranked.dedup();
    assert_eq!(
        ranked,
        vec![
            WriterTag::SolidIsolated,
            WriterTag::BubbleIsolated,
            WriterTag::PartialCoupled,
            WriterTag::FullyCoupled,
        ]
    );
}

/// Wraps the reference plant and nudges reported pressure on one chosen
/// initialization, so one hold run drifts from the other.
struct DriftingPlant {
    inner: ReferencePlant,
    drift_on: usize,
    initializations: usize,
    offset: f64,
}

impl PlantEngine for DriftingPlant {
    fn interface_version(&self) -> u32 {
        self.inner.interface_version()
    }
    fn initialize(&mut self, config: &PlantConfig) -> Result<(), EngineError> {
        self.initializations += 1;
        self.offset = if self.initializations == self.drift_on { 1e-7 } else { 0.0 };
        self.inner.initialize(config)
    }
    fn advance(&mut self, dt_hours: f64) -> Result<(), EngineError> {
        self.inner.advance(dt_hours)
    }
    fn state(&self) -> PlantState {
        let mut state = self.inner.state();
        state.pressure_psia += self.offset;
        state
    }
    fn command_transport_units(&mut self, units: u32) {
        self.inner.command_transport_units(units)
    }
    fn command_boundary_flows(&mut self, injection_gpm: f64, letdown_gpm: f64) {
        self.inner.command_boundary_flows(injection_gpm, letdown_gpm)
    }
    fn command_aux_heat(&mut self, enabled: bool) {
        self.inner.command_aux_heat(enabled)
    }
    fn apply_state_write(&mut self, write: &StateWrite) -> bool {
        self.inner.apply_state_write(write)
    }
    fn begin_audit(&mut self) {
        self.inner.begin_audit()
    }
    fn end_audit(&mut self) {
        self.inner.end_audit()
    }
    fn audit_counters(&self) -> AuditCounters {
        self.inner.audit_counters()
    }
}

/// Preflight, hold, then the repeat: the third initialization drifts.
#[test]
fn test_repeatability_breach_is_conditional() {
    let harness = TestHarness::new();
    let mut engine = DriftingPlant {
        inner: harness.engine(),
        drift_on: 3,
        initializations: 0,
        offset: 0.0,
    };
    let report = harness.try_run_with(&mut engine).unwrap();

    assert!(!report.repeatability.within_tolerance());
    assert_eq!(report.repeatability.discrete_mismatches, 0);
    assert_eq!(status(&report, "determinism.repeatability"), CheckStatus::Conditional);
    assert_eq!(status(&report, "hold.thermal_drift"), CheckStatus::Conditional);
    assert_eq!(status(&report, "cycling.surge_coupling"), CheckStatus::Pass);
    assert_eq!(report.recommendation(), Recommendation::CloseRecommended);
    assert!(report.decision.reason.starts_with("no blocking checks; waived:"));
}

#[test]
fn test_report_serializes_in_check_order() {
    let report = TestHarness::new().configure(|c| c.cycling.hours = 1.0).run();
    let text = report.to_json().unwrap();
    let positions: Vec<usize> = CHECKS
        .iter()
        .map(|c| text.find(&format!("\"{}\": {{", c.id)).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));

    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["checks"].as_object().unwrap().len(), CHECKS.len());
    assert_eq!(json["decision"]["recommendation"], "CLOSE_RECOMMENDED");
    assert!(json["generated_at"].as_str().is_some());
    assert_eq!(json["repeatability"]["digest_a"].as_str().unwrap().len(), 64);
}

#[test]
fn test_campaign_from_yaml_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "apiVersion: fidelity/v1\nkind: Harness\nthresholds:\n  holdTempSlopeFPerHr: 0.01\n"
    )
    .unwrap();
    let config = HarnessConfig::load(file.path()).unwrap();
    let report = TestHarness::new().configure(|c| *c = config).run();
    assert_eq!(status(&report, "hold.thermal_drift"), CheckStatus::Fail);
    assert_eq!(report.recommendation(), Recommendation::RemediationRequired);
}
