//! Integration test harness for the fidelity campaign.
//!
//! Wraps a [`HarnessConfig`] and the reference plant so end-to-end tests
//! can tweak one knob and run the full pipeline:
//! Configure → Run scenarios → Gate validity → Decide verdicts.

use fidelity_harness::{
    Campaign, CheckStatus, HarnessConfig, HarnessError, Report, ScenarioKind, ScenarioPlan,
    ScenarioResult,
};
use fidelity_plant::{PlantParameters, ReferencePlant};
use fidelity_runtime::{PlantEngine, ScenarioRunner};

/// Test harness for running campaigns against the reference plant.
#[derive(Debug, Clone, Default)]
pub struct TestHarness {
    config: HarnessConfig,
    params: PlantParameters,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adjust the harness configuration.
    pub fn configure(mut self, f: impl FnOnce(&mut HarnessConfig)) -> Self {
        f(&mut self.config);
        self
    }

    /// Adjust the reference plant's parameters.
    pub fn plant(mut self, f: impl FnOnce(&mut PlantParameters)) -> Self {
        f(&mut self.params);
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn engine(&self) -> ReferencePlant {
        ReferencePlant::with_parameters(self.params.clone())
    }

    /// Run the campaign, returning fatal errors.
    pub fn try_run(&self) -> Result<Report, HarnessError> {
        self.try_run_with(&mut self.engine())
    }

    /// Run the campaign against a caller-supplied engine.
    pub fn try_run_with(&self, engine: &mut dyn PlantEngine) -> Result<Report, HarnessError> {
        Campaign::new(self.config.clone()).run(engine)
    }

    /// Run the campaign.
    ///
    /// # Panics
    ///
    /// Panics if the campaign hits a fatal error.
    pub fn run(&self) -> Report {
        match self.try_run() {
            Ok(report) => report,
            Err(e) => panic!("campaign failed: {e}"),
        }
    }

    /// Run one scenario from the catalogue on a fresh engine.
    ///
    /// # Panics
    ///
    /// Panics if the run fails.
    pub fn scenario(&self, kind: ScenarioKind) -> ScenarioResult {
        let plan = ScenarioPlan::for_kind(kind, &self.config);
        let runner = ScenarioRunner::new(self.config.max_steps);
        match plan.execute(&runner, &mut self.engine(), &self.config) {
            Ok(result) => result,
            Err(e) => panic!("scenario {kind} failed: {e}"),
        }
    }
}

/// Status of `id` in `report`.
///
/// # Panics
///
/// Panics if the check is missing.
pub fn status(report: &Report, id: &str) -> CheckStatus {
    match report.checks.get(&fidelity_foundation::CheckId::from(id)) {
        Some(verdict) => verdict.status,
        None => panic!("check {id} missing from report"),
    }
}
