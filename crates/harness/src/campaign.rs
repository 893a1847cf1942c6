//! Campaign orchestration.
//!
//! Runs the catalogue in a fixed order against one engine, handing the
//! engine back through a fresh `initialize` between scenarios:
//!
//! ```text
//! preflight -> isolated_hold -> isolated_hold_repeat -> validity gate
//!           -> stress_cycling -> transition_window -> verdicts
//! ```
//!
//! Fatal conditions abort with a [`HarnessError`]. Everything else,
//! including an invalid run, still yields a complete [`Report`].

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{info, instrument, warn};

use fidelity_foundation::CheckId;
use fidelity_runtime::{PlantConfig, PlantEngine, ScenarioRunner, ENGINE_INTERFACE_VERSION};

use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};
use crate::repeatability::RepeatabilityReport;
use crate::scenario::{ScenarioKind, ScenarioPlan, ScenarioSummary};
use crate::validity::{RunValidity, ValidityEvaluator};
use crate::verdict::{
    CampaignResults, CheckVerdict, Decision, Recommendation, VerdictEngine, CHECKS,
};
use crate::writer::WriterReport;

/// Structured campaign output. Carries no formatting.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub seed: u64,
    pub dt_hours: f64,
    pub validity: RunValidity,
    pub decision: Decision,
    pub checks: IndexMap<CheckId, CheckVerdict>,
    pub scenarios: Vec<ScenarioSummary>,
    pub writer: IndexMap<String, WriterReport>,
    pub repeatability: RepeatabilityReport,
}

impl Report {
    pub fn recommendation(&self) -> Recommendation {
        self.decision.recommendation
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Campaign {
    config: HarnessConfig,
}

impl Campaign {
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Check the engine contract before any scenario runs.
    pub fn preflight(&self, engine: &mut dyn PlantEngine, config: &PlantConfig) -> Result<()> {
        let found = engine.interface_version();
        if found != ENGINE_INTERFACE_VERSION {
            return Err(HarnessError::InterfaceMismatch {
                expected: ENGINE_INTERFACE_VERSION,
                found,
            });
        }
        engine
            .initialize(config)
            .map_err(HarnessError::EngineUnavailable)
    }

    #[instrument(skip_all, fields(seed = self.config.seed))]
    pub fn run(&self, engine: &mut dyn PlantEngine) -> Result<Report> {
        let config = &self.config;
        config.validate()?;

        let plan = |kind| ScenarioPlan::for_kind(kind, config);
        let hold_plan = plan(ScenarioKind::IsolatedHold);
        self.preflight(engine, &hold_plan.spec.config)?;

        let runner = ScenarioRunner::new(config.max_steps);
        let hold = hold_plan.execute(&runner, engine, config)?;
        let hold_repeat = plan(ScenarioKind::IsolatedHoldRepeat).execute(&runner, engine, config)?;

        let validity =
            ValidityEvaluator::from_config(config).evaluate(&hold, engine, &hold_plan.spec.config)?;
        if !validity.is_valid {
            warn!(reason = %validity.reason(), "run invalid; checks will report NO_DATA");
        }

        let cycling = plan(ScenarioKind::StressCycling).execute(&runner, engine, config)?;
        let transition = plan(ScenarioKind::TransitionWindow).execute(&runner, engine, config)?;

        let repeatability = RepeatabilityReport::compare(
            hold.samples(),
            hold_repeat.samples(),
            config.repeatability_epsilon,
        );
        let results = CampaignResults {
            hold: &hold,
            cycling: &cycling,
            transition: &transition,
            repeatability: &repeatability,
        };
        let degradation = results.repeatability_degradation();
        let assessed: Vec<_> = CHECKS
            .iter()
            .map(|definition| (*definition, results.assess(definition.id, &config.thresholds)))
            .collect();
        let verdicts =
            VerdictEngine::new(&config.policy).decide(&validity, &assessed, degradation.as_deref());

        info!(
            recommendation = %verdicts.decision.recommendation,
            reason = %verdicts.decision.reason,
            "campaign finished"
        );

        let scenarios = [&hold, &hold_repeat, &cycling, &transition];
        Ok(Report {
            generated_at: Utc::now(),
            seed: config.seed,
            dt_hours: config.dt_hours,
            validity,
            decision: verdicts.decision,
            checks: verdicts.checks,
            scenarios: scenarios.iter().map(|s| s.summary().clone()).collect(),
            writer: scenarios
                .iter()
                .map(|s| (s.kind().name().to_string(), s.writer().clone()))
                .collect(),
            repeatability,
        })
    }
}
