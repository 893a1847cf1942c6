//! Fidelity Harness
//!
//! Turns scenario runs against a plant engine into trusted acceptance
//! verdicts.
//!
//! - [`metrics`] tracks (direct, projected) pairs against tolerances
//! - [`series`] derives slopes, step deltas, sign consistency and extrema
//! - [`writer`] checks the writer-ownership transition machine
//! - [`scenario`] holds the scenario catalogue and frozen results
//! - [`validity`] gates every conclusion behind the isolated hold
//! - [`verdict`] and [`policy`] fold checks into one recommendation
//! - [`campaign`] runs the whole thing in order

pub mod campaign;
pub mod config;
pub mod error;
pub mod metrics;
pub mod policy;
pub mod repeatability;
pub mod scenario;
pub mod series;
pub mod validity;
pub mod verdict;
pub mod writer;

pub use campaign::{Campaign, Report};
pub use config::HarnessConfig;
pub use error::{ConfigError, HarnessError, Result};
pub use metrics::{DiscreteMetric, FloatMetric, ParityTolerances, ParityTracker};
pub use policy::BlockingPolicy;
pub use repeatability::RepeatabilityReport;
pub use scenario::{ScenarioKind, ScenarioPlan, ScenarioResult, ScenarioSummary};
pub use validity::{RunValidity, ValidityEvaluator};
pub use verdict::{
    CheckDefinition, CheckStatus, CheckVerdict, Decision, Recommendation, VerdictEngine, Verdicts,
    CHECKS,
};
pub use writer::{WriterLegality, WriterReport};
