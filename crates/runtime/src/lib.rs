//! Fidelity Runtime
//!
//! Drives an external plant engine through fixed time steps and captures
//! the ordered sample sequence every downstream check reads.

pub mod engine;
pub mod enforcement;
pub mod error;
pub mod runner;
pub mod termination;
pub mod types;

pub use engine::{PlantEngine, ENGINE_INTERFACE_VERSION};
pub use enforcement::{
    ChannelForcing, Enforcement, EnforcementContext, ForcedWrite, StepPhase, UnitForcing,
};
pub use error::{EngineError, Result, RunError};
pub use runner::{RunOutcome, RunSpec, ScenarioRunner, DEFAULT_MAX_STEPS};
pub use termination::{
    Condition, CountEdge, EdgeDirection, Progress, Termination, TerminationTracker,
};
pub use types::*;
