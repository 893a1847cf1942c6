//! Runtime errors
//!
//! Engine faults and runner faults are errors. Hitting the step cap is not:
//! it is reported through [`crate::RunOutcome::completed`].

use thiserror::Error;

use fidelity_foundation::DtHours;

/// Runtime result type
pub type Result<T> = std::result::Result<T, RunError>;

/// Faults raised by an engine implementing [`crate::PlantEngine`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("engine used before initialize()")]
    NotInitialized,

    #[error("invalid plant configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid step size: {dt} h")]
    InvalidStep { dt: DtHours },

    #[error("non-finite {quantity} after step {tick}: {value}")]
    NumericFault {
        quantity: &'static str,
        tick: u64,
        value: f64,
    },
}

/// Faults raised while running a scenario.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("engine fault: {0}")]
    Engine(#[from] EngineError),

    #[error("step size must be positive and finite, got {0}")]
    InvalidDt(DtHours),
}
