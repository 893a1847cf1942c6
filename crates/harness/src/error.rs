//! Harness errors.
//!
//! Only conditions that make the whole run untrustworthy are errors.
//! Incomplete scenarios, invalid runs and writer issues are reported as data.

use std::path::PathBuf;

use fidelity_foundation::SourceLabel;
use fidelity_runtime::{EngineError, RunError};

pub type Result<T> = std::result::Result<T, HarnessError>;

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("engine interface version {found} does not match expected {expected}")]
    InterfaceMismatch { expected: u32, found: u32 },

    #[error("engine could not be initialized: {0}")]
    EngineUnavailable(EngineError),

    #[error("audit probe from '{label}' was accepted; override enforcement cannot be trusted")]
    ProbeNotRejected { label: SourceLabel },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("scenario run failed: {0}")]
    Run(#[from] RunError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid apiVersion: expected 'fidelity/v1', got '{0}'")]
    InvalidApiVersion(String),

    #[error("invalid kind: expected 'Harness', got '{0}'")]
    InvalidKind(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
