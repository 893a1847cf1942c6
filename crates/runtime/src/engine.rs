//! The engine contract.
//!
//! The harness talks to a physics engine only through [`PlantEngine`]. The
//! trait is the explicit, versioned surface an engine implements on purpose
//! for validation; nothing reaches into engine internals.
//!
//! # Version
//!
//! [`ENGINE_INTERFACE_VERSION`] is bumped whenever a method is added or its
//! meaning changes. The harness refuses to run against an engine reporting a
//! different version.

use fidelity_foundation::DtHours;

use crate::error::EngineError;
use crate::types::{AuditCounters, PlantConfig, PlantState, StateWrite};

/// Current version of the engine contract.
pub const ENGINE_INTERFACE_VERSION: u32 = 1;

/// A deterministic, step-driven plant engine.
///
/// Implementations must reproduce identical state sequences for identical
/// configurations and identical command sequences.
pub trait PlantEngine {
    /// Contract version this engine implements.
    fn interface_version(&self) -> u32;

    /// Full state reset from a deterministic configuration.
    fn initialize(&mut self, config: &PlantConfig) -> Result<(), EngineError>;

    /// Exactly one deterministic step of `dt_hours`.
    fn advance(&mut self, dt_hours: DtHours) -> Result<(), EngineError>;

    /// Read every tracked quantity.
    fn state(&self) -> PlantState;

    /// Set the number of running transport units.
    fn command_transport_units(&mut self, units: u32);

    /// Set boundary injection and letdown flows.
    fn command_boundary_flows(&mut self, injection_gpm: f64, letdown_gpm: f64);

    /// Switch auxiliary heat sources.
    fn command_aux_heat(&mut self, enabled: bool);

    /// Tagged override of a tracked quantity. Returns whether the engine
    /// accepted it. Non-state-derived writes must be refused while an audit
    /// window is open.
    fn apply_state_write(&mut self, write: &StateWrite) -> bool;

    /// Open the window in which override rejection is enforced.
    fn begin_audit(&mut self);

    /// Close the audit window.
    fn end_audit(&mut self);

    /// Write, override and blocked counters since `initialize`.
    fn audit_counters(&self) -> AuditCounters;
}
