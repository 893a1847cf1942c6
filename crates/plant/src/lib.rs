//! Reference Plant
//!
//! A small lumped-parameter coolant-system model that implements the
//! [`PlantEngine`] contract. It exists so the harness can be exercised end to
//! end: it heats and cools, draws a steam bubble, runs a pressure controller
//! with a deadband, starts transport units on its own permissives, and keeps
//! a derived-state projection next to its directly reported fields.
//!
//! The model is deterministic: identical configuration and command sequences
//! reproduce identical states. Measurement noise comes from a stream derived
//! from the configured seed.

mod ownership;
mod params;
mod plant;

pub use ownership::{classify, Ownership};
pub use params::PlantParameters;
pub use plant::{saturation_temp_f, ReferencePlant};
