//! Fidelity Foundation
//!
//! Core utilities shared by the validation harness crates.
//! Provides stable hashing, typed identifiers, the explicit seeded
//! random stream, and time-grid helpers.

pub mod ids;
pub mod rng;
pub mod stable_hash;

pub use ids::{CheckId, ScenarioId, SourceLabel};
pub use rng::RngStream;
pub use stable_hash::{fnv1a64, fnv1a64_mix, fnv1a64_str, FNV1A_OFFSET_BASIS_64, FNV1A_PRIME_64};

/// Simulation timestep in hours.
///
/// The engine contract and every scenario descriptor express time in hours.
pub type DtHours = f64;

/// Smallest time span used as a divisor when computing rates.
pub const TIME_EPSILON_HOURS: f64 = 1e-9;

/// Round a simulated time onto the fixed step grid.
///
/// Two samples whose times land on the same grid index are considered to
/// describe the same simulated instant.
#[inline]
pub fn grid_index(time_hours: f64, dt: DtHours) -> i64 {
    if dt <= 0.0 || !dt.is_finite() {
        return 0;
    }
    (time_hours / dt).round() as i64
}

/// Number of whole steps needed to cover `hours` at step size `dt`.
#[inline]
pub fn steps_for(hours: f64, dt: DtHours) -> usize {
    if dt <= 0.0 || !dt.is_finite() || hours <= 0.0 {
        return 0;
    }
    (hours / dt).round() as usize
}
