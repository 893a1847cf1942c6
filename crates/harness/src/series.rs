//! Time-series statistics over sample sequences.
//!
//! Every function takes a field selector so the same analysis serves any
//! channel. None of them allocate or mutate.

use serde::Serialize;

use fidelity_foundation::TIME_EPSILON_HOURS;
use fidelity_runtime::Sample;

/// Rate of change from the first to the last sample, per hour.
pub fn slope(samples: &[Sample], f: impl Fn(&Sample) -> f64) -> f64 {
    let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
        return 0.0;
    };
    let span = (last.time_hours() - first.time_hours()).max(TIME_EPSILON_HOURS);
    (f(last) - f(first)) / span
}

/// Largest absolute change between consecutive samples.
pub fn max_step_delta(samples: &[Sample], f: impl Fn(&Sample) -> f64) -> f64 {
    samples
        .windows(2)
        .map(|pair| (f(&pair[1]) - f(&pair[0])).abs())
        .fold(0.0, f64::max)
}

/// Fraction of qualifying samples where `a` and `b` share a sign.
///
/// A sample qualifies when both magnitudes exceed `floor`. With no
/// qualifying sample the pair is vacuously consistent.
pub fn sign_consistency(
    samples: &[Sample],
    a: impl Fn(&Sample) -> f64,
    b: impl Fn(&Sample) -> f64,
    floor: f64,
) -> SignConsistency {
    let mut qualifying = 0usize;
    let mut agreeing = 0usize;
    for sample in samples {
        let (va, vb) = (a(sample), b(sample));
        if va.abs() > floor && vb.abs() > floor {
            qualifying += 1;
            if va.signum() == vb.signum() {
                agreeing += 1;
            }
        }
    }
    SignConsistency {
        qualifying,
        agreeing,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SignConsistency {
    pub qualifying: usize,
    pub agreeing: usize,
}

impl SignConsistency {
    pub fn ratio(&self) -> f64 {
        if self.qualifying == 0 {
            1.0
        } else {
            self.agreeing as f64 / self.qualifying as f64
        }
    }
}

/// Minimum and maximum of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extrema {
    pub min: f64,
    pub max: f64,
}

impl Extrema {
    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

pub fn extrema(samples: &[Sample], f: impl Fn(&Sample) -> f64) -> Option<Extrema> {
    let mut values = samples.iter().map(f);
    let first = values.next()?;
    let (min, max) = values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
    Some(Extrema { min, max })
}

/// `max - min` over the window; zero for an empty window.
pub fn peak_to_peak(samples: &[Sample], f: impl Fn(&Sample) -> f64) -> f64 {
    extrema(samples, f).map_or(0.0, |e| e.span())
}
