//! Writer legality checking.
//!
//! The writer tag says which computation path owns the tracked quantities.
//! Across consecutive ranked tags the rank may only rise; going down is
//! legal only through a sentinel (`UNSET`/`INIT`). Samples at the same grid
//! instant must agree on the tag, and a settled tag must match the plant's
//! physical configuration.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use fidelity_foundation::{grid_index, DtHours};
use fidelity_runtime::{PhaseFlags, Sample, WriterTag};

/// Samples from scenario start before post-mutation checks apply.
pub const DEFAULT_WARMUP_STEPS: usize = 3;

/// Physical configuration a ranked tag requires. Sentinels require nothing.
pub fn flags_permit(tag: WriterTag, flags: &PhaseFlags) -> bool {
    match tag {
        WriterTag::Unset | WriterTag::Init => true,
        WriterTag::SolidIsolated => flags.transport_units == 0 && flags.solid && !flags.two_phase,
        WriterTag::BubbleIsolated => {
            flags.transport_units == 0 && flags.two_phase && !flags.solid
        }
        WriterTag::PartialCoupled => flags.transport_units == 1 && flags.two_phase,
        WriterTag::FullyCoupled => flags.transport_units >= 2 && flags.two_phase,
    }
}

/// Outcome of a legality pass over one sample sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WriterReport {
    pub writer_rule_pass: bool,
    /// Illegal transitions plus same-instant conflicts.
    pub conflict_count: usize,
    pub illegal_transitions: usize,
    pub same_instant_conflicts: usize,
    pub illegal_post_mutation_count: usize,
    pub issues: Vec<String>,
}

impl WriterReport {
    pub fn summary(&self) -> String {
        format!(
            "conflicts={} (transitions={}, same-instant={}), post-mutation={}",
            self.conflict_count,
            self.illegal_transitions,
            self.same_instant_conflicts,
            self.illegal_post_mutation_count
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WriterLegality {
    dt_hours: DtHours,
    warmup_steps: usize,
}

impl WriterLegality {
    pub fn new(dt_hours: DtHours) -> Self {
        Self {
            dt_hours,
            warmup_steps: DEFAULT_WARMUP_STEPS,
        }
    }

    pub fn with_warmup(mut self, warmup_steps: usize) -> Self {
        self.warmup_steps = warmup_steps;
        self
    }

    pub fn check(&self, samples: &[Sample]) -> WriterReport {
        let mut report = WriterReport::default();
        let mut by_instant: HashMap<i64, (usize, WriterTag)> = HashMap::new();

        for (index, sample) in samples.iter().enumerate() {
            let instant = grid_index(sample.time_hours(), self.dt_hours);
            match by_instant.get(&instant) {
                Some(&(first_step, tag)) if tag != sample.writer() => {
                    report.same_instant_conflicts += 1;
                    report.issues.push(format!(
                        "same-instant conflict at t={:.4} h: step {} has {}, step {} has {}",
                        sample.time_hours(),
                        first_step,
                        tag,
                        sample.step,
                        sample.writer()
                    ));
                }
                Some(_) => {}
                None => {
                    by_instant.insert(instant, (sample.step, sample.writer()));
                }
            }

            if index == 0 {
                continue;
            }
            let prev = &samples[index - 1];
            self.check_transition(prev, sample, &mut report);
            if index >= self.warmup_steps {
                self.check_post_mutation(prev, sample, &mut report);
            }
        }

        report.conflict_count = report.illegal_transitions + report.same_instant_conflicts;
        report.writer_rule_pass =
            report.conflict_count == 0 && report.illegal_post_mutation_count == 0;
        debug!(
            samples = samples.len(),
            pass = report.writer_rule_pass,
            conflicts = report.conflict_count,
            post_mutation = report.illegal_post_mutation_count,
            "writer legality checked"
        );
        report
    }

    fn check_transition(&self, prev: &Sample, cur: &Sample, report: &mut WriterReport) {
        let (Some(from), Some(to)) = (prev.writer().rank(), cur.writer().rank()) else {
            return;
        };
        if to < from {
            report.illegal_transitions += 1;
            report.issues.push(format!(
                "illegal transition at step {}: {} -> {} without reinitialization",
                cur.step,
                prev.writer(),
                cur.writer()
            ));
        }
    }

    fn check_post_mutation(&self, prev: &Sample, cur: &Sample, report: &mut WriterReport) {
        let tag = cur.writer();
        if tag != prev.writer() || cur.flags() != prev.flags() {
            return;
        }
        let flags = cur.flags();
        if !flags_permit(tag, &flags) {
            report.illegal_post_mutation_count += 1;
            report.issues.push(format!(
                "{} at step {} with units={} two_phase={} solid={}",
                tag, cur.step, flags.transport_units, flags.two_phase, flags.solid
            ));
        }
    }
}
