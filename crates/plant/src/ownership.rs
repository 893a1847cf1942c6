//! Writer-tag ownership inside the engine.
//!
//! Ownership only moves up the coupling order directly. Moving down means
//! the lower path has to reinitialize, which the engine reports as `INIT`
//! for at least one captured step before the new owner takes over.

use fidelity_runtime::WriterTag;

/// Natural owner for the current physical configuration.
pub fn classify(units: u32, two_phase: bool) -> WriterTag {
    match (units, two_phase) {
        (0, false) => WriterTag::SolidIsolated,
        (0, true) => WriterTag::BubbleIsolated,
        (1, _) => WriterTag::PartialCoupled,
        _ => WriterTag::FullyCoupled,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership {
    /// Tag reported in the state.
    reported: WriterTag,
    /// Last ranked owner, which `INIT` hands back to.
    settled: WriterTag,
    reinit_tick: u64,
}

impl Ownership {
    /// Fresh ownership right after initialize: reinitializing towards `natural`.
    pub fn initializing(natural: WriterTag) -> Self {
        Self {
            reported: WriterTag::Init,
            settled: natural,
            reinit_tick: 0,
        }
    }

    pub fn reported(&self) -> WriterTag {
        self.reported
    }

    /// Called at the start of a step: a reinitialization that has been
    /// visible for a full step completes.
    pub fn release(&mut self, tick: u64) {
        if self.reported == WriterTag::Init && tick > self.reinit_tick {
            self.reported = self.settled;
        }
    }

    /// Re-evaluate after anything that can change the natural owner.
    pub fn reassign(&mut self, natural: WriterTag, tick: u64) {
        if natural == self.settled {
            return;
        }
        let up = match (natural.rank(), self.settled.rank()) {
            (Some(n), Some(s)) => n > s,
            _ => true,
        };
        if up {
            self.reported = natural;
        } else {
            self.reported = WriterTag::Init;
            self.reinit_tick = tick;
        }
        self.settled = natural;
    }
}
