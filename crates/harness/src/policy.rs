//! Blocking policy.
//!
//! Maps a (check, status) pair to blocking or non-blocking. PASS never
//! blocks, FAIL and NO_DATA always do. CONDITIONAL follows one global switch
//! and NOT_REACHED blocks unless the check is listed as an exception.

use serde::{Deserialize, Serialize};

use fidelity_foundation::CheckId;

use crate::verdict::CheckStatus;

/// Check whose NOT_REACHED status is waived by default.
pub const PUMP_START_TRANSIENT: &str = "transition.pump_start_transient";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BlockingPolicy {
    pub conditional_blocking: bool,
    pub not_reached_exceptions: Vec<CheckId>,
}

impl Default for BlockingPolicy {
    fn default() -> Self {
        Self {
            conditional_blocking: false,
            not_reached_exceptions: vec![CheckId::from(PUMP_START_TRANSIENT)],
        }
    }
}

impl BlockingPolicy {
    /// Treat every borderline status as blocking.
    pub fn strict() -> Self {
        Self {
            conditional_blocking: true,
            not_reached_exceptions: Vec::new(),
        }
    }

    pub fn is_blocking(&self, check: &CheckId, status: CheckStatus) -> bool {
        match status {
            CheckStatus::Pass => false,
            CheckStatus::Fail | CheckStatus::NoData => true,
            CheckStatus::Conditional => self.conditional_blocking,
            CheckStatus::NotReached => !self.not_reached_exceptions.contains(check),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table() {
        let policy = BlockingPolicy::default();
        let hold = CheckId::from("hold.pressure_band");
        let pump = CheckId::from(PUMP_START_TRANSIENT);

        assert!(!policy.is_blocking(&hold, CheckStatus::Pass));
        assert!(policy.is_blocking(&hold, CheckStatus::Fail));
        assert!(policy.is_blocking(&hold, CheckStatus::NoData));
        assert!(!policy.is_blocking(&hold, CheckStatus::Conditional));
        assert!(policy.is_blocking(&hold, CheckStatus::NotReached));
        assert!(!policy.is_blocking(&pump, CheckStatus::NotReached));
        assert!(policy.is_blocking(&pump, CheckStatus::Fail));
    }

    #[test]
    fn strict_policy_waives_nothing() {
        let policy = BlockingPolicy::strict();
        let pump = CheckId::from(PUMP_START_TRANSIENT);
        assert!(policy.is_blocking(&pump, CheckStatus::NotReached));
        assert!(policy.is_blocking(&pump, CheckStatus::Conditional));
    }

    #[test]
    fn policy_reads_from_yaml() {
        let policy: BlockingPolicy = serde_yaml::from_str(
            "conditionalBlocking: true\nnotReachedExceptions: [cycling.surge_coupling]\n",
        )
        .unwrap();
        assert!(policy.conditional_blocking);
        assert_eq!(policy.not_reached_exceptions, vec![CheckId::from("cycling.surge_coupling")]);
    }
}
