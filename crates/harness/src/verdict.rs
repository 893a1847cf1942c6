//! Verdict engine.
//!
//! Each named check folds one or more criteria with AND semantics. The run
//! validity gate short-circuits everything to NO_DATA, a missing
//! precondition window gives NOT_REACHED, and a repeatability tolerance
//! breach downgrades an otherwise passing sensitive check to CONDITIONAL.
//! The blocking policy then turns the status map into one recommendation.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use fidelity_foundation::CheckId;

use crate::config::Thresholds;
use crate::policy::BlockingPolicy;
use crate::repeatability::RepeatabilityReport;
use crate::scenario::ScenarioResult;
use crate::series;
use crate::validity::RunValidity;
use crate::writer::flags_permit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    Pass,
    Fail,
    Conditional,
    NotReached,
    NoData,
}

impl CheckStatus {
    pub fn label(self) -> &'static str {
        match self {
            CheckStatus::Pass => "PASS",
            CheckStatus::Fail => "FAIL",
            CheckStatus::Conditional => "CONDITIONAL",
            CheckStatus::NotReached => "NOT_REACHED",
            CheckStatus::NoData => "NO_DATA",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckVerdict {
    pub check_id: CheckId,
    pub status: CheckStatus,
    pub evidence: String,
    pub blocking: bool,
}

/// A named acceptance check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckDefinition {
    pub id: &'static str,
    pub description: &'static str,
    /// Downgraded to CONDITIONAL when repeatability is breached.
    pub repeatability_sensitive: bool,
}

const fn check(id: &'static str, description: &'static str, sensitive: bool) -> CheckDefinition {
    CheckDefinition {
        id,
        description,
        repeatability_sensitive: sensitive,
    }
}

/// Every check, in report order.
pub const CHECKS: [CheckDefinition; 12] = [
    check("hold.isolation", "forced-zero channels read zero for the whole hold", true),
    check("hold.thermal_drift", "coolant temperature slope stays inside the drift bound", true),
    check("hold.mass_conservation", "coolant mass drift stays inside the bound", true),
    check("hold.pressure_band", "pressure peak-to-peak lies inside the designed band", true),
    check("hold.projection_parity", "direct state agrees with the derived-state projection", true),
    check("determinism.repeatability", "repeated hold reproduces the same samples", true),
    check("cycling.pressure_smoothness", "no pressure spike across forced unit cycling", false),
    check("cycling.surge_coupling", "surge flow sign tracks the heatup rate sign", false),
    check("cycling.writer_legality", "writer ownership stays legal while cycling", false),
    check("transition.bubble_formation", "steam bubble forms without a pressure discontinuity", false),
    check("transition.pump_start_transient", "first unit start stays inside the transient bound", false),
    check("transition.writer_legality", "writer ownership stays legal through the transition", false),
];

/// One sub-condition of a check.
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

impl Criterion {
    pub fn new(name: &'static str, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name,
            passed,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Assessment {
    Evaluated(Vec<Criterion>),
    /// The precondition window never opened.
    NotReached(String),
}

/// Everything the checks read.
#[derive(Debug, Clone, Copy)]
pub struct CampaignResults<'a> {
    pub hold: &'a ScenarioResult,
    pub cycling: &'a ScenarioResult,
    pub transition: &'a ScenarioResult,
    pub repeatability: &'a RepeatabilityReport,
}

impl CampaignResults<'_> {
    /// Float-only repeatability breach: samples line up but drift beyond
    /// epsilon.
    pub fn repeatability_degradation(&self) -> Option<String> {
        let r = self.repeatability;
        let aligned = r.length_a == r.length_b && r.discrete_mismatches == 0;
        (aligned && r.max_float_delta > r.epsilon).then(|| {
            format!(
                "repeatability degraded: max delta {:.3e} > {:.1e}",
                r.max_float_delta, r.epsilon
            )
        })
    }

    /// Assess one check against the campaign results.
    pub fn assess(&self, id: &str, t: &Thresholds) -> Assessment {
        match id {
            "hold.isolation" => self.hold_isolation(t),
            "hold.thermal_drift" => {
                let slope = self.hold.summary().rcs_temp_slope_f_per_hr;
                Assessment::Evaluated(vec![Criterion::new(
                    "temperature_slope",
                    slope.abs() <= t.hold_temp_slope_f_per_hr,
                    format!("|slope| {:.4} F/h (limit {})", slope.abs(), t.hold_temp_slope_f_per_hr),
                )])
            }
            "hold.mass_conservation" => {
                let drift = self.hold.summary().mass_drift_lbm;
                Assessment::Evaluated(vec![Criterion::new(
                    "mass_drift",
                    drift <= t.hold_mass_drift_lbm,
                    format!("mass drift {:.4} lbm (limit {})", drift, t.hold_mass_drift_lbm),
                )])
            }
            "hold.pressure_band" => {
                let p2p = self.hold.summary().pressure_peak_to_peak;
                Assessment::Evaluated(vec![Criterion::new(
                    "pressure_peak_to_peak",
                    p2p >= t.pressure_band_min_psi && p2p <= t.pressure_band_max_psi,
                    format!(
                        "peak-to-peak {:.3} psi (band {}-{})",
                        p2p, t.pressure_band_min_psi, t.pressure_band_max_psi
                    ),
                )])
            }
            "hold.projection_parity" => {
                let parity = self.hold.parity();
                let detail = if parity.passed() {
                    format!(
                        "max pressure error {:.4} psi, max mass error {:.3e} lbm",
                        parity.pressure.max_error, parity.coolant_mass.max_error
                    )
                } else {
                    parity.failures().join(", ")
                };
                Assessment::Evaluated(vec![Criterion::new(
                    "projection_parity",
                    parity.passed(),
                    detail,
                )])
            }
            "determinism.repeatability" => {
                let r = self.repeatability;
                Assessment::Evaluated(vec![
                    Criterion::new(
                        "sample_count",
                        r.length_a == r.length_b,
                        format!("{} vs {} samples", r.length_a, r.length_b),
                    ),
                    Criterion::new(
                        "discrete_fields",
                        r.discrete_mismatches == 0,
                        format!("{} discrete mismatches", r.discrete_mismatches),
                    ),
                    Criterion::new("digests", true, format!("sha256 {} / {}", r.digest_a, r.digest_b)),
                ])
            }
            "cycling.pressure_smoothness" => {
                let summary = self.cycling.summary();
                Assessment::Evaluated(vec![
                    completed(self.cycling),
                    Criterion::new(
                        "pressure_max_step",
                        summary.pressure_max_step_delta <= t.cycling_max_pressure_step_psi,
                        format!(
                            "max step delta {:.3} psi (limit {})",
                            summary.pressure_max_step_delta, t.cycling_max_pressure_step_psi
                        ),
                    ),
                ])
            }
            "cycling.surge_coupling" => {
                let consistency = self.cycling.summary().surge_consistency;
                Assessment::Evaluated(vec![Criterion::new(
                    "sign_consistency",
                    consistency.ratio() >= t.surge_min_consistency,
                    format!(
                        "{} of {} qualifying samples agree ({:.3}, floor {})",
                        consistency.agreeing,
                        consistency.qualifying,
                        consistency.ratio(),
                        t.surge_min_consistency
                    ),
                )])
            }
            "cycling.writer_legality" => writer_legality(self.cycling),
            "transition.bubble_formation" => self.bubble_formation(t),
            "transition.pump_start_transient" => self.pump_start_transient(t),
            "transition.writer_legality" => writer_legality(self.transition),
            other => Assessment::NotReached(format!("no assessment for check '{other}'")),
        }
    }

    fn hold_isolation(&self, t: &Thresholds) -> Assessment {
        let samples = self.hold.samples();
        let max_units = self.hold.summary().max_transport_units;
        let max_boundary = samples
            .iter()
            .map(|s| {
                s.plant
                    .injection_flow_gpm
                    .abs()
                    .max(s.plant.letdown_flow_gpm.abs())
                    .max(s.plant.aux_heat_kw.abs())
            })
            .fold(0.0, f64::max);
        Assessment::Evaluated(vec![
            completed(self.hold),
            Criterion::new("transport_units", max_units == 0, format!("max units {max_units}")),
            Criterion::new(
                "boundary_channels",
                max_boundary <= t.zero_epsilon,
                format!("max boundary/aux readback {max_boundary:.3e}"),
            ),
        ])
    }

    fn bubble_formation(&self, t: &Thresholds) -> Assessment {
        let Some(step) = self.transition.summary().two_phase_step else {
            return Assessment::NotReached(format!(
                "no steam bubble within {} steps",
                self.transition.summary().step_count
            ));
        };
        let window = self
            .transition
            .window(step.saturating_sub(10), step + 10);
        let max_delta = series::max_step_delta(window, |s| s.plant.pressure_psia);
        let formed = &self.transition.samples()[step];
        let tag = formed.writer();
        Assessment::Evaluated(vec![
            Criterion::new(
                "pressure_continuity",
                max_delta <= t.transition_max_pressure_step_psi,
                format!(
                    "bubble at {:.3} h, max step delta {:.3} psi around formation",
                    formed.time_hours(),
                    max_delta
                ),
            ),
            Criterion::new(
                "ownership_follows_phase",
                tag.is_sentinel() || flags_permit(tag, &formed.flags()),
                format!("writer {tag} at formation"),
            ),
        ])
    }

    fn pump_start_transient(&self, t: &Thresholds) -> Assessment {
        let summary = self.transition.summary();
        let Some(edge) = summary.trigger_step else {
            return Assessment::NotReached(format!(
                "no unit start within {} steps",
                summary.step_count
            ));
        };
        let window = self.transition.window(edge.saturating_sub(1), summary.step_count);
        let max_delta = series::max_step_delta(window, |s| s.plant.pressure_psia);
        let start_time = self.transition.samples()[edge].time_hours();
        Assessment::Evaluated(vec![
            completed(self.transition),
            Criterion::new(
                "pressure_transient",
                max_delta <= t.transition_max_pressure_step_psi,
                format!(
                    "unit start at {:.3} h, max step delta {:.3} psi over follow-on window",
                    start_time, max_delta
                ),
            ),
        ])
    }
}

fn completed(result: &ScenarioResult) -> Criterion {
    let summary = result.summary();
    Criterion::new(
        "completed",
        summary.completed,
        if summary.completed {
            format!("{} steps", summary.step_count)
        } else {
            format!("step cap reached after {} steps", summary.step_count)
        },
    )
}

fn writer_legality(result: &ScenarioResult) -> Assessment {
    let report = result.writer();
    let mut detail = report.summary();
    if let Some(first) = report.issues.first() {
        detail.push_str(&format!("; first issue: {first}"));
    }
    Assessment::Evaluated(vec![Criterion::new("writer_rule", report.writer_rule_pass, detail)])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    CloseRecommended,
    RemediationRequired,
    InvalidRun,
}

impl Recommendation {
    pub fn label(self) -> &'static str {
        match self {
            Recommendation::CloseRecommended => "CLOSE_RECOMMENDED",
            Recommendation::RemediationRequired => "REMEDIATION_REQUIRED",
            Recommendation::InvalidRun => "INVALID_RUN",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub recommendation: Recommendation,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdicts {
    pub checks: IndexMap<CheckId, CheckVerdict>,
    pub decision: Decision,
}

impl Verdicts {
    pub fn status(&self, id: &str) -> Option<CheckStatus> {
        self.checks.get(&CheckId::from(id)).map(|v| v.status)
    }
}

pub struct VerdictEngine<'a> {
    policy: &'a BlockingPolicy,
}

impl<'a> VerdictEngine<'a> {
    pub fn new(policy: &'a BlockingPolicy) -> Self {
        Self { policy }
    }

    /// Status for one check.
    pub fn status_for(
        &self,
        definition: &CheckDefinition,
        assessment: &Assessment,
        validity: &RunValidity,
        degradation: Option<&str>,
    ) -> (CheckStatus, String) {
        if !validity.is_valid {
            return (CheckStatus::NoData, format!("run invalid: {}", validity.reason()));
        }
        let criteria = match assessment {
            Assessment::NotReached(detail) => return (CheckStatus::NotReached, detail.clone()),
            Assessment::Evaluated(criteria) => criteria,
        };
        let failed: Vec<_> = criteria.iter().filter(|c| !c.passed).collect();
        if !failed.is_empty() {
            let evidence = failed
                .iter()
                .map(|c| format!("{}: {}", c.name, c.detail))
                .collect::<Vec<_>>()
                .join("; ");
            return (CheckStatus::Fail, evidence);
        }
        let evidence = criteria
            .iter()
            .map(|c| c.detail.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        match degradation {
            Some(degradation) if definition.repeatability_sensitive => {
                (CheckStatus::Conditional, format!("{evidence}; {degradation}"))
            }
            _ => (CheckStatus::Pass, evidence),
        }
    }

    /// Fold assessed checks into verdicts and a recommendation.
    pub fn decide(
        &self,
        validity: &RunValidity,
        assessed: &[(CheckDefinition, Assessment)],
        degradation: Option<&str>,
    ) -> Verdicts {
        let mut checks = IndexMap::new();
        for (definition, assessment) in assessed {
            let check_id = CheckId::from(definition.id);
            let (status, evidence) = self.status_for(definition, assessment, validity, degradation);
            let blocking = self.policy.is_blocking(&check_id, status);
            debug!(check = %check_id, %status, blocking, "check decided");
            checks.insert(
                check_id.clone(),
                CheckVerdict {
                    check_id,
                    status,
                    evidence,
                    blocking,
                },
            );
        }
        let decision = self.recommend(validity, &checks);
        info!(recommendation = %decision.recommendation, "verdicts decided");
        Verdicts { checks, decision }
    }

    fn recommend(
        &self,
        validity: &RunValidity,
        checks: &IndexMap<CheckId, CheckVerdict>,
    ) -> Decision {
        if !validity.is_valid {
            return Decision {
                recommendation: Recommendation::InvalidRun,
                reason: validity.reason(),
            };
        }
        let listed = |pred: &dyn Fn(&CheckVerdict) -> bool| {
            checks
                .values()
                .filter(|v| pred(v))
                .map(|v| format!("{}={}", v.check_id, v.status))
                .collect::<Vec<_>>()
        };
        let blocking = listed(&|v| v.blocking);
        if !blocking.is_empty() {
            return Decision {
                recommendation: Recommendation::RemediationRequired,
                reason: format!("blocking: {}", blocking.join(", ")),
            };
        }
        let waived = listed(&|v| v.status != CheckStatus::Pass);
        let reason = if waived.is_empty() {
            format!("all {} checks passed", checks.len())
        } else {
            format!("no blocking checks; waived: {}", waived.join(", "))
        };
        Decision {
            recommendation: Recommendation::CloseRecommended,
            reason,
        }
    }
}
