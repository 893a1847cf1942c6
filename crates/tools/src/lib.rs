//! Fidelity Tools
//!
//! Logging setup and report rendering for the `fidelity-check` binary.

use std::fmt::Write as _;

use tracing_subscriber::{fmt, EnvFilter};

use fidelity_foundation::CheckId;
use fidelity_harness::{BlockingPolicy, CheckStatus, Recommendation, Report, CHECKS};

/// Initialize logging with a default filter.
///
/// Use `RUST_LOG` environment variable to override the default filter.
/// Logs go to stderr so `--json` output stays clean.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("warn,fidelity_tools=info,fidelity_harness=info,fidelity_runtime=warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Process exit code for a finished campaign.
pub fn exit_code(recommendation: Recommendation) -> i32 {
    match recommendation {
        Recommendation::CloseRecommended => 0,
        Recommendation::RemediationRequired => 1,
        Recommendation::InvalidRun => 2,
    }
}

/// Exit code for a fatal harness error.
pub const FATAL_EXIT_CODE: i32 = 3;

/// Plain-text table of check verdicts followed by the recommendation.
pub fn render_report(report: &Report) -> String {
    let mut out = String::new();
    let width = report
        .checks
        .keys()
        .map(|k| k.as_str().len())
        .max()
        .unwrap_or(0);

    let _ = writeln!(out, "generated {} (seed {})", report.generated_at.to_rfc3339(), report.seed);
    if !report.validity.is_valid {
        let _ = writeln!(out, "run invalid: {}", report.validity.reason());
    }
    for verdict in report.checks.values() {
        let marker = if verdict.blocking { "!" } else { " " };
        let _ = writeln!(
            out,
            "{marker} {:<width$}  {:<11}  {}",
            verdict.check_id.as_str(),
            verdict.status.label(),
            verdict.evidence
        );
    }
    let _ = writeln!(out, "{}: {}", report.decision.recommendation, report.decision.reason);
    out
}

/// The check catalogue with each borderline status' blocking effect.
pub fn render_catalogue(policy: &BlockingPolicy) -> String {
    let mut out = String::new();
    for check in CHECKS.iter() {
        let id = CheckId::from(check.id);
        let blocking = |status| {
            if policy.is_blocking(&id, status) {
                "blocking"
            } else {
                "waived"
            }
        };
        let _ = writeln!(
            out,
            "{:<32} CONDITIONAL={:<8} NOT_REACHED={:<8} {}",
            check.id,
            blocking(CheckStatus::Conditional),
            blocking(CheckStatus::NotReached),
            check.description
        );
    }
    out
}
