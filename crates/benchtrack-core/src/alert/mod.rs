//! Regression alert sinks and the dispatch policy around them.
//!
//! Alerts run after the updated store has been saved. A failing sink is
//! logged and counted, never propagated: detection results and persisted
//! data stand regardless of delivery.

mod markdown;
mod webhook;

pub use markdown::{render_alert_markdown, MarkdownAlertEmitter};
pub use webhook::{AlertPayload, WebhookAlertEmitter};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::detect::{RegressionReport, Severity};
use crate::domain::Commit;
use crate::obs;

/// Where a set of findings came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertContext {
    pub repo_url: String,
    pub suite: String,
    pub commit: Commit,

    /// Relative degradation threshold the findings exceeded.
    pub threshold: f64,
}

impl AlertContext {
    pub fn new(
        repo_url: impl Into<String>,
        suite: impl Into<String>,
        commit: Commit,
        threshold: f64,
    ) -> Self {
        Self {
            repo_url: repo_url.into(),
            suite: suite.into(),
            commit,
            threshold,
        }
    }
}

/// Delivery failures of a single sink.
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(String),

    #[error("webhook rejected alert with status {status}")]
    Rejected { status: u16 },
}

impl From<reqwest::Error> for AlertError {
    fn from(err: reqwest::Error) -> Self {
        AlertError::Http(err.to_string())
    }
}

/// A destination for regression findings.
#[async_trait]
pub trait AlertEmitter: Send + Sync {
    /// Short sink name used in logs.
    fn name(&self) -> &str;

    async fn report(
        &self,
        context: &AlertContext,
        findings: &[RegressionReport],
    ) -> Result<(), AlertError>;
}

/// When findings should fail the calling CI job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertPolicy {
    /// Lowest severity that escalates; `None` never escalates.
    pub fail_on: Option<Severity>,
}

impl AlertPolicy {
    pub fn fail_on(severity: Severity) -> Self {
        Self {
            fail_on: Some(severity),
        }
    }

    pub fn escalates(&self, findings: &[RegressionReport]) -> bool {
        match self.fail_on {
            Some(min) => findings.iter().any(|f| f.severity >= min),
            None => false,
        }
    }
}

/// Summary of one dispatch round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertOutcome {
    pub delivered: usize,
    pub failed: usize,
    pub escalate: bool,
}

/// Hand `findings` to every sink in order.
///
/// With no findings no sink is invoked. Sink failures are logged as
/// `alert.failed` and do not stop the remaining sinks.
pub async fn dispatch_alerts(
    sinks: &[Box<dyn AlertEmitter>],
    context: &AlertContext,
    findings: &[RegressionReport],
    policy: AlertPolicy,
) -> AlertOutcome {
    let mut outcome = AlertOutcome::default();
    if findings.is_empty() {
        return outcome;
    }

    for sink in sinks {
        match sink.report(context, findings).await {
            Ok(()) => outcome.delivered += 1,
            Err(e) => {
                obs::emit_alert_failed(sink.name(), &e);
                outcome.failed += 1;
            }
        }
    }
    outcome.escalate = policy.escalates(findings);
    outcome
}

// ---------------------------------------------------------------------------
// Log sink
// ---------------------------------------------------------------------------

/// Emits one structured warning per finding.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertEmitter;

#[async_trait]
impl AlertEmitter for LogAlertEmitter {
    fn name(&self) -> &str {
        "log"
    }

    async fn report(
        &self,
        context: &AlertContext,
        findings: &[RegressionReport],
    ) -> Result<(), AlertError> {
        for f in findings {
            warn!(
                event = "regression.detected",
                suite = %context.suite,
                commit = %context.commit.id,
                bench = %f.bench_name,
                severity = %f.severity,
                baseline = f.baseline,
                current = f.current,
                relative_change = f.relative_change,
                unit = %f.unit,
            );
        }
        Ok(())
    }
}
