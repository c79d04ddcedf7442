use std::fmt::Write as _;
use std::path::PathBuf;

use async_trait::async_trait;

use super::{AlertContext, AlertEmitter, AlertError};
use crate::detect::RegressionReport;

/// Render a "Performance Alert" comment body for `findings`.
pub fn render_alert_markdown(context: &AlertContext, findings: &[RegressionReport]) -> String {
    let mut out = String::new();
    out.push_str("# :warning: **Performance Alert** :warning:\n\n");
    let _ = writeln!(
        out,
        "Possible performance regression was detected for benchmark suite **'{}'**.",
        context.suite
    );
    let _ = writeln!(
        out,
        "Results of commit {} are worse than the trailing baseline by more than `{:.0}%`.\n",
        context.commit.short_id(),
        context.threshold * 100.0
    );

    out.push_str("| Benchmark | Current | Baseline | Ratio | Severity |\n");
    out.push_str("|-|-|-|-|-|\n");
    for f in findings {
        let _ = writeln!(
            out,
            "| `{}` | `{} {}` | `{} {}` | `{:.2}` | {} |",
            f.bench_name,
            f.current,
            f.unit,
            f.baseline,
            f.unit,
            f.worse_ratio(),
            f.severity
        );
    }

    if !context.commit.url.is_empty() {
        let _ = write!(out, "\nCommit: {}\n", context.commit.url);
    }
    out
}

/// Writes the rendered alert to a file, for CI steps that post it as a
/// pull-request or commit comment.
#[derive(Debug, Clone)]
pub struct MarkdownAlertEmitter {
    path: PathBuf,
}

impl MarkdownAlertEmitter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AlertEmitter for MarkdownAlertEmitter {
    fn name(&self) -> &str {
        "markdown"
    }

    async fn report(
        &self,
        context: &AlertContext,
        findings: &[RegressionReport],
    ) -> Result<(), AlertError> {
        let body = render_alert_markdown(context, findings);
        tokio::fs::write(&self.path, body).await?;
        Ok(())
    }
}
