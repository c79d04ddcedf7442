//! benchtrack - continuous benchmark history CLI
//!
//! ## Commands
//!
//! - `ingest`: record one benchmark run, check it for regressions, alert
//! - `series`: print the history of one benchmark
//! - `check`: re-evaluate a recorded run against its preceding history
//! - `show`: summarize a store
//!
//! Exit status is 0 on success, 1 on any error (the store file is left as it
//! was) and 2 when regressions reach the configured `fail_on` severity.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing::{info, Level};

use benchtrack_core::{
    capture_commit, dispatch_alerts, ingest, ingest_at, load, load_or_init, save, AlertContext,
    AlertEmitter, AlertPolicy, BenchError, BenchStore, BenchtrackConfig, Commit, Entry,
    LogAlertEmitter, MarkdownAlertEmitter, RegressionDetector, RegressionReport, SeriesSource,
    Severity, StoreLock, SuiteSpan, Tool, WebhookAlertEmitter, METRICS,
};

#[derive(Parser)]
#[command(name = "benchtrack")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Benchmark history store and regression detector", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON log lines and JSON command output
    #[arg(long, global = true)]
    json: bool,

    /// TOML configuration file
    #[arg(long, global = true, env = "BENCHTRACK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a benchmark run, check it for regressions and dispatch alerts
    Ingest(IngestArgs),

    /// Print the recorded history of one benchmark
    Series {
        /// Store document (.json, or .js for dashboard data)
        #[arg(long)]
        store: PathBuf,

        #[arg(long)]
        suite: String,

        #[arg(long)]
        bench: String,
    },

    /// Re-evaluate a recorded run against the history preceding it
    Check {
        #[arg(long)]
        store: PathBuf,

        #[arg(long)]
        suite: String,

        /// Commit id to check (default: latest entry of the suite)
        #[arg(long)]
        commit: Option<String>,

        /// Exit with status 2 when a finding reaches this severity
        #[arg(long)]
        fail_on: Option<Severity>,
    },

    /// Summarize the suites of a store
    Show {
        #[arg(long)]
        store: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
struct IngestArgs {
    /// Suite the run belongs to
    #[arg(long)]
    suite: String,

    /// Producing tool: cargo, go, pytest, customBiggerIsBetter, customSmallerIsBetter
    #[arg(long)]
    tool: Tool,

    /// File holding the raw benchmark output
    #[arg(long)]
    output: PathBuf,

    /// Store document to update (created when missing)
    #[arg(long)]
    store: PathBuf,

    /// JSON file holding the commit object
    #[arg(long, conflicts_with = "commit_from_git", required_unless_present = "commit_from_git")]
    commit: Option<PathBuf>,

    /// Read commit metadata from HEAD of this git checkout
    #[arg(long)]
    commit_from_git: Option<PathBuf>,

    /// Repository URL for a new store and for commit links
    #[arg(long)]
    repo_url: Option<String>,

    /// Ingestion date in epoch milliseconds (default: now)
    #[arg(long)]
    date: Option<i64>,

    /// Write a markdown alert comment here when regressions are found
    #[arg(long)]
    alert_comment: Option<PathBuf>,

    /// POST regressions to this URL
    #[arg(long)]
    webhook: Option<String>,

    /// Exit with status 2 when a finding reaches this severity
    #[arg(long)]
    fail_on: Option<Severity>,
}

/// How a successful command wants the process to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Clean,
    Escalated,
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Clean => ExitCode::SUCCESS,
            Outcome::Escalated => ExitCode::from(2),
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    benchtrack_core::init_tracing(cli.json, level);

    let config = BenchtrackConfig::load_optional(cli.config.as_deref())
        .context("Failed to load configuration")?;

    let outcome = match cli.command {
        Commands::Ingest(args) => cmd_ingest(&args, &config).await?,
        Commands::Series {
            store,
            suite,
            bench,
        } => cmd_series(&store, &suite, &bench, cli.json)?,
        Commands::Check {
            store,
            suite,
            commit,
            fail_on,
        } => cmd_check(&store, &suite, commit.as_deref(), fail_on, &config, cli.json)?,
        Commands::Show { store } => cmd_show(&store, cli.json)?,
    };

    METRICS.flush();
    Ok(outcome.into())
}

// ---------------------------------------------------------------------------
// ingest
// ---------------------------------------------------------------------------

async fn cmd_ingest(args: &IngestArgs, config: &BenchtrackConfig) -> Result<Outcome> {
    let _span = SuiteSpan::enter(&args.suite);
    let detector =
        RegressionDetector::new(config.detector.clone()).context("Invalid detector config")?;
    let sinks = alert_sinks(args, config)?;

    let raw = std::fs::read_to_string(&args.output)
        .with_context(|| format!("Failed to read benchmark output {:?}", args.output))?;

    let lock = StoreLock::acquire(&args.store)
        .with_context(|| format!("Failed to lock store {:?}", args.store))?;
    let mut store = load_or_init(&args.store, args.repo_url.as_deref().unwrap_or_default())
        .with_context(|| format!("Failed to load store {:?}", args.store))?;

    let repo_url = args
        .repo_url
        .clone()
        .unwrap_or_else(|| store.repo_url().to_string());
    let commit = resolve_commit(args, &repo_url)?;

    let entry = match args.date {
        Some(date) => ingest_at(&raw, commit, args.tool, &args.suite, &mut store, date),
        None => ingest(&raw, commit, args.tool, &args.suite, &mut store),
    }
    .with_context(|| format!("Failed to ingest {} output into '{}'", args.tool, args.suite))?;

    let findings = detector.evaluate(&store, &args.suite, &entry);

    save(&store, &args.store).with_context(|| format!("Failed to save store {:?}", args.store))?;
    drop(lock);

    println!(
        "Recorded {} result(s) for {} in '{}'",
        entry.benches.len(),
        entry.commit.short_id(),
        args.suite
    );
    print_findings(&findings);

    let policy = AlertPolicy {
        fail_on: args.fail_on.or(config.alert.fail_on),
    };
    let context = AlertContext::new(
        store.repo_url(),
        &args.suite,
        entry.commit.clone(),
        detector.config().threshold,
    );
    let outcome = dispatch_alerts(&sinks, &context, &findings, policy).await;
    if outcome.failed > 0 {
        info!(
            failed = outcome.failed,
            delivered = outcome.delivered,
            "some alert sinks failed"
        );
    }

    Ok(if outcome.escalate {
        Outcome::Escalated
    } else {
        Outcome::Clean
    })
}

fn resolve_commit(args: &IngestArgs, repo_url: &str) -> Result<Commit> {
    if let Some(dir) = &args.commit_from_git {
        return capture_commit(dir, repo_url)
            .with_context(|| format!("Failed to read commit from {:?}", dir));
    }
    let path = args
        .commit
        .as_ref()
        .context("Either --commit or --commit-from-git is required")?;
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read commit file {:?}", path))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid commit JSON in {:?}", path))
}

fn alert_sinks(args: &IngestArgs, config: &BenchtrackConfig) -> Result<Vec<Box<dyn AlertEmitter>>> {
    let mut sinks: Vec<Box<dyn AlertEmitter>> = vec![Box::new(LogAlertEmitter)];

    if let Some(path) = args
        .alert_comment
        .as_ref()
        .or(config.alert.comment_path.as_ref())
    {
        sinks.push(Box::new(MarkdownAlertEmitter::new(path)));
    }
    if let Some(url) = args.webhook.as_ref().or(config.alert.webhook_url.as_ref()) {
        let webhook = WebhookAlertEmitter::new(url.as_str())
            .context("Failed to create webhook client")?;
        sinks.push(Box::new(webhook));
    }
    Ok(sinks)
}

fn print_findings(findings: &[RegressionReport]) {
    if findings.is_empty() {
        println!("No regressions detected");
        return;
    }
    println!("Regressions:");
    for f in findings {
        println!(
            "  [{}] {}: {} {} vs baseline {} {} ({:+.1}%)",
            f.severity,
            f.bench_name,
            f.current,
            f.unit,
            f.baseline,
            f.unit,
            f.relative_change * 100.0
        );
    }
}

// ---------------------------------------------------------------------------
// series / check / show
// ---------------------------------------------------------------------------

fn load_existing(path: &Path) -> Result<BenchStore> {
    load(path).with_context(|| format!("Failed to load store {:?}", path))
}

fn cmd_series(path: &Path, suite: &str, bench: &str, json: bool) -> Result<Outcome> {
    let store = load_existing(path)?;
    let series = store
        .series(suite, bench)
        .ok_or_else(|| BenchError::UnknownSuite(suite.to_string()))?;

    if json {
        let points: Vec<_> = series
            .iter()
            .map(|p| {
                json!({
                    "commit": p.commit().id,
                    "date": p.date(),
                    "value": p.value(),
                    "unit": p.unit(),
                    "range": p.range(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&points)?);
        return Ok(Outcome::Clean);
    }

    let mut count = 0;
    for p in &series {
        count += 1;
        println!(
            "{}  {}  {} {}  {}",
            p.commit().short_id(),
            p.date(),
            p.value(),
            p.unit(),
            p.range().unwrap_or("")
        );
    }
    if count == 0 {
        println!("No results recorded for '{}' in '{}'", bench, suite);
    }
    Ok(Outcome::Clean)
}

fn cmd_check(
    path: &Path,
    suite: &str,
    commit: Option<&str>,
    fail_on: Option<Severity>,
    config: &BenchtrackConfig,
    json: bool,
) -> Result<Outcome> {
    let detector =
        RegressionDetector::new(config.detector.clone()).context("Invalid detector config")?;
    let store = load_existing(path)?;
    let entries = store
        .suite(suite)
        .ok_or_else(|| BenchError::UnknownSuite(suite.to_string()))?;

    let entry: &Entry = match commit {
        Some(id) => entries
            .find_commit(id)
            .with_context(|| format!("No entry for commit {} in '{}'", id, suite))?,
        None => entries
            .latest()
            .with_context(|| format!("Suite '{}' has no entries", suite))?,
    };

    let findings = detector.evaluate(&store, suite, entry);
    if json {
        println!("{}", serde_json::to_string_pretty(&findings)?);
    } else {
        println!("Checked {} in '{}'", entry.commit.short_id(), suite);
        print_findings(&findings);
    }

    let policy = AlertPolicy {
        fail_on: fail_on.or(config.alert.fail_on),
    };
    Ok(if policy.escalates(&findings) {
        Outcome::Escalated
    } else {
        Outcome::Clean
    })
}

fn cmd_show(path: &Path, json: bool) -> Result<Outcome> {
    let store = load_existing(path)?;

    if json {
        let suites: Vec<_> = store
            .suites()
            .map(|s| {
                json!({
                    "name": s.name(),
                    "entries": s.len(),
                    "latest_commit": s.latest().map(|e| e.commit.id.clone()),
                    "latest_date": s.latest().map(|e| e.date),
                })
            })
            .collect();
        let summary = json!({
            "repoUrl": store.repo_url(),
            "lastUpdate": store.last_update(),
            "suites": suites,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(Outcome::Clean);
    }

    println!("Repository:  {}", store.repo_url());
    println!("Last update: {}", store.last_update());
    for suite in store.suites() {
        match suite.latest() {
            Some(latest) => println!(
                "  {}: {} entries, latest {} ({} results)",
                suite.name(),
                suite.len(),
                latest.commit.short_id(),
                latest.benches.len()
            ),
            None => println!("  {}: empty", suite.name()),
        }
    }
    Ok(Outcome::Clean)
}
