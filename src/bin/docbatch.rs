//! CLI binary for docbatch.
//!
//! A thin shim over the library crate: paths on the command line feed the
//! intake (files as picker selections, folders as drops), the workflow is
//! observed through a terminal spinner, and the archive lands in `--out-dir`.

use anyhow::{Context, Result};
use clap::Parser;
use docbatch::{
    AdmissionReport, BatchError, ClientConfig, DirectorySink, FailureKind, FileSource,
    SavedArchive, Status, TransferClient, Workflow, WorkflowObserver, WorkflowState,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── Terminal observer using indicatif ────────────────────────────────────────

/// Shows a spinner while the workflow is `loading` and clears it on any
/// other state.
struct CliObserver {
    bar: ProgressBar,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::hidden();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        Arc::new(Self { bar })
    }
}

impl WorkflowObserver for CliObserver {
    fn on_transfer_start(&self, files: usize, bytes: u64) {
        self.bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        self.bar.set_prefix("Converting");
        self.bar.set_message(format!("{files} files, {}", human_bytes(bytes)));
        self.bar.enable_steady_tick(Duration::from_millis(80));
    }

    fn on_state_changed(&self, state: WorkflowState, _status: &Status) {
        if state != WorkflowState::Loading && !self.bar.is_finished() && !self.bar.is_hidden() {
            self.bar.finish_and_clear();
        }
    }

    fn on_archive_saved(&self, path: &Path, bytes: u64) {
        self.bar.println(format!(
            "  {} {}  {}",
            green("✓"),
            path.display(),
            dim(&human_bytes(bytes))
        ));
    }
}

fn human_bytes(n: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = n as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{n} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a few documents, archive saved in the current directory
  docbatch --endpoint http://localhost:8000/convert a.docx b.docx

  # Offer every file in a folder (non-.docx files are skipped)
  docbatch reports/ -o ~/Downloads

  # Show what would be submitted without contacting the service
  docbatch --dry-run reports/ extra.docx

  # Machine-readable summary
  docbatch --json reports/ > summary.json

RULES:
  Only .docx files (or files declared as Word documents) are accepted.
  A file with the same name and size as one already in the batch is skipped.
  At most 30 files are sent per batch; extra files are reported and left out.

ENVIRONMENT VARIABLES:
  DOCBATCH_ENDPOINT   Conversion endpoint URL
  DOCBATCH_OUT_DIR    Directory for the returned archive
  RUST_LOG            Override the log filter (e.g. docbatch=debug)
"#;

/// Send a batch of .docx files to a conversion service and save the archive.
#[derive(Parser, Debug)]
#[command(
    name = "docbatch",
    version,
    about = "Send a batch of .docx files to a conversion service and save the returned archive",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Files and folders to offer. Folders contribute their direct files.
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Conversion endpoint URL.
    #[arg(short, long, env = "DOCBATCH_ENDPOINT")]
    endpoint: String,

    /// Directory the returned archive is saved into.
    #[arg(short, long, env = "DOCBATCH_OUT_DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Give up on the request after this many seconds (default: wait forever).
    #[arg(long, env = "DOCBATCH_TIMEOUT")]
    timeout: Option<u64>,

    /// Show the admitted batch and exit without submitting.
    #[arg(long)]
    dry_run: bool,

    /// Print a JSON summary on stdout.
    #[arg(long, env = "DOCBATCH_JSON")]
    json: bool,

    /// Disable the spinner.
    #[arg(long, env = "DOCBATCH_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCBATCH_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOCBATCH_QUIET")]
    quiet: bool,
}

/// What `--json` prints.
#[derive(Serialize)]
struct Summary<'a> {
    admissions: &'a [AdmissionReport],
    files: Vec<&'a str>,
    state: WorkflowState,
    status: &'a Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    saved: Option<&'a SavedArchive>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<FailureKind>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner and status lines carry the user-facing feedback; library
    // INFO logs only show up when asked for.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build workflow ───────────────────────────────────────────────────
    let config = build_config(&cli)?;
    let client = TransferClient::new(config).context("Failed to create HTTP client")?;
    let sink = Arc::new(DirectorySink::new(&cli.out_dir));
    let mut workflow = Workflow::new(client, sink);
    if !cli.quiet && !cli.no_progress && !cli.json {
        workflow = workflow.with_observer(CliObserver::new());
    }

    // ── Intake ───────────────────────────────────────────────────────────
    let mut admissions = Vec::new();
    for source in FileSource::from_paths(cli.paths.clone()) {
        let files = source.load().await;
        let report = workflow.offer(files).context("Failed to add files")?;
        if !cli.quiet && !cli.json {
            print_admission(&report);
        }
        admissions.push(report);
    }

    if !cli.quiet && !cli.json {
        eprintln!(
            "{} {}/{} files in batch",
            cyan("◆"),
            bold(&workflow.batch().len().to_string()),
            workflow.batch().capacity()
        );
    }

    // ── Dry run ──────────────────────────────────────────────────────────
    if cli.dry_run {
        if cli.json {
            print_summary(&workflow, &admissions, None, None)?;
        } else if !cli.quiet {
            for (i, c) in workflow.batch().iter().enumerate() {
                eprintln!(
                    "  {:>2}. {}  {}",
                    i + 1,
                    c.name(),
                    dim(&human_bytes(c.size()))
                );
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    // ── Submit ───────────────────────────────────────────────────────────
    let result = workflow.submit().await;
    let (saved, failure) = match &result {
        Ok(saved) => (Some(saved), None),
        Err(e) => (None, Some(e.kind())),
    };

    if cli.json {
        print_summary(&workflow, &admissions, saved, failure)?;
    } else {
        print_outcome(&cli, workflow.status(), &result);
    }

    Ok(if result.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Map CLI args to `ClientConfig`.
fn build_config(cli: &Cli) -> Result<ClientConfig> {
    let mut builder = ClientConfig::builder().endpoint(cli.endpoint.clone());
    if let Some(secs) = cli.timeout {
        builder = builder.request_timeout(Duration::from_secs(secs));
    }
    builder.build().context("Invalid configuration")
}

fn print_admission(report: &AdmissionReport) {
    let skipped = report.rejected_type + report.rejected_duplicate;
    if let Some(msg) = report.message() {
        let mark = if report.hit_capacity() {
            cyan("⚠")
        } else {
            green("✓")
        };
        eprintln!("{mark} {msg}");
    }
    if skipped > 0 {
        eprintln!(
            "  {}",
            dim(&format!(
                "skipped {} not .docx, {} already in batch",
                report.rejected_type, report.rejected_duplicate
            ))
        );
    }
}

fn print_outcome(cli: &Cli, status: &Status, result: &Result<SavedArchive, BatchError>) {
    match (result, status.message()) {
        (Ok(saved), Some(msg)) => {
            if !cli.quiet {
                eprintln!(
                    "{} {}  {}",
                    green("✔"),
                    msg,
                    dim(&format!("{}ms", saved.duration_ms))
                );
            }
        }
        (Err(_), Some(msg)) => eprintln!("{} {}", red("✘"), msg),
        (Err(e), None) => eprintln!("{} {}", red("✘"), e.user_message()),
        (Ok(_), None) => {}
    }
}

fn print_summary(
    workflow: &Workflow,
    admissions: &[AdmissionReport],
    saved: Option<&SavedArchive>,
    failure: Option<FailureKind>,
) -> Result<()> {
    let summary = Summary {
        admissions,
        files: workflow.batch().iter().map(|c| c.name()).collect(),
        state: workflow.state(),
        status: workflow.status(),
        saved,
        failure,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
    );
    Ok(())
}
