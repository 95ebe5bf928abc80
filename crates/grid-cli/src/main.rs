use std::process::ExitCode;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{ArgGroup, Parser, Subcommand};
use grid_core::{Config, JobStatus};
use grid_fetch::{Downloader, Registry};
use grid_ingest::{CancellationToken, JobTracker, Orchestrator, Scheduler};
use grid_models::Source;
use grid_store::{DatabaseContext, JobRepository, ReferenceResolver};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Exactly three verbs (§6 CLI surface): `scrape --date`, `scrape --days`,
/// `schedule`.
#[derive(Parser, Debug)]
#[command(name = "grid-cli", author, version, about, propagate_version = true)]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Scrape a single date, or the last N days, for one or more sources.
  Scrape(ScrapeArgs),
  /// Run the cooperative scheduler loop.
  Schedule(ScheduleArgs),
}

#[derive(clap::Args, Debug)]
#[command(group(ArgGroup::new("range").required(true).args(["date", "days"])))]
struct ScrapeArgs {
  /// Scrape this single date.
  #[arg(long, value_name = "YYYY-MM-DD")]
  date: Option<NaiveDate>,

  /// Scrape the last N days (today inclusive) for every matched source.
  #[arg(long)]
  days: Option<i64>,

  /// Restrict to these source codes; repeatable. Defaults to every
  /// registered source.
  #[arg(long = "code")]
  code: Vec<String>,

  /// Re-run even if a succeeded job already exists for this (source, date).
  /// Only meaningful with `--date`.
  #[arg(long)]
  force: bool,
}

#[derive(clap::Args, Debug)]
struct ScheduleArgs {
  /// Run the warm-up pass once and exit, instead of entering the tick loop.
  #[arg(long)]
  run_once: bool,
}

/// How the process should exit: success, or a Ctrl-C interrupt partway
/// through (§6 exit code 130), distinguished from outright failure (1/2).
enum Outcome {
  Success,
  Interrupted,
}

enum CliError {
  Config(anyhow::Error),
  Runtime(anyhow::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("grid_cli=info")))
    .init();

  let cli = Cli::parse();

  match run(cli).await {
    Ok(Outcome::Success) => ExitCode::from(0),
    Ok(Outcome::Interrupted) => {
      warn!("interrupted");
      ExitCode::from(130)
    }
    Err(CliError::Config(e)) => {
      error!("configuration error: {e:#}");
      ExitCode::from(1)
    }
    Err(CliError::Runtime(e)) => {
      error!("runtime error: {e:#}");
      ExitCode::from(2)
    }
  }
}

async fn run(cli: Cli) -> Result<Outcome, CliError> {
  let config = Config::from_env().map_err(|e| CliError::Config(e.into()))?;
  let registry = Registry::load(&config.source_registry_path).map_err(|e| CliError::Config(e.into()))?;

  let store = DatabaseContext::new(&config.database_url).map_err(|e| CliError::Runtime(e.into()))?;
  let resolver = Arc::new(ReferenceResolver::new(store.clone()));
  let tracker = JobTracker::new(JobRepository::new(store.clone()));
  let orchestrator = Arc::new(Orchestrator::new(Downloader::new(), resolver, store.clone(), tracker));

  match cli.command {
    Command::Scrape(args) => run_scrape(&orchestrator, &registry, args).await,
    Command::Schedule(args) => run_schedule(orchestrator, registry, config.worker_pool_size, args).await,
  }
}

/// Resolves `--code` against the registry, falling back to every registered
/// source when none were given.
fn resolve_sources(registry: &Registry, codes: &[String]) -> Result<Vec<Source>, CliError> {
  if codes.is_empty() {
    return Ok(registry.all().cloned().collect());
  }

  codes
    .iter()
    .map(|code| {
      registry
        .get(code)
        .cloned()
        .ok_or_else(|| CliError::Config(anyhow::anyhow!("unknown source code: {code}")))
    })
    .collect()
}

async fn run_scrape(orchestrator: &Orchestrator, registry: &Registry, args: ScrapeArgs) -> Result<Outcome, CliError> {
  let sources = resolve_sources(registry, &args.code)?;
  let cancel = CancellationToken::new();
  let ctrl_c = tokio::spawn({
    let cancel = cancel.clone();
    async move {
      if tokio::signal::ctrl_c().await.is_ok() {
        cancel.cancel();
      }
    }
  });

  let jobs = if let Some(date) = args.date {
    let mut jobs = Vec::with_capacity(sources.len());
    for source in &sources {
      if cancel.is_cancelled() {
        break;
      }
      let job = orchestrator.scrape_one(source, date, args.force, &cancel).await.map_err(|e| CliError::Runtime(e.into()))?;
      jobs.push(job);
    }
    jobs
  } else {
    let days = args.days.expect("clap's ArgGroup guarantees date xor days");
    orchestrator.scrape_recent(&sources, days, &cancel).await.map_err(|e| CliError::Runtime(e.into()))?
  };

  ctrl_c.abort();
  report_jobs(&jobs);

  if cancel.is_cancelled() {
    return Ok(Outcome::Interrupted);
  }
  if jobs.iter().any(|job| *job.status == JobStatus::Failed) {
    return Err(CliError::Runtime(anyhow::anyhow!("{} of {} job(s) failed", jobs.iter().filter(|j| *j.status == JobStatus::Failed).count(), jobs.len())));
  }
  Ok(Outcome::Success)
}

async fn run_schedule(orchestrator: Arc<Orchestrator>, registry: Registry, pool_degree: usize, args: ScheduleArgs) -> Result<Outcome, CliError> {
  let sources: Vec<Source> = registry.all().cloned().collect();
  let scheduler = Scheduler::new(sources, orchestrator, pool_degree);

  if args.run_once {
    // Fire the warm-up pass and return without entering the tick loop.
    let cancel = scheduler.cancellation_token();
    cancel.cancel();
    scheduler.run().await;
    return Ok(Outcome::Success);
  }

  let cancel = scheduler.cancellation_token();
  tokio::select! {
    _ = scheduler.run() => Ok(Outcome::Success),
    result = tokio::signal::ctrl_c() => {
      if result.is_ok() {
        info!("received interrupt; letting in-flight jobs drain");
      }
      cancel.cancel();
      Ok(Outcome::Interrupted)
    }
  }
}

fn report_jobs(jobs: &[grid_models::job::Job]) {
  for job in jobs {
    match *job.status {
      JobStatus::Succeeded => info!(
        source_code = %job.source_code, target_date = %job.target_date,
        inserted = job.rows_inserted, updated = job.rows_updated,
        "succeeded"
      ),
      JobStatus::Skipped => info!(source_code = %job.source_code, target_date = %job.target_date, "skipped: already succeeded"),
      JobStatus::Failed => error!(
        source_code = %job.source_code, target_date = %job.target_date,
        error = job.error_text.as_deref().unwrap_or("unknown"),
        "failed"
      ),
      JobStatus::Pending | JobStatus::Running => warn!(source_code = %job.source_code, target_date = %job.target_date, "still in a non-terminal state"),
    }
  }
}
