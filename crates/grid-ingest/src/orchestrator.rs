use std::sync::Arc;

use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use grid_fetch::{Downloader, FetchError};
use grid_models::job::{Job, JobOutcome};
use grid_models::Source;
use grid_store::{ReferenceResolver, TimeSeriesWriter};
use tracing::{info, instrument, warn};

use crate::cancellation::CancellationToken;
use crate::error::{IngestError, Result};
use crate::job_tracker::{BeginOutcome, JobTracker};
use crate::normalizer::Normalizer;

/// C7: drives C2 (Downloader) → C3 (Normalizer) → C4 (Reference Resolver) →
/// C5 (Writer) → C6 (Job Tracker) for one `(source, date)` pair, per the
/// five-step algorithm in §4.7.
pub struct Orchestrator {
  downloader: Downloader,
  normalizer: Normalizer,
  writer: TimeSeriesWriter,
  tracker: JobTracker,
}

impl Orchestrator {
  pub fn new(downloader: Downloader, resolver: Arc<ReferenceResolver>, store: grid_store::DatabaseContext, tracker: JobTracker) -> Self {
    Orchestrator { downloader, normalizer: Normalizer::new(), writer: TimeSeriesWriter::new(store, resolver), tracker }
  }

  /// Scrapes one source for one target date (§4.7). `cancel` is checked
  /// before each I/O-bound step; a cancellation observed between the fetch
  /// and the write finishes the job `failed` rather than leaving it
  /// `running` forever (§4.8 "in-flight jobs are allowed to run to
  /// completion" - a job caught by cancellation before it started any I/O
  /// never ran, so there is nothing to let finish).
  #[instrument(skip(self, source, cancel), fields(source_code = %source.code, %date))]
  pub async fn scrape_one(&self, source: &Source, date: NaiveDate, force: bool, cancel: &CancellationToken) -> Result<Job> {
    let (job_id, started_at) = match self.tracker.begin(&source.code, date, force).await? {
      BeginOutcome::Skip { job } => return Ok(job),
      BeginOutcome::Run { job_id, started_at } => (job_id, started_at),
    };

    if cancel.is_cancelled() {
      warn!(job_id, "cancelled before any I/O; finishing failed");
      return Ok(self
        .tracker
        .finish(job_id, &source.code, date, started_at, JobOutcome::failed("cancelled before start"))
        .await?);
    }

    let (bytes, url_used) = match self.downloader.fetch_or_archive(source, date).await {
      Ok(result) => result,
      Err(FetchError::NotFoundError(msg)) => {
        let outcome = if *source.cadence == grid_core::Cadence::Snapshot {
          info!(job_id, "snapshot source returned 404; treating as an empty, successful scrape");
          JobOutcome::succeeded(0, 0)
        } else {
          JobOutcome::failed(format!("not found: {msg}"))
        };
        return Ok(self.tracker.finish(job_id, &source.code, date, started_at, outcome).await?);
      }
      Err(other) => {
        let outcome = JobOutcome::failed(other.to_string());
        return Ok(self.tracker.finish(job_id, &source.code, date, started_at, outcome).await?);
      }
    };
    info!(job_id, url_used, bytes = bytes.len(), "fetched payload");

    if cancel.is_cancelled() {
      let outcome = JobOutcome::failed("cancelled after fetch, before normalize");
      return Ok(self.tracker.finish(job_id, &source.code, date, started_at, outcome).await?);
    }

    // Snapshot rows are stamped with the job's start time, not
    // download-complete time, so a scrape has exactly one wall-clock
    // reading associated with it (see DESIGN.md).
    let normalized = match self.normalizer.normalize(&source.transformer_tag, &bytes, started_at) {
      Ok(n) => n,
      Err(IngestError::SchemaError(msg)) => {
        let outcome = JobOutcome::failed(format!("schema error: {msg}"));
        return Ok(self.tracker.finish(job_id, &source.code, date, started_at, outcome).await?);
      }
      Err(other) => {
        let outcome = JobOutcome::failed(other.to_string());
        return Ok(self.tracker.finish(job_id, &source.code, date, started_at, outcome).await?);
      }
    };
    if normalized.parse_warnings > 0 {
      self
        .tracker
        .log(job_id, "warn", &format!("{} row(s) skipped for an unparseable timestamp or key field", normalized.parse_warnings))
        .await?;
    }
    if normalized.duplicates_collapsed > 0 {
      self
        .tracker
        .log(job_id, "info", &format!("{} duplicate row(s) collapsed to their last occurrence", normalized.duplicates_collapsed))
        .await?;
    }

    if cancel.is_cancelled() {
      let outcome = JobOutcome::failed("cancelled after normalize, before write");
      return Ok(self.tracker.finish(job_id, &source.code, date, started_at, outcome).await?);
    }

    let outcome = match self.writer.write(normalized.records).await {
      Ok(write_outcome) => JobOutcome::succeeded(write_outcome.inserted, write_outcome.updated),
      Err(e) => JobOutcome::failed(e.to_string()),
    };

    Ok(self.tracker.finish(job_id, &source.code, date, started_at, outcome).await?)
  }

  /// Scrapes every date in `[start, end]` (inclusive) for one source (§4.7
  /// `scrape_range`). Stops early, without scraping remaining dates, once
  /// `cancel` fires - a partial range is reported as-is rather than padded
  /// with synthetic failures.
  pub async fn scrape_range(&self, source: &Source, start: NaiveDate, end: NaiveDate, force: bool, cancel: &CancellationToken) -> Result<Vec<Job>> {
    let mut jobs = Vec::new();
    let mut date = start;
    while date <= end {
      if cancel.is_cancelled() {
        break;
      }
      jobs.push(self.scrape_one(source, date, force, cancel).await?);
      date += ChronoDuration::days(1);
    }
    Ok(jobs)
  }

  /// Scrapes the last `days` days (today inclusive) for every source in
  /// `sources` (§4.7 `scrape_recent`).
  pub async fn scrape_recent(&self, sources: &[Source], days: i64, cancel: &CancellationToken) -> Result<Vec<Job>> {
    let today = Utc::now().naive_utc().date();
    let start = today - ChronoDuration::days((days - 1).max(0));
    let mut jobs = Vec::new();
    for source in sources {
      if cancel.is_cancelled() {
        break;
      }
      jobs.extend(self.scrape_range(source, start, today, false, cancel).await?);
    }
    Ok(jobs)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample_source() -> Source {
    Source {
      code: "RT-LBMP".to_string(),
      human_name: "Real-Time LBMP".to_string(),
      category: "pricing".to_string(),
      cadence: grid_core::Cadence::Rt5.into(),
      direct_url_template: "https://example.test/{YYYYMMDD}rt.csv".to_string(),
      archive_url_template: None,
      transformer_tag: "rt_lbmp".to_string(),
    }
  }

  #[test]
  fn scrape_recent_computes_an_inclusive_start_date() {
    let today = NaiveDate::from_ymd_opt(2025, 11, 13).unwrap();
    let start = today - ChronoDuration::days((3i64 - 1).max(0));
    assert_eq!(start, NaiveDate::from_ymd_opt(2025, 11, 11).unwrap());
  }

  #[test]
  fn sample_source_has_rt5_cadence() {
    assert_eq!(*sample_source().cadence, grid_core::Cadence::Rt5);
  }
}
