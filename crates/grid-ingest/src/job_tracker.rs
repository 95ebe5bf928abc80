use chrono::{NaiveDate, NaiveDateTime, Utc};
use grid_core::JobStatus;
use grid_models::job::{Job, JobOutcome, JobStatusField};
use grid_store::JobRepository;
use tracing::{error, info, warn};

use crate::error::Result;

/// What a caller gets back from [`JobTracker::begin`] (§4.6): either a fresh
/// job id to run the scrape under, or the `skipped` job row recorded in its
/// place. A skip still produces its own terminal Job row rather than
/// reusing the prior succeeded one, since Jobs are immutable once
/// terminal (§3) - this is a disclosed judgment call, see DESIGN.md.
pub enum BeginOutcome {
  Run { job_id: i64, started_at: NaiveDateTime },
  Skip { job: Job },
}

/// C6: wraps the durable [`JobRepository`] with the skip-if-succeeded policy
/// (§4.6) and projects `tracing` events into persisted [`LogLine`](grid_models::job::LogLine)
/// rows for the job currently in flight.
pub struct JobTracker {
  repo: JobRepository,
}

impl JobTracker {
  pub fn new(repo: JobRepository) -> Self {
    JobTracker { repo }
  }

  /// Starts a job for `(source_code, target_date)`, unless a prior job for
  /// the same key already succeeded and `force` is false (§4.6). A prior
  /// `failed` or `skipped` job never blocks a retry.
  pub async fn begin(&self, source_code: &str, target_date: NaiveDate, force: bool) -> Result<BeginOutcome> {
    if !force {
      if let Some(prior) = self.repo.latest(source_code, target_date).await? {
        if *prior.status == JobStatus::Succeeded {
          info!(source_code, %target_date, prior_job_id = prior.id, "skipping: already succeeded");
          let started_at = now_naive();
          let job_id = self.repo.begin(source_code, target_date, started_at).await?;
          let outcome = JobOutcome::skipped();
          self.repo.finish(job_id, started_at, outcome.clone()).await?;
          return Ok(BeginOutcome::Skip {
            job: build_job(job_id, source_code, target_date, started_at, started_at, outcome),
          });
        }
      }
    }

    let started_at = now_naive();
    let job_id = self.repo.begin(source_code, target_date, started_at).await?;
    info!(source_code, %target_date, job_id, "job started");
    Ok(BeginOutcome::Run { job_id, started_at })
  }

  /// Marks the job terminal, logs its outcome (§4.6 `finish`), and hands
  /// back the completed [`Job`] row so the Orchestrator can return it
  /// without a second round trip to the store.
  pub async fn finish(
    &self,
    job_id: i64,
    source_code: &str,
    target_date: NaiveDate,
    started_at: NaiveDateTime,
    outcome: JobOutcome,
  ) -> Result<Job> {
    let finished_at = now_naive();
    match outcome.status {
      JobStatus::Succeeded => {
        info!(job_id, inserted = outcome.rows_inserted, updated = outcome.rows_updated, "job succeeded");
      }
      JobStatus::Failed => {
        error!(job_id, error = outcome.error_text.as_deref().unwrap_or(""), "job failed");
      }
      JobStatus::Skipped => {
        warn!(job_id, "job skipped");
      }
      JobStatus::Pending | JobStatus::Running => {
        warn!(job_id, status = outcome.status.as_str(), "finish called with a non-terminal status");
      }
    }
    self.repo.finish(job_id, finished_at, outcome.clone()).await?;
    Ok(build_job(job_id, source_code, target_date, started_at, finished_at, outcome))
  }

  /// Appends one structured log line, durable alongside the job row (§3
  /// `LogLine`).
  pub async fn log(&self, job_id: i64, level: &str, message: &str) -> Result<()> {
    self.repo.append_log(job_id, level, now_naive(), message).await?;
    Ok(())
  }
}

fn now_naive() -> NaiveDateTime {
  Utc::now().naive_utc()
}

fn build_job(
  id: i64,
  source_code: &str,
  target_date: NaiveDate,
  started_at: NaiveDateTime,
  finished_at: NaiveDateTime,
  outcome: JobOutcome,
) -> Job {
  Job {
    id,
    source_code: source_code.to_string(),
    target_date,
    started_at,
    finished_at: Some(finished_at),
    status: JobStatusField(outcome.status),
    rows_inserted: outcome.rows_inserted,
    rows_updated: outcome.rows_updated,
    error_text: outcome.error_text,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn begin_outcome_variants_are_distinguishable() {
    let run = BeginOutcome::Run { job_id: 7, started_at: now_naive() };
    let skip = BeginOutcome::Skip {
      job: Job {
        id: 8,
        source_code: "RT-LBMP".to_string(),
        target_date: now_naive().date(),
        started_at: now_naive(),
        finished_at: Some(now_naive()),
        status: grid_core::JobStatus::Skipped.into(),
        rows_inserted: 0,
        rows_updated: 0,
        error_text: None,
      },
    };
    assert!(matches!(run, BeginOutcome::Run { job_id: 7, .. }));
    assert!(matches!(skip, BeginOutcome::Skip { .. }));
  }
}
