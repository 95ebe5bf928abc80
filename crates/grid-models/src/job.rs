use chrono::NaiveDateTime;
use grid_core::JobStatus;
use serde::{Deserialize, Serialize};

/// One record per scrape attempt (§3 `Job`). Created by the Orchestrator at
/// the start of every attempt, updated exactly once on termination, and
/// immutable afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
  pub id: i64,
  pub source_code: String,
  pub target_date: chrono::NaiveDate,
  pub started_at: NaiveDateTime,
  pub finished_at: Option<NaiveDateTime>,
  pub status: JobStatusField,
  pub rows_inserted: i64,
  pub rows_updated: i64,
  pub error_text: Option<String>,
}

/// Serde wrapper around [`JobStatus`]; see [`crate::source::CadenceField`]
/// for why the wrapping lives here instead of in grid-core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobStatusField(pub JobStatus);

impl From<JobStatus> for JobStatusField {
  fn from(s: JobStatus) -> Self {
    JobStatusField(s)
  }
}

impl std::ops::Deref for JobStatusField {
  type Target = JobStatus;
  fn deref(&self) -> &JobStatus {
    &self.0
  }
}

impl Serialize for JobStatusField {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(self.0.as_str())
  }
}

impl<'de> Deserialize<'de> for JobStatusField {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: serde::Deserializer<'de>,
  {
    let raw = String::deserialize(deserializer)?;
    raw.parse::<JobStatus>().map(JobStatusField).map_err(serde::de::Error::custom)
  }
}

/// Append-only per-job log entry (§3 `LogLine`). Rows are a durable
/// projection of the structured `tracing` output emitted during a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogLine {
  pub job_id: i64,
  pub level: String,
  pub ts: NaiveDateTime,
  pub message: String,
}

/// Outcome of a finished job, as reported by the Orchestrator to the Job
/// Tracker (§4.6 `finish`).
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
  pub status: JobStatus,
  pub rows_inserted: i64,
  pub rows_updated: i64,
  pub error_text: Option<String>,
}

impl JobOutcome {
  pub fn succeeded(rows_inserted: i64, rows_updated: i64) -> Self {
    JobOutcome { status: JobStatus::Succeeded, rows_inserted, rows_updated, error_text: None }
  }

  pub fn skipped() -> Self {
    JobOutcome { status: JobStatus::Skipped, rows_inserted: 0, rows_updated: 0, error_text: None }
  }

  pub fn failed(error_text: impl Into<String>) -> Self {
    JobOutcome {
      status: JobStatus::Failed,
      rows_inserted: 0,
      rows_updated: 0,
      error_text: Some(error_text.into()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn job_status_field_round_trips() {
    let field: JobStatusField = JobStatus::Failed.into();
    let json = serde_json::to_string(&field).unwrap();
    assert_eq!(json, "\"failed\"");
    let back: JobStatusField = serde_json::from_str(&json).unwrap();
    assert_eq!(*back, JobStatus::Failed);
  }

  #[test]
  fn job_outcome_constructors_set_expected_status() {
    assert_eq!(JobOutcome::succeeded(3, 1).status, JobStatus::Succeeded);
    assert_eq!(JobOutcome::skipped().status, JobStatus::Skipped);
    assert_eq!(JobOutcome::failed("boom").status, JobStatus::Failed);
  }
}
