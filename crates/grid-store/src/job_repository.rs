use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use grid_models::job::{Job, JobOutcome, JobStatusField, LogLine};

use crate::connection::{DatabaseContext, DbConnection};
use crate::error::{StoreError, StoreResult};

/// C6: the durable half of the Job Tracker (§4.6). The in-memory decision
/// logic (skip-if-succeeded-unless-forced) lives in grid-ingest's
/// `JobTracker`, which calls through to this repository for the rows
/// themselves - this type knows nothing about scheduling or cadence.
#[derive(Clone)]
pub struct JobRepository {
  store: DatabaseContext,
}

impl JobRepository {
  pub fn new(store: DatabaseContext) -> Self {
    JobRepository { store }
  }

  /// Returns the most recent job for `(source_code, target_date)`, if any -
  /// used by the skip-if-succeeded check (§4.6).
  pub async fn latest(&self, source_code: &str, target_date: NaiveDate) -> StoreResult<Option<Job>> {
    let source_code = source_code.to_string();
    let store = self.store.clone();
    store.run(move |conn| find_latest(conn, &source_code, target_date)).await
  }

  /// Inserts a new `running` job row and returns its id (§4.6 `begin`).
  pub async fn begin(&self, source_code: &str, target_date: NaiveDate, started_at: NaiveDateTime) -> StoreResult<i64> {
    let source_code = source_code.to_string();
    let store = self.store.clone();
    store.run(move |conn| insert_running(conn, &source_code, target_date, started_at)).await
  }

  /// Marks a job terminal exactly once (§3: "updated exactly once on
  /// termination, and immutable afterward").
  pub async fn finish(&self, job_id: i64, finished_at: NaiveDateTime, outcome: JobOutcome) -> StoreResult<()> {
    let store = self.store.clone();
    store.run(move |conn| finish_job(conn, job_id, finished_at, outcome)).await
  }

  /// Appends one structured log line to a job (§3 `LogLine`).
  pub async fn append_log(&self, job_id: i64, level: &str, ts: NaiveDateTime, message: &str) -> StoreResult<()> {
    let level = level.to_string();
    let message = message.to_string();
    let store = self.store.clone();
    store.run(move |conn| insert_log_line(conn, job_id, &level, ts, &message)).await
  }

  pub async fn log_lines_for(&self, job_id: i64) -> StoreResult<Vec<LogLine>> {
    let store = self.store.clone();
    store.run(move |conn| select_log_lines(conn, job_id)).await
  }
}

fn row_to_job(row: JobRow) -> StoreResult<Job> {
  let status = row.status.parse().map_err(|e: grid_core::Error| StoreError::QueryError(e.to_string()))?;
  Ok(Job {
    id: row.id,
    source_code: row.source_code,
    target_date: row.target_date,
    started_at: row.started_at,
    finished_at: row.finished_at,
    status: JobStatusField(status),
    rows_inserted: row.rows_inserted,
    rows_updated: row.rows_updated,
    error_text: row.error_text,
  })
}

#[derive(Queryable)]
struct JobRow {
  id: i64,
  source_code: String,
  target_date: NaiveDate,
  started_at: NaiveDateTime,
  finished_at: Option<NaiveDateTime>,
  status: String,
  rows_inserted: i64,
  rows_updated: i64,
  error_text: Option<String>,
}

fn find_latest(conn: &mut DbConnection, source_code: &str, target_date: NaiveDate) -> StoreResult<Option<Job>> {
  use crate::schema::jobs::dsl;

  let row: Option<JobRow> = dsl::jobs
    .filter(dsl::source_code.eq(source_code).and(dsl::target_date.eq(target_date)))
    .order(dsl::started_at.desc())
    .select((
      dsl::id,
      dsl::source_code,
      dsl::target_date,
      dsl::started_at,
      dsl::finished_at,
      dsl::status,
      dsl::rows_inserted,
      dsl::rows_updated,
      dsl::error_text,
    ))
    .first(conn)
    .optional()?;

  row.map(row_to_job).transpose()
}

fn insert_running(
  conn: &mut DbConnection,
  source_code: &str,
  target_date: NaiveDate,
  started_at: NaiveDateTime,
) -> StoreResult<i64> {
  use crate::schema::jobs::dsl;

  diesel::insert_into(dsl::jobs)
    .values((
      dsl::source_code.eq(source_code),
      dsl::target_date.eq(target_date),
      dsl::started_at.eq(started_at),
      dsl::status.eq(grid_core::JobStatus::Running.as_str()),
      dsl::rows_inserted.eq(0i64),
      dsl::rows_updated.eq(0i64),
    ))
    .returning(dsl::id)
    .get_result(conn)
    .map_err(StoreError::from)
}

fn finish_job(conn: &mut DbConnection, job_id: i64, finished_at: NaiveDateTime, outcome: JobOutcome) -> StoreResult<()> {
  use crate::schema::jobs::dsl;

  diesel::update(dsl::jobs.filter(dsl::id.eq(job_id)))
    .set((
      dsl::finished_at.eq(finished_at),
      dsl::status.eq(outcome.status.as_str()),
      dsl::rows_inserted.eq(outcome.rows_inserted),
      dsl::rows_updated.eq(outcome.rows_updated),
      dsl::error_text.eq(&outcome.error_text),
    ))
    .execute(conn)
    .map(|_| ())
    .map_err(StoreError::from)
}

fn insert_log_line(conn: &mut DbConnection, job_id: i64, level: &str, ts: NaiveDateTime, message: &str) -> StoreResult<()> {
  use crate::schema::log_lines::dsl;

  diesel::insert_into(dsl::log_lines)
    .values((dsl::job_id.eq(job_id), dsl::level.eq(level), dsl::ts.eq(ts), dsl::message.eq(message)))
    .execute(conn)
    .map(|_| ())
    .map_err(StoreError::from)
}

fn select_log_lines(conn: &mut DbConnection, job_id: i64) -> StoreResult<Vec<LogLine>> {
  use crate::schema::log_lines::dsl;

  let rows: Vec<(i64, String, NaiveDateTime, String)> = dsl::log_lines
    .filter(dsl::job_id.eq(job_id))
    .order(dsl::ts.asc())
    .select((dsl::job_id, dsl::level, dsl::ts, dsl::message))
    .load(conn)?;

  Ok(rows.into_iter().map(|(job_id, level, ts, message)| LogLine { job_id, level, ts, message }).collect())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn job_row_maps_a_valid_status_string() {
    let row = JobRow {
      id: 1,
      source_code: "RT-LBMP".to_string(),
      target_date: NaiveDate::from_ymd_opt(2025, 11, 13).unwrap(),
      started_at: NaiveDate::from_ymd_opt(2025, 11, 13).unwrap().and_hms_opt(0, 0, 0).unwrap(),
      finished_at: None,
      status: "running".to_string(),
      rows_inserted: 0,
      rows_updated: 0,
      error_text: None,
    };
    let job = row_to_job(row).unwrap();
    assert_eq!(*job.status, grid_core::JobStatus::Running);
  }

  #[test]
  fn job_row_rejects_an_unrecognized_status_string() {
    let row = JobRow {
      id: 1,
      source_code: "RT-LBMP".to_string(),
      target_date: NaiveDate::from_ymd_opt(2025, 11, 13).unwrap(),
      started_at: NaiveDate::from_ymd_opt(2025, 11, 13).unwrap().and_hms_opt(0, 0, 0).unwrap(),
      finished_at: None,
      status: "not-a-status".to_string(),
      rows_inserted: 0,
      rows_updated: 0,
      error_text: None,
    };
    assert!(row_to_job(row).is_err());
  }
}
