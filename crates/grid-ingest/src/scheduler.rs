use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration as ChronoDuration, Local, LocalResult, NaiveTime, TimeZone, Timelike, Utc};
use grid_core::Cadence;
use grid_models::source::SourceCode;
use grid_models::Source;
use grid_workerpool::WorkerPool;
use tracing::{info, warn};

use crate::cancellation::CancellationToken;
use crate::orchestrator::Orchestrator;

const TICK_INTERVAL: StdDuration = StdDuration::from_secs(15);

/// C8: single-threaded cooperative loop that fires each source according to
/// its cadence (§4.8), farming the actual scrape out to a bounded
/// [`WorkerPool`] so the loop itself never blocks on one job.
pub struct Scheduler {
  sources: Vec<Source>,
  orchestrator: Arc<Orchestrator>,
  pool: WorkerPool,
  in_flight: Arc<Mutex<HashSet<SourceCode>>>,
  cancel: CancellationToken,
}

impl Scheduler {
  pub fn new(sources: Vec<Source>, orchestrator: Arc<Orchestrator>, pool_degree: usize) -> Self {
    Scheduler {
      sources,
      orchestrator,
      pool: WorkerPool::new(pool_degree),
      in_flight: Arc::new(Mutex::new(HashSet::new())),
      cancel: CancellationToken::new(),
    }
  }

  /// A clone of the token that, once cancelled, tells [`Self::run`] to stop
  /// firing new work and let the worker pool drain (§4.8, §5).
  pub fn cancellation_token(&self) -> CancellationToken {
    self.cancel.clone()
  }

  /// Fires every source once immediately (the warm-up pass, §4.8), then
  /// enters the tick loop: at each wakeup, pops every due `(next_fire,
  /// source)` entry from the priority queue, submits it, and re-queues the
  /// source's next fire. Returns once `cancel` fires, after letting
  /// in-flight jobs run to completion; pending fires still in the queue are
  /// discarded, not drained.
  pub async fn run(&self) {
    let now = Utc::now();
    let mut queue: BinaryHeap<Reverse<(DateTime<Utc>, SourceCode)>> = BinaryHeap::new();

    info!(sources = self.sources.len(), "warm-up pass: firing every source once");
    for source in &self.sources {
      self.fire(source);
      queue.push(Reverse((next_fire_after(source, now), source.code.clone())));
    }

    loop {
      if self.cancel.is_cancelled() {
        break;
      }

      let now = Utc::now();
      while let Some(Reverse((due, _))) = queue.peek() {
        if *due > now {
          break;
        }
        let Reverse((_, code)) = queue.pop().expect("peek just confirmed an entry exists");
        match self.sources.iter().find(|s| s.code == code) {
          Some(source) => {
            self.fire(source);
            queue.push(Reverse((next_fire_after(source, now), source.code.clone())));
          }
          None => warn!(source_code = %code, "due source no longer exists in the registry"),
        }
      }

      tokio::select! {
        _ = tokio::time::sleep(TICK_INTERVAL) => {}
        _ = self.cancel.cancelled() => break,
      }
    }

    info!("shutdown signalled: letting in-flight jobs run to completion, discarding pending fires");
    self.pool.drain().await;
  }

  /// Submits one source's scrape for today to the worker pool. Refuses the
  /// submission if a job for this source is already running, rather than
  /// queuing a second overlapping fire for the same key (§5).
  fn fire(&self, source: &Source) {
    {
      let mut in_flight = self.in_flight.lock().unwrap();
      if in_flight.contains(&source.code) {
        warn!(source_code = %source.code, "skipping fire: a job for this source is already running");
        return;
      }
      in_flight.insert(source.code.clone());
    }

    let orchestrator = Arc::clone(&self.orchestrator);
    let in_flight = Arc::clone(&self.in_flight);
    let source = source.clone();
    let cancel = self.cancel.clone();

    self.pool.submit(async move {
      let today = Utc::now().naive_utc().date();
      match orchestrator.scrape_one(&source, today, false, &cancel).await {
        Ok(job) => info!(source_code = %source.code, status = %*job.status, "scheduled job finished"),
        Err(e) => warn!(source_code = %source.code, error = %e, "scheduled job failed to run"),
      }
      in_flight.lock().unwrap().remove(&source.code);
    });
  }
}

/// Computes the next fire time for `source`'s cadence strictly after
/// `after` (§4.8's per-cadence rules).
fn next_fire_after(source: &Source, after: DateTime<Utc>) -> DateTime<Utc> {
  match *source.cadence {
    Cadence::Rt5 | Cadence::Snapshot => after + ChronoDuration::minutes(5),
    Cadence::Hourly => {
      let this_hour = after.date_naive().and_hms_opt(after.hour(), 0, 0).expect("hour() is always in range");
      Utc.from_utc_datetime(&this_hour) + ChronoDuration::hours(1)
    }
    Cadence::Daily => next_local_time_after(after, 1, 0),
    Cadence::MultiDaily => after + ChronoDuration::hours(6),
  }
}

/// Next UTC instant at which the operator's local wall-clock reads
/// `hour:minute`, strictly after `after` (§4.8 "daily: fire at 01:00
/// local").
fn next_local_time_after(after: DateTime<Utc>, hour: u32, minute: u32) -> DateTime<Utc> {
  let local_after = after.with_timezone(&Local);
  let target_time = NaiveTime::from_hms_opt(hour, minute, 0).expect("caller passes a valid wall-clock time");

  let mut candidate_date = local_after.date_naive();
  if local_after.time() >= target_time {
    candidate_date += ChronoDuration::days(1);
  }
  let naive_candidate = candidate_date.and_time(target_time);

  let candidate_local = match Local.from_local_datetime(&naive_candidate) {
    LocalResult::Single(dt) => dt,
    LocalResult::Ambiguous(earliest, _latest) => earliest,
    // DST spring-forward gap: no such wall-clock instant exists locally. Fall
    // back to treating the naive time as already UTC rather than panicking.
    LocalResult::None => return Utc.from_utc_datetime(&naive_candidate),
  };
  candidate_local.with_timezone(&Utc)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn source_with_cadence(cadence: Cadence) -> Source {
    Source {
      code: "TEST".to_string(),
      human_name: "Test Source".to_string(),
      category: "test".to_string(),
      cadence: cadence.into(),
      direct_url_template: "https://example.test/{YYYYMMDD}.csv".to_string(),
      archive_url_template: None,
      transformer_tag: "rt_lbmp".to_string(),
    }
  }

  #[test]
  fn rt5_fires_five_minutes_later() {
    let now = DateTime::parse_from_rfc3339("2025-11-13T12:03:00Z").unwrap().with_timezone(&Utc);
    let next = next_fire_after(&source_with_cadence(Cadence::Rt5), now);
    assert_eq!(next, now + ChronoDuration::minutes(5));
  }

  #[test]
  fn hourly_fires_at_the_next_top_of_hour() {
    let now = DateTime::parse_from_rfc3339("2025-11-13T12:34:00Z").unwrap().with_timezone(&Utc);
    let next = next_fire_after(&source_with_cadence(Cadence::Hourly), now);
    assert_eq!(next, DateTime::parse_from_rfc3339("2025-11-13T13:00:00Z").unwrap());
  }

  #[test]
  fn hourly_at_exact_top_of_hour_still_advances_a_full_hour() {
    let now = DateTime::parse_from_rfc3339("2025-11-13T12:00:00Z").unwrap().with_timezone(&Utc);
    let next = next_fire_after(&source_with_cadence(Cadence::Hourly), now);
    assert_eq!(next, DateTime::parse_from_rfc3339("2025-11-13T13:00:00Z").unwrap());
  }

  #[test]
  fn multi_daily_fires_six_hours_later() {
    let now = DateTime::parse_from_rfc3339("2025-11-13T00:00:00Z").unwrap().with_timezone(&Utc);
    let next = next_fire_after(&source_with_cadence(Cadence::MultiDaily), now);
    assert_eq!(next, now + ChronoDuration::hours(6));
  }

  #[test]
  fn daily_next_fire_is_always_in_the_future() {
    let now = Utc::now();
    let next = next_fire_after(&source_with_cadence(Cadence::Daily), now);
    assert!(next > now);
    assert!(next - now <= ChronoDuration::days(1) + ChronoDuration::hours(1));
  }
}
