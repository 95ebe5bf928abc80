//! # grid-workerpool
//!
//! Bounded-concurrency execution primitive used by the Scheduler (C8, §4.8
//! and §5): a fixed-size semaphore-gated pool that runs submitted jobs in
//! parallel without the scheduler itself blocking on any one job. Mirrors
//! the teacher's `loader-base` crate, which exists to provide "concurrency,
//! progress bars, statistics, and caching traits" shared across loaders -
//! generalized here into a single reusable pool rather than one bespoke
//! concurrency helper per loader.

#![warn(clippy::all)]

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

#[derive(Error, Debug)]
pub enum WorkerPoolError {
  #[error("worker pool semaphore closed")]
  Closed,
}

pub type Result<T> = std::result::Result<T, WorkerPoolError>;

/// A fixed-degree pool of concurrent execution slots (§4.8, §5:
/// "job execution is farmed out to a worker pool of configurable degree").
/// Submitting a job never blocks the caller for longer than it takes to
/// acquire a slot; each slot, once acquired, runs the job to completion on
/// the async runtime.
pub struct WorkerPool {
  semaphore: Arc<Semaphore>,
  degree: usize,
  in_flight: Arc<AtomicUsize>,
  completed: Arc<AtomicUsize>,
  progress: Option<ProgressBar>,
}

impl WorkerPool {
  /// Builds a pool with `degree` concurrent slots (`WORKER_POOL_SIZE`,
  /// default 4 per §6).
  pub fn new(degree: usize) -> Self {
    let degree = degree.max(1);
    WorkerPool {
      semaphore: Arc::new(Semaphore::new(degree)),
      degree,
      in_flight: Arc::new(AtomicUsize::new(0)),
      completed: Arc::new(AtomicUsize::new(0)),
      progress: None,
    }
  }

  /// Attaches a progress bar that advances once per completed job. Useful
  /// for `scrape --days N` batch runs from the CLI.
  pub fn with_progress(mut self, total: u64) -> Self {
    let bar = ProgressBar::new(total);
    bar.set_style(
      ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    self.progress = Some(bar);
    self
  }

  pub fn degree(&self) -> usize {
    self.degree
  }

  pub fn in_flight(&self) -> usize {
    self.in_flight.load(Ordering::SeqCst)
  }

  pub fn completed(&self) -> usize {
    self.completed.load(Ordering::SeqCst)
  }

  /// Submits one job, acquiring a slot first. Returns a [`JoinHandle`] for
  /// the spawned task rather than awaiting it, so the scheduler's tick loop
  /// (§4.8: "the scheduler does not block on any individual job") can move
  /// on to the next due fire immediately.
  pub fn submit<F, T>(&self, job: F) -> JoinHandle<T>
  where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
  {
    let semaphore = Arc::clone(&self.semaphore);
    let in_flight = Arc::clone(&self.in_flight);
    let completed = Arc::clone(&self.completed);
    let progress = self.progress.clone();

    tokio::spawn(async move {
      // Semaphore is never explicitly closed in this pool's lifetime, so a
      // closed error here would indicate the pool itself was dropped out
      // from under a still-running job - a programming error, not a
      // runtime condition this pool recovers from.
      let _permit = semaphore
        .acquire_owned()
        .await
        .expect("worker pool semaphore closed while a job was still submitted");

      in_flight.fetch_add(1, Ordering::SeqCst);
      let result = job.await;
      in_flight.fetch_sub(1, Ordering::SeqCst);
      completed.fetch_add(1, Ordering::SeqCst);
      if let Some(bar) = &progress {
        bar.inc(1);
      }
      result
    })
  }

  /// Blocks until every slot is free, i.e. all submitted jobs have
  /// completed. Used at shutdown to let in-flight jobs run to completion
  /// (§4.8) before the process exits.
  pub async fn drain(&self) {
    let _ = self.semaphore.acquire_many(self.degree as u32).await;
  }

  pub fn finish_progress(&self) {
    if let Some(bar) = &self.progress {
      bar.finish_and_clear();
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::AtomicU32;
  use std::time::Duration;

  #[tokio::test]
  async fn submitted_jobs_run_and_report_completion() {
    let pool = WorkerPool::new(2);
    let counter = Arc::new(AtomicU32::new(0));

    let mut handles = Vec::new();
    for _ in 0..5 {
      let counter = Arc::clone(&counter);
      handles.push(pool.submit(async move {
        counter.fetch_add(1, Ordering::SeqCst);
      }));
    }
    for h in handles {
      h.await.unwrap();
    }

    assert_eq!(counter.load(Ordering::SeqCst), 5);
    assert_eq!(pool.completed(), 5);
    assert_eq!(pool.in_flight(), 0);
  }

  #[tokio::test]
  async fn pool_caps_concurrency_at_its_configured_degree() {
    let pool = WorkerPool::new(2);
    let peak = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..6 {
      let peak = Arc::clone(&peak);
      let in_flight = pool.in_flight.clone();
      handles.push(pool.submit(async move {
        let current = in_flight.load(Ordering::SeqCst);
        peak.fetch_max(current, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
      }));
    }
    for h in handles {
      h.await.unwrap();
    }

    assert!(peak.load(Ordering::SeqCst) <= 2);
  }

  #[tokio::test]
  async fn drain_waits_for_all_slots_to_free() {
    let pool = WorkerPool::new(1);
    let flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let flag2 = Arc::clone(&flag);

    pool.submit(async move {
      tokio::time::sleep(Duration::from_millis(30)).await;
      flag2.store(true, Ordering::SeqCst);
    });

    pool.drain().await;
    assert!(flag.load(Ordering::SeqCst));
  }
}
