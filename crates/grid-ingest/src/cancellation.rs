use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Cooperative shutdown signal shared between the Scheduler (C8) and every
/// job the Orchestrator (C7) currently has in flight (§4.8: "in-flight jobs
/// are allowed to run to completion; pending fires are discarded"). Checked
/// at I/O points rather than used to abort a task outright, so a job never
/// stops mid-write.
#[derive(Clone)]
pub struct CancellationToken {
  inner: Arc<Inner>,
}

struct Inner {
  cancelled: AtomicBool,
  notify: Notify,
}

impl CancellationToken {
  pub fn new() -> Self {
    CancellationToken { inner: Arc::new(Inner { cancelled: AtomicBool::new(false), notify: Notify::new() }) }
  }

  pub fn cancel(&self) {
    self.inner.cancelled.store(true, Ordering::SeqCst);
    self.inner.notify.notify_waiters();
  }

  pub fn is_cancelled(&self) -> bool {
    self.inner.cancelled.load(Ordering::SeqCst)
  }

  /// Resolves once `cancel` has been called; resolves immediately if it
  /// already has.
  pub async fn cancelled(&self) {
    if self.is_cancelled() {
      return;
    }
    let notified = self.inner.notify.notified();
    if self.is_cancelled() {
      return;
    }
    notified.await;
  }
}

impl Default for CancellationToken {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn cancelled_resolves_immediately_once_cancel_has_been_called() {
    let token = CancellationToken::new();
    token.cancel();
    assert!(token.is_cancelled());
    token.cancelled().await;
  }

  #[tokio::test]
  async fn cancelled_wakes_a_waiter_when_cancel_is_called_later() {
    let token = CancellationToken::new();
    let waiter = token.clone();
    let handle = tokio::spawn(async move {
      waiter.cancelled().await;
    });
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    token.cancel();
    tokio::time::timeout(std::time::Duration::from_secs(1), handle).await.unwrap().unwrap();
  }
}
