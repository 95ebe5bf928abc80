use grid_metrics::MetricsEngine;
use grid_store::{DatabaseContext, StoreResult};

/// Shared across every handler: a connection pool for family reads and the
/// metrics engine for computed reads. Both are cheap to clone (`Arc` inside).
#[derive(Clone)]
pub struct AppState {
  pub store: DatabaseContext,
  pub metrics: MetricsEngine,
}

impl AppState {
  /// Builds the shared state from a database URL, failing fast (§4.5
  /// "fail fast" pattern already used by `DatabaseContext::new`) if the
  /// store is unreachable at startup.
  pub fn new(database_url: &str) -> StoreResult<Self> {
    let store = DatabaseContext::new(database_url)?;
    let metrics = MetricsEngine::new(store.clone());
    Ok(AppState { store, metrics })
  }
}
