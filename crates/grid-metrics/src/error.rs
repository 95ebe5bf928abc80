use thiserror::Error;

/// Failure taxonomy for C9/C10 (§7). Metrics are read-only derivations over
/// the store; the only way they fail is the store itself failing.
#[derive(Error, Debug)]
pub enum MetricsError {
  #[error("store error: {0}")]
  Store(#[from] grid_store::StoreError),
}

pub type Result<T> = std::result::Result<T, MetricsError>;
