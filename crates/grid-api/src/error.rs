use thiserror::Error;

/// Failure taxonomy for C11 (§7). The two parameter-facing variants map
/// directly to the HTTP status codes in §6: `Malformed` to `400`,
/// `OutOfRange` to `422`. `Metrics` carries whatever the computed-metrics
/// read path reported; `grid-server` translates it to `500`/`503` and
/// handles `grid-store`'s own `StoreError` the same way for family reads,
/// which this crate never issues directly.
#[derive(Error, Debug)]
pub enum ApiError {
  #[error("malformed parameter: {0}")]
  Malformed(String),

  #[error("parameter out of range: {0}")]
  OutOfRange(String),

  #[error(transparent)]
  Metrics(#[from] grid_metrics::MetricsError),
}

pub type Result<T> = std::result::Result<T, ApiError>;
