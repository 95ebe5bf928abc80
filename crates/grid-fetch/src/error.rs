use thiserror::Error;

/// Failure taxonomy for C1/C2 (§7). `ConfigError` is fatal at boot;
/// everything else is local to a single fetch attempt and is translated by
/// the Orchestrator into a job outcome (§4.7).
#[derive(Error, Debug)]
pub enum FetchError {
  #[error("registry config error: {0}")]
  ConfigError(String),

  #[error("unknown source code: {0}")]
  UnknownSource(String),

  #[error("not found: {0}")]
  NotFoundError(String),

  #[error("transient error after retries exhausted: {0}")]
  TransientError(String),

  #[error("archive decode error: {0}")]
  DecodeError(String),
}

pub type Result<T> = std::result::Result<T, FetchError>;

impl From<grid_core::Error> for FetchError {
  fn from(err: grid_core::Error) -> Self {
    FetchError::ConfigError(err.to_string())
  }
}
