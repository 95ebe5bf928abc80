use thiserror::Error;

/// Failure taxonomy for C3 (Normalizer), C6 (Job Tracker) and C7
/// (Orchestrator), per §7. `SchemaError` aborts a job before any write;
/// fetch- and store-shaped failures are wrapped from the crate that raised
/// them rather than re-declared here, matching the per-crate taxonomy
/// convention set in grid-core.
#[derive(Error, Debug)]
pub enum IngestError {
  #[error("schema error: {0}")]
  SchemaError(String),

  #[error("unknown transformer tag: {0}")]
  UnknownTransformer(String),

  #[error("fetch error: {0}")]
  Fetch(#[from] grid_fetch::FetchError),

  #[error("store error: {0}")]
  Store(#[from] grid_store::StoreError),

  #[error("job not found: {0}")]
  JobNotFound(String),
}

pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn schema_error_displays_its_message() {
    let err = IngestError::SchemaError("missing zone column".to_string());
    assert_eq!(err.to_string(), "schema error: missing zone column");
  }

  #[test]
  fn unknown_transformer_displays_the_tag() {
    let err = IngestError::UnknownTransformer("no_such_tag".to_string());
    assert!(err.to_string().contains("no_such_tag"));
  }
}
