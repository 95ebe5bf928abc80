use thiserror::Error;

/// Failure taxonomy for C4/C5/C6 persistence operations (§7).
#[derive(Error, Debug)]
pub enum StoreError {
  #[error("connection pool error: {0}")]
  PoolError(String),

  #[error("database query error: {0}")]
  QueryError(String),

  #[error("constraint violation: {0}")]
  ConstraintViolation(String),

  #[error("unknown reference name: {0}")]
  UnknownReference(String),

  #[error("transaction error: {0}")]
  TransactionError(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<diesel::result::Error> for StoreError {
  fn from(err: diesel::result::Error) -> Self {
    match err {
      diesel::result::Error::NotFound => {
        StoreError::UnknownReference("record not found".to_string())
      }
      diesel::result::Error::DatabaseError(kind, info) => match kind {
        diesel::result::DatabaseErrorKind::UniqueViolation => {
          StoreError::ConstraintViolation(info.message().to_string())
        }
        diesel::result::DatabaseErrorKind::ForeignKeyViolation => {
          StoreError::ConstraintViolation(info.message().to_string())
        }
        _ => StoreError::QueryError(info.message().to_string()),
      },
      _ => StoreError::QueryError(err.to_string()),
    }
  }
}

impl From<diesel::r2d2::PoolError> for StoreError {
  fn from(err: diesel::r2d2::PoolError) -> Self {
    StoreError::PoolError(err.to_string())
  }
}
