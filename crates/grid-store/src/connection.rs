use std::sync::Arc;
use std::time::Duration;

use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};

use crate::error::{StoreError, StoreResult};

pub type DbPool = Pool<ConnectionManager<PgConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<PgConnection>>;

const MAX_POOL_SIZE: u32 = 50;
const MIN_POOL_IDLE: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;

/// Establish a single, unpooled connection. Used for the fail-fast startup
/// check and by callers that only need one connection (migrations, tests).
pub fn establish_connection(database_url: &str) -> Result<PgConnection, diesel::ConnectionError> {
  PgConnection::establish(database_url)
}

/// Pooled access to the Postgres store. Shared by the Reference Resolver
/// (C4), Time-Series Writer (C5), and Job Tracker (C6) persistence layers.
#[derive(Clone)]
pub struct DatabaseContext {
  pool: Arc<DbPool>,
}

impl DatabaseContext {
  /// Fails fast if the database is unreachable, before the r2d2 pool spawns
  /// background threads that would otherwise retry forever.
  pub fn new(database_url: &str) -> StoreResult<Self> {
    establish_connection(database_url).map_err(|e| StoreError::PoolError(e.to_string()))?;

    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = Pool::builder()
      .max_size(MAX_POOL_SIZE)
      .min_idle(Some(MIN_POOL_IDLE))
      .connection_timeout(Duration::from_secs(CONNECTION_TIMEOUT_SECS))
      .build(manager)
      .map_err(|e| StoreError::PoolError(e.to_string()))?;

    Ok(Self { pool: Arc::new(pool) })
  }

  pub fn with_pool_config(database_url: &str, max_size: u32, min_idle: u32) -> StoreResult<Self> {
    establish_connection(database_url).map_err(|e| StoreError::PoolError(e.to_string()))?;

    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = Pool::builder()
      .max_size(max_size)
      .min_idle(Some(min_idle))
      .connection_timeout(Duration::from_secs(CONNECTION_TIMEOUT_SECS))
      .build(manager)
      .map_err(|e| StoreError::PoolError(e.to_string()))?;

    Ok(Self { pool: Arc::new(pool) })
  }

  pub fn get_connection(&self) -> StoreResult<DbConnection> {
    self.pool.get().map_err(StoreError::from)
  }

  pub fn pool(&self) -> &DbPool {
    &self.pool
  }

  pub fn transaction<F, R>(&self, f: F) -> StoreResult<R>
  where
    F: FnOnce(&mut DbConnection) -> StoreResult<R>,
  {
    let mut conn = self.get_connection()?;
    conn.transaction(|conn| f(conn))
  }

  /// Runs a blocking diesel operation on the blocking thread pool.
  pub async fn run<F, R>(&self, f: F) -> StoreResult<R>
  where
    F: FnOnce(&mut DbConnection) -> StoreResult<R> + Send + 'static,
    R: Send + 'static,
  {
    let pool = Arc::clone(&self.pool);
    tokio::task::spawn_blocking(move || {
      let mut conn = pool.get().map_err(StoreError::from)?;
      f(&mut conn)
    })
    .await
    .map_err(|e| StoreError::QueryError(format!("task join error: {e}")))?
  }
}
