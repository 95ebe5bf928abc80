/*
 *
 *
 *
 *
 * MIT License
 * Copyright (c) 2025. Dwight J. Browne
 * dwight[-dot-]browne[-at-]dwightjbrowne[-dot-]com
 *
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

use crate::error::{Error, Result};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;

/// Process-wide configuration, loaded once from the environment at the start
/// of every binary (`grid-cli`, `grid-server`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
  /// Connection string for the relational store.
  pub database_url: String,

  /// Bind host for the read API.
  pub api_host: String,

  /// Bind port for the read API.
  pub api_port: u16,

  /// Origins allowed to make cross-origin requests against the read API.
  /// Empty means same-origin only.
  pub allowed_origins: Vec<String>,

  /// Degree of the scheduler's worker pool.
  pub worker_pool_size: usize,

  /// Path to the plain-text source registry file.
  pub source_registry_path: String,
}

impl Config {
  /// Load configuration from environment variables, applying the defaults in
  /// the external-interfaces contract.
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let database_url =
      env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/grid_data".to_string());

    let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

    let api_port = env::var("API_PORT")
      .unwrap_or_else(|_| "8000".to_string())
      .parse()
      .map_err(|_| Error::Config("invalid API_PORT".to_string()))?;

    let allowed_origins = env::var("ALLOWED_ORIGINS")
      .map(|raw| {
        raw
          .split(',')
          .map(|s| s.trim().to_string())
          .filter(|s| !s.is_empty())
          .collect()
      })
      .unwrap_or_default();

    let worker_pool_size = env::var("WORKER_POOL_SIZE")
      .unwrap_or_else(|_| "4".to_string())
      .parse()
      .map_err(|_| Error::Config("invalid WORKER_POOL_SIZE".to_string()))?;

    let source_registry_path =
      env::var("SOURCE_REGISTRY_PATH").unwrap_or_else(|_| "registry.txt".to_string());

    Ok(Config { database_url, api_host, api_port, allowed_origins, worker_pool_size, source_registry_path })
  }

  /// A config with sensible defaults, for tests that never touch the
  /// environment.
  pub fn for_tests() -> Self {
    Config {
      database_url: "postgres://localhost/grid_test".to_string(),
      api_host: "127.0.0.1".to_string(),
      api_port: 8000,
      allowed_origins: Vec::new(),
      worker_pool_size: 4,
      source_registry_path: "registry.txt".to_string(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Mutex;

  static ENV_LOCK: Mutex<()> = Mutex::new(());

  #[test]
  fn test_config_from_env_defaults() {
    let _guard = ENV_LOCK.lock().unwrap();
    env::remove_var("DATABASE_URL");
    env::remove_var("API_HOST");
    env::remove_var("API_PORT");
    env::remove_var("ALLOWED_ORIGINS");
    env::remove_var("WORKER_POOL_SIZE");
    env::remove_var("SOURCE_REGISTRY_PATH");

    let config = Config::from_env().unwrap();
    assert_eq!(config.api_host, "127.0.0.1");
    assert_eq!(config.api_port, 8000);
    assert_eq!(config.worker_pool_size, 4);
    assert!(config.allowed_origins.is_empty());
  }

  #[test]
  fn test_config_allowed_origins_parsing() {
    let _guard = ENV_LOCK.lock().unwrap();
    env::set_var("ALLOWED_ORIGINS", "https://a.example, https://b.example");
    let config = Config::from_env().unwrap();
    assert_eq!(config.allowed_origins, vec!["https://a.example", "https://b.example"]);
    env::remove_var("ALLOWED_ORIGINS");
  }

  #[test]
  fn test_config_invalid_port() {
    let _guard = ENV_LOCK.lock().unwrap();
    env::set_var("API_PORT", "not-a-port");
    assert!(Config::from_env().is_err());
    env::remove_var("API_PORT");
  }
}
