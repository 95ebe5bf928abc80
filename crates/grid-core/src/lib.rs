/*
 *
 *
 *
 *
 * MIT License
 * Copyright (c) 2025. Dwight J. Browne
 * dwight[-at-]dwightjbrowne[-dot-]com
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

//! # grid-core
//!
//! Shared foundation for the grid ingestion workspace:
//!
//! - [`Config`] - process-wide configuration loaded from the environment
//! - [`Error`] and [`Result`] - the error type shared by crates that have no
//!   domain-specific failure modes of their own
//! - [`Cadence`] and [`JobStatus`] - small enums referenced by every layer

pub mod cadence;
pub mod config;
pub mod error;

pub use cadence::{Cadence, JobStatus};
pub use config::Config;
pub use error::{Error, Result};

/// Default degree of the scheduler's worker pool when `WORKER_POOL_SIZE` is unset.
pub const DEFAULT_WORKER_POOL_SIZE: usize = 4;

/// Canonicalizes a zone or interface name per the case-normalization invariant
/// in §3: upper-cased, surrounding whitespace trimmed.
pub fn canonical_name(raw: &str) -> String {
  raw.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn canonical_name_trims_and_upcases() {
    assert_eq!(canonical_name("  west  "), "WEST");
    assert_eq!(canonical_name("Central"), "CENTRAL");
  }

  #[test]
  fn default_worker_pool_size_matches_spec_default() {
    assert_eq!(DEFAULT_WORKER_POOL_SIZE, 4);
  }
}
