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

//! # grid-ingest
//!
//! CSV normalization, job tracking, scheduling and orchestration for the
//! grid ingestion core:
//!
//! - [`csv_shape`] / [`numeric`] / [`timestamp`]: shared parsing helpers used
//!   by every per-family transformer.
//! - [`transformers`] / [`normalizer`]: C3, dispatching a raw CSV payload to
//!   its registered transformer and collapsing duplicate keys.
//! - [`job_tracker`]: C6's in-memory half (skip-if-succeeded policy) over
//!   [`grid_store::JobRepository`]'s durable rows.
//! - [`orchestrator`]: C7, driving fetch → normalize → write → finish for
//!   one `(source, date)` pair.
//! - [`scheduler`]: C8's cooperative per-cadence fire loop.
//! - [`cancellation`]: the cooperative shutdown signal shared by the two.

pub mod cancellation;
pub mod csv_shape;
pub mod error;
pub mod job_tracker;
pub mod normalizer;
pub mod numeric;
pub mod orchestrator;
pub mod scheduler;
pub mod timestamp;
pub mod transformers;

pub use cancellation::CancellationToken;
pub use error::{IngestError, Result};
pub use job_tracker::{BeginOutcome, JobTracker};
pub use normalizer::{NormalizeOutcome, Normalizer};
pub use orchestrator::Orchestrator;
pub use scheduler::Scheduler;
