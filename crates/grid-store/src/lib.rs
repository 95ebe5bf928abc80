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

//! # grid-store
//!
//! Postgres persistence for the grid ingestion workspace: pooled connections
//! (C4/C5/C6's shared [`DatabaseContext`]), the hand-written [`schema`], the
//! [`ReferenceResolver`] (C4), the [`TimeSeriesWriter`] (C5), and the
//! [`JobRepository`] (C6's durable half).

pub mod connection;
pub mod error;
pub mod job_repository;
pub mod resolver;
pub mod schema;
pub mod writer;

pub use connection::{establish_connection, DatabaseContext, DbConnection, DbPool};
pub use error::{StoreError, StoreResult};
pub use job_repository::JobRepository;
pub use resolver::ReferenceResolver;
pub use writer::{TimeSeriesWriter, WriteOutcome};
