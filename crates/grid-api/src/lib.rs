#![warn(clippy::all)]

//! # grid-api
//!
//! C11's parameter validation, pagination and response shaping, expressed as
//! plain domain values with no HTTP framing of its own - `grid-server` maps
//! [`error::ApiError`] onto status codes and query strings onto
//! [`params::QueryParams`].

pub mod error;
pub mod pagination;
pub mod params;

pub use error::{ApiError, Result};
pub use pagination::paginate;
pub use params::{parse_query, MarketType, QueryParams, ValidatedQuery, DEFAULT_LIMIT, MAX_LIMIT, MAX_WINDOW_HOURS, MIN_WINDOW_HOURS};
