#![warn(clippy::all)]

//! # grid-metrics
//!
//! On-read computed metrics (C9) and the external-interface regional view
//! (C10). Nothing here is persisted: every operation takes a filter and
//! returns a freshly-derived sequence of rows, recomputed from the store on
//! every call (§4.9).
//!
//! Each metric is split into a pure computation function (a plain
//! transformation over rows already in memory, unit-tested without a
//! database) and a thin [`MetricsEngine`] method that fetches the rows via
//! [`grid_store::DatabaseContext`] and hands them to that function - the
//! same fetch/compute split `grid_store::writer` uses for `classify`.

pub mod correlation;
pub mod error;
pub mod external;
pub mod forecast;
pub mod reserve;
pub mod signals;
pub mod spread;
pub mod volatility;

pub use correlation::CorrelationRow;
pub use error::{MetricsError, Result};
pub use external::{ExternalInterfaceRow, Region};
pub use forecast::LoadForecastErrorRow;
pub use reserve::ReserveMarginRow;
pub use signals::{Severity, TradingSignal};
pub use spread::{RtDaSpreadRow, ZoneSpreadRow};
pub use volatility::PriceVolatilityRow;

use chrono::NaiveDateTime;

/// C9/C10: derives metrics from the store's time-series tables on demand.
/// Holds nothing but a pooled connection; every call is independent and
/// side-effect free.
#[derive(Clone)]
pub struct MetricsEngine {
  store: grid_store::DatabaseContext,
}

impl MetricsEngine {
  pub fn new(store: grid_store::DatabaseContext) -> Self {
    MetricsEngine { store }
  }
}

/// A single zone-keyed numeric observation, the common shape fetched from
/// `rt_lbmp`, `da_lbmp`, `rt_load`, and `load_forecast` before a metric's own
/// alignment/aggregation logic runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneValue {
  pub ts: NaiveDateTime,
  pub zone_name: String,
  pub value: Option<f64>,
}

/// Closed `[start, end]` interval on `ts`, in operator-local time (§4.11).
/// Either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
  pub start: Option<NaiveDateTime>,
  pub end: Option<NaiveDateTime>,
}

impl DateRange {
  pub fn contains(&self, ts: NaiveDateTime) -> bool {
    self.start.is_none_or(|s| ts >= s) && self.end.is_none_or(|e| ts <= e)
  }
}
