use chrono::{NaiveDate, NaiveDateTime};
use grid_metrics::DateRange;
use serde::Deserialize;

use crate::error::{ApiError, Result};

/// Default row cap applied when a caller omits `limit` (§4.11 "default
/// family-specific"; `grid-server` may override this per endpoint).
pub const DEFAULT_LIMIT: usize = 500;
pub const MAX_LIMIT: usize = 10_000;
pub const MIN_WINDOW_HOURS: i64 = 1;
pub const MAX_WINDOW_HOURS: i64 = 168;

/// Raw query-string values as handed over by the transport layer, before
/// validation. Every field is stringly-typed; this struct never assumes the
/// caller sent well-formed input.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct QueryParams {
  pub start_date: Option<String>,
  pub end_date: Option<String>,
  pub limit: Option<String>,
  pub zones: Option<String>,
  pub market_type: Option<String>,
  pub rto_name: Option<String>,
  pub interface_name: Option<String>,
  pub outage_type: Option<String>,
  pub fuel_type: Option<String>,
  pub service_type: Option<String>,
  pub window_hours: Option<String>,
  pub min_spread: Option<String>,
  pub max_error_percent: Option<String>,
  pub include_all_zones: Option<String>,
  /// Filters `trading_signals` to one rule (§8 scenario 6); not in §4.11's
  /// general parameter list since it applies to exactly one endpoint.
  pub signal_type: Option<String>,
}

/// Day-of-week market selector (§3 `market_type` discriminant).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketType {
  RealTime,
  DayAhead,
}

/// Every recognized query parameter (§4.11), parsed and range-checked.
/// Carries plain domain values; nothing here knows it arrived over HTTP.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedQuery {
  pub range: DateRange,
  pub limit: usize,
  pub zones: Option<Vec<String>>,
  pub market_type: Option<MarketType>,
  pub rto_name: Option<String>,
  pub interface_name: Option<String>,
  pub outage_type: Option<String>,
  pub fuel_type: Option<String>,
  pub service_type: Option<String>,
  pub window_hours: i64,
  pub min_spread: Option<f64>,
  pub max_error_percent: Option<f64>,
  pub include_all_zones: bool,
  pub signal_type: Option<String>,
}

fn parse_date_start(raw: &str) -> Result<NaiveDateTime> {
  NaiveDate::parse_from_str(raw, "%Y-%m-%d")
    .map(|d| d.and_hms_opt(0, 0, 0).expect("midnight is always valid"))
    .map_err(|_| ApiError::Malformed(format!("start_date {raw:?} is not YYYY-MM-DD")))
}

fn parse_date_end(raw: &str) -> Result<NaiveDateTime> {
  NaiveDate::parse_from_str(raw, "%Y-%m-%d")
    .map(|d| d.and_hms_opt(23, 59, 59).expect("end-of-day is always valid"))
    .map_err(|_| ApiError::Malformed(format!("end_date {raw:?} is not YYYY-MM-DD")))
}

fn parse_limit(raw: &str) -> Result<usize> {
  let value: usize = raw.parse().map_err(|_| ApiError::Malformed(format!("limit {raw:?} is not an integer")))?;
  if value < 1 || value > MAX_LIMIT {
    return Err(ApiError::OutOfRange(format!("limit {value} must be between 1 and {MAX_LIMIT}")));
  }
  Ok(value)
}

fn parse_zones(raw: &str) -> Vec<String> {
  raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(grid_core::canonical_name).collect()
}

fn parse_market_type(raw: &str) -> Result<MarketType> {
  match raw {
    "realtime" => Ok(MarketType::RealTime),
    "dayahead" => Ok(MarketType::DayAhead),
    other => Err(ApiError::Malformed(format!("market_type {other:?} must be 'realtime' or 'dayahead'"))),
  }
}

fn parse_window_hours(raw: &str) -> Result<i64> {
  let value: i64 = raw.parse().map_err(|_| ApiError::Malformed(format!("window_hours {raw:?} is not an integer")))?;
  if value < MIN_WINDOW_HOURS || value > MAX_WINDOW_HOURS {
    return Err(ApiError::OutOfRange(format!("window_hours {value} must be between {MIN_WINDOW_HOURS} and {MAX_WINDOW_HOURS}")));
  }
  Ok(value)
}

fn parse_f64(name: &str, raw: &str) -> Result<f64> {
  raw.parse().map_err(|_| ApiError::Malformed(format!("{name} {raw:?} is not a number")))
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
  match raw {
    "true" | "1" => Ok(true),
    "false" | "0" => Ok(false),
    other => Err(ApiError::Malformed(format!("{name} {other:?} is not a boolean"))),
  }
}

/// Validates every recognized query parameter (§4.11). Parse failures map to
/// `ApiError::Malformed` (`400`); range violations map to
/// `ApiError::OutOfRange` (`422`).
pub fn parse_query(raw: &QueryParams) -> Result<ValidatedQuery> {
  let start = raw.start_date.as_deref().map(parse_date_start).transpose()?;
  let end = raw.end_date.as_deref().map(parse_date_end).transpose()?;
  if let (Some(start), Some(end)) = (start, end) {
    if start > end {
      return Err(ApiError::OutOfRange(format!("start_date {start} is after end_date {end}")));
    }
  }

  let limit = raw.limit.as_deref().map(parse_limit).transpose()?.unwrap_or(DEFAULT_LIMIT);
  let zones = raw.zones.as_deref().map(parse_zones).filter(|z| !z.is_empty());
  let market_type = raw.market_type.as_deref().map(parse_market_type).transpose()?;
  let window_hours = raw.window_hours.as_deref().map(parse_window_hours).transpose()?.unwrap_or(24);
  let min_spread = raw.min_spread.as_deref().map(|s| parse_f64("min_spread", s)).transpose()?;
  let max_error_percent = raw.max_error_percent.as_deref().map(|s| parse_f64("max_error_percent", s)).transpose()?;
  let include_all_zones = raw.include_all_zones.as_deref().map(|s| parse_bool("include_all_zones", s)).transpose()?.unwrap_or(false);

  Ok(ValidatedQuery {
    range: DateRange { start, end },
    limit,
    zones,
    market_type,
    rto_name: raw.rto_name.clone(),
    interface_name: raw.interface_name.clone(),
    outage_type: raw.outage_type.clone(),
    fuel_type: raw.fuel_type.clone(),
    service_type: raw.service_type.clone(),
    window_hours,
    min_spread,
    max_error_percent,
    include_all_zones,
    signal_type: raw.signal_type.clone(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn empty() -> QueryParams {
    QueryParams::default()
  }

  #[test]
  fn defaults_limit_and_window_hours_when_omitted() {
    let q = parse_query(&empty()).unwrap();
    assert_eq!(q.limit, DEFAULT_LIMIT);
    assert_eq!(q.window_hours, 24);
    assert!(!q.include_all_zones);
  }

  #[test]
  fn rejects_malformed_start_date_as_400() {
    let raw = QueryParams { start_date: Some("11/13/2025".into()), ..empty() };
    assert!(matches!(parse_query(&raw), Err(ApiError::Malformed(_))));
  }

  #[test]
  fn rejects_out_of_range_limit_as_422() {
    let raw = QueryParams { limit: Some("0".into()), ..empty() };
    assert!(matches!(parse_query(&raw), Err(ApiError::OutOfRange(_))));

    let raw = QueryParams { limit: Some("20000".into()), ..empty() };
    assert!(matches!(parse_query(&raw), Err(ApiError::OutOfRange(_))));
  }

  #[test]
  fn rejects_window_hours_outside_one_to_168() {
    let raw = QueryParams { window_hours: Some("0".into()), ..empty() };
    assert!(matches!(parse_query(&raw), Err(ApiError::OutOfRange(_))));

    let raw = QueryParams { window_hours: Some("169".into()), ..empty() };
    assert!(matches!(parse_query(&raw), Err(ApiError::OutOfRange(_))));
  }

  #[test]
  fn rejects_start_date_after_end_date() {
    let raw = QueryParams { start_date: Some("2025-11-14".into()), end_date: Some("2025-11-13".into()), ..empty() };
    assert!(matches!(parse_query(&raw), Err(ApiError::OutOfRange(_))));
  }

  #[test]
  fn splits_and_canonicalizes_comma_separated_zones() {
    let raw = QueryParams { zones: Some(" west, east ,".into()), ..empty() };
    let q = parse_query(&raw).unwrap();
    assert_eq!(q.zones, Some(vec![grid_core::canonical_name("west"), grid_core::canonical_name("east")]));
  }

  #[test]
  fn rejects_unknown_market_type() {
    let raw = QueryParams { market_type: Some("weekend".into()), ..empty() };
    assert!(matches!(parse_query(&raw), Err(ApiError::Malformed(_))));
  }

  #[test]
  fn accepts_both_canonical_boolean_spellings() {
    let raw = QueryParams { include_all_zones: Some("1".into()), ..empty() };
    assert!(parse_query(&raw).unwrap().include_all_zones);

    let raw = QueryParams { include_all_zones: Some("false".into()), ..empty() };
    assert!(!parse_query(&raw).unwrap().include_all_zones);
  }
}
