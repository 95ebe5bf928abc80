use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::instrument;

use crate::error::Result;
use crate::forecast::LoadForecastErrorRow;
use crate::reserve::ReserveMarginRow;
use crate::spread::RtDaSpreadRow;
use crate::{DateRange, MetricsEngine};

/// How far past a rule's warning threshold a value sits (§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Warning,
  Critical,
}

impl Severity {
  pub fn as_str(&self) -> &'static str {
    match self {
      Severity::Warning => "warning",
      Severity::Critical => "critical",
    }
  }
}

/// One firing of one rule in the trading-signal rule panel (§4.9). Signals
/// are computed fresh on every call, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradingSignal {
  pub rule: &'static str,
  pub zone_name: Option<String>,
  pub ts: NaiveDateTime,
  pub value: f64,
  pub severity: Severity,
}

fn classify_spread(spread: f64) -> Option<Severity> {
  let magnitude = spread.abs();
  if magnitude >= 25.0 {
    Some(Severity::Critical)
  } else if magnitude >= 15.0 {
    Some(Severity::Warning)
  } else {
    None
  }
}

fn classify_forecast_error(error_percent: f64) -> Option<Severity> {
  let magnitude = error_percent.abs();
  if magnitude >= 10.0 {
    Some(Severity::Critical)
  } else if magnitude >= 5.0 {
    Some(Severity::Warning)
  } else {
    None
  }
}

fn classify_reserve_margin(margin_percent: f64) -> Option<Severity> {
  if margin_percent < 5.0 {
    Some(Severity::Critical)
  } else if margin_percent < 10.0 {
    Some(Severity::Warning)
  } else {
    None
  }
}

/// Pure computation: evaluates the three fixed rules (§4.9) against
/// already-computed metric rows and returns every firing, most-severe rules
/// first within a rule, by the ordering the caller supplied the rows in.
pub fn compute_trading_signals(
  spreads: &[RtDaSpreadRow],
  forecast_errors: &[LoadForecastErrorRow],
  reserve_margins: &[ReserveMarginRow],
) -> Vec<TradingSignal> {
  let mut out = Vec::new();

  for row in spreads {
    if let Some(severity) = classify_spread(row.spread) {
      out.push(TradingSignal { rule: "rt_da_spread", zone_name: Some(row.zone_name.clone()), ts: row.ts, value: row.spread, severity });
    }
  }

  for row in forecast_errors {
    let Some(error_percent) = row.error_percent else { continue };
    if let Some(severity) = classify_forecast_error(error_percent) {
      out.push(TradingSignal { rule: "load_forecast_error", zone_name: None, ts: row.hour, value: error_percent, severity });
    }
  }

  for row in reserve_margins {
    let Some(margin_percent) = row.margin_percent else { continue };
    if let Some(severity) = classify_reserve_margin(margin_percent) {
      out.push(TradingSignal { rule: "low_reserve_margin", zone_name: None, ts: row.ts, value: margin_percent, severity });
    }
  }

  out
}

impl MetricsEngine {
  /// `trading_signals` (§4.9): evaluates the rule panel against the most
  /// recent `window_hours` of data.
  #[instrument(skip(self))]
  pub async fn trading_signals(&self, window_hours: i64) -> Result<Vec<TradingSignal>> {
    let range = DateRange { start: Some(chrono::Utc::now().naive_utc() - chrono::Duration::hours(window_hours)), end: None };
    let spreads = self.rt_da_spread(range, None, None).await?;
    let forecast_errors = self.load_forecast_error(range, None).await?;
    let reserve_margins = self.reserve_margin(range).await?;
    Ok(compute_trading_signals(&spreads, &forecast_errors, &reserve_margins))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::NaiveDate;

  fn ts() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 11, 13).unwrap().and_hms_opt(14, 0, 0).unwrap()
  }

  fn spread_row(spread: f64) -> RtDaSpreadRow {
    RtDaSpreadRow { ts: ts(), zone_name: "WEST".into(), rt_lbmp: 0.0, da_lbmp: 0.0, spread, spread_percent: None }
  }

  fn reserve_row(margin_percent: f64) -> ReserveMarginRow {
    ReserveMarginRow { ts: ts(), total_generation_mw: 0.0, total_load_mw: 19000.0, margin_mw: 0.0, margin_percent: Some(margin_percent) }
  }

  #[test]
  fn spread_rule_escalates_from_warning_to_critical() {
    assert_eq!(classify_spread(16.0), Some(Severity::Warning));
    assert_eq!(classify_spread(-26.0), Some(Severity::Critical));
    assert_eq!(classify_spread(5.0), None);
  }

  #[test]
  fn low_reserve_margin_matches_the_spec_worked_example() {
    let rows = compute_trading_signals(&[], &[], &[reserve_row(-5.263)]);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].rule, "low_reserve_margin");
    assert_eq!(rows[0].severity, Severity::Critical);
  }

  #[test]
  fn severity_is_monotone_in_the_triggering_value() {
    let warning = compute_trading_signals(&[spread_row(15.0)], &[], &[]);
    let critical = compute_trading_signals(&[spread_row(30.0)], &[], &[]);
    assert_eq!(warning[0].severity, Severity::Warning);
    assert_eq!(critical[0].severity, Severity::Critical);
    assert!(critical[0].severity >= warning[0].severity);
  }

  #[test]
  fn below_every_threshold_fires_nothing() {
    assert!(compute_trading_signals(&[spread_row(1.0)], &[], &[reserve_row(50.0)]).is_empty());
  }
}
