use std::collections::HashMap;

use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};
use diesel::prelude::*;
use serde::Serialize;
use tracing::instrument;

use crate::error::Result;
use crate::{DateRange, MetricsEngine, ZoneValue};

/// One row of `load_forecast_error` (§4.9): one per hour, already summed
/// across every zone with both an actual average and a forecast value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadForecastErrorRow {
  pub hour: NaiveDateTime,
  pub total_actual_mw: f64,
  pub total_forecast_mw: f64,
  pub error_mw: f64,
  pub error_percent: Option<f64>,
}

fn truncate_to_hour(ts: NaiveDateTime) -> NaiveDateTime {
  NaiveDateTime::new(ts.date(), NaiveTime::from_hms_opt(ts.hour(), 0, 0).expect("hour() is always in range"))
}

/// Average of the present (non-null) 5-minute samples for one `(hour,
/// zone)`, or `None` if every sample in that bucket was null or there were
/// no samples at all.
fn hourly_zone_averages(actuals: &[ZoneValue]) -> HashMap<(NaiveDateTime, String), f64> {
  let mut sums: HashMap<(NaiveDateTime, String), (f64, usize)> = HashMap::new();
  for row in actuals {
    if let Some(value) = row.value {
      let key = (truncate_to_hour(row.ts), row.zone_name.clone());
      let entry = sums.entry(key).or_insert((0.0, 0));
      entry.0 += value;
      entry.1 += 1;
    }
  }
  sums.into_iter().map(|(key, (sum, count))| (key, sum / count as f64)).collect()
}

/// Looks up the actual average for `(hour, zone)`, falling back to
/// `hour - 1` then `hour + 1` when the exact hour has no samples (§4.9 "one
/// hour fuzzy window").
fn fuzzy_actual(averages: &HashMap<(NaiveDateTime, String), f64>, hour: NaiveDateTime, zone: &str) -> Option<f64> {
  averages
    .get(&(hour, zone.to_string()))
    .or_else(|| averages.get(&(hour - Duration::hours(1), zone.to_string())))
    .or_else(|| averages.get(&(hour + Duration::hours(1), zone.to_string())))
    .copied()
}

/// Pure computation: for every hour with at least one forecast value, sums
/// the per-zone actual averages (fuzzy-matched) against the per-zone
/// forecasts and emits the aggregate error for that hour.
pub fn compute_load_forecast_error(actuals: &[ZoneValue], forecasts: &[ZoneValue]) -> Vec<LoadForecastErrorRow> {
  let averages = hourly_zone_averages(actuals);

  let mut by_hour: HashMap<NaiveDateTime, Vec<&ZoneValue>> = HashMap::new();
  for row in forecasts {
    if row.value.is_some() {
      by_hour.entry(row.ts).or_default().push(row);
    }
  }

  let mut out = Vec::new();
  for (hour, rows) in by_hour {
    let mut total_actual_mw = 0.0;
    let mut total_forecast_mw = 0.0;
    for row in rows {
      let forecast = row.value.expect("filtered to Some above");
      total_forecast_mw += forecast;
      if let Some(actual) = fuzzy_actual(&averages, hour, &row.zone_name) {
        total_actual_mw += actual;
      }
    }

    let error_mw = total_actual_mw - total_forecast_mw;
    let error_percent = if total_forecast_mw == 0.0 { None } else { Some(100.0 * error_mw / total_forecast_mw) };
    out.push(LoadForecastErrorRow { hour, total_actual_mw, total_forecast_mw, error_mw, error_percent });
  }

  out.sort_by(|a, b| a.hour.cmp(&b.hour));
  out
}

impl MetricsEngine {
  /// `load_forecast_error` (§4.9): aggregate actual-vs-forecast load error
  /// per hour, across every zone.
  #[instrument(skip(self))]
  pub async fn load_forecast_error(&self, range: DateRange, zones: Option<Vec<String>>) -> Result<Vec<LoadForecastErrorRow>> {
    let store = self.store.clone();
    let zones_for_actual = zones.clone();
    let actuals = store.run(move |conn| fetch_rt_load(conn, range, zones_for_actual.as_deref())).await?;
    let store = self.store.clone();
    let forecasts = store.run(move |conn| fetch_load_forecast(conn, range, zones.as_deref())).await?;
    Ok(compute_load_forecast_error(&actuals, &forecasts))
  }
}

fn fetch_rt_load(conn: &mut grid_store::DbConnection, range: DateRange, zones: Option<&[String]>) -> Result<Vec<ZoneValue>> {
  use grid_store::schema::{rt_load, zones as zones_table};

  let canonical_zones: Option<Vec<String>> = zones.map(|zs| zs.iter().map(|z| grid_core::canonical_name(z)).collect());

  let mut query = rt_load::table.inner_join(zones_table::table.on(rt_load::zone_id.eq(zones_table::id))).into_boxed();
  if let Some(start) = range.start {
    query = query.filter(rt_load::ts.ge(start));
  }
  if let Some(end) = range.end {
    query = query.filter(rt_load::ts.le(end));
  }
  if let Some(names) = &canonical_zones {
    query = query.filter(zones_table::name.eq_any(names.clone()));
  }

  let rows = query.select((rt_load::ts, zones_table::name, rt_load::load_mw)).load::<(NaiveDateTime, String, Option<f64>)>(conn)?;
  Ok(rows.into_iter().map(|(ts, zone_name, value)| ZoneValue { ts, zone_name, value }).collect())
}

fn fetch_load_forecast(conn: &mut grid_store::DbConnection, range: DateRange, zones: Option<&[String]>) -> Result<Vec<ZoneValue>> {
  use grid_store::schema::{load_forecast, zones as zones_table};

  let canonical_zones: Option<Vec<String>> = zones.map(|zs| zs.iter().map(|z| grid_core::canonical_name(z)).collect());

  let mut query = load_forecast::table.inner_join(zones_table::table.on(load_forecast::zone_id.eq(zones_table::id))).into_boxed();
  if let Some(start) = range.start {
    query = query.filter(load_forecast::ts.ge(start));
  }
  if let Some(end) = range.end {
    query = query.filter(load_forecast::ts.le(end));
  }
  if let Some(names) = &canonical_zones {
    query = query.filter(zones_table::name.eq_any(names.clone()));
  }

  let rows = query
    .select((load_forecast::ts, zones_table::name, load_forecast::forecast_mw))
    .load::<(NaiveDateTime, String, Option<f64>)>(conn)?;
  Ok(rows.into_iter().map(|(ts, zone_name, value)| ZoneValue { ts, zone_name, value }).collect())
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::NaiveDate;

  fn hour13() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 11, 13).unwrap().and_hms_opt(13, 0, 0).unwrap()
  }

  #[test]
  fn matches_the_spec_worked_example() {
    let actuals: Vec<ZoneValue> = [0, 5, 10, 15, 20]
      .iter()
      .zip([1800.0, 1900.0, 2000.0, 2100.0, 2200.0])
      .map(|(min, mw)| ZoneValue { ts: hour13() + Duration::minutes(*min), zone_name: "WEST".into(), value: Some(mw) })
      .collect();
    let forecasts = vec![ZoneValue { ts: hour13(), zone_name: "WEST".into(), value: Some(1900.0) }];

    let rows = compute_load_forecast_error(&actuals, &forecasts);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].total_actual_mw, 2000.0);
    assert_eq!(rows[0].error_mw, 100.0);
    assert!((rows[0].error_percent.unwrap() - 5.263).abs() < 0.01);
  }

  #[test]
  fn falls_back_to_the_prior_hour_when_the_exact_hour_has_no_samples() {
    let actuals = vec![ZoneValue { ts: hour13() - Duration::minutes(10), zone_name: "WEST".into(), value: Some(2000.0) }];
    let forecasts = vec![ZoneValue { ts: hour13(), zone_name: "WEST".into(), value: Some(1900.0) }];
    let rows = compute_load_forecast_error(&actuals, &forecasts);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].total_actual_mw, 2000.0);
  }

  #[test]
  fn omits_zones_with_no_actual_anywhere_in_the_fuzzy_window() {
    let actuals: Vec<ZoneValue> = vec![];
    let forecasts = vec![ZoneValue { ts: hour13(), zone_name: "WEST".into(), value: Some(1900.0) }];
    let rows = compute_load_forecast_error(&actuals, &forecasts);
    assert_eq!(rows[0].total_actual_mw, 0.0);
    assert_eq!(rows[0].total_forecast_mw, 1900.0);
  }
}
