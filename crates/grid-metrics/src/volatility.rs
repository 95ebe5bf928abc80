use std::collections::HashMap;

use chrono::{Duration, NaiveDateTime};
use diesel::prelude::*;
use serde::Serialize;
use statrs::statistics::Statistics;
use tracing::instrument;

use crate::error::Result;
use crate::{DateRange, MetricsEngine, ZoneValue};

/// One row of `price_volatility` (§4.9): rolling coefficient of variation of
/// RT LBMP, expressed as a percentage. `None` when the trailing window held
/// fewer than two samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceVolatilityRow {
  pub ts: NaiveDateTime,
  pub zone_name: String,
  pub volatility_percent: Option<f64>,
}

/// Pure computation: for every `(ts, zone)` in `rt`, looks back
/// `window_hours` from that endpoint (inclusive) within the same zone and
/// computes `100 * std_dev / mean` over the samples found. Rows are
/// produced for every endpoint in the input, even when the window is too
/// sparse to produce a value, per §4.9 "insufficient sample returns null".
pub fn compute_price_volatility(rt: &[ZoneValue], window_hours: i64) -> Vec<PriceVolatilityRow> {
  let mut by_zone: HashMap<&str, Vec<(NaiveDateTime, f64)>> = HashMap::new();
  for row in rt {
    if let Some(value) = row.value {
      by_zone.entry(row.zone_name.as_str()).or_default().push((row.ts, value));
    }
  }
  for series in by_zone.values_mut() {
    series.sort_by_key(|(ts, _)| *ts);
  }

  let window = Duration::hours(window_hours.max(0));
  let mut out = Vec::new();

  for (zone_name, series) in &by_zone {
    for &(endpoint, _) in series {
      let start = endpoint - window;
      let samples: Vec<f64> = series.iter().filter(|(ts, _)| *ts >= start && *ts <= endpoint).map(|(_, v)| *v).collect();

      let volatility_percent = if samples.len() < 2 {
        None
      } else {
        let mean = samples.iter().copied().mean();
        if mean == 0.0 {
          None
        } else {
          let std_dev = samples.iter().copied().std_dev();
          Some(100.0 * std_dev / mean)
        }
      };

      out.push(PriceVolatilityRow { ts: endpoint, zone_name: zone_name.to_string(), volatility_percent });
    }
  }

  out.sort_by(|a, b| a.ts.cmp(&b.ts).then_with(|| a.zone_name.cmp(&b.zone_name)));
  out
}

impl MetricsEngine {
  /// `price_volatility` (§4.9): rolling RT LBMP coefficient of variation
  /// over a caller-supplied trailing window, one row per `(ts, zone)`.
  #[instrument(skip(self))]
  pub async fn price_volatility(&self, range: DateRange, zones: Option<Vec<String>>, window_hours: i64) -> Result<Vec<PriceVolatilityRow>> {
    let store = self.store.clone();
    let lookback_start = range.start.map(|s| s - Duration::hours(window_hours.max(0)));
    let fetch_range = crate::DateRange { start: lookback_start.or(range.start), end: range.end };
    let rt = store.run(move |conn| fetch_rt_lbmp(conn, fetch_range, zones.as_deref())).await?;
    let mut rows = compute_price_volatility(&rt, window_hours);
    if let Some(start) = range.start {
      rows.retain(|r| r.ts >= start);
    }
    Ok(rows)
  }
}

fn fetch_rt_lbmp(conn: &mut grid_store::DbConnection, range: DateRange, zones: Option<&[String]>) -> Result<Vec<ZoneValue>> {
  use grid_store::schema::{rt_lbmp, zones as zones_table};

  let canonical_zones: Option<Vec<String>> = zones.map(|zs| zs.iter().map(|z| grid_core::canonical_name(z)).collect());

  let mut query = rt_lbmp::table.inner_join(zones_table::table.on(rt_lbmp::zone_id.eq(zones_table::id))).into_boxed();
  if let Some(start) = range.start {
    query = query.filter(rt_lbmp::ts.ge(start));
  }
  if let Some(end) = range.end {
    query = query.filter(rt_lbmp::ts.le(end));
  }
  if let Some(names) = &canonical_zones {
    query = query.filter(zones_table::name.eq_any(names.clone()));
  }

  let rows = query.select((rt_lbmp::ts, zones_table::name, rt_lbmp::lbmp)).load::<(NaiveDateTime, String, Option<f64>)>(conn)?;
  Ok(rows.into_iter().map(|(ts, zone_name, value)| ZoneValue { ts, zone_name, value }).collect())
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::NaiveDate;

  fn ts(h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 11, 13).unwrap().and_hms_opt(h, 0, 0).unwrap()
  }

  #[test]
  fn returns_null_when_the_window_holds_a_single_sample() {
    let rt = vec![ZoneValue { ts: ts(0), zone_name: "WEST".into(), value: Some(42.0) }];
    let rows = compute_price_volatility(&rt, 24);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].volatility_percent, None);
  }

  #[test]
  fn computes_coefficient_of_variation_over_the_trailing_window() {
    let rt = vec![
      ZoneValue { ts: ts(0), zone_name: "WEST".into(), value: Some(40.0) },
      ZoneValue { ts: ts(1), zone_name: "WEST".into(), value: Some(50.0) },
      ZoneValue { ts: ts(2), zone_name: "WEST".into(), value: Some(60.0) },
    ];
    let rows = compute_price_volatility(&rt, 24);
    let last = rows.iter().find(|r| r.ts == ts(2)).unwrap();
    assert!(last.volatility_percent.unwrap() > 0.0);
  }

  #[test]
  fn excludes_samples_outside_the_trailing_window() {
    let rt = vec![
      ZoneValue { ts: ts(0), zone_name: "WEST".into(), value: Some(1000.0) },
      ZoneValue { ts: ts(10), zone_name: "WEST".into(), value: Some(50.0) },
      ZoneValue { ts: ts(11), zone_name: "WEST".into(), value: Some(51.0) },
    ];
    // a 2-hour window at the final endpoint should not see the ts(0) outlier
    let rows = compute_price_volatility(&rt, 2);
    let last = rows.iter().find(|r| r.ts == ts(11)).unwrap();
    assert!(last.volatility_percent.unwrap() < 5.0);
  }
}
