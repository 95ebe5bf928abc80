use std::collections::HashMap;

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;
use tracing::instrument;

use crate::error::Result;
use crate::{DateRange, MetricsEngine, ZoneValue};

/// One row of `correlation` (§4.9): Pearson correlation between two zones'
/// RT LBMP series over a shared set of timestamps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationRow {
  pub zone_a: String,
  pub zone_b: String,
  pub correlation: f64,
  pub n: usize,
}

/// Pearson correlation coefficient of two equal-length, already-aligned
/// series. `statrs` supplies the mean/variance primitives used elsewhere in
/// this crate; Pearson's own formula is a direct ratio over them, so it is
/// written out rather than routed through a second crate API.
fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
  if a.len() < 2 || a.len() != b.len() {
    return None;
  }
  let n = a.len() as f64;
  let mean_a = a.iter().sum::<f64>() / n;
  let mean_b = b.iter().sum::<f64>() / n;

  let mut cov = 0.0;
  let mut var_a = 0.0;
  let mut var_b = 0.0;
  for i in 0..a.len() {
    let da = a[i] - mean_a;
    let db = b[i] - mean_b;
    cov += da * db;
    var_a += da * da;
    var_b += db * db;
  }

  if var_a == 0.0 || var_b == 0.0 {
    return None;
  }
  Some(cov / (var_a.sqrt() * var_b.sqrt()))
}

/// Pure computation: aligns every unordered pair of zones in `zone_names` on
/// the timestamps where both have a non-null RT LBMP value, then emits their
/// Pearson correlation. Pairs with fewer than two shared timestamps, or a
/// constant series on either side, are omitted (§4.9).
pub fn compute_correlation(rt: &[ZoneValue], zone_names: &[String]) -> Vec<CorrelationRow> {
  let mut series: HashMap<&str, HashMap<NaiveDateTime, f64>> = HashMap::new();
  for row in rt {
    if let Some(value) = row.value {
      series.entry(row.zone_name.as_str()).or_default().insert(row.ts, value);
    }
  }

  let mut out = Vec::new();
  for i in 0..zone_names.len() {
    for j in i..zone_names.len() {
      let za = zone_names[i].as_str();
      let zb = zone_names[j].as_str();
      let (Some(sa), Some(sb)) = (series.get(za), series.get(zb)) else { continue };

      let mut shared: Vec<NaiveDateTime> = sa.keys().filter(|ts| sb.contains_key(ts)).copied().collect();
      shared.sort();

      let a: Vec<f64> = shared.iter().map(|ts| sa[ts]).collect();
      let b: Vec<f64> = shared.iter().map(|ts| sb[ts]).collect();

      let Some(correlation) = pearson(&a, &b) else { continue };
      out.push(CorrelationRow { zone_a: za.to_string(), zone_b: zb.to_string(), correlation, n: shared.len() });
    }
  }

  out.sort_by(|a, b| a.zone_a.cmp(&b.zone_a).then_with(|| a.zone_b.cmp(&b.zone_b)));
  out
}

impl MetricsEngine {
  /// `correlation` (§4.9): pairwise Pearson correlation of RT LBMP across
  /// the given zones over a time window.
  #[instrument(skip(self))]
  pub async fn correlation(&self, range: DateRange, zones: Vec<String>) -> Result<Vec<CorrelationRow>> {
    let store = self.store.clone();
    let zones_for_fetch = zones.clone();
    let rt = store.run(move |conn| fetch_rt_lbmp(conn, range, &zones_for_fetch)).await?;
    Ok(compute_correlation(&rt, &zones))
  }
}

fn fetch_rt_lbmp(conn: &mut grid_store::DbConnection, range: DateRange, zones: &[String]) -> Result<Vec<ZoneValue>> {
  use grid_store::schema::{rt_lbmp, zones as zones_table};

  let canonical_zones: Vec<String> = zones.iter().map(|z| grid_core::canonical_name(z)).collect();

  let mut query = rt_lbmp::table
    .inner_join(zones_table::table.on(rt_lbmp::zone_id.eq(zones_table::id)))
    .filter(zones_table::name.eq_any(canonical_zones))
    .into_boxed();
  if let Some(start) = range.start {
    query = query.filter(rt_lbmp::ts.ge(start));
  }
  if let Some(end) = range.end {
    query = query.filter(rt_lbmp::ts.le(end));
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
  fn self_correlation_is_identity() {
    let rt = vec![
      ZoneValue { ts: ts(0), zone_name: "WEST".into(), value: Some(10.0) },
      ZoneValue { ts: ts(1), zone_name: "WEST".into(), value: Some(20.0) },
      ZoneValue { ts: ts(2), zone_name: "WEST".into(), value: Some(15.0) },
    ];
    let rows = compute_correlation(&rt, &["WEST".to_string()]);
    assert_eq!(rows.len(), 1);
    assert!((rows[0].correlation - 1.0).abs() < 1e-9);
  }

  #[test]
  fn omits_pairs_with_fewer_than_two_shared_timestamps() {
    let rt = vec![
      ZoneValue { ts: ts(0), zone_name: "WEST".into(), value: Some(10.0) },
      ZoneValue { ts: ts(1), zone_name: "EAST".into(), value: Some(20.0) },
    ];
    assert!(compute_correlation(&rt, &["WEST".to_string(), "EAST".to_string()]).is_empty());
  }

  #[test]
  fn perfectly_inverse_series_correlate_negatively() {
    let rt = vec![
      ZoneValue { ts: ts(0), zone_name: "WEST".into(), value: Some(10.0) },
      ZoneValue { ts: ts(1), zone_name: "WEST".into(), value: Some(20.0) },
      ZoneValue { ts: ts(0), zone_name: "EAST".into(), value: Some(30.0) },
      ZoneValue { ts: ts(1), zone_name: "EAST".into(), value: Some(10.0) },
    ];
    let rows = compute_correlation(&rt, &["WEST".to_string(), "EAST".to_string()]);
    let pair = rows.iter().find(|r| r.zone_a == "WEST" && r.zone_b == "EAST").unwrap();
    assert!((pair.correlation + 1.0).abs() < 1e-9);
  }
}
