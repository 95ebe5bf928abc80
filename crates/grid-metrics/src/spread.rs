use std::collections::HashMap;

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use diesel::prelude::*;
use serde::Serialize;
use tracing::instrument;

use crate::error::Result;
use crate::{DateRange, MetricsEngine, ZoneValue};

/// One row of `rt_da_spread` (§4.9). `spread_percent` is null when the
/// day-ahead price is exactly zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RtDaSpreadRow {
  pub ts: NaiveDateTime,
  pub zone_name: String,
  pub rt_lbmp: f64,
  pub da_lbmp: f64,
  pub spread: f64,
  pub spread_percent: Option<f64>,
}

/// One row of `zone_spread`: the widest RT LBMP gap across zones at a
/// single instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneSpreadRow {
  pub ts: NaiveDateTime,
  pub max_zone: String,
  pub min_zone: String,
  pub spread: f64,
}

fn truncate_to_hour(ts: NaiveDateTime) -> NaiveDateTime {
  NaiveDateTime::new(ts.date(), NaiveTime::from_hms_opt(ts.hour(), 0, 0).expect("hour() is always in range"))
}

/// Pure computation: aligns every RT observation to its containing hour's DA
/// observation for the same zone and emits the spread. Rows with no
/// matching DA observation, or a null measurement on either side, are
/// omitted - there is nothing to subtract.
pub fn compute_rt_da_spread(rt: &[ZoneValue], da: &[ZoneValue], min_spread: Option<f64>) -> Vec<RtDaSpreadRow> {
  let mut da_index: HashMap<(NaiveDateTime, &str), f64> = HashMap::new();
  for row in da {
    if let Some(value) = row.value {
      da_index.insert((row.ts, row.zone_name.as_str()), value);
    }
  }

  let mut out = Vec::new();
  for row in rt {
    let Some(rt_value) = row.value else { continue };
    let hour = truncate_to_hour(row.ts);
    let Some(&da_value) = da_index.get(&(hour, row.zone_name.as_str())) else { continue };

    let spread = rt_value - da_value;
    if let Some(threshold) = min_spread {
      if spread.abs() < threshold {
        continue;
      }
    }
    let spread_percent = if da_value == 0.0 { None } else { Some(100.0 * spread / da_value) };

    out.push(RtDaSpreadRow { ts: row.ts, zone_name: row.zone_name.clone(), rt_lbmp: rt_value, da_lbmp: da_value, spread, spread_percent });
  }

  out.sort_by(|a, b| a.ts.cmp(&b.ts).then_with(|| a.zone_name.cmp(&b.zone_name)));
  out
}

/// Pure computation: per distinct `ts`, the zone with the highest and the
/// zone with the lowest RT LBMP, and their difference. Ties on the max or
/// min value keep the first zone encountered after sorting by name.
pub fn compute_zone_spread(rt: &[ZoneValue]) -> Vec<ZoneSpreadRow> {
  let mut by_ts: HashMap<NaiveDateTime, Vec<(&str, f64)>> = HashMap::new();
  for row in rt {
    if let Some(value) = row.value {
      by_ts.entry(row.ts).or_default().push((row.zone_name.as_str(), value));
    }
  }

  let mut out = Vec::new();
  for (ts, mut zones) in by_ts {
    if zones.len() < 2 {
      continue;
    }
    zones.sort_by(|a, b| a.0.cmp(b.0));
    let max = zones.iter().max_by(|a, b| a.1.partial_cmp(&b.1).expect("lbmp values are finite")).expect("non-empty");
    let min = zones.iter().min_by(|a, b| a.1.partial_cmp(&b.1).expect("lbmp values are finite")).expect("non-empty");
    out.push(ZoneSpreadRow { ts, max_zone: max.0.to_string(), min_zone: min.0.to_string(), spread: max.1 - min.1 });
  }

  out.sort_by(|a, b| a.ts.cmp(&b.ts));
  out
}

impl MetricsEngine {
  /// `rt_da_spread` (§4.9): RT minus DA LBMP, aligned by hour, filtered to
  /// `zones` when given and to `|spread| >= min_spread` when given.
  #[instrument(skip(self))]
  pub async fn rt_da_spread(&self, range: DateRange, zones: Option<Vec<String>>, min_spread: Option<f64>) -> Result<Vec<RtDaSpreadRow>> {
    let store = self.store.clone();
    let zones_for_rt = zones.clone();
    let rt = store.run(move |conn| fetch_lbmp_rows(conn, "rt_lbmp_tbl", range, zones_for_rt.as_deref())).await?;
    let zones_for_da = zones.clone();
    let store = self.store.clone();
    let da = store.run(move |conn| fetch_lbmp_rows(conn, "da_lbmp_tbl", range, zones_for_da.as_deref())).await?;
    Ok(compute_rt_da_spread(&rt, &da, min_spread))
  }

  /// `zone_spread` (§4.9): widest cross-zone RT LBMP gap at each instant.
  #[instrument(skip(self))]
  pub async fn zone_spread(&self, range: DateRange, zones: Option<Vec<String>>) -> Result<Vec<ZoneSpreadRow>> {
    let store = self.store.clone();
    let rt = store.run(move |conn| fetch_lbmp_rows(conn, "rt_lbmp_tbl", range, zones.as_deref())).await?;
    Ok(compute_zone_spread(&rt))
  }
}

/// Fetches `(ts, zone_name, lbmp)` from either `rt_lbmp` or `da_lbmp`,
/// joined against `zones`. The two tables share a shape but are distinct
/// diesel table types, so dispatch happens once here rather than in every
/// caller.
fn fetch_lbmp_rows(conn: &mut grid_store::DbConnection, table: &str, range: DateRange, zones: Option<&[String]>) -> Result<Vec<ZoneValue>> {
  use grid_store::schema::{da_lbmp, rt_lbmp, zones as zones_table};

  let canonical_zones: Option<Vec<String>> = zones.map(|zs| zs.iter().map(|z| grid_core::canonical_name(z)).collect());

  let rows = match table {
    "rt_lbmp_tbl" => {
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
      query
        .select((rt_lbmp::ts, zones_table::name, rt_lbmp::lbmp))
        .load::<(NaiveDateTime, String, Option<f64>)>(conn)?
    }
    _ => {
      let mut query = da_lbmp::table.inner_join(zones_table::table.on(da_lbmp::zone_id.eq(zones_table::id))).into_boxed();
      if let Some(start) = range.start {
        query = query.filter(da_lbmp::ts.ge(start));
      }
      if let Some(end) = range.end {
        query = query.filter(da_lbmp::ts.le(end));
      }
      if let Some(names) = &canonical_zones {
        query = query.filter(zones_table::name.eq_any(names.clone()));
      }
      query
        .select((da_lbmp::ts, zones_table::name, da_lbmp::lbmp))
        .load::<(NaiveDateTime, String, Option<f64>)>(conn)?
    }
  };

  Ok(rows.into_iter().map(|(ts, zone_name, value)| ZoneValue { ts, zone_name, value }).collect())
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::NaiveDate;

  fn ts(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 11, 13).unwrap().and_hms_opt(h, m, 0).unwrap()
  }

  #[test]
  fn rt_da_spread_aligns_by_truncated_hour() {
    let rt = vec![ZoneValue { ts: ts(14, 5), zone_name: "WEST".into(), value: Some(50.0) }];
    let da = vec![ZoneValue { ts: ts(14, 0), zone_name: "WEST".into(), value: Some(45.0) }];
    let rows = compute_rt_da_spread(&rt, &da, None);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].spread, 5.0);
    assert!((rows[0].spread_percent.unwrap() - 11.111).abs() < 0.01);
  }

  #[test]
  fn rt_da_spread_is_null_percent_when_da_is_zero() {
    let rt = vec![ZoneValue { ts: ts(14, 5), zone_name: "WEST".into(), value: Some(5.0) }];
    let da = vec![ZoneValue { ts: ts(14, 0), zone_name: "WEST".into(), value: Some(0.0) }];
    let rows = compute_rt_da_spread(&rt, &da, None);
    assert_eq!(rows[0].spread_percent, None);
  }

  #[test]
  fn rt_da_spread_respects_min_spread_filter() {
    let rt = vec![ZoneValue { ts: ts(14, 5), zone_name: "WEST".into(), value: Some(46.0) }];
    let da = vec![ZoneValue { ts: ts(14, 0), zone_name: "WEST".into(), value: Some(45.0) }];
    assert!(compute_rt_da_spread(&rt, &da, Some(5.0)).is_empty());
  }

  #[test]
  fn rt_da_spread_omits_unmatched_rows() {
    let rt = vec![ZoneValue { ts: ts(14, 5), zone_name: "EAST".into(), value: Some(10.0) }];
    let da = vec![ZoneValue { ts: ts(14, 0), zone_name: "WEST".into(), value: Some(9.0) }];
    assert!(compute_rt_da_spread(&rt, &da, None).is_empty());
  }

  #[test]
  fn zone_spread_picks_widest_gap() {
    let rt = vec![
      ZoneValue { ts: ts(14, 0), zone_name: "WEST".into(), value: Some(50.0) },
      ZoneValue { ts: ts(14, 0), zone_name: "EAST".into(), value: Some(30.0) },
      ZoneValue { ts: ts(14, 0), zone_name: "CENTRAL".into(), value: Some(40.0) },
    ];
    let rows = compute_zone_spread(&rt);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].max_zone, "WEST");
    assert_eq!(rows[0].min_zone, "EAST");
    assert_eq!(rows[0].spread, 20.0);
  }

  #[test]
  fn zone_spread_skips_instants_with_fewer_than_two_zones() {
    let rt = vec![ZoneValue { ts: ts(14, 0), zone_name: "WEST".into(), value: Some(50.0) }];
    assert!(compute_zone_spread(&rt).is_empty());
  }
}
