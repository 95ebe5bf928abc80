use std::collections::HashMap;

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;
use tracing::instrument;

use crate::error::Result;
use crate::{DateRange, MetricsEngine};

/// One row of `reserve_margin` (§4.9).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReserveMarginRow {
  pub ts: NaiveDateTime,
  pub total_generation_mw: f64,
  pub total_load_mw: f64,
  pub margin_mw: f64,
  pub margin_percent: Option<f64>,
}

fn sum_by_ts(rows: &[(NaiveDateTime, Option<f64>)]) -> HashMap<NaiveDateTime, f64> {
  let mut totals: HashMap<NaiveDateTime, f64> = HashMap::new();
  for (ts, value) in rows {
    if let Some(v) = value {
      *totals.entry(*ts).or_insert(0.0) += v;
    }
  }
  totals
}

/// Pure computation: sums generation and load independently per `ts`, then
/// emits a row for every instant where both totals are known. An instant
/// with generation data but no load data (or vice versa) has nothing
/// meaningful to subtract and is omitted.
pub fn compute_reserve_margin(generation: &[(NaiveDateTime, Option<f64>)], load: &[(NaiveDateTime, Option<f64>)]) -> Vec<ReserveMarginRow> {
  let gen_totals = sum_by_ts(generation);
  let load_totals = sum_by_ts(load);

  let mut out: Vec<ReserveMarginRow> = gen_totals
    .into_iter()
    .filter_map(|(ts, total_generation_mw)| {
      let total_load_mw = *load_totals.get(&ts)?;
      let margin_mw = total_generation_mw - total_load_mw;
      let margin_percent = if total_load_mw == 0.0 { None } else { Some(100.0 * margin_mw / total_load_mw) };
      Some(ReserveMarginRow { ts, total_generation_mw, total_load_mw, margin_mw, margin_percent })
    })
    .collect();

  out.sort_by(|a, b| a.ts.cmp(&b.ts));
  out
}

impl MetricsEngine {
  /// `reserve_margin` (§4.9): total generation (`fuel_mix`) minus total load
  /// (`rt_load`) at each instant both are known.
  #[instrument(skip(self))]
  pub async fn reserve_margin(&self, range: DateRange) -> Result<Vec<ReserveMarginRow>> {
    let store = self.store.clone();
    let generation = store.run(move |conn| fetch_fuel_mix_totals(conn, range)).await?;
    let store = self.store.clone();
    let load = store.run(move |conn| fetch_rt_load_totals(conn, range)).await?;
    Ok(compute_reserve_margin(&generation, &load))
  }
}

fn fetch_fuel_mix_totals(conn: &mut grid_store::DbConnection, range: DateRange) -> Result<Vec<(NaiveDateTime, Option<f64>)>> {
  use grid_store::schema::fuel_mix;

  let mut query = fuel_mix::table.into_boxed();
  if let Some(start) = range.start {
    query = query.filter(fuel_mix::ts.ge(start));
  }
  if let Some(end) = range.end {
    query = query.filter(fuel_mix::ts.le(end));
  }
  Ok(query.select((fuel_mix::ts, fuel_mix::generation_mw)).load(conn)?)
}

fn fetch_rt_load_totals(conn: &mut grid_store::DbConnection, range: DateRange) -> Result<Vec<(NaiveDateTime, Option<f64>)>> {
  use grid_store::schema::rt_load;

  let mut query = rt_load::table.into_boxed();
  if let Some(start) = range.start {
    query = query.filter(rt_load::ts.ge(start));
  }
  if let Some(end) = range.end {
    query = query.filter(rt_load::ts.le(end));
  }
  Ok(query.select((rt_load::ts, rt_load::load_mw)).load(conn)?)
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::NaiveDate;

  fn ts(h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 11, 13).unwrap().and_hms_opt(h, 0, 0).unwrap()
  }

  #[test]
  fn reserve_margin_sums_across_zones_and_fuel_types() {
    let generation = vec![(ts(14), Some(10000.0)), (ts(14), Some(8000.0))];
    let load = vec![(ts(14), Some(9000.0)), (ts(14), Some(10000.0))];
    let rows = compute_reserve_margin(&generation, &load);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].total_generation_mw, 18000.0);
    assert_eq!(rows[0].total_load_mw, 19000.0);
    assert_eq!(rows[0].margin_mw, -1000.0);
    assert!((rows[0].margin_percent.unwrap() - (-5.263)).abs() < 0.01);
  }

  #[test]
  fn reserve_margin_omits_instants_missing_either_side() {
    let generation = vec![(ts(14), Some(100.0))];
    let load: Vec<(NaiveDateTime, Option<f64>)> = vec![];
    assert!(compute_reserve_margin(&generation, &load).is_empty());
  }

  #[test]
  fn reserve_margin_null_percent_when_load_is_zero() {
    let generation = vec![(ts(14), Some(100.0))];
    let load = vec![(ts(14), Some(0.0))];
    let rows = compute_reserve_margin(&generation, &load);
    assert_eq!(rows[0].margin_percent, None);
  }
}
