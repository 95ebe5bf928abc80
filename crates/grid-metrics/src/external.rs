use std::collections::HashMap;

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;
use tracing::instrument;

use crate::error::Result;
use crate::MetricsEngine;

/// One of the four external regions an interface can be tagged into (§4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Region {
  #[serde(rename = "PJM")]
  Pjm,
  #[serde(rename = "ISO-NE")]
  IsoNe,
  #[serde(rename = "IESO")]
  Ieso,
  #[serde(rename = "HQ")]
  Hq,
}

impl Region {
  pub fn as_str(&self) -> &'static str {
    match self {
      Region::Pjm => "PJM",
      Region::IsoNe => "ISO-NE",
      Region::Ieso => "IESO",
      Region::Hq => "HQ",
    }
  }
}

/// Tags an interface name to one of the four external regions using the
/// same prefix convention C3's external-RTO-price transformer uses for
/// generator names (`classify_rto` in `grid_ingest::transformers`).
/// Interfaces matching none of the four prefixes are excluded from the
/// regional view rather than bucketed as "other" (§9 open question,
/// resolved in DESIGN.md).
fn classify_region(interface_name: &str) -> Option<Region> {
  let upper = interface_name.trim().to_ascii_uppercase();
  if upper.starts_with("N.E._") || upper.starts_with("NE_") {
    Some(Region::IsoNe)
  } else if upper.starts_with("PJM_") {
    Some(Region::Pjm)
  } else if upper.starts_with("IESO_") {
    Some(Region::Ieso)
  } else if upper.starts_with("HQ_") {
    Some(Region::Hq)
  } else {
    None
  }
}

/// Direction of flow on an interface row (§4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
  Import,
  Export,
  Zero,
}

impl Direction {
  pub fn as_str(&self) -> &'static str {
    match self {
      Direction::Import => "import",
      Direction::Export => "export",
      Direction::Zero => "zero",
    }
  }
}

/// One row of the C10 external-interface regional view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExternalInterfaceRow {
  pub region: Region,
  pub interface_name: String,
  pub ts: NaiveDateTime,
  pub flow_mw: f64,
  pub direction: Direction,
  pub utilization_percent: Option<f64>,
}

/// Raw interface-flow row as fetched from the store, before region
/// classification.
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceFlowValue {
  pub ts: NaiveDateTime,
  pub interface_name: String,
  pub flow_mw: Option<f64>,
  pub pos_limit_mw: Option<f64>,
  pub neg_limit_mw: Option<f64>,
}

/// Pure computation: keeps only the most recent `ts` per interface, tags
/// each row's region, drops interfaces that match no region, and computes
/// direction/utilization (§4.10).
pub fn compute_external_interfaces(rows: &[InterfaceFlowValue]) -> Vec<ExternalInterfaceRow> {
  let mut latest: HashMap<&str, &InterfaceFlowValue> = HashMap::new();
  for row in rows {
    latest
      .entry(row.interface_name.as_str())
      .and_modify(|existing| {
        if row.ts > existing.ts {
          *existing = row;
        }
      })
      .or_insert(row);
  }

  let mut out = Vec::new();
  for row in latest.into_values() {
    let Some(region) = classify_region(&row.interface_name) else { continue };
    let Some(flow_mw) = row.flow_mw else { continue };

    let direction = if flow_mw > 0.0 {
      Direction::Import
    } else if flow_mw < 0.0 {
      Direction::Export
    } else {
      Direction::Zero
    };

    let utilization_percent = match direction {
      Direction::Import => match row.pos_limit_mw {
        Some(limit) if limit != 0.0 => Some(100.0 * flow_mw.abs() / limit.abs()),
        _ => None,
      },
      Direction::Export => match row.neg_limit_mw {
        Some(limit) if limit != 0.0 => Some(100.0 * flow_mw.abs() / limit.abs()),
        _ => None,
      },
      Direction::Zero => None,
    };

    out.push(ExternalInterfaceRow { region, interface_name: row.interface_name.clone(), ts: row.ts, flow_mw, direction, utilization_percent });
  }

  out.sort_by(|a, b| a.region.as_str().cmp(b.region.as_str()).then_with(|| a.interface_name.cmp(&b.interface_name)));
  out
}

impl MetricsEngine {
  /// `external_interfaces` (§4.10): the most recent reading for every
  /// interface tagged to one of the four external regions.
  #[instrument(skip(self))]
  pub async fn external_interfaces(&self) -> Result<Vec<ExternalInterfaceRow>> {
    let store = self.store.clone();
    let rows = store.run(fetch_interface_flows).await?;
    Ok(compute_external_interfaces(&rows))
  }
}

fn fetch_interface_flows(conn: &mut grid_store::DbConnection) -> Result<Vec<InterfaceFlowValue>> {
  use grid_store::schema::{interface_flow, interfaces};

  let rows = interface_flow::table
    .inner_join(interfaces::table.on(interface_flow::interface_id.eq(interfaces::id)))
    .select((interface_flow::ts, interfaces::name, interface_flow::flow_mw, interface_flow::pos_limit_mw, interface_flow::neg_limit_mw))
    .load::<(NaiveDateTime, String, Option<f64>, Option<f64>, Option<f64>)>(conn)?;

  Ok(
    rows
      .into_iter()
      .map(|(ts, interface_name, flow_mw, pos_limit_mw, neg_limit_mw)| InterfaceFlowValue { ts, interface_name, flow_mw, pos_limit_mw, neg_limit_mw })
      .collect(),
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::NaiveDate;

  fn ts(h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 11, 13).unwrap().and_hms_opt(h, 0, 0).unwrap()
  }

  #[test]
  fn classifies_by_prefix_and_excludes_unmatched_interfaces() {
    let rows = vec![
      InterfaceFlowValue { ts: ts(0), interface_name: "PJM_NY".into(), flow_mw: Some(100.0), pos_limit_mw: Some(500.0), neg_limit_mw: Some(-500.0) },
      InterfaceFlowValue { ts: ts(0), interface_name: "LOCAL_TIE".into(), flow_mw: Some(50.0), pos_limit_mw: Some(200.0), neg_limit_mw: Some(-200.0) },
    ];
    let out = compute_external_interfaces(&rows);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].region, Region::Pjm);
  }

  #[test]
  fn keeps_only_the_most_recent_reading_per_interface() {
    let rows = vec![
      InterfaceFlowValue { ts: ts(0), interface_name: "IESO_TIE1".into(), flow_mw: Some(10.0), pos_limit_mw: Some(100.0), neg_limit_mw: Some(-100.0) },
      InterfaceFlowValue { ts: ts(1), interface_name: "IESO_TIE1".into(), flow_mw: Some(-20.0), pos_limit_mw: Some(100.0), neg_limit_mw: Some(-100.0) },
    ];
    let out = compute_external_interfaces(&rows);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].ts, ts(1));
    assert_eq!(out[0].direction, Direction::Export);
  }

  #[test]
  fn utilization_percent_is_null_when_the_relevant_limit_is_zero() {
    let rows = vec![InterfaceFlowValue {
      ts: ts(0),
      interface_name: "HQ_TIE1".into(),
      flow_mw: Some(10.0),
      pos_limit_mw: Some(0.0),
      neg_limit_mw: Some(-100.0),
    }];
    let out = compute_external_interfaces(&rows);
    assert_eq!(out[0].utilization_percent, None);
  }

  #[test]
  fn zero_flow_has_zero_direction_and_no_utilization() {
    let rows = vec![InterfaceFlowValue {
      ts: ts(0),
      interface_name: "NE_TIE1".into(),
      flow_mw: Some(0.0),
      pos_limit_mw: Some(100.0),
      neg_limit_mw: Some(-100.0),
    }];
    let out = compute_external_interfaces(&rows);
    assert_eq!(out[0].direction, Direction::Zero);
    assert_eq!(out[0].utilization_percent, None);
  }
}
