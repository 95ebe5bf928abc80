use std::collections::HashMap;

use chrono::NaiveDateTime;
use grid_models::FamilyRecord;
use tracing::instrument;

use crate::error::{IngestError, Result};
use crate::transformers::{self, Transformer};

/// Result of normalizing one CSV payload (§4.3): the well-formed records,
/// a count of rows skipped for carrying an unparseable timestamp or key
/// field (the per-row `ParseWarning` of §4.3/§7 - a soft failure, not a job
/// failure), and a separate count of rows collapsed by the duplicate-key
/// policy (not a parse failure, just fewer distinct keys than input rows).
#[derive(Debug, Clone, Default)]
pub struct NormalizeOutcome {
  pub records: Vec<FamilyRecord>,
  pub parse_warnings: u64,
  pub duplicates_collapsed: u64,
}

/// C3: dispatches a raw CSV payload to the transformer registered for its
/// `transformer_tag`, then applies the duplicate-collapse policy (§4.3:
/// "duplicate rows for the same key within one CSV collapse to the last
/// occurrence").
pub struct Normalizer {
  table: HashMap<&'static str, Box<dyn Transformer>>,
}

impl Normalizer {
  pub fn new() -> Self {
    Normalizer { table: transformers::dispatch_table() }
  }

  #[instrument(skip(self, bytes))]
  pub fn normalize(&self, transformer_tag: &str, bytes: &[u8], scraped_at: NaiveDateTime) -> Result<NormalizeOutcome> {
    let transformer = self
      .table
      .get(transformer_tag)
      .ok_or_else(|| IngestError::UnknownTransformer(transformer_tag.to_string()))?;

    let outcome = transformer.transform(bytes, scraped_at)?;
    let before = outcome.records.len();
    let records = dedup_keep_last(outcome.records);
    let duplicates_collapsed = (before - records.len()) as u64;

    Ok(NormalizeOutcome { records, parse_warnings: outcome.parse_warnings, duplicates_collapsed })
  }
}

impl Default for Normalizer {
  fn default() -> Self {
    Self::new()
  }
}

/// Collapses rows sharing the same unique key to the last occurrence,
/// preserving first-seen ordering for everything else. Mirrors the
/// insert-or-update idempotency the Writer (C5) applies across jobs, but at
/// CSV-parse time within a single job (§4.3, §4.5).
fn dedup_keep_last(records: Vec<FamilyRecord>) -> Vec<FamilyRecord> {
  let mut order: Vec<String> = Vec::new();
  let mut by_key: HashMap<String, FamilyRecord> = HashMap::new();

  for record in records {
    let key = unique_key(&record);
    if !by_key.contains_key(&key) {
      order.push(key.clone());
    }
    by_key.insert(key, record);
  }

  order.into_iter().filter_map(|key| by_key.remove(&key)).collect()
}

/// A string key standing in for each family's unique constraint (§3), used
/// only for in-memory deduplication - the store's actual uniqueness is
/// enforced at the column level, not by this representation.
fn unique_key(record: &FamilyRecord) -> String {
  let ts = record.ts();
  match record {
    FamilyRecord::RtLbmp(r) | FamilyRecord::DaLbmp(r) | FamilyRecord::TwLbmp(r) => {
      format!("{:?}|{ts}|{}", record.family(), r.zone_name)
    }
    FamilyRecord::RtLoad(r) => format!("rt_load|{ts}|{}", r.zone_name),
    FamilyRecord::LoadForecast(r) => format!("load_forecast|{ts}|{}", r.zone_name),
    FamilyRecord::InterfaceFlow(r) => format!("interface_flow|{ts}|{}", r.interface_name),
    FamilyRecord::Ancillary(r) => {
      format!("ancillary|{ts}|{}|{}|{}", r.zone_name, r.market, r.service_type)
    }
    FamilyRecord::Constraint(r) => format!("constraint|{ts}|{}|{}", r.constraint_name, r.market),
    FamilyRecord::ExternalRtoPrice(r) => format!("external_rto_price|{ts}|{}", r.rto),
    FamilyRecord::AtcTtc(r) => {
      format!("atc_ttc|{ts}|{}|{}|{}", r.interface_name, r.forecast_type, r.direction)
    }
    FamilyRecord::Outage(r) => format!("outage|{ts}|{}|{}", r.outage_type, r.resource_name),
    FamilyRecord::Weather(r) => format!("weather|{ts}|{}|{}", r.forecast_ts, r.location),
    FamilyRecord::FuelMix(r) => format!("fuel_mix|{ts}|{}", r.fuel_type),
    FamilyRecord::Advisory(r) => format!("advisory|{ts}|{}|{}", r.advisory_type, r.title),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::NaiveDate;

  fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 11, 13).unwrap().and_hms_opt(0, 0, 0).unwrap()
  }

  #[test]
  fn normalize_dispatches_by_transformer_tag() {
    let normalizer = Normalizer::new();
    let csv = "Time Stamp,Name,LBMP ($/MWHr)\n11/13/2025 00:00:00,WEST,42.10\n";
    let outcome = normalizer.normalize("rt_lbmp", csv.as_bytes(), now()).unwrap();
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.parse_warnings, 0);
    assert_eq!(outcome.duplicates_collapsed, 0);
  }

  #[test]
  fn normalize_fails_fast_on_an_unregistered_tag() {
    let normalizer = Normalizer::new();
    let err = normalizer.normalize("no_such_tag", b"a,b\n1,2\n", now()).unwrap_err();
    assert!(matches!(err, IngestError::UnknownTransformer(_)));
  }

  #[test]
  fn dedup_keeps_the_last_occurrence_of_a_repeated_key() {
    let csv = "Time Stamp,Name,LBMP ($/MWHr)\n\
               11/13/2025 00:00:00,WEST,42.10\n\
               11/13/2025 00:00:00,WEST,50.00\n";
    let normalizer = Normalizer::new();
    let outcome = normalizer.normalize("rt_lbmp", csv.as_bytes(), now()).unwrap();
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.duplicates_collapsed, 1);
    match &outcome.records[0] {
      FamilyRecord::RtLbmp(r) => assert_eq!(r.lbmp, Some(50.00)),
      other => panic!("unexpected variant: {other:?}"),
    }
  }
}
