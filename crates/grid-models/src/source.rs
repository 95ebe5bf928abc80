use grid_core::Cadence;
use serde::{Deserialize, Serialize};

/// Stable identifier for a registry entry, e.g. `RT-LBMP`.
pub type SourceCode = String;

/// One row per upstream report, parsed once from the registry file at boot
/// and held read-only for the life of the process (§3 `Source`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
  pub code: SourceCode,
  pub human_name: String,
  pub category: String,
  pub cadence: CadenceField,
  /// Contains `{YYYYMMDD}`, or is static for snapshot sources.
  pub direct_url_template: String,
  /// Contains `{YYYYMM01}`; absent when the source has no archive fallback.
  pub archive_url_template: Option<String>,
  /// Selects the C3 transformer to dispatch to.
  pub transformer_tag: String,
}

/// `Cadence` wrapper that is itself `Serialize`/`Deserialize`, so `Source`
/// can round-trip through JSON in tests without grid-core depending on serde
/// for a type it otherwise has no reason to serialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CadenceField(pub Cadence);

impl From<Cadence> for CadenceField {
  fn from(c: Cadence) -> Self {
    CadenceField(c)
  }
}

impl std::ops::Deref for CadenceField {
  type Target = Cadence;
  fn deref(&self) -> &Cadence {
    &self.0
  }
}

impl Serialize for CadenceField {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(self.0.as_str())
  }
}

impl<'de> Deserialize<'de> for CadenceField {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: serde::Deserializer<'de>,
  {
    let raw = String::deserialize(deserializer)?;
    raw.parse::<Cadence>().map(CadenceField).map_err(serde::de::Error::custom)
  }
}

impl Source {
  /// Substitutes `{YYYYMMDD}` in `direct_url_template` with the compact form
  /// of `date`, and `{YYYYMM01}` in `archive_url_template` with the first of
  /// that month. Templates with no placeholder are returned verbatim — the
  /// snapshot contract (§4.1).
  pub fn resolve(&self, date: chrono::NaiveDate) -> (String, Option<String>) {
    let compact = date.format("%Y%m%d").to_string();
    let direct = self.direct_url_template.replace("{YYYYMMDD}", &compact);

    let archive = self.archive_url_template.as_ref().map(|tmpl| {
      let first_of_month = date.with_day(1).unwrap_or(date);
      let month_compact = first_of_month.format("%Y%m%d").to_string();
      tmpl.replace("{YYYYMM01}", &month_compact)
    });

    (direct, archive)
  }
}

use chrono::Datelike;

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::NaiveDate;

  fn sample_source() -> Source {
    Source {
      code: "RT-LBMP".to_string(),
      human_name: "Real-Time LBMP".to_string(),
      category: "pricing".to_string(),
      cadence: Cadence::Rt5.into(),
      direct_url_template: "https://example.test/{YYYYMMDD}rt.csv".to_string(),
      archive_url_template: Some("https://example.test/archive/{YYYYMM01}rt_csv.zip".to_string()),
      transformer_tag: "rt_lbmp".to_string(),
    }
  }

  #[test]
  fn resolve_substitutes_both_placeholders() {
    let source = sample_source();
    let date = NaiveDate::from_ymd_opt(2025, 11, 13).unwrap();
    let (direct, archive) = source.resolve(date);
    assert_eq!(direct, "https://example.test/20251113rt.csv");
    assert_eq!(archive.unwrap(), "https://example.test/archive/20251101rt_csv.zip");
  }

  #[test]
  fn resolve_returns_static_template_verbatim() {
    let mut source = sample_source();
    source.direct_url_template = "https://example.test/currentExternalLimitsFlows.csv".to_string();
    source.archive_url_template = None;
    let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let (direct, archive) = source.resolve(date);
    assert_eq!(direct, "https://example.test/currentExternalLimitsFlows.csv");
    assert!(archive.is_none());
  }

  #[test]
  fn cadence_field_round_trips_through_json() {
    let field: CadenceField = Cadence::Hourly.into();
    let json = serde_json::to_string(&field).unwrap();
    assert_eq!(json, "\"hourly\"");
    let back: CadenceField = serde_json::from_str(&json).unwrap();
    assert_eq!(*back, Cadence::Hourly);
  }
}
