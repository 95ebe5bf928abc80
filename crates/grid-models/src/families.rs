use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Identifies one of the fourteen time-series families in §3, independent of
/// any particular row's contents. Used for table-name lookup and dispatch
/// where a concrete [`FamilyRecord`] isn't in hand yet (e.g. an API route
/// picking which store table to query).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
  RtLbmp,
  DaLbmp,
  TwLbmp,
  RtLoad,
  LoadForecast,
  InterfaceFlow,
  Ancillary,
  Constraint,
  ExternalRtoPrice,
  AtcTtc,
  Outage,
  Weather,
  FuelMix,
  Advisory,
}

impl Family {
  /// Name of the backing store table, identical to the family name in §3.
  pub fn table_name(&self) -> &'static str {
    match self {
      Family::RtLbmp => "rt_lbmp",
      Family::DaLbmp => "da_lbmp",
      Family::TwLbmp => "tw_lbmp",
      Family::RtLoad => "rt_load",
      Family::LoadForecast => "load_forecast",
      Family::InterfaceFlow => "interface_flow",
      Family::Ancillary => "ancillary",
      Family::Constraint => "constraint",
      Family::ExternalRtoPrice => "external_rto_price",
      Family::AtcTtc => "atc_ttc",
      Family::Outage => "outage",
      Family::Weather => "weather",
      Family::FuelMix => "fuel_mix",
      Family::Advisory => "advisory",
    }
  }
}

/// One LBMP-shaped row: `(ts, zone, lbmp, mcc, mcl)`. Shared by `rt_lbmp`,
/// `da_lbmp`, and `tw_lbmp`, which differ only in cadence and which
/// transformer produces them, not in shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LbmpRecord {
  pub ts: NaiveDateTime,
  pub zone_name: String,
  pub lbmp: Option<f64>,
  pub marginal_cost_congestion: Option<f64>,
  pub marginal_cost_losses: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RtLoadRecord {
  pub ts: NaiveDateTime,
  pub zone_name: String,
  pub load_mw: Option<f64>,
}

/// `ts` is the target hour being forecast, not the time the forecast was
/// issued (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadForecastRecord {
  pub ts: NaiveDateTime,
  pub zone_name: String,
  pub forecast_mw: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceFlowRecord {
  pub ts: NaiveDateTime,
  pub interface_name: String,
  pub flow_mw: Option<f64>,
  pub pos_limit_mw: Option<f64>,
  pub neg_limit_mw: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AncillaryRecord {
  pub ts: NaiveDateTime,
  pub zone_name: String,
  pub market: String,
  pub service_type: String,
  pub price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintRecord {
  pub ts: NaiveDateTime,
  pub market: String,
  pub constraint_name: String,
  pub shadow_price: Option<f64>,
  pub binding: Option<bool>,
  pub limit_mw: Option<f64>,
  pub flow_mw: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalRtoPriceRecord {
  pub ts: NaiveDateTime,
  pub rto: String,
  pub rtc_price: Option<f64>,
  pub cts_price: Option<f64>,
  pub price_diff: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtcTtcRecord {
  pub ts: NaiveDateTime,
  pub interface_name: String,
  pub forecast_type: String,
  pub atc_mw: Option<f64>,
  pub ttc_mw: Option<f64>,
  pub trm_mw: Option<f64>,
  pub direction: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutageRecord {
  pub ts: NaiveDateTime,
  pub outage_type: String,
  pub market: String,
  pub resource_name: String,
  pub resource_type: Option<String>,
  pub mw_capacity: Option<f64>,
  pub mw_outage: Option<f64>,
  pub start_t: Option<NaiveDateTime>,
  pub end_t: Option<NaiveDateTime>,
  pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
  pub ts: NaiveDateTime,
  pub forecast_ts: NaiveDateTime,
  pub location: String,
  pub temp_f: Option<f64>,
  pub humidity: Option<f64>,
  pub wind_mph: Option<f64>,
  pub wind_dir: Option<String>,
  pub cloud_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelMixRecord {
  pub ts: NaiveDateTime,
  pub fuel_type: String,
  pub generation_mw: Option<f64>,
  pub pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryRecord {
  pub ts: NaiveDateTime,
  pub advisory_type: String,
  pub title: String,
  pub message: Option<String>,
  pub severity: Option<String>,
}

/// A well-formed record emitted by the CSV Normalizer (C3), before zone and
/// interface names are resolved to surrogate ids by C4. One variant per
/// family in §3. Dispatch on this, not on `Family` plus a separate payload,
/// keeps the normalizer's output and the writer's input statically matched
/// to the same set of shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FamilyRecord {
  RtLbmp(LbmpRecord),
  DaLbmp(LbmpRecord),
  TwLbmp(LbmpRecord),
  RtLoad(RtLoadRecord),
  LoadForecast(LoadForecastRecord),
  InterfaceFlow(InterfaceFlowRecord),
  Ancillary(AncillaryRecord),
  Constraint(ConstraintRecord),
  ExternalRtoPrice(ExternalRtoPriceRecord),
  AtcTtc(AtcTtcRecord),
  Outage(OutageRecord),
  Weather(WeatherRecord),
  FuelMix(FuelMixRecord),
  Advisory(AdvisoryRecord),
}

impl FamilyRecord {
  pub fn family(&self) -> Family {
    match self {
      FamilyRecord::RtLbmp(_) => Family::RtLbmp,
      FamilyRecord::DaLbmp(_) => Family::DaLbmp,
      FamilyRecord::TwLbmp(_) => Family::TwLbmp,
      FamilyRecord::RtLoad(_) => Family::RtLoad,
      FamilyRecord::LoadForecast(_) => Family::LoadForecast,
      FamilyRecord::InterfaceFlow(_) => Family::InterfaceFlow,
      FamilyRecord::Ancillary(_) => Family::Ancillary,
      FamilyRecord::Constraint(_) => Family::Constraint,
      FamilyRecord::ExternalRtoPrice(_) => Family::ExternalRtoPrice,
      FamilyRecord::AtcTtc(_) => Family::AtcTtc,
      FamilyRecord::Outage(_) => Family::Outage,
      FamilyRecord::Weather(_) => Family::Weather,
      FamilyRecord::FuelMix(_) => Family::FuelMix,
      FamilyRecord::Advisory(_) => Family::Advisory,
    }
  }

  /// The instant this row is keyed on, used by the Orchestrator's
  /// monotone-time check (§8) and by ordering in read endpoints.
  pub fn ts(&self) -> NaiveDateTime {
    match self {
      FamilyRecord::RtLbmp(r) | FamilyRecord::DaLbmp(r) | FamilyRecord::TwLbmp(r) => r.ts,
      FamilyRecord::RtLoad(r) => r.ts,
      FamilyRecord::LoadForecast(r) => r.ts,
      FamilyRecord::InterfaceFlow(r) => r.ts,
      FamilyRecord::Ancillary(r) => r.ts,
      FamilyRecord::Constraint(r) => r.ts,
      FamilyRecord::ExternalRtoPrice(r) => r.ts,
      FamilyRecord::AtcTtc(r) => r.ts,
      FamilyRecord::Outage(r) => r.ts,
      FamilyRecord::Weather(r) => r.ts,
      FamilyRecord::FuelMix(r) => r.ts,
      FamilyRecord::Advisory(r) => r.ts,
    }
  }

  /// Zone name carried by this record, if the family is zone-keyed.
  pub fn zone_name(&self) -> Option<&str> {
    match self {
      FamilyRecord::RtLbmp(r) | FamilyRecord::DaLbmp(r) | FamilyRecord::TwLbmp(r) => {
        Some(r.zone_name.as_str())
      }
      FamilyRecord::RtLoad(r) => Some(r.zone_name.as_str()),
      FamilyRecord::LoadForecast(r) => Some(r.zone_name.as_str()),
      FamilyRecord::Ancillary(r) => Some(r.zone_name.as_str()),
      _ => None,
    }
  }

  /// Interface name carried by this record, if the family is interface-keyed.
  pub fn interface_name(&self) -> Option<&str> {
    match self {
      FamilyRecord::InterfaceFlow(r) => Some(r.interface_name.as_str()),
      FamilyRecord::AtcTtc(r) => Some(r.interface_name.as_str()),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample_lbmp() -> LbmpRecord {
    LbmpRecord {
      ts: NaiveDateTime::parse_from_str("2025-11-13 00:00:00", "%Y-%m-%d %H:%M:%S").unwrap(),
      zone_name: "WEST".to_string(),
      lbmp: Some(42.10),
      marginal_cost_congestion: Some(0.50),
      marginal_cost_losses: Some(1.20),
    }
  }

  #[test]
  fn family_record_reports_its_own_family_and_zone_name() {
    let record = FamilyRecord::RtLbmp(sample_lbmp());
    assert_eq!(record.family(), Family::RtLbmp);
    assert_eq!(record.zone_name(), Some("WEST"));
    assert_eq!(record.interface_name(), None);
  }

  #[test]
  fn family_table_names_match_the_data_model() {
    assert_eq!(Family::RtLbmp.table_name(), "rt_lbmp");
    assert_eq!(Family::ExternalRtoPrice.table_name(), "external_rto_price");
    assert_eq!(Family::Advisory.table_name(), "advisory");
  }

  #[test]
  fn interface_flow_record_exposes_interface_name_not_zone_name() {
    let record = FamilyRecord::InterfaceFlow(InterfaceFlowRecord {
      ts: sample_lbmp().ts,
      interface_name: "NY-NE".to_string(),
      flow_mw: Some(120.0),
      pos_limit_mw: Some(500.0),
      neg_limit_mw: Some(-500.0),
    });
    assert_eq!(record.zone_name(), None);
    assert_eq!(record.interface_name(), Some("NY-NE"));
  }
}
