//! C3 CSV Normalizer transformers (§4.3): one function per
//! `Source.transformer_tag`, held in a dispatch table keyed by the tag - the
//! "tagged-variant dispatch table" called out in spec.md §9. Each
//! transformer reads a raw CSV byte buffer and yields the flat
//! [`FamilyRecord`]s for its family; shape reconciliation (wide→long,
//! RTO extraction, snapshot timestamp stamping) lives in the transformer
//! that needs it, not in a shared abstraction that would blur each
//! report's actual shape.

use chrono::NaiveDateTime;
use csv::ReaderBuilder;
use grid_models::families::{
  AdvisoryRecord, AncillaryRecord, AtcTtcRecord, ConstraintRecord, ExternalRtoPriceRecord,
  FuelMixRecord, InterfaceFlowRecord, LbmpRecord, LoadForecastRecord, OutageRecord, RtLoadRecord,
  WeatherRecord,
};
use grid_models::FamilyRecord;

use crate::csv_shape::{field, HeaderIndex};
use crate::error::{IngestError, Result};
use crate::numeric::{clean_text, parse_bool, parse_numeric};
use crate::timestamp::parse_timestamp;

const TIMESTAMP_CANDIDATES: &[&str] = &["time stamp", "timestamp", "interval start", "date/time"];

/// Result of transforming one CSV payload: the well-formed records, plus a
/// count of rows dropped for carrying an unparseable timestamp or a missing
/// required key field - the per-row `ParseWarning` of §4.3/§7, counted here
/// so the Orchestrator can surface it as the job's warning counter rather
/// than silently discarding the row.
#[derive(Debug, Clone, Default)]
pub struct TransformOutcome {
  pub records: Vec<FamilyRecord>,
  pub parse_warnings: u64,
}

/// One method per transformer implementation, dispatched by tag (§4.3, §9).
pub trait Transformer: Send + Sync {
  fn transform(&self, bytes: &[u8], scraped_at: NaiveDateTime) -> Result<TransformOutcome>;
}

macro_rules! transformer_fn {
  ($name:ident) => {
    pub struct $name;
    impl Transformer for $name {
      fn transform(&self, bytes: &[u8], scraped_at: NaiveDateTime) -> Result<TransformOutcome> {
        transform_fns::$name(bytes, scraped_at)
      }
    }
  };
}

transformer_fn!(rt_lbmp);
transformer_fn!(da_lbmp);
transformer_fn!(tw_lbmp);
transformer_fn!(rt_load);
transformer_fn!(load_forecast);
transformer_fn!(interface_flow);
transformer_fn!(ancillary);
transformer_fn!(constraint);
transformer_fn!(external_rto_price);
transformer_fn!(atc_ttc);
transformer_fn!(outage);
transformer_fn!(weather);
transformer_fn!(fuel_mix);
transformer_fn!(advisory);

/// Builds the tag → transformer dispatch table once, at `Normalizer::new`.
pub fn dispatch_table() -> std::collections::HashMap<&'static str, Box<dyn Transformer>> {
  let mut table: std::collections::HashMap<&'static str, Box<dyn Transformer>> =
    std::collections::HashMap::new();
  table.insert("rt_lbmp", Box::new(rt_lbmp));
  table.insert("da_lbmp", Box::new(da_lbmp));
  table.insert("tw_lbmp", Box::new(tw_lbmp));
  table.insert("rt_load", Box::new(rt_load));
  table.insert("load_forecast", Box::new(load_forecast));
  table.insert("interface_flow", Box::new(interface_flow));
  table.insert("ancillary", Box::new(ancillary));
  table.insert("constraint", Box::new(constraint));
  table.insert("external_rto_price", Box::new(external_rto_price));
  table.insert("atc_ttc", Box::new(atc_ttc));
  table.insert("outage", Box::new(outage));
  table.insert("weather", Box::new(weather));
  table.insert("fuel_mix", Box::new(fuel_mix));
  table.insert("advisory", Box::new(advisory));
  table
}

fn reader_for(bytes: &[u8]) -> csv::Reader<&[u8]> {
  ReaderBuilder::new().flexible(true).from_reader(bytes)
}

mod transform_fns {
  use super::*;

  pub fn rt_lbmp(bytes: &[u8], scraped_at: NaiveDateTime) -> Result<TransformOutcome> {
    lbmp(bytes, scraped_at, FamilyRecord::RtLbmp as fn(LbmpRecord) -> FamilyRecord, "rt_lbmp")
  }

  pub fn da_lbmp(bytes: &[u8], scraped_at: NaiveDateTime) -> Result<TransformOutcome> {
    lbmp(bytes, scraped_at, FamilyRecord::DaLbmp as fn(LbmpRecord) -> FamilyRecord, "da_lbmp")
  }

  pub fn tw_lbmp(bytes: &[u8], scraped_at: NaiveDateTime) -> Result<TransformOutcome> {
    lbmp(bytes, scraped_at, FamilyRecord::TwLbmp as fn(LbmpRecord) -> FamilyRecord, "tw_lbmp")
  }

  /// Shared by `rt_lbmp`/`da_lbmp`/`tw_lbmp`, which differ only in cadence
  /// and output variant, not shape (§3).
  fn lbmp(
    bytes: &[u8],
    scraped_at: NaiveDateTime,
    wrap: fn(LbmpRecord) -> FamilyRecord,
    family: &str,
  ) -> Result<TransformOutcome> {
    let mut reader = reader_for(bytes);
    let headers = HeaderIndex::new(reader.headers().map_err(csv_schema_err(family))?);

    let ts_col = headers.require(family, TIMESTAMP_CANDIDATES)?;
    let zone_col = headers.require(family, &["name", "zone"])?;
    let lbmp_col = headers.find(&["lbmp"]);
    let mcl_col = headers.find(&["marginal cost losses", "mcl"]);
    let mcc_col = headers.find(&["marginal cost congestion", "mcc"]);

    let mut out = Vec::new();
    let mut parse_warnings = 0u64;
    for result in reader.records() {
      let record = result.map_err(csv_schema_err(family))?;
      let Some(ts) = parse_timestamp(field(&record, ts_col)) else {
        parse_warnings += 1;
        continue;
      };
      let Some(zone_name) = clean_text(field(&record, zone_col)) else {
        parse_warnings += 1;
        continue;
      };

      out.push(wrap(LbmpRecord {
        ts,
        zone_name,
        lbmp: lbmp_col.and_then(|c| parse_numeric(field(&record, c))),
        marginal_cost_losses: mcl_col.and_then(|c| parse_numeric(field(&record, c))),
        marginal_cost_congestion: mcc_col.and_then(|c| parse_numeric(field(&record, c))),
      }));
    }
    let _ = scraped_at; // LBMP rows always carry an explicit timestamp column.
    Ok(TransformOutcome { records: out, parse_warnings })
  }

  pub fn rt_load(bytes: &[u8], _scraped_at: NaiveDateTime) -> Result<TransformOutcome> {
    let mut reader = reader_for(bytes);
    let headers = HeaderIndex::new(reader.headers().map_err(csv_schema_err("rt_load"))?);

    let ts_col = headers.require("rt_load", TIMESTAMP_CANDIDATES)?;
    let zone_col = headers.require("rt_load", &["name", "zone"])?;
    let load_col = headers.find(&["load"]);

    let mut out = Vec::new();
    let mut parse_warnings = 0u64;
    for result in reader.records() {
      let record = result.map_err(csv_schema_err("rt_load"))?;
      let Some(ts) = parse_timestamp(field(&record, ts_col)) else {
        parse_warnings += 1;
        continue;
      };
      let Some(zone_name) = clean_text(field(&record, zone_col)) else {
        parse_warnings += 1;
        continue;
      };
      out.push(FamilyRecord::RtLoad(RtLoadRecord {
        ts,
        zone_name,
        load_mw: load_col.and_then(|c| parse_numeric(field(&record, c))),
      }));
    }
    Ok(TransformOutcome { records: out, parse_warnings })
  }

  /// Wide→long reshape (§4.3): one column per zone, one row per target
  /// hour. Emits one [`LoadForecastRecord`] per (hour, zone) pair.
  pub fn load_forecast(bytes: &[u8], _scraped_at: NaiveDateTime) -> Result<TransformOutcome> {
    let mut reader = reader_for(bytes);
    let header_record = reader.headers().map_err(csv_schema_err("load_forecast"))?.clone();
    let headers = HeaderIndex::new(&header_record);

    let ts_col = headers.require("load_forecast", TIMESTAMP_CANDIDATES)?;
    let zone_cols = headers.all_except(&[ts_col]);
    if zone_cols.is_empty() {
      return Err(IngestError::SchemaError(
        "load_forecast: no zone columns found alongside the timestamp column".to_string(),
      ));
    }

    let mut out = Vec::new();
    let mut parse_warnings = 0u64;
    for result in reader.records() {
      let record = result.map_err(csv_schema_err("load_forecast"))?;
      let Some(ts) = parse_timestamp(field(&record, ts_col)) else {
        parse_warnings += 1;
        continue;
      };

      for &col in &zone_cols {
        let Some(zone_name) = headers.raw_name_at(&header_record, col).map(str::trim) else {
          parse_warnings += 1;
          continue;
        };
        if zone_name.is_empty() {
          parse_warnings += 1;
          continue;
        }
        out.push(FamilyRecord::LoadForecast(LoadForecastRecord {
          ts,
          zone_name: zone_name.to_string(),
          forecast_mw: parse_numeric(field(&record, col)),
        }));
      }
    }
    Ok(TransformOutcome { records: out, parse_warnings })
  }

  /// Covers both the dated interface-flow reports and the current-snapshot
  /// source (no date placeholder, no explicit timestamp column - stamped
  /// with `scraped_at`, §4.3 "Static-snapshot timestamp").
  pub fn interface_flow(bytes: &[u8], scraped_at: NaiveDateTime) -> Result<TransformOutcome> {
    let mut reader = reader_for(bytes);
    let headers = HeaderIndex::new(reader.headers().map_err(csv_schema_err("interface_flow"))?);

    let ts_col = headers.find(TIMESTAMP_CANDIDATES);
    let interface_col = headers.require("interface_flow", &["interface name", "interface"])?;
    let flow_col = headers.find(&["flow"]);
    let pos_limit_col = headers.find(&["positive limit", "pos limit"]);
    let neg_limit_col = headers.find(&["negative limit", "neg limit"]);

    let mut out = Vec::new();
    let mut parse_warnings = 0u64;
    for result in reader.records() {
      let record = result.map_err(csv_schema_err("interface_flow"))?;
      let ts = match ts_col {
        Some(c) => match parse_timestamp(field(&record, c)) {
          Some(ts) => ts,
          None => {
            parse_warnings += 1;
            continue;
          }
        },
        None => scraped_at,
      };
      let Some(interface_name) = clean_text(field(&record, interface_col)) else {
        parse_warnings += 1;
        continue;
      };

      out.push(FamilyRecord::InterfaceFlow(InterfaceFlowRecord {
        ts,
        interface_name,
        flow_mw: flow_col.and_then(|c| parse_numeric(field(&record, c))),
        pos_limit_mw: pos_limit_col.and_then(|c| parse_numeric(field(&record, c))),
        neg_limit_mw: neg_limit_col.and_then(|c| parse_numeric(field(&record, c))),
      }));
    }
    Ok(TransformOutcome { records: out, parse_warnings })
  }

  pub fn ancillary(bytes: &[u8], _scraped_at: NaiveDateTime) -> Result<TransformOutcome> {
    let mut reader = reader_for(bytes);
    let headers = HeaderIndex::new(reader.headers().map_err(csv_schema_err("ancillary"))?);

    let ts_col = headers.require("ancillary", TIMESTAMP_CANDIDATES)?;
    let zone_col = headers.require("ancillary", &["name", "zone"])?;
    let market_col = headers.find(&["market"]);
    let service_col = headers.require("ancillary", &["product", "service type", "service"])?;
    let price_col = headers.find(&["price"]);

    let mut out = Vec::new();
    let mut parse_warnings = 0u64;
    for result in reader.records() {
      let record = result.map_err(csv_schema_err("ancillary"))?;
      let Some(ts) = parse_timestamp(field(&record, ts_col)) else {
        parse_warnings += 1;
        continue;
      };
      let Some(zone_name) = clean_text(field(&record, zone_col)) else {
        parse_warnings += 1;
        continue;
      };
      let Some(service_type) = clean_text(field(&record, service_col)) else {
        parse_warnings += 1;
        continue;
      };

      out.push(FamilyRecord::Ancillary(AncillaryRecord {
        ts,
        zone_name,
        market: market_col
          .and_then(|c| clean_text(field(&record, c)))
          .unwrap_or_else(|| "unspecified".to_string()),
        service_type,
        price: price_col.and_then(|c| parse_numeric(field(&record, c))),
      }));
    }
    Ok(TransformOutcome { records: out, parse_warnings })
  }

  pub fn constraint(bytes: &[u8], _scraped_at: NaiveDateTime) -> Result<TransformOutcome> {
    let mut reader = reader_for(bytes);
    let headers = HeaderIndex::new(reader.headers().map_err(csv_schema_err("constraint"))?);

    let ts_col = headers.require("constraint", TIMESTAMP_CANDIDATES)?;
    let name_col = headers.require("constraint", &["constraint name", "constraint"])?;
    let market_col = headers.find(&["market"]);
    let shadow_col = headers.find(&["shadow price"]);
    let binding_col = headers.find(&["binding"]);
    let limit_col = headers.find(&["limit"]);
    let flow_col = headers.find(&["flow"]);

    let mut out = Vec::new();
    let mut parse_warnings = 0u64;
    for result in reader.records() {
      let record = result.map_err(csv_schema_err("constraint"))?;
      let Some(ts) = parse_timestamp(field(&record, ts_col)) else {
        parse_warnings += 1;
        continue;
      };
      let Some(constraint_name) = clean_text(field(&record, name_col)) else {
        parse_warnings += 1;
        continue;
      };

      out.push(FamilyRecord::Constraint(ConstraintRecord {
        ts,
        market: market_col
          .and_then(|c| clean_text(field(&record, c)))
          .unwrap_or_else(|| "unspecified".to_string()),
        constraint_name,
        shadow_price: shadow_col.and_then(|c| parse_numeric(field(&record, c))),
        binding: binding_col.and_then(|c| parse_bool(field(&record, c))),
        limit_mw: limit_col.and_then(|c| parse_numeric(field(&record, c))),
        flow_mw: flow_col.and_then(|c| parse_numeric(field(&record, c))),
      }));
    }
    Ok(TransformOutcome { records: out, parse_warnings })
  }

  /// RTO extraction (§4.3): `rto` is derived from the generator-name
  /// column by pattern match, not read directly from any column. Rows
  /// whose generator name matches none of the four patterns are dropped.
  /// `ts` is the interval *end* time per §4.3.
  pub fn external_rto_price(bytes: &[u8], _scraped_at: NaiveDateTime) -> Result<TransformOutcome> {
    let mut reader = reader_for(bytes);
    let headers = HeaderIndex::new(reader.headers().map_err(csv_schema_err("external_rto_price"))?);

    let ts_col = headers.require(
      "external_rto_price",
      &["interval end", "time stamp", "timestamp"],
    )?;
    let generator_col =
      headers.require("external_rto_price", &["generator", "name", "interface"])?;
    let rtc_col = headers.find(&["rtc"]);
    let cts_col = headers.find(&["cts"]);

    let mut out = Vec::new();
    let mut parse_warnings = 0u64;
    for result in reader.records() {
      let record = result.map_err(csv_schema_err("external_rto_price"))?;
      let Some(ts) = parse_timestamp(field(&record, ts_col)) else {
        parse_warnings += 1;
        continue;
      };
      let generator_name = field(&record, generator_col);
      // Unmatched generator names are dropped by the RTO-extraction policy
      // itself (§4.3), not a parse failure - not counted as a warning.
      let Some(rto) = classify_rto(generator_name) else { continue };

      let rtc_price = rtc_col.and_then(|c| parse_numeric(field(&record, c)));
      let cts_price = cts_col.and_then(|c| parse_numeric(field(&record, c)));
      let price_diff = match (rtc_price, cts_price) {
        (Some(rtc), Some(cts)) => Some(rtc - cts),
        _ => None,
      };

      out.push(FamilyRecord::ExternalRtoPrice(ExternalRtoPriceRecord {
        ts,
        rto: rto.to_string(),
        rtc_price,
        cts_price,
        price_diff,
      }));
    }
    Ok(TransformOutcome { records: out, parse_warnings })
  }

  pub fn atc_ttc(bytes: &[u8], _scraped_at: NaiveDateTime) -> Result<TransformOutcome> {
    let mut reader = reader_for(bytes);
    let headers = HeaderIndex::new(reader.headers().map_err(csv_schema_err("atc_ttc"))?);

    let ts_col = headers.require("atc_ttc", TIMESTAMP_CANDIDATES)?;
    let interface_col = headers.require("atc_ttc", &["interface name", "interface"])?;
    let forecast_type_col = headers.find(&["forecast type"]);
    let atc_col = headers.find(&["atc"]);
    let ttc_col = headers.find(&["ttc"]);
    let trm_col = headers.find(&["trm"]);
    let direction_col = headers.find(&["direction"]);

    let mut out = Vec::new();
    let mut parse_warnings = 0u64;
    for result in reader.records() {
      let record = result.map_err(csv_schema_err("atc_ttc"))?;
      let Some(ts) = parse_timestamp(field(&record, ts_col)) else {
        parse_warnings += 1;
        continue;
      };
      let Some(interface_name) = clean_text(field(&record, interface_col)) else {
        parse_warnings += 1;
        continue;
      };

      out.push(FamilyRecord::AtcTtc(AtcTtcRecord {
        ts,
        interface_name,
        forecast_type: forecast_type_col
          .and_then(|c| clean_text(field(&record, c)))
          .unwrap_or_else(|| "day_ahead".to_string()),
        atc_mw: atc_col.and_then(|c| parse_numeric(field(&record, c))),
        ttc_mw: ttc_col.and_then(|c| parse_numeric(field(&record, c))),
        trm_mw: trm_col.and_then(|c| parse_numeric(field(&record, c))),
        direction: direction_col
          .and_then(|c| clean_text(field(&record, c)))
          .unwrap_or_else(|| "unspecified".to_string()),
      }));
    }
    Ok(TransformOutcome { records: out, parse_warnings })
  }

  pub fn outage(bytes: &[u8], _scraped_at: NaiveDateTime) -> Result<TransformOutcome> {
    let mut reader = reader_for(bytes);
    let headers = HeaderIndex::new(reader.headers().map_err(csv_schema_err("outage"))?);

    let ts_col = headers.require("outage", TIMESTAMP_CANDIDATES)?;
    let outage_type_col = headers.find(&["outage type"]);
    let market_col = headers.find(&["market"]);
    let resource_col = headers.require("outage", &["resource name", "resource", "name"])?;
    let resource_type_col = headers.find(&["resource type"]);
    let capacity_col = headers.find(&["mw capacity", "capacity"]);
    let mw_outage_col = headers.find(&["mw outage", "outage mw"]);
    let start_col = headers.find(&["start"]);
    let end_col = headers.find(&["end"]);
    let status_col = headers.find(&["status"]);

    let mut out = Vec::new();
    let mut parse_warnings = 0u64;
    for result in reader.records() {
      let record = result.map_err(csv_schema_err("outage"))?;
      let Some(ts) = parse_timestamp(field(&record, ts_col)) else {
        parse_warnings += 1;
        continue;
      };
      let Some(resource_name) = clean_text(field(&record, resource_col)) else {
        parse_warnings += 1;
        continue;
      };

      out.push(FamilyRecord::Outage(OutageRecord {
        ts,
        outage_type: outage_type_col
          .and_then(|c| clean_text(field(&record, c)))
          .unwrap_or_else(|| "unspecified".to_string()),
        market: market_col
          .and_then(|c| clean_text(field(&record, c)))
          .unwrap_or_else(|| "unspecified".to_string()),
        resource_name,
        resource_type: resource_type_col.and_then(|c| clean_text(field(&record, c))),
        mw_capacity: capacity_col.and_then(|c| parse_numeric(field(&record, c))),
        mw_outage: mw_outage_col.and_then(|c| parse_numeric(field(&record, c))),
        start_t: start_col.and_then(|c| parse_timestamp(field(&record, c))),
        end_t: end_col.and_then(|c| parse_timestamp(field(&record, c))),
        status: status_col.and_then(|c| clean_text(field(&record, c))),
      }));
    }
    Ok(TransformOutcome { records: out, parse_warnings })
  }

  pub fn weather(bytes: &[u8], scraped_at: NaiveDateTime) -> Result<TransformOutcome> {
    let mut reader = reader_for(bytes);
    let headers = HeaderIndex::new(reader.headers().map_err(csv_schema_err("weather"))?);

    let forecast_ts_col =
      headers.find(&["forecast", "valid time"]).or_else(|| headers.find(TIMESTAMP_CANDIDATES));
    let location_col = headers.require("weather", &["location", "station"])?;
    let temp_col = headers.find(&["temp"]);
    let humidity_col = headers.find(&["humidity"]);
    let wind_mph_col = headers.find(&["wind mph", "wind speed"]);
    let wind_dir_col = headers.find(&["wind dir"]);
    let cloud_col = headers.find(&["cloud"]);

    let mut out = Vec::new();
    let mut parse_warnings = 0u64;
    for result in reader.records() {
      let record = result.map_err(csv_schema_err("weather"))?;
      let Some(location) = clean_text(field(&record, location_col)) else {
        parse_warnings += 1;
        continue;
      };
      let forecast_ts = forecast_ts_col
        .and_then(|c| parse_timestamp(field(&record, c)))
        .unwrap_or(scraped_at);

      out.push(FamilyRecord::Weather(WeatherRecord {
        ts: scraped_at,
        forecast_ts,
        location,
        temp_f: temp_col.and_then(|c| parse_numeric(field(&record, c))),
        humidity: humidity_col.and_then(|c| parse_numeric(field(&record, c))),
        wind_mph: wind_mph_col.and_then(|c| parse_numeric(field(&record, c))),
        wind_dir: wind_dir_col.and_then(|c| clean_text(field(&record, c))),
        cloud_pct: cloud_col.and_then(|c| parse_numeric(field(&record, c))),
      }));
    }
    Ok(TransformOutcome { records: out, parse_warnings })
  }

  pub fn fuel_mix(bytes: &[u8], _scraped_at: NaiveDateTime) -> Result<TransformOutcome> {
    let mut reader = reader_for(bytes);
    let headers = HeaderIndex::new(reader.headers().map_err(csv_schema_err("fuel_mix"))?);

    let ts_col = headers.require("fuel_mix", TIMESTAMP_CANDIDATES)?;
    let fuel_col = headers.require("fuel_mix", &["fuel category", "fuel type", "fuel"])?;
    let gen_col = headers.find(&["gen mw", "generation"]);
    let pct_col = headers.find(&["pct", "percent", "%"]);

    let mut out = Vec::new();
    let mut parse_warnings = 0u64;
    for result in reader.records() {
      let record = result.map_err(csv_schema_err("fuel_mix"))?;
      let Some(ts) = parse_timestamp(field(&record, ts_col)) else {
        parse_warnings += 1;
        continue;
      };
      let Some(fuel_type) = clean_text(field(&record, fuel_col)) else {
        parse_warnings += 1;
        continue;
      };

      out.push(FamilyRecord::FuelMix(FuelMixRecord {
        ts,
        fuel_type,
        generation_mw: gen_col.and_then(|c| parse_numeric(field(&record, c))),
        pct: pct_col.and_then(|c| parse_numeric(field(&record, c))),
      }));
    }
    Ok(TransformOutcome { records: out, parse_warnings })
  }

  pub fn advisory(bytes: &[u8], scraped_at: NaiveDateTime) -> Result<TransformOutcome> {
    let mut reader = reader_for(bytes);
    let headers = HeaderIndex::new(reader.headers().map_err(csv_schema_err("advisory"))?);

    let ts_col = headers.find(TIMESTAMP_CANDIDATES);
    let type_col = headers.find(&["advisory type", "type"]);
    let title_col = headers.require("advisory", &["title"])?;
    let message_col = headers.find(&["message", "description"]);
    let severity_col = headers.find(&["severity"]);

    let mut out = Vec::new();
    let mut parse_warnings = 0u64;
    for result in reader.records() {
      let record = result.map_err(csv_schema_err("advisory"))?;
      let Some(title) = clean_text(field(&record, title_col)) else {
        parse_warnings += 1;
        continue;
      };
      let ts = ts_col.and_then(|c| parse_timestamp(field(&record, c))).unwrap_or(scraped_at);

      out.push(FamilyRecord::Advisory(AdvisoryRecord {
        ts,
        advisory_type: type_col
          .and_then(|c| clean_text(field(&record, c)))
          .unwrap_or_else(|| "general".to_string()),
        title,
        message: message_col.and_then(|c| clean_text(field(&record, c))),
        severity: severity_col.and_then(|c| clean_text(field(&record, c))),
      }));
    }
    Ok(TransformOutcome { records: out, parse_warnings })
  }

  /// Pattern-matches the generator/interface name column to one of the four
  /// external RTOs (§4.3). Prefix conventions follow the upstream naming:
  /// `N.E._*`/`NE_*` → ISO-NE, `PJM_*` → PJM, `IESO_*` → IESO, `HQ_*` → HQ.
  fn classify_rto(generator_name: &str) -> Option<&'static str> {
    let upper = generator_name.trim().to_ascii_uppercase();
    if upper.starts_with("N.E._") || upper.starts_with("NE_") {
      Some("ISO-NE")
    } else if upper.starts_with("PJM_") {
      Some("PJM")
    } else if upper.starts_with("IESO_") {
      Some("IESO")
    } else if upper.starts_with("HQ_") {
      Some("HQ")
    } else {
      None
    }
  }

  fn csv_schema_err(family: &str) -> impl Fn(csv::Error) -> IngestError + '_ {
    move |e| IngestError::SchemaError(format!("{family}: malformed CSV: {e}"))
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
  fn rt_lbmp_transforms_the_scenario_1_csv() {
    let csv = "Time Stamp,Name,LBMP ($/MWHr),Marginal Cost Losses ($/MWHr),Marginal Cost Congestion ($/MWHr)\n\
               11/13/2025 00:00:00,WEST,42.10,1.20,0.50\n";
    let outcome = rt_lbmp.transform(csv.as_bytes(), now()).unwrap();
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.parse_warnings, 0);
    match &outcome.records[0] {
      FamilyRecord::RtLbmp(r) => {
        assert_eq!(r.zone_name, "WEST");
        assert_eq!(r.lbmp, Some(42.10));
        assert_eq!(r.marginal_cost_losses, Some(1.20));
        assert_eq!(r.marginal_cost_congestion, Some(0.50));
      }
      other => panic!("unexpected variant: {other:?}"),
    }
  }

  #[test]
  fn rt_lbmp_fails_without_a_zone_column() {
    let csv = "Time Stamp,LBMP ($/MWHr)\n11/13/2025 00:00:00,42.10\n";
    assert!(rt_lbmp.transform(csv.as_bytes(), now()).is_err());
  }

  #[test]
  fn rt_lbmp_skips_rows_with_unparseable_timestamps_and_counts_a_warning() {
    let csv = "Time Stamp,Name,LBMP ($/MWHr)\nnot-a-date,WEST,42.10\n11/13/2025 01:00:00,WEST,43.00\n";
    let outcome = rt_lbmp.transform(csv.as_bytes(), now()).unwrap();
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.parse_warnings, 1);
  }

  #[test]
  fn load_forecast_reshapes_wide_csv_into_one_row_per_zone() {
    let csv = "Time Stamp,WEST,EAST\n11/13/2025 13:00:00,1900,2100\n";
    let outcome = load_forecast.transform(csv.as_bytes(), now()).unwrap();
    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.parse_warnings, 0);
    let west = outcome
      .records
      .iter()
      .find_map(|r| match r {
        FamilyRecord::LoadForecast(lf) if lf.zone_name == "WEST" => Some(lf),
        _ => None,
      })
      .unwrap();
    assert_eq!(west.forecast_mw, Some(1900.0));
  }

  #[test]
  fn external_rto_price_drops_rows_matching_no_known_rto_prefix_without_a_warning() {
    let csv = "Interval End,Generator,RTC,CTS\n\
               11/13/2025 13:00:00,PJM_GEN1,30.0,28.0\n\
               11/13/2025 13:00:00,UNKNOWN_GEN,10.0,9.0\n";
    let outcome = external_rto_price.transform(csv.as_bytes(), now()).unwrap();
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.parse_warnings, 0, "RTO-prefix mismatch is a documented drop, not a parse warning");
    match &outcome.records[0] {
      FamilyRecord::ExternalRtoPrice(r) => {
        assert_eq!(r.rto, "PJM");
        assert_eq!(r.price_diff, Some(2.0));
      }
      other => panic!("unexpected variant: {other:?}"),
    }
  }

  #[test]
  fn interface_flow_stamps_snapshot_rows_with_scraped_at() {
    let csv = "Interface Name,Flow (MWH),Positive Limit,Negative Limit\nNY-NE,120,500,-500\n";
    let outcome = interface_flow.transform(csv.as_bytes(), now()).unwrap();
    assert_eq!(outcome.records.len(), 1);
    match &outcome.records[0] {
      FamilyRecord::InterfaceFlow(r) => {
        assert_eq!(r.ts, now());
        assert_eq!(r.flow_mw, Some(120.0));
      }
      other => panic!("unexpected variant: {other:?}"),
    }
  }

  #[test]
  fn dispatch_table_covers_every_family_tag() {
    let table = dispatch_table();
    for tag in [
      "rt_lbmp",
      "da_lbmp",
      "tw_lbmp",
      "rt_load",
      "load_forecast",
      "interface_flow",
      "ancillary",
      "constraint",
      "external_rto_price",
      "atc_ttc",
      "outage",
      "weather",
      "fuel_mix",
      "advisory",
    ] {
      assert!(table.contains_key(tag), "missing transformer for tag {tag}");
    }
  }
}
