use std::sync::Arc;

use diesel::prelude::*;
use grid_models::families::{
  AdvisoryRecord, AncillaryRecord, AtcTtcRecord, ConstraintRecord, ExternalRtoPriceRecord,
  FuelMixRecord, InterfaceFlowRecord, LbmpRecord, LoadForecastRecord, OutageRecord, RtLoadRecord,
  WeatherRecord,
};
use grid_models::FamilyRecord;

use crate::connection::{DatabaseContext, DbConnection};
use crate::error::StoreResult;
use crate::resolver::ReferenceResolver;

/// Per-job totals reported back to the Job Tracker (§4.5, §3 `Job`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOutcome {
  pub inserted: i64,
  pub updated: i64,
}

impl WriteOutcome {
  fn merge(self, outcome: UpsertOutcome) -> Self {
    match outcome {
      UpsertOutcome::Inserted => WriteOutcome { inserted: self.inserted + 1, ..self },
      UpsertOutcome::Updated => WriteOutcome { updated: self.updated + 1, ..self },
      UpsertOutcome::Unchanged => self,
    }
  }

  fn combine(self, other: WriteOutcome) -> Self {
    WriteOutcome { inserted: self.inserted + other.inserted, updated: self.updated + other.updated }
  }
}

enum UpsertOutcome {
  Inserted,
  Updated,
  Unchanged,
}

/// Classifies a write against the row currently on disk (§4.5): no existing
/// row is an insert, an existing row with different measurements is an
/// update, and an existing row with identical measurements is a no-op - the
/// writer never issues a statement that would only restate what's already
/// there.
fn classify<T: PartialEq>(existing: Option<T>, new: &T) -> UpsertOutcome {
  match existing {
    None => UpsertOutcome::Inserted,
    Some(old) if &old == new => UpsertOutcome::Unchanged,
    Some(_) => UpsertOutcome::Updated,
  }
}

/// C5: idempotent upsert-by-unique-key writer for the fourteen time-series
/// families (§4.5). Resolves zone/interface names through the shared
/// [`ReferenceResolver`] before writing; reference rows created along the
/// way are not rolled back if the subsequent family write fails; a
/// dangling zone/interface with no time-series rows is harmless (see
/// DESIGN.md).
pub struct TimeSeriesWriter {
  store: DatabaseContext,
  resolver: Arc<ReferenceResolver>,
}

impl TimeSeriesWriter {
  pub fn new(store: DatabaseContext, resolver: Arc<ReferenceResolver>) -> Self {
    TimeSeriesWriter { store, resolver }
  }

  /// Writes one job's worth of normalized records (already deduplicated by
  /// the Normalizer, §4.3) and returns the inserted/updated totals for the
  /// whole batch. Zone/interface names are resolved up front, then every
  /// record is upserted inside one database transaction so the batch
  /// commits together or not at all (§4.5 "atomicity per job").
  pub async fn write(&self, records: Vec<FamilyRecord>) -> StoreResult<WriteOutcome> {
    let mut resolved = Vec::with_capacity(records.len());
    for record in records {
      let ids = self.resolve_ids(&record).await?;
      resolved.push((record, ids));
    }

    let store = self.store.clone();
    store
      .run(move |conn| {
        conn.transaction(|conn| {
          let mut outcome = WriteOutcome::default();
          for (record, ids) in resolved {
            outcome = outcome.combine(write_one(conn, record, ids)?);
          }
          Ok(outcome)
        })
      })
      .await
  }

  async fn resolve_ids(&self, record: &FamilyRecord) -> StoreResult<ResolvedIds> {
    match record {
      FamilyRecord::RtLbmp(r) | FamilyRecord::DaLbmp(r) | FamilyRecord::TwLbmp(r) => {
        Ok(ResolvedIds::Zone(self.resolver.zone_id(&r.zone_name).await?))
      }
      FamilyRecord::RtLoad(r) => Ok(ResolvedIds::Zone(self.resolver.zone_id(&r.zone_name).await?)),
      FamilyRecord::LoadForecast(r) => Ok(ResolvedIds::Zone(self.resolver.zone_id(&r.zone_name).await?)),
      FamilyRecord::InterfaceFlow(r) => Ok(ResolvedIds::Interface(self.resolver.interface_id(&r.interface_name).await?)),
      FamilyRecord::Ancillary(r) => Ok(ResolvedIds::Zone(self.resolver.zone_id(&r.zone_name).await?)),
      FamilyRecord::AtcTtc(r) => Ok(ResolvedIds::Interface(self.resolver.interface_id(&r.interface_name).await?)),
      FamilyRecord::Constraint(_)
      | FamilyRecord::ExternalRtoPrice(_)
      | FamilyRecord::Outage(_)
      | FamilyRecord::Weather(_)
      | FamilyRecord::FuelMix(_)
      | FamilyRecord::Advisory(_) => Ok(ResolvedIds::None),
    }
  }
}

/// Surrogate id resolved for a record ahead of the write transaction - at
/// most one of zone/interface applies to any given family.
enum ResolvedIds {
  Zone(i32),
  Interface(i32),
  None,
}

fn write_one(conn: &mut DbConnection, record: FamilyRecord, ids: ResolvedIds) -> StoreResult<WriteOutcome> {
  match (record, ids) {
    (FamilyRecord::RtLbmp(r), ResolvedIds::Zone(zone_id)) => upsert_lbmp(conn, Family::RtLbmp, r, zone_id),
    (FamilyRecord::DaLbmp(r), ResolvedIds::Zone(zone_id)) => upsert_lbmp(conn, Family::DaLbmp, r, zone_id),
    (FamilyRecord::TwLbmp(r), ResolvedIds::Zone(zone_id)) => upsert_lbmp(conn, Family::TwLbmp, r, zone_id),
    (FamilyRecord::RtLoad(r), ResolvedIds::Zone(zone_id)) => upsert_rt_load(conn, r, zone_id),
    (FamilyRecord::LoadForecast(r), ResolvedIds::Zone(zone_id)) => upsert_load_forecast(conn, r, zone_id),
    (FamilyRecord::InterfaceFlow(r), ResolvedIds::Interface(interface_id)) => {
      upsert_interface_flow(conn, r, interface_id)
    }
    (FamilyRecord::Ancillary(r), ResolvedIds::Zone(zone_id)) => upsert_ancillary(conn, r, zone_id),
    (FamilyRecord::Constraint(r), ResolvedIds::None) => upsert_constraint(conn, r),
    (FamilyRecord::ExternalRtoPrice(r), ResolvedIds::None) => upsert_external_rto_price(conn, r),
    (FamilyRecord::AtcTtc(r), ResolvedIds::Interface(interface_id)) => upsert_atc_ttc(conn, r, interface_id),
    (FamilyRecord::Outage(r), ResolvedIds::None) => upsert_outage(conn, r),
    (FamilyRecord::Weather(r), ResolvedIds::None) => upsert_weather(conn, r),
    (FamilyRecord::FuelMix(r), ResolvedIds::None) => upsert_fuel_mix(conn, r),
    (FamilyRecord::Advisory(r), ResolvedIds::None) => upsert_advisory(conn, r),
    (record, _) => unreachable!("resolve_ids always produces the id shape {record:?} expects"),
  }
}

#[derive(Debug, Clone, Copy)]
enum Family {
  RtLbmp,
  DaLbmp,
  TwLbmp,
}

type LbmpTuple = (Option<f64>, Option<f64>, Option<f64>);

fn lbmp_tuple(r: &LbmpRecord) -> LbmpTuple {
  (r.lbmp, r.marginal_cost_congestion, r.marginal_cost_losses)
}

fn upsert_lbmp(
  conn: &mut DbConnection,
  family: Family,
  r: LbmpRecord,
  zone_id: i32,
) -> StoreResult<WriteOutcome> {
  macro_rules! run_for {
    ($table:ident) => {{
      use crate::schema::$table::dsl;
      let existing: Option<LbmpTuple> = dsl::$table
        .filter(dsl::ts.eq(r.ts).and(dsl::zone_id.eq(zone_id)))
        .select((dsl::lbmp, dsl::marginal_cost_congestion, dsl::marginal_cost_losses))
        .first(conn)
        .optional()?;

      let outcome = classify(existing, &lbmp_tuple(&r));
      match outcome {
        UpsertOutcome::Inserted => {
          diesel::insert_into(dsl::$table)
            .values((
              dsl::ts.eq(r.ts),
              dsl::zone_id.eq(zone_id),
              dsl::lbmp.eq(r.lbmp),
              dsl::marginal_cost_congestion.eq(r.marginal_cost_congestion),
              dsl::marginal_cost_losses.eq(r.marginal_cost_losses),
            ))
            .execute(conn)?;
        }
        UpsertOutcome::Updated => {
          diesel::update(dsl::$table.filter(dsl::ts.eq(r.ts).and(dsl::zone_id.eq(zone_id))))
            .set((
              dsl::lbmp.eq(r.lbmp),
              dsl::marginal_cost_congestion.eq(r.marginal_cost_congestion),
              dsl::marginal_cost_losses.eq(r.marginal_cost_losses),
            ))
            .execute(conn)?;
        }
        UpsertOutcome::Unchanged => {}
      }
      Ok(WriteOutcome::default().merge(outcome))
    }};
  }

  match family {
    Family::RtLbmp => run_for!(rt_lbmp),
    Family::DaLbmp => run_for!(da_lbmp),
    Family::TwLbmp => run_for!(tw_lbmp),
  }
}

fn upsert_rt_load(conn: &mut DbConnection, r: RtLoadRecord, zone_id: i32) -> StoreResult<WriteOutcome> {
  use crate::schema::rt_load::dsl;

  let existing: Option<Option<f64>> = dsl::rt_load
    .filter(dsl::ts.eq(r.ts).and(dsl::zone_id.eq(zone_id)))
    .select(dsl::load_mw)
    .first(conn)
    .optional()?;

  let outcome = classify(existing, &r.load_mw);
  match outcome {
    UpsertOutcome::Inserted => {
      diesel::insert_into(dsl::rt_load)
        .values((dsl::ts.eq(r.ts), dsl::zone_id.eq(zone_id), dsl::load_mw.eq(r.load_mw)))
        .execute(conn)?;
    }
    UpsertOutcome::Updated => {
      diesel::update(dsl::rt_load.filter(dsl::ts.eq(r.ts).and(dsl::zone_id.eq(zone_id))))
        .set(dsl::load_mw.eq(r.load_mw))
        .execute(conn)?;
    }
    UpsertOutcome::Unchanged => {}
  }
  Ok(WriteOutcome::default().merge(outcome))
}

fn upsert_load_forecast(
  conn: &mut DbConnection,
  r: LoadForecastRecord,
  zone_id: i32,
) -> StoreResult<WriteOutcome> {
  use crate::schema::load_forecast::dsl;

  let existing: Option<Option<f64>> = dsl::load_forecast
    .filter(dsl::ts.eq(r.ts).and(dsl::zone_id.eq(zone_id)))
    .select(dsl::forecast_mw)
    .first(conn)
    .optional()?;

  let outcome = classify(existing, &r.forecast_mw);
  match outcome {
    UpsertOutcome::Inserted => {
      diesel::insert_into(dsl::load_forecast)
        .values((dsl::ts.eq(r.ts), dsl::zone_id.eq(zone_id), dsl::forecast_mw.eq(r.forecast_mw)))
        .execute(conn)?;
    }
    UpsertOutcome::Updated => {
      diesel::update(dsl::load_forecast.filter(dsl::ts.eq(r.ts).and(dsl::zone_id.eq(zone_id))))
        .set(dsl::forecast_mw.eq(r.forecast_mw))
        .execute(conn)?;
    }
    UpsertOutcome::Unchanged => {}
  }
  Ok(WriteOutcome::default().merge(outcome))
}

fn upsert_interface_flow(
  conn: &mut DbConnection,
  r: InterfaceFlowRecord,
  interface_id: i32,
) -> StoreResult<WriteOutcome> {
  use crate::schema::interface_flow::dsl;

  type Tuple = (Option<f64>, Option<f64>, Option<f64>);
  let existing: Option<Tuple> = dsl::interface_flow
    .filter(dsl::ts.eq(r.ts).and(dsl::interface_id.eq(interface_id)))
    .select((dsl::flow_mw, dsl::pos_limit_mw, dsl::neg_limit_mw))
    .first(conn)
    .optional()?;

  let new = (r.flow_mw, r.pos_limit_mw, r.neg_limit_mw);
  let outcome = classify(existing, &new);
  match outcome {
    UpsertOutcome::Inserted => {
      diesel::insert_into(dsl::interface_flow)
        .values((
          dsl::ts.eq(r.ts),
          dsl::interface_id.eq(interface_id),
          dsl::flow_mw.eq(r.flow_mw),
          dsl::pos_limit_mw.eq(r.pos_limit_mw),
          dsl::neg_limit_mw.eq(r.neg_limit_mw),
        ))
        .execute(conn)?;
    }
    UpsertOutcome::Updated => {
      diesel::update(
        dsl::interface_flow.filter(dsl::ts.eq(r.ts).and(dsl::interface_id.eq(interface_id))),
      )
      .set((
        dsl::flow_mw.eq(r.flow_mw),
        dsl::pos_limit_mw.eq(r.pos_limit_mw),
        dsl::neg_limit_mw.eq(r.neg_limit_mw),
      ))
      .execute(conn)?;
    }
    UpsertOutcome::Unchanged => {}
  }
  Ok(WriteOutcome::default().merge(outcome))
}

fn upsert_ancillary(conn: &mut DbConnection, r: AncillaryRecord, zone_id: i32) -> StoreResult<WriteOutcome> {
  use crate::schema::ancillary::dsl;

  let existing: Option<Option<f64>> = dsl::ancillary
    .filter(
      dsl::ts
        .eq(r.ts)
        .and(dsl::zone_id.eq(zone_id))
        .and(dsl::market.eq(&r.market))
        .and(dsl::service_type.eq(&r.service_type)),
    )
    .select(dsl::price)
    .first(conn)
    .optional()?;

  let outcome = classify(existing, &r.price);
  match outcome {
    UpsertOutcome::Inserted => {
      diesel::insert_into(dsl::ancillary)
        .values((
          dsl::ts.eq(r.ts),
          dsl::zone_id.eq(zone_id),
          dsl::market.eq(&r.market),
          dsl::service_type.eq(&r.service_type),
          dsl::price.eq(r.price),
        ))
        .execute(conn)?;
    }
    UpsertOutcome::Updated => {
      diesel::update(dsl::ancillary.filter(
        dsl::ts.eq(r.ts).and(dsl::zone_id.eq(zone_id)).and(dsl::market.eq(&r.market)).and(
          dsl::service_type.eq(&r.service_type),
        ),
      ))
      .set(dsl::price.eq(r.price))
      .execute(conn)?;
    }
    UpsertOutcome::Unchanged => {}
  }
  Ok(WriteOutcome::default().merge(outcome))
}

fn upsert_constraint(conn: &mut DbConnection, r: ConstraintRecord) -> StoreResult<WriteOutcome> {
  use crate::schema::constraint::dsl;

  type Tuple = (Option<f64>, Option<bool>, Option<f64>, Option<f64>);
  let existing: Option<Tuple> = dsl::constraint
    .filter(dsl::ts.eq(r.ts).and(dsl::constraint_name.eq(&r.constraint_name)).and(dsl::market.eq(&r.market)))
    .select((dsl::shadow_price, dsl::binding, dsl::limit_mw, dsl::flow_mw))
    .first(conn)
    .optional()?;

  let new = (r.shadow_price, r.binding, r.limit_mw, r.flow_mw);
  let outcome = classify(existing, &new);
  match outcome {
    UpsertOutcome::Inserted => {
      diesel::insert_into(dsl::constraint)
        .values((
          dsl::ts.eq(r.ts),
          dsl::market.eq(&r.market),
          dsl::constraint_name.eq(&r.constraint_name),
          dsl::shadow_price.eq(r.shadow_price),
          dsl::binding.eq(r.binding),
          dsl::limit_mw.eq(r.limit_mw),
          dsl::flow_mw.eq(r.flow_mw),
        ))
        .execute(conn)?;
    }
    UpsertOutcome::Updated => {
      diesel::update(
        dsl::constraint
          .filter(dsl::ts.eq(r.ts).and(dsl::constraint_name.eq(&r.constraint_name)).and(dsl::market.eq(&r.market))),
      )
      .set((
        dsl::shadow_price.eq(r.shadow_price),
        dsl::binding.eq(r.binding),
        dsl::limit_mw.eq(r.limit_mw),
        dsl::flow_mw.eq(r.flow_mw),
      ))
      .execute(conn)?;
    }
    UpsertOutcome::Unchanged => {}
  }
  Ok(WriteOutcome::default().merge(outcome))
}

fn upsert_external_rto_price(conn: &mut DbConnection, r: ExternalRtoPriceRecord) -> StoreResult<WriteOutcome> {
  use crate::schema::external_rto_price::dsl;

  type Tuple = (Option<f64>, Option<f64>, Option<f64>);
  let existing: Option<Tuple> = dsl::external_rto_price
    .filter(dsl::ts.eq(r.ts).and(dsl::rto.eq(&r.rto)))
    .select((dsl::rtc_price, dsl::cts_price, dsl::price_diff))
    .first(conn)
    .optional()?;

  let new = (r.rtc_price, r.cts_price, r.price_diff);
  let outcome = classify(existing, &new);
  match outcome {
    UpsertOutcome::Inserted => {
      diesel::insert_into(dsl::external_rto_price)
        .values((
          dsl::ts.eq(r.ts),
          dsl::rto.eq(&r.rto),
          dsl::rtc_price.eq(r.rtc_price),
          dsl::cts_price.eq(r.cts_price),
          dsl::price_diff.eq(r.price_diff),
        ))
        .execute(conn)?;
    }
    UpsertOutcome::Updated => {
      diesel::update(dsl::external_rto_price.filter(dsl::ts.eq(r.ts).and(dsl::rto.eq(&r.rto))))
        .set((
          dsl::rtc_price.eq(r.rtc_price),
          dsl::cts_price.eq(r.cts_price),
          dsl::price_diff.eq(r.price_diff),
        ))
        .execute(conn)?;
    }
    UpsertOutcome::Unchanged => {}
  }
  Ok(WriteOutcome::default().merge(outcome))
}

fn upsert_atc_ttc(conn: &mut DbConnection, r: AtcTtcRecord, interface_id: i32) -> StoreResult<WriteOutcome> {
  use crate::schema::atc_ttc::dsl;

  type Tuple = (Option<f64>, Option<f64>, Option<f64>);
  let existing: Option<Tuple> = dsl::atc_ttc
    .filter(
      dsl::ts
        .eq(r.ts)
        .and(dsl::interface_id.eq(interface_id))
        .and(dsl::forecast_type.eq(&r.forecast_type))
        .and(dsl::direction.eq(&r.direction)),
    )
    .select((dsl::atc_mw, dsl::ttc_mw, dsl::trm_mw))
    .first(conn)
    .optional()?;

  let new = (r.atc_mw, r.ttc_mw, r.trm_mw);
  let outcome = classify(existing, &new);
  match outcome {
    UpsertOutcome::Inserted => {
      diesel::insert_into(dsl::atc_ttc)
        .values((
          dsl::ts.eq(r.ts),
          dsl::interface_id.eq(interface_id),
          dsl::forecast_type.eq(&r.forecast_type),
          dsl::atc_mw.eq(r.atc_mw),
          dsl::ttc_mw.eq(r.ttc_mw),
          dsl::trm_mw.eq(r.trm_mw),
          dsl::direction.eq(&r.direction),
        ))
        .execute(conn)?;
    }
    UpsertOutcome::Updated => {
      diesel::update(dsl::atc_ttc.filter(
        dsl::ts.eq(r.ts).and(dsl::interface_id.eq(interface_id)).and(dsl::forecast_type.eq(&r.forecast_type)).and(
          dsl::direction.eq(&r.direction),
        ),
      ))
      .set((dsl::atc_mw.eq(r.atc_mw), dsl::ttc_mw.eq(r.ttc_mw), dsl::trm_mw.eq(r.trm_mw)))
      .execute(conn)?;
    }
    UpsertOutcome::Unchanged => {}
  }
  Ok(WriteOutcome::default().merge(outcome))
}

fn upsert_outage(conn: &mut DbConnection, r: OutageRecord) -> StoreResult<WriteOutcome> {
  use crate::schema::outage::dsl;

  type Tuple = (
    String,
    Option<f64>,
    Option<f64>,
    Option<chrono::NaiveDateTime>,
    Option<chrono::NaiveDateTime>,
    Option<String>,
  );
  let existing: Option<Tuple> = dsl::outage
    .filter(dsl::ts.eq(r.ts).and(dsl::outage_type.eq(&r.outage_type)).and(dsl::resource_name.eq(&r.resource_name)))
    .select((dsl::market, dsl::mw_capacity, dsl::mw_outage, dsl::start_t, dsl::end_t, dsl::status))
    .first(conn)
    .optional()?;

  let new = (r.market.clone(), r.mw_capacity, r.mw_outage, r.start_t, r.end_t, r.status.clone());
  let outcome = classify(existing, &new);
  match outcome {
    UpsertOutcome::Inserted => {
      diesel::insert_into(dsl::outage)
        .values((
          dsl::ts.eq(r.ts),
          dsl::outage_type.eq(&r.outage_type),
          dsl::market.eq(&r.market),
          dsl::resource_name.eq(&r.resource_name),
          dsl::resource_type.eq(&r.resource_type),
          dsl::mw_capacity.eq(r.mw_capacity),
          dsl::mw_outage.eq(r.mw_outage),
          dsl::start_t.eq(r.start_t),
          dsl::end_t.eq(r.end_t),
          dsl::status.eq(&r.status),
        ))
        .execute(conn)?;
    }
    UpsertOutcome::Updated => {
      diesel::update(
        dsl::outage.filter(
          dsl::ts.eq(r.ts).and(dsl::outage_type.eq(&r.outage_type)).and(dsl::resource_name.eq(&r.resource_name)),
        ),
      )
      .set((
        dsl::market.eq(&r.market),
        dsl::resource_type.eq(&r.resource_type),
        dsl::mw_capacity.eq(r.mw_capacity),
        dsl::mw_outage.eq(r.mw_outage),
        dsl::start_t.eq(r.start_t),
        dsl::end_t.eq(r.end_t),
        dsl::status.eq(&r.status),
      ))
      .execute(conn)?;
    }
    UpsertOutcome::Unchanged => {}
  }
  Ok(WriteOutcome::default().merge(outcome))
}

fn upsert_weather(conn: &mut DbConnection, r: WeatherRecord) -> StoreResult<WriteOutcome> {
  use crate::schema::weather::dsl;

  type Tuple = (Option<f64>, Option<f64>, Option<f64>, Option<String>, Option<f64>);
  let existing: Option<Tuple> = dsl::weather
    .filter(dsl::ts.eq(r.ts).and(dsl::forecast_ts.eq(r.forecast_ts)).and(dsl::location.eq(&r.location)))
    .select((dsl::temp_f, dsl::humidity, dsl::wind_mph, dsl::wind_dir, dsl::cloud_pct))
    .first(conn)
    .optional()?;

  let new = (r.temp_f, r.humidity, r.wind_mph, r.wind_dir.clone(), r.cloud_pct);
  let outcome = classify(existing, &new);
  match outcome {
    UpsertOutcome::Inserted => {
      diesel::insert_into(dsl::weather)
        .values((
          dsl::ts.eq(r.ts),
          dsl::forecast_ts.eq(r.forecast_ts),
          dsl::location.eq(&r.location),
          dsl::temp_f.eq(r.temp_f),
          dsl::humidity.eq(r.humidity),
          dsl::wind_mph.eq(r.wind_mph),
          dsl::wind_dir.eq(&r.wind_dir),
          dsl::cloud_pct.eq(r.cloud_pct),
        ))
        .execute(conn)?;
    }
    UpsertOutcome::Updated => {
      diesel::update(
        dsl::weather.filter(dsl::ts.eq(r.ts).and(dsl::forecast_ts.eq(r.forecast_ts)).and(dsl::location.eq(&r.location))),
      )
      .set((
        dsl::temp_f.eq(r.temp_f),
        dsl::humidity.eq(r.humidity),
        dsl::wind_mph.eq(r.wind_mph),
        dsl::wind_dir.eq(&r.wind_dir),
        dsl::cloud_pct.eq(r.cloud_pct),
      ))
      .execute(conn)?;
    }
    UpsertOutcome::Unchanged => {}
  }
  Ok(WriteOutcome::default().merge(outcome))
}

fn upsert_fuel_mix(conn: &mut DbConnection, r: FuelMixRecord) -> StoreResult<WriteOutcome> {
  use crate::schema::fuel_mix::dsl;

  type Tuple = (Option<f64>, Option<f64>);
  let existing: Option<Tuple> = dsl::fuel_mix
    .filter(dsl::ts.eq(r.ts).and(dsl::fuel_type.eq(&r.fuel_type)))
    .select((dsl::generation_mw, dsl::pct))
    .first(conn)
    .optional()?;

  let new = (r.generation_mw, r.pct);
  let outcome = classify(existing, &new);
  match outcome {
    UpsertOutcome::Inserted => {
      diesel::insert_into(dsl::fuel_mix)
        .values((
          dsl::ts.eq(r.ts),
          dsl::fuel_type.eq(&r.fuel_type),
          dsl::generation_mw.eq(r.generation_mw),
          dsl::pct.eq(r.pct),
        ))
        .execute(conn)?;
    }
    UpsertOutcome::Updated => {
      diesel::update(dsl::fuel_mix.filter(dsl::ts.eq(r.ts).and(dsl::fuel_type.eq(&r.fuel_type))))
        .set((dsl::generation_mw.eq(r.generation_mw), dsl::pct.eq(r.pct)))
        .execute(conn)?;
    }
    UpsertOutcome::Unchanged => {}
  }
  Ok(WriteOutcome::default().merge(outcome))
}

fn upsert_advisory(conn: &mut DbConnection, r: AdvisoryRecord) -> StoreResult<WriteOutcome> {
  use crate::schema::advisory::dsl;

  type Tuple = (Option<String>, Option<String>);
  let existing: Option<Tuple> = dsl::advisory
    .filter(dsl::ts.eq(r.ts).and(dsl::advisory_type.eq(&r.advisory_type)).and(dsl::title.eq(&r.title)))
    .select((dsl::message, dsl::severity))
    .first(conn)
    .optional()?;

  let new = (r.message.clone(), r.severity.clone());
  let outcome = classify(existing, &new);
  match outcome {
    UpsertOutcome::Inserted => {
      diesel::insert_into(dsl::advisory)
        .values((
          dsl::ts.eq(r.ts),
          dsl::advisory_type.eq(&r.advisory_type),
          dsl::title.eq(&r.title),
          dsl::message.eq(&r.message),
          dsl::severity.eq(&r.severity),
        ))
        .execute(conn)?;
    }
    UpsertOutcome::Updated => {
      diesel::update(
        dsl::advisory
          .filter(dsl::ts.eq(r.ts).and(dsl::advisory_type.eq(&r.advisory_type)).and(dsl::title.eq(&r.title))),
      )
      .set((dsl::message.eq(&r.message), dsl::severity.eq(&r.severity)))
      .execute(conn)?;
    }
    UpsertOutcome::Unchanged => {}
  }
  Ok(WriteOutcome::default().merge(outcome))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn classify_reports_inserted_for_absent_rows() {
    let outcome = classify(None::<f64>, &42.0);
    assert!(matches!(outcome, UpsertOutcome::Inserted));
  }

  #[test]
  fn classify_reports_unchanged_for_identical_values() {
    let outcome = classify(Some(42.0), &42.0);
    assert!(matches!(outcome, UpsertOutcome::Unchanged));
  }

  #[test]
  fn classify_reports_updated_for_different_values() {
    let outcome = classify(Some(42.0), &43.0);
    assert!(matches!(outcome, UpsertOutcome::Updated));
  }

  #[test]
  fn write_outcome_merge_and_combine_tally_correctly() {
    let a = WriteOutcome::default().merge(UpsertOutcome::Inserted).merge(UpsertOutcome::Unchanged);
    let b = WriteOutcome::default().merge(UpsertOutcome::Updated);
    let total = a.combine(b);
    assert_eq!(total, WriteOutcome { inserted: 1, updated: 1 });
  }
}
