use axum::extract::{Query, State};
use axum::response::Json;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use grid_api::{parse_query, QueryParams, ValidatedQuery};
use grid_models::families::*;
use grid_store::DbConnection;

use crate::error::ApiResponseError;
use crate::state::AppState;

/// Every family route: validate the query string, run the fetch on the
/// blocking pool, newest-first with the validated limit already applied in
/// SQL. One function per family (§3/§4.11) - the families differ enough in
/// key shape (zone, interface, or neither) that a shared generic fetch would
/// obscure more than it would save.

pub async fn realtime_lbmp(state: State<AppState>, query: Query<QueryParams>) -> Result<Json<Vec<LbmpRecord>>, ApiResponseError> {
  lbmp_handler(state, query, "rt_lbmp").await
}

pub async fn dayahead_lbmp(state: State<AppState>, query: Query<QueryParams>) -> Result<Json<Vec<LbmpRecord>>, ApiResponseError> {
  lbmp_handler(state, query, "da_lbmp").await
}

pub async fn timeweighted_lbmp(state: State<AppState>, query: Query<QueryParams>) -> Result<Json<Vec<LbmpRecord>>, ApiResponseError> {
  lbmp_handler(state, query, "tw_lbmp").await
}

async fn lbmp_handler(State(state): State<AppState>, Query(raw): Query<QueryParams>, table: &'static str) -> Result<Json<Vec<LbmpRecord>>, ApiResponseError> {
  let validated = parse_query(&raw)?;
  let rows = state.store.run(move |conn| fetch_lbmp(conn, table, &validated)).await?;
  Ok(Json(rows))
}

fn fetch_lbmp(conn: &mut DbConnection, table: &str, q: &ValidatedQuery) -> grid_store::StoreResult<Vec<LbmpRecord>> {
  use grid_store::schema::{da_lbmp, rt_lbmp, tw_lbmp, zones};

  macro_rules! run {
    ($table:ident) => {{
      let mut query = $table::table.inner_join(zones::table.on($table::zone_id.eq(zones::id))).into_boxed();
      if let Some(start) = q.range.start {
        query = query.filter($table::ts.ge(start));
      }
      if let Some(end) = q.range.end {
        query = query.filter($table::ts.le(end));
      }
      if let Some(names) = &q.zones {
        query = query.filter(zones::name.eq_any(names.clone()));
      }
      query
        .order($table::ts.desc())
        .limit(q.limit as i64)
        .select((zones::name, $table::ts, $table::lbmp, $table::marginal_cost_congestion, $table::marginal_cost_losses))
        .load::<(String, NaiveDateTime, Option<f64>, Option<f64>, Option<f64>)>(conn)?
        .into_iter()
        .map(|(zone_name, ts, lbmp, marginal_cost_congestion, marginal_cost_losses)| LbmpRecord { ts, zone_name, lbmp, marginal_cost_congestion, marginal_cost_losses })
        .collect()
    }};
  }

  let rows: Vec<LbmpRecord> = match table {
    "rt_lbmp" => run!(rt_lbmp),
    "da_lbmp" => run!(da_lbmp),
    _ => run!(tw_lbmp),
  };
  Ok(rows)
}

pub async fn realtime_load(State(state): State<AppState>, Query(raw): Query<QueryParams>) -> Result<Json<Vec<RtLoadRecord>>, ApiResponseError> {
  let validated = parse_query(&raw)?;
  let rows = state.store.run(move |conn| fetch_rt_load(conn, &validated)).await?;
  Ok(Json(rows))
}

fn fetch_rt_load(conn: &mut DbConnection, q: &ValidatedQuery) -> grid_store::StoreResult<Vec<RtLoadRecord>> {
  use grid_store::schema::{rt_load, zones};

  let mut query = rt_load::table.inner_join(zones::table.on(rt_load::zone_id.eq(zones::id))).into_boxed();
  if let Some(start) = q.range.start {
    query = query.filter(rt_load::ts.ge(start));
  }
  if let Some(end) = q.range.end {
    query = query.filter(rt_load::ts.le(end));
  }
  if let Some(names) = &q.zones {
    query = query.filter(zones::name.eq_any(names.clone()));
  }

  let rows = query
    .order(rt_load::ts.desc())
    .limit(q.limit as i64)
    .select((zones::name, rt_load::ts, rt_load::load_mw))
    .load::<(String, NaiveDateTime, Option<f64>)>(conn)?;
  Ok(rows.into_iter().map(|(zone_name, ts, load_mw)| RtLoadRecord { ts, zone_name, load_mw }).collect())
}

pub async fn load_forecast(State(state): State<AppState>, Query(raw): Query<QueryParams>) -> Result<Json<Vec<LoadForecastRecord>>, ApiResponseError> {
  let validated = parse_query(&raw)?;
  let rows = state.store.run(move |conn| fetch_load_forecast(conn, &validated)).await?;
  Ok(Json(rows))
}

fn fetch_load_forecast(conn: &mut DbConnection, q: &ValidatedQuery) -> grid_store::StoreResult<Vec<LoadForecastRecord>> {
  use grid_store::schema::{load_forecast, zones};

  let mut query = load_forecast::table.inner_join(zones::table.on(load_forecast::zone_id.eq(zones::id))).into_boxed();
  if let Some(start) = q.range.start {
    query = query.filter(load_forecast::ts.ge(start));
  }
  if let Some(end) = q.range.end {
    query = query.filter(load_forecast::ts.le(end));
  }
  if let Some(names) = &q.zones {
    query = query.filter(zones::name.eq_any(names.clone()));
  }

  let rows = query
    .order(load_forecast::ts.desc())
    .limit(q.limit as i64)
    .select((zones::name, load_forecast::ts, load_forecast::forecast_mw))
    .load::<(String, NaiveDateTime, Option<f64>)>(conn)?;
  Ok(rows.into_iter().map(|(zone_name, ts, forecast_mw)| LoadForecastRecord { ts, zone_name, forecast_mw }).collect())
}

pub async fn interface_flows(State(state): State<AppState>, Query(raw): Query<QueryParams>) -> Result<Json<Vec<InterfaceFlowRecord>>, ApiResponseError> {
  let validated = parse_query(&raw)?;
  let rows = state.store.run(move |conn| fetch_interface_flows(conn, &validated)).await?;
  Ok(Json(rows))
}

fn fetch_interface_flows(conn: &mut DbConnection, q: &ValidatedQuery) -> grid_store::StoreResult<Vec<InterfaceFlowRecord>> {
  use grid_store::schema::{interface_flow, interfaces};

  let mut query = interface_flow::table.inner_join(interfaces::table.on(interface_flow::interface_id.eq(interfaces::id))).into_boxed();
  if let Some(start) = q.range.start {
    query = query.filter(interface_flow::ts.ge(start));
  }
  if let Some(end) = q.range.end {
    query = query.filter(interface_flow::ts.le(end));
  }
  if let Some(name) = &q.interface_name {
    query = query.filter(interfaces::name.eq(grid_core::canonical_name(name)));
  }

  let rows = query
    .order(interface_flow::ts.desc())
    .limit(q.limit as i64)
    .select((interfaces::name, interface_flow::ts, interface_flow::flow_mw, interface_flow::pos_limit_mw, interface_flow::neg_limit_mw))
    .load::<(String, NaiveDateTime, Option<f64>, Option<f64>, Option<f64>)>(conn)?;
  Ok(
    rows
      .into_iter()
      .map(|(interface_name, ts, flow_mw, pos_limit_mw, neg_limit_mw)| InterfaceFlowRecord { ts, interface_name, flow_mw, pos_limit_mw, neg_limit_mw })
      .collect(),
  )
}

pub async fn ancillary_services(State(state): State<AppState>, Query(raw): Query<QueryParams>) -> Result<Json<Vec<AncillaryRecord>>, ApiResponseError> {
  let validated = parse_query(&raw)?;
  let rows = state.store.run(move |conn| fetch_ancillary(conn, &validated)).await?;
  Ok(Json(rows))
}

fn fetch_ancillary(conn: &mut DbConnection, q: &ValidatedQuery) -> grid_store::StoreResult<Vec<AncillaryRecord>> {
  use grid_store::schema::{ancillary, zones};

  let mut query = ancillary::table.inner_join(zones::table.on(ancillary::zone_id.eq(zones::id))).into_boxed();
  if let Some(start) = q.range.start {
    query = query.filter(ancillary::ts.ge(start));
  }
  if let Some(end) = q.range.end {
    query = query.filter(ancillary::ts.le(end));
  }
  if let Some(names) = &q.zones {
    query = query.filter(zones::name.eq_any(names.clone()));
  }
  if let Some(service_type) = &q.service_type {
    query = query.filter(ancillary::service_type.eq(service_type.clone()));
  }
  if let Some(market) = &q.market_type {
    let market_str = match market {
      grid_api::MarketType::RealTime => "realtime",
      grid_api::MarketType::DayAhead => "dayahead",
    };
    query = query.filter(ancillary::market.eq(market_str));
  }

  let rows = query
    .order(ancillary::ts.desc())
    .limit(q.limit as i64)
    .select((zones::name, ancillary::ts, ancillary::market, ancillary::service_type, ancillary::price))
    .load::<(String, NaiveDateTime, String, String, Option<f64>)>(conn)?;
  Ok(rows.into_iter().map(|(zone_name, ts, market, service_type, price)| AncillaryRecord { ts, zone_name, market, service_type, price }).collect())
}

pub async fn constraints(State(state): State<AppState>, Query(raw): Query<QueryParams>) -> Result<Json<Vec<ConstraintRecord>>, ApiResponseError> {
  use grid_store::schema::constraint;

  let validated = parse_query(&raw)?;
  let rows = state
    .store
    .run(move |conn| {
      let mut query = constraint::table.into_boxed();
      if let Some(start) = validated.range.start {
        query = query.filter(constraint::ts.ge(start));
      }
      if let Some(end) = validated.range.end {
        query = query.filter(constraint::ts.le(end));
      }
      let rows = query
        .order(constraint::ts.desc())
        .limit(validated.limit as i64)
        .select((constraint::ts, constraint::market, constraint::constraint_name, constraint::shadow_price, constraint::binding, constraint::limit_mw, constraint::flow_mw))
        .load::<(NaiveDateTime, String, String, Option<f64>, Option<bool>, Option<f64>, Option<f64>)>(conn)?;
      Ok::<_, grid_store::StoreError>(
        rows
          .into_iter()
          .map(|(ts, market, constraint_name, shadow_price, binding, limit_mw, flow_mw)| ConstraintRecord { ts, market, constraint_name, shadow_price, binding, limit_mw, flow_mw })
          .collect(),
      )
    })
    .await?;
  Ok(Json(rows))
}

pub async fn external_rto_prices(State(state): State<AppState>, Query(raw): Query<QueryParams>) -> Result<Json<Vec<ExternalRtoPriceRecord>>, ApiResponseError> {
  use grid_store::schema::external_rto_price;

  let validated = parse_query(&raw)?;
  let rows = state
    .store
    .run(move |conn| {
      let mut query = external_rto_price::table.into_boxed();
      if let Some(start) = validated.range.start {
        query = query.filter(external_rto_price::ts.ge(start));
      }
      if let Some(end) = validated.range.end {
        query = query.filter(external_rto_price::ts.le(end));
      }
      if let Some(rto) = &validated.rto_name {
        query = query.filter(external_rto_price::rto.eq(rto.clone()));
      }
      let rows = query
        .order(external_rto_price::ts.desc())
        .limit(validated.limit as i64)
        .select((external_rto_price::ts, external_rto_price::rto, external_rto_price::rtc_price, external_rto_price::cts_price, external_rto_price::price_diff))
        .load::<(NaiveDateTime, String, Option<f64>, Option<f64>, Option<f64>)>(conn)?;
      Ok::<_, grid_store::StoreError>(
        rows.into_iter().map(|(ts, rto, rtc_price, cts_price, price_diff)| ExternalRtoPriceRecord { ts, rto, rtc_price, cts_price, price_diff }).collect(),
      )
    })
    .await?;
  Ok(Json(rows))
}

pub async fn atc_ttc(State(state): State<AppState>, Query(raw): Query<QueryParams>) -> Result<Json<Vec<AtcTtcRecord>>, ApiResponseError> {
  use grid_store::schema::{atc_ttc, interfaces};

  let validated = parse_query(&raw)?;
  let rows = state
    .store
    .run(move |conn| {
      let mut query = atc_ttc::table.inner_join(interfaces::table.on(atc_ttc::interface_id.eq(interfaces::id))).into_boxed();
      if let Some(start) = validated.range.start {
        query = query.filter(atc_ttc::ts.ge(start));
      }
      if let Some(end) = validated.range.end {
        query = query.filter(atc_ttc::ts.le(end));
      }
      if let Some(name) = &validated.interface_name {
        query = query.filter(interfaces::name.eq(grid_core::canonical_name(name)));
      }
      let rows = query
        .order(atc_ttc::ts.desc())
        .limit(validated.limit as i64)
        .select((interfaces::name, atc_ttc::ts, atc_ttc::forecast_type, atc_ttc::atc_mw, atc_ttc::ttc_mw, atc_ttc::trm_mw, atc_ttc::direction))
        .load::<(String, NaiveDateTime, String, Option<f64>, Option<f64>, Option<f64>, String)>(conn)?;
      Ok::<_, grid_store::StoreError>(
        rows
          .into_iter()
          .map(|(interface_name, ts, forecast_type, atc_mw, ttc_mw, trm_mw, direction)| AtcTtcRecord { ts, interface_name, forecast_type, atc_mw, ttc_mw, trm_mw, direction })
          .collect(),
      )
    })
    .await?;
  Ok(Json(rows))
}

pub async fn outages(State(state): State<AppState>, Query(raw): Query<QueryParams>) -> Result<Json<Vec<OutageRecord>>, ApiResponseError> {
  use grid_store::schema::outage;

  let validated = parse_query(&raw)?;
  let rows = state
    .store
    .run(move |conn| {
      let mut query = outage::table.into_boxed();
      if let Some(start) = validated.range.start {
        query = query.filter(outage::ts.ge(start));
      }
      if let Some(end) = validated.range.end {
        query = query.filter(outage::ts.le(end));
      }
      if let Some(outage_type) = &validated.outage_type {
        query = query.filter(outage::outage_type.eq(outage_type.clone()));
      }
      let rows = query
        .order(outage::ts.desc())
        .limit(validated.limit as i64)
        .select((
          outage::ts,
          outage::outage_type,
          outage::market,
          outage::resource_name,
          outage::resource_type,
          outage::mw_capacity,
          outage::mw_outage,
          outage::start_t,
          outage::end_t,
          outage::status,
        ))
        .load::<(NaiveDateTime, String, String, String, Option<String>, Option<f64>, Option<f64>, Option<NaiveDateTime>, Option<NaiveDateTime>, Option<String>)>(conn)?;
      Ok::<_, grid_store::StoreError>(
        rows
          .into_iter()
          .map(|(ts, outage_type, market, resource_name, resource_type, mw_capacity, mw_outage, start_t, end_t, status)| OutageRecord {
            ts,
            outage_type,
            market,
            resource_name,
            resource_type,
            mw_capacity,
            mw_outage,
            start_t,
            end_t,
            status,
          })
          .collect(),
      )
    })
    .await?;
  Ok(Json(rows))
}

pub async fn weather(State(state): State<AppState>, Query(raw): Query<QueryParams>) -> Result<Json<Vec<WeatherRecord>>, ApiResponseError> {
  use grid_store::schema::weather;

  let validated = parse_query(&raw)?;
  let rows = state
    .store
    .run(move |conn| {
      let mut query = weather::table.into_boxed();
      if let Some(start) = validated.range.start {
        query = query.filter(weather::ts.ge(start));
      }
      if let Some(end) = validated.range.end {
        query = query.filter(weather::ts.le(end));
      }
      let rows = query
        .order(weather::ts.desc())
        .limit(validated.limit as i64)
        .select((weather::ts, weather::forecast_ts, weather::location, weather::temp_f, weather::humidity, weather::wind_mph, weather::wind_dir, weather::cloud_pct))
        .load::<(NaiveDateTime, NaiveDateTime, String, Option<f64>, Option<f64>, Option<f64>, Option<String>, Option<f64>)>(conn)?;
      Ok::<_, grid_store::StoreError>(
        rows
          .into_iter()
          .map(|(ts, forecast_ts, location, temp_f, humidity, wind_mph, wind_dir, cloud_pct)| WeatherRecord { ts, forecast_ts, location, temp_f, humidity, wind_mph, wind_dir, cloud_pct })
          .collect(),
      )
    })
    .await?;
  Ok(Json(rows))
}

pub async fn fuel_mix(State(state): State<AppState>, Query(raw): Query<QueryParams>) -> Result<Json<Vec<FuelMixRecord>>, ApiResponseError> {
  use grid_store::schema::fuel_mix;

  let validated = parse_query(&raw)?;
  let rows = state
    .store
    .run(move |conn| {
      let mut query = fuel_mix::table.into_boxed();
      if let Some(start) = validated.range.start {
        query = query.filter(fuel_mix::ts.ge(start));
      }
      if let Some(end) = validated.range.end {
        query = query.filter(fuel_mix::ts.le(end));
      }
      if let Some(fuel_type) = &validated.fuel_type {
        query = query.filter(fuel_mix::fuel_type.eq(fuel_type.clone()));
      }
      let rows = query
        .order(fuel_mix::ts.desc())
        .limit(validated.limit as i64)
        .select((fuel_mix::ts, fuel_mix::fuel_type, fuel_mix::generation_mw, fuel_mix::pct))
        .load::<(NaiveDateTime, String, Option<f64>, Option<f64>)>(conn)?;
      Ok::<_, grid_store::StoreError>(rows.into_iter().map(|(ts, fuel_type, generation_mw, pct)| FuelMixRecord { ts, fuel_type, generation_mw, pct }).collect())
    })
    .await?;
  Ok(Json(rows))
}

pub async fn advisories(State(state): State<AppState>, Query(raw): Query<QueryParams>) -> Result<Json<Vec<AdvisoryRecord>>, ApiResponseError> {
  use grid_store::schema::advisory;

  let validated = parse_query(&raw)?;
  let rows = state
    .store
    .run(move |conn| {
      let mut query = advisory::table.into_boxed();
      if let Some(start) = validated.range.start {
        query = query.filter(advisory::ts.ge(start));
      }
      if let Some(end) = validated.range.end {
        query = query.filter(advisory::ts.le(end));
      }
      let rows = query
        .order(advisory::ts.desc())
        .limit(validated.limit as i64)
        .select((advisory::ts, advisory::advisory_type, advisory::title, advisory::message, advisory::severity))
        .load::<(NaiveDateTime, String, String, Option<String>, Option<String>)>(conn)?;
      Ok::<_, grid_store::StoreError>(rows.into_iter().map(|(ts, advisory_type, title, message, severity)| AdvisoryRecord { ts, advisory_type, title, message, severity }).collect())
    })
    .await?;
  Ok(Json(rows))
}
