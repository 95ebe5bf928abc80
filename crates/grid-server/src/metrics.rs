use axum::extract::{Query, State};
use axum::response::Json;
use grid_api::{paginate, parse_query, ApiError, QueryParams};

use crate::error::ApiResponseError;
use crate::state::AppState;

/// `GET /rt-da-spreads` (§4.9).
pub async fn rt_da_spreads(State(state): State<AppState>, Query(raw): Query<QueryParams>) -> Result<Json<Vec<grid_metrics::RtDaSpreadRow>>, ApiResponseError> {
  let q = parse_query(&raw)?;
  let rows = state.metrics.rt_da_spread(q.range, q.zones, q.min_spread).await.map_err(to_api_error)?;
  Ok(Json(paginate(rows, q.limit, |r| r.ts)))
}

/// `GET /zone-spreads` (§4.9).
pub async fn zone_spreads(State(state): State<AppState>, Query(raw): Query<QueryParams>) -> Result<Json<Vec<grid_metrics::ZoneSpreadRow>>, ApiResponseError> {
  let q = parse_query(&raw)?;
  let rows = state.metrics.zone_spread(q.range, q.zones).await.map_err(to_api_error)?;
  Ok(Json(paginate(rows, q.limit, |r| r.ts)))
}

/// `GET /reserve-margin` (§4.9).
pub async fn reserve_margin(State(state): State<AppState>, Query(raw): Query<QueryParams>) -> Result<Json<Vec<grid_metrics::ReserveMarginRow>>, ApiResponseError> {
  let q = parse_query(&raw)?;
  let rows = state.metrics.reserve_margin(q.range).await.map_err(to_api_error)?;
  Ok(Json(paginate(rows, q.limit, |r| r.ts)))
}

/// `GET /load-forecast-error` (§4.9).
pub async fn load_forecast_error(State(state): State<AppState>, Query(raw): Query<QueryParams>) -> Result<Json<Vec<grid_metrics::LoadForecastErrorRow>>, ApiResponseError> {
  let q = parse_query(&raw)?;
  let rows = state.metrics.load_forecast_error(q.range, q.zones).await.map_err(to_api_error)?;
  Ok(Json(paginate(rows, q.limit, |r| r.hour)))
}

/// `GET /price-volatility` (§4.9).
pub async fn price_volatility(State(state): State<AppState>, Query(raw): Query<QueryParams>) -> Result<Json<Vec<grid_metrics::PriceVolatilityRow>>, ApiResponseError> {
  let q = parse_query(&raw)?;
  let rows = state.metrics.price_volatility(q.range, q.zones, q.window_hours).await.map_err(to_api_error)?;
  Ok(Json(paginate(rows, q.limit, |r| r.ts)))
}

/// `GET /correlation?zones=A,B` (§4.9). Requires at least two zones; there is
/// nothing to correlate otherwise. Pairs have no timestamp to order
/// newest-first by, so the already zone-ordered result from
/// [`grid_metrics::MetricsEngine::correlation`] is kept as-is and just
/// truncated to `limit`, rather than resorted by an unrelated field.
pub async fn correlation(State(state): State<AppState>, Query(raw): Query<QueryParams>) -> Result<Json<Vec<grid_metrics::CorrelationRow>>, ApiResponseError> {
  let q = parse_query(&raw)?;
  let zones = q.zones.ok_or_else(|| ApiError::Malformed("correlation requires a zones parameter".to_string()))?;
  if zones.len() < 2 {
    return Err(ApiError::Malformed("correlation requires at least two zones".to_string()).into());
  }
  let mut rows = state.metrics.correlation(q.range, zones).await.map_err(to_api_error)?;
  rows.truncate(q.limit);
  Ok(Json(rows))
}

/// `GET /trading-signals[?signal_type=...]` (§4.9, §8 scenario 6).
pub async fn trading_signals(State(state): State<AppState>, Query(raw): Query<QueryParams>) -> Result<Json<Vec<grid_metrics::TradingSignal>>, ApiResponseError> {
  let q = parse_query(&raw)?;
  let mut rows = state.metrics.trading_signals(q.window_hours).await.map_err(to_api_error)?;
  if let Some(rule) = &q.signal_type {
    rows.retain(|r| r.rule == rule);
  }
  Ok(Json(paginate(rows, q.limit, |r| r.ts)))
}

/// `GET /external-interfaces` (§4.10).
pub async fn external_interfaces(State(state): State<AppState>, Query(_raw): Query<QueryParams>) -> Result<Json<Vec<grid_metrics::ExternalInterfaceRow>>, ApiResponseError> {
  let rows = state.metrics.external_interfaces().await.map_err(to_api_error)?;
  Ok(Json(rows))
}

fn to_api_error(err: grid_metrics::MetricsError) -> ApiResponseError {
  ApiResponseError(ApiError::Metrics(err))
}
