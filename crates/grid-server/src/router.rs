use axum::routing::get;
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{families, health, metrics};

/// Builds the full route table (§3 families plus §4.9/§4.10 computed
/// metrics) and attaches the CORS policy derived from `ALLOWED_ORIGINS`
/// (§6: empty means same-origin only, i.e. no `Access-Control-Allow-Origin`
/// header is ever added).
pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
  let cors = cors_layer(allowed_origins);

  Router::new()
    .route("/health", get(health::health))
    .route("/realtime-lbmp", get(families::realtime_lbmp))
    .route("/dayahead-lbmp", get(families::dayahead_lbmp))
    .route("/timeweighted-lbmp", get(families::timeweighted_lbmp))
    .route("/realtime-load", get(families::realtime_load))
    .route("/load-forecast", get(families::load_forecast))
    .route("/interface-flows", get(families::interface_flows))
    .route("/ancillary-services", get(families::ancillary_services))
    .route("/constraints", get(families::constraints))
    .route("/external-rto-prices", get(families::external_rto_prices))
    .route("/atc-ttc", get(families::atc_ttc))
    .route("/outages", get(families::outages))
    .route("/weather", get(families::weather))
    .route("/fuel-mix", get(families::fuel_mix))
    .route("/advisories", get(families::advisories))
    .route("/rt-da-spreads", get(metrics::rt_da_spreads))
    .route("/zone-spreads", get(metrics::zone_spreads))
    .route("/reserve-margin", get(metrics::reserve_margin))
    .route("/load-forecast-error", get(metrics::load_forecast_error))
    .route("/price-volatility", get(metrics::price_volatility))
    .route("/correlation", get(metrics::correlation))
    .route("/trading-signals", get(metrics::trading_signals))
    .route("/external-interfaces", get(metrics::external_interfaces))
    .layer(cors)
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// No configured origins means same-origin only: `CorsLayer::new()` with no
/// `allow_origin` call never attaches the header. A non-empty list is
/// echoed back verbatim via `AllowOrigin::list` rather than
/// `Any`/`mirror_request`, since §6 names specific allowed origins, not a
/// wildcard policy.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
  if allowed_origins.is_empty() {
    return CorsLayer::new();
  }

  let origins: Vec<_> = allowed_origins.iter().filter_map(|o| o.parse().ok()).collect();
  CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods([axum::http::Method::GET])
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_allowed_origins_yields_same_origin_policy() {
    // No panics, no configured allow-list: the router still builds.
    let _ = cors_layer(&[]);
  }

  #[test]
  fn configured_origins_parse_into_an_allow_list() {
    let origins = vec!["https://dashboard.example".to_string()];
    let _ = cors_layer(&origins);
  }
}
