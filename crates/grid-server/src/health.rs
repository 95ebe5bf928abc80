use axum::extract::State;
use axum::response::Json;
use serde_json::json;

use crate::state::AppState;

/// `GET /health` (§6): `{status, database}`. Never errors; a failed ping is
/// reported in the body, not as a non-2xx status, so load balancers keep
/// routing health checks through a degraded instance's own diagnosis.
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
  let database = match state.store.get_connection() {
    Ok(_) => "connected",
    Err(_) => "unreachable",
  };
  Json(json!({ "status": "ok", "database": database }))
}
