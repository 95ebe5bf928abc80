use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

/// Maps the read path's internal error taxonomy onto the status codes in §6:
/// `400` malformed parameters, `422` value-range violations, `500` store
/// unavailable, `503` store connected but failing.
pub struct ApiResponseError(pub grid_api::ApiError);

impl From<grid_api::ApiError> for ApiResponseError {
  fn from(err: grid_api::ApiError) -> Self {
    ApiResponseError(err)
  }
}

impl From<grid_store::StoreError> for ApiResponseError {
  fn from(err: grid_store::StoreError) -> Self {
    ApiResponseError(grid_api::ApiError::Metrics(grid_metrics::MetricsError::Store(err)))
  }
}

impl IntoResponse for ApiResponseError {
  fn into_response(self) -> Response {
    let (status, message) = match &self.0 {
      grid_api::ApiError::Malformed(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
      grid_api::ApiError::OutOfRange(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
      grid_api::ApiError::Metrics(grid_metrics::MetricsError::Store(store_err)) => match store_err {
        grid_store::StoreError::PoolError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        other => (StatusCode::SERVICE_UNAVAILABLE, other.to_string()),
      },
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
