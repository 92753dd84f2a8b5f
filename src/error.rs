use axum::{
  http::StatusCode,
  response::{IntoResponse, Json},
};
use serde_json::json;

use crate::report::ReportError;
use crate::service::ServiceError;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
  #[error("Bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Service(#[from] ServiceError),

  #[error(transparent)]
  Report(#[from] ReportError),
}

impl IntoResponse for AppError {
  fn into_response(self) -> axum::response::Response {
    let (status, body) = match self {
      AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
      AppError::Service(err @ ServiceError::NoProvidersConfigured) => (
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": format!("ConfigurationError: {}", err), "kind": "ConfigurationError" }),
      ),
      AppError::Service(ServiceError::AllProvidersFailed { last_error }) => (
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({
          "error": format!("AllProvidersFailed: {}", last_error),
          "kind": "AllProvidersFailed",
          "hint": "The question generator is unavailable right now. Please retry in a moment or pick another level.",
        }),
      ),
      AppError::Report(err) => (StatusCode::BAD_REQUEST, json!({ "error": err.to_string() })),
    };

    (status, Json(body)).into_response()
  }
}
