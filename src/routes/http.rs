//! HTTP endpoint handlers. These are thin wrappers that forward to the
//! question service and the report exporter. Each handler is instrumented and
//! logs its parameters and basic result info.

use std::sync::Arc;

use axum::{
  extract::{rejection::JsonRejection, State},
  http::{header, HeaderValue},
  response::IntoResponse,
  Json,
};
use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::domain::{Band, Language, Level};
use crate::error::{AppError, Result};
use crate::protocol::*;
use crate::quiz::machine::DEFAULT_BATCH_SIZE;
use crate::report::{export, ReportOptions};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, mode: state.questions.mode().name().to_string(), providers: state.provider_names() })
}

#[instrument(level = "info")]
pub async fn http_catalog() -> impl IntoResponse {
  Json(CatalogOut {
    languages: Language::ALL.iter().map(|l| LanguageOut { name: l.name().into(), code: l.code().into() }).collect(),
    levels: Level::ALL.iter().map(|l| l.name().to_string()).collect(),
    bands: Band::all().map(u8::from).collect(),
    default_count: DEFAULT_BATCH_SIZE,
    max_count: MAX_COUNT,
  })
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_generate_questions(
  State(state): State<Arc<AppState>>,
  body: std::result::Result<Json<GenerateQuestionsIn>, JsonRejection>,
) -> Result<impl IntoResponse> {
  let Json(body) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
  let spec = body.validate().map_err(|msg| {
    warn!(target: "quiz", error = %msg, "Rejected question request");
    AppError::BadRequest(msg)
  })?;

  let generated = state.questions.generate(&spec).await?;
  info!(target: "quiz", language = %spec.language, level = %spec.level, band = %spec.band, provider = %generated.provider, served = generated.questions.len(), "HTTP questions served");
  Ok((
    [(PROVIDER_HEADER, HeaderValue::from_static(generated.provider.name()))],
    Json(generated.questions),
  ))
}

#[instrument(level = "info", skip(body), fields(bands = body.history.len()))]
pub async fn http_post_report(Json(body): Json<ReportIn>) -> Result<impl IntoResponse> {
  let doc = export(&body.history, &body.learner, Utc::now(), ReportOptions::default())?;
  info!(target: "quiz", id = %doc.id, pages = doc.page_count(), filename = %doc.filename, "Report exported");
  let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", doc.filename))
    .map_err(|e| AppError::BadRequest(e.to_string()))?;
  Ok((
    [
      (header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8")),
      (header::CONTENT_DISPOSITION, disposition),
    ],
    doc.render_text(),
  ))
}
