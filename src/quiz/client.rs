//! HTTP driver for `QuizMachine`: performs the fetches the machine asks for.

use std::time::Duration;

use reqwest::header::USER_AGENT;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::domain::{BatchSpec, Question};
use crate::quiz::machine::{Action, Effect, FetchRequest, QuizMachine, TransitionError};

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Error)]
pub enum FetchError {
  #[error("request timed out after {0:?}")]
  Timeout(Duration),
  #[error("server returned HTTP {status}: {message}")]
  Server { status: u16, message: String },
  #[error("network error: {0}")]
  Network(#[from] reqwest::Error),
}

#[derive(Deserialize)]
struct ErrorBody {
  error: String,
}

#[derive(Clone, Debug)]
pub struct QuizClient {
  http: reqwest::Client,
  base_url: String,
  timeout: Duration,
}

impl QuizClient {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self::with_timeout(base_url, FETCH_TIMEOUT)
  }

  pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
    Self { http: reqwest::Client::new(), base_url: base_url.into(), timeout }
  }

  /// POST the batch spec to `/generate-questions`. The whole exchange is
  /// abandoned once the timeout elapses.
  #[instrument(level = "debug", skip(self), fields(language = %spec.language, level = %spec.level, band = %spec.band))]
  pub async fn fetch_questions(&self, spec: &BatchSpec) -> Result<Vec<Question>, FetchError> {
    tokio::time::timeout(self.timeout, self.exchange(spec)).await.map_err(|_| FetchError::Timeout(self.timeout))?
  }

  async fn exchange(&self, spec: &BatchSpec) -> Result<Vec<Question>, FetchError> {
    let url = format!("{}/generate-questions", self.base_url.trim_end_matches('/'));
    let res = self.http.post(&url).header(USER_AGENT, "polyglot-quiz-client/0.1").json(spec).send().await?;
    let status = res.status();
    if status.is_success() {
      return Ok(res.json::<Vec<Question>>().await?);
    }
    let body = res.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body).map(|b| b.error).unwrap_or(body);
    Err(FetchError::Server { status: status.as_u16(), message })
  }

  /// Perform one fetch and feed its outcome back into the machine.
  pub async fn run_fetch(&self, machine: &mut QuizMachine, req: FetchRequest) -> Result<(), TransitionError> {
    let outcome = match self.fetch_questions(&req.spec).await {
      Ok(questions) => {
        info!(target: "quiz", request_id = req.request_id, received = questions.len(), "Question batch received");
        Action::QuestionsLoaded { request_id: req.request_id, questions }
      }
      Err(e) => {
        warn!(target: "quiz", request_id = req.request_id, error = %e, "Question batch fetch failed");
        Action::FetchFailed { request_id: req.request_id, reason: e.to_string() }
      }
    };
    machine.apply(outcome).map(|_| ())
  }

  /// Apply a user action and carry out any fetch it triggers.
  pub async fn apply(&self, machine: &mut QuizMachine, action: Action) -> Result<Effect, TransitionError> {
    let effect = machine.apply(action)?;
    if let Effect::Fetch(req) = &effect {
      self.run_fetch(machine, req.clone()).await?;
    }
    Ok(effect)
  }
}
