//! Question generation: instruction builder -> provider -> sanitizer.
//!
//! Providers are resolved once from `AppConfig` and tried sequentially in
//! priority order. In `Single` mode only the first configured provider is used.

use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::config::{AppConfig, Prompts, SelectionMode};
use crate::domain::{BatchSpec, Question};
use crate::prompt::build_instruction;
use crate::provider::{ProviderClient, ProviderError, ProviderKind};

#[derive(Debug, Error)]
pub enum ServiceError {
  #[error("no LLM provider is configured; set at least one of GEMINI_API_KEY, GROQ_API_KEY, OPENAI_API_KEY or PERPLEXITY_API_KEY")]
  NoProvidersConfigured,
  #[error("all providers failed; last error: {last_error}")]
  AllProvidersFailed { last_error: ProviderError },
}

/// A successful batch and the provider that produced it.
#[derive(Debug, Clone)]
pub struct Generated {
  pub provider: ProviderKind,
  pub questions: Vec<Question>,
}

#[derive(Debug, Clone)]
pub struct QuestionService {
  providers: Vec<ProviderClient>,
  mode: SelectionMode,
  prompts: Prompts,
}

impl QuestionService {
  /// Build one client per configured provider. Clients that cannot be built
  /// are logged and left out.
  pub fn new(config: &AppConfig) -> Self {
    let mut providers = Vec::with_capacity(config.providers.len());
    for settings in &config.providers {
      match ProviderClient::new(settings.clone(), config.retry, config.request_timeout) {
        Ok(client) => providers.push(client),
        Err(e) => error!(target: "polyglot_quiz", provider = %settings.kind, error = %e, "Provider disabled"),
      }
    }
    Self::from_clients(providers, config.mode, config.prompts.clone())
  }

  pub fn from_clients(providers: Vec<ProviderClient>, mode: SelectionMode, prompts: Prompts) -> Self {
    Self { providers, mode, prompts }
  }

  pub fn mode(&self) -> SelectionMode { self.mode }

  /// Providers that `generate` will try, in order.
  pub fn active_providers(&self) -> &[ProviderClient] {
    match self.mode {
      SelectionMode::Single => &self.providers[..self.providers.len().min(1)],
      SelectionMode::Fallback => &self.providers,
    }
  }

  #[instrument(level = "info", skip(self), fields(language = %spec.language, level = %spec.level, band = %spec.band, count = spec.count))]
  pub async fn generate(&self, spec: &BatchSpec) -> Result<Generated, ServiceError> {
    let candidates = self.active_providers();
    if candidates.is_empty() {
      error!(target: "quiz", "Question request with no configured provider");
      return Err(ServiceError::NoProvidersConfigured);
    }

    let instruction = build_instruction(&self.prompts, spec);
    let mut last_error = None;
    for client in candidates {
      match client.generate_questions(&instruction, spec.count).await {
        Ok(questions) => {
          info!(target: "quiz", provider = %client.kind(), served = questions.len(), "Question batch served");
          return Ok(Generated { provider: client.kind(), questions });
        }
        Err(e) => {
          warn!(target: "quiz", provider = %client.kind(), error = %e, "Provider attempt failed");
          last_error = Some(e);
        }
      }
    }

    match last_error {
      Some(last_error) => Err(ServiceError::AllProvidersFailed { last_error }),
      None => Err(ServiceError::NoProvidersConfigured),
    }
  }
}
