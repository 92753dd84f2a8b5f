//! LLM vendor clients.
//!
//! One `ProviderClient` talks to one vendor with one fixed model. Gemini uses
//! the `generateContent` payload with a query-string key; Groq, OpenAI and
//! Perplexity share the chat-completions shape with a bearer token.
//!
//! Calls are instrumented and log vendor, model, attempt, latency and response
//! size (never the key or the content).

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::domain::Question;
use crate::sanitize::{sanitize, SanitizeError};
use crate::util::trunc_for_log;

const CLIENT_UA: &str = "polyglot-quiz/0.1";
const SYSTEM_MESSAGE: &str = "You generate language-learning quiz content. Reply with a raw JSON array only.";
const TEMPERATURE: f32 = 0.8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
  #[serde(rename = "gemini")]
  Gemini,
  #[serde(rename = "groq")]
  Groq,
  #[serde(rename = "openai")]
  OpenAi,
  #[serde(rename = "perplexity")]
  Perplexity,
}

impl ProviderKind {
  /// Default priority order.
  pub const ALL: [ProviderKind; 4] = [ProviderKind::Gemini, ProviderKind::Groq, ProviderKind::OpenAi, ProviderKind::Perplexity];

  pub fn name(self) -> &'static str {
    match self {
      ProviderKind::Gemini => "gemini",
      ProviderKind::Groq => "groq",
      ProviderKind::OpenAi => "openai",
      ProviderKind::Perplexity => "perplexity",
    }
  }

  pub fn env_prefix(self) -> &'static str {
    match self {
      ProviderKind::Gemini => "GEMINI",
      ProviderKind::Groq => "GROQ",
      ProviderKind::OpenAi => "OPENAI",
      ProviderKind::Perplexity => "PERPLEXITY",
    }
  }

  pub fn default_model(self) -> &'static str {
    match self {
      ProviderKind::Gemini => "gemini-1.5-flash",
      ProviderKind::Groq => "llama-3.3-70b-versatile",
      ProviderKind::OpenAi => "gpt-4o-mini",
      ProviderKind::Perplexity => "sonar",
    }
  }

  pub fn default_base_url(self) -> &'static str {
    match self {
      ProviderKind::Gemini => "https://generativelanguage.googleapis.com/v1beta",
      ProviderKind::Groq => "https://api.groq.com/openai/v1",
      ProviderKind::OpenAi => "https://api.openai.com/v1",
      ProviderKind::Perplexity => "https://api.perplexity.ai",
    }
  }
}

impl fmt::Display for ProviderKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

impl FromStr for ProviderKind {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let needle = s.trim();
    ProviderKind::ALL
      .iter()
      .copied()
      .find(|k| k.name().eq_ignore_ascii_case(needle))
      .ok_or_else(|| format!("unknown provider '{}'", needle))
  }
}

/// Credentials and endpoint for one vendor.
#[derive(Clone)]
pub struct ProviderSettings {
  pub kind: ProviderKind,
  pub api_key: String,
  pub model: String,
  pub base_url: String,
}

// Keep the key out of Debug output (config is logged at start-up).
impl fmt::Debug for ProviderSettings {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ProviderSettings")
      .field("kind", &self.kind)
      .field("model", &self.model)
      .field("base_url", &self.base_url)
      .finish_non_exhaustive()
  }
}

/// Retry budgets. HTTP retries and parse retries are counted separately.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Extra attempts after an HTTP 429/503.
  pub max_http_retries: u32,
  /// Fixed wait between HTTP attempts.
  pub delay: Duration,
  /// Extra full attempts after the model returned malformed JSON.
  pub max_parse_retries: u32,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self { max_http_retries: 2, delay: Duration::from_secs(2), max_parse_retries: 1 }
  }
}

impl RetryPolicy {
  pub fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE
  }
}

#[derive(Debug, Error)]
pub enum ProviderError {
  #[error("{provider}: missing API credential (set {provider_env}_API_KEY)", provider_env = .provider.env_prefix())]
  MissingCredential { provider: ProviderKind },
  #[error("{provider} returned HTTP {status}: {message}")]
  Http { provider: ProviderKind, status: u16, message: String },
  #[error("{provider} request failed: {source}")]
  Transport {
    provider: ProviderKind,
    #[source]
    source: reqwest::Error,
  },
  #[error("{provider} returned an unexpected payload: {message}")]
  Payload { provider: ProviderKind, message: String },
  #[error("{provider} returned an empty completion")]
  EmptyModelOutput { provider: ProviderKind },
  #[error("{provider}: {source}")]
  Sanitize {
    provider: ProviderKind,
    #[source]
    source: SanitizeError,
  },
}

#[derive(Clone)]
pub struct ProviderClient {
  http: reqwest::Client,
  settings: ProviderSettings,
  retry: RetryPolicy,
}

impl fmt::Debug for ProviderClient {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ProviderClient").field("settings", &self.settings).field("retry", &self.retry).finish()
  }
}

impl ProviderClient {
  pub fn new(settings: ProviderSettings, retry: RetryPolicy, timeout: Duration) -> Result<Self, ProviderError> {
    if settings.api_key.trim().is_empty() {
      return Err(ProviderError::MissingCredential { provider: settings.kind });
    }
    let http = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|source| ProviderError::Transport { provider: settings.kind, source })?;
    Ok(Self { http, settings, retry })
  }

  pub fn kind(&self) -> ProviderKind { self.settings.kind }

  pub fn model(&self) -> &str { &self.settings.model }

  /// Fetch a batch and sanitize it. A `MalformedJson` result earns extra full
  /// attempts (`max_parse_retries`), independent of the HTTP retry budget.
  #[instrument(level = "info", skip(self, instruction), fields(provider = %self.settings.kind, model = %self.settings.model))]
  pub async fn generate_questions(&self, instruction: &str, count: usize) -> Result<Vec<Question>, ProviderError> {
    let mut parse_attempt = 0u32;
    loop {
      let text = self.complete(instruction).await?;
      match sanitize(&text, count) {
        Ok(questions) => {
          info!(target: "quiz", provider = %self.settings.kind, served = questions.len(), requested = count, "Sanitized model output");
          return Ok(questions);
        }
        Err(e) if e.is_malformed_json() && parse_attempt < self.retry.max_parse_retries => {
          parse_attempt += 1;
          warn!(target: "quiz", provider = %self.settings.kind, parse_attempt, error = %e, "Malformed JSON from model; retrying");
        }
        Err(source) => return Err(ProviderError::Sanitize { provider: self.settings.kind, source }),
      }
    }
  }

  /// Raw completion text. Retries 429/503 up to `max_http_retries` extra times
  /// with a fixed delay; every other failure is returned immediately.
  #[instrument(level = "info", skip(self, instruction), fields(provider = %self.settings.kind, prompt_len = instruction.len()))]
  pub async fn complete(&self, instruction: &str) -> Result<String, ProviderError> {
    let provider = self.settings.kind;
    let mut attempt = 0u32;
    loop {
      attempt += 1;
      let start = Instant::now();
      let res = self
        .request(instruction)
        .send()
        .await
        .map_err(|source| ProviderError::Transport { provider, source })?;
      let status = res.status();
      let elapsed = start.elapsed();

      if status.is_success() {
        let text = self.extract_text(res).await?;
        info!(target: "quiz", %provider, attempt, ?elapsed, response_len = text.len(), "Model response received");
        if text.trim().is_empty() {
          return Err(ProviderError::EmptyModelOutput { provider });
        }
        return Ok(text);
      }

      let body = res.text().await.unwrap_or_default();
      let message = extract_error_message(&body).unwrap_or_else(|| trunc_for_log(&body, 200));
      if RetryPolicy::is_retryable(status) && attempt <= self.retry.max_http_retries {
        warn!(target: "quiz", %provider, attempt, status = status.as_u16(), ?elapsed, delay = ?self.retry.delay, "Transient provider error; retrying");
        tokio::time::sleep(self.retry.delay).await;
        continue;
      }
      return Err(ProviderError::Http { provider, status: status.as_u16(), message });
    }
  }

  fn request(&self, instruction: &str) -> reqwest::RequestBuilder {
    let s = &self.settings;
    let base = s.base_url.trim_end_matches('/');
    match s.kind {
      ProviderKind::Gemini => {
        let body = GeminiRequest {
          contents: vec![GeminiContent { role: Some("user".into()), parts: vec![GeminiPart { text: Some(instruction.to_string()) }] }],
          generation_config: GeminiGenerationConfig { temperature: TEMPERATURE },
        };
        self.http
          .post(format!("{}/models/{}:generateContent", base, s.model))
          .query(&[("key", s.api_key.as_str())])
          .header(USER_AGENT, CLIENT_UA)
          .header(CONTENT_TYPE, "application/json")
          .json(&body)
      }
      ProviderKind::Groq | ProviderKind::OpenAi | ProviderKind::Perplexity => {
        let body = ChatCompletionRequest {
          model: s.model.clone(),
          messages: vec![
            ChatMessageReq { role: "system".into(), content: SYSTEM_MESSAGE.into() },
            ChatMessageReq { role: "user".into(), content: instruction.into() },
          ],
          temperature: TEMPERATURE,
        };
        self.http
          .post(format!("{}/chat/completions", base))
          .bearer_auth(&s.api_key)
          .header(USER_AGENT, CLIENT_UA)
          .header(CONTENT_TYPE, "application/json")
          .json(&body)
      }
    }
  }

  async fn extract_text(&self, res: reqwest::Response) -> Result<String, ProviderError> {
    let provider = self.settings.kind;
    let payload = |e: reqwest::Error| ProviderError::Payload { provider, message: e.to_string() };
    match provider {
      ProviderKind::Gemini => {
        let body: GeminiResponse = res.json().await.map_err(payload)?;
        Ok(body
          .candidates
          .into_iter()
          .next()
          .and_then(|c| c.content)
          .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
          .unwrap_or_default())
      }
      _ => {
        let body: ChatCompletionResponse = res.json().await.map_err(payload)?;
        if let Some(usage) = &body.usage {
          info!(target: "quiz", %provider, prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "Provider usage");
        }
        Ok(body.choices.into_iter().next().and_then(|c| c.message.content).unwrap_or_default())
      }
    }
  }
}

// --- Chat-completions DTOs (Groq / OpenAI / Perplexity) ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  #[serde(default)] choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

// --- Gemini DTOs ---

#[derive(Serialize)]
struct GeminiRequest {
  contents: Vec<GeminiContent>,
  #[serde(rename = "generationConfig")]
  generation_config: GeminiGenerationConfig,
}
#[derive(Serialize, Deserialize)]
struct GeminiContent {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  role: Option<String>,
  #[serde(default)]
  parts: Vec<GeminiPart>,
}
#[derive(Serialize, Deserialize)]
struct GeminiPart {
  #[serde(default)]
  text: Option<String>,
}
#[derive(Serialize)]
struct GeminiGenerationConfig { temperature: f32 }

#[derive(Deserialize)]
struct GeminiResponse {
  #[serde(default)] candidates: Vec<GeminiCandidate>,
}
#[derive(Deserialize)]
struct GeminiCandidate {
  #[serde(default)] content: Option<GeminiContent>,
}

/// Both vendor families report errors as `{"error": {"message": ...}}`.
fn extract_error_message(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
