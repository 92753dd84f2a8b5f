//! Service configuration, resolved once at start-up.
//!
//! Sources, lowest to highest precedence:
//!   1. built-in defaults
//!   2. optional TOML file at `QUIZ_CONFIG_PATH` (`[prompts]` + `[providers]`)
//!   3. environment variables (a `.env` file is loaded first if present)
//!
//! The resolved `AppConfig` is handed to `QuestionService::new`; nothing else
//! reads provider credentials from the environment.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::provider::{ProviderKind, ProviderSettings, RetryPolicy};

/// How providers are used when more than one is configured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
  /// Only the highest-priority configured provider is queried.
  #[default]
  Single,
  /// Every configured provider in priority order; first success wins.
  Fallback,
}

impl SelectionMode {
  pub fn name(self) -> &'static str {
    match self {
      SelectionMode::Single => "single",
      SelectionMode::Fallback => "fallback",
    }
  }
}

impl std::str::FromStr for SelectionMode {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "single" => Ok(SelectionMode::Single),
      "fallback" | "multi" => Ok(SelectionMode::Fallback),
      other => Err(format!("unknown provider mode '{}'", other)),
    }
  }
}

/// TOML file schema.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct FileConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub providers: ProvidersCfg,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ProvidersCfg {
  #[serde(default)] pub order: Option<Vec<ProviderKind>>,
  #[serde(default)] pub mode: Option<SelectionMode>,
  #[serde(default)] pub retry_delay_ms: Option<u64>,
  #[serde(default)] pub request_timeout_secs: Option<u64>,
}

/// Prompt fragments that can be tuned without a rebuild.
/// `{language}` and `{count}` placeholders are filled by the prompt builder.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub role: String,
  pub output_contract: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      role: "You are an expert {language} language teacher writing quiz questions for English-speaking learners.".into(),
      output_contract: concat!(
        "Return EXACTLY {count} questions as a JSON array and NOTHING else.\n",
        "Each element MUST be an object with exactly these keys:\n",
        "  \"question\": string,\n",
        "  \"answer\": string (the single correct answer),\n",
        "  \"options\": array of strings (required for \"multiple-choice\" and \"fill-in-the-blanks\", must contain the answer; use [] for \"type-answer\"),\n",
        "  \"direction\": one of \"en-to-target\", \"target-to-en\", \"target-to-target\",\n",
        "  \"type\": one of \"multiple-choice\", \"type-answer\", \"fill-in-the-blanks\",\n",
        "  \"questionLanguage\": one of \"en\", \"target\",\n",
        "  \"explanation\": string (one short sentence in English).\n",
        "Use \"target-to-target\" only for fill-in-the-blanks items written entirely in {language}.\n",
        "Do NOT wrap the array in markdown code fences. Do NOT add any prose before or after the array."
      )
      .into(),
    }
  }
}

/// Fully-resolved configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
  pub port: u16,
  /// Providers with credentials, in priority order.
  pub providers: Vec<ProviderSettings>,
  /// Providers named in the priority order but lacking a credential.
  pub unconfigured: Vec<ProviderKind>,
  pub mode: SelectionMode,
  pub retry: RetryPolicy,
  pub request_timeout: Duration,
  pub prompts: Prompts,
}

impl AppConfig {
  pub const DEFAULT_PORT: u16 = 3000;
  pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

  /// Resolve from the process environment (plus `.env` and the optional TOML file).
  pub fn from_env() -> Self {
    dotenvy::dotenv().ok();
    let file = load_file_config_from_env();
    Self::resolve(|k| std::env::var(k).ok(), file.unwrap_or_default())
  }

  /// Resolve from an arbitrary variable lookup. Used by `from_env` and tests.
  pub fn resolve<F>(lookup: F, file: FileConfig) -> Self
  where
    F: Fn(&str) -> Option<String>,
  {
    let var = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let port = var("PORT").and_then(|p| p.parse::<u16>().ok()).unwrap_or(Self::DEFAULT_PORT);

    let order = match var("QUIZ_PROVIDER_ORDER") {
      Some(raw) => parse_order(&raw),
      None => file.providers.order.clone().unwrap_or_else(|| ProviderKind::ALL.to_vec()),
    };

    let mode = var("QUIZ_PROVIDER_MODE")
      .and_then(|m| match m.parse::<SelectionMode>() {
        Ok(m) => Some(m),
        Err(e) => {
          warn!(target: "polyglot_quiz", error = %e, "Ignoring QUIZ_PROVIDER_MODE");
          None
        }
      })
      .or(file.providers.mode)
      .unwrap_or_default();

    let mut retry = RetryPolicy::default();
    if let Some(ms) = var("QUIZ_RETRY_DELAY_MS").and_then(|v| v.parse::<u64>().ok()).or(file.providers.retry_delay_ms) {
      retry.delay = Duration::from_millis(ms);
    }

    let request_timeout = Duration::from_secs(
      var("QUIZ_REQUEST_TIMEOUT_SECS")
        .and_then(|v| v.parse::<u64>().ok())
        .or(file.providers.request_timeout_secs)
        .unwrap_or(Self::DEFAULT_TIMEOUT_SECS),
    );

    let mut providers = Vec::new();
    let mut unconfigured = Vec::new();
    for kind in order {
      let prefix = kind.env_prefix();
      match var(&format!("{prefix}_API_KEY")) {
        Some(api_key) => providers.push(ProviderSettings {
          kind,
          api_key,
          model: var(&format!("{prefix}_MODEL")).unwrap_or_else(|| kind.default_model().to_string()),
          base_url: var(&format!("{prefix}_BASE_URL")).unwrap_or_else(|| kind.default_base_url().to_string()),
        }),
        None => unconfigured.push(kind),
      }
    }

    Self { port, providers, unconfigured, mode, retry, request_timeout, prompts: file.prompts }
  }
}

/// Parse a comma-separated provider list, skipping unknown names and duplicates.
fn parse_order(raw: &str) -> Vec<ProviderKind> {
  let mut out = Vec::new();
  for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
    match name.parse::<ProviderKind>() {
      Ok(k) if !out.contains(&k) => out.push(k),
      Ok(_) => {}
      Err(e) => warn!(target: "polyglot_quiz", error = %e, "Ignoring entry in QUIZ_PROVIDER_ORDER"),
    }
  }
  out
}

/// Attempt to load `FileConfig` from QUIZ_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_file_config_from_env() -> Option<FileConfig> {
  let path = std::env::var("QUIZ_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<FileConfig>(&s) {
      Ok(cfg) => {
        info!(target: "polyglot_quiz", %path, "Loaded quiz config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "polyglot_quiz", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "polyglot_quiz", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
