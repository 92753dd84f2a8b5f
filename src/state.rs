//! Application state shared by the HTTP handlers.
//!
//! Everything here is resolved once at start-up and immutable afterwards:
//!   - the resolved `AppConfig` (port, provider list, retry policy, prompts)
//!   - the `QuestionService` built from it

use tracing::{error, info, instrument, warn};

use crate::config::AppConfig;
use crate::provider::ProviderKind;
use crate::service::QuestionService;

#[derive(Clone, Debug)]
pub struct AppState {
    pub config: AppConfig,
    pub questions: QuestionService,
}

impl AppState {
    /// Build state from an already resolved configuration and log the provider inventory.
    #[instrument(level = "info", skip_all)]
    pub fn new(config: AppConfig) -> Self {
        let questions = QuestionService::new(&config);
        Self::with_service(config, questions)
    }

    /// Build state around an existing service (tests wire their own clients).
    pub fn with_service(config: AppConfig, questions: QuestionService) -> Self {
        for client in questions.active_providers() {
            info!(target: "polyglot_quiz", provider = %client.kind(), model = %client.model(), "Provider enabled");
        }
        for kind in &config.unconfigured {
            info!(target: "polyglot_quiz", provider = %kind, "Provider disabled (no {}_API_KEY)", kind.env_prefix());
        }
        if questions.active_providers().is_empty() {
            error!(target: "polyglot_quiz", "No LLM provider configured; /generate-questions will answer 500 until a key is set");
        } else if config.mode == crate::config::SelectionMode::Single && config.providers.len() > 1 {
            warn!(target: "polyglot_quiz", extra = config.providers.len() - 1, "Single-provider mode: additional configured providers are ignored");
        }
        Self { config, questions }
    }

    /// Providers `/generate-questions` will try, in order.
    pub fn provider_names(&self) -> Vec<ProviderKind> {
        self.questions.active_providers().iter().map(|c| c.kind()).collect()
    }
}
