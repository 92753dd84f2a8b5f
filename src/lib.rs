//! Polyglot Quiz · LLM-backed language quiz generator.
//!
//! The server side turns a `(language, level, band, count)` request into a
//! prompt, asks the configured LLM vendor for a JSON batch and sanitizes the
//! reply into strict `Question` records. The learner side (`quiz`) is a state
//! machine that walks welcome → language → level → band → quiz → report and
//! keeps the session history the report exporter renders.

pub mod config;
pub mod domain;
pub mod error;
pub mod prompt;
pub mod protocol;
pub mod provider;
pub mod quiz;
pub mod report;
pub mod routes;
pub mod sanitize;
pub mod service;
pub mod state;
pub mod telemetry;
pub mod util;

pub use routes::build_router;
pub use state::AppState;
