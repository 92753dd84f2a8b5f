//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{Band, BatchSpec, Language, Level};
use crate::provider::ProviderKind;
use crate::quiz::session::SessionHistory;

/// Largest batch a single request may ask for.
pub const MAX_COUNT: usize = 20;

/// Body of `POST /generate-questions`.
///
/// Fields are kept loose (`Value`) so that `validate` can report missing or
/// non-numeric input as a 400 with a readable message, and accept numbers sent
/// as strings.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateQuestionsIn {
    #[serde(default)]
    pub language: Option<Value>,
    #[serde(default)]
    pub level: Option<Value>,
    #[serde(default)]
    pub band: Option<Value>,
    #[serde(default)]
    pub count: Option<Value>,
}

impl GenerateQuestionsIn {
    /// Check presence and types, then clamp band to 1..=5 and count to 1..=MAX_COUNT.
    pub fn validate(&self) -> Result<BatchSpec, String> {
        let missing: Vec<&str> = [
            ("language", &self.language),
            ("level", &self.level),
            ("band", &self.band),
            ("count", &self.count),
        ]
        .iter()
        .filter(|(_, v)| is_missing(v))
        .map(|(k, _)| *k)
        .collect();
        if !missing.is_empty() {
            return Err(format!("Missing required field(s): {}", missing.join(", ")));
        }

        let language: Language = text_field(&self.language, "language")?.parse()?;
        let level: Level = text_field(&self.level, "level")?.parse()?;
        let band = Band::clamped(numeric_field(&self.band, "band")?);
        let count = numeric_field(&self.count, "count")?.clamp(1, MAX_COUNT as i64) as usize;
        Ok(BatchSpec { language, level, band, count })
    }
}

fn is_missing(v: &Option<Value>) -> bool {
    match v {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

fn text_field<'a>(v: &'a Option<Value>, name: &str) -> Result<&'a str, String> {
    v.as_ref()
        .and_then(Value::as_str)
        .ok_or_else(|| format!("{} must be a string", name))
}

/// Accepts JSON integers, integral floats and numeric strings.
fn numeric_field(v: &Option<Value>, name: &str) -> Result<i64, String> {
    let parsed = match v {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| format!("{} must be a number", name))
}

pub const PROVIDER_HEADER: &str = "x-question-provider";

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthOut {
    pub ok: bool,
    pub mode: String,
    pub providers: Vec<ProviderKind>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LanguageOut {
    pub name: String,
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogOut {
    pub languages: Vec<LanguageOut>,
    pub levels: Vec<String>,
    pub bands: Vec<u8>,
    pub default_count: usize,
    pub max_count: usize,
}

/// Body of `POST /report`.
#[derive(Debug, Deserialize)]
pub struct ReportIn {
    #[serde(default)]
    pub learner: String,
    pub history: SessionHistory,
}
