//! Turns whatever text a model returned into validated `Question`s.
//!
//! Steps, in order:
//!   1. strip markdown code fences
//!   2. keep the span between the first `[` and the last `]`
//!   3. parse as JSON (must be a non-empty array)
//!   4. coerce each element, skipping unusable ones, until `count` are collected
//!
//! Only the option shuffle is random; everything else is deterministic.

use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;
use thiserror::Error;

use crate::domain::{Direction, Question, QuestionLanguage, QuestionType};
use crate::util::head_chars;

/// How much of an unparseable payload is kept for diagnostics.
pub const SNIPPET_CHARS: usize = 400;

pub const GENERIC_EXPLANATION: &str = "This is the correct translation in this context.";
pub const GENERIC_BLANK_EXPLANATION: &str = "This word correctly completes the sentence in this context.";

#[derive(Debug, Error)]
pub enum SanitizeError {
  #[error("model returned malformed JSON ({source}); text starts with: {snippet}")]
  MalformedJson {
    snippet: String,
    #[source]
    source: serde_json::Error,
  },
  #[error("model output is not a JSON array")]
  NotAnArray,
  #[error("model returned an empty question list")]
  EmptyResponse,
  #[error("model output contained no usable questions")]
  NoUsableQuestions,
}

impl SanitizeError {
  pub fn is_malformed_json(&self) -> bool { matches!(self, SanitizeError::MalformedJson { .. }) }
}

/// Sanitize with the thread-local RNG.
pub fn sanitize(raw: &str, count: usize) -> Result<Vec<Question>, SanitizeError> {
  sanitize_with_rng(raw, count, &mut rand::thread_rng())
}

pub fn sanitize_with_rng<R: Rng + ?Sized>(raw: &str, count: usize, rng: &mut R) -> Result<Vec<Question>, SanitizeError> {
  let unfenced = strip_fences(raw);
  let span = array_span(&unfenced).trim();
  if span.is_empty() {
    return Err(SanitizeError::EmptyResponse);
  }

  let parsed: Value = serde_json::from_str(span)
    .map_err(|source| SanitizeError::MalformedJson { snippet: head_chars(span, SNIPPET_CHARS), source })?;

  let items = parsed.as_array().ok_or(SanitizeError::NotAnArray)?;
  if items.is_empty() {
    return Err(SanitizeError::EmptyResponse);
  }

  let mut out = Vec::with_capacity(count.min(items.len()));
  for item in items {
    if out.len() >= count {
      break;
    }
    if let Some(q) = coerce_question(item, rng) {
      out.push(q);
    }
  }

  if out.is_empty() {
    return Err(SanitizeError::NoUsableQuestions);
  }
  Ok(out)
}

fn strip_fences(raw: &str) -> String {
  raw.replace("```json", "").replace("```JSON", "").replace("```", "")
}

/// From the first `[` to the last `]`, or the whole text if there is no such span.
fn array_span(s: &str) -> &str {
  match (s.find('['), s.rfind(']')) {
    (Some(start), Some(end)) if start < end => &s[start..=end],
    _ => s,
  }
}

fn non_blank_str<'a>(v: &'a Value, key: &str) -> Option<&'a str> {
  v.get(key).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
}

fn coerce_question<R: Rng + ?Sized>(v: &Value, rng: &mut R) -> Option<Question> {
  let question = non_blank_str(v, "question")?.to_string();
  let answer = non_blank_str(v, "answer")?.to_string();

  let direction = Direction::parse_lenient(v.get("direction").and_then(Value::as_str));
  let question_language = match v.get("questionLanguage").and_then(Value::as_str) {
    Some("target") => QuestionLanguage::Target,
    _ => QuestionLanguage::En,
  };

  let tag = v.get("type").and_then(Value::as_str);
  let raw_options = v.get("options").and_then(Value::as_array);
  let kind = if tag == Some("fill-in-the-blanks") {
    QuestionType::FillInTheBlanks
  } else if raw_options.is_some_and(|o| !o.is_empty()) || tag == Some("multiple-choice") {
    QuestionType::MultipleChoice
  } else {
    QuestionType::TypeAnswer
  };

  let options = match kind.option_cap() {
    Some(cap) => {
      let opts = build_options(raw_options.map(Vec::as_slice).unwrap_or_default(), &answer, cap, rng);
      if opts.len() < 2 {
        return None;
      }
      Some(opts)
    }
    None => None,
  };

  let explanation = non_blank_str(v, "explanation").map(str::to_string).unwrap_or_else(|| {
    match kind {
      QuestionType::FillInTheBlanks => GENERIC_BLANK_EXPLANATION,
      _ => GENERIC_EXPLANATION,
    }
    .to_string()
  });

  Some(Question { question, answer, options, direction, kind, question_language, explanation })
}

fn option_text(v: &Value) -> Option<String> {
  let s = match v {
    Value::String(s) => s.trim().to_string(),
    Value::Number(n) => n.to_string(),
    Value::Bool(b) => b.to_string(),
    _ => return None,
  };
  (!s.is_empty()).then_some(s)
}

/// Unique options containing `answer` exactly once, uniformly shuffled, at most `cap` long.
fn build_options<R: Rng + ?Sized>(raw: &[Value], answer: &str, cap: usize, rng: &mut R) -> Vec<String> {
  let mut distractors: Vec<String> = Vec::with_capacity(raw.len());
  for opt in raw.iter().filter_map(option_text) {
    if opt != answer && !distractors.contains(&opt) {
      distractors.push(opt);
    }
  }

  distractors.shuffle(rng);
  distractors.truncate(cap.saturating_sub(1));

  let at = rng.gen_range(0..=distractors.len());
  distractors.insert(at, answer.to_string());
  distractors
}
