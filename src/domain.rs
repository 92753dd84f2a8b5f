//! Domain models: target languages, levels, bands and the quiz question itself.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Target languages the quiz can be generated for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
  Spanish,
  French,
  German,
  Italian,
  Portuguese,
  Japanese,
  Korean,
  Chinese,
  Hindi,
  Arabic,
  Russian,
}

impl Language {
  pub const ALL: [Language; 11] = [
    Language::Spanish,
    Language::French,
    Language::German,
    Language::Italian,
    Language::Portuguese,
    Language::Japanese,
    Language::Korean,
    Language::Chinese,
    Language::Hindi,
    Language::Arabic,
    Language::Russian,
  ];

  pub fn name(self) -> &'static str {
    match self {
      Language::Spanish => "Spanish",
      Language::French => "French",
      Language::German => "German",
      Language::Italian => "Italian",
      Language::Portuguese => "Portuguese",
      Language::Japanese => "Japanese",
      Language::Korean => "Korean",
      Language::Chinese => "Chinese",
      Language::Hindi => "Hindi",
      Language::Arabic => "Arabic",
      Language::Russian => "Russian",
    }
  }

  /// ISO 639-1 code.
  pub fn code(self) -> &'static str {
    match self {
      Language::Spanish => "es",
      Language::French => "fr",
      Language::German => "de",
      Language::Italian => "it",
      Language::Portuguese => "pt",
      Language::Japanese => "ja",
      Language::Korean => "ko",
      Language::Chinese => "zh",
      Language::Hindi => "hi",
      Language::Arabic => "ar",
      Language::Russian => "ru",
    }
  }

  /// Languages that are not written in Latin script. The prompt asks for a
  /// romanization hint in parentheses for these.
  pub fn non_latin_script(self) -> bool {
    matches!(
      self,
      Language::Japanese | Language::Korean | Language::Chinese | Language::Hindi | Language::Arabic | Language::Russian
    )
  }
}

impl fmt::Display for Language {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

impl FromStr for Language {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let needle = s.trim();
    Language::ALL
      .iter()
      .copied()
      .find(|l| l.name().eq_ignore_ascii_case(needle) || l.code().eq_ignore_ascii_case(needle))
      .or_else(|| needle.eq_ignore_ascii_case("mandarin").then_some(Language::Chinese))
      .ok_or_else(|| format!("unsupported language '{}'", needle))
  }
}

/// Coarse difficulty tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
  Basic,
  Moderate,
  Advanced,
}

impl Level {
  pub const ALL: [Level; 3] = [Level::Basic, Level::Moderate, Level::Advanced];

  pub fn name(self) -> &'static str {
    match self {
      Level::Basic => "Basic",
      Level::Moderate => "Moderate",
      Level::Advanced => "Advanced",
    }
  }
}

impl fmt::Display for Level {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

impl FromStr for Level {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let needle = s.trim();
    Level::ALL
      .iter()
      .copied()
      .find(|l| l.name().eq_ignore_ascii_case(needle))
      .ok_or_else(|| format!("unsupported level '{}' (expected Basic, Moderate or Advanced)", needle))
  }
}

/// Difficulty sub-level inside a level. Always within 1..=5.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Band(u8);

impl Band {
  pub const MIN: u8 = 1;
  pub const MAX: u8 = 5;

  pub fn new(n: u8) -> Option<Self> {
    (Self::MIN..=Self::MAX).contains(&n).then_some(Band(n))
  }

  /// Clamp any integer into the valid range.
  pub fn clamped(n: i64) -> Self {
    Band(n.clamp(Self::MIN as i64, Self::MAX as i64) as u8)
  }

  pub fn get(self) -> u8 { self.0 }

  pub fn next(self) -> Option<Self> { Band::new(self.0 + 1) }

  pub fn all() -> impl Iterator<Item = Band> { (Self::MIN..=Self::MAX).map(Band) }
}

impl TryFrom<u8> for Band {
  type Error = String;
  fn try_from(n: u8) -> Result<Self, Self::Error> {
    Band::new(n).ok_or_else(|| format!("band must be between {} and {}, got {}", Self::MIN, Self::MAX, n))
  }
}

impl From<Band> for u8 {
  fn from(b: Band) -> u8 { b.0 }
}

impl fmt::Display for Band {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Which language the prompt is in vs. which language the answer is in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Direction {
  #[default]
  #[serde(rename = "en-to-target")]
  EnToTarget,
  #[serde(rename = "target-to-en")]
  TargetToEn,
  #[serde(rename = "target-to-target")]
  TargetToTarget,
}

impl Direction {
  pub fn parse_lenient(s: Option<&str>) -> Self {
    match s {
      Some("target-to-en") => Direction::TargetToEn,
      Some("target-to-target") => Direction::TargetToTarget,
      _ => Direction::EnToTarget,
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionType {
  #[serde(rename = "multiple-choice")]
  MultipleChoice,
  #[serde(rename = "type-answer")]
  TypeAnswer,
  #[serde(rename = "fill-in-the-blanks")]
  FillInTheBlanks,
}

impl QuestionType {
  /// Maximum number of options a choice question may carry.
  pub fn option_cap(self) -> Option<usize> {
    match self {
      QuestionType::MultipleChoice => Some(5),
      QuestionType::FillInTheBlanks => Some(4),
      QuestionType::TypeAnswer => None,
    }
  }

  pub fn has_options(self) -> bool { self.option_cap().is_some() }
}

/// Language the question text is written in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuestionLanguage {
  #[default]
  En,
  Target,
}

/// One quiz item, as served to the client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
  pub question: String,
  pub answer: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub options: Option<Vec<String>>,
  #[serde(default)]
  pub direction: Direction,
  #[serde(rename = "type")]
  pub kind: QuestionType,
  #[serde(default)]
  pub question_language: QuestionLanguage,
  #[serde(default)]
  pub explanation: String,
}

/// Parameters of one question batch: what the client asks the server for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSpec {
  pub language: Language,
  pub level: Level,
  pub band: Band,
  pub count: usize,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn language_parses_name_and_code() {
    assert_eq!("french".parse::<Language>().unwrap(), Language::French);
    assert_eq!("JA".parse::<Language>().unwrap(), Language::Japanese);
    assert_eq!("Mandarin".parse::<Language>().unwrap(), Language::Chinese);
    assert!("Klingon".parse::<Language>().is_err());
  }

  #[test]
  fn band_bounds() {
    assert!(Band::new(0).is_none());
    assert!(Band::new(6).is_none());
    assert_eq!(Band::clamped(42).get(), 5);
    assert_eq!(Band::clamped(-3).get(), 1);
    assert_eq!(Band::new(5).unwrap().next(), None);
    assert_eq!(Band::new(2).unwrap().next(), Band::new(3));
  }

  #[test]
  fn question_serializes_with_wire_names() {
    let q = Question {
      question: "Hello".into(),
      answer: "Hola".into(),
      options: None,
      direction: Direction::EnToTarget,
      kind: QuestionType::TypeAnswer,
      question_language: QuestionLanguage::En,
      explanation: "Greeting.".into(),
    };
    let v = serde_json::to_value(&q).unwrap();
    assert_eq!(v["type"], "type-answer");
    assert_eq!(v["direction"], "en-to-target");
    assert_eq!(v["questionLanguage"], "en");
    assert!(v.get("options").is_none());
  }
}
