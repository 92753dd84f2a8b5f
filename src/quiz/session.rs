//! Answer records, band reports and the session history that accumulates them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Band, Language, Level, Question, QuestionType};
use crate::quiz::grading::is_correct;

/// One submitted answer. Immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
  pub question: String,
  #[serde(rename = "type")]
  pub kind: QuestionType,
  pub submitted: String,
  pub correct_answer: String,
  pub is_correct: bool,
  pub explanation: String,
  pub answered_at: DateTime<Utc>,
}

impl AnswerRecord {
  pub fn grade(q: &Question, submitted: &str, answered_at: DateTime<Utc>) -> Self {
    Self {
      question: q.question.clone(),
      kind: q.kind,
      submitted: submitted.trim().to_string(),
      correct_answer: q.answer.clone(),
      is_correct: is_correct(submitted, &q.answer),
      explanation: q.explanation.clone(),
      answered_at,
    }
  }
}

/// Percentage, rounded to the nearest integer. Zero when nothing was answered.
pub fn accuracy_percent(score: usize, total: usize) -> u32 {
  if total == 0 { 0 } else { ((score as f64 / total as f64) * 100.0).round() as u32 }
}

/// Scored record of one completed band.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandReport {
  pub band: Band,
  pub level: Level,
  pub language: Language,
  pub answers: Vec<AnswerRecord>,
  pub score: usize,
  pub total: usize,
  pub completed_at: DateTime<Utc>,
}

impl BandReport {
  pub fn new(band: Band, level: Level, language: Language, answers: Vec<AnswerRecord>, completed_at: DateTime<Utc>) -> Self {
    let score = answers.iter().filter(|a| a.is_correct).count();
    let total = answers.len();
    Self { band, level, language, answers, score, total, completed_at }
  }

  pub fn accuracy(&self) -> u32 { accuracy_percent(self.score, self.total) }

  pub fn key(&self) -> (Band, Level, Language) { (self.band, self.level, self.language) }
}

/// All band reports of the current session, in order of first completion.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionHistory {
  reports: Vec<BandReport>,
}

impl SessionHistory {
  pub fn new() -> Self { Self::default() }

  /// Store a report, replacing any previous one for the same (band, level, language).
  /// Returns true when an existing report was replaced.
  pub fn upsert(&mut self, report: BandReport) -> bool {
    let key = report.key();
    match self.reports.iter().position(|r| r.key() == key) {
      Some(i) => {
        self.reports[i] = report;
        true
      }
      None => {
        self.reports.push(report);
        false
      }
    }
  }

  pub fn reports(&self) -> &[BandReport] { &self.reports }

  pub fn get(&self, band: Band, level: Level, language: Language) -> Option<&BandReport> {
    self.reports.iter().find(|r| r.key() == (band, level, language))
  }

  pub fn latest(&self) -> Option<&BandReport> { self.reports.last() }

  pub fn len(&self) -> usize { self.reports.len() }

  pub fn is_empty(&self) -> bool { self.reports.is_empty() }

  pub fn clear(&mut self) { self.reports.clear(); }

  /// (score, total) summed over every band.
  pub fn totals(&self) -> (usize, usize) {
    self.reports.iter().fold((0, 0), |(s, t), r| (s + r.score, t + r.total))
  }

  pub fn accuracy(&self) -> u32 {
    let (score, total) = self.totals();
    accuracy_percent(score, total)
  }
}

impl FromIterator<BandReport> for SessionHistory {
  fn from_iter<I: IntoIterator<Item = BandReport>>(iter: I) -> Self {
    let mut history = SessionHistory::new();
    for report in iter {
      history.upsert(report);
    }
    history
  }
}
