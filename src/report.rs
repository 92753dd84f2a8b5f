//! Paginated plain-text progress report built from a session history.
//!
//! Layout: a title block on page one, a summary, then one section per band
//! with a block per answered question. A block is never split across pages;
//! when it does not fit in what is left of the page a new page is started.
//! Every page ends with a footer carrying the generation timestamp and the
//! page number. Pages are separated by a form feed.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::quiz::session::{BandReport, SessionHistory};

const PAGE_BREAK: char = '\u{000C}';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
  #[error("nothing to export: no band has been completed in this session")]
  EmptyHistory,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReportOptions {
  /// Body lines per page, footer excluded.
  pub page_height: usize,
  /// Maximum characters per line.
  pub width: usize,
}

impl Default for ReportOptions {
  fn default() -> Self { Self { page_height: 50, width: 78 } }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Page {
  pub lines: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct ReportDocument {
  pub id: Uuid,
  pub filename: String,
  pub generated_at: DateTime<Utc>,
  pub pages: Vec<Page>,
}

impl ReportDocument {
  pub fn page_count(&self) -> usize { self.pages.len() }

  pub fn render_text(&self) -> String {
    let sep = format!("\n{}", PAGE_BREAK);
    self.pages.iter().map(|p| p.lines.join("\n")).collect::<Vec<_>>().join(&sep)
  }
}

/// `quiz-report-{language}-{level}-{YYYYMMDD-HHMMSS}.txt`, lowercase. `export`
/// names the file after the most recently completed band.
pub fn report_filename(report: &BandReport, generated_at: DateTime<Utc>) -> String {
  format!(
    "quiz-report-{}-{}-{}.txt",
    report.language.name().to_lowercase(),
    report.level.name().to_lowercase(),
    generated_at.format("%Y%m%d-%H%M%S")
  )
}

pub fn export(history: &SessionHistory, learner: &str, generated_at: DateTime<Utc>, opts: ReportOptions) -> Result<ReportDocument, ReportError> {
  let latest = history.latest().ok_or(ReportError::EmptyHistory)?;
  let opts = ReportOptions { page_height: opts.page_height.max(8), width: opts.width.max(20) };
  let learner = match learner.trim() {
    "" => "Learner",
    name => name,
  };

  let mut blocks: Vec<Vec<String>> = Vec::new();
  let mut header = vec![
    "LANGUAGE QUIZ PROGRESS REPORT".to_string(),
    "=".repeat(29),
    format!("Learner:  {}", learner),
    format!("Language: {}", distinct(history, |r| r.language.name())),
    format!("Level:    {}", distinct(history, |r| r.level.name())),
    format!("Date:     {}", generated_at.format("%Y-%m-%d %H:%M UTC")),
    String::new(),
  ];
  let (score, total) = history.totals();
  header.push(format!("Overall: {}/{} correct ({}%) across {} band(s)", score, total, history.accuracy(), history.len()));
  header.push(String::new());
  blocks.push(header);

  for band in history.reports() {
    blocks.push(vec![
      format!("Band {} - {} {}", band.band, band.language, band.level),
      format!("Score: {}/{} ({}%)", band.score, band.total, band.accuracy()),
      "-".repeat(opts.width.min(40)),
    ]);
    for (i, a) in band.answers.iter().enumerate() {
      let mut block = Vec::new();
      block.extend(wrap(&format!("{}. {}", i + 1, a.question.trim()), opts.width));
      let mark = if a.is_correct { "correct" } else { "incorrect" };
      block.extend(wrap(&format!("   Your answer: {} ({})", a.submitted.trim(), mark), opts.width));
      if !a.is_correct {
        block.extend(wrap(&format!("   Correct answer: {}", a.correct_answer.trim()), opts.width));
      }
      let explanation = a.explanation.trim();
      if !explanation.is_empty() {
        block.extend(wrap(&format!("   {}", explanation), opts.width));
      }
      block.push(String::new());
      blocks.push(block);
    }
  }

  let mut pages = paginate(blocks, opts.page_height);
  let n = pages.len();
  let stamp = generated_at.format("%Y-%m-%d %H:%M:%S UTC");
  for (i, page) in pages.iter_mut().enumerate() {
    page.lines.resize(opts.page_height, String::new());
    page.lines.push(format!("Generated {} | Page {} of {}", stamp, i + 1, n));
  }

  Ok(ReportDocument { id: Uuid::new_v4(), filename: report_filename(latest, generated_at), generated_at, pages })
}

/// Distinct values across all bands, in order of first appearance.
fn distinct(history: &SessionHistory, field: impl Fn(&BandReport) -> &'static str) -> String {
  let mut seen: Vec<&str> = Vec::new();
  for r in history.reports() {
    let v = field(r);
    if !seen.contains(&v) {
      seen.push(v);
    }
  }
  seen.join(", ")
}

fn paginate(blocks: Vec<Vec<String>>, page_height: usize) -> Vec<Page> {
  let mut pages = vec![Page::default()];
  for block in blocks {
    let mut page_len = pages.last().map_or(0, |p| p.lines.len());
    if page_len > 0 && page_len + block.len() > page_height {
      pages.push(Page::default());
      page_len = 0;
    }
    // A block taller than a page is split at page boundaries.
    for line in block {
      if page_len == page_height {
        pages.push(Page::default());
        page_len = 0;
      }
      if let Some(page) = pages.last_mut() {
        page.lines.push(line);
      }
      page_len += 1;
    }
  }
  pages
}

/// Greedy word wrap. Continuation lines keep the leading indent of the first,
/// capped at half the width so every line has room for text.
fn wrap(text: &str, width: usize) -> Vec<String> {
  let width = width.max(1);
  let indent = " ".repeat(text.chars().take_while(|c| *c == ' ').count().min(width / 2));
  let mut lines = Vec::new();
  let mut line = indent.clone();
  let mut line_chars = indent.chars().count();
  for word in text.split_whitespace() {
    let mut word = word.to_string();
    let mut wlen = word.chars().count();
    if line_chars > indent.len() && line_chars + 1 + wlen > width {
      lines.push(std::mem::replace(&mut line, indent.clone()));
      line_chars = indent.len();
    }
    // Hard-split words longer than a full line.
    while indent.len() + wlen > width {
      let take = width - indent.len();
      let head: String = word.chars().take(take).collect();
      word = word.chars().skip(take).collect();
      wlen -= take;
      if line_chars > indent.len() {
        lines.push(std::mem::replace(&mut line, indent.clone()));
      }
      lines.push(format!("{}{}", indent, head));
      line = indent.clone();
      line_chars = indent.len();
    }
    if wlen == 0 {
      continue;
    }
    if line_chars > indent.len() {
      line.push(' ');
      line_chars += 1;
    }
    line.push_str(&word);
    line_chars += wlen;
  }
  if line_chars > indent.len() || lines.is_empty() {
    lines.push(line);
  }
  lines
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Band, Direction, Language, Level, Question, QuestionLanguage, QuestionType};
  use crate::quiz::session::AnswerRecord;
  use chrono::TimeZone;

  fn at() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap() }

  fn band_report(band: u8, n: usize) -> BandReport {
    let q = Question {
      question: "How do you say 'thank you'?".into(),
      answer: "Gracias".into(),
      options: None,
      direction: Direction::EnToTarget,
      kind: QuestionType::TypeAnswer,
      question_language: QuestionLanguage::En,
      explanation: "Gracias is the everyday word for thanks.".into(),
    };
    let answers = (0..n).map(|i| AnswerRecord::grade(&q, if i % 2 == 0 { "gracias" } else { "de nada" }, at())).collect();
    BandReport::new(Band::new(band).unwrap(), Level::Moderate, Language::Spanish, answers, at())
  }

  #[test]
  fn empty_history_is_rejected() {
    let err = export(&SessionHistory::new(), "Ana", at(), ReportOptions::default()).unwrap_err();
    assert_eq!(err, ReportError::EmptyHistory);
  }

  #[test]
  fn filename_embeds_language_level_and_timestamp() {
    assert_eq!(report_filename(&band_report(1, 1), at()), "quiz-report-spanish-moderate-20240309-140507.txt");
  }

  #[test]
  fn every_page_has_a_footer_and_blocks_are_not_split() {
    let history: SessionHistory = vec![band_report(1, 6), band_report(2, 6)].into_iter().collect();
    let opts = ReportOptions { page_height: 12, width: 60 };
    let doc = export(&history, "Ana", at(), opts).unwrap();
    assert!(doc.page_count() > 2);
    for (i, page) in doc.pages.iter().enumerate() {
      assert_eq!(page.lines.len(), opts.page_height + 1);
      let footer = page.lines.last().unwrap();
      assert_eq!(footer, &format!("Generated 2024-03-09 14:05:07 UTC | Page {} of {}", i + 1, doc.page_count()));
      // A question block never starts on the last body line without its answer line.
      let body = &page.lines[..opts.page_height];
      if let Some(last) = body.iter().rposition(|l| !l.is_empty()) {
        assert!(!body[last].chars().next().map_or(false, |c| c.is_ascii_digit()));
      }
    }
    let text = doc.render_text();
    assert_eq!(text.matches(PAGE_BREAK).count(), doc.page_count() - 1);
    assert!(text.contains("Learner:  Ana"));
    assert!(text.contains("Overall: 6/12 correct (50%) across 2 band(s)"));
    assert!(text.contains("Correct answer: Gracias"));
  }

  #[test]
  fn blank_learner_gets_a_placeholder() {
    let history: SessionHistory = std::iter::once(band_report(3, 2)).collect();
    let doc = export(&history, "   ", at(), ReportOptions::default()).unwrap();
    assert_eq!(doc.page_count(), 1);
    assert!(doc.render_text().contains("Learner:  Learner"));
  }

  #[test]
  fn over_indented_text_still_fits_the_width() {
    for pad in [19, 20, 25, 200] {
      let lines = wrap(&format!("{}word another", " ".repeat(pad)), 20);
      assert!(lines.iter().all(|l| l.chars().count() <= 20), "pad {pad}: {lines:?}");
      assert_eq!(lines.join(" ").split_whitespace().collect::<Vec<_>>(), vec!["word", "another"]);
    }
    assert_eq!(wrap("abc", 0), vec!["a", "b", "c"]);
  }

  #[test]
  fn padded_explanation_does_not_stall_export() {
    let mut report = band_report(1, 1);
    report.answers[0].explanation = format!("{}Gracias means thanks.", " ".repeat(300));
    let history: SessionHistory = std::iter::once(report).collect();
    let opts = ReportOptions::default();
    let doc = export(&history, "Ana", at(), opts).unwrap();
    assert!(doc.pages.iter().flat_map(|p| &p.lines).all(|l| l.chars().count() <= opts.width));
    assert!(doc.render_text().contains("   Gracias means thanks."));
  }

  #[test]
  fn header_lists_every_level_studied() {
    let mut advanced = band_report(2, 2);
    advanced.level = Level::Advanced;
    let history: SessionHistory = vec![band_report(1, 2), advanced].into_iter().collect();
    let doc = export(&history, "Ana", at(), ReportOptions::default()).unwrap();
    let text = doc.render_text();
    assert!(text.contains("Level:    Moderate, Advanced"));
    assert!(text.contains("Language: Spanish\n"));
    assert_eq!(doc.filename, "quiz-report-spanish-advanced-20240309-140507.txt");
  }

  #[test]
  fn wrap_respects_width_and_indent() {
    let lines = wrap("   one two three four five six seven", 14);
    assert!(lines.iter().all(|l| l.chars().count() <= 14));
    assert!(lines.iter().all(|l| l.starts_with("   ")));
    assert_eq!(lines.join(" ").split_whitespace().count(), 7);
    assert_eq!(wrap("", 10), vec![String::new()]);
    let long = wrap("abcdefghijklmnopqrstuvwxyz", 10);
    assert_eq!(long, vec!["abcdefghij", "klmnopqrst", "uvwxyz"]);
  }
}
