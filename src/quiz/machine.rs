//! Client-side quiz flow as an explicit state machine.
//!
//! ```text
//! Welcome -> LanguageSelect -> LevelSelect -> BandSelect -> Quiz -> Report
//!                 ^                               ^          |  \     |
//!                 |                               |          |   Failed (retry / change level / change language)
//!                 +------ change language --------+-- change level ---+
//! Report -> Quiz (retry band / next band), Report -> Welcome (reset)
//! ```
//!
//! `QuizMachine::apply` is the transition table. It performs no I/O: entering
//! a quiz returns `Effect::Fetch`, and the caller reports the outcome back with
//! `Action::QuestionsLoaded` or `Action::FetchFailed`.
//!
//! History policy: changing language clears the session history, changing
//! level keeps it.

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{Band, BatchSpec, Language, Level, Question};
use crate::quiz::session::{AnswerRecord, BandReport, SessionHistory};

pub const DEFAULT_BATCH_SIZE: usize = 6;

#[derive(Clone, Debug, PartialEq)]
pub enum Screen {
  Welcome,
  LanguageSelect,
  LevelSelect { language: Language },
  BandSelect { language: Language, level: Level },
  Quiz(QuizScreen),
  Report { report: BandReport },
}

impl Screen {
  pub fn name(&self) -> &'static str {
    match self {
      Screen::Welcome => "welcome",
      Screen::LanguageSelect => "language-select",
      Screen::LevelSelect { .. } => "level-select",
      Screen::BandSelect { .. } => "band-select",
      Screen::Quiz(QuizScreen { phase: QuizPhase::Loading { .. }, .. }) => "quiz (loading)",
      Screen::Quiz(QuizScreen { phase: QuizPhase::Failed { .. }, .. }) => "quiz (error)",
      Screen::Quiz(_) => "quiz",
      Screen::Report { .. } => "report",
    }
  }

  fn language(&self) -> Option<Language> {
    match self {
      Screen::LevelSelect { language } | Screen::BandSelect { language, .. } => Some(*language),
      Screen::Quiz(q) => Some(q.language),
      Screen::Report { report } => Some(report.language),
      Screen::Welcome | Screen::LanguageSelect => None,
    }
  }
}

#[derive(Clone, Debug, PartialEq)]
pub struct QuizScreen {
  pub language: Language,
  pub level: Level,
  pub band: Band,
  pub phase: QuizPhase,
}

#[derive(Clone, Debug, PartialEq)]
pub enum QuizPhase {
  Loading { request_id: u64 },
  /// Fetch failed; the UI offers retry, change level and change language.
  Failed { reason: String },
  Active(ActiveQuiz),
}

/// Questions of the current band and the answers given so far.
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveQuiz {
  questions: Vec<Question>,
  answers: Vec<Option<AnswerRecord>>,
  cursor: usize,
}

impl ActiveQuiz {
  fn new(questions: Vec<Question>) -> Self {
    let answers = vec![None; questions.len()];
    Self { questions, answers, cursor: 0 }
  }

  pub fn cursor(&self) -> usize { self.cursor }

  pub fn len(&self) -> usize { self.questions.len() }

  pub fn is_empty(&self) -> bool { self.questions.is_empty() }

  pub fn current(&self) -> &Question { &self.questions[self.cursor] }

  /// The answer already submitted for the current question, shown read-only.
  pub fn current_answer(&self) -> Option<&AnswerRecord> { self.answers[self.cursor].as_ref() }

  pub fn is_last(&self) -> bool { self.cursor + 1 == self.questions.len() }

  pub fn answered_count(&self) -> usize { self.answers.iter().filter(|a| a.is_some()).count() }

  pub fn score(&self) -> usize { self.answers.iter().flatten().filter(|a| a.is_correct).count() }

  fn is_complete(&self) -> bool { self.answered_count() == self.questions.len() }

  fn records(&self) -> Vec<AnswerRecord> { self.answers.iter().flatten().cloned().collect() }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Action {
  Start,
  SelectLanguage(Language),
  SelectLevel(Level),
  SelectBand(Band),
  QuestionsLoaded { request_id: u64, questions: Vec<Question> },
  FetchFailed { request_id: u64, reason: String },
  RetryFetch,
  SubmitAnswer(String),
  Next,
  Previous,
  FinishBand,
  RetryBand,
  NextBand,
  ChangeLevel(Level),
  ChangeLanguage,
  Reset,
}

impl Action {
  pub fn name(&self) -> &'static str {
    match self {
      Action::Start => "start",
      Action::SelectLanguage(_) => "select_language",
      Action::SelectLevel(_) => "select_level",
      Action::SelectBand(_) => "select_band",
      Action::QuestionsLoaded { .. } => "questions_loaded",
      Action::FetchFailed { .. } => "fetch_failed",
      Action::RetryFetch => "retry_fetch",
      Action::SubmitAnswer(_) => "submit_answer",
      Action::Next => "next",
      Action::Previous => "previous",
      Action::FinishBand => "finish_band",
      Action::RetryBand => "retry_band",
      Action::NextBand => "next_band",
      Action::ChangeLevel(_) => "change_level",
      Action::ChangeLanguage => "change_language",
      Action::Reset => "reset",
    }
  }
}

/// A question batch the caller must fetch.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchRequest {
  pub request_id: u64,
  pub spec: BatchSpec,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
  None,
  Fetch(FetchRequest),
  Graded { correct: bool },
  BandCompleted { replaced: bool },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
  #[error("'{action}' is not allowed on the {screen} screen")]
  Illegal { screen: &'static str, action: &'static str },
  #[error("question {0} has already been answered")]
  AlreadyAnswered(usize),
  #[error("answer the current question first")]
  Unanswered,
  #[error("already at the first question")]
  AtFirstQuestion,
  #[error("already at the last question")]
  AtLastQuestion,
  #[error("band incomplete: {answered} of {total} questions answered")]
  BandIncomplete { answered: usize, total: usize },
  #[error("band {0} is the last band of the level")]
  NoNextBand(Band),
}

#[derive(Clone, Debug)]
pub struct QuizMachine {
  session_id: Uuid,
  screen: Screen,
  history: SessionHistory,
  batch_size: usize,
  next_request_id: u64,
}

impl Default for QuizMachine {
  fn default() -> Self { Self::new(DEFAULT_BATCH_SIZE) }
}

impl QuizMachine {
  pub fn new(batch_size: usize) -> Self {
    Self { session_id: Uuid::new_v4(), screen: Screen::Welcome, history: SessionHistory::new(), batch_size: batch_size.max(1), next_request_id: 1 }
  }

  pub fn session_id(&self) -> Uuid { self.session_id }

  pub fn screen(&self) -> &Screen { &self.screen }

  pub fn history(&self) -> &SessionHistory { &self.history }

  pub fn active_quiz(&self) -> Option<&ActiveQuiz> {
    match &self.screen {
      Screen::Quiz(QuizScreen { phase: QuizPhase::Active(active), .. }) => Some(active),
      _ => None,
    }
  }

  fn illegal(&self, action: &'static str) -> TransitionError {
    TransitionError::Illegal { screen: self.screen.name(), action }
  }

  fn begin_quiz(&mut self, language: Language, level: Level, band: Band) -> Effect {
    let request_id = self.next_request_id;
    self.next_request_id += 1;
    self.screen = Screen::Quiz(QuizScreen { language, level, band, phase: QuizPhase::Loading { request_id } });
    debug!(target: "quiz", session = %self.session_id, request_id, %language, %level, %band, "Requesting question batch");
    Effect::Fetch(FetchRequest { request_id, spec: BatchSpec { language, level, band, count: self.batch_size } })
  }

  /// True while the quiz screen is still waiting for `request_id`.
  fn is_pending(&self, request_id: u64) -> bool {
    matches!(&self.screen, Screen::Quiz(QuizScreen { phase: QuizPhase::Loading { request_id: id }, .. }) if *id == request_id)
  }

  fn set_phase(&mut self, phase: QuizPhase) {
    if let Screen::Quiz(q) = &mut self.screen {
      q.phase = phase;
    }
  }

  fn active_mut(&mut self, action: &'static str) -> Result<&mut ActiveQuiz, TransitionError> {
    if self.active_quiz().is_none() {
      return Err(self.illegal(action));
    }
    match &mut self.screen {
      Screen::Quiz(QuizScreen { phase: QuizPhase::Active(active), .. }) => Ok(active),
      _ => Err(TransitionError::Illegal { screen: "quiz", action }),
    }
  }

  /// Apply one user or fetch action. Illegal actions leave the state untouched.
  pub fn apply(&mut self, action: Action) -> Result<Effect, TransitionError> {
    let name = action.name();
    match action {
      Action::Reset => {
        self.history.clear();
        self.screen = Screen::Welcome;
        Ok(Effect::None)
      }

      Action::Start => match self.screen {
        Screen::Welcome => {
          self.screen = Screen::LanguageSelect;
          Ok(Effect::None)
        }
        _ => Err(self.illegal(name)),
      },

      Action::SelectLanguage(language) => match self.screen {
        Screen::LanguageSelect => {
          self.screen = Screen::LevelSelect { language };
          Ok(Effect::None)
        }
        _ => Err(self.illegal(name)),
      },

      Action::SelectLevel(level) => match self.screen {
        Screen::LevelSelect { language } => {
          self.screen = Screen::BandSelect { language, level };
          Ok(Effect::None)
        }
        _ => Err(self.illegal(name)),
      },

      Action::SelectBand(band) => match self.screen {
        Screen::BandSelect { language, level } => Ok(self.begin_quiz(language, level, band)),
        _ => Err(self.illegal(name)),
      },

      Action::QuestionsLoaded { request_id, questions } => {
        if !self.is_pending(request_id) {
          debug!(target: "quiz", request_id, "Ignoring superseded question batch");
          return Ok(Effect::None);
        }
        let phase = if questions.is_empty() {
          QuizPhase::Failed { reason: "the server returned no questions".into() }
        } else {
          QuizPhase::Active(ActiveQuiz::new(questions))
        };
        self.set_phase(phase);
        Ok(Effect::None)
      }

      Action::FetchFailed { request_id, reason } => {
        if !self.is_pending(request_id) {
          debug!(target: "quiz", request_id, "Ignoring failure of superseded fetch");
          return Ok(Effect::None);
        }
        info!(target: "quiz", request_id, %reason, "Question fetch failed");
        self.set_phase(QuizPhase::Failed { reason });
        Ok(Effect::None)
      }

      Action::RetryFetch => match &self.screen {
        Screen::Quiz(QuizScreen { language, level, band, phase: QuizPhase::Failed { .. } }) => {
          let (language, level, band) = (*language, *level, *band);
          Ok(self.begin_quiz(language, level, band))
        }
        _ => Err(self.illegal(name)),
      },

      Action::SubmitAnswer(text) => {
        let active = self.active_mut(name)?;
        let i = active.cursor;
        if active.answers[i].is_some() {
          return Err(TransitionError::AlreadyAnswered(i));
        }
        let record = AnswerRecord::grade(&active.questions[i], &text, Utc::now());
        let correct = record.is_correct;
        active.answers[i] = Some(record);
        Ok(Effect::Graded { correct })
      }

      Action::Next => {
        let active = self.active_mut(name)?;
        if active.answers[active.cursor].is_none() {
          return Err(TransitionError::Unanswered);
        }
        if active.is_last() {
          return Err(TransitionError::AtLastQuestion);
        }
        active.cursor += 1;
        Ok(Effect::None)
      }

      Action::Previous => {
        let active = self.active_mut(name)?;
        if active.cursor == 0 {
          return Err(TransitionError::AtFirstQuestion);
        }
        active.cursor -= 1;
        Ok(Effect::None)
      }

      Action::FinishBand => {
        let report = match &self.screen {
          Screen::Quiz(QuizScreen { language, level, band, phase: QuizPhase::Active(active) }) => {
            if !active.is_complete() {
              return Err(TransitionError::BandIncomplete { answered: active.answered_count(), total: active.len() });
            }
            BandReport::new(*band, *level, *language, active.records(), Utc::now())
          }
          _ => return Err(self.illegal(name)),
        };
        info!(target: "quiz", session = %self.session_id, band = %report.band, level = %report.level, language = %report.language, score = report.score, total = report.total, "Band completed");
        let replaced = self.history.upsert(report.clone());
        self.screen = Screen::Report { report };
        Ok(Effect::BandCompleted { replaced })
      }

      Action::RetryBand => match &self.screen {
        Screen::Report { report } => {
          let (language, level, band) = (report.language, report.level, report.band);
          Ok(self.begin_quiz(language, level, band))
        }
        _ => Err(self.illegal(name)),
      },

      Action::NextBand => match &self.screen {
        Screen::Report { report } => {
          let (language, level, band) = (report.language, report.level, report.band);
          let next = band.next().ok_or(TransitionError::NoNextBand(band))?;
          Ok(self.begin_quiz(language, level, next))
        }
        _ => Err(self.illegal(name)),
      },

      Action::ChangeLevel(level) => match &self.screen {
        Screen::BandSelect { language, .. } | Screen::Report { report: BandReport { language, .. } } => {
          self.screen = Screen::BandSelect { language: *language, level };
          Ok(Effect::None)
        }
        Screen::Quiz(q) => {
          self.screen = Screen::BandSelect { language: q.language, level };
          Ok(Effect::None)
        }
        _ => Err(self.illegal(name)),
      },

      Action::ChangeLanguage => match self.screen.language() {
        Some(_) => {
          self.history.clear();
          self.screen = Screen::LanguageSelect;
          Ok(Effect::None)
        }
        None => Err(self.illegal(name)),
      },
    }
  }
}
