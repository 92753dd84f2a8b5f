//! Learner-side quiz flow: grading, session history, the screen state machine
//! and the HTTP driver that feeds it question batches.

pub mod client;
pub mod grading;
pub mod machine;
pub mod session;

pub use client::{FetchError, QuizClient};
pub use machine::{Action, Effect, QuizMachine, QuizPhase, Screen, TransitionError};
pub use session::{AnswerRecord, BandReport, SessionHistory};
