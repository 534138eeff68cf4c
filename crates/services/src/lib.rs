#![forbid(unsafe_code)]

pub mod attempts;
pub mod engine;
pub mod error;
pub mod lesson_progress;
pub mod module_progress;
pub mod rebuild;
pub mod review;
pub mod session;

#[cfg(test)]
mod fixtures;

pub use finlit_core::Clock;

pub use attempts::{AttemptRecorder, RecordedAttempt};
pub use engine::{LearningEngine, QuizSubmission};
pub use error::{EngineError, NotFoundError, ValidationError};
pub use lesson_progress::LessonProgressTracker;
pub use module_progress::{ModuleOverview, ModuleProgressAggregator};
pub use rebuild::{ProgressRebuilder, RebuildReport};
pub use review::{AttemptListItem, AttemptReviewer};
pub use session::QuizSession;
