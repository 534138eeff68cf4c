use thiserror::Error;

use crate::model::{LessonError, ModuleError, ParseIdError, ProgressError, QuizError};
use crate::scoring::ScoringError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Module(#[from] ModuleError),
    #[error(transparent)]
    Lesson(#[from] LessonError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Id(#[from] ParseIdError),
}
