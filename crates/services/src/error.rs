//! Shared error types for the services crate.

use thiserror::Error;

use finlit_core::model::{AttemptId, LessonId, ModuleId, QuestionId, QuizId};
use storage::repository::StorageError;

/// A request the engine refuses before touching the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("quiz {0} has no questions and cannot be taken")]
    NoQuestions(QuizId),
    #[error("question {question_id} is not part of quiz {quiz_id}")]
    UnknownQuestion {
        quiz_id: QuizId,
        question_id: QuestionId,
    },
    #[error("lesson {0} is a quiz lesson and completes only by passing its quiz")]
    QuizLessonRequiresAttempt(LessonId),
    #[error("lesson {0} has no quiz")]
    LessonHasNoQuiz(LessonId),
    #[error("module {0} has no quiz")]
    ModuleHasNoQuiz(ModuleId),
}

/// A referenced catalog or history row does not exist (or is unpublished).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum NotFoundError {
    #[error("module {0} not found")]
    Module(ModuleId),
    #[error("lesson {0} not found")]
    Lesson(LessonId),
    #[error("quiz {0} not found")]
    Quiz(QuizId),
    #[error("attempt {0} not found")]
    Attempt(AttemptId),
}

/// Errors emitted by the engine and its services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error(transparent)]
    Persistence(#[from] StorageError),
}
