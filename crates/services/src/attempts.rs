use std::sync::Arc;

use chrono::{DateTime, Utc};

use finlit_core::answers::{AnswerSet, RawAnswers, normalize};
use finlit_core::model::{
    AttemptId, LessonId, LessonProgress, ModuleId, NewQuizAttempt, Quiz, QuizAttempt, UserId,
};
use finlit_core::scoring::{QuizScore, score_quiz};
use storage::repository::{AttemptRepository, ProgressRepository};

use crate::error::{EngineError, ValidationError};
use crate::module_progress::ModuleProgressAggregator;

/// Outcome of recording one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedAttempt {
    pub attempt_id: AttemptId,
    pub score: u8,
    pub passed: bool,
    pub attempt: QuizAttempt,
    /// `false` when the lesson or module progress update after the insert
    /// failed; the attempt itself is stored either way.
    pub progress_synced: bool,
}

/// Normalize and score `raw` against `quiz` without touching the store.
///
/// # Errors
///
/// Returns `ValidationError::NoQuestions` for an empty quiz and
/// `ValidationError::UnknownQuestion` when an answer names a question the
/// quiz does not have.
pub fn grade(quiz: &Quiz, raw: &RawAnswers) -> Result<(AnswerSet, QuizScore), ValidationError> {
    let answers = normalize(raw);
    if let Some(unknown) = answers.question_ids().find(|id| quiz.question(id).is_none()) {
        return Err(ValidationError::UnknownQuestion {
            quiz_id: quiz.id(),
            question_id: unknown.clone(),
        });
    }
    let score = score_quiz(quiz.questions(), &answers, quiz.passing_score())
        .map_err(|_| ValidationError::NoQuestions(quiz.id()))?;
    Ok((answers, score))
}

/// Persists submissions and keeps the derived progress caches in step.
#[derive(Clone)]
pub struct AttemptRecorder {
    attempts: Arc<dyn AttemptRepository>,
    progress: Arc<dyn ProgressRepository>,
    aggregator: ModuleProgressAggregator,
}

impl AttemptRecorder {
    #[must_use]
    pub fn new(
        attempts: Arc<dyn AttemptRepository>,
        progress: Arc<dyn ProgressRepository>,
        aggregator: ModuleProgressAggregator,
    ) -> Self {
        Self {
            attempts,
            progress,
            aggregator,
        }
    }

    /// Score and append an attempt, then update lesson and module progress.
    ///
    /// The attempt row is the only write that can fail the call. Progress
    /// updates afterwards are best-effort: failures are logged and reported via
    /// `RecordedAttempt::progress_synced`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Validation` if the answers cannot be graded, and
    /// `EngineError::Persistence` if the attempt insert fails. In both cases
    /// nothing is written.
    pub async fn record_attempt(
        &self,
        user_id: UserId,
        quiz: &Quiz,
        module_id: ModuleId,
        lesson_id: Option<LessonId>,
        raw: &RawAnswers,
        completed_at: DateTime<Utc>,
    ) -> Result<RecordedAttempt, EngineError> {
        let (answers, score) = grade(quiz, raw)?;

        let new_attempt = NewQuizAttempt {
            user_id,
            quiz_id: quiz.id(),
            module_id,
            lesson_id,
            answers: answers.to_raw(),
            score: score.score,
            passed: score.passed,
            completed_at,
        };
        let attempt_id = self.attempts.insert_attempt(&new_attempt).await?;
        tracing::info!(
            user_id = %user_id,
            quiz_id = %quiz.id(),
            attempt_id = %attempt_id,
            score = score.score,
            passed = score.passed,
            "quiz attempt recorded"
        );

        let mut progress_synced = true;
        if let Some(lesson_id) = lesson_id {
            let row = LessonProgress::from_quiz_result(
                user_id,
                lesson_id,
                module_id,
                answers,
                score.score,
                score.passed,
                completed_at,
            );
            if let Err(err) = self.progress.upsert_lesson_progress(&row).await {
                tracing::warn!(
                    user_id = %user_id,
                    lesson_id = %lesson_id,
                    attempt_id = %attempt_id,
                    error = %err,
                    "lesson progress update failed after recording attempt"
                );
                progress_synced = false;
            }
        }

        if let Err(err) = self.aggregator.recompute(user_id, module_id).await {
            tracing::warn!(
                user_id = %user_id,
                module_id = %module_id,
                attempt_id = %attempt_id,
                error = %err,
                "module progress aggregation failed after recording attempt"
            );
            progress_synced = false;
        }

        Ok(RecordedAttempt {
            attempt_id,
            score: score.score,
            passed: score.passed,
            attempt: new_attempt.assign_id(attempt_id),
            progress_synced,
        })
    }
}
