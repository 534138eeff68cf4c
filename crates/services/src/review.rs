use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use finlit_core::answers::normalize;
use finlit_core::model::{AttemptId, Quiz, QuizAttempt, QuizId, UserId};
use finlit_core::review::{AttemptReview, reconstruct};
use finlit_core::scoring::score_quiz;
use storage::repository::{AttemptRepository, CatalogRepository};

use crate::error::{EngineError, NotFoundError, ValidationError};

/// One row of a user's attempt history for a quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptListItem {
    pub id: AttemptId,
    pub score: Option<u8>,
    pub passed: Option<bool>,
    pub completed_at: DateTime<Utc>,
}

/// Read side of the attempt history.
#[derive(Clone)]
pub struct AttemptReviewer {
    catalog: Arc<dyn CatalogRepository>,
    attempts: Arc<dyn AttemptRepository>,
}

impl AttemptReviewer {
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogRepository>, attempts: Arc<dyn AttemptRepository>) -> Self {
        Self { catalog, attempts }
    }

    /// Rebuild the per-question review of a stored attempt.
    ///
    /// The quiz is looked up regardless of publish state so history stays
    /// reviewable after a quiz is retired.
    ///
    /// # Errors
    ///
    /// Returns `NotFoundError::Attempt` or `NotFoundError::Quiz` for missing
    /// rows, and `ValidationError::NoQuestions` if the score must be
    /// recomputed against a quiz that no longer has questions.
    pub async fn review_attempt(&self, attempt_id: AttemptId) -> Result<AttemptReview, EngineError> {
        let attempt = self
            .attempts
            .get_attempt(attempt_id)
            .await?
            .ok_or(NotFoundError::Attempt(attempt_id))?;
        let quiz = self
            .catalog
            .get_quiz(attempt.quiz_id)
            .await?
            .ok_or(NotFoundError::Quiz(attempt.quiz_id))?;

        let review = reconstruct(&attempt, &quiz)
            .map_err(|_| ValidationError::NoQuestions(quiz.id()))?;
        tracing::debug!(
            attempt_id = %attempt_id,
            score_source = ?review.score_source,
            "attempt reconstructed"
        );
        Ok(review)
    }

    /// The user's attempts on a quiz, most recent first.
    ///
    /// Historical rows without a stored score are scored on the fly when the
    /// quiz is still available; otherwise their score stays `None`.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if a read fails.
    pub async fn attempt_history(
        &self,
        user_id: UserId,
        quiz_id: QuizId,
    ) -> Result<Vec<AttemptListItem>, EngineError> {
        let attempts = self.attempts.list_attempts(user_id, quiz_id).await?;
        let quiz = if attempts.iter().any(|a| a.score.is_none()) {
            self.catalog.get_quiz(quiz_id).await?
        } else {
            None
        };

        Ok(attempts
            .iter()
            .map(|attempt| {
                let (score, passed) = match (attempt.score, &quiz) {
                    (Some(score), _) => (Some(score), attempt.passed),
                    (None, Some(quiz)) => rescore(attempt, quiz),
                    (None, None) => (None, attempt.passed),
                };
                AttemptListItem {
                    id: attempt.id,
                    score,
                    passed,
                    completed_at: attempt.completed_at,
                }
            })
            .collect())
    }
}

fn rescore(attempt: &QuizAttempt, quiz: &Quiz) -> (Option<u8>, Option<bool>) {
    match score_quiz(quiz.questions(), &normalize(&attempt.answers), quiz.passing_score()) {
        Ok(s) => (Some(s.score), Some(attempt.passed.unwrap_or(s.passed))),
        Err(_) => (None, attempt.passed),
    }
}
