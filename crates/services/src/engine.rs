use std::sync::Arc;

use finlit_core::Clock;
use finlit_core::answers::RawAnswers;
use finlit_core::model::{
    AttemptId, LessonId, LessonProgress, ModuleId, ModuleProgressSummary, Quiz, QuizId, UserId,
};
use finlit_core::review::{AttemptReview, reconstruct};
use storage::repository::{CatalogRepository, Storage};

use crate::attempts::AttemptRecorder;
use crate::error::{EngineError, NotFoundError, ValidationError};
use crate::lesson_progress::LessonProgressTracker;
use crate::module_progress::{ModuleOverview, ModuleProgressAggregator};
use crate::rebuild::{ProgressRebuilder, RebuildReport};
use crate::review::{AttemptListItem, AttemptReviewer};
use crate::session::QuizSession;

/// Result of submitting a quiz session.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizSubmission {
    pub attempt_id: AttemptId,
    pub score: u8,
    pub passed: bool,
    pub review: AttemptReview,
    pub progress_synced: bool,
}

/// UI-facing entry point: assembles the engine services over one `Storage`.
#[derive(Clone)]
pub struct LearningEngine {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    recorder: AttemptRecorder,
    tracker: LessonProgressTracker,
    aggregator: ModuleProgressAggregator,
    reviewer: AttemptReviewer,
    rebuilder: ProgressRebuilder,
}

impl LearningEngine {
    #[must_use]
    pub fn new(storage: &Storage, clock: Clock) -> Self {
        let aggregator = ModuleProgressAggregator::new(
            clock,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.attempts),
            Arc::clone(&storage.progress),
        );
        let recorder = AttemptRecorder::new(
            Arc::clone(&storage.attempts),
            Arc::clone(&storage.progress),
            aggregator.clone(),
        );
        let tracker = LessonProgressTracker::new(
            clock,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.progress),
            aggregator.clone(),
        );
        let reviewer =
            AttemptReviewer::new(Arc::clone(&storage.catalog), Arc::clone(&storage.attempts));
        let rebuilder = ProgressRebuilder::new(
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.attempts),
            Arc::clone(&storage.progress),
            aggregator.clone(),
        );

        Self {
            clock,
            catalog: Arc::clone(&storage.catalog),
            recorder,
            tracker,
            aggregator,
            reviewer,
            rebuilder,
        }
    }

    /// Start the quiz attached to a lesson.
    ///
    /// # Errors
    ///
    /// Returns `NotFoundError::Lesson` or `NotFoundError::Quiz` (missing or
    /// unpublished), `ValidationError::LessonHasNoQuiz`, or
    /// `ValidationError::NoQuestions` for a quiz without questions.
    pub async fn start_quiz(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<QuizSession, EngineError> {
        let lesson = self
            .catalog
            .get_lesson(lesson_id)
            .await?
            .ok_or(NotFoundError::Lesson(lesson_id))?;
        let quiz_id = lesson
            .quiz_id()
            .ok_or(ValidationError::LessonHasNoQuiz(lesson_id))?;
        let quiz = self.attemptable_quiz(quiz_id).await?;
        Ok(QuizSession::new(
            user_id,
            quiz,
            lesson.module_id(),
            Some(lesson_id),
            self.clock.now(),
        ))
    }

    /// Start a module's final quiz. Attempts carry no lesson context.
    ///
    /// # Errors
    ///
    /// Returns `NotFoundError::Module` or `NotFoundError::Quiz`,
    /// `ValidationError::ModuleHasNoQuiz`, or `ValidationError::NoQuestions`.
    pub async fn start_module_quiz(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<QuizSession, EngineError> {
        let module = self
            .catalog
            .get_module(module_id)
            .await?
            .ok_or(NotFoundError::Module(module_id))?;
        let quiz_id = module
            .quiz_id()
            .ok_or(ValidationError::ModuleHasNoQuiz(module_id))?;
        let quiz = self.attemptable_quiz(quiz_id).await?;
        Ok(QuizSession::new(user_id, quiz, module_id, None, self.clock.now()))
    }

    /// Score, record and review a session's answers.
    ///
    /// Submissions after the session's deadline are accepted and scored the
    /// same way.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Validation` for an ungradable submission and
    /// `EngineError::Persistence` if the attempt cannot be stored.
    pub async fn submit_quiz(
        &self,
        session: &QuizSession,
        answers: RawAnswers,
    ) -> Result<QuizSubmission, EngineError> {
        let quiz = session.quiz();
        let now = self.clock.now();
        if session.is_overdue(now) {
            tracing::debug!(
                user_id = %session.user_id(),
                quiz_id = %quiz.id(),
                "quiz submitted after its time limit"
            );
        }

        let recorded = self
            .recorder
            .record_attempt(
                session.user_id(),
                quiz,
                session.module_id(),
                session.lesson_id(),
                &answers,
                now,
            )
            .await?;
        let review = reconstruct(&recorded.attempt, quiz)
            .map_err(|_| ValidationError::NoQuestions(quiz.id()))?;

        Ok(QuizSubmission {
            attempt_id: recorded.attempt_id,
            score: recorded.score,
            passed: recorded.passed,
            review,
            progress_synced: recorded.progress_synced,
        })
    }

    /// # Errors
    ///
    /// Returns `NotFoundError::Module` or a persistence error.
    pub async fn module_progress_summary(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<ModuleProgressSummary, EngineError> {
        self.aggregator.summary(user_id, module_id).await
    }

    /// # Errors
    ///
    /// See [`AttemptReviewer::review_attempt`].
    pub async fn review_attempt(&self, attempt_id: AttemptId) -> Result<AttemptReview, EngineError> {
        self.reviewer.review_attempt(attempt_id).await
    }

    /// # Errors
    ///
    /// See [`LessonProgressTracker::complete_lesson`].
    pub async fn complete_lesson(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<LessonProgress, EngineError> {
        self.tracker.complete_lesson(user_id, lesson_id).await
    }

    /// # Errors
    ///
    /// Returns a persistence error if a read fails.
    pub async fn list_module_overviews(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ModuleOverview>, EngineError> {
        self.aggregator.overviews(user_id).await
    }

    /// # Errors
    ///
    /// Returns a persistence error if a read fails.
    pub async fn attempt_history(
        &self,
        user_id: UserId,
        quiz_id: QuizId,
    ) -> Result<Vec<AttemptListItem>, EngineError> {
        self.reviewer.attempt_history(user_id, quiz_id).await
    }

    /// # Errors
    ///
    /// Returns a persistence error if the read fails.
    pub async fn lesson_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, EngineError> {
        self.tracker.get(user_id, lesson_id).await
    }

    /// # Errors
    ///
    /// See [`ProgressRebuilder::rebuild`].
    pub async fn rebuild_progress(&self, user_id: UserId) -> Result<RebuildReport, EngineError> {
        self.rebuilder.rebuild(user_id).await
    }

    async fn attemptable_quiz(&self, quiz_id: QuizId) -> Result<Quiz, EngineError> {
        let quiz = self
            .catalog
            .get_published_quiz(quiz_id)
            .await?
            .ok_or(NotFoundError::Quiz(quiz_id))?;
        if quiz.questions().is_empty() {
            return Err(ValidationError::NoQuestions(quiz_id).into());
        }
        Ok(quiz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{
        self, DRAFT_QUIZ_LESSON, EMPTY_QUIZ, EMPTY_QUIZ_LESSON, MODULE, QUIZ_LESSON,
        SECOND_MODULE, VIDEO_LESSON,
    };
    use finlit_core::time::fixed_now;

    async fn engine() -> LearningEngine {
        LearningEngine::new(&fixtures::storage().await, Clock::fixed(fixed_now()))
    }

    #[tokio::test]
    async fn start_quiz_snapshots_lesson_context() {
        let engine = engine().await;
        let user = UserId::random();
        let session = engine.start_quiz(user, QUIZ_LESSON).await.unwrap();
        assert_eq!(session.user_id(), user);
        assert_eq!(session.module_id(), MODULE);
        assert_eq!(session.lesson_id(), Some(QUIZ_LESSON));
        assert_eq!(session.quiz().questions().len(), 3);
        assert_eq!(session.started_at(), fixed_now());
    }

    #[tokio::test]
    async fn zero_question_quiz_cannot_start() {
        let engine = engine().await;
        let err = engine
            .start_quiz(UserId::random(), EMPTY_QUIZ_LESSON)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::NoQuestions(id)) if id == EMPTY_QUIZ
        ));
    }

    #[tokio::test]
    async fn zero_question_session_cannot_submit() {
        let engine = engine().await;
        let empty = Quiz::new(EMPTY_QUIZ, "Empty", vec![], None, None, true).unwrap();
        let session = QuizSession::new(UserId::random(), empty, SECOND_MODULE, None, fixed_now());
        let err = engine
            .submit_quiz(&session, RawAnswers::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::NoQuestions(_))
        ));
    }

    #[tokio::test]
    async fn unpublished_quiz_is_not_found() {
        let engine = engine().await;
        let err = engine
            .start_quiz(UserId::random(), DRAFT_QUIZ_LESSON)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(NotFoundError::Quiz(_))));
    }

    #[tokio::test]
    async fn lesson_without_quiz_and_module_without_quiz_are_rejected() {
        let engine = engine().await;
        let user = UserId::random();
        assert!(matches!(
            engine.start_quiz(user, VIDEO_LESSON).await.unwrap_err(),
            EngineError::Validation(ValidationError::LessonHasNoQuiz(_))
        ));
        assert!(matches!(
            engine.start_module_quiz(user, SECOND_MODULE).await.unwrap_err(),
            EngineError::Validation(ValidationError::ModuleHasNoQuiz(_))
        ));
    }
}
