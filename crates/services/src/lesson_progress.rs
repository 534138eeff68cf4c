use std::sync::Arc;

use finlit_core::Clock;
use finlit_core::model::{LessonCompletion, LessonId, LessonKind, LessonProgress, UserId};
use storage::repository::{CatalogRepository, ProgressRepository};

use crate::error::{EngineError, NotFoundError, ValidationError};
use crate::module_progress::ModuleProgressAggregator;

/// Explicit completion of video and text lessons.
///
/// Quiz lessons are driven by [`crate::attempts::AttemptRecorder`] instead.
#[derive(Clone)]
pub struct LessonProgressTracker {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    progress: Arc<dyn ProgressRepository>,
    aggregator: ModuleProgressAggregator,
}

impl LessonProgressTracker {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CatalogRepository>,
        progress: Arc<dyn ProgressRepository>,
        aggregator: ModuleProgressAggregator,
    ) -> Self {
        Self {
            clock,
            catalog,
            progress,
            aggregator,
        }
    }

    /// Mark a non-quiz lesson completed.
    ///
    /// Appends to the completion log, then replaces the lesson's progress row.
    /// Completing an already-completed lesson is allowed and refreshes
    /// `completed_at`. Module aggregation afterwards is best-effort.
    ///
    /// # Errors
    ///
    /// Returns `NotFoundError::Lesson` for an unknown lesson,
    /// `ValidationError::QuizLessonRequiresAttempt` for a quiz lesson, and a
    /// persistence error if the log append or the upsert fails.
    pub async fn complete_lesson(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<LessonProgress, EngineError> {
        let lesson = self
            .catalog
            .get_lesson(lesson_id)
            .await?
            .ok_or(NotFoundError::Lesson(lesson_id))?;
        if lesson.kind() == LessonKind::Quiz {
            return Err(ValidationError::QuizLessonRequiresAttempt(lesson_id).into());
        }

        let now = self.clock.now();
        let completion = LessonCompletion {
            user_id,
            lesson_id,
            module_id: lesson.module_id(),
            completed_at: now,
        };
        self.progress.append_lesson_completion(&completion).await?;

        let row = LessonProgress::completed(user_id, lesson_id, lesson.module_id(), now);
        self.progress.upsert_lesson_progress(&row).await?;
        tracing::info!(user_id = %user_id, lesson_id = %lesson_id, "lesson completed");

        if let Err(err) = self.aggregator.recompute(user_id, lesson.module_id()).await {
            tracing::warn!(
                user_id = %user_id,
                module_id = %lesson.module_id(),
                error = %err,
                "module progress aggregation failed after lesson completion"
            );
        }
        Ok(row)
    }

    /// Current progress row, if the user has touched the lesson.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the read fails.
    pub async fn get(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, EngineError> {
        Ok(self.progress.get_lesson_progress(user_id, lesson_id).await?)
    }
}
