use chrono::{DateTime, Duration, Utc};

use finlit_core::model::{LessonId, ModuleId, Quiz, UserId};

/// One in-flight quiz, from start to submission.
///
/// Holds a snapshot of the quiz taken when the session started, so scoring and
/// review use exactly the questions the user saw.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizSession {
    user_id: UserId,
    quiz: Quiz,
    module_id: ModuleId,
    lesson_id: Option<LessonId>,
    started_at: DateTime<Utc>,
}

impl QuizSession {
    #[must_use]
    pub fn new(
        user_id: UserId,
        quiz: Quiz,
        module_id: ModuleId,
        lesson_id: Option<LessonId>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            quiz,
            module_id,
            lesson_id,
            started_at,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    #[must_use]
    pub fn module_id(&self) -> ModuleId {
        self.module_id
    }

    /// `None` for a module-level quiz.
    #[must_use]
    pub fn lesson_id(&self) -> Option<LessonId> {
        self.lesson_id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// When the quiz's time limit runs out. Advisory only: late submissions
    /// are recorded and scored like any other.
    #[must_use]
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.quiz
            .time_limit_minutes()
            .map(|m| self.started_at + Duration::minutes(i64::from(m)))
    }

    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.deadline().is_some_and(|d| now > d)
    }
}
