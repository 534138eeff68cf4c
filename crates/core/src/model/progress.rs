use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::answers::AnswerSet;
use crate::model::ids::{LessonId, ModuleId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("invalid module status: {0}")]
    InvalidStatus(String),

    #[error("module progress must be between 0 and 100, got {0}")]
    InvalidPercentage(u8),
}

//
// ─── LESSON PROGRESS ───────────────────────────────────────────────────────────
//

/// Per-(user, lesson) completion state. At most one row exists per pair.
///
/// This is a cache over quiz attempts and lesson-completion events; it can
/// always be rebuilt from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonProgress {
    pub user_id: UserId,
    pub lesson_id: LessonId,
    pub module_id: ModuleId,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub quiz_answers: Option<AnswerSet>,
    pub quiz_score: Option<u8>,
}

impl LessonProgress {
    /// State after an explicit completion of a video or text lesson.
    #[must_use]
    pub fn completed(
        user_id: UserId,
        lesson_id: LessonId,
        module_id: ModuleId,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            lesson_id,
            module_id,
            is_completed: true,
            completed_at: Some(at),
            quiz_answers: None,
            quiz_score: None,
        }
    }

    /// State after a quiz attempt on this lesson.
    ///
    /// `is_completed` mirrors `passed`, so a failing retake clears a previous
    /// completion.
    #[must_use]
    pub fn from_quiz_result(
        user_id: UserId,
        lesson_id: LessonId,
        module_id: ModuleId,
        answers: AnswerSet,
        score: u8,
        passed: bool,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            lesson_id,
            module_id,
            is_completed: passed,
            completed_at: passed.then_some(at),
            quiz_answers: Some(answers),
            quiz_score: Some(score),
        }
    }
}

/// A logged explicit completion of a non-quiz lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonCompletion {
    pub user_id: UserId,
    pub lesson_id: LessonId,
    pub module_id: ModuleId,
    pub completed_at: DateTime<Utc>,
}

//
// ─── MODULE PROGRESS ───────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModuleStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl ModuleStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ModuleStatus::NotStarted => "not-started",
            ModuleStatus::InProgress => "in-progress",
            ModuleStatus::Completed => "completed",
        }
    }

    /// # Errors
    ///
    /// Returns `ProgressError::InvalidStatus` for unrecognized values.
    pub fn parse(value: &str) -> Result<Self, ProgressError> {
        match value {
            "not-started" => Ok(ModuleStatus::NotStarted),
            "in-progress" => Ok(ModuleStatus::InProgress),
            "completed" => Ok(ModuleStatus::Completed),
            other => Err(ProgressError::InvalidStatus(other.to_owned())),
        }
    }
}

impl std::fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-(user, module) rolled-up progress. Derived; see [`crate::aggregate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleProgress {
    pub user_id: UserId,
    pub module_id: ModuleId,
    pub progress: u8,
    pub status: ModuleStatus,
    pub quiz_score: Option<u8>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ModuleProgress {
    /// Rehydrate a row read back from storage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidPercentage` when `progress` exceeds 100.
    pub fn from_persisted(
        user_id: UserId,
        module_id: ModuleId,
        progress: u8,
        status: ModuleStatus,
        quiz_score: Option<u8>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, ProgressError> {
        if progress > 100 {
            return Err(ProgressError::InvalidPercentage(progress));
        }
        Ok(Self {
            user_id,
            module_id,
            progress,
            status,
            quiz_score,
            completed_at,
        })
    }

    #[must_use]
    pub fn summary(&self) -> ModuleProgressSummary {
        ModuleProgressSummary {
            percentage: self.progress,
            status: self.status,
        }
    }
}

/// The `{percentage, status}` pair shown next to a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleProgressSummary {
    pub percentage: u8,
    pub status: ModuleStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn failed_quiz_result_is_not_completed() {
        let p = LessonProgress::from_quiz_result(
            UserId::random(),
            LessonId::new(1),
            ModuleId::new(1),
            AnswerSet::new(),
            40,
            false,
            fixed_now(),
        );
        assert!(!p.is_completed);
        assert_eq!(p.completed_at, None);
        assert_eq!(p.quiz_score, Some(40));
    }

    #[test]
    fn status_uses_kebab_case_everywhere() {
        for status in [
            ModuleStatus::NotStarted,
            ModuleStatus::InProgress,
            ModuleStatus::Completed,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            assert_eq!(ModuleStatus::parse(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn persisted_progress_rejects_over_one_hundred() {
        let err = ModuleProgress::from_persisted(
            UserId::random(),
            ModuleId::new(1),
            101,
            ModuleStatus::Completed,
            None,
            None,
        )
        .unwrap_err();
        assert_eq!(err, ProgressError::InvalidPercentage(101));
    }
}
