use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::answers::RawAnswers;
use crate::model::ids::{AttemptId, LessonId, ModuleId, QuizId, UserId};

/// Attempt as written by the recorder, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewQuizAttempt {
    pub user_id: UserId,
    pub quiz_id: QuizId,
    pub module_id: ModuleId,
    pub lesson_id: Option<LessonId>,
    pub answers: RawAnswers,
    pub score: u8,
    pub passed: bool,
    pub completed_at: DateTime<Utc>,
}

impl NewQuizAttempt {
    #[must_use]
    pub fn assign_id(self, id: AttemptId) -> QuizAttempt {
        QuizAttempt {
            id,
            user_id: self.user_id,
            quiz_id: self.quiz_id,
            module_id: self.module_id,
            lesson_id: self.lesson_id,
            answers: self.answers,
            score: Some(self.score),
            passed: Some(self.passed),
            completed_at: self.completed_at,
        }
    }
}

/// One immutable historical submission.
///
/// `score` and `passed` are optional because rows written before scores were
/// persisted (or partially written) still need to be reviewable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: AttemptId,
    pub user_id: UserId,
    pub quiz_id: QuizId,
    pub module_id: ModuleId,
    pub lesson_id: Option<LessonId>,
    pub answers: RawAnswers,
    pub score: Option<u8>,
    pub passed: Option<bool>,
    pub completed_at: DateTime<Utc>,
}

/// Display order for attempt lists: most recent first, later ids first on ties.
pub fn sort_most_recent_first(attempts: &mut [QuizAttempt]) {
    attempts.sort_by(|a, b| {
        b.completed_at
            .cmp(&a.completed_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn attempt(id: u64, minutes: i64) -> QuizAttempt {
        NewQuizAttempt {
            user_id: UserId::random(),
            quiz_id: QuizId::new(1),
            module_id: ModuleId::new(1),
            lesson_id: None,
            answers: RawAnswers::new(),
            score: 50,
            passed: false,
            completed_at: fixed_now() + Duration::minutes(minutes),
        }
        .assign_id(AttemptId::new(id))
    }

    #[test]
    fn assigned_attempt_carries_score() {
        let a = attempt(7, 0);
        assert_eq!(a.id, AttemptId::new(7));
        assert_eq!(a.score, Some(50));
        assert_eq!(a.passed, Some(false));
    }

    #[test]
    fn most_recent_first_breaks_ties_by_id() {
        let mut attempts = vec![attempt(1, 0), attempt(2, 10), attempt(3, 10)];
        sort_most_recent_first(&mut attempts);
        let ids: Vec<u64> = attempts.iter().map(|a| a.id.value()).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }
}
