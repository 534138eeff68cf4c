//! Module progress as a pure fold over lesson progress.
//!
//! Recomputed from scratch every time, never incremented, so it can be re-run
//! after any lesson change or to repair a stale cached row.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::model::{Lesson, LessonId, LessonProgress, ModuleId, ModuleProgress, ModuleStatus, UserId};
use crate::scoring::rounded_percentage;

/// Derive the status from completed and total lesson counts.
#[must_use]
pub fn module_status(completed: usize, total: usize) -> ModuleStatus {
    if total == 0 || completed == 0 {
        ModuleStatus::NotStarted
    } else if completed < total {
        ModuleStatus::InProgress
    } else {
        ModuleStatus::Completed
    }
}

/// Fold the module's lessons and the user's lesson progress into a `ModuleProgress`.
///
/// Progress rows for lessons outside `lessons` are ignored. When the module is
/// complete, `completed_at` is the latest lesson completion time, falling back
/// to `now` only if no lesson row carries a timestamp.
#[must_use]
pub fn aggregate_module(
    user_id: UserId,
    module_id: ModuleId,
    lessons: &[Lesson],
    progress: &[LessonProgress],
    quiz_score: Option<u8>,
    now: DateTime<Utc>,
) -> ModuleProgress {
    let by_lesson: HashMap<LessonId, &LessonProgress> = progress
        .iter()
        .filter(|p| p.user_id == user_id)
        .map(|p| (p.lesson_id, p))
        .collect();

    let completed: Vec<&LessonProgress> = lessons
        .iter()
        .filter_map(|l| by_lesson.get(&l.id()).copied())
        .filter(|p| p.is_completed)
        .collect();

    let total = lessons.len();
    let status = module_status(completed.len(), total);
    let completed_at = (status == ModuleStatus::Completed).then(|| {
        completed
            .iter()
            .filter_map(|p| p.completed_at)
            .max()
            .unwrap_or(now)
    });

    ModuleProgress {
        user_id,
        module_id,
        progress: rounded_percentage(completed.len(), total),
        status,
        quiz_score,
        completed_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LessonKind;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn lessons(n: u64) -> Vec<Lesson> {
        (1..=n)
            .map(|i| {
                Lesson::new(
                    LessonId::new(i),
                    ModuleId::new(1),
                    format!("Lesson {i}"),
                    LessonKind::Video,
                    u32::try_from(i).unwrap(),
                    None,
                    10,
                )
                .unwrap()
            })
            .collect()
    }

    fn done(user: UserId, lesson: u64, minutes: i64) -> LessonProgress {
        LessonProgress::completed(
            user,
            LessonId::new(lesson),
            ModuleId::new(1),
            fixed_now() + Duration::minutes(minutes),
        )
    }

    #[test]
    fn status_boundaries_for_four_lessons() {
        let user = UserId::random();
        let all = lessons(4);

        let none = aggregate_module(user, ModuleId::new(1), &all, &[], None, fixed_now());
        assert_eq!((none.progress, none.status), (0, ModuleStatus::NotStarted));
        assert_eq!(none.completed_at, None);

        let half = [done(user, 1, 0), done(user, 2, 1)];
        let half = aggregate_module(user, ModuleId::new(1), &all, &half, None, fixed_now());
        assert_eq!((half.progress, half.status), (50, ModuleStatus::InProgress));
        assert_eq!(half.completed_at, None);

        let full: Vec<_> = (1..=4).map(|i| done(user, i, i as i64)).collect();
        let full = aggregate_module(user, ModuleId::new(1), &all, &full, None, fixed_now());
        assert_eq!((full.progress, full.status), (100, ModuleStatus::Completed));
        assert_eq!(full.completed_at, Some(fixed_now() + Duration::minutes(4)));
    }

    #[test]
    fn empty_module_is_not_started() {
        let user = UserId::random();
        let p = aggregate_module(user, ModuleId::new(1), &[], &[], None, fixed_now());
        assert_eq!(p.progress, 0);
        assert_eq!(p.status, ModuleStatus::NotStarted);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let user = UserId::random();
        let all = lessons(3);
        let rows = [done(user, 1, 0), done(user, 3, 5)];
        let first = aggregate_module(user, ModuleId::new(1), &all, &rows, Some(90), fixed_now());
        let second = aggregate_module(
            user,
            ModuleId::new(1),
            &all,
            &rows,
            Some(90),
            fixed_now() + Duration::days(3),
        );
        assert_eq!(first, second);
    }

    #[test]
    fn incomplete_and_foreign_rows_do_not_count() {
        let user = UserId::random();
        let other = UserId::random();
        let all = lessons(2);
        let mut failed = done(user, 1, 0);
        failed.is_completed = false;
        let rows = [failed, done(other, 2, 0), done(user, 99, 0)];
        let p = aggregate_module(user, ModuleId::new(1), &all, &rows, None, fixed_now());
        assert_eq!(p.progress, 0);
        assert_eq!(p.status, ModuleStatus::NotStarted);
    }
}
