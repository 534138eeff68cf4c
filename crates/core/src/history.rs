//! Rebuilding lesson progress from the durable history.
//!
//! Quiz attempts and explicit lesson completions are the source of truth.
//! Replaying them in time order through the same transitions the live tracker
//! uses yields the lesson progress rows the store should hold.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::answers::normalize;
use crate::model::{LessonCompletion, LessonId, LessonProgress, QuizAttempt, UserId};

/// One replayable progress-changing event.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    LessonCompleted(LessonCompletion),
    QuizAttempted(QuizAttempt),
}

impl ProgressEvent {
    #[must_use]
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            ProgressEvent::LessonCompleted(c) => c.completed_at,
            ProgressEvent::QuizAttempted(a) => a.completed_at,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        match self {
            ProgressEvent::LessonCompleted(c) => c.user_id,
            ProgressEvent::QuizAttempted(a) => a.user_id,
        }
    }

    #[must_use]
    pub fn lesson_id(&self) -> Option<LessonId> {
        match self {
            ProgressEvent::LessonCompleted(c) => Some(c.lesson_id),
            ProgressEvent::QuizAttempted(a) => a.lesson_id,
        }
    }
}

/// Merge completions and attempts into a single time-ordered log.
///
/// Ties keep the input order of each source, with completions first; attempts
/// are additionally ordered by id so duplicate submissions replay deterministically.
#[must_use]
pub fn merge_events(
    completions: Vec<LessonCompletion>,
    mut attempts: Vec<QuizAttempt>,
) -> Vec<ProgressEvent> {
    attempts.sort_by(|a, b| a.completed_at.cmp(&b.completed_at).then(a.id.cmp(&b.id)));
    let mut events: Vec<ProgressEvent> = completions
        .into_iter()
        .map(ProgressEvent::LessonCompleted)
        .chain(attempts.into_iter().map(ProgressEvent::QuizAttempted))
        .collect();
    // stable: equal timestamps keep the chain order above
    events.sort_by_key(ProgressEvent::at);
    events
}

/// Replay `events` (already in time order) into one row per lesson.
///
/// Last write wins per lesson, mirroring the store's full-replace upsert.
/// Attempts without a lesson context (module-level quizzes) do not touch lesson
/// progress. An attempt row missing its stored score is rescored with
/// `rescore`, which receives the attempt and returns `(score, passed)`.
#[must_use]
pub fn rebuild_lesson_progress<F>(
    events: &[ProgressEvent],
    mut rescore: F,
) -> BTreeMap<LessonId, LessonProgress>
where
    F: FnMut(&QuizAttempt) -> (u8, bool),
{
    let mut rows = BTreeMap::new();
    for event in events {
        match event {
            ProgressEvent::LessonCompleted(c) => {
                rows.insert(
                    c.lesson_id,
                    LessonProgress::completed(c.user_id, c.lesson_id, c.module_id, c.completed_at),
                );
            }
            ProgressEvent::QuizAttempted(a) => {
                let Some(lesson_id) = a.lesson_id else {
                    continue;
                };
                let (score, passed) = match (a.score, a.passed) {
                    (Some(score), Some(passed)) => (score, passed),
                    _ => rescore(a),
                };
                rows.insert(
                    lesson_id,
                    LessonProgress::from_quiz_result(
                        a.user_id,
                        lesson_id,
                        a.module_id,
                        normalize(&a.answers),
                        score,
                        passed,
                        a.completed_at,
                    ),
                );
            }
        }
    }
    rows
}
