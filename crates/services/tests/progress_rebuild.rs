mod common;

use std::sync::Arc;

use async_trait::async_trait;
use finlit_core::model::{
    AttemptId, LessonId, LessonProgress, ModuleProgress, ModuleStatus, NewQuizAttempt,
    QuizAttempt, QuizId, UserId,
};
use finlit_core::time::fixed_now;
use serde_json::json;
use storage::repository::{AttemptRepository, Storage, StorageError};

use common::{CHECKPOINT, CHECKPOINT_QUIZ, INTRO_VIDEO, MODULE, READING, WRAP_UP};
use common::{engine_at, raw, seed};

const LESSONS: [LessonId; 4] = [INTRO_VIDEO, READING, CHECKPOINT, WRAP_UP];

async fn snapshot(storage: &Storage, user: UserId) -> (Vec<LessonProgress>, Option<ModuleProgress>) {
    let lessons = storage
        .progress
        .list_lesson_progress(user, &LESSONS)
        .await
        .unwrap();
    let module = storage.progress.get_module_progress(user, MODULE).await.unwrap();
    (lessons, module)
}

/// A realistic history: pass, fail, pass again, plus explicit completions.
async fn play_history(storage: &Storage, user: UserId) {
    engine_at(storage, 0).complete_lesson(user, INTRO_VIDEO).await.unwrap();

    for (minutes, answers) in [
        (10, json!({"q1": 0, "q2": 1, "q3": 2})),
        (20, json!({"q1": 2})),
        (30, json!({"q1": "0", "q2": "1", "q3": 2})),
    ] {
        let engine = engine_at(storage, minutes);
        let session = engine.start_quiz(user, CHECKPOINT).await.unwrap();
        engine.submit_quiz(&session, raw(answers)).await.unwrap();
    }

    engine_at(storage, 40).complete_lesson(user, READING).await.unwrap();
    engine_at(storage, 50).complete_lesson(user, READING).await.unwrap();

    let engine = engine_at(storage, 60);
    let session = engine.start_module_quiz(user, MODULE).await.unwrap();
    engine
        .submit_quiz(&session, raw(json!({"f1": 1, "f2": 1})))
        .await
        .unwrap();
}

async fn corrupt(storage: &Storage, user: UserId) {
    for lesson in [INTRO_VIDEO, READING, CHECKPOINT] {
        let mut row = LessonProgress::completed(user, lesson, MODULE, fixed_now());
        row.is_completed = false;
        row.quiz_score = Some(1);
        storage.progress.upsert_lesson_progress(&row).await.unwrap();
    }
    let stale =
        ModuleProgress::from_persisted(user, MODULE, 0, ModuleStatus::NotStarted, None, None)
            .unwrap();
    storage.progress.upsert_module_progress(&stale).await.unwrap();
}

async fn rebuild_matches_incremental(storage: Storage) {
    seed(&storage).await;
    let user = UserId::random();
    play_history(&storage, user).await;

    let incremental = snapshot(&storage, user).await;
    let module = incremental.1.clone().unwrap();
    assert_eq!(module.status, ModuleStatus::InProgress);
    assert_eq!(module.progress, 75);
    assert_eq!(module.quiz_score, Some(50));

    corrupt(&storage, user).await;
    assert_ne!(snapshot(&storage, user).await, incremental);

    let report = engine_at(&storage, 500).rebuild_progress(user).await.unwrap();
    assert_eq!(report.lessons_rebuilt, 3);
    assert_eq!(report.lessons_cleared, 0);
    assert_eq!(report.modules_reaggregated, vec![MODULE]);
    assert_eq!(snapshot(&storage, user).await, incremental);
}

#[tokio::test]
async fn in_memory_rebuild_reproduces_lesson_rows() {
    rebuild_matches_incremental(Storage::in_memory()).await;
}

#[tokio::test]
async fn sqlite_rebuild_reproduces_lesson_rows() {
    let storage = Storage::sqlite("sqlite:file:services_rebuild?mode=memory&cache=shared")
        .await
        .expect("sqlite storage");
    rebuild_matches_incremental(storage).await;
}

#[tokio::test]
async fn rebuild_without_corruption_is_a_no_op() {
    let storage = Storage::in_memory();
    seed(&storage).await;
    let user = UserId::random();
    play_history(&storage, user).await;

    let before = snapshot(&storage, user).await;
    engine_at(&storage, 999).rebuild_progress(user).await.unwrap();
    assert_eq!(snapshot(&storage, user).await, before);
}

async fn rows_without_history_are_cleared(storage: Storage) {
    seed(&storage).await;
    let user = UserId::random();
    engine_at(&storage, 0).complete_lesson(user, INTRO_VIDEO).await.unwrap();
    let incremental = snapshot(&storage, user).await;

    let phantom = LessonProgress::completed(user, WRAP_UP, MODULE, fixed_now());
    storage.progress.upsert_lesson_progress(&phantom).await.unwrap();
    let inflated =
        ModuleProgress::from_persisted(user, MODULE, 50, ModuleStatus::InProgress, None, None)
            .unwrap();
    storage.progress.upsert_module_progress(&inflated).await.unwrap();

    let report = engine_at(&storage, 10).rebuild_progress(user).await.unwrap();
    assert_eq!(report.lessons_rebuilt, 1);
    assert_eq!(report.lessons_cleared, 1);
    assert!(storage.progress.get_lesson_progress(user, WRAP_UP).await.unwrap().is_none());

    let module = storage.progress.get_module_progress(user, MODULE).await.unwrap().unwrap();
    assert_eq!((module.progress, module.status), (25, ModuleStatus::InProgress));
    assert_eq!(snapshot(&storage, user).await, incremental);
}

#[tokio::test]
async fn in_memory_rebuild_clears_rows_without_history() {
    rows_without_history_are_cleared(Storage::in_memory()).await;
}

#[tokio::test]
async fn sqlite_rebuild_clears_rows_without_history() {
    let storage = Storage::sqlite("sqlite:file:services_rebuild_phantom?mode=memory&cache=shared")
        .await
        .expect("sqlite storage");
    rows_without_history_are_cleared(storage).await;
}

#[tokio::test]
async fn stale_module_row_without_history_is_reset() {
    let storage = Storage::in_memory();
    seed(&storage).await;
    let user = UserId::random();
    let stale = ModuleProgress::from_persisted(
        user,
        MODULE,
        100,
        ModuleStatus::Completed,
        Some(90),
        Some(fixed_now()),
    )
    .unwrap();
    storage.progress.upsert_module_progress(&stale).await.unwrap();

    let report = engine_at(&storage, 0).rebuild_progress(user).await.unwrap();
    assert_eq!(report.lessons_rebuilt, 0);
    assert_eq!(report.modules_reaggregated, vec![MODULE]);

    let module = storage.progress.get_module_progress(user, MODULE).await.unwrap().unwrap();
    assert_eq!((module.progress, module.status), (0, ModuleStatus::NotStarted));
    assert_eq!(module.quiz_score, None);
    assert_eq!(module.completed_at, None);
}

/// Serves every attempt as a pre-scoring row: no stored score or pass flag.
struct LegacyAttempts {
    inner: Arc<dyn AttemptRepository>,
}

#[async_trait]
impl AttemptRepository for LegacyAttempts {
    async fn insert_attempt(&self, attempt: &NewQuizAttempt) -> Result<AttemptId, StorageError> {
        self.inner.insert_attempt(attempt).await
    }
    async fn get_attempt(&self, id: AttemptId) -> Result<Option<QuizAttempt>, StorageError> {
        self.inner.get_attempt(id).await
    }
    async fn list_attempts(
        &self,
        user_id: UserId,
        quiz_id: QuizId,
    ) -> Result<Vec<QuizAttempt>, StorageError> {
        self.inner.list_attempts(user_id, quiz_id).await
    }
    async fn list_user_attempts(&self, user_id: UserId) -> Result<Vec<QuizAttempt>, StorageError> {
        let mut attempts = self.inner.list_user_attempts(user_id).await?;
        for attempt in &mut attempts {
            attempt.score = None;
            attempt.passed = None;
        }
        Ok(attempts)
    }
}

#[tokio::test]
async fn legacy_attempts_without_scores_are_rescored() {
    let base = Storage::in_memory();
    seed(&base).await;
    let storage = Storage {
        attempts: Arc::new(LegacyAttempts {
            inner: Arc::clone(&base.attempts),
        }),
        ..base
    };
    let user = UserId::random();

    for (minutes, answers) in [
        (0, json!({"q1": "0", "q2": "1", "q3": "2"})),
        (5, json!({"q1": 0, "q2": 0})),
    ] {
        storage
            .attempts
            .insert_attempt(&NewQuizAttempt {
                user_id: user,
                quiz_id: CHECKPOINT_QUIZ,
                module_id: MODULE,
                lesson_id: Some(CHECKPOINT),
                answers: raw(answers),
                score: 0,
                passed: false,
                completed_at: fixed_now() + chrono::Duration::minutes(minutes),
            })
            .await
            .unwrap();
    }

    engine_at(&storage, 10).rebuild_progress(user).await.unwrap();
    let row = storage
        .progress
        .get_lesson_progress(user, CHECKPOINT)
        .await
        .unwrap()
        .unwrap();
    // the later attempt wins: 1 of 3 correct
    assert!(!row.is_completed);
    assert_eq!(row.quiz_score, Some(33));
    assert_eq!(row.quiz_answers.unwrap().len(), 2);
}
