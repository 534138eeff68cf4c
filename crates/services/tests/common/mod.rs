#![allow(dead_code)]

use chrono::Duration;
use finlit_core::Clock;
use finlit_core::answers::RawAnswers;
use finlit_core::model::{
    Difficulty, Lesson, LessonId, LessonKind, Module, ModuleId, QuestionId, Quiz, QuizId,
    QuizQuestion,
};
use finlit_core::time::fixed_now;
use services::LearningEngine;
use storage::repository::Storage;

pub const MODULE: ModuleId = ModuleId::new(1);
pub const INTRO_VIDEO: LessonId = LessonId::new(1);
pub const READING: LessonId = LessonId::new(2);
pub const CHECKPOINT: LessonId = LessonId::new(3);
pub const WRAP_UP: LessonId = LessonId::new(4);
pub const CHECKPOINT_QUIZ: QuizId = QuizId::new(1);
pub const FINAL_QUIZ: QuizId = QuizId::new(2);

pub fn raw(value: serde_json::Value) -> RawAnswers {
    value.as_object().cloned().unwrap_or_default()
}

fn question(id: &str, text: &str, options: [&str; 3], correct: usize) -> QuizQuestion {
    QuizQuestion::new(
        QuestionId::new(id).unwrap(),
        text,
        options.iter().map(|o| (*o).to_owned()).collect(),
        correct,
        None,
    )
    .unwrap()
}

/// One published module: video, reading, checkpoint quiz lesson, wrap-up reading,
/// plus a module-level final quiz.
pub async fn seed(storage: &Storage) {
    let checkpoint = Quiz::new(
        CHECKPOINT_QUIZ,
        "Budget checkpoint",
        vec![
            question("q1", "A budget is a...", ["plan", "loan", "tax"], 0),
            question("q2", "Needs include...", ["concerts", "rent", "gadgets"], 1),
            question("q3", "Pay yourself first means...", ["spend", "borrow", "save"], 2),
        ],
        None,
        Some(5),
        true,
    )
    .unwrap();
    let final_quiz = Quiz::new(
        FINAL_QUIZ,
        "Budgeting final",
        vec![
            question("f1", "An emergency fund covers...", ["vacations", "surprises", "rent"], 1),
            question("f2", "Track spending to...", ["find leaks", "pay more", "borrow"], 0),
        ],
        Some(50),
        None,
        true,
    )
    .unwrap();
    storage.catalog.upsert_quiz(&checkpoint).await.unwrap();
    storage.catalog.upsert_quiz(&final_quiz).await.unwrap();

    let module = Module::new(MODULE, "Budgeting", "budgeting", Difficulty::Beginner, 35, true)
        .unwrap()
        .with_quiz(FINAL_QUIZ);
    storage.catalog.upsert_module(&module).await.unwrap();

    let lessons = [
        (INTRO_VIDEO, LessonKind::Video, None),
        (READING, LessonKind::Text, None),
        (CHECKPOINT, LessonKind::Quiz, Some(CHECKPOINT_QUIZ)),
        (WRAP_UP, LessonKind::Text, None),
    ];
    for (order, (id, kind, quiz)) in (0_u32..).zip(lessons) {
        let lesson = Lesson::new(id, MODULE, format!("Lesson {id}"), kind, order, quiz, 8).unwrap();
        storage.catalog.upsert_lesson(&lesson).await.unwrap();
    }
}

/// An engine over `storage` whose clock reads `minutes` after the fixed epoch.
pub fn engine_at(storage: &Storage, minutes: i64) -> LearningEngine {
    LearningEngine::new(
        storage,
        Clock::fixed(fixed_now()).advanced(Duration::minutes(minutes)),
    )
}
