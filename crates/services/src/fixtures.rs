//! Shared catalog for unit tests.

use finlit_core::model::{
    Difficulty, Lesson, LessonId, LessonKind, Module, ModuleId, QuestionId, Quiz, QuizId,
    QuizQuestion,
};
use storage::repository::Storage;

pub const MODULE: ModuleId = ModuleId::new(1);
pub const SECOND_MODULE: ModuleId = ModuleId::new(2);

pub const VIDEO_LESSON: LessonId = LessonId::new(1);
pub const TEXT_LESSON: LessonId = LessonId::new(2);
pub const QUIZ_LESSON: LessonId = LessonId::new(3);
pub const EMPTY_QUIZ_LESSON: LessonId = LessonId::new(10);
pub const DRAFT_QUIZ_LESSON: LessonId = LessonId::new(11);

pub const LESSON_QUIZ: QuizId = QuizId::new(1);
pub const MODULE_QUIZ: QuizId = QuizId::new(3);
pub const EMPTY_QUIZ: QuizId = QuizId::new(4);
pub const DRAFT_QUIZ: QuizId = QuizId::new(5);

fn question(id: &str, correct: usize) -> QuizQuestion {
    QuizQuestion::new(
        QuestionId::new(id).unwrap(),
        format!("Question {id}"),
        vec!["A".into(), "B".into(), "C".into()],
        correct,
        Some(format!("{id} explained")),
    )
    .unwrap()
}

fn lesson(id: LessonId, module: ModuleId, kind: LessonKind, order: u32, quiz: Option<QuizId>) -> Lesson {
    Lesson::new(id, module, format!("Lesson {}", id.value()), kind, order, quiz, 5).unwrap()
}

/// In-memory storage seeded with:
/// - module 1 (quiz 3): video 1, text 2, quiz lesson 3 (quiz 1), text 4
/// - module 2: quiz lesson 10 (empty quiz 4), quiz lesson 11 (quiz 5, unpublished after authoring)
/// - module 3: unpublished, no lessons
pub async fn storage() -> Storage {
    let storage = Storage::in_memory();
    let catalog = &storage.catalog;

    let lesson_quiz = Quiz::new(
        LESSON_QUIZ,
        "Budget check",
        vec![question("q1", 0), question("q2", 1), question("q3", 2)],
        None,
        Some(5),
        true,
    )
    .unwrap();
    let module_quiz = Quiz::new(
        MODULE_QUIZ,
        "Module final",
        vec![question("f1", 1), question("f2", 1)],
        Some(50),
        None,
        true,
    )
    .unwrap();
    let empty = Quiz::new(EMPTY_QUIZ, "Draft with no questions", vec![], None, None, true).unwrap();
    let draft = |published| {
        Quiz::new(DRAFT_QUIZ, "Withdrawn", vec![question("d1", 0)], None, None, published).unwrap()
    };
    for quiz in [lesson_quiz, module_quiz, empty, draft(true)] {
        catalog.upsert_quiz(&quiz).await.unwrap();
    }

    let first = Module::new(MODULE, "Budgeting", "budgeting", Difficulty::Beginner, 40, true)
        .unwrap()
        .with_quiz(MODULE_QUIZ);
    let second =
        Module::new(SECOND_MODULE, "Credit", "credit", Difficulty::Intermediate, 20, true).unwrap();
    let draft_module =
        Module::new(ModuleId::new(3), "Investing", "investing", Difficulty::Advanced, 60, false)
            .unwrap();
    for module in [first, second, draft_module] {
        catalog.upsert_module(&module).await.unwrap();
    }

    let lessons = [
        lesson(VIDEO_LESSON, MODULE, LessonKind::Video, 0, None),
        lesson(TEXT_LESSON, MODULE, LessonKind::Text, 1, None),
        lesson(QUIZ_LESSON, MODULE, LessonKind::Quiz, 2, Some(LESSON_QUIZ)),
        lesson(LessonId::new(4), MODULE, LessonKind::Text, 3, None),
        lesson(EMPTY_QUIZ_LESSON, SECOND_MODULE, LessonKind::Quiz, 0, Some(EMPTY_QUIZ)),
        lesson(DRAFT_QUIZ_LESSON, SECOND_MODULE, LessonKind::Quiz, 1, Some(DRAFT_QUIZ)),
    ];
    for lesson in &lessons {
        catalog.upsert_lesson(lesson).await.unwrap();
    }
    // withdrawn after its lesson was authored
    catalog.upsert_quiz(&draft(false)).await.unwrap();

    storage
}
