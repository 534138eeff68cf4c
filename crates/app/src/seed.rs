use finlit_core::model::{
    Difficulty, Lesson, LessonId, LessonKind, Module, ModuleId, QuestionId, Quiz, QuizId,
    QuizQuestion,
};
use storage::repository::Storage;

pub const BUDGETING: ModuleId = ModuleId::new(1);
pub const CHECKPOINT_QUIZ: QuizId = QuizId::new(1);
pub const BUDGETING_FINAL: QuizId = QuizId::new(2);

/// The demo catalog written by `finlit seed`.
#[derive(Debug, Clone)]
pub struct DemoCatalog {
    pub quizzes: Vec<Quiz>,
    pub module: Module,
    pub lessons: Vec<Lesson>,
}

fn question(
    id: &str,
    text: &str,
    options: &[&str],
    correct: usize,
    explanation: &str,
) -> Result<QuizQuestion, finlit_core::Error> {
    Ok(QuizQuestion::new(
        QuestionId::new(id)?,
        text,
        options.iter().map(|o| (*o).to_owned()).collect(),
        correct,
        Some(explanation.to_owned()),
    )?)
}

/// Build the demo catalog.
///
/// # Errors
///
/// Returns a domain error if any entity fails validation.
pub fn demo_catalog() -> Result<DemoCatalog, finlit_core::Error> {
    let checkpoint = Quiz::new(
        CHECKPOINT_QUIZ,
        "Budget basics checkpoint",
        vec![
            question(
                "needs",
                "Which of these is a need?",
                &["Streaming subscription", "Rent", "New phone"],
                1,
                "Housing is an essential expense.",
            )?,
            question(
                "rule",
                "In the 50/30/20 rule, what gets 20%?",
                &["Wants", "Needs", "Savings and debt payoff"],
                2,
                "The last 20% goes to saving and paying down debt.",
            )?,
            question(
                "first",
                "\"Pay yourself first\" means...",
                &["Saving before spending", "Buying a treat", "Skipping bills"],
                0,
                "Move money to savings as soon as income arrives.",
            )?,
        ],
        None,
        Some(10),
        true,
    )?;
    let final_quiz = Quiz::new(
        BUDGETING_FINAL,
        "Budgeting final",
        vec![
            question(
                "fund",
                "An emergency fund should cover...",
                &["A vacation", "Unexpected expenses", "Monthly rent only"],
                1,
                "It exists for surprises like repairs or job loss.",
            )?,
            question(
                "track",
                "Why track spending?",
                &["To find leaks", "To spend more", "To raise your credit limit"],
                0,
                "Tracking shows where money actually goes.",
            )?,
        ],
        None,
        None,
        true,
    )?;

    let module = Module::new(
        BUDGETING,
        "Budgeting 101",
        "budgeting",
        Difficulty::Beginner,
        40,
        true,
    )?
    .with_quiz(BUDGETING_FINAL);

    let lessons = [
        (1, "Why budget?", LessonKind::Video, None, 6),
        (2, "The 50/30/20 rule", LessonKind::Text, None, 10),
        (3, "Checkpoint", LessonKind::Quiz, Some(CHECKPOINT_QUIZ), 8),
        (4, "Building your first budget", LessonKind::Text, None, 15),
    ];
    let lessons = (0_u32..)
        .zip(lessons)
        .map(|(order, (id, title, kind, quiz, minutes))| {
            Lesson::new(LessonId::new(id), BUDGETING, title, kind, order, quiz, minutes)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DemoCatalog {
        quizzes: vec![checkpoint, final_quiz],
        module,
        lessons,
    })
}

/// Upsert the demo catalog. Re-running overwrites the same rows.
///
/// # Errors
///
/// Returns an error if the catalog is invalid or a write fails.
pub async fn seed(storage: &Storage) -> anyhow::Result<DemoCatalog> {
    let catalog = demo_catalog()?;
    for quiz in &catalog.quizzes {
        storage.catalog.upsert_quiz(quiz).await?;
    }
    storage.catalog.upsert_module(&catalog.module).await?;
    for lesson in &catalog.lessons {
        storage.catalog.upsert_lesson(lesson).await?;
    }
    tracing::info!(
        module_id = %catalog.module.id(),
        lessons = catalog.lessons.len(),
        quizzes = catalog.quizzes.len(),
        "demo catalog seeded"
    );
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use finlit_core::Clock;
    use finlit_core::model::{ModuleStatus, UserId};
    use services::LearningEngine;

    #[test]
    fn demo_catalog_is_valid() {
        let catalog = demo_catalog().unwrap();
        assert_eq!(catalog.lessons.len(), 4);
        assert!(catalog.quizzes.iter().all(Quiz::is_attemptable));
        assert_eq!(catalog.module.quiz_id(), Some(BUDGETING_FINAL));
    }

    #[tokio::test]
    async fn seeding_twice_is_idempotent() {
        let storage = Storage::in_memory();
        seed(&storage).await.unwrap();
        seed(&storage).await.unwrap();

        let lessons = storage.catalog.list_lessons(BUDGETING).await.unwrap();
        assert_eq!(lessons.len(), 4);

        let engine = LearningEngine::new(&storage, Clock::default());
        let summary = engine
            .module_progress_summary(UserId::random(), BUDGETING)
            .await
            .unwrap();
        assert_eq!(summary.percentage, 0);
        assert_eq!(summary.status, ModuleStatus::NotStarted);
    }
}
