use chrono::{DateTime, Utc};
use finlit_core::answers::{AnswerSet, RawAnswers};
use finlit_core::model::{
    AttemptId, Difficulty, Lesson, LessonCompletion, LessonId, LessonKind, LessonProgress, Module,
    ModuleId, ModuleProgress, ModuleStatus, QuestionId, QuizAttempt, QuizId, QuizQuestion, UserId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

//
// ─── SCALARS ───────────────────────────────────────────────────────────────────
//

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn percent_from_i64(field: &'static str, v: i64) -> Result<u8, StorageError> {
    u8::try_from(v)
        .ok()
        .filter(|p| *p <= 100)
        .ok_or_else(|| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn user_id_from_str(raw: &str) -> Result<UserId, StorageError> {
    raw.parse().map_err(ser)
}

pub(crate) fn optional_id<T>(
    field: &'static str,
    v: Option<i64>,
    build: fn(u64) -> T,
) -> Result<Option<T>, StorageError> {
    v.map(|raw| i64_to_u64(field, raw).map(build)).transpose()
}

pub(crate) fn lesson_ids_i64(ids: &[LessonId]) -> Result<Vec<i64>, StorageError> {
    ids.iter().map(|id| id_i64("lesson_id", id.value())).collect()
}

//
// ─── JSON COLUMNS ──────────────────────────────────────────────────────────────
//

pub(crate) fn answers_to_json(answers: &RawAnswers) -> Result<String, StorageError> {
    serde_json::to_string(answers).map_err(ser)
}

/// Historical rows may hold any JSON object; only a non-object is rejected.
pub(crate) fn answers_from_json(raw: &str) -> Result<RawAnswers, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn answer_set_to_json(set: Option<&AnswerSet>) -> Result<Option<String>, StorageError> {
    set.map(|s| serde_json::to_string(s).map_err(ser))
        .transpose()
}

pub(crate) fn answer_set_from_json(raw: Option<String>) -> Result<Option<AnswerSet>, StorageError> {
    raw.map(|s| serde_json::from_str(&s).map_err(ser))
        .transpose()
}

//
// ─── ROW MAPPERS ───────────────────────────────────────────────────────────────
//

pub(crate) fn map_module_row(row: &SqliteRow) -> Result<Module, StorageError> {
    let id = ModuleId::new(i64_to_u64("id", row.try_get("id").map_err(ser)?)?);
    let difficulty: String = row.try_get("difficulty").map_err(ser)?;
    let module = Module::new(
        id,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<String, _>("category").map_err(ser)?,
        Difficulty::parse(&difficulty).map_err(ser)?,
        u32_from_i64(
            "estimated_minutes",
            row.try_get("estimated_minutes").map_err(ser)?,
        )?,
        row.try_get::<bool, _>("is_published").map_err(ser)?,
    )
    .map_err(ser)?;

    let quiz_id = optional_id("quiz_id", row.try_get("quiz_id").map_err(ser)?, QuizId::new)?;
    Ok(match quiz_id {
        Some(q) => module.with_quiz(q),
        None => module,
    })
}

pub(crate) fn map_lesson_row(row: &SqliteRow) -> Result<Lesson, StorageError> {
    let kind: String = row.try_get("kind").map_err(ser)?;
    Lesson::new(
        LessonId::new(i64_to_u64("id", row.try_get("id").map_err(ser)?)?),
        ModuleId::new(i64_to_u64("module_id", row.try_get("module_id").map_err(ser)?)?),
        row.try_get::<String, _>("title").map_err(ser)?,
        LessonKind::parse(&kind).map_err(ser)?,
        u32_from_i64("order_index", row.try_get("order_index").map_err(ser)?)?,
        optional_id("quiz_id", row.try_get("quiz_id").map_err(ser)?, QuizId::new)?,
        u32_from_i64(
            "duration_minutes",
            row.try_get("duration_minutes").map_err(ser)?,
        )?,
    )
    .map_err(ser)
}

pub(crate) fn map_question_row(row: &SqliteRow) -> Result<QuizQuestion, StorageError> {
    let options: Vec<String> =
        serde_json::from_str(&row.try_get::<String, _>("options").map_err(ser)?).map_err(ser)?;
    let correct_index = usize::try_from(row.try_get::<i64, _>("correct_index").map_err(ser)?)
        .map_err(ser)?;
    QuizQuestion::new(
        QuestionId::new(row.try_get::<String, _>("question_id").map_err(ser)?).map_err(ser)?,
        row.try_get::<String, _>("text").map_err(ser)?,
        options,
        correct_index,
        row.try_get("explanation").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_attempt_row(row: &SqliteRow) -> Result<QuizAttempt, StorageError> {
    let user: String = row.try_get("user_id").map_err(ser)?;
    let answers: String = row.try_get("answers").map_err(ser)?;
    Ok(QuizAttempt {
        id: AttemptId::new(i64_to_u64("id", row.try_get("id").map_err(ser)?)?),
        user_id: user_id_from_str(&user)?,
        quiz_id: QuizId::new(i64_to_u64("quiz_id", row.try_get("quiz_id").map_err(ser)?)?),
        module_id: ModuleId::new(i64_to_u64("module_id", row.try_get("module_id").map_err(ser)?)?),
        lesson_id: optional_id("lesson_id", row.try_get("lesson_id").map_err(ser)?, LessonId::new)?,
        answers: answers_from_json(&answers)?,
        score: row
            .try_get::<Option<i64>, _>("score")
            .map_err(ser)?
            .map(|s| percent_from_i64("score", s))
            .transpose()?,
        passed: row.try_get("passed").map_err(ser)?,
        completed_at: row.try_get("completed_at").map_err(ser)?,
    })
}

pub(crate) fn map_lesson_progress_row(row: &SqliteRow) -> Result<LessonProgress, StorageError> {
    let user: String = row.try_get("user_id").map_err(ser)?;
    Ok(LessonProgress {
        user_id: user_id_from_str(&user)?,
        lesson_id: LessonId::new(i64_to_u64("lesson_id", row.try_get("lesson_id").map_err(ser)?)?),
        module_id: ModuleId::new(i64_to_u64("module_id", row.try_get("module_id").map_err(ser)?)?),
        is_completed: row.try_get("is_completed").map_err(ser)?,
        completed_at: row.try_get("completed_at").map_err(ser)?,
        quiz_answers: answer_set_from_json(row.try_get("quiz_answers").map_err(ser)?)?,
        quiz_score: row
            .try_get::<Option<i64>, _>("quiz_score")
            .map_err(ser)?
            .map(|s| percent_from_i64("quiz_score", s))
            .transpose()?,
    })
}

pub(crate) fn map_module_progress_row(row: &SqliteRow) -> Result<ModuleProgress, StorageError> {
    let user: String = row.try_get("user_id").map_err(ser)?;
    let status: String = row.try_get("status").map_err(ser)?;
    let completed_at: Option<DateTime<Utc>> = row.try_get("completed_at").map_err(ser)?;
    ModuleProgress::from_persisted(
        user_id_from_str(&user)?,
        ModuleId::new(i64_to_u64("module_id", row.try_get("module_id").map_err(ser)?)?),
        percent_from_i64("progress", row.try_get("progress").map_err(ser)?)?,
        ModuleStatus::parse(&status).map_err(ser)?,
        row.try_get::<Option<i64>, _>("quiz_score")
            .map_err(ser)?
            .map(|s| percent_from_i64("quiz_score", s))
            .transpose()?,
        completed_at,
    )
    .map_err(ser)
}

pub(crate) fn map_completion_row(row: &SqliteRow) -> Result<LessonCompletion, StorageError> {
    let user: String = row.try_get("user_id").map_err(ser)?;
    Ok(LessonCompletion {
        user_id: user_id_from_str(&user)?,
        lesson_id: LessonId::new(i64_to_u64("lesson_id", row.try_get("lesson_id").map_err(ser)?)?),
        module_id: ModuleId::new(i64_to_u64("module_id", row.try_get("module_id").map_err(ser)?)?),
        completed_at: row.try_get("completed_at").map_err(ser)?,
    })
}
