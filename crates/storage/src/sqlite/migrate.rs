use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS modules (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            category TEXT NOT NULL,
            difficulty TEXT NOT NULL,
            estimated_minutes INTEGER NOT NULL CHECK (estimated_minutes >= 0),
            is_published INTEGER NOT NULL,
            quiz_id INTEGER
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS lessons (
            id INTEGER PRIMARY KEY,
            module_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            kind TEXT NOT NULL CHECK (kind IN ('video', 'text', 'quiz')),
            order_index INTEGER NOT NULL CHECK (order_index >= 0),
            quiz_id INTEGER,
            duration_minutes INTEGER NOT NULL CHECK (duration_minutes >= 0),
            FOREIGN KEY (module_id) REFERENCES modules(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS quizzes (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            passing_score INTEGER NOT NULL CHECK (passing_score BETWEEN 0 AND 100),
            time_limit_minutes INTEGER,
            is_published INTEGER NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS quiz_questions (
            quiz_id INTEGER NOT NULL,
            question_id TEXT NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 0),
            text TEXT NOT NULL,
            options TEXT NOT NULL,
            correct_index INTEGER NOT NULL CHECK (correct_index >= 0),
            explanation TEXT,
            PRIMARY KEY (quiz_id, question_id),
            FOREIGN KEY (quiz_id) REFERENCES quizzes(id) ON DELETE CASCADE
        );
    ",
    // Attempts are history: no foreign keys, so retiring catalog rows never drops them.
    r"
        CREATE TABLE IF NOT EXISTS quiz_attempts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            quiz_id INTEGER NOT NULL,
            module_id INTEGER NOT NULL,
            lesson_id INTEGER,
            answers TEXT NOT NULL,
            score INTEGER CHECK (score BETWEEN 0 AND 100),
            passed INTEGER,
            completed_at TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS lesson_progress (
            user_id TEXT NOT NULL,
            lesson_id INTEGER NOT NULL,
            module_id INTEGER NOT NULL,
            is_completed INTEGER NOT NULL,
            completed_at TEXT,
            quiz_answers TEXT,
            quiz_score INTEGER CHECK (quiz_score BETWEEN 0 AND 100),
            PRIMARY KEY (user_id, lesson_id)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS module_progress (
            user_id TEXT NOT NULL,
            module_id INTEGER NOT NULL,
            progress INTEGER NOT NULL CHECK (progress BETWEEN 0 AND 100),
            status TEXT NOT NULL CHECK (status IN ('not-started', 'in-progress', 'completed')),
            quiz_score INTEGER CHECK (quiz_score BETWEEN 0 AND 100),
            completed_at TEXT,
            PRIMARY KEY (user_id, module_id)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS lesson_completions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            lesson_id INTEGER NOT NULL,
            module_id INTEGER NOT NULL,
            completed_at TEXT NOT NULL
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_lessons_module_order
            ON lessons (module_id, order_index, id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_quiz_attempts_user_quiz_completed
            ON quiz_attempts (user_id, quiz_id, completed_at);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_lesson_completions_user_completed
            ON lesson_completions (user_id, completed_at);
    ",
];

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the catalog tables, the append-only history tables (attempts and
/// lesson completions) and the derived progress tables.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if is_applied(pool, 1).await? {
        tracing::debug!(version = 1, "schema already applied");
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    for statement in SCHEMA_V1 {
        sqlx::query(statement).execute(&mut *tx).await?;
    }

    sqlx::query(
        r"
            INSERT INTO schema_migrations (version, applied_at)
            VALUES (?1, ?2)
            ON CONFLICT(version) DO NOTHING
        ",
    )
    .bind(1_i64)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::debug!(version = 1, "applied schema migration");

    Ok(())
}
