use finlit_core::model::{Lesson, LessonId, Module, ModuleId, Quiz, QuizId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, id_i64, map_lesson_row, map_module_row, map_question_row, ser};
use crate::repository::{CatalogRepository, StorageError};

const MODULE_COLUMNS: &str =
    "id, title, category, difficulty, estimated_minutes, is_published, quiz_id";
const LESSON_COLUMNS: &str =
    "id, module_id, title, kind, order_index, quiz_id, duration_minutes";

impl SqliteRepository {
    async fn load_quiz(&self, id: QuizId, published_only: bool) -> Result<Option<Quiz>, StorageError> {
        let quiz_id = id_i64("quiz_id", id.value())?;
        let Some(row) = sqlx::query(
            r"
            SELECT id, title, passing_score, time_limit_minutes, is_published
            FROM quizzes
            WHERE id = ?1
            ",
        )
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        else {
            return Ok(None);
        };

        let is_published: bool = row.try_get("is_published").map_err(ser)?;
        if published_only && !is_published {
            return Ok(None);
        }

        let question_rows = sqlx::query(
            r"
            SELECT question_id, text, options, correct_index, explanation
            FROM quiz_questions
            WHERE quiz_id = ?1
            ORDER BY position ASC
            ",
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        let questions = question_rows
            .iter()
            .map(map_question_row)
            .collect::<Result<Vec<_>, _>>()?;

        let passing_score = u8::try_from(row.try_get::<i64, _>("passing_score").map_err(ser)?)
            .map_err(ser)?;
        let time_limit = row
            .try_get::<Option<i64>, _>("time_limit_minutes")
            .map_err(ser)?
            .map(u32::try_from)
            .transpose()
            .map_err(ser)?;

        let quiz = Quiz::new(
            id,
            row.try_get::<String, _>("title").map_err(ser)?,
            questions,
            Some(passing_score),
            time_limit,
            is_published,
        )
        .map_err(ser)?;
        Ok(Some(quiz))
    }
}

#[async_trait::async_trait]
impl CatalogRepository for SqliteRepository {
    async fn get_module(&self, id: ModuleId) -> Result<Option<Module>, StorageError> {
        let row = sqlx::query(&format!("SELECT {MODULE_COLUMNS} FROM modules WHERE id = ?1"))
            .bind(id_i64("module_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        row.as_ref().map(map_module_row).transpose()
    }

    async fn list_modules(&self) -> Result<Vec<Module>, StorageError> {
        let rows = sqlx::query(&format!("SELECT {MODULE_COLUMNS} FROM modules ORDER BY id ASC"))
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        rows.iter().map(map_module_row).collect()
    }

    async fn list_lessons(&self, module_id: ModuleId) -> Result<Vec<Lesson>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {LESSON_COLUMNS} FROM lessons WHERE module_id = ?1 ORDER BY order_index ASC, id ASC"
        ))
        .bind(id_i64("module_id", module_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        rows.iter().map(map_lesson_row).collect()
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError> {
        let row = sqlx::query(&format!("SELECT {LESSON_COLUMNS} FROM lessons WHERE id = ?1"))
            .bind(id_i64("lesson_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        row.as_ref().map(map_lesson_row).transpose()
    }

    async fn get_published_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError> {
        self.load_quiz(id, true).await
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError> {
        self.load_quiz(id, false).await
    }

    async fn upsert_module(&self, module: &Module) -> Result<(), StorageError> {
        // DO UPDATE rather than REPLACE: a delete would cascade to the lessons
        sqlx::query(
            r"
            INSERT INTO modules (
                id, title, category, difficulty, estimated_minutes, is_published, quiz_id
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                category = excluded.category,
                difficulty = excluded.difficulty,
                estimated_minutes = excluded.estimated_minutes,
                is_published = excluded.is_published,
                quiz_id = excluded.quiz_id
            ",
        )
        .bind(id_i64("module_id", module.id().value())?)
        .bind(module.title())
        .bind(module.category())
        .bind(module.difficulty().as_str())
        .bind(i64::from(module.estimated_minutes()))
        .bind(module.is_published())
        .bind(
            module
                .quiz_id()
                .map(|q| id_i64("quiz_id", q.value()))
                .transpose()?,
        )
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let quiz_id = lesson
            .quiz_id()
            .map(|q| id_i64("quiz_id", q.value()))
            .transpose()?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        if let Some(quiz_id) = quiz_id {
            let published: Option<bool> =
                sqlx::query_scalar("SELECT is_published FROM quizzes WHERE id = ?1")
                    .bind(quiz_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(conn)?;
            if published != Some(true) {
                return Err(StorageError::Conflict);
            }
        }

        let result = sqlx::query(
            r"
            INSERT INTO lessons (
                id, module_id, title, kind, order_index, quiz_id, duration_minutes
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                module_id = excluded.module_id,
                title = excluded.title,
                kind = excluded.kind,
                order_index = excluded.order_index,
                quiz_id = excluded.quiz_id,
                duration_minutes = excluded.duration_minutes
            ",
        )
        .bind(id_i64("lesson_id", lesson.id().value())?)
        .bind(id_i64("module_id", lesson.module_id().value())?)
        .bind(lesson.title())
        .bind(lesson.kind().as_str())
        .bind(i64::from(lesson.order_index()))
        .bind(quiz_id)
        .bind(i64::from(lesson.duration_minutes()))
        .execute(&mut *tx)
        .await;

        match result {
            Ok(_) => {}
            Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                return Err(StorageError::Conflict);
            }
            Err(e) => return Err(conn(e)),
        }
        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        let quiz_id = id_i64("quiz_id", quiz.id().value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO quizzes (id, title, passing_score, time_limit_minutes, is_published)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                passing_score = excluded.passing_score,
                time_limit_minutes = excluded.time_limit_minutes,
                is_published = excluded.is_published
            ",
        )
        .bind(quiz_id)
        .bind(quiz.title())
        .bind(i64::from(quiz.passing_score()))
        .bind(quiz.time_limit_minutes().map(i64::from))
        .bind(quiz.is_published())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        sqlx::query("DELETE FROM quiz_questions WHERE quiz_id = ?1")
            .bind(quiz_id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for (position, question) in quiz.questions().iter().enumerate() {
            let options = serde_json::to_string(question.options()).map_err(ser)?;
            sqlx::query(
                r"
                INSERT INTO quiz_questions (
                    quiz_id, question_id, position, text, options, correct_index, explanation
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ",
            )
            .bind(quiz_id)
            .bind(question.id().as_str())
            .bind(i64::try_from(position).map_err(ser)?)
            .bind(question.text())
            .bind(options)
            .bind(i64::try_from(question.correct_index()).map_err(ser)?)
            .bind(question.explanation())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }
}
