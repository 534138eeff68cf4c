use finlit_core::model::{AttemptId, NewQuizAttempt, QuizAttempt, QuizId, UserId};

use super::SqliteRepository;
use super::mapping::{answers_to_json, conn, id_i64, map_attempt_row};
use crate::repository::{AttemptRepository, StorageError};

const ATTEMPT_COLUMNS: &str =
    "id, user_id, quiz_id, module_id, lesson_id, answers, score, passed, completed_at";

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn insert_attempt(&self, attempt: &NewQuizAttempt) -> Result<AttemptId, StorageError> {
        let id: i64 = sqlx::query_scalar(
            r"
            INSERT INTO quiz_attempts (
                user_id, quiz_id, module_id, lesson_id, answers, score, passed, completed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            RETURNING id
            ",
        )
        .bind(attempt.user_id.to_string())
        .bind(id_i64("quiz_id", attempt.quiz_id.value())?)
        .bind(id_i64("module_id", attempt.module_id.value())?)
        .bind(
            attempt
                .lesson_id
                .map(|l| id_i64("lesson_id", l.value()))
                .transpose()?,
        )
        .bind(answers_to_json(&attempt.answers)?)
        .bind(i64::from(attempt.score))
        .bind(attempt.passed)
        .bind(attempt.completed_at)
        .fetch_one(&self.pool)
        .await
        .map_err(conn)?;

        let id = u64::try_from(id)
            .map_err(|_| StorageError::Serialization("attempt id sign overflow".into()))?;
        tracing::debug!(attempt_id = id, quiz_id = %attempt.quiz_id, "inserted quiz attempt");
        Ok(AttemptId::new(id))
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<Option<QuizAttempt>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts WHERE id = ?1"
        ))
        .bind(id_i64("attempt_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;
        row.as_ref().map(map_attempt_row).transpose()
    }

    async fn list_attempts(
        &self,
        user_id: UserId,
        quiz_id: QuizId,
    ) -> Result<Vec<QuizAttempt>, StorageError> {
        let rows = sqlx::query(&format!(
            r"
            SELECT {ATTEMPT_COLUMNS}
            FROM quiz_attempts
            WHERE user_id = ?1 AND quiz_id = ?2
            ORDER BY completed_at DESC, id DESC
            "
        ))
        .bind(user_id.to_string())
        .bind(id_i64("quiz_id", quiz_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        rows.iter().map(map_attempt_row).collect()
    }

    async fn list_user_attempts(&self, user_id: UserId) -> Result<Vec<QuizAttempt>, StorageError> {
        let rows = sqlx::query(&format!(
            r"
            SELECT {ATTEMPT_COLUMNS}
            FROM quiz_attempts
            WHERE user_id = ?1
            ORDER BY completed_at ASC, id ASC
            "
        ))
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        rows.iter().map(map_attempt_row).collect()
    }
}
