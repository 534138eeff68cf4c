use finlit_core::model::{
    LessonCompletion, LessonId, LessonProgress, ModuleId, ModuleProgress, UserId,
};

use super::SqliteRepository;
use super::mapping::{
    answer_set_to_json, conn, id_i64, lesson_ids_i64, map_completion_row,
    map_lesson_progress_row, map_module_progress_row,
};
use crate::repository::{ProgressRepository, StorageError};

const LESSON_PROGRESS_COLUMNS: &str =
    "user_id, lesson_id, module_id, is_completed, completed_at, quiz_answers, quiz_score";
const MODULE_PROGRESS_COLUMNS: &str =
    "user_id, module_id, progress, status, quiz_score, completed_at";

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn upsert_lesson_progress(&self, progress: &LessonProgress) -> Result<(), StorageError> {
        // every column is overwritten: the newest write owns the whole row
        sqlx::query(
            r"
            INSERT INTO lesson_progress (
                user_id, lesson_id, module_id, is_completed, completed_at, quiz_answers, quiz_score
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(user_id, lesson_id) DO UPDATE SET
                module_id = excluded.module_id,
                is_completed = excluded.is_completed,
                completed_at = excluded.completed_at,
                quiz_answers = excluded.quiz_answers,
                quiz_score = excluded.quiz_score
            ",
        )
        .bind(progress.user_id.to_string())
        .bind(id_i64("lesson_id", progress.lesson_id.value())?)
        .bind(id_i64("module_id", progress.module_id.value())?)
        .bind(progress.is_completed)
        .bind(progress.completed_at)
        .bind(answer_set_to_json(progress.quiz_answers.as_ref())?)
        .bind(progress.quiz_score.map(i64::from))
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn get_lesson_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {LESSON_PROGRESS_COLUMNS} FROM lesson_progress WHERE user_id = ?1 AND lesson_id = ?2"
        ))
        .bind(user_id.to_string())
        .bind(id_i64("lesson_id", lesson_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;
        row.as_ref().map(map_lesson_progress_row).transpose()
    }

    async fn list_lesson_progress(
        &self,
        user_id: UserId,
        lesson_ids: &[LessonId],
    ) -> Result<Vec<LessonProgress>, StorageError> {
        if lesson_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = format!(
            "SELECT {LESSON_PROGRESS_COLUMNS} FROM lesson_progress WHERE user_id = ?1 AND lesson_id IN ("
        );
        for i in 0..lesson_ids.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('?');
            sql.push_str(&(i + 2).to_string());
        }
        sql.push_str(") ORDER BY lesson_id ASC");

        let mut q = sqlx::query(&sql).bind(user_id.to_string());
        for id in lesson_ids_i64(lesson_ids)? {
            q = q.bind(id);
        }

        let rows = q.fetch_all(&self.pool).await.map_err(conn)?;
        rows.iter().map(map_lesson_progress_row).collect()
    }

    async fn list_user_lesson_progress(
        &self,
        user_id: UserId,
    ) -> Result<Vec<LessonProgress>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {LESSON_PROGRESS_COLUMNS} FROM lesson_progress WHERE user_id = ?1 ORDER BY lesson_id ASC"
        ))
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        rows.iter().map(map_lesson_progress_row).collect()
    }

    async fn delete_lesson_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM lesson_progress WHERE user_id = ?1 AND lesson_id = ?2")
            .bind(user_id.to_string())
            .bind(id_i64("lesson_id", lesson_id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }

    async fn upsert_module_progress(&self, progress: &ModuleProgress) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO module_progress (
                user_id, module_id, progress, status, quiz_score, completed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(user_id, module_id) DO UPDATE SET
                progress = excluded.progress,
                status = excluded.status,
                quiz_score = excluded.quiz_score,
                completed_at = excluded.completed_at
            ",
        )
        .bind(progress.user_id.to_string())
        .bind(id_i64("module_id", progress.module_id.value())?)
        .bind(i64::from(progress.progress))
        .bind(progress.status.as_str())
        .bind(progress.quiz_score.map(i64::from))
        .bind(progress.completed_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn get_module_progress(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<Option<ModuleProgress>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {MODULE_PROGRESS_COLUMNS} FROM module_progress WHERE user_id = ?1 AND module_id = ?2"
        ))
        .bind(user_id.to_string())
        .bind(id_i64("module_id", module_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;
        row.as_ref().map(map_module_progress_row).transpose()
    }

    async fn list_user_module_progress(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ModuleProgress>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {MODULE_PROGRESS_COLUMNS} FROM module_progress WHERE user_id = ?1 ORDER BY module_id ASC"
        ))
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        rows.iter().map(map_module_progress_row).collect()
    }

    async fn append_lesson_completion(
        &self,
        completion: &LessonCompletion,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO lesson_completions (user_id, lesson_id, module_id, completed_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(completion.user_id.to_string())
        .bind(id_i64("lesson_id", completion.lesson_id.value())?)
        .bind(id_i64("module_id", completion.module_id.value())?)
        .bind(completion.completed_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn list_lesson_completions(
        &self,
        user_id: UserId,
    ) -> Result<Vec<LessonCompletion>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT user_id, lesson_id, module_id, completed_at
            FROM lesson_completions
            WHERE user_id = ?1
            ORDER BY completed_at ASC, id ASC
            ",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        rows.iter().map(map_completion_row).collect()
    }
}
