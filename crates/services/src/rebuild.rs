use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use finlit_core::answers::normalize;
use finlit_core::history::{merge_events, rebuild_lesson_progress};
use finlit_core::model::{ModuleId, Quiz, QuizId, UserId};
use finlit_core::scoring::score_quiz;
use serde::Serialize;
use storage::repository::{AttemptRepository, CatalogRepository, ProgressRepository};

use crate::error::EngineError;
use crate::module_progress::ModuleProgressAggregator;

/// What a rebuild touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RebuildReport {
    pub lessons_rebuilt: usize,
    /// Cached lesson rows with no history behind them, now deleted.
    pub lessons_cleared: usize,
    pub modules_reaggregated: Vec<ModuleId>,
}

/// Regenerates a user's derived progress from attempts and completions.
#[derive(Clone)]
pub struct ProgressRebuilder {
    catalog: Arc<dyn CatalogRepository>,
    attempts: Arc<dyn AttemptRepository>,
    progress: Arc<dyn ProgressRepository>,
    aggregator: ModuleProgressAggregator,
}

impl ProgressRebuilder {
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        attempts: Arc<dyn AttemptRepository>,
        progress: Arc<dyn ProgressRepository>,
        aggregator: ModuleProgressAggregator,
    ) -> Self {
        Self {
            catalog,
            attempts,
            progress,
            aggregator,
        }
    }

    /// Replay the user's history and overwrite every derived progress row.
    ///
    /// Attempts stored without a score are rescored against the current quiz;
    /// an attempt whose quiz is gone or empty counts as a failing 0. Lesson
    /// rows the history does not produce are deleted, and every module with
    /// history or a cached row is aggregated again.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if any read or write fails. Rows written
    /// before the failure stay written; re-running the rebuild is safe.
    pub async fn rebuild(&self, user_id: UserId) -> Result<RebuildReport, EngineError> {
        let completions = self.progress.list_lesson_completions(user_id).await?;
        let attempts = self.attempts.list_user_attempts(user_id).await?;

        let mut quizzes: HashMap<QuizId, Option<Quiz>> = HashMap::new();
        for attempt in attempts.iter().filter(|a| a.score.is_none() || a.passed.is_none()) {
            if !quizzes.contains_key(&attempt.quiz_id) {
                let quiz = self.catalog.get_quiz(attempt.quiz_id).await?;
                quizzes.insert(attempt.quiz_id, quiz);
            }
        }

        let cached_lessons = self.progress.list_user_lesson_progress(user_id).await?;
        let cached_modules = self.progress.list_user_module_progress(user_id).await?;

        let mut modules: BTreeSet<ModuleId> = completions.iter().map(|c| c.module_id).collect();
        modules.extend(attempts.iter().map(|a| a.module_id));
        modules.extend(cached_lessons.iter().map(|p| p.module_id));
        modules.extend(cached_modules.iter().map(|p| p.module_id));

        let events = merge_events(completions, attempts);
        let rows = rebuild_lesson_progress(&events, |attempt| {
            let scored = quizzes
                .get(&attempt.quiz_id)
                .and_then(Option::as_ref)
                .and_then(|quiz| {
                    score_quiz(quiz.questions(), &normalize(&attempt.answers), quiz.passing_score())
                        .ok()
                });
            match scored {
                Some(s) => (
                    attempt.score.unwrap_or(s.score),
                    attempt.passed.unwrap_or(s.passed),
                ),
                None => (attempt.score.unwrap_or(0), attempt.passed.unwrap_or(false)),
            }
        });

        for row in rows.values() {
            self.progress.upsert_lesson_progress(row).await?;
        }
        let mut cleared = 0;
        for stale in cached_lessons.iter().filter(|p| !rows.contains_key(&p.lesson_id)) {
            self.progress
                .delete_lesson_progress(user_id, stale.lesson_id)
                .await?;
            cleared += 1;
        }
        let mut reaggregated = Vec::with_capacity(modules.len());
        for module_id in modules {
            match self.aggregator.recompute(user_id, module_id).await {
                Ok(_) => reaggregated.push(module_id),
                // history may outlive its catalog entry
                Err(EngineError::NotFound(err)) => {
                    tracing::warn!(module_id = %module_id, error = %err, "skipping retired module");
                }
                Err(err) => return Err(err),
            }
        }

        tracing::info!(
            user_id = %user_id,
            lessons = rows.len(),
            cleared,
            modules = reaggregated.len(),
            "progress rebuilt from history"
        );
        Ok(RebuildReport {
            lessons_rebuilt: rows.len(),
            lessons_cleared: cleared,
            modules_reaggregated: reaggregated,
        })
    }
}
