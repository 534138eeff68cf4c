use std::sync::Arc;

use serde::Serialize;

use finlit_core::Clock;
use finlit_core::aggregate::aggregate_module;
use finlit_core::model::{
    Lesson, LessonProgress, Module, ModuleId, ModuleProgress, ModuleProgressSummary, UserId,
};
use storage::repository::{AttemptRepository, CatalogRepository, ProgressRepository};

use crate::error::{EngineError, NotFoundError};

/// Upper bound on aggregation rounds when lesson rows keep moving underneath.
const SETTLE_ROUNDS: u32 = 4;

/// A published module with the user's freshly aggregated progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleOverview {
    pub module: Module,
    pub summary: ModuleProgressSummary,
}

/// Rolls lesson progress up into per-module progress.
///
/// Always recomputes from the lesson rows; the stored `ModuleProgress` is a
/// cache that this service overwrites.
#[derive(Clone)]
pub struct ModuleProgressAggregator {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    attempts: Arc<dyn AttemptRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl ModuleProgressAggregator {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CatalogRepository>,
        attempts: Arc<dyn AttemptRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            catalog,
            attempts,
            progress,
        }
    }

    /// Aggregate without writing anything.
    ///
    /// # Errors
    ///
    /// Returns `NotFoundError::Module` for an unknown module, or a persistence
    /// error if any read fails.
    pub async fn compute(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<ModuleProgress, EngineError> {
        let module = self
            .catalog
            .get_module(module_id)
            .await?
            .ok_or(NotFoundError::Module(module_id))?;
        self.compute_for(user_id, &module).await
    }

    /// Aggregate and store the result, replacing the cached row.
    ///
    /// After writing, the lesson rows and module quiz score are read again.
    /// If another writer changed them in between, the aggregation is redone,
    /// so the last module write always reflects the last lesson write.
    ///
    /// # Errors
    ///
    /// Same as [`Self::compute`], plus a persistence error if the upsert fails.
    pub async fn recompute(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<ModuleProgress, EngineError> {
        let module = self
            .catalog
            .get_module(module_id)
            .await?
            .ok_or(NotFoundError::Module(module_id))?;

        let mut inputs = self.inputs(user_id, &module).await?;
        let mut round = 1;
        loop {
            let aggregated = inputs.aggregate(user_id, module_id, self.clock);
            self.progress.upsert_module_progress(&aggregated).await?;

            let current = self.inputs(user_id, &module).await?;
            if current == inputs || round == SETTLE_ROUNDS {
                tracing::debug!(
                    user_id = %user_id,
                    module_id = %module_id,
                    progress = aggregated.progress,
                    status = %aggregated.status,
                    round,
                    "module progress aggregated"
                );
                return Ok(aggregated);
            }
            tracing::debug!(
                user_id = %user_id,
                module_id = %module_id,
                round,
                "lesson progress moved during aggregation"
            );
            inputs = current;
            round += 1;
        }
    }

    /// `{percentage, status}` for one module.
    ///
    /// # Errors
    ///
    /// Same as [`Self::compute`].
    pub async fn summary(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<ModuleProgressSummary, EngineError> {
        Ok(self.compute(user_id, module_id).await?.summary())
    }

    /// Every published module in id order with the user's progress.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if any read fails.
    pub async fn overviews(&self, user_id: UserId) -> Result<Vec<ModuleOverview>, EngineError> {
        let modules = self.catalog.list_modules().await?;
        let mut out = Vec::with_capacity(modules.len());
        for module in modules.into_iter().filter(Module::is_published) {
            let summary = self.compute_for(user_id, &module).await?.summary();
            out.push(ModuleOverview { module, summary });
        }
        Ok(out)
    }

    async fn compute_for(
        &self,
        user_id: UserId,
        module: &Module,
    ) -> Result<ModuleProgress, EngineError> {
        Ok(self
            .inputs(user_id, module)
            .await?
            .aggregate(user_id, module.id(), self.clock))
    }

    async fn inputs(
        &self,
        user_id: UserId,
        module: &Module,
    ) -> Result<AggregationInputs, EngineError> {
        let lessons = self.catalog.list_lessons(module.id()).await?;
        let lesson_ids: Vec<_> = lessons.iter().map(|l| l.id()).collect();
        let rows = self
            .progress
            .list_lesson_progress(user_id, &lesson_ids)
            .await?;

        let quiz_score = match module.quiz_id() {
            Some(quiz_id) => self
                .attempts
                .list_attempts(user_id, quiz_id)
                .await?
                .into_iter()
                .find(|a| a.lesson_id.is_none())
                .and_then(|a| a.score),
            None => None,
        };

        Ok(AggregationInputs {
            lessons,
            rows,
            quiz_score,
        })
    }
}

/// Everything a module aggregation reads.
#[derive(Debug, PartialEq)]
struct AggregationInputs {
    lessons: Vec<Lesson>,
    rows: Vec<LessonProgress>,
    quiz_score: Option<u8>,
}

impl AggregationInputs {
    fn aggregate(&self, user_id: UserId, module_id: ModuleId, clock: Clock) -> ModuleProgress {
        aggregate_module(
            user_id,
            module_id,
            &self.lessons,
            &self.rows,
            self.quiz_score,
            clock.now(),
        )
    }
}
