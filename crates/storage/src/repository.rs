use async_trait::async_trait;
use finlit_core::model::{
    AttemptId, Lesson, LessonCompletion, LessonId, LessonProgress, Module, ModuleId,
    ModuleProgress, NewQuizAttempt, Quiz, QuizAttempt, QuizId, UserId, sort_lessons,
    sort_most_recent_first,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Read access to authored content, plus the authoring writes used by seeding.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn get_module(&self, id: ModuleId) -> Result<Option<Module>, StorageError>;

    /// All modules in id order, published or not.
    async fn list_modules(&self) -> Result<Vec<Module>, StorageError>;

    /// Lessons of a module ordered by `(order_index, id)`.
    async fn list_lessons(&self, module_id: ModuleId) -> Result<Vec<Lesson>, StorageError>;

    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError>;

    /// Fetch a quiz only if it is published.
    async fn get_published_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError>;

    /// Fetch a quiz regardless of publish state, for reviewing history.
    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError>;

    /// Create or replace a module.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the module cannot be stored.
    async fn upsert_module(&self, module: &Module) -> Result<(), StorageError>;

    /// Create or replace a lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the lesson's module does not exist,
    /// or if it references a quiz that is missing or unpublished. A quiz
    /// unpublished later leaves already-stored lessons in place.
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError>;

    /// Create or replace a quiz together with its questions.
    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError>;
}

/// Append-only quiz attempt history.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Append an attempt and return its id. Never overwrites.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be written.
    async fn insert_attempt(&self, attempt: &NewQuizAttempt) -> Result<AttemptId, StorageError>;

    async fn get_attempt(&self, id: AttemptId) -> Result<Option<QuizAttempt>, StorageError>;

    /// Attempts of one user on one quiz, most recent first.
    async fn list_attempts(
        &self,
        user_id: UserId,
        quiz_id: QuizId,
    ) -> Result<Vec<QuizAttempt>, StorageError>;

    /// Every attempt of a user, oldest first.
    async fn list_user_attempts(&self, user_id: UserId) -> Result<Vec<QuizAttempt>, StorageError>;
}

/// Derived per-user progress rows and the lesson-completion log.
///
/// Upserts replace the whole row; fields absent from the new value are cleared.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    async fn upsert_lesson_progress(&self, progress: &LessonProgress) -> Result<(), StorageError>;

    async fn get_lesson_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError>;

    /// Progress rows for the given lessons; lessons without a row are omitted.
    async fn list_lesson_progress(
        &self,
        user_id: UserId,
        lesson_ids: &[LessonId],
    ) -> Result<Vec<LessonProgress>, StorageError>;

    /// Every lesson row the user has, in lesson id order.
    async fn list_user_lesson_progress(
        &self,
        user_id: UserId,
    ) -> Result<Vec<LessonProgress>, StorageError>;

    /// Remove a lesson row. Deleting a missing row is not an error.
    async fn delete_lesson_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<(), StorageError>;

    async fn upsert_module_progress(&self, progress: &ModuleProgress) -> Result<(), StorageError>;

    async fn get_module_progress(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<Option<ModuleProgress>, StorageError>;

    /// Every cached module row the user has, in module id order.
    async fn list_user_module_progress(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ModuleProgress>, StorageError>;

    async fn append_lesson_completion(
        &self,
        completion: &LessonCompletion,
    ) -> Result<(), StorageError>;

    /// The user's completion log, oldest first.
    async fn list_lesson_completions(
        &self,
        user_id: UserId,
    ) -> Result<Vec<LessonCompletion>, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct MemoryState {
    modules: HashMap<ModuleId, Module>,
    lessons: HashMap<LessonId, Lesson>,
    quizzes: HashMap<QuizId, Quiz>,
    attempts: Vec<QuizAttempt>,
    lesson_progress: HashMap<(UserId, LessonId), LessonProgress>,
    module_progress: HashMap<(UserId, ModuleId), ModuleProgress>,
    completions: Vec<LessonCompletion>,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl CatalogRepository for InMemoryRepository {
    async fn get_module(&self, id: ModuleId) -> Result<Option<Module>, StorageError> {
        Ok(self.lock()?.modules.get(&id).cloned())
    }

    async fn list_modules(&self) -> Result<Vec<Module>, StorageError> {
        let mut modules: Vec<Module> = self.lock()?.modules.values().cloned().collect();
        modules.sort_by_key(Module::id);
        Ok(modules)
    }

    async fn list_lessons(&self, module_id: ModuleId) -> Result<Vec<Lesson>, StorageError> {
        let mut lessons: Vec<Lesson> = self
            .lock()?
            .lessons
            .values()
            .filter(|l| l.module_id() == module_id)
            .cloned()
            .collect();
        sort_lessons(&mut lessons);
        Ok(lessons)
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError> {
        Ok(self.lock()?.lessons.get(&id).cloned())
    }

    async fn get_published_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError> {
        Ok(self
            .lock()?
            .quizzes
            .get(&id)
            .filter(|q| q.is_published())
            .cloned())
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError> {
        Ok(self.lock()?.quizzes.get(&id).cloned())
    }

    async fn upsert_module(&self, module: &Module) -> Result<(), StorageError> {
        self.lock()?.modules.insert(module.id(), module.clone());
        Ok(())
    }

    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.modules.contains_key(&lesson.module_id()) {
            return Err(StorageError::Conflict);
        }
        let quiz_published = lesson
            .quiz_id()
            .is_none_or(|id| guard.quizzes.get(&id).is_some_and(Quiz::is_published));
        if !quiz_published {
            return Err(StorageError::Conflict);
        }
        guard.lessons.insert(lesson.id(), lesson.clone());
        Ok(())
    }

    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        self.lock()?.quizzes.insert(quiz.id(), quiz.clone());
        Ok(())
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn insert_attempt(&self, attempt: &NewQuizAttempt) -> Result<AttemptId, StorageError> {
        let mut guard = self.lock()?;
        let next = u64::try_from(guard.attempts.len())
            .map_err(|_| StorageError::Serialization("attempt id overflow".into()))?
            + 1;
        let id = AttemptId::new(next);
        guard.attempts.push(attempt.clone().assign_id(id));
        Ok(id)
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<Option<QuizAttempt>, StorageError> {
        Ok(self.lock()?.attempts.iter().find(|a| a.id == id).cloned())
    }

    async fn list_attempts(
        &self,
        user_id: UserId,
        quiz_id: QuizId,
    ) -> Result<Vec<QuizAttempt>, StorageError> {
        let mut found: Vec<QuizAttempt> = self
            .lock()?
            .attempts
            .iter()
            .filter(|a| a.user_id == user_id && a.quiz_id == quiz_id)
            .cloned()
            .collect();
        sort_most_recent_first(&mut found);
        Ok(found)
    }

    async fn list_user_attempts(&self, user_id: UserId) -> Result<Vec<QuizAttempt>, StorageError> {
        let mut found: Vec<QuizAttempt> = self
            .lock()?
            .attempts
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.completed_at.cmp(&b.completed_at).then(a.id.cmp(&b.id)));
        Ok(found)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn upsert_lesson_progress(&self, progress: &LessonProgress) -> Result<(), StorageError> {
        self.lock()?
            .lesson_progress
            .insert((progress.user_id, progress.lesson_id), progress.clone());
        Ok(())
    }

    async fn get_lesson_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError> {
        Ok(self
            .lock()?
            .lesson_progress
            .get(&(user_id, lesson_id))
            .cloned())
    }

    async fn list_lesson_progress(
        &self,
        user_id: UserId,
        lesson_ids: &[LessonId],
    ) -> Result<Vec<LessonProgress>, StorageError> {
        let guard = self.lock()?;
        Ok(lesson_ids
            .iter()
            .filter_map(|id| guard.lesson_progress.get(&(user_id, *id)).cloned())
            .collect())
    }

    async fn list_user_lesson_progress(
        &self,
        user_id: UserId,
    ) -> Result<Vec<LessonProgress>, StorageError> {
        let mut found: Vec<LessonProgress> = self
            .lock()?
            .lesson_progress
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by_key(|p| p.lesson_id);
        Ok(found)
    }

    async fn delete_lesson_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<(), StorageError> {
        self.lock()?.lesson_progress.remove(&(user_id, lesson_id));
        Ok(())
    }

    async fn upsert_module_progress(&self, progress: &ModuleProgress) -> Result<(), StorageError> {
        self.lock()?
            .module_progress
            .insert((progress.user_id, progress.module_id), progress.clone());
        Ok(())
    }

    async fn get_module_progress(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<Option<ModuleProgress>, StorageError> {
        Ok(self
            .lock()?
            .module_progress
            .get(&(user_id, module_id))
            .cloned())
    }

    async fn list_user_module_progress(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ModuleProgress>, StorageError> {
        let mut found: Vec<ModuleProgress> = self
            .lock()?
            .module_progress
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by_key(|p| p.module_id);
        Ok(found)
    }

    async fn append_lesson_completion(
        &self,
        completion: &LessonCompletion,
    ) -> Result<(), StorageError> {
        self.lock()?.completions.push(completion.clone());
        Ok(())
    }

    async fn list_lesson_completions(
        &self,
        user_id: UserId,
    ) -> Result<Vec<LessonCompletion>, StorageError> {
        let mut found: Vec<LessonCompletion> = self
            .lock()?
            .completions
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by_key(|c| c.completed_at);
        Ok(found)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub catalog: Arc<dyn CatalogRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    /// Wire all three contracts to one repository value.
    #[must_use]
    pub fn from_repository<R>(repo: R) -> Self
    where
        R: CatalogRepository + AttemptRepository + ProgressRepository + Clone + 'static,
    {
        let catalog: Arc<dyn CatalogRepository> = Arc::new(repo.clone());
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo);
        Self {
            catalog,
            attempts,
            progress,
        }
    }
}
