use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ModuleId, QuizId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModuleError {
    #[error("module title cannot be empty")]
    EmptyTitle,

    #[error("unknown difficulty: {0}")]
    UnknownDifficulty(String),
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }

    /// Parse the persisted lowercase form.
    ///
    /// # Errors
    ///
    /// Returns `ModuleError::UnknownDifficulty` for any other value.
    pub fn parse(value: &str) -> Result<Self, ModuleError> {
        match value {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            other => Err(ModuleError::UnknownDifficulty(other.to_owned())),
        }
    }
}

//
// ─── MODULE ────────────────────────────────────────────────────────────────────
//

/// A top-level course unit. Lessons reference their module by id.
///
/// Authored by the admin workflow; the engine only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    id: ModuleId,
    title: String,
    category: String,
    difficulty: Difficulty,
    estimated_minutes: u32,
    is_published: bool,
    quiz_id: Option<QuizId>,
}

impl Module {
    /// Build a module record.
    ///
    /// # Errors
    ///
    /// Returns `ModuleError::EmptyTitle` if the title is blank.
    pub fn new(
        id: ModuleId,
        title: impl Into<String>,
        category: impl Into<String>,
        difficulty: Difficulty,
        estimated_minutes: u32,
        is_published: bool,
    ) -> Result<Self, ModuleError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ModuleError::EmptyTitle);
        }
        Ok(Self {
            id,
            title: title.trim().to_owned(),
            category: category.into(),
            difficulty,
            estimated_minutes,
            is_published,
            quiz_id: None,
        })
    }

    /// Attach a module-level quiz, independent of any lesson quizzes.
    #[must_use]
    pub fn with_quiz(mut self, quiz_id: QuizId) -> Self {
        self.quiz_id = Some(quiz_id);
        self
    }

    #[must_use]
    pub fn id(&self) -> ModuleId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn estimated_minutes(&self) -> u32 {
        self.estimated_minutes
    }

    #[must_use]
    pub fn is_published(&self) -> bool {
        self.is_published
    }

    #[must_use]
    pub fn quiz_id(&self) -> Option<QuizId> {
        self.quiz_id
    }
}
