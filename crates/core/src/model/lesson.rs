use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{LessonId, ModuleId, QuizId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonError {
    #[error("lesson title cannot be empty")]
    EmptyTitle,

    #[error("quiz lessons must reference a quiz")]
    MissingQuiz,

    #[error("unknown lesson kind: {0}")]
    UnknownKind(String),
}

/// What the learner does in a lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonKind {
    Video,
    Text,
    Quiz,
}

impl LessonKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LessonKind::Video => "video",
            LessonKind::Text => "text",
            LessonKind::Quiz => "quiz",
        }
    }

    /// # Errors
    ///
    /// Returns `LessonError::UnknownKind` for unrecognized values.
    pub fn parse(value: &str) -> Result<Self, LessonError> {
        match value {
            "video" => Ok(LessonKind::Video),
            "text" => Ok(LessonKind::Text),
            "quiz" => Ok(LessonKind::Quiz),
            other => Err(LessonError::UnknownKind(other.to_owned())),
        }
    }
}

/// An atomic learning unit belonging to exactly one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    id: LessonId,
    module_id: ModuleId,
    title: String,
    kind: LessonKind,
    order_index: u32,
    quiz_id: Option<QuizId>,
    duration_minutes: u32,
}

impl Lesson {
    /// Build a lesson record.
    ///
    /// Video and text lessons may still carry an optional knowledge-check quiz.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::EmptyTitle` for a blank title and
    /// `LessonError::MissingQuiz` for a quiz lesson without a quiz reference.
    pub fn new(
        id: LessonId,
        module_id: ModuleId,
        title: impl Into<String>,
        kind: LessonKind,
        order_index: u32,
        quiz_id: Option<QuizId>,
        duration_minutes: u32,
    ) -> Result<Self, LessonError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(LessonError::EmptyTitle);
        }
        if kind == LessonKind::Quiz && quiz_id.is_none() {
            return Err(LessonError::MissingQuiz);
        }
        Ok(Self {
            id,
            module_id,
            title: title.trim().to_owned(),
            kind,
            order_index,
            quiz_id,
            duration_minutes,
        })
    }

    #[must_use]
    pub fn id(&self) -> LessonId {
        self.id
    }

    #[must_use]
    pub fn module_id(&self) -> ModuleId {
        self.module_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn kind(&self) -> LessonKind {
        self.kind
    }

    #[must_use]
    pub fn order_index(&self) -> u32 {
        self.order_index
    }

    #[must_use]
    pub fn quiz_id(&self) -> Option<QuizId> {
        self.quiz_id
    }

    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }
}

/// Sort lessons into display order: by explicit index, then by id.
pub fn sort_lessons(lessons: &mut [Lesson]) {
    lessons.sort_by_key(|l| (l.order_index, l.id));
}
