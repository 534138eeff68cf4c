use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{QuestionId, QuizId};

/// Passing threshold applied when a quiz does not set one.
pub const DEFAULT_PASSING_SCORE: u8 = 80;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("question text cannot be empty")]
    EmptyQuestionText,

    #[error("question {question_id} needs at least two options, got {len}")]
    TooFewOptions { question_id: QuestionId, len: usize },

    #[error("question {question_id} has an empty option at index {index}")]
    EmptyOption { question_id: QuestionId, index: usize },

    #[error("question {question_id} marks option {index} correct but has {len} options")]
    CorrectIndexOutOfRange {
        question_id: QuestionId,
        index: usize,
        len: usize,
    },

    #[error("duplicate question id {0}")]
    DuplicateQuestion(QuestionId),

    #[error("passing score must be between 0 and 100, got {0}")]
    InvalidPassingScore(u8),

    #[error("quiz title cannot be empty")]
    EmptyTitle,
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    id: QuestionId,
    text: String,
    options: Vec<String>,
    correct_index: usize,
    explanation: Option<String>,
}

impl QuizQuestion {
    /// Build a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` if the text is blank, there are fewer than two options,
    /// an option is blank, or `correct_index` does not point at an option.
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        options: Vec<String>,
        correct_index: usize,
        explanation: Option<String>,
    ) -> Result<Self, QuizError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuizError::EmptyQuestionText);
        }
        if options.len() < 2 {
            return Err(QuizError::TooFewOptions {
                question_id: id,
                len: options.len(),
            });
        }
        if let Some(index) = options.iter().position(|o| o.trim().is_empty()) {
            return Err(QuizError::EmptyOption {
                question_id: id,
                index,
            });
        }
        if correct_index >= options.len() {
            return Err(QuizError::CorrectIndexOutOfRange {
                question_id: id,
                index: correct_index,
                len: options.len(),
            });
        }
        let explanation = explanation.filter(|e| !e.trim().is_empty());

        Ok(Self {
            id,
            text,
            options,
            correct_index,
            explanation,
        })
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// An ordered set of questions with a passing threshold.
///
/// A quiz is only attemptable when it is published and has at least one question;
/// see [`Quiz::is_attemptable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    id: QuizId,
    title: String,
    questions: Vec<QuizQuestion>,
    passing_score: u8,
    time_limit_minutes: Option<u32>,
    is_published: bool,
}

impl Quiz {
    /// Build a quiz. `passing_score` of `None` uses [`DEFAULT_PASSING_SCORE`].
    ///
    /// An empty question list is accepted here; authoring drafts exist. The
    /// engine refuses to start or score such a quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` for a blank title, a passing score above 100, or
    /// duplicate question ids.
    pub fn new(
        id: QuizId,
        title: impl Into<String>,
        questions: Vec<QuizQuestion>,
        passing_score: Option<u8>,
        time_limit_minutes: Option<u32>,
        is_published: bool,
    ) -> Result<Self, QuizError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(QuizError::EmptyTitle);
        }
        let passing_score = passing_score.unwrap_or(DEFAULT_PASSING_SCORE);
        if passing_score > 100 {
            return Err(QuizError::InvalidPassingScore(passing_score));
        }
        let mut seen = HashSet::with_capacity(questions.len());
        for q in &questions {
            if !seen.insert(q.id()) {
                return Err(QuizError::DuplicateQuestion(q.id().clone()));
            }
        }

        Ok(Self {
            id,
            title,
            questions,
            passing_score,
            time_limit_minutes,
            is_published,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuizId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, id: &QuestionId) -> Option<&QuizQuestion> {
        self.questions.iter().find(|q| q.id() == id)
    }

    #[must_use]
    pub fn passing_score(&self) -> u8 {
        self.passing_score
    }

    /// Advisory limit for the UI. Submissions are never rejected for lateness.
    #[must_use]
    pub fn time_limit_minutes(&self) -> Option<u32> {
        self.time_limit_minutes
    }

    #[must_use]
    pub fn is_published(&self) -> bool {
        self.is_published
    }

    #[must_use]
    pub fn is_attemptable(&self) -> bool {
        self.is_published && !self.questions.is_empty()
    }
}
