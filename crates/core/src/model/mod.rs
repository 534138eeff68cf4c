mod attempt;
mod ids;
mod lesson;
mod module;
mod progress;
mod quiz;

pub use ids::{AttemptId, LessonId, ModuleId, ParseIdError, QuestionId, QuizId, UserId};

pub use attempt::{NewQuizAttempt, QuizAttempt, sort_most_recent_first};
pub use lesson::{Lesson, LessonError, LessonKind, sort_lessons};
pub use module::{Difficulty, Module, ModuleError};
pub use progress::{
    LessonCompletion, LessonProgress, ModuleProgress, ModuleProgressSummary, ModuleStatus,
    ProgressError,
};
pub use quiz::{DEFAULT_PASSING_SCORE, Quiz, QuizError, QuizQuestion};
