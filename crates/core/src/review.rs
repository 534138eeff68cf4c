use serde::{Deserialize, Serialize};

use crate::answers::{AnswerSet, normalize};
use crate::model::{AttemptId, QuestionId, Quiz, QuizAttempt};
use crate::scoring::{ScoringError, is_correct, score_quiz};

/// How a single question was answered in an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnswerOutcome {
    Correct,
    Incorrect,
    NotAnswered,
}

/// Whether the review's score came from the attempt row or was recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreSource {
    Stored,
    Recomputed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionReview {
    pub question_id: QuestionId,
    pub question: String,
    pub options: Vec<String>,
    pub selected_index: Option<usize>,
    pub outcome: AnswerOutcome,
    pub correct_index: usize,
    pub explanation: Option<String>,
}

impl QuestionReview {
    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.outcome == AnswerOutcome::Correct
    }
}

/// Per-question reconstruction of an attempt, in quiz question order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptReview {
    pub attempt_id: Option<AttemptId>,
    pub questions: Vec<QuestionReview>,
    pub score: u8,
    pub passed: bool,
    pub score_source: ScoreSource,
}

impl AttemptReview {
    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.questions.iter().filter(|q| q.is_correct()).count()
    }
}

/// Rebuild the full review for a past attempt.
///
/// Answers are normalized first, so string-typed historical entries compare
/// correctly. Missing, malformed or out-of-range selections review as
/// `NotAnswered`. A stored score is trusted; a missing one is recomputed with
/// the same scorer used at submission time.
///
/// # Errors
///
/// Returns `ScoringError::NoQuestions` only when the score must be recomputed
/// and the quiz has no questions.
pub fn reconstruct(attempt: &QuizAttempt, quiz: &Quiz) -> Result<AttemptReview, ScoringError> {
    let answers = normalize(&attempt.answers);
    let questions = review_questions(quiz, &answers);

    let (score, source) = match attempt.score {
        Some(score) => (score, ScoreSource::Stored),
        None => (
            score_quiz(quiz.questions(), &answers, quiz.passing_score())?.score,
            ScoreSource::Recomputed,
        ),
    };
    let passed = attempt
        .passed
        .unwrap_or_else(|| score >= quiz.passing_score());

    Ok(AttemptReview {
        attempt_id: Some(attempt.id),
        questions,
        score,
        passed,
        score_source: source,
    })
}

/// Per-question review for a canonical answer set, without any stored score.
#[must_use]
pub fn review_questions(quiz: &Quiz, answers: &AnswerSet) -> Vec<QuestionReview> {
    quiz.questions()
        .iter()
        .map(|q| {
            let selected_index = answers.selected_option(q.id(), q.options().len());
            let outcome = match selected_index {
                None => AnswerOutcome::NotAnswered,
                Some(_) if is_correct(q, answers) => AnswerOutcome::Correct,
                Some(_) => AnswerOutcome::Incorrect,
            };
            QuestionReview {
                question_id: q.id().clone(),
                question: q.text().to_owned(),
                options: q.options().to_vec(),
                selected_index,
                outcome,
                correct_index: q.correct_index(),
                explanation: q.explanation().map(str::to_owned),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answers::RawAnswers;
    use crate::model::{ModuleId, QuizId, QuizQuestion, UserId};
    use crate::time::fixed_now;
    use serde_json::json;

    fn quiz() -> Quiz {
        let questions = (0..3)
            .map(|i| {
                QuizQuestion::new(
                    QuestionId::new(format!("q{}", i + 1)).unwrap(),
                    format!("Question {}", i + 1),
                    vec!["A".into(), "B".into(), "C".into()],
                    i,
                    Some(format!("Because {i}")),
                )
                .unwrap()
            })
            .collect();
        Quiz::new(QuizId::new(1), "Credit basics", questions, None, None, true).unwrap()
    }

    fn attempt(answers: serde_json::Value, score: Option<u8>) -> QuizAttempt {
        QuizAttempt {
            id: AttemptId::new(5),
            user_id: UserId::random(),
            quiz_id: QuizId::new(1),
            module_id: ModuleId::new(1),
            lesson_id: None,
            answers: answers.as_object().cloned().unwrap_or_else(RawAnswers::new),
            score,
            passed: score.map(|s| s >= 80),
            completed_at: fixed_now(),
        }
    }

    #[test]
    fn empty_answers_review_as_not_answered() {
        let review = reconstruct(&attempt(json!({}), None), &quiz()).unwrap();
        assert_eq!(review.score, 0);
        assert!(!review.passed);
        assert_eq!(review.score_source, ScoreSource::Recomputed);
        assert!(
            review
                .questions
                .iter()
                .all(|q| q.outcome == AnswerOutcome::NotAnswered && q.selected_index.is_none())
        );
    }

    #[test]
    fn missing_score_is_recomputed_like_the_scorer() {
        let raw = json!({"q1": "0", "q2": 1, "q3": 0});
        let review = reconstruct(&attempt(raw.clone(), None), &quiz()).unwrap();
        let expected = score_quiz(
            quiz().questions(),
            &normalize(raw.as_object().unwrap()),
            80,
        )
        .unwrap();
        assert_eq!(review.score, expected.score);
        assert_eq!(review.score, 67);
        assert_eq!(review.passed, expected.passed);
        assert_eq!(review.correct_count(), 2);
    }

    #[test]
    fn stored_score_is_trusted() {
        let review = reconstruct(&attempt(json!({"q1": 0}), Some(90)), &quiz()).unwrap();
        assert_eq!(review.score, 90);
        assert!(review.passed);
        assert_eq!(review.score_source, ScoreSource::Stored);
    }

    #[test]
    fn out_of_range_and_garbage_render_not_answered() {
        let review =
            reconstruct(&attempt(json!({"q1": 9, "q2": "x", "q3": 2}), None), &quiz()).unwrap();
        assert_eq!(review.questions[0].outcome, AnswerOutcome::NotAnswered);
        assert_eq!(review.questions[1].outcome, AnswerOutcome::NotAnswered);
        assert_eq!(review.questions[2].outcome, AnswerOutcome::Correct);
        assert_eq!(review.questions[2].explanation.as_deref(), Some("Because 2"));
    }

    #[test]
    fn wrong_selection_reports_both_indices() {
        let review = reconstruct(&attempt(json!({"q2": 0}), None), &quiz()).unwrap();
        let q2 = &review.questions[1];
        assert_eq!(q2.outcome, AnswerOutcome::Incorrect);
        assert_eq!(q2.selected_index, Some(0));
        assert_eq!(q2.correct_index, 1);
    }

    #[test]
    fn empty_quiz_without_stored_score_is_an_error() {
        let empty = Quiz::new(QuizId::new(2), "Empty", vec![], None, None, true).unwrap();
        assert_eq!(
            reconstruct(&attempt(json!({}), None), &empty).unwrap_err(),
            ScoringError::NoQuestions
        );
        assert!(reconstruct(&attempt(json!({}), Some(0)), &empty).is_ok());
    }
}
