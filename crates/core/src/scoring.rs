use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::answers::AnswerSet;
use crate::model::QuizQuestion;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScoringError {
    /// A quiz without questions has no defined score. Callers must reject it first.
    #[error("cannot score a quiz with no questions")]
    NoQuestions,
}

/// Outcome of scoring one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizScore {
    pub correct: usize,
    pub total: usize,
    /// Percent correct, 0..=100, rounded half up.
    pub score: u8,
    pub passed: bool,
}

/// Score a normalized answer set against the quiz's questions.
///
/// Each question is worth the same; a selection counts only when it equals the
/// question's correct index. Answers for ids not in `questions` are ignored.
///
/// # Errors
///
/// Returns `ScoringError::NoQuestions` when `questions` is empty.
pub fn score_quiz(
    questions: &[QuizQuestion],
    answers: &AnswerSet,
    passing_score: u8,
) -> Result<QuizScore, ScoringError> {
    if questions.is_empty() {
        return Err(ScoringError::NoQuestions);
    }

    let correct = questions
        .iter()
        .filter(|q| is_correct(q, answers))
        .count();
    let total = questions.len();
    let score = rounded_percentage(correct, total);

    Ok(QuizScore {
        correct,
        total,
        score,
        passed: score >= passing_score,
    })
}

/// Strict index equality between the recorded selection and the correct option.
#[must_use]
pub fn is_correct(question: &QuizQuestion, answers: &AnswerSet) -> bool {
    answers
        .get(question.id())
        .and_then(|i| usize::try_from(i).ok())
        .is_some_and(|i| i == question.correct_index())
}

/// `round(part / total * 100)` with halves rounded up, in integer arithmetic.
///
/// Returns 0 when `total` is 0. `part` is clamped to `total`.
#[must_use]
pub fn rounded_percentage(part: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let part = part.min(total) as u128;
    let total = total as u128;
    let pct = (part * 200 + total) / (total * 2);
    u8::try_from(pct).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answers::normalize;
    use crate::model::QuestionId;
    use serde_json::json;

    fn question(id: &str, correct: usize) -> QuizQuestion {
        QuizQuestion::new(
            QuestionId::new(id).unwrap(),
            format!("Question {id}"),
            vec!["A".into(), "B".into(), "C".into()],
            correct,
            None,
        )
        .unwrap()
    }

    fn answers(value: serde_json::Value) -> AnswerSet {
        normalize(value.as_object().unwrap())
    }

    #[test]
    fn two_of_three_rounds_to_sixty_seven_and_fails_at_eighty() {
        let qs = vec![question("q1", 0), question("q2", 1), question("q3", 2)];
        let result = score_quiz(&qs, &answers(json!({"q1": 0, "q2": 1, "q3": 0})), 80).unwrap();
        assert_eq!(result.correct, 2);
        assert_eq!(result.score, 67);
        assert!(!result.passed);
    }

    #[test]
    fn empty_answers_score_zero() {
        let qs = vec![question("q1", 0), question("q2", 1), question("q3", 2)];
        let result = score_quiz(&qs, &AnswerSet::new(), 80).unwrap();
        assert_eq!(result.score, 0);
        assert!(!result.passed);
    }

    #[test]
    fn passing_is_inclusive_of_threshold() {
        let qs: Vec<_> = (0..5).map(|i| question(&format!("q{i}"), 0)).collect();
        let result = score_quiz(
            &qs,
            &answers(json!({"q0": 0, "q1": 0, "q2": 0, "q3": 0, "q4": 2})),
            80,
        )
        .unwrap();
        assert_eq!(result.score, 80);
        assert!(result.passed);
    }

    #[test]
    fn zero_questions_is_an_error_not_a_score() {
        assert_eq!(
            score_quiz(&[], &AnswerSet::new(), 80).unwrap_err(),
            ScoringError::NoQuestions
        );
    }

    #[test]
    fn unknown_and_out_of_range_answers_never_count() {
        let qs = vec![question("q1", 0)];
        let result = score_quiz(&qs, &answers(json!({"q1": -3, "zz": 0})), 0).unwrap();
        assert_eq!(result.correct, 0);
        assert!(result.passed, "threshold of zero passes any score");
    }

    #[test]
    fn rounding_is_half_up() {
        assert_eq!(rounded_percentage(1, 8), 13); // 12.5
        assert_eq!(rounded_percentage(1, 3), 33);
        assert_eq!(rounded_percentage(2, 3), 67);
        assert_eq!(rounded_percentage(0, 0), 0);
        assert_eq!(rounded_percentage(4, 4), 100);
    }
}
