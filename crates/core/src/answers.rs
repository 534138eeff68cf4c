//! Answer normalization boundary.
//!
//! Recorded answers arrive as loosely-typed key/value maps: values may be JSON
//! numbers or numeric strings, and historical rows contain both. Everything past
//! this module works with [`AnswerSet`] only.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::QuestionId;

/// Raw question-id → selected-option map as stored or submitted by a client.
pub type RawAnswers = Map<String, Value>;

/// Canonical answers: question id → selected option index.
///
/// Indices are signed so that out-of-range selections (including negative ones)
/// survive normalization and can be reported as "not answered" during review.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet(BTreeMap<QuestionId, i64>);

impl AnswerSet {
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, question: QuestionId, selected: i64) {
        self.0.insert(question, selected);
    }

    #[must_use]
    pub fn get(&self, question: &QuestionId) -> Option<i64> {
        self.0.get(question).copied()
    }

    /// Selected index for `question` if it points at one of `option_count` options.
    #[must_use]
    pub fn selected_option(&self, question: &QuestionId, option_count: usize) -> Option<usize> {
        self.get(question)
            .and_then(|i| usize::try_from(i).ok())
            .filter(|i| *i < option_count)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn question_ids(&self) -> impl Iterator<Item = &QuestionId> {
        self.0.keys()
    }

    /// Canonical raw form: every value is a JSON integer.
    #[must_use]
    pub fn to_raw(&self) -> RawAnswers {
        self.0
            .iter()
            .map(|(q, i)| (q.as_str().to_owned(), Value::from(*i)))
            .collect()
    }
}

impl FromIterator<(QuestionId, i64)> for AnswerSet {
    fn from_iter<T: IntoIterator<Item = (QuestionId, i64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Convert raw answers into the canonical [`AnswerSet`].
///
/// Entries are kept when the key is a valid question id and the value is a
/// finite integral number, either as a JSON number or a numeric string. Anything
/// else is treated as unanswered and dropped; this never fails.
#[must_use]
pub fn normalize(raw: &RawAnswers) -> AnswerSet {
    raw.iter()
        .filter_map(|(key, value)| {
            let question = QuestionId::new(key.as_str()).ok()?;
            let index = parse_index(value)?;
            Some((question, index))
        })
        .collect()
}

fn parse_index(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn integral(f: f64) -> Option<i64> {
    if !f.is_finite() || f.fract() != 0.0 {
        return None;
    }
    if f < i64::MIN as f64 || f > i64::MAX as f64 {
        return None;
    }
    Some(f as i64)
}
