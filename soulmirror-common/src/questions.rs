//! Question bank and answer sets
//!
//! Every questionnaire uses the same five-point Likert scale. A bank is an
//! ordered list of statements with contiguous 1-based ids; statements may
//! carry an explicit dimension tag, or leave dimension assignment to the
//! scoring engine's positional rule.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lowest answer value on the scale
pub const SCALE_MIN: u8 = 1;

/// Highest answer value on the scale
pub const SCALE_MAX: u8 = 5;

/// Option labels of the standard scale, ordered by value
pub const SCALE_LABELS: [&str; 5] = ["非常不符合", "不符合", "中立", "符合", "非常符合"];

/// One selectable answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub label: String,
    pub value: u8,
}

/// The five options of the standard scale
pub fn standard_options() -> Vec<AnswerOption> {
    SCALE_LABELS
        .iter()
        .zip(SCALE_MIN..=SCALE_MAX)
        .map(|(label, value)| AnswerOption {
            label: (*label).to_string(),
            value,
        })
        .collect()
}

/// A single questionnaire statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// 1-based position in the bank
    pub id: u32,
    pub text: String,
    /// Explicit dimension tag (absent for positionally assigned banks)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<String>,
    pub options: Vec<AnswerOption>,
}

/// Validated, immutable list of questions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// Validate and wrap a list of questions
    ///
    /// Ids must run 1..=n in order, every question must offer exactly the
    /// standard five values, and dimension tags must be non-empty.
    pub fn new(questions: Vec<Question>) -> Result<Self> {
        if questions.is_empty() {
            return Err(Error::Configuration("question bank is empty".to_string()));
        }

        for (index, question) in questions.iter().enumerate() {
            let expected = index as u32 + 1;
            if question.id != expected {
                return Err(Error::Configuration(format!(
                    "question ids must be contiguous from 1: position {} has id {}",
                    expected, question.id
                )));
            }
            if question.text.trim().is_empty() {
                return Err(Error::Configuration(format!(
                    "question {} has empty text",
                    question.id
                )));
            }
            if matches!(&question.dimension, Some(tag) if tag.trim().is_empty()) {
                return Err(Error::Configuration(format!(
                    "question {} has an empty dimension tag",
                    question.id
                )));
            }
            let values: Vec<u8> = question.options.iter().map(|o| o.value).collect();
            if values != (SCALE_MIN..=SCALE_MAX).collect::<Vec<u8>>() {
                return Err(Error::Configuration(format!(
                    "question {} must offer values {}..={} in order, got {:?}",
                    question.id, SCALE_MIN, SCALE_MAX, values
                )));
            }
        }

        Ok(Self { questions })
    }

    /// Build an untagged bank from plain statements using the standard scale
    pub fn from_statements<I, S>(statements: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let questions = statements
            .into_iter()
            .enumerate()
            .map(|(index, text)| Question {
                id: index as u32 + 1,
                text: text.into(),
                dimension: None,
                options: standard_options(),
            })
            .collect();
        Self::new(questions)
    }

    /// Build a tagged bank from `(statement, dimension)` pairs
    pub fn from_tagged<I, S, D>(statements: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, D)>,
        S: Into<String>,
        D: Into<String>,
    {
        let questions = statements
            .into_iter()
            .enumerate()
            .map(|(index, (text, dimension))| Question {
                id: index as u32 + 1,
                text: text.into(),
                dimension: Some(dimension.into()),
                options: standard_options(),
            })
            .collect();
        Self::new(questions)
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Look up a question by id
    pub fn get(&self, id: u32) -> Option<&Question> {
        let index = usize::try_from(id).ok()?.checked_sub(1)?;
        self.questions.get(index)
    }

    /// True when every question carries an explicit dimension tag
    pub fn is_tagged(&self) -> bool {
        self.questions.iter().all(|q| q.dimension.is_some())
    }

    /// Check a single answer against the bank and the scale
    pub fn check_answer(&self, question_id: u32, value: u8) -> Result<()> {
        if !(SCALE_MIN..=SCALE_MAX).contains(&value) {
            return Err(Error::malformed(
                question_id,
                value,
                format!("value must be within {}..={}", SCALE_MIN, SCALE_MAX),
            ));
        }
        if self.get(question_id).is_none() {
            return Err(Error::malformed(
                question_id,
                value,
                format!("no such question (bank has {})", self.len()),
            ));
        }
        Ok(())
    }
}

/// Respondent answers keyed by question id
///
/// Serializes as a plain map, e.g. `{"1": 3, "2": 5}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet(BTreeMap<u32, u8>);

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an answer, returning the previous value if the question was
    /// already answered. No validation happens here.
    pub fn record(&mut self, question_id: u32, value: u8) -> Option<u8> {
        self.0.insert(question_id, value)
    }

    pub fn get(&self, question_id: u32) -> Option<u8> {
        self.0.get(&question_id).copied()
    }

    pub fn contains(&self, question_id: u32) -> bool {
        self.0.contains_key(&question_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Answers in ascending question-id order
    pub fn iter(&self) -> impl Iterator<Item = (u32, u8)> + '_ {
        self.0.iter().map(|(id, value)| (*id, *value))
    }

    /// Reject any answer outside the scale or referencing an unknown question
    pub fn validate_against(&self, bank: &QuestionBank) -> Result<()> {
        self.iter()
            .try_for_each(|(id, value)| bank.check_answer(id, value))
    }

    /// True when every question in the bank has an answer
    ///
    /// Assumes the set has already been validated against the same bank.
    pub fn is_complete_for(&self, bank: &QuestionBank) -> bool {
        self.len() == bank.len()
    }
}

impl FromIterator<(u32, u8)> for AnswerSet {
    fn from_iter<T: IntoIterator<Item = (u32, u8)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
