//! Scoring engine
//!
//! Aggregates raw Likert answers into one normalized score per dimension.
//!
//! # Dimension assignment
//! - **Positional**: question `q` scores for `dimensions[(q - 1) mod n]`
//! - **Tagged**: question scores for its own dimension tag; answers whose tag
//!   is not one of the definition's dimensions are left out of every total
//!
//! The strategy is picked from the bank (tagged only when every question has
//! a tag) unless the engine is pinned to one explicitly.
//!
//! # Normalization
//! `normalized = round(raw / (count * 5) * 100)`, clamped to 0..=100. A
//! dimension that received no answers gets [`NEUTRAL_SCORE`].
//!
//! Scoring is deterministic. Jitter exists only as a display policy for the
//! radar chart and never feeds back into ranking.

use crate::questions::{AnswerSet, Question, QuestionBank, SCALE_MAX};
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Score assigned to a dimension with no matching answers
pub const NEUTRAL_SCORE: u8 = 50;

/// How a question is mapped to a dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionStrategy {
    Positional,
    Tagged,
}

impl DimensionStrategy {
    /// Tagged when every question carries a tag, positional otherwise
    pub fn for_bank(bank: &QuestionBank) -> Self {
        if bank.is_tagged() {
            DimensionStrategy::Tagged
        } else {
            DimensionStrategy::Positional
        }
    }

    /// Index into `dimensions` that `question` contributes to
    pub fn assign(&self, question: &Question, dimensions: &[String]) -> Option<usize> {
        if dimensions.is_empty() {
            return None;
        }
        match self {
            DimensionStrategy::Positional => {
                let offset = question.id.checked_sub(1)? as usize;
                Some(offset % dimensions.len())
            }
            DimensionStrategy::Tagged => {
                let tag = question.dimension.as_deref()?;
                dimensions.iter().position(|d| d == tag)
            }
        }
    }
}

/// Aggregated score of one dimension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub dimension: String,
    /// Sum of matched answer values
    pub raw: u32,
    /// Number of matched answers
    pub count: u32,
    /// 0..=100
    pub normalized: u8,
}

/// Normalize a raw sum against its maximum possible value
pub fn normalize(raw: u32, count: u32) -> u8 {
    if count == 0 {
        return NEUTRAL_SCORE;
    }
    let max_possible = f64::from(count) * f64::from(SCALE_MAX);
    let percent = (f64::from(raw) / max_possible * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}

/// Aggregates answers into per-dimension scores
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEngine {
    strategy: Option<DimensionStrategy>,
}

impl ScoringEngine {
    /// Engine that picks the strategy from each bank
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine pinned to one strategy regardless of bank tags
    pub fn with_strategy(strategy: DimensionStrategy) -> Self {
        Self {
            strategy: Some(strategy),
        }
    }

    /// Strategy used for `bank`
    pub fn strategy_for(&self, bank: &QuestionBank) -> DimensionStrategy {
        self.strategy
            .unwrap_or_else(|| DimensionStrategy::for_bank(bank))
    }

    /// Score `answers` against `bank`, one entry per dimension in order
    ///
    /// Fails with `MalformedAnswer` if any answer is off the scale or names a
    /// question outside the bank. Partial answer sets are scored as-is;
    /// completeness is the caller's concern.
    pub fn score(
        &self,
        answers: &AnswerSet,
        bank: &QuestionBank,
        dimensions: &[String],
    ) -> Result<Vec<DimensionScore>> {
        if dimensions.is_empty() {
            return Err(Error::Configuration(
                "cannot score without dimensions".to_string(),
            ));
        }
        answers.validate_against(bank)?;

        let strategy = self.strategy_for(bank);
        let mut raw = vec![0u32; dimensions.len()];
        let mut counts = vec![0u32; dimensions.len()];
        let mut excluded = 0usize;

        for (question_id, value) in answers.iter() {
            // validated above, so the lookup cannot miss
            let Some(question) = bank.get(question_id) else {
                continue;
            };
            match strategy.assign(question, dimensions) {
                Some(index) => {
                    raw[index] += u32::from(value);
                    counts[index] += 1;
                }
                None => excluded += 1,
            }
        }

        let scores: Vec<DimensionScore> = dimensions
            .iter()
            .zip(raw.iter().zip(counts.iter()))
            .map(|(dimension, (&raw, &count))| DimensionScore {
                dimension: dimension.clone(),
                raw,
                count,
                normalized: normalize(raw, count),
            })
            .collect();

        debug!(
            strategy = ?strategy,
            answers = answers.len(),
            excluded,
            normalized = ?scores.iter().map(|s| s.normalized).collect::<Vec<_>>(),
            "Scoring complete"
        );

        Ok(scores)
    }
}

/// Cosmetic perturbation of chart values
///
/// Adds a random offset in `0..=amplitude` to each displayed value and caps
/// the result at 100. Only chart values are affected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum JitterPolicy {
    #[default]
    Disabled,
    /// Reproducible jitter from a fixed seed
    Seeded { seed: u64, amplitude: u8 },
    /// Jitter from the thread-local generator
    Entropy { amplitude: u8 },
}

impl JitterPolicy {
    /// Display values for `scores`, in the same order
    pub fn apply(&self, scores: &[DimensionScore]) -> Vec<u8> {
        match *self {
            JitterPolicy::Disabled => scores.iter().map(|s| s.normalized).collect(),
            JitterPolicy::Seeded { seed, amplitude } => {
                let mut rng = StdRng::seed_from_u64(seed);
                perturb(scores, amplitude, &mut rng)
            }
            JitterPolicy::Entropy { amplitude } => {
                perturb(scores, amplitude, &mut rand::thread_rng())
            }
        }
    }
}

fn perturb<R: Rng + ?Sized>(scores: &[DimensionScore], amplitude: u8, rng: &mut R) -> Vec<u8> {
    scores
        .iter()
        .map(|s| {
            let delta = rng.gen_range(0..=amplitude);
            (u16::from(s.normalized) + u16::from(delta)).min(100) as u8
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims() -> Vec<String> {
        ["A", "B", "C", "D", "E", "F"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn untagged_bank(n: usize) -> QuestionBank {
        QuestionBank::from_statements((1..=n).map(|i| format!("statement {}", i))).unwrap()
    }

    fn uniform_answers(n: u32, value: u8) -> AnswerSet {
        (1..=n).map(|id| (id, value)).collect()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(35, 7), 100);
        assert_eq!(normalize(7, 7), 20);
        assert_eq!(normalize(21, 7), 60);
        assert_eq!(normalize(0, 0), NEUTRAL_SCORE);
        // 13 / 15 = 86.67
        assert_eq!(normalize(13, 3), 87);
        // 5 / 10 = 50.0 exactly; 9 / 20 = 45
        assert_eq!(normalize(5, 2), 50);
        assert_eq!(normalize(9, 4), 45);
    }

    #[test]
    fn test_positional_assignment_wraps() {
        let bank = untagged_bank(8);
        let dimensions = dims();
        let strategy = DimensionStrategy::Positional;
        assert_eq!(strategy.assign(bank.get(1).unwrap(), &dimensions), Some(0));
        assert_eq!(strategy.assign(bank.get(6).unwrap(), &dimensions), Some(5));
        assert_eq!(strategy.assign(bank.get(7).unwrap(), &dimensions), Some(0));
        assert_eq!(strategy.assign(bank.get(8).unwrap(), &dimensions), Some(1));
    }

    #[test]
    fn test_strategy_selected_from_bank() {
        assert_eq!(
            DimensionStrategy::for_bank(&untagged_bank(3)),
            DimensionStrategy::Positional
        );
        let tagged = QuestionBank::from_tagged([("x", "A"), ("y", "B")]).unwrap();
        assert_eq!(DimensionStrategy::for_bank(&tagged), DimensionStrategy::Tagged);
    }

    #[test]
    fn test_forty_neutral_answers() {
        let bank = untagged_bank(40);
        let scores = ScoringEngine::new()
            .score(&uniform_answers(40, 3), &bank, &dims())
            .unwrap();

        assert_eq!(scores.len(), 6);
        let counts: Vec<u32> = scores.iter().map(|s| s.count).collect();
        assert_eq!(counts, vec![7, 7, 7, 7, 6, 6]);
        assert!(scores.iter().all(|s| s.normalized == 60));
    }

    #[test]
    fn test_skewed_answers() {
        let bank = untagged_bank(40);
        // question ids 3, 9, 15, ... map to C
        let answers: AnswerSet = (1..=40u32)
            .map(|id| (id, if (id - 1) % 6 == 2 { 5 } else { 1 }))
            .collect();
        let scores = ScoringEngine::new().score(&answers, &bank, &dims()).unwrap();

        assert_eq!(scores[2].dimension, "C");
        assert_eq!(scores[2].normalized, 100);
        for (index, score) in scores.iter().enumerate() {
            if index != 2 {
                assert_eq!(score.normalized, 20, "{} should be 20", score.dimension);
            }
        }
    }

    #[test]
    fn test_tagged_assignment_excludes_unknown_tags() {
        let bank = QuestionBank::from_tagged([
            ("q1", "A"),
            ("q2", "A"),
            ("q3", "B"),
            ("q4", "Z"),
        ])
        .unwrap();
        let answers: AnswerSet = [(1, 5), (2, 3), (3, 2), (4, 5)].into_iter().collect();
        let scores = ScoringEngine::new().score(&answers, &bank, &dims()).unwrap();

        assert_eq!(scores[0].raw, 8);
        assert_eq!(scores[0].count, 2);
        assert_eq!(scores[0].normalized, 80);
        assert_eq!(scores[1].normalized, 40);
        // C..F untouched
        for score in &scores[2..] {
            assert_eq!(score.count, 0);
            assert_eq!(score.normalized, NEUTRAL_SCORE);
        }
        let total: u32 = scores.iter().map(|s| s.count).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn test_pinned_positional_ignores_tags() {
        let bank = QuestionBank::from_tagged([("q1", "F"), ("q2", "F")]).unwrap();
        let answers: AnswerSet = [(1, 5), (2, 5)].into_iter().collect();
        let scores = ScoringEngine::with_strategy(DimensionStrategy::Positional)
            .score(&answers, &bank, &dims())
            .unwrap();
        assert_eq!(scores[0].count, 1);
        assert_eq!(scores[1].count, 1);
        assert_eq!(scores[5].count, 0);
    }

    #[test]
    fn test_malformed_answers_rejected() {
        let bank = untagged_bank(6);
        let engine = ScoringEngine::new();

        let out_of_range: AnswerSet = [(1, 6)].into_iter().collect();
        assert!(matches!(
            engine.score(&out_of_range, &bank, &dims()),
            Err(Error::MalformedAnswer { question_id: 1, value: 6, .. })
        ));

        let unknown: AnswerSet = [(7, 3)].into_iter().collect();
        assert!(matches!(
            engine.score(&unknown, &bank, &dims()),
            Err(Error::MalformedAnswer { question_id: 7, .. })
        ));
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let bank = untagged_bank(40);
        let answers: AnswerSet = (1..=40u32).map(|id| (id, (id % 5 + 1) as u8)).collect();
        let engine = ScoringEngine::new();
        let first = engine.score(&answers, &bank, &dims()).unwrap();
        let second = engine.score(&answers, &bank, &dims()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_jitter_disabled_is_identity() {
        let bank = untagged_bank(12);
        let scores = ScoringEngine::new()
            .score(&uniform_answers(12, 4), &bank, &dims())
            .unwrap();
        assert_eq!(JitterPolicy::Disabled.apply(&scores), vec![80; 6]);
    }

    #[test]
    fn test_seeded_jitter_is_reproducible_and_bounded() {
        let bank = untagged_bank(12);
        let scores = ScoringEngine::new()
            .score(&uniform_answers(12, 5), &bank, &dims())
            .unwrap();
        let policy = JitterPolicy::Seeded {
            seed: 7,
            amplitude: 5,
        };
        let first = policy.apply(&scores);
        assert_eq!(first, policy.apply(&scores));
        // already at 100, jitter cannot push past the cap
        assert!(first.iter().all(|v| *v == 100));
    }

    #[test]
    fn test_entropy_jitter_stays_in_range() {
        let bank = untagged_bank(12);
        let scores = ScoringEngine::new()
            .score(&uniform_answers(12, 3), &bank, &dims())
            .unwrap();
        let values = JitterPolicy::Entropy { amplitude: 5 }.apply(&scores);
        assert!(values.iter().all(|v| (60..=65).contains(v)));
    }
}
