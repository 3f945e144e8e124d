//! Archetype resolver
//!
//! Ranks dimension scores and maps the leading dimensions to archetype
//! records. Ranking is a stable descending sort, so ties keep definition
//! order and the first-listed dimension wins. Lookup never fails: a dimension
//! with no configured archetype resolves to a placeholder record.

use crate::definitions::{ArchetypeRecord, TestDefinition};
use crate::scoring::DimensionScore;
use crate::{Error, Result};
use serde::Serialize;
use tracing::debug;

/// One ranked dimension with its archetype
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDimension {
    pub dimension: String,
    /// Position of the dimension in the definition
    pub index: usize,
    pub score: u8,
    pub archetype: ArchetypeRecord,
}

/// Outcome of ranking a score set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub primary: ResolvedDimension,
    pub secondary: ResolvedDimension,
    /// Lowest-ranked dimension
    pub weakest: ResolvedDimension,
    /// Dimension names, highest score first
    pub ranked_dimensions: Vec<String>,
    /// Scores aligned with `ranked_dimensions`
    pub ranked_scores: Vec<u8>,
}

impl Resolution {
    /// Dimension name and score at `rank` (0 = highest)
    pub fn ranked(&self, rank: usize) -> Option<(&str, u8)> {
        let dimension = self.ranked_dimensions.get(rank)?;
        let score = *self.ranked_scores.get(rank)?;
        Some((dimension.as_str(), score))
    }
}

/// Selects primary, secondary and weakest dimensions
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchetypeResolver;

impl ArchetypeResolver {
    pub fn new() -> Self {
        Self
    }

    /// Rank `scores` and attach archetypes from `definition`
    pub fn resolve(
        &self,
        scores: &[DimensionScore],
        definition: &TestDefinition,
    ) -> Result<Resolution> {
        if scores.len() < 2 {
            return Err(Error::Configuration(format!(
                "need at least two dimension scores to rank, got {}",
                scores.len()
            )));
        }

        let mut order: Vec<usize> = (0..scores.len()).collect();
        // Vec::sort_by is stable: equal scores keep definition order
        order.sort_by(|&a, &b| scores[b].normalized.cmp(&scores[a].normalized));

        let slot = |position: usize| {
            let score = &scores[position];
            ResolvedDimension {
                dimension: score.dimension.clone(),
                index: definition
                    .dimension_index(&score.dimension)
                    .unwrap_or(position),
                score: score.normalized,
                archetype: definition.archetype_or_placeholder(&score.dimension),
            }
        };

        let resolution = Resolution {
            primary: slot(order[0]),
            secondary: slot(order[1]),
            weakest: slot(order[order.len() - 1]),
            ranked_dimensions: order.iter().map(|&i| scores[i].dimension.clone()).collect(),
            ranked_scores: order.iter().map(|&i| scores[i].normalized).collect(),
        };

        debug!(
            primary = %resolution.primary.dimension,
            secondary = %resolution.secondary.dimension,
            weakest = %resolution.weakest.dimension,
            archetype = %resolution.primary.archetype.name,
            "Archetype resolved"
        );

        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn definition() -> TestDefinition {
        TestDefinition::from_positional(
            ["A", "B", "C", "D", "E", "F"],
            ["Alpha", "Beta", "Gamma", "Delta", "Epsilon", "Zeta"],
            ["q"],
            Some(["da", "db", "dc", "dd", "de", "df"]),
        )
        .unwrap()
    }

    fn scores(values: [u8; 6]) -> Vec<DimensionScore> {
        ["A", "B", "C", "D", "E", "F"]
            .iter()
            .zip(values)
            .map(|(d, v)| DimensionScore {
                dimension: d.to_string(),
                raw: 0,
                count: 1,
                normalized: v,
            })
            .collect()
    }

    #[test]
    fn test_ranking_descending() {
        let resolution = ArchetypeResolver::new()
            .resolve(&scores([40, 90, 10, 70, 55, 60]), &definition())
            .unwrap();

        assert_eq!(resolution.ranked_dimensions, vec!["B", "D", "F", "E", "A", "C"]);
        assert_eq!(resolution.ranked_scores, vec![90, 70, 60, 55, 40, 10]);
        assert_eq!(resolution.primary.dimension, "B");
        assert_eq!(resolution.primary.index, 1);
        assert_eq!(resolution.primary.archetype.name, "Beta");
        assert_eq!(resolution.primary.archetype.description, "db");
        assert_eq!(resolution.secondary.dimension, "D");
        assert_eq!(resolution.weakest.dimension, "C");
        assert_eq!(resolution.ranked(2), Some(("F", 60)));
        assert_eq!(resolution.ranked(6), None);
    }

    #[test]
    fn test_ties_keep_definition_order() {
        let resolution = ArchetypeResolver::new()
            .resolve(&scores([60, 80, 60, 80, 20, 20]), &definition())
            .unwrap();
        assert_eq!(resolution.ranked_dimensions, vec!["B", "D", "A", "C", "E", "F"]);
        assert_eq!(resolution.primary.dimension, "B");
        assert_eq!(resolution.secondary.dimension, "D");
        assert_eq!(resolution.weakest.dimension, "F");
    }

    #[test]
    fn test_all_equal_scores() {
        let resolution = ArchetypeResolver::new()
            .resolve(&scores([20; 6]), &definition())
            .unwrap();
        assert_eq!(resolution.primary.dimension, "A");
        assert_eq!(resolution.secondary.dimension, "B");
        assert_eq!(resolution.weakest.dimension, "F");
        assert_ne!(resolution.primary.dimension, resolution.weakest.dimension);
    }

    #[test]
    fn test_missing_archetype_gets_placeholder() {
        let mut records = BTreeMap::new();
        records.insert(
            "A".to_string(),
            ArchetypeRecord {
                name: "Alpha".to_string(),
                description: "alpha".to_string(),
                advice: "go".to_string(),
            },
        );
        let def =
            TestDefinition::from_records(["A", "B", "C", "D", "E", "F"], records, ["q"]).unwrap();
        let resolution = ArchetypeResolver::new()
            .resolve(&scores([10, 10, 95, 10, 10, 10]), &def)
            .unwrap();

        assert_eq!(resolution.primary.archetype.name, "C型");
        assert!(!resolution.primary.archetype.description.is_empty());
        assert_eq!(resolution.secondary.archetype.name, "Alpha");
    }

    #[test]
    fn test_too_few_scores_rejected() {
        let single = scores([50; 6]).into_iter().take(1).collect::<Vec<_>>();
        assert!(matches!(
            ArchetypeResolver::new().resolve(&single, &definition()),
            Err(Error::Configuration(_))
        ));
    }
}
