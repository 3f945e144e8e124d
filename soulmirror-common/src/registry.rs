//! Read-only registry of questionnaire configuration
//!
//! Holds the catalog, the test definitions and the question banks. A
//! registry is built once (from the compiled-in table, optionally overlaid by
//! a TOML file) and then shared immutably, typically behind an `Arc`.
//!
//! # Lookup rules
//! - A questionnaire id without its own definition uses `default`.
//! - A questionnaire id without its own bank uses the shared bank.
//! - Building a registry without a `default` definition fails, so lookups
//!   after construction cannot hit the missing-definition case.

use crate::catalog::TestConfig;
use crate::definitions::{RawDefinition, TestDefinition};
use crate::questions::{standard_options, Question, QuestionBank};
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info, warn};

/// Key of the fallback definition
pub const DEFAULT_DEFINITION_ID: &str = "default";

/// Compiled-in configuration table
const BUILTIN_TOML: &str = include_str!("../data/builtin.toml");

/// Bank as written in configuration: plain statements or tagged questions
#[derive(Debug, Clone, Default, Deserialize)]
struct RawBank {
    #[serde(default)]
    statements: Vec<String>,
    #[serde(default)]
    questions: Vec<RawQuestion>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawQuestion {
    text: String,
    #[serde(default)]
    dimension: Option<String>,
}

impl TryFrom<RawBank> for QuestionBank {
    type Error = Error;

    fn try_from(raw: RawBank) -> Result<Self> {
        match (raw.statements.is_empty(), raw.questions.is_empty()) {
            (false, true) => QuestionBank::from_statements(raw.statements),
            (true, false) => QuestionBank::new(
                raw.questions
                    .into_iter()
                    .enumerate()
                    .map(|(index, q)| Question {
                        id: index as u32 + 1,
                        text: q.text,
                        dimension: q.dimension,
                        options: standard_options(),
                    })
                    .collect(),
            ),
            (false, false) => Err(Error::Configuration(
                "bank must use either `statements` or `questions`, not both".to_string(),
            )),
            (true, true) => Err(Error::Configuration("question bank is empty".to_string())),
        }
    }
}

/// Registry file layout (built-in table and overlays share it)
#[derive(Debug, Default, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    catalog: Vec<TestConfig>,
    #[serde(default)]
    bank: Option<RawBank>,
    #[serde(default)]
    banks: BTreeMap<String, RawBank>,
    #[serde(default)]
    definitions: BTreeMap<String, RawDefinition>,
}

/// Immutable questionnaire configuration
#[derive(Debug, Clone)]
pub struct DefinitionRegistry {
    catalog: Vec<TestConfig>,
    definitions: HashMap<String, TestDefinition>,
    shared_bank: QuestionBank,
    banks: HashMap<String, QuestionBank>,
}

impl DefinitionRegistry {
    /// Start building a registry around a shared question bank
    pub fn builder(shared_bank: QuestionBank) -> RegistryBuilder {
        RegistryBuilder {
            catalog: Vec::new(),
            definitions: HashMap::new(),
            shared_bank,
            banks: HashMap::new(),
        }
    }

    /// Registry of the compiled-in catalog, bank and definitions
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_TOML)
    }

    /// Parse a complete registry (must contain `[bank]` and `[definitions.default]`)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut file: RegistryFile = toml::from_str(content)?;
        let shared = file
            .bank
            .take()
            .ok_or_else(|| Error::Configuration("registry has no shared [bank]".to_string()))?;
        let builder = Self::builder(QuestionBank::try_from(shared)?);
        builder.merge_file(file)?.build()
    }

    /// Built-in registry overlaid with the TOML file at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!(
                "cannot read definitions file {}: {}",
                path.display(),
                e
            ))
        })?;
        let registry = Self::builtin()?.overlay_toml_str(&content)?;
        info!(
            path = %path.display(),
            definitions = registry.definitions.len(),
            "Loaded questionnaire definitions"
        );
        Ok(registry)
    }

    /// Apply a partial TOML table on top of this registry
    ///
    /// Catalog entries replace entries with the same id or are appended;
    /// definitions and banks replace entries with the same id; a `[bank]`
    /// table replaces the shared bank.
    pub fn overlay_toml_str(self, content: &str) -> Result<Self> {
        let file: RegistryFile = toml::from_str(content)?;
        let builder = RegistryBuilder {
            catalog: self.catalog,
            definitions: self.definitions,
            shared_bank: self.shared_bank,
            banks: self.banks,
        };
        builder.merge_file(file)?.build()
    }

    /// Definition for a questionnaire, falling back to `default`
    pub fn definition(&self, questionnaire_id: &str) -> Result<&TestDefinition> {
        if let Some(definition) = self.definitions.get(questionnaire_id) {
            return Ok(definition);
        }
        debug!(questionnaire_id, "No specific definition, using default");
        self.definitions.get(DEFAULT_DEFINITION_ID).ok_or_else(|| {
            Error::Configuration(format!(
                "no definition for '{}' and no default registered",
                questionnaire_id
            ))
        })
    }

    /// True when the questionnaire has its own definition
    pub fn has_own_definition(&self, questionnaire_id: &str) -> bool {
        self.definitions.contains_key(questionnaire_id)
    }

    /// Question bank for a questionnaire, falling back to the shared bank
    pub fn bank(&self, questionnaire_id: &str) -> &QuestionBank {
        self.banks.get(questionnaire_id).unwrap_or(&self.shared_bank)
    }

    pub fn catalog(&self) -> &[TestConfig] {
        &self.catalog
    }

    /// Catalog entry by id
    pub fn test_config(&self, questionnaire_id: &str) -> Option<&TestConfig> {
        self.catalog.iter().find(|t| t.id == questionnaire_id)
    }

    /// Ids of every registered definition, sorted
    pub fn definition_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

/// Incremental registry construction
pub struct RegistryBuilder {
    catalog: Vec<TestConfig>,
    definitions: HashMap<String, TestDefinition>,
    shared_bank: QuestionBank,
    banks: HashMap<String, QuestionBank>,
}

impl RegistryBuilder {
    /// Register or replace a definition
    pub fn definition(mut self, id: impl Into<String>, definition: TestDefinition) -> Self {
        self.definitions.insert(id.into(), definition);
        self
    }

    /// Register or replace a questionnaire-specific bank
    pub fn bank(mut self, id: impl Into<String>, bank: QuestionBank) -> Self {
        self.banks.insert(id.into(), bank);
        self
    }

    /// Add or replace a catalog entry
    pub fn catalog_entry(mut self, entry: TestConfig) -> Self {
        match self.catalog.iter_mut().find(|t| t.id == entry.id) {
            Some(existing) => *existing = entry,
            None => self.catalog.push(entry),
        }
        self
    }

    fn merge_file(mut self, file: RegistryFile) -> Result<Self> {
        if let Some(bank) = file.bank {
            self.shared_bank = QuestionBank::try_from(bank)?;
        }
        for entry in file.catalog {
            self = self.catalog_entry(entry);
        }
        for (id, raw) in file.banks {
            let bank = QuestionBank::try_from(raw)
                .map_err(|e| Error::Configuration(format!("bank '{}': {}", id, e)))?;
            self.banks.insert(id, bank);
        }
        for (id, raw) in file.definitions {
            let definition = TestDefinition::try_from(raw)
                .map_err(|e| Error::Configuration(format!("definition '{}': {}", id, e)))?;
            self.definitions.insert(id, definition);
        }
        Ok(self)
    }

    /// Validate and freeze the registry
    pub fn build(self) -> Result<DefinitionRegistry> {
        if !self.definitions.contains_key(DEFAULT_DEFINITION_ID) {
            return Err(Error::Configuration(format!(
                "registry must include a '{}' definition",
                DEFAULT_DEFINITION_ID
            )));
        }

        let registry = DefinitionRegistry {
            catalog: self.catalog,
            definitions: self.definitions,
            shared_bank: self.shared_bank,
            banks: self.banks,
        };

        for entry in &registry.catalog {
            let bank_len = registry.bank(&entry.id).len();
            if entry.question_count != bank_len {
                warn!(
                    questionnaire_id = %entry.id,
                    advertised = entry.question_count,
                    actual = bank_len,
                    "Catalog question count differs from bank size"
                );
            }
        }

        let bank_ids = registry
            .definitions
            .keys()
            .chain(registry.banks.keys())
            .collect::<HashSet<_>>();
        for id in bank_ids {
            let bank = registry.bank(id);
            if !bank.is_tagged() {
                continue;
            }
            let definition = registry.definition(id)?;
            let unmatched = bank
                .questions()
                .iter()
                .filter_map(|q| q.dimension.as_deref())
                .filter(|tag| definition.dimension_index(tag).is_none())
                .count();
            if unmatched > 0 {
                warn!(
                    questionnaire_id = %id,
                    unmatched,
                    "Tagged questions name dimensions outside the definition; they will not be scored"
                );
            }
        }

        debug!(
            catalog = registry.catalog.len(),
            definitions = registry.definitions.len(),
            banks = registry.banks.len(),
            "Registry built"
        );
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_loads() {
        let registry = DefinitionRegistry::builtin().unwrap();
        assert_eq!(registry.catalog().len(), 12);
        assert_eq!(
            registry.definition_ids(),
            vec!["animal-persona", "default", "mbti-deep", "sexual-repression"]
        );
        assert_eq!(registry.bank("animal-persona").len(), 40);
    }

    #[test]
    fn test_unknown_id_falls_back_to_default() {
        let registry = DefinitionRegistry::builtin().unwrap();
        let fallback = registry.definition("dark-triad").unwrap();
        let default = registry.definition(DEFAULT_DEFINITION_ID).unwrap();
        assert_eq!(fallback, default);
        assert!(!registry.has_own_definition("dark-triad"));
        assert!(registry.has_own_definition("mbti-deep"));
    }

    #[test]
    fn test_every_catalog_entry_shares_the_bank() {
        let registry = DefinitionRegistry::builtin().unwrap();
        let first = registry.bank("animal-persona");
        for entry in registry.catalog() {
            assert_eq!(registry.bank(&entry.id), first);
            assert_eq!(entry.question_count, first.len());
        }
    }

    #[test]
    fn test_missing_default_is_rejected() {
        let result = DefinitionRegistry::from_toml_str(
            r#"
            [bank]
            statements = ["one"]

            [definitions.only]
            dimensions = ["A", "B", "C", "D", "E", "F"]
            quotes = ["q"]
            "#,
        );
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_missing_shared_bank_is_rejected() {
        let result = DefinitionRegistry::from_toml_str(
            r#"
            [definitions.default]
            dimensions = ["A", "B", "C", "D", "E", "F"]
            quotes = ["q"]
            "#,
        );
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_overlay_adds_definition_and_bank() {
        let registry = DefinitionRegistry::builtin()
            .unwrap()
            .overlay_toml_str(
                r#"
                [banks.dark-triad]
                questions = [
                    { text = "q1", dimension = "自恋" },
                    { text = "q2", dimension = "操纵" },
                ]

                [definitions.dark-triad]
                dimensions = ["自恋", "操纵", "冷漠", "冲动", "支配", "多疑"]
                quotes = ["暗面也是你的一部分。"]

                [definitions.dark-triad.archetypes]
                "自恋" = { name = "镜中王者", description = "d", advice = "a" }
                "#,
            )
            .unwrap();

        assert!(registry.has_own_definition("dark-triad"));
        assert!(registry.bank("dark-triad").is_tagged());
        assert_eq!(registry.bank("dark-triad").len(), 2);
        assert_eq!(registry.bank("eq-pro").len(), 40);
    }

    #[test]
    fn test_overlay_rejects_invalid_definition() {
        let result = DefinitionRegistry::builtin().unwrap().overlay_toml_str(
            r#"
            [definitions.broken]
            dimensions = ["A", "B"]
            quotes = ["q"]
            "#,
        );
        match result {
            Err(Error::Configuration(msg)) => assert!(msg.contains("broken")),
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_bank_with_both_shapes_rejected() {
        let raw = RawBank {
            statements: vec!["a".to_string()],
            questions: vec![RawQuestion {
                text: "b".to_string(),
                dimension: None,
            }],
        };
        assert!(matches!(
            QuestionBank::try_from(raw),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_catalog_entry_replaced_by_id() {
        let registry = DefinitionRegistry::builtin()
            .unwrap()
            .overlay_toml_str(
                r#"
                [[catalog]]
                id = "eq-pro"
                title = "情商雷达"
                description = "新版描述"
                question_count = 40
                "#,
            )
            .unwrap();
        assert_eq!(registry.catalog().len(), 12);
        assert_eq!(registry.test_config("eq-pro").unwrap().title, "情商雷达");
    }
}
