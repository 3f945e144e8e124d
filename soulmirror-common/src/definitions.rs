//! Test definitions
//!
//! A test definition names the six scored dimensions of one questionnaire,
//! the archetype attached to each dimension, a pool of quotes and optional
//! per-dimension description templates.
//!
//! Archetypes arrive from configuration in two shapes: a positional list of
//! names aligned with `dimensions`, or a mapping from dimension name to either
//! a bare name or a `{name, description, advice}` record. Both shapes are
//! normalized here into one [`ArchetypeRecord`] per dimension, so nothing
//! downstream branches on the source shape.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::warn;

/// Number of radar axes every definition is reduced to
pub const DIMENSION_COUNT: usize = 6;

/// Descriptive record attached to a dominant dimension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchetypeRecord {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub advice: String,
}

impl ArchetypeRecord {
    /// Stand-in record for a dimension with no configured archetype
    ///
    /// Named `<dimension>型`. The description falls back to the dimension's
    /// template when one exists so it is never empty; advice stays empty and
    /// the synthesizer substitutes generic guidance.
    pub fn placeholder(dimension: &str, template: Option<&str>) -> Self {
        let description = match template {
            Some(text) if !text.trim().is_empty() => text.to_string(),
            _ => format!("{}是你身上最鲜明的底色，也是你理解世界的第一视角。", dimension),
        };
        Self {
            name: format!("{}型", dimension),
            description,
            advice: String::new(),
        }
    }
}

/// Archetype entry inside a mapping: a bare name or a full record
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawArchetypeEntry {
    Name(String),
    Record(ArchetypeRecord),
}

/// Archetypes as written in configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawArchetypes {
    /// Names aligned positionally with `dimensions`
    List(Vec<String>),
    /// Dimension name → entry
    Map(BTreeMap<String, RawArchetypeEntry>),
}

impl Default for RawArchetypes {
    fn default() -> Self {
        RawArchetypes::Map(BTreeMap::new())
    }
}

/// Unvalidated definition as deserialized from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawDefinition {
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub archetypes: RawArchetypes,
    pub quotes: Vec<String>,
    #[serde(default)]
    pub desc_templates: Option<Vec<String>>,
}

/// Validated, immutable questionnaire definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestDefinition {
    dimensions: Vec<String>,
    archetypes: BTreeMap<String, ArchetypeRecord>,
    quotes: Vec<String>,
    desc_templates: Option<Vec<String>>,
}

impl TestDefinition {
    /// Definition with archetype names aligned to `dimensions`
    pub fn from_positional<D, A, Q, T>(
        dimensions: D,
        archetypes: A,
        quotes: Q,
        desc_templates: Option<T>,
    ) -> Result<Self>
    where
        D: IntoIterator,
        D::Item: Into<String>,
        A: IntoIterator,
        A::Item: Into<String>,
        Q: IntoIterator,
        Q::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self::try_from(RawDefinition {
            dimensions: dimensions.into_iter().map(Into::into).collect(),
            archetypes: RawArchetypes::List(archetypes.into_iter().map(Into::into).collect()),
            quotes: quotes.into_iter().map(Into::into).collect(),
            desc_templates: desc_templates.map(|t| t.into_iter().map(Into::into).collect()),
        })
    }

    /// Definition with full archetype records keyed by dimension name
    pub fn from_records<D, Q>(
        dimensions: D,
        records: BTreeMap<String, ArchetypeRecord>,
        quotes: Q,
    ) -> Result<Self>
    where
        D: IntoIterator,
        D::Item: Into<String>,
        Q: IntoIterator,
        Q::Item: Into<String>,
    {
        Self::try_from(RawDefinition {
            dimensions: dimensions.into_iter().map(Into::into).collect(),
            archetypes: RawArchetypes::Map(
                records
                    .into_iter()
                    .map(|(dimension, record)| (dimension, RawArchetypeEntry::Record(record)))
                    .collect(),
            ),
            quotes: quotes.into_iter().map(Into::into).collect(),
            desc_templates: None,
        })
    }

    /// Dimension names in definition order
    pub fn dimensions(&self) -> &[String] {
        &self.dimensions
    }

    pub fn quotes(&self) -> &[String] {
        &self.quotes
    }

    /// Position of a dimension in definition order
    pub fn dimension_index(&self, dimension: &str) -> Option<usize> {
        self.dimensions.iter().position(|d| d == dimension)
    }

    /// Description template for the dimension at `index`
    pub fn desc_template(&self, index: usize) -> Option<&str> {
        self.desc_templates
            .as_ref()
            .and_then(|templates| templates.get(index))
            .map(String::as_str)
    }

    /// Configured archetype for a dimension, if any
    pub fn archetype(&self, dimension: &str) -> Option<&ArchetypeRecord> {
        self.archetypes.get(dimension)
    }

    /// Configured archetype, or a placeholder when none exists
    ///
    /// A configured record without a description borrows the placeholder's,
    /// so the result always has a non-empty name and description.
    pub fn archetype_or_placeholder(&self, dimension: &str) -> ArchetypeRecord {
        let template = self
            .dimension_index(dimension)
            .and_then(|index| self.desc_template(index));
        match self.archetype(dimension) {
            Some(record) if record.description.trim().is_empty() => ArchetypeRecord {
                description: ArchetypeRecord::placeholder(dimension, template).description,
                ..record.clone()
            },
            Some(record) => record.clone(),
            None => ArchetypeRecord::placeholder(dimension, template),
        }
    }
}

impl TryFrom<RawDefinition> for TestDefinition {
    type Error = Error;

    fn try_from(raw: RawDefinition) -> Result<Self> {
        let RawDefinition {
            mut dimensions,
            archetypes,
            quotes,
            mut desc_templates,
        } = raw;

        let declared = dimensions.len();
        if declared < DIMENSION_COUNT {
            return Err(Error::Configuration(format!(
                "definition needs {} dimensions, found {}",
                DIMENSION_COUNT, declared
            )));
        }

        let mut seen = HashSet::new();
        for dimension in &dimensions {
            if dimension.trim().is_empty() {
                return Err(Error::Configuration("dimension name is empty".to_string()));
            }
            if !seen.insert(dimension.as_str()) {
                return Err(Error::Configuration(format!(
                    "dimension '{}' is declared twice",
                    dimension
                )));
            }
        }

        if quotes.is_empty() {
            return Err(Error::Configuration("quote pool is empty".to_string()));
        }

        if let Some(templates) = &desc_templates {
            if templates.len() != declared {
                return Err(Error::Configuration(format!(
                    "desc_templates has {} entries for {} dimensions",
                    templates.len(),
                    declared
                )));
            }
        }

        let mut records = BTreeMap::new();
        match archetypes {
            RawArchetypes::List(names) => {
                if names.len() != declared {
                    return Err(Error::Configuration(format!(
                        "archetype list has {} entries for {} dimensions",
                        names.len(),
                        declared
                    )));
                }
                for (index, (dimension, name)) in dimensions.iter().zip(names).enumerate() {
                    let description = desc_templates
                        .as_ref()
                        .map(|t| t[index].clone())
                        .unwrap_or_default();
                    records.insert(
                        dimension.clone(),
                        ArchetypeRecord {
                            name,
                            description,
                            advice: String::new(),
                        },
                    );
                }
            }
            RawArchetypes::Map(entries) => {
                for (dimension, entry) in entries {
                    let Some(index) = dimensions.iter().position(|d| *d == dimension) else {
                        return Err(Error::Configuration(format!(
                            "archetype keyed by undeclared dimension '{}'",
                            dimension
                        )));
                    };
                    let record = match entry {
                        RawArchetypeEntry::Record(record) => record,
                        RawArchetypeEntry::Name(name) => ArchetypeRecord {
                            name,
                            description: desc_templates
                                .as_ref()
                                .map(|t| t[index].clone())
                                .unwrap_or_default(),
                            advice: String::new(),
                        },
                    };
                    records.insert(dimension, record);
                }
            }
        }

        if records.values().any(|r| r.name.trim().is_empty()) {
            return Err(Error::Configuration("archetype name is empty".to_string()));
        }

        if declared > DIMENSION_COUNT {
            warn!(
                declared,
                kept = DIMENSION_COUNT,
                "Definition declares extra dimensions; keeping the first six"
            );
            let dropped = dimensions.split_off(DIMENSION_COUNT);
            for dimension in &dropped {
                records.remove(dimension);
            }
            if let Some(templates) = desc_templates.as_mut() {
                templates.truncate(DIMENSION_COUNT);
            }
        }

        Ok(Self {
            dimensions,
            archetypes: records,
            quotes,
            desc_templates,
        })
    }
}
