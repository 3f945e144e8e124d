//! Questionnaire catalog entries

use serde::{Deserialize, Serialize};

/// One questionnaire offered by the product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestConfig {
    /// Stable identifier, also the key into the definition table
    pub id: String,
    pub title: String,
    pub description: String,
    /// Emoji shown next to the title
    #[serde(default)]
    pub icon: String,
    /// Advertised number of questions
    pub question_count: usize,
}
