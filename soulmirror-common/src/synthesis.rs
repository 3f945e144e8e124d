//! Report synthesizer
//!
//! Turns a [`Resolution`] into the human-readable report: four markdown
//! sections, four trait tags, four life-aspect paragraphs, a quote and the
//! radar chart. Every piece is a fixed template filled with dimension and
//! archetype names; the only branching is the low-score tag and fallbacks
//! for empty archetype text.
//!
//! Quote choice is the one place randomness may enter. It is delegated to a
//! [`QuoteSelector`] supplied by the caller, so tests can pin it.

use crate::chart::{radar_points, RadarPoint};
use crate::definitions::TestDefinition;
use crate::resolver::Resolution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Weakest-dimension score below which the last trait tag reads `低<dimension>`
pub const LOW_SCORE_THRESHOLD: u8 = 50;

/// Tag used when the weakest dimension is not below the threshold
pub const BALANCED_TAG: &str = "均衡发展";

/// Paragraphs for the four fixed life domains
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifeAspects {
    pub work: String,
    pub love: String,
    pub social: String,
    pub growth: String,
}

impl LifeAspects {
    /// `(key, heading, text)` in display order
    pub fn entries(&self) -> [(&'static str, &'static str, &str); 4] {
        [
            ("work", "事业与成就", &self.work),
            ("love", "亲密关系", &self.love),
            ("social", "社交互动", &self.social),
            ("growth", "自我成长", &self.growth),
        ]
    }
}

/// Synthesized personality report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub main_archetype: String,
    pub secondary_archetype: String,
    pub short_quote: String,
    /// Markdown with `###` section headings
    pub detailed_analysis: String,
    /// Exactly four short tags
    pub personality_traits: Vec<String>,
    pub radar_chart: Vec<RadarPoint>,
    pub life_aspects: LifeAspects,
}

/// Picks a quote from a non-empty pool
pub trait QuoteSelector {
    /// Index into `pool`; `primary_index` is the primary dimension's
    /// position in the definition
    fn select(&mut self, pool: &[String], primary_index: usize) -> usize;
}

impl<F> QuoteSelector for F
where
    F: FnMut(&[String], usize) -> usize,
{
    fn select(&mut self, pool: &[String], primary_index: usize) -> usize {
        self(pool, primary_index)
    }
}

/// Quote at `primary_index mod pool length`
#[derive(Debug, Clone, Copy, Default)]
pub struct PrimaryIndexQuote;

impl QuoteSelector for PrimaryIndexQuote {
    fn select(&mut self, pool: &[String], primary_index: usize) -> usize {
        primary_index % pool.len().max(1)
    }
}

/// Uniform choice from a seeded generator
#[derive(Debug, Clone)]
pub struct SeededQuote {
    rng: StdRng,
}

impl SeededQuote {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl QuoteSelector for SeededQuote {
    fn select(&mut self, pool: &[String], _primary_index: usize) -> usize {
        self.rng.gen_range(0..pool.len().max(1))
    }
}

/// Uniform choice from the thread-local generator
#[derive(Debug, Clone, Copy, Default)]
pub struct EntropyQuote;

impl QuoteSelector for EntropyQuote {
    fn select(&mut self, pool: &[String], _primary_index: usize) -> usize {
        rand::thread_rng().gen_range(0..pool.len().max(1))
    }
}

/// Configurable quote selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum QuotePolicy {
    /// Deterministic: primary dimension index mod pool length
    #[default]
    PrimaryIndex,
    /// Reproducible random choice; a fresh generator per report
    Seeded { seed: u64 },
    /// Non-reproducible random choice
    Random,
}

impl QuotePolicy {
    /// Fresh selector implementing this policy
    pub fn selector(&self) -> Box<dyn QuoteSelector + Send> {
        match *self {
            QuotePolicy::PrimaryIndex => Box::new(PrimaryIndexQuote),
            QuotePolicy::Seeded { seed } => Box::new(SeededQuote::new(seed)),
            QuotePolicy::Random => Box::new(EntropyQuote),
        }
    }
}

/// Fills the report templates
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportSynthesizer;

impl ReportSynthesizer {
    pub fn new() -> Self {
        Self
    }

    /// Build the report for `resolution`
    ///
    /// `chart_values` are the display values in definition order (already
    /// jittered, if the caller wants that).
    pub fn synthesize(
        &self,
        resolution: &Resolution,
        definition: &TestDefinition,
        chart_values: &[u8],
        quotes: &mut dyn QuoteSelector,
    ) -> AnalysisResult {
        let pool = definition.quotes();
        let quote_index = quotes.select(pool, resolution.primary.index) % pool.len().max(1);
        let short_quote = pool.get(quote_index).cloned().unwrap_or_default();

        let result = AnalysisResult {
            main_archetype: resolution.primary.archetype.name.clone(),
            secondary_archetype: resolution.secondary.archetype.name.clone(),
            short_quote,
            detailed_analysis: detailed_analysis(resolution),
            personality_traits: trait_tags(resolution),
            radar_chart: radar_points(definition.dimensions(), chart_values),
            life_aspects: life_aspects(resolution),
        };

        debug!(
            archetype = %result.main_archetype,
            quote_index,
            traits = ?result.personality_traits,
            "Report synthesized"
        );

        result
    }
}

fn detailed_analysis(resolution: &Resolution) -> String {
    let primary = &resolution.primary;
    let secondary = &resolution.secondary;
    let weakest = &resolution.weakest;

    let secondary_text = if secondary.archetype.description.trim().is_empty() {
        "你内在潜藏着一种不被轻易察觉的韧性，这通常来源于你对自我价值的深层坚持。".to_string()
    } else {
        secondary.archetype.description.clone()
    };

    let advice = if primary.archetype.advice.trim().is_empty() {
        format!(
            "保持你在{}上的天赋，同时允许自己放慢脚步，倾听内心真实的需要。",
            primary.dimension
        )
    } else {
        primary.archetype.advice.clone()
    };

    let sections = [
        format!(
            "### 核心性格底色\n你展现出了强烈的**{}**特质。在{}维度上高达{}%的显著表现，意味着你拥有独特的感知世界的方式。{}",
            primary.archetype.name, primary.dimension, primary.score, primary.archetype.description
        ),
        format!(
            "### 潜意识中的隐性优势\n你的{}与{}形成了完美的互补。“{} + {}”的组合使你在面对复杂局面时，往往能比旁人更快地找到平衡点。{}",
            secondary.dimension,
            primary.dimension,
            primary.archetype.name,
            secondary.archetype.name,
            secondary_text
        ),
        format!(
            "### 需要警惕的盲点与阴影\n由于{}相对较弱（{}%），你可能在某些特定情境下会感到能量受阻。这并不是缺陷，而是潜意识为你保留的一种防御策略，它让你远离可能受伤的场景。建议在日常生活中有意识地觉察自己的回避倾向，与其对抗不如尝试接纳，这将是你近期成长的关键突破口。",
            weakest.dimension, weakest.score
        ),
        format!(
            "### 成长指引\n{}作为{}，你可以每周安排一件需要调动{}的小事来刻意练习，让它从防御慢慢变成资源。",
            advice, primary.archetype.name, weakest.dimension
        ),
    ];

    sections.join("\n\n")
}

fn trait_tags(resolution: &Resolution) -> Vec<String> {
    let third = resolution
        .ranked(2)
        .map(|(dimension, _)| dimension)
        .unwrap_or(resolution.secondary.dimension.as_str());

    let last = if resolution.weakest.score < LOW_SCORE_THRESHOLD {
        format!("低{}", resolution.weakest.dimension)
    } else {
        BALANCED_TAG.to_string()
    };

    vec![
        format!("高{}", resolution.primary.dimension),
        format!("{}辅助", resolution.secondary.dimension),
        format!("潜在{}", third),
        last,
    ]
}

fn life_aspects(resolution: &Resolution) -> LifeAspects {
    let archetype = &resolution.primary.archetype.name;
    let primary = &resolution.primary.dimension;
    let secondary = &resolution.secondary.dimension;
    let weakest = &resolution.weakest.dimension;

    LifeAspects {
        work: format!(
            "以你的{}特质，在工作中你更适合能够发挥{}的角色。建议寻找能够提供自主空间的环境，避免过于机械化的重复劳动消耗你的灵性。",
            archetype, primary
        ),
        love: format!(
            "在亲密关系中，你渴望的是深度的共鸣而非表面的陪伴。你的{}特质既是吸引力也是双刃剑，试着向伴侣展示你{}的一面，会带来意想不到的亲密感。",
            primary, weakest
        ),
        social: format!(
            "社交对你而言是能量的交换。作为{}，你不需要取悦所有人。保持你的{}，真正的同频者自会被你吸引。",
            archetype, secondary
        ),
        growth: format!(
            "当下的成长课题是平衡你的{}与{}。尝试去做一些平时不擅长的小事，打破惯性，你将发现一个更广阔的自己。",
            primary, weakest
        ),
    }
}
