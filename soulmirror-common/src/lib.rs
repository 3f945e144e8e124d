//! # SoulMirror Common Library
//!
//! Scoring and report synthesis for Likert-scale personality questionnaires:
//! - Question banks and answer sets
//! - Test definitions (dimensions, archetypes, quotes) and the registry
//! - Dimension scoring and archetype resolution
//! - Templated report synthesis and radar chart data
//! - Test session state machine
//! - Configuration loading

pub mod catalog;
pub mod chart;
pub mod config;
pub mod definitions;
pub mod engine;
pub mod error;
pub mod questions;
pub mod registry;
pub mod resolver;
pub mod scoring;
pub mod session;
pub mod synthesis;

pub use engine::Engine;
pub use error::{Error, Result};
pub use questions::{AnswerSet, Question, QuestionBank};
pub use registry::DefinitionRegistry;
pub use session::{SessionState, TestSession};
pub use synthesis::{AnalysisResult, QuotePolicy, QuoteSelector};
