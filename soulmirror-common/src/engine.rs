//! Engine facade
//!
//! Ties the registry, scoring engine, resolver and synthesizer together
//! behind the three core operations: generate questions, score answers and
//! synthesize a report. The engine is synchronous and holds no mutable
//! state, so one instance can serve any number of sessions.

use crate::questions::{AnswerSet, Question};
use crate::registry::DefinitionRegistry;
use crate::resolver::{ArchetypeResolver, Resolution};
use crate::scoring::{DimensionScore, JitterPolicy, ScoringEngine};
use crate::synthesis::{AnalysisResult, QuotePolicy, QuoteSelector, ReportSynthesizer};
use crate::{Error, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// Scoring and report synthesis over a shared registry
#[derive(Debug, Clone)]
pub struct Engine {
    registry: Arc<DefinitionRegistry>,
    scoring: ScoringEngine,
    resolver: ArchetypeResolver,
    synthesizer: ReportSynthesizer,
    quote_policy: QuotePolicy,
    jitter: JitterPolicy,
}

impl Engine {
    /// Engine with deterministic quote selection and no jitter
    pub fn new(registry: Arc<DefinitionRegistry>) -> Self {
        Self {
            registry,
            scoring: ScoringEngine::new(),
            resolver: ArchetypeResolver::new(),
            synthesizer: ReportSynthesizer::new(),
            quote_policy: QuotePolicy::default(),
            jitter: JitterPolicy::default(),
        }
    }

    pub fn with_quote_policy(mut self, policy: QuotePolicy) -> Self {
        self.quote_policy = policy;
        self
    }

    pub fn with_jitter(mut self, jitter: JitterPolicy) -> Self {
        self.jitter = jitter;
        self
    }

    /// Replace the scoring engine (e.g. to pin a dimension strategy)
    pub fn with_scoring(mut self, scoring: ScoringEngine) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn registry(&self) -> &DefinitionRegistry {
        &self.registry
    }

    /// Shared handle to the registry
    pub fn registry_arc(&self) -> Arc<DefinitionRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn quote_policy(&self) -> QuotePolicy {
        self.quote_policy
    }

    pub fn jitter(&self) -> JitterPolicy {
        self.jitter
    }

    /// Questions for a questionnaire, in presentation order
    ///
    /// Pure over the registry: repeated calls return equal lists.
    pub fn generate_questions(&self, questionnaire_id: &str) -> Vec<Question> {
        self.registry.bank(questionnaire_id).questions().to_vec()
    }

    /// Per-dimension scores for a (possibly partial) answer set
    pub fn score(&self, answers: &AnswerSet, questionnaire_id: &str) -> Result<Vec<DimensionScore>> {
        let definition = self.registry.definition(questionnaire_id)?;
        let bank = self.registry.bank(questionnaire_id);
        self.scoring.score(answers, bank, definition.dimensions())
    }

    /// Ranked dimensions and archetypes for an answer set
    pub fn resolve(&self, answers: &AnswerSet, questionnaire_id: &str) -> Result<Resolution> {
        let definition = self.registry.definition(questionnaire_id)?;
        let scores = self.score(answers, questionnaire_id)?;
        self.resolver.resolve(&scores, definition)
    }

    /// Full report using the engine's configured quote policy
    pub fn synthesize_report(
        &self,
        answers: &AnswerSet,
        questionnaire_id: &str,
    ) -> Result<AnalysisResult> {
        let mut selector = self.quote_policy.selector();
        self.synthesize_report_with(answers, questionnaire_id, selector.as_mut())
    }

    /// Full report with a caller-supplied quote selector
    ///
    /// Requires a complete, valid answer set.
    pub fn synthesize_report_with(
        &self,
        answers: &AnswerSet,
        questionnaire_id: &str,
        quotes: &mut dyn QuoteSelector,
    ) -> Result<AnalysisResult> {
        let definition = self.registry.definition(questionnaire_id)?;
        let bank = self.registry.bank(questionnaire_id);

        answers.validate_against(bank)?;
        if !answers.is_complete_for(bank) {
            return Err(Error::IncompleteSession {
                answered: answers.len(),
                total: bank.len(),
            });
        }

        let scores = self.scoring.score(answers, bank, definition.dimensions())?;
        let resolution = self.resolver.resolve(&scores, definition)?;
        let chart_values = self.jitter.apply(&scores);
        debug!(jitter = ?self.jitter, values = ?chart_values, "Chart values prepared");

        let report = self
            .synthesizer
            .synthesize(&resolution, definition, &chart_values, quotes);

        info!(
            questionnaire_id,
            archetype = %report.main_archetype,
            "Analysis complete"
        );
        Ok(report)
    }
}
