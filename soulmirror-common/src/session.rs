//! Test session state machine
//!
//! ```text
//! Idle --start--> InProgress --answer...--> Analyzing --analyze--> Complete
//!                     ^                          |                    |
//!                     +---------restart----------+-------restart------+
//! ```
//!
//! A failed `analyze` leaves the session in `Analyzing`; `restart` gets it out.
//!
//! `Analyzing` exists so a host can show a waiting indicator; the engine
//! itself finishes instantly and any delay is up to the caller.

use crate::engine::Engine;
use crate::questions::{AnswerSet, Question, QuestionBank};
use crate::synthesis::AnalysisResult;
use crate::{Error, Result};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};
use uuid::Uuid;

/// Lifecycle stage of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    InProgress,
    Analyzing,
    Complete(Box<AnalysisResult>),
}

impl SessionState {
    fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::InProgress => "in progress",
            SessionState::Analyzing => "analyzing",
            SessionState::Complete(_) => "complete",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Answered-question counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub answered: usize,
    pub total: usize,
}

impl Progress {
    /// Completion in percent, 0..=100
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.answered as f64 / self.total as f64 * 100.0
    }
}

/// One respondent taking one questionnaire
#[derive(Debug, Clone)]
pub struct TestSession {
    id: Uuid,
    questionnaire_id: String,
    state: SessionState,
    bank: Option<QuestionBank>,
    answers: AnswerSet,
    cursor: usize,
}

impl TestSession {
    /// New idle session for a questionnaire
    pub fn new(questionnaire_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            questionnaire_id: questionnaire_id.into(),
            state: SessionState::Idle,
            bank: None,
            answers: AnswerSet::new(),
            cursor: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn questionnaire_id(&self) -> &str {
        &self.questionnaire_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    /// Report of a completed session
    pub fn result(&self) -> Option<&AnalysisResult> {
        match &self.state {
            SessionState::Complete(result) => Some(&**result),
            _ => None,
        }
    }

    /// Questions loaded by `start`, empty while idle
    pub fn questions(&self) -> &[Question] {
        self.bank.as_ref().map(|b| b.questions()).unwrap_or(&[])
    }

    /// Question the respondent should answer next
    pub fn current_question(&self) -> Option<&Question> {
        if self.state != SessionState::InProgress {
            return None;
        }
        self.questions().get(self.cursor)
    }

    pub fn progress(&self) -> Progress {
        Progress {
            answered: self.answers.len(),
            total: self.questions().len(),
        }
    }

    /// Idle or Complete → InProgress: load the bank and clear answers
    pub fn start(&mut self, engine: &Engine) -> Result<()> {
        match self.state {
            SessionState::Idle | SessionState::Complete(_) => {
                self.reset(engine);
                info!(session_id = %self.id, questionnaire_id = %self.questionnaire_id, "Session started");
                Ok(())
            }
            _ => Err(self.invalid("start")),
        }
    }

    /// Record an answer and advance to the next unanswered question
    ///
    /// Answering the last open question moves the session to `Analyzing`.
    pub fn answer(&mut self, question_id: u32, value: u8) -> Result<Progress> {
        if self.state != SessionState::InProgress {
            return Err(self.invalid("answer"));
        }
        let Some(bank) = self.bank.as_ref() else {
            return Err(self.invalid("answer"));
        };
        bank.check_answer(question_id, value)?;

        self.answers.record(question_id, value);
        let total = bank.len();
        self.cursor = bank
            .questions()
            .iter()
            .position(|q| !self.answers.contains(q.id))
            .unwrap_or(total);

        if self.answers.is_complete_for(bank) {
            debug!(session_id = %self.id, "All questions answered");
            self.state = SessionState::Analyzing;
        }

        Ok(self.progress())
    }

    /// Answer the current question
    pub fn answer_current(&mut self, value: u8) -> Result<Progress> {
        let question_id = self
            .current_question()
            .map(|q| q.id)
            .ok_or_else(|| self.invalid("answer"))?;
        self.answer(question_id, value)
    }

    /// Analyzing → Complete: run scoring and synthesis
    pub fn analyze(&mut self, engine: &Engine) -> Result<&AnalysisResult> {
        if self.state != SessionState::Analyzing {
            return Err(self.invalid("analyze"));
        }
        let result = engine.synthesize_report(&self.answers, &self.questionnaire_id)?;
        self.state = SessionState::Complete(Box::new(result));
        info!(session_id = %self.id, "Session complete");
        match &self.state {
            SessionState::Complete(result) => Ok(&**result),
            _ => Err(self.invalid("analyze")),
        }
    }

    /// Back to a fresh InProgress run, discarding answers and any report
    ///
    /// Allowed from every state except `Idle`.
    pub fn restart(&mut self, engine: &Engine) -> Result<()> {
        match self.state {
            SessionState::InProgress | SessionState::Analyzing | SessionState::Complete(_) => {
                self.reset(engine);
                info!(session_id = %self.id, "Session restarted");
                Ok(())
            }
            _ => Err(self.invalid("restart")),
        }
    }

    fn reset(&mut self, engine: &Engine) {
        self.bank = Some(engine.registry().bank(&self.questionnaire_id).clone());
        self.answers.clear();
        self.cursor = 0;
        self.state = SessionState::InProgress;
    }

    fn invalid(&self, action: &str) -> Error {
        Error::InvalidTransition {
            from: self.state.to_string(),
            action: action.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DefinitionRegistry;
    use std::sync::Arc;

    fn engine() -> Engine {
        Engine::new(Arc::new(DefinitionRegistry::builtin().unwrap()))
    }

    #[test]
    fn test_full_lifecycle() {
        let engine = engine();
        let mut session = TestSession::new("animal-persona");
        assert_eq!(*session.state(), SessionState::Idle);
        assert!(session.current_question().is_none());

        session.start(&engine).unwrap();
        assert_eq!(*session.state(), SessionState::InProgress);
        assert_eq!(session.current_question().unwrap().id, 1);

        for _ in 0..39 {
            session.answer_current(4).unwrap();
        }
        assert_eq!(*session.state(), SessionState::InProgress);
        assert_eq!(session.current_question().unwrap().id, 40);

        let progress = session.answer_current(4).unwrap();
        assert_eq!(progress, Progress { answered: 40, total: 40 });
        assert_eq!(*session.state(), SessionState::Analyzing);

        let archetype = session.analyze(&engine).unwrap().main_archetype.clone();
        assert_eq!(archetype, "荒原孤狼");
        assert!(session.result().is_some());
    }

    #[test]
    fn test_out_of_order_answers_move_cursor_to_first_gap() {
        let engine = engine();
        let mut session = TestSession::new("mbti-deep");
        session.start(&engine).unwrap();

        session.answer(2, 3).unwrap();
        assert_eq!(session.current_question().unwrap().id, 1);
        session.answer(1, 3).unwrap();
        assert_eq!(session.current_question().unwrap().id, 3);
    }

    #[test]
    fn test_invalid_answer_rejected_and_not_recorded() {
        let engine = engine();
        let mut session = TestSession::new("mbti-deep");
        session.start(&engine).unwrap();

        assert!(matches!(
            session.answer(1, 0),
            Err(Error::MalformedAnswer { .. })
        ));
        assert!(matches!(
            session.answer(41, 3),
            Err(Error::MalformedAnswer { .. })
        ));
        assert!(session.answers().is_empty());
    }

    #[test]
    fn test_illegal_transitions() {
        let engine = engine();
        let mut session = TestSession::new("mbti-deep");

        assert!(matches!(
            session.answer(1, 3),
            Err(Error::InvalidTransition { .. })
        ));
        assert!(matches!(
            session.analyze(&engine),
            Err(Error::InvalidTransition { .. })
        ));
        assert!(matches!(
            session.restart(&engine),
            Err(Error::InvalidTransition { .. })
        ));

        session.start(&engine).unwrap();
        assert!(matches!(
            session.start(&engine),
            Err(Error::InvalidTransition { .. })
        ));
        assert!(matches!(
            session.analyze(&engine),
            Err(Error::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_restart_clears_result() {
        let engine = engine();
        let mut session = TestSession::new("default");
        session.start(&engine).unwrap();
        for id in 1..=40 {
            session.answer(id, 5).unwrap();
        }
        session.analyze(&engine).unwrap();

        session.restart(&engine).unwrap();
        assert_eq!(*session.state(), SessionState::InProgress);
        assert!(session.answers().is_empty());
        assert!(session.result().is_none());
        assert_eq!(session.progress().answered, 0);
    }

    #[test]
    fn test_progress_percent() {
        let progress = Progress {
            answered: 10,
            total: 40,
        };
        assert_eq!(progress.percent(), 25.0);
        assert_eq!(Progress { answered: 0, total: 0 }.percent(), 0.0);
    }

    #[test]
    fn test_restart_recovers_from_failed_analysis() {
        let engine = engine();
        let mut session = TestSession::new("animal-persona");
        session.start(&engine).unwrap();
        for _ in 0..40 {
            session.answer_current(2).unwrap();
        }
        assert_eq!(*session.state(), SessionState::Analyzing);

        // a host swapped in a registry with a longer bank
        let builtin = DefinitionRegistry::builtin().unwrap();
        let longer = QuestionBank::from_statements(
            (1..=41).map(|i| format!("statement {}", i)),
        )
        .unwrap();
        let stale = Engine::new(Arc::new(
            DefinitionRegistry::builder(longer)
                .definition("default", builtin.definition("default").unwrap().clone())
                .build()
                .unwrap(),
        ));
        assert!(matches!(
            session.analyze(&stale),
            Err(Error::IncompleteSession {
                answered: 40,
                total: 41
            })
        ));
        assert_eq!(*session.state(), SessionState::Analyzing);

        session.restart(&engine).unwrap();
        assert_eq!(*session.state(), SessionState::InProgress);
        assert!(session.answers().is_empty());
        assert_eq!(session.current_question().unwrap().id, 1);
    }
}
