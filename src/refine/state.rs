//! Loop state and phase transitions for a refinement run.

use serde::{Deserialize, Serialize};

use crate::document::SpecDocument;
use crate::validation::ValidationOutcome;

/// What the generation step sees of earlier failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackPolicy {
    /// Only the most recent invalid reason
    #[default]
    Latest,
    /// Every invalid reason so far, oldest first
    History,
}

/// How a finished run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Termination {
    Success,
    Exhausted,
}

/// Where the driver is within one round-trip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefinePhase {
    Generating,
    Validating,
    Done(Termination),
}

impl RefinePhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RefinePhase::Done(_))
    }
}

/// State owned by the loop driver. Created at loop start, mutated once per
/// step, consumed when the run finishes.
#[derive(Debug, Clone)]
pub struct LoopState {
    document: SpecDocument,
    last_outcome: Option<ValidationOutcome>,
    rounds: u32,
    phase: RefinePhase,
    history: Vec<String>,
}

impl LoopState {
    pub fn new(document: SpecDocument) -> Self {
        Self {
            document,
            last_outcome: None,
            rounds: 0,
            phase: RefinePhase::Generating,
            history: Vec::new(),
        }
    }

    pub fn document(&self) -> &SpecDocument {
        &self.document
    }

    pub fn last_outcome(&self) -> Option<&ValidationOutcome> {
        self.last_outcome.as_ref()
    }

    /// Completed generate/validate round-trips
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn phase(&self) -> RefinePhase {
        self.phase
    }

    /// Feedback text for the next generation step, if any attempt failed
    pub fn feedback(&self, policy: FeedbackPolicy) -> Option<String> {
        match policy {
            FeedbackPolicy::Latest => self
                .last_outcome
                .as_ref()
                .and_then(ValidationOutcome::reason)
                .map(str::to_string),
            FeedbackPolicy::History if self.history.is_empty() => None,
            FeedbackPolicy::History => Some(
                self.history
                    .iter()
                    .enumerate()
                    .map(|(i, reason)| format!("Attempt {}: {}", i + 1, reason))
                    .collect::<Vec<_>>()
                    .join("\n\n"),
            ),
        }
    }

    /// Replace the document with a freshly generated one (last write wins)
    pub fn record_generation(&mut self, document: SpecDocument) {
        debug_assert_eq!(self.phase, RefinePhase::Generating);
        self.document = document;
        self.phase = RefinePhase::Validating;
    }

    /// Record the verdict on the current document and move to the next phase
    pub fn record_outcome(&mut self, outcome: ValidationOutcome, max_iterations: u32) -> RefinePhase {
        debug_assert_eq!(self.phase, RefinePhase::Validating);
        self.rounds += 1;

        self.phase = match &outcome {
            ValidationOutcome::Valid => RefinePhase::Done(Termination::Success),
            ValidationOutcome::Invalid(reason) => {
                self.history.push(reason.clone());
                if self.rounds >= max_iterations {
                    RefinePhase::Done(Termination::Exhausted)
                } else {
                    RefinePhase::Generating
                }
            }
        };
        self.last_outcome = Some(outcome);
        self.phase
    }

    /// Consume the state once a terminal phase is reached
    pub(crate) fn into_parts(self) -> (SpecDocument, Option<ValidationOutcome>, u32) {
        (self.document, self.last_outcome, self.rounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validating(state: &mut LoopState, content: &str) {
        state.record_generation(SpecDocument::new(content));
    }

    #[test]
    fn test_new_state_is_generating() {
        let state = LoopState::new(SpecDocument::default());
        assert_eq!(state.phase(), RefinePhase::Generating);
        assert_eq!(state.rounds(), 0);
        assert!(state.last_outcome().is_none());
        assert!(state.feedback(FeedbackPolicy::Latest).is_none());
        assert!(state.feedback(FeedbackPolicy::History).is_none());
    }

    #[test]
    fn test_generation_replaces_document() {
        let mut state = LoopState::new(SpecDocument::new("old"));
        validating(&mut state, "new");
        assert_eq!(state.document().as_str(), "new");
        assert_eq!(state.phase(), RefinePhase::Validating);
    }

    #[test]
    fn test_valid_outcome_is_success() {
        let mut state = LoopState::new(SpecDocument::default());
        validating(&mut state, "a");
        let phase = state.record_outcome(ValidationOutcome::Valid, 5);
        assert_eq!(phase, RefinePhase::Done(Termination::Success));
        assert!(phase.is_terminal());
        assert_eq!(state.rounds(), 1);
    }

    #[test]
    fn test_invalid_with_budget_goes_back_to_generating() {
        let mut state = LoopState::new(SpecDocument::default());
        validating(&mut state, "a");
        let phase = state.record_outcome(ValidationOutcome::invalid("no paths"), 2);
        assert_eq!(phase, RefinePhase::Generating);
        assert_eq!(state.feedback(FeedbackPolicy::Latest).as_deref(), Some("no paths"));
    }

    #[test]
    fn test_invalid_without_budget_is_exhausted() {
        let mut state = LoopState::new(SpecDocument::default());
        validating(&mut state, "a");
        let phase = state.record_outcome(ValidationOutcome::invalid("missing field X"), 1);
        assert_eq!(phase, RefinePhase::Done(Termination::Exhausted));
    }

    #[test]
    fn test_history_feedback_accumulates() {
        let mut state = LoopState::new(SpecDocument::default());
        validating(&mut state, "a");
        state.record_outcome(ValidationOutcome::invalid("first"), 5);
        validating(&mut state, "b");
        state.record_outcome(ValidationOutcome::invalid("second"), 5);

        assert_eq!(state.feedback(FeedbackPolicy::Latest).as_deref(), Some("second"));
        assert_eq!(
            state.feedback(FeedbackPolicy::History).as_deref(),
            Some("Attempt 1: first\n\nAttempt 2: second")
        );
    }

    #[test]
    fn test_feedback_policy_serialization() {
        assert_eq!(serde_json::to_string(&FeedbackPolicy::History).unwrap(), "\"history\"");
        let policy: FeedbackPolicy = serde_json::from_str("\"latest\"").unwrap();
        assert_eq!(policy, FeedbackPolicy::Latest);
    }
}
