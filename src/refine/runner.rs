//! The validate-then-refine driver.
//!
//! Each round-trip generates a new document, validates it, and either stops
//! (valid, or budget spent) or feeds the rejection reason into the next
//! generation. Steps run strictly one after another.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::RefineConfig;
use crate::document::SpecDocument;
use crate::error::SpecloopError;
use crate::refine::generator::{GenerationRequest, Generator};
use crate::refine::state::{FeedbackPolicy, LoopState, RefinePhase, Termination};
use crate::validation::{DocumentValidator, ValidationOutcome};

/// Which collaborator a step error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Generation,
    Validation,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Generation => f.write_str("generation"),
            Step::Validation => f.write_str("validation"),
        }
    }
}

/// Failures that abort a refinement run
#[derive(Debug, Error)]
pub enum RefineError {
    #[error("{step} step unavailable on attempt {attempt}: {source}")]
    StepUnavailable {
        step: Step,
        attempt: u32,
        #[source]
        source: SpecloopError,
    },

    #[error("{step} step timed out after {timeout:?} on attempt {attempt}")]
    StepTimedOut { step: Step, attempt: u32, timeout: Duration },

    #[error("refinement cancelled after {completed} completed attempts")]
    Cancelled { completed: u32 },

    #[error("max_iterations must be at least 1")]
    InvalidBudget,
}

impl RefineError {
    /// True for the failures the caller should treat as "collaborator unavailable"
    pub fn is_step_failure(&self) -> bool {
        matches!(self, RefineError::StepUnavailable { .. } | RefineError::StepTimedOut { .. })
    }
}

/// Input to a refinement run
#[derive(Debug, Clone, Default)]
pub struct RefineContext {
    pub requirements: String,
    /// Prior document to start from, if any
    pub document: Option<SpecDocument>,
}

impl RefineContext {
    pub fn new(requirements: impl Into<String>) -> Self {
        Self {
            requirements: requirements.into(),
            document: None,
        }
    }

    pub fn with_document(mut self, document: SpecDocument) -> Self {
        self.document = Some(document);
        self
    }
}

/// Knobs for a refinement run
#[derive(Debug, Clone)]
pub struct RefineOptions {
    pub max_iterations: u32,
    /// Per-call limit on each generation and validation step
    pub step_timeout: Option<Duration>,
    pub feedback: FeedbackPolicy,
}

impl Default for RefineOptions {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            step_timeout: None,
            feedback: FeedbackPolicy::Latest,
        }
    }
}

impl From<&RefineConfig> for RefineOptions {
    fn from(config: &RefineConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            step_timeout: (config.step_timeout_ms > 0).then(|| Duration::from_millis(config.step_timeout_ms)),
            feedback: config.feedback,
        }
    }
}

/// Cooperative stop request. Checked before each generation starts; a step
/// already running is allowed to finish.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of a finished run. The document is only reachable together with
/// its outcome, so an exhausted run cannot be mistaken for a valid one.
#[must_use = "a refinement may have exhausted its retries; check the outcome"]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refinement {
    document: SpecDocument,
    outcome: ValidationOutcome,
    iterations: u32,
}

impl Refinement {
    pub fn outcome(&self) -> &ValidationOutcome {
        &self.outcome
    }

    /// Round-trips performed
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn is_valid(&self) -> bool {
        self.outcome.is_valid()
    }

    pub fn termination(&self) -> Termination {
        if self.is_valid() {
            Termination::Success
        } else {
            Termination::Exhausted
        }
    }

    /// The document if it passed validation
    pub fn into_valid(self) -> Result<SpecDocument, Exhausted> {
        match self.outcome {
            ValidationOutcome::Valid => Ok(self.document),
            ValidationOutcome::Invalid(reason) => Err(Exhausted {
                document: self.document,
                reason,
                iterations: self.iterations,
            }),
        }
    }

    /// `(final_document, final_outcome, iterations_used)`
    pub fn into_parts(self) -> (SpecDocument, ValidationOutcome, u32) {
        (self.document, self.outcome, self.iterations)
    }
}

/// A run that spent its whole budget without producing a valid document
#[derive(Debug, Clone, Error)]
#[error("no valid document after {iterations} attempts: {reason}")]
pub struct Exhausted {
    /// The last (still invalid) document
    pub document: SpecDocument,
    /// Why the last document was rejected
    pub reason: String,
    pub iterations: u32,
}

/// Drives the generation and validation steps until success or exhaustion
pub struct Refiner<G, V>
where
    G: Generator + ?Sized,
    V: DocumentValidator + ?Sized,
{
    generator: Arc<G>,
    validator: Arc<V>,
    options: RefineOptions,
    cancel: CancelToken,
}

impl<G, V> Refiner<G, V>
where
    G: Generator + ?Sized,
    V: DocumentValidator + ?Sized,
{
    pub fn new(generator: Arc<G>, validator: Arc<V>, options: RefineOptions) -> Self {
        Self {
            generator,
            validator,
            options,
            cancel: CancelToken::new(),
        }
    }

    /// Use an externally owned cancel token
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn options(&self) -> &RefineOptions {
        &self.options
    }

    /// Run the loop. Only step failures and cancellation are errors; an
    /// invalid document after the last attempt is a normal `Refinement`.
    pub async fn refine(&self, context: RefineContext) -> Result<Refinement, RefineError> {
        let max_iterations = self.options.max_iterations;
        if max_iterations == 0 {
            return Err(RefineError::InvalidBudget);
        }

        let mut state = LoopState::new(context.document.unwrap_or_default());

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!(completed = state.rounds(), "Refinement cancelled");
                return Err(RefineError::Cancelled {
                    completed: state.rounds(),
                });
            }

            let attempt = state.rounds() + 1;
            let feedback = state.feedback(self.options.feedback);

            tracing::info!(attempt, max_iterations, "Generating definition");
            let request = GenerationRequest {
                requirements: &context.requirements,
                document: state.document(),
                feedback: feedback.as_deref(),
                attempt,
            };
            let document = self
                .run_step(Step::Generation, attempt, self.generator.generate(request))
                .await?;
            state.record_generation(document);

            let outcome = self
                .run_step(Step::Validation, attempt, self.validator.validate(state.document()))
                .await?;

            match state.record_outcome(outcome, max_iterations) {
                RefinePhase::Done(Termination::Success) => {
                    tracing::info!(attempt, "Definition is valid");
                    break;
                }
                RefinePhase::Done(Termination::Exhausted) => {
                    tracing::warn!(attempt, "Retry budget exhausted with an invalid definition");
                    break;
                }
                _ => {
                    tracing::debug!(
                        attempt,
                        reason = state.last_outcome().and_then(ValidationOutcome::reason).unwrap_or(""),
                        "Definition rejected, retrying"
                    );
                }
            }
        }

        let (document, outcome, iterations) = state.into_parts();
        let outcome = outcome.unwrap_or_else(|| ValidationOutcome::invalid("no attempt was made"));
        Ok(Refinement {
            document,
            outcome,
            iterations,
        })
    }

    async fn run_step<T, F>(&self, step: Step, attempt: u32, fut: F) -> Result<T, RefineError>
    where
        F: Future<Output = crate::error::Result<T>>,
    {
        let result = match self.options.step_timeout {
            Some(timeout) => tokio::time::timeout(timeout, fut)
                .await
                .map_err(|_| RefineError::StepTimedOut { step, attempt, timeout })?,
            None => fut.await,
        };

        result.map_err(|source| {
            tracing::error!(%step, attempt, error = %source, "Step failed, aborting refinement");
            RefineError::StepUnavailable { step, attempt, source }
        })
    }
}
