//! Validate-then-refine loop for OpenAPI definitions.
//!
//! A [`Refiner`] alternates a [`Generator`] and a
//! [`DocumentValidator`](crate::validation::DocumentValidator) until the
//! document validates or the retry budget is spent.

pub mod generator;
pub mod runner;
pub mod state;

pub use generator::{GenerationRequest, Generator, LlmGenerator};
pub use runner::{CancelToken, Exhausted, RefineContext, RefineError, RefineOptions, Refinement, Refiner, Step};
pub use state::{FeedbackPolicy, LoopState, RefinePhase, Termination};
