//! Specloop - drive an LLM to a valid OpenAPI definition
//!
//! Specloop runs a validate-then-refine loop: generate a definition from
//! requirements, check it, feed the rejection back, and stop on the first
//! valid document or when the retry budget is spent. Around the loop sit a
//! requirements interview, code generation from the finished definition,
//! and a small paper research service.

pub mod codegen;
pub mod config;
pub mod document;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod refine;
pub mod requirements;
pub mod research;
pub mod store;
pub mod validation;

pub use document::SpecDocument;
pub use error::{Result, SpecloopError};
