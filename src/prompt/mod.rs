//! Prompt templates and rendering

pub mod render;
pub mod templates;

pub use render::PromptRenderer;
