//! Handlebars rendering for prompt templates

use handlebars::Handlebars;
use serde::Serialize;

use crate::error::{Result, SpecloopError};

/// Renders prompt templates using Handlebars
pub struct PromptRenderer {
    handlebars: Handlebars<'static>,
}

impl Default for PromptRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptRenderer {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        // Missing variables render as empty
        handlebars.set_strict_mode(false);
        // Prompts are not HTML
        handlebars.register_escape_fn(handlebars::no_escape);
        Self { handlebars }
    }

    /// Render a template string with any serializable context
    pub fn render_with<T: Serialize>(&self, template: &str, context: &T) -> Result<String> {
        self.handlebars
            .render_template(template, context)
            .map_err(|e| SpecloopError::InvalidState(format!("Failed to render template: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::templates;
    use serde_json::json;

    #[test]
    fn test_render_does_not_escape() {
        let renderer = PromptRenderer::new();
        let out = renderer
            .render_with("{{body}}", &json!({ "body": "<a href=\"x\">&</a>" }))
            .unwrap();
        assert_eq!(out, "<a href=\"x\">&</a>");
    }

    #[test]
    fn test_missing_variable_renders_empty() {
        let renderer = PromptRenderer::new();
        assert_eq!(renderer.render_with("[{{nope}}]", &json!({})).unwrap(), "[]");
    }

    #[test]
    fn test_bad_template_is_error() {
        let renderer = PromptRenderer::new();
        assert!(renderer.render_with("{{#if}}", &json!({})).is_err());
    }

    #[test]
    fn test_implementor_user_sections() {
        let renderer = PromptRenderer::new();
        let full = renderer
            .render_with(
                templates::IMPLEMENTOR_USER,
                &json!({
                    "requirements": "Pets API",
                    "current_definition": "openapi: 3.0.0",
                    "feedback": "paths missing",
                }),
            )
            .unwrap();
        assert!(full.starts_with("## API Requirements\n\nPets API"));
        assert!(full.contains("## Current Definition\n\n```yaml\nopenapi: 3.0.0\n```"));
        assert!(full.contains("## Validation Feedback"));
        assert!(full.contains("paths missing"));

        let fresh = renderer
            .render_with(
                templates::IMPLEMENTOR_USER,
                &json!({ "requirements": "Pets API", "current_definition": "", "feedback": null }),
            )
            .unwrap();
        assert!(!fresh.contains("Current Definition"));
        assert!(!fresh.contains("Validation Feedback"));
    }

    #[test]
    fn test_relevance_template() {
        let renderer = PromptRenderer::new();
        let out = renderer
            .render_with(templates::RELEVANCE, &json!({ "query": "graph nets", "abstract": "We study GNNs." }))
            .unwrap();
        assert!(out.contains("graph nets\nand this abstract paper:\nWe study GNNs."));
    }
}
