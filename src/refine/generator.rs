//! The generation step: produce or revise the OpenAPI definition.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::document::SpecDocument;
use crate::error::Result;
use crate::llm::{CompletionRequest, LlmClient, extract_document};
use crate::prompt::{PromptRenderer, templates};

/// Everything the generation step may look at for one attempt
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    /// Free-form requirements text the definition must satisfy
    pub requirements: &'a str,
    /// The document from the previous attempt (empty on a fresh start)
    pub document: &'a SpecDocument,
    /// Why the previous attempt was rejected
    pub feedback: Option<&'a str>,
    /// 1-based attempt number
    pub attempt: u32,
}

/// The generation step of the refinement loop.
///
/// Returns a document that supersedes the current one. `Err` means the
/// step itself failed (upstream unreachable, bad credentials, ...).
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<SpecDocument>;
}

/// Generator that asks an LLM to write or fix the definition
pub struct LlmGenerator<L: LlmClient + ?Sized> {
    llm: Arc<L>,
    renderer: PromptRenderer,
    max_tokens: u32,
}

impl<L: LlmClient + ?Sized> LlmGenerator<L> {
    pub fn new(llm: Arc<L>, max_tokens: u32) -> Self {
        Self {
            llm,
            renderer: PromptRenderer::new(),
            max_tokens,
        }
    }

    fn build_request(&self, request: &GenerationRequest<'_>) -> Result<CompletionRequest> {
        let user_message = self.renderer.render_with(
            templates::IMPLEMENTOR_USER,
            &json!({
                "requirements": request.requirements,
                "current_definition": request.document.as_str(),
                "feedback": request.feedback,
            }),
        )?;

        Ok(CompletionRequest::new(templates::IMPLEMENTOR_SYSTEM)
            .with_user_message(user_message)
            .with_max_tokens(self.max_tokens))
    }
}

#[async_trait]
impl<L: LlmClient + ?Sized> Generator for LlmGenerator<L> {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<SpecDocument> {
        let completion = self.build_request(&request)?;
        let response = self.llm.complete(completion).await?;

        let content = extract_document(&response.content);
        if content.is_empty() {
            log::warn!(
                "Attempt {} returned no definition, keeping the previous document",
                request.attempt
            );
            return Ok(request.document.clone());
        }

        log::debug!(
            "Attempt {} produced {} bytes ({} tokens out)",
            request.attempt,
            content.len(),
            response.usage.output_tokens
        );
        Ok(SpecDocument::new(content))
    }
}
