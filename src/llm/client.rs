//! The LLM client trait and a scripted test double

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Result, SpecloopError};
use crate::llm::types::{CompletionRequest, CompletionResponse};

/// Stateless LLM client; each call carries the whole conversation
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Model used when a request does not name one
    fn model(&self) -> &str;
}

/// Client that replays queued responses and records every request.
///
/// Answers with `InvalidState` once the queue is empty.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<CompletionResponse>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(responses: impl IntoIterator<Item = CompletionResponse>) -> Self {
        let client = Self::new();
        for response in responses {
            client.push_response(response);
        }
        client
    }

    pub fn push_response(&self, response: CompletionResponse) {
        self.lock_responses().push_back(Ok(response));
    }

    pub fn push_text(&self, text: impl Into<String>) {
        self.push_response(CompletionResponse::text(text));
    }

    pub fn push_error(&self, error: SpecloopError) {
        self.lock_responses().push_back(Err(error));
    }

    /// Requests seen so far, oldest first
    pub fn requests(&self) -> Vec<CompletionRequest> {
        match self.requests.lock() {
            Ok(requests) => requests.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn lock_responses(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<CompletionResponse>>> {
        self.responses.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request);

        self.lock_responses()
            .pop_front()
            .unwrap_or_else(|| Err(SpecloopError::InvalidState("No scripted LLM response left".to_string())))
    }

    fn model(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_replays_in_order() {
        let llm = MockLlmClient::new();
        llm.push_text("first");
        llm.push_text("second");

        let a = llm.complete(CompletionRequest::new("s")).await.unwrap();
        let b = llm.complete(CompletionRequest::new("s")).await.unwrap();
        assert_eq!(a.content, "first");
        assert_eq!(b.content, "second");
        assert_eq!(llm.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_empty_queue_is_error() {
        let llm = MockLlmClient::new();
        let err = llm.complete(CompletionRequest::new("s")).await.unwrap_err();
        assert!(matches!(err, SpecloopError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_mock_scripted_error() {
        let llm = MockLlmClient::with_responses(vec![CompletionResponse::text("ok")]);
        llm.push_error(SpecloopError::Unavailable("503".to_string()));

        assert!(llm.complete(CompletionRequest::new("s")).await.is_ok());
        assert!(llm.complete(CompletionRequest::new("s")).await.unwrap_err().is_unavailable());
    }

    #[test]
    fn test_mock_is_object_safe() {
        let llm: Box<dyn LlmClient> = Box::new(MockLlmClient::new());
        assert_eq!(llm.model(), "mock");
    }
}
