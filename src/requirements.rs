//! Requirements interview
//!
//! The model plays a product manager and questions the operator turn by
//! turn. It finishes by calling the `submit_requirements` tool with the
//! gathered requirements as one Markdown document.

use std::sync::Arc;

use async_trait::async_trait;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::error::{Result, SpecloopError};
use crate::llm::{CompletionRequest, LlmClient, Message, ToolDefinition};
use crate::prompt::templates;

/// Name of the one tool the interviewer may call
pub const SUBMIT_REQUIREMENTS: &str = "submit_requirements";

const OPENING: &str = "I want to design a new API.";

/// Requirements gathered by the interview
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiRequirements {
    pub markdown: String,
}

impl ApiRequirements {
    pub fn new(markdown: impl Into<String>) -> Self {
        Self {
            markdown: markdown.into(),
        }
    }
}

/// Definition of the `submit_requirements` tool
pub fn submit_requirements_tool() -> ToolDefinition {
    ToolDefinition::new(
        SUBMIT_REQUIREMENTS,
        "Submit the final, user-confirmed API requirements as one structured Markdown document.",
        json!({
            "type": "object",
            "properties": {
                "markdown": {
                    "type": "string",
                    "description": "Markdown document with every gathered API detail"
                }
            },
            "required": ["markdown"]
        }),
    )
}

/// The human on the other side of the interview
#[async_trait]
pub trait Operator: Send + Sync {
    /// Show `prompt` and return the operator's answer
    async fn ask(&self, prompt: &str) -> Result<String>;
}

/// Operator reading answers from stdin
#[derive(Debug, Default)]
pub struct StdinOperator;

#[async_trait]
impl Operator for StdinOperator {
    async fn ask(&self, prompt: &str) -> Result<String> {
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(format!("\n{}\n{} ", prompt.cyan(), ">".bold()).as_bytes())
            .await?;
        stdout.flush().await?;

        let mut line = String::new();
        let read = BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
        if read == 0 {
            return Err(SpecloopError::InvalidState("Operator closed the input".to_string()));
        }
        Ok(line.trim_end().to_string())
    }
}

/// Runs the interview conversation
pub struct Interviewer<L: LlmClient + ?Sized, O: Operator + ?Sized> {
    llm: Arc<L>,
    operator: Arc<O>,
    max_turns: u32,
    max_tokens: u32,
}

impl<L: LlmClient + ?Sized, O: Operator + ?Sized> Interviewer<L, O> {
    pub fn new(llm: Arc<L>, operator: Arc<O>, max_turns: u32, max_tokens: u32) -> Self {
        Self {
            llm,
            operator,
            max_turns,
            max_tokens,
        }
    }

    /// Interview until the model submits requirements or the turn limit is hit
    pub async fn run(&self, opening: Option<&str>) -> Result<ApiRequirements> {
        let mut messages = vec![Message::user(opening.unwrap_or(OPENING))];

        for turn in 1..=self.max_turns {
            let request = CompletionRequest::new(templates::PM_SYSTEM)
                .with_messages(messages.iter().cloned())
                .with_tools(vec![submit_requirements_tool()])
                .with_max_tokens(self.max_tokens);

            let response = self.llm.complete(request).await?;

            if let Some(call) = response.tool_call(SUBMIT_REQUIREMENTS) {
                let requirements: ApiRequirements = serde_json::from_value(call.input.clone()).map_err(|e| {
                    SpecloopError::Llm(format!("Malformed {} call: {}", SUBMIT_REQUIREMENTS, e))
                })?;
                if requirements.markdown.trim().is_empty() {
                    return Err(SpecloopError::Llm(format!("{} called with empty markdown", SUBMIT_REQUIREMENTS)));
                }
                log::info!("Requirements submitted after {} turn(s)", turn);
                return Ok(requirements);
            }

            if response.content.trim().is_empty() {
                return Err(SpecloopError::Llm(format!("Empty interviewer turn {}", turn)));
            }

            let answer = self.operator.ask(&response.content).await?;
            messages.push(Message::assistant(response.content));
            messages.push(Message::user(answer));
        }

        Err(SpecloopError::InvalidState(format!(
            "No requirements submitted after {} turns",
            self.max_turns
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{CompletionResponse, MockLlmClient, Role, StopReason, ToolCall};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Operator answering from a script and recording what it was shown
    struct ScriptedOperator {
        answers: Mutex<VecDeque<String>>,
        shown: Mutex<Vec<String>>,
    }

    impl ScriptedOperator {
        fn new(answers: &[&str]) -> Self {
            Self {
                answers: Mutex::new(answers.iter().map(|a| a.to_string()).collect()),
                shown: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Operator for ScriptedOperator {
        async fn ask(&self, prompt: &str) -> Result<String> {
            self.shown.lock().unwrap().push(prompt.to_string());
            Ok(self.answers.lock().unwrap().pop_front().unwrap_or_default())
        }
    }

    fn submit(markdown: &str) -> CompletionResponse {
        CompletionResponse {
            content: "Thanks, submitting.".to_string(),
            tool_calls: vec![ToolCall::new("toolu_1", SUBMIT_REQUIREMENTS, json!({ "markdown": markdown }))],
            stop_reason: StopReason::ToolUse,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_interview_until_submission() {
        let llm = Arc::new(MockLlmClient::with_responses([
            CompletionResponse::text("What is the API's main purpose?"),
            CompletionResponse::text("Which endpoints do you need?"),
            submit("# Pets API\n\n- GET /pets"),
        ]));
        let operator = Arc::new(ScriptedOperator::new(&["Manage pets", "GET /pets"]));

        let interviewer = Interviewer::new(llm.clone(), operator.clone(), 10, 1024);
        let requirements = interviewer.run(None).await.unwrap();

        assert_eq!(requirements.markdown, "# Pets API\n\n- GET /pets");
        assert_eq!(
            *operator.shown.lock().unwrap(),
            vec!["What is the API's main purpose?", "Which endpoints do you need?"]
        );

        let requests = llm.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].system, templates::PM_SYSTEM);
        assert_eq!(requests[0].tools[0].name, SUBMIT_REQUIREMENTS);
        assert_eq!(requests[0].messages, vec![Message::user(OPENING)]);

        let last = &requests[2].messages;
        assert_eq!(last.len(), 5);
        assert_eq!(last[3].role, Role::Assistant);
        assert_eq!(last[4], Message::user("GET /pets"));
    }

    #[tokio::test]
    async fn test_turn_limit() {
        let llm = Arc::new(MockLlmClient::new());
        llm.push_text("Question 1?");
        llm.push_text("Question 2?");
        let operator = Arc::new(ScriptedOperator::new(&["a", "b"]));

        let interviewer = Interviewer::new(llm.clone(), operator, 2, 1024);
        let err = interviewer.run(Some("Hi")).await.unwrap_err();

        assert!(matches!(err, SpecloopError::InvalidState(_)));
        assert_eq!(llm.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_submission() {
        let llm = Arc::new(MockLlmClient::new());
        llm.push_response(CompletionResponse {
            tool_calls: vec![ToolCall::new("t", SUBMIT_REQUIREMENTS, json!({ "text": "oops" }))],
            ..Default::default()
        });
        let interviewer = Interviewer::new(llm, Arc::new(ScriptedOperator::new(&[])), 5, 1024);

        let err = interviewer.run(None).await.unwrap_err();
        assert!(matches!(err, SpecloopError::Llm(_)));
    }

    #[tokio::test]
    async fn test_empty_submission_rejected() {
        let llm = Arc::new(MockLlmClient::with_responses([submit("   ")]));
        let interviewer = Interviewer::new(llm, Arc::new(ScriptedOperator::new(&[])), 5, 1024);

        assert!(interviewer.run(None).await.is_err());
    }

    #[tokio::test]
    async fn test_llm_failure_propagates() {
        let llm = Arc::new(MockLlmClient::new());
        llm.push_error(SpecloopError::Unavailable("down".to_string()));
        let interviewer = Interviewer::new(llm, Arc::new(ScriptedOperator::new(&[])), 5, 1024);

        assert!(interviewer.run(None).await.unwrap_err().is_unavailable());
    }
}
