//! Refinement loop integration tests
//!
//! Drives the public API end to end with a mock LLM client and the builtin
//! OpenAPI validator.

use std::sync::Arc;
use std::time::Duration;

use specloop::SpecloopError;
use specloop::codegen::CodeGenerator;
use specloop::config::CodegenConfig;
use specloop::llm::MockLlmClient;
use specloop::pipeline::{Pipeline, PipelineStatus};
use specloop::refine::{LlmGenerator, RefineContext, RefineError, RefineOptions, Refiner, Termination};
use specloop::store::SpecStore;
use specloop::validation::OpenApiValidator;
use tempfile::TempDir;

const BROKEN: &str = "```yaml\nopenapi: 3.0.3\ninfo:\n  title: Todo\n```";

const TODO: &str = "```yaml
openapi: 3.0.3
info:
  title: Todo
  version: 2.1.0
paths:
  /todos/{id}:
    get:
      operationId: getTodo
      parameters:
        - name: id
          in: path
          required: true
      responses:
        '200':
          description: ok
```";

fn refiner(llm: Arc<MockLlmClient>, max_iterations: u32) -> Refiner<LlmGenerator<MockLlmClient>, OpenApiValidator> {
    Refiner::new(
        Arc::new(LlmGenerator::new(llm, 4096)),
        Arc::new(OpenApiValidator::new()),
        RefineOptions {
            max_iterations,
            ..Default::default()
        },
    )
}

#[tokio::test]
async fn test_rejection_is_fed_back_until_valid() {
    let llm = Arc::new(MockLlmClient::new());
    llm.push_text(BROKEN);
    llm.push_text(TODO);

    let refinement = refiner(llm.clone(), 5)
        .refine(RefineContext::new("A todo API"))
        .await
        .unwrap();

    assert_eq!(refinement.termination(), Termination::Success);
    assert_eq!(refinement.iterations(), 2);
    let document = refinement.into_valid().unwrap();
    assert!(document.as_str().starts_with("openapi: 3.0.3"));

    let requests = llm.requests();
    assert_eq!(requests.len(), 2);
    let retry = &requests[1].messages[0].content;
    assert!(retry.contains("It is NOT a valid OpenAPI Specification"));
    assert!(retry.contains("title: Todo"));
}

#[tokio::test]
async fn test_budget_exhausted_keeps_last_reason() {
    let llm = Arc::new(MockLlmClient::new());
    llm.push_text(BROKEN);
    llm.push_text(BROKEN);

    let refinement = refiner(llm.clone(), 2)
        .refine(RefineContext::new("A todo API"))
        .await
        .unwrap();

    assert_eq!(refinement.termination(), Termination::Exhausted);
    let exhausted = refinement.into_valid().unwrap_err();
    assert_eq!(exhausted.iterations, 2);
    assert!(exhausted.reason.contains("version"));
    assert_eq!(llm.requests().len(), 2);
}

#[tokio::test]
async fn test_unreachable_llm_aborts() {
    let llm = Arc::new(MockLlmClient::new());
    llm.push_error(SpecloopError::Unavailable("connection refused".to_string()));

    let err = refiner(llm, 5)
        .refine(RefineContext::new("A todo API"))
        .await
        .unwrap_err();

    assert!(matches!(err, RefineError::StepUnavailable { attempt: 1, .. }));
}

#[tokio::test]
async fn test_pipeline_saves_definition_and_reports_generators() {
    let dir = TempDir::new().unwrap();
    let llm = Arc::new(MockLlmClient::new());
    llm.push_text(TODO);

    let script = dir.path().join("generator.sh");
    std::fs::write(&script, "mkdir -p \"$7\"\n").unwrap();
    let config = CodegenConfig {
        command: format!("sh {}", script.display()),
        sdk_frameworks: vec!["go".to_string(), "python".to_string()],
        ..Default::default()
    };
    let store = SpecStore::new(dir.path().join("apis"));
    let codegen = CodeGenerator::new(&config.command, store.root(), Duration::from_secs(10));
    let pipeline = Pipeline::new(refiner(llm, 3), store, codegen, config);

    let report = pipeline.build("A todo API").await.unwrap();

    assert_eq!(report.status, PipelineStatus::Built);
    assert_eq!(report.components.len(), 4);
    assert_eq!(report.failed_components(), 0);
    let saved = dir.path().join("apis").join("Todo").join("swagger.yaml");
    assert_eq!(report.definition_path.as_deref(), Some(saved.as_path()));
    assert!(std::fs::read_to_string(&saved).unwrap().contains("getTodo"));
    assert!(dir.path().join("apis").join("todo_client_sdk_python_v2.1.0").is_dir());
}
