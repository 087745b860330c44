//! End-to-end API build: refine the definition, save it, generate code.

use std::fmt::Write as _;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::codegen::{ApiInfo, CodeGenerator, CodegenError, GenerationReport};
use crate::config::CodegenConfig;
use crate::document::SpecDocument;
use crate::error::SpecloopError;
use crate::refine::{Generator, RefineContext, RefineError, Refiner};
use crate::store::SpecStore;
use crate::validation::DocumentValidator;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Refine(#[from] RefineError),

    #[error(transparent)]
    Codegen(#[from] CodegenError),

    #[error(transparent)]
    Store(#[from] SpecloopError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    /// Definition validated, saved, and handed to the generators
    Built,
    /// Retry budget spent without a valid definition
    Invalid,
}

/// What a pipeline run produced and where it put it
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub status: PipelineStatus,
    pub iterations: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition_path: Option<PathBuf>,
    /// Last rejection reason when the definition never validated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub components: Vec<GenerationReport>,
    pub finished_at: DateTime<Utc>,
    #[serde(skip)]
    pub document: SpecDocument,
}

impl PipelineReport {
    /// Plain-text summary of the produced resources
    pub fn summary(&self) -> String {
        let mut out = String::new();
        match self.status {
            PipelineStatus::Invalid => {
                let _ = writeln!(
                    out,
                    "No valid OpenAPI definition after {} attempt(s).",
                    self.iterations
                );
                if let Some(reason) = &self.reason {
                    let _ = writeln!(out, "Last validation error: {}", reason);
                }
            }
            PipelineStatus::Built => {
                if let Some(api) = &self.api {
                    let _ = writeln!(
                        out,
                        "{} v{} validated after {} attempt(s).",
                        api.name, api.version, self.iterations
                    );
                }
                if let Some(path) = &self.definition_path {
                    let _ = writeln!(out, "Definition: {}", path.display());
                }
                for report in &self.components {
                    let _ = writeln!(
                        out,
                        "[{}] {} ({}): {}",
                        if report.is_success() { "ok" } else { "failed" },
                        report.component,
                        report.framework,
                        report.message
                    );
                }
            }
        }
        out
    }

    pub fn failed_components(&self) -> usize {
        self.components.iter().filter(|r| !r.is_success()).count()
    }
}

/// Refine, save, generate
pub struct Pipeline<G, V>
where
    G: Generator + ?Sized,
    V: DocumentValidator + ?Sized,
{
    refiner: Refiner<G, V>,
    store: SpecStore,
    codegen: CodeGenerator,
    codegen_config: CodegenConfig,
}

impl<G, V> Pipeline<G, V>
where
    G: Generator + ?Sized,
    V: DocumentValidator + ?Sized,
{
    pub fn new(refiner: Refiner<G, V>, store: SpecStore, codegen: CodeGenerator, codegen_config: CodegenConfig) -> Self {
        Self {
            refiner,
            store,
            codegen,
            codegen_config,
        }
    }

    /// Run the whole build for one set of requirements
    pub async fn build(&self, requirements: &str) -> Result<PipelineReport, PipelineError> {
        let refinement = self.refiner.refine(RefineContext::new(requirements)).await?;
        let iterations = refinement.iterations();

        let document = match refinement.into_valid() {
            Ok(document) => document,
            Err(exhausted) => {
                log::warn!("Pipeline stopped: {}", exhausted);
                return Ok(PipelineReport {
                    status: PipelineStatus::Invalid,
                    iterations,
                    api: None,
                    definition_path: None,
                    reason: Some(exhausted.reason),
                    components: Vec::new(),
                    finished_at: Utc::now(),
                    document: exhausted.document,
                });
            }
        };

        let info = ApiInfo::from_document(&document)?;
        let definition_path = self.store.save_definition(&info.name, &document)?;
        let components = self
            .codegen
            .generate_all(&definition_path, &info, &self.codegen_config)
            .await;

        let report = PipelineReport {
            status: PipelineStatus::Built,
            iterations,
            api: Some(info),
            definition_path: Some(definition_path),
            reason: None,
            components,
            finished_at: Utc::now(),
            document,
        };
        log::info!(
            "Pipeline built {} component(s), {} failed",
            report.components.len(),
            report.failed_components()
        );
        Ok(report)
    }
}
