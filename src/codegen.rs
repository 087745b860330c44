//! Server stub, client SDK and documentation generation
//!
//! Shells out to `openapi-generator-cli generate` once per target framework.
//! A failed target is reported, not raised, so one broken generator does not
//! hide the others.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use thiserror::Error;
use tokio::process::Command;

use crate::config::CodegenConfig;
use crate::document::SpecDocument;

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("Definition is not valid YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Definition has no usable info.{0}")]
    MissingInfo(&'static str),
}

/// Name and version of the API, used to name output directories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiInfo {
    pub name: String,
    pub version: String,
}

impl ApiInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Read `info.title` and `info.version` from a definition
    pub fn from_document(document: &SpecDocument) -> Result<Self, CodegenError> {
        let root: Value = serde_yaml::from_str(document.as_str())?;
        let info = root.get("info");
        let field = |key: &'static str| {
            info.and_then(|info| info.get(key))
                .and_then(scalar_to_string)
                .filter(|value| !value.trim().is_empty())
                .ok_or(CodegenError::MissingInfo(key))
        };
        Ok(Self {
            name: field("title")?,
            version: field("version")?,
        })
    }
}

/// Versions are often written unquoted (`version: 1.0`)
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Kind of artifact produced from the definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Component {
    ServerStub,
    ClientSdk,
    Documentation,
}

impl Component {
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::ServerStub => "server-stub",
            Component::ClientSdk => "client-sdk",
            Component::Documentation => "documentation",
        }
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{api}_{component}_{framework}_v{version}`, lowercased, with spaces,
/// dashes and path separators turned into underscores
pub fn output_directory(api_name: &str, component: Component, framework: &str, version: &str) -> String {
    format!("{}_{}_{}_v{}", api_name, component, framework, version)
        .to_lowercase()
        .replace([' ', '-', '/', '\\'], "_")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Success,
    Error,
}

/// Result of one generator run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub component: Component,
    pub framework: String,
    pub status: GenerationStatus,
    /// Output directory relative to the output root, on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl GenerationReport {
    pub fn is_success(&self) -> bool {
        self.status == GenerationStatus::Success
    }
}

/// Runs the external generator
#[derive(Debug, Clone)]
pub struct CodeGenerator {
    program: String,
    prefix_args: Vec<String>,
    output_root: PathBuf,
    timeout: Duration,
}

impl CodeGenerator {
    /// `command` may carry leading arguments, e.g. `npx @openapitools/openapi-generator-cli`
    pub fn new(command: &str, output_root: impl Into<PathBuf>, timeout: Duration) -> Self {
        let mut words = command.split_whitespace().map(str::to_string);
        let program = words.next().unwrap_or_default();
        Self {
            program,
            prefix_args: words.collect(),
            output_root: output_root.into(),
            timeout,
        }
    }

    pub fn from_config(config: &CodegenConfig, output_root: impl Into<PathBuf>) -> Self {
        Self::new(&config.command, output_root, Duration::from_millis(config.timeout_ms))
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Generate one component for one framework
    pub async fn generate(
        &self,
        component: Component,
        spec_path: &Path,
        framework: &str,
        info: &ApiInfo,
    ) -> GenerationReport {
        let directory = output_directory(&info.name, component, framework, &info.version);
        let report = |status: GenerationStatus, path: Option<String>, message: String, details: Option<String>| GenerationReport {
            component,
            framework: framework.to_string(),
            status,
            path,
            message,
            details,
        };

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.prefix_args)
            .arg("generate")
            .arg("-i")
            .arg(spec_path)
            .arg("-g")
            .arg(framework)
            .arg("-o")
            .arg(self.output_root.join(&directory))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        log::debug!("Generating {} for {} into {}", component, framework, directory);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                log::error!("Failed to run {}: {}", self.program, e);
                return report(
                    GenerationStatus::Error,
                    None,
                    format!("An unexpected error occurred: {}", e),
                    None,
                );
            }
            Err(_) => {
                return report(
                    GenerationStatus::Error,
                    None,
                    format!("Failed to generate {}: timed out after {:?}", component, self.timeout),
                    None,
                );
            }
        };

        if output.status.success() {
            log::info!("{} for {} generated in {}", component, framework, directory);
            report(
                GenerationStatus::Success,
                Some(directory.clone()),
                format!("{} for {} generated successfully in {}", component, framework, directory),
                None,
            )
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            log::warn!("{} for {} failed: {}", component, framework, stderr);
            report(
                GenerationStatus::Error,
                None,
                format!("Failed to generate {}: {}", component, stderr),
                Some(format!("{} exited with {}", self.program, output.status)),
            )
        }
    }

    /// Server stub, every SDK and the docs, all at once
    pub async fn generate_all(&self, spec_path: &Path, info: &ApiInfo, config: &CodegenConfig) -> Vec<GenerationReport> {
        let mut targets = vec![(Component::ServerStub, config.server_framework.as_str())];
        targets.extend(config.sdk_frameworks.iter().map(|fw| (Component::ClientSdk, fw.as_str())));
        targets.push((Component::Documentation, config.docs_framework.as_str()));

        join_all(
            targets
                .into_iter()
                .map(|(component, framework)| self.generate(component, spec_path, framework, info)),
        )
        .await
    }
}
