use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::refine::FeedbackPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub llm: LlmConfig,
    pub refine: RefineConfig,
    pub interview: InterviewConfig,
    pub storage: StorageConfig,
    pub codegen: CodegenConfig,
    pub research: ResearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub max_tokens: u32,
    pub timeout_ms: u64,
    pub api_key_env: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 8192,
            timeout_ms: 300000,
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
        }
    }
}

/// Which validator judges each refined document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidatorKind {
    #[default]
    Builtin,
    Command,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineConfig {
    pub max_iterations: u32,
    pub step_timeout_ms: u64,
    pub feedback: FeedbackPolicy,
    pub validator: ValidatorKind,
    pub validator_command: String,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            step_timeout_ms: 300000,
            feedback: FeedbackPolicy::Latest,
            validator: ValidatorKind::Builtin,
            validator_command: "openapi-spec-validator -".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterviewConfig {
    pub max_turns: u32,
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self { max_turns: 30 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub requirements_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            requirements_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("specloop")
                .join("apis"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenConfig {
    pub command: String,
    pub server_framework: String,
    pub sdk_frameworks: Vec<String>,
    pub docs_framework: String,
    pub timeout_ms: u64,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            command: "openapi-generator-cli".to_string(),
            server_framework: "python-fastapi".to_string(),
            sdk_frameworks: vec![
                "go".to_string(),
                "java".to_string(),
                "python".to_string(),
                "ruby".to_string(),
            ],
            docs_framework: "html2".to_string(),
            timeout_ms: 600000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    pub host: String,
    pub port: u16,
    pub atlas_uri_env: String,
    pub db_name: String,
    pub collection: String,
    pub index: String,
    pub vector_path: String,
    pub num_candidates: u32,
    pub limit: u32,
    pub api_key_env: String,
    pub embedding_model: String,
    pub generation_model: String,
    pub timeout_ms: u64,
    pub ingest_batch_size: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8000,
            atlas_uri_env: "ATLAS_URI".to_string(),
            db_name: "papers".to_string(),
            collection: "arxiv".to_string(),
            index: "vector_index".to_string(),
            vector_path: "embedding".to_string(),
            num_candidates: 50,
            limit: 5,
            api_key_env: "GOOGLE_CLOUD_APIKEY".to_string(),
            embedding_model: "models/text-embedding-004".to_string(),
            generation_model: "models/gemini-2.5-flash-preview-05-20".to_string(),
            timeout_ms: 120000,
            ingest_batch_size: 100,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            llm: LlmConfig::default(),
            refine: RefineConfig::default(),
            interview: InterviewConfig::default(),
            storage: StorageConfig::default(),
            codegen: CodegenConfig::default(),
            research: ResearchConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.check()?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Reject values the loop and clients cannot run with
    pub fn check(&self) -> Result<()> {
        if self.refine.max_iterations == 0 {
            eyre::bail!("refine.max_iterations must be at least 1");
        }
        if self.research.ingest_batch_size == 0 {
            eyre::bail!("research.ingest_batch_size must be at least 1");
        }
        Ok(())
    }
}
