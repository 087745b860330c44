//! Embedding and text generation through the Generative Language API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::config::ResearchConfig;
use crate::error::{Result, SpecloopError};

const GENAI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const TASK_TYPE: &str = "RETRIEVAL_QUERY";

/// Generative AI backend used by the research service
#[async_trait]
pub trait GenAiClient: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f64>>;

    /// One embedding per input, in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f64>>>;

    async fn generate_text(&self, prompt: &str) -> Result<String>;

    /// Generate JSON constrained by `schema`; each part is sent as its own text part
    async fn generate_json(&self, parts: &[String], schema: &Value) -> Result<Value>;
}

/// REST client for `generativelanguage.googleapis.com`
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    embedding_model: String,
    generation_model: String,
}

impl GeminiClient {
    /// Build from config, reading the key from `config.api_key_env` once
    pub fn from_config(config: &ResearchConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| SpecloopError::Config(format!("{} not set", config.api_key_env)))?;
        Self::with_api_key(api_key, config)
    }

    pub fn with_api_key(api_key: impl Into<String>, config: &ResearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| SpecloopError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: GENAI_API_URL.to_string(),
            embedding_model: config.embedding_model.clone(),
            generation_model: config.generation_model.clone(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn embed_request(&self, text: &str) -> Value {
        json!({
            "model": self.embedding_model,
            "content": { "parts": [{ "text": text }] },
            "taskType": TASK_TYPE
        })
    }

    fn generate_request(&self, parts: &[String], schema: Option<&Value>) -> Value {
        let parts: Vec<Value> = parts.iter().map(|text| json!({ "text": text })).collect();
        let mut body = json!({
            "contents": [{ "role": "user", "parts": parts }]
        });
        if let Some(schema) = schema {
            body["generationConfig"] = json!({
                "responseMimeType": "application/json",
                "responseSchema": schema
            });
        }
        body
    }

    async fn post(&self, model: &str, method: &str, body: &Value) -> Result<Value> {
        let url = format!("{}/{}:{}", self.base_url, model, method);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = format!("{} returned {}: {}", method, status, text);
            return Err(if status.as_u16() == 429 || status.is_server_error() {
                SpecloopError::Unavailable(message)
            } else {
                SpecloopError::Llm(message)
            });
        }

        response
            .json()
            .await
            .map_err(|e| SpecloopError::Llm(format!("Failed to parse {} response: {}", method, e)))
    }
}

fn parse_values(embedding: &Value) -> Result<Vec<f64>> {
    embedding["values"]
        .as_array()
        .ok_or_else(|| SpecloopError::Llm("Embedding response has no values".to_string()))?
        .iter()
        .map(|v| {
            v.as_f64()
                .ok_or_else(|| SpecloopError::Llm("Embedding value is not a number".to_string()))
        })
        .collect()
}

/// Concatenated text parts of the first candidate
fn parse_text(body: &Value) -> Result<String> {
    let parts = body["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| SpecloopError::Llm("Generation response has no candidates".to_string()))?;
    Ok(parts.iter().filter_map(|part| part["text"].as_str()).collect())
}

#[async_trait]
impl GenAiClient for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f64>> {
        let body = self.embed_request(text);
        let response = self.post(&self.embedding_model, "embedContent", &body).await?;
        parse_values(&response["embedding"])
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f64>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let requests: Vec<Value> = texts.iter().map(|text| self.embed_request(text)).collect();
        let response = self
            .post(&self.embedding_model, "batchEmbedContents", &json!({ "requests": requests }))
            .await?;

        let embeddings = response["embeddings"]
            .as_array()
            .ok_or_else(|| SpecloopError::Llm("Batch response has no embeddings".to_string()))?;
        if embeddings.len() != texts.len() {
            return Err(SpecloopError::Llm(format!(
                "Asked for {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }
        embeddings.iter().map(parse_values).collect()
    }

    async fn generate_text(&self, prompt: &str) -> Result<String> {
        let body = self.generate_request(&[prompt.to_string()], None);
        let response = self.post(&self.generation_model, "generateContent", &body).await?;
        parse_text(&response)
    }

    async fn generate_json(&self, parts: &[String], schema: &Value) -> Result<Value> {
        let body = self.generate_request(parts, Some(schema));
        let response = self.post(&self.generation_model, "generateContent", &body).await?;
        let text = parse_text(&response)?;
        serde_json::from_str(&text).map_err(|e| SpecloopError::Llm(format!("Generated JSON is malformed: {}", e)))
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("embedding_model", &self.embedding_model)
            .field("generation_model", &self.generation_model)
            .finish()
    }
}
