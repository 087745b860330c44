//! Request and response bodies of the research service

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// arXiv paper metadata as stored in the vector collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArxivPaper {
    pub id: String,
    pub title: String,
    pub authors: String,
    pub r#abstract: String,
    pub categories: String,
    #[serde(default)]
    pub embedding: Vec<f64>,
    /// Only present on search results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_score: Option<f64>,
}

impl ArxivPaper {
    /// Text that gets embedded for a paper
    pub fn embedding_text(&self) -> String {
        format!("{}\n{}", self.title, self.r#abstract)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputEmbedding {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSearch {
    pub search_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputVectorSearch {
    pub embedding: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputRelevance {
    pub query: String,
    pub r#abstract: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrainstormDocument {
    pub title: String,
    pub r#abstract: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputBrainstorm {
    pub docs: Vec<BrainstormDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub embedding: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrainstormIdea {
    pub title: String,
    pub text: String,
}

/// Structured brainstorm answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrainstormModel {
    pub synthesis: String,
    pub gaps: Vec<String>,
    pub ideas: Vec<BrainstormIdea>,
}

impl BrainstormModel {
    /// `responseSchema` for the generation API (OpenAPI subset, upper-case types)
    pub fn response_schema() -> Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "synthesis": { "type": "STRING" },
                "gaps": { "type": "ARRAY", "items": { "type": "STRING" } },
                "ideas": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "title": { "type": "STRING" },
                            "text": { "type": "STRING" }
                        },
                        "required": ["title", "text"]
                    }
                }
            },
            "required": ["synthesis", "gaps", "ideas"]
        })
    }
}
