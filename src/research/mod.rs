//! Paper research service
//!
//! An HTTP API over a generative-AI backend (embeddings, text generation)
//! and an Atlas vector-search collection of arXiv metadata, plus the bulk
//! ingest that fills the collection.

pub mod genai;
pub mod ingest;
pub mod server;
pub mod store;
pub mod types;

pub use genai::{GeminiClient, GenAiClient};
pub use ingest::{IngestSummary, ingest};
pub use server::{ResearchError, ResearchService, create_router, serve};
pub use store::{AtlasStore, SearchIndex, VectorStore, vector_search_pipeline};
pub use types::{
    ArxivPaper, BrainstormDocument, BrainstormIdea, BrainstormModel, EmbeddingResponse, InputBrainstorm,
    InputEmbedding, InputRelevance, InputSearch, InputVectorSearch,
};
