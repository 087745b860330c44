//! Paper storage with Atlas vector search

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{Document, doc};
use mongodb::{Client, Collection};

use crate::config::ResearchConfig;
use crate::error::{Result, SpecloopError};
use crate::research::types::ArxivPaper;

/// Where papers and their embeddings live
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn ping(&self) -> Result<()>;

    /// Store papers, returning how many were inserted
    async fn insert_many(&self, papers: Vec<ArxivPaper>) -> Result<usize>;

    /// Nearest papers to `embedding`, best first, with `search_score` set
    async fn vector_search(&self, embedding: Vec<f64>, limit: u32) -> Result<Vec<ArxivPaper>>;
}

/// Vector search settings
#[derive(Debug, Clone)]
pub struct SearchIndex {
    pub index: String,
    pub path: String,
    pub num_candidates: u32,
}

impl From<&ResearchConfig> for SearchIndex {
    fn from(config: &ResearchConfig) -> Self {
        Self {
            index: config.index.clone(),
            path: config.vector_path.clone(),
            num_candidates: config.num_candidates,
        }
    }
}

/// `$vectorSearch` followed by a `$project` of the paper fields and score
pub fn vector_search_pipeline(search: &SearchIndex, embedding: Vec<f64>, limit: u32) -> Vec<Document> {
    let num_candidates = i64::from(search.num_candidates);
    let limit = i64::from(limit);
    vec![
        doc! {
            "$vectorSearch": {
                "index": search.index.as_str(),
                "path": search.path.as_str(),
                "queryVector": embedding,
                "numCandidates": num_candidates,
                "limit": limit,
            }
        },
        doc! {
            "$project": {
                "_id": 0,
                "id": 1,
                "title": 1,
                "authors": 1,
                "abstract": 1,
                "categories": 1,
                "embedding": 1,
                "search_score": { "$meta": "vectorSearchScore" },
            }
        },
    ]
}

/// MongoDB Atlas collection of papers
pub struct AtlasStore {
    client: Client,
    collection: Collection<ArxivPaper>,
    search: SearchIndex,
}

fn unavailable(e: mongodb::error::Error) -> SpecloopError {
    SpecloopError::Unavailable(format!("MongoDB: {}", e))
}

impl AtlasStore {
    /// Build from config, reading the connection string from `config.atlas_uri_env` once
    pub async fn from_config(config: &ResearchConfig) -> Result<Self> {
        let uri = std::env::var(&config.atlas_uri_env)
            .map_err(|_| SpecloopError::Config(format!("{} not set", config.atlas_uri_env)))?;
        Self::connect(&uri, config).await
    }

    pub async fn connect(uri: &str, config: &ResearchConfig) -> Result<Self> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| SpecloopError::Config(format!("Invalid MongoDB URI: {}", e)))?;
        let collection = client.database(&config.db_name).collection(&config.collection);
        log::info!("Using MongoDB collection {}.{}", config.db_name, config.collection);

        Ok(Self {
            client,
            collection,
            search: SearchIndex::from(config),
        })
    }
}

#[async_trait]
impl VectorStore for AtlasStore {
    async fn ping(&self) -> Result<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn insert_many(&self, papers: Vec<ArxivPaper>) -> Result<usize> {
        if papers.is_empty() {
            return Ok(0);
        }
        let result = self.collection.insert_many(papers).await.map_err(unavailable)?;
        Ok(result.inserted_ids.len())
    }

    async fn vector_search(&self, embedding: Vec<f64>, limit: u32) -> Result<Vec<ArxivPaper>> {
        let pipeline = vector_search_pipeline(&self.search, embedding, limit);
        let mut cursor = self.collection.aggregate(pipeline).await.map_err(unavailable)?;

        let mut papers = Vec::new();
        while let Some(document) = cursor.try_next().await.map_err(unavailable)? {
            let paper = mongodb::bson::from_document(document)
                .map_err(|e| SpecloopError::Storage(format!("Unexpected search result: {}", e)))?;
            papers.push(paper);
        }
        Ok(papers)
    }
}

impl std::fmt::Debug for AtlasStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtlasStore")
            .field("collection", &self.collection.name())
            .field("index", &self.search.index)
            .finish()
    }
}
