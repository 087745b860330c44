//! HTTP front end of the research service

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::{Value, json};
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::SpecloopError;
use crate::prompt::{PromptRenderer, templates};
use crate::research::genai::GenAiClient;
use crate::research::store::VectorStore;
use crate::research::types::{
    ArxivPaper, BrainstormModel, EmbeddingResponse, InputBrainstorm, InputEmbedding, InputRelevance, InputSearch,
    InputVectorSearch,
};

/// Handler failures; all of them are upstream problems
#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("{0}")]
    Upstream(#[from] SpecloopError),

    #[error("Upstream returned malformed data: {0}")]
    Malformed(String),
}

impl IntoResponse for ResearchError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self, "Research request failed");
        (StatusCode::BAD_GATEWAY, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ResearchError>;

/// Shared handler state
pub struct ResearchService {
    genai: Arc<dyn GenAiClient>,
    store: Arc<dyn VectorStore>,
    renderer: PromptRenderer,
    limit: u32,
}

impl ResearchService {
    pub fn new(genai: Arc<dyn GenAiClient>, store: Arc<dyn VectorStore>, limit: u32) -> Self {
        Self {
            genai,
            store,
            renderer: PromptRenderer::new(),
            limit,
        }
    }
}

async fn root() -> Json<Value> {
    Json(json!({ "Hello": "World" }))
}

async fn embedding(
    State(service): State<Arc<ResearchService>>,
    Json(input): Json<InputEmbedding>,
) -> ApiResult<EmbeddingResponse> {
    let embedding = service.genai.embed(&input.content).await?;
    Ok(Json(EmbeddingResponse { embedding }))
}

async fn search(State(service): State<Arc<ResearchService>>, Json(input): Json<InputSearch>) -> ApiResult<Vec<ArxivPaper>> {
    let embedding = service.genai.embed(&input.search_text).await?;
    tracing::debug!(dimensions = embedding.len(), "Embedded search text");
    let papers = service.store.vector_search(embedding, service.limit).await?;
    tracing::info!(results = papers.len(), "Search finished");
    Ok(Json(papers))
}

async fn vector_search(
    State(service): State<Arc<ResearchService>>,
    Json(input): Json<InputVectorSearch>,
) -> ApiResult<Vec<ArxivPaper>> {
    let papers = service.store.vector_search(input.embedding, service.limit).await?;
    Ok(Json(papers))
}

async fn relevance(State(service): State<Arc<ResearchService>>, Json(input): Json<InputRelevance>) -> ApiResult<String> {
    let prompt = service.renderer.render_with(templates::RELEVANCE, &input)?;
    let text = service.genai.generate_text(&prompt).await?;
    Ok(Json(text))
}

async fn brainstorm(
    State(service): State<Arc<ResearchService>>,
    Json(input): Json<InputBrainstorm>,
) -> ApiResult<BrainstormModel> {
    let mut parts = vec![templates::BRAINSTORM.to_string()];
    parts.extend(input.docs.iter().map(|doc| format!("{}: {}", doc.title, doc.r#abstract)));

    let value = service
        .genai
        .generate_json(&parts, &BrainstormModel::response_schema())
        .await?;
    let model = serde_json::from_value(value).map_err(|e| ResearchError::Malformed(e.to_string()))?;
    Ok(Json(model))
}

/// All routes, with permissive CORS
pub fn create_router(service: Arc<ResearchService>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/embedding", post(embedding))
        .route("/search", post(search))
        .route("/vectorSearch", post(vector_search))
        .route("/relevance", post(relevance))
        .route("/brainstorm", post(brainstorm))
        .with_state(service)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until ctrl-c
pub async fn serve(host: &str, port: u16, service: Arc<ResearchService>) -> crate::error::Result<()> {
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    log::info!("Research service listening on {}", listener.local_addr()?);

    axum::serve(listener, create_router(service))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("Shutting down research service");
        })
        .await?;
    Ok(())
}
