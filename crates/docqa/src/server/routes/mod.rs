//! API routes

pub mod documents;
pub mod feedback;
pub mod query;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};

use crate::error::Result;
use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route("/query", post(query::ask))
        .route("/feedback", post(feedback::submit_feedback))
        .route("/feedback/stats", get(feedback::stats))
        .route("/feedback/orphans", get(feedback::orphans))
        .route("/feedback/events", get(feedback::events))
        .route(
            "/upload",
            post(documents::upload).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/reingest", post(documents::reingest))
        .route("/reinforce", post(documents::reinforce))
        .route("/documents", get(documents::list_documents))
        .route("/info", get(info))
}

/// API info endpoint
async fn info(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let providers = state.providers();
    let indexed_chunks = if state.is_ready() {
        Some(providers.index.len().await?)
    } else {
        None
    };

    Ok(Json(serde_json::json!({
        "name": "docqa",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Document Q&A with per-query relevance feedback",
        "ready": state.is_ready(),
        "indexed_chunks": indexed_chunks,
        "providers": {
            "documents": providers.documents.name(),
            "index": providers.index.name(),
            "embedder": providers.embedder.model(),
            "llm": providers.llm.model(),
        },
        "feedback_log": state.feedback_location(),
        "endpoints": {
            "POST /api/query": "Ask a question; previously rejected documents are left out",
            "POST /api/feedback": "Record yes/no ratings for the documents shown for a query",
            "GET /api/feedback/stats": "Feedback totals and conflicts",
            "GET /api/feedback/orphans": "Feedback pointing at documents no longer indexed",
            "GET /api/feedback/events": "Every rating as submitted, oldest first",
            "POST /api/upload": "Upload documents (multipart) and rebuild the index",
            "POST /api/reingest": "Rebuild the index from all stored documents",
            "POST /api/reinforce": "Attach accepted queries to their documents in the index",
            "GET /api/documents": "List stored documents"
        }
    })))
}
