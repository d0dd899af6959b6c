//! Question endpoint

use axum::{extract::State, Json};
use std::time::Instant;

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{QueryRequest, QueryResponse};

/// POST /api/query - Answer a question from the indexed documents
pub async fn ask(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    let start = Instant::now();
    tracing::info!("Query: \"{}\"", request.question);

    let response = state.ask(&request.question, Some(request.top_k)).await?;

    tracing::info!(
        "Query answered in {}ms: {:?}, {} sources, {} suppressed",
        start.elapsed().as_millis(),
        response.status,
        response.sources.len(),
        response.suppressed
    );
    Ok(Json(response))
}
