//! Upload, re-ingest, reinforcement and document listing endpoints

use axum::{
    extract::{Multipart, State},
    Json,
};

use crate::error::{Error, Result};
use crate::providers::StoredDocumentInfo;
use crate::server::state::AppState;
use crate::types::{ReinforceSummary, ReingestSummary, UploadResponse};

/// POST /api/upload - Store uploaded files and rebuild the index
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Internal(format!("Failed to read multipart field: {}", e)))?
    {
        let Some(filename) = field.file_name().map(|s| s.to_string()) else {
            tracing::debug!("Ignoring multipart field without a file name");
            continue;
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::Internal(format!("Failed to read {}: {}", filename, e)))?;

        tracing::info!("Received upload: {} ({} bytes)", filename, data.len());
        files.push((filename, data.to_vec()));
    }

    if files.is_empty() {
        return Err(Error::UnsupportedFileType("no files in upload".to_string()));
    }

    Ok(Json(state.upload(files).await?))
}

/// POST /api/reingest - Rebuild the index from all stored documents
pub async fn reingest(State(state): State<AppState>) -> Result<Json<ReingestSummary>> {
    Ok(Json(state.reingest().await?))
}

/// POST /api/reinforce - Attach accepted feedback queries to the index
pub async fn reinforce(State(state): State<AppState>) -> Result<Json<ReinforceSummary>> {
    Ok(Json(state.reinforce().await?))
}

/// GET /api/documents - List stored documents
pub async fn list_documents(State(state): State<AppState>) -> Result<Json<Vec<StoredDocumentInfo>>> {
    Ok(Json(state.providers().documents.list_documents().await?))
}
