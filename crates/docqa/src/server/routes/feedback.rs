//! Feedback endpoints

use axum::{extract::State, Json};

use crate::error::Result;
use crate::feedback::{FeedbackEvent, FeedbackStats, OrphanedFeedback};
use crate::server::state::AppState;
use crate::types::{FeedbackRequest, FeedbackResponse};

/// POST /api/feedback - Record ratings for one rendered result set
pub async fn submit_feedback(
    State(state): State<AppState>,
    Json(request): Json<FeedbackRequest>,
) -> Result<Json<FeedbackResponse>> {
    let response = state.submit_feedback(&request).await?;
    Ok(Json(response))
}

/// GET /api/feedback/stats
pub async fn stats(State(state): State<AppState>) -> Json<FeedbackStats> {
    Json(state.feedback_stats())
}

/// GET /api/feedback/orphans
pub async fn orphans(State(state): State<AppState>) -> Result<Json<Vec<OrphanedFeedback>>> {
    Ok(Json(state.orphaned_feedback().await?))
}

/// GET /api/feedback/events - Journaled ratings, oldest first
pub async fn events(State(state): State<AppState>) -> Result<Json<Vec<FeedbackEvent>>> {
    Ok(Json(state.feedback_events().await?))
}
