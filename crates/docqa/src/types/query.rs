//! Request types

use serde::{Deserialize, Serialize};

use crate::feedback::Rating;

use super::document::DocumentId;

/// Question asked against the indexed documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Query text, used verbatim as the feedback key
    pub question: String,

    /// Number of candidates to retrieve (default: 5)
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    5
}

impl QueryRequest {
    /// Create a new query
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            top_k: default_top_k(),
        }
    }

    /// Set the number of results to retrieve
    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }
}

/// Verdict for one document in a feedback submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingInput {
    pub id: DocumentId,
    pub verdict: Rating,
}

/// Ratings for one rendered result set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRequest {
    /// Exact query text the documents were shown for
    pub query: String,

    /// Per-document verdicts
    #[serde(default)]
    pub ratings: Vec<RatingInput>,

    /// Documents that were shown. When present, ratings for anything else
    /// are rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shown: Option<Vec<DocumentId>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_default_top_k() {
        let request: QueryRequest = serde_json::from_str(r#"{"question": "budget 2023"}"#).unwrap();
        assert_eq!(request.top_k, 5);
    }

    #[test]
    fn test_feedback_request_parses() {
        let request: FeedbackRequest = serde_json::from_str(
            r#"{
                "query": "budget 2023",
                "ratings": [
                    {"id": "finance.pdf::3", "verdict": "no"},
                    {"id": "finance.pdf::4", "verdict": "yes"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(request.ratings.len(), 2);
        assert_eq!(request.ratings[0].verdict, Rating::Rejected);
        assert!(request.shown.is_none());
    }
}
