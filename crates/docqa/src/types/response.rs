//! Response types

use serde::{Deserialize, Serialize};

use super::document::{DocumentId, RetrievedDocument};
use crate::feedback::OrphanedFeedback;

/// How a query was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    /// Documents were found (the answer itself may still have failed)
    Answered,
    /// Retrieval returned nothing, or failed
    NoResults,
    /// Every retrieved document was previously rejected for this query
    NoRelevantDocuments,
}

/// A source shown under the answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceView {
    pub id: DocumentId,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    pub similarity: f32,
    pub content: String,
}

impl From<&RetrievedDocument> for SourceView {
    fn from(doc: &RetrievedDocument) -> Self {
        Self {
            id: doc.id.clone(),
            source: doc.source.clone(),
            page: doc.page,
            similarity: doc.similarity,
            content: doc.content.clone(),
        }
    }
}

/// Result of one question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Query text as received
    pub query: String,
    pub status: QueryStatus,
    /// Generated answer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    /// Why no answer was generated even though sources were found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_error: Option<String>,
    /// Sources referenced by `[n]` markers in the answer
    #[serde(default)]
    pub cited: Vec<DocumentId>,
    /// Documents shown, in retrieval order, after feedback filtering
    #[serde(default)]
    pub sources: Vec<SourceView>,
    /// Number of documents removed by earlier feedback
    #[serde(default)]
    pub suppressed: usize,
    /// Recovered failures worth telling the user about
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl QueryResponse {
    /// Response with no sources and no answer
    pub fn empty(query: impl Into<String>, status: QueryStatus) -> Self {
        Self {
            query: query.into(),
            status,
            answer: None,
            answer_error: None,
            cited: Vec::new(),
            sources: Vec::new(),
            suppressed: 0,
            warnings: Vec::new(),
        }
    }

    /// Identifiers of the shown sources, for a later feedback submission
    pub fn shown_ids(&self) -> Vec<DocumentId> {
        self.sources.iter().map(|s| s.id.clone()).collect()
    }
}

/// Result of a feedback submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub query: String,
    pub newly_accepted: usize,
    pub newly_rejected: usize,
    /// Documents now both accepted and rejected for this query
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<DocumentId>,
}

/// Result of a full index rebuild
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReingestSummary {
    /// Files parsed and indexed
    pub documents: usize,
    /// Chunks in the new index
    pub chunks: usize,
    /// Files with an unrecognized extension
    pub skipped: usize,
    /// Files that could not be parsed, with the reason
    #[serde(default)]
    pub failed: Vec<(String, String)>,
    /// Feedback identifiers that no longer exist in the index
    #[serde(default)]
    pub orphans: Vec<OrphanedFeedback>,
    pub duration_ms: u64,
}

/// Result of teaching the index the accepted feedback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReinforceSummary {
    /// Queries with at least one usable accepted document
    pub queries: usize,
    /// Query vectors now attached to indexed chunks
    pub reinforcements: usize,
    /// Accepted documents left out (also rejected, or no longer indexed)
    pub skipped: usize,
    pub duration_ms: u64,
}

/// One stored upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    pub filename: String,
    pub size: usize,
}

/// Result of an upload (files stored, then a rebuild)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub files: Vec<UploadedFile>,
    pub reingest: ReingestSummary,
}
