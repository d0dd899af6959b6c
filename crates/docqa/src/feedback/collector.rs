//! Per-query rating session over the documents that were shown

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::types::{DocumentId, RetrievedDocument, SourceView};

use super::journal::FeedbackEvent;
use super::log::{FeedbackBatch, MergeOutcome};
use super::store::FeedbackStore;

/// Verdict on one shown document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rating {
    /// No verdict; nothing is recorded
    #[default]
    #[serde(rename = "unrated", alias = "none")]
    Unrated,
    /// Relevant
    #[serde(rename = "yes", alias = "accepted")]
    Accepted,
    /// Not relevant; suppressed for this query from now on
    #[serde(rename = "no", alias = "rejected")]
    Rejected,
}

/// Ratings for the documents of one rendered result set
#[derive(Debug, Clone)]
pub struct FeedbackCollector {
    query: String,
    ratings: Vec<(DocumentId, Rating)>,
    pages: HashMap<DocumentId, u32>,
}

impl FeedbackCollector {
    /// Start a session for the documents shown for `query`, all unrated
    pub fn new(query: impl Into<String>, shown: &[RetrievedDocument]) -> Self {
        let mut collector = Self::for_ids(query, shown.iter().map(|d| d.id.clone()));
        collector.pages = shown
            .iter()
            .filter_map(|d| d.page.map(|page| (d.id.clone(), page)))
            .collect();
        collector
    }

    /// Start a session for the sources listed under an answer
    pub fn for_sources(query: impl Into<String>, shown: &[SourceView]) -> Self {
        let mut collector = Self::for_ids(query, shown.iter().map(|s| s.id.clone()));
        collector.pages = shown
            .iter()
            .filter_map(|s| s.page.map(|page| (s.id.clone(), page)))
            .collect();
        collector
    }

    /// Start a session from bare identifiers
    pub fn for_ids(query: impl Into<String>, shown: impl IntoIterator<Item = DocumentId>) -> Self {
        let mut ratings: Vec<(DocumentId, Rating)> = Vec::new();
        for id in shown {
            if !ratings.iter().any(|(existing, _)| existing == &id) {
                ratings.push((id, Rating::Unrated));
            }
        }
        Self {
            query: query.into(),
            ratings,
            pages: HashMap::new(),
        }
    }

    /// Query text the ratings apply to
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Set the verdict for a shown document. The last rating wins.
    pub fn rate(&mut self, id: &DocumentId, rating: Rating) -> Result<()> {
        let slot = self
            .ratings
            .iter_mut()
            .find(|(shown, _)| shown == id)
            .ok_or_else(|| Error::UnknownDocument(id.to_string()))?;
        slot.1 = rating;
        Ok(())
    }

    /// Current verdict for a document, if it was shown
    pub fn rating(&self, id: &DocumentId) -> Option<Rating> {
        self.ratings
            .iter()
            .find(|(shown, _)| shown == id)
            .map(|(_, rating)| *rating)
    }

    /// Shown documents with their verdicts, in display order
    pub fn ratings(&self) -> &[(DocumentId, Rating)] {
        &self.ratings
    }

    /// Rated documents grouped into a batch; unrated ones are left out
    pub fn batch(&self) -> FeedbackBatch {
        let mut batch = FeedbackBatch::new(self.query.clone());
        for (id, rating) in &self.ratings {
            match rating {
                Rating::Accepted => {
                    batch.accepted.insert(id.clone());
                }
                Rating::Rejected => {
                    batch.rejected.insert(id.clone());
                }
                Rating::Unrated => {}
            }
        }
        batch
    }

    /// Journal entries for the rated documents, all stamped `at`
    pub fn events(&self, at: DateTime<Utc>) -> Vec<FeedbackEvent> {
        self.ratings
            .iter()
            .filter(|(_, rating)| *rating != Rating::Unrated)
            .map(|(id, rating)| FeedbackEvent {
                timestamp: at,
                query: self.query.clone(),
                document_id: id.clone(),
                source: id.source().to_string(),
                page: self.pages.get(id).copied(),
                verdict: *rating,
            })
            .collect()
    }

    /// Merge the ratings into the store and persist them
    pub fn submit(self, store: &mut FeedbackStore) -> Result<MergeOutcome> {
        store.submit(&self.batch())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::{ConflictPolicy, MemoryRepository};

    fn ids() -> Vec<DocumentId> {
        vec![
            DocumentId::new("finance.pdf", 3),
            DocumentId::new("finance.pdf", 4),
            DocumentId::new("memo.txt", 0),
        ]
    }

    #[test]
    fn test_batch_groups_ratings() {
        let mut collector = FeedbackCollector::for_ids("budget 2023", ids());
        collector.rate(&ids()[0], Rating::Rejected).unwrap();
        collector.rate(&ids()[1], Rating::Accepted).unwrap();

        let batch = collector.batch();
        assert_eq!(batch.query, "budget 2023");
        assert_eq!(batch.rejected.len(), 1);
        assert!(batch.accepted.contains(&ids()[1]));
        assert!(!batch.accepted.contains(&ids()[2]));
        assert!(!batch.rejected.contains(&ids()[2]));
    }

    #[test]
    fn test_last_rating_wins() {
        let mut collector = FeedbackCollector::for_ids("q", ids());
        collector.rate(&ids()[0], Rating::Rejected).unwrap();
        collector.rate(&ids()[0], Rating::Accepted).unwrap();

        let batch = collector.batch();
        assert!(batch.accepted.contains(&ids()[0]));
        assert!(batch.rejected.is_empty());
    }

    #[test]
    fn test_rating_unknown_document_fails() {
        let mut collector = FeedbackCollector::for_ids("q", ids());
        let err = collector
            .rate(&DocumentId::new("other.pdf", 9), Rating::Rejected)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownDocument(id) if id == "other.pdf::9"));
    }

    #[test]
    fn test_all_unrated_submits_nothing() {
        let collector = FeedbackCollector::for_ids("q", ids());
        let mut store = FeedbackStore::open(MemoryRepository::new(), ConflictPolicy::Retain).unwrap();

        let outcome = collector.submit(&mut store).unwrap();
        assert!(!outcome.changed());
        assert!(store.log().is_empty());
    }

    #[test]
    fn test_events_cover_rated_documents_only() {
        let shown = vec![
            RetrievedDocument {
                id: ids()[0].clone(),
                content: "Q3 budget".to_string(),
                source: "finance.pdf".to_string(),
                page: Some(7),
                similarity: 0.9,
            },
            RetrievedDocument {
                id: ids()[2].clone(),
                content: "memo".to_string(),
                source: "memo.txt".to_string(),
                page: None,
                similarity: 0.5,
            },
        ];
        let mut collector = FeedbackCollector::new("budget 2023", &shown);
        collector.rate(&ids()[0], Rating::Rejected).unwrap();

        let at = Utc::now();
        let events = collector.events(at);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].document_id, ids()[0]);
        assert_eq!(events[0].source, "finance.pdf");
        assert_eq!(events[0].page, Some(7));
        assert_eq!(events[0].verdict, Rating::Rejected);
        assert_eq!(events[0].timestamp, at);
    }

    #[test]
    fn test_rating_serde_names() {
        assert_eq!(serde_json::to_string(&Rating::Rejected).unwrap(), "\"no\"");
        assert_eq!(serde_json::from_str::<Rating>("\"accepted\"").unwrap(), Rating::Accepted);
        assert_eq!(serde_json::from_str::<Rating>("\"unrated\"").unwrap(), Rating::Unrated);
    }
}
