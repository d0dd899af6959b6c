//! Drop previously rejected documents from a retrieval result

use serde::Serialize;

use crate::types::RetrievedDocument;

use super::log::FeedbackLog;

/// Retrieval results split by prior feedback
#[derive(Debug, Clone, Default, Serialize)]
pub struct Filtered {
    /// Documents not rejected for this query, in retrieval order
    pub kept: Vec<RetrievedDocument>,
    /// Number of documents removed
    pub suppressed: usize,
}

impl Filtered {
    /// Retrieval returned documents but every one of them was rejected
    pub fn is_exhausted(&self) -> bool {
        self.kept.is_empty() && self.suppressed > 0
    }
}

/// Remove documents rejected for exactly this query, keeping order.
///
/// Lookup is by exact query text. Accepted documents are not promoted.
pub fn filter(docs: Vec<RetrievedDocument>, query: &str, log: &FeedbackLog) -> Vec<RetrievedDocument> {
    filter_with_report(docs, query, log).kept
}

/// Like [`filter`], also reporting how many documents were removed
pub fn filter_with_report(
    mut docs: Vec<RetrievedDocument>,
    query: &str,
    log: &FeedbackLog,
) -> Filtered {
    let Some(rejected) = log.rejected(query).filter(|set| !set.is_empty()) else {
        return Filtered {
            kept: docs,
            suppressed: 0,
        };
    };

    let before = docs.len();
    docs.retain(|doc| !rejected.contains(&doc.id));
    let suppressed = before - docs.len();

    if suppressed > 0 {
        tracing::debug!("Suppressed {} previously rejected document(s) for {:?}", suppressed, query);
    }

    Filtered {
        kept: docs,
        suppressed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::{ConflictPolicy, FeedbackBatch};
    use crate::types::{Chunk, DocumentId, FileType};

    fn doc(source: &str, index: u32, similarity: f32) -> RetrievedDocument {
        RetrievedDocument::from_chunk(
            Chunk::new(
                DocumentId::new(source, index),
                format!("{} chunk {}", source, index),
                Some(index + 1),
                FileType::Pdf,
            ),
            similarity,
        )
    }

    fn log_with(query: &str, accepted: &[DocumentId], rejected: &[DocumentId]) -> FeedbackLog {
        let mut log = FeedbackLog::new();
        log.merge(
            &FeedbackBatch {
                query: query.to_string(),
                accepted: accepted.iter().cloned().collect(),
                rejected: rejected.iter().cloned().collect(),
            },
            ConflictPolicy::Retain,
        );
        log
    }

    #[test]
    fn test_unrated_query_passes_through() {
        let docs = vec![doc("a.pdf", 0, 0.9), doc("b.pdf", 1, 0.8)];
        let result = filter_with_report(docs.clone(), "q", &FeedbackLog::new());
        assert_eq!(result.kept, docs);
        assert_eq!(result.suppressed, 0);
    }

    #[test]
    fn test_cost_analysis_keeps_order() {
        let docs = vec![
            doc("a.pdf", 0, 0.95),
            doc("c.pdf", 1, 0.9),
            doc("b.pdf", 2, 0.85),
            doc("d.pdf", 4, 0.8),
            doc("a.pdf", 3, 0.7),
        ];
        let log = log_with(
            "cost analysis",
            &[],
            &[DocumentId::new("a.pdf", 0), DocumentId::new("b.pdf", 2)],
        );

        let kept = filter(docs, "cost analysis", &log);
        let ids: Vec<String> = kept.iter().map(|d| d.id.to_string()).collect();
        assert_eq!(ids, vec!["c.pdf::1", "d.pdf::4", "a.pdf::3"]);
    }

    #[test]
    fn test_other_query_is_unaffected() {
        let docs = vec![doc("y.pdf", 2, 0.8)];
        let log = log_with("cost analysis", &[], &[DocumentId::new("y.pdf", 2)]);
        assert_eq!(filter(docs, "Cost Analysis", &log).len(), 1);
    }

    #[test]
    fn test_accepted_documents_are_not_pinned() {
        let docs = vec![doc("a.pdf", 0, 0.9)];
        let log = log_with("q", &[DocumentId::new("b.pdf", 5)], &[]);

        let kept = filter(docs, "q", &log);
        assert_eq!(kept.len(), 1);
        assert!(kept.iter().all(|d| d.id != DocumentId::new("b.pdf", 5)));
    }

    #[test]
    fn test_all_rejected_is_exhausted() {
        let docs = vec![doc("a.pdf", 0, 0.9), doc("a.pdf", 1, 0.8)];
        let log = log_with(
            "q",
            &[],
            &[DocumentId::new("a.pdf", 0), DocumentId::new("a.pdf", 1)],
        );

        let result = filter_with_report(docs, "q", &log);
        assert!(result.is_exhausted());
        assert_eq!(result.suppressed, 2);

        let empty = filter_with_report(Vec::new(), "q", &log);
        assert!(!empty.is_exhausted());
    }

    #[test]
    fn test_conflicted_document_stays_suppressed() {
        let id = DocumentId::new("a.pdf", 0);
        let log = log_with("q", &[id.clone()], &[id]);
        assert!(filter(vec![doc("a.pdf", 0, 0.9)], "q", &log).is_empty());
    }
}
