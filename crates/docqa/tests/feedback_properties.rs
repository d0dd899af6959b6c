//! Property tests for the feedback filter and the merge rule

use proptest::prelude::*;
use std::collections::BTreeSet;

use docqa::feedback::{filter, FeedbackBatch, FeedbackLog};
use docqa::{ConflictPolicy, DocumentId, RetrievedDocument};

fn doc(id: &DocumentId) -> RetrievedDocument {
    RetrievedDocument {
        id: id.clone(),
        content: format!("text of {}", id),
        source: id.source().to_string(),
        page: None,
        similarity: 0.5,
    }
}

fn doc_id() -> impl Strategy<Value = DocumentId> {
    (0u8..4, 0u32..8).prop_map(|(f, i)| DocumentId::new(format!("file{}.pdf", f), i))
}

/// One submission: each rated id gets exactly one verdict
fn submission() -> impl Strategy<Value = Vec<(DocumentId, bool)>> {
    prop::collection::btree_map(doc_id(), any::<bool>(), 0..8)
        .prop_map(|ratings| ratings.into_iter().collect())
}

fn to_batch(query: &str, ratings: &[(DocumentId, bool)]) -> FeedbackBatch {
    let mut batch = FeedbackBatch::new(query);
    for (id, accepted) in ratings {
        if *accepted {
            batch.accepted.insert(id.clone());
        } else {
            batch.rejected.insert(id.clone());
        }
    }
    batch
}

proptest! {
    #[test]
    fn prop_filter_output_is_subsequence(
        results in prop::collection::vec(doc_id(), 0..20),
        rejected in prop::collection::btree_set(doc_id(), 0..10),
    ) {
        let mut log = FeedbackLog::new();
        log.merge(
            &FeedbackBatch { query: "q".to_string(), accepted: BTreeSet::new(), rejected: rejected.clone() },
            ConflictPolicy::Retain,
        );

        let docs: Vec<RetrievedDocument> = results.iter().map(doc).collect();
        let kept = filter(docs, "q", &log);

        let expected: Vec<&DocumentId> = results.iter().filter(|id| !rejected.contains(*id)).collect();
        let actual: Vec<&DocumentId> = kept.iter().map(|d| &d.id).collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn prop_single_submission_never_conflicts(ratings in submission()) {
        let mut log = FeedbackLog::new();
        let outcome = log.merge(&to_batch("q", &ratings), ConflictPolicy::Retain);
        prop_assert!(outcome.conflicts.is_empty());
        prop_assert_eq!(log.stats().conflicts, 0);
    }

    #[test]
    fn prop_merge_is_idempotent(ratings in submission()) {
        let batch = to_batch("q", &ratings);
        let mut log = FeedbackLog::new();
        log.merge(&batch, ConflictPolicy::Retain);
        let once = log.clone();

        let outcome = log.merge(&batch, ConflictPolicy::Retain);
        prop_assert!(!outcome.changed());
        prop_assert_eq!(log, once);
    }

    #[test]
    fn prop_retain_conflicts_are_detected(sessions in prop::collection::vec(submission(), 1..6)) {
        let mut log = FeedbackLog::new();
        for ratings in &sessions {
            log.merge(&to_batch("q", ratings), ConflictPolicy::Retain);
        }

        // Every id ever given both verdicts sits in both sets and is counted
        let mut accepted = BTreeSet::new();
        let mut rejected = BTreeSet::new();
        for (id, yes) in sessions.iter().flatten() {
            if *yes { accepted.insert(id.clone()); } else { rejected.insert(id.clone()); }
        }
        let both: BTreeSet<_> = accepted.intersection(&rejected).cloned().collect();

        prop_assert_eq!(log.stats().conflicts, both.len());
        for id in &both {
            prop_assert!(log.is_rejected("q", id));
        }
    }

    #[test]
    fn prop_latest_wins_has_no_conflicts(sessions in prop::collection::vec(submission(), 1..6)) {
        let mut log = FeedbackLog::new();
        let mut last = std::collections::BTreeMap::new();
        for ratings in &sessions {
            let outcome = log.merge(&to_batch("q", ratings), ConflictPolicy::LatestWins);
            prop_assert!(outcome.conflicts.is_empty());
            for (id, yes) in ratings {
                last.insert(id.clone(), *yes);
            }
        }

        prop_assert_eq!(log.stats().conflicts, 0);
        for (id, yes) in &last {
            prop_assert_eq!(log.is_rejected("q", id), !*yes);
        }
    }
}
