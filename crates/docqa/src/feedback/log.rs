//! In-memory feedback log and its merge rule

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::types::DocumentId;

/// What a merge does when a document already carries the opposite verdict
/// for the same query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Keep the earlier verdict in its set and add the new one to the other
    /// set. The document then sits in both sets and stays suppressed.
    #[default]
    Retain,
    /// Remove the document from the opposite set before inserting
    LatestWins,
}

/// Accepted and rejected documents for one query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    #[serde(default, alias = "yes")]
    pub accepted: BTreeSet<DocumentId>,
    #[serde(default, alias = "no")]
    pub rejected: BTreeSet<DocumentId>,
}

impl FeedbackEntry {
    /// Documents present in both sets
    pub fn conflicts(&self) -> impl Iterator<Item = &DocumentId> {
        self.accepted.intersection(&self.rejected)
    }

    fn is_empty(&self) -> bool {
        self.accepted.is_empty() && self.rejected.is_empty()
    }
}

/// Verdicts from one submission for one query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackBatch {
    pub query: String,
    pub accepted: BTreeSet<DocumentId>,
    pub rejected: BTreeSet<DocumentId>,
}

impl FeedbackBatch {
    /// Empty batch for a query
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Whether the batch carries any verdict
    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty() && self.rejected.is_empty()
    }
}

/// Result of merging one batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    /// Identifiers added to `accepted`
    pub newly_accepted: usize,
    /// Identifiers added to `rejected`
    pub newly_rejected: usize,
    /// Identifiers removed from the opposite set (`LatestWins` only)
    pub reversed: usize,
    /// Identifiers that ended up in both sets after this merge
    pub conflicts: Vec<DocumentId>,
}

impl MergeOutcome {
    /// Whether the merge changed the log
    pub fn changed(&self) -> bool {
        self.newly_accepted > 0 || self.newly_rejected > 0 || self.reversed > 0
    }
}

/// A feedback identifier that no longer exists in the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanedFeedback {
    pub query: String,
    pub id: DocumentId,
    pub rejected: bool,
}

/// Summary numbers for the whole log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackStats {
    pub queries: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub conflicts: usize,
}

/// Query text (exact match) to feedback entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedbackLog {
    entries: BTreeMap<String, FeedbackEntry>,
}

impl FeedbackLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for a query
    pub fn get(&self, query: &str) -> Option<&FeedbackEntry> {
        self.entries.get(query)
    }

    /// Rejected documents for a query, if the query was ever rated
    pub fn rejected(&self, query: &str) -> Option<&BTreeSet<DocumentId>> {
        self.entries.get(query).map(|e| &e.rejected)
    }

    /// Whether a document was rejected for a query
    pub fn is_rejected(&self, query: &str, id: &DocumentId) -> bool {
        self.rejected(query).map_or(false, |set| set.contains(id))
    }

    /// Number of queries with feedback
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log has no queries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over queries and entries in query order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeedbackEntry)> {
        self.entries.iter().map(|(q, e)| (q.as_str(), e))
    }

    /// Merge a batch with set-union semantics.
    ///
    /// Each identifier is inserted only if absent, so merging the same batch
    /// twice leaves the log unchanged. An empty batch does not create an
    /// entry.
    pub fn merge(&mut self, batch: &FeedbackBatch, policy: ConflictPolicy) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();
        if batch.is_empty() {
            return outcome;
        }

        let entry = self.entries.entry(batch.query.clone()).or_default();

        for id in &batch.accepted {
            if policy == ConflictPolicy::LatestWins && entry.rejected.remove(id) {
                outcome.reversed += 1;
            }
            if entry.accepted.insert(id.clone()) {
                outcome.newly_accepted += 1;
            }
        }

        for id in &batch.rejected {
            if policy == ConflictPolicy::LatestWins && entry.accepted.remove(id) {
                outcome.reversed += 1;
            }
            if entry.rejected.insert(id.clone()) {
                outcome.newly_rejected += 1;
            }
        }

        outcome.conflicts = batch
            .accepted
            .iter()
            .chain(batch.rejected.iter())
            .filter(|id| entry.accepted.contains(*id) && entry.rejected.contains(*id))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if !outcome.conflicts.is_empty() {
            tracing::warn!(
                "{} document(s) now both accepted and rejected for query {:?}: {:?}",
                outcome.conflicts.len(),
                batch.query,
                outcome.conflicts
            );
        }

        outcome
    }

    /// Every (query, id) present in both sets
    pub fn conflicts(&self) -> Vec<(&str, &DocumentId)> {
        self.iter()
            .flat_map(|(query, entry)| entry.conflicts().map(move |id| (query, id)))
            .collect()
    }

    /// Feedback identifiers that are not in `known`
    pub fn orphans(&self, known: &HashSet<DocumentId>) -> Vec<OrphanedFeedback> {
        let mut orphans = Vec::new();
        for (query, entry) in self.iter() {
            for (ids, rejected) in [(&entry.accepted, false), (&entry.rejected, true)] {
                for id in ids.iter().filter(|id| !known.contains(*id)) {
                    orphans.push(OrphanedFeedback {
                        query: query.to_string(),
                        id: id.clone(),
                        rejected,
                    });
                }
            }
        }
        orphans
    }

    /// Counts over the whole log
    pub fn stats(&self) -> FeedbackStats {
        let mut stats = FeedbackStats {
            queries: self.entries.values().filter(|e| !e.is_empty()).count(),
            ..Default::default()
        };
        for entry in self.entries.values() {
            stats.accepted += entry.accepted.len();
            stats.rejected += entry.rejected.len();
            stats.conflicts += entry.conflicts().count();
        }
        stats
    }
}
