//! Relevance feedback: the persistent log, its store, the rating journal,
//! the retrieval filter and the per-query rating collector

mod collector;
mod filter;
mod journal;
mod log;
pub mod store;

pub use collector::{FeedbackCollector, Rating};
pub use filter::{filter, filter_with_report, Filtered};
pub use journal::{FeedbackEvent, FeedbackJournal};
pub use log::{
    ConflictPolicy, FeedbackBatch, FeedbackEntry, FeedbackLog, FeedbackStats, MergeOutcome,
    OrphanedFeedback,
};
pub use store::{
    FeedbackRepository, FeedbackStore, JsonFileRepository, LoadedLog, MemoryRepository, Revision,
};
