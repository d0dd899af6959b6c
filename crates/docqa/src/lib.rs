//! docqa: document Q&A with per-query relevance feedback
//!
//! Documents are parsed, chunked and embedded into a vector index. A question
//! retrieves the closest chunks, drops any chunk a user already rejected for
//! that exact question, and asks an LLM for an answer grounded in what is
//! left. Yes/no ratings on the shown sources are merged into a persistent
//! feedback log.

pub mod config;
pub mod error;
pub mod feedback;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod service;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use feedback::{ConflictPolicy, FeedbackCollector, FeedbackLog, FeedbackStore, Rating};
pub use service::{DocQaService, Providers};
pub use types::{
    Chunk, DocumentId, FileType, QueryRequest, QueryResponse, QueryStatus, RetrievedDocument,
};
