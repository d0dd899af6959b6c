//! Core types for the document Q&A system

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, DocumentId, FileType, RetrievedDocument, ID_SEPARATOR};
pub use query::{FeedbackRequest, QueryRequest, RatingInput};
pub use response::{
    FeedbackResponse, QueryResponse, QueryStatus, ReinforceSummary, ReingestSummary, SourceView,
    UploadResponse, UploadedFile,
};
