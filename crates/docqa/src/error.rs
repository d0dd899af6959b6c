//! Error types for the document Q&A system

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for docqa operations
pub type Result<T> = std::result::Result<T, Error>;

/// docqa errors
#[derive(Debug, Error)]
pub enum Error {
    /// A required setting or credential is absent. Fatal at startup.
    #[error("Missing configuration: {0}")]
    ConfigurationMissing(String),

    /// Configuration file could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Vector index files are absent, corrupt, or could not be rebuilt
    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),

    /// Retriever call failed
    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Ollama/LLM error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Bounded wait on an external provider expired
    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },

    /// Feedback log could not be written
    #[error("Failed to persist feedback to '{}': {message}", path.display())]
    FeedbackPersistence { path: PathBuf, message: String },

    /// Feedback log exists but is not a valid log
    #[error("Feedback log '{}' is malformed: {message}", path.display())]
    MalformedFeedbackLog { path: PathBuf, message: String },

    /// Rating refers to a document that was not part of the rendered result set
    #[error("Document '{0}' was not shown for this query")]
    UnknownDocument(String),

    /// Identifier string is not `<source>::<index>`
    #[error("Invalid document identifier: {0}")]
    InvalidDocumentId(String),

    /// File parsing error
    #[error("Failed to parse file '{filename}': {message}")]
    FileParse { filename: String, message: String },

    /// Unsupported file type
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Upload larger than `ingestion.max_upload_size`
    #[error("File '{filename}' is {size} bytes, the upload limit is {limit}")]
    UploadTooLarge {
        filename: String,
        size: usize,
        limit: usize,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a file parse error
    pub fn file_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create an index-unavailable error
    pub fn index_unavailable(message: impl Into<String>) -> Self {
        Self::IndexUnavailable(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether retrying the same call later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Timeout { .. }
                | Error::Http(_)
                | Error::Llm(_)
                | Error::Embedding(_)
                | Error::Retrieval(_)
        )
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            Error::ConfigurationMissing(_) => (StatusCode::INTERNAL_SERVER_ERROR, "configuration_missing"),
            Error::Config(_) => (StatusCode::BAD_REQUEST, "config_error"),
            Error::IndexUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "index_unavailable"),
            Error::Retrieval(_) => (StatusCode::BAD_GATEWAY, "retrieval_error"),
            Error::Embedding(_) => (StatusCode::BAD_GATEWAY, "embedding_error"),
            Error::Llm(_) => (StatusCode::SERVICE_UNAVAILABLE, "llm_error"),
            Error::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            Error::FeedbackPersistence { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "feedback_not_saved"),
            Error::MalformedFeedbackLog { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "malformed_feedback_log"),
            Error::UnknownDocument(_) => (StatusCode::BAD_REQUEST, "unknown_document"),
            Error::InvalidDocumentId(_) => (StatusCode::BAD_REQUEST, "invalid_document_id"),
            Error::FileParse { .. } => (StatusCode::BAD_REQUEST, "parse_error"),
            Error::UnsupportedFileType(_) => (StatusCode::BAD_REQUEST, "unsupported_type"),
            Error::UploadTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "upload_too_large"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            Error::Json(_) => (StatusCode::BAD_REQUEST, "json_error"),
            Error::Http(_) => (StatusCode::BAD_GATEWAY, "http_error"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string(),
                "retryable": self.is_retryable(),
            }
        }));

        (status, body).into_response()
    }
}
