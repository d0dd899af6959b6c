//! Document store provider trait for raw source files

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

/// Metadata about a stored document
#[derive(Debug, Clone, Serialize)]
pub struct StoredDocumentInfo {
    /// Path relative to the store root, `/`-separated; the source part of every chunk id
    pub name: String,
    /// Storage URI (file path)
    pub uri: String,
    /// Size in bytes
    pub size: u64,
}

/// Trait for document storage
#[async_trait]
pub trait DocumentStoreProvider: Send + Sync {
    /// Store a document under `filename`, replacing any file of that name
    async fn store_document(&self, filename: &str, data: &[u8]) -> Result<StoredDocumentInfo>;

    /// Retrieve document data by relative name
    async fn get_document(&self, name: &str) -> Result<Vec<u8>>;

    /// List all stored documents, sorted by name
    async fn list_documents(&self) -> Result<Vec<StoredDocumentInfo>>;

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
