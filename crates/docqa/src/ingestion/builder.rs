//! Full index rebuild from the document store

use std::sync::Arc;
use std::time::Instant;

use crate::config::{IngestionConfig, RagConfig};
use crate::error::{Error, Result};
use crate::providers::{
    DocumentStoreProvider, EmbeddingProvider, IndexManifest, IndexState, VectorIndexProvider,
};
use crate::types::Chunk;

use super::chunker::TextChunker;
use super::parser::FileParser;

/// Outcome of one rebuild
#[derive(Debug, Clone)]
pub struct BuildSummary {
    /// Files parsed and indexed
    pub documents: usize,
    /// Chunks in the new index
    pub chunks: usize,
    /// Files with an unrecognized extension
    pub skipped: usize,
    /// Files that could not be read or parsed
    pub failed: Vec<(String, String)>,
    /// Manifest of the new index
    pub manifest: IndexManifest,
    /// Wall time of the rebuild
    pub duration_ms: u64,
}

/// Walks the document store, parses, chunks, embeds and replaces the index
pub struct IndexBuilder {
    documents: Arc<dyn DocumentStoreProvider>,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndexProvider>,
    chunker: TextChunker,
    ingestion: IngestionConfig,
    batch_size: usize,
    dimensions: usize,
}

impl IndexBuilder {
    /// Create a builder over the given providers
    pub fn new(
        config: &RagConfig,
        documents: Arc<dyn DocumentStoreProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndexProvider>,
    ) -> Self {
        Self {
            documents,
            embedder,
            index,
            chunker: TextChunker::from_config(&config.chunking),
            ingestion: config.ingestion.clone(),
            batch_size: config.embeddings.batch_size.max(1),
            dimensions: config.embeddings.dimensions,
        }
    }

    /// Parse and chunk one file
    pub async fn ingest_file(&self, name: &str, data: Vec<u8>) -> Result<Vec<Chunk>> {
        let filename = name.to_string();
        let parsed = tokio::task::spawn_blocking(move || FileParser::parse(&filename, &data))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))??;

        Ok(self.chunker.chunk_document(name, &parsed))
    }

    /// Rebuild the whole index from every recognized file in the document store
    pub async fn rebuild(&self) -> Result<BuildSummary> {
        let started = Instant::now();
        let stored = self.documents.list_documents().await?;
        tracing::info!("Rebuilding index from {} file(s)", stored.len());

        let mut chunks: Vec<Chunk> = Vec::new();
        let mut documents = 0;
        let mut skipped = 0;
        let mut failed = Vec::new();

        for doc in stored {
            if !self.ingestion.accepts(&doc.name) {
                tracing::debug!("Skipping {} (unrecognized extension)", doc.name);
                skipped += 1;
                continue;
            }

            let result = match self.documents.get_document(&doc.name).await {
                Ok(data) => self.ingest_file(&doc.name, data).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(doc_chunks) => {
                    tracing::debug!("{}: {} chunks", doc.name, doc_chunks.len());
                    documents += 1;
                    chunks.extend(doc_chunks);
                }
                Err(e) => {
                    tracing::warn!("Failed to ingest {}: {}", doc.name, e);
                    failed.push((doc.name, e.to_string()));
                }
            }
        }

        let embeddings = self.embed_all(&chunks).await?;
        let manifest = self
            .index
            .replace_all(chunks, embeddings, self.embedder.model())
            .await?;

        let summary = BuildSummary {
            documents,
            chunks: manifest.chunks,
            skipped,
            failed,
            manifest,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        tracing::info!(
            "Index rebuilt: {} documents, {} chunks, {} skipped, {} failed in {}ms",
            summary.documents,
            summary.chunks,
            summary.skipped,
            summary.failed.len(),
            summary.duration_ms
        );
        Ok(summary)
    }

    async fn embed_all(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;
            if vectors.len() != texts.len() {
                return Err(Error::embedding(format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    vectors.len()
                )));
            }
            if let Some(v) = vectors.iter().find(|v| v.len() != self.dimensions) {
                return Err(Error::embedding(format!(
                    "model {} returned {} dimensions, configured {}",
                    self.embedder.model(),
                    v.len(),
                    self.dimensions
                )));
            }
            embeddings.extend(vectors);
        }

        Ok(embeddings)
    }

    /// Load the persisted index, rebuilding it when it is absent, unreadable,
    /// or built with different embedding settings.
    ///
    /// Returns the rebuild summary when a rebuild happened. A failed rebuild
    /// is [`Error::IndexUnavailable`].
    pub async fn ensure_ready(&self) -> Result<Option<BuildSummary>> {
        match self.index.open().await? {
            IndexState::Ready(manifest) => {
                match manifest.mismatch(self.embedder.model(), self.dimensions) {
                    None => return Ok(None),
                    Some(reason) => tracing::warn!("Rebuilding vector index: {}", reason),
                }
            }
            IndexState::Missing(reason) => {
                tracing::info!("Building vector index before serving queries ({})", reason);
            }
        }

        self.rebuild()
            .await
            .map(Some)
            .map_err(|e| Error::index_unavailable(format!("index build failed: {}", e)))
    }
}
