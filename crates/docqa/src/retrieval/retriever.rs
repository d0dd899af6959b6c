//! Embed a query and search the index within a bounded wait

use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, VectorIndexProvider};
use crate::types::RetrievedDocument;

/// Ordered candidate retrieval for one query
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndexProvider>,
    timeout: Duration,
}

impl Retriever {
    /// Create a retriever; `timeout` bounds embedding plus search
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndexProvider>,
        timeout: Duration,
    ) -> Self {
        Self {
            embedder,
            index,
            timeout,
        }
    }

    /// Top `top_k` documents for `query`, most similar first
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedDocument>> {
        let search = async {
            let embedding = self.embedder.embed(query).await?;
            self.index.search(&embedding, top_k).await
        };

        let matches = tokio::time::timeout(self.timeout, search)
            .await
            .map_err(|_| Error::Timeout {
                operation: "retrieval",
                secs: self.timeout.as_secs(),
            })??;

        tracing::debug!("Retrieved {} candidates for {:?}", matches.len(), query);

        Ok(matches
            .into_iter()
            .map(|m| RetrievedDocument::from_chunk(m.chunk, m.similarity))
            .collect())
    }
}
