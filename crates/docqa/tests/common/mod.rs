//! Fake providers shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use docqa::providers::{
    EmbeddingProvider, IndexManifest, IndexState, LlmProvider, LocalDocumentStore,
    VectorIndexProvider, VectorMatch,
};
use docqa::types::{Chunk, DocumentId, FileType, RetrievedDocument};
use docqa::{DocQaService, Error, FeedbackStore, Providers, RagConfig, Result};

pub const FAKE_MODEL: &str = "fake-embed";
pub const FAKE_DIMS: usize = 4;

/// Returns the same vector for every text, or fails when told to
#[derive(Default)]
pub struct FakeEmbedder {
    fail: AtomicBool,
}

impl FakeEmbedder {
    pub fn failing() -> Self {
        Self {
            fail: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::embedding("embedding service unreachable"));
        }
        Ok(vec![1.0; FAKE_DIMS])
    }

    fn dimensions(&self) -> usize {
        FAKE_DIMS
    }

    fn model(&self) -> &str {
        FAKE_MODEL
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Letter-frequency vectors, for tests that run a real rebuild
pub struct LetterEmbedder;

#[async_trait]
impl EmbeddingProvider for LetterEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0; 26];
        for c in text.to_ascii_lowercase().bytes().filter(u8::is_ascii_lowercase) {
            v[(c - b'a') as usize] += 1.0;
        }
        Ok(v)
    }

    fn dimensions(&self) -> usize {
        26
    }

    fn model(&self) -> &str {
        "letters"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "letters"
    }
}

/// Index that returns a fixed ranking regardless of the query vector
pub struct ScriptedIndex {
    chunks: RwLock<Vec<Chunk>>,
    missing: bool,
    broken_ids: bool,
}

impl ScriptedIndex {
    /// `count` chunks of `source`, ranked by ascending chunk index
    pub fn ranked(source: &str, count: u32) -> Self {
        let chunks = (0..count)
            .map(|i| {
                Chunk::new(
                    DocumentId::new(source, i),
                    format!("{} chunk {}", source, i),
                    Some(i + 1),
                    FileType::Pdf,
                )
            })
            .collect();
        Self {
            chunks: RwLock::new(chunks),
            missing: false,
            broken_ids: false,
        }
    }

    /// Report no stored index on open, so startup has to build one
    pub fn missing_on_open(mut self) -> Self {
        self.missing = true;
        self
    }

    /// Fail every identifier listing
    pub fn with_broken_ids(mut self) -> Self {
        self.broken_ids = true;
        self
    }
}

#[async_trait]
impl VectorIndexProvider for ScriptedIndex {
    async fn open(&self) -> Result<IndexState> {
        if self.missing {
            return Ok(IndexState::Missing("nothing stored".to_string()));
        }
        Ok(IndexState::Ready(IndexManifest {
            model: FAKE_MODEL.to_string(),
            dimensions: FAKE_DIMS,
            chunks: self.chunks.read().len(),
            built_at: Utc::now(),
            reinforcements: 0,
        }))
    }

    async fn replace_all(
        &self,
        chunks: Vec<Chunk>,
        _embeddings: Vec<Vec<f32>>,
        model: &str,
    ) -> Result<IndexManifest> {
        let count = chunks.len();
        *self.chunks.write() = chunks;
        Ok(IndexManifest {
            model: model.to_string(),
            dimensions: FAKE_DIMS,
            chunks: count,
            built_at: Utc::now(),
            reinforcements: 0,
        })
    }

    async fn search(&self, _query_embedding: &[f32], top_k: usize) -> Result<Vec<VectorMatch>> {
        let chunks = self.chunks.read();
        Ok(chunks
            .iter()
            .take(top_k)
            .enumerate()
            .map(|(rank, chunk)| VectorMatch {
                chunk: chunk.clone(),
                similarity: 1.0 - rank as f32 * 0.1,
            })
            .collect())
    }

    async fn ids(&self) -> Result<HashSet<DocumentId>> {
        if self.broken_ids {
            return Err(Error::index_unavailable("identifier listing failed"));
        }
        Ok(self.chunks.read().iter().map(|c| c.id.clone()).collect())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.chunks.read().len())
    }

    fn is_loaded(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Answer generator that counts calls and cites the first source
#[derive(Default)]
pub struct FakeLlm {
    calls: AtomicUsize,
    fail: AtomicBool,
    delay: Option<Duration>,
}

impl FakeLlm {
    pub fn failing() -> Self {
        Self {
            fail: AtomicBool::new(true),
            ..Default::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for FakeLlm {
    async fn generate_answer(&self, question: &str, context: &[RetrievedDocument]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::llm("model not loaded"));
        }
        Ok(format!(
            "Based on {} sources, {} is covered in [1].",
            context.len(),
            question
        ))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "fake"
    }

    fn model(&self) -> &str {
        "fake-llm"
    }
}

/// Config rooted in `dir`, sized for the fake embedder
pub fn test_config(dir: &Path) -> RagConfig {
    let mut config = RagConfig::default();
    config.paths = docqa::config::PathsConfig::under(dir.to_path_buf());
    config.embeddings.dimensions = FAKE_DIMS;
    config.chunking.min_chunk_size = 1;
    config
}

/// Service over the given fakes with a file-backed feedback log in `dir`
pub fn service_with(
    config: RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndexProvider>,
    llm: Arc<dyn LlmProvider>,
) -> DocQaService {
    let documents = Arc::new(
        LocalDocumentStore::new(config.paths.documents_dir.clone()).expect("document store"),
    );
    let feedback = FeedbackStore::open_file(&config.paths.feedback_log, config.feedback.conflict_policy)
        .expect("feedback log");
    let providers = Providers {
        documents,
        embedder,
        index,
        llm,
    };
    DocQaService::with_providers(config, providers, feedback)
}
