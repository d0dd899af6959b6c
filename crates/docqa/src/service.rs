//! One handle for the whole question, feedback and ingestion lifecycle
//!
//! Failure handling for user-facing operations is decided here: retrieval
//! failures become an empty result with a warning, answer failures keep the
//! sources, and persistence failures are returned to the caller.

use chrono::Utc;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::feedback::{
    filter_with_report, FeedbackCollector, FeedbackEvent, FeedbackJournal, FeedbackStats,
    FeedbackStore, MergeOutcome, OrphanedFeedback,
};
use crate::generation::link_citations;
use crate::ingestion::{BuildSummary, IndexBuilder};
use crate::providers::{
    DocumentStoreProvider, EmbeddingProvider, FlatVectorIndex, LlmProvider, LocalDocumentStore,
    OllamaProvider, Reinforcement, VectorIndexProvider,
};
use crate::retrieval::Retriever;
use crate::types::{
    DocumentId, FeedbackRequest, FeedbackResponse, QueryResponse, QueryStatus, ReinforceSummary,
    ReingestSummary, SourceView, UploadResponse, UploadedFile,
};

/// The external collaborators the service drives
#[derive(Clone)]
pub struct Providers {
    pub documents: Arc<dyn DocumentStoreProvider>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub index: Arc<dyn VectorIndexProvider>,
    pub llm: Arc<dyn LlmProvider>,
}

impl Providers {
    /// Filesystem document store, flat index and Ollama for both models
    pub fn local(config: &RagConfig) -> Result<Self> {
        let (embedder, llm) = OllamaProvider::new(&config.llm, config.embeddings.dimensions)?.split();
        Ok(Self {
            documents: Arc::new(LocalDocumentStore::new(config.paths.documents_dir.clone())?),
            embedder: Arc::new(embedder),
            index: Arc::new(FlatVectorIndex::new(config.paths.index_dir.clone())),
            llm: Arc::new(llm),
        })
    }
}

/// Document Q&A service
pub struct DocQaService {
    config: RagConfig,
    providers: Providers,
    retriever: Retriever,
    builder: IndexBuilder,
    feedback: Arc<RwLock<FeedbackStore>>,
    journal: Arc<FeedbackJournal>,
    rebuild_lock: tokio::sync::Mutex<()>,
    ready: AtomicBool,
}

impl DocQaService {
    /// Validate the configuration, create the local providers and load the feedback log
    pub fn from_config(config: RagConfig) -> Result<Self> {
        config.validate()?;
        let providers = Providers::local(&config)?;
        let feedback =
            FeedbackStore::open_file(&config.paths.feedback_log, config.feedback.conflict_policy)?;
        Ok(Self::with_providers(config, providers, feedback))
    }

    /// Assemble a service from explicit parts
    pub fn with_providers(config: RagConfig, providers: Providers, feedback: FeedbackStore) -> Self {
        let retriever = Retriever::new(
            Arc::clone(&providers.embedder),
            Arc::clone(&providers.index),
            Duration::from_secs(config.retrieval.timeout_secs),
        );
        let builder = IndexBuilder::new(
            &config,
            Arc::clone(&providers.documents),
            Arc::clone(&providers.embedder),
            Arc::clone(&providers.index),
        );

        let journal = Arc::new(FeedbackJournal::new(config.paths.feedback_journal.clone()));

        Self {
            config,
            providers,
            retriever,
            builder,
            feedback: Arc::new(RwLock::new(feedback)),
            journal,
            rebuild_lock: tokio::sync::Mutex::new(()),
            ready: AtomicBool::new(false),
        }
    }

    /// Make the index servable, building it first when needed.
    ///
    /// Must complete before [`ask`](Self::ask) is called. A failed build is
    /// [`Error::IndexUnavailable`] and should stop the process.
    pub async fn start(&self) -> Result<Option<ReingestSummary>> {
        let _guard = self.rebuild_lock.lock().await;
        let built = match self.builder.ensure_ready().await? {
            Some(summary) => Some(self.finish_rebuild(summary).await?),
            None => {
                tracing::info!("Vector index ready ({} chunks)", self.providers.index.len().await?);
                None
            }
        };
        self.ready.store(true, Ordering::SeqCst);
        Ok(built)
    }

    /// Whether the index is loaded and queries can be served
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Active configuration
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Providers in use
    pub fn providers(&self) -> &Providers {
        &self.providers
    }

    /// Answer one question: retrieve, drop rejected documents, generate
    pub async fn ask(&self, question: &str, top_k: Option<usize>) -> Result<QueryResponse> {
        if !self.is_ready() {
            return Err(Error::index_unavailable("index is not loaded"));
        }
        let top_k = top_k.unwrap_or(self.config.retrieval.top_k).max(1);

        let retrieved = match self.retriever.retrieve(question, top_k).await {
            Ok(docs) => docs,
            Err(e) => {
                tracing::warn!("Retrieval failed for {:?}: {}", question, e);
                let mut response = QueryResponse::empty(question, QueryStatus::NoResults);
                response.warnings.push(format!("Retrieval failed: {}", e));
                return Ok(response);
            }
        };

        if retrieved.is_empty() {
            return Ok(QueryResponse::empty(question, QueryStatus::NoResults));
        }

        let filtered = {
            let store = self.feedback.read();
            filter_with_report(retrieved, question, store.log())
        };

        if filtered.kept.is_empty() {
            tracing::info!(
                "All {} retrieved document(s) were rejected earlier for {:?}",
                filtered.suppressed,
                question
            );
            let mut response = QueryResponse::empty(question, QueryStatus::NoRelevantDocuments);
            response.suppressed = filtered.suppressed;
            return Ok(response);
        }

        let mut response = QueryResponse::empty(question, QueryStatus::Answered);
        response.suppressed = filtered.suppressed;
        response.sources = filtered.kept.iter().map(SourceView::from).collect();

        let timeout_secs = self.config.llm.timeout_secs;
        let generation = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            self.providers.llm.generate_answer(question, &filtered.kept),
        )
        .await
        .unwrap_or(Err(Error::Timeout {
            operation: "answer generation",
            secs: timeout_secs,
        }));

        match generation {
            Ok(answer) => {
                response.cited = link_citations(&answer, &filtered.kept);
                response.answer = Some(answer);
            }
            Err(e) => {
                tracing::warn!("Answer generation failed for {:?}: {}", question, e);
                response.answer_error = Some(e.to_string());
            }
        }

        Ok(response)
    }

    /// Merge a finished rating session into the feedback log and persist it,
    /// then append the ratings to the journal
    ///
    /// The log is the source of truth; a journal write failure is only logged.
    pub async fn submit(&self, collector: FeedbackCollector) -> Result<MergeOutcome> {
        let feedback = Arc::clone(&self.feedback);
        let journal = Arc::clone(&self.journal);

        tokio::task::spawn_blocking(move || -> Result<MergeOutcome> {
            let events = collector.events(Utc::now());
            let outcome = collector.submit(&mut feedback.write())?;
            if let Err(e) = journal.append(&events) {
                tracing::warn!("Feedback saved but not journaled: {}", e);
            }
            Ok(outcome)
        })
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
    }

    /// Record ratings sent by a client
    ///
    /// When `shown` is given, ratings for any other document are rejected.
    /// Without it every rated document counts as shown.
    pub async fn submit_feedback(&self, request: &FeedbackRequest) -> Result<FeedbackResponse> {
        let shown = match &request.shown {
            Some(shown) => shown.clone(),
            None => request.ratings.iter().map(|r| r.id.clone()).collect(),
        };

        let mut collector = FeedbackCollector::for_ids(request.query.clone(), shown);
        for rating in &request.ratings {
            collector.rate(&rating.id, rating.verdict)?;
        }

        let outcome = self.submit(collector).await?;
        Ok(FeedbackResponse {
            query: request.query.clone(),
            newly_accepted: outcome.newly_accepted,
            newly_rejected: outcome.newly_rejected,
            conflicts: outcome.conflicts,
        })
    }

    /// Store uploaded files, then rebuild the index
    ///
    /// Every file is validated before any is stored.
    pub async fn upload(&self, files: Vec<(String, Vec<u8>)>) -> Result<UploadResponse> {
        let ingestion = &self.config.ingestion;
        for (filename, data) in &files {
            if ingestion.validate_uploads && !ingestion.accepts(filename) {
                return Err(Error::UnsupportedFileType(filename.clone()));
            }
            if data.len() > ingestion.max_upload_size {
                return Err(Error::UploadTooLarge {
                    filename: filename.clone(),
                    size: data.len(),
                    limit: ingestion.max_upload_size,
                });
            }
        }

        let mut stored = Vec::with_capacity(files.len());
        for (filename, data) in &files {
            let info = self.providers.documents.store_document(filename, data).await?;
            stored.push(UploadedFile {
                filename: info.name,
                size: data.len(),
            });
        }

        let reingest = self.reingest().await?;
        Ok(UploadResponse {
            files: stored,
            reingest,
        })
    }

    /// Rebuild the whole index from the document store
    pub async fn reingest(&self) -> Result<ReingestSummary> {
        let _guard = self.rebuild_lock.lock().await;
        let summary = self.builder.rebuild().await?;
        let summary = self.finish_rebuild(summary).await?;
        self.ready.store(true, Ordering::SeqCst);
        Ok(summary)
    }

    /// Teach the index the accepted feedback
    ///
    /// Every query with accepted documents is embedded and stored as an extra
    /// vector for each of those documents, so similar questions find them even
    /// when the chunk text alone would rank them lower. Accepted documents that
    /// are also rejected for the query, or no longer indexed, are skipped. The
    /// full set is recomputed each time, and a rebuild clears it.
    pub async fn reinforce(&self) -> Result<ReinforceSummary> {
        if !self.is_ready() {
            return Err(Error::index_unavailable("index is not loaded"));
        }
        let _guard = self.rebuild_lock.lock().await;
        let start = Instant::now();

        let known = self.providers.index.ids().await?;
        let mut skipped = 0;
        let targets: Vec<(String, Vec<DocumentId>)> = {
            let store = self.feedback.read();
            store
                .log()
                .iter()
                .filter_map(|(query, entry)| {
                    let accepted: Vec<DocumentId> = entry
                        .accepted
                        .iter()
                        .filter(|id| {
                            let usable = !entry.rejected.contains(*id) && known.contains(*id);
                            if !usable {
                                skipped += 1;
                            }
                            usable
                        })
                        .cloned()
                        .collect();
                    (!accepted.is_empty()).then(|| (query.to_string(), accepted))
                })
                .collect()
        };

        let queries: Vec<String> = targets.iter().map(|(q, _)| q.clone()).collect();
        let embeddings = if queries.is_empty() {
            Vec::new()
        } else {
            self.providers.embedder.embed_batch(&queries).await?
        };
        if embeddings.len() != queries.len() {
            return Err(Error::embedding(format!(
                "{} queries but {} embeddings",
                queries.len(),
                embeddings.len()
            )));
        }

        let reinforcements: Vec<Reinforcement> = targets
            .into_iter()
            .zip(embeddings)
            .flat_map(|((_, ids), embedding)| {
                ids.into_iter().map(move |target| Reinforcement {
                    target,
                    embedding: embedding.clone(),
                })
            })
            .collect();

        let manifest = self.providers.index.set_reinforcements(reinforcements).await?;
        tracing::info!(
            "Reinforced index with {} accepted pair(s) from {} queries ({} skipped)",
            manifest.reinforcements,
            queries.len(),
            skipped
        );

        Ok(ReinforceSummary {
            queries: queries.len(),
            reinforcements: manifest.reinforcements,
            skipped,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn finish_rebuild(&self, summary: BuildSummary) -> Result<ReingestSummary> {
        let orphans = self.orphaned_feedback().await?;
        if !orphans.is_empty() {
            tracing::warn!(
                "{} feedback identifier(s) no longer exist in the rebuilt index",
                orphans.len()
            );
            for orphan in &orphans {
                tracing::debug!("Orphaned feedback: {:?} -> {}", orphan.query, orphan.id);
            }
        }

        Ok(ReingestSummary {
            documents: summary.documents,
            chunks: summary.chunks,
            skipped: summary.skipped,
            failed: summary.failed,
            orphans,
            duration_ms: summary.duration_ms,
        })
    }

    /// Feedback identifiers that are not in the current index
    pub async fn orphaned_feedback(&self) -> Result<Vec<OrphanedFeedback>> {
        let known = self.providers.index.ids().await?;
        Ok(self.feedback.read().log().orphans(&known))
    }

    /// Counts over the feedback log
    pub fn feedback_stats(&self) -> FeedbackStats {
        self.feedback.read().log().stats()
    }

    /// Where the feedback log is stored
    pub fn feedback_location(&self) -> String {
        self.feedback.read().location()
    }

    /// Every journaled rating, oldest first
    pub async fn feedback_events(&self) -> Result<Vec<FeedbackEvent>> {
        let journal = Arc::clone(&self.journal);
        tokio::task::spawn_blocking(move || journal.read_all())
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
    }
}
