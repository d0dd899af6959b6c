//! Configuration for the document Q&A system

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::feedback::ConflictPolicy;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// On-disk locations
    pub paths: PathsConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Ollama/LLM configuration
    pub llm: LlmConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Feedback configuration
    pub feedback: FeedbackConfig,
    /// Ingestion and upload configuration
    pub ingestion: IngestionConfig,
}

impl RagConfig {
    /// Load configuration from an optional TOML file, then apply `DOCQA_*` overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Cannot read {}: {}", path.display(), e))
                })?;
                toml::from_str::<RagConfig>(&raw)
                    .map_err(|e| Error::Config(format!("Invalid {}: {}", path.display(), e)))?
            }
            None => RagConfig::default(),
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("DOCQA_DATA_DIR") {
            self.paths = PathsConfig::under(PathBuf::from(dir));
        }
        if let Ok(url) = std::env::var("DOCQA_OLLAMA_URL") {
            self.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("DOCQA_GENERATE_MODEL") {
            self.llm.generate_model = model;
        }
        if let Ok(model) = std::env::var("DOCQA_EMBED_MODEL") {
            self.llm.embed_model = model;
        }
        if let Some(port) = std::env::var("DOCQA_PORT").ok().and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
    }

    /// Check that everything needed to talk to the providers is present
    pub fn validate(&self) -> Result<()> {
        if self.llm.base_url.trim().is_empty() {
            return Err(Error::ConfigurationMissing("llm.base_url".to_string()));
        }
        if self.llm.generate_model.trim().is_empty() {
            return Err(Error::ConfigurationMissing("llm.generate_model".to_string()));
        }
        if self.llm.embed_model.trim().is_empty() {
            return Err(Error::ConfigurationMissing("llm.embed_model".to_string()));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::ConfigurationMissing("embeddings.dimensions".to_string()));
        }
        if let Some(var) = &self.llm.api_key_env {
            match std::env::var(var) {
                Ok(value) if !value.trim().is_empty() => {}
                _ => {
                    return Err(Error::ConfigurationMissing(format!(
                        "environment variable {} (llm.api_key_env)",
                        var
                    )))
                }
            }
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(
                "chunking.chunk_overlap must be smaller than chunking.chunk_size".to_string(),
            ));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            enable_cors: true,
        }
    }
}

/// Where documents, the index and the feedback log live
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Raw source files (the document store)
    pub documents_dir: PathBuf,
    /// Vector index and its metadata sidecar
    pub index_dir: PathBuf,
    /// Persisted feedback log
    pub feedback_log: PathBuf,
    /// Append-only journal of individual ratings
    pub feedback_journal: PathBuf,
}

impl PathsConfig {
    /// Standard layout below a single data directory
    pub fn under(data_dir: PathBuf) -> Self {
        Self {
            documents_dir: data_dir.join("documents"),
            index_dir: data_dir.join("vector_store"),
            feedback_log: data_dir.join("feedback_log.json"),
            feedback_journal: data_dir.join("feedback_events.jsonl"),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("docqa");
        Self::under(data_dir)
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding dimensions, checked against the index manifest
    pub dimensions: usize,
    /// Texts sent per embedding batch during a rebuild
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimensions: 768,
            batch_size: 32,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
    /// Minimum chunk size (skip smaller chunks)
    pub min_chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            min_chunk_size: 20,
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Generation model name
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Bounded wait for one generation, in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
    /// Environment variable holding an API key, when the endpoint needs one
    pub api_key_env: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            generate_model: "phi3".to_string(),
            temperature: 0.3,
            timeout_secs: 120,
            max_retries: 2,
            api_key_env: None,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of candidates returned per query
    pub top_k: usize,
    /// Bounded wait for embedding plus search, in seconds
    pub timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            timeout_secs: 30,
        }
    }
}

/// Feedback configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// What happens when a document already has the opposite verdict for a query
    pub conflict_policy: ConflictPolicy,
}

/// Ingestion and upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Extensions (lowercase, no dot) picked up by a rebuild
    pub extensions: Vec<String>,
    /// Reject uploads whose extension is not in `extensions`
    pub validate_uploads: bool,
    /// Maximum upload size in bytes
    pub max_upload_size: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            extensions: vec![
                "txt".to_string(),
                "md".to_string(),
                "pdf".to_string(),
                "docx".to_string(),
            ],
            validate_uploads: true,
            max_upload_size: 100 * 1024 * 1024, // 100MB
        }
    }
}

impl IngestionConfig {
    /// Whether a file name has one of the recognized extensions
    pub fn accepts(&self, filename: &str) -> bool {
        Path::new(filename)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .map_or(false, |ext| self.extensions.iter().any(|e| e == &ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = RagConfig::default();
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.chunking.chunk_size, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_model_is_configuration_missing() {
        let mut config = RagConfig::default();
        config.llm.generate_model = String::new();
        assert!(matches!(config.validate(), Err(Error::ConfigurationMissing(_))));
    }

    #[test]
    fn test_missing_api_key_env() {
        let mut config = RagConfig::default();
        config.llm.api_key_env = Some("DOCQA_TEST_KEY_THAT_IS_NEVER_SET".to_string());
        match config.validate() {
            Err(Error::ConfigurationMissing(msg)) => {
                assert!(msg.contains("DOCQA_TEST_KEY_THAT_IS_NEVER_SET"))
            }
            other => panic!("expected ConfigurationMissing, got {:?}", other),
        }
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: RagConfig = toml::from_str(
            r#"
            [retrieval]
            top_k = 8

            [feedback]
            conflict_policy = "latest_wins"
            "#,
        )
        .unwrap();
        assert_eq!(config.retrieval.top_k, 8);
        assert_eq!(config.retrieval.timeout_secs, 30);
        assert_eq!(config.feedback.conflict_policy, ConflictPolicy::LatestWins);
        assert_eq!(config.llm.generate_model, "phi3");
    }

    #[test]
    fn test_accepts_extensions() {
        let ingestion = IngestionConfig::default();
        assert!(ingestion.accepts("report.PDF"));
        assert!(ingestion.accepts("notes.txt"));
        assert!(ingestion.accepts("memo.docx"));
        assert!(!ingestion.accepts("sheet.xlsx"));
        assert!(!ingestion.accepts("README"));
    }
}
