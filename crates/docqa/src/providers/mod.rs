//! Provider abstractions for embeddings, answer generation, the vector
//! index and raw document storage
//!
//! Each concern is a trait so the service can run against the local
//! implementations (filesystem + Ollama) or against fakes in tests.

pub mod document_store;
pub mod embedding;
pub mod llm;
pub mod local;
pub mod ollama;
pub mod vector_index;

pub use document_store::{DocumentStoreProvider, StoredDocumentInfo};
pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use local::{FlatVectorIndex, LocalDocumentStore};
pub use ollama::{OllamaEmbedder, OllamaLlm, OllamaProvider};
pub use vector_index::{IndexManifest, IndexState, Reinforcement, VectorIndexProvider, VectorMatch};
