//! Local provider implementations on the filesystem
//!
//! `FlatVectorIndex` keeps every vector in memory and scores queries by
//! cosine similarity. On disk it is two files in the index directory:
//! `index.bin` (bincode chunk vectors plus reinforcement vectors) and
//! `index.meta.json` (manifest, the chunk for each vector in the same order,
//! and the SHA-256 of the `index.bin` it was written with).

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::types::{Chunk, DocumentId};

use super::document_store::{DocumentStoreProvider, StoredDocumentInfo};
use super::vector_index::{
    IndexManifest, IndexState, Reinforcement, VectorIndexProvider, VectorMatch,
};

const VECTORS_FILE: &str = "index.bin";
const METADATA_FILE: &str = "index.meta.json";

#[derive(Serialize, Deserialize)]
struct IndexMetadata {
    manifest: IndexManifest,
    /// Hex SHA-256 of the `index.bin` written alongside this sidecar
    #[serde(default)]
    vectors_sha256: String,
    chunks: Vec<Chunk>,
}

#[derive(Serialize, Deserialize)]
struct StoredVectors {
    vectors: Vec<Vec<f32>>,
    /// (chunk position, query vector)
    reinforcements: Vec<(u32, Vec<f32>)>,
}

struct Snapshot {
    manifest: IndexManifest,
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
    norms: Vec<f32>,
    reinforcements: Vec<(u32, Vec<f32>)>,
    reinforcement_norms: Vec<f32>,
}

impl Snapshot {
    fn new(
        manifest: IndexManifest,
        chunks: Vec<Chunk>,
        vectors: Vec<Vec<f32>>,
        reinforcements: Vec<(u32, Vec<f32>)>,
    ) -> Self {
        let norms = vectors.iter().map(|v| norm(v)).collect();
        let reinforcement_norms = reinforcements.iter().map(|(_, v)| norm(v)).collect();
        Self {
            manifest,
            chunks,
            vectors,
            norms,
            reinforcements,
            reinforcement_norms,
        }
    }

    fn search(&self, query: &[f32], top_k: usize) -> Vec<VectorMatch> {
        let query_norm = norm(query);
        let mut best: Vec<f32> = self
            .vectors
            .iter()
            .zip(&self.norms)
            .map(|(v, n)| cosine(v, *n, query, query_norm))
            .collect();

        // A reinforced chunk scores the best of its own vector and its queries
        for ((target, v), n) in self.reinforcements.iter().zip(&self.reinforcement_norms) {
            let sim = cosine(v, *n, query, query_norm);
            if let Some(slot) = best.get_mut(*target as usize) {
                if sim > *slot {
                    *slot = sim;
                }
            }
        }

        let mut scored: Vec<(usize, f32)> = best.into_iter().enumerate().collect();

        // Ties keep index order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        scored
            .into_iter()
            .take(top_k)
            .map(|(i, similarity)| VectorMatch {
                chunk: self.chunks[i].clone(),
                similarity,
            })
            .collect()
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

fn cosine(a: &[f32], a_norm: f32, b: &[f32], b_norm: f32) -> f32 {
    let denom = a_norm * b_norm;
    if denom > 0.0 {
        dot(a, b) / denom
    } else {
        0.0
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Brute-force cosine index persisted as a vector file plus a JSON sidecar
pub struct FlatVectorIndex {
    dir: PathBuf,
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl FlatVectorIndex {
    /// Index stored in `dir`; nothing is read until [`VectorIndexProvider::open`]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            current: RwLock::new(None),
        }
    }

    fn snapshot(&self) -> Result<Arc<Snapshot>> {
        self.current
            .read()
            .clone()
            .ok_or_else(|| Error::index_unavailable("index is not loaded"))
    }

    fn load(dir: &Path) -> std::result::Result<Snapshot, String> {
        let vectors_path = dir.join(VECTORS_FILE);
        let metadata_path = dir.join(METADATA_FILE);

        if !vectors_path.exists() {
            return Err(format!("{} not found", vectors_path.display()));
        }
        if !metadata_path.exists() {
            return Err(format!("{} not found", metadata_path.display()));
        }

        let metadata_raw = std::fs::read(&metadata_path)
            .map_err(|e| format!("cannot read {}: {}", metadata_path.display(), e))?;
        let metadata: IndexMetadata = serde_json::from_slice(&metadata_raw)
            .map_err(|e| format!("corrupt {}: {}", metadata_path.display(), e))?;

        let vectors_raw = std::fs::read(&vectors_path)
            .map_err(|e| format!("cannot read {}: {}", vectors_path.display(), e))?;
        if sha256_hex(&vectors_raw) != metadata.vectors_sha256 {
            return Err(format!(
                "{} does not belong to {}",
                vectors_path.display(),
                metadata_path.display()
            ));
        }

        let (stored, _): (StoredVectors, usize) =
            bincode::serde::decode_from_slice(&vectors_raw, bincode::config::standard())
                .map_err(|e| format!("corrupt {}: {}", vectors_path.display(), e))?;

        if stored.vectors.len() != metadata.chunks.len() {
            return Err(format!(
                "{} vectors but {} chunks",
                stored.vectors.len(),
                metadata.chunks.len()
            ));
        }
        let dims = metadata.manifest.dimensions;
        if let Some(bad) = stored.vectors.iter().position(|v| v.len() != dims) {
            return Err(format!("vector {} does not have {} dimensions", bad, dims));
        }
        let chunk_count = stored.vectors.len();
        if let Some(bad) = stored
            .reinforcements
            .iter()
            .position(|(target, v)| *target as usize >= chunk_count || v.len() != dims)
        {
            return Err(format!("reinforcement {} is out of range", bad));
        }

        Ok(Snapshot::new(
            metadata.manifest,
            metadata.chunks,
            stored.vectors,
            stored.reinforcements,
        ))
    }

    fn persist(dir: &Path, snapshot: &Snapshot) -> Result<()> {
        let stored = StoredVectors {
            vectors: snapshot.vectors.clone(),
            reinforcements: snapshot.reinforcements.clone(),
        };
        let vectors = bincode::serde::encode_to_vec(&stored, bincode::config::standard())
            .map_err(|e| Error::internal(format!("Failed to encode vectors: {}", e)))?;
        let metadata = serde_json::to_vec_pretty(&IndexMetadata {
            manifest: snapshot.manifest.clone(),
            vectors_sha256: sha256_hex(&vectors),
            chunks: snapshot.chunks.clone(),
        })?;

        // The sidecar carries the vector file's hash, so a torn pair loads as missing
        write_atomic(&dir.join(VECTORS_FILE), &vectors)?;
        write_atomic(&dir.join(METADATA_FILE), &metadata)?;
        Ok(())
    }

    async fn install(&self, snapshot: Snapshot) -> Result<()> {
        let snapshot = Arc::new(snapshot);
        let dir = self.dir.clone();
        let to_persist = Arc::clone(&snapshot);
        tokio::task::spawn_blocking(move || Self::persist(&dir, &to_persist))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))??;

        *self.current.write() = Some(snapshot);
        Ok(())
    }
}

#[async_trait]
impl VectorIndexProvider for FlatVectorIndex {
    async fn open(&self) -> Result<IndexState> {
        let dir = self.dir.clone();
        let loaded = tokio::task::spawn_blocking(move || Self::load(&dir))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?;

        match loaded {
            Ok(snapshot) => {
                let manifest = snapshot.manifest.clone();
                tracing::info!(
                    "Loaded vector index from {} ({} chunks, {} reinforcements, model {})",
                    self.dir.display(),
                    manifest.chunks,
                    manifest.reinforcements,
                    manifest.model
                );
                *self.current.write() = Some(Arc::new(snapshot));
                Ok(IndexState::Ready(manifest))
            }
            Err(reason) => {
                tracing::info!("Vector index unavailable: {}", reason);
                Ok(IndexState::Missing(reason))
            }
        }
    }

    async fn replace_all(
        &self,
        chunks: Vec<Chunk>,
        embeddings: Vec<Vec<f32>>,
        model: &str,
    ) -> Result<IndexManifest> {
        if chunks.len() != embeddings.len() {
            return Err(Error::internal(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }
        let dimensions = embeddings.first().map_or(0, |v| v.len());
        if embeddings.iter().any(|v| v.len() != dimensions) {
            return Err(Error::embedding("embeddings have inconsistent dimensions"));
        }

        let manifest = IndexManifest {
            model: model.to_string(),
            dimensions,
            chunks: chunks.len(),
            built_at: chrono::Utc::now(),
            reinforcements: 0,
        };
        self.install(Snapshot::new(manifest.clone(), chunks, embeddings, Vec::new()))
            .await?;
        Ok(manifest)
    }

    async fn set_reinforcements(
        &self,
        reinforcements: Vec<Reinforcement>,
    ) -> Result<IndexManifest> {
        let current = self.snapshot()?;
        let positions: HashMap<&DocumentId, u32> = current
            .chunks
            .iter()
            .enumerate()
            .map(|(i, c)| (&c.id, i as u32))
            .collect();

        let mut aliases = Vec::with_capacity(reinforcements.len());
        for reinforcement in reinforcements {
            if reinforcement.embedding.len() != current.manifest.dimensions {
                return Err(Error::embedding(format!(
                    "reinforcement for {} has {} dimensions, index has {}",
                    reinforcement.target,
                    reinforcement.embedding.len(),
                    current.manifest.dimensions
                )));
            }
            let position = positions.get(&reinforcement.target).ok_or_else(|| {
                Error::UnknownDocument(reinforcement.target.to_string())
            })?;
            aliases.push((*position, reinforcement.embedding));
        }

        let mut manifest = current.manifest.clone();
        manifest.reinforcements = aliases.len();
        self.install(Snapshot::new(
            manifest.clone(),
            current.chunks.clone(),
            current.vectors.clone(),
            aliases,
        ))
        .await?;
        Ok(manifest)
    }

    async fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<VectorMatch>> {
        let snapshot = self.snapshot()?;
        if snapshot.manifest.chunks > 0 && query_embedding.len() != snapshot.manifest.dimensions {
            return Err(Error::Retrieval(format!(
                "query has {} dimensions, index has {}",
                query_embedding.len(),
                snapshot.manifest.dimensions
            )));
        }

        let query = query_embedding.to_vec();
        tokio::task::spawn_blocking(move || snapshot.search(&query, top_k))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))
    }

    async fn ids(&self) -> Result<HashSet<DocumentId>> {
        Ok(self.snapshot()?.chunks.iter().map(|c| c.id.clone()).collect())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.snapshot()?.chunks.len())
    }

    fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }

    fn name(&self) -> &str {
        "local-flat"
    }
}

/// Local document store using a directory tree
pub struct LocalDocumentStore {
    /// Directory holding the documents
    storage_dir: PathBuf,
}

impl LocalDocumentStore {
    /// Create a new local document store
    pub fn new(storage_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&storage_dir)?;
        Ok(Self { storage_dir })
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.storage_dir
    }

    /// Resolve a relative name inside the store, refusing anything that escapes it
    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if name.is_empty() || escapes {
            return Err(Error::internal(format!("Invalid document name: {}", name)));
        }
        Ok(self.storage_dir.join(relative))
    }

    fn relative_name(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.storage_dir).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        Some(parts.join("/"))
    }
}

/// Keep only the final path component of an uploaded file name
pub fn sanitize_filename(filename: &str) -> Option<String> {
    let name = filename.rsplit(['/', '\\']).next()?.trim();
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name.to_string())
    }
}

#[async_trait]
impl DocumentStoreProvider for LocalDocumentStore {
    async fn store_document(&self, filename: &str, data: &[u8]) -> Result<StoredDocumentInfo> {
        let name = sanitize_filename(filename)
            .ok_or_else(|| Error::UnsupportedFileType(format!("invalid file name {:?}", filename)))?;
        let path = self.resolve(&name)?;

        tokio::fs::write(&path, data).await?;
        tracing::info!("Stored {} ({} bytes)", path.display(), data.len());

        Ok(StoredDocumentInfo {
            name,
            uri: path.to_string_lossy().to_string(),
            size: data.len() as u64,
        })
    }

    async fn get_document(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.resolve(name)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| Error::Internal(format!("Failed to read document {}: {}", name, e)))
    }

    async fn list_documents(&self) -> Result<Vec<StoredDocumentInfo>> {
        let root = self.storage_dir.clone();
        let entries = tokio::task::spawn_blocking(move || {
            WalkDir::new(&root)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        tracing::warn!("Skipping unreadable entry: {}", e);
                        None
                    }
                })
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| {
                    let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                    (entry.into_path(), size)
                })
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?;

        let mut docs: Vec<StoredDocumentInfo> = entries
            .into_iter()
            .filter_map(|(path, size)| {
                let name = self.relative_name(&path)?;
                Some(StoredDocumentInfo {
                    name,
                    uri: path.to_string_lossy().to_string(),
                    size,
                })
            })
            .collect();
        docs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(docs)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.storage_dir.exists())
    }

    fn name(&self) -> &str {
        "local-filesystem"
    }
}
