//! Persistent feedback store
//!
//! The log is saved as one pretty-printed JSON object keyed by query text.
//! Saves are full snapshots written to a temporary file next to the target
//! and renamed over it, so readers see either the old or the new file.
//!
//! Every load and save records a revision token (SHA-256 of the file bytes).
//! Before a submit is written, the token on disk is compared with the one
//! this store last saw; if another process saved in between, the newer log
//! is reloaded and the batch merged on top of it instead of overwriting it.

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

use super::log::{ConflictPolicy, FeedbackBatch, FeedbackLog, MergeOutcome};

/// Content hash of a saved feedback log
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Revision(String);

impl Revision {
    /// Revision of raw file bytes
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    /// Hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A log together with the revision it was read at (`None` when nothing was stored)
#[derive(Debug, Clone, Default)]
pub struct LoadedLog {
    pub log: FeedbackLog,
    pub revision: Option<Revision>,
}

/// Storage backend for the feedback log
pub trait FeedbackRepository: Send + Sync {
    /// Read the stored log; a missing log is empty, a malformed one is an error
    fn load(&self) -> Result<LoadedLog>;

    /// Overwrite the stored log with a full snapshot
    fn save(&self, log: &FeedbackLog) -> Result<Revision>;

    /// Revision currently stored, without decoding it
    fn current_revision(&self) -> Result<Option<Revision>>;

    /// Human-readable location for logging
    fn location(&self) -> String;
}

impl<R: FeedbackRepository + ?Sized> FeedbackRepository for Arc<R> {
    fn load(&self) -> Result<LoadedLog> {
        (**self).load()
    }

    fn save(&self, log: &FeedbackLog) -> Result<Revision> {
        (**self).save(log)
    }

    fn current_revision(&self) -> Result<Option<Revision>> {
        (**self).current_revision()
    }

    fn location(&self) -> String {
        (**self).location()
    }
}

/// Load a feedback log from `path`. A missing file yields an empty log.
pub fn load(path: &Path) -> Result<FeedbackLog> {
    Ok(JsonFileRepository::new(path).load()?.log)
}

/// Save a full snapshot of `log` to `path`, replacing prior content
pub fn save(log: &FeedbackLog, path: &Path) -> Result<()> {
    JsonFileRepository::new(path).save(log).map(|_| ())
}

fn encode(log: &FeedbackLog) -> serde_json::Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(log)?;
    bytes.push(b'\n');
    Ok(bytes)
}

fn decode(bytes: &[u8], path: &Path) -> Result<FeedbackLog> {
    serde_json::from_slice(bytes).map_err(|e| Error::MalformedFeedbackLog {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Feedback log stored as a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    /// Repository backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persistence_error(&self, message: impl Into<String>) -> Error {
        Error::FeedbackPersistence {
            path: self.path.clone(),
            message: message.into(),
        }
    }

    fn read_bytes(&self) -> std::io::Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl FeedbackRepository for JsonFileRepository {
    fn load(&self) -> Result<LoadedLog> {
        match self.read_bytes()? {
            None => {
                tracing::info!("No feedback log at {}, starting empty", self.path.display());
                Ok(LoadedLog::default())
            }
            Some(bytes) => {
                let log = decode(&bytes, &self.path)?;
                tracing::info!(
                    "Loaded feedback for {} queries from {}",
                    log.len(),
                    self.path.display()
                );
                Ok(LoadedLog {
                    log,
                    revision: Some(Revision::of(&bytes)),
                })
            }
        }
    }

    fn save(&self, log: &FeedbackLog) -> Result<Revision> {
        let bytes = encode(log).map_err(|e| self.persistence_error(e.to_string()))?;

        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|e| self.persistence_error(e.to_string()))?;

        let mut tmp =
            NamedTempFile::new_in(&parent).map_err(|e| self.persistence_error(e.to_string()))?;
        tmp.write_all(&bytes)
            .map_err(|e| self.persistence_error(e.to_string()))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| self.persistence_error(e.to_string()))?;
        tmp.persist(&self.path)
            .map_err(|e| self.persistence_error(e.error.to_string()))?;

        tracing::debug!("Saved feedback log ({} queries) to {}", log.len(), self.path.display());
        Ok(Revision::of(&bytes))
    }

    fn current_revision(&self) -> Result<Option<Revision>> {
        let bytes = self
            .read_bytes()
            .map_err(|e| self.persistence_error(format!("cannot read current log: {}", e)))?;
        Ok(bytes.as_deref().map(Revision::of))
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Feedback log kept in memory, with a switch to simulate write failures
#[derive(Debug, Default)]
pub struct MemoryRepository {
    bytes: Mutex<Option<Vec<u8>>>,
    fail_saves: AtomicBool,
}

impl MemoryRepository {
    /// Empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-filled with raw bytes
    pub fn with_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Mutex::new(Some(bytes.into())),
            fail_saves: AtomicBool::new(false),
        }
    }

    /// Make subsequent saves fail
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Replace the stored bytes, as another writer would
    pub fn overwrite(&self, bytes: impl Into<Vec<u8>>) {
        *self.bytes.lock() = Some(bytes.into());
    }

    /// Currently stored bytes
    pub fn bytes(&self) -> Option<Vec<u8>> {
        self.bytes.lock().clone()
    }
}

impl FeedbackRepository for MemoryRepository {
    fn load(&self) -> Result<LoadedLog> {
        match self.bytes.lock().as_deref() {
            None => Ok(LoadedLog::default()),
            Some(bytes) => Ok(LoadedLog {
                log: decode(bytes, Path::new("<memory>"))?,
                revision: Some(Revision::of(bytes)),
            }),
        }
    }

    fn save(&self, log: &FeedbackLog) -> Result<Revision> {
        let persistence_error = |message: String| Error::FeedbackPersistence {
            path: PathBuf::from("<memory>"),
            message,
        };
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(persistence_error("simulated write failure".to_string()));
        }
        let bytes = encode(log).map_err(|e| persistence_error(e.to_string()))?;
        let revision = Revision::of(&bytes);
        *self.bytes.lock() = Some(bytes);
        Ok(revision)
    }

    fn current_revision(&self) -> Result<Option<Revision>> {
        Ok(self.bytes.lock().as_deref().map(Revision::of))
    }

    fn location(&self) -> String {
        "<memory>".to_string()
    }
}

/// Owner of the feedback log lifecycle: load, merge, save
pub struct FeedbackStore {
    repo: Box<dyn FeedbackRepository>,
    log: FeedbackLog,
    revision: Option<Revision>,
    policy: ConflictPolicy,
}

impl FeedbackStore {
    /// Load the log from a repository
    pub fn open(repo: impl FeedbackRepository + 'static, policy: ConflictPolicy) -> Result<Self> {
        let loaded = repo.load()?;
        Ok(Self {
            repo: Box::new(repo),
            log: loaded.log,
            revision: loaded.revision,
            policy,
        })
    }

    /// Load the log from a JSON file
    pub fn open_file(path: impl Into<PathBuf>, policy: ConflictPolicy) -> Result<Self> {
        Self::open(JsonFileRepository::new(path), policy)
    }

    /// Current log (mirrors the last successful save)
    pub fn log(&self) -> &FeedbackLog {
        &self.log
    }

    /// Conflict policy applied by merges
    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Where the log is stored
    pub fn location(&self) -> String {
        self.repo.location()
    }

    /// Re-read the log from storage
    pub fn reload(&mut self) -> Result<()> {
        let loaded = self.repo.load()?;
        self.log = loaded.log;
        self.revision = loaded.revision;
        Ok(())
    }

    /// Merge a batch and persist the result.
    ///
    /// The in-memory log only changes after the save succeeded; on error the
    /// batch is not recorded anywhere and can be resubmitted.
    pub fn submit(&mut self, batch: &FeedbackBatch) -> Result<MergeOutcome> {
        if batch.is_empty() {
            return Ok(MergeOutcome::default());
        }

        if self.repo.current_revision()? != self.revision {
            tracing::warn!(
                "Feedback log at {} was changed by another writer, merging on top of it",
                self.repo.location()
            );
            self.reload()?;
        }

        let mut next = self.log.clone();
        let outcome = next.merge(batch, self.policy);
        if !outcome.changed() {
            tracing::debug!("Feedback for {:?} already recorded", batch.query);
            return Ok(outcome);
        }

        let revision = self.repo.save(&next).map_err(|e| {
            tracing::error!("Feedback submission for {:?} not saved: {}", batch.query, e);
            e
        })?;

        self.log = next;
        self.revision = Some(revision);

        tracing::info!(
            "Recorded feedback for {:?}: +{} accepted, +{} rejected",
            batch.query,
            outcome.newly_accepted,
            outcome.newly_rejected
        );
        Ok(outcome)
    }
}
