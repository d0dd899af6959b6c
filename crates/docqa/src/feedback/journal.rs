//! Append-only journal of individual ratings
//!
//! The feedback log only keeps the current verdict per query. The journal
//! keeps every rating as it was submitted, one JSON object per line, so the
//! history survives later overrides.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::DocumentId;

use super::collector::Rating;

/// One submitted rating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEvent {
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub document_id: DocumentId,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    pub verdict: Rating,
}

/// JSON-lines journal file
#[derive(Debug)]
pub struct FeedbackJournal {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FeedbackJournal {
    /// Journal at `path`; the file is created on first append
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persistence_error(&self, message: impl Into<String>) -> Error {
        Error::FeedbackPersistence {
            path: self.path.clone(),
            message: message.into(),
        }
    }

    /// Append events as one write; an empty slice does nothing
    pub fn append(&self, events: &[FeedbackEvent]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let mut buf = Vec::new();
        for event in events {
            serde_json::to_writer(&mut buf, event)
                .map_err(|e| self.persistence_error(e.to_string()))?;
            buf.push(b'\n');
        }

        let _guard = self.write_lock.lock();
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.persistence_error(e.to_string()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.persistence_error(e.to_string()))?;
        file.write_all(&buf)
            .map_err(|e| self.persistence_error(e.to_string()))?;
        file.sync_data()
            .map_err(|e| self.persistence_error(e.to_string()))?;

        tracing::debug!("Journaled {} ratings to {}", events.len(), self.path.display());
        Ok(())
    }

    /// Every event in append order. A missing journal is empty; a line that
    /// does not decode (a torn final write) is skipped with a warning.
    pub fn read_all(&self) -> Result<Vec<FeedbackEvent>> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut events = Vec::new();
        for (n, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(event) => events.push(event),
                Err(e) => tracing::warn!(
                    "Skipping line {} of {}: {}",
                    n + 1,
                    self.path.display(),
                    e
                ),
            }
        }
        Ok(events)
    }
}
