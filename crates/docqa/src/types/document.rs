//! Document identifiers, chunks and retrieval results

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::Error;

/// Separator used by the string encoding of [`DocumentId`]
pub const ID_SEPARATOR: &str = "::";

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Plain text file
    Txt,
    /// Markdown file
    Markdown,
    /// Unknown file type
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "txt" | "text" => Self::Txt,
            "md" | "markdown" => Self::Markdown,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a file name or path
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .map(|ext| Self::from_extension(&ext.to_string_lossy()))
            .unwrap_or(Self::Unknown)
    }

    /// Check if this is a supported file type
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Get display name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Pdf => "PDF",
            Self::Docx => "Word Document (.docx)",
            Self::Txt => "Text File",
            Self::Markdown => "Markdown",
            Self::Unknown => "Unknown",
        }
    }
}

/// Stable key of one chunk in the corpus: `(source_path, chunk_index)`.
///
/// `source` is the path relative to the document store with `/` separators,
/// `index` the chunk ordinal within that source. Ordering is by source, then
/// index. On the wire and on disk the id is the string `"{source}::{index}"`;
/// parsing splits on the last `::`, so sources that themselves contain `::`
/// still round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId {
    source: String,
    index: u32,
}

impl DocumentId {
    /// Create an identifier
    pub fn new(source: impl Into<String>, index: u32) -> Self {
        Self {
            source: source.into(),
            index,
        }
    }

    /// Source path relative to the document store
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Chunk ordinal within the source
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.source, ID_SEPARATOR, self.index)
    }
}

impl FromStr for DocumentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (source, index) = s
            .rsplit_once(ID_SEPARATOR)
            .ok_or_else(|| Error::InvalidDocumentId(s.to_string()))?;
        if source.is_empty() {
            return Err(Error::InvalidDocumentId(s.to_string()));
        }
        let index = index
            .parse::<u32>()
            .map_err(|_| Error::InvalidDocumentId(s.to_string()))?;
        Ok(Self::new(source, index))
    }
}

impl Serialize for DocumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A chunk as stored in the index metadata sidecar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable identifier
    pub id: DocumentId,
    /// Chunk text
    pub content: String,
    /// Page number (1-indexed) for paginated sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// File type of the source
    pub file_type: FileType,
}

impl Chunk {
    /// Create a chunk
    pub fn new(id: DocumentId, content: String, page: Option<u32>, file_type: FileType) -> Self {
        Self {
            id,
            content,
            page,
            file_type,
        }
    }
}

/// One retrieval candidate, derived per query and never persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    /// Stable identifier
    pub id: DocumentId,
    /// Chunk text
    pub content: String,
    /// Source path relative to the document store
    pub source: String,
    /// Page number, when the source is paginated
    pub page: Option<u32>,
    /// Similarity score (higher is more similar)
    pub similarity: f32,
}

impl RetrievedDocument {
    /// Build a retrieval result from an indexed chunk
    pub fn from_chunk(chunk: Chunk, similarity: f32) -> Self {
        Self {
            source: chunk.id.source().to_string(),
            id: chunk.id,
            content: chunk.content,
            page: chunk.page,
            similarity,
        }
    }

    /// Truncated preview of the content
    pub fn preview(&self, max_chars: usize) -> String {
        let mut preview: String = self.content.chars().take(max_chars).collect();
        if self.content.chars().count() > max_chars {
            preview.push_str("...");
        }
        preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let id = DocumentId::new("reports/a.pdf", 3);
        assert_eq!(id.to_string(), "reports/a.pdf::3");
        assert_eq!("reports/a.pdf::3".parse::<DocumentId>().unwrap(), id);
    }

    #[test]
    fn test_parse_uses_last_separator() {
        let id: DocumentId = "odd::name.txt::12".parse().unwrap();
        assert_eq!(id.source(), "odd::name.txt");
        assert_eq!(id.index(), 12);
        assert_eq!(id.to_string(), "odd::name.txt::12");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("no-separator".parse::<DocumentId>().is_err());
        assert!("a.pdf::".parse::<DocumentId>().is_err());
        assert!("a.pdf::-1".parse::<DocumentId>().is_err());
        assert!("::4".parse::<DocumentId>().is_err());
    }

    #[test]
    fn test_ordering_is_source_then_index() {
        let mut ids = vec![
            DocumentId::new("b.pdf", 0),
            DocumentId::new("a.pdf", 10),
            DocumentId::new("a.pdf", 2),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                DocumentId::new("a.pdf", 2),
                DocumentId::new("a.pdf", 10),
                DocumentId::new("b.pdf", 0),
            ]
        );
    }

    #[test]
    fn test_serde_as_string() {
        let id = DocumentId::new("finance.pdf", 4);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"finance.pdf::4\"");
        let back: DocumentId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<DocumentId>("\"finance.pdf\"").is_err());
    }

    #[test]
    fn test_file_type_from_path() {
        assert_eq!(FileType::from_path("x/y/report.PDF"), FileType::Pdf);
        assert_eq!(FileType::from_path("memo.docx"), FileType::Docx);
        assert_eq!(FileType::from_path("notes"), FileType::Unknown);
    }

    #[test]
    fn test_preview_truncates() {
        let doc = RetrievedDocument::from_chunk(
            Chunk::new(DocumentId::new("a.txt", 0), "abcdef".into(), None, FileType::Txt),
            0.5,
        );
        assert_eq!(doc.preview(3), "abc...");
        assert_eq!(doc.preview(10), "abcdef");
        assert_eq!(doc.source, "a.txt");
    }
}
