//! Text chunking with page tracking

use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;
use crate::types::{Chunk, DocumentId};

use super::parser::ParsedDocument;

/// Text chunker with configurable size and overlap
///
/// Chunks are numbered `0..n` per source in document order, so identical
/// bytes and settings always produce identical identifiers.
pub struct TextChunker {
    /// Target chunk size
    chunk_size: usize,
    /// Overlap between chunks
    overlap: usize,
    /// Minimum chunk size
    min_size: usize,
}

impl TextChunker {
    /// Create a new chunker
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            overlap,
            min_size: 1,
        }
    }

    /// Create from configuration
    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap).with_min_size(config.min_chunk_size)
    }

    /// Drop chunks shorter than this
    pub fn with_min_size(mut self, min_size: usize) -> Self {
        self.min_size = min_size.max(1);
        self
    }

    /// Chunk every page of a parsed document
    pub fn chunk_document(&self, source: &str, parsed: &ParsedDocument) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for page in &parsed.pages {
            for text in self.chunk_text(&page.content) {
                let id = DocumentId::new(source, chunks.len() as u32);
                chunks.push(Chunk::new(id, text, page.page_number, parsed.file_type));
            }
        }

        chunks
    }

    /// Split text into overlapping pieces along sentence boundaries
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();

        for piece in self.split_into_pieces(text) {
            if !current.is_empty() && current.len() + piece.len() > self.chunk_size {
                self.push_chunk(&mut chunks, &current);
                current = self.get_overlap_text(&current);
                if current.len() + piece.len() > self.chunk_size {
                    current.clear();
                }
            }
            current.push_str(piece);
        }

        self.push_chunk(&mut chunks, &current);
        chunks
    }

    fn push_chunk(&self, chunks: &mut Vec<String>, text: &str) {
        let trimmed = text.trim();
        if trimmed.len() >= self.min_size && chunks.last().map_or(true, |last| last != trimmed) {
            chunks.push(trimmed.to_string());
        }
    }

    /// Sentences, with sentences longer than a chunk split further at word bounds
    fn split_into_pieces<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let max_piece = self.chunk_size.saturating_sub(self.overlap).max(1);
        let mut pieces = Vec::new();

        for sentence in text.split_sentence_bounds() {
            if sentence.len() <= self.chunk_size {
                pieces.push(sentence);
                continue;
            }

            let mut start = 0;
            let mut end = 0;
            for (offset, word) in sentence.split_word_bound_indices() {
                if offset > start && offset + word.len() - start > max_piece {
                    pieces.push(&sentence[start..offset]);
                    start = offset;
                }
                end = offset + word.len();
            }
            if end > start {
                pieces.push(&sentence[start..end]);
            }
        }

        pieces
    }

    /// Get overlap text from the end of a chunk
    fn get_overlap_text(&self, text: &str) -> String {
        if self.overlap == 0 {
            return String::new();
        }
        if text.len() <= self.overlap {
            return text.to_string();
        }

        let mut start = text.len() - self.overlap;
        while start > 0 && !text.is_char_boundary(start) {
            start -= 1;
        }

        let overlap_text = &text[start..];

        // Prefer starting on a word boundary
        match overlap_text.find(' ') {
            Some(pos) if pos + 1 < overlap_text.len() => overlap_text[pos + 1..].to_string(),
            _ => overlap_text.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::parser::PageContent;
    use crate::types::FileType;

    fn pdf(pages: &[&str]) -> ParsedDocument {
        ParsedDocument {
            file_type: FileType::Pdf,
            pages: pages
                .iter()
                .enumerate()
                .map(|(i, text)| PageContent {
                    page_number: Some(i as u32 + 1),
                    content: text.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_indices_are_sequential_across_pages() {
        let chunker = TextChunker::new(40, 0);
        let parsed = pdf(&[
            "First sentence on page one. Second sentence on page one.",
            "Only sentence on page two.",
        ]);

        let chunks = chunker.chunk_document("finance.pdf", &parsed);
        let indices: Vec<u32> = chunks.iter().map(|c| c.id.index()).collect();
        assert_eq!(indices, (0..chunks.len() as u32).collect::<Vec<_>>());
        assert_eq!(chunks.last().unwrap().page, Some(2));
        assert!(chunks.iter().all(|c| c.id.source() == "finance.pdf"));
    }

    #[test]
    fn test_deterministic() {
        let chunker = TextChunker::new(30, 10);
        let parsed = pdf(&["Alpha beta gamma. Delta epsilon zeta. Eta theta iota kappa."]);
        assert_eq!(
            chunker.chunk_document("a.pdf", &parsed),
            chunker.chunk_document("a.pdf", &parsed)
        );
    }

    #[test]
    fn test_chunks_respect_size() {
        let chunker = TextChunker::new(50, 10);
        let text = "word ".repeat(100);
        let chunks = chunker.chunk_text(&text);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.len() <= 50));
    }

    #[test]
    fn test_small_text_is_one_chunk() {
        let chunker = TextChunker::new(500, 50);
        assert_eq!(chunker.chunk_text("Short note."), vec!["Short note.".to_string()]);
        assert!(chunker.chunk_text("   ").is_empty());
    }

    #[test]
    fn test_min_size_drops_fragments() {
        let chunker = TextChunker::new(500, 50).with_min_size(20);
        assert!(chunker.chunk_text("Tiny.").is_empty());
    }
}
