//! Document ingestion: parsing, chunking and full index rebuilds

mod builder;
mod chunker;
mod parser;

pub use builder::{BuildSummary, IndexBuilder};
pub use chunker::TextChunker;
pub use parser::{FileParser, PageContent, ParsedDocument};
