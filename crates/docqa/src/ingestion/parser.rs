//! File parser for text, PDF and Word documents

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::FileType;

/// Seconds to wait for pdf-extract before giving up on a file
const PDF_EXTRACT_TIMEOUT_SECS: u64 = 60;

/// Replace typographic characters that PDF fonts commonly emit with ASCII
fn cleanup_pdf_text(text: &str) -> String {
    text.replace('\0', "")
        .replace(['\u{2010}', '\u{2011}', '\u{2013}'], "-")
        .replace('\u{2014}', "--")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace('\u{2022}', "* ")
        .replace('\u{2026}', "...")
        .replace('\u{00A0}', " ")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parsed document with extracted text
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// File type
    pub file_type: FileType,
    /// Page-level content, in document order
    pub pages: Vec<PageContent>,
}

impl ParsedDocument {
    /// Whether no text was extracted at all
    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(|p| p.content.trim().is_empty())
    }

    /// Full text, pages separated by blank lines
    pub fn text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Content from a single page
#[derive(Debug, Clone)]
pub struct PageContent {
    /// Page number (1-indexed); `None` for sources without pages
    pub page_number: Option<u32>,
    /// Text content of the page
    pub content: String,
}

/// Multi-format file parser
pub struct FileParser;

impl FileParser {
    /// Parse a file based on its extension
    pub fn parse(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        match FileType::from_path(filename) {
            FileType::Pdf => Self::parse_pdf(filename, data),
            FileType::Docx => Self::parse_docx(filename, data),
            file_type @ (FileType::Txt | FileType::Markdown) => Ok(Self::parse_text(data, file_type)),
            FileType::Unknown => Err(Error::UnsupportedFileType(filename.to_string())),
        }
    }

    /// Parse PDF page by page with lopdf, falling back to pdf-extract for the whole file
    fn parse_pdf(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let pages = match Self::extract_pdf_pages(data) {
            Ok(pages) if pages.iter().any(|p| !p.content.is_empty()) => pages,
            Ok(_) => {
                tracing::debug!("lopdf found no text in {}, trying pdf-extract", filename);
                Self::extract_pdf_whole(filename, data)?
            }
            Err(e) => {
                tracing::warn!("lopdf failed on {}: {}, trying pdf-extract", filename, e);
                Self::extract_pdf_whole(filename, data)?
            }
        };

        let parsed = ParsedDocument {
            file_type: FileType::Pdf,
            pages,
        };
        if parsed.is_empty() {
            return Err(Error::file_parse(
                filename,
                "No text content could be extracted from PDF (image-based or encrypted?)",
            ));
        }
        Ok(parsed)
    }

    fn extract_pdf_pages(data: &[u8]) -> std::result::Result<Vec<PageContent>, lopdf::Error> {
        let doc = lopdf::Document::load_mem(data)?;
        let mut pages = Vec::new();

        for page_number in doc.get_pages().into_keys() {
            match doc.extract_text(&[page_number]) {
                Ok(text) => pages.push(PageContent {
                    page_number: Some(page_number),
                    content: cleanup_pdf_text(&text),
                }),
                Err(e) => {
                    tracing::debug!("Could not extract text from page {}: {}", page_number, e);
                }
            }
        }

        Ok(pages)
    }

    /// pdf-extract can hang on unusual fonts, so it runs on its own thread with a deadline
    fn extract_pdf_whole(filename: &str, data: &[u8]) -> Result<Vec<PageContent>> {
        let data_vec = data.to_vec();
        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            let _ = tx.send(pdf_extract::extract_text_from_mem(&data_vec));
        });

        match rx.recv_timeout(Duration::from_secs(PDF_EXTRACT_TIMEOUT_SECS)) {
            Ok(Ok(text)) => {
                let _ = handle.join();
                Ok(vec![PageContent {
                    page_number: Some(1),
                    content: cleanup_pdf_text(&text),
                }])
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(Error::file_parse(filename, e.to_string()))
            }
            Err(mpsc::RecvTimeoutError::Timeout) => Err(Error::file_parse(
                filename,
                format!("PDF extraction timed out after {}s", PDF_EXTRACT_TIMEOUT_SECS),
            )),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(Error::file_parse(filename, "PDF extraction thread crashed"))
            }
        }
    }

    /// Parse DOCX document as a single unpaginated text
    fn parse_docx(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let doc = docx_rs::read_docx(data).map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let mut content = String::new();
        for child in doc.document.children {
            if let docx_rs::DocumentChild::Paragraph(p) = child {
                for child in p.children {
                    if let docx_rs::ParagraphChild::Run(run) = child {
                        for child in run.children {
                            if let docx_rs::RunChild::Text(t) = child {
                                content.push_str(&t.text);
                            }
                        }
                    }
                }
                content.push('\n');
            }
        }

        Ok(ParsedDocument {
            file_type: FileType::Docx,
            pages: vec![PageContent {
                page_number: None,
                content,
            }],
        })
    }

    /// Parse plain text or markdown
    fn parse_text(data: &[u8], file_type: FileType) -> ParsedDocument {
        ParsedDocument {
            file_type,
            pages: vec![PageContent {
                page_number: None,
                content: String::from_utf8_lossy(data).to_string(),
            }],
        }
    }
}
