//! Link `[n]` markers in a generated answer back to the context chunks

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{DocumentId, RetrievedDocument};

static MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(\d{1,3})\]").expect("Invalid regex"));

/// Identifiers cited by the answer, in order of first mention.
///
/// Markers are 1-based positions into `docs`; out-of-range markers are
/// ignored.
pub fn link_citations(answer: &str, docs: &[RetrievedDocument]) -> Vec<DocumentId> {
    let mut cited: Vec<DocumentId> = Vec::new();

    for cap in MARKER.captures_iter(answer) {
        let Some(n) = cap.get(1).and_then(|m| m.as_str().parse::<usize>().ok()) else {
            continue;
        };
        let Some(doc) = n.checked_sub(1).and_then(|i| docs.get(i)) else {
            tracing::debug!("Answer cites [{}] but only {} sources were given", n, docs.len());
            continue;
        };
        if !cited.contains(&doc.id) {
            cited.push(doc.id.clone());
        }
    }

    cited
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chunk, FileType};

    fn docs() -> Vec<RetrievedDocument> {
        (0..3)
            .map(|i| {
                RetrievedDocument::from_chunk(
                    Chunk::new(DocumentId::new("a.pdf", i), format!("chunk {}", i), None, FileType::Pdf),
                    1.0 - i as f32 * 0.1,
                )
            })
            .collect()
    }

    #[test]
    fn test_links_markers_in_first_mention_order() {
        let cited = link_citations("Costs rose [3]. Revenue fell [1][3].", &docs());
        assert_eq!(cited, vec![DocumentId::new("a.pdf", 2), DocumentId::new("a.pdf", 0)]);
    }

    #[test]
    fn test_ignores_out_of_range_and_zero() {
        assert!(link_citations("See [0] and [9].", &docs()).is_empty());
        assert!(link_citations("No markers at all.", &docs()).is_empty());
    }
}
