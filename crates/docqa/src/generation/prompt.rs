//! Prompt templates for grounded answers

use crate::types::RetrievedDocument;

/// Prompt builder for document questions
pub struct PromptBuilder;

impl PromptBuilder {
    /// Number the retrieved chunks `[1]..[n]` in retrieval order
    pub fn build_context(docs: &[RetrievedDocument]) -> String {
        let mut context = String::new();

        for (i, doc) in docs.iter().enumerate() {
            context.push_str(&format!(
                "[{}] {}\n\nContent:\n{}\n\n---\n\n",
                i + 1,
                Self::format_source_ref(doc),
                doc.content
            ));
        }

        context
    }

    fn format_source_ref(doc: &RetrievedDocument) -> String {
        match doc.page {
            Some(page) => format!("{}, Page {}", doc.source, page),
            None => doc.source.clone(),
        }
    }

    /// Build the full prompt with strict grounding
    pub fn build_rag_prompt(question: &str, docs: &[RetrievedDocument]) -> String {
        format!(
            r#"You are a document-grounded assistant that ONLY uses information from provided documents.

GROUNDING RULES:
1. ONLY use information that is EXPLICITLY stated in the CONTEXT below
2. If the answer is not in the context: respond with "This information is not available in the provided documents."
3. NEVER use external knowledge or make guesses beyond what is stated
4. Cite the numbered context entries you used inline, for example [1] or [2][3]

CONTEXT FROM DOCUMENTS:
{context}
QUESTION: {question}

Provide a grounded answer using ONLY the document content above:"#,
            context = Self::build_context(docs),
            question = question
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chunk, DocumentId, FileType};

    #[test]
    fn test_context_is_numbered_in_order() {
        let docs = vec![
            RetrievedDocument::from_chunk(
                Chunk::new(DocumentId::new("finance.pdf", 4), "Budget rose 5%.".into(), Some(2), FileType::Pdf),
                0.9,
            ),
            RetrievedDocument::from_chunk(
                Chunk::new(DocumentId::new("memo.txt", 0), "Hiring freeze.".into(), None, FileType::Txt),
                0.7,
            ),
        ];

        let prompt = PromptBuilder::build_rag_prompt("budget 2023", &docs);
        let first = prompt.find("[1] finance.pdf, Page 2").unwrap();
        let second = prompt.find("[2] memo.txt").unwrap();
        assert!(first < second);
        assert!(prompt.contains("QUESTION: budget 2023"));
    }
}
