//! Answer generation with LLM and citation handling

pub mod citation;
pub mod ollama;
pub mod prompt;

pub use citation::link_citations;
pub use ollama::OllamaClient;
pub use prompt::PromptBuilder;
