pub mod document_splicer;
pub mod fallback_locator;
pub mod llm_service;
pub mod prompt_assembler;
pub mod text_extractor;

pub use document_splicer::{DocumentSplicer, InsertionTier, SpliceOptions};
pub use fallback_locator::FallbackLocator;
pub use llm_service::{ChatBackend, ChatMessage, ChatRole, LlmService};
pub use prompt_assembler::PromptAssembler;
pub use text_extractor::{extract_text, DocumentFormat};
