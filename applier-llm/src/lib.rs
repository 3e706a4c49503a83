//! LLM integration for the applier.
//!
//! [`traits::LlmClient`] is the provider seam, [`openai::OpenAiClient`] the
//! one concrete provider, and [`cover_letter`] turns either into a cover
//! letter source that never fails.
//!
//! # Examples
//! ```no_run
//! use applier_llm::cover_letter::{CoverLetterGenerator, LlmCoverLetterWriter};
//! use applier_llm::openai::OpenAiClient;
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), applier_llm::traits::LlmError> {
//! let client = OpenAiClient::new("sk-...".into(), applier_llm::DEFAULT_OPENAI_MODEL.into())?;
//! let writer = LlmCoverLetterWriter::new(Arc::new(client), "Sam Doe");
//! let letter = writer
//!     .generate("Data Engineer", "Acme", "Build pipelines.", "Ten years of ETL.")
//!     .await;
//! assert!(!letter.is_empty());
//! # Ok(())
//! # }
//! ```
pub mod cover_letter;
pub mod openai;
pub mod traits;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
