//! docqa-rag
//!
//! The retrieval-augmented answer pipeline and everything around it:
//! ingestion of a PDF directory, the answer generator, the evaluation
//! harness and the chat log. [`Services`] wires them from configuration.

pub mod answer;
pub mod error;
pub mod eval;
pub mod history;
pub mod ingest;
pub mod prompt;
pub mod services;

pub use answer::{clean_answer, Answer, AnswerGenerator, AnswerPhase, AnswerSettings};
pub use error::RagError;
pub use eval::{EvalCase, EvalReport, Evaluator};
pub use history::{ChatEntry, ChatLog};
pub use ingest::{IngestReport, Ingestor};
pub use prompt::{ERROR_PREFIX, FALLBACK_ANSWER, UNKNOWN_ANSWER};
pub use services::Services;
