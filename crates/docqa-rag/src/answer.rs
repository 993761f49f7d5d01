//! Question answering over the index.
//!
//! `answer` walks `Idle -> Retrieving -> (NoContext | Generating) -> Done`.
//! An empty retrieval short-circuits to [`FALLBACK_ANSWER`] without touching
//! the model. Embedding and generation run on tokio's blocking pool.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use docqa_core::config::AppConfig;
use docqa_core::context::assemble;
use docqa_core::traits::{Embedder, Generator, VectorIndex};
use docqa_core::types::{GenerationRequest, RetrievedChunk};

use crate::error::RagError;
use crate::prompt::{build_prompt, ERROR_PREFIX, FALLBACK_ANSWER};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerPhase {
    Idle,
    Retrieving,
    NoContext,
    Generating,
    Done,
}

impl fmt::Display for AnswerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Retrieving => "retrieving",
            Self::NoContext => "no_context",
            Self::Generating => "generating",
            Self::Done => "done",
        };
        f.write_str(s)
    }
}

/// Result of a successful query.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    /// Retrieved chunks in rank order; empty for the fallback.
    pub sources: Vec<RetrievedChunk>,
    /// The branch taken: `NoContext` or `Generating`.
    pub path: AnswerPhase,
}

impl Answer {
    pub fn is_fallback(&self) -> bool {
        self.path == AnswerPhase::NoContext
    }
}

#[derive(Debug, Clone)]
pub struct AnswerSettings {
    pub top_k: usize,
    pub max_context_chars: usize,
    pub max_tokens: usize,
    pub stop: Vec<String>,
    pub timeout: Option<Duration>,
}

impl AnswerSettings {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            top_k: cfg.retrieval.top_k,
            max_context_chars: cfg.retrieval.max_context_chars,
            max_tokens: cfg.generation.max_tokens,
            stop: cfg.generation.stop.clone(),
            timeout: cfg.generation.timeout_secs.map(Duration::from_secs),
        }
    }
}

impl Default for AnswerSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

pub struct AnswerGenerator {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    generator: Arc<dyn Generator>,
    settings: AnswerSettings,
}

impl AnswerGenerator {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        generator: Arc<dyn Generator>,
        settings: AnswerSettings,
    ) -> Self {
        Self { embedder, index, generator, settings }
    }

    pub fn settings(&self) -> &AnswerSettings {
        &self.settings
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub async fn answer(&self, question: &str) -> Result<Answer, RagError> {
        let mut phase = AnswerPhase::Idle;
        tracing::debug!(%phase, question, "query received");

        phase = AnswerPhase::Retrieving;
        let sources = self.retrieve(question).await?;
        tracing::debug!(%phase, hits = sources.len(), "retrieval finished");

        if sources.is_empty() {
            phase = AnswerPhase::NoContext;
            tracing::info!(%phase, "no chunks retrieved, returning fallback");
            return Ok(Answer { text: FALLBACK_ANSWER.to_string(), sources, path: phase });
        }

        phase = AnswerPhase::Generating;
        let context = assemble(&sources.iter().map(|c| c.text.as_str()).collect::<Vec<_>>(), self.settings.max_context_chars);
        let request = GenerationRequest {
            prompt: build_prompt(&context, question),
            max_tokens: self.settings.max_tokens,
            stop: self.settings.stop.clone(),
        };
        tracing::debug!(%phase, context_chars = context.chars().count(), "invoking model");
        let raw = self.generate(request).await?;
        let text = clean_answer(&raw);

        tracing::debug!(phase = %AnswerPhase::Done, chars = text.len(), "answer ready");
        Ok(Answer { text, sources, path: phase })
    }

    /// `answer` rendered to text; failures become `"Error while generating answer: ..."`.
    pub async fn generate_answer(&self, question: &str) -> String {
        match self.answer(question).await {
            Ok(answer) => answer.text,
            Err(e) => {
                tracing::warn!(error = %e, "query failed");
                render_error(&e)
            }
        }
    }

    async fn retrieve(&self, question: &str) -> Result<Vec<RetrievedChunk>, RagError> {
        let embedder = Arc::clone(&self.embedder);
        let q = question.to_string();
        let embedding = tokio::task::spawn_blocking(move || embedder.embed_one(&q))
            .await?
            .map_err(RagError::embedding)?;
        self.index
            .query(&embedding, self.settings.top_k)
            .await
            .map_err(RagError::retrieval)
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, RagError> {
        let generator = Arc::clone(&self.generator);
        let handle = tokio::task::spawn_blocking(move || generator.generate(&request));
        let joined = match self.settings.timeout {
            // on expiry the blocking call keeps running and releases the model when done
            Some(limit) => tokio::time::timeout(limit, handle)
                .await
                .map_err(|_| RagError::Timeout(limit.as_millis()))?,
            None => handle.await,
        };
        let generation = joined?.map_err(RagError::generation)?;
        tracing::debug!(tokens = generation.tokens_generated, stop = ?generation.stop_reason, "model returned");
        Ok(generation.text)
    }
}

pub fn render_error(e: &RagError) -> String {
    format!("{ERROR_PREFIX}{e}")
}

/// Collapse newlines and runs of whitespace to single spaces, then trim.
pub fn clean_answer(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
