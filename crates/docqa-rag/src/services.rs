use anyhow::Result;
use std::sync::Arc;

use docqa_core::chunker::Chunker;
use docqa_core::config::AppConfig;
use docqa_core::traits::{Embedder, Generator, VectorIndex};

use crate::answer::{AnswerGenerator, AnswerSettings};
use crate::eval::Evaluator;
use crate::history::ChatLog;
use crate::ingest::Ingestor;

/// Long-lived backend handles, built once per process from validated settings.
pub struct Services {
    settings: AppConfig,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl Services {
    /// Load the embedder and get-or-create the index collection.
    pub async fn open(settings: AppConfig) -> Result<Self> {
        let embedding = settings.embedding.clone();
        let embedder = tokio::task::spawn_blocking(move || docqa_embed::load_embedder(&embedding)).await??;
        let index = docqa_vector::open_index(&settings.index, embedder.dim()).await?;
        Ok(Self { settings, embedder, index })
    }

    pub fn settings(&self) -> &AppConfig {
        &self.settings
    }

    pub fn embedder(&self) -> Arc<dyn Embedder> {
        Arc::clone(&self.embedder)
    }

    pub fn index(&self) -> Arc<dyn VectorIndex> {
        Arc::clone(&self.index)
    }

    pub fn ingestor(&self) -> Result<Ingestor> {
        let chunker = Chunker::new(self.settings.chunking)?;
        Ok(Ingestor::new(chunker, self.embedder(), self.index()))
    }

    pub fn answer_generator(&self, generator: Arc<dyn Generator>) -> AnswerGenerator {
        AnswerGenerator::new(self.embedder(), self.index(), generator, AnswerSettings::from_config(&self.settings))
    }

    /// Load the configured GGUF model and wire it into an answer generator.
    pub async fn load_answer_generator(&self) -> Result<AnswerGenerator> {
        let generation = self.settings.generation.clone();
        let generator = tokio::task::spawn_blocking(move || docqa_llm::load_generator(&generation)).await??;
        Ok(self.answer_generator(generator))
    }

    pub fn evaluator(&self, answers: Arc<AnswerGenerator>) -> Evaluator {
        Evaluator::new(answers, self.embedder(), self.settings.evaluation.threshold)
    }

    pub fn chat_log(&self) -> Result<ChatLog> {
        ChatLog::open(&self.settings.history.dir)
    }
}
