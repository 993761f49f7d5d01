//! docqa-llm
//!
//! Local answer generation: a quantized GGUF llama-family model on candle,
//! greedy or seeded sampling, stop sequences and a token budget.

mod llama;
pub mod stop;

use anyhow::Result;
use std::sync::Arc;

use docqa_core::config::GenerationConfig;
use docqa_core::traits::Generator;

pub use llama::LlamaGenerator;
pub use stop::StopMatcher;

pub fn load_generator(cfg: &GenerationConfig) -> Result<Arc<dyn Generator>> {
    Ok(Arc::new(LlamaGenerator::load(cfg)?))
}
