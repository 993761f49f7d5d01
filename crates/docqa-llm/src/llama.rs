//! Quantized llama-family (Mistral) generation from a local GGUF file.

use anyhow::{anyhow, Context, Result};
use candle_core::quantized::gguf_file;
use candle_core::{DType, Device, Tensor};
use candle_transformers::generation::{LogitsProcessor, Sampling};
use candle_transformers::models::quantized_llama::ModelWeights;
use candle_transformers::utils::apply_repeat_penalty;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::time::Instant;
use tokenizers::Tokenizer;

use docqa_core::config::GenerationConfig;
use docqa_core::error::Error;
use docqa_core::traits::Generator;
use docqa_core::types::{Generation, GenerationRequest, StopReason};
use docqa_embed::select_device;

use crate::stop::StopMatcher;

pub struct LlamaGenerator {
    // forward() mutates the KV cache
    model: Mutex<ModelWeights>,
    tokenizer: Tokenizer,
    device: Device,
    eos_ids: HashSet<u32>,
    context_window: usize,
    temperature: f64,
    top_p: Option<f64>,
    repeat_penalty: f32,
    repeat_last_n: usize,
    seed: u64,
}

impl LlamaGenerator {
    pub fn load(cfg: &GenerationConfig) -> Result<Self> {
        for (what, path) in [("model", &cfg.model_path), ("tokenizer", &cfg.tokenizer_path)] {
            if !path.is_file() {
                return Err(Error::InvalidConfig(format!("{what} file not found: {}", path.display())).into());
            }
        }
        let device = select_device();
        let start = Instant::now();

        let mut file = std::fs::File::open(&cfg.model_path)
            .with_context(|| format!("opening {}", cfg.model_path.display()))?;
        let content = gguf_file::Content::read(&mut file)
            .map_err(|e| e.with_path(&cfg.model_path))
            .context("reading GGUF header")?;
        let model = ModelWeights::from_gguf(content, &mut file, &device)?;

        let tokenizer = Tokenizer::from_file(&cfg.tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", cfg.tokenizer_path.display(), e))?;
        let mut eos_ids: HashSet<u32> = HashSet::new();
        if let Some(id) = tokenizer.token_to_id("</s>") {
            eos_ids.insert(id);
        }
        // a stop sequence that is a single token ends generation on that token
        for stop in &cfg.stop {
            if let Some(id) = tokenizer.token_to_id(stop) {
                eos_ids.insert(id);
            }
        }
        tracing::info!(
            model = %cfg.model_path.display(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "generation model loaded"
        );

        Ok(Self {
            model: Mutex::new(model),
            tokenizer,
            device,
            eos_ids,
            context_window: cfg.context_window,
            temperature: cfg.temperature,
            top_p: cfg.top_p,
            repeat_penalty: cfg.repeat_penalty,
            repeat_last_n: cfg.repeat_last_n,
            seed: cfg.seed,
        })
    }

    fn sampling(&self) -> Sampling {
        if self.temperature <= 0.0 {
            return Sampling::ArgMax;
        }
        match self.top_p {
            Some(p) => Sampling::TopP { p, temperature: self.temperature },
            None => Sampling::All { temperature: self.temperature },
        }
    }

    fn next_token(&self, model: &mut ModelWeights, input: &[u32], index_pos: usize, all: &[u32], lp: &mut LogitsProcessor) -> Result<u32> {
        let input = Tensor::new(input, &self.device)?.unsqueeze(0)?;
        let logits = model.forward(&input, index_pos)?.squeeze(0)?.to_dtype(DType::F32)?;
        let logits = if self.repeat_penalty == 1.0 || all.is_empty() {
            logits
        } else {
            let start = all.len().saturating_sub(self.repeat_last_n);
            apply_repeat_penalty(&logits, self.repeat_penalty, &all[start..])?
        };
        Ok(lp.sample(&logits)?)
    }
}

impl Generator for LlamaGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<Generation> {
        let prompt = self
            .tokenizer
            .encode(request.prompt.as_str(), true)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?
            .get_ids()
            .to_vec();
        if prompt.len() >= self.context_window {
            return Err(Error::Generation(format!(
                "prompt is {} tokens but the context window is {}",
                prompt.len(),
                self.context_window
            ))
            .into());
        }
        let budget = request.max_tokens.min(self.context_window - prompt.len());
        let stops = StopMatcher::new(request.stop.iter().cloned());
        let mut lp = LogitsProcessor::from_sampling(self.seed, self.sampling());

        let start = Instant::now();
        let mut model = self.model.lock();
        let mut all = prompt.clone();
        let mut generated: Vec<u32> = Vec::new();
        let mut stop_reason = StopReason::MaxTokens;
        let mut window = DecodeWindow::default();
        let mut scanned = String::new();

        let mut next = self.next_token(&mut model, &prompt, 0, &[], &mut lp)?;
        while generated.len() < budget {
            if self.eos_ids.contains(&next) {
                stop_reason = StopReason::EndOfSequence;
                break;
            }
            generated.push(next);
            all.push(next);
            if let Some(piece) = window.next_piece(&self.tokenizer, &generated)? {
                if stops.scan_appended(&mut scanned, &piece).is_some() {
                    stop_reason = StopReason::StopSequence;
                    break;
                }
            }
            if generated.len() == budget {
                break;
            }
            let pos = all.len() - 1;
            next = self.next_token(&mut model, &[next], pos, &all, &mut lp)?;
        }
        drop(model);

        let full = decode(&self.tokenizer, &generated)?;
        let (kept, hit) = stops.cut(&full);
        if hit {
            stop_reason = StopReason::StopSequence;
        }
        let text = kept.to_string();

        tracing::debug!(
            prompt_tokens = prompt.len(),
            tokens = generated.len(),
            ?stop_reason,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "generation finished"
        );
        Ok(Generation { text, tokens_generated: generated.len(), stop_reason })
    }
}

fn decode(tokenizer: &Tokenizer, tokens: &[u32]) -> Result<String> {
    tokenizer.decode(tokens, true).map_err(|e| anyhow!("Detokenization failed: {}", e))
}

/// Incremental detokenizer. Tokens `prev..current` were already emitted and are
/// decoded again together with the new ones so word boundaries come out right.
#[derive(Debug, Default)]
struct DecodeWindow {
    prev: usize,
    current: usize,
}

impl DecodeWindow {
    fn next_piece(&mut self, tokenizer: &Tokenizer, tokens: &[u32]) -> Result<Option<String>> {
        let emitted = decode(tokenizer, &tokens[self.prev..self.current])?;
        let text = decode(tokenizer, &tokens[self.prev..])?;
        // an incomplete UTF-8 sequence decodes to U+FFFD until the rest arrives
        if text.len() <= emitted.len() || text.ends_with('\u{fffd}') {
            return Ok(None);
        }
        let Some(piece) = text.get(emitted.len()..) else {
            return Ok(None);
        };
        self.prev = self.current;
        self.current = tokens.len();
        Ok(Some(piece.to_string()))
    }
}
