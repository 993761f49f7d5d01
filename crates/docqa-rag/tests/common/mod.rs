#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use docqa_core::chunker::Chunker;
use docqa_core::config::ChunkingConfig;
use docqa_core::traits::{Embedder, Generator, VectorIndex};
use docqa_core::types::{Generation, GenerationRequest, StopReason};
use docqa_embed::HashEmbedder;
use docqa_rag::{AnswerGenerator, AnswerSettings, Ingestor};
use docqa_vector::InMemoryIndex;
use parking_lot::Mutex;

pub const DIM: usize = 384;

pub const PITCH_DECK: &str = "SmartAudit AI helps fintech startups audit transactions in real-time using LLMs. \
It detects anomalies via pattern learning and integrates with banking APIs such as Plaid and Yodlee. \
Target users are fintech CTOs, auditors, and regulators. The RegTech market is projected at $21B by 2027. \
Business model: SaaS subscription. Funding ask: we are raising $1M seed funding to grow the team.";

/// Replies with a fixed script and records every prompt it sees.
pub struct ScriptedGenerator {
    reply: Box<dyn Fn(&str) -> anyhow::Result<String> + Send + Sync>,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedGenerator {
    pub fn new(reply: impl Fn(&str) -> anyhow::Result<String> + Send + Sync + 'static) -> Self {
        Self { reply: Box::new(reply), calls: AtomicUsize::new(0), prompts: Mutex::new(Vec::new()), delay: None }
    }

    pub fn fixed(text: &'static str) -> Self {
        Self::new(move |_| Ok(text.to_string()))
    }

    pub fn failing(msg: &'static str) -> Self {
        Self::new(move |_| Err(anyhow::anyhow!(msg)))
    }

    pub fn slow(delay: Duration) -> Self {
        let mut g = Self::fixed("late answer");
        g.delay = Some(delay);
        g
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Generator for ScriptedGenerator {
    fn generate(&self, request: &GenerationRequest) -> anyhow::Result<Generation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(request.prompt.clone());
        if let Some(d) = self.delay {
            std::thread::sleep(d);
        }
        let text = (self.reply)(&request.prompt)?;
        Ok(Generation { tokens_generated: text.split_whitespace().count(), text, stop_reason: StopReason::EndOfSequence })
    }
}

pub fn embedder() -> Arc<dyn Embedder> {
    Arc::new(HashEmbedder::new(DIM))
}

pub fn index() -> Arc<dyn VectorIndex> {
    Arc::new(InMemoryIndex::new(DIM))
}

pub fn ingestor(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Ingestor {
    let chunker = Chunker::new(ChunkingConfig::default()).expect("chunker");
    Ingestor::new(chunker, embedder, index)
}

pub fn answers(
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    generator: Arc<ScriptedGenerator>,
    settings: AnswerSettings,
) -> AnswerGenerator {
    AnswerGenerator::new(embedder, index, generator, settings)
}

/// A minimal PDF with one Helvetica page per entry; `None` leaves that page without a MediaBox.
pub fn pdf_bytes(pages: &[(Option<&str>, &str)]) -> Vec<u8> {
    let n = pages.len();
    let font_id = 3 + n;
    let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", 3 + i)).collect();
    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), n),
    ];
    for (i, (media_box, _)) in pages.iter().enumerate() {
        let media_box = media_box.map(|b| format!(" /MediaBox {b}")).unwrap_or_default();
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R{media_box} /Resources << /Font << /F1 {font_id} 0 R >> >> /Contents {} 0 R >>",
            font_id + 1 + i
        ));
    }
    objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string());
    for (_, text) in pages {
        let content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
        objects.push(format!("<< /Length {} >>\nstream\n{content}\nendstream", content.len()));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, obj) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend(format!("{} 0 obj\n{obj}\nendobj\n", i + 1).as_bytes());
    }
    let xref = out.len();
    out.extend(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for off in offsets {
        out.extend(format!("{off:010} 00000 n \n").as_bytes());
    }
    out.extend(
        format!("trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n", objects.len() + 1).as_bytes(),
    );
    out
}

pub const LETTER: Option<&str> = Some("[0 0 612 792]");
