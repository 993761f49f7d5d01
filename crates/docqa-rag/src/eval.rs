//! Answer-quality evaluation by embedding similarity.
//!
//! Each case is answered through the full pipeline; the answer and the
//! expected text are embedded with the same embedder and compared by cosine
//! similarity. A case passes when similarity >= threshold.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use docqa_core::traits::Embedder;

use crate::answer::AnswerGenerator;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalCase {
    pub question: String,
    pub expected: String,
}

impl EvalCase {
    pub fn new(question: impl Into<String>, expected: impl Into<String>) -> Self {
        Self { question: question.into(), expected: expected.into() }
    }
}

/// Ground-truth pairs for the SmartAudit sample documents.
pub fn default_cases() -> Vec<EvalCase> {
    [
        (
            "What does SmartAudit AI do?",
            "SmartAudit AI helps fintech startups audit transactions in real-time using LLMs. It detects anomalies via pattern learning, integrates with banking APIs (Plaid, Yodlee), and delivers explainable reports for compliance.",
        ),
        ("Who are the target users of SmartAudit AI?", "Fintech CTOs, auditors, and regulators."),
        ("What is the projected RegTech market size?", "$21B by 2027."),
        ("How much funding is being asked for?", "$1M seed funding."),
        ("What business model is used?", "SaaS subscription model."),
        ("What is the audit API endpoint?", "/audit/transactions"),
        (
            "What does the API response contain?",
            "It contains an audit_score and a list of flags such as suspicious_vendor or duplicate_entry.",
        ),
        (
            "What are the company\u{2019}s cultural values?",
            "Think customer-first, move fast, stay grounded, document what you learn.",
        ),
        ("What is step 1 of onboarding?", "GitHub access and repo clone."),
        ("What model was evaluated?", "Mistral-7B-Instruct."),
        ("What hallucination rate was reported?", "5.2%"),
        (
            "What is the conclusion from the eval report?",
            "Mistral-7B-Instruct offers the best balance for edge deployment.",
        ),
    ]
    .into_iter()
    .map(|(q, e)| EvalCase::new(q, e))
    .collect()
}

/// Cases from a JSON array of `{ "question", "expected" }` objects.
pub fn load_cases(path: &Path) -> Result<Vec<EvalCase>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing eval cases in {}", path.display()))
}

/// Cosine similarity; 0.0 when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na * nb)
}

/// Inclusive: a similarity equal to the threshold passes.
pub fn is_pass(similarity: f32, threshold: f32) -> bool {
    similarity >= threshold
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalRow {
    pub question: String,
    pub expected: String,
    pub answer: String,
    pub similarity: f32,
    pub pass: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalReport {
    pub threshold: f32,
    pub rows: Vec<EvalRow>,
    pub passed: usize,
    pub mean_similarity: f32,
}

impl EvalReport {
    fn from_rows(rows: Vec<EvalRow>, threshold: f32) -> Self {
        let passed = rows.iter().filter(|r| r.pass).count();
        let mean_similarity = if rows.is_empty() {
            0.0
        } else {
            rows.iter().map(|r| r.similarity).sum::<f32>() / rows.len() as f32
        };
        Self { threshold, rows, passed, mean_similarity }
    }

    pub fn total(&self) -> usize {
        self.rows.len()
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
    }
}

pub struct Evaluator {
    answers: Arc<AnswerGenerator>,
    embedder: Arc<dyn Embedder>,
    threshold: f32,
}

impl Evaluator {
    pub fn new(answers: Arc<AnswerGenerator>, embedder: Arc<dyn Embedder>, threshold: f32) -> Self {
        Self { answers, embedder, threshold }
    }

    pub async fn run(&self, cases: &[EvalCase]) -> Result<EvalReport> {
        let mut rows = Vec::with_capacity(cases.len());
        for case in cases {
            let answer = self.answers.generate_answer(&case.question).await;
            let embedder = Arc::clone(&self.embedder);
            let pair = vec![case.expected.clone(), answer.clone()];
            let vectors = tokio::task::spawn_blocking(move || embedder.embed_batch(&pair)).await??;
            let similarity = match vectors.as_slice() {
                [expected, got] => cosine_similarity(expected, got),
                _ => anyhow::bail!("embedder returned {} vectors for 2 texts", vectors.len()),
            };
            let pass = is_pass(similarity, self.threshold);
            tracing::info!(question = %case.question, similarity, pass, "evaluated");
            rows.push(EvalRow {
                question: case.question.clone(),
                expected: case.expected.clone(),
                answer,
                similarity,
                pass,
            });
        }
        Ok(EvalReport::from_rows(rows, self.threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_inclusive() {
        assert!(is_pass(0.75, 0.75));
        assert!(!is_pass(0.7499, 0.75));
        assert!(is_pass(0.9, 0.75));
    }

    #[test]
    fn cosine_of_parallel_orthogonal_and_zero_vectors() {
        assert!((cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn twelve_builtin_cases() {
        let cases = default_cases();
        assert_eq!(cases.len(), 12);
        assert!(cases.iter().any(|c| c.expected == "$1M seed funding."));
    }

    #[test]
    fn report_summary() {
        let row = |s: f32| EvalRow { question: "q".into(), expected: "e".into(), answer: "a".into(), similarity: s, pass: is_pass(s, 0.75) };
        let report = EvalReport::from_rows(vec![row(1.0), row(0.5)], 0.75);
        assert_eq!((report.passed, report.total()), (1, 2));
        assert!((report.mean_similarity - 0.75).abs() < 1e-6);
    }
}
