mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use docqa_core::types::Document;
use docqa_rag::{AnswerPhase, AnswerSettings, ERROR_PREFIX, FALLBACK_ANSWER};

#[tokio::test]
async fn empty_index_returns_exact_fallback_without_calling_model() {
    let generator = Arc::new(ScriptedGenerator::fixed("should never be used"));
    let qa = answers(embedder(), index(), generator.clone(), AnswerSettings::default());

    for question in ["How much funding is being asked for?", "", "What is the audit API endpoint?"] {
        assert_eq!(qa.generate_answer(question).await, FALLBACK_ANSWER);
    }
    let answer = qa.answer("anything").await.expect("answer");
    assert!(answer.is_fallback());
    assert!(answer.sources.is_empty());
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn funding_question_is_answered_from_the_pitch_deck() {
    let (emb, idx) = (embedder(), index());
    ingestor(emb.clone(), idx.clone())
        .ingest_document(&Document::new("smartaudit.pdf", PITCH_DECK))
        .await
        .expect("ingest");

    let generator = Arc::new(ScriptedGenerator::new(|prompt| {
        Ok(if prompt.contains("$1M seed funding") {
            "  The company is raising\n$1M   seed funding.\n".to_string()
        } else {
            "I don't have that information.".to_string()
        })
    }));
    let qa = answers(emb, idx, generator.clone(), AnswerSettings::default());

    let answer = qa.answer("How much funding is being asked for?").await.expect("answer");
    assert_eq!(answer.path, AnswerPhase::Generating);
    assert!(answer.sources[0].text.contains("$1M"));
    assert_eq!(answer.sources[0].source, "smartaudit.pdf");
    assert_eq!(answer.text, "The company is raising $1M seed funding.");
    assert!(!answer.text.contains(FALLBACK_ANSWER));
    assert_eq!(generator.call_count(), 1);

    let prompt = generator.prompts.lock()[0].clone();
    assert!(prompt.contains("Question: How much funding is being asked for?\nAnswer:"));
    assert!(prompt.contains("Context:\nSmartAudit AI helps"));
}

#[tokio::test]
async fn context_is_cut_to_budget_and_top_k_respected() {
    let (emb, idx) = (embedder(), index());
    let ing = ingestor(emb.clone(), idx.clone());
    for i in 0..6 {
        let text = format!("document {i} talks about funding rounds {}", "filler ".repeat(200));
        ing.ingest_document(&Document::new(format!("d{i}.pdf"), text)).await.expect("ingest");
    }
    let generator = Arc::new(ScriptedGenerator::fixed("ok"));
    let settings = AnswerSettings { top_k: 2, max_context_chars: 500, ..AnswerSettings::default() };
    let qa = answers(emb, idx, generator.clone(), settings);

    let answer = qa.answer("funding rounds").await.expect("answer");
    assert_eq!(answer.sources.len(), 2);
    let prompt = generator.prompts.lock()[0].clone();
    let context = prompt
        .split("Context:\n")
        .nth(1)
        .and_then(|rest| rest.split("\n\nQuestion:").next())
        .expect("context block");
    assert!(context.chars().count() <= 500);
}

#[tokio::test]
async fn model_failure_is_rendered_with_error_prefix() {
    let (emb, idx) = (embedder(), index());
    ingestor(emb.clone(), idx.clone())
        .ingest_document(&Document::new("a.pdf", PITCH_DECK))
        .await
        .expect("ingest");
    let generator = Arc::new(ScriptedGenerator::failing("model exploded"));
    let qa = answers(emb, idx, generator, AnswerSettings::default());

    let text = qa.generate_answer("What does SmartAudit AI do?").await;
    assert!(text.starts_with(ERROR_PREFIX), "got: {text}");
    assert!(text.contains("model exploded"));
    // the next query is independent of the failure
    assert!(qa.generate_answer("What does SmartAudit AI do?").await.starts_with(ERROR_PREFIX));
}

#[tokio::test]
async fn slow_generation_times_out() {
    let (emb, idx) = (embedder(), index());
    ingestor(emb.clone(), idx.clone())
        .ingest_document(&Document::new("a.pdf", PITCH_DECK))
        .await
        .expect("ingest");
    let generator = Arc::new(ScriptedGenerator::slow(Duration::from_millis(300)));
    let settings = AnswerSettings { timeout: Some(Duration::from_millis(20)), ..AnswerSettings::default() };
    let qa = answers(emb, idx, generator, settings);

    let text = qa.generate_answer("What does SmartAudit AI do?").await;
    assert!(text.starts_with(ERROR_PREFIX), "got: {text}");
    assert!(text.contains("timed out"));
}
