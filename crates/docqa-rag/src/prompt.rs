/// Returned when retrieval finds nothing; the model is not invoked.
pub const FALLBACK_ANSWER: &str = "I couldn't find relevant information in the uploaded documents.";

/// Phrase the model is instructed to use when the context lacks the answer.
pub const UNKNOWN_ANSWER: &str = "I don't have that information.";

/// Prefix of the rendered text for a failed query.
pub const ERROR_PREFIX: &str = "Error while generating answer: ";

/// Grounding-constrained prompt around an assembled context block.
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a helpful assistant. Use ONLY the following context to answer the question.\n\
         If the answer is not found in the context, say: \"{UNKNOWN_ANSWER}\"\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         Question: {question}\n\
         Answer:"
    )
}
