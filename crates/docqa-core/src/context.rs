//! Context assembly: ranked chunk texts joined and cut to a character budget.

/// Separator between chunks in the assembled context.
pub const CHUNK_SEPARATOR: &str = "\n\n";

/// Join chunks in rank order with a blank line and hard-cut to `max_chars`
/// characters. Higher-ranked chunks come first, so they survive the cut.
pub fn assemble<S: AsRef<str>>(chunks: &[S], max_chars: usize) -> String {
    let parts: Vec<&str> = chunks.iter().map(|c| c.as_ref()).collect();
    truncate_chars(parts.join(CHUNK_SEPARATOR), max_chars)
}

fn truncate_chars(mut text: String, max_chars: usize) -> String {
    if let Some((byte_idx, _)) = text.char_indices().nth(max_chars) {
        text.truncate(byte_idx);
    }
    text
}
