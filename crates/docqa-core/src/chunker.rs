//! Overlapping word-window chunking.
//!
//! Text is split on whitespace only; sentence and paragraph boundaries are
//! ignored. Windows hold `chunk_size` words and start `chunk_size - overlap`
//! words apart; the last window is the first one that reaches the end of the
//! text, so a document of N words yields `ceil((N - overlap) / step)` chunks
//! (one chunk when N <= chunk_size, none when the text is blank).

use crate::config::ChunkingConfig;
use crate::error::Result;
use crate::types::{Chunk, Document};

/// Split `text` into overlapping word windows.
///
/// Fails with `Error::InvalidConfig` when `overlap >= chunk_size` or
/// `chunk_size == 0`, since the window would never advance.
pub fn chunk(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    ChunkingConfig { chunk_size, overlap }.validate()?;
    Ok(split_words(text, chunk_size, overlap))
}

fn split_words(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let step = chunk_size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let end = (start + chunk_size).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end >= words.len() {
            break;
        }
        start += step;
    }
    chunks
}

/// Chunker bound to validated parameters.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        split_words(text, self.config.chunk_size, self.config.overlap)
    }

    /// Chunks of one document with stable ids and positions.
    pub fn chunk_document(&self, doc: &Document) -> Vec<Chunk> {
        self.split(&doc.text)
            .into_iter()
            .enumerate()
            .map(|(i, text)| Chunk::new(&doc.name, i, text))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    fn expected_count(n: usize, c: usize, o: usize) -> usize {
        if n == 0 {
            0
        } else if n <= c {
            1
        } else {
            (n - o).div_ceil(c - o)
        }
    }

    #[test]
    fn count_matches_formula_across_sizes() {
        for &(c, o) in &[(4usize, 2usize), (5, 0), (7, 3), (10, 9), (700, 150)] {
            for n in [0usize, 1, 3, 4, 5, 6, 9, 10, 11, 23, 701, 1500] {
                let chunks = chunk(&words(n), c, o).expect("valid params");
                assert_eq!(chunks.len(), expected_count(n, c, o), "n={n} c={c} o={o}");
            }
        }
    }

    #[test]
    fn consecutive_chunks_share_exactly_overlap_words() {
        let (c, o) = (6, 2);
        let chunks = chunk(&words(20), c, o).expect("chunks");
        for pair in chunks.windows(2) {
            let a: Vec<&str> = pair[0].split(' ').collect();
            let b: Vec<&str> = pair[1].split(' ').collect();
            assert!(a.len() <= c && b.len() <= c);
            assert_eq!(&a[a.len() - o..], &b[..o]);
        }
        let last = chunks.last().expect("last chunk");
        assert!(last.ends_with("w19"));
    }

    #[test]
    fn short_text_is_one_chunk_with_normalized_whitespace() {
        let chunks = chunk("  alpha\n\nbravo\tcharlie  ", 700, 150).expect("chunks");
        assert_eq!(chunks, vec!["alpha bravo charlie".to_string()]);
    }

    #[test]
    fn blank_text_yields_no_chunks() {
        assert!(chunk(" \n\t ", 10, 2).expect("chunks").is_empty());
    }

    #[test]
    fn non_advancing_window_is_rejected() {
        assert!(matches!(chunk("a b c", 3, 3), Err(Error::InvalidConfig(_))));
        assert!(matches!(chunk("a b c", 3, 5), Err(Error::InvalidConfig(_))));
        assert!(matches!(chunk("a b c", 0, 0), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn document_chunks_carry_source_and_stable_ids() {
        let chunker = Chunker::new(ChunkingConfig { chunk_size: 3, overlap: 1 }).expect("chunker");
        let doc = Document::new("pitch.pdf", words(7));
        let first = chunker.chunk_document(&doc);
        let second = chunker.chunk_document(&doc);
        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
        assert!(first.iter().all(|c| c.source == "pitch.pdf"));
        assert_eq!(first.iter().map(|c| c.chunk_index).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_ne!(first[0].id, first[1].id);
    }
}
