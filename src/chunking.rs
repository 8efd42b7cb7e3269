//! Chunking utilities for splitting documents into overlapping word windows.
//!
//! A document becomes a sequence of windows of at most `max_words`
//! whitespace-separated words. Consecutive windows share `overlap` words so
//! that a phrase straddling a boundary is still found in one fragment.

/// Default window size in words.
pub const DEFAULT_CHUNK_WORDS: usize = 500;

/// Default number of words shared between adjacent windows.
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// Chunking settings used when building a collection.
///
/// # Examples
///
/// ```
/// use ragshelf::chunking::{ChunkingConfig, DEFAULT_CHUNK_WORDS};
///
/// let config = ChunkingConfig::default();
/// assert_eq!(config.max_words, DEFAULT_CHUNK_WORDS);
/// assert_eq!(config.step(), 450);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Maximum words per chunk.
    pub max_words: usize,
    /// Words repeated at the start of each chunk after the first.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_words: DEFAULT_CHUNK_WORDS,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkingConfig {
    /// How far the window start moves between chunks. Never zero, so a
    /// misconfigured `overlap >= max_words` still terminates.
    pub fn step(&self) -> usize {
        self.max_words.max(1).saturating_sub(self.overlap).max(1)
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        chunk_text(text, self.max_words, self.overlap)
    }
}

/// Split text into word windows joined by single spaces.
///
/// Returns an empty vector when the text has no words. The last window may
/// be shorter than `max_words`.
///
/// # Examples
///
/// ```
/// use ragshelf::chunking::chunk_text;
///
/// assert!(chunk_text("   \n\t", 500, 50).is_empty());
///
/// let chunks = chunk_text("a b c d e f g", 3, 1);
/// assert_eq!(chunks, vec!["a b c", "c d e", "e f g"]);
/// ```
pub fn chunk_text(text: &str, max_words: usize, overlap: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let max_words = max_words.max(1);
    let step = ChunkingConfig { max_words, overlap }.step();
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + max_words).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start += step;
    }

    chunks
}
