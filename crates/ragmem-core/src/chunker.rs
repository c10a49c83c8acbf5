//! Splits raw text into overlapping segments for embedding and retrieval.
//!
//! Two strategies: sliding word windows with a fixed overlap, and greedy
//! sentence packing up to a word budget. `chunk_with_metadata` attaches the
//! positional metadata the index stores alongside each chunk.

use crate::error::{Error, Result};
use crate::types::Chunk;

/// Word-window chunker. `overlap` must stay below `chunk_size`.
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
}

impl TextChunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Config("chunk_size must be positive".to_string()));
        }
        if overlap >= chunk_size {
            return Err(Error::Config(format!(
                "overlap ({overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, overlap })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Sliding windows of `chunk_size` words advancing by
    /// `chunk_size - overlap`; the final window may be shorter.
    ///
    /// Text with at most `chunk_size` words yields a single chunk equal to
    /// the whitespace-normalized input. Blank input yields nothing.
    pub fn chunk_by_words(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return Vec::new();
        }
        if words.len() <= self.chunk_size {
            return vec![words.join(" ")];
        }
        let step = self.chunk_size - self.overlap;
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + self.chunk_size).min(words.len());
            chunks.push(words[start..end].join(" "));
            if end >= words.len() {
                break;
            }
            start += step;
        }
        chunks
    }

    /// Greedy sentence packing: close the current chunk when adding the next
    /// sentence would push it past `max_words`. A single sentence longer than
    /// `max_words` is kept whole, never split mid-sentence.
    pub fn chunk_by_sentences(&self, text: &str, max_words: usize) -> Vec<String> {
        let sentences = split_sentences(text);
        if sentences.is_empty() {
            return Vec::new();
        }
        let mut chunks = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut current_words = 0usize;
        for sentence in sentences {
            let sentence_words = sentence.split_whitespace().count();
            if current_words + sentence_words > max_words && !current.is_empty() {
                chunks.push(current.join(" "));
                current.clear();
                current_words = 0;
            }
            current.push(sentence);
            current_words += sentence_words;
        }
        if !current.is_empty() {
            chunks.push(current.join(" "));
        }
        chunks
    }

    /// Word chunking plus per-chunk id, 0-based position, and word/char
    /// counts. Ids hash the source text, so re-ingesting an identical
    /// document produces the same ids.
    pub fn chunk_with_metadata(&self, text: &str) -> Vec<Chunk> {
        let doc_key = blake3::hash(text.as_bytes()).to_hex().to_string();
        self.chunk_by_words(text)
            .into_iter()
            .enumerate()
            .map(|(position, chunk_text)| Chunk {
                id: format!("{}:{}", &doc_key[..16], position),
                word_count: chunk_text.split_whitespace().count(),
                char_count: chunk_text.chars().count(),
                position,
                text: chunk_text,
            })
            .collect()
    }
}

/// Split at `.`, `!`, or `?` followed by whitespace. The terminator stays
/// with its sentence; the separating whitespace is dropped.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.trim().chars().peekable();
    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_some_and(|n| n.is_whitespace()) {
            while chars.peek().is_some_and(|n| n.is_whitespace()) {
                chars.next();
            }
            sentences.push(std::mem::take(&mut current));
        }
    }
    let tail = current.trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}
