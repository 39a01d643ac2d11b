//! Document normalization into bounded, overlapping chunks.
//!
//! [`RecursiveChunker`] splits on the coarsest boundary that helps, in order:
//! paragraph break, line break, sentence period, space. Pieces that fit are
//! merged greedily up to `chunk_size` characters; pieces that do not fit are
//! re-split with the next separator, and once separators run out the text is
//! cut into raw character windows.
//!
//! All lengths are counted in `char`s, so multi-byte text never splits inside
//! a code point.

use std::collections::VecDeque;

use tracing::debug;

use crate::config::RagConfig;
use crate::document::{Chunk, RawDocument};

/// Separators in priority order.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ".", " "];

/// Splits documents hierarchically into overlapping chunks.
///
/// # Example
///
/// ```rust,ignore
/// use lpa_rag::{RawDocument, RecursiveChunker};
///
/// let chunker = RecursiveChunker::new(500, 50);
/// let chunks = chunker.normalize(&RawDocument::new("home-loan", text));
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    min_document_chars: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker` that drops documents under 100 characters.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` - maximum number of characters per chunk
    /// * `chunk_overlap` - number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap, min_document_chars: 100 }
    }

    /// Create a chunker from a validated [`RagConfig`].
    pub fn from_config(config: &RagConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            min_document_chars: config.min_document_chars,
        }
    }

    /// Override the minimum trimmed document length.
    pub fn with_min_document_chars(mut self, chars: usize) -> Self {
        self.min_document_chars = chars;
        self
    }

    /// Split a document into trimmed, non-empty chunks.
    ///
    /// Returns an empty `Vec` when the trimmed text is shorter than the
    /// minimum document length. Chunk indices are contiguous from 0.
    pub fn normalize(&self, document: &RawDocument) -> Vec<Chunk> {
        let text = document.text.trim();
        let length = char_len(text);
        if length < self.min_document_chars {
            debug!(document.id = %document.id, length, "document below minimum length, dropped");
            return Vec::new();
        }

        self.split_text(text)
            .iter()
            .map(|raw| raw.trim())
            .filter(|raw| !raw.is_empty())
            .enumerate()
            .map(|(index, text)| Chunk::new(document.id.as_str(), index, text))
            .collect()
    }

    /// Split raw text into untrimmed pieces of at most `chunk_size` characters.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &SEPARATORS)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let Some(position) = separators.iter().position(|sep| text.contains(sep)) else {
            return self.split_by_chars(text);
        };
        let separator = separators[position];
        let remaining = &separators[position + 1..];

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) <= self.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge(&pending));
                pending.clear();
            }
            chunks.extend(self.split_recursive(piece, remaining));
        }

        if !pending.is_empty() {
            chunks.extend(self.merge(&pending));
        }

        chunks
    }

    /// Greedily join pieces that each fit in `chunk_size`.
    ///
    /// When a chunk is emitted, its trailing pieces totalling at most
    /// `chunk_overlap` characters start the next chunk.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            let length = char_len(piece);
            if !window.is_empty() && total + length > self.chunk_size {
                chunks.push(window.iter().map(|(text, _)| *text).collect::<String>());
                while let Some(&(_, front)) = window.front() {
                    if total <= self.chunk_overlap && total + length <= self.chunk_size {
                        break;
                    }
                    total -= front;
                    window.pop_front();
                }
            }
            window.push_back((piece, length));
            total += length;
        }

        if !window.is_empty() {
            chunks.push(window.iter().map(|(text, _)| *text).collect::<String>());
        }

        chunks
    }

    /// Cut text with no usable separator into raw character windows.
    ///
    /// Consecutive windows overlap by exactly `chunk_overlap` characters.
    fn split_by_chars(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let step = self.chunk_size.saturating_sub(self.chunk_overlap).max(1);
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            chunks.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += step;
        }

        chunks
    }
}

impl Default for RecursiveChunker {
    fn default() -> Self {
        Self::from_config(&RagConfig::default())
    }
}

/// Split text at a separator while keeping the separator attached to the preceding segment.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
