//! Boundary-aware overlapping text splitter.
//!
//! Splits document body text into chunks of at most `chunk_size` characters
//! with a nominal `overlap` between consecutive chunks. When a chunk would
//! end mid-sentence, the cut is pulled back to the last sentence terminator,
//! newline, or space inside the window — but only if that point lies past
//! the middle of the window, so chunks are never smaller than half the
//! target size.
//!
//! # Algorithm
//!
//! 1. Maintain a cursor `start` (in characters) from 0.
//! 2. Candidate window = `text[start .. start + chunk_size]`.
//! 3. If the window is not the final slice, find the last sentence
//!    terminator, newline, or space (maximum index among the three) and
//!    truncate the window there, inclusive, when the point is past
//!    `chunk_size / 2`.
//! 4. Trim the slice; keep it only if non-empty.
//! 5. Advance `start = start + chunk_size - overlap` — from the *nominal*
//!    window end, not the truncated cut. The realized overlap between
//!    consecutive chunks therefore varies with where the boundary search
//!    landed; chunk counts depend on this and it must not be "fixed" by
//!    advancing from the truncated end.
//!
//! All positions are measured in characters, not bytes, so multi-byte
//! UTF-8 input can never produce an out-of-boundary slice.

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::models::{Chunk, ChunkMetadata, Document};

/// Characters treated as sentence terminators by the boundary search.
const SENTENCE_TERMINATORS: [char; 4] = ['.', '!', '?', '。'];

/// Deterministic text splitter. Pure: no hidden state, identical input
/// yields identical output.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    overlap: usize,
}

impl TextSplitter {
    /// Create a splitter, rejecting parameter combinations that could make
    /// [`split_text`](Self::split_text) loop forever or emit empty windows.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Config("chunk_size must be > 0".to_string()));
        }
        if overlap >= chunk_size {
            return Err(Error::Config(format!(
                "overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.overlap)
    }

    /// Split text into trimmed chunks of at most `chunk_size` characters.
    ///
    /// Text no longer than `chunk_size` produces exactly one chunk (the
    /// boundary search never applies to the final slice). Empty or
    /// whitespace-only text produces zero chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        // Byte offset of each char, with a sentinel at the end, so char
        // positions can be mapped back to slice boundaries.
        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let total_chars = offsets.len() - 1;

        let mut chunks = Vec::new();
        let mut start = 0usize;

        while start < total_chars {
            let nominal_end = start + self.chunk_size;
            let end = nominal_end.min(total_chars);
            let mut slice = &text[offsets[start]..offsets[end]];

            if nominal_end < total_chars {
                if let Some(cut) = best_split_point(slice) {
                    let cut_chars = slice[..cut].chars().count();
                    if cut_chars > self.chunk_size / 2 {
                        // Keep the boundary character itself.
                        let boundary_len = slice[cut..]
                            .chars()
                            .next()
                            .map(char::len_utf8)
                            .unwrap_or(0);
                        slice = &slice[..cut + boundary_len];
                    }
                }
            }

            let trimmed = slice.trim();
            if !trimmed.is_empty() {
                chunks.push(trimmed.to_string());
            }

            if nominal_end >= total_chars {
                break;
            }
            start = nominal_end - self.overlap;
        }

        chunks
    }

    /// Split a batch of documents into chunks with provenance metadata.
    ///
    /// Documents are processed in input order; chunk indices restart at 0
    /// for each document.
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for doc in documents {
            for (i, content) in self.split_text(&doc.content).into_iter().enumerate() {
                chunks.push(Chunk {
                    content,
                    metadata: ChunkMetadata {
                        filename: doc.filename.clone(),
                        source_path: doc.source_path.clone(),
                        doc_type: doc.doc_type,
                        chunk_index: i,
                    },
                });
            }
        }

        chunks
    }
}

/// Byte index of the best split point within a window: the last sentence
/// terminator, newline, or space, whichever occurs latest.
fn best_split_point(slice: &str) -> Option<usize> {
    let terminator = slice.rfind(&SENTENCE_TERMINATORS[..]);
    let newline = slice.rfind('\n');
    let space = slice.rfind(' ');
    [terminator, newline, space].into_iter().flatten().max()
}
