use serde::{Deserialize, Serialize};
use thiserror::Error;
use tiktoken_rs::{cl100k_base, CoreBPE};

/// Configuration for text chunking
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Maximum chunk size in tokens
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in tokens
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), ChunkingError> {
        if self.chunk_size == 0 {
            return Err(ChunkingError::InvalidConfig(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ChunkingError::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ChunkingError {
    #[error("Invalid chunking configuration: {0}")]
    InvalidConfig(String),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),
}

/// A token-bounded segment of a document.
///
/// `offset` is the byte offset of `text` within the source document. Chunk
/// spans cover the document completely: each chunk starts at or before the
/// end of the previous one, so concatenating the non-overlapping portions
/// reconstructs the original text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
    pub offset: usize,
    pub tokens: usize,
    pub source: String,
    /// Tokens shared with the previous chunk
    pub overlap_tokens: usize,
}

#[derive(Debug, Clone)]
struct Segment {
    start: usize,
    end: usize,
    tokens: usize,
}

/// Splits document text into overlapping token-bounded chunks.
///
/// Whitespace-delimited segments are packed into chunks of at most
/// `chunk_size` tokens, with up to `chunk_overlap` tokens carried over
/// between consecutive chunks. Token counts use the cl100k BPE.
pub struct TokenChunker {
    bpe: CoreBPE,
    config: ChunkingConfig,
}

impl TokenChunker {
    pub fn new(config: ChunkingConfig) -> Result<Self, ChunkingError> {
        config.validate()?;
        let bpe = cl100k_base().map_err(|e| ChunkingError::Tokenizer(e.to_string()))?;
        Ok(Self { bpe, config })
    }

    /// Count tokens in text
    pub fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    /// Split document text into chunks covering the whole text.
    ///
    /// If the remaining text is shorter than the overlap it becomes the
    /// final chunk as-is.
    pub fn chunk(&self, text: &str, source: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }

        let max = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;

        let mut segments = Vec::new();
        for (start, end) in split_segments(text) {
            let tokens = self.count_tokens(&text[start..end]);
            if tokens > max {
                self.split_oversized(text, start, end, &mut segments);
            } else {
                segments.push(Segment { start, end, tokens });
            }
        }

        let mut chunks = Vec::new();
        // Tail segments of the previous chunk, carried over as overlap
        let mut carry: Vec<Segment> = Vec::new();
        let mut next = 0usize;

        while next < segments.len() {
            // The upcoming segment must fit alongside the carried overlap
            while !carry.is_empty()
                && carry.iter().map(|s| s.tokens).sum::<usize>() + segments[next].tokens > max
            {
                carry.remove(0);
            }

            let overlap_tokens: usize = carry.iter().map(|s| s.tokens).sum();
            let start = carry
                .first()
                .map(|s| s.start)
                .unwrap_or(segments[next].start);
            let mut tokens = overlap_tokens;
            let mut end = carry.last().map(|s| s.end).unwrap_or(segments[next].start);
            let mut members: Vec<Segment> = carry.clone();

            while next < segments.len() && tokens + segments[next].tokens <= max {
                let seg = segments[next].clone();
                tokens += seg.tokens;
                end = seg.end;
                members.push(seg);
                next += 1;
            }

            if members.len() == carry.len() {
                // A lone segment over budget (possible only for a single char
                // encoding to more tokens than chunk_size); take it to advance
                let seg = segments[next].clone();
                tokens += seg.tokens;
                end = seg.end;
                members.push(seg);
                next += 1;
            }

            chunks.push(Chunk {
                index: chunks.len(),
                text: text[start..end].to_string(),
                offset: start,
                tokens,
                source: source.to_string(),
                overlap_tokens,
            });

            if next >= segments.len() {
                break;
            }

            carry.clear();
            let mut carried = 0usize;
            for seg in members.iter().rev() {
                if carried + seg.tokens > overlap {
                    break;
                }
                carried += seg.tokens;
                carry.insert(0, seg.clone());
            }
        }

        chunks
    }

    /// Split a segment whose token count exceeds the chunk size into
    /// char-bounded pieces that each fit the budget.
    fn split_oversized(&self, text: &str, start: usize, end: usize, out: &mut Vec<Segment>) {
        let max = self.config.chunk_size;
        let mut s = start;
        while s < end {
            let mut e = advance_chars(text, s, max).min(end);
            let mut tokens = self.count_tokens(&text[s..e]);
            while tokens > max {
                let char_count = text[s..e].chars().count();
                if char_count <= 1 {
                    break;
                }
                e = advance_chars(text, s, char_count / 2);
                tokens = self.count_tokens(&text[s..e]);
            }
            out.push(Segment { start: s, end: e, tokens });
            s = e;
        }
    }
}

/// Approximate token count (1 token ≈ 4 characters of English text),
/// used as a fallback when no exact count is stored.
pub fn count_tokens_approx(text: &str) -> usize {
    (text.len() as f64 / 4.0).ceil() as usize
}

/// Split text into maximal word-plus-trailing-whitespace spans covering
/// every byte of the input.
fn split_segments(text: &str) -> Vec<(usize, usize)> {
    let mut boundaries = vec![0];
    let mut prev_ws = false;
    for (i, c) in text.char_indices() {
        if prev_ws && !c.is_whitespace() && i > 0 {
            boundaries.push(i);
        }
        prev_ws = c.is_whitespace();
    }
    boundaries.push(text.len());
    boundaries
        .windows(2)
        .filter(|w| w[1] > w[0])
        .map(|w| (w[0], w[1]))
        .collect()
}

/// Byte offset after advancing `n` chars from `start`.
fn advance_chars(text: &str, start: usize, n: usize) -> usize {
    text[start..]
        .char_indices()
        .nth(n)
        .map(|(i, _)| start + i)
        .unwrap_or(text.len())
}
