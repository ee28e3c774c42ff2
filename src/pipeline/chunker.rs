//! Text chunking strategies.
//!
//! Provides the `Chunker` trait and implementations for splitting extracted
//! document text into chunks suitable for embedding.

use crate::config::{ChunkingStrategy, PipelineConfig};

/// Size constraints for chunking, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingOptions {
    pub strategy: ChunkingStrategy,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Paragraphs shorter than this are merged with the next one.
    pub min_chunk_chars: usize,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for ChunkingOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            strategy: config.strategy,
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            min_chunk_chars: config.min_chunk_chars,
        }
    }
}

impl ChunkingOptions {
    /// Window advance; never zero.
    fn step(&self) -> usize {
        self.chunk_size.saturating_sub(self.chunk_overlap).max(1)
    }
}

/// A chunk before it is embedded and stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChunk {
    /// Zero-based position within the document.
    pub position: usize,

    /// Character range in the normalized text (start, end).
    pub char_range: (usize, usize),

    /// The text content of this chunk.
    pub content: String,
}

impl RawChunk {
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

/// Trait for chunking strategies.
pub trait Chunker: Send + Sync {
    /// Split text into chunks. Positions are dense and start at zero.
    fn chunk(&self, text: &str, options: &ChunkingOptions) -> Vec<RawChunk>;
}

/// Chunker for the configured strategy.
pub fn chunker_for(strategy: ChunkingStrategy) -> Box<dyn Chunker> {
    match strategy {
        ChunkingStrategy::Window => Box::new(WindowChunker),
        ChunkingStrategy::Paragraph => Box::new(ParagraphChunker),
    }
}

/// Fixed-size character windows.
///
/// Newlines are flattened to spaces first, then the text is cut every
/// `chunk_size - chunk_overlap` characters. Whitespace-only windows are dropped.
#[derive(Debug, Default)]
pub struct WindowChunker;

impl Chunker for WindowChunker {
    fn chunk(&self, text: &str, options: &ChunkingOptions) -> Vec<RawChunk> {
        if options.chunk_size == 0 {
            return Vec::new();
        }

        let chars: Vec<char> = text
            .chars()
            .map(|c| if c == '\n' { ' ' } else { c })
            .collect();

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + options.chunk_size).min(chars.len());
            let content: String = chars[start..end].iter().collect();

            if !content.trim().is_empty() {
                chunks.push(RawChunk {
                    position: chunks.len(),
                    char_range: (start, end),
                    content,
                });
            }

            if end == chars.len() {
                break;
            }
            start += options.step();
        }

        chunks
    }
}

/// Paragraph-based chunking with size constraints.
///
/// Algorithm:
/// 1. Split by paragraphs (blank line)
/// 2. Join wrapped lines inside each paragraph
/// 3. Merge small paragraphs (< min_chunk_chars)
/// 4. Split large paragraphs with a sliding window + overlap
#[derive(Debug, Default)]
pub struct ParagraphChunker;

/// A paragraph with its character range.
#[derive(Debug, Clone)]
struct Paragraph {
    char_range: (usize, usize),
    content: String,
}

impl Chunker for ParagraphChunker {
    fn chunk(&self, text: &str, options: &ChunkingOptions) -> Vec<RawChunk> {
        if text.trim().is_empty() || options.chunk_size == 0 {
            return Vec::new();
        }

        let paragraphs = split_paragraphs(text);
        let merged = merge_small_paragraphs(paragraphs, options.min_chunk_chars);
        let split = split_large_paragraphs(merged, options);

        split
            .into_iter()
            .enumerate()
            .map(|(position, para)| RawChunk {
                position,
                char_range: para.char_range,
                content: para.content,
            })
            .collect()
    }
}

/// Split on blank lines; single newlines become spaces.
fn split_paragraphs(text: &str) -> Vec<Paragraph> {
    let mut paragraphs = Vec::new();
    let mut offset = 0;

    for block in text.split("\n\n") {
        let block_chars = block.chars().count();
        let content = block
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if !content.is_empty() {
            paragraphs.push(Paragraph {
                char_range: (offset, offset + block_chars),
                content,
            });
        }
        // +2 for the separator
        offset += block_chars + 2;
    }

    paragraphs
}

/// Merge small paragraphs into the following one.
fn merge_small_paragraphs(paragraphs: Vec<Paragraph>, min_chars: usize) -> Vec<Paragraph> {
    let mut iter = paragraphs.into_iter();
    let Some(mut current) = iter.next() else {
        return Vec::new();
    };

    let mut result = Vec::new();
    for para in iter {
        if current.content.chars().count() < min_chars {
            current.char_range.1 = para.char_range.1;
            current.content.push(' ');
            current.content.push_str(&para.content);
        } else {
            result.push(current);
            current = para;
        }
    }

    result.push(current);
    result
}

/// Split paragraphs longer than `chunk_size` with a sliding window.
fn split_large_paragraphs(paragraphs: Vec<Paragraph>, options: &ChunkingOptions) -> Vec<Paragraph> {
    let mut result = Vec::new();

    for para in paragraphs {
        let chars: Vec<char> = para.content.chars().collect();
        if chars.len() <= options.chunk_size {
            result.push(para);
            continue;
        }

        let mut start = 0;
        while start < chars.len() {
            let end = (start + options.chunk_size).min(chars.len());
            let base = para.char_range.0;
            result.push(Paragraph {
                char_range: (base + start, (base + end).min(para.char_range.1)),
                content: chars[start..end].iter().collect(),
            });

            if end == chars.len() {
                break;
            }
            start += options.step();
        }
    }

    result
}
