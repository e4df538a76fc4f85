//! Recursive character splitting of page text into overlapping chunks.
//!
//! Text is split at the coarsest boundary present (paragraph, line,
//! sentence, word, then single characters), pieces that are still too long
//! are split again at the next finer boundary, and the resulting pieces are
//! greedily merged back into chunks of at most `chunk_size` characters. When
//! a chunk is emitted, trailing pieces totalling at most `chunk_overlap`
//! characters are carried into the next chunk.
//!
//! Lengths are counted in `char`s. A separator stays attached to the end of
//! the piece it terminates, so sentences keep their full stop.

use crate::types::{Chunk, Page};
use cookbook_core::{AppError, AppResult};
use std::collections::VecDeque;

pub const DEFAULT_CHUNK_SIZE: usize = 800;
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

const SEPARATORS: [&str; 5] = ["\n\n", "\n", ".", " ", ""];

/// Splits pages into bounded, overlapping chunks.
#[derive(Debug, Clone, Copy)]
pub struct ChunkSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for ChunkSplitter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> AppResult<Self> {
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(AppError::Config(format!(
                "Invalid chunking: chunk size {} must exceed overlap {}",
                chunk_size, chunk_overlap
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split every page, numbering chunks across the whole document.
    pub fn split_pages(&self, pages: &[Page]) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for page in pages {
            for text in self.split_text(&page.text) {
                chunks.push(Chunk {
                    text,
                    source_page: page.number,
                    chunk_index: chunks.len() as u32,
                });
            }
        }

        tracing::debug!("Split {} pages into {} chunks", pages.len(), chunks.len());
        chunks
    }

    /// Split one text into trimmed, non-empty chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &SEPARATORS)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let position = separators
            .iter()
            .position(|sep| sep.is_empty() || text.contains(sep))
            .unwrap_or(separators.len().saturating_sub(1));
        let separator = separators.get(position).copied().unwrap_or("");
        let finer = separators.get(position + 1..).unwrap_or(&[]);

        let mut chunks = Vec::new();
        let mut fitting: Vec<(&str, usize)> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            let len = piece.chars().count();
            if len < self.chunk_size {
                fitting.push((piece, len));
                continue;
            }

            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting));
                fitting.clear();
            }
            if finer.is_empty() {
                push_trimmed(&mut chunks, piece);
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting));
        }
        chunks
    }

    /// Greedily pack pieces (each shorter than `chunk_size`) into chunks.
    fn merge(&self, pieces: &[(&str, usize)]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for &(piece, len) in pieces {
            if total + len > self.chunk_size && !window.is_empty() {
                push_trimmed(&mut chunks, &join(&window));

                while total > self.chunk_overlap || (total > 0 && total + len > self.chunk_size) {
                    match window.pop_front() {
                        Some((_, front_len)) => total -= front_len,
                        None => break,
                    }
                }
            }
            window.push_back((piece, len));
            total += len;
        }

        if !window.is_empty() {
            push_trimmed(&mut chunks, &join(&window));
        }
        chunks
    }
}

/// Split after each occurrence of `separator`; an empty separator yields
/// single characters.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        text.char_indices()
            .map(|(idx, ch)| &text[idx..idx + ch.len_utf8()])
            .collect()
    } else {
        text.split_inclusive(separator).collect()
    }
}

fn join(window: &VecDeque<(&str, usize)>) -> String {
    window.iter().map(|(piece, _)| *piece).collect()
}

fn push_trimmed(chunks: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_words(count: usize) -> String {
        (0..count).map(|i| format!("w{:04} ", i)).collect()
    }

    /// Longest suffix of `prev` that is also a prefix of `next`, in chars.
    fn overlap_len(prev: &str, next: &str) -> usize {
        let next_chars: Vec<char> = next.chars().collect();
        (1..=next_chars.len())
            .rev()
            .find(|&n| {
                let prefix: String = next_chars[..n].iter().collect();
                prev.ends_with(&prefix)
            })
            .unwrap_or(0)
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let splitter = ChunkSplitter::default();
        assert_eq!(
            splitter.split_text("  Whisk two eggs.  "),
            vec!["Whisk two eggs."]
        );
        assert!(splitter.split_text(" \n\n ").is_empty());
    }

    #[test]
    fn test_chunks_bounded_and_overlapping() {
        let splitter = ChunkSplitter::default();
        let chunks = splitter.split_text(&numbered_words(1000));

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= DEFAULT_CHUNK_SIZE);
        }
        for pair in chunks.windows(2) {
            let overlap = overlap_len(&pair[0], &pair[1]);
            assert!(overlap > 0, "adjacent chunks should overlap");
            assert!(overlap <= DEFAULT_CHUNK_OVERLAP);
        }
    }

    #[test]
    fn test_overlap_fills_budget_with_fixed_width_words() {
        // Ten chars per word including its space: 80 words fill a chunk and
        // the last 10 are carried into the next one.
        let text: String = (0..300).map(|i| format!("step{:05} ", i)).collect();
        let chunks = ChunkSplitter::default().split_text(&text);

        assert_eq!(chunks.len(), 5);
        assert!(chunks[..4].iter().all(|c| c.chars().count() == DEFAULT_CHUNK_SIZE - 1));
        assert!(chunks[1].starts_with("step00070 "));

        for pair in chunks.windows(2) {
            let carried: String = pair[1].chars().take(DEFAULT_CHUNK_OVERLAP).collect();
            assert_eq!(carried.chars().count(), DEFAULT_CHUNK_OVERLAP);
            // The emitted chunk lost its trailing space to trimming.
            assert!(format!("{} ", pair[0]).ends_with(&carried));
        }
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let first = "Mix the dry ingredients ".repeat(20);
        let second = "Fold in the wet ingredients ".repeat(18);
        let text = format!("{}\n\n{}", first, second);

        let chunks = ChunkSplitter::default().split_text(&text);
        assert_eq!(chunks, vec![first.trim().to_string(), second.trim().to_string()]);
    }

    #[test]
    fn test_hard_cut_without_separators() {
        let text = "x".repeat(2000);
        let chunks = ChunkSplitter::default().split_text(&text);

        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= DEFAULT_CHUNK_SIZE));
    }

    #[test]
    fn test_counts_chars_not_bytes() {
        let splitter = ChunkSplitter::new(10, 2).unwrap();
        let chunks = splitter.split_text("crème brûlée à la carte");
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
    }

    #[test]
    fn test_split_pages_numbers_globally() {
        let splitter = ChunkSplitter::new(40, 5).unwrap();
        let pages = vec![
            Page::new(1, "Pancakes.\n\nFlour, milk and eggs make a simple batter for breakfast."),
            Page::new(2, "Omelette."),
        ];

        let chunks = splitter.split_pages(&pages);
        let indices: Vec<u32> = chunks.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indices, (0..chunks.len() as u32).collect::<Vec<_>>());
        assert_eq!(chunks.last().map(|c| c.source_page), Some(2));
        assert_eq!(chunks.first().map(|c| c.text.as_str()), Some("Pancakes."));
    }

    #[test]
    fn test_deterministic() {
        let splitter = ChunkSplitter::default();
        let text = numbered_words(400);
        assert_eq!(splitter.split_text(&text), splitter.split_text(&text));
    }

    #[test]
    fn test_invalid_settings() {
        assert!(ChunkSplitter::new(100, 100).is_err());
        assert!(ChunkSplitter::new(0, 0).is_err());
    }
}
