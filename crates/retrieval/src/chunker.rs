//! Sliding-window text chunker.
//!
//! Splits long text into windows of at most `chunk_size` characters that
//! share `overlap` characters with their predecessor. Before cutting a
//! window, the chunker backs up to the latest paragraph, line or sentence
//! break in the second half of the window so segments end on natural
//! boundaries. Lengths are counted in Unicode scalar values, never bytes.

use promptforge_core::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Break points in priority order.
const SEPARATORS: [&str; 8] = ["\n\n", "\n", "。", ".", "！", "!", "？", "?"];

/// Window parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 50,
        }
    }
}

impl ChunkConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        let config = Self {
            chunk_size,
            overlap,
        };
        config.validate()?;
        Ok(config)
    }

    /// An overlap that reaches the window size could never advance.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 || self.overlap >= self.chunk_size {
            return Err(Error::InvalidChunkingConfig {
                chunk_size: self.chunk_size,
                overlap: self.overlap,
            });
        }
        Ok(())
    }
}

/// Split `text` into overlapping, boundary-aligned chunks.
///
/// Text no longer than `chunk_size` comes back unchanged as a single chunk.
/// Otherwise chunks are trimmed and whitespace-only chunks are dropped.
pub fn chunk_text(text: &str, config: &ChunkConfig) -> Result<Vec<String>> {
    config.validate()?;

    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    if len <= config.chunk_size {
        return Ok(vec![text.to_string()]);
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < len {
        let mut end = (start + config.chunk_size).min(len);
        if end < len {
            if let Some(cut) = find_break(&chars, start, end, config.chunk_size) {
                end = cut;
            }
        }

        let chunk: String = chars[start..end].iter().collect();
        let trimmed = chunk.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }

        if end >= len {
            break;
        }
        start = end.saturating_sub(config.overlap).max(start + 1);
    }

    Ok(chunks)
}

/// Position just past the chosen separator, if any lies beyond the window's midpoint.
fn find_break(chars: &[char], start: usize, end: usize, chunk_size: usize) -> Option<usize> {
    let midpoint = start + chunk_size / 2;

    for sep in SEPARATORS {
        let sep: Vec<char> = sep.chars().collect();
        if let Some(pos) = rfind(&chars[start..end], &sep).map(|p| start + p) {
            if pos > midpoint {
                return Some(pos + sep.len());
            }
        }
    }

    None
}

fn rfind(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len())
        .rev()
        .find(|&i| haystack[i..i + needle.len()] == *needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(chunk_size: usize, overlap: usize) -> ChunkConfig {
        ChunkConfig::new(chunk_size, overlap).unwrap()
    }

    #[test]
    fn short_text_is_returned_unchanged() {
        let text = "  a short note  ";
        let chunks = chunk_text(text, &config(100, 10)).unwrap();
        assert_eq!(chunks, vec![text.to_string()]);
    }

    #[test]
    fn exact_size_is_single_chunk() {
        let text = "x".repeat(50);
        assert_eq!(chunk_text(&text, &config(50, 5)).unwrap().len(), 1);
    }

    #[test]
    fn invalid_overlap_rejected_before_work() {
        let cfg = ChunkConfig {
            chunk_size: 10,
            overlap: 10,
        };
        let err = chunk_text("anything", &cfg).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidChunkingConfig {
                chunk_size: 10,
                overlap: 10
            }
        ));
        assert!(ChunkConfig::new(0, 0).is_err());
        assert!(ChunkConfig::new(10, 20).is_err());
    }

    #[test]
    fn cuts_after_late_paragraph_break() {
        // Break at char 15 of a 20-char window lies past the midpoint (10).
        let text = format!("{}\n\n{}", "a".repeat(13), "b".repeat(30));
        let chunks = chunk_text(&text, &config(20, 2)).unwrap();
        assert_eq!(chunks[0], "a".repeat(13));
        assert!(chunks[1].starts_with('b') || chunks[1].starts_with('a'));
    }

    #[test]
    fn early_break_is_ignored() {
        // A break before the midpoint does not move the cut.
        let text = format!("ab.{}", "c".repeat(40));
        let chunks = chunk_text(&text, &config(20, 0)).unwrap();
        assert_eq!(chunks[0].chars().count(), 20);
    }

    #[test]
    fn sentence_break_used_when_no_newline() {
        let text = format!("{}. {}", "a".repeat(14), "b".repeat(30));
        let chunks = chunk_text(&text, &config(20, 0)).unwrap();
        assert_eq!(chunks[0], format!("{}.", "a".repeat(14)));
    }

    #[test]
    fn counts_characters_not_bytes() {
        let text = "这是一个测试。".repeat(20);
        let chunks = chunk_text(&text, &config(30, 5)).unwrap();
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 30);
            assert!(chunk.ends_with('。'));
        }
    }

    #[test]
    fn every_character_is_covered() {
        // Unique tokens, so each chunk sits at exactly one place in the text.
        let text: String = (0..150)
            .map(|i| {
                let sep = if i % 11 == 10 {
                    "\n"
                } else if i % 7 == 6 {
                    ". "
                } else {
                    " "
                };
                format!("tok{i:03}{sep}")
            })
            .collect();

        for (size, overlap) in [(40, 0), (40, 8), (40, 39), (60, 15)] {
            let chunks = chunk_text(&text, &config(size, overlap)).unwrap();
            let mut covered = vec![false; text.len()];
            let mut cursor = 0;
            for chunk in &chunks {
                assert!(chunk.chars().count() <= size);
                let at = cursor
                    + text[cursor..]
                        .find(chunk.as_str())
                        .unwrap_or_else(|| panic!("{chunk:?} out of order for ({size}, {overlap})"));
                covered[at..at + chunk.len()].iter_mut().for_each(|c| *c = true);
                cursor = at;
            }

            for (i, c) in text.char_indices() {
                if !c.is_whitespace() {
                    assert!(covered[i], "char {i} uncovered for ({size}, {overlap})");
                }
            }
        }
    }

    #[test]
    fn terminates_with_maximum_overlap() {
        let text = "z".repeat(1000);
        let chunks = chunk_text(&text, &config(10, 9)).unwrap();
        // Each window advances by exactly one character.
        assert_eq!(chunks.len(), 991);
    }

    #[test]
    fn whitespace_chunks_are_dropped() {
        let text = format!("{}{}", "word ".repeat(10), " ".repeat(60));
        let chunks = chunk_text(&text, &config(20, 0)).unwrap();
        assert!(chunks.iter().all(|c| !c.trim().is_empty()));
    }

    #[test]
    fn chunking_is_deterministic() {
        let text = "Sentence one. Sentence two! Sentence three? ".repeat(30);
        let a = chunk_text(&text, &config(64, 16)).unwrap();
        let b = chunk_text(&text, &config(64, 16)).unwrap();
        assert_eq!(a, b);
    }
}
