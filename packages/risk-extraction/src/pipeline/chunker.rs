//! Chunker - splits document text into overlapping, offset-tracked windows.
//!
//! All sizes and offsets are in characters, never bytes, so a window
//! boundary can not fall inside a multi-byte character.
//!
//! Window `i` covers `[i * step, min(i * step + max, len))` where
//! `step = max - overlap`. Consecutive windows share exactly `overlap`
//! characters and the number of windows is
//! `ceil((len - overlap) / step)`, with a single window for any
//! non-empty text no longer than the overlap.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{ExtractionError, Result};
use crate::types::chunk::Chunk;
use crate::types::config::PipelineConfig;

/// A line that carries nothing but a page or section number.
static PAGE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*-?\s*(?:page|section|article|§)?\s*\d+(?:\.\d+)*(?:\s+of\s+\d+)?\s*-?\s*$",
    )
    .unwrap()
});

/// Splits text into overlapping windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    max_chunk_chars: usize,
    overlap_chars: usize,
    mark_boilerplate: bool,
}

impl Chunker {
    /// Create a chunker. Fails unless `0 <= overlap < max`.
    pub fn new(max_chunk_chars: usize, overlap_chars: usize) -> Result<Self> {
        if max_chunk_chars == 0 || overlap_chars >= max_chunk_chars {
            return Err(ExtractionError::config(format!(
                "invalid chunk window: max {} chars, overlap {} chars",
                max_chunk_chars, overlap_chars
            )));
        }
        Ok(Self {
            max_chunk_chars,
            overlap_chars,
            mark_boilerplate: false,
        })
    }

    /// Create a chunker from pipeline settings.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Ok(Self::new(config.max_chunk_chars, config.overlap_chars)?
            .with_boilerplate_filter(config.skip_boilerplate))
    }

    /// Mark table-of-contents and page-number windows as skippable.
    pub fn with_boilerplate_filter(mut self, enabled: bool) -> Self {
        self.mark_boilerplate = enabled;
        self
    }

    fn step(&self) -> usize {
        self.max_chunk_chars - self.overlap_chars
    }

    /// Number of windows for a text of `len` characters.
    pub fn window_count(&self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        if len <= self.overlap_chars {
            return 1;
        }
        (len - self.overlap_chars).div_ceil(self.step())
    }

    /// Iterate the non-blank windows of a document.
    ///
    /// Cheap to call again; each call starts from the first window.
    pub fn chunks<'a>(&'a self, source_id: &'a str, text: &'a str) -> Chunks<'a> {
        let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        boundaries.push(text.len());
        let len = boundaries.len() - 1;

        Chunks {
            chunker: self,
            source_id,
            text,
            boundaries,
            count: self.window_count(len),
            next: 0,
        }
    }

    /// Collect the non-blank windows of a document.
    pub fn split(&self, source_id: &str, text: &str) -> Vec<Chunk> {
        self.chunks(source_id, text).collect()
    }
}

/// Iterator over the windows of one document.
///
/// Blank windows are not yielded, but still consume a sequence index, so
/// indexes and offsets are the same whether or not blanks are present.
pub struct Chunks<'a> {
    chunker: &'a Chunker,
    source_id: &'a str,
    text: &'a str,
    /// Byte offset of every character, plus the text length
    boundaries: Vec<usize>,
    count: usize,
    next: usize,
}

impl Chunks<'_> {
    /// Total number of windows, including blank ones.
    pub fn window_count(&self) -> usize {
        self.count
    }
}

impl Iterator for Chunks<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        let len = self.boundaries.len() - 1;

        while self.next < self.count {
            let index = self.next;
            self.next += 1;

            let start = index * self.chunker.step();
            let end = (start + self.chunker.max_chunk_chars).min(len);
            let text = &self.text[self.boundaries[start]..self.boundaries[end]];

            if text.trim().is_empty() {
                continue;
            }

            let mut chunk = Chunk::new(self.source_id, index, start, text);
            chunk.skippable = self.chunker.mark_boilerplate && is_boilerplate(text);
            return Some(chunk);
        }
        None
    }
}

/// Whether a window holds navigation or page furniture instead of content.
///
/// True for a table of contents, or when every non-blank line is a bare
/// page or section number.
pub fn is_boilerplate(text: &str) -> bool {
    if text.to_lowercase().contains("table of contents") {
        return true;
    }

    let mut lines = text.lines().filter(|l| !l.trim().is_empty()).peekable();
    lines.peek().is_some() && lines.all(|l| PAGE_MARKER.is_match(l))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_invalid_windows_rejected() {
        assert!(Chunker::new(0, 0).is_err());
        assert!(Chunker::new(100, 100).is_err());
        assert!(Chunker::new(100, 150).is_err());
        assert!(Chunker::new(100, 0).is_ok());
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        let chunker = Chunker::new(10, 2).unwrap();
        assert_eq!(chunker.window_count(0), 0);
        assert!(chunker.split("doc", "").is_empty());
    }

    #[test]
    fn test_text_shorter_than_overlap_is_one_chunk() {
        let chunker = Chunker::new(10, 4).unwrap();
        let chunks = chunker.split("doc", "abc");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "abc");
        assert_eq!(chunks[0].char_offset_start, 0);
    }

    #[test]
    fn test_windows_overlap_exactly() {
        let chunker = Chunker::new(10, 3).unwrap();
        let chunks = chunker.split("doc", "abcdefghijklmnopqrstuvwxyz");

        // ceil((26 - 3) / 7) = 4
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].text, "abcdefghij");
        assert_eq!(chunks[1].text, "hijklmnopq");
        assert_eq!(chunks[1].char_offset_start, 7);
        assert_eq!(chunks[3].text, "vwxyz");
        assert_eq!(chunks[3].char_offset_start, 21);
    }

    #[test]
    fn test_offsets_are_in_characters() {
        let chunker = Chunker::new(4, 1).unwrap();
        let chunks = chunker.split("doc", "ééééééé");
        assert_eq!(chunks[0].text, "éééé");
        assert_eq!(chunks[1].char_offset_start, 3);
        assert_eq!(chunks[1].text, "éééé");
    }

    #[test]
    fn test_blank_window_skipped_without_shifting_indexes() {
        let chunker = Chunker::new(5, 0).unwrap();
        let text = format!("alpha{}omega", " ".repeat(5));
        let chunks = chunker.split("doc", &text);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].sequence_index, 0);
        assert_eq!(chunks[1].sequence_index, 2);
        assert_eq!(chunks[1].char_offset_start, 10);
        assert_eq!(chunker.chunks("doc", &text).window_count(), 3);
    }

    #[test]
    fn test_chunks_are_restartable() {
        let chunker = Chunker::new(8, 2).unwrap();
        let text = "the quick brown fox jumps over the lazy dog";
        let first: Vec<_> = chunker.chunks("doc", text).collect();
        let second: Vec<_> = chunker.chunks("doc", text).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_boilerplate_detection() {
        assert!(is_boilerplate("TABLE OF CONTENTS\n1. Definitions ..... 3"));
        assert!(is_boilerplate("Page 12\n\n- 13 -\nSection 4.2\n"));
        assert!(is_boilerplate("  7 of 120  "));
        assert!(!is_boilerplate("A duty of 25 percent shall be imposed on imports."));
        assert!(!is_boilerplate("Page 3\nThe Secretary shall impose a fee."));
        assert!(!is_boilerplate("   "));
    }

    #[test]
    fn test_boilerplate_marking_keeps_offsets() {
        let text = "Page 1\nPage 2\nThe Secretary shall impose a duty.";
        let plain = Chunker::new(14, 0).unwrap().split("doc", text);
        let marked = Chunker::new(14, 0)
            .unwrap()
            .with_boilerplate_filter(true)
            .split("doc", text);

        assert_eq!(plain.len(), marked.len());
        assert!(marked[0].skippable);
        assert!(!plain[0].skippable);
        for (a, b) in plain.iter().zip(&marked) {
            assert_eq!(a.char_offset_start, b.char_offset_start);
            assert_eq!(a.text, b.text);
        }
    }

    proptest! {
        #[test]
        fn prop_chunks_reconstruct_text(
            text in "[a-z0-9é.,]{0,400}",
            max in 2usize..60,
            overlap_ratio in 0.0f64..1.0,
        ) {
            let overlap = ((max as f64) * overlap_ratio) as usize % max;
            let chunker = Chunker::new(max, overlap).unwrap();
            let chunks = chunker.split("doc", &text);
            let len = text.chars().count();

            let expected = if len == 0 {
                0
            } else if len <= overlap {
                1
            } else {
                ((len - overlap) as f64 / (max - overlap) as f64).ceil() as usize
            };
            prop_assert_eq!(chunks.len(), expected);

            let mut rebuilt = String::new();
            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert_eq!(chunk.sequence_index, i);
                prop_assert!(chunk.char_len() <= max);
                if i == 0 {
                    rebuilt.push_str(&chunk.text);
                } else {
                    rebuilt.extend(chunk.text.chars().skip(overlap));
                }
            }
            prop_assert_eq!(rebuilt, text);
        }

        #[test]
        fn prop_consecutive_chunks_share_overlap(
            text in "[a-z ]{1,300}[a-z]",
            max in 2usize..40,
            overlap_ratio in 0.0f64..1.0,
        ) {
            let overlap = ((max as f64) * overlap_ratio) as usize % max;
            let chunker = Chunker::new(max, overlap).unwrap();
            let chars: Vec<char> = text.chars().collect();

            for chunk in chunker.chunks("doc", &text) {
                let start = chunk.char_offset_start;
                let window: String = chars[start..chunk.char_offset_end()].iter().collect();
                prop_assert_eq!(&chunk.text, &window);
                prop_assert_eq!(start, chunk.sequence_index * (max - overlap));
            }
        }
    }
}
