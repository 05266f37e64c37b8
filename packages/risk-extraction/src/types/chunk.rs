//! Chunk type - an offset-tracked window of a document's text.

use serde::{Deserialize, Serialize};

/// A bounded, offset-tracked slice of a document's text.
///
/// The unit of both extraction and verification: a claim is only ever
/// checked against the chunk that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Identifier of the source document
    pub source_id: String,

    /// Position of this window in the document's window sequence.
    ///
    /// Positional: windows that are not emitted (blank) still consume an index.
    pub sequence_index: usize,

    /// Window text
    pub text: String,

    /// Offset of the first character, in characters (not bytes)
    pub char_offset_start: usize,

    /// Set when the window looks like navigation or page furniture.
    ///
    /// Skippable chunks are not sent to the extractor.
    pub skippable: bool,
}

impl Chunk {
    /// Create a new chunk.
    pub fn new(
        source_id: impl Into<String>,
        sequence_index: usize,
        char_offset_start: usize,
        text: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            sequence_index,
            text: text.into(),
            char_offset_start,
            skippable: false,
        }
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Offset one past the last character.
    pub fn char_offset_end(&self) -> usize {
        self.char_offset_start + self.char_len()
    }

    /// Whether the chunk contains the exact quote.
    pub fn contains(&self, quote: &str) -> bool {
        self.text.contains(quote)
    }
}
