//! Highlight spans over the text being read aloud.

use serde::{Deserialize, Serialize};

/// A non-empty `[start, end)` range of UTF-8 byte offsets into a session's text.
///
/// "No highlight" is represented as `Option::<HighlightSpan>::None` rather than
/// a `-1` sentinel. Spans produced by the engine always fall on `char`
/// boundaries of the text they were computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightSpan {
    /// Inclusive start offset.
    pub start_index: usize,
    /// Exclusive end offset.
    pub end_index: usize,
}

impl HighlightSpan {
    /// Build a span, rejecting empty or inverted ranges.
    pub const fn new(start_index: usize, end_index: usize) -> Option<Self> {
        if start_index < end_index {
            Some(Self {
                start_index,
                end_index,
            })
        } else {
            None
        }
    }

    /// Length of the span in bytes.
    pub const fn len(&self) -> usize {
        self.end_index - self.start_index
    }

    /// Always `false`; empty spans cannot be constructed.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// The highlighted slice of `text`, if the span fits it.
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.get(self.start_index..self.end_index)
    }
}
