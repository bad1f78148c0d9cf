//! Text helpers for highlighting and transcript handling.

use lector_core::HighlightSpan;

/// Whether `c` ends a highlighted word.
///
/// Covers whitespace, ASCII punctuation, and the Unicode punctuation that shows
/// up in translated text (danda, ellipsis, curly quotes, dashes).
fn is_word_break(c: char) -> bool {
    c.is_whitespace()
        || c.is_ascii_punctuation()
        || matches!(
            c,
            '\u{0964}' | '\u{0965}' | '…' | '“' | '”' | '‘' | '’' | '«' | '»' | '–' | '—' | '、' | '。'
        )
}

/// Span of the word starting at `offset` in `text`.
///
/// The span ends at the next whitespace or punctuation character, or at the
/// end of the text. Returns `None` when the span would be empty or `offset`
/// is outside the text or not on a character boundary.
pub fn word_span_at(text: &str, offset: usize) -> Option<HighlightSpan> {
    if offset >= text.len() || !text.is_char_boundary(offset) {
        return None;
    }

    let rest = &text[offset..];
    let len = rest
        .char_indices()
        .find(|&(_, c)| is_word_break(c))
        .map_or(rest.len(), |(idx, _)| idx);

    HighlightSpan::new(offset, offset + len)
}

/// Byte offsets at which words begin in `text`, in order.
///
/// Uses the same word breaks as [`word_span_at`], so every offset yields a
/// non-empty span.
pub fn word_starts(text: &str) -> impl Iterator<Item = usize> + '_ {
    let mut after_break = true;
    text.char_indices().filter_map(move |(idx, c)| {
        let is_break = is_word_break(c);
        let starts = after_break && !is_break;
        after_break = is_break;
        starts.then_some(idx)
    })
}

/// Normalize a recognized transcript for matching: trimmed and lowercased.
pub fn normalize_transcript(transcript: &str) -> String {
    transcript.trim().to_lowercase()
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, offset: usize) -> Option<&str> {
        word_span_at(text, offset).and_then(|span| span.slice(text))
    }

    #[test]
    fn span_ends_at_whitespace() {
        assert_eq!(word("hello brave world", 6), Some("brave"));
    }

    #[test]
    fn span_ends_at_punctuation() {
        assert_eq!(word("Stop, then play.", 0), Some("Stop"));
        assert_eq!(word("Stop, then play.", 11), Some("play"));
    }

    #[test]
    fn span_runs_to_end_of_text() {
        assert_eq!(word("read this", 5), Some("this"));
    }

    #[test]
    fn zero_width_spans_are_suppressed() {
        assert_eq!(word_span_at("a, b", 1), None);
        assert_eq!(word_span_at("a  b", 1), None);
    }

    #[test]
    fn out_of_range_offsets_are_suppressed() {
        assert_eq!(word_span_at("abc", 3), None);
        assert_eq!(word_span_at("abc", 99), None);
    }

    #[test]
    fn offsets_inside_a_character_are_suppressed() {
        let text = "வணக்கம் உலகம்";
        assert_eq!(word_span_at(text, 1), None);
        assert_eq!(word(text, 0), Some("வணக்கம்"));
    }

    #[test]
    fn tamil_sentence_breaks_on_danda() {
        assert_eq!(word("படி।நிறுத்து", 0), Some("படி"));
    }

    #[test]
    fn word_starts_skip_punctuation_runs() {
        let text = "Stop, then  play.";
        let words: Vec<_> = word_starts(text).filter_map(|at| word(text, at)).collect();
        assert_eq!(words, ["Stop", "then", "play"]);
        assert_eq!(word_starts("  ...  ").count(), 0);
    }

    #[test]
    fn transcripts_are_trimmed_and_lowercased() {
        assert_eq!(normalize_transcript("  Please STOP now \n"), "please stop now");
        assert_eq!(normalize_transcript("   "), "");
    }

    #[test]
    fn whitespace_is_collapsed() {
        assert_eq!(collapse_whitespace("  a \n\t b  c "), "a b c");
    }
}
