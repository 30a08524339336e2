//! The shared text buffer. Offsets are char offsets, validated against the
//! current length; out-of-range mutations are no-ops so callers can drop them
//! silently. Line numbers are derived by counting newlines before an offset
//! and are never cached across mutations.
use std::ops::RangeInclusive;

#[derive(Debug, Clone, Default)]
pub struct Document {
    text: String,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Length in chars, the unit all offsets are expressed in.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn snapshot(&self) -> String {
        self.text.clone()
    }

    pub fn replace_all(&mut self, text: String) {
        self.text = text;
    }

    pub fn in_bounds(&self, start: usize, end: usize) -> bool {
        start <= end && end <= self.len()
    }

    /// Inserts `text` at char offset `pos`. Returns false (unchanged) when
    /// `pos` is past the end.
    pub fn insert(&mut self, pos: usize, text: &str) -> bool {
        match self.byte_offset(pos) {
            Some(at) => {
                self.text.insert_str(at, text);
                true
            }
            None => false,
        }
    }

    /// Removes chars in `start..end`. Returns false when the range is invalid.
    pub fn delete(&mut self, start: usize, end: usize) -> bool {
        self.replace(start, end, "")
    }

    /// Atomic delete of `start..end` plus insert of `text` at `start`.
    pub fn replace(&mut self, start: usize, end: usize, text: &str) -> bool {
        if start > end {
            return false;
        }
        let (Some(from), Some(to)) = (self.byte_offset(start), self.byte_offset(end)) else {
            return false;
        };
        self.text.replace_range(from..to, text);
        true
    }

    /// Line containing the given char offset: the count of newlines before it.
    pub fn line_of_offset(&self, offset: usize) -> usize {
        self.text.chars().take(offset).filter(|c| *c == '\n').count()
    }

    /// Lines a mutation of `start..end` can affect, computed against the
    /// pre-mutation text. Deleting a newline merges two lines, so the line
    /// containing `end` is included.
    pub fn touched_lines(&self, start: usize, end: usize) -> RangeInclusive<usize> {
        self.line_of_offset(start)..=self.line_of_offset(end)
    }

    /// Byte index of char offset `ch`; `Some(len)` for the one-past-end slot.
    fn byte_offset(&self, ch: usize) -> Option<usize> {
        self.text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(self.text.len()))
            .nth(ch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_delete_replace() {
        let mut doc = Document::new();
        assert!(doc.insert(0, "hello world"));
        assert!(doc.delete(5, 11));
        assert_eq!(doc.snapshot(), "hello");
        assert!(doc.replace(0, 5, "goodbye"));
        assert_eq!(doc.snapshot(), "goodbye");
        assert!(doc.insert(7, "!"));
        assert_eq!(doc.snapshot(), "goodbye!");
    }

    #[test]
    fn out_of_range_is_a_no_op() {
        let mut doc = Document::from_text("abc");
        assert!(!doc.insert(4, "x"));
        assert!(!doc.delete(1, 9));
        assert!(!doc.delete(2, 1));
        assert!(!doc.replace(0, 4, "y"));
        assert_eq!(doc.snapshot(), "abc");
    }

    #[test]
    fn offsets_are_char_offsets() {
        let mut doc = Document::from_text("héllo");
        assert_eq!(doc.len(), 5);
        assert!(doc.insert(5, "!"));
        assert_eq!(doc.snapshot(), "héllo!");
        assert!(doc.delete(1, 2));
        assert_eq!(doc.snapshot(), "hllo!");
    }

    #[test]
    fn line_of_offset_counts_newlines() {
        let doc = Document::from_text("hello\nworld");
        assert_eq!(doc.line_of_offset(0), 0);
        assert_eq!(doc.line_of_offset(5), 0);
        assert_eq!(doc.line_of_offset(6), 1);
        assert_eq!(doc.line_of_offset(11), 1);
    }

    #[test]
    fn touched_lines_spans_merged_lines() {
        let doc = Document::from_text("hello\nworld");
        assert_eq!(doc.touched_lines(0, 5), 0..=0);
        assert_eq!(doc.touched_lines(6, 11), 1..=1);
        // Removing the newline itself affects both lines.
        assert_eq!(doc.touched_lines(5, 6), 0..=1);
    }
}
