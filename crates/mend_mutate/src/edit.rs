//! Text edits and their composition.

use crate::error::MutateError;
use mend_source::TextRange;

/// Replace `range` with `replacement`. Deletions have an empty replacement,
/// insertions an empty range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// Bytes of the original text to replace.
    pub range: TextRange,
    /// New bytes.
    pub replacement: String,
}

impl Edit {
    /// Deletes `range`.
    pub fn delete(range: TextRange) -> Self {
        Self {
            range,
            replacement: String::new(),
        }
    }

    /// Inserts `text` at `offset`.
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self {
            range: TextRange::empty(offset),
            replacement: text.into(),
        }
    }
}

fn is_blank(text: &str) -> bool {
    text.bytes().all(|b| b == b' ' || b == b'\t' || b == b'\r')
}

/// Start of the line containing `offset`.
pub(crate) fn line_start(text: &str, offset: usize) -> usize {
    text[..offset].rfind('\n').map_or(0, |i| i + 1)
}

/// The whitespace between the start of the line and `offset`, if that is all
/// that precedes `offset` on its line.
pub(crate) fn indentation(text: &str, offset: usize) -> Option<&str> {
    let prefix = &text[line_start(text, offset)..offset];
    is_blank(prefix).then_some(prefix)
}

/// Widens a deletion to its whole line, newline included, when nothing but
/// whitespace shares the line.
fn widen_to_line(text: &str, range: TextRange) -> TextRange {
    let start = line_start(text, range.start);
    let (end, newline) = match text[range.end..].find('\n') {
        Some(i) => (range.end + i, true),
        None => (text.len(), false),
    };
    if is_blank(&text[start..range.start]) && is_blank(&text[range.end..end]) {
        TextRange::new(start, if newline { end + 1 } else { end })
    } else {
        range
    }
}

/// Turns raw record and item ranges into deletions.
///
/// Ranges are sorted and merged when they overlap or are separated only by
/// spaces on one line, so records glued together on one line disappear
/// together with their line. Each merged range is then widened to its line
/// if it is the only thing there.
pub fn deletions(text: &str, mut ranges: Vec<TextRange>) -> Vec<Edit> {
    ranges.sort();
    let mut merged: Vec<TextRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        if let Some(last) = merged.last_mut() {
            if range.start <= last.end || is_blank(&text[last.end..range.start]) {
                last.end = last.end.max(range.end);
                continue;
            }
        }
        merged.push(range);
    }
    merged
        .into_iter()
        .map(|r| Edit::delete(widen_to_line(text, r)))
        .collect()
}

/// Applies non-overlapping edits.
///
/// Edits are applied in offset order; at equal offsets an insertion goes
/// before a deletion starting there.
pub fn compose(text: &str, mut edits: Vec<Edit>) -> Result<String, MutateError> {
    edits.sort_by_key(|e| (e.range.start, e.range.end));
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut previous: Option<TextRange> = None;
    for edit in &edits {
        if edit.range.start < cursor {
            return Err(MutateError::Overlap {
                first: previous.unwrap_or(edit.range),
                second: edit.range,
            });
        }
        out.push_str(&text[cursor..edit.range.start]);
        out.push_str(&edit.replacement);
        cursor = edit.range.end;
        previous = Some(edit.range);
    }
    out.push_str(&text[cursor..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lone_record_takes_its_line() {
        let text = "a\n\t\tREC;\nb\n";
        let start = text.find("REC").unwrap();
        let edits = deletions(text, vec![TextRange::new(start, start + 4)]);
        assert_eq!(compose(text, edits).unwrap(), "a\nb\n");
    }

    #[test]
    fn shared_line_keeps_neighbours() {
        let text = "\t\tA;B;C;\n";
        let edits = deletions(text, vec![TextRange::new(4, 6)]);
        assert_eq!(compose(text, edits).unwrap(), "\t\tA;C;\n");
    }

    #[test]
    fn adjacent_ranges_merge_into_line() {
        let text = "x\n\t\tA;B; C;\ny\n";
        let a = text.find("A;").unwrap();
        let ranges = vec![
            TextRange::new(a, a + 2),
            TextRange::new(a + 2, a + 4),
            TextRange::new(a + 5, a + 7),
        ];
        assert_eq!(compose(text, deletions(text, ranges)).unwrap(), "x\ny\n");
    }

    #[test]
    fn duplicate_ranges_collapse() {
        let text = "\tA;\n\tB;\n";
        let r = TextRange::new(1, 3);
        let edits = deletions(text, vec![r, r]);
        assert_eq!(edits.len(), 1);
        assert_eq!(compose(text, edits).unwrap(), "\tB;\n");
    }

    #[test]
    fn last_line_without_newline() {
        let text = "A;\nB;";
        let edits = deletions(text, vec![TextRange::new(3, 5)]);
        assert_eq!(compose(text, edits).unwrap(), "A;\n");
    }

    #[test]
    fn insertion_before_deletion_at_same_offset() {
        let text = "head\nold\ntail\n";
        let edits = vec![
            Edit::delete(TextRange::new(5, 9)),
            Edit::insert(5, "new\n"),
        ];
        assert_eq!(compose(text, edits).unwrap(), "head\nnew\ntail\n");
    }

    #[test]
    fn insertion_inside_deletion_is_rejected() {
        let text = "0123456789";
        let edits = vec![Edit::delete(TextRange::new(2, 6)), Edit::insert(4, "x")];
        assert!(matches!(
            compose(text, edits),
            Err(MutateError::Overlap { .. })
        ));
    }

    #[test]
    fn indentation_only_when_blank_prefix() {
        let text = "\t\tA;\n  x B;";
        assert_eq!(indentation(text, 2), Some("\t\t"));
        assert_eq!(indentation(text, 9), None);
    }
}
