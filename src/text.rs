/// Conversions between byte offsets and LSP positions.
///
/// LSP columns count UTF-16 code units; the parser works on UTF-8 byte
/// offsets. Positions past the end of a line clamp to the line end.
use ropey::Rope;
use tower_lsp::lsp_types::{Position, Range, TextDocumentContentChangeEvent};

fn char_index(rope: &Rope, position: Position) -> usize {
    let line_idx = position.line as usize;
    if line_idx >= rope.len_lines() {
        return rope.len_chars();
    }
    let line_char = rope.line_to_char(line_idx);
    let line = rope.line(line_idx);
    let mut line_len = line.len_chars();
    while line_len > 0 && matches!(line.char(line_len - 1), '\n' | '\r') {
        line_len -= 1;
    }
    let line_start = rope.char_to_utf16_cu(line_char);
    let line_end = rope.char_to_utf16_cu(line_char + line_len);
    let target = (line_start + position.character as usize).min(line_end);
    rope.utf16_cu_to_char(target)
}

/// Byte offset of an LSP position.
pub(crate) fn offset_at(rope: &Rope, position: Position) -> usize {
    rope.char_to_byte(char_index(rope, position))
}

/// LSP position of a byte offset.
pub(crate) fn position_at(rope: &Rope, offset: usize) -> Position {
    let char_idx = rope.byte_to_char(offset.min(rope.len_bytes()));
    let line_idx = rope.char_to_line(char_idx);
    let line_char = rope.line_to_char(line_idx);
    let character = rope.char_to_utf16_cu(char_idx) - rope.char_to_utf16_cu(line_char);
    Position::new(line_idx as u32, character as u32)
}

pub(crate) fn range_at(rope: &Rope, start: usize, end: usize) -> Range {
    Range::new(position_at(rope, start), position_at(rope, end))
}

/// Apply one `didChange` event to the rope.
pub(crate) fn apply_change(rope: &mut Rope, change: TextDocumentContentChangeEvent) {
    match change.range {
        Some(range) => {
            let start = char_index(rope, range.start);
            let end = char_index(rope, range.end).max(start);
            rope.remove(start..end);
            rope.insert(start, &change.text);
        }
        None => *rope = Rope::from_str(&change.text),
    }
}

/// Spaces reaching the column of `offset` on its line.
pub(crate) fn column_indentation(text: &str, offset: usize) -> String {
    let offset = offset.min(text.len());
    let line_start = text[..offset].rfind('\n').map_or(0, |i| i + 1);
    " ".repeat(text[line_start..offset].chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_round_trip_through_offsets() {
        let rope = Rope::from_str("a: 1\nbb: 22\n");
        assert_eq!(position_at(&rope, 0), Position::new(0, 0));
        assert_eq!(position_at(&rope, 9), Position::new(1, 4));
        assert_eq!(offset_at(&rope, Position::new(1, 4)), 9);
    }

    #[test]
    fn columns_count_utf16_units() {
        let rope = Rope::from_str("k: \u{1F600}x\n");
        // the emoji is 4 bytes in UTF-8 and 2 units in UTF-16
        assert_eq!(position_at(&rope, 7), Position::new(0, 5));
        assert_eq!(offset_at(&rope, Position::new(0, 5)), 7);
    }

    #[test]
    fn out_of_range_positions_clamp() {
        let rope = Rope::from_str("ab\ncd");
        assert_eq!(offset_at(&rope, Position::new(0, 50)), 2);
        assert_eq!(offset_at(&rope, Position::new(9, 0)), 5);
        assert_eq!(position_at(&rope, 99), Position::new(1, 2));
    }

    #[test]
    fn incremental_change_replaces_range() {
        let mut rope = Rope::from_str("a: [1, 2]\n");
        apply_change(
            &mut rope,
            TextDocumentContentChangeEvent {
                range: Some(Range::new(Position::new(0, 3), Position::new(0, 9))),
                range_length: None,
                text: "\n  - 1\n  - 2".to_string(),
            },
        );
        assert_eq!(rope.to_string(), "a: \n  - 1\n  - 2\n");
    }

    #[test]
    fn indentation_reaches_column() {
        let text = "a:\n  - b: {c: 1}\n";
        assert_eq!(column_indentation(text, text.find('b').unwrap()), "    ");
        assert_eq!(column_indentation(text, text.find('-').unwrap()), "  ");
        assert_eq!(column_indentation(text, 0), "");
    }
}
