//! Text shaping: turning raw content into the lines that get measured and
//! painted under a wrap mode and an optional width limit.

use crate::geometry::Size;
use crate::scene::WrapMode;
use crate::width::{char_width, display_width, split_at_width};

/// Marker appended to truncated lines.
pub const ELLIPSIS: char = '…';

/// Break `content` into display lines.
///
/// Without a width limit every mode behaves like `NoWrap`.
pub fn shape_lines(content: &str, mode: WrapMode, max_width: Option<u16>) -> Vec<String> {
    let raw = content.split('\n');
    match (mode, max_width) {
        (WrapMode::Truncate, Some(width)) => raw
            .map(|line| truncate_line(line, width as usize))
            .collect(),
        (WrapMode::Wrap, Some(width)) if width > 0 => raw
            .flat_map(|line| wrap_line(line, width as usize))
            .collect(),
        _ => raw.map(str::to_string).collect(),
    }
}

/// Intrinsic size of shaped text: widest line by line count.
pub fn measure_text(content: &str, mode: WrapMode, max_width: Option<u16>) -> Size {
    let lines = shape_lines(content, mode, max_width);
    let width = lines
        .iter()
        .map(|line| display_width(line))
        .max()
        .unwrap_or(0);
    Size::new(
        width.min(u16::MAX as usize) as u16,
        lines.len().min(u16::MAX as usize) as u16,
    )
}

/// Cut `line` to `width` cells, ending it with [`ELLIPSIS`] when anything was
/// dropped.
pub fn truncate_line(line: &str, width: usize) -> String {
    if display_width(line) <= width {
        return line.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let (head, _) = split_at_width(line, width - 1);
    let mut out = String::with_capacity(head.len() + ELLIPSIS.len_utf8());
    out.push_str(head);
    out.push(ELLIPSIS);
    out
}

/// Greedy word wrap of a single paragraph. Words wider than `width` are hard
/// broken at the width boundary.
pub fn wrap_line(paragraph: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;

    for word in paragraph.split(' ').filter(|word| !word.is_empty()) {
        let mut word = word;
        let mut word_width = display_width(word);

        if word_width > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            while word_width > width {
                let (mut head, mut tail) = split_at_width(word, width);
                if head.is_empty() {
                    // A single glyph wider than the line still has to go somewhere.
                    let first = word.chars().next().map(char::len_utf8).unwrap_or(word.len());
                    (head, tail) = word.split_at(first);
                }
                lines.push(head.to_string());
                word = tail;
                word_width = display_width(word);
            }
            current = word.to_string();
            current_width = word_width;
            continue;
        }

        if current.is_empty() {
            current.push_str(word);
            current_width = word_width;
        } else if current_width + 1 + word_width <= width {
            current.push(' ');
            current.push_str(word);
            current_width += 1 + word_width;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
            current_width = word_width;
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Cells a string occupies, counting each glyph separately.
pub(crate) fn glyph_cells(text: &str) -> impl Iterator<Item = (char, usize)> + '_ {
    text.chars().map(|ch| (ch, char_width(ch)))
}
