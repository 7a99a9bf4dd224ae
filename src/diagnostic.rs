//! Caret diagnostics.
//!
//! Rendering is a pure function of the source text and a byte span, so an error
//! can be turned into text at any time after tokenizing without keeping cursor state.
//!
//! ```text
//! [error] unexpected character `@`
//!   |
//! 1 | a + @
//!   |     ^
//! ```

use crate::lexer::Span;

/// Renders `message` with the source line containing `span` and a caret run
/// underlining it. Line and column numbers are 1-based. A span starting at the
/// end of the source points one column past the last character.
pub fn render(source: &str, span: Span, message: &str) -> String {
    let mut offset = span.offset.min(source.len());
    while !source.is_char_boundary(offset) {
        offset -= 1;
    }
    let line_start = source[..offset].rfind('\n').map_or(0, |i| i + 1);
    let line_end = source[offset..]
        .find('\n')
        .map_or(source.len(), |i| offset + i);
    let line_no = source.as_bytes()[..line_start]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
        + 1;

    let line = &source[line_start..line_end];
    let line = line.strip_suffix('\r').unwrap_or(line);
    let echoed: String = line.chars().map(show_char).collect();

    let indent: usize = source[line_start..offset].chars().map(display_width).sum();
    let mut end = span.end().min(line_end);
    while !source.is_char_boundary(end) {
        end -= 1;
    }
    let carets: usize = source[offset..end.max(offset)]
        .chars()
        .map(display_width)
        .sum::<usize>()
        .max(1);

    let gutter = " ".repeat(line_no.to_string().len());
    format!(
        "[error] {message}\n{gutter} |\n{line_no} | {echoed}\n{gutter} | {}{}",
        " ".repeat(indent),
        "^".repeat(carets)
    )
}

fn show_char(c: char) -> String {
    if c.is_control() {
        format!("{:02X}", c as u32)
    } else {
        c.to_string()
    }
}

fn display_width(c: char) -> usize {
    if c.is_control() { 2 } else { 1 }
}
