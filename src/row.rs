//! # Row
//!
//! A single line of text, its rendered form (tabs expanded) and its highlight attributes.
//!
//! Unlike an editor aimed at Unicode-correct display, this one treats text as an opaque byte
//! stream: `chars`, `render` and `hl` are always the same length and are indexed by byte offset,
//! not by character or grapheme. High bytes (any byte that is not ASCII-printable) are rendered
//! as a `?` placeholder rather than decoded.

use crate::syntax::Conf as SyntaxConf;

/// Highlight tag attached to each byte of a row's rendered form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HlType {
    Normal,
    NonPrint,
    Comment,
    MlComment,
    Keyword1,
    Keyword2,
    String,
    Number,
    Match,
    Selection,
}

/// One line of text.
#[derive(Debug, Clone, Default)]
pub struct Row {
    /// Row position within its buffer; kept in sync by the buffer on insert/delete.
    pub index: usize,
    /// Raw byte content of the line (no trailing `\n`).
    pub chars: Vec<u8>,
    /// Rendered content: tabs expanded to the next `tab_size` stop. Same length as `hl`.
    pub render: Vec<u8>,
    /// Highlight tag for each byte of `render`.
    pub hl: Vec<HlType>,
    /// Whether this row ends inside an unterminated multi-line comment.
    pub hl_open_comment: bool,
}

/// Is `b` a separator byte for the purposes of keyword/number boundary detection?
#[must_use]
pub fn is_separator(b: u8) -> bool {
    b == 0
        || b.is_ascii_whitespace()
        || b"{},.()+-/*=~%[];<>|&".contains(&b)
}

impl Row {
    #[must_use]
    pub fn new(index: usize, chars: Vec<u8>) -> Self {
        let mut row = Self { index, chars, render: Vec::new(), hl: Vec::new(), hl_open_comment: false };
        row.update_render(8);
        row
    }

    /// Rebuild `render` from `chars`, expanding tabs to the next multiple of `tab_size`.
    pub fn update_render(&mut self, tab_size: usize) {
        self.render.clear();
        for &b in &self.chars {
            if b == b'\t' {
                let spaces = tab_size - self.render.len() % tab_size;
                self.render.extend(std::iter::repeat(b' ').take(spaces));
            } else {
                self.render.push(b);
            }
        }
    }

    /// Recompute `hl` for this row's current `render`, given the open-comment state carried over
    /// from the previous row. Returns this row's own resulting `hl_open_comment`, which the caller
    /// (the buffer) propagates to the next row if it changed.
    pub fn update_syntax(&mut self, syntax: &SyntaxConf, prev_open_comment: bool) -> bool {
        self.hl = vec![HlType::Normal; self.render.len()];

        if syntax.is_none() {
            self.hl_open_comment = false;
            return false;
        }

        let mut in_comment = prev_open_comment;
        let mut in_string: Option<u8> = None;
        let mut prev_sep = true;
        let mut i = 0;
        let bytes = self.render.clone();

        while i < bytes.len() {
            let b = bytes[i];
            let prev_hl = if i > 0 { self.hl[i - 1] } else { HlType::Normal };

            if in_comment {
                self.hl[i] = HlType::MlComment;
                if let Some(close) = syntax.mlcomment_close() {
                    if bytes[i..].starts_with(close) {
                        for j in i..(i + close.len()).min(bytes.len()) {
                            self.hl[j] = HlType::MlComment;
                        }
                        i += close.len();
                        in_comment = false;
                        prev_sep = true;
                        continue;
                    }
                }
                i += 1;
                continue;
            }

            if let Some(open) = syntax.mlcomment_open() {
                if in_string.is_none() && bytes[i..].starts_with(open) {
                    for j in i..(i + open.len()).min(bytes.len()) {
                        self.hl[j] = HlType::MlComment;
                    }
                    i += open.len();
                    in_comment = true;
                    continue;
                }
            }

            if let Some(sc) = syntax.singleline_comment() {
                if in_string.is_none() && bytes[i..].starts_with(sc) {
                    for j in i..bytes.len() {
                        self.hl[j] = HlType::Comment;
                    }
                    break;
                }
            }

            if syntax.highlight_strings() {
                if let Some(q) = in_string {
                    self.hl[i] = HlType::String;
                    if b == b'\\' && i + 1 < bytes.len() {
                        self.hl[i + 1] = HlType::String;
                        i += 2;
                        continue;
                    }
                    if b == q {
                        in_string = None;
                    }
                    prev_sep = true;
                    i += 1;
                    continue;
                } else if b == b'"' || b == b'\'' {
                    in_string = Some(b);
                    self.hl[i] = HlType::String;
                    i += 1;
                    continue;
                }
            }

            if !(b.is_ascii_graphic() || b == b' ') {
                self.hl[i] = HlType::NonPrint;
                prev_sep = false;
                i += 1;
                continue;
            }

            if syntax.highlight_numbers()
                && (b.is_ascii_digit() && (prev_sep || prev_hl == HlType::Number)
                    || (b == b'.' && prev_hl == HlType::Number))
            {
                self.hl[i] = HlType::Number;
                prev_sep = false;
                i += 1;
                continue;
            }

            if prev_sep {
                if let Some((klen, tag)) = syntax.match_keyword(&bytes[i..]) {
                    let end = i + klen;
                    if end == bytes.len() || is_separator(bytes[end]) {
                        for j in i..end {
                            self.hl[j] = tag;
                        }
                        i = end;
                        prev_sep = false;
                        continue;
                    }
                }
            }

            prev_sep = is_separator(b);
            i += 1;
        }

        self.hl_open_comment = in_comment;
        self.hl_open_comment
    }

    #[must_use]
    pub fn len(&self) -> usize { self.chars.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.chars.is_empty() }

    /// Render-column (byte offset into `render`) corresponding to char byte offset `cx`, given
    /// tab expansion. Every byte of `chars` maps to exactly one byte of `render` except `\t`,
    /// which expands to `tab_size - col % tab_size` bytes.
    #[must_use]
    pub fn cx_to_rx(&self, cx: usize, tab_size: usize) -> usize {
        let mut rx = 0;
        for &b in &self.chars[..cx.min(self.chars.len())] {
            if b == b'\t' {
                rx += tab_size - rx % tab_size;
            } else {
                rx += 1;
            }
        }
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::Conf;

    fn c_syntax() -> Conf {
        Conf::new_for_test(
            vec!["if".to_string(), "else".to_string()],
            vec!["int|".to_string()],
            Some(b"//".to_vec()),
            Some(b"/*".to_vec()),
            Some(b"*/".to_vec()),
            true,
            true,
        )
    }

    #[test]
    fn render_expands_tabs() {
        let row = Row::new(0, b"a\tb".to_vec());
        assert_eq!(row.render, b"a       b");
    }

    #[test]
    fn no_syntax_is_all_normal() {
        let mut row = Row::new(0, b"hello".to_vec());
        let open = row.update_syntax(&Conf::none(), false);
        assert!(!open);
        assert!(row.hl.iter().all(|&h| h == HlType::Normal));
    }

    #[test]
    fn single_line_comment_covers_rest_of_line() {
        let mut row = Row::new(0, b"x = 1 // comment".to_vec());
        row.update_syntax(&c_syntax(), false);
        let comment_start = row.render.windows(2).position(|w| w == b"//").unwrap();
        assert!(row.hl[comment_start..].iter().all(|&h| h == HlType::Comment));
    }

    #[test]
    fn multiline_comment_propagates_and_closes() {
        let mut open_row = Row::new(0, b"/* start".to_vec());
        let open = open_row.update_syntax(&c_syntax(), false);
        assert!(open);

        let mut close_row = Row::new(1, b"end */ int x;".to_vec());
        let still_open = close_row.update_syntax(&c_syntax(), true);
        assert!(!still_open);
        assert_eq!(close_row.hl[0], HlType::MlComment);
        let after_close = close_row.render.windows(2).position(|w| w == b"*/").unwrap() + 2;
        assert_eq!(close_row.hl[after_close], HlType::Normal);
    }

    #[test]
    fn keyword_requires_separator_boundary() {
        let mut row = Row::new(0, b"ifelse if".to_vec());
        row.update_syntax(&c_syntax(), false);
        assert!(row.hl[0..6].iter().all(|&h| h == HlType::Normal));
        assert_eq!(row.hl[7], HlType::Keyword1);
    }

    #[test]
    fn string_with_escape() {
        let mut row = Row::new(0, br#""a\"b""#.to_vec());
        row.update_syntax(&c_syntax(), false);
        assert!(row.hl.iter().all(|&h| h == HlType::String));
    }

    #[test]
    fn number_after_separator() {
        let mut row = Row::new(0, b"x = 42;".to_vec());
        row.update_syntax(&c_syntax(), false);
        let pos = row.render.iter().position(|&b| b == b'4').unwrap();
        assert_eq!(row.hl[pos], HlType::Number);
        assert_eq!(row.hl[pos + 1], HlType::Number);
    }

    #[test]
    fn nonprintable_byte_is_tagged() {
        let mut row = Row::new(0, vec![b'x', 0x01, b'y']);
        row.update_syntax(&c_syntax(), false);
        assert_eq!(row.hl[1], HlType::NonPrint);
        assert_eq!(row.hl[0], HlType::Normal);
    }

    #[test]
    fn empty_row_has_empty_hl() {
        let mut row = Row::new(0, Vec::new());
        row.update_syntax(&c_syntax(), false);
        assert!(row.hl.is_empty());
    }
}
