//! # Buffer (`FileState`)
//!
//! One open file: its rows, cursor, viewport, mark, dirty counter and syntax configuration.
//! `Editor` (see [`crate::editor`]) owns an ordered list of these.

use std::fs::File;
use std::io::{self, BufRead, BufReader, ErrorKind, Read, Seek, Write};
use std::path::Path;

use crate::row::Row;
use crate::syntax::Conf as SyntaxConf;
use crate::Error;

#[cfg(feature = "undo")]
use crate::undo::{Action, ActionKind, UndoStack};

/// Arrow-key directions used by cursor motion and buffer selection (picker) navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

/// Sentinel meaning "mark unset", matching the `(-1, -1)` convention.
const MARK_UNSET: isize = -1;

#[derive(Debug)]
pub struct Buffer {
    pub rows: Vec<Row>,
    /// Cursor position, in byte offsets within `rows[cy].chars`.
    pub cx: usize,
    pub cy: usize,
    /// Viewport origin, in buffer coordinates (rows, render columns).
    pub rowoff: usize,
    pub coloff: usize,
    markx: isize,
    marky: isize,
    pub dirty: usize,
    pub filename: Option<String>,
    pub syntax: SyntaxConf,
    pub tab_size: usize,
    #[cfg(feature = "undo")]
    pub undo: UndoStack,
    /// `(row, render-column, byte length)` of the currently highlighted incremental-find match, if
    /// any; overlaid with `HlType::Match` by the renderer and cleared when the find mini-mode exits.
    pub find_match: Option<(usize, usize, usize)>,
}

impl Default for Buffer {
    fn default() -> Self {
        Self {
            rows: vec![Row::new(0, Vec::new())],
            cx: 0,
            cy: 0,
            rowoff: 0,
            coloff: 0,
            markx: MARK_UNSET,
            marky: MARK_UNSET,
            dirty: 0,
            filename: None,
            syntax: SyntaxConf::none(),
            tab_size: 8,
            #[cfg(feature = "undo")]
            undo: UndoStack::default(),
            find_match: None,
        }
    }
}

impl Buffer {
    #[must_use]
    pub fn new(tab_size: usize) -> Self { Self { tab_size, ..Self::default() } }

    /// A buffer whose name starts with `*` (e.g. `*Messages*`) is virtual and never dirty,
    /// matching the convention used for scratch/system buffers.
    #[must_use]
    pub fn is_virtual(&self) -> bool { self.filename.as_deref().is_some_and(|n| n.starts_with('*')) }

    #[must_use]
    pub fn is_dirty(&self) -> bool { self.dirty > 0 && !self.is_virtual() }

    #[must_use]
    pub fn current_row(&self) -> Option<&Row> { self.rows.get(self.cy) }

    #[must_use]
    pub fn n_bytes(&self) -> u64 { self.rows.iter().map(|r| r.len() as u64).sum() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.rows.len() <= 1 && self.n_bytes() == 0 }

    /// Render-column position of the cursor, accounting for tab expansion.
    #[must_use]
    pub fn rx(&self) -> usize { self.current_row().map_or(0, |r| r.cx_to_rx(self.cx, self.tab_size)) }

    pub fn cursor_set(&mut self, x: usize, y: usize) {
        self.cy = y.min(self.rows.len().saturating_sub(1));
        self.cx = x.min(self.rows.get(self.cy).map_or(0, Row::len));
    }

    // ---- mark / selection ----------------------------------------------------------------

    #[must_use]
    pub fn mark(&self) -> Option<(usize, usize)> {
        (self.markx != MARK_UNSET && self.marky != MARK_UNSET)
            .then_some((self.markx as usize, self.marky as usize))
    }

    pub fn set_mark(&mut self) {
        self.markx = self.cx as isize;
        self.marky = self.cy as isize;
    }

    pub fn clear_mark(&mut self) {
        self.markx = MARK_UNSET;
        self.marky = MARK_UNSET;
    }

    /// Raw mark coordinates as given to the scripting bridge's `mark(x, y)`, `-1` meaning unset.
    #[must_use]
    pub fn mark_raw(&self) -> (isize, isize) { (self.markx, self.marky) }

    /// Set the mark from scripting-bridge coordinates; `x == -1` or `y == -1` clears it, matching
    /// the `(x >= 0 || x == -1) && (y >= 0 || y == -1)` guard of the primitive this is grounded on.
    pub fn set_mark_raw(&mut self, x: isize, y: isize) {
        if x == -1 || y == -1 {
            self.clear_mark();
        } else {
            self.markx = x;
            self.marky = y;
        }
    }

    /// Ordered `(start, end)` of mark and cursor, such that `start` comes before `end` in
    /// document order.
    fn selection_endpoints(&self) -> Option<((usize, usize), (usize, usize))> {
        let (mx, my) = self.mark()?;
        let (cx, cy) = (self.cx, self.cy);
        if (my, mx) <= (cy, cx) { Some(((mx, my), (cx, cy))) } else { Some(((cx, cy), (mx, my))) }
    }

    /// Bytes spanned by the selection (mark to cursor, inclusive of neither the byte at the end
    /// position itself). `None` if no mark is set.
    #[must_use]
    pub fn get_selection(&self) -> Option<Vec<u8>> {
        let (start, end) = self.selection_endpoints()?;
        Some(self.bytes_in_range(start, end))
    }

    fn bytes_in_range(&self, (sx, sy): (usize, usize), (ex, ey): (usize, usize)) -> Vec<u8> {
        let mut out = Vec::new();
        if sy == ey {
            let row = &self.rows[sy];
            out.extend_from_slice(&row.chars[sx.min(row.len())..ex.min(row.len())]);
            return out;
        }
        out.extend_from_slice(&self.rows[sy].chars[sx.min(self.rows[sy].len())..]);
        out.push(b'\n');
        for row in &self.rows[sy + 1..ey] {
            out.extend_from_slice(&row.chars);
            out.push(b'\n');
        }
        out.extend_from_slice(&self.rows[ey].chars[..ex.min(self.rows[ey].len())]);
        out
    }

    /// Delete the selection and return the bytes that were removed, leaving the cursor at the
    /// start of the (former) selection. `None` if no mark is set.
    pub fn cut_selection(&mut self) -> Option<Vec<u8>> {
        let (start, end) = self.selection_endpoints()?;
        let cut = self.bytes_in_range(start, end);
        self.cursor_set(end.0, end.1);
        for _ in 0..cut.len() {
            self.delete_char();
        }
        self.clear_mark();
        Some(cut)
    }

    // ---- syntax recomputation --------------------------------------------------------------

    pub fn update_row(&mut self, y: usize, stop_if_unchanged: bool) {
        for i in y..self.rows.len() {
            let prev_open = if i > 0 { self.rows[i - 1].hl_open_comment } else { false };
            self.rows[i].update_render(self.tab_size);
            let previously_open = self.rows[i].hl_open_comment;
            let now_open = self.rows[i].update_syntax(&self.syntax, prev_open);
            if stop_if_unchanged && i > y {
                return;
            }
            if now_open == previously_open && i > y {
                return;
            }
        }
    }

    pub fn update_all_rows(&mut self) {
        let mut prev_open = false;
        for row in &mut self.rows {
            row.update_render(self.tab_size);
            prev_open = row.update_syntax(&self.syntax, prev_open);
        }
    }

    pub fn select_syntax(&mut self, extension: Option<&str>, syntax_dirs: &[std::path::PathBuf]) -> Result<(), Error> {
        if let Some(ext) = extension {
            if let Some(conf) = SyntaxConf::get(ext, syntax_dirs)? {
                self.syntax = conf;
                self.update_all_rows();
            }
        }
        Ok(())
    }

    // ---- row editing ------------------------------------------------------------------------

    /// Byte under the cursor, or `None` past end of line.
    #[must_use]
    pub fn byte_at_cursor(&self) -> Option<u8> { self.current_row().and_then(|r| r.chars.get(self.cx).copied()) }

    /// The current row's content from the cursor column to end of line.
    #[must_use]
    pub fn line_from_cursor(&self) -> Vec<u8> {
        self.current_row().map_or(Vec::new(), |r| r.chars[self.cx.min(r.len())..].to_vec())
    }

    /// Move to column 0 of the current row.
    pub fn move_to_line_start(&mut self) { self.cx = 0; }

    /// Move to the end of the current row.
    pub fn move_to_line_end(&mut self) { self.cx = self.current_row().map_or(0, Row::len); }

    /// `insert_char` dispatches to `insert_newline` for `'\n'` and to a literal byte insert
    /// otherwise, matching the row-editing contract's `insert_char(c)` operation.
    pub fn insert_char(&mut self, b: u8) {
        if b == b'\n' {
            self.insert_newline();
        } else {
            self.insert_byte(b);
        }
    }

    pub fn insert_byte(&mut self, b: u8) {
        if self.rows.get(self.cy).is_none() {
            while self.rows.len() <= self.cy {
                let idx = self.rows.len();
                self.rows.push(Row::new(idx, Vec::new()));
            }
        }
        let row = &mut self.rows[self.cy];
        let at = self.cx.min(row.len());
        if at < row.len() {
            row.chars.insert(at, b);
        } else {
            row.chars.resize(at, b' ');
            row.chars.push(b);
        }
        self.update_row(self.cy, false);
        self.cx = at + 1;
        self.dirty += 1;

        #[cfg(feature = "undo")]
        self.undo.push(Action { kind: ActionKind::Insert, byte: b, x: at, y: self.cy });
    }

    pub fn insert_newline(&mut self) {
        // At column 0: insert an empty row above, cursor lands on the (shifted-down) old row.
        // Otherwise: split the current row at the cursor, cursor lands on the new tail row.
        let (pos, new_chars, landing) = if self.cx == 0 {
            (self.cy, Vec::new(), self.cy + 1)
        } else {
            let row = &mut self.rows[self.cy];
            let split_at = self.cx.min(row.len());
            let tail = row.chars.split_off(split_at);
            self.update_row(self.cy, false);
            (self.cy + 1, tail, self.cy + 1)
        };
        self.rows.insert(pos, Row::new(pos, new_chars));
        for (i, row) in self.rows.iter_mut().enumerate().skip(pos) {
            row.index = i;
        }
        self.update_row(pos, false);
        self.cy = landing;
        self.cx = 0;
        self.dirty += 1;
    }

    pub fn delete_char(&mut self) {
        if self.cx > 0 {
            let row = &mut self.rows[self.cy];
            let removed = row.chars.remove(self.cx - 1);
            self.update_row(self.cy, false);
            self.cx -= 1;
            self.dirty += 1;

            #[cfg(feature = "undo")]
            self.undo.push(Action { kind: ActionKind::Delete, byte: removed, x: self.cx, y: self.cy });
            #[cfg(not(feature = "undo"))]
            let _ = removed;
        } else if self.cy > 0 && self.cy < self.rows.len() {
            let row = self.rows.remove(self.cy);
            for r in self.rows.iter_mut().skip(self.cy) {
                r.index -= 1;
            }
            let prev = &mut self.rows[self.cy - 1];
            self.cx = prev.len();
            prev.chars.extend_from_slice(&row.chars);
            self.update_row(self.cy - 1, false);
            self.cy -= 1;
            self.dirty += 1;
        } else if self.cy == self.rows.len() {
            self.move_cursor(Direction::Left);
        }
    }

    pub fn delete_row_at(&mut self, y: usize) {
        if y >= self.rows.len() {
            return;
        }
        self.rows.remove(y);
        if self.rows.is_empty() {
            self.rows.push(Row::new(0, Vec::new()));
        }
        for (i, row) in self.rows.iter_mut().enumerate().skip(y) {
            row.index = i;
        }
        self.cursor_set(0, y.min(self.rows.len() - 1));
        self.update_row(y.saturating_sub(1), false);
        self.dirty += 1;
    }

    pub fn delete_current_row(&mut self) { self.delete_row_at(self.cy); }

    // ---- cursor motion ------------------------------------------------------------------------

    pub fn move_cursor(&mut self, dir: Direction) {
        match dir {
            Direction::Left if self.cx > 0 => self.cx -= 1,
            Direction::Left if self.cy > 0 => {
                self.cy -= 1;
                self.cx = self.rows[self.cy].len();
            }
            Direction::Right => {
                let len = self.current_row().map_or(0, Row::len);
                if self.cx < len {
                    self.cx += 1;
                } else if self.cy + 1 < self.rows.len() {
                    self.cy += 1;
                    self.cx = 0;
                }
            }
            Direction::Up if self.cy > 0 => self.cy -= 1,
            Direction::Down if self.cy + 1 < self.rows.len() => self.cy += 1,
            _ => {}
        }
        self.cx = self.cx.min(self.current_row().map_or(0, Row::len));
    }

    /// Adjust `rowoff`/`coloff` so the cursor remains visible in a viewport of the given size.
    pub fn scroll(&mut self, screen_rows: usize, screen_cols: usize) {
        self.rowoff = self.rowoff.clamp(self.cy.saturating_sub(screen_rows.saturating_sub(1)), self.cy);
        let rx = self.rx();
        self.coloff = self.coloff.clamp(rx.saturating_sub(screen_cols.saturating_sub(1)), rx);
    }

    // ---- load / save --------------------------------------------------------------------------

    pub fn load(&mut self, path: &Path) -> Result<(), Error> {
        match std::fs::metadata(path) {
            Ok(meta) => {
                let ft = meta.file_type();
                if !(ft.is_file() || ft.is_symlink()) {
                    return Err(io::Error::new(ErrorKind::InvalidInput, "not a regular file").into());
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.rows = vec![Row::new(0, Vec::new())];
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        self.rows.clear();
        let file = File::open(path)?;
        for (i, line) in BufReader::new(file).split(b'\n').enumerate() {
            let mut bytes = line?;
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
            self.rows.push(Row::new(i, bytes));
        }
        let mut f = File::open(path)?;
        f.seek(io::SeekFrom::End(0))?;
        // BufReader::split doesn't yield a trailing empty row for a file ending in `\n`.
        f.seek(io::SeekFrom::Start(0))?;
        let ends_in_newline = {
            let mut buf = Vec::new();
            f.read_to_end(&mut buf)?;
            buf.last() == Some(&b'\n') || buf.is_empty()
        };
        if ends_in_newline {
            let idx = self.rows.len();
            self.rows.push(Row::new(idx, Vec::new()));
        }
        self.update_all_rows();
        self.dirty = 0;
        Ok(())
    }

    pub fn rows_to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (i, row) in self.rows.iter().enumerate() {
            out.extend_from_slice(&row.chars);
            if i + 1 != self.rows.len() {
                out.push(b'\n');
            }
        }
        out
    }

    pub fn save(&self, path: &str) -> Result<usize, io::Error> {
        let bytes = self.rows_to_bytes();
        let mut file = File::create(path)?;
        file.write_all(&bytes)?;
        file.set_len(bytes.len() as u64)?;
        file.sync_all()?;
        Ok(bytes.len())
    }

    /// Undo the last recorded edit, if any. Takes the stack out of `self` for the duration of the
    /// replay so the replay's own (inverse) mutation can borrow `self` mutably.
    #[cfg(feature = "undo")]
    pub fn undo_last(&mut self) -> bool {
        let mut stack = std::mem::take(&mut self.undo);
        let applied = stack.apply_undo(self);
        self.undo = stack;
        applied
    }

    // ---- search -------------------------------------------------------------------------------

    /// Plain substring search starting one position past the cursor, wrapping row-then-column.
    /// Returns the matched `(x, y, len)` and leaves the cursor/viewport positioned on it.
    pub fn find(&mut self, query: &[u8], forward: bool) -> Option<(usize, usize, usize)> {
        if query.is_empty() || self.rows.is_empty() {
            return None;
        }
        let n = self.rows.len();
        let step: isize = if forward { 1 } else { -1 };
        let mut y = self.cy as isize;
        for _ in 0..n {
            y = (y + step).rem_euclid(n as isize);
            let row = &self.rows[y as usize];
            if let Some(pos) = slice_find(&row.chars, query) {
                self.cy = y as usize;
                self.cx = pos;
                self.rowoff = self.cy;
                self.find_match = Some((self.cy, pos, query.len()));
                return Some((pos, self.cy, query.len()));
            }
        }
        None
    }
}

fn slice_find<T: PartialEq>(haystack: &[T], needle: &[T]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).find(|&i| haystack[i..].starts_with(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_delete_round_trip() {
        let mut b = Buffer::new(8);
        b.insert_byte(b'a');
        b.insert_byte(b'b');
        assert_eq!(b.rows[0].chars, b"ab");
        b.delete_char();
        assert_eq!(b.rows[0].chars, b"a");
        assert_eq!(b.cx, 1);
    }

    #[test]
    fn newline_splits_row() {
        let mut b = Buffer::new(8);
        b.insert_byte(b'a');
        b.insert_byte(b'b');
        b.cx = 1;
        b.insert_newline();
        assert_eq!(b.rows.len(), 2);
        assert_eq!(b.rows[0].chars, b"a");
        assert_eq!(b.rows[1].chars, b"b");
        assert_eq!((b.cx, b.cy), (0, 1));
    }

    #[test]
    fn backspace_merges_rows() {
        let mut b = Buffer::new(8);
        b.insert_byte(b'a');
        b.insert_newline();
        b.insert_byte(b'b');
        b.cx = 0;
        b.delete_char();
        assert_eq!(b.rows.len(), 1);
        assert_eq!(b.rows[0].chars, b"ab");
    }

    #[test]
    fn dirty_is_monotonic_until_save_resets() {
        let mut b = Buffer::new(8);
        assert_eq!(b.dirty, 0);
        b.insert_byte(b'x');
        assert_eq!(b.dirty, 1);
        b.insert_byte(b'y');
        assert_eq!(b.dirty, 2);
    }

    #[test]
    fn virtual_buffer_never_dirty() {
        let mut b = Buffer::new(8);
        b.filename = Some("*Messages*".to_string());
        b.insert_byte(b'x');
        assert!(!b.is_dirty());
    }

    #[test]
    fn selection_same_line() {
        let mut b = Buffer::new(8);
        for c in b"hello world".iter() {
            b.insert_byte(*c);
        }
        b.cx = 5;
        b.cy = 0;
        b.markx_for_test(0);
        assert_eq!(b.get_selection().unwrap(), b"hello");
    }

    #[test]
    fn cut_selection_removes_exact_bytes() {
        let mut b = Buffer::new(8);
        for c in b"hello world".iter() {
            b.insert_byte(*c);
        }
        b.cx = 5;
        b.markx_for_test(0);
        let cut = b.cut_selection().unwrap();
        assert_eq!(cut, b"hello");
        assert_eq!(b.rows[0].chars, b" world");
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        let mut b = Buffer::new(8);
        for c in b"line one\nline two".iter() {
            if *c == b'\n' {
                b.insert_newline();
            } else {
                b.insert_byte(*c);
            }
        }
        b.save(path.to_str().unwrap()).unwrap();
        let mut b2 = Buffer::new(8);
        b2.load(&path).unwrap();
        assert_eq!(b2.rows_to_bytes(), b.rows_to_bytes());
    }

    #[test]
    fn find_wraps_around() {
        let mut b = Buffer::new(8);
        b.load_from_str_for_test("alpha\nbeta\ngamma");
        b.cy = 2;
        b.cx = 5;
        let found = b.find(b"alpha", true);
        assert_eq!(found, Some((0, 0, 5)));
    }

    impl Buffer {
        fn markx_for_test(&mut self, x: usize) {
            self.markx = x as isize;
            self.marky = self.cy as isize;
        }

        fn load_from_str_for_test(&mut self, s: &str) {
            self.rows = s.lines().enumerate().map(|(i, l)| Row::new(i, l.as_bytes().to_vec())).collect();
            self.update_all_rows();
        }
    }
}
