#![allow(clippy::wildcard_imports)]

//! # Editor
//!
//! Global, process-wide state: the ordered list of open buffers, the current buffer index,
//! screen geometry, and the status line. Owns no terminal I/O itself beyond rendering into
//! whatever `Write` it is given, so it can be driven from tests without a real terminal.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::ansi_escape::*;
use crate::buffer::Buffer;
use crate::row::HlType;
use crate::{sys, terminal, Config, Error};

struct StatusMessage {
    msg: String,
    time: Instant,
}

pub struct Editor {
    files: Vec<Buffer>,
    current: usize,
    window_width: usize,
    screen_rows: usize,
    screen_cols: usize,
    status_msg: Option<StatusMessage>,
    config: Config,
    exit_requested: bool,
}

impl Editor {
    /// Construct an editor with a single empty virtual buffer and the given configuration.
    /// Does not touch the terminal; call [`Editor::update_window_size`] once raw mode is enabled.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let tab_size = config.tab_size;
        Self {
            files: vec![Buffer::new(tab_size)],
            current: 0,
            window_width: 80,
            screen_rows: 24,
            screen_cols: 80,
            status_msg: None,
            config,
            exit_requested: false,
        }
    }

    pub fn update_window_size(&mut self) -> Result<(), Error> {
        let (rows, cols) =
            sys::get_window_size().or_else(|_| terminal::get_window_size_using_cursor())?;
        self.window_width = cols;
        self.screen_rows = rows.saturating_sub(2);
        self.screen_cols = cols;
        Ok(())
    }

    #[must_use]
    pub fn screen_rows(&self) -> usize { self.screen_rows }

    #[must_use]
    pub fn screen_cols(&self) -> usize { self.screen_cols }

    #[must_use]
    pub fn config(&self) -> &Config { &self.config }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_msg = Some(StatusMessage { msg: msg.into(), time: Instant::now() });
    }

    pub fn request_exit(&mut self) { self.exit_requested = true; }

    #[must_use]
    pub fn should_exit(&self) -> bool { self.exit_requested }

    // ---- buffer access/management --------------------------------------------------------------

    #[must_use]
    pub fn current_buffer(&self) -> &Buffer { &self.files[self.current] }

    pub fn current_buffer_mut(&mut self) -> &mut Buffer { &mut self.files[self.current] }

    #[must_use]
    pub fn buffer_count(&self) -> usize { self.files.len() }

    #[must_use]
    pub fn current_index(&self) -> usize { self.current }

    /// Create a new, empty buffer and switch to it. Returns its index.
    pub fn create_buffer(&mut self) -> usize {
        self.files.push(Buffer::new(self.config.tab_size));
        self.current = self.files.len() - 1;
        self.current
    }

    /// Destroy the current buffer. Killing the last remaining buffer requests exit instead,
    /// matching the rule that an editor always has at least one buffer.
    pub fn kill_current_buffer(&mut self) {
        if self.files.len() <= 1 {
            self.request_exit();
            return;
        }
        self.files.remove(self.current);
        self.current = self.current.min(self.files.len() - 1);
    }

    pub fn select_buffer(&mut self, index: usize) {
        if index < self.files.len() {
            self.current = index;
        }
    }

    pub fn next_buffer(&mut self) { self.current = (self.current + 1) % self.files.len(); }

    pub fn prev_buffer(&mut self) {
        self.current = (self.current + self.files.len() - 1) % self.files.len();
    }

    /// Move the cursor up/down by one screenful, as repeated single-row motions (matching the
    /// `page_up`/`page_down` scripting primitives, which are themselves `screenrows - 1` repeats
    /// of `up`/`down`).
    pub fn page_up(&mut self) {
        for _ in 0..self.screen_rows.saturating_sub(1) {
            self.current_buffer_mut().move_cursor(crate::buffer::Direction::Up);
        }
    }

    pub fn page_down(&mut self) {
        for _ in 0..self.screen_rows.saturating_sub(1) {
            self.current_buffer_mut().move_cursor(crate::buffer::Direction::Down);
        }
    }

    // ---- prompt / incremental find mini-modes ------------------------------------------------

    /// `get_input`: display `<prompt><query>`, reading keys until ENTER (accept) or ESC (cancel).
    /// Printable bytes append; DEL/Ctrl-H/Backspace pop. Capped at 256 bytes.
    pub fn get_input<R: std::io::Read, W: Write>(
        &mut self,
        mut input: R,
        out: &mut W,
        prompt: &str,
    ) -> Result<Option<String>, Error> {
        const MAX_LEN: usize = 256;
        let mut query = String::new();
        loop {
            self.set_status(format!("{prompt}{query}"));
            self.refresh_screen(out)?;
            match terminal::decode_key(&mut input)? {
                Some(terminal::Key::Escape) => return Ok(None),
                Some(terminal::Key::Char(b'\r' | b'\n')) => return Ok(Some(query)),
                Some(terminal::Key::Delete | terminal::Key::Char(8 | 127)) => {
                    query.pop();
                }
                Some(terminal::Key::Char(b)) if (b as char).is_ascii_graphic() || b == b' ' => {
                    if query.len() < MAX_LEN {
                        query.push(b as char);
                    }
                }
                _ => {}
            }
        }
    }

    /// Incremental find: on every query edit, search forward from `last_match` (or the saved
    /// cursor on reset); ARROW_DOWN/RIGHT moves to the next match, ARROW_UP/LEFT to the previous.
    /// The match is overlaid with `HlType::Match`. ESC restores the original cursor/viewport; ENTER
    /// leaves the cursor at the match.
    pub fn enter_find_mode<R: std::io::Read, W: Write>(
        &mut self,
        mut input: R,
        out: &mut W,
    ) -> Result<(), Error> {
        let (saved_cx, saved_cy, saved_coloff, saved_rowoff) = {
            let b = self.current_buffer();
            (b.cx, b.cy, b.coloff, b.rowoff)
        };
        let mut query = String::new();
        let mut last_match: Option<usize> = None;

        loop {
            self.set_status(format!("Search: {query} (Use ESC/Arrows/Enter)"));
            self.refresh_screen(out)?;

            let mut step: isize = 0;
            match terminal::decode_key(&mut input)? {
                Some(terminal::Key::Delete | terminal::Key::Char(8 | 127)) => {
                    query.pop();
                    last_match = None;
                }
                Some(terminal::Key::Escape) => {
                    let b = self.current_buffer_mut();
                    b.cx = saved_cx;
                    b.cy = saved_cy;
                    b.coloff = saved_coloff;
                    b.rowoff = saved_rowoff;
                    b.find_match = None;
                    self.set_status("");
                    return Ok(());
                }
                Some(terminal::Key::Char(b'\r' | b'\n')) => {
                    self.current_buffer_mut().find_match = None;
                    self.set_status("");
                    return Ok(());
                }
                Some(terminal::Key::Arrow(terminal::AKey::Right | terminal::AKey::Down)) => step = 1,
                Some(terminal::Key::Arrow(terminal::AKey::Left | terminal::AKey::Up)) => step = -1,
                Some(terminal::Key::Char(b)) if (b as char).is_ascii_graphic() || b == b' ' => {
                    query.push(b as char);
                    last_match = None;
                }
                _ => {}
            }

            if last_match.is_none() {
                step = 1;
            }
            if step == 0 {
                continue;
            }

            let buffer = self.current_buffer_mut();
            let n = buffer.rows.len();
            let mut current = last_match.map_or(0, |m| m as isize) as isize;
            let mut found = None;
            for _ in 0..n {
                current = (current + step).rem_euclid(n as isize);
                if let Some(pos) = buffer.rows[current as usize]
                    .render
                    .windows(query.len().max(1))
                    .position(|w| !query.is_empty() && w == query.as_bytes())
                {
                    found = Some((current as usize, pos));
                    break;
                }
            }

            if let Some((row, col)) = found {
                last_match = Some(row);
                buffer.cy = row;
                buffer.cx = col;
                buffer.rowoff = row;
                buffer.coloff = 0;
                buffer.find_match = Some((row, col, query.len()));
            }
        }
    }

    /// Interactive buffer picker: draws the buffer list with the highlighted selection in
    /// reverse video, navigated with the up/down arrows, confirmed with Enter, cancelled with
    /// Escape. The up arrow decrements the highlighted offset (floored at zero); it does not
    /// jump straight back to the top of the list.
    pub fn choose_buffer<R: std::io::Read, W: Write>(
        &mut self,
        mut input: R,
        out: &mut W,
    ) -> Result<(), Error> {
        let mut offset = self.current;
        loop {
            let mut buf = String::new();
            buf.push_str(HIDE_CURSOR);
            buf.push_str(&move_cursor(1, 1));
            for (i, file) in self.files.iter().enumerate() {
                let name = file.filename.as_deref().unwrap_or("[No Name]");
                let marker = if file.is_dirty() { "*" } else { " " };
                let line = format!("{marker} {name}");
                if i == offset {
                    buf.push_str(REVERSE_VIDEO);
                }
                buf.push_str(&line);
                if i == offset {
                    buf.push_str(NO_REVERSE_VIDEO);
                }
                buf.push_str("\r\n");
            }
            buf.push_str(SHOW_CURSOR);
            out.write_all(buf.as_bytes())?;
            out.flush()?;

            match terminal::decode_key(&mut input)? {
                Some(terminal::Key::Arrow(terminal::AKey::Up)) => offset = offset.saturating_sub(1),
                Some(terminal::Key::Arrow(terminal::AKey::Down)) =>
                    offset = (offset + 1).min(self.files.len() - 1),
                Some(terminal::Key::Char(b'\r' | b'\n')) => {
                    self.select_buffer(offset);
                    return Ok(());
                }
                Some(terminal::Key::Escape) => return Ok(()),
                _ => {}
            }
        }
    }

    // ---- file I/O ---------------------------------------------------------------------------

    pub fn open_path(&mut self, path: &str) -> Result<(), Error> {
        let path = Path::new(path);
        self.current_buffer_mut().load(path)?;
        let ext = path.extension().and_then(std::ffi::OsStr::to_str).map(str::to_string);
        let syntax_dirs: Vec<PathBuf> = self.config.conf_dirs.iter().map(|d| d.join("syntax.d")).collect();
        self.current_buffer_mut().select_syntax(ext.as_deref(), &syntax_dirs)?;
        self.current_buffer_mut().filename = Some(path.to_string_lossy().to_string());
        Ok(())
    }

    /// Save the current buffer, to `name` if given, else to its existing file name.
    /// Returns whether the save succeeded; also posts a status message either way.
    pub fn save_current(&mut self, name: Option<String>) -> bool {
        let file_name = name.or_else(|| self.current_buffer().filename.clone());
        let Some(file_name) = file_name else {
            self.set_status("No file name");
            return false;
        };
        let result = self.current_buffer().save(&file_name);
        match result {
            Ok(n) => {
                self.set_status(format!("{} written to {}", format_size(n as u64), file_name));
                self.current_buffer_mut().dirty = 0;
                self.current_buffer_mut().filename = Some(file_name);
                true
            }
            Err(e) => {
                self.set_status(format!("Can't save! I/O error: {e}"));
                false
            }
        }
    }

    // ---- rendering ----------------------------------------------------------------------------

    pub fn refresh_screen<W: Write>(&mut self, out: &mut W) -> Result<(), Error> {
        let (screen_rows, screen_cols) = (self.screen_rows, self.screen_cols);
        self.current_buffer_mut().scroll(screen_rows, screen_cols);

        let mut buf = String::new();
        buf.push_str(HIDE_CURSOR);
        buf.push_str(&move_cursor(1, 1));

        self.draw_rows(&mut buf);
        self.draw_status_bar(&mut buf);
        self.draw_message_bar(&mut buf);

        let buffer = self.current_buffer();
        let cursor_row = buffer.cy - buffer.rowoff + 1;
        let cursor_col = buffer.rx() - buffer.coloff + 1;
        buf.push_str(&move_cursor(cursor_row, cursor_col));
        buf.push_str(SHOW_CURSOR);

        out.write_all(buf.as_bytes())?;
        out.flush()?;
        Ok(())
    }

    fn draw_rows(&self, buf: &mut String) {
        let buffer = self.current_buffer();
        for screen_y in 0..self.screen_rows {
            buf.push_str(CLEAR_LINE_RIGHT_OF_CURSOR);
            let file_row = screen_y + buffer.rowoff;
            if let Some(row) = buffer.rows.get(file_row) {
                self.draw_row(buf, row, buffer, file_row);
            } else if buffer.is_empty() && screen_y == self.screen_rows / 3 {
                let welcome = format!("scriptedit {}", env!("CARGO_PKG_VERSION"));
                buf.push_str(&format!("{welcome:^1$.1$}", self.screen_cols));
            }
            buf.push_str("\r\n");
        }
    }

    fn draw_row(&self, buf: &mut String, row: &crate::row::Row, buffer: &Buffer, file_row: usize) {
        let selection = selection_span_for_row(buffer, file_row);
        let find_match = buffer
            .find_match
            .filter(|&(r, _, _)| r == file_row)
            .map(|(_, col, len)| (col, col + len));
        let start = buffer.coloff;
        let end = (start + self.screen_cols).min(row.render.len());
        if start >= row.render.len() {
            return;
        }
        let mut current_tag: Option<HlType> = None;
        for (i, &b) in row.render[start..end].iter().enumerate() {
            let col = start + i;
            let mut tag = row.hl.get(col).copied().unwrap_or(HlType::Normal);
            if let Some((m_start, m_end)) = find_match {
                if col >= m_start && col < m_end {
                    tag = HlType::Match;
                }
            }
            if let Some((sel_start, sel_end)) = selection {
                if col >= sel_start && col < sel_end {
                    tag = HlType::Selection;
                }
            }

            if tag == HlType::NonPrint {
                if current_tag == Some(HlType::Selection) {
                    buf.push_str(BG_RESET);
                }
                buf.push_str(NONPRINT_BG);
                buf.push('?');
                buf.push_str(BG_RESET);
                current_tag = None;
                continue;
            }

            if tag == HlType::Selection {
                if current_tag != Some(HlType::Selection) {
                    buf.push_str(SELECTION_BG);
                    buf.push_str(&format!("\x1b[{}m", color_code(tag)));
                    current_tag = Some(tag);
                }
            } else {
                if current_tag == Some(HlType::Selection) {
                    buf.push_str(BG_RESET);
                    current_tag = None;
                }
                if Some(tag) != current_tag {
                    buf.push_str(&format!("\x1b[{}m", color_code(tag)));
                    current_tag = Some(tag);
                }
            }
            buf.push(b as char);
        }
        if current_tag == Some(HlType::Selection) {
            buf.push_str(BG_RESET);
        }
        buf.push_str(RESET_FMT);
    }

    fn draw_status_bar(&self, buf: &mut String) {
        let buffer = self.current_buffer();
        buf.push_str(REVERSE_VIDEO);
        let name = buffer.filename.as_deref().unwrap_or("<NONE>");
        let modified = if buffer.is_dirty() { " (modified)" } else { "" };
        let mut left = format!("File {}/{}: {:.32}{}", self.current + 1, self.files.len(), name, modified);
        left.truncate(self.screen_cols);
        let right = format!("Col:{} Row:{}/{}", buffer.rx() + 1, buffer.cy + 1, buffer.rows.len());
        buf.push_str(&left);
        if left.len() + right.len() <= self.screen_cols {
            buf.push_str(&" ".repeat(self.screen_cols - left.len() - right.len()));
            buf.push_str(&right);
        }
        buf.push_str(NO_REVERSE_VIDEO);
        buf.push_str("\r\n");
    }

    fn draw_message_bar(&self, buf: &mut String) {
        buf.push_str(CLEAR_LINE_RIGHT_OF_CURSOR);
        if let Some(sm) = &self.status_msg {
            if sm.time.elapsed() < self.config.message_dur {
                buf.push_str(&sm.msg[..sm.msg.len().min(self.screen_cols)]);
            }
        }
    }
}

/// `(start, end)` render-column range of the selection overlay on `file_row`, if the selection
/// intersects it. On the mark's row (if not the cursor row), covers mark-column to end of row; on
/// the cursor's row (if not the mark row), covers start to cursor-column; intervening rows are
/// fully covered; on a single-row selection, the exact column interval.
fn selection_span_for_row(buffer: &Buffer, file_row: usize) -> Option<(usize, usize)> {
    let (mx, my) = buffer.mark()?;
    let (cx, cy) = (buffer.cx, buffer.cy);
    let (sx, sy, ex, ey) = if (my, mx) <= (cy, cx) { (mx, my, cx, cy) } else { (cx, cy, mx, my) };
    if file_row < sy || file_row > ey {
        return None;
    }
    let row_len = buffer.rows.get(file_row).map_or(0, crate::row::Row::len);
    Some(match file_row {
        r if sy == ey && r == sy => (sx, ex),
        r if r == sy => (sx, row_len),
        r if r == ey => (0, ex),
        _ => (0, row_len),
    })
}

/// Pretty-format a size in bytes (`1.00KiB`-style, matching a typical binary-prefix editor status
/// line).
fn format_size(n: u64) -> String {
    if n < 1024 {
        return format!("{n}B");
    }
    let i = (64 - n.leading_zeros() + 9) / 10 - 1;
    let q = 100 * n / (1024 << ((i - 1) * 10));
    format!("{}.{:02}{}B", q / 100, q % 100, b" kMGTPEZ"[i as usize] as char)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_size_small() {
        assert_eq!(format_size(42), "42B");
    }

    #[test]
    fn format_size_kib() {
        assert_eq!(format_size(2048), "2.00kB");
    }

    #[test]
    fn new_editor_has_one_buffer() {
        let editor = Editor::new(Config::default());
        assert_eq!(editor.buffer_count(), 1);
        assert_eq!(editor.current_index(), 0);
    }

    #[test]
    fn create_and_kill_buffer() {
        let mut editor = Editor::new(Config::default());
        editor.create_buffer();
        assert_eq!(editor.buffer_count(), 2);
        editor.kill_current_buffer();
        assert_eq!(editor.buffer_count(), 1);
        assert!(!editor.should_exit());
    }

    #[test]
    fn killing_last_buffer_requests_exit() {
        let mut editor = Editor::new(Config::default());
        editor.kill_current_buffer();
        assert!(editor.should_exit());
        assert_eq!(editor.buffer_count(), 1);
    }

    #[test]
    fn choose_buffer_up_arrow_decrements_not_resets() {
        let mut editor = Editor::new(Config::default());
        editor.create_buffer();
        editor.create_buffer();
        editor.select_buffer(2);
        let mut out = Vec::new();
        // Up, Up, Enter: from offset 2, two decrements land on 0, not a reset-then-relative jump.
        let input = b"\x1b[A\x1b[A\r".to_vec();
        editor.choose_buffer(&input[..], &mut out).unwrap();
        assert_eq!(editor.current_index(), 0);
    }

    #[test]
    fn selection_span_single_row() {
        let mut buffer = Buffer::new(8);
        for c in b"hello" {
            buffer.insert_byte(*c);
        }
        buffer.cx = 0;
        buffer.set_mark();
        buffer.cx = 3;
        assert_eq!(selection_span_for_row(&buffer, 0), Some((0, 3)));
    }
}
