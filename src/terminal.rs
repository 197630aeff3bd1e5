//! # Terminal
//!
//! Raw-mode lifecycle, key decoding, and the cursor-position fallback for window size.
//!
//! Decoupled from `stdin`/`stdout` so the core can be driven from tests against an in-memory
//! byte sink with a fixed geometry instead of a real terminal.

use std::io::{Read, Write};

use crate::{sys, Error};

/// Arrow keys, independent of plain vs. Ctrl-modified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AKey {
    Left,
    Right,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKey {
    Up,
    Down,
}

/// A decoded keypress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Arrow(AKey),
    CtrlArrow(AKey),
    Page(PageKey),
    Home,
    End,
    Delete,
    Escape,
    Char(u8),
}

/// Decode one key from a byte stream, consuming as many bytes as the escape sequence requires.
/// Returns `Ok(None)` on a zero-byte read (the caller's poll timed out with nothing ready).
pub fn decode_key<R: Read>(mut bytes: R) -> Result<Option<Key>, Error> {
    let mut buf = [0u8; 1];
    if bytes.read(&mut buf)? == 0 {
        return Ok(None);
    }
    if buf[0] != b'\x1b' {
        return Ok(Some(Key::Char(buf[0])));
    }

    let mut next = || -> Result<Option<u8>, Error> {
        let mut b = [0u8; 1];
        Ok((bytes.read(&mut b)? != 0).then_some(b[0]))
    };

    let Some(kind) = next()? else { return Ok(Some(Key::Escape)) };
    if kind != b'[' && kind != b'O' {
        return Ok(Some(Key::Escape));
    }
    let Some(c0) = next()? else { return Ok(Some(Key::Escape)) };

    let key = match (kind, c0) {
        (b'[', b'A') => Key::Arrow(AKey::Up),
        (b'[', b'B') => Key::Arrow(AKey::Down),
        (b'[', b'C') => Key::Arrow(AKey::Right),
        (b'[', b'D') => Key::Arrow(AKey::Left),
        (_, b'H') => Key::Home,
        (_, b'F') => Key::End,
        (b'O', b'a') => Key::CtrlArrow(AKey::Up),
        (b'O', b'b') => Key::CtrlArrow(AKey::Down),
        (b'O', b'c') => Key::CtrlArrow(AKey::Right),
        (b'O', b'd') => Key::CtrlArrow(AKey::Left),
        (b'[', mut c) if c.is_ascii_digit() => {
            let mut d = next()?;
            if c == b'1' && d == Some(b';') {
                // <ESC>[1;5C == <ESC>[5C: 1 is the default (no-modifier) value.
                if let Some(nc) = next()? {
                    c = nc;
                    d = next()?;
                }
            }
            match (c, d) {
                (b'1' | b'7', Some(b'~')) => Key::Home,
                (b'4' | b'8', Some(b'~')) => Key::End,
                (b'3', Some(b'~')) => Key::Delete,
                (b'5', Some(b'~')) => Key::Page(PageKey::Up),
                (b'6', Some(b'~')) => Key::Page(PageKey::Down),
                (b'5', Some(b'A')) => Key::CtrlArrow(AKey::Up),
                (b'5', Some(b'B')) => Key::CtrlArrow(AKey::Down),
                (b'5', Some(b'C')) => Key::CtrlArrow(AKey::Right),
                (b'5', Some(b'D')) => Key::CtrlArrow(AKey::Left),
                _ => Key::Escape,
            }
        }
        _ => Key::Escape,
    };
    Ok(Some(key))
}

/// RAII guard enabling raw mode on construction and restoring the previous mode on drop.
pub struct RawMode {
    orig: sys::TermMode,
}

impl RawMode {
    pub fn enable() -> Result<Self, Error> { Ok(Self { orig: sys::enable_raw_mode()? }) }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Err(e) = sys::restore_mode(&self.orig) {
            log::error!("failed to restore terminal mode: {e}");
        }
    }
}

/// Query the window size by moving the cursor to the bottom-right corner and reading back its
/// reported position, for terminals where `TIOCGWINSZ`-equivalent queries are unavailable.
pub fn get_window_size_using_cursor() -> Result<(usize, usize), Error> {
    let mut stdout = sys::stdout();
    stdout.write_all(b"\x1b[999C\x1b[999B")?;
    stdout.flush()?;
    stdout.write_all(b"\x1b[6n")?;
    stdout.flush()?;

    let mut response = Vec::new();
    let mut byte = [0u8; 1];
    let mut stdin = sys::stdin()?;
    loop {
        if stdin.read(&mut byte)? == 0 || byte[0] == b'R' {
            break;
        }
        response.push(byte[0]);
    }
    let s = std::str::from_utf8(&response).map_err(|_| Error::CursorPosition)?;
    let s = s.trim_start_matches("\x1b[");
    let (rows, cols) = s.split_once(';').ok_or(Error::CursorPosition)?;
    let rows = rows.parse().map_err(|_| Error::CursorPosition)?;
    let cols = cols.parse().map_err(|_| Error::CursorPosition)?;
    Ok((rows, cols))
}

/// Map a non-`Char` key onto a private-use byte (0x80-0x8c) so the scripting bridge's `on_key` and
/// `key()` can dispatch on it through a single `u8`-taking/returning interface; `Char` keys are
/// passed through as their own byte. Symbolic keys thus "occupy code points ≥1000" conceptually,
/// collapsed here onto bytes outside 7-bit ASCII to keep the bridge single-byte. `Delete` is kept
/// off `0x7f` so it never collides with a literal Backspace byte passed through from `Key::Char`.
#[must_use]
pub fn key_to_byte(key: Key) -> u8 {
    match key {
        Key::Char(b) => b,
        Key::Arrow(AKey::Left) => 0x80,
        Key::Arrow(AKey::Right) => 0x81,
        Key::Arrow(AKey::Up) => 0x82,
        Key::Arrow(AKey::Down) => 0x83,
        Key::CtrlArrow(AKey::Left) => 0x84,
        Key::CtrlArrow(AKey::Right) => 0x85,
        Key::CtrlArrow(AKey::Up) => 0x86,
        Key::CtrlArrow(AKey::Down) => 0x87,
        Key::Home => 0x88,
        Key::End => 0x89,
        Key::Delete => 0x8c,
        Key::Page(PageKey::Up) => 0x8a,
        Key::Page(PageKey::Down) => 0x8b,
        Key::Escape => 0x1b,
    }
}

pub fn print_and_flush(s: &str) -> Result<(), Error> {
    let mut stdout = sys::stdout();
    stdout.write_all(s.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plain_char() {
        let key = decode_key(&b"a"[..]).unwrap().unwrap();
        assert_eq!(key, Key::Char(b'a'));
    }

    #[test]
    fn decodes_arrow_keys() {
        assert_eq!(decode_key(&b"\x1b[A"[..]).unwrap().unwrap(), Key::Arrow(AKey::Up));
        assert_eq!(decode_key(&b"\x1b[D"[..]).unwrap().unwrap(), Key::Arrow(AKey::Left));
    }

    #[test]
    fn decodes_delete_and_page_keys() {
        assert_eq!(decode_key(&b"\x1b[3~"[..]).unwrap().unwrap(), Key::Delete);
        assert_eq!(decode_key(&b"\x1b[5~"[..]).unwrap().unwrap(), Key::Page(PageKey::Up));
    }

    #[test]
    fn decodes_ctrl_arrow_with_default_modifier_prefix() {
        assert_eq!(decode_key(&b"\x1b[1;5C"[..]).unwrap().unwrap(), Key::CtrlArrow(AKey::Right));
    }

    #[test]
    fn empty_input_is_none() {
        assert_eq!(decode_key(&b""[..]).unwrap(), None);
    }

    #[test]
    fn bare_escape_is_escape_key() {
        assert_eq!(decode_key(&b"\x1b"[..]).unwrap().unwrap(), Key::Escape);
    }

    #[test]
    fn delete_and_backspace_map_to_distinct_bytes() {
        assert_ne!(key_to_byte(Key::Delete), key_to_byte(Key::Char(127)));
    }
}
