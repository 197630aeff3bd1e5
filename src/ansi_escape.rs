//! # ANSI/VT100 escape sequences
//!
//! Constants shared by the renderer ([`crate::buffer`]) and the terminal layer
//! ([`crate::terminal`]).

pub const CLEAR_SCREEN: &str = "\x1b[2J";
pub const CURSOR_TOP_LEFT: &str = "\x1b[H";
pub const HIDE_CURSOR: &str = "\x1b[?25l";
pub const SHOW_CURSOR: &str = "\x1b[?25h";
pub const CLEAR_LINE_RIGHT_OF_CURSOR: &str = "\x1b[K";
pub const RESET_FMT: &str = "\x1b[39m";
pub const REVERSE_VIDEO: &str = "\x1b[7m";
pub const NO_REVERSE_VIDEO: &str = "\x1b[m";
/// Red background, used for the non-printable-byte placeholder (`ESC[41m?ESC[49m`).
pub const NONPRINT_BG: &str = "\x1b[41m";
/// Inverse (white) background used to overlay a selection span on top of its foreground color.
pub const SELECTION_BG: &str = "\x1b[47m";
/// Clears whichever of the two background codes above is active.
pub const BG_RESET: &str = "\x1b[49m";

/// Move the cursor to 1-based `(row, col)`.
#[must_use]
pub fn move_cursor(row: usize, col: usize) -> String { format!("\x1b[{};{}H", row, col) }

/// SGR foreground color code for a given highlight tag, matching the fixed 16-color palette.
#[must_use]
pub const fn color_code(tag: crate::row::HlType) -> u8 {
    use crate::row::HlType;
    match tag {
        HlType::Comment | HlType::MlComment => 36,
        HlType::Keyword1 => 33,
        HlType::Keyword2 => 32,
        HlType::String => 35,
        HlType::Number => 31,
        HlType::Match => 34,
        HlType::Selection => 30,
        HlType::Normal | HlType::NonPrint => 37,
    }
}
