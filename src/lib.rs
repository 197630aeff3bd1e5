pub use crate::{config::Config, editor::Editor, error::Error, script::Engine};
pub use crate::terminal::RawMode;

mod ansi_escape;
pub mod buffer;
pub mod config;
pub mod editor;
mod error;
pub mod row;
mod script;
pub mod syntax;
pub mod terminal;
mod undo;
mod xdg;

#[cfg(unix)]
#[path = "unix.rs"]
mod sys;

#[cfg(windows)]
#[path = "windows.rs"]
mod sys;

/// Wraps `sys::stdin` for the binary crate, which cannot see the private `sys` module directly.
pub fn sys_stdin() -> Result<std::fs::File, Error> { sys::stdin() }

/// Install the platform's window-resize notification mechanism (a `SIGWINCH` handler on Unix; a
/// no-op on Windows, where resize is instead detected by polling).
pub fn sys_register_resize_handler() -> Result<(), Error> { sys::register_winsize_change_signal_handler() }

/// Drain and report whether a window-resize notification has arrived since the last call.
#[must_use]
pub fn sys_has_window_size_changed() -> bool { sys::has_window_size_changed() }

/// Decode one key from `bytes`, re-exported so the binary crate doesn't need its own copy of the
/// escape-sequence decoder.
pub fn terminal_decode_key<R: std::io::Read>(bytes: R) -> Result<Option<terminal::Key>, Error> {
    terminal::decode_key(bytes)
}
