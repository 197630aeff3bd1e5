//! # sys (UNIX)
//!
//! UNIX-specific structs and functions. Imported as `sys` on UNIX systems.

use std::os::unix::io::FromRawFd;
use std::sync::atomic::{AtomicBool, Ordering::Relaxed};

// On UNIX systems, termios represents the terminal mode.
pub use libc::termios as TermMode;
use libc::{
    c_int, c_void, sigaction, sighandler_t, siginfo_t, winsize, SA_SIGINFO, STDIN_FILENO,
    STDOUT_FILENO, TCSADRAIN, TIOCGWINSZ, VMIN, VTIME,
};

use crate::Error;

static WINDOW_SIZE_CHANGED: AtomicBool = AtomicBool::new(false);

fn cerr(err: c_int) -> Result<(), Error> {
    match err {
        0..=c_int::MAX => Ok(()),
        _ => Err(std::io::Error::last_os_error().into()),
    }
}

/// `stdin`, wrapped so the key decoder can read it byte at a time without going through
/// `std::io::Stdin`'s line-buffering lock semantics.
pub fn stdin() -> Result<std::fs::File, Error> {
    Ok(unsafe { std::fs::File::from_raw_fd(libc::dup(STDIN_FILENO)) })
}

#[must_use]
pub fn stdout() -> std::fs::File { unsafe { std::fs::File::from_raw_fd(libc::dup(STDOUT_FILENO)) } }

/// Switch the terminal to raw mode (no echo, no line buffering, no signal generation on
/// Ctrl-C/Ctrl-Z, 8-bit clean), returning the previous mode so it can be restored later.
pub fn enable_raw_mode() -> Result<TermMode, Error> {
    let mut orig_mode = std::mem::MaybeUninit::uninit();
    cerr(unsafe { libc::tcgetattr(STDIN_FILENO, orig_mode.as_mut_ptr()) })?;
    let orig_mode = unsafe { orig_mode.assume_init() };

    let mut raw = orig_mode;
    unsafe {
        libc::cfmakeraw(&mut raw);
    }
    raw.c_oflag |= libc::OPOST;
    raw.c_cc[VMIN] = 0;
    raw.c_cc[VTIME] = 1;

    cerr(unsafe { libc::tcsetattr(STDIN_FILENO, TCSADRAIN, &raw) })?;
    Ok(orig_mode)
}

pub fn restore_mode(orig: &TermMode) -> Result<(), Error> {
    cerr(unsafe { libc::tcsetattr(STDIN_FILENO, TCSADRAIN, orig) })
}

/// Obtain the terminal window size via the `TIOCGWINSZ` ioctl, as `(rows, cols)`.
pub fn get_window_size() -> Result<(usize, usize), Error> {
    let mut ws: winsize = unsafe { std::mem::zeroed() };
    let ret = unsafe { libc::ioctl(STDOUT_FILENO, TIOCGWINSZ, std::ptr::addr_of_mut!(ws)) };
    if ret == -1 || ws.ws_col == 0 {
        return Err(Error::InvalidWindowSize);
    }
    Ok((ws.ws_row as usize, ws.ws_col as usize))
}

extern "C" fn handle_sigwinch(_sig: c_int, _info: *mut siginfo_t, _data: *mut c_void) {
    WINDOW_SIZE_CHANGED.store(true, Relaxed);
}

/// Install a `SIGWINCH` handler that records window-resize notifications in an atomic flag,
/// drained by [`has_window_size_changed`] at the top of the key-read loop.
pub fn register_winsize_change_signal_handler() -> Result<(), Error> {
    let mut action: sigaction = unsafe { std::mem::zeroed() };
    action.sa_sigaction = handle_sigwinch as sighandler_t;
    action.sa_flags = SA_SIGINFO;
    cerr(unsafe { sigaction(libc::SIGWINCH, &action, std::ptr::null_mut()) })
}

/// Drain and report whether a `SIGWINCH` has arrived since the last call.
pub fn has_window_size_changed() -> bool { WINDOW_SIZE_CHANGED.swap(false, Relaxed) }

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    // WINDOW_SIZE_CHANGED is a process-global static; serialize tests that touch it so they
    // don't observe each other's writes.
    #[test]
    #[serial]
    fn resize_flag_is_drained_exactly_once() {
        WINDOW_SIZE_CHANGED.store(false, Relaxed);
        handle_sigwinch(0, std::ptr::null_mut(), std::ptr::null_mut());
        assert!(has_window_size_changed());
        assert!(!has_window_size_changed());
    }
}
