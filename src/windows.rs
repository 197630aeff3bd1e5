//! # sys (Windows)
//!
//! Windows-specific structs and functions. Imported as `sys` on Windows systems.

use std::io;

use winapi::um::wincon::{
    GetConsoleMode, GetConsoleScreenBufferInfo, SetConsoleMode, CONSOLE_SCREEN_BUFFER_INFO,
    ENABLE_ECHO_INPUT, ENABLE_LINE_INPUT, ENABLE_PROCESSED_INPUT, ENABLE_VIRTUAL_TERMINAL_INPUT,
};

use crate::Error;

/// On Windows, the terminal mode is a console mode bitmask rather than a termios struct.
pub type TermMode = u32;

pub fn stdin() -> Result<std::fs::File, Error> {
    Ok(std::fs::OpenOptions::new().read(true).open("CONIN$")?)
}

#[must_use]
pub fn stdout() -> std::fs::File {
    std::fs::OpenOptions::new().write(true).open("CONOUT$").expect("CONOUT$ should always be openable")
}

pub fn enable_raw_mode() -> Result<TermMode, Error> {
    use std::os::windows::io::AsRawHandle;
    let stdin = stdin()?;
    let handle = stdin.as_raw_handle().cast();
    let mut orig_mode: TermMode = 0;
    if unsafe { GetConsoleMode(handle, &mut orig_mode) } == 0 {
        return Err(io::Error::last_os_error().into());
    }
    let raw_mode = (orig_mode
        & !(ENABLE_ECHO_INPUT | ENABLE_LINE_INPUT | ENABLE_PROCESSED_INPUT))
        | ENABLE_VIRTUAL_TERMINAL_INPUT;
    if unsafe { SetConsoleMode(handle, raw_mode) } == 0 {
        return Err(io::Error::last_os_error().into());
    }
    Ok(orig_mode)
}

pub fn restore_mode(orig: &TermMode) -> Result<(), Error> {
    use std::os::windows::io::AsRawHandle;
    let stdin = stdin()?;
    let handle = stdin.as_raw_handle().cast();
    if unsafe { SetConsoleMode(handle, *orig) } == 0 {
        return Err(io::Error::last_os_error().into());
    }
    Ok(())
}

pub fn get_window_size() -> Result<(usize, usize), Error> {
    use std::os::windows::io::AsRawHandle;
    let stdout = stdout();
    let handle = stdout.as_raw_handle().cast();
    let mut info: CONSOLE_SCREEN_BUFFER_INFO = unsafe { std::mem::zeroed() };
    if unsafe { GetConsoleScreenBufferInfo(handle, &mut info) } == 0 {
        return Err(Error::InvalidWindowSize);
    }
    let cols = (info.srWindow.Right - info.srWindow.Left + 1) as usize;
    let rows = (info.srWindow.Bottom - info.srWindow.Top + 1) as usize;
    Ok((rows, cols))
}

/// Windows has no `SIGWINCH`; resize is detected by polling `get_window_size` periodically from
/// the main loop instead of via signal. Always reports "unchanged" here.
pub fn register_winsize_change_signal_handler() -> Result<(), Error> { Ok(()) }

pub fn has_window_size_changed() -> bool { false }
