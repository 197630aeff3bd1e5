//! # Errors

use std::fmt;

/// Error type.
#[derive(Debug)]
pub enum Error {
    /// Wrapper around `std::io::Error`.
    Io(std::io::Error),
    /// Error returned when the window size obtained through a system call is invalid.
    InvalidWindowSize,
    /// Error setting or retrieving the cursor position.
    CursorPosition,
    /// Configuration error. The three attributes correspond to the file path, the line number and
    /// the error message.
    Config(std::path::PathBuf, usize, String),
    /// Too many arguments given on the command line. The attribute is the total argument count.
    TooManyArguments(usize),
    /// Unrecognized option given as a command line argument.
    UnrecognizedOption(String),
    /// No script could be loaded from any of the configured locations, and none was given
    /// explicitly with `--config`.
    NoScriptLoaded,
    /// A script failed to load or compile.
    Script(mlua::Error),
    /// There is no buffer at the requested index.
    NoSuchBuffer(usize),
    /// An operation that requires at least one buffer was attempted on an editor with none.
    NoCurrentBuffer,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::InvalidWindowSize => write!(f, "invalid terminal window size"),
            Self::CursorPosition => write!(f, "could not determine cursor position"),
            Self::Config(path, line, msg) =>
                write!(f, "{}:{}: {}", path.display(), line, msg),
            Self::TooManyArguments(n) => write!(f, "too many arguments ({n})"),
            Self::UnrecognizedOption(opt) => write!(f, "unrecognized option: {opt}"),
            Self::NoScriptLoaded => write!(f, "no script could be loaded"),
            Self::Script(e) => write!(f, "script error: {e}"),
            Self::NoSuchBuffer(i) => write!(f, "no buffer at index {i}"),
            Self::NoCurrentBuffer => write!(f, "no current buffer"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Script(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self { Self::Io(err) }
}

impl From<mlua::Error> for Error {
    fn from(err: mlua::Error) -> Self { Self::Script(err) }
}
