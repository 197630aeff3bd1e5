//! # XDG directory discovery
//!
//! Locates the configuration and syntax directories used by [`crate::Config`], following the
//! XDG base directory convention on Unix and `%APPDATA%` on Windows.

use std::path::PathBuf;

const APP_NAME: &str = "scriptedit";

/// Directories searched, in order, for `config.ini` and a `syntax.d/` subdirectory.
///
/// - `/etc/scriptedit` (system-wide), Unix only.
/// - `$XDG_CONFIG_HOME/scriptedit` if set, else `$HOME/.config/scriptedit` (Unix), or
///   `%APPDATA%\scriptedit` (Windows).
#[must_use]
pub fn config_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    #[cfg(unix)]
    dirs.push(PathBuf::from("/etc").join(APP_NAME));

    #[cfg(unix)]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            dirs.push(PathBuf::from(xdg).join(APP_NAME));
        } else if let Some(home) = std::env::var_os("HOME") {
            dirs.push(PathBuf::from(home).join(".config").join(APP_NAME));
        }
    }

    #[cfg(windows)]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            dirs.push(PathBuf::from(appdata).join(APP_NAME));
        }
    }

    dirs
}

/// Directories searched, in order, for the per-user script file, then the per-directory one.
///
/// - `$HOME/.scriptedit.lua` (or `%APPDATA%\scriptedit.lua` on Windows).
/// - `./.scriptedit.lua` relative to the current working directory.
#[must_use]
pub fn script_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    #[cfg(unix)]
    if let Some(home) = std::env::var_os("HOME") {
        paths.push(PathBuf::from(home).join(".scriptedit.lua"));
    }
    #[cfg(windows)]
    if let Some(appdata) = std::env::var_os("APPDATA") {
        paths.push(PathBuf::from(appdata).join("scriptedit.lua"));
    }
    paths.push(PathBuf::from("./.scriptedit.lua"));
    paths
}

/// `syntax.d` directories derived from [`config_dirs`].
#[must_use]
pub fn syntax_dirs() -> Vec<PathBuf> {
    config_dirs().into_iter().map(|d| d.join("syntax.d")).collect()
}
