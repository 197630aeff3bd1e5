//! # Configuration
//!
//! Utilities to configure the text editor.

use std::fmt::Display;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::{xdg, Error};

#[derive(Debug, PartialEq)]
pub struct Config {
    /// The size of a tab. Must be > 0.
    pub tab_size: usize,
    /// The number of confirmations a bound script command may want before quitting a dirty
    /// buffer. The core itself does not enforce this; `exit()` is unconditional.
    pub quit_times: usize,
    /// The duration for which messages are shown in the status bar.
    pub message_dur: Duration,
    /// Directories searched for a `syntax.d` subdirectory of highlight definitions.
    pub conf_dirs: Vec<PathBuf>,
    /// Locations searched, in order, for the user's Lua script.
    pub script_dirs: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tab_size: 8,
            quit_times: 2,
            message_dur: Duration::new(5, 0),
            conf_dirs: xdg::config_dirs(),
            script_dirs: xdg::script_paths(),
        }
    }
}

impl Config {
    /// Load the configuration, potentially overridden using `config.ini` files that can be
    /// located in one of [`xdg::config_dirs`] (system-wide, then user-level; later files
    /// override earlier ones key-by-key). Unknown keys are logged as warnings, not errors.
    ///
    /// # Errors
    ///
    /// Will return `Err` if one of the configuration files cannot be parsed.
    pub fn load() -> Result<Self, Error> {
        let mut config = Self::default();
        for dir in xdg::config_dirs() {
            let path = dir.join("config.ini");
            if !path.is_file() {
                continue;
            }
            log::debug!("loading configuration from {}", path.display());
            process_ini_file(&path, &mut |key, value| {
                match key {
                    "tab_size" => config.tab_size = parse_value(value)?,
                    "quit_times" => config.quit_times = parse_value(value)?,
                    "message_dur_secs" => config.message_dur = Duration::from_secs(parse_value(value)?),
                    other => {
                        log::warn!("{}: unknown configuration key {:?}", path.display(), other);
                    }
                }
                Ok(())
            })?;
        }
        Ok(config)
    }
}

/// Process an INI file.
///
/// The `kv_fn` function is called for each `key = value` pair in the file, in order. Blank lines
/// and lines starting with `#` or `;` are ignored. A `kv_fn` that returns `Err` aborts processing
/// with an [`Error::Config`] naming the offending line.
pub fn process_ini_file<F>(path: &Path, kv_fn: &mut F) -> Result<(), Error>
where F: FnMut(&str, &str) -> Result<(), String> {
    let file = std::fs::File::open(path)?;
    for (lineno, line) in std::io::BufReader::new(file).lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }
        let Some((key, value)) = trimmed.split_once('=') else {
            return Err(Error::Config(path.to_path_buf(), lineno + 1, format!("expected `key = value`, got {line:?}")));
        };
        let key = key.trim();
        let value = parse_value::<String, std::convert::Infallible>(value).unwrap_or_default();
        kv_fn(key, &value).map_err(|msg| Error::Config(path.to_path_buf(), lineno + 1, msg))?;
    }
    Ok(())
}

/// Trim a value (right-hand side of a key-value INI line) and parse it.
pub fn parse_value<T: FromStr<Err = E>, E: Display>(value: &str) -> Result<T, String> {
    value.trim().parse().map_err(|e| format!("invalid value {value:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_value_trims_and_parses() {
        let n: usize = parse_value(" 42 ").unwrap();
        assert_eq!(n, 42);
    }

    #[test]
    fn parse_value_reports_error() {
        let res: Result<usize, String> = parse_value("not a number");
        assert!(res.is_err());
    }

    #[test]
    fn process_ini_file_skips_comments_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "# comment\n\ntab_size = 4\n; also a comment\nquit_times = 3\n").unwrap();
        let mut seen = Vec::new();
        process_ini_file(&path, &mut |k, v| {
            seen.push((k.to_string(), v.to_string()));
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, vec![("tab_size".to_string(), "4".to_string()), ("quit_times".to_string(), "3".to_string())]);
    }

    #[test]
    fn process_ini_file_rejects_malformed_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "not_a_kv_pair\n").unwrap();
        let err = process_ini_file(&path, &mut |_, _| Ok(())).unwrap_err();
        assert!(matches!(err, Error::Config(_, 1, _)));
    }
}
