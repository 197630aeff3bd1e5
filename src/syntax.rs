//! # Syntax configuration
//!
//! Per-language highlighting rules: keyword lists, comment delimiters, and which of
//! numbers/strings get highlighted at all. A handful of built-ins are bundled for immediate
//! usability; [`Conf::get`] additionally consults the `syntax.d` directories discovered by
//! [`crate::xdg::syntax_dirs`].

use std::path::Path;

use crate::config::process_ini_file;
use crate::row::HlType;
use crate::Error;

/// Syntax highlighting configuration for one file type. `None` (the default) disables
/// highlighting entirely: [`crate::row::Row::update_syntax`] leaves every byte `Normal`.
#[derive(Debug, Clone, Default)]
pub struct Conf {
    inner: Option<ConfInner>,
}

#[derive(Debug, Clone)]
struct ConfInner {
    name: String,
    /// Keywords in declaration order, each tagged primary or secondary; matched in this order so
    /// an earlier, more specific entry always wins over a later one that happens to be a prefix.
    keywords: Vec<(String, HlType)>,
    singleline_comment: Option<Vec<u8>>,
    mlcomment_open: Option<Vec<u8>>,
    mlcomment_close: Option<Vec<u8>>,
    highlight_numbers: bool,
    highlight_strings: bool,
}

impl Conf {
    #[must_use]
    pub fn none() -> Self { Self { inner: None } }

    #[must_use]
    pub fn is_none(&self) -> bool { self.inner.is_none() }

    #[must_use]
    pub fn name(&self) -> &str { self.inner.as_ref().map_or("no ft", |c| c.name.as_str()) }

    #[must_use]
    pub fn singleline_comment(&self) -> Option<&[u8]> {
        self.inner.as_ref().and_then(|c| c.singleline_comment.as_deref())
    }

    #[must_use]
    pub fn mlcomment_open(&self) -> Option<&[u8]> {
        self.inner.as_ref().and_then(|c| c.mlcomment_open.as_deref())
    }

    #[must_use]
    pub fn mlcomment_close(&self) -> Option<&[u8]> {
        self.inner.as_ref().and_then(|c| c.mlcomment_close.as_deref())
    }

    #[must_use]
    pub fn highlight_numbers(&self) -> bool { self.inner.as_ref().is_some_and(|c| c.highlight_numbers) }

    #[must_use]
    pub fn highlight_strings(&self) -> bool { self.inner.as_ref().is_some_and(|c| c.highlight_strings) }

    /// If `bytes` starts with a keyword (primary or secondary, boundary-checked by the caller),
    /// return its byte length and highlight tag.
    #[must_use]
    pub fn match_keyword(&self, bytes: &[u8]) -> Option<(usize, HlType)> {
        let inner = self.inner.as_ref()?;
        for (kw, tag) in &inner.keywords {
            if bytes.starts_with(kw.as_bytes()) {
                return Some((kw.len(), *tag));
            }
        }
        None
    }

    pub fn set_keywords(&mut self, name: &str, keywords: Vec<String>) {
        let keywords = keywords
            .into_iter()
            .map(|kw| match kw.strip_suffix('|') {
                Some(stripped) => (stripped.to_string(), HlType::Keyword2),
                None => (kw, HlType::Keyword1),
            })
            .collect();
        let inner = self.inner.get_or_insert_with(|| ConfInner::new(name.to_string()));
        inner.keywords = keywords;
    }

    pub fn set_comments(&mut self, single: Option<Vec<u8>>, open: Option<Vec<u8>>, close: Option<Vec<u8>>) {
        let inner = self.inner.get_or_insert_with(|| ConfInner::new(String::new()));
        inner.singleline_comment = single;
        inner.mlcomment_open = open;
        inner.mlcomment_close = close;
    }

    pub fn set_highlight_numbers(&mut self, on: bool) {
        self.inner.get_or_insert_with(|| ConfInner::new(String::new())).highlight_numbers = on;
    }

    pub fn set_highlight_strings(&mut self, on: bool) {
        self.inner.get_or_insert_with(|| ConfInner::new(String::new())).highlight_strings = on;
    }

    /// Find a syntax configuration matching `extension`, first among the built-ins, then by
    /// scanning the `syntax.d` directories. Returns `Ok(None)` if nothing matches (the caller
    /// should keep the editor's current `Conf::none()`).
    pub fn get(extension: &str, syntax_dirs: &[std::path::PathBuf]) -> Result<Option<Self>, Error> {
        if let Some(builtin) = builtin(extension) {
            return Ok(Some(builtin));
        }
        for dir in syntax_dirs {
            let Ok(entries) = std::fs::read_dir(dir) else { continue };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("conf") {
                    continue;
                }
                if let Some(conf) = load_conf_file(&path, extension)? {
                    return Ok(Some(conf));
                }
            }
        }
        Ok(None)
    }

    #[cfg(test)]
    #[must_use]
    pub fn new_for_test(
        keyword1: Vec<String>,
        keyword2_raw: Vec<String>,
        singleline_comment: Option<Vec<u8>>,
        mlcomment_open: Option<Vec<u8>>,
        mlcomment_close: Option<Vec<u8>>,
        highlight_numbers: bool,
        highlight_strings: bool,
    ) -> Self {
        let keywords = keyword1
            .into_iter()
            .map(|k| (k, HlType::Keyword1))
            .chain(
                keyword2_raw
                    .into_iter()
                    .map(|k| (k.strip_suffix('|').map(str::to_string).unwrap_or(k), HlType::Keyword2)),
            )
            .collect();
        Self {
            inner: Some(ConfInner {
                name: "test".to_string(),
                keywords,
                singleline_comment,
                mlcomment_open,
                mlcomment_close,
                highlight_numbers,
                highlight_strings,
            }),
        }
    }
}

impl ConfInner {
    fn new(name: String) -> Self {
        Self {
            name,
            keywords: Vec::new(),
            singleline_comment: None,
            mlcomment_open: None,
            mlcomment_close: None,
            highlight_numbers: true,
            highlight_strings: true,
        }
    }
}

/// A small set of bundled syntaxes, so the editor highlights common files out of the box even
/// with no `syntax.d` configuration present.
fn builtin(extension: &str) -> Option<Conf> {
    let (name, kw1, kw2, sc, mo, mc): (
        &str,
        &[&str],
        &[&str],
        Option<&str>,
        Option<&str>,
        Option<&str>,
    ) = match extension {
        "c" | "h" => (
            "c",
            &["switch", "if", "while", "for", "break", "continue", "return", "else", "struct",
              "union", "typedef", "static", "enum", "case"],
            &["int", "long", "double", "float", "char", "unsigned", "signed", "void"],
            Some("//"),
            Some("/*"),
            Some("*/"),
        ),
        "rs" => (
            "rust",
            &["fn", "let", "mut", "if", "else", "while", "for", "loop", "match", "return",
              "struct", "enum", "impl", "trait", "pub", "use", "mod", "break", "continue"],
            &["i8", "i16", "i32", "i64", "u8", "u16", "u32", "u64", "usize", "isize", "f32",
              "f64", "bool", "str", "String", "Vec", "Option", "Result"],
            Some("//"),
            Some("/*"),
            Some("*/"),
        ),
        "lua" => (
            "lua",
            &["function", "end", "if", "then", "else", "elseif", "while", "do", "for", "repeat",
              "until", "return", "local", "break"],
            &["nil", "true", "false", "table", "string", "number"],
            Some("--"),
            Some("--[["),
            Some("]]"),
        ),
        _ => return None,
    };
    let mut conf = Conf { inner: Some(ConfInner::new(name.to_string())) };
    conf.set_keywords(name, kw1.iter().map(|s| s.to_string()).chain(kw2.iter().map(|s| format!("{s}|"))).collect());
    conf.set_comments(
        sc.map(str::as_bytes).map(<[u8]>::to_vec),
        mo.map(str::as_bytes).map(<[u8]>::to_vec),
        mc.map(str::as_bytes).map(<[u8]>::to_vec),
    );
    Some(conf)
}

/// Load one `.conf` file and return a [`Conf`] if its `extensions` key lists `extension`.
///
/// Expected keys: `extensions` (comma-separated), `keywords` (comma-separated, secondary
/// keywords suffixed with `|`), `singleline_comment`, `mlcomment_open`, `mlcomment_close`,
/// `highlight_numbers`, `highlight_strings` (both `true`/`false`).
fn load_conf_file(path: &Path, extension: &str) -> Result<Option<Conf>, Error> {
    let mut extensions = Vec::new();
    let mut keywords = Vec::new();
    let mut singleline_comment = None;
    let mut mlcomment_open = None;
    let mut mlcomment_close = None;
    let mut highlight_numbers = true;
    let mut highlight_strings = true;

    process_ini_file(path, &mut |key, value| {
        match key {
            "extensions" => extensions = value.split(',').map(|s| s.trim().to_string()).collect(),
            "keywords" => keywords = value.split(',').map(|s| s.trim().to_string()).collect(),
            "singleline_comment" => singleline_comment = Some(value.to_string()),
            "mlcomment_open" => mlcomment_open = Some(value.to_string()),
            "mlcomment_close" => mlcomment_close = Some(value.to_string()),
            "highlight_numbers" => highlight_numbers = value == "true",
            "highlight_strings" => highlight_strings = value == "true",
            _ => return Err(format!("unknown key {key:?}")),
        }
        Ok(())
    })?;

    if !extensions.iter().any(|e| e == extension) {
        return Ok(None);
    }

    let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("custom").to_string();
    let mut conf = Conf { inner: Some(ConfInner::new(name.clone())) };
    conf.set_keywords(&name, keywords);
    conf.set_comments(
        singleline_comment.map(String::into_bytes),
        mlcomment_open.map(String::into_bytes),
        mlcomment_close.map(String::into_bytes),
    );
    conf.set_highlight_numbers(highlight_numbers);
    conf.set_highlight_strings(highlight_strings);
    Ok(Some(conf))
}
