//! Directive line parser.
//!
//! A directive is the first line of a code cell, written as
//! `%name key1=val1 key2="quoted value" ...`:
//! - Tokens are split shell-style, so quotes group words and are removed.
//! - Each token after the directive name is a `key=value` pair, split on the
//!   first `=`. Later duplicates overwrite earlier ones.
//! - Some values are comma lists (`environments=a,b`) or comma lists of
//!   pairs (`sqlParams=k1=v1,k2=v2`); see [`split_csv`] and [`parse_pair_list`].

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use arcexport_shared::{ArcExportError, Result};
use regex::Regex;
use tracing::trace;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The directives the exporter knows how to rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    /// `%arc`: drop the directive line, keep the rest verbatim.
    Arc,
    /// `%sql`: rewrite into an `SQLTransform` stage.
    Sql,
    /// `%sqlvalidate`: rewrite into an `SQLValidate` stage.
    SqlValidate,
}

impl DirectiveKind {
    /// Prefix that selects this kind, including the leading `%`.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Arc => "%arc",
            Self::Sql => "%sql",
            Self::SqlValidate => "%sqlvalidate",
        }
    }
}

/// How a (left-trimmed) cell source is classified by its first characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellDirective {
    /// No leading `%`: ordinary code.
    Plain,
    /// One of the recognized directive prefixes.
    Known(DirectiveKind),
    /// A `%`-prefixed line the exporter does not understand (e.g. `%%bash`).
    Unknown(String),
}

/// A parsed directive line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Which directive matched.
    pub kind: DirectiveKind,
    /// The raw first line, kept for error messages.
    pub line: String,
    /// `key=value` parameters following the directive token.
    pub params: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// Matches the magic name after one or two `%` signs.
static MAGIC_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^%{1,2}(\S*)").expect("magic name regex"));

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Classify an already left-trimmed source.
///
/// Matching is by prefix, and `%sqlvalidate` is tested before `%sql` so the
/// longer directive wins.
pub fn classify(trimmed: &str) -> CellDirective {
    if !trimmed.starts_with('%') {
        return CellDirective::Plain;
    }

    for kind in [DirectiveKind::Arc, DirectiveKind::SqlValidate, DirectiveKind::Sql] {
        if trimmed.starts_with(kind.prefix()) {
            return CellDirective::Known(kind);
        }
    }

    let name = MAGIC_NAME_RE
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    CellDirective::Unknown(name)
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse the first line of a directive cell into its parameters.
///
/// The directive token itself is discarded; every remaining token must
/// contain an `=`.
pub fn parse_directive(kind: DirectiveKind, line: &str) -> Result<Directive> {
    let line = line.trim_end_matches('\r');
    let tokens = shlex::split(&escape_comment_marks(line))
        .ok_or_else(|| ArcExportError::malformed(line, "unbalanced quotes"))?;

    let mut params = BTreeMap::new();
    for token in tokens.into_iter().skip(1) {
        let (key, value) = token.split_once('=').ok_or_else(|| {
            ArcExportError::malformed(line, format!("expected key=value, got `{token}`"))
        })?;
        params.insert(key.to_string(), value.to_string());
    }

    trace!(?kind, param_count = params.len(), "parsed directive");

    Ok(Directive {
        kind,
        line: line.to_string(),
        params,
    })
}

/// Backslash-escape every unquoted `#` that begins a word.
///
/// `shlex` drops the rest of the line after such a `#`. Directive lines have
/// no comments, so `#` must reach the tokenizer as an ordinary character.
fn escape_comment_marks(line: &str) -> Cow<'_, str> {
    if !line.contains('#') {
        return Cow::Borrowed(line);
    }

    let mut out = String::with_capacity(line.len() + 4);
    let mut quote: Option<char> = None;
    let mut word_start = true;
    let mut chars = line.chars();

    while let Some(ch) = chars.next() {
        match (quote, ch) {
            (None, ' ' | '\t' | '\n') => {
                out.push(ch);
                word_start = true;
                continue;
            }
            (None, '#') if word_start => out.push_str("\\#"),
            (None | Some('"'), '\\') => {
                out.push(ch);
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            (None, '"' | '\'') => {
                quote = Some(ch);
                out.push(ch);
            }
            (Some(q), c) if c == q => {
                quote = None;
                out.push(ch);
            }
            _ => out.push(ch),
        }
        word_start = false;
    }

    Cow::Owned(out)
}

/// Split a comma-delimited value into its items, keeping empty items.
pub fn split_csv(value: &str) -> Vec<String> {
    value.split(',').map(str::to_string).collect()
}

/// Parse a comma list of `key=value` pairs.
///
/// Each item must contain exactly one `=`. `line` is only used to build the
/// error.
pub fn parse_pair_list(line: &str, value: &str) -> Result<BTreeMap<String, String>> {
    let mut pairs = BTreeMap::new();
    for item in value.split(',') {
        let mut parts = item.split('=');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(key), Some(val), None) => {
                pairs.insert(key.to_string(), val.to_string());
            }
            _ => {
                return Err(ArcExportError::malformed(
                    line,
                    format!("expected key=value list item, got `{item}`"),
                ));
            }
        }
    }
    Ok(pairs)
}

impl Directive {
    /// Raw parameter value, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Parameter value, or the empty string when absent.
    pub fn get_or_empty(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_string()
    }

    /// Comma-split list parameter, empty when absent.
    pub fn list(&self, key: &str) -> Vec<String> {
        self.get(key).map(split_csv).unwrap_or_default()
    }

    /// Comma-separated `key=value` parameter, empty when absent.
    pub fn pairs(&self, key: &str) -> Result<BTreeMap<String, String>> {
        match self.get(key) {
            Some(value) => parse_pair_list(&self.line, value),
            None => Ok(BTreeMap::new()),
        }
    }

    /// Boolean parameter: true only for the literal `true`.
    pub fn flag(&self, key: &str) -> bool {
        self.get(key) == Some("true")
    }
}
