//! Binary-name variables must carry the `{{exeExt}}` platform-extension token.
//!
//! `DUMMY_BIN: 'dummy'` resolves to `dummy` on every platform, so Windows
//! builds look for the wrong file. The fix appends the token inside the
//! existing quoting and replaces a hard-coded `.exe` suffix.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::manifest::{Manifest, parse_key_line, rewrite_lines};
use crate::core::rules::{FormatRule, Rule};
use crate::core::types::{Severity, Violation};

pub const NAME: &str = "exe-ext";
pub const TOKEN: &str = "{{exeExt}}";

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{-?\s*exeExt\s*-?\}\}").expect("valid exeExt regex"));

pub struct ExeExt;

/// Byte range of a scalar's text inside its line, excluding quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScalarSpan {
    start: usize,
    end: usize,
}

impl ExeExt {
    /// `(line index, span)` of every `*_BIN` value lacking the token.
    fn offenders(manifest: &Manifest) -> Vec<(usize, ScalarSpan)> {
        manifest
            .var_entry_indices()
            .filter(|(_, name)| name.strip_suffix("_BIN").is_some_and(|p| !p.is_empty()))
            .filter_map(|(idx, _)| {
                let line = &manifest.lines()[idx];
                let key_line = parse_key_line(line)?;
                let span = scalar_span(line, key_line.value_start)?;
                let text = &line[span.start..span.end];
                (!text.is_empty() && !TOKEN_RE.is_match(text)).then_some((idx, span))
            })
            .collect()
    }
}

impl Rule for ExeExt {
    fn name(&self) -> &'static str {
        NAME
    }

    fn check(&self, manifest: &Manifest) -> Vec<Violation> {
        Self::offenders(manifest)
            .into_iter()
            .map(|(idx, span)| {
                let line = &manifest.lines()[idx];
                let name = parse_key_line(line).map(|kl| kl.key).unwrap_or_default();
                Violation::new(
                    manifest.path(),
                    Some(idx + 1),
                    NAME,
                    Severity::Warning,
                    format!(
                        "binary variable {name} ('{}') should end with {TOKEN}",
                        &line[span.start..span.end]
                    ),
                )
            })
            .collect()
    }
}

impl FormatRule for ExeExt {
    fn fix(&self, manifest: &Manifest) -> String {
        let offenders = Self::offenders(manifest);
        rewrite_lines(manifest.raw(), |idx, line| {
            let (_, span) = offenders.iter().find(|(i, _)| *i == idx)?;
            let text = &line[span.start..span.end];
            let stem = text.strip_suffix(".exe").unwrap_or(text);
            Some(format!(
                "{}{stem}{TOKEN}{}",
                &line[..span.start],
                &line[span.end..]
            ))
        })
    }
}

/// Locate a single-line scalar value starting at `value_start`.
///
/// Returns `None` for empty values, block/flow collections, anchors, aliases,
/// tags, and unterminated quotes.
fn scalar_span(line: &str, value_start: usize) -> Option<ScalarSpan> {
    let value = &line[value_start..];
    let first = value.chars().next()?;
    match first {
        '\'' => {
            let bytes = value.as_bytes();
            let mut i = 1;
            while i < bytes.len() {
                if bytes[i] == b'\'' {
                    if bytes.get(i + 1) == Some(&b'\'') {
                        i += 2;
                        continue;
                    }
                    return Some(ScalarSpan {
                        start: value_start + 1,
                        end: value_start + i,
                    });
                }
                i += 1;
            }
            None
        }
        '"' => {
            let bytes = value.as_bytes();
            let mut i = 1;
            while i < bytes.len() {
                match bytes[i] {
                    b'\\' => i += 2,
                    b'"' => {
                        return Some(ScalarSpan {
                            start: value_start + 1,
                            end: value_start + i,
                        });
                    }
                    _ => i += 1,
                }
            }
            None
        }
        '{' | '[' | '|' | '>' | '&' | '*' | '!' | '#' => None,
        _ => {
            let end = value.find(" #").unwrap_or(value.len());
            let text = value[..end].trim_end();
            Some(ScalarSpan {
                start: value_start,
                end: value_start + text.len(),
            })
        }
    }
}
