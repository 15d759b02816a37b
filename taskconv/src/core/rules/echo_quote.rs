//! Unquoted `echo` text with shell or YAML metacharacters.
//!
//! `- echo Installing: foo` is parsed by YAML as a mapping, and
//! `- echo done; rm -rf x` runs a second command. The fix shell-quotes the text
//! and single-quotes the whole YAML scalar:
//! `- 'echo "Installing: foo"'`.
//!
//! Lines inside `|` and `>` block scalars are shell text and never rewritten.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::manifest::{Manifest, rewrite_lines};
use crate::core::rules::{FormatRule, Rule, template_spans};
use crate::core::types::{Severity, Violation};

pub const NAME: &str = "echo-quote";

static ECHO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<lead>[ \t]*(?:-[ \t]+)?(?:cmd:[ \t]+)?)(?P<cmd>echo(?:[ \t]+-[neE]+)*)[ \t]+(?P<text>\S.*)$")
        .expect("valid echo regex")
});

const SHELL_UNSAFE: [char; 9] = [';', '&', '|', '<', '>', '(', ')', '*', '?'];

pub struct EchoQuote;

/// An `echo` command line split into the parts the fix rebuilds.
#[derive(Debug, Clone, PartialEq, Eq)]
struct EchoLine<'a> {
    lead: &'a str,
    cmd: &'a str,
    text: &'a str,
    /// Trailing YAML comment including its leading whitespace.
    comment: &'a str,
    quoted: bool,
}

fn parse_echo(line: &str) -> Option<EchoLine<'_>> {
    let caps = ECHO_RE.captures(line)?;
    let lead = caps.name("lead")?.as_str();
    // A bare `echo` line is block-scalar content, not a YAML command entry.
    if lead.trim().is_empty() {
        return None;
    }
    let cmd = caps.name("cmd")?.as_str();
    let tail = caps.name("text")?;
    let tail_start = tail.start();
    let tail = tail.as_str();

    let first = tail.chars().next()?;
    if first == '"' || first == '\'' {
        let close = tail[1..].find(first)? + 1;
        let after = &tail[close + 1..];
        let trailing_comment = after.starts_with([' ', '\t']) && after.trim_start().starts_with('#');
        if after.trim().is_empty() || trailing_comment {
            let text_end = tail_start + close + 1;
            return Some(EchoLine {
                lead,
                cmd,
                text: &line[tail_start..text_end],
                comment: &line[text_end..],
                quoted: true,
            });
        }
    }

    let text_end = tail
        .find(" #")
        .or_else(|| tail.find("\t#"))
        .unwrap_or(tail.len());
    let text = tail[..text_end].trim_end();
    Some(EchoLine {
        lead,
        cmd,
        text,
        comment: &line[tail_start + text.len()..],
        quoted: false,
    })
}

/// Text with `{{...}}` placeholders removed; their contents are template syntax.
fn outside_templates(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut from = 0;
    for (start, end) in template_spans(text) {
        out.push_str(&text[from..start]);
        out.push(' ');
        from = end;
    }
    out.push_str(&text[from..]);
    out
}

fn yaml_unsafe(text: &str) -> bool {
    text.contains(": ") || text.ends_with(':') || text.contains(" #")
}

fn is_violation(echo: &EchoLine<'_>) -> bool {
    let bare = outside_templates(echo.text);
    if echo.quoted {
        return yaml_unsafe(&bare);
    }
    yaml_unsafe(&bare) || bare.contains(SHELL_UNSAFE) || bare.contains('`')
}

fn shell_double_quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        if matches!(c, '"' | '\\' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

fn yaml_single_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn fixed_line(echo: &EchoLine<'_>) -> String {
    let text = if echo.quoted {
        echo.text.to_string()
    } else {
        shell_double_quote(echo.text)
    };
    let scalar = format!("{} {}", echo.cmd, text);
    format!("{}{}{}", echo.lead, yaml_single_quote(&scalar), echo.comment)
}

impl Rule for EchoQuote {
    fn name(&self) -> &'static str {
        NAME
    }

    fn check(&self, manifest: &Manifest) -> Vec<Violation> {
        manifest
            .lines()
            .iter()
            .enumerate()
            .filter(|(idx, _)| !manifest.in_block_scalar(*idx))
            .filter_map(|(idx, line)| {
                let echo = parse_echo(line)?;
                is_violation(&echo).then(|| {
                    Violation::new(
                        manifest.path(),
                        Some(idx + 1),
                        NAME,
                        Severity::Warning,
                        format!("echo text {} should be quoted", echo.text),
                    )
                })
            })
            .collect()
    }
}

impl FormatRule for EchoQuote {
    fn fix(&self, manifest: &Manifest) -> String {
        rewrite_lines(manifest.raw(), |idx, line| {
            if manifest.in_block_scalar(idx) {
                return None;
            }
            let echo = parse_echo(line)?;
            is_violation(&echo).then(|| fixed_line(&echo))
        })
    }
}
