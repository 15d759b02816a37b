//! In-memory manifest model: raw text, line view, and a shallow structural view.
//!
//! A [`Manifest`] is built once from raw text and never mutated. The structural
//! view (variables, tasks, includes) comes from `serde_yaml`; line numbers come
//! from a light scanner over the raw lines so diagnostics and fixes can point
//! at exact lines without re-serializing the document.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde_yaml::Value;

static BLOCK_INDICATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[|>][-+0-9]*(?:[ \t]+#.*)?$").expect("valid block indicator regex")
});

/// Best-effort scalar view of a top-level `vars:` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarValue {
    Str(String),
    Bool(bool),
    Int(i64),
    /// String containing a `{{...}}` placeholder, kept verbatim.
    Template(String),
    /// Non-scalar value (e.g. `sh:` maps); only the name is meaningful.
    Dynamic,
}

impl VarValue {
    fn from_yaml(value: &Value) -> Self {
        match value {
            Value::String(s) if s.contains("{{") => VarValue::Template(s.clone()),
            Value::String(s) => VarValue::Str(s.clone()),
            Value::Bool(b) => VarValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => VarValue::Int(i),
                None => VarValue::Str(n.to_string()),
            },
            Value::Null => VarValue::Str(String::new()),
            Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => VarValue::Dynamic,
        }
    }

    /// True for `true`, `1`, `"1"` and `"true"` (case-insensitive).
    pub fn is_truthy(&self) -> bool {
        match self {
            VarValue::Bool(b) => *b,
            VarValue::Int(i) => *i == 1,
            VarValue::Str(s) => s == "1" || s.eq_ignore_ascii_case("true"),
            VarValue::Template(_) | VarValue::Dynamic => false,
        }
    }
}

/// A parsed Taskfile manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    raw: String,
    lines: Vec<String>,
    vars: BTreeMap<String, VarValue>,
    tasks: BTreeSet<String>,
    tasks_with_status: BTreeSet<String>,
    has_includes: bool,
    parse_error: Option<String>,
    outline: Outline,
    /// Per line: content of a `|` or `>` block scalar.
    block_scalar: Vec<bool>,
}

impl Manifest {
    /// Derive every view from `raw`. Never fails: unparseable YAML leaves the
    /// structural view empty and records [`Manifest::parse_error`].
    pub fn from_source(path: impl Into<PathBuf>, raw: impl Into<String>) -> Self {
        let path = path.into();
        let raw = raw.into();
        let lines = raw
            .split_inclusive('\n')
            .map(|chunk| split_line_ending(chunk).0.to_string())
            .collect::<Vec<_>>();
        let outline = Outline::scan(&lines);
        let block_scalar = block_scalar_mask(&lines);

        let mut manifest = Self {
            path,
            raw,
            lines,
            vars: BTreeMap::new(),
            tasks: BTreeSet::new(),
            tasks_with_status: BTreeSet::new(),
            has_includes: false,
            parse_error: None,
            outline,
            block_scalar,
        };

        match serde_yaml::from_str::<Value>(&manifest.raw) {
            Ok(Value::Mapping(root)) => manifest.absorb(&root),
            Ok(Value::Null) => {}
            Ok(_) => manifest.parse_error = Some("expected a mapping at the top level".to_string()),
            Err(err) => manifest.parse_error = Some(err.to_string()),
        }
        manifest
    }

    fn absorb(&mut self, root: &serde_yaml::Mapping) {
        if let Some(Value::Mapping(vars)) = root.get("vars") {
            for (key, value) in vars {
                if let Some(name) = key_string(key) {
                    self.vars.insert(name, VarValue::from_yaml(value));
                }
            }
        }

        if let Some(Value::Mapping(tasks)) = root.get("tasks") {
            for (key, body) in tasks {
                let Some(name) = key_string(key) else {
                    continue;
                };
                if let Value::Mapping(body) = body
                    && body.contains_key("status")
                {
                    self.tasks_with_status.insert(name.clone());
                }
                self.tasks.insert(name);
            }
        }

        self.has_includes = match root.get("includes") {
            Some(Value::Mapping(map)) => !map.is_empty(),
            Some(Value::Sequence(seq)) => !seq.is_empty(),
            _ => false,
        };
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Line contents without terminators, in file order (index 0 is line 1).
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn vars(&self) -> &BTreeMap<String, VarValue> {
        &self.vars
    }

    pub fn var(&self, name: &str) -> Option<&VarValue> {
        self.vars.get(name)
    }

    pub fn has_var(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn task_names(&self) -> &BTreeSet<String> {
        &self.tasks
    }

    pub fn has_task(&self, name: &str) -> bool {
        self.tasks.contains(name)
    }

    pub fn task_has_status(&self, name: &str) -> bool {
        self.tasks_with_status.contains(name)
    }

    pub fn has_includes(&self) -> bool {
        self.has_includes
    }

    /// Set when the YAML could not be structured.
    pub fn parse_error(&self) -> Option<&str> {
        self.parse_error.as_deref()
    }

    pub fn is_structured(&self) -> bool {
        self.parse_error.is_none()
    }

    /// 1-based line of the top-level `vars:` entry `name`.
    pub fn var_line(&self, name: &str) -> Option<usize> {
        self.outline.var_lines.get(name).map(|idx| idx + 1)
    }

    /// 1-based line of the task key `name`.
    pub fn task_line(&self, name: &str) -> Option<usize> {
        self.outline.task_lines.get(name).map(|idx| idx + 1)
    }

    /// 1-based line of a top-level section key such as `tasks:`.
    pub fn section_line(&self, name: &str) -> Option<usize> {
        self.outline
            .sections
            .iter()
            .find(|section| section.name == name)
            .map(|section| section.line + 1)
    }

    /// Line indices (0-based) of direct `vars:` entries, in file order.
    pub fn var_entry_indices(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        let mut entries = self
            .outline
            .var_lines
            .iter()
            .map(|(name, idx)| (*idx, name.as_str()))
            .collect::<Vec<_>>();
        entries.sort_unstable();
        entries.into_iter()
    }

    /// True when the 0-based line `idx` is inside a `|` or `>` block scalar.
    pub fn in_block_scalar(&self, idx: usize) -> bool {
        self.block_scalar.get(idx).copied().unwrap_or(false)
    }

    /// Name of the top-level section that contains the 0-based line `idx`.
    pub fn section_at(&self, idx: usize) -> Option<&str> {
        self.outline
            .sections
            .iter()
            .rev()
            .find(|section| section.line <= idx)
            .map(|section| section.name.as_str())
    }
}

fn key_string(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn split_line_ending(chunk: &str) -> (&str, &str) {
    if let Some(content) = chunk.strip_suffix("\r\n") {
        (content, "\r\n")
    } else if let Some(content) = chunk.strip_suffix('\n') {
        (content, "\n")
    } else {
        (chunk, "")
    }
}

/// Rebuild `raw`, replacing the content of lines for which `edit` returns
/// `Some`. Line terminators and every other byte are kept as-is.
pub fn rewrite_lines<F>(raw: &str, mut edit: F) -> String
where
    F: FnMut(usize, &str) -> Option<String>,
{
    let mut out = String::with_capacity(raw.len() + 64);
    for (idx, chunk) in raw.split_inclusive('\n').enumerate() {
        let (content, ending) = split_line_ending(chunk);
        match edit(idx, content) {
            Some(replacement) => out.push_str(&replacement),
            None => out.push_str(content),
        }
        out.push_str(ending);
    }
    out
}

/// The value part of a block-context line, after any `- ` item markers and
/// a `key:`. Works on line prefixes too.
pub fn block_value(line: &str) -> &str {
    let mut rest = line.trim_start();
    while let Some(item) = rest
        .strip_prefix('-')
        .filter(|item| item.starts_with([' ', '\t']))
    {
        rest = item.trim_start();
    }
    if rest.starts_with(['[', '{']) {
        return rest;
    }
    parse_key_line(rest).map_or(rest, |key_line| key_line.value.trim_start())
}

/// Mark lines that belong to a block scalar: everything indented deeper than
/// the line carrying the `|`/`>` indicator, blank lines included.
fn block_scalar_mask(lines: &[String]) -> Vec<bool> {
    let mut mask = Vec::with_capacity(lines.len());
    let mut parent: Option<usize> = None;
    for line in lines {
        let indent = line.len() - line.trim_start_matches(' ').len();
        if let Some(parent_indent) = parent {
            if line.trim().is_empty() || indent > parent_indent {
                mask.push(true);
                continue;
            }
            parent = None;
        }
        mask.push(false);
        if !line.trim_start().starts_with('#')
            && BLOCK_INDICATOR_RE.is_match(block_value(line).trim_end())
        {
            parent = Some(indent);
        }
    }
    mask
}

/// A `key: value` line split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLine<'a> {
    pub indent: usize,
    /// Key with surrounding quotes removed.
    pub key: &'a str,
    /// Byte offset in the line where the value starts (after `:` and spaces).
    pub value_start: usize,
    /// Everything after the colon, including any trailing comment.
    pub value: &'a str,
}

/// Split a block-mapping line into indent, key, and value.
///
/// Returns `None` for blanks, comments, list items, and lines without a key.
/// Keys may contain colons not followed by whitespace (`check:deps:`).
pub fn parse_key_line(line: &str) -> Option<KeyLine<'_>> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    let body = &line[indent..];
    let first = body.chars().next()?;
    if matches!(first, '#' | '-' | '\t') {
        return None;
    }

    let (key, after_key) = if first == '\'' || first == '"' {
        let close = body[1..].find(first)? + 1;
        (&body[1..close], close + 1)
    } else {
        let bytes = body.as_bytes();
        let colon = (0..bytes.len()).find(|&i| {
            bytes[i] == b':' && bytes.get(i + 1).is_none_or(|next| *next == b' ' || *next == b'\t')
        })?;
        (body[..colon].trim_end(), colon)
    };
    if key.is_empty() || !body[after_key..].starts_with(':') {
        return None;
    }

    let rest = &body[after_key + 1..];
    let trimmed = rest.trim_start();
    let value_start = indent + after_key + 1 + (rest.len() - trimmed.len());
    Some(KeyLine {
        indent,
        key,
        value_start,
        value: trimmed,
    })
}

#[derive(Debug, Clone, Default)]
struct Outline {
    sections: Vec<SectionMark>,
    var_lines: BTreeMap<String, usize>,
    task_lines: BTreeMap<String, usize>,
}

#[derive(Debug, Clone)]
struct SectionMark {
    name: String,
    line: usize,
}

impl Outline {
    fn scan(lines: &[String]) -> Self {
        let mut outline = Outline::default();
        let mut child_indent: Option<usize> = None;

        for (idx, line) in lines.iter().enumerate() {
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if !line.starts_with(' ') {
                if line.starts_with("---") || line.starts_with("...") {
                    continue;
                }
                if let Some(key_line) = parse_key_line(line) {
                    outline.sections.push(SectionMark {
                        name: key_line.key.to_string(),
                        line: idx,
                    });
                }
                child_indent = None;
                continue;
            }

            let Some(section) = outline.sections.last() else {
                continue;
            };
            let indent = line.len() - trimmed.len();
            let expected = *child_indent.get_or_insert(indent);
            if indent != expected {
                continue;
            }
            let Some(key_line) = parse_key_line(line) else {
                continue;
            };
            let target = match section.name.as_str() {
                "vars" => &mut outline.var_lines,
                "tasks" => &mut outline.task_lines,
                _ => continue,
            };
            target.entry(key_line.key.to_string()).or_insert(idx);
        }

        outline
    }
}
