//! Bare references to a manifest's own file should use the path variable.
//!
//! A command like `task -t ./taskfiles/Taskfile.golang.yml build` breaks as soon
//! as the file moves or is included from elsewhere; `{{.TASKFILE}}` always
//! points at the running manifest.

use crate::core::manifest::{Manifest, block_value, rewrite_lines};
use crate::core::rules::{FormatRule, Rule};
use crate::core::types::{Severity, Violation};

pub const NAME: &str = "self-reference";

pub struct SelfReference {
    placeholder: String,
}

impl SelfReference {
    pub fn new(path_var: &str) -> Self {
        Self {
            placeholder: format!("{{{{.{path_var}}}}}"),
        }
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    fn file_name(manifest: &Manifest) -> Option<&str> {
        manifest
            .path()
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| !name.is_empty())
    }
}

fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '/' | '-' | '~')
}

/// Byte ranges of path tokens in `line` that end in `file_name`.
///
/// A token extends left over path characters and `{{...}}` placeholders, so
/// `{{.ROOT_DIR}}/taskfiles/Taskfile.x.yml` is one token.
fn token_spans(line: &str, file_name: &str) -> Vec<(usize, usize)> {
    if line.trim_start().starts_with('#') {
        return Vec::new();
    }
    let mut spans = Vec::new();
    let mut from = 0;
    while let Some(pos) = line[from..].find(file_name) {
        let hit = from + pos;
        let end = hit + file_name.len();
        from = end;

        let before = line[..hit].chars().next_back();
        let after = line[end..].chars().next();
        let left_ok = before.is_none_or(|c| c == '/' || !is_path_char(c));
        // A trailing sentence period is not part of the path.
        let right_ok = match after {
            None => true,
            Some('.') => line[end + 1..]
                .chars()
                .next()
                .is_none_or(|c| !is_path_char(c)),
            Some(c) => !is_path_char(c),
        };
        if !left_ok || !right_ok {
            continue;
        }

        let mut start = hit;
        loop {
            let head = &line[..start];
            let trimmed = head.trim_end_matches(is_path_char);
            if trimmed.len() != head.len() {
                start = trimmed.len();
                continue;
            }
            if head.ends_with("}}")
                && let Some(open) = head.rfind("{{")
            {
                start = open;
                continue;
            }
            break;
        }
        spans.push((start, end));
    }
    spans
}

/// True when `start` is the first character of a plain (unquoted) scalar.
fn starts_plain_scalar(line: &str, start: usize) -> bool {
    let head = line[..start].trim_end();
    head.is_empty() || head.ends_with(':') || head.trim_start() == "-" || head.ends_with(" -")
}

fn is_flow_collection(value: &str) -> bool {
    value.starts_with(['[', '{']) && !value.starts_with("{{")
}

/// Start of the unquoted flow scalar that `head` ends inside, if any.
///
/// `sources: [a.go, Taskfile.x.yml]` puts the token in a flow scalar, where
/// `{{` would open a nested mapping.
fn flow_plain_start(head: &str) -> Option<usize> {
    let value = block_value(head);
    if !is_flow_collection(value) {
        return None;
    }
    let offset = head.len() - value.len();
    let bytes = value.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut boundary = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'{' if bytes.get(i + 1) == Some(&b'{') => {
                i = value[i..].find("}}").map_or(bytes.len(), |pos| i + pos + 2);
                continue;
            }
            b'[' | b'{' => {
                depth += 1;
                boundary = i + 1;
            }
            b']' | b'}' => {
                depth = depth.saturating_sub(1);
                boundary = i + 1;
            }
            b',' => boundary = i + 1,
            b':' if matches!(bytes.get(i + 1), Some(b' ' | b'\t')) => boundary = i + 1,
            b'\'' | b'"' if value[boundary..i].trim().is_empty() => quote = Some(b),
            _ => {}
        }
        i += 1;
    }
    if depth == 0 || quote.is_some() {
        return None;
    }
    Some(offset + value.len() - value[boundary..].trim_start().len())
}

/// End of the flow scalar that continues at `from`, before `,`, `]`, `}` or a
/// comment, with trailing blanks dropped.
fn flow_plain_end(line: &str, from: usize) -> usize {
    let bytes = line.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'{' if bytes.get(i + 1) == Some(&b'{') => {
                i = line[i..].find("}}").map_or(bytes.len(), |pos| i + pos + 2);
                continue;
            }
            b',' | b']' | b'}' => break,
            b'#' if bytes[i - 1] == b' ' => break,
            _ => {}
        }
        i += 1;
    }
    from + line[from..i].trim_end().len()
}

/// A byte range of the line rewritten as one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Region {
    start: usize,
    end: usize,
    /// Single-quote the rewritten range (a whole flow scalar).
    quote: bool,
}

fn regions(line: &str, spans: &[(usize, usize)]) -> Vec<Region> {
    let mut regions: Vec<Region> = Vec::new();
    for &(start, end) in spans {
        let region = match flow_plain_start(&line[..start]) {
            Some(scalar_start) => Region {
                start: scalar_start,
                end: flow_plain_end(line, end),
                quote: true,
            },
            None => Region {
                start,
                end,
                quote: false,
            },
        };
        if let Some(last) = regions.last_mut()
            && last.quote
            && region.quote
            && last.start == region.start
        {
            last.end = last.end.max(region.end);
            continue;
        }
        regions.push(region);
    }
    regions
}

fn yaml_single_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

impl Rule for SelfReference {
    fn name(&self) -> &'static str {
        NAME
    }

    fn check(&self, manifest: &Manifest) -> Vec<Violation> {
        let Some(file_name) = Self::file_name(manifest) else {
            return Vec::new();
        };
        manifest
            .lines()
            .iter()
            .enumerate()
            .filter_map(|(idx, line)| {
                let spans = token_spans(line, file_name);
                let (start, end) = *spans.first()?;
                Some(Violation::new(
                    manifest.path(),
                    Some(idx + 1),
                    NAME,
                    Severity::Warning,
                    format!(
                        "self-reference '{}' should use {}",
                        &line[start..end],
                        self.placeholder
                    ),
                ))
            })
            .collect()
    }
}

impl FormatRule for SelfReference {
    fn fix(&self, manifest: &Manifest) -> String {
        let Some(file_name) = Self::file_name(manifest) else {
            return manifest.raw().to_string();
        };
        rewrite_lines(manifest.raw(), |_, line| {
            let spans = token_spans(line, file_name);
            let (first_start, _) = *spans.first()?;

            let regions = regions(line, &spans);
            let mut out = line.to_string();
            for region in regions.iter().rev() {
                let mut text = line[region.start..region.end].to_string();
                for (start, end) in spans
                    .iter()
                    .rev()
                    .filter(|(start, _)| (region.start..region.end).contains(start))
                {
                    text.replace_range(start - region.start..end - region.start, &self.placeholder);
                }
                if region.quote {
                    text = yaml_single_quote(&text);
                }
                out.replace_range(region.start..region.end, &text);
            }

            // `{{` cannot open a plain scalar, so quote the whole scalar.
            let in_flow = regions.first().is_some_and(|region| region.quote)
                || is_flow_collection(block_value(&line[..first_start]));
            if !in_flow && starts_plain_scalar(line, first_start) {
                let scalar_end = out[first_start..]
                    .find(" #")
                    .map_or(out.len(), |pos| first_start + pos);
                let scalar = out[first_start..scalar_end].trim_end();
                let rest = &out[first_start + scalar.len()..];
                out = format!(
                    "{}{}{}",
                    &out[..first_start],
                    yaml_single_quote(scalar),
                    rest
                );
            }
            Some(out)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule() -> SelfReference {
        SelfReference::new("TASKFILE")
    }

    fn manifest(src: &str) -> Manifest {
        Manifest::from_source("taskfiles/Taskfile.golang.yml", src)
    }

    #[test]
    fn placeholder_uses_configured_variable() {
        assert_eq!(rule().placeholder(), "{{.TASKFILE}}");
        assert_eq!(SelfReference::new("SELF").placeholder(), "{{.SELF}}");
    }

    #[test]
    fn replaces_path_token_inside_command() {
        let m = manifest(
            "tasks:\n  build:\n    cmds:\n      - task -t ./taskfiles/Taskfile.golang.yml lint\n",
        );
        let violations = rule().check(&m);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].line(), Some(4));

        let fixed = rule().fix(&m);
        assert_eq!(
            fixed,
            "tasks:\n  build:\n    cmds:\n      - task -t {{.TASKFILE}} lint\n"
        );
        assert!(rule().check(&manifest(&fixed)).is_empty());
    }

    #[test]
    fn quotes_scalar_when_token_starts_the_value() {
        let m = manifest("vars:\n  SELF: ./taskfiles/Taskfile.golang.yml # me\n");
        assert_eq!(
            rule().fix(&m),
            "vars:\n  SELF: '{{.TASKFILE}}' # me\n"
        );
    }

    #[test]
    fn absorbs_leading_template_into_token() {
        let m = manifest("tasks:\n  a:\n    cmds:\n      - cat {{.ROOT_DIR}}/taskfiles/Taskfile.golang.yml\n");
        assert_eq!(
            rule().fix(&m),
            "tasks:\n  a:\n    cmds:\n      - cat {{.TASKFILE}}\n"
        );
    }

    #[test]
    fn ignores_other_files_and_comments() {
        let m = manifest(
            "# see Taskfile.golang.yml\ntasks:\n  a:\n    cmds:\n      - cat MyTaskfile.golang.yml Taskfile.golang.yml.bak Taskfile.golang.yaml\n",
        );
        assert!(rule().check(&m).is_empty());
        assert_eq!(rule().fix(&m), m.raw());
    }

    fn sources(fixed: &str) -> Vec<serde_yaml::Value> {
        let doc: serde_yaml::Value = serde_yaml::from_str(fixed).expect("valid yaml");
        doc["tasks"]["build"]["sources"]
            .as_sequence()
            .expect("sources sequence")
            .clone()
    }

    #[test]
    fn flow_sequence_item_stays_a_string() {
        let m = manifest("tasks:\n  build:\n    sources: [Taskfile.golang.yml, main.go]\n");
        let fixed = rule().fix(&m);
        assert_eq!(
            fixed,
            "tasks:\n  build:\n    sources: ['{{.TASKFILE}}', main.go]\n"
        );
        assert_eq!(
            sources(&fixed),
            vec![
                serde_yaml::Value::String("{{.TASKFILE}}".to_string()),
                serde_yaml::Value::String("main.go".to_string()),
            ]
        );
        assert!(rule().check(&manifest(&fixed)).is_empty());
        assert_eq!(rule().fix(&manifest(&fixed)), fixed);
    }

    #[test]
    fn flow_scalar_is_quoted_whole_and_quoted_items_are_left_alone() {
        let m = manifest(
            "tasks:\n  build:\n    sources: [go.mod, ./taskfiles/Taskfile.golang.yml.lock]\n",
        );
        assert!(rule().check(&m).is_empty(), "lock file is a different path");

        let m = manifest(
            "tasks:\n  build:\n    sources: [go.mod, cat Taskfile.golang.yml , 'x Taskfile.golang.yml']\n",
        );
        let fixed = rule().fix(&m);
        assert_eq!(
            fixed,
            "tasks:\n  build:\n    sources: [go.mod, 'cat {{.TASKFILE}}' , 'x {{.TASKFILE}}']\n"
        );
        let items = sources(&fixed);
        assert_eq!(items[1], serde_yaml::Value::String("cat {{.TASKFILE}}".to_string()));
        assert_eq!(items[2], serde_yaml::Value::String("x {{.TASKFILE}}".to_string()));
    }

    #[test]
    fn flow_mapping_value_is_quoted() {
        let m = manifest("includes:\n  self: {taskfile: ./Taskfile.golang.yml, optional: true}\n");
        assert_eq!(
            rule().fix(&m),
            "includes:\n  self: {taskfile: '{{.TASKFILE}}', optional: true}\n"
        );
    }

    #[test]
    fn token_followed_by_sentence_period_still_matches() {
        let spans = token_spans("- echo edit Taskfile.golang.yml.", "Taskfile.golang.yml");
        assert_eq!(spans, vec![(12, 31)]);
    }
}
