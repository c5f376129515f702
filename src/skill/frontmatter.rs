//! Frontmatter metadata for skill documents.
//!
//! A document may open with a `---` line, a block of `key: value` pairs and a
//! closing `---` line. Values are either scalars or lists. Parsing never fails:
//! anything that is not recognizable metadata yields `None`, which callers treat
//! as "no structured metadata".

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::trace;

pub const FRONTMATTER_DELIMITER: &str = "---";

/// A single frontmatter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FrontmatterValue {
    Scalar(String),
    List(Vec<String>),
}

impl FrontmatterValue {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(value) => Some(value.as_str()),
            Self::List(_) => None,
        }
    }

    /// List view of the value; a non-empty scalar becomes a one-element list.
    #[must_use]
    pub fn to_list(&self) -> Vec<String> {
        match self {
            Self::Scalar(value) if value.trim().is_empty() => Vec::new(),
            Self::Scalar(value) => vec![value.clone()],
            Self::List(items) => items.clone(),
        }
    }
}

pub type Frontmatter = BTreeMap<String, FrontmatterValue>;

/// Split a document into its raw metadata block and the remaining body.
///
/// Splitting happens on the delimiter itself, so the first three segments are
/// the (empty) prefix, the metadata and the body.
#[must_use]
pub fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let trimmed = content.trim_start();
    if !trimmed.starts_with(FRONTMATTER_DELIMITER) {
        return None;
    }
    let mut parts = trimmed.splitn(3, FRONTMATTER_DELIMITER);
    let _prefix = parts.next()?;
    let metadata = parts.next()?;
    let body = parts.next()?;
    Some((metadata, body))
}

/// Document body with any frontmatter removed.
#[must_use]
pub fn strip_frontmatter(content: &str) -> &str {
    split_frontmatter(content).map_or(content, |(_, body)| body)
}

/// Parse the frontmatter block of a document.
///
/// The full YAML parser is tried first. When it cannot make sense of the block
/// (or the block is not a mapping) the minimal line parser gets a chance.
#[must_use]
pub fn parse_frontmatter(content: &str) -> Option<Frontmatter> {
    let (raw, _) = split_frontmatter(content)?;
    if let Some(parsed) = parse_yaml(raw) {
        return Some(parsed);
    }
    trace!("yaml frontmatter rejected, trying line parser");
    parse_minimal(raw)
}

fn parse_yaml(raw: &str) -> Option<Frontmatter> {
    let value: serde_yaml::Value = serde_yaml::from_str(raw).ok()?;
    let serde_yaml::Value::Mapping(mapping) = value else {
        return None;
    };

    let mut out = Frontmatter::new();
    for (key, value) in mapping {
        let Some(key) = yaml_scalar(&key) else {
            continue;
        };
        let converted = match value {
            serde_yaml::Value::Null => FrontmatterValue::Scalar(String::new()),
            serde_yaml::Value::Sequence(items) => {
                FrontmatterValue::List(items.iter().filter_map(yaml_scalar).collect())
            }
            other => match yaml_scalar(&other) {
                Some(scalar) => FrontmatterValue::Scalar(scalar),
                None => continue,
            },
        };
        out.insert(key, converted);
    }
    Some(out)
}

fn yaml_scalar(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Line-oriented fallback: `key: value`, `key: [a, b]`, and `- item` lines
/// continuing the previous key.
fn parse_minimal(raw: &str) -> Option<Frontmatter> {
    let mut out = Frontmatter::new();
    let mut open_list: Option<String> = None;

    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if let Some(item) = list_item(trimmed) {
            let key = open_list.as_ref()?;
            let Some(FrontmatterValue::List(items)) = out.get_mut(key) else {
                return None;
            };
            let item = unquote(item);
            if !item.is_empty() {
                items.push(item);
            }
            continue;
        }

        let (key, value) = trimmed.split_once(':')?;
        let key = key.trim();
        if key.is_empty() || key.contains(char::is_whitespace) {
            return None;
        }
        let value = value.trim();

        if value.is_empty() {
            open_list = Some(key.to_string());
            out.insert(key.to_string(), FrontmatterValue::List(Vec::new()));
        } else if let Some(inner) = value.strip_prefix('[') {
            let inner = inner.strip_suffix(']')?;
            open_list = None;
            out.insert(key.to_string(), FrontmatterValue::List(split_list(inner)));
        } else {
            open_list = None;
            out.insert(key.to_string(), FrontmatterValue::Scalar(unquote(value)));
        }
    }

    Some(out)
}

fn list_item(line: &str) -> Option<&str> {
    if line == "-" {
        return Some("");
    }
    line.strip_prefix("- ").map(str::trim)
}

/// Split a comma separated list, trimming quotes and dropping empty entries.
#[must_use]
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| unquote(item.trim()))
        .filter(|item| !item.is_empty())
        .collect()
}

fn unquote(value: &str) -> String {
    let value = value.trim();
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return value[1..value.len() - 1].to_string();
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(value: &str) -> FrontmatterValue {
        FrontmatterValue::Scalar(value.to_string())
    }

    fn list(values: &[&str]) -> FrontmatterValue {
        FrontmatterValue::List(values.iter().map(ToString::to_string).collect())
    }

    #[test]
    fn no_delimiter_means_no_metadata() {
        assert!(parse_frontmatter("# Title\n\nbody").is_none());
        assert!(parse_frontmatter("").is_none());
        assert!(parse_frontmatter("name: x\n---\n").is_none());
    }

    #[test]
    fn unclosed_block_means_no_metadata() {
        assert!(parse_frontmatter("---\nname: x\nbody without close").is_none());
    }

    #[test]
    fn parses_scalars_and_bracket_lists() {
        let doc = "---\nname: glass-card\ngrade: A\ntags: [ui, frontend]\n---\n# Glass\n";
        let meta = parse_frontmatter(doc).unwrap();
        assert_eq!(meta["name"], scalar("glass-card"));
        assert_eq!(meta["grade"], scalar("A"));
        assert_eq!(meta["tags"], list(&["ui", "frontend"]));
    }

    #[test]
    fn parses_dash_lists() {
        let doc = "---\nname: api\npros:\n  - \"Fast\"\n  - \"Typed\"\ncons:\n  - \"None identified\"\n---\nbody";
        let meta = parse_frontmatter(doc).unwrap();
        assert_eq!(meta["pros"], list(&["Fast", "Typed"]));
        assert_eq!(meta["cons"], list(&["None identified"]));
    }

    #[test]
    fn falls_back_to_line_parser_when_yaml_rejects() {
        // A bare colon inside a value is invalid YAML but fine for the line parser.
        let doc = "---\nname: deploy\ndescription: run: then test\n---\n";
        let meta = parse_frontmatter(doc).unwrap();
        assert_eq!(meta["description"], scalar("run: then test"));
    }

    #[test]
    fn unrecognized_structure_yields_none() {
        let doc = "---\nthis is not metadata at all\n---\nbody";
        assert!(parse_frontmatter(doc).is_none());
    }

    #[test]
    fn yaml_numbers_become_scalars() {
        let doc = "---\nversion: 2\nenabled: true\n---\n";
        let meta = parse_frontmatter(doc).unwrap();
        assert_eq!(meta["version"], scalar("2"));
        assert_eq!(meta["enabled"], scalar("true"));
    }

    #[test]
    fn split_returns_body() {
        let (meta, body) = split_frontmatter("---\na: b\n---\nhello").unwrap();
        assert_eq!(meta.trim(), "a: b");
        assert_eq!(body.trim(), "hello");
        assert_eq!(strip_frontmatter("plain").trim(), "plain");
    }

    #[test]
    fn to_list_views() {
        assert_eq!(scalar("one").to_list(), vec!["one".to_string()]);
        assert!(scalar("  ").to_list().is_empty());
        assert_eq!(list(&["a", "b"]).to_list().len(), 2);
    }
}
