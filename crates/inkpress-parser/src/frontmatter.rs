//! Frontmatter extraction: `---\nYAML\n---`
//!
//! The block is recognized only at the very start of the document. Decoding
//! never fails outward: malformed YAML, or YAML that is not a mapping, is
//! logged and the document is returned untouched with empty metadata.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// Matches a leading `---` line, optional YAML, and a closing `---` line
static FRONTMATTER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\A---[ \t]*\r?\n(?:([\s\S]*?)\r?\n)?---[ \t]*(?:\r?\n|\z)").unwrap()
});

/// Decoded metadata and the remaining markdown body
#[derive(Debug, Clone, PartialEq)]
pub struct Frontmatter {
    pub metadata: Map<String, Value>,
    pub body: String,
}

impl Frontmatter {
    fn untouched(raw: &str) -> Self {
        Self {
            metadata: Map::new(),
            body: raw.to_string(),
        }
    }

    /// String value of a metadata key
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

/// Split a raw document into metadata and body.
///
/// # Example
/// ```
/// use inkpress_parser::parse_frontmatter;
///
/// let doc = parse_frontmatter("---\ntitle: Hello\n---\n\n# Body");
/// assert_eq!(doc.get_str("title"), Some("Hello"));
/// assert_eq!(doc.body, "# Body");
/// ```
pub fn parse_frontmatter(raw: &str) -> Frontmatter {
    let Some(caps) = FRONTMATTER_PATTERN.captures(raw) else {
        return Frontmatter::untouched(raw);
    };

    let yaml = caps.get(1).map(|m| m.as_str()).unwrap_or("");
    let block_end = caps.get(0).map(|m| m.end()).unwrap_or(0);
    let body = raw[block_end..].trim_start().to_string();

    if yaml.trim().is_empty() {
        return Frontmatter {
            metadata: Map::new(),
            body,
        };
    }

    match serde_yaml::from_str::<Value>(yaml) {
        Ok(Value::Object(metadata)) => Frontmatter { metadata, body },
        Ok(Value::Null) => Frontmatter {
            metadata: Map::new(),
            body,
        },
        Ok(other) => {
            log::warn!(
                "Frontmatter is not a key/value mapping (found {}), ignoring it",
                value_kind(&other)
            );
            Frontmatter::untouched(raw)
        }
        Err(e) => {
            log::warn!("Failed to decode frontmatter: {}", e);
            Frontmatter::untouched(raw)
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_frontmatter() {
        let doc = parse_frontmatter("---\ntitle: Test\n---\nContent here");
        assert_eq!(doc.get_str("title"), Some("Test"));
        assert_eq!(doc.body, "Content here");
    }

    #[test]
    fn test_multiline_frontmatter() {
        let content = "---\ntitle: Test\ntags:\n  - rust\n  - parser\n---\nContent";
        let doc = parse_frontmatter(content);
        assert_eq!(doc.metadata["tags"], serde_json::json!(["rust", "parser"]));
        assert_eq!(doc.body, "Content");
    }

    #[test]
    fn test_no_frontmatter() {
        let content = "Just content\nNo frontmatter";
        let doc = parse_frontmatter(content);
        assert!(doc.metadata.is_empty());
        assert_eq!(doc.body, content);
    }

    #[test]
    fn test_body_is_left_trimmed() {
        let doc = parse_frontmatter("---\ntitle: T\n---\n\n\n  Body\n");
        assert_eq!(doc.body, "Body\n");
    }

    #[test]
    fn test_closing_marker_at_end_of_input() {
        let doc = parse_frontmatter("---\ntitle: Test\n---");
        assert_eq!(doc.get_str("title"), Some("Test"));
        assert_eq!(doc.body, "");
    }

    #[test]
    fn test_empty_block() {
        let doc = parse_frontmatter("---\n---\nBody");
        assert!(doc.metadata.is_empty());
        assert_eq!(doc.body, "Body");
    }

    #[test]
    fn test_malformed_frontmatter_only_opening() {
        let content = "---\ntitle: Test\nNo closing";
        let doc = parse_frontmatter(content);
        assert!(doc.metadata.is_empty());
        assert_eq!(doc.body, content);
    }

    #[test]
    fn test_invalid_yaml_falls_back() {
        let content = "---\ntitle: [unclosed\n---\nBody";
        let doc = parse_frontmatter(content);
        assert!(doc.metadata.is_empty());
        assert_eq!(doc.body, content);
    }

    #[test]
    fn test_non_mapping_yaml_falls_back() {
        let content = "---\n- a\n- b\n---\nBody";
        let doc = parse_frontmatter(content);
        assert!(doc.metadata.is_empty());
        assert_eq!(doc.body, content);
    }

    #[test]
    fn test_marker_must_start_document() {
        let content = "Intro\n---\ntitle: x\n---\n";
        let doc = parse_frontmatter(content);
        assert!(doc.metadata.is_empty());
        assert_eq!(doc.body, content);
    }

    #[test]
    fn test_body_never_contains_block() {
        let doc = parse_frontmatter("---\ntitle: T\ndate: 2024-01-01\n---\nText\n---\nMore");
        assert!(!doc.body.contains("title: T"));
        assert!(doc.body.starts_with("Text"));
    }

    #[test]
    fn test_crlf_line_endings() {
        let doc = parse_frontmatter("---\r\ntitle: Win\r\n---\r\nBody");
        assert_eq!(doc.get_str("title"), Some("Win"));
        assert_eq!(doc.body, "Body");
    }
}
