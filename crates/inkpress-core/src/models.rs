//! Core data models for posts and parsed markdown documents.
//!
//! These types are designed to be:
//! - **Serializable**: All types derive Serialize/Deserialize
//! - **Debuggable**: Derive Debug for easy inspection
//! - **Cloneable**: `Arc<[Post]>` friendly for shared ownership
//! - **Closed**: Document nodes are enums, every consumer matches exhaustively

use crate::utils::{normalize_category, parse_post_date};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reading speed used for `Post::reading_minutes`
const WORDS_PER_MINUTE: usize = 200;

/// A blog post: metadata plus the markdown body with frontmatter removed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub slug: String,
    pub category: String,
    pub title: String,
    pub summary: String,
    pub date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    pub content: String,
}

impl Post {
    /// Build a post from decoded frontmatter.
    ///
    /// `fallback_category` is the containing directory (local) or listing
    /// category (remote); a `category` key in the metadata wins over it.
    pub fn from_metadata(
        slug: impl Into<String>,
        fallback_category: &str,
        metadata: &Map<String, Value>,
        body: impl Into<String>,
    ) -> Self {
        let slug = slug.into();
        let category = metadata
            .get("category")
            .and_then(Value::as_str)
            .map(normalize_category)
            .unwrap_or_else(|| normalize_category(fallback_category));
        let title = metadata
            .get("title")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| slug.clone());
        let summary = metadata
            .get("summary")
            .or_else(|| metadata.get("description"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let date = metadata.get("date").and_then(|v| match v {
            Value::String(s) => parse_post_date(s),
            _ => None,
        });
        let featured = metadata
            .get("featured")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Self {
            slug,
            category,
            title,
            summary,
            date,
            tags: tags_from_value(metadata.get("tags")),
            featured,
            content: body.into(),
        }
    }

    /// Sort key in milliseconds; undated posts sort as the epoch.
    pub fn sort_key(&self) -> i64 {
        self.date.map(|d| d.timestamp_millis()).unwrap_or(0)
    }

    /// Estimated reading time in whole minutes (at least 1)
    pub fn reading_minutes(&self) -> usize {
        let words = self.content.split_whitespace().count();
        words.div_ceil(WORDS_PER_MINUTE).max(1)
    }

    /// Check if post carries a tag (case-insensitive)
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

fn tags_from_value(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::Array(arr)) => arr
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|t| !t.is_empty())
            .collect(),
        _ => vec![],
    }
}

/// A table-of-contents entry (levels 2 and 3 only)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TocHeading {
    pub id: String,
    pub text: String,
    pub level: u8,
}

// ============================================================================
// Document tree
// ============================================================================

/// A parsed markdown document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

/// A block-level node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Block {
    /// A heading; `id` is assigned by the transform pipeline
    Heading {
        level: u8,
        children: Vec<Inline>,
        id: Option<String>,
    },
    Paragraph {
        children: Vec<Inline>,
    },
    BlockQuote {
        children: Vec<Block>,
    },
    List {
        ordered: bool,
        start: Option<u64>,
        items: Vec<ListItem>,
    },
    /// A fenced or indented code block.
    ///
    /// `info` is the raw fence info string; `meta` is the render-time copy of
    /// whatever follows the language tag.
    Code {
        language: Option<String>,
        info: String,
        meta: Option<String>,
        content: String,
    },
    Table {
        alignments: Vec<TableAlignment>,
        header: Vec<Vec<Inline>>,
        rows: Vec<Vec<Vec<Inline>>>,
    },
    Image {
        src: String,
        alt: String,
        title: Option<String>,
    },
    Rule,
    Html {
        value: String,
    },
}

impl Block {
    /// Visible text of this block, markup stripped
    #[must_use]
    pub fn to_plain_text(&self) -> String {
        match self {
            Self::Heading { children, .. } | Self::Paragraph { children } => {
                inline_text(children)
            }
            Self::BlockQuote { children } => children
                .iter()
                .map(Self::to_plain_text)
                .collect::<Vec<_>>()
                .join("\n"),
            Self::List { items, .. } => items
                .iter()
                .map(ListItem::to_plain_text)
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Code { content, .. } => content.clone(),
            Self::Table { header, rows, .. } => {
                let mut lines = vec![
                    header
                        .iter()
                        .map(|c| inline_text(c))
                        .collect::<Vec<_>>()
                        .join("\t"),
                ];
                for row in rows {
                    lines.push(row.iter().map(|c| inline_text(c)).collect::<Vec<_>>().join("\t"));
                }
                lines.join("\n")
            }
            Self::Image { alt, .. } => alt.clone(),
            Self::Rule | Self::Html { .. } => String::new(),
        }
    }
}

/// An inline node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Inline {
    Text { value: String },
    Strong { children: Vec<Inline> },
    Emphasis { children: Vec<Inline> },
    Strikethrough { children: Vec<Inline> },
    /// Inline code span (`code`)
    Code { value: String },
    Link {
        url: String,
        title: Option<String>,
        children: Vec<Inline>,
    },
    Image {
        src: String,
        alt: String,
        title: Option<String>,
    },
    SoftBreak,
    HardBreak,
    Html { value: String },
}

impl Inline {
    /// Visible text of this inline node
    #[must_use]
    pub fn to_plain_text(&self) -> String {
        match self {
            Self::Text { value } | Self::Code { value } => value.clone(),
            Self::Strong { children }
            | Self::Emphasis { children }
            | Self::Strikethrough { children }
            | Self::Link { children, .. } => inline_text(children),
            Self::Image { alt, .. } => alt.clone(),
            Self::SoftBreak | Self::HardBreak => " ".to_string(),
            Self::Html { .. } => String::new(),
        }
    }
}

/// Flatten a run of inline nodes into their visible text.
pub fn inline_text(inlines: &[Inline]) -> String {
    inlines.iter().map(Inline::to_plain_text).collect()
}

/// A list item with optional checkbox and nested blocks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListItem {
    /// For task lists: Some(true) = checked, Some(false) = unchecked, None = not a task
    pub checked: Option<bool>,
    pub children: Vec<Block>,
}

impl ListItem {
    #[must_use]
    pub fn to_plain_text(&self) -> String {
        self.children
            .iter()
            .map(Block::to_plain_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Table column alignment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TableAlignment {
    Left,
    Center,
    Right,
    None,
}
