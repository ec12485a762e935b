//! # Inkpress Parser
//!
//! Markdown processing for blog posts, built on `pulldown-cmark`.
//!
//! This crate provides:
//! - Frontmatter extraction (YAML between `---` delimiters)
//! - A structured document tree for CommonMark + tables, strikethrough and task lists
//! - Transforms: unique heading ids, code-fence meta forwarding, table of contents
//! - Diagram fences (`flow` / `diagram`) decoded and laid out into lanes
//! - Rendering to a typed node tree and to HTML, with callouts and runnable code
//!
//! ## Pipeline
//!
//! ```text
//! raw post ──parse_frontmatter──▶ body ──prepare──▶ Document ──Renderer──▶ [RenderNode] ──to_html──▶ String
//!                                              └──table_of_contents──▶ [TocHeading]
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use inkpress_parser::{ParsedContent, Renderer, to_html};
//!
//! let raw = r#"---
//! title: Shipping
//! ---
//!
//! ### Intro
//!
//! > [!TIP] Read the changelog.
//!
//! ### Intro
//! "#;
//!
//! let parsed = ParsedContent::parse(raw);
//! assert_eq!(parsed.metadata["title"], "Shipping");
//! assert_eq!(parsed.toc[1].id, "intro-2");
//!
//! let html = to_html(&Renderer::new().render(&parsed.document));
//! assert!(html.contains("callout-tip"));
//! ```
//!
//! ### Diagrams
//!
//! ```
//! use inkpress_parser::diagram::interpret;
//!
//! let layout = interpret(r#"{"nodes": [{"id": "lane", "type": "group"}]}"#).unwrap();
//! assert_eq!(layout.nodes[0].height, 260.0);
//! assert!(interpret("no-json-here").is_err());
//! ```

mod blocks;
pub mod callouts;
pub mod diagram;
pub mod frontmatter;
pub mod html;
pub mod render;
pub mod runner;
pub mod transform;

pub use blocks::{fence_language, parse_document};
pub use callouts::{CalloutKind, detect_callout};
pub use diagram::{DiagramLayout, interpret as interpret_diagram};
pub use frontmatter::{Frontmatter, parse_frontmatter};
pub use html::{escape_html, to_html};
pub use render::{Clipboard, CodeKind, CopyNotice, RenderNode, Renderer, classify_code, copy_code};
pub use runner::{RunnableCode, detect_runnable};
pub use transform::{HeadingIds, Transform, prepare, slugify, table_of_contents};

// Re-export core types for consumers
pub use inkpress_core::{Block, Document, Inline, ListItem, TableAlignment, TocHeading};

use serde_json::{Map, Value};

/// Everything extracted from one raw post
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedContent {
    pub metadata: Map<String, Value>,
    /// Markdown after the frontmatter block
    pub body: String,
    pub document: Document,
    pub toc: Vec<TocHeading>,
}

impl ParsedContent {
    /// Split frontmatter, prepare the body and collect its table of contents
    pub fn parse(raw: &str) -> Self {
        let Frontmatter { metadata, body } = parse_frontmatter(raw);
        Self::from_parts(metadata, body)
    }

    /// Prepare an already separated body
    pub fn from_parts(metadata: Map<String, Value>, body: String) -> Self {
        let document = prepare(&body);
        let toc = table_of_contents(&document);
        Self {
            metadata,
            body,
            document,
            toc,
        }
    }

    /// Render straight to HTML with a default renderer
    pub fn to_html(&self) -> String {
        to_html(&Renderer::new().render(&self.document))
    }
}

pub mod prelude {
    pub use crate::ParsedContent;
    pub use crate::diagram::{DiagramLayout, LayoutKnobs};
    pub use crate::frontmatter::{Frontmatter, parse_frontmatter};
    pub use crate::render::{RenderNode, Renderer};
    pub use crate::transform::{prepare, table_of_contents};
    pub use inkpress_core::prelude::*;
}
