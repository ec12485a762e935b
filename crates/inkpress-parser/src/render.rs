//! Document tree to render nodes.
//!
//! Every block and inline variant maps to exactly one [`RenderNode`] shape.
//! Special cases decided here:
//! - code: diagram fences, runnable playgrounds, inline vs block code
//! - block quotes: callouts vs plain quotes
//! - links: external targets open in a new tab
//!
//! Heading ids are taken from the document as-is; run the transform pipeline
//! first (see [`crate::transform::prepare`]).

use crate::callouts::{CalloutKind, detect_callout};
use crate::diagram::{self, DiagramLayout};
use crate::runner::{RunnableCode, detect_runnable};
use inkpress_core::{Block, Document, Inline, Result, TableAlignment};
use serde::Serialize;

/// Label shown for block code without a language tag
pub const PLAIN_TEXT_LABEL: &str = "TEXT";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum RenderNode {
    Heading {
        level: u8,
        id: Option<String>,
        children: Vec<RenderNode>,
    },
    Paragraph {
        children: Vec<RenderNode>,
    },
    Quote {
        children: Vec<RenderNode>,
    },
    Callout {
        kind: CalloutKind,
        children: Vec<RenderNode>,
    },
    List {
        ordered: bool,
        start: Option<u64>,
        items: Vec<RenderItem>,
    },
    /// Code with a header bar and copy button
    CodeBlock {
        language: Option<String>,
        label: String,
        meta: Option<String>,
        code: String,
    },
    InlineCode {
        code: String,
    },
    Runnable(RunnableCode),
    Diagram(DiagramLayout),
    DiagramError {
        message: String,
    },
    Table {
        alignments: Vec<TableAlignment>,
        header: Vec<Vec<RenderNode>>,
        rows: Vec<Vec<Vec<RenderNode>>>,
    },
    /// Always loaded lazily
    Image {
        src: String,
        alt: String,
        title: Option<String>,
    },
    Rule,
    RawHtml {
        html: String,
    },
    Text {
        text: String,
    },
    Strong {
        children: Vec<RenderNode>,
    },
    Emphasis {
        children: Vec<RenderNode>,
    },
    Strikethrough {
        children: Vec<RenderNode>,
    },
    Link {
        href: String,
        title: Option<String>,
        external: bool,
        children: Vec<RenderNode>,
    },
    SoftBreak,
    LineBreak,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderItem {
    pub checked: Option<bool>,
    pub children: Vec<RenderNode>,
}

/// How a code fragment is displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    Inline,
    Block,
}

/// Inline when there is no language tag and no newline; block otherwise
pub fn classify_code(language: Option<&str>, code: &str) -> CodeKind {
    if language.is_none_or(str::is_empty) && !code.contains('\n') {
        CodeKind::Inline
    } else {
        CodeKind::Block
    }
}

/// Header label for a code block
pub fn language_label(language: Option<&str>) -> String {
    match language {
        Some(lang) if !lang.is_empty() => lang.to_uppercase(),
        _ => PLAIN_TEXT_LABEL.to_string(),
    }
}

// ============================================================================
// Clipboard
// ============================================================================

/// Target of the copy button
pub trait Clipboard {
    fn write_text(&self, text: &str) -> Result<()>;
}

/// Short-lived confirmation shown after a copy attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyNotice {
    Copied,
    Failed,
}

impl CopyNotice {
    pub fn message(self) -> &'static str {
        match self {
            Self::Copied => "Copied!",
            Self::Failed => "Copy failed",
        }
    }
}

/// Copy code to the clipboard. Failures never propagate.
pub fn copy_code(clipboard: &dyn Clipboard, code: &str) -> CopyNotice {
    match clipboard.write_text(code) {
        Ok(()) => {
            log::debug!("Copied {} bytes of code", code.len());
            CopyNotice::Copied
        }
        Err(e) => {
            log::debug!("Clipboard write failed: {}", e);
            CopyNotice::Failed
        }
    }
}

// ============================================================================
// Renderer
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct Renderer {
    site_host: Option<String>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Links to this host are not treated as external
    pub fn with_site_host(mut self, host: impl Into<String>) -> Self {
        self.site_host = Some(host.into().to_ascii_lowercase());
        self
    }

    pub fn render(&self, document: &Document) -> Vec<RenderNode> {
        self.render_blocks(&document.blocks)
    }

    fn render_blocks(&self, blocks: &[Block]) -> Vec<RenderNode> {
        blocks.iter().map(|b| self.render_block(b)).collect()
    }

    fn render_inlines(&self, inlines: &[Inline]) -> Vec<RenderNode> {
        inlines.iter().map(|i| self.render_inline(i)).collect()
    }

    pub fn render_block(&self, block: &Block) -> RenderNode {
        match block {
            Block::Heading {
                level,
                children,
                id,
            } => RenderNode::Heading {
                level: *level,
                id: id.clone(),
                children: self.render_inlines(children),
            },
            Block::Paragraph { children } => RenderNode::Paragraph {
                children: self.render_inlines(children),
            },
            Block::BlockQuote { children } => match detect_callout(children) {
                Some((kind, content)) => RenderNode::Callout {
                    kind,
                    children: self.render_blocks(&content),
                },
                None => RenderNode::Quote {
                    children: self.render_blocks(children),
                },
            },
            Block::List {
                ordered,
                start,
                items,
            } => RenderNode::List {
                ordered: *ordered,
                start: *start,
                items: items
                    .iter()
                    .map(|item| RenderItem {
                        checked: item.checked,
                        children: self.render_blocks(&item.children),
                    })
                    .collect(),
            },
            Block::Code {
                language,
                meta,
                content,
                ..
            } => self.render_code(language.as_deref(), meta.as_deref(), content),
            Block::Table {
                alignments,
                header,
                rows,
            } => RenderNode::Table {
                alignments: alignments.clone(),
                header: header.iter().map(|c| self.render_inlines(c)).collect(),
                rows: rows
                    .iter()
                    .map(|row| row.iter().map(|c| self.render_inlines(c)).collect())
                    .collect(),
            },
            Block::Image { src, alt, title } => RenderNode::Image {
                src: src.clone(),
                alt: alt.clone(),
                title: title.clone(),
            },
            Block::Rule => RenderNode::Rule,
            Block::Html { value } => RenderNode::RawHtml {
                html: value.clone(),
            },
        }
    }

    pub fn render_inline(&self, inline: &Inline) -> RenderNode {
        match inline {
            Inline::Text { value } => RenderNode::Text {
                text: value.clone(),
            },
            Inline::Strong { children } => RenderNode::Strong {
                children: self.render_inlines(children),
            },
            Inline::Emphasis { children } => RenderNode::Emphasis {
                children: self.render_inlines(children),
            },
            Inline::Strikethrough { children } => RenderNode::Strikethrough {
                children: self.render_inlines(children),
            },
            Inline::Code { value } => match classify_code(None, value) {
                CodeKind::Inline => RenderNode::InlineCode {
                    code: value.clone(),
                },
                CodeKind::Block => RenderNode::CodeBlock {
                    language: None,
                    label: language_label(None),
                    meta: None,
                    code: value.clone(),
                },
            },
            Inline::Link {
                url,
                title,
                children,
            } => RenderNode::Link {
                href: url.clone(),
                title: title.clone(),
                external: self.is_external(url),
                children: self.render_inlines(children),
            },
            Inline::Image { src, alt, title } => RenderNode::Image {
                src: src.clone(),
                alt: alt.clone(),
                title: title.clone(),
            },
            Inline::SoftBreak => RenderNode::SoftBreak,
            Inline::HardBreak => RenderNode::LineBreak,
            Inline::Html { value } => RenderNode::RawHtml {
                html: value.clone(),
            },
        }
    }

    fn render_code(&self, language: Option<&str>, meta: Option<&str>, content: &str) -> RenderNode {
        let display = content.strip_suffix('\n').unwrap_or(content);

        if let Some(lang) = language
            && diagram::is_diagram_language(lang)
        {
            return match diagram::interpret(content) {
                Ok(layout) => RenderNode::Diagram(layout),
                Err(e) => {
                    log::warn!("Invalid diagram block: {}", e);
                    RenderNode::DiagramError {
                        message: e.message(),
                    }
                }
            };
        }

        if let Some(runnable) = detect_runnable(language, meta, display) {
            return RenderNode::Runnable(runnable);
        }

        match classify_code(language, content) {
            CodeKind::Inline => RenderNode::InlineCode {
                code: display.to_string(),
            },
            CodeKind::Block => RenderNode::CodeBlock {
                language: language.map(str::to_string),
                label: language_label(language),
                meta: meta.map(str::to_string),
                code: display.to_string(),
            },
        }
    }

    /// Absolute http(s) or protocol-relative URL pointing at another host
    pub fn is_external(&self, url: &str) -> bool {
        let lower = url.to_ascii_lowercase();
        let rest = ["https://", "http://", "//"]
            .iter()
            .find_map(|scheme| lower.strip_prefix(scheme));
        let Some(rest) = rest else {
            return false;
        };
        let host = rest
            .split(['/', '?', '#'])
            .next()
            .unwrap_or("")
            .rsplit('@')
            .next()
            .unwrap_or("");
        let host = host.split(':').next().unwrap_or("");
        match &self.site_host {
            Some(site) => host != site,
            None => true,
        }
    }
}
