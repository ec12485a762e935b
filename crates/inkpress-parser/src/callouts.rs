//! Callouts: block quotes whose text starts with `[!NOTE]`, `[!TIP]`,
//! `[!IMPORTANT]`, `[!WARNING]` or `[!CAUTION]`.
//!
//! The marker is matched case-insensitively on the flattened quote text and
//! removed from the rendered content.

use inkpress_core::{Block, Inline};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Matches a leading `[!KIND]` marker and the whitespace after it
static CALLOUT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\[!(\w+)\][ \t]*").unwrap());

/// Fast pre-filter: skip regex if no marker exists.
#[inline]
fn has_callout(text: &str) -> bool {
    text.trim_start().starts_with("[!")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CalloutKind {
    Note,
    Tip,
    Important,
    Warning,
    Caution,
}

impl CalloutKind {
    pub const ALL: [CalloutKind; 5] = [
        Self::Note,
        Self::Tip,
        Self::Important,
        Self::Warning,
        Self::Caution,
    ];

    pub fn parse(marker: &str) -> Option<Self> {
        match marker.to_ascii_lowercase().as_str() {
            "note" => Some(Self::Note),
            "tip" => Some(Self::Tip),
            "important" => Some(Self::Important),
            "warning" => Some(Self::Warning),
            "caution" => Some(Self::Caution),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Tip => "tip",
            Self::Important => "important",
            Self::Warning => "warning",
            Self::Caution => "caution",
        }
    }

    /// Display title shown in the callout header
    pub fn title(self) -> &'static str {
        match self {
            Self::Note => "Note",
            Self::Tip => "Tip",
            Self::Important => "Important",
            Self::Warning => "Warning",
            Self::Caution => "Caution",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Self::Note => "ℹ️",
            Self::Tip => "💡",
            Self::Important => "❗",
            Self::Warning => "⚠️",
            Self::Caution => "🛑",
        }
    }

    /// Accent colour
    pub fn color(self) -> &'static str {
        match self {
            Self::Note => "#0969da",
            Self::Tip => "#1a7f37",
            Self::Important => "#8250df",
            Self::Warning => "#9a6700",
            Self::Caution => "#cf222e",
        }
    }
}

/// Kind of callout a block quote declares, if any
pub fn callout_kind(children: &[Block]) -> Option<CalloutKind> {
    let text: String = children
        .iter()
        .map(Block::to_plain_text)
        .collect::<Vec<_>>()
        .join("\n");
    if !has_callout(&text) {
        return None;
    }
    let caps = CALLOUT_PATTERN.captures(&text)?;
    CalloutKind::parse(caps.get(1)?.as_str())
}

/// Split a block quote into its callout kind and marker-free content
pub fn detect_callout(children: &[Block]) -> Option<(CalloutKind, Vec<Block>)> {
    let kind = callout_kind(children)?;
    let mut content = children.to_vec();
    strip_marker(&mut content);
    Some((kind, content))
}

fn strip_marker(blocks: &mut Vec<Block>) {
    let Some(Block::Paragraph { children }) = blocks.first_mut() else {
        return;
    };

    if let Some(Inline::Text { value }) = children.first_mut()
        && let Some(end) = CALLOUT_PATTERN.find(value).map(|m| m.end())
    {
        value.replace_range(..end, "");
        if value.is_empty() {
            children.remove(0);
        }
    }

    // "[!NOTE]\nBody" leaves a break in front of the body
    while matches!(children.first(), Some(Inline::SoftBreak | Inline::HardBreak)) {
        children.remove(0);
    }

    if children.is_empty() {
        blocks.remove(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::parse_document;
    use inkpress_core::inline_text;

    fn quote(markdown: &str) -> Vec<Block> {
        match parse_document(markdown).blocks.into_iter().next() {
            Some(Block::BlockQuote { children }) => children,
            other => panic!("Expected BlockQuote, got {:?}", other),
        }
    }

    #[test]
    fn test_warning_callout() {
        let (kind, content) = detect_callout(&quote("> [!WARNING] Disk full")).unwrap();
        assert_eq!(kind, CalloutKind::Warning);
        assert_eq!(content[0].to_plain_text(), "Disk full");
    }

    #[test]
    fn test_case_insensitive_marker() {
        assert_eq!(
            callout_kind(&quote("> [!tip] Use it")),
            Some(CalloutKind::Tip)
        );
    }

    #[test]
    fn test_marker_on_own_line() {
        let (kind, content) = detect_callout(&quote("> [!NOTE]\n> Body text")).unwrap();
        assert_eq!(kind, CalloutKind::Note);
        if let Block::Paragraph { children } = &content[0] {
            assert_eq!(inline_text(children), "Body text");
        } else {
            panic!("Expected Paragraph");
        }
    }

    #[test]
    fn test_marker_paragraph_alone_is_dropped() {
        let (_, content) = detect_callout(&quote("> [!CAUTION]\n>\n> Second")).unwrap();
        assert_eq!(content.len(), 1);
        assert_eq!(content[0].to_plain_text(), "Second");
    }

    #[test]
    fn test_plain_quote_is_not_callout() {
        assert!(detect_callout(&quote("> Just a quote")).is_none());
        assert!(detect_callout(&quote("> Text then [!NOTE]")).is_none());
    }

    #[test]
    fn test_unknown_kind_is_not_callout() {
        assert!(detect_callout(&quote("> [!DANGER] nope")).is_none());
    }

    #[test]
    fn test_every_kind_has_presentation() {
        for kind in CalloutKind::ALL {
            assert!(!kind.icon().is_empty());
            assert!(kind.color().starts_with('#'));
            assert_eq!(CalloutKind::parse(kind.name()), Some(kind));
        }
    }
}
