//! Document transforms applied between parsing and rendering.
//!
//! - [`HeadingIds`]: stable, de-duplicated anchor ids on every heading
//! - [`CodeMetaForwarding`]: copies fence text after the language tag into `meta`
//!
//! Both walk the tree depth-first in document order, so headings inside block
//! quotes and list items are numbered where they appear.

use crate::blocks::{fence_language, parse_document};
use inkpress_core::{Block, Document, TocHeading, inline_text};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Runs of characters that are not letters, digits or underscore
static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w]+").unwrap());

/// A pass over a parsed document
pub trait Transform {
    fn apply(&mut self, document: &mut Document);
}

/// Turn heading text into an anchor id.
///
/// ```
/// use inkpress_parser::slugify;
///
/// assert_eq!(slugify("Hello, World!"), "hello-world");
/// assert_eq!(slugify("???"), "section");
/// ```
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let slug = NON_WORD.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "section".to_string()
    } else {
        slug.to_string()
    }
}

/// Assigns unique heading ids within one document.
///
/// The first heading with a given base id keeps it; later ones get `-2`,
/// `-3` and so on.
#[derive(Debug, Default)]
pub struct HeadingIds {
    seen: HashMap<String, usize>,
    used: HashSet<String>,
}

impl HeadingIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unique id for the next heading with this text
    pub fn next_id(&mut self, text: &str) -> String {
        let base = slugify(text);
        let count = self.seen.entry(base.clone()).or_insert(0);

        let mut candidate = if *count == 0 {
            base.clone()
        } else {
            format!("{}-{}", base, *count + 1)
        };
        *count += 1;

        // A literal "Intro 2" heading may already own "intro-2"
        while self.used.contains(&candidate) {
            *count += 1;
            candidate = format!("{}-{}", base, *count);
        }

        self.used.insert(candidate.clone());
        candidate
    }
}

impl Transform for HeadingIds {
    fn apply(&mut self, document: &mut Document) {
        walk_blocks(&mut document.blocks, &mut |block| {
            if let Block::Heading { children, id, .. } = block {
                *id = Some(self.next_id(&inline_text(children)));
            }
        });
    }
}

/// Copies whatever follows the language tag of a fence into the block's meta
#[derive(Debug, Default, Clone, Copy)]
pub struct CodeMetaForwarding;

impl Transform for CodeMetaForwarding {
    fn apply(&mut self, document: &mut Document) {
        walk_blocks(&mut document.blocks, &mut |block| {
            if let Block::Code { info, meta, .. } = block {
                *meta = code_meta(info).map(str::to_string);
            }
        });
    }
}

/// Text after the language tag of a fence info string, if any
pub fn code_meta(info: &str) -> Option<&str> {
    let info = info.trim();
    let language = fence_language(info)?;
    let rest = info[language.len()..].trim_start();
    if rest.is_empty() { None } else { Some(rest) }
}

/// Apply `f` to every block, parents before children
fn walk_blocks<F>(blocks: &mut [Block], f: &mut F)
where
    F: FnMut(&mut Block),
{
    for block in blocks {
        f(block);
        match block {
            Block::BlockQuote { children } => walk_blocks(children, f),
            Block::List { items, .. } => {
                for item in items {
                    walk_blocks(&mut item.children, f);
                }
            }
            _ => {}
        }
    }
}

fn collect_headings<'a>(blocks: &'a [Block], out: &mut Vec<(&'a Block, u8)>) {
    for block in blocks {
        match block {
            Block::Heading { level, .. } => out.push((block, *level)),
            Block::BlockQuote { children } => collect_headings(children, out),
            Block::List { items, .. } => {
                for item in items {
                    collect_headings(&item.children, out);
                }
            }
            _ => {}
        }
    }
}

/// Level 2 and 3 headings of a prepared document, in order.
///
/// Headings that never went through [`HeadingIds`] fall back to their slug.
pub fn table_of_contents(document: &Document) -> Vec<TocHeading> {
    let mut headings = Vec::new();
    collect_headings(&document.blocks, &mut headings);

    headings
        .into_iter()
        .filter(|(_, level)| (2..=3).contains(level))
        .filter_map(|(block, level)| match block {
            Block::Heading { children, id, .. } => {
                let text = inline_text(children);
                Some(TocHeading {
                    id: id.clone().unwrap_or_else(|| slugify(&text)),
                    text,
                    level,
                })
            }
            _ => None,
        })
        .collect()
}

/// The standard transform chain
pub fn default_pipeline() -> Vec<Box<dyn Transform>> {
    vec![Box::new(HeadingIds::new()), Box::new(CodeMetaForwarding)]
}

/// Parse markdown and run the standard transforms
pub fn prepare(markdown: &str) -> Document {
    let mut document = parse_document(markdown);
    for mut transform in default_pipeline() {
        transform.apply(&mut document);
    }
    log::debug!("Prepared document with {} blocks", document.blocks.len());
    document
}
