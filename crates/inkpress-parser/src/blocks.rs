//! Markdown to document tree, driven by pulldown-cmark events.
//!
//! The parser keeps two stacks: open block containers (root, block quotes,
//! lists, list items) and open inline frames (paragraphs, headings, emphasis,
//! links, table cells). Closing a frame folds it into its parent, so the
//! resulting [`Document`] keeps the full nesting of the source.
//!
//! Tight list items carry their text without paragraph events; that text is
//! wrapped in an implicit paragraph so every run of inlines lives in a block.

use inkpress_core::{Block, Document, Inline, ListItem, TableAlignment, inline_text};
use pulldown_cmark::{
    Alignment as CmarkAlignment, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd,
};

/// Parse markdown into a document tree.
///
/// Tables, strikethrough and task lists are enabled.
pub fn parse_document(markdown: &str) -> Document {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut state = BlockParserState::new();
    for event in Parser::new_ext(markdown, options) {
        process_event(event, &mut state);
    }

    Document {
        blocks: state.finish(),
    }
}

// ============================================================================
// Parser state
// ============================================================================

enum Container {
    Root(Vec<Block>),
    BlockQuote(Vec<Block>),
    List {
        ordered: bool,
        start: Option<u64>,
        items: Vec<ListItem>,
    },
    Item {
        checked: Option<bool>,
        blocks: Vec<Block>,
    },
}

enum InlineKind {
    Paragraph,
    /// Text of a tight list item
    ImplicitParagraph,
    Heading(u8),
    Strong,
    Emphasis,
    Strikethrough,
    Link { url: String, title: Option<String> },
    Image { src: String, title: Option<String> },
    TableCell,
}

struct InlineFrame {
    kind: InlineKind,
    children: Vec<Inline>,
}

impl InlineFrame {
    fn new(kind: InlineKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }
}

struct CodeFrame {
    info: String,
    content: String,
}

#[derive(Default)]
struct TableFrame {
    alignments: Vec<TableAlignment>,
    header: Vec<Vec<Inline>>,
    rows: Vec<Vec<Vec<Inline>>>,
    current_row: Vec<Vec<Inline>>,
}

struct BlockParserState {
    containers: Vec<Container>,
    inlines: Vec<InlineFrame>,
    code: Option<CodeFrame>,
    html: Option<String>,
    table: Option<TableFrame>,
}

impl BlockParserState {
    fn new() -> Self {
        Self {
            containers: vec![Container::Root(Vec::new())],
            inlines: Vec::new(),
            code: None,
            html: None,
            table: None,
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.close_implicit_paragraph();
        while self.containers.len() > 1 {
            self.close_container();
        }
        match self.containers.pop() {
            Some(Container::Root(blocks)) => blocks,
            _ => Vec::new(),
        }
    }

    /// Append a finished block to the innermost block container
    fn emit_block(&mut self, block: Block) {
        match self.containers.last_mut() {
            Some(
                Container::Root(blocks)
                | Container::BlockQuote(blocks)
                | Container::Item { blocks, .. },
            ) => blocks.push(block),
            Some(Container::List { .. }) | None => {
                log::debug!("Dropping block outside of a block container");
            }
        }
    }

    fn push_inline(&mut self, inline: Inline) {
        if self.inlines.is_empty() {
            self.inlines
                .push(InlineFrame::new(InlineKind::ImplicitParagraph));
        }
        let Some(frame) = self.inlines.last_mut() else {
            return;
        };

        // pulldown-cmark splits text at bracket and entity boundaries
        if let Inline::Text { value } = &inline
            && let Some(Inline::Text { value: previous }) = frame.children.last_mut()
        {
            previous.push_str(value);
            return;
        }
        frame.children.push(inline);
    }

    fn push_text(&mut self, text: &str) {
        if let Some(code) = self.code.as_mut() {
            code.content.push_str(text);
            return;
        }
        self.push_inline(Inline::Text {
            value: text.to_string(),
        });
    }

    fn close_implicit_paragraph(&mut self) {
        if matches!(
            self.inlines.last(),
            Some(InlineFrame {
                kind: InlineKind::ImplicitParagraph,
                ..
            })
        ) && let Some(frame) = self.inlines.pop()
        {
            let block = paragraph_block(frame.children);
            self.emit_block(block);
        }
    }

    fn close_inline(&mut self) {
        let Some(frame) = self.inlines.pop() else {
            return;
        };

        let children = frame.children;
        match frame.kind {
            InlineKind::Paragraph | InlineKind::ImplicitParagraph => {
                let block = paragraph_block(children);
                self.emit_block(block);
            }
            InlineKind::Heading(level) => self.emit_block(Block::Heading {
                level,
                children,
                id: None,
            }),
            InlineKind::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    table.current_row.push(children);
                }
            }
            InlineKind::Strong => self.push_inline(Inline::Strong { children }),
            InlineKind::Emphasis => self.push_inline(Inline::Emphasis { children }),
            InlineKind::Strikethrough => self.push_inline(Inline::Strikethrough { children }),
            InlineKind::Link { url, title } => self.push_inline(Inline::Link {
                url,
                title,
                children,
            }),
            InlineKind::Image { src, title } => self.push_inline(Inline::Image {
                src,
                alt: inline_text(&children),
                title,
            }),
        }
    }

    fn close_container(&mut self) {
        self.close_implicit_paragraph();
        let Some(container) = self.containers.pop() else {
            return;
        };

        match container {
            Container::BlockQuote(children) => self.emit_block(Block::BlockQuote { children }),
            Container::List {
                ordered,
                start,
                items,
            } => self.emit_block(Block::List {
                ordered,
                start,
                items,
            }),
            Container::Item { checked, blocks } => {
                if let Some(Container::List { items, .. }) = self.containers.last_mut() {
                    items.push(ListItem {
                        checked,
                        children: blocks,
                    });
                }
            }
            Container::Root(blocks) => {
                // Root is never popped while parsing; restore it
                self.containers.push(Container::Root(blocks));
            }
        }
    }
}

/// A paragraph holding a single image is promoted to an image block
fn paragraph_block(mut children: Vec<Inline>) -> Block {
    if children.len() == 1 && matches!(children[0], Inline::Image { .. }) {
        if let Some(Inline::Image { src, alt, title }) = children.pop() {
            return Block::Image { src, alt, title };
        }
    }
    Block::Paragraph { children }
}

fn optional(value: CowStr<'_>) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn convert_alignment(alignment: &CmarkAlignment) -> TableAlignment {
    match alignment {
        CmarkAlignment::Left => TableAlignment::Left,
        CmarkAlignment::Center => TableAlignment::Center,
        CmarkAlignment::Right => TableAlignment::Right,
        CmarkAlignment::None => TableAlignment::None,
    }
}

/// Language tag of a fence info string (first whitespace-separated token)
pub fn fence_language(info: &str) -> Option<&str> {
    info.split_whitespace().next()
}

// ============================================================================
// Event processing
// ============================================================================

fn process_event(event: Event, state: &mut BlockParserState) {
    match event {
        Event::Start(Tag::Paragraph) => {
            state.close_implicit_paragraph();
            state.inlines.push(InlineFrame::new(InlineKind::Paragraph));
        }
        Event::Start(Tag::Heading { level, .. }) => {
            state.close_implicit_paragraph();
            state
                .inlines
                .push(InlineFrame::new(InlineKind::Heading(level as u8)));
        }
        Event::End(TagEnd::Paragraph | TagEnd::Heading(_)) => state.close_inline(),

        Event::Start(Tag::BlockQuote(_)) => {
            state.close_implicit_paragraph();
            state.containers.push(Container::BlockQuote(Vec::new()));
        }
        Event::Start(Tag::List(start)) => {
            state.close_implicit_paragraph();
            state.containers.push(Container::List {
                ordered: start.is_some(),
                start,
                items: Vec::new(),
            });
        }
        Event::Start(Tag::Item) => {
            state.containers.push(Container::Item {
                checked: None,
                blocks: Vec::new(),
            });
        }
        Event::End(TagEnd::BlockQuote(_) | TagEnd::List(_) | TagEnd::Item) => {
            state.close_container();
        }
        Event::TaskListMarker(checked) => {
            if let Some(Container::Item { checked: slot, .. }) = state.containers.last_mut() {
                *slot = Some(checked);
            }
        }

        Event::Start(Tag::CodeBlock(kind)) => {
            state.close_implicit_paragraph();
            let info = match kind {
                CodeBlockKind::Fenced(info) => info.trim().to_string(),
                CodeBlockKind::Indented => String::new(),
            };
            state.code = Some(CodeFrame {
                info,
                content: String::new(),
            });
        }
        Event::End(TagEnd::CodeBlock) => {
            if let Some(code) = state.code.take() {
                let language = fence_language(&code.info).map(str::to_string);
                state.emit_block(Block::Code {
                    language,
                    info: code.info,
                    meta: None,
                    content: code.content,
                });
            }
        }

        Event::Start(Tag::HtmlBlock) => {
            state.close_implicit_paragraph();
            state.html = Some(String::new());
        }
        Event::End(TagEnd::HtmlBlock) => {
            if let Some(value) = state.html.take() {
                state.emit_block(Block::Html { value });
            }
        }
        Event::Html(html) => match state.html.as_mut() {
            Some(buffer) => buffer.push_str(&html),
            None => state.push_inline(Inline::Html {
                value: html.to_string(),
            }),
        },
        Event::InlineHtml(html) => state.push_inline(Inline::Html {
            value: html.to_string(),
        }),

        Event::Start(Tag::Table(alignments)) => {
            state.close_implicit_paragraph();
            state.table = Some(TableFrame {
                alignments: alignments.iter().map(convert_alignment).collect(),
                ..TableFrame::default()
            });
        }
        Event::End(TagEnd::TableHead) => {
            if let Some(table) = state.table.as_mut() {
                table.header = std::mem::take(&mut table.current_row);
            }
        }
        Event::End(TagEnd::TableRow) => {
            if let Some(table) = state.table.as_mut() {
                let row = std::mem::take(&mut table.current_row);
                table.rows.push(row);
            }
        }
        Event::Start(Tag::TableCell) => {
            state.inlines.push(InlineFrame::new(InlineKind::TableCell));
        }
        Event::End(TagEnd::TableCell) => state.close_inline(),
        Event::End(TagEnd::Table) => {
            if let Some(table) = state.table.take() {
                state.emit_block(Block::Table {
                    alignments: table.alignments,
                    header: table.header,
                    rows: table.rows,
                });
            }
        }

        Event::Start(Tag::Strong) => state.inlines.push(InlineFrame::new(InlineKind::Strong)),
        Event::Start(Tag::Emphasis) => {
            state.inlines.push(InlineFrame::new(InlineKind::Emphasis));
        }
        Event::Start(Tag::Strikethrough) => {
            state
                .inlines
                .push(InlineFrame::new(InlineKind::Strikethrough));
        }
        Event::Start(Tag::Link {
            dest_url, title, ..
        }) => {
            state.inlines.push(InlineFrame::new(InlineKind::Link {
                url: dest_url.to_string(),
                title: optional(title),
            }));
        }
        Event::Start(Tag::Image {
            dest_url, title, ..
        }) => {
            state.inlines.push(InlineFrame::new(InlineKind::Image {
                src: dest_url.to_string(),
                title: optional(title),
            }));
        }
        Event::End(
            TagEnd::Strong
            | TagEnd::Emphasis
            | TagEnd::Strikethrough
            | TagEnd::Link
            | TagEnd::Image,
        ) => state.close_inline(),

        Event::Text(text) => state.push_text(&text),
        Event::Code(code) => state.push_inline(Inline::Code {
            value: code.to_string(),
        }),
        Event::SoftBreak => state.push_inline(Inline::SoftBreak),
        Event::HardBreak => state.push_inline(Inline::HardBreak),
        Event::Rule => {
            state.close_implicit_paragraph();
            state.emit_block(Block::Rule);
        }

        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks(markdown: &str) -> Vec<Block> {
        parse_document(markdown).blocks
    }

    #[test]
    fn test_paragraph_with_formatting() {
        let parsed = blocks("Some **bold** and *em* and `code` and ~~gone~~.");
        assert_eq!(parsed.len(), 1);
        if let Block::Paragraph { children } = &parsed[0] {
            assert!(matches!(children[1], Inline::Strong { .. }));
            assert!(matches!(children[3], Inline::Emphasis { .. }));
            assert!(matches!(&children[5], Inline::Code { value } if value == "code"));
            assert!(matches!(children[7], Inline::Strikethrough { .. }));
            assert_eq!(inline_text(children), "Some bold and em and code and gone.");
        } else {
            panic!("Expected Paragraph");
        }
    }

    #[test]
    fn test_headings() {
        let parsed = blocks("# One\n\n### Three");
        assert!(matches!(&parsed[0], Block::Heading { level: 1, id: None, .. }));
        if let Block::Heading { level, children, .. } = &parsed[1] {
            assert_eq!(*level, 3);
            assert_eq!(inline_text(children), "Three");
        } else {
            panic!("Expected Heading");
        }
    }

    #[test]
    fn test_fenced_code_keeps_info() {
        let parsed = blocks("```js runner template=\"react\"\nconsole.log(1)\n```");
        if let Block::Code {
            language,
            info,
            meta,
            content,
        } = &parsed[0]
        {
            assert_eq!(language.as_deref(), Some("js"));
            assert_eq!(info, "js runner template=\"react\"");
            assert!(meta.is_none());
            assert_eq!(content, "console.log(1)\n");
        } else {
            panic!("Expected Code");
        }
    }

    #[test]
    fn test_indented_code_has_no_language() {
        let parsed = blocks("    let x = 1;\n");
        assert!(matches!(&parsed[0], Block::Code { language: None, info, .. } if info.is_empty()));
    }

    #[test]
    fn test_tight_list_items_get_paragraphs() {
        let parsed = blocks("- one\n- two\n  - nested");
        if let Block::List { ordered, items, .. } = &parsed[0] {
            assert!(!ordered);
            assert_eq!(items.len(), 2);
            assert!(matches!(&items[0].children[0], Block::Paragraph { .. }));
            assert!(matches!(&items[1].children[1], Block::List { .. }));
        } else {
            panic!("Expected List");
        }
    }

    #[test]
    fn test_ordered_list_start() {
        let parsed = blocks("3. three\n4. four");
        assert!(matches!(
            &parsed[0],
            Block::List {
                ordered: true,
                start: Some(3),
                ..
            }
        ));
    }

    #[test]
    fn test_task_list() {
        let parsed = blocks("- [ ] todo\n- [x] done\n- plain");
        if let Block::List { items, .. } = &parsed[0] {
            assert_eq!(items[0].checked, Some(false));
            assert_eq!(items[1].checked, Some(true));
            assert_eq!(items[2].checked, None);
            assert_eq!(items[0].to_plain_text(), "todo");
        } else {
            panic!("Expected List");
        }
    }

    #[test]
    fn test_blockquote_nesting() {
        let parsed = blocks("> ## Inside\n>\n> text");
        if let Block::BlockQuote { children } = &parsed[0] {
            assert!(matches!(children[0], Block::Heading { level: 2, .. }));
            assert!(matches!(children[1], Block::Paragraph { .. }));
        } else {
            panic!("Expected BlockQuote");
        }
    }

    #[test]
    fn test_callout_marker_text_is_merged() {
        let parsed = blocks("> [!NOTE] Read this");
        assert_eq!(parsed[0].to_plain_text(), "[!NOTE] Read this");
        if let Block::BlockQuote { children } = &parsed[0]
            && let Block::Paragraph { children } = &children[0]
        {
            assert_eq!(children.len(), 1);
        } else {
            panic!("Expected quoted paragraph");
        }
    }

    #[test]
    fn test_table() {
        let parsed = blocks("| A | B |\n|:--|--:|\n| 1 | 2 |\n| 3 | 4 |");
        if let Block::Table {
            alignments,
            header,
            rows,
        } = &parsed[0]
        {
            assert_eq!(alignments, &[TableAlignment::Left, TableAlignment::Right]);
            assert_eq!(inline_text(&header[1]), "B");
            assert_eq!(rows.len(), 2);
            assert_eq!(inline_text(&rows[1][0]), "3");
        } else {
            panic!("Expected Table");
        }
    }

    #[test]
    fn test_links_and_images() {
        let parsed = blocks("[site](https://example.com \"Home\") and ![alt *text*](a.png)");
        if let Block::Paragraph { children } = &parsed[0] {
            assert!(matches!(
                &children[0],
                Inline::Link { url, title: Some(t), .. } if url == "https://example.com" && t == "Home"
            ));
            assert!(matches!(
                &children[2],
                Inline::Image { src, alt, title: None } if src == "a.png" && alt == "alt text"
            ));
        } else {
            panic!("Expected Paragraph");
        }
    }

    #[test]
    fn test_standalone_image_becomes_block() {
        let parsed = blocks("![Diagram](d.svg \"Flow\")");
        assert_eq!(
            parsed[0],
            Block::Image {
                src: "d.svg".to_string(),
                alt: "Diagram".to_string(),
                title: Some("Flow".to_string()),
            }
        );
    }

    #[test]
    fn test_rule_and_html() {
        let parsed = blocks("before\n\n---\n\n<div>raw</div>\n");
        assert!(matches!(parsed[1], Block::Rule));
        assert!(matches!(&parsed[2], Block::Html { value } if value.contains("<div>raw</div>")));
    }

    #[test]
    fn test_breaks() {
        let parsed = blocks("line one\nline two  \nline three");
        if let Block::Paragraph { children } = &parsed[0] {
            assert!(children.contains(&Inline::SoftBreak));
            assert!(children.contains(&Inline::HardBreak));
        } else {
            panic!("Expected Paragraph");
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(blocks("").is_empty());
    }

    #[test]
    fn test_fence_language() {
        assert_eq!(fence_language("ts live title=x"), Some("ts"));
        assert_eq!(fence_language(""), None);
    }
}
