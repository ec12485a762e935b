//! HTML output for render nodes.
//!
//! All text and attribute values are escaped; only `RawHtml` nodes pass
//! through verbatim. Diagrams are drawn as inline SVG.

use crate::diagram::{DiagramLayout, NodeKind};
use crate::render::{RenderItem, RenderNode};
use inkpress_core::TableAlignment;
use std::fmt::Write;

/// Escape text for element content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render a node list to an HTML fragment
pub fn to_html(nodes: &[RenderNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node);
    }
    out
}

fn write_children(out: &mut String, nodes: &[RenderNode]) {
    for node in nodes {
        write_node(out, node);
    }
}

fn write_attr(out: &mut String, name: &str, value: &str) {
    let _ = write!(out, " {}=\"{}\"", name, escape_html(value));
}

fn write_node(out: &mut String, node: &RenderNode) {
    match node {
        RenderNode::Heading {
            level,
            id,
            children,
        } => {
            let _ = write!(out, "<h{}", level);
            if let Some(id) = id {
                write_attr(out, "id", id);
            }
            out.push('>');
            write_children(out, children);
            let _ = writeln!(out, "</h{}>", level);
        }
        RenderNode::Paragraph { children } => {
            out.push_str("<p>");
            write_children(out, children);
            out.push_str("</p>\n");
        }
        RenderNode::Quote { children } => {
            out.push_str("<blockquote>\n");
            write_children(out, children);
            out.push_str("</blockquote>\n");
        }
        RenderNode::Callout { kind, children } => {
            let _ = write!(
                out,
                "<aside class=\"callout callout-{}\" style=\"--callout-color: {}\" role=\"note\">\n\
                 <p class=\"callout-title\"><span class=\"callout-icon\" aria-hidden=\"true\">{}</span> {}</p>\n",
                kind.name(),
                kind.color(),
                kind.icon(),
                kind.title()
            );
            write_children(out, children);
            out.push_str("</aside>\n");
        }
        RenderNode::List {
            ordered,
            start,
            items,
        } => write_list(out, *ordered, *start, items),
        RenderNode::CodeBlock {
            language,
            label,
            meta,
            code,
        } => {
            out.push_str("<figure class=\"code-block\"");
            if let Some(meta) = meta {
                write_attr(out, "data-meta", meta);
            }
            out.push_str(">\n<figcaption class=\"code-header\">");
            let _ = write!(out, "<span class=\"code-language\">{}</span>", escape_html(label));
            out.push_str(
                "<button type=\"button\" class=\"copy-code\" aria-label=\"Copy code\">Copy</button>",
            );
            out.push_str("</figcaption>\n<pre><code");
            if let Some(language) = language {
                write_attr(out, "class", &format!("language-{}", language));
            }
            let _ = writeln!(out, ">{}</code></pre>\n</figure>", escape_html(code));
        }
        RenderNode::InlineCode { code } => {
            let _ = write!(out, "<code>{}</code>", escape_html(code));
        }
        RenderNode::Runnable(live) => {
            out.push_str("<div class=\"runner\"");
            write_attr(out, "data-language", &live.language);
            write_attr(out, "data-template", &live.template);
            if let Some(title) = &live.title {
                write_attr(out, "data-title", title);
            }
            let _ = writeln!(
                out,
                "><pre><code class=\"language-{}\">{}</code></pre></div>",
                escape_html(&live.language),
                escape_html(&live.code)
            );
        }
        RenderNode::Diagram(layout) => write_diagram(out, layout),
        RenderNode::DiagramError { message } => {
            let _ = writeln!(
                out,
                "<div class=\"diagram-error\" role=\"alert\">Diagram error: {}</div>",
                escape_html(message)
            );
        }
        RenderNode::Table {
            alignments,
            header,
            rows,
        } => {
            out.push_str("<table>\n<thead>\n<tr>");
            for (i, cell) in header.iter().enumerate() {
                write_cell(out, "th", alignments.get(i), cell);
            }
            out.push_str("</tr>\n</thead>\n<tbody>\n");
            for row in rows {
                out.push_str("<tr>");
                for (i, cell) in row.iter().enumerate() {
                    write_cell(out, "td", alignments.get(i), cell);
                }
                out.push_str("</tr>\n");
            }
            out.push_str("</tbody>\n</table>\n");
        }
        RenderNode::Image { src, alt, title } => {
            out.push_str("<img");
            write_attr(out, "src", src);
            write_attr(out, "alt", alt);
            if let Some(title) = title {
                write_attr(out, "title", title);
            }
            out.push_str(" loading=\"lazy\" decoding=\"async\">");
        }
        RenderNode::Rule => out.push_str("<hr>\n"),
        RenderNode::RawHtml { html } => out.push_str(html),
        RenderNode::Text { text } => out.push_str(&escape_html(text)),
        RenderNode::Strong { children } => wrap(out, "strong", children),
        RenderNode::Emphasis { children } => wrap(out, "em", children),
        RenderNode::Strikethrough { children } => wrap(out, "del", children),
        RenderNode::Link {
            href,
            title,
            external,
            children,
        } => {
            out.push_str("<a");
            write_attr(out, "href", href);
            if let Some(title) = title {
                write_attr(out, "title", title);
            }
            if *external {
                out.push_str(" rel=\"noopener noreferrer\" target=\"_blank\"");
            }
            out.push('>');
            write_children(out, children);
            out.push_str("</a>");
        }
        RenderNode::SoftBreak => out.push('\n'),
        RenderNode::LineBreak => out.push_str("<br>\n"),
    }
}

fn wrap(out: &mut String, tag: &str, children: &[RenderNode]) {
    let _ = write!(out, "<{}>", tag);
    write_children(out, children);
    let _ = write!(out, "</{}>", tag);
}

fn write_list(out: &mut String, ordered: bool, start: Option<u64>, items: &[RenderItem]) {
    let tag = if ordered { "ol" } else { "ul" };
    let _ = write!(out, "<{}", tag);
    if let Some(start) = start.filter(|s| ordered && *s != 1) {
        let _ = write!(out, " start=\"{}\"", start);
    }
    out.push_str(">\n");
    for item in items {
        out.push_str("<li>");
        match item.checked {
            Some(true) => out.push_str("<input type=\"checkbox\" disabled checked> "),
            Some(false) => out.push_str("<input type=\"checkbox\" disabled> "),
            None => {}
        }
        // Tight items hold a single paragraph; print its inlines directly
        match item.children.as_slice() {
            [RenderNode::Paragraph { children }] => write_children(out, children),
            children => write_children(out, children),
        }
        out.push_str("</li>\n");
    }
    let _ = writeln!(out, "</{}>", tag);
}

fn write_cell(out: &mut String, tag: &str, alignment: Option<&TableAlignment>, cell: &[RenderNode]) {
    let _ = write!(out, "<{}", tag);
    let align = match alignment {
        Some(TableAlignment::Left) => Some("left"),
        Some(TableAlignment::Center) => Some("center"),
        Some(TableAlignment::Right) => Some("right"),
        Some(TableAlignment::None) | None => None,
    };
    if let Some(align) = align {
        let _ = write!(out, " style=\"text-align: {}\"", align);
    }
    out.push('>');
    write_children(out, cell);
    let _ = write!(out, "</{}>", tag);
}

fn write_diagram(out: &mut String, layout: &DiagramLayout) {
    let width = layout.width();
    out.push_str("<figure class=\"diagram\">\n");
    if let Some(title) = &layout.title {
        let _ = writeln!(out, "<p class=\"diagram-title\">{}</p>", escape_html(title));
    }
    let _ = writeln!(
        out,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 {} {}\" height=\"{}\" role=\"img\">",
        width, layout.height, layout.height
    );

    for node in &layout.nodes {
        let (x, y) = layout.absolute_position(node);
        let class = match node.kind {
            NodeKind::Group => "diagram-lane",
            NodeKind::Card => "diagram-card",
        };
        let _ = writeln!(
            out,
            "<g class=\"{}\" data-id=\"{}\"><rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" rx=\"8\"/>\
             <text x=\"{}\" y=\"{}\">{}</text></g>",
            class,
            escape_html(&node.id),
            x,
            y,
            node.width,
            node.height,
            x + 12.0,
            y + 24.0,
            escape_html(node.label())
        );
    }

    for edge in layout.resolved_edges() {
        let (Some(source), Some(target)) = (layout.node(&edge.source), layout.node(&edge.target))
        else {
            continue;
        };
        let (sx, sy) = layout.absolute_position(source);
        let (tx, ty) = layout.absolute_position(target);
        let stroke = edge
            .style
            .get("strokeWidth")
            .and_then(serde_json::Value::as_f64)
            .unwrap_or(1.5);
        let _ = write!(
            out,
            "<line class=\"diagram-edge{}\" data-id=\"{}\" data-type=\"{}\" x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke-width=\"{}\"/>",
            if edge.animated { " animated" } else { "" },
            escape_html(&edge.id),
            escape_html(&edge.kind),
            sx + source.width / 2.0,
            sy + source.height / 2.0,
            tx + target.width / 2.0,
            ty + target.height / 2.0,
            stroke
        );
        if let Some(label) = &edge.label {
            let _ = write!(
                out,
                "<text class=\"diagram-edge-label\" x=\"{}\" y=\"{}\">{}</text>",
                (sx + tx) / 2.0 + source.width / 2.0,
                (sy + ty) / 2.0 + source.height / 2.0,
                escape_html(label)
            );
        }
        out.push('\n');
    }

    out.push_str("</svg>\n");
    if let Some(caption) = &layout.caption {
        let _ = writeln!(out, "<figcaption>{}</figcaption>", escape_html(caption));
    }
    out.push_str("</figure>\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Renderer;
    use crate::transform::prepare;

    fn html(markdown: &str) -> String {
        to_html(&Renderer::new().render(&prepare(markdown)))
            .trim_end()
            .to_string()
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn test_headings_and_paragraphs() {
        insta::assert_snapshot!(html("## Hello *world*\n\nSome **text** & more."), @r#"
        <h2 id="hello-world">Hello <em>world</em></h2>
        <p>Some <strong>text</strong> &amp; more.</p>
        "#);
    }

    #[test]
    fn test_code_block_html() {
        insta::assert_snapshot!(html("```rust\nlet x = 1 < 2;\n```"), @r#"
        <figure class="code-block">
        <figcaption class="code-header"><span class="code-language">RUST</span><button type="button" class="copy-code" aria-label="Copy code">Copy</button></figcaption>
        <pre><code class="language-rust">let x = 1 &lt; 2;</code></pre>
        </figure>
        "#);
    }

    #[test]
    fn test_callout_html() {
        let out = html("> [!TIP] Try this");
        assert!(out.starts_with("<aside class=\"callout callout-tip\""));
        assert!(out.contains("<p>Try this</p>"));
        assert!(!out.contains("[!TIP]"));
    }

    #[test]
    fn test_external_link_html() {
        let out = html("[a](https://example.com) [b](/local)");
        assert!(out.contains(
            "<a href=\"https://example.com\" rel=\"noopener noreferrer\" target=\"_blank\">a</a>"
        ));
        assert!(out.contains("<a href=\"/local\">b</a>"));
    }

    #[test]
    fn test_lazy_image() {
        let out = html("![A \"quoted\" alt](pic.png)");
        assert_eq!(
            out,
            "<img src=\"pic.png\" alt=\"A &quot;quoted&quot; alt\" loading=\"lazy\" decoding=\"async\">"
        );
    }

    #[test]
    fn test_task_list_html() {
        insta::assert_snapshot!(html("- [x] done\n- [ ] open"), @r#"
        <ul>
        <li><input type="checkbox" disabled checked> done</li>
        <li><input type="checkbox" disabled> open</li>
        </ul>
        "#);
    }

    #[test]
    fn test_ordered_list_start() {
        assert!(html("5. five").starts_with("<ol start=\"5\">"));
        assert!(html("1. one").starts_with("<ol>"));
    }

    #[test]
    fn test_table_alignment() {
        let out = html("| a | b |\n|:-:|---|\n| 1 | 2 |");
        assert!(out.contains("<th style=\"text-align: center\">a</th><th>b</th>"));
        assert!(out.contains("<td style=\"text-align: center\">1</td><td>2</td>"));
    }

    #[test]
    fn test_diagram_svg() {
        let out = html(
            "```flow\n{\"title\": \"T\", \"nodes\": [{\"id\": \"a\"}, {\"id\": \"b\"}], \
             \"edges\": [{\"source\": \"a\", \"target\": \"b\"}, {\"source\": \"a\", \"target\": \"zz\"}]}\n```",
        );
        assert!(out.contains("<svg"));
        assert!(out.contains("data-id=\"edge-0-a-b\""));
        assert!(!out.contains("edge-1-a-zz"));
        assert!(out.contains("<p class=\"diagram-title\">T</p>"));
    }

    #[test]
    fn test_diagram_error_html() {
        let out = html("```flow\n{broken\n```");
        assert!(out.starts_with("<div class=\"diagram-error\" role=\"alert\">Diagram error: "));
    }

    #[test]
    fn test_runnable_html() {
        let out = html("```jsx live title=\"Hi <there>\"\n<App/>\n```");
        assert!(out.contains("data-template=\"vanilla\""));
        assert!(out.contains("data-title=\"Hi &lt;there&gt;\""));
        assert!(out.contains("&lt;App/&gt;"));
    }
}
