//! Text to Telegraph nodes.
//!
//! Telegraph accepts a small HTML subset expressed as [`Node`] trees. It has
//! no `h1`/`h2`, so headings are shifted into the two levels it does render:
//!
//! | Markdown | Node |
//! |---|---|
//! | `#` | `h3` |
//! | `##` | `h4` |
//! | `###` | `h3` |
//! | `####`–`######` | `h4` |
//!
//! Text without any Markdown syntax is treated as prose where every line
//! break matters: each non-empty line becomes its own paragraph. Markdown
//! would otherwise fold those lines into one paragraph, which mangles novels
//! and chat logs.

use crate::node::{Element, Node};
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};

/// Turns raw text into page content.
pub trait Converter: Send + Sync {
    fn convert(&self, text: &str) -> Vec<Node>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownConverter;

impl Converter for MarkdownConverter {
    fn convert(&self, text: &str) -> Vec<Node> {
        if has_markdown_syntax(text) {
            markdown_to_nodes(text)
        } else {
            plain_to_nodes(text)
        }
    }
}

/// One paragraph per non-empty line.
pub fn plain_to_nodes(text: &str) -> Vec<Node> {
    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(|line| Node::paragraph(vec![Node::text(line)]))
        .collect()
}

/// Whether `text` looks like Markdown rather than plain prose.
pub fn has_markdown_syntax(text: &str) -> bool {
    text.contains("```") || text.lines().any(line_has_markdown)
}

fn line_has_markdown(line: &str) -> bool {
    is_heading(line)
        || has_bold(line)
        || has_link(line)
        || is_list_item(line.trim_start())
        || line.strip_prefix('>').is_some_and(starts_with_space)
}

fn starts_with_space(s: &str) -> bool {
    s.chars().next().is_some_and(char::is_whitespace)
}

fn is_heading(line: &str) -> bool {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    (1..=6).contains(&hashes) && starts_with_space(&line[hashes..])
}

fn has_bold(line: &str) -> bool {
    line.find("**").is_some_and(|start| {
        line[start + 2..]
            .match_indices("**")
            .any(|(end, _)| end > 0)
    })
}

fn has_link(line: &str) -> bool {
    let Some(open) = line.find('[') else {
        return false;
    };
    let rest = &line[open + 1..];
    match rest.find("](") {
        Some(mid) if mid > 0 => rest[mid + 2..].find(')').is_some_and(|close| close > 0),
        _ => false,
    }
}

fn is_list_item(trimmed: &str) -> bool {
    if let Some(rest) = trimmed.strip_prefix(['-', '*', '+']) {
        return starts_with_space(rest);
    }
    let digits = trimmed.chars().take_while(char::is_ascii_digit).count();
    digits > 0
        && trimmed[digits..]
            .strip_prefix('.')
            .is_some_and(starts_with_space)
}

/// Open element being built. `tag: None` splices its children into the parent.
struct Frame {
    tag: Option<&'static str>,
    href: Option<String>,
    children: Vec<Node>,
}

impl Frame {
    fn new(tag: Option<&'static str>) -> Self {
        Self {
            tag,
            href: None,
            children: Vec::new(),
        }
    }
}

fn heading_tag(level: HeadingLevel) -> &'static str {
    match level {
        HeadingLevel::H1 | HeadingLevel::H3 => "h3",
        _ => "h4",
    }
}

fn push_text(children: &mut Vec<Node>, text: &str) {
    if let Some(Node::Text(last)) = children.last_mut() {
        last.push_str(text);
    } else {
        children.push(Node::text(text));
    }
}

/// Render Markdown through pulldown-cmark events.
pub fn markdown_to_nodes(text: &str) -> Vec<Node> {
    let parser = Parser::new_ext(text, Options::ENABLE_STRIKETHROUGH);
    let mut stack = vec![Frame::new(None)];

    for event in parser {
        match event {
            Event::Start(tag) => {
                let frame = match tag {
                    Tag::Paragraph => Frame::new(Some("p")),
                    Tag::Heading { level, .. } => Frame::new(Some(heading_tag(level))),
                    Tag::BlockQuote(_) => Frame::new(Some("blockquote")),
                    Tag::CodeBlock(_) => Frame::new(Some("pre")),
                    Tag::List(Some(_)) => Frame::new(Some("ol")),
                    Tag::List(None) => Frame::new(Some("ul")),
                    Tag::Item => Frame::new(Some("li")),
                    Tag::Emphasis => Frame::new(Some("em")),
                    Tag::Strong => Frame::new(Some("strong")),
                    Tag::Strikethrough => Frame::new(Some("s")),
                    Tag::Link { dest_url, .. } => Frame {
                        href: Some(dest_url.to_string()),
                        ..Frame::new(Some("a"))
                    },
                    Tag::Image { dest_url, .. } => Frame {
                        href: Some(dest_url.to_string()),
                        ..Frame::new(Some("img"))
                    },
                    _ => Frame::new(None),
                };
                stack.push(frame);
            }
            Event::End(end) => {
                if stack.len() < 2 {
                    continue;
                }
                let Some(frame) = stack.pop() else { continue };
                let Some(parent) = stack.last_mut() else { continue };
                close(frame, end, &mut parent.children);
            }
            Event::Text(t) | Event::Html(t) | Event::InlineHtml(t) => {
                if let Some(top) = stack.last_mut() {
                    push_text(&mut top.children, &t);
                }
            }
            Event::Code(t) => {
                if let Some(top) = stack.last_mut() {
                    top.children.push(Node::element("code", vec![Node::text(t.to_string())]));
                }
            }
            Event::SoftBreak => {
                if let Some(top) = stack.last_mut() {
                    push_text(&mut top.children, "\n");
                }
            }
            Event::HardBreak => {
                if let Some(top) = stack.last_mut() {
                    top.children.push(Node::element("br", Vec::new()));
                }
            }
            Event::Rule => {
                if let Some(top) = stack.last_mut() {
                    top.children.push(Node::hr());
                }
            }
            Event::TaskListMarker(done) => {
                if let Some(top) = stack.last_mut() {
                    push_text(&mut top.children, if done { "[x] " } else { "[ ] " });
                }
            }
            _ => {}
        }
    }

    while stack.len() > 1 {
        if let Some(frame) = stack.pop()
            && let Some(parent) = stack.last_mut()
        {
            parent.children.extend(frame.children);
        }
    }
    stack.pop().map(|root| root.children).unwrap_or_default()
}

fn close(frame: Frame, end: TagEnd, out: &mut Vec<Node>) {
    match (frame.tag, end) {
        (Some("img"), TagEnd::Image) => {
            out.push(Node::image(frame.href.as_deref().unwrap_or_default()));
        }
        (Some("a"), TagEnd::Link) => {
            out.push(Node::element_with_attr(
                "a",
                "href",
                frame.href.as_deref().unwrap_or_default(),
                frame.children,
            ));
        }
        (Some(tag), _) => out.push(Node::Element(Element {
            tag: tag.to_string(),
            attrs: None,
            children: frame.children,
        })),
        (None, _) => out.extend(frame.children),
    }
}
