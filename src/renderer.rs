/// HTML renderer for the node tree, with per-kind overrides
use crate::ast::{Alignment, Node, NodeKind};
use crate::grammar::entity;
use crate::options::Options;
use crate::typography::{fractions, smartypants};
use std::collections::HashMap;

/// Caller-supplied rendering for one node kind. It receives the renderer so
/// it can delegate descendants back to the normal pipeline.
pub type RenderFn = Box<dyn Fn(&Node, &HtmlRenderer<'_>) -> String + Send + Sync>;

/// Overrides keyed by node kind. Kinds without an entry use the default rule.
#[derive(Default)]
pub struct RenderTable {
    overrides: HashMap<NodeKind, RenderFn>,
}

impl RenderTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `render` for `kind`, replacing any earlier override.
    pub fn insert(&mut self, kind: NodeKind, render: RenderFn) {
        self.overrides.insert(kind, render);
    }

    pub fn get(&self, kind: NodeKind) -> Option<&RenderFn> {
        self.overrides.get(&kind)
    }

    pub fn contains(&self, kind: NodeKind) -> bool {
        self.overrides.contains_key(&kind)
    }
}

pub struct HtmlRenderer<'a> {
    options: &'a Options,
    table: &'a RenderTable,
}

impl<'a> HtmlRenderer<'a> {
    pub fn new(options: &'a Options, table: &'a RenderTable) -> Self {
        HtmlRenderer { options, table }
    }

    pub fn options(&self) -> &Options {
        self.options
    }

    /// Render `node` through its override if one is registered.
    pub fn render(&self, node: &Node) -> String {
        match self.table.get(node.kind()) {
            Some(render) => render(node, self),
            None => self.render_default(node),
        }
    }

    /// Inline children, concatenated.
    pub fn render_children(&self, node: &Node) -> String {
        node.children().iter().map(|child| self.render(child)).collect()
    }

    /// Block children, one per line.
    pub fn render_blocks(&self, node: &Node) -> String {
        node.children()
            .iter()
            .map(|child| self.render(child))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn render_default(&self, node: &Node) -> String {
        match node {
            Node::Document(_) => self.render_blocks(node),
            Node::Paragraph(_) => format!("<p>{}</p>", self.render_children(node)),
            Node::Heading { level, .. } => {
                let content = self.render_children(node);
                let slug = slugify(&node.text_content());
                if self.options.heading_ids && !slug.is_empty() {
                    format!("<h{level} id=\"{slug}\">{content}</h{level}>")
                } else {
                    format!("<h{level}>{content}</h{level}>")
                }
            }
            Node::CodeBlock { info, literal } => {
                if info.is_empty() {
                    format!("<pre><code>{}</code></pre>", escape_code(literal))
                } else {
                    format!(
                        "<pre><code class=\"lang-{}\">{}</code></pre>",
                        escape_attribute(info),
                        escape_code(literal)
                    )
                }
            }
            Node::ThematicBreak => "<hr>".to_string(),
            Node::BlockQuote(children) => {
                if children.is_empty() {
                    "<blockquote>\n</blockquote>".to_string()
                } else {
                    format!("<blockquote>\n{}\n</blockquote>", self.render_blocks(node))
                }
            }
            Node::UnorderedList { .. } => format!("<ul>\n{}</ul>", self.render_items(node)),
            Node::OrderedList { start, .. } => {
                if *start == 1 {
                    format!("<ol>\n{}</ol>", self.render_items(node))
                } else {
                    format!("<ol start=\"{start}\">\n{}</ol>", self.render_items(node))
                }
            }
            Node::ListItem { tight, children } => self.render_list_item(*tight, children),
            Node::HtmlBlock(html) | Node::HtmlInline(html) => html.clone(),
            Node::Table { children, .. } => {
                let mut html = String::from("<table>\n");
                if let Some((header, body)) = children.split_first() {
                    html.push_str(&format!("<thead>\n{}\n</thead>\n", self.render(header)));
                    if !body.is_empty() {
                        let rows: Vec<String> = body.iter().map(|row| self.render(row)).collect();
                        html.push_str(&format!("<tbody>\n{}\n</tbody>\n", rows.join("\n")));
                    }
                }
                html.push_str("</table>");
                html
            }
            Node::TableRow(_) => format!("<tr>\n{}\n</tr>", self.render_blocks(node)),
            Node::TableCell {
                is_header,
                alignment,
                ..
            } => {
                let tag = if *is_header { "th" } else { "td" };
                let content = self.render_children(node);
                match alignment_style(*alignment) {
                    Some(align) => {
                        format!("<{tag} style=\"text-align:{align}\">{content}</{tag}>")
                    }
                    None => format!("<{tag}>{content}</{tag}>"),
                }
            }
            Node::Text(text) => self.render_text(text),
            Node::Code(code) => format!("<code>{}</code>", escape_code(code)),
            Node::Emphasis(_) => format!("<em>{}</em>", self.render_children(node)),
            Node::Strong(_) => format!("<strong>{}</strong>", self.render_children(node)),
            Node::Strikethrough(_) => format!("<del>{}</del>", self.render_children(node)),
            Node::Link {
                destination, title, ..
            } => format!(
                "<a href=\"{}\"{}>{}</a>",
                escape_attribute(destination),
                title_attribute(title.as_deref()),
                self.render_children(node)
            ),
            Node::Image {
                destination,
                title,
                alt,
            } => format!(
                "<img src=\"{}\" alt=\"{}\"{}>",
                escape_attribute(destination),
                escape_attribute(alt),
                title_attribute(title.as_deref())
            ),
            Node::Reference { image, closer, .. } => format!(
                "{}{}{}",
                if *image { "![" } else { "[" },
                self.render_children(node),
                escape_text(closer)
            ),
            Node::HardBreak => "<br>".to_string(),
        }
    }

    fn render_items(&self, list: &Node) -> String {
        list.children()
            .iter()
            .map(|item| self.render(item) + "\n")
            .collect()
    }

    /// A tight item's paragraphs render as their bare inline content. Items
    /// that open with a block put each block on its own line.
    fn render_list_item(&self, tight: bool, children: &[Node]) -> String {
        let Some(first) = children.first() else {
            return "<li></li>".to_string();
        };
        let piece = |child: &Node| match child {
            Node::Paragraph(_) if tight => self.render_children(child),
            _ => self.render(child),
        };
        let pieces: Vec<String> = children.iter().map(piece).collect();
        let opens_with_block = !(tight && matches!(first, Node::Paragraph(_)));
        if opens_with_block {
            format!("<li>\n{}\n</li>", pieces.join("\n"))
        } else {
            format!("<li>{}</li>", pieces.concat())
        }
    }

    fn render_text(&self, text: &str) -> String {
        let text = if self.options.smartypants {
            smartypants(text)
        } else {
            text.into()
        };
        let escaped = escape_text(&text);
        if self.options.fractions {
            fractions(&escaped).into_owned()
        } else {
            escaped
        }
    }
}

fn alignment_style(alignment: Alignment) -> Option<&'static str> {
    match alignment {
        Alignment::None => None,
        Alignment::Left => Some("left"),
        Alignment::Right => Some("right"),
        Alignment::Center => Some("center"),
    }
}

fn title_attribute(title: Option<&str>) -> String {
    title
        .map(|title| format!(" title=\"{}\"", escape_attribute(title)))
        .unwrap_or_default()
}

/// Escape markup characters in text. An `&` that already starts a character
/// reference is kept.
pub fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for (i, c) in text.char_indices() {
        match c {
            '&' if entity(&text[i..]).is_some() => escaped.push('&'),
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Code content keeps its quotes.
pub fn escape_code(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn escape_attribute(value: &str) -> String {
    escape_code(value).replace('"', "&quot;")
}

/// Heading id: lower-cased alphanumerics, with whitespace, `-` and `_` runs
/// collapsed to a single dash.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if dash && !slug.is_empty() {
                slug.push('-');
            }
            dash = false;
            slug.extend(c.to_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '_' {
            dash = true;
        }
    }
    slug
}
