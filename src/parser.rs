//! Tree builder: turns lexer tokens into a [`Node`] tree and collects link
//! reference definitions along the way.

use crate::ast::{Alignment, Node};
use crate::grammar::{
    LinkTarget, ListType, atx_heading, closing_fence, fence_language, fence_open, is_email,
    is_blockquote_start, link_span, remove_indent_columns, setext_underline, split_table_row,
    strip_blockquote_marker, table_alignment, unescape,
};
use crate::lexer::{Lexer, lazy_line, scan_list};
use crate::options::Options;
use crate::references::{ReferenceTable, normalize_label, parse_definition};
use crate::token::{Token, TokenKind};
use log::{debug, trace};

/// Containers and inline spans nested deeper than this are kept as literal text.
const MAX_NESTING: usize = 128;

pub struct Parser {
    tables: bool,
    references: ReferenceTable,
}

/// Block children of one container, and whether a blank line separated two of them.
struct Blocks {
    nodes: Vec<Node>,
    blank_between: bool,
}

impl Parser {
    pub fn new(options: &Options) -> Self {
        Parser {
            tables: options.tables,
            references: ReferenceTable::new(),
        }
    }

    /// Parse a whole document. References are resolved against every
    /// definition in the document before the tree is returned.
    pub fn parse(mut self, input: &str) -> (Node, ReferenceTable) {
        let blocks = self.parse_blocks(input, false, 0);
        let mut root = Node::Document(blocks.nodes);
        self.references.resolve(&mut root);
        (root, self.references)
    }

    fn parse_blocks(&mut self, input: &str, list_item: bool, depth: usize) -> Blocks {
        if depth >= MAX_NESTING {
            debug!("nesting limit reached, keeping {} byte(s) as text", input.len());
            let text = input.trim();
            let nodes = if text.is_empty() {
                Vec::new()
            } else {
                vec![Node::Paragraph(vec![Node::Text(text.to_string())])]
            };
            return Blocks {
                nodes,
                blank_between: false,
            };
        }
        let mut lexer = Lexer::block(input).with_tables(self.tables);
        if list_item {
            lexer = lexer.within_list_item();
        }
        let mut tokens = lexer.peekable();
        let mut nodes = Vec::new();
        let mut blank_pending = false;
        let mut blank_between = false;

        while let Some(token) = tokens.next() {
            let node = match token.kind {
                TokenKind::Newline => {
                    blank_pending = !nodes.is_empty();
                    continue;
                }
                TokenKind::Definition => {
                    self.define(token.raw);
                    continue;
                }
                TokenKind::Text => {
                    let mut lines = vec![token.raw];
                    while let Some(next) = tokens.next_if(|next| next.kind == TokenKind::Text) {
                        lines.push(next.raw);
                    }
                    Node::Paragraph(self.parse_inline(&paragraph_text(&lines), depth))
                }
                TokenKind::Heading => {
                    let line = token.raw.trim_end_matches('\n');
                    let (level, text) = atx_heading(line).unwrap_or((1, line));
                    Node::Heading {
                        level,
                        children: self.parse_inline(text, depth),
                    }
                }
                TokenKind::SetextHeading => self.setext_heading(token.raw, depth),
                TokenKind::HorizontalRule => Node::ThematicBreak,
                TokenKind::IndentedCode => Node::CodeBlock {
                    info: String::new(),
                    literal: indented_code(token.raw),
                },
                TokenKind::FencedCode => fenced_code(token.raw),
                TokenKind::Html => Node::HtmlBlock(token.raw.trim_end_matches('\n').to_string()),
                TokenKind::BlockQuote => {
                    let content = quote_content(token.raw);
                    Node::BlockQuote(self.parse_blocks(&content, false, depth + 1).nodes)
                }
                TokenKind::List => self.list(token.raw, depth),
                TokenKind::Table => self.table(token.raw, depth),
                // Inline kinds never come out of a block lexer
                _ => Node::Paragraph(self.parse_inline(token.raw.trim(), depth)),
            };
            if blank_pending {
                blank_between = true;
                blank_pending = false;
            }
            nodes.push(node);
        }

        Blocks {
            nodes,
            blank_between,
        }
    }

    fn define(&mut self, raw: &str) {
        let lines: Vec<&str> = raw.lines().collect();
        if let Some((label, definition, _)) = parse_definition(&lines)
            && !self.references.insert(&label, definition)
        {
            debug!(
                "ignoring duplicate link definition [{}]",
                normalize_label(&label)
            );
        }
    }

    fn setext_heading(&self, raw: &str, depth: usize) -> Node {
        let mut lines = raw.lines();
        let text = lines.next().unwrap_or_default().trim();
        let level = lines.next().and_then(setext_underline).unwrap_or(1);
        Node::Heading {
            level,
            children: self.parse_inline(text, depth),
        }
    }

    fn list(&mut self, raw: &str, depth: usize) -> Node {
        let lines: Vec<&str> = raw.lines().collect();
        let Some(scan) = scan_list(&lines) else {
            return Node::Paragraph(self.parse_inline(raw.trim(), depth));
        };

        let count = scan.items.len();
        let mut loose = false;
        let mut items = Vec::with_capacity(count);
        for (index, item) in scan.items.into_iter().enumerate() {
            let blocks = self.parse_blocks(&item.content, true, depth + 1);
            loose |= blocks.blank_between || (item.blank_after && index + 1 < count);
            items.push(blocks.nodes);
        }
        let tight = !loose;
        trace!("list of {} item(s), tight: {}", count, tight);

        let children = items
            .into_iter()
            .map(|children| Node::ListItem { tight, children })
            .collect();
        match scan.kind {
            ListType::Unordered(_) => Node::UnorderedList { tight, children },
            ListType::Ordered(start, _) => Node::OrderedList {
                start,
                tight,
                children,
            },
        }
    }

    fn table(&self, raw: &str, depth: usize) -> Node {
        let lines: Vec<&str> = raw.lines().collect();
        let [header, delimiter, body @ ..] = lines.as_slice() else {
            return Node::Paragraph(self.parse_inline(raw.trim(), depth));
        };
        let alignments: Vec<Alignment> = split_table_row(delimiter)
            .into_iter()
            .map(table_alignment)
            .collect();

        let mut rows = vec![self.table_row(header, &alignments, true, depth)];
        rows.extend(
            body.iter()
                .map(|line| self.table_row(line, &alignments, false, depth)),
        );
        Node::Table {
            alignments,
            children: rows,
        }
    }

    fn table_row(
        &self,
        line: &str,
        alignments: &[Alignment],
        is_header: bool,
        depth: usize,
    ) -> Node {
        let cells = split_table_row(line);
        let children = alignments
            .iter()
            .enumerate()
            .map(|(index, &alignment)| Node::TableCell {
                is_header,
                alignment,
                children: cells
                    .get(index)
                    .map(|cell| self.parse_inline(cell, depth))
                    .unwrap_or_default(),
            })
            .collect();
        Node::TableRow(children)
    }

    /// Inline nodes of paragraph or heading text found `depth` containers and
    /// spans deep.
    fn parse_inline(&self, text: &str, depth: usize) -> Vec<Node> {
        if depth >= MAX_NESTING {
            return literal(text);
        }
        self.inline_nodes(Lexer::inline(text), depth)
    }

    fn parse_link_text(&self, text: &str, depth: usize) -> Vec<Node> {
        if depth >= MAX_NESTING {
            return literal(text);
        }
        self.inline_nodes(Lexer::inline(text).without_autolinks(), depth)
    }

    fn inline_nodes(&self, lexer: Lexer<'_>, depth: usize) -> Vec<Node> {
        let mut nodes = Vec::new();
        for token in lexer {
            let node = match token.kind {
                TokenKind::Text => {
                    push_text(&mut nodes, &unescape(token.raw));
                    continue;
                }
                TokenKind::LineBreak => Node::HardBreak,
                TokenKind::Html => Node::HtmlInline(token.raw.to_string()),
                TokenKind::InlineCode => Node::Code(code_span_content(token.raw)),
                TokenKind::Strong => {
                    Node::Strong(self.parse_inline(inner(token.raw, 2), depth + 1))
                }
                TokenKind::Italic => {
                    Node::Emphasis(self.parse_inline(inner(token.raw, 1), depth + 1))
                }
                TokenKind::Strike => {
                    Node::Strikethrough(self.parse_inline(inner(token.raw, 2), depth + 1))
                }
                TokenKind::Link => self.link(token, depth + 1),
                TokenKind::Image => self.image(token, depth + 1),
                _ => {
                    push_text(&mut nodes, token.raw);
                    continue;
                }
            };
            nodes.push(node);
        }
        nodes
    }

    fn link(&self, token: Token<'_>, depth: usize) -> Node {
        let raw = token.raw;
        if let Some(url) = raw.strip_prefix('<').and_then(|rest| rest.strip_suffix('>')) {
            let destination = if is_email(url) {
                format!("mailto:{url}")
            } else {
                url.to_string()
            };
            return Node::Link {
                destination,
                title: None,
                children: vec![Node::Text(url.to_string())],
            };
        }
        if !raw.starts_with('[') {
            return Node::Link {
                destination: raw.to_string(),
                title: None,
                children: vec![Node::Text(raw.to_string())],
            };
        }
        let Some(span) = link_span(raw, 0) else {
            return Node::Text(unescape(raw));
        };
        let children = self.parse_link_text(span.text, depth);
        match span.target {
            LinkTarget::Inline { destination, title } => Node::Link {
                destination: unescape(destination),
                title: title.map(unescape),
                children,
            },
            target => reference(false, span.text, target, &raw[span.text.len() + 1..], children),
        }
    }

    fn image(&self, token: Token<'_>, depth: usize) -> Node {
        let raw = &token.raw[1..];
        let Some(span) = link_span(raw, 0) else {
            return Node::Text(unescape(token.raw));
        };
        let children = self.parse_link_text(span.text, depth);
        match span.target {
            LinkTarget::Inline { destination, title } => Node::Image {
                destination: unescape(destination),
                title: title.map(unescape),
                alt: children.iter().map(Node::text_content).collect(),
            },
            target => reference(true, span.text, target, &raw[span.text.len() + 1..], children),
        }
    }
}

/// Reference link awaiting resolution. `closer` is the source after the link
/// text, from its closing bracket on.
fn reference(
    image: bool,
    text: &str,
    target: LinkTarget<'_>,
    closer: &str,
    children: Vec<Node>,
) -> Node {
    let label = match target {
        LinkTarget::Full(label) => label,
        _ => text,
    };
    Node::Reference {
        image,
        label: normalize_label(label),
        children,
        closer: unescape(closer),
    }
}

/// Source text kept as it is, escapes aside.
fn literal(text: &str) -> Vec<Node> {
    if text.is_empty() {
        Vec::new()
    } else {
        vec![Node::Text(unescape(text))]
    }
}

fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if let Some(Node::Text(last)) = nodes.last_mut() {
        last.push_str(text);
    } else {
        nodes.push(Node::Text(text.to_string()));
    }
}

/// `raw` without `width` delimiter characters on each side.
fn inner(raw: &str, width: usize) -> &str {
    raw.get(width..raw.len().saturating_sub(width)).unwrap_or_default()
}

fn code_span_content(raw: &str) -> String {
    raw.trim_matches('`').trim().to_string()
}

/// Join paragraph lines: the first keeps its indentation, continuation lines
/// lose theirs, and trailing whitespace of the last line is dropped.
fn paragraph_text(lines: &[&str]) -> String {
    let mut text = String::new();
    for (index, raw) in lines.iter().enumerate() {
        let line = raw.strip_suffix('\n').unwrap_or(raw);
        if index == 0 {
            text.push_str(line);
        } else {
            text.push('\n');
            text.push_str(line.trim_start_matches([' ', '\t']));
        }
    }
    text.trim_end_matches([' ', '\t']).to_string()
}

fn indented_code(raw: &str) -> String {
    let lines: Vec<String> = raw
        .lines()
        .map(|line| remove_indent_columns(line, 4))
        .collect();
    let mut literal = lines.join("\n");
    if raw.ends_with('\n') {
        literal.push('\n');
    }
    literal
}

fn fenced_code(raw: &str) -> Node {
    let lines: Vec<&str> = raw.lines().collect();
    let Some((&opening, rest)) = lines.split_first() else {
        return Node::CodeBlock {
            info: String::new(),
            literal: String::new(),
        };
    };
    let Some(fence) = fence_open(opening) else {
        return Node::CodeBlock {
            info: String::new(),
            literal: raw.to_string(),
        };
    };

    let (closing, body) = match rest.split_last() {
        Some((&closing, body)) => (closing, body),
        None => ("", rest),
    };
    let mut code: Vec<String> = body
        .iter()
        .map(|line| remove_indent_columns(line, fence.indent))
        .collect();
    if let Some(before) = closing_fence(closing, &fence)
        && !before.is_empty()
    {
        code.push(remove_indent_columns(before, fence.indent));
    }

    Node::CodeBlock {
        info: fence_language(opening, &fence),
        literal: code.join("\n").trim_end().to_string(),
    }
}

/// Blockquote lines with their markers stripped. Lazy lines are kept as
/// paragraph continuation text.
fn quote_content(raw: &str) -> String {
    raw.lines()
        .map(|line| {
            if is_blockquote_start(line) {
                strip_blockquote_marker(line)
            } else {
                lazy_line(line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Vec<Node> {
        match Parser::new(&Options::default()).parse(input).0 {
            Node::Document(children) => children,
            other => vec![other],
        }
    }

    fn text(value: &str) -> Node {
        Node::Text(value.to_string())
    }

    #[test]
    fn test_empty_document() {
        assert!(parse("").is_empty());
        assert!(parse("\n\n  \n").is_empty());
    }

    #[test]
    fn test_paragraph_lines_and_breaks() {
        assert_eq!(
            parse("foo  \n   bar  "),
            vec![Node::Paragraph(vec![text("foo"), Node::HardBreak, text("bar")])]
        );
    }

    #[test]
    fn test_headings() {
        assert_eq!(
            parse("## foo ##\nbar\n---"),
            vec![
                Node::Heading {
                    level: 2,
                    children: vec![text("foo")]
                },
                Node::Heading {
                    level: 2,
                    children: vec![text("bar")]
                },
            ]
        );
    }

    #[test]
    fn test_nested_emphasis() {
        assert_eq!(
            parse("___foo___"),
            vec![Node::Paragraph(vec![Node::Strong(vec![Node::Emphasis(
                vec![text("foo")]
            )])])]
        );
    }

    #[test]
    fn test_mismatched_delimiter_runs() {
        assert_eq!(
            parse("*foo**"),
            vec![Node::Paragraph(vec![
                Node::Emphasis(vec![text("foo")]),
                text("*")
            ])]
        );
        assert_eq!(
            parse("**foo***"),
            vec![Node::Paragraph(vec![
                Node::Strong(vec![text("foo")]),
                text("*")
            ])]
        );
    }

    #[test]
    fn test_nesting_limit_keeps_deep_blocks_as_text() {
        let nodes = parse(&("> ".repeat(200) + "x"));
        let mut node = &nodes[0];
        let mut quotes = 0;
        while let Node::BlockQuote(children) = node {
            quotes += 1;
            node = &children[0];
        }
        assert_eq!(quotes, MAX_NESTING);
        assert_eq!(node, &Node::Paragraph(vec![text(&("> ".repeat(72) + "x"))]));
    }

    #[test]
    fn test_nesting_limit_keeps_deep_spans_as_text() {
        let nodes = parse(&("[".repeat(200) + "x" + &"]".repeat(200)));
        let Node::Paragraph(children) = &nodes[0] else {
            panic!("expected a paragraph, got {:?}", nodes[0]);
        };
        let mut node = &children[0];
        let mut links = 0;
        while let Node::Reference { children, .. } = node {
            links += 1;
            node = &children[0];
        }
        assert_eq!(links, MAX_NESTING);
        assert_eq!(node, &text(&("[".repeat(72) + "x" + &"]".repeat(72))));
    }

    #[test]
    fn test_code_blocks() {
        assert_eq!(
            parse("    a\n      b\n\n    c\n"),
            vec![Node::CodeBlock {
                info: String::new(),
                literal: "a\n  b\n\nc\n".to_string()
            }]
        );
        assert_eq!(
            parse("  ```rust  x\n  fn a() {}\n    b\n  ```"),
            vec![Node::CodeBlock {
                info: "rust".to_string(),
                literal: "fn a() {}\n  b".to_string()
            }]
        );
        assert_eq!(
            parse("~~~\nvar b;~~~"),
            vec![Node::CodeBlock {
                info: String::new(),
                literal: "var b;".to_string()
            }]
        );
    }

    #[test]
    fn test_list_item_continuation() {
        let nodes = parse("1.  foo\n\n    - bar");
        assert_eq!(
            nodes,
            vec![Node::OrderedList {
                start: 1,
                tight: false,
                children: vec![Node::ListItem {
                    tight: false,
                    children: vec![
                        Node::Paragraph(vec![text("foo")]),
                        Node::UnorderedList {
                            tight: true,
                            children: vec![Node::ListItem {
                                tight: true,
                                children: vec![Node::Paragraph(vec![text("bar")])]
                            }]
                        },
                    ]
                }]
            }]
        );
    }

    #[test]
    fn test_blank_between_items_makes_list_loose() {
        let nodes = parse("- a\n\n- b");
        assert!(matches!(nodes[0], Node::UnorderedList { tight: false, .. }));
        let nodes = parse("- a\n- b\n\nafter");
        assert!(matches!(nodes[0], Node::UnorderedList { tight: true, .. }));
        assert_eq!(nodes[1], Node::Paragraph(vec![text("after")]));
    }

    #[test]
    fn test_blockquote_with_lazy_line() {
        assert_eq!(
            parse("> # Foo\n> bar\nbaz"),
            vec![Node::BlockQuote(vec![
                Node::Heading {
                    level: 1,
                    children: vec![text("Foo")]
                },
                Node::Paragraph(vec![text("bar\nbaz")]),
            ])]
        );
        // A lazy underline stays text
        assert_eq!(
            parse("> foo\n==="),
            vec![Node::BlockQuote(vec![Node::Paragraph(vec![text("foo\n===")])])]
        );
    }

    #[test]
    fn test_references_resolve_in_any_order() {
        let link = Node::Link {
            destination: "/url".to_string(),
            title: Some("t".to_string()),
            children: vec![text("foo")],
        };
        assert_eq!(
            parse("[foo]\n\n[foo]: /url \"t\""),
            vec![Node::Paragraph(vec![link.clone()])]
        );
        assert_eq!(
            parse("[foo]: /url \"t\"\n[foo]: /other\n\n[foo]"),
            vec![Node::Paragraph(vec![link])]
        );
    }

    #[test]
    fn test_unresolved_reference_keeps_source() {
        let nodes = parse("[foo][bar]");
        assert_eq!(
            nodes,
            vec![Node::Paragraph(vec![Node::Reference {
                image: false,
                label: "bar".to_string(),
                children: vec![text("foo")],
                closer: "][bar]".to_string(),
            }])]
        );
    }

    #[test]
    fn test_images_and_autolinks() {
        assert_eq!(
            parse("![a *b*](/i.png \"t\") <me@x.org>"),
            vec![Node::Paragraph(vec![
                Node::Image {
                    destination: "/i.png".to_string(),
                    title: Some("t".to_string()),
                    alt: "a b".to_string(),
                },
                text(" "),
                Node::Link {
                    destination: "mailto:me@x.org".to_string(),
                    title: None,
                    children: vec![text("me@x.org")],
                },
            ])]
        );
    }

    #[test]
    fn test_table() {
        let nodes = parse("| a | b |\n|:--|--:|\n| 1 |");
        let Node::Table {
            alignments,
            children,
        } = &nodes[0]
        else {
            panic!("expected a table, got {nodes:?}");
        };
        assert_eq!(alignments, &vec![Alignment::Left, Alignment::Right]);
        assert_eq!(children.len(), 2);
        assert_eq!(
            children[1],
            Node::TableRow(vec![
                Node::TableCell {
                    is_header: false,
                    alignment: Alignment::Left,
                    children: vec![text("1")],
                },
                Node::TableCell {
                    is_header: false,
                    alignment: Alignment::Right,
                    children: vec![],
                },
            ])
        );
    }
}
