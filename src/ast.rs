/// Node tree produced by the parser and walked by the renderer
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Document(Vec<Node>),
    // Block-level nodes
    Paragraph(Vec<Node>),
    Heading {
        level: u8,
        children: Vec<Node>,
    },
    CodeBlock {
        info: String, // Language tag, first word of the fence info string
        literal: String,
    },
    ThematicBreak,
    BlockQuote(Vec<Node>),
    UnorderedList {
        tight: bool,
        children: Vec<Node>, // ListItem nodes
    },
    OrderedList {
        start: u32,
        tight: bool,
        children: Vec<Node>,
    },
    ListItem {
        tight: bool, // Tight items drop the <p> around their paragraphs
        children: Vec<Node>,
    },
    HtmlBlock(String),
    Table {
        alignments: Vec<Alignment>,
        children: Vec<Node>, // TableRow nodes, header row first
    },
    TableRow(Vec<Node>),
    TableCell {
        is_header: bool,
        alignment: Alignment,
        children: Vec<Node>,
    },
    // Inline nodes
    Text(String),
    Code(String),
    Emphasis(Vec<Node>),
    Strong(Vec<Node>),
    Strikethrough(Vec<Node>),
    Link {
        destination: String,
        title: Option<String>,
        children: Vec<Node>,
    },
    Image {
        destination: String,
        title: Option<String>,
        alt: String,
    },
    /// A `[text][label]`, `[text][]` or `[label]` reference waiting on the
    /// definition table. Unresolved references stay in the tree and render as
    /// the literal bracketed source.
    Reference {
        image: bool,
        label: String,
        children: Vec<Node>,
        closer: String,
    },
    HardBreak,
    HtmlInline(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    None,
    Left,
    Right,
    Center,
}

/// Tag of a [`Node`] variant, used as the key of the renderer's override table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Document,
    Paragraph,
    Heading,
    CodeBlock,
    ThematicBreak,
    BlockQuote,
    UnorderedList,
    OrderedList,
    ListItem,
    HtmlBlock,
    Table,
    TableRow,
    TableCell,
    Text,
    Code,
    Emphasis,
    Strong,
    Strikethrough,
    Link,
    Image,
    Reference,
    HardBreak,
    HtmlInline,
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Document(_) => NodeKind::Document,
            Node::Paragraph(_) => NodeKind::Paragraph,
            Node::Heading { .. } => NodeKind::Heading,
            Node::CodeBlock { .. } => NodeKind::CodeBlock,
            Node::ThematicBreak => NodeKind::ThematicBreak,
            Node::BlockQuote(_) => NodeKind::BlockQuote,
            Node::UnorderedList { .. } => NodeKind::UnorderedList,
            Node::OrderedList { .. } => NodeKind::OrderedList,
            Node::ListItem { .. } => NodeKind::ListItem,
            Node::HtmlBlock(_) => NodeKind::HtmlBlock,
            Node::Table { .. } => NodeKind::Table,
            Node::TableRow(_) => NodeKind::TableRow,
            Node::TableCell { .. } => NodeKind::TableCell,
            Node::Text(_) => NodeKind::Text,
            Node::Code(_) => NodeKind::Code,
            Node::Emphasis(_) => NodeKind::Emphasis,
            Node::Strong(_) => NodeKind::Strong,
            Node::Strikethrough(_) => NodeKind::Strikethrough,
            Node::Link { .. } => NodeKind::Link,
            Node::Image { .. } => NodeKind::Image,
            Node::Reference { .. } => NodeKind::Reference,
            Node::HardBreak => NodeKind::HardBreak,
            Node::HtmlInline(_) => NodeKind::HtmlInline,
        }
    }

    /// Ordered children; empty for leaves.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Document(children)
            | Node::Paragraph(children)
            | Node::BlockQuote(children)
            | Node::TableRow(children)
            | Node::Emphasis(children)
            | Node::Strong(children)
            | Node::Strikethrough(children)
            | Node::Heading { children, .. }
            | Node::UnorderedList { children, .. }
            | Node::OrderedList { children, .. }
            | Node::ListItem { children, .. }
            | Node::Table { children, .. }
            | Node::TableCell { children, .. }
            | Node::Link { children, .. }
            | Node::Reference { children, .. } => children,
            Node::CodeBlock { .. }
            | Node::ThematicBreak
            | Node::HtmlBlock(_)
            | Node::Text(_)
            | Node::Code(_)
            | Node::Image { .. }
            | Node::HardBreak
            | Node::HtmlInline(_) => &[],
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Document(children)
            | Node::Paragraph(children)
            | Node::BlockQuote(children)
            | Node::TableRow(children)
            | Node::Emphasis(children)
            | Node::Strong(children)
            | Node::Strikethrough(children)
            | Node::Heading { children, .. }
            | Node::UnorderedList { children, .. }
            | Node::OrderedList { children, .. }
            | Node::ListItem { children, .. }
            | Node::Table { children, .. }
            | Node::TableCell { children, .. }
            | Node::Link { children, .. }
            | Node::Reference { children, .. } => Some(children),
            _ => None,
        }
    }

    /// Plain text of the node with all markup removed.
    pub fn text_content(&self) -> String {
        match self {
            Node::Text(text) | Node::Code(text) => text.clone(),
            Node::Image { alt, .. } => alt.clone(),
            Node::HardBreak => "\n".to_string(),
            node => node.children().iter().map(Node::text_content).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_content_flattens_markup() {
        let node = Node::Heading {
            level: 2,
            children: vec![
                Node::Text("Hello ".to_string()),
                Node::Strong(vec![Node::Text("big".to_string())]),
                Node::Code(" world".to_string()),
            ],
        };
        assert_eq!(node.text_content(), "Hello big world");
    }

    #[test]
    fn test_leaves_have_no_children() {
        assert!(Node::ThematicBreak.children().is_empty());
        assert!(Node::Code("x".to_string()).children().is_empty());
        assert_eq!(Node::HardBreak.kind(), NodeKind::HardBreak);
    }

    #[test]
    fn test_serializes_with_variant_tags() {
        let node = Node::Emphasis(vec![Node::Text("hi".to_string())]);
        let json = serde_json::to_string(&node).unwrap();
        assert_eq!(json, r#"{"Emphasis":[{"Text":"hi"}]}"#);
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(back, node);
    }
}
