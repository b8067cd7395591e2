//! Link reference definitions and the per-document table they populate.

use crate::ast::Node;
use crate::grammar::{count_indent_columns, is_blank, unescape};
use serde::Serialize;
use std::collections::HashMap;
use unicode_casefold::UnicodeCaseFold;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkDefinition {
    pub url: String,
    pub title: Option<String>,
}

/// Definitions keyed by normalized label. The first definition of a label wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReferenceTable {
    definitions: HashMap<String, LinkDefinition>,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the label was already defined; the table is unchanged then.
    pub fn insert(&mut self, label: &str, definition: LinkDefinition) -> bool {
        let key = normalize_label(label);
        if self.definitions.contains_key(&key) {
            return false;
        }
        self.definitions.insert(key, definition);
        true
    }

    pub fn get(&self, label: &str) -> Option<&LinkDefinition> {
        self.definitions.get(&normalize_label(label))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Replace every resolvable [`Node::Reference`] under `node` with the link
    /// or image it names. Unresolved references are left in place.
    pub fn resolve(&self, node: &mut Node) {
        let resolved = match node {
            Node::Reference {
                image,
                label,
                children,
                ..
            } => self.get(label).map(|definition| {
                let destination = definition.url.clone();
                let title = definition.title.clone();
                if *image {
                    Node::Image {
                        destination,
                        title,
                        alt: children.iter().map(Node::text_content).collect(),
                    }
                } else {
                    Node::Link {
                        destination,
                        title,
                        children: std::mem::take(children),
                    }
                }
            }),
            _ => None,
        };
        if let Some(resolved) = resolved {
            *node = resolved;
        }
        if let Some(children) = node.children_mut() {
            for child in children {
                self.resolve(child);
            }
        }
    }
}

/// Case-fold a label and collapse its whitespace runs to single spaces.
pub fn normalize_label(label: &str) -> String {
    let folded: String = label.chars().case_fold().collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a `[label]: destination "title"` definition at the start of `lines`.
/// Returns the raw label, the definition and the number of lines consumed.
pub(crate) fn parse_definition(lines: &[&str]) -> Option<(String, LinkDefinition, usize)> {
    let first_line = *lines.first()?;
    if count_indent_columns(first_line) > 3 {
        return None;
    }
    let after_bracket = first_line.trim_start().strip_prefix('[')?;

    // The label may span lines but never a blank one
    let mut label = String::new();
    let mut current_line = 0;
    let mut scan = after_bracket;
    let after_label = loop {
        let mut chars = scan.char_indices();
        let mut closed = None;
        while let Some((i, ch)) = chars.next() {
            match ch {
                '\\' => {
                    label.push(ch);
                    if let Some((_, escaped)) = chars.next() {
                        label.push(escaped);
                    }
                }
                ']' => {
                    closed = Some(&scan[i + 1..]);
                    break;
                }
                '[' => return None,
                _ => label.push(ch),
            }
        }
        if let Some(rest) = closed {
            break rest;
        }
        current_line += 1;
        let next = *lines.get(current_line)?;
        if is_blank(next) {
            return None;
        }
        label.push('\n');
        scan = next;
    };

    if label.trim().is_empty() {
        return None;
    }
    let after_colon = after_label.strip_prefix(':')?.trim_start();

    let mut remaining = after_colon;
    if remaining.is_empty() {
        current_line += 1;
        remaining = lines.get(current_line)?.trim_start();
    }

    let (url, consumed) = parse_destination(remaining)?;
    let after_destination = &remaining[consumed..];
    let separated = after_destination.starts_with(char::is_whitespace);
    remaining = after_destination.trim_start();

    // A title may also start on the following line
    let title_on_next_line = remaining.is_empty() && current_line + 1 < lines.len();
    if title_on_next_line {
        remaining = lines[current_line + 1].trim_start();
    }

    let title = if remaining.is_empty() {
        None
    } else if !separated && !title_on_next_line {
        return None;
    } else {
        let title_start = if title_on_next_line {
            current_line + 1
        } else {
            current_line
        };
        match parse_title(&lines[title_start..], remaining) {
            Some((title, title_lines)) => {
                current_line = title_start + title_lines - 1;
                Some(title)
            }
            // A broken title on the next line is just the following paragraph
            None if title_on_next_line => None,
            None => return None,
        }
    };

    Some((label, LinkDefinition { url, title }, current_line + 1))
}

/// Destination in `<...>` form or as a run of non-space characters with
/// balanced parentheses. Returns the unescaped destination and its byte length.
fn parse_destination(text: &str) -> Option<(String, usize)> {
    if let Some(inner) = text.strip_prefix('<') {
        let close = inner.find(['>', '<', '\n'])?;
        if !inner[close..].starts_with('>') {
            return None;
        }
        return Some((unescape(&inner[..close]), close + 2));
    }

    let mut depth = 0usize;
    let mut end = text.len();
    let mut chars = text.char_indices().peekable();
    while let Some((i, ch)) = chars.next() {
        match ch {
            '\\' => {
                chars.next_if(|&(_, next)| next.is_ascii_punctuation());
            }
            '(' => depth += 1,
            ')' if depth == 0 => {
                end = i;
                break;
            }
            ')' => depth -= 1,
            c if c.is_whitespace() => {
                end = i;
                break;
            }
            c if c.is_ascii_control() => return None,
            _ => {}
        }
    }
    if end == 0 {
        return None;
    }
    Some((unescape(&text[..end]), end))
}

/// Quoted or parenthesized title starting at `first`, the remainder of
/// `lines[0]`. Titles may span lines but not blank ones, and nothing but
/// whitespace may follow the closing delimiter.
fn parse_title(lines: &[&str], first: &str) -> Option<(String, usize)> {
    let mut chars = first.chars();
    let closer = match chars.next()? {
        '"' => '"',
        '\'' => '\'',
        '(' => ')',
        _ => return None,
    };

    let mut title = String::new();
    let mut line_index = 0;
    let mut current = chars.as_str();
    loop {
        let mut chars = current.char_indices();
        while let Some((i, ch)) = chars.next() {
            if ch == closer {
                if !current[i + 1..].trim().is_empty() {
                    return None;
                }
                return Some((unescape(&title), line_index + 1));
            }
            title.push(ch);
            if ch == '\\'
                && let Some((_, escaped)) = chars.next()
            {
                title.push(escaped);
            }
        }
        line_index += 1;
        let next = *lines.get(line_index)?;
        if is_blank(next) {
            return None;
        }
        title.push('\n');
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(source: &str) -> Option<(String, LinkDefinition, usize)> {
        let lines: Vec<&str> = source.lines().collect();
        parse_definition(&lines)
    }

    #[test]
    fn test_simple_definition() {
        let (label, def, consumed) = definition(r#"[foo]: /url "title""#).unwrap();
        assert_eq!(label, "foo");
        assert_eq!(def.url, "/url");
        assert_eq!(def.title.as_deref(), Some("title"));
        assert_eq!(consumed, 1);
    }

    #[test]
    fn test_multiline_label_and_title() {
        let (label, def, consumed) = definition("[\nfoo\n]: /url\nbar").unwrap();
        assert_eq!(normalize_label(&label), "foo");
        assert_eq!(def.title, None);
        assert_eq!(consumed, 3);

        let (_, def, consumed) = definition("[foo]: /url '\ntitle\nline1\n'").unwrap();
        assert_eq!(def.title.as_deref(), Some("\ntitle\nline1\n"));
        assert_eq!(consumed, 4);
    }

    #[test]
    fn test_title_on_next_line() {
        let (_, def, consumed) = definition("[foo]:\n/url\n'the title'").unwrap();
        assert_eq!(def.url, "/url");
        assert_eq!(def.title.as_deref(), Some("the title"));
        assert_eq!(consumed, 3);

        // Not a title, so the line is left for the paragraph
        let (_, def, consumed) = definition("[foo]: /url\n\"title\" ok").unwrap();
        assert_eq!(def.title, None);
        assert_eq!(consumed, 1);
    }

    #[test]
    fn test_invalid_definitions() {
        assert!(definition("[foo]:").is_none());
        assert!(definition("[foo]:\n\n[foo]").is_none());
        assert!(definition(r#"[foo]: /url "title" ok"#).is_none());
        assert!(definition("[foo] bar").is_none());
        assert!(definition("    [foo]: /url").is_none());
        assert!(definition("[]: /url").is_none());
    }

    #[test]
    fn test_angle_destination_and_escapes() {
        let (_, def, _) = definition(r"[a]: <my url> 'x'").unwrap();
        assert_eq!(def.url, "my url");
        let (_, def, _) = definition(r"[a]: /url\*").unwrap();
        assert_eq!(def.url, "/url*");
    }

    #[test]
    fn test_normalize_label_folds_case_and_space() {
        assert_eq!(normalize_label("Foo  Bar"), "foo bar");
        assert_eq!(normalize_label("\nFOO\n"), "foo");
        assert_eq!(normalize_label("ẞ"), normalize_label("ss"));
    }

    #[test]
    fn test_first_definition_wins() {
        let mut table = ReferenceTable::new();
        let first = LinkDefinition {
            url: "first".to_string(),
            title: None,
        };
        let second = LinkDefinition {
            url: "second".to_string(),
            title: None,
        };
        assert!(table.insert("Foo", first));
        assert!(!table.insert("foo", second));
        assert_eq!(table.get("FOO").map(|d| d.url.as_str()), Some("first"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_resolve_replaces_references() {
        let mut table = ReferenceTable::new();
        table.insert(
            "foo",
            LinkDefinition {
                url: "/url".to_string(),
                title: None,
            },
        );
        let mut tree = Node::Document(vec![Node::Paragraph(vec![
            Node::Reference {
                image: false,
                label: "foo".to_string(),
                children: vec![Node::Text("foo".to_string())],
                closer: "]".to_string(),
            },
            Node::Reference {
                image: false,
                label: "bar".to_string(),
                children: vec![Node::Text("bar".to_string())],
                closer: "]".to_string(),
            },
        ])]);
        table.resolve(&mut tree);
        let paragraph = &tree.children()[0];
        assert_eq!(
            paragraph.children()[0],
            Node::Link {
                destination: "/url".to_string(),
                title: None,
                children: vec![Node::Text("foo".to_string())],
            }
        );
        assert!(matches!(paragraph.children()[1], Node::Reference { .. }));
    }
}
