//! Pull-based tokenizer.
//!
//! In block mode the lexer walks whole lines and emits one token per block
//! construct, with the token's raw text covering every line the construct
//! spans (lazy continuation lines included). In inline mode it splits the
//! text of a paragraph or heading into text runs and span tokens. Every call
//! to `next` consumes at least one line or one character.

use crate::grammar::{
    ListMarker, ListType, Scan, angle_autolink, atx_heading, bare_url, bracket_pairs,
    closing_fence, code_span, count_indent_columns, double_span, fence_open, html_block_ends,
    html_block_start, inline_html, is_blank, is_blockquote_start, is_table_delimiter,
    is_thematic_break, link_span_closed_at, list_marker, remove_indent_columns,
    setext_underline, single_span, split_table_row, strip_blockquote_marker,
};
use crate::references::parse_definition;
use crate::token::{Token, TokenKind};
use log::trace;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Block,
    Inline,
}

pub struct Lexer<'a> {
    input: &'a str,
    mode: Mode,
    // Block mode state
    lines: Vec<&'a str>,
    starts: Vec<usize>,
    line: usize,
    in_paragraph: bool,
    list_item: bool,
    tables: bool,
    // Inline mode state
    pos: usize,
    autolinks: bool,
    pending: Option<Token<'a>>,
    /// Earliest offset from which a span with this delimiter and opener width
    /// ran out of text. Later openers of that kind cannot close either.
    unclosed: HashMap<(u8, usize), usize>,
    brackets: Option<HashMap<usize, usize>>,
    last_comment_close: Option<Option<usize>>,
}

impl<'a> Lexer<'a> {
    pub fn block(input: &'a str) -> Self {
        let mut lines = Vec::new();
        let mut starts = Vec::new();
        let mut offset = 0;
        for line in input.split_inclusive('\n') {
            starts.push(offset);
            offset += line.len();
            lines.push(line.strip_suffix('\n').unwrap_or(line));
        }
        Lexer {
            mode: Mode::Block,
            lines,
            starts,
            ..Lexer::inline(input)
        }
    }

    pub fn inline(input: &'a str) -> Self {
        Lexer {
            input,
            mode: Mode::Inline,
            lines: Vec::new(),
            starts: Vec::new(),
            line: 0,
            in_paragraph: false,
            list_item: false,
            tables: true,
            pos: 0,
            autolinks: true,
            pending: None,
            unclosed: HashMap::new(),
            brackets: None,
            last_comment_close: None,
        }
    }

    /// Recognize GFM pipe tables (block mode).
    pub fn with_tables(mut self, tables: bool) -> Self {
        self.tables = tables;
        self
    }

    /// Lex the content of a list item, where any list may interrupt a paragraph.
    pub fn within_list_item(mut self) -> Self {
        self.list_item = true;
        self
    }

    /// Leave bare and angle-bracket URLs as text (inline mode), as inside link text.
    pub fn without_autolinks(mut self) -> Self {
        self.autolinks = false;
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    fn next_block(&mut self) -> Option<Token<'a>> {
        let rest = &self.lines[self.line..];
        let first = *rest.first()?;
        let (kind, count) = self.block_rule(rest, first);
        let start = self.starts[self.line];
        self.line += count.max(1);
        let end = self.starts.get(self.line).copied().unwrap_or(self.input.len());
        self.in_paragraph = kind == TokenKind::Text;
        trace!("block token {:?} spanning {} line(s)", kind, count);
        Some(Token::new(kind, start, &self.input[start..end]))
    }

    /// Kind and line count of the block construct starting at `line`, which is `lines[0]`.
    fn block_rule(&self, lines: &[&str], line: &str) -> (TokenKind, usize) {
        if is_blank(line) {
            return (TokenKind::Newline, blank_run(lines));
        }
        // Indented code cannot interrupt a paragraph
        if !self.in_paragraph && count_indent_columns(line) >= 4 {
            return (TokenKind::IndentedCode, scan_indented_code(lines));
        }
        if is_thematic_break(line) {
            return (TokenKind::HorizontalRule, 1);
        }
        if atx_heading(line).is_some() {
            return (TokenKind::Heading, 1);
        }
        if let Some(count) = scan_fenced_code(lines) {
            return (TokenKind::FencedCode, count);
        }
        if let Some(kind) = html_block_start(line)
            && (kind != 7 || !self.in_paragraph)
        {
            return (TokenKind::Html, scan_html_block(lines, kind));
        }
        if is_blockquote_start(line) {
            return (TokenKind::BlockQuote, scan_blockquote(lines));
        }
        if let Some(marker) = list_marker(line)
            && self.list_can_start(&marker)
            && let Some(list) = scan_list(lines)
        {
            return (TokenKind::List, list.lines);
        }
        if !self.in_paragraph
            && let Some((_, _, count)) = parse_definition(lines)
        {
            return (TokenKind::Definition, count);
        }
        if self.tables
            && let Some(count) = scan_table(lines)
        {
            return (TokenKind::Table, count);
        }
        if lines.get(1).is_some_and(|next| setext_underline(next).is_some()) {
            return (TokenKind::SetextHeading, 2);
        }
        (TokenKind::Text, 1)
    }

    fn list_can_start(&self, marker: &ListMarker) -> bool {
        if !self.in_paragraph {
            return true;
        }
        !is_blank(&marker.content)
            && (self.list_item || matches!(marker.kind, ListType::Unordered(_) | ListType::Ordered(1, _)))
    }

    fn next_inline(&mut self) -> Option<Token<'a>> {
        if let Some(token) = self.pending.take() {
            return Some(token);
        }
        let input = self.input;
        let start = self.pos;
        if start >= input.len() {
            return None;
        }
        if let Some((kind, end)) = self.span_at(start) {
            self.pos = end;
            return Some(Token::new(kind, start, &input[start..end]));
        }

        // Text run up to the next position where a span matches
        let mut j = start;
        loop {
            j += char_step(&input[j..]);
            if j >= input.len() {
                break;
            }
            if let Some((kind, end)) = self.span_at(j) {
                self.pending = Some(Token::new(kind, j, &input[j..end]));
                self.pos = end;
                return Some(Token::new(TokenKind::Text, start, &input[start..j]));
            }
        }
        self.pos = input.len();
        Some(Token::new(TokenKind::Text, start, &input[start..]))
    }

    /// Span token beginning exactly at byte `at`, with its end offset.
    fn span_at(&mut self, at: usize) -> Option<(TokenKind, usize)> {
        let text = self.input;
        let bytes = text.as_bytes();
        match bytes[at] {
            delimiter @ (b'*' | b'_') => {
                if bytes.get(at + 1) == Some(&delimiter) {
                    self.delimited(at, delimiter, 2, |text, at| double_span(text, at, delimiter))
                        .map(|end| (TokenKind::Strong, end))
                } else {
                    self.delimited(at, delimiter, 1, |text, at| single_span(text, at, delimiter))
                        .map(|end| (TokenKind::Italic, end))
                }
            }
            b'~' => self
                .delimited(at, b'~', 2, |text, at| double_span(text, at, b'~'))
                .map(|end| (TokenKind::Strike, end)),
            b'`' if at == 0 || bytes[at - 1] != b'`' => {
                let width = bytes[at..].iter().take_while(|&&b| b == b'`').count();
                self.delimited(at, b'`', width, code_span)
                    .map(|end| (TokenKind::InlineCode, end))
            }
            b'!' => self.link_at(at + 1).map(|end| (TokenKind::Image, end)),
            b'[' => self.link_at(at).map(|end| (TokenKind::Link, end)),
            b'<' => {
                let rest = &text[at..];
                match angle_autolink(rest).filter(|_| self.autolinks) {
                    Some(len) => Some((TokenKind::Link, at + len)),
                    None if rest.starts_with("<!--") && !self.comment_closes_after(at + 4) => None,
                    None => inline_html(rest).map(|len| (TokenKind::Html, at + len)),
                }
            }
            b' ' => {
                let spaces = bytes[at..].iter().take_while(|&&b| b == b' ').count();
                (spaces >= 2 && bytes.get(at + spaces) == Some(&b'\n'))
                    .then_some((TokenKind::LineBreak, at + spaces + 1))
            }
            b if b.is_ascii_alphabetic()
                && self.autolinks
                && (at == 0 || !bytes[at - 1].is_ascii_alphanumeric()) =>
            {
                bare_url(&text[at..]).map(|len| (TokenKind::Link, at + len))
            }
            _ => None,
        }
    }

    /// Run a delimited span scanner, skipping it when an earlier opener of the
    /// same kind already ran out of text.
    fn delimited(
        &mut self,
        at: usize,
        delimiter: u8,
        width: usize,
        scan: impl FnOnce(&'a str, usize) -> Scan,
    ) -> Option<usize> {
        let key = (delimiter, width);
        if self.unclosed.get(&key).is_some_and(|&from| at >= from) {
            return None;
        }
        match scan(self.input, at) {
            Scan::Closed(end) => Some(end),
            Scan::Rejected => None,
            Scan::Unclosed => {
                self.unclosed.entry(key).or_insert(at);
                None
            }
        }
    }

    fn comment_closes_after(&mut self, at: usize) -> bool {
        let input = self.input;
        self.last_comment_close
            .get_or_insert_with(|| input.rfind("-->"))
            .is_some_and(|close| close >= at)
    }

    /// End of the link whose text opens at the `[` at `at`.
    fn link_at(&mut self, at: usize) -> Option<usize> {
        if self.input.as_bytes().get(at) != Some(&b'[') {
            return None;
        }
        let input = self.input;
        let close = *self
            .brackets
            .get_or_insert_with(|| bracket_pairs(input))
            .get(&at)?;
        link_span_closed_at(input, at, close).map(|span| span.end)
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        match self.mode {
            Mode::Block => self.next_block(),
            Mode::Inline => self.next_inline(),
        }
    }
}

/// Byte width of the next character; a backslash escape and the punctuation
/// it escapes move as one.
fn char_step(rest: &str) -> usize {
    let mut chars = rest.chars();
    match (chars.next(), chars.next()) {
        (Some('\\'), Some(next)) if next.is_ascii_punctuation() => 2,
        (Some(ch), _) => ch.len_utf8(),
        (None, _) => 1,
    }
}

fn blank_run(lines: &[&str]) -> usize {
    lines.iter().take_while(|line| is_blank(line)).count()
}

/// Indented lines, plus blank lines that are followed by more indented lines.
fn scan_indented_code(lines: &[&str]) -> usize {
    let mut end = 0;
    for (i, line) in lines.iter().enumerate() {
        if is_blank(line) {
            continue;
        }
        if count_indent_columns(line) < 4 {
            break;
        }
        end = i + 1;
    }
    end
}

/// Fenced code needs its closing fence; an unclosed fence is paragraph text.
fn scan_fenced_code(lines: &[&str]) -> Option<usize> {
    let fence = fence_open(lines.first()?)?;
    lines
        .iter()
        .skip(1)
        .position(|line| closing_fence(line, &fence).is_some())
        .map(|index| index + 2)
}

fn scan_html_block(lines: &[&str], kind: u8) -> usize {
    if kind >= 6 {
        return lines.iter().take_while(|line| !is_blank(line)).count();
    }
    lines
        .iter()
        .position(|line| html_block_ends(line, kind))
        .map_or(lines.len(), |index| index + 1)
}

/// Whether a paragraph may still be open after the block content `content`,
/// letting the next unmarked line continue it lazily.
fn allows_lazy(content: &str) -> bool {
    !is_blank(content)
        && count_indent_columns(content) < 4
        && fence_open(content).is_none()
        && !is_thematic_break(content)
        && atx_heading(content).is_none()
        && html_block_start(content).is_none()
}

/// Whether `line` opens a block that ends a paragraph instead of continuing it.
pub(crate) fn interrupts_paragraph(line: &str) -> bool {
    is_thematic_break(line)
        || atx_heading(line).is_some()
        || fence_open(line).is_some()
        || is_blockquote_start(line)
        || html_block_start(line).is_some_and(|kind| kind != 7)
        || list_marker(line).is_some_and(|marker| {
            !is_blank(&marker.content)
                && matches!(marker.kind, ListType::Unordered(_) | ListType::Ordered(1, _))
        })
}

/// A lazy continuation line as it enters nested content. An underline-like
/// line is escaped so it cannot turn the paragraph into a setext heading.
pub(crate) fn lazy_line(line: &str) -> String {
    let trimmed = line.trim_start();
    if setext_underline(trimmed).is_some() {
        format!("\\{trimmed}")
    } else {
        trimmed.to_string()
    }
}

fn scan_blockquote(lines: &[&str]) -> usize {
    let mut lazy = false;
    let mut count = 0;
    for line in lines {
        if is_blockquote_start(line) {
            lazy = allows_lazy(&strip_blockquote_marker(line));
        } else if is_blank(line) || !lazy || interrupts_paragraph(line) {
            break;
        }
        count += 1;
    }
    count
}

fn scan_table(lines: &[&str]) -> Option<usize> {
    let [header, delimiter, body @ ..] = lines else {
        return None;
    };
    if !header.contains('|') || !is_table_delimiter(delimiter) {
        return None;
    }
    if split_table_row(header).len() != split_table_row(delimiter).len() {
        return None;
    }
    let rows = body
        .iter()
        .take_while(|line| !is_blank(line) && !interrupts_paragraph(line))
        .count();
    Some(2 + rows)
}

/// Source of one list item: its content dedented to the item's content
/// column, ready to be lexed as blocks of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ListItemSource {
    pub content: String,
    /// A blank line separates this item from the next one.
    pub blank_after: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ListScan {
    pub kind: ListType,
    pub lines: usize,
    pub items: Vec<ListItemSource>,
}

struct OpenItem {
    marker_indent: usize,
    content_indent: usize,
    lines: Vec<String>,
    lazy: bool,
}

impl OpenItem {
    fn new(marker: ListMarker) -> Self {
        OpenItem {
            marker_indent: marker.indent,
            content_indent: marker.content_indent,
            lazy: allows_lazy(&marker.content),
            lines: vec![marker.content],
        }
    }

    fn push(&mut self, content: String) {
        self.lazy = allows_lazy(&content);
        self.lines.push(content);
    }

    fn finish(self, blank_after: bool) -> ListItemSource {
        ListItemSource {
            content: self.lines.join("\n"),
            blank_after,
        }
    }
}

/// Extent and items of the list starting at `lines[0]`.
///
/// Lines indented to an item's content column continue it, as do lazy
/// paragraph lines and marker lines indented deeper than the item's own
/// marker, which open a nested list. A single blank line continues the list
/// only when more item content or a sibling item follows it; two blank lines
/// end it.
pub(crate) fn scan_list(lines: &[&str]) -> Option<ListScan> {
    let first = list_marker(lines.first()?)?;
    let kind = first.kind;
    let mut items = Vec::new();
    let mut item = OpenItem::new(first);
    let mut i = 1;

    while i < lines.len() {
        let line = lines[i];
        if is_blank(line) {
            let blanks = blank_run(&lines[i..]);
            let Some(next) = lines.get(i + blanks) else {
                break;
            };
            if blanks >= 2 {
                break;
            }
            if count_indent_columns(next) >= item.content_indent {
                item.lines.extend(std::iter::repeat_n(String::new(), blanks));
                item.lazy = false;
                i += blanks;
                continue;
            }
            match list_marker(next) {
                Some(marker) if marker.kind.is_compatible(&kind) && !is_thematic_break(next) => {
                    items.push(std::mem::replace(&mut item, OpenItem::new(marker)).finish(true));
                    i += blanks + 1;
                    continue;
                }
                _ => break,
            }
        }

        if count_indent_columns(line) >= item.content_indent {
            item.push(remove_indent_columns(line, item.content_indent));
            i += 1;
            continue;
        }
        if is_thematic_break(line) {
            break;
        }
        if let Some(marker) = list_marker(line) {
            if marker.indent > item.marker_indent {
                item.push(line.trim_start().to_string());
            } else if marker.kind.is_compatible(&kind) {
                items.push(std::mem::replace(&mut item, OpenItem::new(marker)).finish(false));
            } else {
                break;
            }
            i += 1;
            continue;
        }
        if item.lazy && !interrupts_paragraph(line) {
            item.lines.push(lazy_line(line));
            i += 1;
            continue;
        }
        break;
    }

    items.push(item.finish(false));
    Some(ListScan {
        kind,
        lines: i,
        items,
    })
}
