//! Grammar tables shared by the lexer and the parser.
//!
//! Line-shaped constructs are compiled patterns; constructs that need
//! balanced or run-length matching (fences, emphasis runs, code spans,
//! link brackets) are small byte scanners. Everything here is stateless.

use crate::ast::Alignment;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static ATX_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ {0,3}(#{1,6})(?:[ \t]+|$)(.*?)(#*)[ \t]*$").expect("heading pattern")
});

static THEMATIC_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ {0,3}(?:(?:\*[ \t]*){3,}|(?:-[ \t]*){3,}|(?:_[ \t]*){3,})$")
        .expect("thematic break pattern")
});

static SETEXT_UNDERLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}(=+|-+)[ \t]*$").expect("setext pattern"));

static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^( {0,3})(?:([*+-])|([0-9]{1,9})([.)]))(?:[ \t]|$)").expect("list marker pattern")
});

static TABLE_DELIMITER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ {0,3}\|?[ \t]*:?-+:?[ \t]*(?:\|[ \t]*:?-+:?[ \t]*)*\|?[ \t]*$")
        .expect("table delimiter pattern")
});

static BARE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[A-Za-z][A-Za-z0-9+.-]{1,31}://[^\s<>]*[^\s<>.,:;"'!?)\]]"#)
        .expect("bare url pattern")
});

static URI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]{1,31}:[^\s<>]*$").expect("uri pattern"));

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$",
    )
    .expect("email pattern")
});

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(?:<[A-Za-z][A-Za-z0-9-]*(?:\s+[A-Za-z_:][A-Za-z0-9_.:-]*(?:\s*=\s*(?:[^\s"'=<>`]+|'[^']*'|"[^"]*"))?)*\s*/?>|</[A-Za-z][A-Za-z0-9-]*\s*>|(?s:<!--.*?-->))"#,
    )
    .expect("html tag pattern")
});

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^&(?:#[0-9]{1,7}|#[xX][0-9A-Fa-f]{1,6}|[A-Za-z][A-Za-z0-9]{1,31});")
        .expect("entity pattern")
});

const RAW_TEXT_TAGS: [&str; 4] = ["pre", "script", "style", "textarea"];

const BLOCK_TAGS: [&str; 62] = [
    "address", "article", "aside", "base", "basefont", "blockquote", "body", "caption", "center",
    "col", "colgroup", "dd", "details", "dialog", "dir", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "frame", "frameset", "h1", "h2", "h3", "h4", "h5",
    "h6", "head", "header", "hr", "html", "iframe", "legend", "li", "link", "main", "menu",
    "menuitem", "nav", "noframes", "ol", "optgroup", "option", "p", "param", "search", "section",
    "summary", "table", "tbody", "td", "tfoot", "th", "thead", "title", "tr", "track", "ul",
];

pub(crate) fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

pub(crate) fn leading_spaces(line: &str) -> usize {
    line.bytes().take_while(|&b| b == b' ').count()
}

/// Columns of indentation; a tab advances to the next multiple of 4.
pub(crate) fn count_indent_columns(line: &str) -> usize {
    let mut col = 0;
    for ch in line.chars() {
        match ch {
            ' ' => col += 1,
            '\t' => col = (col / 4 + 1) * 4,
            _ => break,
        }
    }
    col
}

/// Remove up to `columns` of indentation. A tab straddling the limit leaves
/// its remaining width behind as spaces.
pub(crate) fn remove_indent_columns(line: &str, columns: usize) -> String {
    let mut col = 0;
    let mut rest = line;
    let mut result = String::new();
    while col < columns {
        if let Some(after) = rest.strip_prefix(' ') {
            col += 1;
            rest = after;
        } else if let Some(after) = rest.strip_prefix('\t') {
            let next_stop = (col / 4 + 1) * 4;
            if next_stop > columns {
                result.push_str(&" ".repeat(next_stop - columns));
            }
            col = next_stop;
            rest = after;
        } else {
            break;
        }
    }
    result.push_str(rest);
    result
}

pub(crate) fn expand_tabs(text: &str, start_col: usize) -> String {
    let mut result = String::with_capacity(text.len());
    let mut col = start_col;
    for ch in text.chars() {
        if ch == '\t' {
            let next_stop = (col / 4 + 1) * 4;
            result.push_str(&" ".repeat(next_stop - col));
            col = next_stop;
        } else {
            result.push(ch);
            col += 1;
        }
    }
    result
}

pub(crate) fn is_thematic_break(line: &str) -> bool {
    THEMATIC_BREAK.is_match(line)
}

/// Level and text of an ATX heading line, trailing `#` run removed.
pub(crate) fn atx_heading(line: &str) -> Option<(u8, &str)> {
    let caps = ATX_HEADING.captures(line)?;
    let level = caps.get(1)?.as_str().len() as u8;
    let text = caps.get(2)?;
    // `\#` is an escaped hash, not a closing run
    let end = if text.as_str().ends_with('\\') {
        caps.get(3)?.end()
    } else {
        text.end()
    };
    Some((level, line[text.start()..end].trim()))
}

pub(crate) fn setext_underline(line: &str) -> Option<u8> {
    let caps = SETEXT_UNDERLINE.captures(line)?;
    if caps.get(1)?.as_str().starts_with('=') {
        Some(1)
    } else {
        Some(2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ListType {
    Unordered(char),
    Ordered(u32, char),
}

impl ListType {
    /// Same bullet character, or same ordered delimiter.
    pub(crate) fn is_compatible(&self, other: &ListType) -> bool {
        match (self, other) {
            (ListType::Unordered(a), ListType::Unordered(b)) => a == b,
            (ListType::Ordered(_, a), ListType::Ordered(_, b)) => a == b,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ListMarker {
    pub kind: ListType,
    /// Column of the marker itself.
    pub indent: usize,
    /// Column where item content starts; continuation lines need this much.
    pub content_indent: usize,
    /// First-line content after the marker and its spacing.
    pub content: String,
}

pub(crate) fn list_marker(line: &str) -> Option<ListMarker> {
    let caps = LIST_MARKER.captures(line)?;
    let indent = caps.get(1)?.as_str().len();
    let (kind, marker_end) = match caps.get(2) {
        Some(bullet) => (ListType::Unordered(bullet.as_str().chars().next()?), bullet.end()),
        None => {
            let number = caps.get(3)?;
            let delimiter = caps.get(4)?;
            let start = number.as_str().parse().ok()?;
            (ListType::Ordered(start, delimiter.as_str().chars().next()?), delimiter.end())
        }
    };

    // Everything up to the marker end is ASCII, so bytes are columns here
    let rest = expand_tabs(&line[marker_end..], marker_end);
    let spacing = rest.len() - rest.trim_start_matches(' ').len();
    let (content_indent, content) = if rest.trim().is_empty() {
        (marker_end + 1, String::new())
    } else if spacing > 4 {
        // Five or more spaces: one belongs to the marker, the rest is indented code
        (marker_end + 1, rest[1..].to_string())
    } else {
        (marker_end + spacing, rest[spacing..].to_string())
    };

    Some(ListMarker {
        kind,
        indent,
        content_indent,
        content,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Fence {
    pub ch: char,
    pub len: usize,
    pub indent: usize,
}

pub(crate) fn fence_open(line: &str) -> Option<Fence> {
    let indent = leading_spaces(line);
    if indent >= 4 {
        return None;
    }
    let body = &line[indent..];
    let ch = body.chars().next().filter(|&c| c == '`' || c == '~')?;
    let len = body.chars().take_while(|&c| c == ch).count();
    if len < 3 {
        return None;
    }
    // A backtick info string cannot hold backticks, or ``` ``` would be a fence
    if ch == '`' && body[len..].contains('`') {
        return None;
    }
    Some(Fence { ch, len, indent })
}

/// Language tag of an opening fence line: the first word of its info string.
pub(crate) fn fence_language(line: &str, fence: &Fence) -> String {
    let info = line.trim_start().get(fence.len..).unwrap_or("");
    info.split_whitespace()
        .next()
        .map(unescape)
        .unwrap_or_default()
}

/// Whether `line` closes `fence`. Yields the text preceding the fence, which is
/// empty for a fence on its own line and non-empty when the fence trails the
/// last line of code.
pub(crate) fn closing_fence<'l>(line: &'l str, fence: &Fence) -> Option<&'l str> {
    let trimmed = line.trim_end();
    if leading_spaces(line) < 4 {
        let body = trimmed.trim_start_matches(' ');
        let run = body.chars().take_while(|&c| c == fence.ch).count();
        if run >= 3 && run == body.len() {
            return Some("");
        }
    }
    let run = trimmed.chars().rev().take_while(|&c| c == fence.ch).count();
    let before = &trimmed[..trimmed.len() - run];
    if run >= 3 && !before.trim().is_empty() {
        return Some(before);
    }
    None
}

pub(crate) fn is_blockquote_start(line: &str) -> bool {
    let indent = leading_spaces(line);
    indent < 4 && line[indent..].starts_with('>')
}

/// Strip the `>` marker and at most one following column of space.
pub(crate) fn strip_blockquote_marker(line: &str) -> String {
    let indent = leading_spaces(line);
    let Some(after_marker) = line[indent..].strip_prefix('>') else {
        return line.to_string();
    };
    if let Some(rest) = after_marker.strip_prefix(' ') {
        return rest.to_string();
    }
    let expanded = expand_tabs(after_marker, indent + 1);
    match expanded.strip_prefix(' ') {
        Some(rest) => rest.to_string(),
        None => expanded,
    }
}

fn tag_name_at(text: &str) -> (&str, &str) {
    let end = text
        .find(|c: char| !c.is_ascii_alphanumeric() && c != '-')
        .unwrap_or(text.len());
    (&text[..end], &text[end..])
}

/// HTML block start condition (1 to 7) of a line.
pub(crate) fn html_block_start(line: &str) -> Option<u8> {
    if leading_spaces(line) > 3 {
        return None;
    }
    let trimmed = line.trim();
    let after_open = trimmed.strip_prefix('<')?;

    let (name, after_name) = tag_name_at(after_open);
    let name_ends = |rest: &str| {
        rest.is_empty() || rest.starts_with(['>', ' ', '\t']) || rest.starts_with("/>")
    };
    if RAW_TEXT_TAGS.iter().any(|tag| tag.eq_ignore_ascii_case(name))
        && name_ends(after_name)
        && !after_name.starts_with("/>")
    {
        return Some(1);
    }
    if after_open.starts_with("!--") {
        return Some(2);
    }
    if after_open.starts_with('?') {
        return Some(3);
    }
    if after_open.starts_with("![CDATA[") {
        return Some(5);
    }
    if after_open
        .strip_prefix('!')
        .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_uppercase()))
    {
        return Some(4);
    }

    let (closing_name, after_closing) = match after_open.strip_prefix('/') {
        Some(rest) => tag_name_at(rest),
        None => (name, after_name),
    };
    if BLOCK_TAGS.iter().any(|tag| tag.eq_ignore_ascii_case(closing_name))
        && name_ends(after_closing)
    {
        return Some(6);
    }

    // A lone complete tag that is not one of the raw text tags
    if HTML_TAG.find(trimmed).is_some_and(|m| m.end() == trimmed.len())
        && !trimmed.starts_with("<!--")
        && !RAW_TEXT_TAGS.iter().any(|tag| tag.eq_ignore_ascii_case(closing_name))
    {
        return Some(7);
    }
    None
}

/// End condition of HTML block kinds 1 to 5. Kinds 6 and 7 end at a blank line.
pub(crate) fn html_block_ends(line: &str, kind: u8) -> bool {
    match kind {
        1 => {
            let lower = line.to_ascii_lowercase();
            RAW_TEXT_TAGS
                .iter()
                .any(|tag| lower.contains(&format!("</{tag}>")))
        }
        2 => line.contains("-->"),
        3 => line.contains("?>"),
        4 => line.contains('>'),
        5 => line.contains("]]>"),
        _ => false,
    }
}

/// Drop the backslash in front of escaped ASCII punctuation.
pub(crate) fn unescape(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\'
            && let Some(&next) = chars.peek()
            && next.is_ascii_punctuation()
        {
            result.push(next);
            chars.next();
        } else {
            result.push(ch);
        }
    }
    result
}

fn run_length(bytes: &[u8], start: usize, delimiter: u8) -> usize {
    bytes
        .get(start..)
        .map_or(0, |rest| rest.iter().take_while(|&&b| b == delimiter).count())
}

fn opens_at(bytes: &[u8], at: usize) -> bool {
    bytes.get(at).is_some_and(|b| !b.is_ascii_whitespace())
}

/// Outcome of looking for the end of a delimited span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scan {
    /// The span ends at this byte offset.
    Closed(usize),
    /// The opening run cannot start a span here.
    Rejected,
    /// The text ran out before a closing run.
    Unclosed,
}

impl Scan {
    pub(crate) fn end(self) -> Option<usize> {
        match self {
            Scan::Closed(end) => Some(end),
            Scan::Rejected | Scan::Unclosed => None,
        }
    }
}

/// Skip a code span or the backtick run at `at`.
fn skip_backticks(text: &str, at: usize) -> usize {
    code_span(text, at)
        .end()
        .unwrap_or_else(|| at + run_length(text.as_bytes(), at, b'`'))
}

/// End of a code span opening at `start` with one or two backticks, closed by
/// a run of the same length.
pub(crate) fn code_span(text: &str, start: usize) -> Scan {
    let bytes = text.as_bytes();
    let open = run_length(bytes, start, b'`');
    if open == 0 || open > 2 {
        return Scan::Rejected;
    }
    let mut j = start + open;
    while j < bytes.len() {
        if bytes[j] == b'`' {
            let run = run_length(bytes, j, b'`');
            if run == open {
                return Scan::Closed(j + run);
            }
            j += run;
        } else {
            j += 1;
        }
    }
    Scan::Unclosed
}

/// End of a span opened by a doubled delimiter (strong, strike).
///
/// The first later run of two or more not preceded by whitespace closes it
/// with two characters and the rest of that run stays text. For `*` and `_`
/// the closer takes a third character when the opener was tripled or when a
/// lone delimiter inside the span is still open, so `___foo___` and
/// `__foo _bar___` close at the end of the run.
pub(crate) fn double_span(text: &str, start: usize, delimiter: u8) -> Scan {
    let bytes = text.as_bytes();
    let opener = run_length(bytes, start, delimiter);
    if opener < 2 || !opens_at(bytes, start + 2) {
        return Scan::Rejected;
    }
    let nests = delimiter != b'~';
    let mut single_open = false;
    let mut j = start + opener;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b'`' => j = skip_backticks(text, j),
            b if b == delimiter => {
                let run = run_length(bytes, j, delimiter);
                let after_text = !bytes[j - 1].is_ascii_whitespace();
                if run >= 2 && after_text {
                    let width = match run {
                        3.. if nests && opener >= 3 => run.min(opener),
                        3.. if nests && single_open => 3,
                        _ => 2,
                    };
                    return Scan::Closed(j + width);
                }
                if run == 1 && nests {
                    single_open = if single_open {
                        !after_text
                    } else {
                        opens_at(bytes, j + 1) && !intraword(bytes, j, delimiter)
                    };
                }
                j += run;
            }
            _ => j += 1,
        }
    }
    Scan::Unclosed
}

/// End of an italic span opened by a single delimiter.
///
/// A doubled run that opens inside is a nested strong span: the next closing
/// run ends it, or ends both spans when it is three long. Any other run not
/// preceded by whitespace closes the span with its first character and the
/// rest of the run stays text.
pub(crate) fn single_span(text: &str, start: usize, delimiter: u8) -> Scan {
    let bytes = text.as_bytes();
    let content_start = start + 1;
    if !opens_at(bytes, content_start) || intraword(bytes, start, delimiter) {
        return Scan::Rejected;
    }
    let mut strong_open = false;
    let mut j = content_start;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b'`' => j = skip_backticks(text, j),
            b if b == delimiter => {
                let run = run_length(bytes, j, delimiter);
                if j > content_start && !bytes[j - 1].is_ascii_whitespace() {
                    match run {
                        2 if strong_open => strong_open = false,
                        3.. if strong_open => return Scan::Closed(j + 3),
                        _ => return Scan::Closed(j + 1),
                    }
                } else if run >= 2 && opens_at(bytes, j + run) {
                    strong_open = true;
                }
                j += run;
            }
            _ => j += 1,
        }
    }
    Scan::Unclosed
}

/// An underscore between letters or digits, as in snake_case_words.
fn intraword(bytes: &[u8], at: usize, delimiter: u8) -> bool {
    delimiter == b'_' && at > 0 && bytes[at - 1].is_ascii_alphanumeric()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LinkTarget<'a> {
    Inline {
        destination: &'a str,
        title: Option<&'a str>,
    },
    /// `[text][label]`
    Full(&'a str),
    /// `[text][]`
    Collapsed,
    /// `[text]`
    Shortcut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LinkSpan<'a> {
    pub end: usize,
    pub text: &'a str,
    pub target: LinkTarget<'a>,
}

fn matching_bracket(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut j = open;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => {
                j += 2;
                continue;
            }
            b'`' => {
                if let Scan::Closed(end) = code_span(text, j) {
                    j = end;
                    continue;
                }
            }
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(j);
                }
            }
            _ => {}
        }
        j += 1;
    }
    None
}

/// Closing bracket of every balanced `[` in `text`, keyed by the offset of the
/// `[`. Escapes and code spans are skipped as in [`link_span`].
pub(crate) fn bracket_pairs(text: &str) -> HashMap<usize, usize> {
    let bytes = text.as_bytes();
    let mut pairs = HashMap::new();
    let mut open = Vec::new();
    let mut j = 0;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => {
                j += 2;
                continue;
            }
            b'`' => {
                j = skip_backticks(text, j);
                continue;
            }
            b'[' => open.push(j),
            b']' => {
                if let Some(start) = open.pop() {
                    pairs.insert(start, j);
                }
            }
            _ => {}
        }
        j += 1;
    }
    pairs
}

fn skip_whitespace(bytes: &[u8], mut at: usize) -> usize {
    while bytes.get(at).is_some_and(|b| b.is_ascii_whitespace()) {
        at += 1;
    }
    at
}

/// Nesting limit for unescaped parentheses inside a link destination.
const MAX_DESTINATION_PARENS: usize = 32;

/// `(destination "title")` following a link's closing bracket.
fn inline_target(text: &str, open: usize) -> Option<(usize, &str, Option<&str>)> {
    let bytes = text.as_bytes();
    let mut j = skip_whitespace(bytes, open + 1);

    let destination = if bytes.get(j) == Some(&b'<') {
        let close = j + 1 + text[j + 1..].find(['>', '<', '\n'])?;
        if bytes[close] != b'>' {
            return None;
        }
        let destination = &text[j + 1..close];
        j = close + 1;
        destination
    } else {
        let start = j;
        let mut depth = 0usize;
        while j < bytes.len() {
            match bytes[j] {
                b'\\' if j + 1 < bytes.len() => j += 2,
                b' ' | b'\t' | b'\n' => break,
                b'(' => {
                    depth += 1;
                    if depth > MAX_DESTINATION_PARENS {
                        return None;
                    }
                    j += 1;
                }
                b')' => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                    j += 1;
                }
                _ => j += 1,
            }
        }
        &text[start..j]
    };

    let before_title = j;
    j = skip_whitespace(bytes, j);
    let mut title = None;
    if j > before_title
        && let Some(&quote) = bytes.get(j)
        && matches!(quote, b'"' | b'\'' | b'(')
    {
        let closer = if quote == b'(' { b')' } else { quote };
        let mut k = j + 1;
        while k < bytes.len() && bytes[k] != closer {
            if bytes[k] == b'\\' {
                k += 1;
            }
            k += 1;
        }
        if k >= bytes.len() {
            return None;
        }
        title = Some(&text[j + 1..k]);
        j = skip_whitespace(bytes, k + 1);
    }

    (bytes.get(j) == Some(&b')')).then_some((j + 1, destination, title))
}

/// Link syntax starting at the `[` at `start`.
pub(crate) fn link_span(text: &str, start: usize) -> Option<LinkSpan<'_>> {
    if text.as_bytes().get(start) != Some(&b'[') {
        return None;
    }
    link_span_closed_at(text, start, matching_bracket(text, start)?)
}

/// Link syntax whose text runs from the `[` at `start` to the `]` at `close`.
pub(crate) fn link_span_closed_at(text: &str, start: usize, close: usize) -> Option<LinkSpan<'_>> {
    let bytes = text.as_bytes();
    let label = &text[start + 1..close];
    let after = close + 1;

    if bytes.get(after) == Some(&b'(')
        && let Some((end, destination, title)) = inline_target(text, after)
    {
        return Some(LinkSpan {
            end,
            text: label,
            target: LinkTarget::Inline { destination, title },
        });
    }

    if label.trim().is_empty() {
        return None;
    }

    if bytes.get(after) == Some(&b'[')
        && let Some(offset) = text[after + 1..].find([']', '['])
        && bytes[after + 1 + offset] == b']'
    {
        let reference = &text[after + 1..after + 1 + offset];
        let target = if reference.trim().is_empty() {
            LinkTarget::Collapsed
        } else {
            LinkTarget::Full(reference)
        };
        return Some(LinkSpan {
            end: after + 2 + offset,
            text: label,
            target,
        });
    }

    Some(LinkSpan {
        end: after,
        text: label,
        target: LinkTarget::Shortcut,
    })
}

/// End of a `<scheme:...>` or `<user@host>` autolink at the start of `text`.
pub(crate) fn angle_autolink(text: &str) -> Option<usize> {
    let inner_end = 1 + text.strip_prefix('<')?.find('>')?;
    let inner = &text[1..inner_end];
    (URI.is_match(inner) || EMAIL.is_match(inner)).then_some(inner_end + 1)
}

pub(crate) fn is_email(text: &str) -> bool {
    EMAIL.is_match(text)
}

/// End of a bare `scheme://...` URL at the start of `text`.
pub(crate) fn bare_url(text: &str) -> Option<usize> {
    BARE_URL.find(text).map(|m| m.end())
}

/// End of an inline HTML tag or comment at the start of `text`.
pub(crate) fn inline_html(text: &str) -> Option<usize> {
    HTML_TAG.find(text).map(|m| m.end())
}

/// Length of a character reference such as `&copy;` at the start of `text`.
pub(crate) fn entity(text: &str) -> Option<usize> {
    ENTITY.find(text).map(|m| m.end())
}

/// Cells of a table row, outer pipes removed. Escaped pipes stay in the cell.
pub(crate) fn split_table_row(line: &str) -> Vec<&str> {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let trimmed = match trimmed.strip_suffix('|') {
        Some(inner) if !inner.ends_with('\\') => inner,
        _ => trimmed,
    };

    let bytes = trimmed.as_bytes();
    let mut cells = Vec::new();
    let mut start = 0;
    let mut j = 0;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 1,
            b'|' => {
                cells.push(trimmed[start..j].trim());
                start = j + 1;
            }
            _ => {}
        }
        j += 1;
    }
    cells.push(trimmed[start.min(trimmed.len())..].trim());
    cells
}

pub(crate) fn is_table_delimiter(line: &str) -> bool {
    TABLE_DELIMITER.is_match(line)
}

pub(crate) fn table_alignment(cell: &str) -> Alignment {
    match (cell.starts_with(':'), cell.ends_with(':')) {
        (true, true) => Alignment::Center,
        (true, false) => Alignment::Left,
        (false, true) => Alignment::Right,
        (false, false) => Alignment::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atx_heading_strips_closing_sequence() {
        assert_eq!(atx_heading("## foo ##"), Some((2, "foo")));
        assert_eq!(atx_heading("### foo ### b"), Some((3, "foo ### b")));
        assert_eq!(atx_heading("# foo#"), Some((1, "foo")));
        assert_eq!(atx_heading("## foo ###   "), Some((2, "foo")));
        assert_eq!(atx_heading(r"### foo \###"), Some((3, r"foo \###")));
        assert_eq!(atx_heading("# #"), Some((1, "")));
        assert_eq!(atx_heading("#"), Some((1, "")));
        assert_eq!(atx_heading("#5 bolt"), None);
        assert_eq!(atx_heading("####### foo"), None);
        assert_eq!(atx_heading("    # foo"), None);
    }

    #[test]
    fn test_thematic_breaks() {
        assert!(is_thematic_break("***"));
        assert!(is_thematic_break(" - - -"));
        assert!(is_thematic_break("_____________________________________"));
        assert!(!is_thematic_break("+++"));
        assert!(!is_thematic_break("--"));
        assert!(!is_thematic_break("*-*"));
        assert!(!is_thematic_break("    ***"));
    }

    #[test]
    fn test_list_marker_content_indent() {
        let marker = list_marker("1.  foo").unwrap();
        assert_eq!(marker.kind, ListType::Ordered(1, '.'));
        assert_eq!(marker.content_indent, 4);
        assert_eq!(marker.content, "foo");

        let marker = list_marker("  - bar").unwrap();
        assert_eq!(marker.indent, 2);
        assert_eq!(marker.content_indent, 4);

        let empty = list_marker("-").unwrap();
        assert_eq!(empty.content_indent, 2);
        assert!(empty.content.is_empty());

        let code = list_marker("-      code").unwrap();
        assert_eq!(code.content_indent, 2);
        assert_eq!(code.content, "     code");

        assert!(list_marker("-one").is_none());
        assert!(list_marker("1234567890. not ok").is_none());
    }

    #[test]
    fn test_fences() {
        let fence = fence_open("```js").unwrap();
        assert_eq!((fence.ch, fence.len, fence.indent), ('`', 3, 0));
        assert_eq!(fence_language("```js extra", &fence), "js");
        assert!(fence_open("``").is_none());
        assert!(fence_open("``` ``` ").is_none());

        let tilde = fence_open("~~~").unwrap();
        assert_eq!(closing_fence("~~~", &tilde), Some(""));
        assert_eq!(closing_fence("  ~~~~~  ", &tilde), Some(""));
        assert_eq!(closing_fence("```", &tilde), None);
        assert_eq!(closing_fence("var b;~~~", &tilde), Some("var b;"));
        assert_eq!(closing_fence("~~~ aaa", &tilde), None);
    }

    #[test]
    fn test_indentation_helpers() {
        assert_eq!(count_indent_columns("\tfoo"), 4);
        assert_eq!(count_indent_columns("  \tfoo"), 4);
        assert_eq!(remove_indent_columns("\tfoo", 4), "foo");
        assert_eq!(remove_indent_columns("      foo", 4), "  foo");
        assert_eq!(remove_indent_columns(" \tfoo", 2), "  foo");
        assert_eq!(strip_blockquote_marker("> foo"), "foo");
        assert_eq!(strip_blockquote_marker(">foo"), "foo");
        assert_eq!(strip_blockquote_marker("   >  bar"), " bar");
    }

    #[test]
    fn test_html_block_starts() {
        assert_eq!(html_block_start("<pre language=\"haskell\"><code>"), Some(1));
        assert_eq!(html_block_start("<style"), Some(1));
        assert_eq!(html_block_start("<!-- comment"), Some(2));
        assert_eq!(html_block_start("<?php"), Some(3));
        assert_eq!(html_block_start("<!DOCTYPE html>"), Some(4));
        assert_eq!(html_block_start("<div>"), Some(6));
        assert_eq!(html_block_start("</table>"), Some(6));
        assert_eq!(html_block_start("<Warning>"), Some(7));
        assert_eq!(html_block_start("<a href=\"bar\">"), Some(7));
        assert_eq!(html_block_start("<del>*foo*</del>"), None);
        assert_eq!(html_block_start("<http://foo.com>"), None);
        assert_eq!(html_block_start("<a title=\"a lot"), None);
        assert!(html_block_ends("</pre>", 1));
        assert!(!html_block_ends("<pre>", 1));
    }

    #[test]
    fn test_unescape_only_punctuation() {
        assert_eq!(unescape(r"\*foo\*"), "*foo*");
        assert_eq!(unescape(r"\a\\"), r"\a\");
        assert_eq!(unescape("foo\\\nbar"), "foo\\\nbar");
    }

    #[test]
    fn test_emphasis_spans() {
        assert_eq!(double_span("**bar** foo", 0, b'*'), Scan::Closed(7));
        assert_eq!(double_span("***foo***", 0, b'*'), Scan::Closed(9));
        assert_eq!(double_span("** foo**", 0, b'*'), Scan::Rejected);
        assert_eq!(double_span("**foo", 0, b'*'), Scan::Unclosed);
        assert_eq!(double_span("~~baz~~ x", 0, b'~'), Scan::Closed(7));
        assert_eq!(single_span("_bar_baz", 0, b'_'), Scan::Closed(5));
        assert_eq!(single_span("*foo **bar***", 0, b'*'), Scan::Closed(13));
        assert_eq!(single_span("snake_case_", 5, b'_'), Scan::Rejected);
        assert_eq!(single_span(r"*foo\**", 0, b'*'), Scan::Closed(7));
        assert_eq!(single_span("*a *b", 0, b'*'), Scan::Unclosed);
    }

    #[test]
    fn test_closing_run_longer_than_opener() {
        // The closer takes the opener's width and the rest stays text
        assert_eq!(single_span("*foo**", 0, b'*'), Scan::Closed(5));
        assert_eq!(single_span("_foo__", 0, b'_'), Scan::Closed(5));
        assert_eq!(double_span("**foo***", 0, b'*'), Scan::Closed(7));
        assert_eq!(double_span("~~foo~~~", 0, b'~'), Scan::Closed(7));
        // unless an inner single delimiter is still open
        assert_eq!(double_span("__foo _bar___", 0, b'_'), Scan::Closed(13));
        assert_eq!(double_span("****foo****", 0, b'*'), Scan::Closed(11));
    }

    #[test]
    fn test_code_spans() {
        assert_eq!(code_span("`hi`lo`", 0), Scan::Closed(4));
        assert_eq!(code_span("``foo`bar``", 0), Scan::Closed(11));
        assert_eq!(code_span("`one", 0), Scan::Unclosed);
        assert_eq!(code_span("```x```", 0), Scan::Rejected);
    }

    #[test]
    fn test_bracket_pairs() {
        let pairs = bracket_pairs(r"[a [b] \[ `]` c] [d");
        assert_eq!(pairs.get(&0), Some(&15));
        assert_eq!(pairs.get(&3), Some(&5));
        assert_eq!(pairs.get(&17), None);
        assert_eq!(pairs.len(), 2);
        assert_eq!(link_span_closed_at("[a](b)", 0, 2).map(|span| span.end), Some(6));
    }

    #[test]
    fn test_link_spans() {
        let span = link_span(r#"[text](link "title") x"#, 0).unwrap();
        assert_eq!(span.end, 20);
        assert_eq!(span.text, "text");
        assert_eq!(
            span.target,
            LinkTarget::Inline {
                destination: "link",
                title: Some("title")
            }
        );

        let empty = link_span("[name]()", 0).unwrap();
        assert_eq!(
            empty.target,
            LinkTarget::Inline {
                destination: "",
                title: None
            }
        );

        assert_eq!(link_span("[a][b]", 0).unwrap().target, LinkTarget::Full("b"));
        assert_eq!(link_span("[a][]", 0).unwrap().target, LinkTarget::Collapsed);
        assert_eq!(link_span("[a] b", 0).unwrap().target, LinkTarget::Shortcut);
        assert_eq!(link_span("[a [b] c]", 0).unwrap().end, 9);
        assert!(link_span("[not really", 0).is_none());
        assert!(link_span("[]", 0).is_none());
    }

    #[test]
    fn test_destination_paren_nesting_is_bounded() {
        let nested = format!("[a]({}b{})", "(".repeat(32), ")".repeat(32));
        assert_eq!(link_span(&nested, 0).map(|span| span.end), Some(nested.len()));
        let deeper = format!("[a]({}b{})", "(".repeat(33), ")".repeat(33));
        assert_eq!(link_span(&deeper, 0).map(|span| span.target), Some(LinkTarget::Shortcut));
    }

    #[test]
    fn test_autolinks_and_tags() {
        assert_eq!(angle_autolink("<http://foo.com> x"), Some(16));
        assert_eq!(angle_autolink("<foo@bar.example.com>"), Some(21));
        assert_eq!(angle_autolink("<not really"), None);
        assert_eq!(angle_autolink("<not really>"), None);
        assert_eq!(bare_url("http://yeah.com."), Some(15));
        assert_eq!(bare_url("http://localhost:3000"), Some(21));
        assert_eq!(inline_html("<del>*foo*"), Some(5));
        assert_eq!(inline_html("</del>"), Some(6));
        assert_eq!(inline_html("<!-- c -->x"), Some(10));
        assert_eq!(entity("&copy; x"), Some(6));
        assert_eq!(entity("& x"), None);
    }

    #[test]
    fn test_table_rows() {
        assert_eq!(split_table_row("| a | b |"), vec!["a", "b"]);
        assert_eq!(split_table_row("a|b"), vec!["a", "b"]);
        assert_eq!(split_table_row(r"| a \| b |"), vec![r"a \| b"]);
        assert!(is_table_delimiter("|:---|---:|"));
        assert!(is_table_delimiter("--- | :-:"));
        assert!(!is_table_delimiter("| a | b |"));
        assert_eq!(table_alignment(":-:"), Alignment::Center);
        assert_eq!(table_alignment("--:"), Alignment::Right);
    }
}
