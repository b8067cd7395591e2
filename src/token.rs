/// Tokens emitted by the lexer
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    // Block tokens, each spanning whole lines
    Newline,
    Html,
    Text,
    Heading,
    SetextHeading,
    BlockQuote,
    List,
    IndentedCode,
    FencedCode,
    HorizontalRule,
    Table,
    Definition,
    // Inline tokens
    LineBreak,
    Link,
    Image,
    Strong,
    Italic,
    Strike,
    InlineCode,
}

/// A slice of the lexer input tagged with its kind. `pos` is the byte
/// offset of `raw` within that input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub pos: usize,
    pub raw: &'a str,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind, pos: usize, raw: &'a str) -> Self {
        Token { kind, pos, raw }
    }

    pub fn end(&self) -> usize {
        self.pos + self.raw.len()
    }
}
