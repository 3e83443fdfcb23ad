//! Value types shared by the evaluator, the engine and the screen.
//!
//! A [`ParsedExpression`] is what the calculator screen displays: the raw
//! expression text, the syntax tokens found in it, and an optional range that
//! is highlighted while a calculation step is being replayed.

use serde::Serialize;

/// An inclusive range of byte offsets into an expression text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TextRange {
    /// Offset of the first character.
    pub start: usize,
    /// Offset of the last character (inclusive).
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "inverted text range {start}..={end}");
        Self { start, end }
    }

    /// Check if `other` lies completely inside this range.
    pub fn contains(&self, other: &TextRange) -> bool {
        self.start <= other.start && self.end >= other.end
    }

    /// Smallest range covering both `self` and `other`.
    pub fn cover(&self, other: &TextRange) -> TextRange {
        TextRange::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// Lexical category of a syntax token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Number,
    Operator,
    Parenthesis,
    /// Anything the tokenizer does not recognize. Kept so the screen can still
    /// show it (greyed out).
    Unknown,
}

/// A lexical unit together with its position in the expression text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SyntaxToken {
    pub kind: TokenKind,
    pub range: TextRange,
}

impl SyntaxToken {
    pub fn new(kind: TokenKind, start: usize, end: usize) -> Self {
        Self {
            kind,
            range: TextRange::new(start, end),
        }
    }
}

/// An expression prepared for display.
///
/// Incomplete expressions are fine here: the screen highlights tokens while the
/// user is still typing.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParsedExpression {
    /// The expression in plain text.
    pub text: String,
    /// Tokens found in `text`, in order.
    pub tokens: Vec<SyntaxToken>,
    /// Sub-expression currently highlighted, if any.
    pub highlighted_range: Option<TextRange>,
    /// Whether this snapshot is part of a running step replay.
    pub is_replaying: bool,
}

impl ParsedExpression {
    pub fn new(text: impl Into<String>, tokens: Vec<SyntaxToken>) -> Self {
        Self {
            text: text.into(),
            tokens,
            highlighted_range: None,
            is_replaying: false,
        }
    }

    /// Builder-style setter for the highlighted range.
    pub fn with_highlight(mut self, range: Option<TextRange>) -> Self {
        self.highlighted_range = range;
        self
    }

    /// Builder-style setter for the replay flag.
    pub fn replaying(mut self, is_replaying: bool) -> Self {
        self.is_replaying = is_replaying;
        self
    }

    /// Text covered by `token`.
    pub fn token_text(&self, token: &SyntaxToken) -> &str {
        self.text
            .get(token.range.start..=token.range.end)
            .unwrap_or_default()
    }

    /// Text of the last token, if there is one.
    pub fn last_token_text(&self) -> Option<&str> {
        self.tokens.last().map(|token| self.token_text(token))
    }

    pub fn last_token_is_number(&self) -> bool {
        self.tokens
            .last()
            .is_some_and(|token| token.kind == TokenKind::Number)
    }

    /// Numeric value of the last token, if it is a number.
    pub fn parse_last_number(&self) -> Option<f64> {
        if !self.last_token_is_number() {
            return None;
        }
        self.last_token_text()?.parse().ok()
    }

    /// Whether `token` falls inside the highlighted range.
    pub fn is_highlighted(&self, token: &SyntaxToken) -> bool {
        self.highlighted_range
            .is_some_and(|range| range.contains(&token.range))
    }
}
