//! Built-in arithmetic evaluator.
//!
//! Supports `+ - * /` with the usual precedence, parentheses and unary signs
//! over `f64`. Execution records one [`Step`] per binary operation so the
//! calculator can replay the calculation.

use tracing::trace;

use super::evaluation::{EvalError, EvaluationResult, ExpressionEvaluator, ParseError, Step};
use super::expression::{SyntaxToken, TextRange, TokenKind};

/// Deepest nesting of parentheses, unary signs and operations accepted.
/// Parsing and evaluation recurse once per level.
const MAX_DEPTH: usize = 256;

/// The default [`ExpressionEvaluator`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ArithmeticEvaluator;

impl ExpressionEvaluator for ArithmeticEvaluator {
    fn tokenize(&self, text: &str) -> Result<Vec<SyntaxToken>, ParseError> {
        let lexemes = Lexer::new(text).tokenize();
        trace!(text, count = lexemes.len(), "tokenized expression");
        Ok(lexemes.iter().map(Lexeme::to_syntax_token).collect())
    }

    fn execute(&self, text: &str) -> Result<EvaluationResult, EvalError> {
        let lexemes = Lexer::new(text).tokenize();
        let tree = Parser::new(&lexemes, text.len()).parse()?;

        let mut steps = Vec::new();
        let value = tree.evaluate(&mut steps)?;
        trace!(text, value, steps = steps.len(), "executed expression");
        Ok(EvaluationResult { value, steps })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LexemeKind {
    Number,
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Unknown,
}

#[derive(Clone, Copy, Debug)]
struct Lexeme<'a> {
    kind: LexemeKind,
    text: &'a str,
    range: TextRange,
}

impl Lexeme<'_> {
    fn to_syntax_token(&self) -> SyntaxToken {
        let kind = match self.kind {
            LexemeKind::Number => TokenKind::Number,
            LexemeKind::Plus | LexemeKind::Minus | LexemeKind::Star | LexemeKind::Slash => {
                TokenKind::Operator
            }
            LexemeKind::LParen | LexemeKind::RParen => TokenKind::Parenthesis,
            LexemeKind::Unknown => TokenKind::Unknown,
        };
        SyntaxToken {
            kind,
            range: self.range,
        }
    }
}

struct Lexer<'a> {
    source: &'a str,
    index: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self { source, index: 0 }
    }

    fn tokenize(mut self) -> Vec<Lexeme<'a>> {
        let mut lexemes = Vec::new();

        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() {
                self.advance_char();
                continue;
            }

            let start = self.index;
            let kind = match ch {
                '0'..='9' | '.' => self.lex_number(),
                '+' => self.single(LexemeKind::Plus),
                '-' => self.single(LexemeKind::Minus),
                '*' => self.single(LexemeKind::Star),
                '/' => self.single(LexemeKind::Slash),
                '(' => self.single(LexemeKind::LParen),
                ')' => self.single(LexemeKind::RParen),
                _ => self.single(LexemeKind::Unknown),
            };

            lexemes.push(Lexeme {
                kind,
                text: &self.source[start..self.index],
                range: TextRange::new(start, self.index - 1),
            });
        }

        lexemes
    }

    fn single(&mut self, kind: LexemeKind) -> LexemeKind {
        self.advance_char();
        kind
    }

    /// Digits with an optional fraction and an optional exponent. Only one
    /// point is consumed, so `1.2.3` lexes as `1.2` followed by `.3`.
    fn lex_number(&mut self) -> LexemeKind {
        let mut seen_digit = self.eat_digits();

        if self.peek_char() == Some('.') {
            self.advance_char();
            seen_digit |= self.eat_digits();
        }

        if !seen_digit {
            return LexemeKind::Unknown;
        }

        if matches!(self.peek_char(), Some('e' | 'E')) && self.exponent_follows() {
            self.advance_char();
            if matches!(self.peek_char(), Some('+' | '-')) {
                self.advance_char();
            }
            self.eat_digits();
        }

        LexemeKind::Number
    }

    /// Whether the `e` at the cursor starts an exponent such as `e5` or `E+011`.
    fn exponent_follows(&self) -> bool {
        let mut rest = self.source[self.index..].chars().skip(1);
        match rest.next() {
            Some('+' | '-') => rest.next().is_some_and(|ch| ch.is_ascii_digit()),
            Some(ch) => ch.is_ascii_digit(),
            None => false,
        }
    }

    fn eat_digits(&mut self) -> bool {
        let mut any = false;
        while self.peek_char().is_some_and(|ch| ch.is_ascii_digit()) {
            self.advance_char();
            any = true;
        }
        any
    }

    fn peek_char(&self) -> Option<char> {
        self.source[self.index..].chars().next()
    }

    fn advance_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.index += ch.len_utf8();
        Some(ch)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum UnaryOp {
    Plus,
    Neg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug)]
enum NodeKind {
    Number(f64),
    Group(Box<Node>),
    Unary { op: UnaryOp, operand: Box<Node> },
    Binary { op: BinaryOp, lhs: Box<Node>, rhs: Box<Node> },
}

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    range: TextRange,
    /// Levels of the tree below and including this node.
    height: usize,
}

impl Node {
    fn leaf(value: f64, range: TextRange) -> Self {
        Self {
            kind: NodeKind::Number(value),
            range,
            height: 1,
        }
    }

    /// Wrap children into a node, refusing trees too deep to evaluate.
    fn branch(kind: NodeKind, range: TextRange) -> Result<Self, EvalError> {
        let height = match &kind {
            NodeKind::Number(_) => 0,
            NodeKind::Group(inner) => inner.height,
            NodeKind::Unary { operand, .. } => operand.height,
            NodeKind::Binary { lhs, rhs, .. } => lhs.height.max(rhs.height),
        } + 1;
        if height > MAX_DEPTH {
            return Err(ParseError::new("expression nested too deeply", range.start).into());
        }
        Ok(Self {
            kind,
            range,
            height,
        })
    }

    /// Post-order evaluation; every binary node appends its step after both
    /// operands are done.
    fn evaluate(&self, steps: &mut Vec<Step>) -> Result<f64, EvalError> {
        match &self.kind {
            NodeKind::Number(value) => Ok(*value),
            NodeKind::Group(inner) => inner.evaluate(steps),
            NodeKind::Unary { op, operand } => {
                let value = operand.evaluate(steps)?;
                Ok(match op {
                    UnaryOp::Plus => value,
                    UnaryOp::Neg => -value,
                })
            }
            NodeKind::Binary { op, lhs, rhs } => {
                let a = lhs.evaluate(steps)?;
                let b = rhs.evaluate(steps)?;
                let value = match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => {
                        if b == 0.0 {
                            return Err(EvalError::DivideByZero { range: self.range });
                        }
                        a / b
                    }
                };
                if !value.is_finite() {
                    return Err(EvalError::Overflow);
                }
                steps.push(Step {
                    range: self.range,
                    value,
                });
                Ok(value)
            }
        }
    }
}

struct Parser<'a> {
    lexemes: &'a [Lexeme<'a>],
    index: usize,
    /// Length of the source, reported for errors at the end of input.
    end: usize,
    /// Open parentheses and unary signs enclosing the cursor.
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(lexemes: &'a [Lexeme<'a>], end: usize) -> Self {
        Self {
            lexemes,
            index: 0,
            end,
            depth: 0,
        }
    }

    fn enter(&mut self, offset: usize) -> Result<(), EvalError> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError::new("expression nested too deeply", offset).into());
        }
        self.depth += 1;
        Ok(())
    }

    fn parse(mut self) -> Result<Node, EvalError> {
        if self.lexemes.is_empty() {
            return Err(ParseError::new("empty expression", 0).into());
        }

        let node = self.parse_add_sub()?;
        if let Some(lexeme) = self.peek() {
            let message = match lexeme.kind {
                LexemeKind::RParen => "unmatched ')'",
                LexemeKind::Unknown => "unexpected character",
                _ => "expected an operator",
            };
            return Err(ParseError::new(message, lexeme.range.start).into());
        }
        Ok(node)
    }

    fn parse_add_sub(&mut self) -> Result<Node, EvalError> {
        let mut node = self.parse_mul_div()?;

        loop {
            let op = match self.peek_kind() {
                Some(LexemeKind::Plus) => BinaryOp::Add,
                Some(LexemeKind::Minus) => BinaryOp::Sub,
                _ => return Ok(node),
            };
            self.advance();
            let rhs = self.parse_mul_div()?;
            node = binary(op, node, rhs)?;
        }
    }

    fn parse_mul_div(&mut self) -> Result<Node, EvalError> {
        let mut node = self.parse_unary()?;

        loop {
            let op = match self.peek_kind() {
                Some(LexemeKind::Star) => BinaryOp::Mul,
                Some(LexemeKind::Slash) => BinaryOp::Div,
                _ => return Ok(node),
            };
            self.advance();
            let rhs = self.parse_unary()?;
            node = binary(op, node, rhs)?;
        }
    }

    fn parse_unary(&mut self) -> Result<Node, EvalError> {
        let op = match self.peek() {
            Some(lexeme) if lexeme.kind == LexemeKind::Plus => (UnaryOp::Plus, lexeme.range),
            Some(lexeme) if lexeme.kind == LexemeKind::Minus => (UnaryOp::Neg, lexeme.range),
            _ => return self.parse_primary(),
        };
        self.advance();

        self.enter(op.1.start)?;
        let operand = self.parse_unary()?;
        self.depth -= 1;
        let range = op.1.cover(&operand.range);
        Node::branch(
            NodeKind::Unary {
                op: op.0,
                operand: Box::new(operand),
            },
            range,
        )
    }

    fn parse_primary(&mut self) -> Result<Node, EvalError> {
        let Some(lexeme) = self.peek() else {
            return Err(ParseError::new("unexpected end of expression", self.end).into());
        };

        match lexeme.kind {
            LexemeKind::Number => {
                self.advance();
                let value: f64 = lexeme.text.parse().map_err(|_| {
                    ParseError::new(
                        format!("invalid number literal '{}'", lexeme.text),
                        lexeme.range.start,
                    )
                })?;
                if !value.is_finite() {
                    return Err(EvalError::Overflow);
                }
                Ok(Node::leaf(value, lexeme.range))
            }
            LexemeKind::LParen => {
                self.advance();
                if self.peek_kind() == Some(LexemeKind::RParen) {
                    return Err(ParseError::new("empty parentheses", lexeme.range.start).into());
                }
                self.enter(lexeme.range.start)?;
                let inner = self.parse_add_sub()?;
                self.depth -= 1;
                let Some(close) = self.peek().filter(|l| l.kind == LexemeKind::RParen) else {
                    let offset = self.peek().map_or(self.end, |l| l.range.start);
                    return Err(ParseError::new("expected ')'", offset).into());
                };
                self.advance();
                Node::branch(
                    NodeKind::Group(Box::new(inner)),
                    lexeme.range.cover(&close.range),
                )
            }
            LexemeKind::Unknown => {
                Err(ParseError::new("unexpected character", lexeme.range.start).into())
            }
            _ => Err(ParseError::new("expected a number or '('", lexeme.range.start).into()),
        }
    }

    fn peek(&self) -> Option<Lexeme<'a>> {
        self.lexemes.get(self.index).copied()
    }

    fn peek_kind(&self) -> Option<LexemeKind> {
        self.peek().map(|lexeme| lexeme.kind)
    }

    fn advance(&mut self) {
        if self.index < self.lexemes.len() {
            self.index += 1;
        }
    }
}

fn binary(op: BinaryOp, lhs: Node, rhs: Node) -> Result<Node, EvalError> {
    let range = lhs.range.cover(&rhs.range);
    Node::branch(
        NodeKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        range,
    )
}
