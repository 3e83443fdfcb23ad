//! The expression evaluation service used by the calculator engine.
//!
//! The engine only talks to [`ExpressionEvaluator`]; it never depends on how
//! expressions are lexed or executed. [`ArithmeticEvaluator`](super::ArithmeticEvaluator)
//! is the implementation shipped with this crate.

use serde::Serialize;
use thiserror::Error;

use super::expression::{SyntaxToken, TextRange};

/// A syntax problem found while tokenizing or parsing an expression.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message} at offset {offset}")]
pub struct ParseError {
    pub message: String,
    /// Byte offset the problem was detected at.
    pub offset: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

/// Why executing an expression failed.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum EvalError {
    /// The expression is malformed or incomplete.
    #[error("syntax error: {0}")]
    Syntax(#[from] ParseError),

    /// A division whose right operand evaluated to zero.
    #[error("division by zero in {range:?}")]
    DivideByZero { range: TextRange },

    /// A literal or an intermediate value left the representable range.
    #[error("numeric overflow")]
    Overflow,
}

/// One reduction performed while executing an expression.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Step {
    /// The sub-expression that was reduced.
    pub range: TextRange,
    /// Its value.
    pub value: f64,
}

/// Outcome of a successful execution.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EvaluationResult {
    /// The value of the whole expression.
    pub value: f64,
    /// Reductions in the order they were performed.
    pub steps: Vec<Step>,
}

impl EvaluationResult {
    pub fn has_steps(&self) -> bool {
        !self.steps.is_empty()
    }
}

/// Tokenizes and executes calculator expressions.
pub trait ExpressionEvaluator: Send + Sync {
    /// Split `text` into syntax tokens for highlighting.
    ///
    /// Incomplete expressions are accepted; unrecognized characters become
    /// [`TokenKind::Unknown`](super::TokenKind::Unknown) tokens.
    fn tokenize(&self, text: &str) -> Result<Vec<SyntaxToken>, ParseError>;

    /// Execute `text`, recording every reduction step.
    fn execute(&self, text: &str) -> Result<EvaluationResult, EvalError>;
}
