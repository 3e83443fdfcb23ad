//! Two-line text rendering of the calculator.
//!
//! The top line shows the expression with display operators and the
//! highlighted sub-expression in brackets. The bottom line shows the error,
//! the result, or the number being typed.

use serde::Serialize;

use crate::calculator::{
    CalculatorEngine, EngineState, ParsedExpression, TokenKind, format_number_with_digits,
};

/// A rendered calculator screen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Screen {
    /// The expression line.
    pub top: String,
    /// The result line.
    pub bottom: String,
    /// Whether the bottom line shows an error.
    pub is_error: bool,
}

impl Screen {
    /// Render the current state of `engine`.
    pub fn render(engine: &CalculatorEngine) -> Self {
        Self::compose(
            engine.state(),
            engine.display(),
            engine.result(),
            engine.config().max_display_digits,
        )
    }

    /// Render from the individual engine properties.
    pub fn compose(
        state: EngineState,
        display: Option<&ParsedExpression>,
        result: Option<f64>,
        max_display_digits: usize,
    ) -> Self {
        let top = display.map(render_expression).unwrap_or_default();

        if state.is_error() {
            return Self {
                top,
                bottom: format!("ERR:{}", state.label()),
                is_error: true,
            };
        }

        let bottom = match result {
            Some(value) => format_number_with_digits(value, max_display_digits),
            None => display
                .filter(|expression| !expression.is_replaying)
                .and_then(ParsedExpression::parse_last_number)
                .map(|value| format_number_with_digits(value, max_display_digits))
                .unwrap_or_else(|| "0".to_string()),
        };

        Self {
            top,
            bottom,
            is_error: false,
        }
    }
}

impl std::fmt::Display for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.top)?;
        write!(f, "{:>width$}", self.bottom, width = self.top.chars().count())
    }
}

/// Render the tokens of `expression`, falling back to the raw text when the
/// tokenizer produced nothing.
fn render_expression(expression: &ParsedExpression) -> String {
    if expression.tokens.is_empty() {
        return expression.text.clone();
    }

    let mut out = String::with_capacity(expression.text.len() + 2);
    let mut in_highlight = false;
    for token in &expression.tokens {
        let highlighted = expression.is_highlighted(token);
        if highlighted && !in_highlight {
            out.push('[');
        } else if !highlighted && in_highlight {
            out.push(']');
        }
        in_highlight = highlighted;

        let text = expression.token_text(token);
        match (token.kind, text) {
            (TokenKind::Operator, "*") => out.push('×'),
            (TokenKind::Operator, "/") => out.push('÷'),
            _ => out.push_str(text),
        }
    }
    if in_highlight {
        out.push(']');
    }
    out
}
