//! Calculator expression engine.
//!
//! This module provides:
//! - An input state machine that normalizes keys into an expression
//! - Tokenizing and step-recording evaluation of that expression
//! - Number formatting for a fixed-width display
//! - Step-by-step replay of a finished calculation

mod arithmetic;
mod buffer;
mod engine;
mod evaluation;
mod expression;
mod format;
mod input;
mod observer;
mod replay;

pub use arithmetic::ArithmeticEvaluator;
pub use buffer::{InputBuffer, MAX_CHARS};
pub use engine::{CalculationMode, CalculatorEngine, EngineConfig, EngineState};
pub use evaluation::{EvalError, EvaluationResult, ExpressionEvaluator, ParseError, Step};
pub use expression::{ParsedExpression, SyntaxToken, TextRange, TokenKind};
pub use format::{MAX_DISPLAY_DIGITS, format_number, format_number_with_digits};
pub use input::{InputError, Key, Operator, parse_keys};
pub use observer::{Callback, EngineEvent, EventBus, Property};
pub use replay::{ReplayFrame, ReplayPhase, StepReplay};
