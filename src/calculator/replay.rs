//! Step-by-step replay of a finished calculation.
//!
//! A [`StepReplay`] walks the reductions recorded by the evaluator and yields
//! display snapshots, one reduction at a time. It has no notion of time: the
//! caller decides how long each frame stays on screen.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::evaluation::{EvaluationResult, ExpressionEvaluator, Step};
use super::expression::{ParsedExpression, TextRange};
use super::format::{MAX_DISPLAY_DIGITS, format_number_with_digits};

/// Which part of a reduction round a frame shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayPhase {
    /// The sub-expression about to be reduced is highlighted.
    Highlight,
    /// The reduced value replaced the sub-expression and is highlighted.
    Substituted,
    /// Same text as `Substituted`, highlight removed.
    Settled,
    /// The final value of the whole expression.
    Final,
}

/// One snapshot emitted by a replay.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReplayFrame {
    pub phase: ReplayPhase,
    pub expression: ParsedExpression,
}

impl ReplayFrame {
    pub fn is_final(&self) -> bool {
        self.phase == ReplayPhase::Final
    }
}

/// Lazy, finite sequence of [`ReplayFrame`]s for one evaluation.
///
/// Each round takes the first remaining step, substitutes its formatted value
/// into the text and re-executes the new text to find the next round's steps.
/// The sequence always ends with a `Final` frame showing the original final
/// value, whatever rounding the substitutions introduced.
pub struct StepReplay {
    evaluator: Arc<dyn ExpressionEvaluator>,
    text: String,
    steps: Vec<Step>,
    final_value: f64,
    max_display_digits: usize,
    rounds_left: usize,
    pending: Vec<ReplayFrame>,
    finished: bool,
}

impl StepReplay {
    pub fn new(
        evaluator: Arc<dyn ExpressionEvaluator>,
        text: impl Into<String>,
        result: EvaluationResult,
    ) -> Self {
        let rounds_left = result.steps.len();
        Self {
            evaluator,
            text: text.into(),
            steps: result.steps,
            final_value: result.value,
            max_display_digits: MAX_DISPLAY_DIGITS,
            rounds_left,
            pending: Vec::new(),
            finished: false,
        }
    }

    /// Use a digit budget other than the default when formatting values.
    pub fn with_display_digits(mut self, max_display_digits: usize) -> Self {
        self.max_display_digits = max_display_digits;
        self
    }

    pub fn final_value(&self) -> f64 {
        self.final_value
    }

    fn snapshot(&self, text: &str, highlight: Option<TextRange>) -> ParsedExpression {
        let tokens = self.evaluator.tokenize(text).unwrap_or_default();
        ParsedExpression::new(text, tokens)
            .with_highlight(highlight)
            .replaying(true)
    }

    /// Run one reduction and queue its three frames. Returns `false` if the
    /// step does not fit the current text.
    fn run_round(&mut self, step: Step) -> bool {
        let range = step.range;
        let (Some(head), Some(tail)) = (
            self.text.get(..range.start),
            self.text.get(range.end + 1..),
        ) else {
            warn!(text = %self.text, ?range, "step range outside expression, ending replay");
            return false;
        };

        let replacement = format_number_with_digits(step.value, self.max_display_digits);
        let next_text = format!("{head}{replacement}{tail}");
        let replaced = TextRange::new(range.start, range.start + replacement.len() - 1);

        let highlight = self.snapshot(&self.text, Some(range));
        let substituted = self.snapshot(&next_text, Some(replaced));
        let settled = self.snapshot(&next_text, None);

        self.steps = match self.evaluator.execute(&next_text) {
            Ok(result) => result.steps,
            Err(err) => {
                warn!(text = %next_text, %err, "re-evaluation failed, skipping to final value");
                Vec::new()
            }
        };
        debug!(from = %self.text, to = %next_text, "replayed step");
        self.text = next_text;
        self.rounds_left -= 1;

        // Frames are popped from the back.
        self.pending = vec![
            ReplayFrame {
                phase: ReplayPhase::Settled,
                expression: settled,
            },
            ReplayFrame {
                phase: ReplayPhase::Substituted,
                expression: substituted,
            },
            ReplayFrame {
                phase: ReplayPhase::Highlight,
                expression: highlight,
            },
        ];
        true
    }

    fn final_frame(&self) -> ReplayFrame {
        let text = format_number_with_digits(self.final_value, self.max_display_digits);
        ReplayFrame {
            phase: ReplayPhase::Final,
            expression: self.snapshot(&text, None).replaying(false),
        }
    }
}

impl Iterator for StepReplay {
    type Item = ReplayFrame;

    fn next(&mut self) -> Option<ReplayFrame> {
        if let Some(frame) = self.pending.pop() {
            return Some(frame);
        }
        if self.finished {
            return None;
        }

        if self.rounds_left > 0
            && let Some(step) = self.steps.first().copied()
            && self.run_round(step)
        {
            return self.pending.pop();
        }

        self.finished = true;
        Some(self.final_frame())
    }
}

impl std::fmt::Debug for StepReplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepReplay")
            .field("text", &self.text)
            .field("steps", &self.steps)
            .field("final_value", &self.final_value)
            .field("rounds_left", &self.rounds_left)
            .field("finished", &self.finished)
            .finish()
    }
}
