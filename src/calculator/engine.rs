//! The calculator state machine.
//!
//! [`CalculatorEngine`] owns the input buffer, normalizes keys as they arrive
//! (leading zeros, lone dots, leading operators), re-tokenizes the buffer for
//! highlighting, and classifies evaluation outcomes into [`EngineState`]s.
//! Errors never escape: they only change the state, and the buffer is kept so
//! the user can repair it with `Backspace`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::buffer::{InputBuffer, MAX_CHARS};
use super::evaluation::{EvalError, ExpressionEvaluator};
use super::expression::ParsedExpression;
use super::format::MAX_DISPLAY_DIGITS;
use super::input::Key;
use super::observer::{EngineEvent, EventBus, Property};
use super::replay::{ReplayFrame, StepReplay};

/// Input acceptance mode of the calculator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Ready,
    /// A finished calculation is being revealed step by step.
    Replaying,
    /// The input is too long, or a value left the representable range.
    Overflow,
    SyntaxError,
    DivideByZero,
}

impl EngineState {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ready | Self::Replaying)
    }

    pub fn is_error(&self) -> bool {
        !self.is_ok()
    }

    /// Short upper-case label for the screen.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::Replaying => "REPLAYING",
            Self::Overflow => "OVERFLOW",
            Self::SyntaxError => "SYNTAX",
            Self::DivideByZero => "DIV BY 0",
        }
    }
}

/// What `=` does with a successful evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationMode {
    /// Publish the result immediately.
    #[default]
    Regular,
    /// Replay the calculation steps before publishing the result.
    DemoSteps,
}

/// Tunables of the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_chars: usize,
    pub max_display_digits: usize,
    pub calculation_mode: CalculationMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_chars: MAX_CHARS,
            max_display_digits: MAX_DISPLAY_DIGITS,
            calculation_mode: CalculationMode::Regular,
        }
    }
}

/// The calculator expression engine.
pub struct CalculatorEngine {
    evaluator: Arc<dyn ExpressionEvaluator>,
    config: EngineConfig,
    buffer: InputBuffer,
    state: Property<EngineState>,
    display: Property<Option<ParsedExpression>>,
    result: Property<Option<f64>>,
    replay: Option<StepReplay>,
    events: EventBus,
}

impl CalculatorEngine {
    pub fn new(evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        Self::with_config(evaluator, EngineConfig::default())
    }

    pub fn with_config(evaluator: Arc<dyn ExpressionEvaluator>, config: EngineConfig) -> Self {
        Self {
            evaluator,
            buffer: InputBuffer::new(config.max_chars),
            config,
            state: Property::new(EngineState::Ready),
            display: Property::new(None),
            result: Property::new(None),
            replay: None,
            events: EventBus::default(),
        }
    }

    pub fn state(&self) -> EngineState {
        *self.state.get()
    }

    pub fn display(&self) -> Option<&ParsedExpression> {
        self.display.get().as_ref()
    }

    pub fn result(&self) -> Option<f64> {
        *self.result.get()
    }

    /// The raw text of the expression being edited.
    pub fn buffer_text(&self) -> &str {
        self.buffer.as_str()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_calculation_mode(&mut self, mode: CalculationMode) {
        self.config.calculation_mode = mode;
    }

    /// Whether a host should deliver keys right now. False while a replay runs.
    pub fn accepting_input(&self) -> bool {
        self.state() != EngineState::Replaying
    }

    pub fn on_state_changed(&mut self, callback: impl Fn(&EngineState) + Send + Sync + 'static) {
        self.state.bind(callback);
    }

    pub fn on_display_changed(
        &mut self,
        callback: impl Fn(&Option<ParsedExpression>) + Send + Sync + 'static,
    ) {
        self.display.bind(callback);
    }

    pub fn on_result_changed(&mut self, callback: impl Fn(&Option<f64>) + Send + Sync + 'static) {
        self.result.bind(callback);
    }

    /// Receive every property change as an [`EngineEvent`].
    pub fn subscribe(&mut self) -> flume::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Process one key to completion.
    pub fn handle_input(&mut self, key: Key) {
        debug!(%key, state = ?self.state(), buffer = self.buffer.as_str(), "handling key");

        if let Key::Digit(digit) = key
            && digit > 9
        {
            debug!(digit, "not a decimal digit, key ignored");
            return;
        }

        if self.state() == EngineState::Replaying {
            match key {
                Key::AllClear | Key::Backspace => self.cancel_replay(),
                _ => {
                    debug!(%key, "key ignored while replaying");
                    return;
                }
            }
        }

        if self.state().is_error() {
            self.handle_error_input(key);
        } else {
            self.handle_ok_input(key);
        }
    }

    fn handle_error_input(&mut self, key: Key) {
        match key {
            Key::AllClear => {
                self.set_state(EngineState::Ready);
                self.all_clear();
            }
            Key::Backspace => {
                self.set_state(EngineState::Ready);
                self.buffer.pop();
                self.reparse();
            }
            // Neither printable keys nor `=` are accepted in an error state.
            _ => {}
        }
    }

    fn handle_ok_input(&mut self, key: Key) {
        if key == Key::AllClear {
            self.all_clear();
            return;
        }

        if self.result().is_some() {
            if key.is_digit() {
                // A digit after a result starts a new expression.
                self.buffer.clear();
                self.set_result(None);
            } else if key != Key::Equal {
                self.set_result(None);
            }
        }

        match key {
            Key::AllClear => {}
            Key::Backspace => {
                self.buffer.pop();
                self.reparse();
            }
            Key::Equal => self.execute(),
            Key::Dot => self.input_dot(),
            Key::Digit(0) => self.input_zero(),
            Key::Digit(_) => self.input_nonzero_digit(key),
            Key::Operator(op) => {
                if self.buffer.is_empty() && !self.append('0') {
                    return;
                }
                self.append_and_reparse(op.symbol());
            }
            Key::LeftParen => self.append_and_reparse('('),
            Key::RightParen => self.append_and_reparse(')'),
        }
    }

    fn input_dot(&mut self) {
        if self.buffer.last_char() == Some('.') {
            return;
        }
        let (is_number, _) = self.last_token();
        if !is_number && !self.append('0') {
            return;
        }
        self.append_and_reparse('.');
    }

    fn input_zero(&mut self) {
        let (is_number, text) = self.last_token();
        if is_number && text == "0" {
            return;
        }
        self.append_and_reparse('0');
    }

    fn input_nonzero_digit(&mut self, key: Key) {
        let (is_number, text) = self.last_token();
        if is_number && text == "0" {
            self.buffer.pop();
        }
        if let Some(ch) = key.printable() {
            self.append_and_reparse(ch);
        }
    }

    /// Kind and text of the last token in the buffer.
    fn last_token(&self) -> (bool, String) {
        let text = self.buffer.as_str();
        let Ok(tokens) = self.evaluator.tokenize(text) else {
            return (false, String::new());
        };
        let expression = ParsedExpression::new(text, tokens);
        let last = expression.last_token_text().unwrap_or_default().to_string();
        (expression.last_token_is_number(), last)
    }

    /// Append one character. Returns `false` if that overflowed the buffer.
    fn append(&mut self, ch: char) -> bool {
        if self.buffer.push(ch) {
            return true;
        }
        debug!(len = self.buffer.len(), max = self.buffer.max_chars(), "input overflow");
        self.set_state(EngineState::Overflow);
        false
    }

    fn append_and_reparse(&mut self, ch: char) {
        if self.append(ch) {
            self.reparse();
        }
    }

    /// Re-tokenize the buffer and publish it. Only runs in `Ready`.
    fn reparse(&mut self) {
        if self.state() != EngineState::Ready {
            return;
        }
        let text = self.buffer.as_str();
        if text.is_empty() {
            self.set_display(None);
            return;
        }
        match self.evaluator.tokenize(text) {
            Ok(tokens) => {
                let expression = ParsedExpression::new(text, tokens);
                self.set_display(Some(expression));
            }
            Err(err) => {
                debug!(%err, "tokenizer rejected buffer");
                self.set_state(EngineState::SyntaxError);
            }
        }
    }

    fn execute(&mut self) {
        let text = self.buffer.as_str().to_string();
        if text.is_empty() {
            return;
        }

        match self.evaluator.execute(&text) {
            Err(EvalError::Syntax(err)) => {
                debug!(%err, "syntax error");
                self.set_state(EngineState::SyntaxError);
            }
            Err(EvalError::DivideByZero { range }) => {
                debug!(?range, "division by zero");
                self.set_state(EngineState::DivideByZero);
            }
            Err(EvalError::Overflow) => {
                debug!("numeric overflow");
                self.set_state(EngineState::Overflow);
            }
            Ok(result) => {
                debug!(value = result.value, steps = result.steps.len(), "evaluated");
                if self.config.calculation_mode == CalculationMode::DemoSteps && result.has_steps()
                {
                    let replay = StepReplay::new(self.evaluator.clone(), text, result)
                        .with_display_digits(self.config.max_display_digits);
                    self.replay = Some(replay);
                    self.set_state(EngineState::Replaying);
                } else {
                    self.set_result(Some(result.value));
                }
            }
        }
    }

    /// Show the next replay frame. Returns `None` when no replay is running.
    ///
    /// After the `Final` frame the result is published and the engine returns
    /// to `Ready`.
    pub fn advance_replay(&mut self) -> Option<ReplayFrame> {
        if self.state() != EngineState::Replaying {
            return None;
        }
        let Some(replay) = self.replay.as_mut() else {
            warn!("replaying without a replay, resetting");
            self.set_state(EngineState::Ready);
            return None;
        };

        let frame = replay.next();
        let final_value = replay.final_value();
        match frame {
            Some(frame) => {
                self.set_display(Some(frame.expression.clone()));
                if frame.is_final() {
                    self.finish(final_value);
                }
                Some(frame)
            }
            None => {
                self.finish(final_value);
                None
            }
        }
    }

    /// Run the remaining replay without pauses and return its frames.
    pub fn finish_replay(&mut self) -> Vec<ReplayFrame> {
        let mut frames = Vec::new();
        while let Some(frame) = self.advance_replay() {
            frames.push(frame);
        }
        frames
    }

    fn finish(&mut self, final_value: f64) {
        self.replay = None;
        self.set_state(EngineState::Ready);
        self.set_result(Some(final_value));
    }

    /// Abandon a running replay. No result is published.
    pub fn cancel_replay(&mut self) {
        if self.replay.take().is_some() {
            debug!("replay abandoned");
        }
        if self.state() == EngineState::Replaying {
            self.set_state(EngineState::Ready);
        }
    }

    fn all_clear(&mut self) {
        self.buffer.clear();
        self.set_display(None);
        self.set_result(None);
    }

    fn set_state(&mut self, state: EngineState) {
        if self.state() != state {
            debug!(from = ?self.state(), to = ?state, "state transition");
        }
        self.state.set(state);
        self.events.publish(EngineEvent::State(state));
    }

    fn set_display(&mut self, display: Option<ParsedExpression>) {
        self.events.publish(EngineEvent::Display(display.clone()));
        self.display.set(display);
    }

    fn set_result(&mut self, result: Option<f64>) {
        self.result.set(result);
        self.events.publish(EngineEvent::Result(result));
    }
}

impl std::fmt::Debug for CalculatorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalculatorEngine")
            .field("config", &self.config)
            .field("buffer", &self.buffer)
            .field("state", self.state.get())
            .field("result", self.result.get())
            .field("replay", &self.replay)
            .finish()
    }
}
