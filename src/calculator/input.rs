//! Calculator keys and parsing of key labels typed by a user.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

/// A binary arithmetic operator key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
}

impl Operator {
    /// The character written into the expression.
    pub fn symbol(&self) -> char {
        match self {
            Self::Add => '+',
            Self::Sub => '-',
            Self::Mul => '*',
            Self::Div => '/',
        }
    }

    pub fn from_symbol(ch: char) -> Option<Self> {
        match ch {
            '+' => Some(Self::Add),
            '-' => Some(Self::Sub),
            '*' | '×' => Some(Self::Mul),
            '/' | '÷' => Some(Self::Div),
            _ => None,
        }
    }
}

/// One calculator key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    AllClear,
    Backspace,
    Equal,
    Dot,
    Digit(u8),
    Operator(Operator),
    LeftParen,
    RightParen,
}

impl Key {
    /// Look up a key by its label, e.g. `"AC"`, `"Del"`, `"7"` or `"÷"`.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        if label.eq_ignore_ascii_case("ac") {
            return Some(Self::AllClear);
        }
        if label.eq_ignore_ascii_case("del") {
            return Some(Self::Backspace);
        }

        let mut chars = label.chars();
        let ch = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        match ch {
            '0'..='9' => Some(Self::Digit(ch as u8 - b'0')),
            '.' => Some(Self::Dot),
            '=' => Some(Self::Equal),
            '(' => Some(Self::LeftParen),
            ')' => Some(Self::RightParen),
            _ => Operator::from_symbol(ch).map(Self::Operator),
        }
    }

    /// The character this key appends to the expression, if it is printable.
    pub fn printable(&self) -> Option<char> {
        match self {
            Self::Digit(d) => char::from_digit(u32::from(*d), 10),
            Self::Dot => Some('.'),
            Self::Operator(op) => Some(op.symbol()),
            Self::LeftParen => Some('('),
            Self::RightParen => Some(')'),
            Self::AllClear | Self::Backspace | Self::Equal => None,
        }
    }

    pub fn is_digit(&self) -> bool {
        matches!(self, Self::Digit(_))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllClear => f.write_str("AC"),
            Self::Backspace => f.write_str("Del"),
            Self::Equal => f.write_str("="),
            other => match other.printable() {
                Some(ch) => write!(f, "{}", ch),
                None => Ok(()),
            },
        }
    }
}

/// A line of key labels could not be understood.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unrecognized key '{found}' at position {position}")]
pub struct InputError {
    pub found: String,
    pub position: usize,
}

lazy_static! {
    /// One key label at the start of the input, with any whitespace before it.
    static ref KEY_LABEL: Regex = Regex::new(
        r"(?i)^\s*(ac|del|[0-9]|[-+*/×÷().=])"
    ).unwrap();
}

/// Split a line such as `"12 + 3 ="` or `"AC 7÷2="` into keys.
///
/// Multi-character labels (`AC`, `Del`) are case-insensitive. Anything that is
/// not a key label is rejected with its position.
pub fn parse_keys(line: &str) -> Result<Vec<Key>, InputError> {
    let mut keys = Vec::new();
    let mut position = 0;

    while position < line.len() {
        let rest = &line[position..];
        if rest.trim().is_empty() {
            break;
        }

        let Some(captures) = KEY_LABEL.captures(rest) else {
            let found: String = rest.trim_start().chars().take(1).collect();
            let offset = rest.len() - rest.trim_start().len();
            return Err(InputError {
                found,
                position: position + offset,
            });
        };

        let whole = captures.get(0).map_or(0, |m| m.end());
        let label = captures.get(1).map_or("", |m| m.as_str());
        match Key::from_label(label) {
            Some(key) => keys.push(key),
            None => {
                return Err(InputError {
                    found: label.to_string(),
                    position,
                });
            }
        }
        position += whole;
    }

    Ok(keys)
}
