//! The accumulating text of the expression being typed.

/// Default limit on the number of characters in the input buffer.
pub const MAX_CHARS: usize = 100;

/// Expression text with a length bound.
///
/// The buffer never refuses a character by itself. [`push`](Self::push)
/// reports whether the bound was exceeded and the engine decides what that
/// means, so the character that overflowed the buffer stays recorded.
#[derive(Clone, Debug)]
pub struct InputBuffer {
    text: String,
    max_chars: usize,
}

impl Default for InputBuffer {
    fn default() -> Self {
        Self::new(MAX_CHARS)
    }
}

impl InputBuffer {
    pub fn new(max_chars: usize) -> Self {
        Self {
            text: String::new(),
            max_chars,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Whether the buffer holds more characters than allowed.
    pub fn is_overflowed(&self) -> bool {
        self.len() > self.max_chars
    }

    /// Append a character. Returns `false` if the buffer is now over its bound.
    pub fn push(&mut self, ch: char) -> bool {
        self.text.push(ch);
        !self.is_overflowed()
    }

    /// Remove and return the last character.
    pub fn pop(&mut self) -> Option<char> {
        self.text.pop()
    }

    /// The last character, if any.
    pub fn last_char(&self) -> Option<char> {
        self.text.chars().last()
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_pop() {
        let mut buffer = InputBuffer::default();
        assert!(buffer.is_empty());
        assert!(buffer.push('1'));
        assert!(buffer.push('+'));
        assert_eq!(buffer.as_str(), "1+");
        assert_eq!(buffer.last_char(), Some('+'));
        assert_eq!(buffer.pop(), Some('+'));
        assert_eq!(buffer.as_str(), "1");
        buffer.clear();
        assert_eq!(buffer.pop(), None);
    }

    #[test]
    fn test_overflow_keeps_character() {
        let mut buffer = InputBuffer::new(3);
        assert!(buffer.push('1'));
        assert!(buffer.push('2'));
        assert!(buffer.push('3'));
        assert!(!buffer.push('4'));
        assert!(buffer.is_overflowed());
        assert_eq!(buffer.as_str(), "1234");

        buffer.pop();
        assert!(!buffer.is_overflowed());
    }
}
