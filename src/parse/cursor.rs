/// Peekable position over the characters of an input string.
///
/// Rules that may fail part-way save the position with [`Cursor::mark`] and
/// go back to it with [`Cursor::reset`].
#[derive(Debug, Clone)]
pub struct Cursor {
    chars: Vec<char>,
    position: usize,
}

/// Saved cursor position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark(usize);

impl Cursor {
    pub fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            position: 0,
        }
    }

    pub fn peek(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    /// Character `offset` places ahead of the current one.
    pub fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.position + offset).copied()
    }

    /// Consume and return the next character.
    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position += 1;
        Some(c)
    }

    pub fn is_eof(&self) -> bool {
        self.position >= self.chars.len()
    }

    pub fn mark(&self) -> Mark {
        Mark(self.position)
    }

    pub fn reset(&mut self, mark: Mark) {
        self.position = mark.0;
    }

    /// Whether the input at the cursor starts with `s`, ignoring ASCII case.
    /// Nothing is consumed.
    pub fn starts_with_ignore_case(&self, s: &str) -> bool {
        let mut offset = 0;
        for expected in s.chars() {
            match self.peek_at(offset) {
                Some(c) if c.eq_ignore_ascii_case(&expected) => offset += 1,
                _ => return false,
            }
        }
        true
    }

    /// Skip `count` characters.
    pub fn advance(&mut self, count: usize) {
        self.position = (self.position + count).min(self.chars.len());
    }

    /// Consume and return everything left.
    pub fn take_remaining(&mut self) -> String {
        let rest: String = self.chars[self.position..].iter().collect();
        self.position = self.chars.len();
        rest
    }

    /// The unconsumed input, without consuming it.
    pub fn rest(&self) -> String {
        self.chars[self.position..].iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_and_reset() {
        let mut cursor = Cursor::new("abc");
        let start = cursor.mark();
        assert_eq!(cursor.bump(), Some('a'));
        assert_eq!(cursor.bump(), Some('b'));
        cursor.reset(start);
        assert_eq!(cursor.peek(), Some('a'));
        assert_eq!(cursor.peek_at(2), Some('c'));
        assert_eq!(cursor.peek_at(3), None);
    }

    #[test]
    fn test_starts_with_ignore_case() {
        let mut cursor = Cursor::new("Using btree");
        assert!(cursor.starts_with_ignore_case("USING"));
        assert!(!cursor.starts_with_ignore_case("using btree index"));
        cursor.advance(6);
        assert_eq!(cursor.rest(), "btree");
        assert_eq!(cursor.take_remaining(), "btree");
        assert!(cursor.is_eof());
        assert_eq!(cursor.bump(), None);
    }
}
