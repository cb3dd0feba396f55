use thiserror::Error;

/// Syntax errors raised by the mini-parser.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("expecting {expected:?} but got {found:?} instead")]
    Unexpected { expected: String, found: String },

    #[error("expecting {expected:?} but reached end of input")]
    UnexpectedEof { expected: String },

    #[error("missing {expected:?} before end of input")]
    Unterminated { expected: String },

    #[error("unexpected trailing input {found:?}")]
    TrailingInput { found: String },
}

impl ParseError {
    pub fn unexpected(expected: impl Into<String>, found: impl Into<String>) -> Self {
        ParseError::Unexpected {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn eof(expected: impl Into<String>) -> Self {
        ParseError::UnexpectedEof {
            expected: expected.into(),
        }
    }

    /// True when the rule simply did not match at the current position.
    /// Such errors let an optional rule back out; the others mean the input
    /// is malformed.
    pub fn is_no_match(&self) -> bool {
        matches!(
            self,
            ParseError::Unexpected { .. } | ParseError::UnexpectedEof { .. }
        )
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
