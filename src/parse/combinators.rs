//! Small parsing rules over a [`Cursor`].
//!
//! A rule that does not match returns an error for which
//! [`ParseError::is_no_match`] is true. [`optional`] turns such errors into
//! `None` and puts the cursor back where the rule started, so alternatives
//! can be tried without catching anything else.

use crate::parse::{Cursor, ParseError, ParseResult};

const QUOTE: char = '`';

fn describe(c: Option<char>) -> String {
    c.map(String::from).unwrap_or_else(|| "EOF".to_string())
}

/// Consume `expected` or fail without consuming anything.
pub fn expect_rune(cursor: &mut Cursor, expected: char) -> ParseResult<()> {
    match cursor.peek() {
        Some(c) if c == expected => {
            cursor.bump();
            Ok(())
        }
        Some(c) => Err(ParseError::unexpected(expected, c)),
        None => Err(ParseError::eof(expected)),
    }
}

/// Consume the keyword `expected`, ignoring case.
pub fn expect(cursor: &mut Cursor, expected: &str) -> ParseResult<()> {
    let start = cursor.mark();
    let ident = read_ident(cursor)?;
    if ident.eq_ignore_ascii_case(expected) {
        return Ok(());
    }
    cursor.reset(start);
    Err(ParseError::unexpected(expected, ident))
}

pub fn skip_spaces(cursor: &mut Cursor) {
    while cursor.peek().is_some_and(char::is_whitespace) {
        cursor.bump();
    }
}

/// Succeed only if the whole input has been consumed.
pub fn check_eof(cursor: &Cursor) -> ParseResult<()> {
    if cursor.is_eof() {
        Ok(())
    } else {
        Err(ParseError::TrailingInput {
            found: cursor.rest(),
        })
    }
}

/// Run `rule`; if it does not match, rewind and return `None`.
pub fn optional<T, F>(cursor: &mut Cursor, rule: F) -> ParseResult<Option<T>>
where
    F: FnOnce(&mut Cursor) -> ParseResult<T>,
{
    let start = cursor.mark();
    match rule(cursor) {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_no_match() => {
            cursor.reset(start);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn read_word<F>(cursor: &mut Cursor, accept: F) -> ParseResult<String>
where
    F: Fn(char) -> bool,
{
    let mut word = String::new();
    match cursor.peek() {
        Some(c) if c.is_alphabetic() => word.push(c),
        other => {
            return Err(match other {
                Some(c) => ParseError::unexpected("identifier", c),
                None => ParseError::eof("identifier"),
            })
        }
    }
    cursor.bump();

    while let Some(c) = cursor.peek() {
        if !accept(c) {
            break;
        }
        word.push(c);
        cursor.bump();
    }
    Ok(word.to_lowercase())
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// A bare identifier: a letter followed by letters, digits or underscores.
pub fn read_ident(cursor: &mut Cursor) -> ParseResult<String> {
    read_word(cursor, is_ident_char)
}

/// An identifier whose parts are joined by `separator`, e.g. `db.table`.
pub fn read_scoped_ident(cursor: &mut Cursor, separator: char) -> ParseResult<Vec<String>> {
    let start = cursor.mark();
    let word = read_word(cursor, |c| is_ident_char(c) || c == separator)?;
    let parts: Vec<String> = word.split(separator).map(str::to_string).collect();
    if parts.iter().any(String::is_empty) {
        cursor.reset(start);
        return Err(ParseError::unexpected("scoped identifier", word));
    }
    Ok(parts)
}

/// The body of a backtick-quoted identifier, up to but not including the
/// closing quote. A doubled backtick stands for one backtick.
pub fn read_quoted_ident(cursor: &mut Cursor) -> ParseResult<String> {
    let mut ident = String::new();
    loop {
        match (cursor.peek(), cursor.peek_at(1)) {
            (Some(QUOTE), Some(QUOTE)) => {
                cursor.advance(2);
                ident.push(QUOTE);
            }
            (Some(QUOTE), _) => break,
            (Some(c), _) => {
                cursor.bump();
                ident.push(c);
            }
            (None, _) => {
                return Err(ParseError::Unterminated {
                    expected: QUOTE.to_string(),
                })
            }
        }
    }
    if ident.is_empty() {
        return Err(ParseError::unexpected("identifier", QUOTE));
    }
    Ok(ident.to_lowercase())
}

/// A bare identifier or a backtick-quoted one.
pub fn read_quotable_ident(cursor: &mut Cursor) -> ParseResult<String> {
    if cursor.peek() != Some(QUOTE) {
        return read_ident(cursor);
    }
    expect_rune(cursor, QUOTE)?;
    let ident = read_quoted_ident(cursor)?;
    expect_rune(cursor, QUOTE)?;
    Ok(ident)
}

/// An identifier that must equal one of `options`, ignoring case.
pub fn one_of(cursor: &mut Cursor, options: &[&str]) -> ParseResult<String> {
    let start = cursor.mark();
    let ident = read_ident(cursor)?;
    if options.iter().any(|o| o.eq_ignore_ascii_case(&ident)) {
        return Ok(ident);
    }
    cursor.reset(start);
    Err(ParseError::unexpected(
        format!("one of: {}", options.join(", ")),
        ident,
    ))
}

pub fn read_remaining(cursor: &mut Cursor) -> String {
    cursor.take_remaining()
}

/// Consume `s` if the input starts with it, ignoring case.
pub fn maybe(cursor: &mut Cursor, s: &str) -> bool {
    if cursor.starts_with_ignore_case(s) {
        cursor.advance(s.chars().count());
        true
    } else {
        false
    }
}

/// Match a sequence of words separated by spaces, e.g. `IF NOT EXISTS`.
///
/// Returns `false` if the first word is absent. Once the first word matched
/// the rest are required.
pub fn multi_maybe(cursor: &mut Cursor, words: &[&str]) -> ParseResult<bool> {
    let start = cursor.mark();
    for (i, word) in words.iter().enumerate() {
        if !maybe(cursor, word) {
            if i == 0 {
                return Ok(false);
            }
            let found = optional(cursor, read_ident)?.unwrap_or_else(|| describe(cursor.peek()));
            cursor.reset(start);
            return Err(ParseError::unexpected(*word, found));
        }
        skip_spaces(cursor);
    }
    Ok(true)
}

/// Read `opening item separator item ... closing`. Returns `None` without
/// consuming anything when the input does not start with `opening`.
pub fn maybe_list(
    cursor: &mut Cursor,
    opening: char,
    separator: char,
    closing: char,
) -> ParseResult<Option<Vec<String>>> {
    if cursor.peek() != Some(opening) {
        return Ok(None);
    }
    cursor.bump();

    let unterminated = || ParseError::Unterminated {
        expected: closing.to_string(),
    };
    let mut items = Vec::new();
    loop {
        skip_spaces(cursor);
        let item = read_quotable_ident(cursor).map_err(|e| match e {
            ParseError::UnexpectedEof { .. } => unterminated(),
            other => other,
        })?;
        items.push(item);
        skip_spaces(cursor);

        match cursor.bump() {
            Some(c) if c == closing => return Ok(Some(items)),
            Some(c) if c == separator => continue,
            Some(c) => {
                return Err(ParseError::unexpected(
                    format!("{} or {}", separator, closing),
                    c,
                ))
            }
            None => return Err(unterminated()),
        }
    }
}
