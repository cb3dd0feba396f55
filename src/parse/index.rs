//! Index definitions.

use crate::expression::Expression;
use crate::parse::combinators::{
    check_eof, expect, expect_rune, maybe, maybe_list, multi_maybe, optional, read_ident,
    read_quotable_ident, read_remaining, read_scoped_ident, skip_spaces,
};
use crate::parse::{Cursor, ParseError, ParseResult};
use std::fmt;

/// A parsed `CREATE INDEX` statement
#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndex {
    pub name: String,
    pub table: String,
    pub if_not_exists: bool,
    /// Index driver named by `USING`, if any
    pub driver: Option<String>,
    /// Indexed columns, unresolved
    pub expressions: Vec<Expression>,
    pub comment: Option<String>,
}

impl fmt::Display for CreateIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CREATE INDEX ")?;
        if self.if_not_exists {
            write!(f, "IF NOT EXISTS ")?;
        }
        write!(f, "{} ON {}", self.name, self.table)?;
        if let Some(driver) = &self.driver {
            write!(f, " USING {}", driver)?;
        }
        let columns: Vec<String> = self.expressions.iter().map(|e| e.to_string()).collect();
        write!(f, " ({})", columns.join(", "))?;
        if let Some(comment) = &self.comment {
            write!(f, " COMMENT '{}'", comment)?;
        }
        Ok(())
    }
}

/// Parse a comma separated list of column references, each a bare or
/// backtick-quoted name optionally qualified by its table.
pub fn parse_index_expressions(input: &str) -> ParseResult<Vec<Expression>> {
    let mut cursor = Cursor::new(input);
    let mut expressions = Vec::new();
    loop {
        skip_spaces(&mut cursor);
        expressions.push(read_column(&mut cursor)?);
        skip_spaces(&mut cursor);
        if !maybe(&mut cursor, ",") {
            break;
        }
    }
    check_eof(&cursor)?;
    Ok(expressions)
}

fn read_column(cursor: &mut Cursor) -> ParseResult<Expression> {
    let parts = if cursor.peek() == Some('`') {
        let mut parts = vec![read_quotable_ident(cursor)?];
        if maybe(cursor, ".") {
            parts.push(read_quotable_ident(cursor)?);
        }
        parts
    } else {
        read_scoped_ident(cursor, '.')?
    };

    match parts.as_slice() {
        [name] => Ok(Expression::col(name.as_str())),
        [table, name] => Ok(Expression::qualified_col(table.as_str(), name.as_str())),
        _ => Err(ParseError::unexpected("column or table.column", parts.join("."))),
    }
}

/// Parse `CREATE INDEX [IF NOT EXISTS] name ON table [USING driver]
/// (columns) [COMMENT text]`. Keywords are matched case-insensitively.
pub fn parse_create_index(input: &str) -> ParseResult<CreateIndex> {
    let mut cursor = Cursor::new(input);
    let c = &mut cursor;

    skip_spaces(c);
    expect(c, "create")?;
    skip_spaces(c);
    expect(c, "index")?;
    skip_spaces(c);
    // An index may itself be named `if...`, so a partial match backs out
    let if_not_exists = optional(c, |c| multi_maybe(c, &["if", "not", "exists"]))?.unwrap_or(false);
    let name = read_quotable_ident(c)?;
    skip_spaces(c);
    expect(c, "on")?;
    skip_spaces(c);
    let table = read_quotable_ident(c)?;
    skip_spaces(c);

    let driver = optional(c, |c| {
        expect(c, "using")?;
        skip_spaces(c);
        read_ident(c)
    })?;
    skip_spaces(c);

    let columns = match maybe_list(c, '(', ',', ')')? {
        Some(columns) => columns,
        None => {
            expect_rune(c, '(')?;
            Vec::new()
        }
    };
    skip_spaces(c);

    let comment = if optional(c, |c| expect(c, "comment"))?.is_some() {
        skip_spaces(c);
        Some(unquote(read_remaining(c).trim_end()))
    } else {
        None
    };
    check_eof(c)?;

    Ok(CreateIndex {
        name,
        table,
        if_not_exists,
        driver,
        expressions: columns.into_iter().map(Expression::col).collect(),
        comment,
    })
}

fn unquote(text: &str) -> String {
    text.strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .unwrap_or(text)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_index_expressions() {
        let exprs = parse_index_expressions("a, T.b ,`c``d`").unwrap();
        assert_eq!(
            exprs,
            vec![
                Expression::col("a"),
                Expression::qualified_col("t", "b"),
                Expression::col("c`d"),
            ]
        );

        let exprs = parse_index_expressions("`t`.`x`").unwrap();
        assert_eq!(exprs, vec![Expression::qualified_col("t", "x")]);
    }

    #[test]
    fn test_parse_index_expressions_errors() {
        assert!(parse_index_expressions("").is_err());
        assert!(parse_index_expressions("a,").is_err());
        assert!(parse_index_expressions("a.b.c").is_err());
        assert_eq!(
            parse_index_expressions("a b"),
            Err(ParseError::TrailingInput { found: "b".into() })
        );
    }

    #[test]
    fn test_parse_create_index() {
        let index = parse_create_index(
            "CREATE INDEX idx_name ON Users USING btree (name, `Age`) COMMENT 'by name'",
        )
        .unwrap();
        assert_eq!(
            index,
            CreateIndex {
                name: "idx_name".into(),
                table: "users".into(),
                if_not_exists: false,
                driver: Some("btree".into()),
                expressions: vec![Expression::col("name"), Expression::col("age")],
                comment: Some("by name".into()),
            }
        );
        assert_eq!(
            index.to_string(),
            "CREATE INDEX idx_name ON users USING btree (name, age) COMMENT 'by name'"
        );
    }

    #[test]
    fn test_parse_create_index_minimal() {
        let index = parse_create_index("create index if not exists i on t(a)").unwrap();
        assert!(index.if_not_exists);
        assert_eq!(index.driver, None);
        assert_eq!(index.comment, None);
        assert_eq!(index.expressions, vec![Expression::col("a")]);

        let index = parse_create_index("CREATE INDEX iffy ON t (a)").unwrap();
        assert_eq!(index.name, "iffy");
        assert!(!index.if_not_exists);
    }

    #[test]
    fn test_parse_create_index_errors() {
        assert_eq!(
            parse_create_index("CREATE TABLE t (a)"),
            Err(ParseError::unexpected("index", "table"))
        );
        assert!(parse_create_index("CREATE INDEX i ON t").is_err());
        assert_eq!(
            parse_create_index("CREATE INDEX i ON t (a"),
            Err(ParseError::Unterminated { expected: ")".into() })
        );
        assert_eq!(
            parse_create_index("CREATE INDEX i ON t (a) extra"),
            Err(ParseError::TrailingInput { found: "extra".into() })
        );
    }
}
