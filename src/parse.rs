//! Parser for small declarative fragments such as index definitions.
//!
//! This is not a SQL parser. It reads identifiers, keyword sequences and
//! parenthesized identifier lists through the combinators in
//! [`combinators`], which work on a [`Cursor`] that can be rewound.

pub mod combinators;
pub mod cursor;
pub mod error;
pub mod index;

pub use cursor::{Cursor, Mark};
pub use error::{ParseError, ParseResult};
pub use index::{parse_create_index, parse_index_expressions, CreateIndex};
