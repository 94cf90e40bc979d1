//! Codec for the plain-text statement format.
//!
//! Parses statement headers and typed content blocks into [`stated_core`]
//! friendly structs, and builds them back. Pure synchronous; no HTTP or
//! database dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! use stated_format::{TypedContent, parse_statement};
//!
//! let text = "Publishing domain: example.com\nAuthor: Example Inc.\n\
//!             Time: Thu, 11 Jan 2024 20:34:02 GMT\nStatement content: hello\n";
//! let fields = parse_statement(text).unwrap();
//! let kind = fields.statement_type().unwrap();
//! let typed = TypedContent::parse(kind, &fields.content).unwrap();
//! assert!(typed.is_none());
//! ```

pub mod content;
pub mod error;
mod fields;
pub mod statement;
pub mod time;

pub use content::TypedContent;
pub use error::{Error, Result};
pub use statement::{
  FORMAT_VERSION, MAX_STATEMENT_LENGTH, StatementFields, build_statement, parse_statement,
};
