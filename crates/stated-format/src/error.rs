//! Error types for the statement codec.
//!
//! Structural errors (a line that is not `Key: value`, an empty line, an
//! unknown field) are kept apart from a field that is simply missing, so
//! callers can tell a truncated statement from a garbled one.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("statement exceeds {max} characters")]
  TooLong { max: usize },

  #[error("statement must not contain an empty line")]
  EmptyLine,

  #[error("missing header field {0:?}")]
  MissingHeader(&'static str),

  #[error("unexpected header line {0:?}")]
  UnexpectedHeader(String),

  #[error("missing `Statement content:` marker")]
  MissingContent,

  #[error("statement content is empty")]
  EmptyContent,

  #[error("invalid time {0:?}")]
  InvalidTime(String),

  #[error("malformed content line {line}: {text:?}")]
  MalformedLine { line: usize, text: String },

  #[error("{kind}: missing required field {field:?}")]
  MissingField { kind: &'static str, field: &'static str },

  #[error("{kind}: unexpected field {field:?} on line {line}")]
  UnexpectedField { kind: &'static str, field: String, line: usize },

  #[error("expected content of type {expected:?}, found {found:?}")]
  WrongType { expected: &'static str, found: String },

  #[error("invalid value for {field:?}: {value:?}")]
  InvalidValue { field: &'static str, value: String },

  /// Ratings outside 1..=5 are a validation failure; the statement itself
  /// still parses.
  #[error("invalid rating {0:?}: expected an integer from 1 to 5")]
  InvalidRating(String),
}

impl Error {
  pub fn is_missing_field(&self) -> bool {
    matches!(
      self,
      Self::MissingField { .. } | Self::MissingHeader(_) | Self::MissingContent
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
