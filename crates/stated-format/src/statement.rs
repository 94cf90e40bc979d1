//! Statement header parser and builder.
//!
//! ```text
//! Publishing domain: example.com
//! Author: Example Inc.
//! Time: Thu, 11 Jan 2024 20:34:02 GMT
//! Tags: a, b
//! Format version: 4
//! Statement content: <free text, or a typed block starting on the next line>
//! ```

use chrono::{DateTime, Utc};
use stated_core::statement::StatementType;

use crate::{
  Error, Result,
  time::{format_time, parse_time},
};

pub const MAX_STATEMENT_LENGTH: usize = 3000;
pub const FORMAT_VERSION: &str = "4";

const CONTENT_MARKER: &str = "Statement content:";

/// The header fields and raw content of a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementFields {
  pub domain:               String,
  pub author:               String,
  pub representative:       Option<String>,
  pub time:                 DateTime<Utc>,
  pub tags:                 Vec<String>,
  pub superseded_statement: Option<String>,
  pub format_version:       Option<String>,
  /// Everything after the content marker. Typed blocks start with `\n`.
  pub content:              String,
}

impl StatementFields {
  /// A current-format statement with no optional header fields.
  pub fn new(
    domain: impl Into<String>,
    author: impl Into<String>,
    time: DateTime<Utc>,
    content: impl Into<String>,
  ) -> Self {
    Self {
      domain: domain.into(),
      author: author.into(),
      representative: None,
      time,
      tags: Vec::new(),
      superseded_statement: None,
      format_version: Some(FORMAT_VERSION.to_owned()),
      content: content.into(),
    }
  }

  /// The label on the content's `Type:` line, if the content is typed.
  pub fn type_name(&self) -> Option<&str> {
    let rest = self.content.strip_prefix("\n\tType: ")?;
    Some(rest.split('\n').next().unwrap_or(rest))
  }

  /// Resolve the content type. Untyped content is
  /// [`StatementType::Statement`]; an unknown label is `None`.
  pub fn statement_type(&self) -> Option<StatementType> {
    match self.type_name() {
      None => Some(StatementType::Statement),
      Some(name) => StatementType::from_type_name(name),
    }
  }
}

// ─── Parsing ─────────────────────────────────────────────────────────────────

fn check_shape(text: &str) -> Result<()> {
  if text.chars().count() > MAX_STATEMENT_LENGTH {
    return Err(Error::TooLong { max: MAX_STATEMENT_LENGTH });
  }
  if text.contains("\n\n") {
    return Err(Error::EmptyLine);
  }
  Ok(())
}

/// Reads header lines in their fixed order.
struct Header<'a> {
  lines: std::iter::Peekable<std::str::Split<'a, char>>,
}

impl<'a> Header<'a> {
  fn optional(&mut self, key: &str) -> Option<&'a str> {
    let value = self
      .lines
      .peek()
      .copied()
      .and_then(|l| l.strip_prefix(key))
      .and_then(|l| l.strip_prefix(": "))?;
    self.lines.next();
    (!value.is_empty()).then_some(value)
  }

  fn required(&mut self, key: &'static str) -> Result<&'a str> {
    self.optional(key).ok_or(Error::MissingHeader(key))
  }
}

/// Parse a full statement text.
pub fn parse_statement(text: &str) -> Result<StatementFields> {
  check_shape(text)?;

  let (header, content) = if let Some(rest) = text.strip_prefix(CONTENT_MARKER) {
    ("", rest)
  } else {
    text
      .split_once(&format!("\n{CONTENT_MARKER}"))
      .ok_or(Error::MissingContent)?
  };
  let content = content.strip_prefix(' ').unwrap_or(content);
  if content.trim().is_empty() {
    return Err(Error::EmptyContent);
  }

  let mut h = Header { lines: header.split('\n').peekable() };
  let domain = h.required("Publishing domain")?;
  let author = h.required("Author")?;
  let representative = h.optional("Authorized signing representative");
  let time = parse_time(h.required("Time")?)?;
  let tags = h
    .optional("Tags")
    .map(|t| t.split(", ").filter(|t| !t.is_empty()).map(str::to_owned).collect())
    .unwrap_or_default();
  let superseded_statement = h.optional("Superseded statement");
  let format_version = h.optional("Format version");
  if let Some(line) = h.lines.next() {
    return Err(Error::UnexpectedHeader(line.to_owned()));
  }

  Ok(StatementFields {
    domain: domain.to_owned(),
    author: author.to_owned(),
    representative: representative.map(str::to_owned),
    time,
    tags,
    superseded_statement: superseded_statement.map(str::to_owned),
    format_version: format_version.map(str::to_owned),
    content: content.to_owned(),
  })
}

// ─── Building ────────────────────────────────────────────────────────────────

fn header_line(out: &mut String, key: &'static str, value: &str) -> Result<()> {
  if value.is_empty() || value.contains('\n') {
    return Err(Error::InvalidValue { field: key, value: value.to_owned() });
  }
  out.push_str(key);
  out.push_str(": ");
  out.push_str(value);
  out.push('\n');
  Ok(())
}

/// Serialise a statement. A trailing newline is added to the content if it
/// lacks one.
pub fn build_statement(s: &StatementFields) -> Result<String> {
  let mut out = String::new();
  header_line(&mut out, "Publishing domain", &s.domain)?;
  header_line(&mut out, "Author", &s.author)?;
  if let Some(r) = &s.representative {
    header_line(&mut out, "Authorized signing representative", r)?;
  }
  header_line(&mut out, "Time", &format_time(s.time))?;
  if !s.tags.is_empty() {
    if s.tags.iter().any(|t| t.is_empty() || t.contains(", ")) {
      return Err(Error::InvalidValue { field: "Tags", value: s.tags.join(", ") });
    }
    header_line(&mut out, "Tags", &s.tags.join(", "))?;
  }
  if let Some(h) = &s.superseded_statement {
    header_line(&mut out, "Superseded statement", h)?;
  }
  if let Some(v) = &s.format_version {
    header_line(&mut out, "Format version", v)?;
  }

  if s.content.trim().is_empty() {
    return Err(Error::EmptyContent);
  }
  out.push_str(CONTENT_MARKER);
  out.push(' ');
  out.push_str(&s.content);
  if !s.content.ends_with('\n') {
    out.push('\n');
  }

  check_shape(&out)?;
  Ok(out)
}
