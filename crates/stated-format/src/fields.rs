//! Line tokenizer and field cursor for typed content blocks.
//!
//! A typed block looks like
//!
//! ```text
//! \n\tType: Poll\n\tPoll: Is this a boring poll?\n\tWho can vote:\n\t\tDescription: Everyone\n
//! ```
//!
//! [`tokenize`] turns it into a flat list of `(depth, key, value)` lines.
//! [`Fields`] then walks that list in a fixed field order: an optional field
//! is consumed only if it is next, a required field that is not next is
//! reported as missing, and anything left over is an unexpected field.

use crate::{Error, Result};

/// One `Key: value` line of a content block. `depth` is the number of
/// leading tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Line<'a> {
  pub depth:  usize,
  pub key:    &'a str,
  pub value:  &'a str,
  pub number: usize,
}

/// Split a content block into lines. The block must start with a newline
/// and every line must be indented and of the form `Key: value` (or `Key:`
/// for a line that opens a nested block).
pub(crate) fn tokenize(content: &str) -> Result<Vec<Line<'_>>> {
  let body = content.strip_prefix('\n').ok_or_else(|| Error::MalformedLine {
    line: 0,
    text: content.lines().next().unwrap_or_default().to_owned(),
  })?;
  let body = body.strip_suffix('\n').unwrap_or(body);

  body
    .split('\n')
    .enumerate()
    .map(|(i, raw)| {
      let number = i + 1;
      let malformed = || Error::MalformedLine { line: number, text: raw.to_owned() };

      let rest = raw.trim_start_matches('\t');
      let depth = raw.len() - rest.len();
      if depth == 0 {
        return Err(malformed());
      }

      let (key, value) = match rest.split_once(": ") {
        Some((key, value)) => (key, value),
        None => (rest.strip_suffix(':').ok_or_else(malformed)?, ""),
      };
      if key.is_empty() {
        return Err(malformed());
      }

      Ok(Line { depth, key, value, number })
    })
    .collect()
}

// ─── Reading ─────────────────────────────────────────────────────────────────

/// Cursor over the lines of one typed block.
pub(crate) struct Fields<'a> {
  kind:  &'static str,
  lines: Vec<Line<'a>>,
  pos:   usize,
}

impl<'a> Fields<'a> {
  /// Tokenize `content` and consume its `Type:` line, which must name
  /// `kind`.
  pub fn open(kind: &'static str, content: &'a str) -> Result<Self> {
    let lines = tokenize(content)?;
    let first = lines.first().map(|l| (l.depth, l.key, l.value));
    match first {
      Some((1, "Type", found)) if found == kind => Ok(Self { kind, lines, pos: 1 }),
      Some((1, "Type", found)) => {
        Err(Error::WrongType { expected: kind, found: found.to_owned() })
      }
      _ => Err(Error::MissingField { kind, field: "Type" }),
    }
  }

  fn peek(&self) -> Option<&Line<'a>> { self.lines.get(self.pos) }

  fn next_is(&self, depth: usize, key: &str) -> bool {
    self.peek().is_some_and(|l| l.depth == depth && l.key == key)
  }

  /// Consume the next line if it is `key`. Empty values count as absent.
  pub fn optional(&mut self, depth: usize, key: &str) -> Option<&'a str> {
    if !self.next_is(depth, key) {
      return None;
    }
    let value = self.lines[self.pos].value;
    self.pos += 1;
    (!value.is_empty()).then_some(value)
  }

  /// Like [`Fields::optional`], accepting any of several spellings.
  pub fn optional_any(&mut self, depth: usize, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| self.optional(depth, k))
  }

  pub fn required(&mut self, depth: usize, key: &'static str) -> Result<&'a str> {
    self
      .optional(depth, key)
      .ok_or(Error::MissingField { kind: self.kind, field: key })
  }

  pub fn required_any(&mut self, depth: usize, keys: &[&'static str]) -> Result<&'a str> {
    self
      .optional_any(depth, keys)
      .ok_or(Error::MissingField { kind: self.kind, field: keys[0] })
  }

  /// Consume a line that opens a nested block, e.g. `Who can vote:`.
  pub fn block(&mut self, depth: usize, key: &str) -> bool {
    if self.next_is(depth, key) {
      self.pos += 1;
      true
    } else {
      false
    }
  }

  /// Parse an optional value with `parse`, reporting failures against `key`.
  pub fn optional_parsed<T>(
    &mut self,
    depth: usize,
    key: &'static str,
    parse: impl FnOnce(&str) -> Option<T>,
  ) -> Result<Option<T>> {
    self
      .optional(depth, key)
      .map(|v| parse(v).ok_or_else(|| Error::InvalidValue { field: key, value: v.to_owned() }))
      .transpose()
  }

  /// Fail if any line was not consumed.
  pub fn finish(self) -> Result<()> {
    match self.peek() {
      None => Ok(()),
      Some(l) => Err(Error::UnexpectedField {
        kind:  self.kind,
        field: l.key.to_owned(),
        line:  l.number,
      }),
    }
  }
}

// ─── Writing ─────────────────────────────────────────────────────────────────

/// Builds a typed block in the same layout [`Fields`] reads.
pub(crate) struct FieldWriter {
  out: String,
}

impl FieldWriter {
  pub fn new(kind: &str) -> Self { Self { out: format!("\n\tType: {kind}\n") } }

  pub fn field(&mut self, depth: usize, key: &'static str, value: &str) -> Result<()> {
    if value.is_empty() || value.contains('\n') {
      return Err(Error::InvalidValue { field: key, value: value.to_owned() });
    }
    for _ in 0..depth {
      self.out.push('\t');
    }
    self.out.push_str(key);
    self.out.push_str(": ");
    self.out.push_str(value);
    self.out.push('\n');
    Ok(())
  }

  pub fn optional(&mut self, depth: usize, key: &'static str, value: Option<&str>) -> Result<()> {
    match value {
      Some(v) => self.field(depth, key, v),
      None => Ok(()),
    }
  }

  pub fn block(&mut self, depth: usize, key: &str) {
    for _ in 0..depth {
      self.out.push('\t');
    }
    self.out.push_str(key);
    self.out.push_str(":\n");
  }

  pub fn finish(self) -> String { self.out }
}
