//! `Type: Vote`

use crate::{
  Result,
  fields::{FieldWriter, Fields},
};

const KIND: &str = "Vote";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteContent {
  /// Hash of the poll statement.
  pub poll_hash: String,
  /// The poll question, repeated for readability.
  pub poll:      String,
  pub option:    String,
}

pub fn parse(content: &str) -> Result<VoteContent> {
  let mut f = Fields::open(KIND, content)?;
  let poll_hash = f.required(1, "Poll id")?;
  let poll = f.required(1, "Poll")?;
  let option = f.required(1, "Option")?;
  f.finish()?;
  Ok(VoteContent { poll_hash: poll_hash.into(), poll: poll.into(), option: option.into() })
}

pub fn build(v: &VoteContent) -> Result<String> {
  let mut w = FieldWriter::new(KIND);
  w.field(1, "Poll id", &v.poll_hash)?;
  w.field(1, "Poll", &v.poll)?;
  w.field(1, "Option", &v.option)?;
  Ok(w.finish())
}
