//! `Type: Rating`
//!
//! The star value is kept as written. [`RatingContent::stars`] validates it,
//! so a statement with an out-of-range rating still parses and is rejected
//! only where the value is used.

use crate::{
  Error, Result,
  fields::{FieldWriter, Fields},
};

const KIND: &str = "Rating";
const STARS_SUFFIX: &str = "/5 Stars";

pub const SUBJECT_TYPES: [&str; 6] = [
  "Organisation",
  "Policy proposal",
  "Treaty draft",
  "Research publication",
  "Regulation",
  "Product",
];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RatingContent {
  pub subject_type:       Option<String>,
  pub subject_name:       String,
  /// URL that identifies the subject.
  pub subject_reference:  Option<String>,
  pub document_file_hash: Option<String>,
  pub quality:            Option<String>,
  /// Raw value before `/5 Stars`.
  pub rating:             String,
  pub comment:            Option<String>,
}

impl RatingContent {
  /// The rating as a number of stars from 1 to 5.
  pub fn stars(&self) -> Result<u8> {
    self
      .rating
      .parse::<u8>()
      .ok()
      .filter(|r| (1..=5).contains(r))
      .ok_or_else(|| Error::InvalidRating(self.rating.clone()))
  }
}

fn owned(v: Option<&str>) -> Option<String> { v.map(str::to_owned) }

pub fn parse(content: &str) -> Result<RatingContent> {
  let mut f = Fields::open(KIND, content)?;
  let subject_type = f.optional(1, "Subject type");
  if let Some(t) = subject_type
    && !SUBJECT_TYPES.contains(&t)
  {
    return Err(Error::InvalidValue { field: "Subject type", value: t.to_owned() });
  }

  let v = RatingContent {
    subject_type:       owned(subject_type),
    subject_name:       f.required(1, "Subject name")?.to_owned(),
    subject_reference:  owned(f.optional(1, "URL that identifies the subject")),
    document_file_hash: owned(f.optional(1, "Document file hash")),
    quality:            owned(f.optional(1, "Rated quality")),
    rating:             {
      let raw = f.required(1, "Our rating")?;
      raw.strip_suffix(STARS_SUFFIX).unwrap_or(raw).to_owned()
    },
    comment:            owned(f.optional(1, "Comment")),
  };
  f.finish()?;
  Ok(v)
}

pub fn build(v: &RatingContent) -> Result<String> {
  let stars = v.stars()?;

  let mut w = FieldWriter::new(KIND);
  w.optional(1, "Subject type", v.subject_type.as_deref())?;
  w.field(1, "Subject name", &v.subject_name)?;
  w.optional(1, "URL that identifies the subject", v.subject_reference.as_deref())?;
  w.optional(1, "Document file hash", v.document_file_hash.as_deref())?;
  w.optional(1, "Rated quality", v.quality.as_deref())?;
  w.field(1, "Our rating", &format!("{stars}{STARS_SUFFIX}"))?;
  w.optional(1, "Comment", v.comment.as_deref())?;
  Ok(w.finish())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn rating(stars: &str) -> RatingContent {
    RatingContent {
      subject_type: Some("Organisation".into()),
      subject_name: "Example Inc.".into(),
      subject_reference: Some("https://example.com".into()),
      quality: Some("Customer service".into()),
      rating: stars.into(),
      ..Default::default()
    }
  }

  #[test]
  fn round_trip() {
    let text = build(&rating("4")).unwrap();
    assert!(text.contains("\tOur rating: 4/5 Stars\n"));
    let back = parse(&text).unwrap();
    assert_eq!(back, rating("4"));
    assert_eq!(back.stars().unwrap(), 4);
  }

  #[test]
  fn out_of_range_parses_but_fails_validation() {
    let text = "\n\tType: Rating\n\tSubject name: Example Inc.\n\tOur rating: 7/5 Stars\n";
    let v = parse(text).unwrap();
    assert!(matches!(v.stars(), Err(Error::InvalidRating(r)) if r == "7"));
    let text = "\n\tType: Rating\n\tSubject name: Example Inc.\n\tOur rating: great/5 Stars\n";
    assert!(parse(text).unwrap().stars().is_err());
    assert!(build(&rating("0")).is_err());
  }

  #[test]
  fn subject_name_is_required() {
    let text = "\n\tType: Rating\n\tOur rating: 3/5 Stars\n";
    assert!(matches!(
      parse(text),
      Err(Error::MissingField { kind: "Rating", field: "Subject name" })
    ));
  }

  #[test]
  fn unknown_subject_type() {
    let text = "\n\tType: Rating\n\tSubject type: Weather\n\tSubject name: x\n\tOur rating: 3/5 Stars\n";
    assert!(matches!(parse(text), Err(Error::InvalidValue { field: "Subject type", .. })));
  }
}
