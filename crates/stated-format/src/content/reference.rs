//! Kinds that point at another statement or document: disputes, responses
//! and PDF signatures.

use super::parse_float;
use crate::{
  Error, Result,
  fields::{FieldWriter, Fields},
};

const DISPUTE_AUTHENTICITY: &str = "Dispute statement authenticity";
const DISPUTE_AUTHENTICITY_DESCRIPTION: &str =
  "We think that the referenced statement is not authentic.";
const DISPUTE_CONTENT: &str = "Dispute statement content";
const DISPUTE_CONTENT_DESCRIPTION: &str =
  "We think that the content of the referenced statement is false.";
const RESPONSE: &str = "Response";
const SIGN_PDF: &str = "Sign PDF";
const SIGN_PDF_DESCRIPTION: &str = "We hereby digitally sign the referenced PDF file.";

/// Shared shape of both dispute kinds.
#[derive(Debug, Clone, PartialEq)]
pub struct DisputeContent {
  /// Hash of the disputed statement.
  pub hash:               String,
  pub confidence:         Option<f64>,
  pub reliability_policy: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseContent {
  pub hash:     String,
  pub response: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignPdfContent {
  /// Content address of the PDF file.
  pub hash: String,
}

fn expect_description(f: &mut Fields<'_>, text: &str) -> Result<()> {
  let found = f.required(1, "Description")?;
  if found != text {
    return Err(Error::InvalidValue { field: "Description", value: found.to_owned() });
  }
  Ok(())
}

// ─── Disputes ────────────────────────────────────────────────────────────────

fn parse_dispute(kind: &'static str, description: &str, content: &str) -> Result<DisputeContent> {
  let mut f = Fields::open(kind, content)?;
  expect_description(&mut f, description)?;
  let v = DisputeContent {
    hash:               f.required(1, "Hash of referenced statement")?.to_owned(),
    confidence:         f.optional_parsed(1, "Confidence", parse_float)?,
    reliability_policy: f.optional(1, "Reliability policy").map(str::to_owned),
  };
  f.finish()?;
  Ok(v)
}

fn build_dispute(kind: &str, description: &str, v: &DisputeContent) -> Result<String> {
  let mut w = FieldWriter::new(kind);
  w.field(1, "Description", description)?;
  w.field(1, "Hash of referenced statement", &v.hash)?;
  w.optional(1, "Confidence", v.confidence.map(|c| c.to_string()).as_deref())?;
  w.optional(1, "Reliability policy", v.reliability_policy.as_deref())?;
  Ok(w.finish())
}

pub fn parse_dispute_authenticity(content: &str) -> Result<DisputeContent> {
  parse_dispute(DISPUTE_AUTHENTICITY, DISPUTE_AUTHENTICITY_DESCRIPTION, content)
}

pub fn build_dispute_authenticity(v: &DisputeContent) -> Result<String> {
  build_dispute(DISPUTE_AUTHENTICITY, DISPUTE_AUTHENTICITY_DESCRIPTION, v)
}

pub fn parse_dispute_content(content: &str) -> Result<DisputeContent> {
  parse_dispute(DISPUTE_CONTENT, DISPUTE_CONTENT_DESCRIPTION, content)
}

pub fn build_dispute_content(v: &DisputeContent) -> Result<String> {
  build_dispute(DISPUTE_CONTENT, DISPUTE_CONTENT_DESCRIPTION, v)
}

// ─── Response ────────────────────────────────────────────────────────────────

pub fn parse_response(content: &str) -> Result<ResponseContent> {
  let mut f = Fields::open(RESPONSE, content)?;
  let v = ResponseContent {
    hash:     f.required(1, "Hash of referenced statement")?.to_owned(),
    response: f.required(1, "Response")?.to_owned(),
  };
  f.finish()?;
  Ok(v)
}

pub fn build_response(v: &ResponseContent) -> Result<String> {
  let mut w = FieldWriter::new(RESPONSE);
  w.field(1, "Hash of referenced statement", &v.hash)?;
  w.field(1, "Response", &v.response)?;
  Ok(w.finish())
}

// ─── PDF signing ─────────────────────────────────────────────────────────────

pub fn parse_sign_pdf(content: &str) -> Result<SignPdfContent> {
  let mut f = Fields::open(SIGN_PDF, content)?;
  expect_description(&mut f, SIGN_PDF_DESCRIPTION)?;
  let hash = f.required(1, "PDF file hash")?.to_owned();
  f.finish()?;
  Ok(SignPdfContent { hash })
}

pub fn build_sign_pdf(v: &SignPdfContent) -> Result<String> {
  let mut w = FieldWriter::new(SIGN_PDF);
  w.field(1, "Description", SIGN_PDF_DESCRIPTION)?;
  w.field(1, "PDF file hash", &v.hash)?;
  Ok(w.finish())
}
