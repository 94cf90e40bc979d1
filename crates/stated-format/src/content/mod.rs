//! Typed content blocks.
//!
//! Each kind has a `parse`/`build` pair over the same fixed field order, and
//! [`TypedContent`] dispatches on the statement type.

pub mod observation;
pub mod organisation;
pub mod person;
pub mod poll;
pub mod rating;
pub mod reference;
pub mod vote;

use stated_core::statement::StatementType;

pub use observation::{BountyContent, BoycottContent, ObservationContent};
pub use organisation::OrganisationVerificationContent;
pub use person::PersonVerificationContent;
pub use poll::{PollContent, PollScope};
pub use rating::RatingContent;
pub use reference::{DisputeContent, ResponseContent, SignPdfContent};
pub use vote::VoteContent;

use crate::Result;

/// The parsed content of a typed statement.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedContent {
  OrganisationVerification(OrganisationVerificationContent),
  PersonVerification(PersonVerificationContent),
  Poll(PollContent),
  Vote(VoteContent),
  Rating(RatingContent),
  Response(ResponseContent),
  DisputeAuthenticity(DisputeContent),
  DisputeContent(DisputeContent),
  SignPdf(SignPdfContent),
  Observation(ObservationContent),
  Boycott(BoycottContent),
  Bounty(BountyContent),
}

impl TypedContent {
  /// Parse `content` as `kind`. Untyped statements have no typed content.
  pub fn parse(kind: StatementType, content: &str) -> Result<Option<Self>> {
    Ok(Some(match kind {
      StatementType::Statement => return Ok(None),
      StatementType::OrganisationVerification => {
        Self::OrganisationVerification(organisation::parse(content)?)
      }
      StatementType::PersonVerification => Self::PersonVerification(person::parse(content)?),
      StatementType::Poll => Self::Poll(poll::parse(content)?),
      StatementType::Vote => Self::Vote(vote::parse(content)?),
      StatementType::Rating => Self::Rating(rating::parse(content)?),
      StatementType::Response => Self::Response(reference::parse_response(content)?),
      StatementType::DisputeStatementAuthenticity => {
        Self::DisputeAuthenticity(reference::parse_dispute_authenticity(content)?)
      }
      StatementType::DisputeStatementContent => {
        Self::DisputeContent(reference::parse_dispute_content(content)?)
      }
      StatementType::SignPdf => Self::SignPdf(reference::parse_sign_pdf(content)?),
      StatementType::Observation => Self::Observation(observation::parse(content)?),
      StatementType::Boycott => Self::Boycott(observation::parse_boycott(content)?),
      StatementType::Bounty => Self::Bounty(observation::parse_bounty(content)?),
    }))
  }

  pub fn statement_type(&self) -> StatementType {
    match self {
      Self::OrganisationVerification(_) => StatementType::OrganisationVerification,
      Self::PersonVerification(_) => StatementType::PersonVerification,
      Self::Poll(_) => StatementType::Poll,
      Self::Vote(_) => StatementType::Vote,
      Self::Rating(_) => StatementType::Rating,
      Self::Response(_) => StatementType::Response,
      Self::DisputeAuthenticity(_) => StatementType::DisputeStatementAuthenticity,
      Self::DisputeContent(_) => StatementType::DisputeStatementContent,
      Self::SignPdf(_) => StatementType::SignPdf,
      Self::Observation(_) => StatementType::Observation,
      Self::Boycott(_) => StatementType::Boycott,
      Self::Bounty(_) => StatementType::Bounty,
    }
  }

  /// Serialise into the content that follows `Statement content: `.
  pub fn build(&self) -> Result<String> {
    match self {
      Self::OrganisationVerification(c) => organisation::build(c),
      Self::PersonVerification(c) => person::build(c),
      Self::Poll(c) => poll::build(c),
      Self::Vote(c) => vote::build(c),
      Self::Rating(c) => rating::build(c),
      Self::Response(c) => reference::build_response(c),
      Self::DisputeAuthenticity(c) => reference::build_dispute_authenticity(c),
      Self::DisputeContent(c) => reference::build_dispute_content(c),
      Self::SignPdf(c) => reference::build_sign_pdf(c),
      Self::Observation(c) => observation::build(c),
      Self::Boycott(c) => observation::build_boycott(c),
      Self::Bounty(c) => observation::build_bounty(c),
    }
  }
}

pub(crate) fn parse_float(v: &str) -> Option<f64> {
  v.parse::<f64>().ok().filter(|f| f.is_finite())
}
