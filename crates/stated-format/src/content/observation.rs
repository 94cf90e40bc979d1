//! Kinds that make claims about a third party: observations, boycotts and
//! bounties.

use super::parse_float;
use crate::{
  Result,
  fields::{FieldWriter, Fields},
};

const OBSERVATION: &str = "Observation";
const BOYCOTT: &str = "Boycott";
const BOUNTY: &str = "Bounty";

/// An observed property of a subject. Polls may require voters to have one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObservationContent {
  pub approach:              Option<String>,
  pub confidence:            Option<f64>,
  pub reliability_policy:    Option<String>,
  pub subject:               String,
  /// Hash of a verification statement identifying the subject.
  pub subject_reference:     Option<String>,
  pub observation_reference: Option<String>,
  pub property:              String,
  pub value:                 Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BoycottContent {
  pub description:       Option<String>,
  pub subject:           String,
  pub subject_reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BountyContent {
  pub motivation: Option<String>,
  pub bounty:     String,
  pub reward:     String,
  pub judge:      String,
  pub judge_pay:  Option<String>,
}

fn owned(v: Option<&str>) -> Option<String> { v.map(str::to_owned) }

// ─── Observation ─────────────────────────────────────────────────────────────

pub fn parse(content: &str) -> Result<ObservationContent> {
  let mut f = Fields::open(OBSERVATION, content)?;
  let v = ObservationContent {
    approach:              owned(f.optional(1, "Approach")),
    confidence:            f.optional_parsed(1, "Confidence", parse_float)?,
    reliability_policy:    owned(f.optional(1, "Reliability policy")),
    subject:               f.required(1, "Subject")?.to_owned(),
    subject_reference:     owned(f.optional(1, "Subject identity reference")),
    observation_reference: owned(f.optional(1, "Observation reference")),
    property:              f.required(1, "Observed property")?.to_owned(),
    value:                 owned(f.optional(1, "Observed value")),
  };
  f.finish()?;
  Ok(v)
}

pub fn build(v: &ObservationContent) -> Result<String> {
  let mut w = FieldWriter::new(OBSERVATION);
  w.optional(1, "Approach", v.approach.as_deref())?;
  w.optional(1, "Confidence", v.confidence.map(|c| c.to_string()).as_deref())?;
  w.optional(1, "Reliability policy", v.reliability_policy.as_deref())?;
  w.field(1, "Subject", &v.subject)?;
  w.optional(1, "Subject identity reference", v.subject_reference.as_deref())?;
  w.optional(1, "Observation reference", v.observation_reference.as_deref())?;
  w.field(1, "Observed property", &v.property)?;
  w.optional(1, "Observed value", v.value.as_deref())?;
  Ok(w.finish())
}

// ─── Boycott ─────────────────────────────────────────────────────────────────

pub fn parse_boycott(content: &str) -> Result<BoycottContent> {
  let mut f = Fields::open(BOYCOTT, content)?;
  let v = BoycottContent {
    description:       owned(f.optional(1, "Description")),
    subject:           f.required(1, "Subject")?.to_owned(),
    subject_reference: owned(f.optional(1, "Subject identity reference")),
  };
  f.finish()?;
  Ok(v)
}

pub fn build_boycott(v: &BoycottContent) -> Result<String> {
  let mut w = FieldWriter::new(BOYCOTT);
  w.optional(1, "Description", v.description.as_deref())?;
  w.field(1, "Subject", &v.subject)?;
  w.optional(1, "Subject identity reference", v.subject_reference.as_deref())?;
  Ok(w.finish())
}

// ─── Bounty ──────────────────────────────────────────────────────────────────

pub fn parse_bounty(content: &str) -> Result<BountyContent> {
  let mut f = Fields::open(BOUNTY, content)?;
  let v = BountyContent {
    motivation: owned(f.optional(1, "In order to")),
    bounty:     f.required(1, "We will reward any entity that")?.to_owned(),
    reward:     f.required(1, "The reward is")?.to_owned(),
    judge:      f.required(1, "In case of dispute, bounty claims are judged by")?.to_owned(),
    judge_pay:  owned(
      f.optional(1, "The judge will be paid per investigated case with a maxium of"),
    ),
  };
  f.finish()?;
  Ok(v)
}

pub fn build_bounty(v: &BountyContent) -> Result<String> {
  let mut w = FieldWriter::new(BOUNTY);
  w.optional(1, "In order to", v.motivation.as_deref())?;
  w.field(1, "We will reward any entity that", &v.bounty)?;
  w.field(1, "The reward is", &v.reward)?;
  w.field(1, "In case of dispute, bounty claims are judged by", &v.judge)?;
  w.optional(
    1,
    "The judge will be paid per investigated case with a maxium of",
    v.judge_pay.as_deref(),
  )?;
  Ok(w.finish())
}
