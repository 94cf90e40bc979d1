//! `Type: Person verification`

use chrono::NaiveDate;

use super::parse_float;
use crate::{
  Error, Result,
  fields::{FieldWriter, Fields},
  time::{format_birth_date, parse_birth_date},
};

const KIND: &str = "Person verification";
const DESCRIPTION: &str = "We verified the following information about a person.";

#[derive(Debug, Clone, PartialEq)]
pub struct PersonVerificationContent {
  pub name:                String,
  pub date_of_birth:       NaiveDate,
  pub city_of_birth:       String,
  pub country_of_birth:    String,
  pub job_title:           Option<String>,
  pub employer:            Option<String>,
  pub domain:              Option<String>,
  pub foreign_domain:      Option<String>,
  pub picture:             Option<String>,
  pub verification_method: Option<String>,
  pub confidence:          Option<f64>,
  pub reliability_policy:  Option<String>,
}

fn owned(v: Option<&str>) -> Option<String> { v.map(str::to_owned) }

pub fn parse(content: &str) -> Result<PersonVerificationContent> {
  let mut f = Fields::open(KIND, content)?;
  let description = f.required(1, "Description")?;
  if description != DESCRIPTION {
    return Err(Error::InvalidValue { field: "Description", value: description.to_owned() });
  }

  let v = PersonVerificationContent {
    name:                f.required(1, "Name")?.to_owned(),
    date_of_birth:       parse_birth_date(f.required(1, "Date of birth")?)?,
    city_of_birth:       f.required(1, "City of birth")?.to_owned(),
    country_of_birth:    f.required(1, "Country of birth")?.to_owned(),
    job_title:           owned(f.optional(1, "Job title")),
    employer:            owned(f.optional(1, "Employer")),
    domain:              owned(f.optional(1, "Owner of the domain")),
    foreign_domain:      owned(f.optional(1, "Foreign domain used for publishing statements")),
    picture:             owned(f.optional(1, "Picture")),
    verification_method: owned(f.optional(1, "Verification method")),
    confidence:          f.optional_parsed(1, "Confidence", parse_float)?,
    reliability_policy:  owned(f.optional(1, "Reliability policy")),
  };
  f.finish()?;
  Ok(v)
}

pub fn build(v: &PersonVerificationContent) -> Result<String> {
  if v.domain.is_none() && v.foreign_domain.is_none() {
    return Err(Error::MissingField { kind: KIND, field: "Owner of the domain" });
  }

  let mut w = FieldWriter::new(KIND);
  w.field(1, "Description", DESCRIPTION)?;
  w.field(1, "Name", &v.name)?;
  w.field(1, "Date of birth", &format_birth_date(v.date_of_birth))?;
  w.field(1, "City of birth", &v.city_of_birth)?;
  w.field(1, "Country of birth", &v.country_of_birth)?;
  w.optional(1, "Job title", v.job_title.as_deref())?;
  w.optional(1, "Employer", v.employer.as_deref())?;
  w.optional(1, "Owner of the domain", v.domain.as_deref())?;
  w.optional(1, "Foreign domain used for publishing statements", v.foreign_domain.as_deref())?;
  w.optional(1, "Picture", v.picture.as_deref())?;
  w.optional(1, "Verification method", v.verification_method.as_deref())?;
  w.optional(1, "Confidence", v.confidence.map(|c| c.to_string()).as_deref())?;
  w.optional(1, "Reliability policy", v.reliability_policy.as_deref())?;
  Ok(w.finish())
}
