//! `Type: Organisation verification`

use super::parse_float;
use crate::{
  Error, Result,
  fields::{FieldWriter, Fields},
};

const KIND: &str = "Organisation verification";
const DESCRIPTION: &str = "We verified the following information about an organisation.";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrganisationVerificationContent {
  /// Full name as in the business register.
  pub name:               String,
  pub english_name:       Option<String>,
  pub country:            String,
  pub legal_form:         String,
  /// The domain the organisation owns.
  pub domain:             Option<String>,
  /// A domain the organisation publishes from without owning it.
  pub foreign_domain:     Option<String>,
  pub department:         Option<String>,
  pub province:           Option<String>,
  pub serial_number:      Option<String>,
  pub city:               Option<String>,
  pub latitude:           Option<f64>,
  pub longitude:          Option<f64>,
  pub population:         Option<String>,
  pub logo:               Option<String>,
  pub employee_count:     Option<String>,
  pub reliability_policy: Option<String>,
  pub confidence:         Option<f64>,
}

fn owned(v: Option<&str>) -> Option<String> { v.map(str::to_owned) }

pub fn parse(content: &str) -> Result<OrganisationVerificationContent> {
  let mut f = Fields::open(KIND, content)?;
  let description = f.required(1, "Description")?;
  if description != DESCRIPTION {
    return Err(Error::InvalidValue { field: "Description", value: description.to_owned() });
  }

  let v = OrganisationVerificationContent {
    name:               f.required(1, "Name")?.to_owned(),
    english_name:       owned(f.optional(1, "English name")),
    country:            f.required(1, "Country")?.to_owned(),
    legal_form:         f.required_any(1, &["Legal form", "Legal entity"])?.to_owned(),
    domain:             owned(f.optional(1, "Owner of the domain")),
    foreign_domain:     owned(f.optional(1, "Foreign domain used for publishing statements")),
    department:         owned(f.optional(1, "Department using the domain")),
    province:           owned(f.optional(1, "Province or state")),
    serial_number:      owned(f.optional(1, "Business register number")),
    city:               owned(f.optional(1, "City")),
    latitude:           f.optional_parsed(1, "Latitude", parse_float)?,
    longitude:          f.optional_parsed(1, "Longitude", parse_float)?,
    population:         owned(f.optional(1, "Population")),
    logo:               owned(f.optional(1, "Logo")),
    employee_count:     owned(f.optional(1, "Employee count")),
    reliability_policy: owned(f.optional(1, "Reliability policy")),
    confidence:         f.optional_parsed(1, "Confidence", parse_float)?,
  };
  f.finish()?;
  Ok(v)
}

pub fn build(v: &OrganisationVerificationContent) -> Result<String> {
  if v.domain.is_none() && v.foreign_domain.is_none() {
    return Err(Error::MissingField { kind: KIND, field: "Owner of the domain" });
  }

  let mut w = FieldWriter::new(KIND);
  w.field(1, "Description", DESCRIPTION)?;
  w.field(1, "Name", &v.name)?;
  w.optional(1, "English name", v.english_name.as_deref())?;
  w.field(1, "Country", &v.country)?;
  w.field(1, "Legal form", &v.legal_form)?;
  w.optional(1, "Owner of the domain", v.domain.as_deref())?;
  w.optional(1, "Foreign domain used for publishing statements", v.foreign_domain.as_deref())?;
  w.optional(1, "Department using the domain", v.department.as_deref())?;
  w.optional(1, "Province or state", v.province.as_deref())?;
  w.optional(1, "Business register number", v.serial_number.as_deref())?;
  w.optional(1, "City", v.city.as_deref())?;
  w.optional(1, "Latitude", v.latitude.map(|l| l.to_string()).as_deref())?;
  w.optional(1, "Longitude", v.longitude.map(|l| l.to_string()).as_deref())?;
  w.optional(1, "Population", v.population.as_deref())?;
  w.optional(1, "Logo", v.logo.as_deref())?;
  w.optional(1, "Employee count", v.employee_count.as_deref())?;
  w.optional(1, "Reliability policy", v.reliability_policy.as_deref())?;
  w.optional(1, "Confidence", v.confidence.map(|c| c.to_string()).as_deref())?;
  Ok(w.finish())
}
