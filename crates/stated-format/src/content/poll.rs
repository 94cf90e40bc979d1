//! `Type: Poll`, including the nested `Who can vote:` block.

use chrono::{DateTime, Utc};

use crate::{
  Error, Result,
  fields::{FieldWriter, Fields},
  time::{format_time, parse_time},
};

const KIND: &str = "Poll";
const OPTION_KEYS: [&str; 5] = ["Option 1", "Option 2", "Option 3", "Option 4", "Option 5"];
const JUDGES: &str = "The poll outcome is finalized when the following nodes agree";

#[derive(Debug, Clone, PartialEq)]
pub struct PollContent {
  pub judges:               Option<String>,
  pub deadline:             DateTime<Utc>,
  pub poll:                 String,
  /// At most five.
  pub options:              Vec<String>,
  pub allow_arbitrary_vote: Option<bool>,
  pub scope:                Option<PollScope>,
}

/// Who may vote. Every unset field is unrestricted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PollScope {
  pub description:                String,
  pub country:                    Option<String>,
  pub city:                       Option<String>,
  pub legal_entity:               Option<String>,
  pub domain_scope:               Vec<String>,
  pub required_property:          Option<String>,
  pub required_property_value:    Option<String>,
  pub required_property_observer: Option<String>,
  pub scope_query_link:           Option<String>,
}

fn owned(v: Option<&str>) -> Option<String> { v.map(str::to_owned) }

pub fn parse(content: &str) -> Result<PollContent> {
  let mut f = Fields::open(KIND, content)?;
  let judges = owned(f.optional(1, JUDGES));
  let deadline = parse_time(f.required(1, "Voting deadline")?)?;
  let poll = f.required(1, "Poll")?.to_owned();
  let options = OPTION_KEYS
    .into_iter()
    .filter_map(|k| f.optional(1, k))
    .map(str::to_owned)
    .collect();
  let allow_arbitrary_vote = f.optional_parsed(1, "Allow free text votes", |v| match v {
    "Yes" => Some(true),
    "No" => Some(false),
    _ => None,
  })?;
  let scope = if f.block(1, "Who can vote") { Some(parse_scope(&mut f)?) } else { None };
  f.finish()?;

  Ok(PollContent { judges, deadline, poll, options, allow_arbitrary_vote, scope })
}

fn parse_scope(f: &mut Fields<'_>) -> Result<PollScope> {
  Ok(PollScope {
    description:                f.required(2, "Description")?.to_owned(),
    country:                    owned(f.optional(2, "Country scope")),
    city:                       owned(f.optional(2, "City scope")),
    legal_entity:               owned(f.optional(2, "Legal form scope")),
    domain_scope:               f
      .optional(2, "Domain scope")
      .map(|d| d.split(", ").filter(|d| !d.is_empty()).map(str::to_owned).collect())
      .unwrap_or_default(),
    required_property:          owned(f.optional(2, "All entities with the following property")),
    required_property_value:    owned(f.optional(2, "Property value")),
    required_property_observer: owned(f.optional(2, "As observed by")),
    scope_query_link:           owned(f.optional(2, "Link to query defining who can vote")),
  })
}

pub fn build(p: &PollContent) -> Result<String> {
  if p.options.len() > OPTION_KEYS.len() {
    return Err(Error::InvalidValue { field: "Option 5", value: p.options.join(", ") });
  }

  let mut w = FieldWriter::new(KIND);
  w.optional(1, JUDGES, p.judges.as_deref())?;
  w.field(1, "Voting deadline", &format_time(p.deadline))?;
  w.field(1, "Poll", &p.poll)?;
  for (key, option) in OPTION_KEYS.into_iter().zip(&p.options) {
    w.field(1, key, option)?;
  }
  if let Some(allow) = p.allow_arbitrary_vote {
    w.field(1, "Allow free text votes", if allow { "Yes" } else { "No" })?;
  }

  if let Some(s) = &p.scope {
    w.block(1, "Who can vote");
    w.field(2, "Description", &s.description)?;
    w.optional(2, "Country scope", s.country.as_deref())?;
    w.optional(2, "City scope", s.city.as_deref())?;
    w.optional(2, "Legal form scope", s.legal_entity.as_deref())?;
    if !s.domain_scope.is_empty() {
      w.field(2, "Domain scope", &s.domain_scope.join(", "))?;
    }
    w.optional(2, "All entities with the following property", s.required_property.as_deref())?;
    w.optional(2, "Property value", s.required_property_value.as_deref())?;
    w.optional(2, "As observed by", s.required_property_observer.as_deref())?;
    w.optional(2, "Link to query defining who can vote", s.scope_query_link.as_deref())?;
  }

  Ok(w.finish())
}
