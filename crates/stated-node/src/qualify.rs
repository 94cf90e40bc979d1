//! Whether a vote counts toward its poll's tally, and whether a rating counts.
//!
//! A vote qualifies when it was cast by the deadline, picks an allowed
//! option, comes from a verified entity inside the poll's scope, carries any
//! observation the poll requires, and is that entity's first vote on the poll.

use stated_core::{
  entity::{
    ObservationQuery, OrganisationVerification, Poll, Rating, RatingFilter, Vote, VoteFilter,
  },
  statement::Statement,
  store::StatementStore,
};
use stated_format::content::observation;

pub fn within_deadline(vote: &Vote, poll: &Poll) -> bool {
  vote.proclaimed_publication_time <= poll.deadline
}

/// Free-text answers are allowed unless the poll says otherwise.
pub fn option_allowed(vote: &Vote, poll: &Poll) -> bool {
  poll.allow_arbitrary_vote != Some(false) || poll.options.iter().any(|o| *o == vote.option)
}

fn scope_matches(scope: Option<&str>, value: Option<&str>) -> bool {
  match scope {
    None => true,
    Some(scope) => value.is_some_and(|v| v.eq_ignore_ascii_case(scope)),
  }
}

pub fn organisation_in_scope(v: &OrganisationVerification, poll: &Poll) -> bool {
  scope_matches(poll.participants_entity_type.as_deref(), Some(&v.legal_entity_type))
    && scope_matches(poll.participants_country.as_deref(), Some(&v.country))
    && scope_matches(poll.participants_city.as_deref(), v.city.as_deref())
}

/// Whether any of `observations` records `property`, with `value` if one is
/// required. No required property is trivially satisfied.
pub fn check_required_observations(
  property: Option<&str>,
  value: Option<&str>,
  observations: &[Statement],
) -> bool {
  let Some(property) = property else { return true };
  observations
    .iter()
    .filter_map(|s| observation::parse(&s.content).ok())
    .any(|o| o.property == property && value.is_none_or(|v| o.value.as_deref() == Some(v)))
}

fn name_matches(name: &str, author: &str) -> bool { name.trim().eq_ignore_ascii_case(author.trim()) }

pub async fn vote_qualified<S: StatementStore>(
  store: &S,
  vote: &Vote,
  poll: &Poll,
) -> Result<bool, S::Error> {
  if !within_deadline(vote, poll) || !option_allowed(vote, poll) {
    return Ok(false);
  }

  let organisations = store.get_verifications_for_domain(&vote.domain).await?;
  let mut eligible = organisations.iter().any(|v| {
    name_matches(&v.name, &vote.author)
      && v.covers_domain(&vote.domain)
      && organisation_in_scope(v, poll)
  });
  // Persons have no legal form or seat, so they only vote in unscoped polls.
  if !eligible && !poll.has_entity_scope() {
    let persons = store.get_person_verifications_for_domain(&vote.domain).await?;
    eligible = persons
      .iter()
      .any(|v| name_matches(&v.name, &vote.author) && v.covers_domain(&vote.domain));
  }
  if !eligible {
    return Ok(false);
  }

  if poll.required_property.is_some() {
    let query = ObservationQuery {
      name:            vote.author.clone(),
      domain:          vote.domain.clone(),
      observer_name:   None,
      observer_domain: poll.required_property_observer.clone(),
    };
    let observations = store.get_observations_for_entity(&query).await?;
    if !check_required_observations(
      poll.required_property.as_deref(),
      poll.required_property_value.as_deref(),
      &observations,
    ) {
      return Ok(false);
    }
  }

  let filter = VoteFilter {
    domain:                Some(vote.domain.clone()),
    author:                Some(vote.author.clone()),
    ignore_statement_hash: Some(vote.statement_hash.clone()),
    qualified_only:        true,
  };
  let others = store.get_votes(&poll.statement_hash, &filter).await?;
  let key = (vote.proclaimed_publication_time, &vote.statement_hash);
  Ok(!others.iter().any(|o| (o.proclaimed_publication_time, &o.statement_hash) < key))
}

pub async fn rating_qualified<S: StatementStore>(
  store: &S,
  rating: &Rating,
) -> Result<bool, S::Error> {
  let organisations = store.get_verifications_for_domain(&rating.domain).await?;
  let mut verified = organisations
    .iter()
    .any(|v| name_matches(&v.name, &rating.author) && v.covers_domain(&rating.domain));
  if !verified {
    let persons = store.get_person_verifications_for_domain(&rating.domain).await?;
    verified = persons
      .iter()
      .any(|v| name_matches(&v.name, &rating.author) && v.covers_domain(&rating.domain));
  }
  if !verified {
    return Ok(false);
  }

  let filter = RatingFilter {
    subject_name:          Some(rating.subject_name.clone()),
    quality:               rating.quality.clone(),
    domain:                Some(rating.domain.clone()),
    author:                Some(rating.author.clone()),
    ignore_statement_hash: Some(rating.statement_hash.clone()),
  };
  let others = store.get_ratings(&filter).await?;
  let key = (rating.proclaimed_publication_time, &rating.statement_hash);
  Ok(!others.iter().any(|o| {
    o.quality == rating.quality && (o.proclaimed_publication_time, &o.statement_hash) < key
  }))
}
