//! Derived entities: typed rows projected from a persisted statement.
//!
//! Failure here never fails a submission. It bumps the statement's
//! `derived_entity_retry_count` and the retry sweep tries again, which is how
//! a vote that arrived before its poll eventually gets counted.

use stated_core::{
  entity::{OrganisationVerification, PersonVerification, Poll, Rating, Vote},
  statement::{Statement, StatementUpdate},
  store::StatementStore,
};
use stated_format::{
  TypedContent,
  content::{
    OrganisationVerificationContent, PersonVerificationContent, PollContent, RatingContent,
    VoteContent,
  },
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::qualify;

#[derive(Debug, Error)]
pub enum DeriveError {
  #[error("invalid content: {0}")]
  Content(#[from] stated_format::Error),

  #[error("missing {0}")]
  MissingField(&'static str),

  #[error("poll {0} not found")]
  PollNotFound(String),

  #[error("{0} is not qualified")]
  NotQualified(&'static str),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl DeriveError {
  fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

/// Create the derived row for `statement`, if its type has one. A row that
/// exists already counts as created.
pub async fn create_derived_entity<S: StatementStore>(
  store: &S,
  statement: &Statement,
) -> Result<(), DeriveError> {
  let Some(content) = TypedContent::parse(statement.statement_type, &statement.content)? else {
    return Ok(());
  };
  match content {
    TypedContent::OrganisationVerification(c) => {
      let row = organisation_verification(statement, c)?;
      store.create_organisation_verification(row).await.map_err(DeriveError::store)?;
    }
    TypedContent::PersonVerification(c) => {
      let row = person_verification(statement, c)?;
      store.create_person_verification(row).await.map_err(DeriveError::store)?;
    }
    TypedContent::Poll(c) => {
      store.create_poll(poll(statement, c)).await.map_err(DeriveError::store)?;
    }
    TypedContent::Vote(c) => derive_vote(store, statement, c).await?,
    TypedContent::Rating(c) => derive_rating(store, statement, c).await?,
    TypedContent::Response(c) => link_reference(store, statement, c.hash).await?,
    TypedContent::DisputeAuthenticity(c) | TypedContent::DisputeContent(c) => {
      link_reference(store, statement, c.hash).await?
    }
    _ => {}
  }
  Ok(())
}

/// Run [`create_derived_entity`] and record the outcome on the statement.
/// Returns whether the entity now exists.
pub async fn derive_and_record<S: StatementStore>(store: &S, statement: &Statement) -> bool {
  let result = create_derived_entity(store, statement).await;
  let update = StatementUpdate {
    hash:                   statement.hash.clone(),
    derived_entity_created: result.is_ok().then_some(true),
    increment_retry_count:  result.is_err(),
    referenced_statement:   None,
  };
  if let Err(e) = &result {
    debug!(
      hash = %statement.hash,
      kind = %statement.statement_type,
      error = %e,
      "derived entity not created"
    );
  }
  if let Err(e) = store.update_statement(update).await {
    warn!(hash = %statement.hash, error = %e, "failed to record derived entity state");
  }
  result.is_ok()
}

// ─── Projections ─────────────────────────────────────────────────────────────

fn organisation_verification(
  statement: &Statement,
  c: OrganisationVerificationContent,
) -> Result<OrganisationVerification, DeriveError> {
  if c.domain.is_none() && c.foreign_domain.is_none() {
    return Err(DeriveError::MissingField("verified domain"));
  }
  Ok(OrganisationVerification {
    statement_hash:    statement.hash.clone(),
    verifier_domain:   statement.domain.clone(),
    verified_domain:   c.domain,
    foreign_domain:    c.foreign_domain,
    name:              c.name,
    legal_entity_type: c.legal_form,
    country:           c.country,
    province:          c.province,
    city:              c.city,
    serial_number:     c.serial_number,
    department:        c.department,
    confidence:        c.confidence,
  })
}

fn person_verification(
  statement: &Statement,
  c: PersonVerificationContent,
) -> Result<PersonVerification, DeriveError> {
  if c.domain.is_none() && c.foreign_domain.is_none() {
    return Err(DeriveError::MissingField("verified domain"));
  }
  Ok(PersonVerification {
    statement_hash:  statement.hash.clone(),
    verifier_domain: statement.domain.clone(),
    verified_domain: c.domain,
    foreign_domain:  c.foreign_domain,
    name:            c.name,
    birth_country:   c.country_of_birth,
    birth_city:      c.city_of_birth,
    birth_date:      c.date_of_birth,
    job_title:       c.job_title,
    employer:        c.employer,
    confidence:      c.confidence,
  })
}

fn poll(statement: &Statement, c: PollContent) -> Poll {
  let scope = c.scope.unwrap_or_default();
  Poll {
    statement_hash:             statement.hash.clone(),
    domain:                     statement.domain.clone(),
    question:                   c.poll,
    deadline:                   c.deadline,
    options:                    c.options,
    allow_arbitrary_vote:       c.allow_arbitrary_vote,
    participants_entity_type:   scope.legal_entity,
    participants_country:       scope.country,
    participants_city:          scope.city,
    required_property:          scope.required_property,
    required_property_value:    scope.required_property_value,
    required_property_observer: scope.required_property_observer,
  }
}

/// Responses and disputes project onto the statement row itself. The target
/// need not be known locally yet.
async fn link_reference<S: StatementStore>(
  store: &S,
  statement: &Statement,
  target: String,
) -> Result<(), DeriveError> {
  if target.is_empty() {
    return Err(DeriveError::MissingField("referenced statement"));
  }
  let update = StatementUpdate {
    hash: statement.hash.clone(),
    referenced_statement: Some(target),
    ..StatementUpdate::default()
  };
  store.update_statement(update).await.map_err(DeriveError::store)?;
  Ok(())
}

/// Votes are stored even when they do not qualify (yet), so the tally can be
/// recomputed once the poll or the voter's verification turns up.
async fn derive_vote<S: StatementStore>(
  store: &S,
  statement: &Statement,
  c: VoteContent,
) -> Result<(), DeriveError> {
  let mut vote = Vote {
    statement_hash:              statement.hash.clone(),
    poll_hash:                   c.poll_hash,
    option:                      c.option,
    domain:                      statement.domain.clone(),
    author:                      statement.author.clone(),
    proclaimed_publication_time: statement.proclaimed_publication_time,
    qualified:                   false,
  };
  let poll = store.get_poll(&vote.poll_hash).await.map_err(DeriveError::store)?;
  if let Some(poll) = &poll {
    vote.qualified =
      qualify::vote_qualified(store, &vote, poll).await.map_err(DeriveError::store)?;
  }

  let (hash, poll_hash, qualified) =
    (vote.statement_hash.clone(), vote.poll_hash.clone(), vote.qualified);
  if !store.create_vote(vote).await.map_err(DeriveError::store)? {
    store.update_vote(&hash, qualified).await.map_err(DeriveError::store)?;
  }

  match poll {
    None => Err(DeriveError::PollNotFound(poll_hash)),
    Some(_) if !qualified => Err(DeriveError::NotQualified("vote")),
    Some(_) => Ok(()),
  }
}

async fn derive_rating<S: StatementStore>(
  store: &S,
  statement: &Statement,
  c: RatingContent,
) -> Result<(), DeriveError> {
  let stars = c.stars()?;
  if c.subject_reference.is_none() && c.document_file_hash.is_none() {
    return Err(DeriveError::MissingField("subject reference or document hash"));
  }
  let mut rating = Rating {
    statement_hash: statement.hash.clone(),
    domain: statement.domain.clone(),
    author: statement.author.clone(),
    subject_name: c.subject_name,
    subject_type: c.subject_type,
    subject_reference: c.subject_reference,
    document_file_hash: c.document_file_hash,
    quality: c.quality,
    rating: stars,
    comment: c.comment,
    proclaimed_publication_time: statement.proclaimed_publication_time,
    qualified: false,
  };
  rating.qualified = qualify::rating_qualified(store, &rating).await.map_err(DeriveError::store)?;

  let (hash, qualified) = (rating.statement_hash.clone(), rating.qualified);
  if !store.create_rating(rating).await.map_err(DeriveError::store)? {
    store.update_rating(&hash, qualified).await.map_err(DeriveError::store)?;
  }
  if qualified { Ok(()) } else { Err(DeriveError::NotQualified("rating")) }
}
