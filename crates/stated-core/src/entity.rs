//! Derived entities: typed rows projected from a verified statement's content.
//!
//! Every row carries the `statement_hash` of the statement it was derived
//! from; there is at most one row per statement.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ─── Verifications ───────────────────────────────────────────────────────────

/// An organisation verification published by `verifier_domain`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganisationVerification {
  pub statement_hash:    String,
  pub verifier_domain:   String,
  /// The domain owned by the verified organisation.
  pub verified_domain:   Option<String>,
  /// A domain the organisation publishes from without owning it.
  pub foreign_domain:    Option<String>,
  pub name:              String,
  pub legal_entity_type: String,
  pub country:           String,
  pub province:          Option<String>,
  pub city:              Option<String>,
  pub serial_number:     Option<String>,
  pub department:        Option<String>,
  pub confidence:        Option<f64>,
}

impl OrganisationVerification {
  /// Whether this verification vouches for statements published on `domain`.
  pub fn covers_domain(&self, domain: &str) -> bool {
    self.verified_domain.as_deref() == Some(domain)
      || self.foreign_domain.as_deref() == Some(domain)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonVerification {
  pub statement_hash:  String,
  pub verifier_domain: String,
  pub verified_domain: Option<String>,
  pub foreign_domain:  Option<String>,
  pub name:            String,
  pub birth_country:   String,
  pub birth_city:      String,
  pub birth_date:      NaiveDate,
  pub job_title:       Option<String>,
  pub employer:        Option<String>,
  pub confidence:      Option<f64>,
}

impl PersonVerification {
  pub fn covers_domain(&self, domain: &str) -> bool {
    self.verified_domain.as_deref() == Some(domain)
      || self.foreign_domain.as_deref() == Some(domain)
  }
}

// ─── Polls and votes ─────────────────────────────────────────────────────────

/// A poll and the scope restricting who may vote on it. `None` scope fields
/// mean "no restriction".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poll {
  pub statement_hash:             String,
  pub domain:                     String,
  pub question:                   String,
  pub deadline:                   DateTime<Utc>,
  pub options:                    Vec<String>,
  /// `Some(false)` restricts votes to `options`.
  pub allow_arbitrary_vote:       Option<bool>,
  pub participants_entity_type:   Option<String>,
  pub participants_country:       Option<String>,
  pub participants_city:          Option<String>,
  pub required_property:          Option<String>,
  pub required_property_value:    Option<String>,
  /// Domain of the observer whose observations count.
  pub required_property_observer: Option<String>,
}

impl Poll {
  /// Whether the poll restricts participation by entity type or location.
  pub fn has_entity_scope(&self) -> bool {
    self.participants_entity_type.is_some()
      || self.participants_country.is_some()
      || self.participants_city.is_some()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
  pub statement_hash:              String,
  /// Hash of the poll statement this vote answers.
  pub poll_hash:                   String,
  pub option:                      String,
  pub domain:                      String,
  pub author:                      String,
  pub proclaimed_publication_time: DateTime<Utc>,
  pub qualified:                   bool,
}

/// Filters for [`crate::store::StatementStore::get_votes`].
#[derive(Debug, Clone, Default)]
pub struct VoteFilter {
  pub domain:                Option<String>,
  /// Matched case-insensitively.
  pub author:                Option<String>,
  pub ignore_statement_hash: Option<String>,
  pub qualified_only:        bool,
}

// ─── Ratings ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
  pub statement_hash:              String,
  pub domain:                      String,
  pub author:                      String,
  pub subject_name:                String,
  pub subject_type:                Option<String>,
  pub subject_reference:           Option<String>,
  pub document_file_hash:          Option<String>,
  pub quality:                     Option<String>,
  /// 1 to 5 stars.
  pub rating:                      u8,
  pub comment:                     Option<String>,
  pub proclaimed_publication_time: DateTime<Utc>,
  pub qualified:                   bool,
}

/// Filters for [`crate::store::StatementStore::get_ratings`].
#[derive(Debug, Clone, Default)]
pub struct RatingFilter {
  pub subject_name:          Option<String>,
  pub quality:               Option<String>,
  pub domain:                Option<String>,
  pub author:                Option<String>,
  pub ignore_statement_hash: Option<String>,
}

// ─── Observations ────────────────────────────────────────────────────────────

/// Parameters for [`crate::store::StatementStore::get_observations_for_entity`].
///
/// Matches observation statements whose subject identity reference points at
/// a verification of the entity `name`@`domain`.
#[derive(Debug, Clone, Default)]
pub struct ObservationQuery {
  pub name:            String,
  pub domain:          String,
  pub observer_name:   Option<String>,
  pub observer_domain: Option<String>,
}
