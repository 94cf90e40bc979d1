//! Statements and the submission queue.
//!
//! A [`Statement`] is immutable once persisted. Only the derived-entity
//! bookkeeping and the back-references are ever updated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator as _;

// ─── Statement type ──────────────────────────────────────────────────────────

/// The kind of a statement's content block. Untyped free-text statements are
/// [`StatementType::Statement`].
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
  strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StatementType {
  Statement,
  OrganisationVerification,
  PersonVerification,
  Poll,
  Vote,
  Rating,
  Response,
  DisputeStatementAuthenticity,
  DisputeStatementContent,
  SignPdf,
  Observation,
  Boycott,
  Bounty,
}

impl StatementType {
  /// The label used on the `Type:` line of a typed content block.
  pub fn type_name(self) -> Option<&'static str> {
    Some(match self {
      Self::Statement => return None,
      Self::OrganisationVerification => "Organisation verification",
      Self::PersonVerification => "Person verification",
      Self::Poll => "Poll",
      Self::Vote => "Vote",
      Self::Rating => "Rating",
      Self::Response => "Response",
      Self::DisputeStatementAuthenticity => "Dispute statement authenticity",
      Self::DisputeStatementContent => "Dispute statement content",
      Self::SignPdf => "Sign PDF",
      Self::Observation => "Observation",
      Self::Boycott => "Boycott",
      Self::Bounty => "Bounty",
    })
  }

  /// Look up a type from its `Type:` line label.
  pub fn from_type_name(name: &str) -> Option<Self> {
    Self::iter().find(|t| t.type_name() == Some(name))
  }

  /// Whether statements of this type project into a derived row.
  pub fn has_derived_entity(self) -> bool {
    matches!(
      self,
      Self::OrganisationVerification
        | Self::PersonVerification
        | Self::Poll
        | Self::Vote
        | Self::Rating
        | Self::Response
        | Self::DisputeStatementAuthenticity
        | Self::DisputeStatementContent
    )
  }
}

// ─── Verification method ─────────────────────────────────────────────────────

/// How a statement's domain authorship was proven.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VerificationMethod {
  Dns,
  Api,
}

// ─── Statement ───────────────────────────────────────────────────────────────

/// A verified, persisted statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
  /// Local sequence number; peers use it as their sync cursor.
  pub id:                          i64,
  pub hash:                        String,
  pub content_hash:                String,
  /// The full serialised statement text.
  pub statement:                   String,
  pub domain:                      String,
  pub author:                      String,
  pub proclaimed_publication_time: DateTime<Utc>,
  pub tags:                        Vec<String>,
  #[serde(rename = "type")]
  pub statement_type:              StatementType,
  pub content:                     String,
  pub verification_method:         VerificationMethod,
  /// The peer that relayed this statement; `None` if submitted locally.
  pub source_node_id:              Option<i64>,
  /// Set by the store when the row is inserted.
  pub first_verification_time:     DateTime<Utc>,
  pub superseded_statement:        Option<String>,
  pub superseding_statement:       Option<String>,
  pub derived_entity_created:      bool,
  pub derived_entity_retry_count:  u32,
  pub hidden:                      bool,
  /// Target of a response or dispute, filled in by derivation.
  pub referenced_statement:        Option<String>,
}

/// Input for [`crate::store::StatementStore::create_statement`].
#[derive(Debug, Clone)]
pub struct NewStatement {
  pub hash:                        String,
  pub content_hash:                String,
  pub statement:                   String,
  pub domain:                      String,
  pub author:                      String,
  pub proclaimed_publication_time: DateTime<Utc>,
  pub tags:                        Vec<String>,
  pub statement_type:              StatementType,
  pub content:                     String,
  pub verification_method:         VerificationMethod,
  pub source_node_id:              Option<i64>,
  pub superseded_statement:        Option<String>,
  pub hidden:                      bool,
}

impl NewStatement {
  /// Statements with no derived row start out complete.
  pub fn derived_entity_created(&self) -> bool {
    !self.statement_type.has_derived_entity()
  }
}

/// A partial update to a persisted statement's bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct StatementUpdate {
  pub hash:                   String,
  pub derived_entity_created: Option<bool>,
  pub increment_retry_count:  bool,
  pub referenced_statement:   Option<String>,
}

/// Parameters for [`crate::store::StatementStore::get_statements`].
#[derive(Debug, Clone)]
pub struct StatementQuery {
  /// Only statements with `id > min_id`.
  pub min_id:         Option<i64>,
  /// Only statements published by this domain, compared case-insensitively.
  pub domain:         Option<String>,
  pub limit:          usize,
  pub include_hidden: bool,
}

impl Default for StatementQuery {
  fn default() -> Self {
    Self { min_id: None, domain: None, limit: 100, include_hidden: false }
  }
}

// ─── Unverified statements ───────────────────────────────────────────────────

/// A submission whose domain proof has not succeeded yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnverifiedStatement {
  pub hash:                       String,
  pub statement:                  String,
  pub source_node_id:             Option<i64>,
  pub source_verification_method: Option<VerificationMethod>,
  pub received_time:              DateTime<Utc>,
  pub verification_retry_count:   u32,
}

#[derive(Debug, Clone)]
pub struct NewUnverifiedStatement {
  pub hash:                       String,
  pub statement:                  String,
  pub source_node_id:             Option<i64>,
  pub source_verification_method: Option<VerificationMethod>,
}
