//! Encoding and decoding helpers between stated domain types and the plain
//! text stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with a fixed microsecond
//! precision and a `Z` suffix, so that lexical order equals time order.
//! Tags and poll options are stored as compact JSON arrays.

use std::str::FromStr as _;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use stated_core::{
  entity::{PersonVerification, Poll, Rating, Vote},
  node::Node,
  statement::{Statement, StatementType, UnverifiedStatement, VerificationMethod},
  verification_log::{LogCandidate, VerificationLogEntry},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_statement_type(s: &str) -> Result<StatementType> {
  StatementType::from_str(s)
    .map_err(|_| stated_core::Error::UnknownStatementType(s.to_owned()).into())
}

pub fn decode_method(s: &str) -> Result<VerificationMethod> {
  VerificationMethod::from_str(s)
    .map_err(|_| stated_core::Error::UnknownVerificationMethod(s.to_owned()).into())
}

// ─── JSON arrays ─────────────────────────────────────────────────────────────

pub fn encode_list(items: &[String]) -> Result<String> { Ok(serde_json::to_string(items)?) }

pub fn decode_list(s: &str) -> Result<Vec<String>> { Ok(serde_json::from_str(s)?) }

// ─── Raw rows ────────────────────────────────────────────────────────────────

/// Column list matching [`read_statement`]; the table is aliased `s`.
pub const STATEMENT_COLUMNS: &str = "s.id, s.hash, s.content_hash, s.statement, s.domain, \
   s.author, s.proclaimed_publication_time, s.tags, s.type, s.content, \
   s.verification_method, s.source_node_id, s.first_verification_time, \
   s.superseded_statement, s.superseding_statement, s.derived_entity_created, \
   s.derived_entity_retry_count, s.hidden, s.referenced_statement";

/// Raw values read directly from a `statements` row.
pub struct RawStatement {
  pub id:                          i64,
  pub hash:                        String,
  pub content_hash:                String,
  pub statement:                   String,
  pub domain:                      String,
  pub author:                      String,
  pub proclaimed_publication_time: String,
  pub tags:                        String,
  pub statement_type:              String,
  pub content:                     String,
  pub verification_method:         String,
  pub source_node_id:              Option<i64>,
  pub first_verification_time:     String,
  pub superseded_statement:        Option<String>,
  pub superseding_statement:       Option<String>,
  pub derived_entity_created:      bool,
  pub derived_entity_retry_count:  u32,
  pub hidden:                      bool,
  pub referenced_statement:        Option<String>,
}

/// Row mapper for a select starting with [`STATEMENT_COLUMNS`].
pub fn read_statement(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawStatement> {
  Ok(RawStatement {
    id:                          row.get(0)?,
    hash:                        row.get(1)?,
    content_hash:                row.get(2)?,
    statement:                   row.get(3)?,
    domain:                      row.get(4)?,
    author:                      row.get(5)?,
    proclaimed_publication_time: row.get(6)?,
    tags:                        row.get(7)?,
    statement_type:              row.get(8)?,
    content:                     row.get(9)?,
    verification_method:         row.get(10)?,
    source_node_id:              row.get(11)?,
    first_verification_time:     row.get(12)?,
    superseded_statement:        row.get(13)?,
    superseding_statement:       row.get(14)?,
    derived_entity_created:      row.get(15)?,
    derived_entity_retry_count:  row.get(16)?,
    hidden:                      row.get(17)?,
    referenced_statement:        row.get(18)?,
  })
}

impl RawStatement {
  pub fn into_statement(self) -> Result<Statement> {
    Ok(Statement {
      id:                          self.id,
      hash:                        self.hash,
      content_hash:                self.content_hash,
      statement:                   self.statement,
      domain:                      self.domain,
      author:                      self.author,
      proclaimed_publication_time: decode_dt(&self.proclaimed_publication_time)?,
      tags:                        decode_list(&self.tags)?,
      statement_type:              decode_statement_type(&self.statement_type)?,
      content:                     self.content,
      verification_method:         decode_method(&self.verification_method)?,
      source_node_id:              self.source_node_id,
      first_verification_time:     decode_dt(&self.first_verification_time)?,
      superseded_statement:        self.superseded_statement,
      superseding_statement:       self.superseding_statement,
      derived_entity_created:      self.derived_entity_created,
      derived_entity_retry_count:  self.derived_entity_retry_count,
      hidden:                      self.hidden,
      referenced_statement:        self.referenced_statement,
    })
  }
}

/// A statement row joined with its verification log aggregate.
pub struct RawLogCandidate {
  pub statement:    RawStatement,
  pub log_count:    u32,
  pub first_logged: Option<String>,
}

impl RawLogCandidate {
  pub fn into_candidate(self) -> Result<LogCandidate> {
    Ok(LogCandidate {
      statement:    self.statement.into_statement()?,
      log_count:    self.log_count,
      first_logged: self.first_logged.as_deref().map(decode_dt).transpose()?,
    })
  }
}

pub struct RawUnverified {
  pub hash:                       String,
  pub statement:                  String,
  pub source_node_id:             Option<i64>,
  pub source_verification_method: Option<String>,
  pub received_time:              String,
  pub verification_retry_count:   u32,
}

impl RawUnverified {
  pub fn into_unverified(self) -> Result<UnverifiedStatement> {
    Ok(UnverifiedStatement {
      hash:                       self.hash,
      statement:                  self.statement,
      source_node_id:             self.source_node_id,
      source_verification_method: self
        .source_verification_method
        .as_deref()
        .map(decode_method)
        .transpose()?,
      received_time:              decode_dt(&self.received_time)?,
      verification_retry_count:   self.verification_retry_count,
    })
  }
}

pub const NODE_COLUMNS: &str = "id, domain, ip, first_seen, last_seen, reputation, \
   last_received_statement_id, certificate_authority, fingerprint";

pub struct RawNode {
  pub id:                         i64,
  pub domain:                     String,
  pub ip:                         Option<String>,
  pub first_seen:                 String,
  pub last_seen:                  String,
  pub reputation:                 Option<f64>,
  pub last_received_statement_id: Option<i64>,
  pub certificate_authority:      Option<String>,
  pub fingerprint:                Option<String>,
}

pub fn read_node(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawNode> {
  Ok(RawNode {
    id:                         row.get(0)?,
    domain:                     row.get(1)?,
    ip:                         row.get(2)?,
    first_seen:                 row.get(3)?,
    last_seen:                  row.get(4)?,
    reputation:                 row.get(5)?,
    last_received_statement_id: row.get(6)?,
    certificate_authority:      row.get(7)?,
    fingerprint:                row.get(8)?,
  })
}

impl RawNode {
  pub fn into_node(self) -> Result<Node> {
    Ok(Node {
      id:                         self.id,
      domain:                     self.domain,
      ip:                         self.ip,
      first_seen:                 decode_dt(&self.first_seen)?,
      last_seen:                  decode_dt(&self.last_seen)?,
      reputation:                 self.reputation,
      last_received_statement_id: self.last_received_statement_id,
      certificate_authority:      self.certificate_authority,
      fingerprint:                self.fingerprint,
    })
  }
}

pub const PERSON_COLUMNS: &str = "statement_hash, verifier_domain, verified_domain, \
   foreign_domain, name, birth_country, birth_city, birth_date, job_title, employer, \
   confidence";

pub struct RawPersonVerification {
  pub statement_hash:  String,
  pub verifier_domain: String,
  pub verified_domain: Option<String>,
  pub foreign_domain:  Option<String>,
  pub name:            String,
  pub birth_country:   String,
  pub birth_city:      String,
  pub birth_date:      String,
  pub job_title:       Option<String>,
  pub employer:        Option<String>,
  pub confidence:      Option<f64>,
}

pub fn read_person(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawPersonVerification> {
  Ok(RawPersonVerification {
    statement_hash:  row.get(0)?,
    verifier_domain: row.get(1)?,
    verified_domain: row.get(2)?,
    foreign_domain:  row.get(3)?,
    name:            row.get(4)?,
    birth_country:   row.get(5)?,
    birth_city:      row.get(6)?,
    birth_date:      row.get(7)?,
    job_title:       row.get(8)?,
    employer:        row.get(9)?,
    confidence:      row.get(10)?,
  })
}

impl RawPersonVerification {
  pub fn into_person(self) -> Result<PersonVerification> {
    Ok(PersonVerification {
      statement_hash:  self.statement_hash,
      verifier_domain: self.verifier_domain,
      verified_domain: self.verified_domain,
      foreign_domain:  self.foreign_domain,
      name:            self.name,
      birth_country:   self.birth_country,
      birth_city:      self.birth_city,
      birth_date:      decode_date(&self.birth_date)?,
      job_title:       self.job_title,
      employer:        self.employer,
      confidence:      self.confidence,
    })
  }
}

pub const POLL_COLUMNS: &str = "statement_hash, domain, question, deadline, options, \
   allow_arbitrary_vote, participants_entity_type, participants_country, \
   participants_city, required_property, required_property_value, \
   required_property_observer";

pub struct RawPoll {
  pub statement_hash:             String,
  pub domain:                     String,
  pub question:                   String,
  pub deadline:                   String,
  pub options:                    String,
  pub allow_arbitrary_vote:       Option<bool>,
  pub participants_entity_type:   Option<String>,
  pub participants_country:       Option<String>,
  pub participants_city:          Option<String>,
  pub required_property:          Option<String>,
  pub required_property_value:    Option<String>,
  pub required_property_observer: Option<String>,
}

pub fn read_poll(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawPoll> {
  Ok(RawPoll {
    statement_hash:             row.get(0)?,
    domain:                     row.get(1)?,
    question:                   row.get(2)?,
    deadline:                   row.get(3)?,
    options:                    row.get(4)?,
    allow_arbitrary_vote:       row.get(5)?,
    participants_entity_type:   row.get(6)?,
    participants_country:       row.get(7)?,
    participants_city:          row.get(8)?,
    required_property:          row.get(9)?,
    required_property_value:    row.get(10)?,
    required_property_observer: row.get(11)?,
  })
}

impl RawPoll {
  pub fn into_poll(self) -> Result<Poll> {
    Ok(Poll {
      statement_hash:             self.statement_hash,
      domain:                     self.domain,
      question:                   self.question,
      deadline:                   decode_dt(&self.deadline)?,
      options:                    decode_list(&self.options)?,
      allow_arbitrary_vote:       self.allow_arbitrary_vote,
      participants_entity_type:   self.participants_entity_type,
      participants_country:       self.participants_country,
      participants_city:          self.participants_city,
      required_property:          self.required_property,
      required_property_value:    self.required_property_value,
      required_property_observer: self.required_property_observer,
    })
  }
}

pub const VOTE_COLUMNS: &str =
  "statement_hash, poll_hash, option, domain, author, proclaimed_publication_time, qualified";

pub struct RawVote {
  pub statement_hash:              String,
  pub poll_hash:                   String,
  pub option:                      String,
  pub domain:                      String,
  pub author:                      String,
  pub proclaimed_publication_time: String,
  pub qualified:                   bool,
}

pub fn read_vote(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawVote> {
  Ok(RawVote {
    statement_hash:              row.get(0)?,
    poll_hash:                   row.get(1)?,
    option:                      row.get(2)?,
    domain:                      row.get(3)?,
    author:                      row.get(4)?,
    proclaimed_publication_time: row.get(5)?,
    qualified:                   row.get(6)?,
  })
}

impl RawVote {
  pub fn into_vote(self) -> Result<Vote> {
    Ok(Vote {
      statement_hash:              self.statement_hash,
      poll_hash:                   self.poll_hash,
      option:                      self.option,
      domain:                      self.domain,
      author:                      self.author,
      proclaimed_publication_time: decode_dt(&self.proclaimed_publication_time)?,
      qualified:                   self.qualified,
    })
  }
}

pub const RATING_COLUMNS: &str = "statement_hash, domain, author, subject_name, \
   subject_type, subject_reference, document_file_hash, quality, rating, comment, \
   proclaimed_publication_time, qualified";

pub struct RawRating {
  pub statement_hash:              String,
  pub domain:                      String,
  pub author:                      String,
  pub subject_name:                String,
  pub subject_type:                Option<String>,
  pub subject_reference:           Option<String>,
  pub document_file_hash:          Option<String>,
  pub quality:                     Option<String>,
  pub rating:                      u8,
  pub comment:                     Option<String>,
  pub proclaimed_publication_time: String,
  pub qualified:                   bool,
}

pub fn read_rating(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRating> {
  Ok(RawRating {
    statement_hash:              row.get(0)?,
    domain:                      row.get(1)?,
    author:                      row.get(2)?,
    subject_name:                row.get(3)?,
    subject_type:                row.get(4)?,
    subject_reference:           row.get(5)?,
    document_file_hash:          row.get(6)?,
    quality:                     row.get(7)?,
    rating:                      row.get(8)?,
    comment:                     row.get(9)?,
    proclaimed_publication_time: row.get(10)?,
    qualified:                   row.get(11)?,
  })
}

impl RawRating {
  pub fn into_rating(self) -> Result<Rating> {
    Ok(Rating {
      statement_hash:              self.statement_hash,
      domain:                      self.domain,
      author:                      self.author,
      subject_name:                self.subject_name,
      subject_type:                self.subject_type,
      subject_reference:           self.subject_reference,
      document_file_hash:          self.document_file_hash,
      quality:                     self.quality,
      rating:                      self.rating,
      comment:                     self.comment,
      proclaimed_publication_time: decode_dt(&self.proclaimed_publication_time)?,
      qualified:                   self.qualified,
    })
  }
}

pub struct RawLogEntry {
  pub statement_hash: String,
  pub t:              String,
  pub api:            bool,
  pub dns:            bool,
  pub txt:            bool,
}

impl RawLogEntry {
  pub fn into_entry(self) -> Result<VerificationLogEntry> {
    Ok(VerificationLogEntry {
      statement_hash: self.statement_hash,
      t:              decode_dt(&self.t)?,
      api:            self.api,
      dns:            self.dns,
      txt:            self.txt,
    })
  }
}
