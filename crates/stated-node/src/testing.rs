//! In-process fakes and fixtures shared by the unit tests.

use std::{
  collections::{HashMap, HashSet},
  sync::{Arc, Mutex},
};

use chrono::{DateTime, TimeZone as _, Utc};
use serde::Serialize;
use stated_core::{
  entity::OrganisationVerification,
  hash::content_address,
  statement::{NewStatement, Statement, StatementType, VerificationMethod},
  store::StatementStore,
};
use stated_format::{
  StatementFields, build_statement,
  content::{ObservationContent, observation},
};
use stated_store_sqlite::SqliteStore;

use crate::{
  Error, Result,
  http::{PeerResponse, Transport},
  verify::{Claim, ProofSource, ProofStrategy, dns::TxtResolver},
};

pub const POLL_CONTENT: &str = "\n\tType: Poll\n\
\tVoting deadline: Thu, 25 Jan 5024 20:34:05 GMT\n\
\tPoll: Is this a boring poll?\n\
\tOption 1: Yes\n\
\tOption 2: No\n\
\tAllow free text votes: No\n\
\tWho can vote:\n\
\t\tDescription: All corporations in Copenhagen\n\
\t\tCountry scope: Denmark\n\
\t\tCity scope: Copenhagen\n\
\t\tLegal form scope: corporation\n";

// ─── Fixtures ────────────────────────────────────────────────────────────────

pub async fn store() -> Arc<SqliteStore> {
  Arc::new(SqliteStore::open_in_memory().await.expect("in-memory store"))
}

pub fn published_at() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 1, 11, 20, 34, 2).unwrap() }

/// Serialised statement text and its hash.
pub fn statement_at(
  domain: &str,
  author: &str,
  time: DateTime<Utc>,
  content: &str,
) -> (String, String) {
  let text = build_statement(&StatementFields::new(domain, author, time, content))
    .expect("valid statement");
  let hash = content_address(&text);
  (text, hash)
}

pub fn statement_text(domain: &str, author: &str, content: &str) -> (String, String) {
  statement_at(domain, author, published_at(), content)
}

/// A placeholder statement row; derived rows need one to reference.
pub fn new_statement(hash: &str, domain: &str, statement_type: StatementType) -> NewStatement {
  NewStatement {
    hash: hash.to_owned(),
    content_hash: format!("content-{hash}"),
    statement: format!("statement text {hash}"),
    domain: domain.to_owned(),
    author: "Example Org".to_owned(),
    proclaimed_publication_time: published_at(),
    tags: Vec::new(),
    statement_type,
    content: "\n".to_owned(),
    verification_method: VerificationMethod::Dns,
    source_node_id: None,
    superseded_statement: None,
    hidden: false,
  }
}

pub async fn persist(store: &SqliteStore, input: &NewStatement) -> Statement {
  store.create_statement(input.clone()).await.unwrap().expect("fresh hash")
}

pub async fn seed(store: &SqliteStore, hash: &str, domain: &str, statement_type: StatementType) {
  persist(store, &new_statement(hash, domain, statement_type)).await;
}

/// A Copenhagen corporation verified for `domain` by `verifier.test`.
pub async fn add_organisation(
  store: &SqliteStore,
  hash: &str,
  name: &str,
  domain: &str,
  country: &str,
) {
  seed(store, hash, "verifier.test", StatementType::OrganisationVerification).await;
  store
    .create_organisation_verification(OrganisationVerification {
      statement_hash:    hash.into(),
      verifier_domain:   "verifier.test".into(),
      verified_domain:   Some(domain.into()),
      foreign_domain:    None,
      name:              name.into(),
      legal_entity_type: "corporation".into(),
      country:           country.into(),
      province:          None,
      city:              Some("Copenhagen".into()),
      serial_number:     None,
      department:        None,
      confidence:        None,
    })
    .await
    .unwrap();
}

/// An observation by `observer_domain` about the entity verified in
/// `subject_reference`.
pub fn observation_statement(
  observer_domain: &str,
  subject: &str,
  subject_reference: &str,
  property: &str,
  value: Option<&str>,
) -> NewStatement {
  let content = observation::build(&ObservationContent {
    subject: subject.into(),
    subject_reference: Some(subject_reference.into()),
    property: property.into(),
    value: value.map(str::to_owned),
    ..ObservationContent::default()
  })
  .expect("valid observation");
  let hash = content_address(&format!("{observer_domain}{content}"));
  NewStatement {
    author: "Observer".into(),
    content,
    ..new_statement(&hash, observer_domain, StatementType::Observation)
  }
}

pub fn as_statement(input: NewStatement, id: i64) -> Statement {
  Statement {
    id,
    derived_entity_created: input.derived_entity_created(),
    hash: input.hash,
    content_hash: input.content_hash,
    statement: input.statement,
    domain: input.domain,
    author: input.author,
    proclaimed_publication_time: input.proclaimed_publication_time,
    tags: input.tags,
    statement_type: input.statement_type,
    content: input.content,
    verification_method: input.verification_method,
    source_node_id: input.source_node_id,
    first_verification_time: Utc::now(),
    superseded_statement: input.superseded_statement,
    superseding_statement: None,
    derived_entity_retry_count: 0,
    hidden: input.hidden,
    referenced_statement: None,
  }
}

// ─── Transport ───────────────────────────────────────────────────────────────

impl PeerResponse {
  pub fn json_ok<T: Serialize>(body: &T) -> Self {
    Self::ok(serde_json::to_string(body).expect("serialisable"))
  }
}

/// Canned responses keyed by method, host and path. Unknown routes are
/// unreachable hosts.
#[derive(Default)]
pub struct FakeTransport {
  routes: Mutex<HashMap<(String, String, String), PeerResponse>>,
  calls:  Mutex<Vec<String>>,
  posts:  Mutex<Vec<(String, String, serde_json::Value)>>,
}

impl FakeTransport {
  fn route(&self, method: &str, host: &str, path: &str, resp: PeerResponse) {
    self
      .routes
      .lock()
      .unwrap()
      .insert((method.into(), host.into(), path.into()), resp);
  }

  pub fn route_get(&self, host: &str, path: &str, resp: PeerResponse) {
    self.route("GET", host, path, resp);
  }

  pub fn route_post(&self, host: &str, path: &str, resp: PeerResponse) {
    self.route("POST", host, path, resp);
  }

  /// Every request made, as `METHOD host path`.
  pub fn calls(&self) -> Vec<String> { self.calls.lock().unwrap().clone() }

  pub fn posted(&self, host: &str, path: &str) -> Vec<serde_json::Value> {
    self
      .posts
      .lock()
      .unwrap()
      .iter()
      .filter(|(h, p, _)| h == host && p == path)
      .map(|(_, _, body)| body.clone())
      .collect()
  }

  fn respond(&self, method: &str, host: &str, path: &str) -> Result<PeerResponse> {
    self.calls.lock().unwrap().push(format!("{method} {host} {path}"));
    self
      .routes
      .lock()
      .unwrap()
      .get(&(method.to_owned(), host.to_owned(), path.to_owned()))
      .cloned()
      .ok_or_else(|| Error::PeerUnreachable { host: host.into(), message: "no route".into() })
  }
}

impl Transport for FakeTransport {
  async fn get<'a>(&'a self, host: &'a str, path: &'a str) -> Result<PeerResponse> {
    self.respond("GET", host, path)
  }

  async fn post<'a>(
    &'a self,
    host: &'a str,
    path: &'a str,
    body: &'a serde_json::Value,
  ) -> Result<PeerResponse> {
    self.posts.lock().unwrap().push((host.into(), path.into(), body.clone()));
    self.respond("POST", host, path)
  }
}

// ─── Proofs ──────────────────────────────────────────────────────────────────

/// Succeeds for a configurable set of strategies and records every attempt.
#[derive(Default)]
pub struct FakeProof {
  succeeding: Mutex<HashSet<ProofStrategy>>,
  attempts:   Mutex<Vec<ProofStrategy>>,
}

impl FakeProof {
  pub fn succeeding(strategies: &[ProofStrategy]) -> Self {
    let proof = Self::default();
    proof.set(strategies);
    proof
  }

  pub fn set(&self, strategies: &[ProofStrategy]) {
    *self.succeeding.lock().unwrap() = strategies.iter().copied().collect();
  }

  pub fn attempts(&self) -> Vec<ProofStrategy> { self.attempts.lock().unwrap().clone() }
}

impl ProofSource for FakeProof {
  async fn prove<'a>(&'a self, strategy: ProofStrategy, _claim: &'a Claim) -> bool {
    self.attempts.lock().unwrap().push(strategy);
    self.succeeding.lock().unwrap().contains(&strategy)
  }
}

#[derive(Default)]
pub struct FakeResolver {
  records: Mutex<HashMap<String, Vec<String>>>,
}

impl FakeResolver {
  pub fn insert(&self, name: &str, values: &[&str]) {
    self
      .records
      .lock()
      .unwrap()
      .insert(name.into(), values.iter().map(|v| v.to_string()).collect());
  }
}

impl TxtResolver for FakeResolver {
  async fn txt_records<'a>(&'a self, name: &'a str) -> Result<Vec<String>> {
    self
      .records
      .lock()
      .unwrap()
      .get(name)
      .cloned()
      .ok_or_else(|| Error::Dns(format!("NXDOMAIN {name}")))
  }
}
