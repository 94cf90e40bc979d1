//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{NaiveDate, TimeZone as _, Utc};
use stated_core::{
  entity::{
    ObservationQuery, OrganisationVerification, PersonVerification, Poll, Rating,
    RatingFilter, Vote, VoteFilter,
  },
  node::NodeUpdate,
  statement::{
    NewStatement, NewUnverifiedStatement, Statement, StatementQuery, StatementType,
    StatementUpdate, VerificationMethod,
  },
  store::StatementStore,
  verification_log::VerificationLogEntry,
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn new_statement(hash: &str, domain: &str, statement_type: StatementType) -> NewStatement {
  NewStatement {
    hash:                        hash.to_owned(),
    content_hash:                format!("content-{hash}"),
    statement:                   format!("statement text {hash}"),
    domain:                      domain.to_owned(),
    author:                      "Example Org".to_owned(),
    proclaimed_publication_time: Utc.with_ymd_and_hms(2024, 1, 11, 20, 34, 2).unwrap(),
    tags:                        vec!["a".into(), "b".into()],
    statement_type,
    content:                     "hello\n".to_owned(),
    verification_method:         VerificationMethod::Dns,
    source_node_id:              None,
    superseded_statement:        None,
    hidden:                      false,
  }
}

async fn persist(s: &SqliteStore, input: NewStatement) -> Statement {
  s.create_statement(input).await.unwrap().expect("fresh hash")
}

// ─── Readiness ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn operations_fail_until_migrated() {
  let s = SqliteStore::connect_in_memory().await.unwrap();
  assert!(!s.readiness().is_ready());

  let err = s.statement_exists("h").await.unwrap_err();
  assert!(err.is_not_ready());
  let err = s.get_all_nodes().await.unwrap_err();
  assert!(err.is_not_ready());

  s.migrate().await.unwrap();
  assert!(s.readiness().is_ready());
  assert!(!s.statement_exists("h").await.unwrap());
}

#[tokio::test]
async fn clones_share_readiness() {
  let s = SqliteStore::connect_in_memory().await.unwrap();
  let clone = s.clone();
  s.migrate().await.unwrap();
  assert!(clone.get_all_nodes().await.unwrap().is_empty());
}

// ─── Statements ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_statement_is_insert_if_absent() {
  let s = store().await;

  let first = persist(&s, new_statement("h1", "example.com", StatementType::Statement)).await;
  assert_eq!(first.hash, "h1");
  assert_eq!(first.tags, vec!["a", "b"]);
  assert!(first.derived_entity_created);

  let again = s
    .create_statement(new_statement("h1", "other.com", StatementType::Statement))
    .await
    .unwrap();
  assert!(again.is_none());

  let stored = s.get_statement("h1").await.unwrap().unwrap();
  assert_eq!(stored.domain, "example.com");
  assert_eq!(stored.id, first.id);
  assert!(s.statement_exists("h1").await.unwrap());
  assert!(s.get_statement("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn typed_statements_start_without_derived_entity() {
  let s = store().await;
  let poll = persist(&s, new_statement("p", "example.com", StatementType::Poll)).await;
  assert!(!poll.derived_entity_created);
  assert_eq!(poll.derived_entity_retry_count, 0);

  let missing = s.get_statements_missing_derived_entity(10, 3).await.unwrap();
  assert_eq!(missing.len(), 1);
  assert_eq!(missing[0].hash, "p");
}

#[tokio::test]
async fn missing_derived_entities_skip_exhausted_rows_before_limit() {
  let s = store().await;
  persist(&s, new_statement("spent", "example.com", StatementType::Poll)).await;
  persist(&s, new_statement("fresh", "example.com", StatementType::Poll)).await;
  for _ in 0..2 {
    s.update_statement(StatementUpdate {
      hash: "spent".into(),
      increment_retry_count: true,
      ..Default::default()
    })
    .await
    .unwrap();
  }

  let page = s.get_statements_missing_derived_entity(1, 2).await.unwrap();
  assert_eq!(page.len(), 1);
  assert_eq!(page[0].hash, "fresh");
  assert_eq!(s.get_statements_missing_derived_entity(10, 3).await.unwrap().len(), 2);
}

#[tokio::test]
async fn referenced_statement_is_set_once_known() {
  let s = store().await;
  let r = persist(&s, new_statement("r", "example.com", StatementType::Response)).await;
  assert!(r.referenced_statement.is_none());

  s.update_statement(StatementUpdate {
    hash: "r".into(),
    referenced_statement: Some("target".into()),
    ..Default::default()
  })
  .await
  .unwrap();
  // Bookkeeping updates leave the reference alone.
  s.update_statement(StatementUpdate {
    hash: "r".into(),
    derived_entity_created: Some(true),
    ..Default::default()
  })
  .await
  .unwrap();

  let r = s.get_statement("r").await.unwrap().unwrap();
  assert_eq!(r.referenced_statement.as_deref(), Some("target"));
  assert!(r.derived_entity_created);
}

#[tokio::test]
async fn update_statement_sets_flag_and_counts_retries() {
  let s = store().await;
  persist(&s, new_statement("v", "example.com", StatementType::Vote)).await;

  let bumped = s
    .update_statement(StatementUpdate {
      hash: "v".into(),
      increment_retry_count: true,
      ..Default::default()
    })
    .await
    .unwrap();
  assert!(bumped);

  s.update_statement(StatementUpdate {
    hash: "v".into(),
    derived_entity_created: Some(true),
    ..Default::default()
  })
  .await
  .unwrap();

  let v = s.get_statement("v").await.unwrap().unwrap();
  assert_eq!(v.derived_entity_retry_count, 1);
  assert!(v.derived_entity_created);

  let unknown = s
    .update_statement(StatementUpdate { hash: "nope".into(), ..Default::default() })
    .await
    .unwrap();
  assert!(!unknown);
}

#[tokio::test]
async fn supersession_links_old_to_new() {
  let s = store().await;
  persist(&s, new_statement("old", "example.com", StatementType::Statement)).await;

  let mut newer = new_statement("new", "example.com", StatementType::Statement);
  newer.superseded_statement = Some("old".into());
  persist(&s, newer).await;

  let old = s.get_statement("old").await.unwrap().unwrap();
  assert_eq!(old.superseding_statement.as_deref(), Some("new"));
}

#[tokio::test]
async fn supersession_links_when_replacement_arrives_first() {
  let s = store().await;

  let mut newer = new_statement("new", "example.com", StatementType::Statement);
  newer.superseded_statement = Some("old".into());
  persist(&s, newer).await;

  let old = persist(&s, new_statement("old", "example.com", StatementType::Statement)).await;
  assert_eq!(old.superseding_statement.as_deref(), Some("new"));
}

#[tokio::test]
async fn get_statements_pages_by_id() {
  let s = store().await;
  for (i, domain) in ["a.com", "b.com", "a.com", "a.com"].iter().enumerate() {
    let mut input = new_statement(&format!("h{i}"), domain, StatementType::Statement);
    input.hidden = i == 3;
    persist(&s, input).await;
  }

  let all = s.get_statements(&StatementQuery::default()).await.unwrap();
  assert_eq!(all.len(), 3);
  assert!(all.windows(2).all(|w| w[0].id < w[1].id));

  let after_first = s
    .get_statements(&StatementQuery { min_id: Some(all[0].id), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(after_first.len(), 2);
  assert_eq!(after_first[0].hash, "h1");

  let a_only = s
    .get_statements(&StatementQuery {
      domain: Some("a.com".into()),
      include_hidden: true,
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(a_only.len(), 3);
  assert!(a_only.iter().any(|st| st.hidden));

  let mixed_case = s
    .get_statements(&StatementQuery { domain: Some("A.Com".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(mixed_case.len(), 2);

  let limited = s
    .get_statements(&StatementQuery { limit: 1, ..Default::default() })
    .await
    .unwrap();
  assert_eq!(limited.len(), 1);
}

// ─── Unverified statements ───────────────────────────────────────────────────

fn queued(hash: &str) -> NewUnverifiedStatement {
  NewUnverifiedStatement {
    hash:                       hash.to_owned(),
    statement:                  format!("text {hash}"),
    source_node_id:             Some(7),
    source_verification_method: Some(VerificationMethod::Api),
  }
}

#[tokio::test]
async fn unverified_queue_is_insert_if_absent() {
  let s = store().await;
  let created = s.create_unverified_statement(queued("q")).await.unwrap().unwrap();
  assert_eq!(created.verification_retry_count, 0);
  assert!(s.create_unverified_statement(queued("q")).await.unwrap().is_none());

  assert!(s.update_unverified_statement("q", true).await.unwrap());
  assert!(!s.update_unverified_statement("missing", true).await.unwrap());

  let all = s.get_unverified_statements().await.unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(all[0].verification_retry_count, 1);
  assert_eq!(all[0].source_verification_method, Some(VerificationMethod::Api));
  assert_eq!(all[0].source_node_id, Some(7));
}

#[tokio::test]
async fn cleanup_removes_exhausted_and_persisted_entries() {
  let s = store().await;
  s.create_unverified_statement(queued("exhausted")).await.unwrap();
  s.create_unverified_statement(queued("persisted")).await.unwrap();
  s.create_unverified_statement(queued("fresh")).await.unwrap();

  for _ in 0..3 {
    s.update_unverified_statement("exhausted", true).await.unwrap();
  }
  persist(&s, new_statement("persisted", "example.com", StatementType::Statement)).await;

  let deleted = s.delete_expired_unverified_statements(744.0, 2).await.unwrap();
  assert_eq!(deleted, 2);

  let left = s.get_unverified_statements().await.unwrap();
  assert_eq!(left.len(), 1);
  assert_eq!(left[0].hash, "fresh");
}

#[tokio::test]
async fn cleanup_removes_entries_past_max_age() {
  let s = store().await;
  s.create_unverified_statement(queued("q")).await.unwrap();
  tokio::time::sleep(std::time::Duration::from_millis(5)).await;

  let deleted = s.delete_expired_unverified_statements(0.0, 100).await.unwrap();
  assert_eq!(deleted, 1);
}

// ─── Derived entities ────────────────────────────────────────────────────────

fn org_verification(hash: &str, name: &str, domain: &str) -> OrganisationVerification {
  OrganisationVerification {
    statement_hash:    hash.to_owned(),
    verifier_domain:   "verifier.org".to_owned(),
    verified_domain:   Some(domain.to_owned()),
    foreign_domain:    None,
    name:              name.to_owned(),
    legal_entity_type: "corporation".to_owned(),
    country:           "Germany".to_owned(),
    province:          None,
    city:              Some("Berlin".to_owned()),
    serial_number:     None,
    department:        None,
    confidence:        Some(0.9),
  }
}

#[tokio::test]
async fn organisation_verifications_by_domain() {
  let s = store().await;
  persist(&s, new_statement("ov", "verifier.org", StatementType::OrganisationVerification)).await;

  assert!(s.create_organisation_verification(org_verification("ov", "Acme", "acme.com")).await.unwrap());
  assert!(!s.create_organisation_verification(org_verification("ov", "Acme", "acme.com")).await.unwrap());

  let found = s.get_verifications_for_domain("acme.com").await.unwrap();
  assert_eq!(found, vec![org_verification("ov", "Acme", "acme.com")]);
  assert!(s.get_verifications_for_domain("other.com").await.unwrap().is_empty());
}

#[tokio::test]
async fn person_verifications_by_foreign_domain() {
  let s = store().await;
  persist(&s, new_statement("pv", "verifier.org", StatementType::PersonVerification)).await;

  let row = PersonVerification {
    statement_hash:  "pv".into(),
    verifier_domain: "verifier.org".into(),
    verified_domain: None,
    foreign_domain:  Some("blog.example".into()),
    name:            "Jane Doe".into(),
    birth_country:   "France".into(),
    birth_city:      "Lyon".into(),
    birth_date:      NaiveDate::from_ymd_opt(1990, 3, 4).unwrap(),
    job_title:       None,
    employer:        None,
    confidence:      None,
  };
  assert!(s.create_person_verification(row.clone()).await.unwrap());

  let found = s.get_person_verifications_for_domain("blog.example").await.unwrap();
  assert_eq!(found, vec![row]);
}

#[tokio::test]
async fn poll_round_trip() {
  let s = store().await;
  persist(&s, new_statement("poll", "example.com", StatementType::Poll)).await;

  let poll = Poll {
    statement_hash:             "poll".into(),
    domain:                     "example.com".into(),
    question:                   "Which colour?".into(),
    deadline:                   Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
    options:                    vec!["red".into(), "blue".into()],
    allow_arbitrary_vote:       Some(false),
    participants_entity_type:   Some("corporation".into()),
    participants_country:       None,
    participants_city:          None,
    required_property:          None,
    required_property_value:    None,
    required_property_observer: None,
  };
  assert!(s.create_poll(poll.clone()).await.unwrap());
  assert_eq!(s.get_poll("poll").await.unwrap(), Some(poll));
  assert!(s.get_poll("nope").await.unwrap().is_none());
}

fn vote(hash: &str, author: &str, minute: u32, qualified: bool) -> Vote {
  Vote {
    statement_hash:              hash.to_owned(),
    poll_hash:                   "poll".to_owned(),
    option:                      "red".to_owned(),
    domain:                      "voter.com".to_owned(),
    author:                      author.to_owned(),
    proclaimed_publication_time: Utc.with_ymd_and_hms(2024, 1, 12, 10, minute, 0).unwrap(),
    qualified,
  }
}

#[tokio::test]
async fn votes_filter_and_requalify() {
  let s = store().await;
  for hash in ["v1", "v2", "v3"] {
    persist(&s, new_statement(hash, "voter.com", StatementType::Vote)).await;
  }
  s.create_vote(vote("v1", "Voter Inc", 5, true)).await.unwrap();
  s.create_vote(vote("v2", "VOTER INC", 1, false)).await.unwrap();
  s.create_vote(vote("v3", "Someone Else", 2, true)).await.unwrap();

  let by_author = s
    .get_votes("poll", &VoteFilter {
      domain: Some("voter.com".into()),
      author: Some("voter inc".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  let hashes: Vec<_> = by_author.iter().map(|v| v.statement_hash.as_str()).collect();
  assert_eq!(hashes, ["v2", "v1"]);

  let qualified = s
    .get_votes("poll", &VoteFilter {
      qualified_only: true,
      ignore_statement_hash: Some("v3".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(qualified.len(), 1);
  assert_eq!(qualified[0].statement_hash, "v1");

  assert!(s.update_vote("v2", true).await.unwrap());
  assert!(s.get_vote("v2").await.unwrap().unwrap().qualified);
  assert!(s.get_votes("other-poll", &VoteFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn superseded_derived_rows_are_deleted() {
  let s = store().await;
  persist(&s, new_statement("old", "voter.com", StatementType::Vote)).await;
  persist(&s, new_statement("org", "verifier.org", StatementType::OrganisationVerification)).await;
  let mut newer = new_statement("new", "voter.com", StatementType::Vote);
  newer.superseded_statement = Some("old".into());
  persist(&s, newer).await;

  s.create_vote(vote("old", "Voter Inc", 1, true)).await.unwrap();
  s.create_vote(vote("new", "Voter Inc", 2, false)).await.unwrap();
  s.create_organisation_verification(org_verification("org", "Voter Inc", "voter.com"))
    .await
    .unwrap();

  assert_eq!(s.delete_superseded_derived_entities().await.unwrap(), 1);
  assert!(s.get_vote("old").await.unwrap().is_none());
  assert!(s.get_vote("new").await.unwrap().is_some());
  assert_eq!(s.get_verifications_for_domain("voter.com").await.unwrap().len(), 1);
  assert_eq!(s.delete_superseded_derived_entities().await.unwrap(), 0);
}

#[tokio::test]
async fn ratings_filter_by_subject() {
  let s = store().await;
  persist(&s, new_statement("r1", "rater.com", StatementType::Rating)).await;
  persist(&s, new_statement("r2", "rater.com", StatementType::Rating)).await;

  let rating = |hash: &str, subject: &str| Rating {
    statement_hash:              hash.to_owned(),
    domain:                      "rater.com".to_owned(),
    author:                      "Rater".to_owned(),
    subject_name:                subject.to_owned(),
    subject_type:                Some("Organisation".to_owned()),
    subject_reference:           None,
    document_file_hash:          None,
    quality:                     None,
    rating:                      4,
    comment:                     None,
    proclaimed_publication_time: Utc.with_ymd_and_hms(2024, 1, 12, 10, 0, 0).unwrap(),
    qualified:                   false,
  };
  s.create_rating(rating("r1", "Acme")).await.unwrap();
  s.create_rating(rating("r2", "Globex")).await.unwrap();

  let acme = s
    .get_ratings(&RatingFilter { subject_name: Some("Acme".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(acme.len(), 1);
  assert_eq!(acme[0].rating, 4);

  assert!(s.update_rating("r1", true).await.unwrap());
  assert!(s.get_rating("r1").await.unwrap().unwrap().qualified);
}

#[tokio::test]
async fn observations_match_subject_verification_hash() {
  let s = store().await;
  persist(&s, new_statement("ov-hash", "verifier.org", StatementType::OrganisationVerification)).await;
  s.create_organisation_verification(org_verification("ov-hash", "Acme", "acme.com"))
    .await
    .unwrap();

  let mut observation = new_statement("obs", "observer.org", StatementType::Observation);
  observation.content = "\n\tType: Observation\n\tSubject: Acme\n\
    \tSubject identity reference: ov-hash\n\tObserved property: ISO 9001\n\
    \tObserved value: certified\n"
    .to_owned();
  persist(&s, observation).await;

  let mut unrelated = new_statement("obs2", "observer.org", StatementType::Observation);
  unrelated.content = "\n\tType: Observation\n\tSubject: Acme\n\
    \tSubject identity reference: something-else\n\tObserved property: ISO 9001\n"
    .to_owned();
  persist(&s, unrelated).await;

  let query = ObservationQuery {
    name:            "acme".into(),
    domain:          "acme.com".into(),
    observer_name:   None,
    observer_domain: Some("observer.org".into()),
  };
  let found = s.get_observations_for_entity(&query).await.unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0].hash, "obs");

  let other_observer = ObservationQuery {
    observer_domain: Some("elsewhere.org".into()),
    ..query
  };
  assert!(s.get_observations_for_entity(&other_observer).await.unwrap().is_empty());
}

// ─── Nodes ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_node_is_idempotent() {
  let s = store().await;
  let first = s.add_node("peer.example").await.unwrap();
  let again = s.add_node("peer.example").await.unwrap();
  assert_eq!(first.id, again.id);
  assert!(again.last_seen >= first.last_seen);
  assert_eq!(s.get_all_nodes().await.unwrap().len(), 1);
}

#[tokio::test]
async fn node_cursor_never_regresses() {
  let s = store().await;
  s.add_node("peer.example").await.unwrap();

  let advance = |id: Option<i64>| NodeUpdate {
    domain: "peer.example".into(),
    last_received_statement_id: id,
    ..Default::default()
  };

  assert!(s.update_node(advance(Some(50))).await.unwrap());
  s.update_node(advance(Some(40))).await.unwrap();
  s.update_node(advance(None)).await.unwrap();

  let node = &s.get_all_nodes().await.unwrap()[0];
  assert_eq!(node.last_received_statement_id, Some(50));

  s.update_node(advance(Some(51))).await.unwrap();
  let node = &s.get_all_nodes().await.unwrap()[0];
  assert_eq!(node.last_received_statement_id, Some(51));

  assert!(!s.update_node(NodeUpdate { domain: "unknown".into(), ..Default::default() }).await.unwrap());
}

#[tokio::test]
async fn node_update_keeps_tls_metadata_when_absent() {
  let s = store().await;
  s.add_node("peer.example").await.unwrap();
  s.update_node(NodeUpdate {
    domain:                "peer.example".into(),
    certificate_authority: Some("CN=Test CA".into()),
    fingerprint:           Some("aa:bb".into()),
    ip:                    Some("203.0.113.7".into()),
    ..Default::default()
  })
  .await
  .unwrap();
  s.update_node(NodeUpdate { domain: "peer.example".into(), ..Default::default() })
    .await
    .unwrap();

  let node = &s.get_all_nodes().await.unwrap()[0];
  assert_eq!(node.certificate_authority.as_deref(), Some("CN=Test CA"));
  assert_eq!(node.fingerprint.as_deref(), Some("aa:bb"));
  assert_eq!(node.ip.as_deref(), Some("203.0.113.7"));
}

// ─── Verification log ────────────────────────────────────────────────────────

#[tokio::test]
async fn log_candidates_prefer_least_checked() {
  let s = store().await;
  persist(&s, new_statement("mine", "self.example", StatementType::Statement)).await;
  persist(&s, new_statement("checked", "a.com", StatementType::Statement)).await;
  persist(&s, new_statement("unchecked", "b.com", StatementType::Statement)).await;

  s.add_verification_log(VerificationLogEntry {
    statement_hash: "checked".into(),
    t:              Utc::now(),
    api:            false,
    dns:            true,
    txt:            false,
  })
  .await
  .unwrap();

  let candidates = s.get_verification_log_candidates("self.example", 10).await.unwrap();
  let hashes: Vec<_> = candidates.iter().map(|c| c.statement.hash.as_str()).collect();
  assert_eq!(hashes, ["unchecked", "checked"]);
  assert_eq!(candidates[0].log_count, 0);
  assert!(candidates[0].first_logged.is_none());
  assert_eq!(candidates[1].log_count, 1);
  assert!(candidates[1].first_logged.is_some());

  let log = s.get_verification_log("checked").await.unwrap();
  assert_eq!(log.len(), 1);
  assert!(log[0].dns);
}
