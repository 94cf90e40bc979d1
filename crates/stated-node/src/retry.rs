//! Retry and cleanup sweeps for queued submissions and missing derived
//! entities, both paced by a [`RetrySchedule`].

use chrono::Utc;
use futures::future::join_all;
use stated_core::{schedule::RetrySchedule, store::StatementStore};
use tracing::{debug, info, warn};

use crate::{
  Error, Result, derive,
  pipeline::{Outcome, Pipeline, Submission},
  verify::ProofSource,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryReport {
  /// Queued submissions re-verified this sweep.
  pub retried:    usize,
  /// Of those, now persisted.
  pub promoted:   usize,
  /// Queue entries dropped by cleanup.
  pub deleted:    usize,
  /// Derived rows removed because their statement was superseded.
  pub superseded: usize,
  /// Derived entities re-attempted.
  pub derived:    usize,
  /// Of those, now created.
  pub created:    usize,
}

/// Re-run verification for every queued submission that is behind schedule.
/// Returns `(retried, promoted)`.
pub async fn retry_unverified<S, P>(
  pipeline: &Pipeline<S, P>,
  schedule: &RetrySchedule,
  limit: usize,
) -> Result<(usize, usize)>
where
  S: StatementStore,
  P: ProofSource,
{
  let store = pipeline.store();
  let now = Utc::now();
  let due: Vec<_> = store
    .get_unverified_statements()
    .await
    .map_err(Error::store)?
    .into_iter()
    .filter(|u| schedule.is_due(u.received_time, u.verification_retry_count, now))
    .take(limit)
    .collect();

  let outcomes = join_all(due.iter().map(|u| {
    pipeline.submit(Submission {
      statement:           u.statement.clone(),
      hash:                u.hash.clone(),
      source_node_id:      u.source_node_id,
      verification_method: u.source_verification_method,
      api_key:             None,
      hidden:              false,
    })
  }))
  .await;

  let mut promoted = 0;
  for (u, outcome) in due.iter().zip(outcomes) {
    match outcome {
      Ok(Outcome::Persisted(_) | Outcome::AlreadyPersisted) => promoted += 1,
      Ok(Outcome::Queued) => {}
      Err(e) => {
        // Cannot succeed later either; count the attempt so cleanup drops it.
        debug!(hash = %u.hash, error = %e, "queued statement rejected");
        if let Err(e) = store.update_unverified_statement(&u.hash, true).await {
          warn!(hash = %u.hash, error = %e, "failed to count verification attempt");
        }
      }
    }
  }
  Ok((due.len(), promoted))
}

/// Drop queue entries past the schedule, out of attempts, or persisted.
pub async fn cleanup_unverified<S: StatementStore>(
  store: &S,
  schedule: &RetrySchedule,
) -> Result<usize> {
  store
    .delete_expired_unverified_statements(schedule.max_age_hours(), schedule.len() as u32)
    .await
    .map_err(Error::store)
}

/// Re-attempt derived entities that are behind schedule. Returns
/// `(attempted, created)`.
pub async fn retry_derived<S: StatementStore>(
  store: &S,
  schedule: &RetrySchedule,
  limit: usize,
) -> Result<(usize, usize)> {
  let now = Utc::now();
  let due: Vec<_> = store
    .get_statements_missing_derived_entity(limit, schedule.len() as u32)
    .await
    .map_err(Error::store)?
    .into_iter()
    .filter(|s| schedule.is_due(s.first_verification_time, s.derived_entity_retry_count, now))
    .collect();

  // Sequential: a poll and its votes may both be due in one sweep.
  let mut created = 0;
  for statement in &due {
    if derive::derive_and_record(store, statement).await {
      created += 1;
    }
  }
  Ok((due.len(), created))
}

/// Drop the derived rows of superseded statements so the replacement can
/// take their place in tallies.
pub async fn cleanup_superseded<S: StatementStore>(store: &S) -> Result<usize> {
  store.delete_superseded_derived_entities().await.map_err(Error::store)
}

/// One full sweep. Superseded rows go before derivation is retried.
pub async fn run_once<S, P>(
  pipeline: &Pipeline<S, P>,
  verification: &RetrySchedule,
  derived: &RetrySchedule,
  limit: usize,
) -> Result<RetryReport>
where
  S: StatementStore,
  P: ProofSource,
{
  let (retried, promoted) = retry_unverified(pipeline, verification, limit).await?;
  let deleted = cleanup_unverified(pipeline.store().as_ref(), verification).await?;
  let superseded = cleanup_superseded(pipeline.store().as_ref()).await?;
  let (derived, created) = retry_derived(pipeline.store().as_ref(), derived, limit).await?;

  let report = RetryReport { retried, promoted, deleted, superseded, derived, created };
  if report != RetryReport::default() {
    info!(retried, promoted, deleted, superseded, derived, created, "retry sweep");
  }
  Ok(report)
}

#[cfg(test)]
mod tests {
  use std::{sync::Arc, time::Duration};

  use stated_core::{
    entity::VoteFilter,
    statement::{NewStatement, StatementType},
  };
  use stated_format::content::{OrganisationVerificationContent, VoteContent, organisation, vote};
  use stated_store_sqlite::SqliteStore;

  use super::*;
  use crate::{
    testing::{
      FakeProof, POLL_CONTENT, new_statement, persist, published_at, statement_text, store,
    },
    verify::ProofStrategy,
  };

  fn voter_verification() -> String {
    organisation::build(&OrganisationVerificationContent {
      name: "Voter Inc.".into(),
      country: "Denmark".into(),
      legal_form: "corporation".into(),
      domain: Some("voter.test".into()),
      city: Some("Copenhagen".into()),
      ..Default::default()
    })
    .unwrap()
  }

  fn typed(
    hash: &str,
    domain: &str,
    author: &str,
    kind: StatementType,
    content: &str,
  ) -> NewStatement {
    NewStatement {
      author: author.into(),
      content: content.into(),
      ..new_statement(hash, domain, kind)
    }
  }

  fn tiny() -> RetrySchedule { RetrySchedule::new(vec![0.0, 0.000_001]).unwrap() }

  fn pipeline(store: Arc<SqliteStore>, proofs: FakeProof) -> Pipeline<SqliteStore, FakeProof> {
    Pipeline::new(store, Arc::new(proofs), "own.test", None)
  }

  async fn settle() { tokio::time::sleep(Duration::from_millis(10)).await }

  #[tokio::test]
  async fn queued_statement_is_promoted_once_provable() {
    let store = store().await;
    let p = pipeline(store.clone(), FakeProof::succeeding(&[]));
    let (text, hash) = statement_text("example.com", "Example", "eventually");
    assert_eq!(p.submit(Submission::new(&text, &hash)).await.unwrap(), Outcome::Queued);

    settle().await;
    p.proofs().set(&[ProofStrategy::Dns]);
    let report = run_once(&p, &RetrySchedule::default(), &RetrySchedule::default(), 100)
      .await
      .unwrap();
    assert_eq!(report.retried, 1);
    assert_eq!(report.promoted, 1);
    assert_eq!(report.deleted, 1);
    assert!(store.statement_exists(&hash).await.unwrap());
    assert!(store.get_unverified_statements().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn not_due_entries_are_left_alone() {
    let store = store().await;
    let p = pipeline(store.clone(), FakeProof::succeeding(&[]));
    let (text, hash) = statement_text("example.com", "Example", "patience");
    p.submit(Submission::new(&text, &hash)).await.unwrap();

    // A first offset an hour out means nothing is due yet.
    let later = RetrySchedule::new(vec![1.0, 2.0]).unwrap();
    assert_eq!(retry_unverified(&p, &later, 100).await.unwrap(), (0, 0));
    assert_eq!(p.proofs().attempts().len(), 3);
  }

  #[tokio::test]
  async fn exhausted_statement_is_abandoned() {
    let store = store().await;
    let p = pipeline(store.clone(), FakeProof::succeeding(&[]));
    let (text, hash) = statement_text("example.com", "Example", "never provable");
    p.submit(Submission::new(&text, &hash)).await.unwrap();

    settle().await;
    let report = run_once(&p, &tiny(), &tiny(), 100).await.unwrap();
    assert_eq!(report.retried, 1);
    assert_eq!(report.promoted, 0);
    assert_eq!(report.deleted, 1);
    assert!(store.get_unverified_statements().await.unwrap().is_empty());

    let report = run_once(&p, &tiny(), &tiny(), 100).await.unwrap();
    assert_eq!(report, RetryReport::default());
    assert!(!store.statement_exists(&hash).await.unwrap());
  }

  #[tokio::test]
  async fn vote_is_derived_once_its_poll_arrives() {
    let store = store().await;
    let p = pipeline(store.clone(), FakeProof::succeeding(&[ProofStrategy::Dns]));

    let verification = voter_verification();
    let (poll_text, poll_hash) = statement_text("pollster.test", "Pollster", POLL_CONTENT);
    let ballot = vote::build(&VoteContent {
      poll_hash: poll_hash.clone(),
      poll:      "Is this a boring poll?".into(),
      option:    "Yes".into(),
    })
    .unwrap();
    let (v_text, v_hash) = statement_text("verifier.test", "Verifier", &verification);
    let (vote_text, vote_hash) = statement_text("voter.test", "Voter Inc.", &ballot);

    p.submit(Submission::new(&v_text, &v_hash)).await.unwrap();
    p.submit(Submission::new(&vote_text, &vote_hash)).await.unwrap();
    assert!(!store.get_vote(&vote_hash).await.unwrap().unwrap().qualified);
    p.submit(Submission::new(&poll_text, &poll_hash)).await.unwrap();

    settle().await;
    let (attempted, created) = retry_derived(store.as_ref(), &tiny(), 100).await.unwrap();
    assert_eq!((attempted, created), (1, 1));
    assert!(store.get_vote(&vote_hash).await.unwrap().unwrap().qualified);
    assert!(store.get_statements_missing_derived_entity(100, 2).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn exhausted_derivations_do_not_block_the_sweep() {
    let store = store().await;
    let bad = persist(
      store.as_ref(),
      &typed("bad", "pollster.test", "Pollster", StatementType::Poll, "\n\tType: Poll\n"),
    )
    .await;
    for _ in 0..tiny().len() {
      assert!(!derive::derive_and_record(store.as_ref(), &bad).await);
    }
    persist(
      store.as_ref(),
      &typed("good", "pollster.test", "Pollster", StatementType::Poll, POLL_CONTENT),
    )
    .await;

    settle().await;
    let (attempted, created) = retry_derived(store.as_ref(), &tiny(), 1).await.unwrap();
    assert_eq!((attempted, created), (1, 1));
    assert!(store.get_poll("good").await.unwrap().is_some());
    assert_eq!(store.get_statement("bad").await.unwrap().unwrap().derived_entity_retry_count, 2);
  }

  #[tokio::test]
  async fn superseding_vote_takes_the_place_of_the_old_one() {
    let store = store().await;
    let p = pipeline(store.clone(), FakeProof::default());
    let ballot = |option: &str| {
      vote::build(&VoteContent {
        poll_hash: "poll".into(),
        poll:      "Is this a boring poll?".into(),
        option:    option.into(),
      })
      .unwrap()
    };

    let seeded = [
      typed(
        "v1",
        "verifier.test",
        "Verifier",
        StatementType::OrganisationVerification,
        &voter_verification(),
      ),
      typed("poll", "pollster.test", "Pollster", StatementType::Poll, POLL_CONTENT),
      typed("old", "voter.test", "Voter Inc.", StatementType::Vote, &ballot("Yes")),
    ];
    for input in &seeded {
      let s = persist(store.as_ref(), input).await;
      assert!(derive::derive_and_record(store.as_ref(), &s).await, "{}", s.hash);
    }

    let newer = NewStatement {
      proclaimed_publication_time: published_at() + chrono::Duration::hours(1),
      superseded_statement: Some("old".into()),
      ..typed("new", "voter.test", "Voter Inc.", StatementType::Vote, &ballot("No"))
    };
    let newer = persist(store.as_ref(), &newer).await;
    // The earlier vote still holds the voter's slot.
    assert!(!derive::derive_and_record(store.as_ref(), &newer).await);

    settle().await;
    let report = run_once(&p, &tiny(), &tiny(), 100).await.unwrap();
    assert_eq!(report.superseded, 1);
    assert_eq!((report.derived, report.created), (1, 1));
    assert!(store.get_vote("old").await.unwrap().is_none());

    let filter = VoteFilter { qualified_only: true, ..VoteFilter::default() };
    let tally = store.get_votes("poll", &filter).await.unwrap();
    assert_eq!(tally.len(), 1);
    assert_eq!(tally[0].statement_hash, "new");
    assert_eq!(tally[0].option, "No");

    let again = run_once(&p, &tiny(), &tiny(), 100).await.unwrap();
    assert_eq!(again, RetryReport::default());
  }
}
