//! The verification pipeline: from submitted text to a persisted statement
//! or a queued retry.
//!
//! ```text
//! received -> metadata valid -> exists? -> proof -> persisted -> derived entity
//!                                            \-> queued (unverified)
//! ```
//!
//! Deduplication relies on the store's insert-if-absent; concurrent
//! submissions of one hash need no coordination here.

use std::sync::Arc;

use stated_core::{
  hash,
  statement::{NewStatement, NewUnverifiedStatement, Statement, VerificationMethod},
  store::StatementStore,
};
use stated_format::parse_statement;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  derive,
  verify::{Claim, ProofSource, establish, strategy_order},
};

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Errors surfaced to a submitter. Proof failures are not errors; they queue
/// the statement instead.
#[derive(Debug, Error)]
pub enum SubmitError {
  #[error("malformed statement: {0}")]
  MalformedStatement(#[from] stated_format::Error),

  #[error("unsupported statement type: {0:?}")]
  InvalidStatementType(String),

  #[error("hash does not match statement text")]
  HashMismatch,

  #[error("invalid api key")]
  InvalidApiKey,

  #[error("hidden statements require an api key")]
  HiddenRequiresApiKey,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl SubmitError {
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

// ─── Submissions ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Submission {
  pub statement:           String,
  pub hash:                String,
  /// The peer that relayed the statement, if any.
  pub source_node_id:      Option<i64>,
  /// Declared method; `dns` if unset.
  pub verification_method: Option<VerificationMethod>,
  pub api_key:             Option<String>,
  pub hidden:              bool,
}

impl Submission {
  pub fn new(statement: impl Into<String>, hash: impl Into<String>) -> Self {
    Self { statement: statement.into(), hash: hash.into(), ..Self::default() }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
  /// A statement with this hash is stored already; nothing changed.
  AlreadyPersisted,
  Persisted(Statement),
  /// No proof held; the statement waits in the unverified queue.
  Queued,
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

pub struct Pipeline<S, P> {
  store:      Arc<S>,
  proofs:     Arc<P>,
  own_domain: String,
  api_key:    Option<String>,
}

impl<S: StatementStore, P: ProofSource> Pipeline<S, P> {
  pub fn new(
    store: Arc<S>,
    proofs: Arc<P>,
    own_domain: impl Into<String>,
    api_key: Option<String>,
  ) -> Self {
    Self { store, proofs, own_domain: own_domain.into(), api_key }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn proofs(&self) -> &Arc<P> { &self.proofs }

  pub fn own_domain(&self) -> &str { &self.own_domain }

  pub async fn submit(&self, sub: Submission) -> Result<Outcome, SubmitError> {
    let fields = parse_statement(&sub.statement)?;
    let statement_type = fields.statement_type().ok_or_else(|| {
      SubmitError::InvalidStatementType(fields.type_name().unwrap_or_default().to_owned())
    })?;
    if !hash::verify(&sub.statement, &sub.hash) {
      return Err(SubmitError::HashMismatch);
    }
    let self_published = self.authorize(&fields.domain, &sub)?;

    if self.store.statement_exists(&sub.hash).await.map_err(SubmitError::store)? {
      debug!(hash = %sub.hash, "statement exists already");
      return Ok(Outcome::AlreadyPersisted);
    }

    let verification_method = if self_published {
      VerificationMethod::Api
    } else {
      let claim = Claim {
        domain:    fields.domain.clone(),
        hash:      sub.hash.clone(),
        statement: sub.statement.clone(),
      };
      let declared = sub.verification_method.unwrap_or(VerificationMethod::Dns);
      match establish(self.proofs.as_ref(), strategy_order(declared), &claim).await {
        Some(strategy) => strategy.verification_method(),
        None => {
          self.enqueue(&sub).await?;
          info!(hash = %sub.hash, domain = %fields.domain, "statement queued for verification");
          return Ok(Outcome::Queued);
        }
      }
    };

    let input = NewStatement {
      hash: sub.hash.clone(),
      content_hash: hash::content_address(&fields.content),
      statement: sub.statement,
      domain: fields.domain,
      author: fields.author,
      proclaimed_publication_time: fields.time,
      tags: fields.tags,
      statement_type,
      content: fields.content,
      verification_method,
      source_node_id: sub.source_node_id,
      superseded_statement: fields.superseded_statement,
      hidden: sub.hidden,
    };
    let Some(statement) =
      self.store.create_statement(input).await.map_err(SubmitError::store)?
    else {
      return Ok(Outcome::AlreadyPersisted);
    };
    info!(
      hash = %statement.hash,
      domain = %statement.domain,
      method = %statement.verification_method,
      "statement persisted"
    );

    if !statement.derived_entity_created {
      derive::derive_and_record(self.store.as_ref(), &statement).await;
    }
    Ok(Outcome::Persisted(statement))
  }

  /// `true` for a valid self-publish key. A key that does not match this
  /// node's domain and key is rejected outright.
  fn authorize(&self, domain: &str, sub: &Submission) -> Result<bool, SubmitError> {
    let Some(key) = sub.api_key.as_deref() else {
      return if sub.hidden { Err(SubmitError::HiddenRequiresApiKey) } else { Ok(false) };
    };
    let valid = self.api_key.as_deref().is_some_and(|own| own == key)
      && domain.eq_ignore_ascii_case(&self.own_domain);
    if valid { Ok(true) } else { Err(SubmitError::InvalidApiKey) }
  }

  async fn enqueue(&self, sub: &Submission) -> Result<(), SubmitError> {
    let created = self
      .store
      .create_unverified_statement(NewUnverifiedStatement {
        hash:                       sub.hash.clone(),
        statement:                  sub.statement.clone(),
        source_node_id:             sub.source_node_id,
        source_verification_method: sub.verification_method,
      })
      .await
      .map_err(SubmitError::store)?;
    if created.is_none() {
      self
        .store
        .update_unverified_statement(&sub.hash, true)
        .await
        .map_err(SubmitError::store)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use stated_core::statement::StatementType;
  use stated_store_sqlite::SqliteStore;

  use super::*;
  use crate::{
    testing::{FakeProof, POLL_CONTENT, statement_text, store},
    verify::ProofStrategy,
  };

  fn pipeline(
    store: Arc<SqliteStore>,
    proofs: FakeProof,
  ) -> Pipeline<SqliteStore, FakeProof> {
    Pipeline::new(store, Arc::new(proofs), "own.test", Some("secret".into()))
  }

  #[tokio::test]
  async fn same_statement_twice_persists_once() {
    let store = store().await;
    let p = pipeline(store.clone(), FakeProof::succeeding(&[ProofStrategy::Dns]));
    let (text, hash) = statement_text("example.com", "Example Inc.", "We like trains.");

    let first = p.submit(Submission::new(&text, &hash)).await.unwrap();
    assert!(matches!(first, Outcome::Persisted(ref s) if s.verification_method == VerificationMethod::Dns));
    let second = p.submit(Submission::new(&text, &hash)).await.unwrap();
    assert_eq!(second, Outcome::AlreadyPersisted);

    let all = store.get_statements(&Default::default()).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(p.proofs().attempts(), vec![ProofStrategy::Dns]);
  }

  #[tokio::test]
  async fn method_reflects_the_strategy_that_succeeded() {
    let store = store().await;
    let p = pipeline(store, FakeProof::succeeding(&[ProofStrategy::RemoteService]));
    let (text, hash) = statement_text("example.com", "Example Inc.", "hello");

    let Outcome::Persisted(s) = p.submit(Submission::new(&text, &hash)).await.unwrap() else {
      panic!("not persisted");
    };
    assert_eq!(s.verification_method, VerificationMethod::Api);
    assert_eq!(p.proofs().attempts(), vec![ProofStrategy::Dns, ProofStrategy::RemoteService]);
  }

  #[tokio::test]
  async fn valid_api_key_bypasses_proofs() {
    let store = store().await;
    let p = pipeline(store.clone(), FakeProof::succeeding(&[]));
    let (text, hash) = statement_text("own.test", "Own", "self published");

    let sub = Submission { api_key: Some("secret".into()), hidden: true, ..Submission::new(&text, &hash) };
    let Outcome::Persisted(s) = p.submit(sub).await.unwrap() else { panic!("not persisted") };
    assert_eq!(s.verification_method, VerificationMethod::Api);
    assert!(s.hidden);
    assert!(p.proofs().attempts().is_empty());
  }

  #[tokio::test]
  async fn invalid_api_key_is_rejected_and_not_queued() {
    let store = store().await;
    let p = pipeline(store.clone(), FakeProof::succeeding(&[]));
    let (text, hash) = statement_text("own.test", "Own", "self published");
    let sub = Submission { api_key: Some("wrong".into()), ..Submission::new(&text, &hash) };
    assert!(matches!(p.submit(sub).await, Err(SubmitError::InvalidApiKey)));

    // The right key for another domain is no better.
    let (text, hash) = statement_text("example.com", "Example", "not ours");
    let sub = Submission { api_key: Some("secret".into()), ..Submission::new(&text, &hash) };
    assert!(matches!(p.submit(sub).await, Err(SubmitError::InvalidApiKey)));

    assert!(store.get_unverified_statements().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn hidden_requires_api_key() {
    let store = store().await;
    let p = pipeline(store, FakeProof::succeeding(&[ProofStrategy::Dns]));
    let (text, hash) = statement_text("example.com", "Example", "hide me");
    let sub = Submission { hidden: true, ..Submission::new(&text, &hash) };
    assert!(matches!(p.submit(sub).await, Err(SubmitError::HiddenRequiresApiKey)));
  }

  #[tokio::test]
  async fn structural_errors_are_rejected() {
    let store = store().await;
    let p = pipeline(store.clone(), FakeProof::succeeding(&[ProofStrategy::Dns]));

    let (text, _) = statement_text("example.com", "Example", "hello");
    let bad_hash = Submission::new(&text, hash::content_address("something else"));
    assert!(matches!(p.submit(bad_hash).await, Err(SubmitError::HashMismatch)));

    let garbage = "Author: nobody\n";
    let sub = Submission::new(garbage, hash::content_address(garbage));
    assert!(matches!(p.submit(sub).await, Err(SubmitError::MalformedStatement(_))));

    let (text, hash) = statement_text("example.com", "Example", "\n\tType: Lottery\n\tPrize: 1\n");
    assert!(matches!(
      p.submit(Submission::new(&text, &hash)).await,
      Err(SubmitError::InvalidStatementType(t)) if t == "Lottery"
    ));

    assert!(store.get_unverified_statements().await.unwrap().is_empty());
    assert!(p.proofs().attempts().is_empty());
  }

  #[tokio::test]
  async fn unproven_statement_is_queued_and_counted() {
    let store = store().await;
    let p = pipeline(store.clone(), FakeProof::succeeding(&[]));
    let (text, hash) = statement_text("example.com", "Example", "maybe later");

    assert_eq!(p.submit(Submission::new(&text, &hash)).await.unwrap(), Outcome::Queued);
    assert_eq!(p.submit(Submission::new(&text, &hash)).await.unwrap(), Outcome::Queued);

    let queued = store.get_unverified_statements().await.unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].verification_retry_count, 1);
    assert!(!store.statement_exists(&hash).await.unwrap());
  }

  #[tokio::test]
  async fn declared_api_method_skips_dns() {
    let store = store().await;
    let p = pipeline(store, FakeProof::succeeding(&[ProofStrategy::StaticFile]));
    let (text, hash) = statement_text("example.com", "Example", "via file");
    let sub = Submission {
      verification_method: Some(VerificationMethod::Api),
      ..Submission::new(&text, &hash)
    };
    assert!(matches!(p.submit(sub).await.unwrap(), Outcome::Persisted(_)));
    assert_eq!(
      p.proofs().attempts(),
      vec![ProofStrategy::RemoteService, ProofStrategy::StaticFile]
    );
  }

  #[tokio::test]
  async fn poll_is_derived_on_persist() {
    let store = store().await;
    let p = pipeline(store.clone(), FakeProof::succeeding(&[ProofStrategy::Dns]));
    let (text, hash) = statement_text("example.com", "Example", POLL_CONTENT);

    let Outcome::Persisted(s) = p.submit(Submission::new(&text, &hash)).await.unwrap() else {
      panic!("not persisted");
    };
    assert_eq!(s.statement_type, StatementType::Poll);
    assert!(store.get_poll(&hash).await.unwrap().is_some());
    assert!(store.get_statement(&hash).await.unwrap().unwrap().derived_entity_created);
  }
}
