//! The `StatementStore` trait: the persistence interface the node consumes.
//!
//! Implemented by storage backends (e.g. `stated-store-sqlite`). Cross-cutting
//! invariants live in the backend as constraints: one statement per hash
//! (insert-if-absent) and a sync cursor that never moves backwards
//! (conditional update). Callers never coordinate in-process.

use std::future::Future;

use crate::{
  entity::{
    ObservationQuery, OrganisationVerification, PersonVerification, Poll, Rating,
    RatingFilter, Vote, VoteFilter,
  },
  node::{Node, NodeUpdate},
  statement::{
    NewStatement, NewUnverifiedStatement, Statement, StatementQuery, StatementUpdate,
    UnverifiedStatement,
  },
  verification_log::{LogCandidate, VerificationLogEntry},
};

/// Abstraction over a stated store backend.
///
/// Every method must be safe to call concurrently and must fail fast with a
/// "not ready" error until the backend has finished migrating.
pub trait StatementStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Statements ────────────────────────────────────────────────────────

  fn statement_exists<'a>(
    &'a self,
    hash: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Insert a statement unless one with the same hash exists. Returns `None`
  /// on conflict. Also maintains the supersession back-references.
  fn create_statement(
    &self,
    input: NewStatement,
  ) -> impl Future<Output = Result<Option<Statement>, Self::Error>> + Send + '_;

  fn get_statement<'a>(
    &'a self,
    hash: &'a str,
  ) -> impl Future<Output = Result<Option<Statement>, Self::Error>> + Send + 'a;

  /// Statements in ascending `id` order.
  fn get_statements<'a>(
    &'a self,
    query: &'a StatementQuery,
  ) -> impl Future<Output = Result<Vec<Statement>, Self::Error>> + Send + 'a;

  /// Statements whose derived row has not been created yet and that have
  /// been attempted fewer than `max_retries` times.
  fn get_statements_missing_derived_entity(
    &self,
    limit: usize,
    max_retries: u32,
  ) -> impl Future<Output = Result<Vec<Statement>, Self::Error>> + Send + '_;

  /// Returns `false` if no statement has that hash.
  fn update_statement(
    &self,
    update: StatementUpdate,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Unverified statements ─────────────────────────────────────────────

  /// Insert unless queued already. Returns `None` on conflict.
  fn create_unverified_statement(
    &self,
    input: NewUnverifiedStatement,
  ) -> impl Future<Output = Result<Option<UnverifiedStatement>, Self::Error>> + Send + '_;

  fn update_unverified_statement<'a>(
    &'a self,
    hash: &'a str,
    increment_retry_count: bool,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  fn get_unverified_statements(
    &self,
  ) -> impl Future<Output = Result<Vec<UnverifiedStatement>, Self::Error>> + Send + '_;

  /// Delete queue entries older than `max_age_hours`, retried more than
  /// `max_retries` times, or already persisted as statements. Returns the
  /// number of deleted rows.
  fn delete_expired_unverified_statements(
    &self,
    max_age_hours: f64,
    max_retries: u32,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Derived entities ──────────────────────────────────────────────────

  /// Delete the verification, vote and rating rows of statements that have
  /// been superseded. Polls are kept since votes point at them. Returns the
  /// number of deleted rows.
  fn delete_superseded_derived_entities(
    &self,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// The `create_*` methods return `false` if a row for that statement
  /// exists already.
  fn create_organisation_verification(
    &self,
    row: OrganisationVerification,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn create_person_verification(
    &self,
    row: PersonVerification,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn create_poll(
    &self,
    row: Poll,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn create_vote(
    &self,
    row: Vote,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn update_vote<'a>(
    &'a self,
    statement_hash: &'a str,
    qualified: bool,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  fn create_rating(
    &self,
    row: Rating,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn update_rating<'a>(
    &'a self,
    statement_hash: &'a str,
    qualified: bool,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  fn get_poll<'a>(
    &'a self,
    statement_hash: &'a str,
  ) -> impl Future<Output = Result<Option<Poll>, Self::Error>> + Send + 'a;

  fn get_vote<'a>(
    &'a self,
    statement_hash: &'a str,
  ) -> impl Future<Output = Result<Option<Vote>, Self::Error>> + Send + 'a;

  fn get_rating<'a>(
    &'a self,
    statement_hash: &'a str,
  ) -> impl Future<Output = Result<Option<Rating>, Self::Error>> + Send + 'a;

  /// Organisation verifications whose verified or foreign domain is `domain`.
  fn get_verifications_for_domain<'a>(
    &'a self,
    domain: &'a str,
  ) -> impl Future<Output = Result<Vec<OrganisationVerification>, Self::Error>> + Send + 'a;

  /// Person verifications whose verified or foreign domain is `domain`.
  fn get_person_verifications_for_domain<'a>(
    &'a self,
    domain: &'a str,
  ) -> impl Future<Output = Result<Vec<PersonVerification>, Self::Error>> + Send + 'a;

  fn get_votes<'a>(
    &'a self,
    poll_hash: &'a str,
    filter: &'a VoteFilter,
  ) -> impl Future<Output = Result<Vec<Vote>, Self::Error>> + Send + 'a;

  fn get_ratings<'a>(
    &'a self,
    filter: &'a RatingFilter,
  ) -> impl Future<Output = Result<Vec<Rating>, Self::Error>> + Send + 'a;

  fn get_observations_for_entity<'a>(
    &'a self,
    query: &'a ObservationQuery,
  ) -> impl Future<Output = Result<Vec<Statement>, Self::Error>> + Send + 'a;

  // ── Nodes ─────────────────────────────────────────────────────────────

  fn get_all_nodes(
    &self,
  ) -> impl Future<Output = Result<Vec<Node>, Self::Error>> + Send + '_;

  /// Insert a node, or refresh `last_seen` if the domain is known. Returns
  /// the stored row either way.
  fn add_node<'a>(
    &'a self,
    domain: &'a str,
  ) -> impl Future<Output = Result<Node, Self::Error>> + Send + 'a;

  /// Returns `false` if the domain is unknown.
  fn update_node(
    &self,
    update: NodeUpdate,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Verification log ──────────────────────────────────────────────────

  fn add_verification_log(
    &self,
    entry: VerificationLogEntry,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_verification_log<'a>(
    &'a self,
    statement_hash: &'a str,
  ) -> impl Future<Output = Result<Vec<VerificationLogEntry>, Self::Error>> + Send + 'a;

  /// Statements not published by `exclude_domain`, least-checked first.
  fn get_verification_log_candidates<'a>(
    &'a self,
    exclude_domain: &'a str,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<LogCandidate>, Self::Error>> + Send + 'a;
}
