//! Error types for `stated-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The store has not finished its schema migration yet.
  #[error("store is not ready")]
  NotReady,

  #[error("unknown statement type: {0:?}")]
  UnknownStatementType(String),

  #[error("unknown verification method: {0:?}")]
  UnknownVerificationMethod(String),

  #[error("retry schedule must be a non-empty ascending list of hour offsets")]
  InvalidSchedule,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
