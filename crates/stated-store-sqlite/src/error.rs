//! Error type for `stated-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] stated_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

impl Error {
  /// True if the store was used before its schema migration finished.
  pub fn is_not_ready(&self) -> bool {
    matches!(self, Self::Core(stated_core::Error::NotReady))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
