//! Error type for peer interactions and collaborator failures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("refusing to contact own domain {0}")]
  OwnDomain(String),

  #[error("invalid peer domain: {0:?}")]
  InvalidDomain(String),

  #[error("peer {host} unreachable: {message}")]
  PeerUnreachable { host: String, message: String },

  #[error("peer {host} timed out")]
  PeerTimeout { host: String },

  #[error("peer {host} answered with status {status}")]
  PeerStatus { host: String, status: u16 },

  #[error("malformed response from {host}: {message}")]
  PeerMalformedResponse { host: String, message: String },

  #[error("{0} is not running a stated node")]
  NotAPeer(String),

  #[error("failed to encode request body: {0}")]
  Encode(#[from] serde_json::Error),

  #[error("dns lookup failed: {0}")]
  Dns(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
