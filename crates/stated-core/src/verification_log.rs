//! Periodic re-verification records. Append-only, observability only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::statement::Statement;

/// Which proof strategies held for a statement at time `t`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationLogEntry {
  pub statement_hash: String,
  pub t:              DateTime<Utc>,
  /// Remote statement service.
  pub api:            bool,
  pub dns:            bool,
  /// Static `statements.txt` file.
  pub txt:            bool,
}

/// A statement together with how often it has been re-checked so far.
#[derive(Debug, Clone)]
pub struct LogCandidate {
  pub statement:    Statement,
  pub log_count:    u32,
  pub first_logged: Option<DateTime<Utc>>,
}
