//! Peer nodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A peer running the same protocol, keyed by its unique `domain`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
  pub id:                         i64,
  pub domain:                     String,
  pub ip:                         Option<String>,
  pub first_seen:                 DateTime<Utc>,
  pub last_seen:                  DateTime<Utc>,
  /// Unused placeholder.
  pub reputation:                 Option<f64>,
  /// Highest statement id already pulled from this peer.
  pub last_received_statement_id: Option<i64>,
  pub certificate_authority:      Option<String>,
  pub fingerprint:                Option<String>,
}

/// Observations from one successful pull. `None` fields leave the stored
/// value untouched; the cursor never moves backwards.
#[derive(Debug, Clone, Default)]
pub struct NodeUpdate {
  pub domain:                     String,
  pub last_received_statement_id: Option<i64>,
  pub certificate_authority:      Option<String>,
  pub fingerprint:                Option<String>,
  pub ip:                         Option<String>,
}
