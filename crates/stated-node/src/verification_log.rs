//! Periodic re-verification of foreign statements. Each run checks every
//! strategy independently and appends the results to the verification log.

use chrono::Utc;
use futures::future::join_all;
use stated_core::{
  schedule::RetrySchedule, store::StatementStore, verification_log::VerificationLogEntry,
};
use tracing::{info, warn};

use crate::{
  Error, Result,
  verify::{Claim, ProofSource, check_all},
};

/// Check the candidates that are due and log the outcome. Returns the number
/// of statements checked.
pub async fn run_once<S, P>(
  store: &S,
  proofs: &P,
  own_domain: &str,
  schedule: &RetrySchedule,
  limit: usize,
) -> Result<usize>
where
  S: StatementStore,
  P: ProofSource,
{
  let now = Utc::now();
  let due: Vec<_> = store
    .get_verification_log_candidates(own_domain, limit)
    .await
    .map_err(Error::store)?
    .into_iter()
    .filter(|c| match c.first_logged {
      None => true,
      Some(first) => schedule.is_due(first, c.log_count, now),
    })
    .map(|c| Claim {
      domain:    c.statement.domain,
      hash:      c.statement.hash,
      statement: c.statement.statement,
    })
    .collect();

  let reports = join_all(due.iter().map(|claim| check_all(proofs, claim))).await;

  for (claim, report) in due.iter().zip(reports) {
    let entry = VerificationLogEntry {
      statement_hash: claim.hash.clone(),
      t:              Utc::now(),
      api:            report.api,
      dns:            report.dns,
      txt:            report.txt,
    };
    if let Err(e) = store.add_verification_log(entry).await {
      warn!(hash = %claim.hash, error = %e, "failed to record verification log entry");
    }
  }

  if !due.is_empty() {
    info!(checked = due.len(), "verification log updated");
  }
  Ok(due.len())
}
