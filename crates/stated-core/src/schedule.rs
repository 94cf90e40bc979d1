//! Backoff schedule for retries.
//!
//! A schedule is an ascending list of hour offsets. The number of offsets an
//! item has aged past is the number of attempts it should have had by now.

use chrono::{DateTime, Duration, Utc};

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct RetrySchedule {
  hours: Vec<f64>,
}

impl RetrySchedule {
  pub const DEFAULT_HOURS: [f64; 11] =
    [0.0, 0.01, 0.05, 0.1, 0.2, 1.0, 10.0, 24.0, 100.0, 336.0, 744.0];

  /// Build a schedule from hour offsets; they must be non-negative, finite
  /// and strictly ascending.
  pub fn new(hours: Vec<f64>) -> Result<Self> {
    let valid = !hours.is_empty()
      && hours.iter().all(|h| h.is_finite() && *h >= 0.0)
      && hours.windows(2).all(|w| w[0] < w[1]);
    if !valid {
      return Err(Error::InvalidSchedule);
    }
    Ok(Self { hours })
  }

  pub fn hours(&self) -> &[f64] { &self.hours }

  pub fn len(&self) -> usize { self.hours.len() }

  pub fn is_empty(&self) -> bool { self.hours.is_empty() }

  /// The last offset; items older than this are abandoned.
  pub fn max_age_hours(&self) -> f64 {
    self.hours.last().copied().unwrap_or_default()
  }

  /// How many attempts an item of this age should have had.
  pub fn target_attempts(&self, age: Duration) -> u32 {
    let age_hours = age.num_milliseconds() as f64 / 3_600_000.0;
    self.hours.iter().filter(|h| **h < age_hours).count() as u32
  }

  /// Whether an item first seen at `since` with `attempts` so far is due.
  pub fn is_due(&self, since: DateTime<Utc>, attempts: u32, now: DateTime<Utc>) -> bool {
    self.target_attempts(now - since) > attempts
  }
}

impl Default for RetrySchedule {
  fn default() -> Self { Self { hours: Self::DEFAULT_HOURS.to_vec() } }
}
