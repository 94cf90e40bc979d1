//! Readiness gate for storage access.
//!
//! A store starts out not ready. Once its schema migration completes it is
//! marked ready exactly once; until then every call fails fast with
//! [`Error::NotReady`].

use std::sync::{Arc, OnceLock};

use crate::{Error, Result};

/// Shared, cheaply clonable readiness state.
#[derive(Debug, Clone, Default)]
pub struct Readiness(Arc<OnceLock<()>>);

impl Readiness {
  pub fn new() -> Self { Self::default() }

  /// Signal that migrations are done. Subsequent calls are no-ops.
  pub fn mark_ready(&self) { let _ = self.0.set(()); }

  pub fn is_ready(&self) -> bool { self.0.get().is_some() }

  pub fn check(&self) -> Result<()> {
    if self.is_ready() { Ok(()) } else { Err(Error::NotReady) }
  }
}
