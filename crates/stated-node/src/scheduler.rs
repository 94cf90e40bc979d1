//! Long-lived background loops, each owning a child cancellation token.

use std::{future::Future, sync::Arc, time::Duration};

use stated_core::{schedule::RetrySchedule, store::StatementStore};
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
  http::Transport, retry, sync::PeerDirectory, verification_log, verify::ProofSource,
};

/// Handles to every spawned loop and the token that stops them.
#[derive(Default)]
pub struct BackgroundTasks {
  cancel:  CancellationToken,
  handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl BackgroundTasks {
  pub fn new() -> Self { Self::default() }

  /// Run `tick` after `initial_delay`, then every `period` until shutdown.
  /// Missed ticks are skipped; a tick in progress is allowed to finish.
  pub fn spawn_loop<F, Fut>(
    &mut self,
    name: &'static str,
    initial_delay: Duration,
    period: Duration,
    mut tick: F,
  ) where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
  {
    let cancel = self.cancel.child_token();
    let handle = tokio::spawn(async move {
      tokio::select! {
        _ = cancel.cancelled() => return,
        _ = tokio::time::sleep(initial_delay) => {}
      }

      let mut ticker = tokio::time::interval(period);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
      debug!(task = name, period_secs = period.as_secs_f64(), "background task started");

      loop {
        tokio::select! {
          _ = cancel.cancelled() => break,
          _ = ticker.tick() => tick().await,
        }
      }
      debug!(task = name, "background task stopped");
    });
    self.handles.push((name, handle));
  }

  pub fn len(&self) -> usize { self.handles.len() }

  pub fn is_empty(&self) -> bool { self.handles.is_empty() }

  /// Cancel every loop and wait for them to exit.
  pub async fn shutdown(self) {
    self.cancel.cancel();
    for (name, handle) in self.handles {
      if let Err(e) = handle.await {
        warn!(task = name, error = %e, "background task panicked");
      }
    }
    info!("background tasks stopped");
  }
}

/// Retry tables for the two sweeps.
#[derive(Debug, Clone, Default)]
pub struct Schedules {
  pub verification:   RetrySchedule,
  pub derived_entity: RetrySchedule,
}

/// Spawn the discovery, join, pull, retry and verification log loops.
pub fn spawn_node_tasks<S, T, P>(
  directory: Arc<PeerDirectory<S, T, P>>,
  schedules: Schedules,
) -> BackgroundTasks
where
  S: StatementStore + 'static,
  T: Transport + 'static,
  P: ProofSource + 'static,
{
  let config = directory.config().clone();
  let intervals = &config.intervals;
  let stagger = |n: u64| Duration::from_secs(intervals.stagger_secs * n);
  let schedules = Arc::new(schedules);
  let mut tasks = BackgroundTasks::new();

  let d = directory.clone();
  tasks.spawn_loop("discovery", stagger(1), secs(intervals.discovery_secs), move || {
    let d = d.clone();
    async move {
      if let Err(e) = d.discover().await {
        warn!(error = %e, "discovery round failed");
      }
    }
  });

  let d = directory.clone();
  tasks.spawn_loop("join", stagger(2), secs(intervals.join_secs), move || {
    let d = d.clone();
    async move {
      if let Err(e) = d.announce().await {
        warn!(error = %e, "join round failed");
      }
    }
  });

  let d = directory.clone();
  tasks.spawn_loop("pull", stagger(3), secs(intervals.pull_secs), move || {
    let d = d.clone();
    async move {
      if let Err(e) = d.pull_round().await {
        warn!(error = %e, "pull round failed");
      }
    }
  });

  let d = directory.clone();
  let s = schedules.clone();
  let batch = config.sweep_batch_size;
  tasks.spawn_loop("retry", stagger(4), secs(intervals.retry_secs), move || {
    let (d, s) = (d.clone(), s.clone());
    async move {
      let pipeline = d.pipeline().as_ref();
      if let Err(e) = retry::run_once(pipeline, &s.verification, &s.derived_entity, batch).await {
        warn!(error = %e, "retry sweep failed");
      }
    }
  });

  let d = directory;
  let s = schedules;
  tasks.spawn_loop(
    "verification_log",
    stagger(5),
    secs(intervals.verification_log_secs),
    move || {
      let (d, s) = (d.clone(), s.clone());
      async move {
        let pipeline = d.pipeline();
        let result = verification_log::run_once(
          pipeline.store().as_ref(),
          pipeline.proofs().as_ref(),
          pipeline.own_domain(),
          &s.verification,
          batch,
        )
        .await;
        if let Err(e) = result {
          warn!(error = %e, "verification log sweep failed");
        }
      }
    },
  );

  tasks
}

// Zero would make `interval` panic.
fn secs(n: u64) -> Duration { Duration::from_secs(n.max(1)) }
