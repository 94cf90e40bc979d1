//! Runtime node configuration, deserialised from `config.toml` and
//! `STATED_*` environment variables.

use std::{path::PathBuf, time::Duration};

use serde::Deserialize;
use stated_core::schedule::RetrySchedule;

/// Everything but `domain` has a default.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
  #[serde(default = "default_host")]
  pub host:                       String,
  #[serde(default = "default_port")]
  pub port:                       u16,
  #[serde(default = "default_store_path")]
  pub store_path:                 PathBuf,
  /// The domain this node publishes for.
  pub domain:                     String,
  /// Host name peers reach this node under; `stated.<domain>` if unset.
  #[serde(default)]
  pub public_host:                Option<String>,
  /// Pre-shared key for self-publishing on `domain`.
  #[serde(default)]
  pub api_key:                    Option<String>,
  /// Peers added at startup, on top of the built-in seeds.
  #[serde(default)]
  pub seed_nodes:                 Vec<String>,
  #[serde(default = "default_true")]
  pub use_builtin_seeds:          bool,
  /// `https` in production; `http` for local test networks.
  #[serde(default = "default_scheme")]
  pub peer_scheme:                String,
  #[serde(default = "default_true")]
  pub strict_dnssec:              bool,
  #[serde(default = "default_request_timeout")]
  pub request_timeout_secs:       u64,
  #[serde(default = "default_verification_timeout")]
  pub verification_timeout_secs:  u64,
  #[serde(default = "default_fan_out")]
  pub peer_fan_out:               usize,
  #[serde(default = "default_page_size")]
  pub pull_page_size:             usize,
  #[serde(default = "default_batch")]
  pub sweep_batch_size:           usize,
  #[serde(default)]
  pub intervals:                  Intervals,
  #[serde(default = "default_schedule")]
  pub verification_retry_hours:   Vec<f64>,
  #[serde(default = "default_schedule")]
  pub derived_entity_retry_hours: Vec<f64>,
}

/// Loop periods in seconds. Initial delays are staggered by `stagger_secs`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Intervals {
  pub discovery_secs:        u64,
  pub join_secs:             u64,
  pub pull_secs:             u64,
  pub retry_secs:            u64,
  pub verification_log_secs: u64,
  pub stagger_secs:          u64,
}

impl Default for Intervals {
  fn default() -> Self {
    Self {
      discovery_secs:        300,
      join_secs:             600,
      pull_secs:             30,
      retry_secs:            60,
      verification_log_secs: 600,
      stagger_secs:          5,
    }
  }
}

fn default_host() -> String { "0.0.0.0".into() }
fn default_port() -> u16 { 7766 }
fn default_store_path() -> PathBuf { PathBuf::from("stated.db") }
fn default_scheme() -> String { "https".into() }
fn default_true() -> bool { true }
fn default_request_timeout() -> u64 { 10 }
fn default_verification_timeout() -> u64 { 10 }
fn default_fan_out() -> usize { 10 }
fn default_page_size() -> usize { 100 }
fn default_batch() -> usize { 100 }
fn default_schedule() -> Vec<f64> { RetrySchedule::DEFAULT_HOURS.to_vec() }

impl NodeConfig {
  /// A config for `domain` with every other field at its default.
  pub fn for_domain(domain: impl Into<String>) -> Self {
    Self {
      host:                       default_host(),
      port:                       default_port(),
      store_path:                 default_store_path(),
      domain:                     domain.into(),
      public_host:                None,
      api_key:                    None,
      seed_nodes:                 Vec::new(),
      use_builtin_seeds:          true,
      peer_scheme:                default_scheme(),
      strict_dnssec:              default_true(),
      request_timeout_secs:       default_request_timeout(),
      verification_timeout_secs:  default_verification_timeout(),
      peer_fan_out:               default_fan_out(),
      pull_page_size:             default_page_size(),
      sweep_batch_size:           default_batch(),
      intervals:                  Intervals::default(),
      verification_retry_hours:   default_schedule(),
      derived_entity_retry_hours: default_schedule(),
    }
  }

  pub fn public_host(&self) -> String {
    self
      .public_host
      .clone()
      .unwrap_or_else(|| format!("stated.{}", self.domain))
  }

  pub fn request_timeout(&self) -> Duration { Duration::from_secs(self.request_timeout_secs) }

  pub fn verification_timeout(&self) -> Duration {
    Duration::from_secs(self.verification_timeout_secs)
  }

  pub fn verification_schedule(&self) -> stated_core::Result<RetrySchedule> {
    RetrySchedule::new(self.verification_retry_hours.clone())
  }

  pub fn derived_entity_schedule(&self) -> stated_core::Result<RetrySchedule> {
    RetrySchedule::new(self.derived_entity_retry_hours.clone())
  }
}
