//! Peer directory and statement sync.
//!
//! Every round samples a bounded number of known nodes and fans out to all
//! of them at once; one slow or broken peer only costs its own result.

use std::{collections::BTreeSet, sync::Arc};

use futures::future::join_all;
use rand::seq::SliceRandom as _;
use stated_core::{
  node::{Node, NodeUpdate},
  store::StatementStore,
};
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  config::NodeConfig,
  http::{PeerClient, Transport, is_valid_domain},
  pipeline::{Outcome, Pipeline, SubmitError, Submission},
  verify::ProofSource,
  wire::{APPLICATION, Health, JoinRequest, NodeList, PeerStatement, StatementPage},
};

/// Seeds every node starts from, unless `use_builtin_seeds` is off.
pub const BUILTIN_SEEDS: &[&str] = &["stated.rixdata.net"];

/// What one pull from one peer did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullReport {
  pub domain:    String,
  pub received:  usize,
  pub persisted: usize,
  pub existing:  usize,
  pub queued:    usize,
  pub rejected:  usize,
  /// The cursor sent to the store after this pull.
  pub cursor:    Option<i64>,
}

pub struct PeerDirectory<S, T, P> {
  store:    Arc<S>,
  client:   Arc<PeerClient<T>>,
  pipeline: Arc<Pipeline<S, P>>,
  config:   Arc<NodeConfig>,
}

impl<S, T, P> PeerDirectory<S, T, P>
where
  S: StatementStore,
  T: Transport,
  P: ProofSource,
{
  pub fn new(
    store: Arc<S>,
    client: Arc<PeerClient<T>>,
    pipeline: Arc<Pipeline<S, P>>,
    config: Arc<NodeConfig>,
  ) -> Self {
    Self { store, client, pipeline, config }
  }

  pub fn pipeline(&self) -> &Arc<Pipeline<S, P>> { &self.pipeline }

  pub fn config(&self) -> &Arc<NodeConfig> { &self.config }

  // ── Membership ──────────────────────────────────────────────────────────

  /// Add `domain` as a node if it is well-formed, not this node, and
  /// answers the health probe as a stated node.
  pub async fn validate_and_add_node(&self, domain: &str) -> Result<Node> {
    let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();
    if !is_valid_domain(&domain) {
      return Err(Error::InvalidDomain(domain));
    }
    if self.client.is_own(&domain) {
      return Err(Error::OwnDomain(domain));
    }

    let health: Health = self.client.get_json(&domain, "/api/health").await?;
    if health.application != APPLICATION {
      return Err(Error::NotAPeer(domain));
    }
    let node = self.store.add_node(&domain).await.map_err(Error::store)?;
    debug!(domain = %node.domain, id = node.id, "peer validated");
    Ok(node)
  }

  /// Validate the built-in and configured seeds. Returns how many were added.
  pub async fn bootstrap(&self) -> usize {
    let builtin = self.config.use_builtin_seeds.then_some(BUILTIN_SEEDS).unwrap_or_default();
    let seeds: BTreeSet<String> = builtin
      .iter()
      .map(|s| s.to_string())
      .chain(self.config.seed_nodes.iter().cloned())
      .filter(|s| !s.trim().is_empty())
      .collect();

    let added = self.add_all(&seeds).await;
    info!(seeds = seeds.len(), added, "bootstrapped peer directory");
    added
  }

  async fn add_all(&self, domains: &BTreeSet<String>) -> usize {
    let results = join_all(domains.iter().map(|d| self.validate_and_add_node(d))).await;
    let mut added = 0;
    for (domain, result) in domains.iter().zip(results) {
      match result {
        Ok(_) => added += 1,
        Err(e) => debug!(domain = %domain, error = %e, "peer not added"),
      }
    }
    added
  }

  async fn sample_nodes(&self) -> Result<Vec<Node>> {
    let nodes = self.store.get_all_nodes().await.map_err(Error::store)?;
    Ok(sample(nodes, self.config.peer_fan_out))
  }

  /// Ask a sample of nodes for their node lists and add what they report.
  pub async fn discover(&self) -> Result<usize> {
    let nodes = self.sample_nodes().await?;
    let lists = join_all(
      nodes.iter().map(|n| self.client.get_json::<NodeList>(&n.domain, "/api/nodes")),
    )
    .await;

    let mut candidates = BTreeSet::new();
    for (node, list) in nodes.iter().zip(lists) {
      match list {
        Ok(list) => candidates.extend(list.domains),
        Err(e) => debug!(domain = %node.domain, error = %e, "node list unavailable"),
      }
    }
    candidates.retain(|d| !self.client.is_own(d));

    let added = self.add_all(&candidates).await;
    info!(asked = nodes.len(), candidates = candidates.len(), added, "peer discovery round");
    Ok(added)
  }

  /// Tell every known node about this one. Returns how many accepted.
  pub async fn announce(&self) -> Result<usize> {
    let nodes = self.store.get_all_nodes().await.map_err(Error::store)?;
    let body = JoinRequest { domain: self.config.public_host() };
    let targets: Vec<&Node> = nodes.iter().filter(|n| !self.client.is_own(&n.domain)).collect();

    let results = join_all(
      targets.iter().map(|n| self.client.post(&n.domain, "/api/join_network", &body)),
    )
    .await;
    let mut accepted = 0;
    for (node, result) in targets.iter().zip(results) {
      match result {
        Ok(resp) if resp.is_success() => accepted += 1,
        Ok(resp) => debug!(domain = %node.domain, status = resp.status, "join request refused"),
        Err(e) => debug!(domain = %node.domain, error = %e, "join request failed"),
      }
    }
    info!(nodes = targets.len(), accepted, "announced to peers");
    Ok(accepted)
  }

  // ── Pull ────────────────────────────────────────────────────────────────

  /// Pull from a sample of nodes. Failed peers are logged and skipped.
  pub async fn pull_round(&self) -> Result<Vec<PullReport>> {
    let nodes = self.sample_nodes().await?;
    let results = join_all(nodes.iter().map(|n| self.pull_from_node(n))).await;

    let mut reports = Vec::with_capacity(nodes.len());
    for (node, result) in nodes.iter().zip(results) {
      match result {
        Ok(report) => reports.push(report),
        Err(e) => warn!(domain = %node.domain, error = %e, "pull failed"),
      }
    }
    Ok(reports)
  }

  /// Fetch statements newer than the node's cursor and run each through
  /// the pipeline independently.
  ///
  /// Rejected statements still advance the cursor. A store failure pins it
  /// just below the failing id so that statement is pulled again.
  pub async fn pull_from_node(&self, node: &Node) -> Result<PullReport> {
    if self.client.is_own(&node.domain) {
      return Err(Error::OwnDomain(node.domain.clone()));
    }
    let min_id = node.last_received_statement_id.unwrap_or(0);
    let path = format!("/api/statements?min_id={min_id}&n={}", self.config.pull_page_size);
    let resp = self.client.get(&node.domain, &path).await?;
    let page: StatementPage = resp.json(&node.domain)?;

    let outcomes = join_all(page.statements.iter().map(|s| self.ingest(node, s))).await;

    let mut report = PullReport {
      domain: node.domain.clone(),
      received: page.statements.len(),
      ..PullReport::default()
    };
    let mut pinned: Option<i64> = None;
    for (s, outcome) in page.statements.iter().zip(outcomes) {
      match outcome {
        Ok(Outcome::Persisted(_)) => report.persisted += 1,
        Ok(Outcome::AlreadyPersisted) => report.existing += 1,
        Ok(Outcome::Queued) => report.queued += 1,
        Err(SubmitError::Store(e)) => {
          warn!(domain = %node.domain, hash = %s.hash, error = %e, "store failed during pull");
          pinned = Some(pinned.map_or(s.id - 1, |p| p.min(s.id - 1)));
        }
        Err(e) => {
          report.rejected += 1;
          debug!(domain = %node.domain, hash = %s.hash, error = %e, "peer statement rejected");
        }
      }
    }

    let highest = page.statements.iter().map(|s| s.id).max();
    report.cursor = pinned.or(highest);
    let tls = resp.tls;
    self
      .store
      .update_node(NodeUpdate {
        domain:                     node.domain.clone(),
        last_received_statement_id: report.cursor,
        certificate_authority:      tls.as_ref().and_then(|t| t.certificate_authority.clone()),
        fingerprint:                tls.map(|t| t.fingerprint),
        ip:                         resp.ip,
      })
      .await
      .map_err(Error::store)?;

    info!(
      domain = %node.domain,
      received = report.received,
      persisted = report.persisted,
      queued = report.queued,
      rejected = report.rejected,
      "pulled statements"
    );
    Ok(report)
  }

  async fn ingest(&self, node: &Node, s: &PeerStatement) -> Result<Outcome, SubmitError> {
    self
      .pipeline
      .submit(Submission {
        statement:           s.statement.clone(),
        hash:                s.hash.clone(),
        source_node_id:      Some(node.id),
        verification_method: s.verification_method,
        api_key:             None,
        hidden:              false,
      })
      .await
  }
}

/// Up to `n` nodes, chosen at random.
fn sample(mut nodes: Vec<Node>, n: usize) -> Vec<Node> {
  if nodes.len() > n {
    nodes.shuffle(&mut rand::thread_rng());
    nodes.truncate(n);
  }
  nodes
}
