//! Domain proofs: establishing that a statement's publishing domain
//! authorised it.
//!
//! Three strategies exist. [`ProofStrategy::Dns`] looks for the hash in the
//! TXT records of `stated.<domain>`. [`ProofStrategy::RemoteService`] asks
//! the domain's own node for the hash, and [`ProofStrategy::StaticFile`]
//! searches the domain's published `statements.txt` for the full text.
//! Every attempt is time-bounded, and any failure counts as "not proven".

pub mod dns;

use std::{future::Future, sync::Arc, time::Duration};

use stated_core::statement::VerificationMethod;
use tracing::debug;

use self::dns::TxtResolver;
use crate::{
  Result,
  http::{PeerClient, Transport},
  wire::{LookupRequest, StatementPage},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProofStrategy {
  Dns,
  RemoteService,
  StaticFile,
}

impl ProofStrategy {
  /// The method recorded on a statement proven by this strategy.
  pub fn verification_method(self) -> VerificationMethod {
    match self {
      Self::Dns => VerificationMethod::Dns,
      Self::RemoteService | Self::StaticFile => VerificationMethod::Api,
    }
  }
}

/// Strategies to try, in order, for a submission's declared method.
pub fn strategy_order(declared: VerificationMethod) -> &'static [ProofStrategy] {
  match declared {
    VerificationMethod::Api => &[ProofStrategy::RemoteService, ProofStrategy::StaticFile],
    VerificationMethod::Dns => {
      &[ProofStrategy::Dns, ProofStrategy::RemoteService, ProofStrategy::StaticFile]
    }
  }
}

/// What is being proven.
#[derive(Debug, Clone)]
pub struct Claim {
  pub domain:    String,
  pub hash:      String,
  pub statement: String,
}

pub trait ProofSource: Send + Sync {
  /// Never fails; errors and timeouts resolve to `false`.
  fn prove<'a>(
    &'a self,
    strategy: ProofStrategy,
    claim: &'a Claim,
  ) -> impl Future<Output = bool> + Send + 'a;
}

/// The first strategy in `order` that proves `claim`.
pub async fn establish<P: ProofSource>(
  source: &P,
  order: &[ProofStrategy],
  claim: &Claim,
) -> Option<ProofStrategy> {
  for strategy in order {
    if source.prove(*strategy, claim).await {
      return Some(*strategy);
    }
  }
  None
}

/// Outcome of running every strategy at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofReport {
  pub api: bool,
  pub dns: bool,
  pub txt: bool,
}

pub async fn check_all<P: ProofSource>(source: &P, claim: &Claim) -> ProofReport {
  let (api, dns, txt) = tokio::join!(
    source.prove(ProofStrategy::RemoteService, claim),
    source.prove(ProofStrategy::Dns, claim),
    source.prove(ProofStrategy::StaticFile, claim),
  );
  ProofReport { api, dns, txt }
}

// ─── Network-backed proofs ───────────────────────────────────────────────────

pub struct DomainVerifier<R, T> {
  resolver: R,
  client:   Arc<PeerClient<T>>,
  timeout:  Duration,
}

impl<R: TxtResolver, T: Transport> DomainVerifier<R, T> {
  pub fn new(resolver: R, client: Arc<PeerClient<T>>, timeout: Duration) -> Self {
    Self { resolver, client, timeout }
  }

  async fn dns(&self, claim: &Claim) -> Result<bool> {
    let name = format!("stated.{}", claim.domain);
    let records = self.resolver.txt_records(&name).await?;
    Ok(records.iter().any(|r| r.trim() == claim.hash))
  }

  async fn remote_service(&self, claim: &Claim) -> Result<bool> {
    let host = format!("stated.{}", claim.domain);
    let body = LookupRequest { hash: claim.hash.clone() };
    let page: StatementPage = self.client.post(&host, "/api/statement", &body).await?.json(&host)?;
    Ok(page.statements.iter().any(|s| s.hash == claim.hash))
  }

  async fn static_file(&self, claim: &Claim) -> Result<bool> {
    let locations = [
      (format!("static.stated.{}", claim.domain), "/statements.txt"),
      (format!("www.{}", claim.domain), "/.well-known/statements.txt"),
    ];
    for (host, path) in &locations {
      match self.client.get(host, path).await {
        Ok(resp) if resp.is_success() && resp.body.contains(&claim.statement) => return Ok(true),
        Ok(_) => {}
        Err(e) => debug!(host = %host, error = %e, "static statement file unavailable"),
      }
    }
    Ok(false)
  }
}

impl<R: TxtResolver, T: Transport> ProofSource for DomainVerifier<R, T> {
  async fn prove<'a>(&'a self, strategy: ProofStrategy, claim: &'a Claim) -> bool {
    let attempt = async {
      match strategy {
        ProofStrategy::Dns => self.dns(claim).await,
        ProofStrategy::RemoteService => self.remote_service(claim).await,
        ProofStrategy::StaticFile => self.static_file(claim).await,
      }
    };
    match tokio::time::timeout(self.timeout, attempt).await {
      Ok(Ok(proven)) => proven,
      Ok(Err(e)) => {
        debug!(domain = %claim.domain, hash = %claim.hash, ?strategy, error = %e, "proof failed");
        false
      }
      Err(_) => {
        debug!(domain = %claim.domain, hash = %claim.hash, ?strategy, "proof timed out");
        false
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    http::PeerResponse,
    testing::{FakeProof, FakeResolver, FakeTransport},
    wire::PeerStatement,
  };

  fn claim() -> Claim {
    Claim {
      domain:    "example.com".into(),
      hash:      "abc".into(),
      statement: "Publishing domain: example.com\n".into(),
    }
  }

  fn verifier(resolver: FakeResolver, transport: FakeTransport) -> DomainVerifier<FakeResolver, FakeTransport> {
    let client = Arc::new(PeerClient::new(transport, "own.test"));
    DomainVerifier::new(resolver, client, Duration::from_secs(1))
  }

  #[test]
  fn declared_api_skips_dns() {
    assert_eq!(
      strategy_order(VerificationMethod::Api),
      &[ProofStrategy::RemoteService, ProofStrategy::StaticFile]
    );
    assert_eq!(strategy_order(VerificationMethod::Dns)[0], ProofStrategy::Dns);
    assert_eq!(ProofStrategy::StaticFile.verification_method(), VerificationMethod::Api);
  }

  #[tokio::test]
  async fn establish_reports_the_strategy_that_succeeded() {
    let proofs = FakeProof::succeeding(&[ProofStrategy::RemoteService]);
    let order = strategy_order(VerificationMethod::Dns);
    assert_eq!(establish(&proofs, order, &claim()).await, Some(ProofStrategy::RemoteService));
    assert_eq!(proofs.attempts(), vec![ProofStrategy::Dns, ProofStrategy::RemoteService]);

    let proofs = FakeProof::succeeding(&[]);
    assert_eq!(establish(&proofs, order, &claim()).await, None);
    assert_eq!(proofs.attempts().len(), 3);
  }

  #[tokio::test]
  async fn dns_proof_matches_txt_value() {
    let resolver = FakeResolver::default();
    resolver.insert("stated.example.com", &["unrelated", "abc"]);
    let v = verifier(resolver, FakeTransport::default());
    assert!(v.prove(ProofStrategy::Dns, &claim()).await);

    let v = verifier(FakeResolver::default(), FakeTransport::default());
    assert!(!v.prove(ProofStrategy::Dns, &claim()).await);
  }

  #[tokio::test]
  async fn remote_service_requires_exact_hash() {
    let page = |hash: &str| StatementPage {
      statements: vec![PeerStatement {
        id:                  1,
        statement:           String::new(),
        hash:                hash.into(),
        domain:              "example.com".into(),
        author:              String::new(),
        statement_type:      None,
        verification_method: None,
      }],
    };

    let transport = FakeTransport::default();
    transport.route_post("stated.example.com", "/api/statement", PeerResponse::json_ok(&page("abc")));
    let v = verifier(FakeResolver::default(), transport);
    assert!(v.prove(ProofStrategy::RemoteService, &claim()).await);
    let posted = v.client.transport().posted("stated.example.com", "/api/statement");
    assert_eq!(posted, vec![serde_json::json!({"hash": "abc"})]);

    let transport = FakeTransport::default();
    transport.route_post("stated.example.com", "/api/statement", PeerResponse::json_ok(&page("abcd")));
    let v = verifier(FakeResolver::default(), transport);
    assert!(!v.prove(ProofStrategy::RemoteService, &claim()).await);
  }

  #[tokio::test]
  async fn static_file_falls_back_to_well_known() {
    let transport = FakeTransport::default();
    transport.route_get(
      "www.example.com",
      "/.well-known/statements.txt",
      PeerResponse::ok("other\nPublishing domain: example.com\n"),
    );
    let v = verifier(FakeResolver::default(), transport);
    assert!(v.prove(ProofStrategy::StaticFile, &claim()).await);
  }

  #[tokio::test]
  async fn own_domain_is_never_proven_remotely() {
    let transport = FakeTransport::default();
    let v = verifier(FakeResolver::default(), transport);
    let own = Claim { domain: "own.test".into(), ..claim() };
    assert!(!v.prove(ProofStrategy::RemoteService, &own).await);
    assert!(v.client.transport().calls().is_empty());
  }
}
