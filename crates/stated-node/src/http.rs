//! Outbound HTTP to peers and to domains under verification.
//!
//! [`Transport`] is the raw `get`/`post` pair; [`PeerClient`] wraps one and
//! is the only place that refuses to contact this node's own domain.

use std::{future::Future, time::Duration};

use reqwest::Client;
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::{
  Error, Result,
  tls::{TlsPeerInfo, inspect_certificate},
};

// ─── Responses ───────────────────────────────────────────────────────────────

/// A response body together with what was observed about the connection.
#[derive(Debug, Clone, Default)]
pub struct PeerResponse {
  pub status: u16,
  pub body:   String,
  pub tls:    Option<TlsPeerInfo>,
  pub ip:     Option<String>,
}

impl PeerResponse {
  pub fn ok(body: impl Into<String>) -> Self {
    Self { status: 200, body: body.into(), ..Self::default() }
  }

  pub fn is_success(&self) -> bool { (200..300).contains(&self.status) }

  /// Decode a successful JSON body.
  pub fn json<R: DeserializeOwned>(&self, host: &str) -> Result<R> {
    if !self.is_success() {
      return Err(Error::PeerStatus { host: host.to_owned(), status: self.status });
    }
    serde_json::from_str(&self.body).map_err(|e| Error::PeerMalformedResponse {
      host:    host.to_owned(),
      message: e.to_string(),
    })
  }
}

// ─── Transport ───────────────────────────────────────────────────────────────

pub trait Transport: Send + Sync {
  fn get<'a>(
    &'a self,
    host: &'a str,
    path: &'a str,
  ) -> impl Future<Output = Result<PeerResponse>> + Send + 'a;

  fn post<'a>(
    &'a self,
    host: &'a str,
    path: &'a str,
    body: &'a serde_json::Value,
  ) -> impl Future<Output = Result<PeerResponse>> + Send + 'a;
}

/// [`Transport`] over `reqwest`, recording the peer certificate and address.
#[derive(Clone)]
pub struct HttpTransport {
  client: Client,
  scheme: String,
}

impl HttpTransport {
  pub fn new(scheme: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
    let client = Client::builder().timeout(timeout).tls_info(true).build()?;
    Ok(Self { client, scheme: scheme.into() })
  }

  fn url(&self, host: &str, path: &str) -> String { format!("{}://{host}{path}", self.scheme) }

  async fn send(&self, host: &str, req: reqwest::RequestBuilder) -> Result<PeerResponse> {
    let resp = req.send().await.map_err(|e| classify(host, e))?;
    let status = resp.status().as_u16();
    let ip = resp.remote_addr().map(|a| a.ip().to_string());
    let tls = resp
      .extensions()
      .get::<reqwest::tls::TlsInfo>()
      .and_then(|info| info.peer_certificate())
      .map(inspect_certificate);
    let body = resp.text().await.map_err(|e| classify(host, e))?;
    Ok(PeerResponse { status, body, tls, ip })
  }
}

fn classify(host: &str, e: reqwest::Error) -> Error {
  if e.is_timeout() {
    Error::PeerTimeout { host: host.to_owned() }
  } else {
    Error::PeerUnreachable { host: host.to_owned(), message: e.to_string() }
  }
}

impl Transport for HttpTransport {
  async fn get<'a>(&'a self, host: &'a str, path: &'a str) -> Result<PeerResponse> {
    self.send(host, self.client.get(self.url(host, path))).await
  }

  async fn post<'a>(
    &'a self,
    host: &'a str,
    path: &'a str,
    body: &'a serde_json::Value,
  ) -> Result<PeerResponse> {
    self.send(host, self.client.post(self.url(host, path)).json(body)).await
  }
}

// ─── Peer client ─────────────────────────────────────────────────────────────

pub struct PeerClient<T> {
  transport:  T,
  own_domain: String,
}

impl<T: Transport> PeerClient<T> {
  pub fn new(transport: T, own_domain: impl Into<String>) -> Self {
    Self { transport, own_domain: own_domain.into().to_ascii_lowercase() }
  }

  pub fn own_domain(&self) -> &str { &self.own_domain }

  /// Whether `host` is this node, either as its bare domain or its
  /// `stated.` service host.
  pub fn is_own(&self, host: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    host == self.own_domain
      || host.strip_prefix("stated.").is_some_and(|rest| rest == self.own_domain)
  }

  fn guard(&self, host: &str) -> Result<()> {
    if self.is_own(host) {
      debug!(host, "refusing request to own domain");
      return Err(Error::OwnDomain(host.to_owned()));
    }
    Ok(())
  }

  pub async fn get(&self, host: &str, path: &str) -> Result<PeerResponse> {
    self.guard(host)?;
    self.transport.get(host, path).await
  }

  pub async fn post<B: Serialize>(&self, host: &str, path: &str, body: &B) -> Result<PeerResponse> {
    self.guard(host)?;
    let body = serde_json::to_value(body)?;
    self.transport.post(host, path, &body).await
  }

  pub async fn get_json<R: DeserializeOwned>(&self, host: &str, path: &str) -> Result<R> {
    self.get(host, path).await?.json(host)
  }

  pub fn transport(&self) -> &T { &self.transport }
}

/// Conservative syntax check for a peer domain: letters, digits, `.`, `-`
/// and an optional `:port`.
pub fn is_valid_domain(domain: &str) -> bool {
  (4..=260).contains(&domain.len())
    && domain.contains('.')
    && !domain.contains("..")
    && !domain.starts_with(['.', '-', ':'])
    && domain.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':'))
}
