//! TXT lookups for the DNS proof strategy.

use std::{future::Future, time::Duration};

use hickory_resolver::{
  TokioResolver,
  config::{ResolverConfig, ResolverOpts},
  name_server::TokioConnectionProvider,
};
use tracing::debug;

use crate::{Error, Result};

pub trait TxtResolver: Send + Sync {
  /// All TXT values published at `name`, each record's strings joined.
  fn txt_records<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Vec<String>>> + Send + 'a;
}

/// DNSSEC-validating resolver. In strict mode only answers whose proof is
/// `Secure` are returned.
pub struct DnsResolver {
  resolver: TokioResolver,
  strict:   bool,
}

impl DnsResolver {
  pub fn new(strict: bool, timeout: Duration) -> Self {
    let mut opts = ResolverOpts::default();
    opts.validate = true;
    opts.timeout = timeout;
    let resolver = TokioResolver::builder_with_config(
      ResolverConfig::default(),
      TokioConnectionProvider::default(),
    )
    .with_options(opts)
    .build();
    Self { resolver, strict }
  }
}

impl TxtResolver for DnsResolver {
  async fn txt_records<'a>(&'a self, name: &'a str) -> Result<Vec<String>> {
    let lookup = self
      .resolver
      .txt_lookup(name)
      .await
      .map_err(|e| Error::Dns(e.to_string()))?;

    let mut values = Vec::new();
    for record in lookup.as_lookup().record_iter() {
      if self.strict && !record.proof().is_secure() {
        debug!(name, proof = ?record.proof(), "skipping unvalidated TXT record");
        continue;
      }
      if let Some(txt) = record.data().as_txt() {
        values.push(
          txt
            .txt_data()
            .iter()
            .map(|part| String::from_utf8_lossy(part))
            .collect::<String>(),
        );
      }
    }
    Ok(values)
  }
}
