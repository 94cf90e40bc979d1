//! Metadata recorded about a peer's TLS certificate.

use sha2::{Digest as _, Sha256};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPeerInfo {
  /// Issuer distinguished name, if the certificate parses.
  pub certificate_authority: Option<String>,
  /// SHA-256 of the DER bytes, as colon-separated uppercase hex.
  pub fingerprint:           String,
}

pub fn inspect_certificate(der: &[u8]) -> TlsPeerInfo {
  let certificate_authority = x509_parser::parse_x509_certificate(der)
    .ok()
    .map(|(_, cert)| cert.issuer().to_string());
  TlsPeerInfo { certificate_authority, fingerprint: fingerprint(der) }
}

pub fn fingerprint(der: &[u8]) -> String {
  Sha256::digest(der)
    .iter()
    .map(|b| hex::encode_upper([*b]))
    .collect::<Vec<_>>()
    .join(":")
}
