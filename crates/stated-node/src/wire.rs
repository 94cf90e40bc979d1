//! JSON bodies of the peer API, shared by the server and the peer client.

use serde::{Deserialize, Serialize};
use stated_core::statement::{Statement, VerificationMethod};

/// Value of `application` in a health response.
pub const APPLICATION: &str = "stated";
pub const API_VERSION: &str = "1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
  pub application: String,
  #[serde(rename = "apiVersion", default)]
  pub api_version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeList {
  pub domains: Vec<String>,
}

/// A statement as served to peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerStatement {
  pub id:                  i64,
  pub statement:           String,
  pub hash:                String,
  #[serde(default)]
  pub domain:              String,
  #[serde(default)]
  pub author:              String,
  #[serde(rename = "type", default)]
  pub statement_type:      Option<String>,
  #[serde(default)]
  pub verification_method: Option<VerificationMethod>,
}

impl From<&Statement> for PeerStatement {
  fn from(s: &Statement) -> Self {
    Self {
      id:                  s.id,
      statement:           s.statement.clone(),
      hash:                s.hash.clone(),
      domain:              s.domain.clone(),
      author:              s.author.clone(),
      statement_type:      Some(s.statement_type.to_string()),
      verification_method: Some(s.verification_method),
    }
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatementPage {
  pub statements: Vec<PeerStatement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
  pub domain: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupRequest {
  pub hash: String,
}

/// Body of a local `POST /submit_statement`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
  pub statement:           String,
  pub hash:                String,
  #[serde(default)]
  pub api_key:             Option<String>,
  #[serde(default)]
  pub hidden:              bool,
  #[serde(default)]
  pub verification_method: Option<VerificationMethod>,
}
