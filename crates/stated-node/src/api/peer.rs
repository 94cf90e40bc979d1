//! Handlers for the symmetric peer endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/health` | `{"application":"stated","apiVersion":"1"}` |
//! | `GET`  | `/nodes` | Known peer domains |
//! | `GET`  | `/statements` | `?min_id=<cursor>&n=<limit>`, hidden excluded |
//! | `POST` | `/statement` | Body: `{"hash":"…"}` |
//! | `POST` | `/join_network` | Body: `{"domain":"…"}` |

use axum::{
  Json,
  extract::{Query, State},
};
use serde::Deserialize;
use stated_core::{statement::StatementQuery, store::StatementStore};
use tracing::info;

use super::{AppState, error::ApiError};
use crate::{
  http::Transport,
  verify::ProofSource,
  wire::{API_VERSION, APPLICATION, Health, JoinRequest, LookupRequest, NodeList, StatementPage},
};

const MAX_PAGE: usize = 1000;

// ─── Health ───────────────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> Json<Health> {
  Json(Health {
    application: APPLICATION.into(),
    api_version: Some(API_VERSION.into()),
  })
}

// ─── Nodes ────────────────────────────────────────────────────────────────────

/// `GET /nodes`
pub async fn nodes<S, T, P>(
  State(state): State<AppState<S, T, P>>,
) -> Result<Json<NodeList>, ApiError>
where
  S: StatementStore + 'static,
  T: Transport + 'static,
  P: ProofSource + 'static,
{
  let nodes = state.store.get_all_nodes().await.map_err(ApiError::store)?;
  Ok(Json(NodeList { domains: nodes.into_iter().map(|n| n.domain).collect() }))
}

// ─── Statements ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PageParams {
  pub min_id: Option<i64>,
  pub n:      Option<usize>,
}

/// `GET /statements[?min_id=<cursor>&n=<limit>]`
pub async fn statements<S, T, P>(
  State(state): State<AppState<S, T, P>>,
  Query(params): Query<PageParams>,
) -> Result<Json<StatementPage>, ApiError>
where
  S: StatementStore + 'static,
  T: Transport + 'static,
  P: ProofSource + 'static,
{
  let query = StatementQuery {
    min_id: params.min_id,
    limit: params.n.unwrap_or(100).clamp(1, MAX_PAGE),
    ..StatementQuery::default()
  };
  let statements = state.store.get_statements(&query).await.map_err(ApiError::store)?;
  Ok(Json(StatementPage { statements: statements.iter().map(Into::into).collect() }))
}

/// `POST /statement`: an empty page when the hash is unknown.
pub async fn lookup<S, T, P>(
  State(state): State<AppState<S, T, P>>,
  Json(body): Json<LookupRequest>,
) -> Result<Json<StatementPage>, ApiError>
where
  S: StatementStore + 'static,
  T: Transport + 'static,
  P: ProofSource + 'static,
{
  let found = state.store.get_statement(&body.hash).await.map_err(ApiError::store)?;
  Ok(Json(StatementPage { statements: found.iter().map(Into::into).collect() }))
}

// ─── Join ─────────────────────────────────────────────────────────────────────

/// `POST /join_network`: the candidate is health-checked before it is added.
pub async fn join_network<S, T, P>(
  State(state): State<AppState<S, T, P>>,
  Json(body): Json<JoinRequest>,
) -> Result<Json<JoinRequest>, ApiError>
where
  S: StatementStore + 'static,
  T: Transport + 'static,
  P: ProofSource + 'static,
{
  let node = state.directory.validate_and_add_node(&body.domain).await?;
  info!(domain = %node.domain, "peer joined");
  Ok(Json(JoinRequest { domain: node.domain }))
}
