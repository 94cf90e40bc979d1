//! Handlers for local publishing.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/submit_statement` | 201 persisted, 200 known, 202 queued |
//! | `GET`  | `/statements.txt` | This domain's visible statements |

use axum::{
  Json,
  extract::State,
  http::{StatusCode, header},
  response::IntoResponse,
};
use serde_json::json;
use stated_core::{statement::StatementQuery, store::StatementStore};

use super::{AppState, error::ApiError};
use crate::{
  http::Transport,
  pipeline::{Outcome, Submission},
  verify::ProofSource,
  wire::{PeerStatement, SubmitRequest},
};

const LISTING_PAGE: usize = 1000;

/// `POST /submit_statement`
pub async fn submit<S, T, P>(
  State(state): State<AppState<S, T, P>>,
  Json(body): Json<SubmitRequest>,
) -> Result<impl IntoResponse, ApiError>
where
  S: StatementStore + 'static,
  T: Transport + 'static,
  P: ProofSource + 'static,
{
  let hash = body.hash.clone();
  let outcome = state
    .directory
    .pipeline()
    .submit(Submission {
      statement:           body.statement,
      hash:                body.hash,
      source_node_id:      None,
      verification_method: body.verification_method,
      api_key:             body.api_key,
      hidden:              body.hidden,
    })
    .await?;

  let response = match outcome {
    Outcome::Persisted(s) => (StatusCode::CREATED, Json(json!(PeerStatement::from(&s)))),
    Outcome::AlreadyPersisted => (StatusCode::OK, Json(json!({ "hash": hash }))),
    Outcome::Queued => (StatusCode::ACCEPTED, Json(json!({ "hash": hash, "queued": true }))),
  };
  Ok(response)
}

/// `GET /statements.txt`: raw texts joined by newlines, oldest first.
pub async fn listing<S, T, P>(
  State(state): State<AppState<S, T, P>>,
) -> Result<impl IntoResponse, ApiError>
where
  S: StatementStore + 'static,
  T: Transport + 'static,
  P: ProofSource + 'static,
{
  let mut texts = Vec::new();
  let mut query = StatementQuery {
    domain: Some(state.directory.pipeline().own_domain().to_owned()),
    limit: LISTING_PAGE,
    ..StatementQuery::default()
  };
  loop {
    let page = state.store.get_statements(&query).await.map_err(ApiError::store)?;
    let Some(last) = page.last() else { break };
    query.min_id = Some(last.id);
    let full = page.len() == LISTING_PAGE;
    texts.extend(page.into_iter().map(|s| s.statement));
    if !full {
      break;
    }
  }

  Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], texts.join("\n")))
}
