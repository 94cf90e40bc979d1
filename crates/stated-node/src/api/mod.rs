//! HTTP API of a node: the peer endpoints under `/api` plus the static
//! statement listing.
//!
//! # Mounting
//!
//! ```rust,ignore
//! axum::serve(listener, stated_node::api::router(state)).await?;
//! ```

pub mod error;
pub mod peer;
pub mod submit;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use stated_core::store::StatementStore;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

use crate::{http::Transport, sync::PeerDirectory, verify::ProofSource};

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, T, P> {
  pub store:     Arc<S>,
  pub directory: Arc<PeerDirectory<S, T, P>>,
}

impl<S, T, P> AppState<S, T, P>
where
  S: StatementStore,
  T: Transport,
  P: ProofSource,
{
  pub fn new(directory: Arc<PeerDirectory<S, T, P>>) -> Self {
    Self { store: directory.pipeline().store().clone(), directory }
  }
}

impl<S, T, P> Clone for AppState<S, T, P> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), directory: self.directory.clone() }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the node's router. The listing is served at the root as well as
/// under `/api` and `/.well-known` so one node can answer on any host name.
pub fn router<S, T, P>(state: AppState<S, T, P>) -> Router
where
  S: StatementStore + 'static,
  T: Transport + 'static,
  P: ProofSource + 'static,
{
  let api = Router::new()
    .route("/health", get(peer::health))
    .route("/nodes", get(peer::nodes::<S, T, P>))
    .route("/statements", get(peer::statements::<S, T, P>))
    .route("/statement", post(peer::lookup::<S, T, P>))
    .route("/join_network", post(peer::join_network::<S, T, P>))
    .route("/submit_statement", post(submit::submit::<S, T, P>))
    .route("/statements.txt", get(submit::listing::<S, T, P>));

  Router::new()
    .nest("/api", api)
    .route("/statements.txt", get(submit::listing::<S, T, P>))
    .route("/.well-known/statements.txt", get(submit::listing::<S, T, P>))
    .with_state(state)
    .layer(TraceLayer::new_for_http())
}
