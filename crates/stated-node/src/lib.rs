//! A stated node: statement verification, derived entities and peer sync.
//!
//! The [`pipeline::Pipeline`] turns a submission into a persisted statement
//! or a queued retry. [`sync::PeerDirectory`] keeps the node set and pulls
//! peers' statements through the same pipeline, and [`scheduler`] runs the
//! periodic sweeps. [`api::router`] exposes the symmetric peer API.
//!
//! Every collaborator sits behind a trait ([`stated_core::store::StatementStore`],
//! [`http::Transport`], [`verify::ProofSource`], [`verify::dns::TxtResolver`])
//! so tests substitute in-process fakes.

pub mod api;
pub mod config;
pub mod derive;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod qualify;
pub mod retry;
pub mod scheduler;
pub mod sync;
pub mod tls;
pub mod verification_log;
pub mod verify;
pub mod wire;

pub use error::{Error, Result};

#[cfg(test)]
mod testing;
