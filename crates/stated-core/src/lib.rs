//! Core types and trait definitions for a stated node.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! codec, the SQLite backend and the node itself all depend on it.

// Native `async fn` in traits; the returned futures carry explicit `Send`
// bounds where callers need them.
#![allow(async_fn_in_trait)]

pub mod entity;
pub mod error;
pub mod hash;
pub mod node;
pub mod readiness;
pub mod schedule;
pub mod statement;
pub mod store;
pub mod verification_log;

pub use error::{Error, Result};
