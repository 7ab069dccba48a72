#![forbid(unsafe_code)]
//! relflow-core: shared vocabulary for the relflow compiler.
//!
//! - `plan`: the relational tree handed over by an external planner
//! - `config`: flat key/value job configuration and well-known keys
//! - `error`: the compilation error taxonomy every crate propagates
//! - `id`/`hash`: operator ids and stable snapshot digests

pub mod config;
pub mod error;
pub mod hash;
pub mod id;
pub mod plan;
pub mod prelude;

/// Compiler version. The CLI reports it alongside every compiled job; it is
/// not part of the config snapshot.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
