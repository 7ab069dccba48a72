#![forbid(unsafe_code)]
//! relflow-runner: compile statements into a runnable job description.
//!
//! `compiler` drives DSL conversion, classification, resolution and
//! lowering, and synthesizes the flat config snapshot the runtime reads.
//! `locality` keeps the container → host mapping in a coordinator log.

pub mod compiler;
pub mod fingerprint;
pub mod locality;

pub use compiler::{
    compute_configs, fetch_statements, serialize_statements, ExecutionConfig, RunnerMode,
    SqlCompiler,
};
pub use locality::{
    ContainerLocality, CoordinatorLog, CoordinatorMessage, InMemoryCoordinatorLog,
    LocalityManager,
};
