#![forbid(unsafe_code)]
//! relflow-planner: from plan text → relational roots → stream roles
//! → operator graph.
//!
//! Design:
//! - `dsl`: the planner collaborator seam (`DslConverter`) plus a YAML
//!   converter that builds relational trees directly
//! - `classify`: one recursive pass sorting table references into input
//!   and output roles
//! - `lower`: turns a tree plus its resolved IO configs into specs

pub mod classify;
pub mod dsl;
pub mod lower;

pub use classify::{classify, StreamRoles};
pub use dsl::yaml::YamlDslConverter;
pub use dsl::{create_dsl_converter, DslConverter, DslConverterFactory};
pub use lower::{lower_to_graph, ResolvedStreams};
