//! Convenient re-exports for downstream crates.

pub use crate::config::{keys, Config};
pub use crate::error::{Error, Result};
pub use crate::id::OpId;
pub use crate::plan::{BinaryOp, ModifyOp, QualifiedName, RelNode, RelRoot, UnaryOp};
