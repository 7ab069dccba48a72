#![forbid(unsafe_code)]
//! relflow-operators: declarative operator specs the runtime instantiates.
//!
//! Design intent:
//! - Specs describe stages; they never execute anything themselves.
//! - The graph owns every spec; upstream links are ids, not pointers.
//! - User functions are probed for optional capabilities once, when the
//!   spec is built, and the answer is kept as flags.

pub mod graph;
pub mod join;
pub mod spec;
pub mod traits;

pub use graph::{OperatorDescriptor, OperatorGraph};
pub use join::field::FieldJoinFunction;
pub use join::stream_table::StreamTableJoinSpec;
pub use spec::{OpCode, OperatorSpec};
pub use traits::{
    Capabilities, OpError, Record, ScheduledFunction, StreamTableJoinFunction, WatermarkFunction,
};
