//! Operator specs: one declarative description per dataflow stage.

use std::fmt;

use relflow_core::id::OpId;
use relflow_core::plan::JoinType;
use serde::{Deserialize, Serialize};

use crate::join::stream_table::StreamTableJoinSpec;
use crate::traits::{ScheduledFunction, WatermarkFunction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpCode {
    Input,
    Map,
    Filter,
    Window,
    PartitionBy,
    Join,
    Merge,
    Sink,
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OpCode::Input => "input",
            OpCode::Map => "map",
            OpCode::Filter => "filter",
            OpCode::Window => "window",
            OpCode::PartitionBy => "partition_by",
            OpCode::Join => "join",
            OpCode::Merge => "merge",
            OpCode::Sink => "sink",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub enum OperatorSpec {
    /// Reads `stream` (logical name) from `system`.
    Input {
        id: OpId,
        stream: String,
        system: String,
    },
    /// Projection onto `columns`.
    Map {
        id: OpId,
        upstream: OpId,
        columns: Vec<String>,
    },
    Filter {
        id: OpId,
        upstream: OpId,
        condition: String,
    },
    /// Tumbling window of `size_ms`, keyed by `partition_by`.
    Window {
        id: OpId,
        upstream: OpId,
        partition_by: Vec<String>,
        size_ms: u64,
    },
    /// Re-key by `keys` (grouping).
    PartitionBy {
        id: OpId,
        upstream: OpId,
        keys: Vec<String>,
    },
    StreamTableJoin(StreamTableJoinSpec),
    StreamStreamJoin {
        id: OpId,
        left: OpId,
        right: OpId,
        join_type: JoinType,
        left_key: String,
        right_key: String,
    },
    Merge {
        id: OpId,
        inputs: Vec<OpId>,
    },
    /// Writes to `stream` (logical name) on `system`.
    Sink {
        id: OpId,
        upstream: OpId,
        stream: String,
        system: String,
    },
}

impl OperatorSpec {
    pub fn id(&self) -> &OpId {
        use OperatorSpec::*;
        match self {
            Input { id, .. }
            | Map { id, .. }
            | Filter { id, .. }
            | Window { id, .. }
            | PartitionBy { id, .. }
            | StreamStreamJoin { id, .. }
            | Merge { id, .. }
            | Sink { id, .. } => id,
            StreamTableJoin(spec) => spec.op_id(),
        }
    }

    /// Upstream operator ids, in input order.
    pub fn upstream(&self) -> Vec<&OpId> {
        use OperatorSpec::*;
        match self {
            Input { .. } => vec![],
            Map { upstream, .. }
            | Filter { upstream, .. }
            | Window { upstream, .. }
            | PartitionBy { upstream, .. }
            | Sink { upstream, .. } => vec![upstream],
            StreamTableJoin(spec) => spec.upstream().iter().collect(),
            StreamStreamJoin { left, right, .. } => vec![left, right],
            Merge { inputs, .. } => inputs.iter().collect(),
        }
    }

    pub fn op_code(&self) -> OpCode {
        use OperatorSpec::*;
        match self {
            Input { .. } => OpCode::Input,
            Map { .. } => OpCode::Map,
            Filter { .. } => OpCode::Filter,
            Window { .. } => OpCode::Window,
            PartitionBy { .. } => OpCode::PartitionBy,
            StreamTableJoin(_) | StreamStreamJoin { .. } => OpCode::Join,
            Merge { .. } => OpCode::Merge,
            Sink { .. } => OpCode::Sink,
        }
    }

    /// Table bound by this operator, if it is a stream-table join.
    pub fn table_id(&self) -> Option<&str> {
        match self {
            OperatorSpec::StreamTableJoin(spec) => Some(spec.table_id()),
            _ => None,
        }
    }

    /// Scheduled callback to register with the runtime, if any.
    pub fn scheduled_fn(&self) -> Option<&dyn ScheduledFunction> {
        match self {
            OperatorSpec::StreamTableJoin(spec) => spec.as_scheduled_callback(),
            _ => None,
        }
    }

    /// Watermark handler to register with the runtime, if any.
    pub fn watermark_fn(&self) -> Option<&dyn WatermarkFunction> {
        match self {
            OperatorSpec::StreamTableJoin(spec) => spec.as_watermark_callback(),
            _ => None,
        }
    }
}

impl From<StreamTableJoinSpec> for OperatorSpec {
    fn from(spec: StreamTableJoinSpec) -> Self {
        OperatorSpec::StreamTableJoin(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::field::FieldJoinFunction;
    use std::sync::Arc;

    #[test]
    fn ids_and_upstreams() {
        let join = OperatorSpec::StreamStreamJoin {
            id: "j".into(),
            left: "a".into(),
            right: "b".into(),
            join_type: JoinType::Inner,
            left_key: "k".into(),
            right_key: "k".into(),
        };
        assert_eq!(join.id().as_str(), "j");
        assert_eq!(join.upstream(), vec![&OpId::new("a"), &OpId::new("b")]);
        assert_eq!(join.op_code(), OpCode::Join);
        assert!(join.table_id().is_none());

        let input = OperatorSpec::Input {
            id: "in".into(),
            stream: "kafka.a".into(),
            system: "kafka".into(),
        };
        assert!(input.upstream().is_empty());
        assert_eq!(input.op_code().to_string(), "input");
    }

    #[test]
    fn only_table_joins_expose_callbacks() {
        let f = Arc::new(FieldJoinFunction::new("id", "id", JoinType::Inner));
        let spec: OperatorSpec =
            StreamTableJoinSpec::new("stj", "t.users", f, vec![]).with_upstream("in").into();
        assert_eq!(spec.table_id(), Some("t.users"));
        assert!(spec.scheduled_fn().is_none());
        assert!(spec.watermark_fn().is_none());

        let filter = OperatorSpec::Filter {
            id: "f".into(),
            upstream: "in".into(),
            condition: "x > 1".into(),
        };
        assert!(filter.scheduled_fn().is_none());
    }
}
