//! Stream-table join spec.
//!
//! Each incoming message is keyed by the join function, the keyed record is
//! looked up in the table named by `table_id`, and the function combines
//! the two. `args` are passed through untouched to the table at
//! instantiation time.

use std::fmt;
use std::sync::Arc;

use relflow_core::id::OpId;

use crate::traits::{
    Capabilities, Record, ScheduledFunction, StreamTableJoinFunction, WatermarkFunction,
};

#[derive(Clone)]
pub struct StreamTableJoinSpec {
    op_id: OpId,
    upstream: Vec<OpId>,
    table_id: String,
    join_fn: Arc<dyn StreamTableJoinFunction>,
    capabilities: Capabilities,
    args: Vec<Record>,
}

impl StreamTableJoinSpec {
    pub fn new(
        op_id: impl Into<OpId>,
        table_id: impl Into<String>,
        join_fn: Arc<dyn StreamTableJoinFunction>,
        args: Vec<Record>,
    ) -> Self {
        let capabilities = Capabilities::probe(join_fn.as_ref());
        Self {
            op_id: op_id.into(),
            upstream: Vec::new(),
            table_id: table_id.into(),
            join_fn,
            capabilities,
            args,
        }
    }

    /// Attach the stream-side input. Consumes the builder; the spec is
    /// immutable once placed in a graph.
    pub fn with_upstream(mut self, upstream: impl Into<OpId>) -> Self {
        self.upstream.push(upstream.into());
        self
    }

    pub fn op_id(&self) -> &OpId {
        &self.op_id
    }

    pub fn upstream(&self) -> &[OpId] {
        &self.upstream
    }

    pub fn table_id(&self) -> &str {
        &self.table_id
    }

    pub fn join_fn(&self) -> &dyn StreamTableJoinFunction {
        self.join_fn.as_ref()
    }

    pub fn args(&self) -> &[Record] {
        &self.args
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// The join function as a scheduled callback, if it is one.
    pub fn as_scheduled_callback(&self) -> Option<&dyn ScheduledFunction> {
        if self.capabilities.contains(Capabilities::SCHEDULED) {
            self.join_fn.as_scheduled()
        } else {
            None
        }
    }

    /// The join function as a watermark handler, if it is one.
    pub fn as_watermark_callback(&self) -> Option<&dyn WatermarkFunction> {
        if self.capabilities.contains(Capabilities::WATERMARK) {
            self.join_fn.as_watermark()
        } else {
            None
        }
    }
}

impl fmt::Debug for StreamTableJoinSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamTableJoinSpec")
            .field("op_id", &self.op_id)
            .field("upstream", &self.upstream)
            .field("table_id", &self.table_id)
            .field("capabilities", &self.capabilities)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct KeyOnly;

    impl StreamTableJoinFunction for KeyOnly {
        fn get_message_key(&self, message: &Record) -> Option<Record> {
            message.get("id").cloned()
        }
        fn get_record_key(&self, record: &Record) -> Option<Record> {
            record.get("id").cloned()
        }
        fn apply(&self, message: &Record, record: Option<&Record>) -> Option<Record> {
            record.map(|r| json!({ "m": message, "r": r }))
        }
    }

    #[derive(Default)]
    struct Timed {
        watermark: AtomicU64,
    }

    impl StreamTableJoinFunction for Timed {
        fn get_message_key(&self, message: &Record) -> Option<Record> {
            message.get("id").cloned()
        }
        fn get_record_key(&self, record: &Record) -> Option<Record> {
            record.get("id").cloned()
        }
        fn apply(&self, message: &Record, _record: Option<&Record>) -> Option<Record> {
            Some(message.clone())
        }
        fn as_scheduled(&self) -> Option<&dyn ScheduledFunction> {
            Some(self)
        }
        fn as_watermark(&self) -> Option<&dyn WatermarkFunction> {
            Some(self)
        }
    }

    impl ScheduledFunction for Timed {
        fn on_callback(&self, key: &str, timestamp_ms: u64) -> Vec<Record> {
            vec![json!({ "key": key, "ts": timestamp_ms })]
        }
    }

    impl WatermarkFunction for Timed {
        fn process_watermark(&self, watermark_ms: u64) -> Vec<Record> {
            self.watermark.store(watermark_ms, Ordering::SeqCst);
            Vec::new()
        }
        fn output_watermark(&self) -> Option<u64> {
            match self.watermark.load(Ordering::SeqCst) {
                0 => None,
                w => Some(w),
            }
        }
    }

    #[test]
    fn key_result_only_function_has_no_callbacks() {
        let spec = StreamTableJoinSpec::new("join-1", "profiles.users", Arc::new(KeyOnly), vec![]);
        assert!(spec.capabilities().is_empty());
        assert!(spec.as_scheduled_callback().is_none());
        assert!(spec.as_watermark_callback().is_none());
    }

    #[test]
    fn scheduled_and_watermark_function_exposes_both() {
        let f = Arc::new(Timed::default());
        let spec = StreamTableJoinSpec::new(
            "join-2",
            "profiles.users",
            f.clone(),
            vec![json!("ttl"), json!(30)],
        );
        assert!(spec.capabilities().contains(Capabilities::SCHEDULED));
        assert!(spec.capabilities().contains(Capabilities::WATERMARK));

        let scheduled = spec.as_scheduled_callback().expect("scheduled");
        assert_eq!(scheduled.on_callback("k", 7), vec![json!({ "key": "k", "ts": 7 })]);

        let wm = spec.as_watermark_callback().expect("watermark");
        assert_eq!(wm.output_watermark(), None);
        wm.process_watermark(42);
        assert_eq!(wm.output_watermark(), Some(42));

        // Probing goes through the same function object the caller handed in.
        assert_eq!(f.output_watermark(), Some(42));
        assert_eq!(spec.args(), &[json!("ttl"), json!(30)]);
    }

    #[test]
    fn probes_are_repeatable() {
        let spec = StreamTableJoinSpec::new("j", "t.x", Arc::new(Timed::default()), vec![]);
        for _ in 0..3 {
            assert!(spec.as_scheduled_callback().is_some());
            assert!(spec.as_watermark_callback().is_some());
        }
        assert_eq!(spec.capabilities().names(), vec!["scheduled", "watermark"]);
    }

    #[test]
    fn upstream_and_accessors() {
        let spec = StreamTableJoinSpec::new("j", "profiles.users", Arc::new(KeyOnly), vec![])
            .with_upstream("input-orders");
        assert_eq!(spec.op_id().as_str(), "j");
        assert_eq!(spec.table_id(), "profiles.users");
        assert_eq!(spec.upstream(), &[OpId::new("input-orders")]);
        let out = spec
            .join_fn()
            .apply(&json!({"id": 1}), Some(&json!({"id": 1, "name": "a"})));
        assert!(out.is_some());
    }
}
