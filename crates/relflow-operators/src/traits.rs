//! User function traits + capability flags.
//!
//! A stream-table join function always provides key extraction and result
//! construction. It may additionally act as a scheduled callback or a
//! watermark handler; it says so through the `as_*` narrowing hooks, whose
//! defaults report "not supported".

use std::fmt;

use thiserror::Error;

/// Records flowing through user functions. The wire format is the
/// runtime's business; functions see decoded JSON values.
pub type Record = serde_json::Value;

#[derive(Debug, Error)]
pub enum OpError {
    #[error("duplicate operator id '{0}'")]
    DuplicateId(String),

    #[error("operator '{op}' references unknown upstream '{upstream}'")]
    UnknownUpstream { op: String, upstream: String },

    #[error("invalid operator spec: {0}")]
    Invalid(String),
}

impl From<OpError> for relflow_core::error::Error {
    fn from(e: OpError) -> Self {
        relflow_core::error::Error::Graph(e.to_string())
    }
}

/// Time-driven callback the runtime registers for periodic invocation.
pub trait ScheduledFunction: Send + Sync {
    /// Fired for `key` at `timestamp_ms`; returns records to emit downstream.
    fn on_callback(&self, key: &str, timestamp_ms: u64) -> Vec<Record>;
}

/// Watermark propagation hook.
pub trait WatermarkFunction: Send + Sync {
    /// Called when the input watermark advances; returns records to flush.
    fn process_watermark(&self, watermark_ms: u64) -> Vec<Record>;

    /// Watermark to forward downstream, if the function holds one back.
    fn output_watermark(&self) -> Option<u64>;
}

/// Joins each stream message with the table record stored under its key.
pub trait StreamTableJoinFunction: Send + Sync {
    /// Key used to look up the table. `None` drops the message.
    fn get_message_key(&self, message: &Record) -> Option<Record>;

    /// Key under which a table record is stored.
    fn get_record_key(&self, record: &Record) -> Option<Record>;

    /// Build the join result; `record` is `None` on a lookup miss.
    fn apply(&self, message: &Record, record: Option<&Record>) -> Option<Record>;

    fn as_scheduled(&self) -> Option<&dyn ScheduledFunction> {
        None
    }

    fn as_watermark(&self) -> Option<&dyn WatermarkFunction> {
        None
    }
}

/// Optional capabilities a join function was found to support.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities(u8);

impl Capabilities {
    pub const NONE: Capabilities = Capabilities(0);
    pub const SCHEDULED: Capabilities = Capabilities(1 << 0);
    pub const WATERMARK: Capabilities = Capabilities(1 << 1);

    /// Probe a join function. Called once per spec.
    pub fn probe(f: &dyn StreamTableJoinFunction) -> Self {
        let mut caps = Capabilities::NONE;
        if f.as_scheduled().is_some() {
            caps = caps | Capabilities::SCHEDULED;
        }
        if f.as_watermark().is_some() {
            caps = caps | Capabilities::WATERMARK;
        }
        caps
    }

    pub fn contains(self, other: Capabilities) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn names(self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.contains(Capabilities::SCHEDULED) {
            out.push("scheduled");
        }
        if self.contains(Capabilities::WATERMARK) {
            out.push("watermark");
        }
        out
    }
}

impl std::ops::BitOr for Capabilities {
    type Output = Capabilities;

    fn bitor(self, rhs: Capabilities) -> Capabilities {
        Capabilities(self.0 | rhs.0)
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}
