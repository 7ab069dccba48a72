//! Field-keyed join function used for joins lowered from a relational plan.
//!
//! Keys are read from a named field on each side. Results are the stream
//! message's fields followed by the table record's; a table field whose name
//! is already taken gets a `_right` suffix.

use relflow_core::plan::JoinType;
use serde_json::{Map, Value};

use crate::traits::{Record, StreamTableJoinFunction};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldJoinFunction {
    pub message_key: String,
    pub record_key: String,
    pub join_type: JoinType,
}

impl FieldJoinFunction {
    pub fn new(
        message_key: impl Into<String>,
        record_key: impl Into<String>,
        join_type: JoinType,
    ) -> Self {
        Self {
            message_key: message_key.into(),
            record_key: record_key.into(),
            join_type,
        }
    }
}

fn field(v: &Record, name: &str) -> Option<Record> {
    match v.get(name) {
        None | Some(Value::Null) => None,
        Some(k) => Some(k.clone()),
    }
}

impl StreamTableJoinFunction for FieldJoinFunction {
    fn get_message_key(&self, message: &Record) -> Option<Record> {
        field(message, &self.message_key)
    }

    fn get_record_key(&self, record: &Record) -> Option<Record> {
        field(record, &self.record_key)
    }

    fn apply(&self, message: &Record, record: Option<&Record>) -> Option<Record> {
        let record = match (record, self.join_type) {
            (Some(r), _) => r,
            (None, JoinType::Left) => return Some(message.clone()),
            (None, JoinType::Inner) => return None,
        };

        let mut out = Map::new();
        if let Value::Object(m) = message {
            out.extend(m.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        if let Value::Object(r) = record {
            for (k, v) in r {
                let name = if out.contains_key(k) {
                    format!("{}_right", k)
                } else {
                    k.clone()
                };
                out.insert(name, v.clone());
            }
        }
        Some(Value::Object(out))
    }
}
