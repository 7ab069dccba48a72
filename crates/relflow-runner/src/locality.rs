//! Container locality: which host each container last ran on.
//!
//! The mapping is persisted as `set-container-host-mapping` messages in an
//! append-only coordinator log. A `LocalityManager` starts empty, rebuilds
//! its map by replaying the log in order (last write per container wins,
//! an empty message deletes), and appends a message for every new mapping.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use relflow_core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub type ContainerId = String;

pub const SET_CONTAINER_HOST_MAPPING: &str = "set-container-host-mapping";

const HOST_KEY: &str = "host";
const JMX_URL_KEY: &str = "jmx-url";
const JMX_TUNNELING_URL_KEY: &str = "jmx-tunneling-url";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorMessage {
    pub message_type: String,
    /// Who wrote the message.
    pub source: String,
    pub key: String,
    /// Empty for a delete.
    pub values: BTreeMap<String, String>,
}

impl CoordinatorMessage {
    pub fn set_container_host_mapping(
        source: impl Into<String>,
        container_id: impl Into<String>,
        locality: &ContainerLocality,
    ) -> Self {
        let mut values = BTreeMap::new();
        values.insert(HOST_KEY.to_string(), locality.host.clone());
        values.insert(JMX_URL_KEY.to_string(), locality.jmx_url.clone());
        values.insert(
            JMX_TUNNELING_URL_KEY.to_string(),
            locality.jmx_tunneling_url.clone(),
        );
        Self {
            message_type: SET_CONTAINER_HOST_MAPPING.to_string(),
            source: source.into(),
            key: container_id.into(),
            values,
        }
    }

    /// Tombstone for `container_id`.
    pub fn delete(
        message_type: impl Into<String>,
        source: impl Into<String>,
        container_id: impl Into<String>,
    ) -> Self {
        Self {
            message_type: message_type.into(),
            source: source.into(),
            key: container_id.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn is_delete(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerLocality {
    pub host: String,
    pub jmx_url: String,
    pub jmx_tunneling_url: String,
}

impl ContainerLocality {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            jmx_url: String::new(),
            jmx_tunneling_url: String::new(),
        }
    }

    pub fn with_jmx(mut self, url: impl Into<String>, tunneling_url: impl Into<String>) -> Self {
        self.jmx_url = url.into();
        self.jmx_tunneling_url = tunneling_url.into();
        self
    }

    fn from_values(values: &BTreeMap<String, String>) -> Option<Self> {
        let host = values.get(HOST_KEY)?;
        let get = |k: &str| values.get(k).cloned().unwrap_or_default();
        Some(Self {
            host: host.clone(),
            jmx_url: get(JMX_URL_KEY),
            jmx_tunneling_url: get(JMX_TUNNELING_URL_KEY),
        })
    }
}

/// Append-only coordination log shared by the job's processes.
pub trait CoordinatorLog: Send + Sync {
    /// Announce `source` as a writer. Appending requires it.
    fn register(&self, source: &str) -> Result<()>;

    /// All messages of `message_type`, in log order.
    fn bootstrap(&self, message_type: &str) -> Result<Vec<CoordinatorMessage>>;

    fn append(&self, message: CoordinatorMessage) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct InMemoryCoordinatorLog {
    inner: Mutex<LogState>,
}

#[derive(Debug, Default)]
struct LogState {
    sources: BTreeSet<String>,
    messages: Vec<CoordinatorMessage>,
}

impl InMemoryCoordinatorLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, LogState>> {
        self.inner
            .lock()
            .map_err(|_| Error::Invariant("coordinator log lock poisoned".into()))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.state()?.messages.len())
    }
}

impl CoordinatorLog for InMemoryCoordinatorLog {
    fn register(&self, source: &str) -> Result<()> {
        self.state()?.sources.insert(source.to_string());
        Ok(())
    }

    fn bootstrap(&self, message_type: &str) -> Result<Vec<CoordinatorMessage>> {
        Ok(self
            .state()?
            .messages
            .iter()
            .filter(|m| m.message_type == message_type)
            .cloned()
            .collect())
    }

    fn append(&self, message: CoordinatorMessage) -> Result<()> {
        let mut state = self.state()?;
        if !state.sources.contains(&message.source) {
            return Err(Error::Invariant(format!(
                "source '{}' appended to the coordinator log before registering",
                message.source
            )));
        }
        state.messages.push(message);
        Ok(())
    }
}

pub struct LocalityManager {
    log: Arc<dyn CoordinatorLog>,
    source: String,
    mapping: BTreeMap<ContainerId, ContainerLocality>,
}

impl LocalityManager {
    /// Empty manager writing as `source`. Call `register` before writing and
    /// `read_container_locality` to load what the log already holds.
    pub fn new(log: Arc<dyn CoordinatorLog>, source: impl Into<String>) -> Self {
        Self {
            log,
            source: source.into(),
            mapping: BTreeMap::new(),
        }
    }

    pub fn register(&self) -> Result<()> {
        self.log.register(&self.source)
    }

    /// Rebuild the mapping from the log and return it.
    pub fn read_container_locality(&mut self) -> Result<&BTreeMap<ContainerId, ContainerLocality>> {
        let mut mapping = BTreeMap::new();
        for msg in self.log.bootstrap(SET_CONTAINER_HOST_MAPPING)? {
            if msg.is_delete() {
                mapping.remove(&msg.key);
                continue;
            }
            match ContainerLocality::from_values(&msg.values) {
                Some(loc) => {
                    mapping.insert(msg.key, loc);
                }
                None => debug!(container = %msg.key, "skipping mapping without a host"),
            }
        }
        debug!(containers = mapping.len(), "read container locality");
        self.mapping = mapping;
        Ok(&self.mapping)
    }

    /// Persist `container_id` → `locality` and update the local map.
    pub fn write_container_to_host_mapping(
        &mut self,
        container_id: &str,
        locality: ContainerLocality,
    ) -> Result<()> {
        match self.mapping.get(container_id) {
            Some(old) if old.host != locality.host => info!(
                container = %container_id,
                from = %old.host,
                to = %locality.host,
                "container moved"
            ),
            Some(_) => debug!(container = %container_id, host = %locality.host, "container restarted on same host"),
            None => info!(container = %container_id, host = %locality.host, "container started"),
        }
        self.log.append(CoordinatorMessage::set_container_host_mapping(
            self.source.clone(),
            container_id,
            &locality,
        ))?;
        self.mapping.insert(container_id.to_string(), locality);
        Ok(())
    }

    pub fn container_locality(&self) -> &BTreeMap<ContainerId, ContainerLocality> {
        &self.mapping
    }

    pub fn host_for(&self, container_id: &str) -> Option<&str> {
        self.mapping.get(container_id).map(|l| l.host.as_str())
    }
}
