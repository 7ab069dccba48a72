//! Stable digests of compiled jobs.
//!
//! The config snapshot and the operator graph description are digested
//! separately and folded together, so two compilations fingerprint equal
//! iff they produced the same keys and the same operators.

use relflow_core::config::Config;
use relflow_core::error::Result;
use relflow_core::hash::Fingerprint;
use relflow_operators::OperatorGraph;

pub fn fingerprint(config: &Config, graph: &OperatorGraph) -> Result<Fingerprint> {
    Ok(Fingerprint::of_parts([
        Fingerprint::of(config)?,
        Fingerprint::of(&graph.describe())?,
    ]))
}
