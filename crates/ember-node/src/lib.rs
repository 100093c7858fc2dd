//! Node composition: accept loop, peer table, flood relay, and sync
//! orchestration over the lower `ember-*` crates (spec.md §4.7, §5).

pub mod config;
pub mod connection;
pub mod error;
pub mod node;
pub mod persistence;
pub mod seen;

pub use config::NodeConfig;
pub use error::NodeError;
pub use node::{ConnAction, ConnHandle, Node, NodeMetrics};
