//! Node configuration (spec.md §6 Operational surface).

use std::path::PathBuf;

use ember_core::constants::DEFAULT_DIFFICULTY;
use ember_core::NodeKind;

/// Configuration for one running node instance.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Address to bind the P2P listener to.
    pub host: String,
    /// Port to bind the P2P listener to.
    pub port: u16,
    /// Whether this node mines and serves chain sync, or is wallet-only.
    pub kind: NodeKind,
    /// Initial difficulty used when mining (clamped to `[1, 8]`).
    pub difficulty: u8,
    /// Root directory for persistent chain data.
    pub data_dir: PathBuf,
    /// Discard on-disk state before loading (fresh chain from Genesis).
    pub clean: bool,
    /// Maximum number of concurrent outbound peer-list dial attempts.
    pub max_outbound_dials: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ember");
        Self {
            host: "127.0.0.1".to_string(),
            port: 9000,
            kind: NodeKind::FullNode,
            difficulty: DEFAULT_DIFFICULTY,
            data_dir,
            clean: false,
            max_outbound_dials: 8,
        }
    }
}

impl NodeConfig {
    /// Path to the RocksDB chain data directory.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("chaindata")
    }

    /// Socket address string for the P2P listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_listen_addr() {
        let cfg = NodeConfig::default();
        assert_eq!(cfg.listen_addr(), "127.0.0.1:9000");
    }

    #[test]
    fn default_kind_is_full_node() {
        assert_eq!(NodeConfig::default().kind, NodeKind::FullNode);
    }

    #[test]
    fn db_path_appends_chaindata() {
        let cfg = NodeConfig {
            data_dir: PathBuf::from("/tmp/ember-test"),
            ..NodeConfig::default()
        };
        assert_eq!(cfg.db_path(), PathBuf::from("/tmp/ember-test/chaindata"));
    }

    #[test]
    fn custom_listen_addr() {
        let cfg = NodeConfig {
            host: "0.0.0.0".to_string(),
            port: 12345,
            ..NodeConfig::default()
        };
        assert_eq!(cfg.listen_addr(), "0.0.0.0:12345");
    }
}
