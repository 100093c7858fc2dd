//! Shared helpers for spinning up real `ember-node` instances against
//! temporary RocksDB directories and loopback ports.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use ember_core::NodeKind;
use ember_node::{Node, NodeConfig};

static NEXT_PORT: AtomicU16 = AtomicU16::new(19_000);

/// Claim a fresh loopback port for a test node. Monotonically increasing,
/// so concurrently-running tests in one binary never collide.
pub fn next_port() -> u16 {
    NEXT_PORT.fetch_add(1, Ordering::Relaxed)
}

/// A config for a full node rooted at a fresh temp directory, at difficulty
/// 1 so mining in tests completes in well under a second.
pub fn test_config(data_dir: PathBuf, port: u16) -> NodeConfig {
    NodeConfig {
        host: "127.0.0.1".to_string(),
        port,
        kind: NodeKind::FullNode,
        difficulty: 1,
        data_dir,
        clean: false,
        max_outbound_dials: 8,
    }
}

/// Start a full node on a fresh temp directory and loopback port. The
/// returned `TempDir` must outlive the node or its store directory is
/// deleted out from under it.
pub async fn start_test_node() -> (Arc<Node>, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let port = next_port();
    let config = test_config(dir.path().to_path_buf(), port);
    let node = Node::start(config).await.expect("node starts cleanly");
    (node, dir)
}

/// Poll `predicate` until it returns true or the deadline elapses, for
/// waiting on asynchronous gossip convergence between nodes without a
/// fixed sleep.
pub async fn wait_until<F: Fn() -> bool>(predicate: F, attempts: u32) -> bool {
    for _ in 0..attempts {
        if predicate() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    predicate()
}
