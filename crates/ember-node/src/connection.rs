//! Per-connection read/write loop (spec.md §4.7, §5 Scheduling).
//!
//! Each connection gets one reader task (this function) driving message
//! dispatch, and one writer task serializing outbound frames from an mpsc
//! channel — so within a connection sends are ordered, but there is no
//! ordering guarantee across connections.

use std::net::SocketAddr;
use std::sync::Arc;

use ember_network::{split, Envelope, PeerIoError};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::node::{ConnAction, ConnHandle, Node};

/// Drive one peer connection end to end: spawns its writer task, sends our
/// HANDSHAKE, then loops reading frames and dispatching them until EOF or
/// error. Removes the connection from the node's table on exit.
pub async fn handle_connection(node: Arc<Node>, stream: TcpStream, peer_addr: SocketAddr, outbound: bool) {
    let conn_id = node.next_conn_id();
    let (reader, writer) = split(stream);
    let (tx, rx) = mpsc::unbounded_channel::<Envelope>();

    node.register_connection(conn_id, Arc::new(ConnHandle::new(tx.clone())));

    let writer_task = tokio::spawn(run_writer(writer, rx));

    debug!(conn_id, %peer_addr, outbound, "connection established");

    let handshake = node.handshake_envelope();
    if tx.send(handshake).is_err() {
        node.remove_connection(conn_id);
        return;
    }

    let mut reader = reader;
    loop {
        match reader.recv().await {
            Ok(Some(envelope)) => match node.handle_envelope(conn_id, peer_addr, envelope, &tx).await {
                Ok(ConnAction::Continue) => {}
                Ok(ConnAction::Close) => break,
                Err(e) => {
                    debug!(conn_id, error = %e, "dropping malformed/invalid message from peer");
                }
            },
            Ok(None) => break,
            Err(PeerIoError::Wire(e)) => {
                debug!(conn_id, error = %e, "dropping malformed frame from peer");
            }
            Err(e) => {
                warn!(conn_id, %peer_addr, error = %e, "connection read error");
                break;
            }
        }
    }

    node.remove_connection(conn_id);
    drop(tx);
    let _ = writer_task.await;
    debug!(conn_id, %peer_addr, "connection closed");
}

async fn run_writer(mut writer: ember_network::FramedWriter, mut rx: mpsc::UnboundedReceiver<Envelope>) {
    while let Some(envelope) = rx.recv().await {
        if let Err(e) = writer.send(&envelope).await {
            warn!(error = %e, "write failed, closing connection writer");
            break;
        }
    }
    let _ = writer.shutdown().await;
}
