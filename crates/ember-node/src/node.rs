//! The full node: accept loop, peer table, dedup, flood relay, and sync
//! orchestration (spec.md §4.7, §5 Concurrency & Resource Model).

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ember_chain::Chain;
use ember_core::{Block, NodeKind, Transaction};
use ember_network::{
    ChainResponsePayload, Envelope, HandshakePayload, MessageType, PeerEntry, PeerInfo, PeerKey,
    PeerListPayload, PeerTable,
};
use ember_store::{RocksStore, Store};
use parking_lot::{Mutex, RwLock};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Notify, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::NodeConfig;
use crate::connection;
use crate::error::NodeError;
use crate::persistence;
use crate::seen::SeenSet;

/// Consecutive failed `add_foreign_block` attempts that trigger a
/// `CHAIN_REQUEST` recovery broadcast (spec.md §4.7).
const FAILED_APPEND_RECOVERY_THRESHOLD: u64 = 3;

/// Maximum number of transaction/block hashes remembered per dedup set
/// (SPEC_FULL.md §2), mirroring the teacher's `MAX_ORPHAN_TXS`/
/// `MAX_ORPHAN_BLOCKS` bounds.
const MAX_SEEN_TX_HASHES: usize = 10_000;
const MAX_SEEN_BLOCK_HASHES: usize = 1_000;

/// What the connection's read loop should do after dispatching one message.
pub enum ConnAction {
    Continue,
    Close,
}

/// Per-connection outbound handle: a channel into that connection's writer
/// task, plus the peer identity once its HANDSHAKE has been processed.
pub struct ConnHandle {
    pub tx: mpsc::UnboundedSender<Envelope>,
    pub peer_key: Mutex<Option<PeerKey>>,
}

impl ConnHandle {
    pub fn new(tx: mpsc::UnboundedSender<Envelope>) -> Self {
        Self {
            tx,
            peer_key: Mutex::new(None),
        }
    }
}

/// Runtime counters, approximate by design (spec.md §5: not used for
/// consensus or consistency guarantees, observation only).
#[derive(Default)]
pub struct NodeMetrics {
    pub blocks_connected: AtomicU64,
    pub txs_relayed: AtomicU64,
    pub chain_requests_sent: AtomicU64,
}

/// The full node, composing the chain aggregate, the store, and the P2P
/// overlay (spec.md §2 Node, §5 Shared resource policy).
pub struct Node {
    chain: RwLock<Chain>,
    store: Arc<dyn Store>,
    peers: Mutex<PeerTable>,
    connections: Mutex<HashMap<u64, Arc<ConnHandle>>>,
    config: NodeConfig,
    node_id: String,
    next_conn_id: AtomicU64,
    failed_append_streak: AtomicU64,
    shutdown_notify: Notify,
    accept_handle: Mutex<Option<JoinHandle<()>>>,
    outbound_semaphore: Arc<Semaphore>,
    metrics: NodeMetrics,
    seen_txs: Mutex<SeenSet>,
    seen_blocks: Mutex<SeenSet>,
}

impl Node {
    /// Open the store, load/rebuild the chain, bind the listener, and spawn
    /// the accept loop.
    pub async fn start(config: NodeConfig) -> Result<Arc<Self>, NodeError> {
        std::fs::create_dir_all(&config.data_dir)?;
        let db_path = config.db_path();
        let store: RocksStore = if config.clean {
            RocksStore::open_clean(db_path)?
        } else {
            RocksStore::open(db_path)?
        };
        let store: Arc<dyn Store> = Arc::new(store);
        let mut chain = persistence::load_chain(&*store, config.kind)?;
        chain.set_difficulty(config.difficulty);

        let listener = TcpListener::bind(config.listen_addr()).await?;
        info!(addr = %config.listen_addr(), kind = %config.kind, "node listening");

        let node = Arc::new(Self {
            chain: RwLock::new(chain),
            store,
            peers: Mutex::new(PeerTable::new()),
            connections: Mutex::new(HashMap::new()),
            node_id: format!("node-{:016x}", rand::random::<u64>()),
            next_conn_id: AtomicU64::new(0),
            failed_append_streak: AtomicU64::new(0),
            shutdown_notify: Notify::new(),
            accept_handle: Mutex::new(None),
            outbound_semaphore: Arc::new(Semaphore::new(config.max_outbound_dials)),
            metrics: NodeMetrics::default(),
            seen_txs: Mutex::new(SeenSet::with_capacity(MAX_SEEN_TX_HASHES)),
            seen_blocks: Mutex::new(SeenSet::with_capacity(MAX_SEEN_BLOCK_HASHES)),
            config,
        });

        let accept_node = node.clone();
        let handle = tokio::spawn(async move { accept_node.accept_loop(listener).await });
        *node.accept_handle.lock() = Some(handle);

        Ok(node)
    }

    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown_notify.notified() => {
                    debug!("accept loop stopping");
                    break;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            let node = self.clone();
                            tokio::spawn(connection::handle_connection(node, stream, addr, false));
                        }
                        Err(e) => warn!(error = %e, "accept failed"),
                    }
                }
            }
        }
    }

    /// Dial an outbound peer; the resulting connection runs through the
    /// same handshake/dispatch path as an inbound one.
    pub async fn connect_to(self: &Arc<Self>, host: &str, port: u16) -> Result<(), NodeError> {
        let stream = TcpStream::connect(format!("{host}:{port}")).await?;
        let peer_addr = stream.peer_addr()?;
        let node = self.clone();
        tokio::spawn(connection::handle_connection(node, stream, peer_addr, true));
        Ok(())
    }

    /// Stop accepting, close every connection socket, and wait for their
    /// I/O tasks to finish before returning (spec.md §5 Cancellation).
    pub async fn shutdown(&self) {
        self.shutdown_notify.notify_waiters();
        if let Some(handle) = self.accept_handle.lock().take() {
            let _ = handle.await;
        }
        let handles: Vec<Arc<ConnHandle>> = self.connections.lock().values().cloned().collect();
        for handle in handles {
            // Dropping the sender closes the writer task's channel, which
            // causes it to shut down its socket half and exit; the reader
            // half observes EOF/error on its own and unwinds independently.
            drop(handle);
        }
        self.store.flush().ok();
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn height(&self) -> u64 {
        self.chain.read().height()
    }

    pub fn tip_hash(&self) -> String {
        self.chain.read().tip().hash.clone()
    }

    pub fn balance(&self, address: &str) -> f64 {
        self.chain.read().balances().get(address)
    }

    pub fn metrics(&self) -> &NodeMetrics {
        &self.metrics
    }

    pub fn peer_count(&self) -> usize {
        self.connections.lock().len()
    }

    pub(crate) fn next_conn_id(&self) -> u64 {
        self.next_conn_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn register_connection(&self, id: u64, handle: Arc<ConnHandle>) {
        self.connections.lock().insert(id, handle);
    }

    pub(crate) fn remove_connection(&self, id: u64) {
        self.connections.lock().remove(&id);
    }

    pub(crate) fn handshake_envelope(&self) -> Envelope {
        let payload = HandshakePayload {
            node_kind: self.config.kind,
            listen_port: self.config.port,
        }
        .encode();
        Envelope::new(MessageType::Handshake, self.node_id.clone(), payload)
    }

    /// True if `(ip, port)` resolves to our own listen address.
    fn is_self(&self, ip: IpAddr, port: u16) -> bool {
        if port != self.config.port {
            return false;
        }
        let ip_str = ip.to_string();
        is_loopback_host(&ip_str) && is_loopback_host(&self.config.host) || ip_str == self.config.host
    }

    /// Submit a transaction originating locally (not from a peer): validate,
    /// admit, persist, and flood to every connected peer.
    pub async fn submit_transaction(self: &Arc<Self>, tx: Transaction) -> Result<bool, NodeError> {
        let newly_added = self.chain.write().add_local_transaction(tx.clone())?;
        if newly_added {
            persistence::persist_pending_tx(&*self.store, &tx)?;
            self.flood(None, Envelope::new(MessageType::Transaction, self.node_id.clone(), tx.encode_fields()));
        }
        Ok(newly_added)
    }

    /// Mine a new block crediting `miner_address`. The CPU-bound proof-of-work
    /// loop runs on a blocking thread so the I/O reactor stays responsive
    /// (spec.md §5 Suspension points).
    pub async fn mine(self: &Arc<Self>, miner_address: String) -> Result<Block, NodeError> {
        let node = self.clone();
        let now = now_unix();
        let block = tokio::task::spawn_blocking(move || {
            let mut chain = node.chain.write();
            chain.mine(&miner_address, now)
        })
        .await
        .expect("mining task panicked")?;

        let touched: Vec<(String, f64)> = {
            let balances = self.chain.read().balances().clone();
            block
                .transactions
                .iter()
                .filter(|tx| !tx.is_genesis_sentinel())
                .flat_map(|tx| {
                    [
                        (tx.sender.clone(), balances.get(&tx.sender)),
                        (tx.receiver.clone(), balances.get(&tx.receiver)),
                    ]
                })
                .collect()
        };
        let touched_refs: Vec<(&str, f64)> = touched.iter().map(|(a, b)| (a.as_str(), *b)).collect();
        persistence::persist_block(&*self.store, &block, &touched_refs)?;

        self.flood(
            None,
            Envelope::new(MessageType::Block, self.node_id.clone(), block.encode_fields()),
        );
        Ok(block)
    }

    fn flood(&self, exclude: Option<u64>, envelope: Envelope) {
        let connections = self.connections.lock();
        for (id, handle) in connections.iter() {
            if Some(*id) != exclude {
                let _ = handle.tx.send(envelope.clone());
            }
        }
    }

    fn broadcast(&self, envelope: Envelope) {
        self.flood(None, envelope);
    }

    /// Dispatch one parsed envelope from connection `conn_id`. Returns
    /// whether the connection should stay open.
    pub(crate) async fn handle_envelope(
        self: &Arc<Self>,
        conn_id: u64,
        peer_addr: SocketAddr,
        envelope: Envelope,
        tx: &mpsc::UnboundedSender<Envelope>,
    ) -> Result<ConnAction, NodeError> {
        match envelope.message_type {
            MessageType::Handshake => self.on_handshake(conn_id, peer_addr, &envelope, tx),
            MessageType::Transaction => {
                self.on_transaction(conn_id, &envelope)?;
                Ok(ConnAction::Continue)
            }
            MessageType::Block => {
                self.on_block(conn_id, &envelope)?;
                Ok(ConnAction::Continue)
            }
            MessageType::ChainRequest => {
                self.on_chain_request(tx)?;
                Ok(ConnAction::Continue)
            }
            MessageType::ChainResponse => {
                self.on_chain_response(&envelope)?;
                Ok(ConnAction::Continue)
            }
            MessageType::PeerList => {
                self.on_peer_list(&envelope).await?;
                Ok(ConnAction::Continue)
            }
            MessageType::Ping => {
                let _ = tx.send(Envelope::new(MessageType::Pong, self.node_id.clone(), ""));
                Ok(ConnAction::Continue)
            }
            MessageType::Pong => Ok(ConnAction::Continue),
        }
    }

    fn on_handshake(
        &self,
        conn_id: u64,
        peer_addr: SocketAddr,
        envelope: &Envelope,
        tx: &mpsc::UnboundedSender<Envelope>,
    ) -> Result<ConnAction, NodeError> {
        let hs = HandshakePayload::decode(&envelope.payload)?;
        if self.is_self(peer_addr.ip(), hs.listen_port) {
            warn!(conn_id, %peer_addr, "dropping self-connection");
            return Ok(ConnAction::Close);
        }

        let peer = PeerInfo {
            address: peer_addr.ip().to_string(),
            port: hs.listen_port,
            kind: hs.node_kind,
            id: envelope.sender_id.clone(),
        };
        self.peers.lock().upsert(peer.clone());
        if let Some(handle) = self.connections.lock().get(&conn_id) {
            *handle.peer_key.lock() = Some(peer.key());
        }

        let peers: Vec<PeerEntry> = self
            .peers
            .lock()
            .iter()
            .map(|p| PeerEntry {
                address: p.address.clone(),
                port: p.port,
                kind: p.kind,
                id: p.id.clone(),
            })
            .collect();
        let payload = PeerListPayload { peers }.encode();
        let _ = tx.send(Envelope::new(MessageType::PeerList, self.node_id.clone(), payload));

        Ok(ConnAction::Continue)
    }

    fn on_transaction(&self, conn_id: u64, envelope: &Envelope) -> Result<(), NodeError> {
        let fields: Vec<&str> = envelope.payload.split('|').collect();
        let tx = match Transaction::decode_fields(&fields) {
            Ok(tx) => tx,
            Err(_) => return Ok(()), // malformed peer input: dropped, not propagated
        };
        if !self.seen_txs.lock().insert(&tx.hash) {
            return Ok(()); // already processed this lifetime, even if since mined and cleared from the mempool
        }
        if !tx.is_valid() {
            return Ok(());
        }
        if self.chain.read().mempool().contains(&tx.hash) {
            return Ok(());
        }

        match self.chain.write().add_local_transaction(tx.clone()) {
            Ok(true) => {
                persistence::persist_pending_tx(&*self.store, &tx)?;
                self.metrics.txs_relayed.fetch_add(1, Ordering::Relaxed);
                self.flood(Some(conn_id), envelope.clone());
            }
            Ok(false) => {}
            Err(_) => {} // InvalidTransaction (e.g. insufficient balance): dropped silently
        }
        Ok(())
    }

    fn on_block(&self, conn_id: u64, envelope: &Envelope) -> Result<(), NodeError> {
        let fields: Vec<&str> = envelope.payload.split('|').collect();
        let block = match Block::decode_fields(&fields) {
            Ok(block) => block,
            Err(_) => return Ok(()),
        };

        if !self.seen_blocks.lock().insert(&block.hash) {
            return Ok(());
        }
        let already_known = self.chain.read().blocks().iter().any(|b| b.hash == block.hash);
        if already_known {
            return Ok(());
        }

        let touched: Vec<(String, f64)>;
        {
            let mut chain = self.chain.write();
            match chain.add_foreign_block(block.clone()) {
                Ok(()) => {
                    self.failed_append_streak.store(0, Ordering::Relaxed);
                    self.metrics.blocks_connected.fetch_add(1, Ordering::Relaxed);
                    touched = block
                        .transactions
                        .iter()
                        .filter(|tx| !tx.is_genesis_sentinel())
                        .flat_map(|tx| {
                            [
                                (tx.sender.clone(), chain.balances().get(&tx.sender)),
                                (tx.receiver.clone(), chain.balances().get(&tx.receiver)),
                            ]
                        })
                        .collect();
                }
                Err(_) => {
                    let streak = self.failed_append_streak.fetch_add(1, Ordering::Relaxed) + 1;
                    if streak >= FAILED_APPEND_RECOVERY_THRESHOLD {
                        self.failed_append_streak.store(0, Ordering::Relaxed);
                        self.metrics.chain_requests_sent.fetch_add(1, Ordering::Relaxed);
                        self.broadcast(Envelope::new(MessageType::ChainRequest, self.node_id.clone(), ""));
                    }
                    return Ok(());
                }
            }
        }

        let touched_refs: Vec<(&str, f64)> = touched.iter().map(|(a, b)| (a.as_str(), *b)).collect();
        persistence::persist_block(&*self.store, &block, &touched_refs)?;
        self.flood(Some(conn_id), envelope.clone());
        Ok(())
    }

    fn on_chain_request(&self, tx: &mpsc::UnboundedSender<Envelope>) -> Result<(), NodeError> {
        if self.config.kind != NodeKind::FullNode {
            return Ok(()); // wallet nodes ignore
        }
        let blocks = self.chain.read().blocks().to_vec();
        let payload = ChainResponsePayload { blocks }.encode();
        let _ = tx.send(Envelope::new(MessageType::ChainResponse, self.node_id.clone(), payload));
        Ok(())
    }

    fn on_chain_response(&self, envelope: &Envelope) -> Result<(), NodeError> {
        let payload = match ChainResponsePayload::decode(&envelope.payload) {
            Ok(p) => p,
            Err(_) => return Ok(()),
        };
        let adopted = self.chain.write().replace_chain(payload.blocks);
        match adopted {
            Ok(true) => {
                persistence::persist_full_chain(&*self.store, &self.chain.read())?;
            }
            Ok(false) => {}
            Err(_) => {} // ChainIntegrity: terminal only for the candidate
        }
        Ok(())
    }

    async fn on_peer_list(self: &Arc<Self>, envelope: &Envelope) -> Result<(), NodeError> {
        let payload = match PeerListPayload::decode(&envelope.payload) {
            Ok(p) => p,
            Err(_) => return Ok(()),
        };

        for entry in payload.peers {
            if let Ok(ip) = entry.address.parse::<IpAddr>() {
                if self.is_self(ip, entry.port) {
                    continue;
                }
            }
            let key: PeerKey = (entry.address.clone(), entry.port);
            let already_connected = self
                .connections
                .lock()
                .values()
                .any(|h| h.peer_key.lock().as_ref() == Some(&key));
            if already_connected {
                continue;
            }

            let node = self.clone();
            let Ok(permit) = self.outbound_semaphore.clone().try_acquire_owned() else {
                continue; // bounded concurrency: skip rather than queue unboundedly
            };
            tokio::spawn(async move {
                let _permit = permit;
                if let Err(e) = node.connect_to(&entry.address, entry.port).await {
                    debug!(address = %entry.address, port = entry.port, error = %e, "outbound connect failed");
                }
            });
        }
        Ok(())
    }
}

fn is_loopback_host(host: &str) -> bool {
    matches!(host, "127.0.0.1" | "::1" | "localhost" | "0.0.0.0")
}

fn now_unix() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock is after the Unix epoch")
        .as_secs()
}
