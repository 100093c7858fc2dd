//! Message envelope and typed payloads for the wire codec (spec.md §4.6).
//!
//! Envelope: `type | sender_id | payload`, `|`-separated, `\n`-terminated
//! on the wire. `|` inside the final field of transaction-carrying
//! payloads is tolerated by rejoining trailing parts.

use std::fmt;
use std::str::FromStr;

use ember_core::{Block, NodeKind};

use crate::error::WireError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageType {
    Handshake,
    Transaction,
    Block,
    ChainRequest,
    ChainResponse,
    PeerList,
    Ping,
    Pong,
}

impl MessageType {
    fn as_wire_str(&self) -> &'static str {
        match self {
            MessageType::Handshake => "HANDSHAKE",
            MessageType::Transaction => "TRANSACTION",
            MessageType::Block => "BLOCK",
            MessageType::ChainRequest => "CHAIN_REQUEST",
            MessageType::ChainResponse => "CHAIN_RESPONSE",
            MessageType::PeerList => "PEER_LIST",
            MessageType::Ping => "PING",
            MessageType::Pong => "PONG",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_wire_str())
    }
}

impl FromStr for MessageType {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HANDSHAKE" => Ok(MessageType::Handshake),
            "TRANSACTION" => Ok(MessageType::Transaction),
            "BLOCK" => Ok(MessageType::Block),
            "CHAIN_REQUEST" => Ok(MessageType::ChainRequest),
            "CHAIN_RESPONSE" => Ok(MessageType::ChainResponse),
            "PEER_LIST" => Ok(MessageType::PeerList),
            "PING" => Ok(MessageType::Ping),
            "PONG" => Ok(MessageType::Pong),
            other => Err(WireError::UnknownMessageType(other.to_string())),
        }
    }
}

/// A parsed envelope: message type, originating node id, and the raw
/// `|`-joined payload tail (not yet interpreted by type).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub message_type: MessageType,
    pub sender_id: String,
    pub payload: String,
}

impl Envelope {
    pub fn new(message_type: MessageType, sender_id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            message_type,
            sender_id: sender_id.into(),
            payload: payload.into(),
        }
    }

    /// Render one full wire frame, without the trailing `\n` (the peer I/O
    /// layer appends framing).
    pub fn encode(&self) -> String {
        format!("{}|{}|{}", self.message_type, self.sender_id, self.payload)
    }

    /// Parse a single `\n`-stripped line into an envelope.
    pub fn decode(line: &str) -> Result<Self, WireError> {
        let mut parts = line.splitn(3, '|');
        let message_type = parts.next().filter(|s| !s.is_empty()).ok_or(WireError::EmptyFrame)?;
        let message_type: MessageType = message_type.parse()?;
        let sender_id = parts.next().unwrap_or("").to_string();
        let payload = parts.next().unwrap_or("").to_string();
        Ok(Self {
            message_type,
            sender_id,
            payload,
        })
    }
}

/// HANDSHAKE payload: `node_kind | listen_port`.
pub struct HandshakePayload {
    pub node_kind: NodeKind,
    pub listen_port: u16,
}

impl HandshakePayload {
    pub fn encode(&self) -> String {
        format!("{}|{}", self.node_kind, self.listen_port)
    }

    pub fn decode(payload: &str) -> Result<Self, WireError> {
        let mut parts = payload.splitn(2, '|');
        let node_kind = parts
            .next()
            .ok_or_else(|| malformed("HANDSHAKE", "missing node_kind"))?
            .parse::<NodeKind>()
            .map_err(|e| malformed("HANDSHAKE", &e.to_string()))?;
        let listen_port = parts
            .next()
            .ok_or_else(|| malformed("HANDSHAKE", "missing listen_port"))?
            .parse::<u16>()
            .map_err(|_| malformed("HANDSHAKE", "bad listen_port"))?;
        Ok(Self { node_kind, listen_port })
    }
}

/// One row of a PEER_LIST payload: `address | port | kind | id`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerEntry {
    pub address: String,
    pub port: u16,
    pub kind: NodeKind,
    pub id: String,
}

impl PeerEntry {
    fn encode(&self) -> String {
        format!("{}|{}|{}|{}", self.address, self.port, self.kind, self.id)
    }
}

/// PEER_LIST payload: `peerCount | (address|port|kind|id) x peerCount`.
pub struct PeerListPayload {
    pub peers: Vec<PeerEntry>,
}

impl PeerListPayload {
    pub fn encode(&self) -> String {
        let mut parts = vec![self.peers.len().to_string()];
        for peer in &self.peers {
            parts.push(peer.encode());
        }
        parts.join("|")
    }

    pub fn decode(payload: &str) -> Result<Self, WireError> {
        if payload.is_empty() {
            return Ok(Self { peers: Vec::new() });
        }
        let fields: Vec<&str> = payload.split('|').collect();
        let count: usize = fields
            .first()
            .ok_or_else(|| malformed("PEER_LIST", "missing peerCount"))?
            .parse()
            .map_err(|_| malformed("PEER_LIST", "bad peerCount"))?;
        let rest = &fields[1..];
        if rest.len() != count * 4 {
            return Err(malformed(
                "PEER_LIST",
                &format!("peerCount {count} implies {} fields, got {}", count * 4, rest.len()),
            ));
        }
        let mut peers = Vec::with_capacity(count);
        for chunk in rest.chunks_exact(4) {
            let port: u16 = chunk[1].parse().map_err(|_| malformed("PEER_LIST", "bad port"))?;
            let kind: NodeKind = chunk[2].parse().map_err(|e: ember_core::node_kind::ParseNodeKindError| malformed("PEER_LIST", &e.to_string()))?;
            peers.push(PeerEntry {
                address: chunk[0].to_string(),
                port,
                kind,
                id: chunk[3].to_string(),
            });
        }
        Ok(Self { peers })
    }
}

/// BLOCK payload is exactly [`Block::encode_fields`]; CHAIN_RESPONSE wraps
/// a count plus repeated BLOCK payloads.
pub struct ChainResponsePayload {
    pub blocks: Vec<Block>,
}

impl ChainResponsePayload {
    pub fn encode(&self) -> String {
        let mut parts = vec![self.blocks.len().to_string()];
        for block in &self.blocks {
            parts.push(block.encode_fields());
        }
        parts.join("|")
    }

    /// Decode is position-sensitive: each block's field count depends on
    /// its own `txCount`, so blocks cannot be split on a fixed stride like
    /// [`PeerListPayload`] and must be consumed sequentially.
    pub fn decode(payload: &str) -> Result<Self, WireError> {
        if payload.is_empty() {
            return Ok(Self { blocks: Vec::new() });
        }
        let fields: Vec<&str> = payload.split('|').collect();
        let block_count: usize = fields
            .first()
            .ok_or_else(|| malformed("CHAIN_RESPONSE", "missing blockCount"))?
            .parse()
            .map_err(|_| malformed("CHAIN_RESPONSE", "bad blockCount"))?;

        let mut cursor = 1;
        let mut blocks = Vec::with_capacity(block_count);
        for _ in 0..block_count {
            let header = &fields[cursor..];
            if header.len() < 7 {
                return Err(malformed("CHAIN_RESPONSE", "truncated block header"));
            }
            let tx_count: usize = header[6]
                .parse()
                .map_err(|_| malformed("CHAIN_RESPONSE", "bad per-block tx_count"))?;
            let block_field_count = 7 + tx_count * 7;
            if header.len() < block_field_count {
                return Err(malformed("CHAIN_RESPONSE", "truncated block transactions"));
            }
            let block_fields = &header[..block_field_count];
            let block = Block::decode_fields(block_fields).map_err(|e| malformed("CHAIN_RESPONSE", &e.to_string()))?;
            blocks.push(block);
            cursor += block_field_count;
        }
        Ok(Self { blocks })
    }
}

fn malformed(message_type: &str, reason: &str) -> WireError {
    WireError::MalformedPayload {
        message_type: message_type.to_string(),
        reason: reason.to_string(),
    }
}
