//! Wire codec and framed TCP peer I/O for the EmberChain gossip overlay
//! (spec.md §4.6 Wire codec, §4.7 Peer I/O and Node).

pub mod error;
pub mod io;
pub mod message;
pub mod peer;

pub use error::{PeerIoError, WireError};
pub use io::{split, FramedReader, FramedWriter};
pub use message::{
    ChainResponsePayload, Envelope, HandshakePayload, MessageType, PeerEntry, PeerListPayload,
};
pub use peer::{PeerInfo, PeerKey, PeerTable};
