//! Wire and peer I/O error taxonomy (spec.md §7).

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("empty frame")]
    EmptyFrame,
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),
    #[error("malformed payload for {message_type}: {reason}")]
    MalformedPayload { message_type: String, reason: String },
}

#[derive(Error, Debug)]
pub enum PeerIoError {
    #[error("connection closed by peer")]
    Closed,
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
