//! Newline-framed connection I/O (spec.md §4.7, §5 Scheduling).
//!
//! Each connection's read loop and write loop are serialized
//! per-connection; cross-connection ordering is not guaranteed.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::error::PeerIoError;
use crate::message::Envelope;

/// The read half of a framed connection: pulls `\n`-terminated lines and
/// parses them into envelopes.
pub struct FramedReader {
    lines: tokio::io::Lines<BufReader<OwnedReadHalf>>,
}

impl FramedReader {
    pub fn new(read_half: OwnedReadHalf) -> Self {
        Self {
            lines: BufReader::new(read_half).lines(),
        }
    }

    /// Read and parse the next frame. Returns `Ok(None)` only on clean EOF;
    /// a blank line mid-stream is a malformed frame and decodes to
    /// `WireError::EmptyFrame` like any other unparsable line, so the caller
    /// can drop it per-message instead of mistaking it for a disconnect.
    pub async fn recv(&mut self) -> Result<Option<Envelope>, PeerIoError> {
        match self.lines.next_line().await? {
            Some(line) => Ok(Some(Envelope::decode(&line)?)),
            None => Ok(None),
        }
    }
}

/// The write half of a framed connection: serializes envelopes with a
/// trailing `\n`.
pub struct FramedWriter {
    write_half: OwnedWriteHalf,
}

impl FramedWriter {
    pub fn new(write_half: OwnedWriteHalf) -> Self {
        Self { write_half }
    }

    pub async fn send(&mut self, envelope: &Envelope) -> Result<(), PeerIoError> {
        let mut frame = envelope.encode();
        frame.push('\n');
        self.write_half.write_all(frame.as_bytes()).await?;
        self.write_half.flush().await?;
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), PeerIoError> {
        self.write_half.shutdown().await?;
        Ok(())
    }
}

/// Split a connected stream into its framed read/write halves.
pub fn split(stream: TcpStream) -> (FramedReader, FramedWriter) {
    let (read_half, write_half) = stream.into_split();
    (FramedReader::new(read_half), FramedWriter::new(write_half))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageType;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn round_trips_one_frame_over_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (mut reader, _writer) = split(stream);
            reader.recv().await.unwrap().unwrap()
        });

        let client = TcpStream::connect(addr).await.unwrap();
        let (_reader, mut writer) = split(client);
        let envelope = Envelope::new(MessageType::Ping, "node-a", "");
        writer.send(&envelope).await.unwrap();

        let received = server.await.unwrap();
        assert_eq!(received, envelope);
    }

    #[tokio::test]
    async fn blank_line_mid_stream_is_a_dropped_frame_not_eof() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (mut reader, _writer) = split(stream);
            let first = reader.recv().await;
            let second = reader.recv().await.unwrap().unwrap();
            (first, second)
        });

        let client = TcpStream::connect(addr).await.unwrap();
        let (_reader, mut writer) = split(client);
        writer.write_half.write_all(b"\n").await.unwrap();
        let envelope = Envelope::new(MessageType::Ping, "node-a", "");
        writer.send(&envelope).await.unwrap();

        let (first, second) = server.await.unwrap();
        assert!(matches!(first, Err(PeerIoError::Wire(_))));
        assert_eq!(second, envelope);
    }

    #[tokio::test]
    async fn eof_yields_none() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (mut reader, _writer) = split(stream);
            reader.recv().await.unwrap()
        });

        let client = TcpStream::connect(addr).await.unwrap();
        drop(client);

        let received = server.await.unwrap();
        assert!(received.is_none());
    }
}
