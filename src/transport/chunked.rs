//! HTTP/1.1 request head and chunked upload framing.

use super::connector::{Connection, Connector};
use crate::auth::RequestHeaders;
use crate::error::Result;
use tokio::io::{AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tracing::{debug, warn};

pub type ConnectionReader = ReadHalf<Box<dyn Connection>>;
pub type ConnectionWriter = WriteHalf<Box<dyn Connection>>;

/// Serialize a request line plus headers, ending with the blank line.
pub fn request_head(method: &str, target: &str, host: &str, headers: &RequestHeaders) -> String {
    let mut head = format!("{method} {target} HTTP/1.1\r\nHost: {host}\r\n");
    head.push_str("Accept-Encoding: identity\r\n");
    for (name, value) in headers.iter() {
        head.push_str(name);
        head.push_str(": ");
        head.push_str(value);
        head.push_str("\r\n");
    }
    head.push_str("\r\n");
    head
}

/// One chunk: hex length, CRLF, payload, CRLF. An empty payload is the
/// terminal chunk.
pub fn encode_chunk(payload: &[u8]) -> Vec<u8> {
    let mut chunk = format!("{:x}\r\n", payload.len()).into_bytes();
    chunk.extend_from_slice(payload);
    chunk.extend_from_slice(b"\r\n");
    chunk
}

/// Write side of a chunked upload.
///
/// Sending is best effort: the first write failure is logged and the writer
/// is dropped, after which sends are silent no-ops. The response side
/// reports how the session actually ended.
pub struct StreamTransport<W> {
    writer: Option<W>,
}

impl StreamTransport<ConnectionWriter> {
    /// Connect, send the request head, and split the connection.
    pub async fn open(
        connector: &dyn Connector,
        method: &str,
        target: &str,
        headers: &RequestHeaders,
    ) -> Result<(Self, ConnectionReader)> {
        let connection = connector.connect().await?;
        let (reader, mut writer) = tokio::io::split(connection);

        let head = request_head(method, target, connector.host(), headers);
        writer.write_all(head.as_bytes()).await?;
        writer.flush().await?;
        debug!(method, target, "Request head sent");

        Ok((Self::new(writer), reader))
    }
}

impl<W: AsyncWrite + Unpin> StreamTransport<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Some(writer),
        }
    }

    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    /// Send `payload` as one chunk. Returns false once the upload is broken.
    pub async fn send_chunk(&mut self, payload: &[u8]) -> bool {
        let Some(writer) = self.writer.as_mut() else {
            return false;
        };

        let chunk = encode_chunk(payload);
        let sent = match writer.write_all(&chunk).await {
            Ok(()) => writer.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = sent {
            warn!("Audio upload failed, dropping remaining audio: {}", e);
            self.writer = None;
            return false;
        }
        true
    }

    /// Terminate the body with the zero-length chunk.
    ///
    /// The write half stays open: shutting it down can end the whole
    /// connection before the response arrives.
    pub async fn finish(&mut self) -> bool {
        self.send_chunk(&[]).await
    }
}
