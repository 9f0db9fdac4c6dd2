//! In-process fake Houndify server reachable through a duplex connector.

#![allow(dead_code)]

use houndify::transport::{Connection, Connector, encode_chunk};
use houndify::{Credentials, HoundError, Result, StreamingClient};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex};
use tokio::sync::mpsc;

pub const FAKE_HOST: &str = "fake.houndify.test";

/// Connector whose connections terminate in the test body.
pub struct DuplexConnector {
    servers: mpsc::UnboundedSender<DuplexStream>,
}

#[async_trait::async_trait]
impl Connector for DuplexConnector {
    async fn connect(&self) -> Result<Box<dyn Connection>> {
        let (client, server) = duplex(64 * 1024);
        self.servers
            .send(server)
            .map_err(|_| HoundError::Connection {
                message: "fake server is gone".to_string(),
            })?;
        Ok(Box::new(client))
    }

    fn host(&self) -> &str {
        FAKE_HOST
    }
}

/// Connector plus the receiving end for accepted server streams.
pub fn fake_server() -> (Arc<DuplexConnector>, mpsc::UnboundedReceiver<DuplexStream>) {
    let (servers, accepted) = mpsc::unbounded_channel();
    (Arc::new(DuplexConnector { servers }), accepted)
}

pub fn credentials() -> Credentials {
    // "secret-key" in URL-safe base64
    Credentials::new("test-client", "c2VjcmV0LWtleQ==", "test-user").unwrap()
}

/// Parsed request line and headers.
#[derive(Debug)]
pub struct RequestHead {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
}

impl RequestHead {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn request_info(&self) -> Value {
        serde_json::from_str(self.header("Hound-Request-Info").unwrap()).unwrap()
    }
}

async fn read_line(stream: &mut DuplexStream) -> String {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    while !line.ends_with(b"\r\n") {
        stream.read_exact(&mut byte).await.unwrap();
        line.push(byte[0]);
    }
    line.truncate(line.len() - 2);
    String::from_utf8(line).unwrap()
}

pub async fn read_head(stream: &mut DuplexStream) -> RequestHead {
    let request_line = read_line(stream).await;
    let mut headers = Vec::new();
    loop {
        let line = read_line(stream).await;
        if line.is_empty() {
            break;
        }
        let (name, value) = line.split_once(':').unwrap();
        headers.push((name.trim().to_string(), value.trim().to_string()));
    }
    RequestHead {
        request_line,
        headers,
    }
}

/// Read one upload chunk; an empty vec is the terminal chunk.
pub async fn read_chunk(stream: &mut DuplexStream) -> Vec<u8> {
    let size_line = read_line(stream).await;
    let size = usize::from_str_radix(&size_line, 16).unwrap();
    let mut payload = vec![0u8; size];
    stream.read_exact(&mut payload).await.unwrap();
    let mut crlf = [0u8; 2];
    stream.read_exact(&mut crlf).await.unwrap();
    assert_eq!(&crlf, b"\r\n");
    payload
}

/// Read chunks up to and including the terminal one; returns the others.
pub async fn read_until_terminal(stream: &mut DuplexStream) -> Vec<Vec<u8>> {
    let mut chunks = Vec::new();
    loop {
        let chunk = read_chunk(stream).await;
        if chunk.is_empty() {
            return chunks;
        }
        chunks.push(chunk);
    }
}

pub const CHUNKED_HEAD: &[u8] = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n";

/// One JSON message as a response chunk.
pub fn message_chunk(message: &Value) -> Vec<u8> {
    encode_chunk(format!("{}\r\n", message).as_bytes())
}

pub async fn send(stream: &mut DuplexStream, bytes: &[u8]) {
    stream.write_all(bytes).await.unwrap();
    stream.flush().await.unwrap();
}

/// Wait for `condition`, failing the test after two seconds.
pub async fn eventually<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

/// Poll `fill()` with no audio until the server has asked to stop.
pub async fn wait_for_stop(client: &mut StreamingClient) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !client.fill(&[]).await.unwrap() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}
