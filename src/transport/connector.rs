//! Opening the full-duplex byte stream to the server.

use crate::defaults::MAX_PROXY_REPLY_BYTES;
use crate::error::{HoundError, Result};
use rustls::pki_types::ServerName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

/// A bidirectional byte stream: uploads go out, responses come back.
pub trait Connection: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> Connection for T {}

/// Opens connections to the query server.
///
/// Implemented by [`TlsConnector`] for real traffic and by in-memory
/// connectors in tests.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Connection>>;

    /// Value for the `Host` request header.
    fn host(&self) -> &str;
}

/// HTTP proxy used to tunnel the TLS connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    /// Extra headers sent with the CONNECT request (e.g. Proxy-Authorization).
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// TLS over TCP, optionally tunneled through an HTTP proxy.
pub struct TlsConnector {
    hostname: String,
    port: u16,
    proxy: Option<ProxyConfig>,
    tls: tokio_rustls::TlsConnector,
}

impl TlsConnector {
    pub fn new(hostname: &str, port: u16, proxy: Option<ProxyConfig>) -> Result<Self> {
        let roots = rustls::RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        let config = rustls::ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()
        .map_err(|e| HoundError::Tls {
            message: format!("Failed to configure TLS: {}", e),
        })?
        .with_root_certificates(roots)
        .with_no_client_auth();

        Ok(Self {
            hostname: hostname.to_string(),
            port,
            proxy,
            tls: tokio_rustls::TlsConnector::from(Arc::new(config)),
        })
    }

    async fn open_tcp(&self) -> Result<TcpStream> {
        let Some(proxy) = &self.proxy else {
            return TcpStream::connect((self.hostname.as_str(), self.port))
                .await
                .map_err(|e| HoundError::Connection {
                    message: format!("Failed to connect to {}:{}: {}", self.hostname, self.port, e),
                });
        };

        let mut stream = TcpStream::connect((proxy.host.as_str(), proxy.port))
            .await
            .map_err(|e| HoundError::Connection {
                message: format!("Failed to connect to proxy {}:{}: {}", proxy.host, proxy.port, e),
            })?;
        establish_tunnel(&mut stream, &self.hostname, self.port, &proxy.headers).await?;
        debug!(proxy = %proxy.host, "Proxy tunnel established");
        Ok(stream)
    }
}

#[async_trait::async_trait]
impl Connector for TlsConnector {
    async fn connect(&self) -> Result<Box<dyn Connection>> {
        let tcp = self.open_tcp().await?;
        tcp.set_nodelay(true)?;

        let server_name =
            ServerName::try_from(self.hostname.clone()).map_err(|e| HoundError::Tls {
                message: format!("Invalid server name {}: {}", self.hostname, e),
            })?;
        let stream = self
            .tls
            .connect(server_name, tcp)
            .await
            .map_err(|e| HoundError::Tls {
                message: format!("Handshake with {} failed: {}", self.hostname, e),
            })?;

        info!(host = %self.hostname, port = self.port, "Connected");
        Ok(Box::new(stream))
    }

    fn host(&self) -> &str {
        &self.hostname
    }
}

/// Ask an HTTP proxy to open a tunnel to `host:port`.
///
/// Reads the proxy's reply header block and fails unless the status is 2xx.
pub async fn establish_tunnel<S>(
    stream: &mut S,
    host: &str,
    port: u16,
    headers: &BTreeMap<String, String>,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut request = format!("CONNECT {host}:{port} HTTP/1.0\r\n");
    if !headers.keys().any(|name| name.eq_ignore_ascii_case("host")) {
        request.push_str(&format!("Host: {host}:{port}\r\n"));
    }
    for (name, value) in headers {
        request.push_str(&format!("{name}: {value}\r\n"));
    }
    request.push_str("\r\n");

    stream.write_all(request.as_bytes()).await?;
    stream.flush().await?;

    // Byte-at-a-time so nothing past the reply is consumed
    let mut reply = Vec::new();
    let mut byte = [0u8; 1];
    while !reply.ends_with(b"\r\n\r\n") {
        if reply.len() >= MAX_PROXY_REPLY_BYTES {
            return Err(HoundError::ProxyTunnel {
                message: "reply header too large".to_string(),
            });
        }
        if stream.read(&mut byte).await? == 0 {
            return Err(HoundError::ProxyTunnel {
                message: "proxy closed the connection".to_string(),
            });
        }
        reply.push(byte[0]);
    }

    let reply = String::from_utf8_lossy(&reply);
    let status_line = reply.lines().next().unwrap_or_default();
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse::<u16>().ok());

    match status {
        Some(code) if (200..300).contains(&code) => Ok(()),
        _ => Err(HoundError::ProxyTunnel {
            message: status_line.to_string(),
        }),
    }
}
