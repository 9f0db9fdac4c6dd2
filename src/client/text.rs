//! One-shot text queries.

use crate::auth::Credentials;
use crate::config::Config;
use crate::defaults::{HEADER_ACCEPT_ENCODING, READ_BUFFER_SIZE, TEXT_ENDPOINT};
use crate::error::{HoundError, Result};
use crate::protocol::ResponseReader;
use crate::request_info::RequestInfo;
use crate::transport::{Connector, StreamTransport, TlsConnector};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};
use url::Url;

/// Client for `GET /v1/text` queries.
pub struct TextClient {
    credentials: Credentials,
    request_info: RequestInfo,
    gzip: bool,
    connector: Arc<dyn Connector>,
}

impl TextClient {
    pub fn new(credentials: Credentials, connector: Arc<dyn Connector>) -> Self {
        let request_info = RequestInfo::new(credentials.client_id(), credentials.user_id());
        Self {
            credentials,
            request_info,
            gzip: true,
            connector,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let connector = TlsConnector::new(
            &config.server.hostname,
            config.server.port,
            config.server.proxy.clone(),
        )?;
        let mut client =
            Self::new(config.credentials()?, Arc::new(connector)).with_gzip(config.server.gzip);
        client.request_info.extend(config.request_info.clone());
        Ok(client)
    }

    pub fn with_gzip(mut self, gzip: bool) -> Self {
        self.gzip = gzip;
        self
    }

    pub fn request_info_mut(&mut self) -> &mut RequestInfo {
        &mut self.request_info
    }

    /// Run one query and return the server's JSON response.
    ///
    /// A body that is not JSON comes back as `{"Error": <body>}` rather than
    /// as an `Err`; only connection-level failures are errors.
    pub async fn query(&self, text: &str) -> Result<Value> {
        let mut headers = self.credentials.sign(&self.request_info)?;
        if self.gzip {
            headers.push(HEADER_ACCEPT_ENCODING, "gzip");
        }
        headers.push("Connection", "close");

        let target = query_target(self.connector.host(), text)?;
        let (_transport, mut stream) =
            StreamTransport::open(self.connector.as_ref(), "GET", &target, &headers).await?;
        info!(query = text, "Text query sent");

        let mut reader = ResponseReader::new(self.gzip);
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        let mut messages = Vec::new();

        while messages.is_empty() && !reader.is_finished() {
            match stream.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => messages.extend(reader.advance(&buf[..n])),
                Err(e) => {
                    warn!("Response read failed: {}", e);
                    break;
                }
            }
        }
        if messages.is_empty() {
            messages.extend(reader.finish());
        }
        debug!(status = ?reader.status(), "Text response received");

        let response = messages
            .into_iter()
            .find_map(|message| message.payload().cloned())
            .unwrap_or_else(|| json!({ "Error": reader.body() }));
        Ok(response)
    }
}

/// Path and percent-encoded query string for `text`.
fn query_target(host: &str, text: &str) -> Result<String> {
    let mut url =
        Url::parse(&format!("https://{host}{TEXT_ENDPOINT}")).map_err(|e| HoundError::Protocol {
            message: format!("Invalid query URL for host {}: {}", host, e),
        })?;
    url.query_pairs_mut().append_pair("query", text);
    Ok(url[url::Position::BeforePath..].to_string())
}
