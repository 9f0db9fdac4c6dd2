//! Streaming voice queries: `start()`, `fill()` repeatedly, then `finish()`.

use super::worker::run_response_worker;
use crate::audio::codec::{AudioCodec, PcmCodec, SampleRate};
use crate::audio::framer::AudioFramer;
use crate::auth::Credentials;
use crate::config::Config;
use crate::defaults::{HEADER_ACCEPT_ENCODING, INFO_PARTIAL_TRANSCRIPTS, VOICE_ENDPOINT};
use crate::dispatcher::{AudioFinished, ResultDispatcher};
use crate::error::{HoundError, Result};
use crate::listener::HoundListener;
use crate::protocol::ResponseReader;
use crate::request_info::RequestInfo;
use crate::transport::{ConnectionWriter, Connector, StreamTransport, TlsConnector};
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// State for one `start()`/`finish()` pair.
struct StreamSession {
    transport: StreamTransport<ConnectionWriter>,
    framer: AudioFramer,
    audio_finished: AudioFinished,
    worker: JoinHandle<Option<Value>>,
    frames_sent: usize,
}

/// Client for streaming 16-bit little-endian PCM to the voice endpoint.
///
/// Only one session runs at a time; `finish()` must return before the next
/// `start()`.
pub struct StreamingClient {
    credentials: Credentials,
    request_info: RequestInfo,
    sample_rate: SampleRate,
    enable_vad: bool,
    gzip: bool,
    codec: Arc<dyn AudioCodec>,
    connector: Arc<dyn Connector>,
    session: Option<StreamSession>,
}

impl StreamingClient {
    pub fn new(credentials: Credentials, connector: Arc<dyn Connector>) -> Self {
        let mut request_info = RequestInfo::new(credentials.client_id(), credentials.user_id());
        request_info.set(INFO_PARTIAL_TRANSCRIPTS, true);

        Self {
            credentials,
            request_info,
            sample_rate: SampleRate::default(),
            enable_vad: true,
            gzip: true,
            codec: Arc::new(PcmCodec),
            connector,
            session: None,
        }
    }

    /// Build a client from validated configuration, connecting over TLS.
    pub fn from_config(config: &Config) -> Result<Self> {
        let connector = TlsConnector::new(
            &config.server.hostname,
            config.server.port,
            config.server.proxy.clone(),
        )?;
        let mut client = Self::new(config.credentials()?, Arc::new(connector))
            .with_sample_rate(config.sample_rate()?)
            .with_codec(config.codec()?)
            .with_vad(config.audio.enable_vad)
            .with_gzip(config.server.gzip);
        client.request_info.extend(config.request_info.clone());
        Ok(client)
    }

    pub fn with_codec(mut self, codec: Arc<dyn AudioCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: SampleRate) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_vad(mut self, enable_vad: bool) -> Self {
        self.enable_vad = enable_vad;
        self
    }

    pub fn with_gzip(mut self, gzip: bool) -> Self {
        self.gzip = gzip;
        self
    }

    /// Change the sample rate used by the next session.
    ///
    /// # Errors
    /// `HoundError::UnsupportedSampleRate` for anything but 8000 or 16000.
    pub fn set_sample_rate(&mut self, hz: u32) -> Result<()> {
        self.sample_rate = SampleRate::try_from(hz)?;
        Ok(())
    }

    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    /// Request info sent with the next `start()`.
    pub fn request_info_mut(&mut self) -> &mut RequestInfo {
        &mut self.request_info
    }

    pub fn request_info(&self) -> &RequestInfo {
        &self.request_info
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Connect, send the signed request head and the audio header, and
    /// start the response worker.
    ///
    /// Listener callbacks run on the worker task.
    pub async fn start<L: HoundListener>(&mut self, listener: L) -> Result<()> {
        if self.session.is_some() {
            return Err(HoundError::SessionActive);
        }

        let mut headers = self.credentials.sign(&self.request_info)?;
        headers.push("Transfer-Encoding", "chunked");
        if self.gzip {
            headers.push(HEADER_ACCEPT_ENCODING, "gzip");
        }

        let (mut transport, reader) =
            StreamTransport::open(self.connector.as_ref(), "POST", VOICE_ENDPOINT, &headers)
                .await?;

        let audio_finished = AudioFinished::new();
        let dispatcher = ResultDispatcher::new(Box::new(listener), audio_finished.clone());
        let worker = tokio::spawn(run_response_worker(
            reader,
            ResponseReader::new(self.gzip),
            dispatcher,
        ));

        let framer = AudioFramer::new(self.codec.clone(), self.sample_rate);
        transport.send_chunk(&framer.header()).await;

        info!(
            sample_rate = self.sample_rate.hz(),
            codec = self.codec.name(),
            "Voice query started"
        );
        self.session = Some(StreamSession {
            transport,
            framer,
            audio_finished,
            worker,
            frames_sent: 0,
        });
        Ok(())
    }

    /// Upload raw PCM. Returns `true` once the server has heard enough
    /// (only when VAD is enabled); the data is then not sent.
    pub async fn fill(&mut self, data: &[u8]) -> Result<bool> {
        let enable_vad = self.enable_vad;
        let session = self.session.as_mut().ok_or(HoundError::NoActiveSession)?;

        if enable_vad && session.audio_finished.get() {
            return Ok(true);
        }

        for frame in session.framer.push(data) {
            if session.transport.send_chunk(&frame).await {
                session.frames_sent += 1;
            }
        }
        Ok(false)
    }

    /// Flush buffered audio, end the upload, and wait for the result.
    ///
    /// Returns the final response or error object, whichever ended the
    /// session.
    pub async fn finish(&mut self) -> Result<Option<Value>> {
        let mut session = self.session.take().ok_or(HoundError::NoActiveSession)?;

        if let Some(frame) = session.framer.flush()
            && session.transport.send_chunk(&frame).await
        {
            session.frames_sent += 1;
        }
        session.transport.finish().await;
        debug!(frames = session.frames_sent, "Audio upload complete");

        let result = session.worker.await.map_err(|e| HoundError::Worker {
            message: e.to_string(),
        })?;
        info!(has_result = result.is_some(), "Voice query finished");
        Ok(result)
    }
}

impl std::fmt::Debug for StreamingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingClient")
            .field("credentials", &self.credentials)
            .field("host", &self.connector.host())
            .field("sample_rate", &self.sample_rate)
            .field("enable_vad", &self.enable_vad)
            .field("gzip", &self.gzip)
            .field("codec", &self.codec.name())
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Connection;

    struct Unreachable;

    #[async_trait::async_trait]
    impl Connector for Unreachable {
        async fn connect(&self) -> Result<Box<dyn Connection>> {
            Err(HoundError::Connection {
                message: "offline".to_string(),
            })
        }

        fn host(&self) -> &str {
            "offline.test"
        }
    }

    fn client() -> StreamingClient {
        let credentials = Credentials::from_raw_key("client", b"key".to_vec(), "user");
        StreamingClient::new(credentials, Arc::new(Unreachable))
    }

    #[test]
    fn new_client_requests_partial_transcripts() {
        let client = client();
        let info = client.request_info();

        assert_eq!(info.get(INFO_PARTIAL_TRANSCRIPTS), Some(&Value::Bool(true)));
        assert_eq!(info.get_string("ClientID").as_deref(), Some("client"));
        assert_eq!(info.get_string("UserID").as_deref(), Some("user"));
        assert_eq!(client.sample_rate(), SampleRate::Hz16000);
    }

    #[test]
    fn unsupported_sample_rate_rejected_before_connecting() {
        let mut client = client();

        let err = client.set_sample_rate(44100).unwrap_err();

        assert!(matches!(err, HoundError::UnsupportedSampleRate { rate: 44100 }));
        assert_eq!(client.sample_rate(), SampleRate::Hz16000);

        client.set_sample_rate(8000).unwrap();
        assert_eq!(client.sample_rate(), SampleRate::Hz8000);
    }

    #[tokio::test]
    async fn fill_and_finish_require_a_session() {
        let mut client = client();

        assert!(matches!(
            client.fill(&[0u8; 640]).await,
            Err(HoundError::NoActiveSession)
        ));
        assert!(matches!(
            client.finish().await,
            Err(HoundError::NoActiveSession)
        ));
    }

    #[tokio::test]
    async fn connection_failure_surfaces_from_start() {
        let mut client = client();

        let err = client.start(crate::listener::NoopListener).await.unwrap_err();

        assert!(matches!(err, HoundError::Connection { .. }));
        assert!(!client.is_active());
    }

    #[test]
    fn from_config_merges_request_info_overrides() {
        let mut config = Config::default();
        config.credentials.client_id = "cid".to_string();
        config.credentials.client_key = "a2V5".to_string();
        config.credentials.user_id = "uid".to_string();
        config.audio.sample_rate = 8000;
        config
            .request_info
            .insert("InputLanguageIETFTag".to_string(), Value::from("fr-FR"));

        let client = StreamingClient::from_config(&config).unwrap();

        assert_eq!(client.sample_rate(), SampleRate::Hz8000);
        assert_eq!(
            client.request_info().get_string("InputLanguageIETFTag").as_deref(),
            Some("fr-FR")
        );
        assert_eq!(client.request_info().get_string("ClientID").as_deref(), Some("cid"));
    }
}
