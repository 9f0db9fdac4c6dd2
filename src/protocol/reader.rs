//! Resumable de-framer for the HTTP response stream.
//!
//! [`ResponseReader`] is fed raw socket bytes in whatever pieces the
//! transport delivers and returns every protocol message that became
//! complete. It never blocks and never touches the network, so any split of
//! the byte stream produces the same messages.
//!
//! Layers, outermost first:
//! 1. HTTP status line and headers (framing is taken from
//!    `Transfer-Encoding: chunked` or `Content-Length`)
//! 2. Chunked transfer framing (`<hex size>\r\n<payload>\r\n`, zero ends)
//! 3. Optional per-payload gzip
//! 4. Whitespace-separated JSON objects, which may span chunk boundaries

use crate::defaults::{GZIP_MAGIC, MAX_CHUNK_BYTES};
use crate::protocol::message::ProtocolMessage;
use flate2::read::MultiGzDecoder;
use serde_json::Value;
use std::io::Read;
use tracing::{debug, warn};

/// How the response body is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFraming {
    Chunked,
    ContentLength(usize),
    UntilClose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    Headers,
    Body(BodyFraming),
    Complete,
    Failed,
}

/// Incremental response parser.
#[derive(Debug)]
pub struct ResponseReader {
    decompress: bool,
    state: ReadState,
    /// Raw bytes not yet consumed by any layer.
    buffer: Vec<u8>,
    status: Option<u16>,
    headers: Vec<(String, String)>,
    chunked: bool,
    content_length: Option<usize>,
    /// Known size of the chunk body being waited for.
    chunk_size: Option<usize>,
    /// Decoded body bytes not yet parsed as JSON.
    pending: Vec<u8>,
    /// Every decoded body byte, kept for synthesized error payloads.
    body: String,
}

impl ResponseReader {
    /// `decompress` enables gzip detection on body payloads.
    pub fn new(decompress: bool) -> Self {
        Self {
            decompress,
            state: ReadState::Headers,
            buffer: Vec::new(),
            status: None,
            headers: Vec::new(),
            chunked: false,
            content_length: None,
            chunk_size: None,
            pending: Vec::new(),
            body: String::new(),
        }
    }

    /// Feed newly received bytes and collect the messages they complete.
    pub fn advance(&mut self, bytes: &[u8]) -> Vec<ProtocolMessage> {
        let mut out = Vec::new();
        if self.is_finished() {
            return out;
        }
        self.buffer.extend_from_slice(bytes);

        loop {
            match self.step(&mut out) {
                Ok(true) => continue,
                Ok(false) => break,
                Err(reason) => {
                    self.fail(&reason, &mut out);
                    break;
                }
            }
        }
        out
    }

    /// Signal that the connection closed and collect any final messages.
    ///
    /// Bodies framed by connection close are only parsed here. A chunked or
    /// fixed-length body that was cut short becomes a synthesized error.
    pub fn finish(&mut self) -> Vec<ProtocolMessage> {
        let mut out = Vec::new();
        let result = match self.state {
            ReadState::Complete | ReadState::Failed => return out,
            ReadState::Headers => {
                let leftover = std::mem::take(&mut self.buffer);
                self.body.push_str(&String::from_utf8_lossy(&leftover));
                Ok(())
            }
            ReadState::Body(BodyFraming::UntilClose) => {
                let payload = std::mem::take(&mut self.buffer);
                self.accept_payload(&payload, true, &mut out)
            }
            ReadState::Body(_) => {
                let leftover = std::mem::take(&mut self.buffer);
                self.body.push_str(&String::from_utf8_lossy(&leftover));
                Err(format!(
                    "connection closed mid-body with {} bytes unframed",
                    leftover.len()
                ))
            }
        };

        match result {
            Ok(()) => self.state = ReadState::Complete,
            Err(reason) => self.fail(&reason, &mut out),
        }
        out
    }

    /// True once the body ended or turned out malformed.
    pub fn is_finished(&self) -> bool {
        matches!(self.state, ReadState::Complete | ReadState::Failed)
    }

    /// True if a malformed body produced a synthesized error.
    pub fn is_failed(&self) -> bool {
        self.state == ReadState::Failed
    }

    pub fn headers_done(&self) -> bool {
        self.state != ReadState::Headers
    }

    /// HTTP status code, once the status line arrived.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Case-insensitive lookup of a response header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body framing, once the header block ended.
    pub fn framing(&self) -> Option<BodyFraming> {
        match self.state {
            ReadState::Body(framing) => Some(framing),
            _ if self.chunked => Some(BodyFraming::Chunked),
            _ => self.content_length.map(BodyFraming::ContentLength),
        }
    }

    /// Size of the chunk currently being waited for, if any.
    pub fn chunk_size(&self) -> Option<usize> {
        self.chunk_size
    }

    /// All decoded body text received so far.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// One unit of progress. `Ok(false)` means more bytes are needed.
    fn step(&mut self, out: &mut Vec<ProtocolMessage>) -> Result<bool, String> {
        match self.state {
            ReadState::Headers => self.read_header_line(),
            ReadState::Body(BodyFraming::Chunked) => self.read_chunk(out),
            ReadState::Body(BodyFraming::ContentLength(len)) => self.read_fixed(len, out),
            // Only the connection close delimits this body
            ReadState::Body(BodyFraming::UntilClose) => Ok(false),
            ReadState::Complete | ReadState::Failed => {
                self.buffer.clear();
                Ok(false)
            }
        }
    }

    fn read_header_line(&mut self) -> Result<bool, String> {
        let Some(line) = take_line(&mut self.buffer) else {
            return Ok(false);
        };

        if line.is_empty() {
            let framing = if self.chunked {
                BodyFraming::Chunked
            } else if let Some(len) = self.content_length {
                BodyFraming::ContentLength(len)
            } else {
                BodyFraming::UntilClose
            };
            debug!(status = ?self.status, ?framing, "Response headers received");
            self.state = ReadState::Body(framing);
            return Ok(true);
        }

        if self.status.is_none() && line.starts_with("HTTP/") {
            self.status = line
                .split_whitespace()
                .nth(1)
                .and_then(|code| code.parse().ok());
            return Ok(true);
        }

        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("transfer-encoding")
                && value.to_ascii_lowercase().contains("chunked")
            {
                self.chunked = true;
            } else if name.eq_ignore_ascii_case("content-length") {
                let len = value
                    .parse()
                    .map_err(|_| format!("invalid Content-Length: {value}"))?;
                self.content_length = Some(len);
            }
            self.headers.push((name.to_string(), value.to_string()));
        }
        Ok(true)
    }

    fn read_chunk(&mut self, out: &mut Vec<ProtocolMessage>) -> Result<bool, String> {
        let Some(size) = self.chunk_size else {
            let Some(line) = take_line(&mut self.buffer) else {
                return Ok(false);
            };
            let size_field = line.split(';').next().unwrap_or("").trim();
            if size_field.is_empty() {
                return Ok(true);
            }
            let size = usize::from_str_radix(size_field, 16).map_err(|_| {
                self.body.push_str(&line);
                format!("invalid chunk size line: {line:?}")
            })?;
            if size > MAX_CHUNK_BYTES {
                self.body.push_str(&line);
                return Err(format!("chunk size {size} exceeds {MAX_CHUNK_BYTES} bytes"));
            }
            if size == 0 {
                // Trailers after the terminal chunk are not interesting
                self.parse_pending(true, out)?;
                self.state = ReadState::Complete;
                return Ok(true);
            }
            self.chunk_size = Some(size);
            return Ok(true);
        };

        if self.buffer.len() < size + 2 {
            return Ok(false);
        }
        let payload: Vec<u8> = self.buffer.drain(..size).collect();
        self.buffer.drain(..2);
        self.chunk_size = None;
        self.accept_payload(&payload, false, out)?;
        Ok(true)
    }

    fn read_fixed(&mut self, len: usize, out: &mut Vec<ProtocolMessage>) -> Result<bool, String> {
        if self.buffer.len() < len {
            return Ok(false);
        }
        let payload: Vec<u8> = self.buffer.drain(..len).collect();
        self.accept_payload(&payload, true, out)?;
        self.state = ReadState::Complete;
        Ok(true)
    }

    /// Decode one body payload and parse whatever JSON it completes.
    fn accept_payload(
        &mut self,
        payload: &[u8],
        at_end: bool,
        out: &mut Vec<ProtocolMessage>,
    ) -> Result<(), String> {
        let decoded = if self.decompress && payload.starts_with(&GZIP_MAGIC) {
            let mut decoded = Vec::new();
            MultiGzDecoder::new(payload)
                .read_to_end(&mut decoded)
                .map_err(|e| {
                    self.body.push_str(&String::from_utf8_lossy(payload));
                    format!("gzip payload failed to decompress: {e}")
                })?;
            decoded
        } else {
            payload.to_vec()
        };

        self.body.push_str(&String::from_utf8_lossy(&decoded));
        self.pending.extend_from_slice(&decoded);
        self.parse_pending(at_end, out)
    }

    /// Parse every complete JSON value in `pending`.
    ///
    /// An incomplete trailing value is kept for the next payload unless
    /// `at_end`, in which case it is malformed.
    fn parse_pending(&mut self, at_end: bool, out: &mut Vec<ProtocolMessage>) -> Result<(), String> {
        let mut consumed = 0;
        let outcome = {
            let mut values = serde_json::Deserializer::from_slice(&self.pending).into_iter::<Value>();
            loop {
                match values.next() {
                    None => {
                        consumed = values.byte_offset();
                        break Ok(());
                    }
                    Some(Ok(value)) => {
                        consumed = values.byte_offset();
                        out.push(ProtocolMessage::classify(value));
                    }
                    Some(Err(e)) if e.is_eof() && !at_end => break Ok(()),
                    Some(Err(e)) => break Err(format!("malformed message: {e}")),
                }
            }
        };
        self.pending.drain(..consumed);
        outcome
    }

    fn fail(&mut self, reason: &str, out: &mut Vec<ProtocolMessage>) {
        warn!(reason, "Response stream is malformed");
        self.state = ReadState::Failed;
        self.buffer.clear();
        self.pending.clear();
        out.push(ProtocolMessage::synthetic_error(&self.body));
    }
}

/// Remove and return one line (without its `\r\n` or `\n`) from `buffer`.
fn take_line(buffer: &mut Vec<u8>) -> Option<String> {
    let newline = buffer.iter().position(|&b| b == b'\n')?;
    let mut line: Vec<u8> = buffer.drain(..=newline).collect();
    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Some(String::from_utf8_lossy(&line).into_owned())
}
