//! Connections and the chunked request upload.

pub mod chunked;
pub mod connector;

pub use chunked::{ConnectionReader, ConnectionWriter, StreamTransport, encode_chunk, request_head};
pub use connector::{Connection, Connector, ProxyConfig, TlsConnector, establish_tunnel};
