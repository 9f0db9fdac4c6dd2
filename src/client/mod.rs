//! Query clients and the per-session response worker.

pub mod streaming;
pub mod text;
pub mod worker;

pub use streaming::StreamingClient;
pub use text::TextClient;
pub use worker::run_response_worker;
