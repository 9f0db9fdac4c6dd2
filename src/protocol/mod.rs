//! Voice-query response protocol: message shapes and the stream de-framer.

pub mod message;
pub mod reader;

pub use message::ProtocolMessage;
pub use reader::{BodyFraming, ResponseReader};
