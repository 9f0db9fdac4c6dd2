//! Background task that turns the response stream into listener callbacks.

use crate::defaults::READ_BUFFER_SIZE;
use crate::dispatcher::ResultDispatcher;
use crate::protocol::ResponseReader;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};

/// Read until the session reaches a terminal state or the stream ends.
///
/// The stream ends when the connection closes or the response body is
/// complete, whichever comes first. Returns the session's last result. A
/// read error is handled like the connection closing: whatever body arrived
/// becomes the error payload.
pub async fn run_response_worker<R>(
    mut stream: R,
    mut reader: ResponseReader,
    mut dispatcher: ResultDispatcher,
) -> Option<Value>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let n = match stream.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                warn!("Response read failed: {}", e);
                break;
            }
        };

        for message in reader.advance(&buf[..n]) {
            if dispatcher.dispatch(message).is_terminal() {
                debug!(state = ?dispatcher.state(), "Session ended");
                return dispatcher.into_result();
            }
        }

        // Keep-alive servers leave the socket open after the body ends
        if reader.is_finished() {
            debug!(status = ?reader.status(), "Response body complete");
            break;
        }
    }

    debug!(status = ?reader.status(), "Response stream ended");
    for message in reader.finish() {
        if dispatcher.dispatch(message).is_terminal() {
            return dispatcher.into_result();
        }
    }
    dispatcher.end_of_stream(reader.body());
    dispatcher.into_result()
}
