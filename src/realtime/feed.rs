//! Stream-based change feed.
//!
//! Reads newline-delimited JSON change events from an async byte stream
//! (typically a TCP connection) on a background task.

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{EdgeChange, Subscription};

/// Spawn a task reading change events from `reader`.
///
/// Lines that do not parse are skipped and remembered as the last error.
/// The returned [`Subscription`] stops the task when dropped.
pub fn subscribe_stream<R>(reader: R, description: &str, runtime: &Handle) -> Subscription
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let last_error = Arc::new(Mutex::new(None));
    let error_handle = last_error.clone();

    let task = runtime.spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut line = String::new();

        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => {
                    info!("change feed closed");
                    set_error(&error_handle, "Connection closed".to_string());
                    break;
                }
                Ok(_) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<EdgeChange>(trimmed) {
                        Ok(change) => {
                            debug!(table = %change.table, event = %change.event_type, "change received");
                            if tx.send(change).is_err() {
                                // Subscriber dropped
                                break;
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "unparseable change event");
                            set_error(&error_handle, format!("Parse error: {}", e));
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "change feed read failed");
                    set_error(&error_handle, format!("Read error: {}", e));
                    break;
                }
            }
        }
    });

    Subscription::new(rx, &format!("stream: {}", description), Some(task), last_error)
}

/// Connect to a change feed over TCP and subscribe to it.
pub async fn subscribe_tcp(addr: &str) -> std::io::Result<Subscription> {
    let stream = TcpStream::connect(addr).await?;
    info!(%addr, "connected to change feed");
    Ok(subscribe_stream(stream, addr, &Handle::current()))
}

fn set_error(slot: &Mutex<Option<String>>, message: String) {
    if let Ok(mut guard) = slot.lock() {
        *guard = Some(message);
    }
}
