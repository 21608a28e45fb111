//! Per-session reader / writer tasks.

use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::Shared;
use crate::config::ReadErrorPolicy;
use crate::types::{signalled, InboundEvent, OutboundRx, SessionId};

/// Supervise one session until both halves are done, then release it.
pub(super) async fn run(
    shared: Arc<Shared>,
    id: SessionId,
    stream: TcpStream,
    outbound: OutboundRx,
    close: watch::Receiver<bool>,
) {
    let (read_half, write_half) = stream.into_split();

    let reader = tokio::spawn(read_loop(shared.clone(), id, read_half, close.clone()));
    let writer = tokio::spawn(write_loop(id, write_half, outbound, close));

    if let Err(e) = reader.await {
        warn!(session = %id, error = %e, "reader task failed");
    }

    // Reader is done (EOF, error or close request): flush and close.
    shared.begin_drain(id);
    if let Err(e) = writer.await {
        warn!(session = %id, error = %e, "writer task failed");
    }

    shared.unregister(id);
    let _ = shared.inbound_tx.send(InboundEvent::Closed { session: id });
    info!(session = %id, "session closed");
}

async fn read_loop(
    shared: Arc<Shared>,
    id: SessionId,
    mut reader: OwnedReadHalf,
    mut close: watch::Receiver<bool>,
) {
    let mut buf = vec![0u8; shared.config.read_buffer_size.max(1)];

    loop {
        let read = tokio::select! {
            _ = signalled(&mut close) => break,
            read = reader.read(&mut buf) => read,
        };

        match read {
            Ok(0) => {
                debug!(session = %id, "peer closed connection");
                break;
            }
            Ok(n) => {
                let event = InboundEvent::Data {
                    session: id,
                    payload: Bytes::copy_from_slice(&buf[..n]),
                };
                if shared.inbound_tx.send(event).is_err() {
                    debug!(session = %id, "dispatcher gone");
                    break;
                }
            }
            Err(e) => match shared.config.read_error_policy {
                ReadErrorPolicy::Disconnect => {
                    warn!(session = %id, error = %e, "read error; disconnecting");
                    break;
                }
                ReadErrorPolicy::Retry => {
                    warn!(session = %id, error = %e, "read error; retrying");
                    tokio::select! {
                        _ = signalled(&mut close) => break,
                        _ = tokio::time::sleep(shared.config.read_retry_backoff()) => {}
                    }
                }
            },
        }
    }
}

async fn write_loop(
    id: SessionId,
    mut writer: OwnedWriteHalf,
    mut outbound: OutboundRx,
    mut close: watch::Receiver<bool>,
) {
    let mut healthy = true;

    loop {
        let payload = tokio::select! {
            biased;
            payload = outbound.recv() => match payload {
                Some(payload) => payload,
                None => break,
            },
            _ = signalled(&mut close) => break,
        };

        if !write_frame(id, &mut writer, &payload).await {
            healthy = false;
            break;
        }
    }

    // Draining: whatever was queued before the close request still goes out.
    if healthy {
        while let Ok(payload) = outbound.try_recv() {
            if !write_frame(id, &mut writer, &payload).await {
                break;
            }
        }
    }

    if let Err(e) = writer.shutdown().await {
        debug!(session = %id, error = %e, "shutdown of write half failed");
    }
}

/// Write one frame; errors are logged and the frame is not retried.
async fn write_frame(id: SessionId, writer: &mut OwnedWriteHalf, payload: &[u8]) -> bool {
    match writer.write_all(payload).await {
        Ok(()) => true,
        Err(e) => {
            warn!(session = %id, error = %e, "write failed; frame dropped");
            false
        }
    }
}
