// crates/oms-server/tests/common/mod.rs
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use oms_protocol::{decode, WireMessage};
use oms_server::{Port, SessionId, Transport};
use parking_lot::Mutex;

/// In-memory transport that records every frame it is asked to send.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(SessionId, WireMessage)>>,
    ports: HashMap<Port, SessionId>,
    stopped: AtomicBool,
}

impl RecordingTransport {
    pub fn with_ports(ports: &[(Port, SessionId)]) -> Self {
        RecordingTransport {
            ports: ports.iter().copied().collect(),
            ..Default::default()
        }
    }

    /// Everything sent so far, in order.
    pub fn take(&self) -> Vec<(SessionId, WireMessage)> {
        std::mem::take(&mut *self.sent.lock())
    }

    pub fn stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl Transport for RecordingTransport {
    fn send(&self, payload: Bytes, session: SessionId) -> bool {
        let message = decode(&payload).expect("endpoint sent an undecodable frame");
        self.sent.lock().push((session, message));
        true
    }

    fn session_for_port(&self, port: Port) -> Option<SessionId> {
        self.ports.get(&port).copied()
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// Poll `check` until it holds or `within` elapses.
pub async fn eventually<F: FnMut() -> bool>(within: Duration, mut check: F) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Config for tests: loopback only, short connect retries.
pub fn local_config() -> oms_server::Config {
    oms_server::Config {
        bind_addr: "127.0.0.1".to_string(),
        connect_attempts: 3,
        connect_retry_ms: 50,
        ..Default::default()
    }
}
