// crates/oms-server/tests/connection_manager.rs
mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use common::{eventually, local_config};
use oms_server::types::InboundEvent;
use oms_server::{ByteHandler, Config, ConnectionManager, SessionId, SessionState};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;

const BOUND: Duration = Duration::from_secs(5);

struct Collector {
    events: mpsc::UnboundedSender<InboundEvent>,
}

impl ByteHandler for Collector {
    fn on_receive(&self, payload: Bytes, session: SessionId) {
        let _ = self.events.send(InboundEvent::Data { session, payload });
    }

    fn on_session_closed(&self, session: SessionId) {
        let _ = self.events.send(InboundEvent::Closed { session });
    }
}

async fn started(config: Config) -> (ConnectionManager, mpsc::UnboundedReceiver<InboundEvent>, SocketAddr) {
    let (tx, rx) = mpsc::unbounded_channel();
    let manager = ConnectionManager::new(config);
    assert!(manager.start(Arc::new(Collector { events: tx })));
    let addr = manager.listen(0).await.unwrap();
    (manager, rx, addr)
}

async fn only_session(manager: &ConnectionManager) -> SessionId {
    assert!(eventually(BOUND, || manager.session_count() == 1).await);
    manager.sessions()[0]
}

async fn shut_down(manager: &ConnectionManager) {
    manager.stop();
    timeout(BOUND, manager.wait()).await.expect("wait() did not return");
}

#[tokio::test]
async fn inbound_bytes_reach_the_handler_in_order() {
    let (manager, mut events, addr) = started(local_config()).await;
    let mut peer = TcpStream::connect(addr).await.unwrap();

    peer.write_all(b"first;").await.unwrap();
    peer.write_all(b"second;").await.unwrap();

    let mut received = Vec::new();
    while received.len() < b"first;second;".len() {
        match timeout(BOUND, events.recv()).await.unwrap().unwrap() {
            InboundEvent::Data { payload, .. } => received.extend_from_slice(&payload),
            other => panic!("unexpected event {other:?}"),
        }
    }
    assert_eq!(received, b"first;second;");

    shut_down(&manager).await;
}

#[tokio::test]
async fn peer_disconnect_tears_the_session_down() {
    let (manager, mut events, addr) = started(local_config()).await;
    let peer = TcpStream::connect(addr).await.unwrap();
    let peer_port = peer.local_addr().unwrap().port();

    let session = only_session(&manager).await;
    assert_eq!(manager.session_state(session), SessionState::Active);
    assert_eq!(manager.session_for_port(peer_port), Some(session));
    assert_eq!(manager.port_for_session(session), Some(peer_port));

    drop(peer);

    assert!(eventually(BOUND, || manager.session_count() == 0).await);
    assert_eq!(manager.session_state(session), SessionState::Closed);
    assert_eq!(manager.session_for_port(peer_port), None);
    assert_eq!(
        timeout(BOUND, events.recv()).await.unwrap(),
        Some(InboundEvent::Closed { session })
    );

    shut_down(&manager).await;
}

#[tokio::test]
async fn send_to_unknown_session_is_a_no_op() {
    let (manager, _events, _) = started(local_config()).await;

    assert!(!manager.send(Bytes::from_static(b"35=D;"), SessionId(999)));

    shut_down(&manager).await;
}

#[tokio::test]
async fn outbound_frames_are_written_in_order() {
    let (manager, _events, addr) = started(local_config()).await;
    let mut peer = TcpStream::connect(addr).await.unwrap();
    let session = only_session(&manager).await;

    for frame in ["a;", "b;", "c;"] {
        assert!(manager.send(Bytes::from(frame), session));
    }

    let mut buf = [0u8; 6];
    timeout(BOUND, peer.read_exact(&mut buf)).await.unwrap().unwrap();
    assert_eq!(&buf, b"a;b;c;");

    shut_down(&manager).await;
}

#[tokio::test]
async fn stop_flushes_queued_output_before_closing() {
    let (manager, _events, addr) = started(local_config()).await;
    let mut peer = TcpStream::connect(addr).await.unwrap();
    let session = only_session(&manager).await;

    let frame = Bytes::from(vec![b'x'; 1024]);
    for _ in 0..64 {
        assert!(manager.send(frame.clone(), session));
    }
    manager.stop();

    let mut received = Vec::new();
    timeout(BOUND, peer.read_to_end(&mut received)).await.unwrap().unwrap();
    assert_eq!(received.len(), 64 * 1024);

    timeout(BOUND, manager.wait()).await.unwrap();
    assert_eq!(manager.session_count(), 0);
}

#[tokio::test]
async fn stop_does_not_wait_for_silent_peers() {
    let (manager, _events, addr) = started(local_config()).await;
    // Connected but never sends nor closes.
    let _idle = TcpStream::connect(addr).await.unwrap();
    only_session(&manager).await;

    shut_down(&manager).await;

    assert_eq!(manager.session_count(), 0);
    assert!(manager.sessions().is_empty());
}

#[tokio::test]
async fn close_session_closes_only_that_session() {
    let (manager, _events, addr) = started(local_config()).await;
    let mut first = TcpStream::connect(addr).await.unwrap();
    assert!(eventually(BOUND, || manager.session_count() == 1).await);
    let _second = TcpStream::connect(addr).await.unwrap();
    assert!(eventually(BOUND, || manager.session_count() == 2).await);

    let target = manager.sessions()[0];
    assert!(manager.close_session(target));

    let mut buf = [0u8; 1];
    let n = timeout(BOUND, first.read(&mut buf)).await.unwrap().unwrap();
    assert_eq!(n, 0);
    assert!(eventually(BOUND, || manager.session_count() == 1).await);

    shut_down(&manager).await;
}

#[tokio::test]
async fn connections_beyond_the_limit_are_refused() {
    let config = Config {
        max_sessions: 1,
        ..local_config()
    };
    let (manager, _events, addr) = started(config).await;

    let _first = TcpStream::connect(addr).await.unwrap();
    only_session(&manager).await;

    let mut second = TcpStream::connect(addr).await.unwrap();
    let mut buf = [0u8; 1];
    let read = timeout(BOUND, second.read(&mut buf)).await.unwrap();
    // Refused connections are dropped: EOF or reset.
    assert!(matches!(read, Ok(0) | Err(_)));
    assert_eq!(manager.session_count(), 1);

    shut_down(&manager).await;
}

#[tokio::test]
async fn outbound_sessions_are_keyed_by_target_port() {
    let (server, mut server_events, addr) = started(local_config()).await;

    let (tx, _rx) = mpsc::unbounded_channel();
    let client = ConnectionManager::new(local_config());
    client.start(Arc::new(Collector { events: tx }));

    let session = client.connect(addr.port()).await.unwrap();
    assert_eq!(client.session_for_port(addr.port()), Some(session));
    assert_eq!(client.session_state(session), SessionState::Active);

    assert!(client.send(Bytes::from_static(b"hello;"), session));
    match timeout(BOUND, server_events.recv()).await.unwrap().unwrap() {
        InboundEvent::Data { payload, .. } => assert_eq!(&payload[..], b"hello;"),
        other => panic!("unexpected event {other:?}"),
    }

    shut_down(&client).await;
    shut_down(&server).await;
}

#[tokio::test]
async fn connect_to_a_closed_port_fails_cleanly() {
    // Grab a free port, then release it.
    let port = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };

    let manager = ConnectionManager::new(local_config());
    assert!(!manager.connect_to(port).await);
    assert!(manager
        .connect_with_retry(port, 2, Duration::from_millis(10))
        .await
        .is_err());
    assert_eq!(manager.session_count(), 0);

    shut_down(&manager).await;
}

#[tokio::test]
async fn lifecycle_calls_are_idempotent() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let manager = ConnectionManager::new(local_config());
    let handler: Arc<dyn ByteHandler> = Arc::new(Collector { events: tx });

    assert!(manager.start(handler.clone()));
    assert!(!manager.start(handler));
    assert!(manager.is_running());

    manager.stop();
    manager.stop();
    timeout(BOUND, manager.wait()).await.unwrap();
    timeout(BOUND, manager.wait()).await.unwrap();

    assert!(!manager.is_running());
    assert!(manager.listen(0).await.is_err());
}
