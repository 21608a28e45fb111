//! TCP connection manager.
//!
//! This module:
//! - Listens on any number of ports and accepts connections.
//! - Opens outbound connections to peers by port.
//! - Assigns each connection a `SessionId` and maps it to its peer port.
//! - Spawns per session:
//!   - a reader task pushing bytes onto the shared inbound queue,
//!   - a writer task draining the session's outbound queue,
//!   - a supervisor that joins both and unregisters the session.
//! - Runs a single dispatcher task that hands every inbound event to the
//!   registered `ByteHandler`, so all handling is serialized.
//!
//! Lifecycle: `start` -> `stop` -> `wait`. All three are idempotent.

mod session;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::TransportError;
use crate::ports::{Direction, PortSessionMap};
use crate::transport::{ByteHandler, Transport};
use crate::types::{
    signalled, InboundEvent, InboundRx, InboundTx, OutboundTx, Port, SessionId, SessionState,
};

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const STOPPED: u8 = 2;

/// Pause after a failed `accept` (e.g. out of file descriptors).
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Owns every session of one process role.
///
/// Cheap to clone; all clones share the same sessions and lifecycle.
#[derive(Clone)]
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

struct SessionHandle {
    outbound: OutboundTx,
    close: watch::Sender<bool>,
    state: SessionState,
    peer: SocketAddr,
}

struct Shared {
    config: Config,
    lifecycle: AtomicU8,
    shutdown: watch::Sender<bool>,
    inbound_tx: InboundTx,
    inbound_rx: Mutex<Option<InboundRx>>,
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
    ports: PortSessionMap,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    join_lock: tokio::sync::Mutex<()>,
    next_session: AtomicU64,
}

impl ConnectionManager {
    pub fn new(config: Config) -> Self {
        let (shutdown, _) = watch::channel(false);
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        ConnectionManager {
            shared: Arc::new(Shared {
                config,
                lifecycle: AtomicU8::new(IDLE),
                shutdown,
                inbound_tx,
                inbound_rx: Mutex::new(Some(inbound_rx)),
                sessions: RwLock::new(HashMap::new()),
                ports: PortSessionMap::new(),
                tasks: Mutex::new(Vec::new()),
                join_lock: tokio::sync::Mutex::new(()),
                next_session: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    /// Spawn the dispatcher feeding `handler`.
    ///
    /// Returns `false` if the manager was already started or stopped.
    /// Must be called from within a tokio runtime.
    pub fn start(&self, handler: Arc<dyn ByteHandler>) -> bool {
        if self
            .shared
            .lifecycle
            .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("connection manager already started");
            return false;
        }

        let Some(inbound_rx) = self.shared.inbound_rx.lock().take() else {
            return false;
        };

        let shutdown = self.shared.shutdown.subscribe();
        let handle = tokio::spawn(dispatch_loop(inbound_rx, handler, shutdown));
        self.shared.track(handle);
        true
    }

    pub fn is_running(&self) -> bool {
        self.shared.lifecycle.load(Ordering::Acquire) == RUNNING
    }

    /// Bind `port` and accept connections until the manager stops.
    ///
    /// Port 0 binds an ephemeral port; the bound address is returned.
    pub async fn listen(&self, port: Port) -> Result<SocketAddr, TransportError> {
        if self.shared.is_stopped() {
            return Err(TransportError::Stopped);
        }

        let addr = self.shared.config.socket_addr_string(port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local = listener
            .local_addr()
            .map_err(|source| TransportError::Bind { addr, source })?;

        info!(%local, "listening");
        let handle = tokio::spawn(accept_loop(self.shared.clone(), listener, local));
        self.shared.track(handle);
        Ok(local)
    }

    /// Open a session to `connect_host:port`.
    pub async fn connect(&self, port: Port) -> Result<SessionId, TransportError> {
        if self.shared.is_stopped() {
            return Err(TransportError::Stopped);
        }

        let host = self.shared.config.connect_host.clone();
        let stream = TcpStream::connect((host.as_str(), port))
            .await
            .map_err(|source| TransportError::Connect {
                host: host.clone(),
                port,
                source,
            })?;
        let peer = stream
            .peer_addr()
            .map_err(|source| TransportError::Connect { host, port, source })?;

        let session = self.shared.spawn_session(stream, peer, port, Direction::Initiated);
        info!(%session, %peer, "connected");
        Ok(session)
    }

    /// [`connect`](Self::connect), logging the failure instead of
    /// returning it.
    pub async fn connect_to(&self, port: Port) -> bool {
        match self.connect(port).await {
            Ok(_) => true,
            Err(e) => {
                warn!(port, error = %e, "connect failed");
                false
            }
        }
    }

    /// Try [`connect`](Self::connect) up to `attempts` times.
    pub async fn connect_with_retry(
        &self,
        port: Port,
        attempts: u32,
        delay: Duration,
    ) -> Result<SessionId, TransportError> {
        let attempts = attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.connect(port).await {
                Ok(session) => return Ok(session),
                Err(TransportError::Stopped) => return Err(TransportError::Stopped),
                Err(e) if attempt >= attempts => return Err(e),
                Err(e) => {
                    warn!(port, attempt, attempts, error = %e, "connect failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Queue `payload` for `session`.
    ///
    /// Returns `false` if the session is unknown or not active.
    pub fn send(&self, payload: Bytes, session: SessionId) -> bool {
        let sessions = self.shared.sessions.read();
        match sessions.get(&session) {
            Some(handle) if handle.state == SessionState::Active => {
                if handle.outbound.send(payload).is_ok() {
                    true
                } else {
                    warn!(%session, "writer gone; frame dropped");
                    false
                }
            }
            Some(handle) => {
                warn!(%session, state = ?handle.state, "session not active; frame dropped");
                false
            }
            None => {
                warn!(%session, "unknown session; frame dropped");
                false
            }
        }
    }

    /// Ask one session to drain and close.
    pub fn close_session(&self, session: SessionId) -> bool {
        self.shared.begin_drain(session)
    }

    /// Signal the dispatcher, the listeners and every session to stop.
    pub fn stop(&self) {
        let previous = self.shared.lifecycle.swap(STOPPED, Ordering::AcqRel);
        if previous == STOPPED {
            return;
        }

        info!("stopping connection manager");
        self.shared.shutdown.send_replace(true);

        let mut sessions = self.shared.sessions.write();
        for handle in sessions.values_mut() {
            handle.state = SessionState::Draining;
            handle.close.send_replace(true);
        }
    }

    /// Wait for `stop`, then join every task and clear the tables.
    pub async fn wait(&self) {
        let mut shutdown = self.shared.shutdown.subscribe();
        signalled(&mut shutdown).await;

        let _guard = self.shared.join_lock.lock().await;
        loop {
            let handles = std::mem::take(&mut *self.shared.tasks.lock());
            if handles.is_empty() {
                break;
            }
            for handle in handles {
                if let Err(e) = handle.await {
                    warn!(error = %e, "task ended abnormally");
                }
            }
        }

        self.shared.sessions.write().clear();
        self.shared.ports.clear();
        debug!("connection manager stopped");
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.shared.sessions.read().len()
    }

    /// Ids of the live sessions, ascending.
    pub fn sessions(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.shared.sessions.read().keys().copied().collect();
        ids.sort();
        ids
    }

    /// Lifecycle state of a session; `Closed` once it has been released.
    pub fn session_state(&self, session: SessionId) -> SessionState {
        self.shared
            .sessions
            .read()
            .get(&session)
            .map_or(SessionState::Closed, |handle| handle.state)
    }

    pub fn peer_addr(&self, session: SessionId) -> Option<SocketAddr> {
        self.shared.sessions.read().get(&session).map(|handle| handle.peer)
    }

    pub fn session_for_port(&self, port: Port) -> Option<SessionId> {
        self.shared.ports.session_for(port)
    }

    pub fn port_for_session(&self, session: SessionId) -> Option<Port> {
        self.shared.ports.port_for(session)
    }
}

impl Transport for ConnectionManager {
    fn send(&self, payload: Bytes, session: SessionId) -> bool {
        ConnectionManager::send(self, payload, session)
    }

    fn session_for_port(&self, port: Port) -> Option<SessionId> {
        ConnectionManager::session_for_port(self, port)
    }

    fn stop(&self) {
        ConnectionManager::stop(self)
    }
}

impl Shared {
    fn is_stopped(&self) -> bool {
        self.lifecycle.load(Ordering::Acquire) == STOPPED
    }

    fn track(&self, handle: JoinHandle<()>) {
        let mut tasks = self.tasks.lock();
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }

    /// Register a connected stream and spawn its tasks.
    fn spawn_session(
        self: &Arc<Self>,
        stream: TcpStream,
        peer: SocketAddr,
        port: Port,
        direction: Direction,
    ) -> SessionId {
        let id = SessionId(self.next_session.fetch_add(1, Ordering::Relaxed));
        if let Err(e) = stream.set_nodelay(true) {
            debug!(session = %id, error = %e, "set_nodelay failed");
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (close_tx, close_rx) = watch::channel(false);

        self.sessions.write().insert(
            id,
            SessionHandle {
                outbound: outbound_tx,
                close: close_tx,
                state: SessionState::Connecting,
                peer,
            },
        );
        if !self.ports.insert(port, id, direction) {
            warn!(session = %id, port, "port already owned by an initiated session; left unmapped");
        }

        let handle = tokio::spawn(session::run(self.clone(), id, stream, outbound_rx, close_rx));
        self.track(handle);

        self.set_state(id, SessionState::Active);

        // `stop` may have swept the table before this session was in it.
        if self.is_stopped() {
            self.begin_drain(id);
        }

        id
    }

    fn set_state(&self, session: SessionId, state: SessionState) {
        if let Some(handle) = self.sessions.write().get_mut(&session) {
            if handle.state == SessionState::Connecting {
                handle.state = state;
            }
        }
    }

    fn begin_drain(&self, session: SessionId) -> bool {
        match self.sessions.write().get_mut(&session) {
            Some(handle) => {
                handle.state = SessionState::Draining;
                handle.close.send_replace(true);
                true
            }
            None => false,
        }
    }

    fn unregister(&self, session: SessionId) {
        self.sessions.write().remove(&session);
        self.ports.remove_session(session);
    }
}

// -----------------------------------------------------------------------------
// Tasks
// -----------------------------------------------------------------------------

async fn dispatch_loop(
    mut inbound: InboundRx,
    handler: Arc<dyn ByteHandler>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = signalled(&mut shutdown) => break,
            event = inbound.recv() => event,
        };

        match event {
            Some(InboundEvent::Data { session, payload }) => handler.on_receive(payload, session),
            Some(InboundEvent::Closed { session }) => handler.on_session_closed(session),
            None => break,
        }
    }

    debug!("dispatcher stopped");
}

async fn accept_loop(shared: Arc<Shared>, listener: TcpListener, local: SocketAddr) {
    let mut shutdown = shared.shutdown.subscribe();

    loop {
        let accepted = tokio::select! {
            _ = signalled(&mut shutdown) => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, peer)) => {
                let current = shared.sessions.read().len();
                if current >= shared.config.max_sessions {
                    warn!(
                        %peer,
                        max_sessions = shared.config.max_sessions,
                        "rejecting connection: max_sessions reached"
                    );
                    // Dropping the stream closes it.
                    continue;
                }

                let session = shared.spawn_session(stream, peer, peer.port(), Direction::Accepted);
                info!(%session, %peer, %local, "accepted connection");
            }
            Err(e) => {
                warn!(%local, error = %e, "accept failed");
                tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
            }
        }
    }

    debug!(%local, "listener closed");
}
