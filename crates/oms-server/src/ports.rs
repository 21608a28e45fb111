//! Port <-> session mapping.
//!
//! Peers are addressed by port: an initiated session is keyed by the port
//! it connected to, an accepted session by the peer's source port. Both
//! directions live behind one lock so they never disagree.
//!
//! An initiated session owns its port: an accepted session whose source
//! port happens to collide never displaces it.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::types::{Port, SessionId};

/// Which side opened the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Initiated,
    Accepted,
}

#[derive(Debug, Default)]
struct Tables {
    by_port: HashMap<Port, (SessionId, Direction)>,
    by_session: HashMap<SessionId, Port>,
}

/// Bidirectional port / session table.
#[derive(Debug, Default)]
pub struct PortSessionMap {
    tables: RwLock<Tables>,
}

impl PortSessionMap {
    pub fn new() -> Self {
        PortSessionMap::default()
    }

    /// Map `port` to `session`, replacing any older session for that port
    /// unless an accepted session would displace an initiated one.
    ///
    /// Returns false when the mapping was refused.
    pub fn insert(&self, port: Port, session: SessionId, direction: Direction) -> bool {
        let mut tables = self.tables.write();
        if let Some(&(owner, Direction::Initiated)) = tables.by_port.get(&port) {
            if direction == Direction::Accepted && owner != session {
                return false;
            }
        }

        if let Some((previous, _)) = tables.by_port.insert(port, (session, direction)) {
            if previous != session {
                tables.by_session.remove(&previous);
            }
        }
        tables.by_session.insert(session, port);
        true
    }

    /// Forget a session; returns the port it was mapped to.
    ///
    /// A newer session that has since taken the same port is left alone.
    pub fn remove_session(&self, session: SessionId) -> Option<Port> {
        let mut tables = self.tables.write();
        let port = tables.by_session.remove(&session)?;
        if tables.by_port.get(&port).map(|(owner, _)| *owner) == Some(session) {
            tables.by_port.remove(&port);
        }
        Some(port)
    }

    pub fn session_for(&self, port: Port) -> Option<SessionId> {
        self.tables.read().by_port.get(&port).map(|(session, _)| *session)
    }

    pub fn port_for(&self, session: SessionId) -> Option<Port> {
        self.tables.read().by_session.get(&session).copied()
    }

    pub fn len(&self) -> usize {
        self.tables.read().by_session.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.read().by_session.is_empty()
    }

    pub fn clear(&self) {
        let mut tables = self.tables.write();
        tables.by_port.clear();
        tables.by_session.clear();
    }
}
