//! FIX protocol endpoint.
//!
//! Sits between a [`Transport`] and the business handlers:
//! - inbound: per-session framing, decoding, optional checksum
//!   verification, then dispatch on MsgType (35),
//! - outbound: SendingTime (52) and SenderSubID (50) stamping, encoding,
//!   hand-off to the transport,
//! - admin: `35=QR` requests carrying AdminCommand (10001) are routed to a
//!   second table of named commands; responses carry AdminResponse (10002).
//!
//! Handlers are registered on a [`FixEndpointBuilder`]; once built, the
//! tables are immutable.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use bytes::Bytes;
use oms_protocol::frame::FrameDecoder;
use oms_protocol::orders::sanitize;
use oms_protocol::tags::{self, msg_type};
use oms_protocol::{codec, timestamp, WireMessage};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::connection::ConnectionManager;
use crate::transport::{ByteHandler, Transport};
use crate::types::{Port, SessionId};

/// Handler for one message type.
pub type MessageHandler<T> = Box<dyn Fn(&FixEndpoint<T>, WireMessage, SessionId) + Send + Sync>;

/// Handler for one admin command.
pub type AdminHandler<T> = Box<dyn Fn(&FixEndpoint<T>, SessionId) + Send + Sync>;

/// Protocol-level settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSettings {
    pub sender_id: Option<String>,
    pub verify_checksums: bool,
    pub max_frame_len: usize,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        EndpointSettings {
            sender_id: None,
            verify_checksums: false,
            max_frame_len: oms_protocol::frame::DEFAULT_MAX_FRAME_LEN,
        }
    }
}

/// Collects handlers before the endpoint goes live.
pub struct FixEndpointBuilder<T: Transport = ConnectionManager> {
    settings: EndpointSettings,
    handlers: HashMap<String, MessageHandler<T>>,
    admin: BTreeMap<String, AdminHandler<T>>,
}

impl<T: Transport> FixEndpointBuilder<T> {
    /// A builder with the built-in `list` and `shutdown` commands.
    pub fn new(settings: EndpointSettings) -> Self {
        let mut builder: FixEndpointBuilder<T> = FixEndpointBuilder {
            settings,
            handlers: HashMap::new(),
            admin: BTreeMap::new(),
        };

        builder.register_admin_command("list", |endpoint, session| {
            let verbs = endpoint.admin_commands().join("\n");
            endpoint.reply_admin(session, &verbs);
        });

        builder.register_admin_command("shutdown", |endpoint, session| {
            info!(%session, "shutdown requested");
            endpoint.reply_admin(session, "shutting down");
            endpoint.transport().stop();
        });

        builder
    }

    /// Register the handler for a MsgType, replacing any earlier one.
    pub fn register_handler<F>(&mut self, msg_type: &str, handler: F) -> &mut Self
    where
        F: Fn(&FixEndpoint<T>, WireMessage, SessionId) + Send + Sync + 'static,
    {
        self.handlers.insert(msg_type.to_string(), Box::new(handler));
        self
    }

    /// Register a named admin command, replacing any earlier one.
    pub fn register_admin_command<F>(&mut self, name: &str, handler: F) -> &mut Self
    where
        F: Fn(&FixEndpoint<T>, SessionId) + Send + Sync + 'static,
    {
        self.admin.insert(name.to_string(), Box::new(handler));
        self
    }

    pub fn build(self, transport: T) -> FixEndpoint<T> {
        FixEndpoint {
            transport,
            settings: self.settings,
            handlers: self.handlers,
            admin: self.admin,
            decoders: Mutex::new(HashMap::new()),
        }
    }
}

/// Typed message bus over a transport.
pub struct FixEndpoint<T: Transport = ConnectionManager> {
    transport: T,
    settings: EndpointSettings,
    handlers: HashMap<String, MessageHandler<T>>,
    admin: BTreeMap<String, AdminHandler<T>>,
    decoders: Mutex<HashMap<SessionId, FrameDecoder>>,
}

impl<T: Transport> FixEndpoint<T> {
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn settings(&self) -> &EndpointSettings {
        &self.settings
    }

    /// Registered admin command names, sorted.
    pub fn admin_commands(&self) -> Vec<&str> {
        self.admin.keys().map(String::as_str).collect()
    }

    /// Stamp, encode and send a message to a session.
    pub fn send_typed(&self, mut message: WireMessage, session: SessionId) -> bool {
        message.set(tags::SENDING_TIME, timestamp::now_utc());
        if let Some(sender) = &self.settings.sender_id {
            message.set(tags::SENDER_SUB_ID, sender.as_str());
        }

        debug!(%session, msg_type = message.msg_type().unwrap_or("?"), "sending");
        self.transport.send(message.encoded(), session)
    }

    /// Send to whichever session currently owns a peer port.
    pub fn send_to_port(&self, port: Port, message: WireMessage) -> bool {
        match self.transport.session_for_port(port) {
            Some(session) => self.send_typed(message, session),
            None => {
                warn!(port, "no session for port; message dropped");
                false
            }
        }
    }

    /// Send an admin response.
    pub fn reply_admin(&self, session: SessionId, text: &str) -> bool {
        let response = WireMessage::of_type(msg_type::ADMIN).with(tags::ADMIN_RESPONSE, sanitize(text));
        self.send_typed(response, session)
    }

    /// Frame, decode and dispatch bytes received from `session`.
    pub fn handle_bytes(&self, payload: &[u8], session: SessionId) {
        let frames = {
            let mut decoders = self.decoders.lock();
            let decoder = decoders
                .entry(session)
                .or_insert_with(|| FrameDecoder::new(self.settings.max_frame_len));
            decoder.extend(payload);

            let mut frames = Vec::new();
            loop {
                match decoder.next_frame() {
                    Ok(Some(frame)) => frames.push(frame),
                    Ok(None) => break,
                    // The decoder has already skipped past the bad bytes.
                    Err(e) => warn!(%session, error = %e, "framing error"),
                }
            }
            frames
        };

        for frame in frames {
            self.handle_frame(&frame, session);
        }
    }

    fn handle_frame(&self, frame: &Bytes, session: SessionId) {
        if self.settings.verify_checksums {
            if let Err(e) = codec::verify_checksum(frame) {
                warn!(%session, error = %e, "frame dropped");
                return;
            }
        }

        match codec::decode(frame) {
            Ok(message) => self.dispatch(message, session),
            Err(e) => warn!(
                %session,
                error = %e,
                frame = %String::from_utf8_lossy(frame),
                "malformed message dropped"
            ),
        }
    }

    /// Route a decoded message to its handler.
    pub fn dispatch(&self, message: WireMessage, session: SessionId) {
        let Some(kind) = message.msg_type().map(str::to_string) else {
            warn!(%session, "message without MsgType dropped");
            return;
        };

        if kind == msg_type::ADMIN && message.has(tags::ADMIN_COMMAND) {
            self.dispatch_admin(&message, session);
            return;
        }

        match self.handlers.get(&kind) {
            Some(handler) => handler(self, message, session),
            None => warn!(%session, msg_type = %kind, "no handler for message type; dropped"),
        }
    }

    fn dispatch_admin(&self, message: &WireMessage, session: SessionId) {
        let verb = message.get(tags::ADMIN_COMMAND).unwrap_or_default().trim();

        match self.admin.get(verb) {
            Some(handler) => {
                info!(%session, command = verb, "admin command");
                handler(self, session);
            }
            None => {
                warn!(%session, command = verb, "unknown admin command");
                self.reply_admin(session, &format!("error: unknown command {verb:?}"));
            }
        }
    }
}

impl FixEndpoint<ConnectionManager> {
    /// Make this endpoint the byte handler of its connection manager.
    pub fn start(self: &Arc<Self>) -> bool {
        let handler: Arc<dyn ByteHandler> = self.clone();
        self.transport.start(handler)
    }
}

impl<T: Transport> ByteHandler for FixEndpoint<T> {
    fn on_receive(&self, payload: Bytes, session: SessionId) {
        self.handle_bytes(&payload, session);
    }

    fn on_session_closed(&self, session: SessionId) {
        if let Some(decoder) = self.decoders.lock().remove(&session) {
            if decoder.buffered() > 0 {
                debug!(%session, bytes = decoder.buffered(), "discarding partial frame");
            }
        }
    }
}
