use log::{debug, info, warn};
use shared::events::{Input, Output};
use shared::socket::{Frame, Packet};
use shared::ProtocolError;

pub const RECONNECT_BASE_MS: u32 = 1_000;
pub const RECONNECT_MAX_MS: u32 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    /// Transport is open, waiting for the Engine.IO handshake.
    Opening,
    /// Socket.IO connect sent, waiting for the server to acknowledge it.
    Handshaking,
    Connected,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    Connected,
    Disconnected,
    Push(Output),
}

/// What the shell has to do after feeding a frame to the connection.
#[derive(Debug, Default, PartialEq)]
pub struct Step {
    pub outbound: Vec<String>,
    pub events: Vec<ConnectionEvent>,
}

#[derive(Debug)]
pub struct Connection {
    state: LinkState,
    authenticated: bool,
    auth_failed: bool,
    sid: Option<String>,
    reconnect_attempts: u32,
}

impl Default for Connection {
    fn default() -> Self {
        Connection {
            state: LinkState::Disconnected,
            authenticated: false,
            auth_failed: false,
            sid: None,
            reconnect_attempts: 0,
        }
    }
}

impl Connection {
    pub fn connected(&self) -> bool {
        self.state == LinkState::Connected
    }

    pub fn authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn sid(&self) -> Option<&str> {
        self.sid.as_deref()
    }

    pub fn status_label(&self) -> &'static str {
        match (self.state, self.authenticated) {
            (LinkState::Connected, true) => "Live",
            (LinkState::Connected, false) if self.auth_failed => "Authentication failed",
            (LinkState::Connected, false) => "Authenticating…",
            _ => "Connecting…",
        }
    }

    pub fn on_open(&mut self) {
        self.state = LinkState::Opening;
    }

    /// Feeds one websocket text message through the Engine.IO/Socket.IO state machine.
    pub fn receive(&mut self, text: &str) -> Result<Step, ProtocolError> {
        let mut step = Step::default();

        match Frame::decode(text)? {
            Frame::Open(handshake) => {
                debug!(
                    "engine.io open sid={} ping={}ms",
                    handshake.sid, handshake.ping_interval
                );
                self.state = LinkState::Handshaking;
                step.outbound.push(Frame::Message(Packet::connect()).encode());
            }
            Frame::Ping => step.outbound.push(Frame::Pong.encode()),
            Frame::Close => self.drop_link(&mut step),
            Frame::Pong | Frame::Upgrade | Frame::Noop => {}
            Frame::Message(packet) => self.receive_packet(packet, &mut step)?,
        }

        Ok(step)
    }

    fn receive_packet(&mut self, packet: Packet, step: &mut Step) -> Result<(), ProtocolError> {
        match packet {
            Packet::Connect { sid, .. } => {
                info!("Connected to server: {}", sid.as_deref().unwrap_or("-"));
                self.state = LinkState::Connected;
                self.sid = sid;
                self.reconnect_attempts = 0;
                step.events.push(ConnectionEvent::Connected);
            }
            Packet::Disconnect { .. } => self.drop_link(step),
            Packet::ConnectError { message, .. } => {
                warn!("Connection error: {}", message);
                self.drop_link(step);
            }
            Packet::Ack { id, .. } => debug!("ignoring ack {}", id),
            event @ Packet::Event { .. } => {
                if let Some(output) = Output::from_packet(event) {
                    let output = output?;
                    match &output {
                        Output::AuthSuccess => {
                            info!("Authentication successful");
                            self.authenticated = true;
                            self.auth_failed = false;
                        }
                        Output::AuthError(notice) => {
                            warn!("Authentication failed: {}", notice.message);
                            self.authenticated = false;
                            self.auth_failed = true;
                        }
                        _ => {}
                    }
                    step.events.push(ConnectionEvent::Push(output));
                }
            }
        }

        Ok(())
    }

    fn drop_link(&mut self, step: &mut Step) {
        if self.state != LinkState::Disconnected {
            step.events.push(ConnectionEvent::Disconnected);
        }
        self.state = LinkState::Disconnected;
        self.authenticated = false;
        self.sid = None;
    }

    /// Encodes an outbound event, or `None` when there is no connection to carry it.
    pub fn emit(&self, input: &Input) -> Option<String> {
        if self.connected() {
            Some(input.encode())
        } else {
            debug!("dropping `{}` while disconnected", input.name());
            None
        }
    }

    pub fn authenticate(&mut self, user_id: &str) -> Option<String> {
        self.auth_failed = false;
        info!("Authenticating user: {}", user_id);
        self.emit(&Input::AuthenticateUser {
            user_id: user_id.to_string(),
        })
    }

    /// Marks the transport as gone and returns how long to wait before reconnecting.
    pub fn on_close(&mut self) -> u32 {
        self.state = LinkState::Disconnected;
        self.authenticated = false;
        self.sid = None;

        let delay = RECONNECT_BASE_MS
            .saturating_mul(2u32.saturating_pow(self.reconnect_attempts))
            .min(RECONNECT_MAX_MS);
        self.reconnect_attempts = self.reconnect_attempts.saturating_add(1);
        delay
    }
}
