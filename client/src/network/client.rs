//! UDP Network Client for a replica participant.
//!
//! This is a simple non-blocking UDP client that can be polled from any
//! frame loop. It only transports; deciding which envelopes are binding is
//! left to the session.

use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use arena_shared::{
    AuthorityCoordinator, ClientMessage, Envelope, ParticipantId, ServerMessage, MAX_DATAGRAM_SIZE, PROTOCOL_VERSION,
};

use crate::ClientError;

/// Connection timeout duration
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Heartbeat interval (send position update to keep connection alive)
const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(50); // 20 Hz

/// Connection state
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed(String),
}

/// Network client for communicating with the authority
pub struct NetworkClient {
    socket: Option<UdpSocket>,
    server_addr: Option<SocketAddr>,
    state: ConnectionState,
    /// Role for this session, learned from the authority's welcome
    coordinator: Option<AuthorityCoordinator>,
    connect_time: Option<Instant>,
    last_send_time: Instant,
    last_receive_time: Instant,

    /// Received envelopes waiting to be processed
    incoming: Vec<Envelope>,
}

impl NetworkClient {
    /// Create a new network client
    pub fn new() -> Self {
        Self {
            socket: None,
            server_addr: None,
            state: ConnectionState::Disconnected,
            coordinator: None,
            connect_time: None,
            last_send_time: Instant::now(),
            last_receive_time: Instant::now(),
            incoming: Vec::new(),
        }
    }

    /// Open a socket and ask the authority to join
    pub fn join<A: ToSocketAddrs>(&mut self, server: A, name: &str) -> Result<(), ClientError> {
        let server_addr = server.to_socket_addrs()?.next().ok_or(ClientError::NoAddress)?;
        let bind_addr: SocketAddr = if server_addr.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };

        // Create socket bound to any available port
        let socket = UdpSocket::bind(bind_addr)?;
        socket.set_nonblocking(true)?;

        self.socket = Some(socket);
        self.server_addr = Some(server_addr);
        self.state = ConnectionState::Connecting;
        self.connect_time = Some(Instant::now());
        self.coordinator = None;

        info!("Joining {} as '{}'", server_addr, name);
        self.send_message(&ClientMessage::Join {
            protocol_version: PROTOCOL_VERSION,
            name: name.to_string(),
        })
    }

    /// Disconnect from the server
    pub fn disconnect(&mut self) {
        if self.is_connected() {
            if let Err(e) = self.send_message(&ClientMessage::Disconnect) {
                debug!("Disconnect notice not sent: {}", e);
            }
        }

        self.socket = None;
        self.server_addr = None;
        self.state = ConnectionState::Disconnected;
        self.coordinator = None;
        self.connect_time = None;
        self.incoming.clear();
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected)
    }

    /// Get connection state
    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Participant id assigned by the authority (only valid when connected)
    pub fn participant_id(&self) -> Option<ParticipantId> {
        self.coordinator.as_ref().map(|c| c.local_id())
    }

    /// Session role; `None` until the authority has welcomed us
    pub fn coordinator(&self) -> Option<&AuthorityCoordinator> {
        self.coordinator.as_ref()
    }

    /// Poll for incoming envelopes (should be called every frame)
    pub fn poll(&mut self) -> Vec<Envelope> {
        self.receive_packets();

        match self.state {
            ConnectionState::Connecting => {
                if let Some(connect_time) = self.connect_time {
                    if connect_time.elapsed() > CONNECTION_TIMEOUT {
                        warn!("Connection timed out");
                        self.state = ConnectionState::Failed("Connection timed out".to_string());
                    }
                }
            }
            ConnectionState::Connected => {
                if self.last_receive_time.elapsed() > CONNECTION_TIMEOUT {
                    warn!("Authority went silent");
                    self.state = ConnectionState::Failed("Server timed out".to_string());
                }
            }
            ConnectionState::Disconnected | ConnectionState::Failed(_) => {}
        }

        std::mem::take(&mut self.incoming)
    }

    /// Receive all pending packets
    fn receive_packets(&mut self) {
        let socket = match &self.socket {
            Some(s) => s,
            None => return,
        };

        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let mut received_packets: Vec<Vec<u8>> = Vec::new();

        // First, collect all packets without borrowing self mutably
        loop {
            match socket.recv_from(&mut buf) {
                Ok((len, addr)) => {
                    if Some(addr) != self.server_addr {
                        debug!("Dropping datagram from unexpected address {}", addr);
                        continue;
                    }
                    received_packets.push(buf[..len].to_vec());
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    break;
                }
                Err(e) => {
                    error!("Network receive error: {}", e);
                    break;
                }
            }
        }

        for packet_data in received_packets {
            self.process_packet(&packet_data);
        }
    }

    /// Process a received packet
    fn process_packet(&mut self, data: &[u8]) {
        let envelope = match Envelope::deserialize(data) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Failed to deserialize server envelope: {}", e);
                return;
            }
        };
        self.last_receive_time = Instant::now();

        // Handle connection state messages
        match &envelope.message {
            ServerMessage::Welcome { .. } if self.coordinator.is_none() => {
                if let Some(coordinator) = AuthorityCoordinator::from_welcome(&envelope) {
                    info!("Joined with participant ID: {}", coordinator.local_id());
                    self.coordinator = Some(coordinator);
                    self.state = ConnectionState::Connected;
                }
            }
            ServerMessage::JoinRejected { reason } if self.coordinator.is_none() => {
                self.state = ConnectionState::Failed(reason.clone());
                error!("Join rejected: {}", reason);
            }
            _ => {}
        }

        self.incoming.push(envelope);
    }

    /// Send a message to the server
    pub fn send_message(&mut self, msg: &ClientMessage) -> Result<(), ClientError> {
        let socket = self.socket.as_ref().ok_or(ClientError::NotConnected)?;
        let server_addr = self.server_addr.ok_or(ClientError::NotConnected)?;

        let data = msg.serialize()?;
        socket.send_to(&data, server_addr)?;

        self.last_send_time = Instant::now();
        Ok(())
    }

    /// Send player state update to server
    pub fn send_player_update(&mut self, position: [f32; 3], rotation: f32) -> Result<(), ClientError> {
        self.send_message(&ClientMessage::PlayerUpdate { position, rotation })
    }

    /// Send an attack request
    pub fn send_attack(&mut self, target_id: u64) -> Result<(), ClientError> {
        self.send_message(&ClientMessage::Attack { target_id })
    }

    /// Send respawn request after death
    pub fn send_respawn_request(&mut self) -> Result<(), ClientError> {
        self.send_message(&ClientMessage::RespawnRequest)
    }

    /// Check if we should send a heartbeat
    pub fn should_send_heartbeat(&self) -> bool {
        self.is_connected() && self.last_send_time.elapsed() > HEARTBEAT_INTERVAL
    }
}

impl Default for NetworkClient {
    fn default() -> Self {
        Self::new()
    }
}
