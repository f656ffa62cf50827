//! UDP Game Server implementation.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;

use log::{debug, error, info, warn};
use tokio::net::UdpSocket;

use arena_shared::{
    AuthorityCoordinator, BroadcastTarget, ClientMessage, ParticipantId, ServerMessage, MAX_PACKET_SIZE,
    PROTOCOL_VERSION,
};

use crate::world::GameWorld;

/// Connection timeout in seconds
const CONNECTION_TIMEOUT: f32 = 30.0;

/// Longest accepted display name
const MAX_NAME_LEN: usize = 32;

/// Client connection state
#[derive(Debug)]
pub struct ClientConnection {
    pub addr: SocketAddr,
    /// Participant id; also the id of the player it controls
    pub participant_id: ParticipantId,
    pub name: String,
    pub last_seen: Instant,
}

impl ClientConnection {
    pub fn new(addr: SocketAddr, participant_id: ParticipantId, name: String) -> Self {
        Self {
            addr,
            participant_id,
            name,
            last_seen: Instant::now(),
        }
    }

    pub fn is_timed_out(&self) -> bool {
        self.last_seen.elapsed().as_secs_f32() > CONNECTION_TIMEOUT
    }
}

/// Game server
pub struct Server {
    socket: UdpSocket,
    clients: HashMap<SocketAddr, ClientConnection>,
    next_participant_id: ParticipantId,
}

impl Server {
    /// Create a new server listening on the given port
    pub async fn new(port: u16) -> Result<Self, std::io::Error> {
        Self::bind(SocketAddr::from(([0, 0, 0, 0], port))).await
    }

    pub async fn bind(addr: SocketAddr) -> Result<Self, std::io::Error> {
        let socket = UdpSocket::bind(addr).await?;
        info!("Listening on {}", socket.local_addr()?);

        Ok(Self {
            socket,
            clients: HashMap::new(),
            // 0 is the authority itself
            next_participant_id: 1,
        })
    }

    /// Process incoming network messages
    pub async fn process_incoming(&mut self, world: &mut GameWorld, authority: &mut AuthorityCoordinator) {
        let mut buf = [0u8; MAX_PACKET_SIZE];

        // Non-blocking receive loop
        loop {
            match self.socket.try_recv_from(&mut buf) {
                Ok((len, addr)) => {
                    self.handle_packet(&buf[..len], addr, world, authority).await;
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    break;
                }
                Err(e) => {
                    error!("Error receiving packet: {}", e);
                    break;
                }
            }
        }

        self.check_timeouts(world, authority);
    }

    /// Handle a received packet
    async fn handle_packet(
        &mut self,
        data: &[u8],
        addr: SocketAddr,
        world: &mut GameWorld,
        authority: &mut AuthorityCoordinator,
    ) {
        let message = match ClientMessage::deserialize(data) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Failed to deserialize packet from {}: {}", addr, e);
                return;
            }
        };

        match message {
            ClientMessage::Join { protocol_version, name } => {
                self.handle_join(addr, protocol_version, name, world, authority).await;
            }
            other => self.handle_session_message(other, addr, world, authority),
        }
    }

    /// Requests that need a joined participant
    fn handle_session_message(
        &mut self,
        message: ClientMessage,
        addr: SocketAddr,
        world: &mut GameWorld,
        authority: &mut AuthorityCoordinator,
    ) {
        let participant_id = match self.clients.get_mut(&addr) {
            Some(client) => {
                client.last_seen = Instant::now();
                client.participant_id
            }
            None => {
                debug!("Ignoring {:?} from unknown address {}", message, addr);
                return;
            }
        };

        match message {
            ClientMessage::Join { .. } => {
                warn!("Client {} already joined, ignoring", addr);
            }
            ClientMessage::Disconnect => {
                self.handle_disconnect(addr, world, authority);
            }
            ClientMessage::PlayerUpdate { position, rotation } => {
                world.update_player_position(participant_id, position, rotation);
            }
            ClientMessage::Attack { target_id } => {
                if world.player_attack(participant_id, target_id, authority).is_none() {
                    debug!("Attack from {} on {} had no effect", participant_id, target_id);
                }
            }
            ClientMessage::RespawnRequest => {
                if let Some(player) = world.respawn_player(participant_id) {
                    emit(authority, ServerMessage::PlayerRespawned { player }, BroadcastTarget::All);
                }
            }
        }
    }

    /// Handle join request: spawn a player and send the current population
    async fn handle_join(
        &mut self,
        addr: SocketAddr,
        protocol_version: u32,
        name: String,
        world: &mut GameWorld,
        authority: &mut AuthorityCoordinator,
    ) {
        if protocol_version != PROTOCOL_VERSION {
            let reason = format!(
                "Protocol version mismatch. Server: {}, Client: {}",
                PROTOCOL_VERSION, protocol_version
            );
            self.reject(addr, reason, authority).await;
            return;
        }

        let name = name.trim().to_string();
        if name.is_empty() || name.len() > MAX_NAME_LEN {
            self.reject(addr, format!("Name must be 1-{} characters", MAX_NAME_LEN), authority)
                .await;
            return;
        }

        if self.clients.contains_key(&addr) {
            warn!("Client {} already joined, ignoring", addr);
            return;
        }

        let participant_id = self.next_participant_id;
        self.next_participant_id += 1;

        let player = world.add_player(participant_id, name.clone());
        self.clients
            .insert(addr, ClientConnection::new(addr, participant_id, name.clone()));
        info!("'{}' joined from {} as participant {}", name, addr, participant_id);

        let owner = BroadcastTarget::Owner(participant_id);
        emit(
            authority,
            ServerMessage::Welcome {
                participant_id,
                authority_id: authority.authority_id(),
                player: player.clone(),
            },
            owner,
        );
        for creep in world.creep_states() {
            emit(authority, ServerMessage::CreepSpawn { creep }, owner);
        }
        emit(authority, ServerMessage::PlayerSpawn { player }, BroadcastTarget::All);
    }

    /// Refuse a join. The requester has no participant id yet, so the reply
    /// bypasses the outbox.
    async fn reject(&self, addr: SocketAddr, reason: String, authority: &mut AuthorityCoordinator) {
        warn!("Rejecting join from {}: {}", addr, reason);
        match authority.envelope(ServerMessage::JoinRejected { reason }) {
            Ok(envelope) => match envelope.serialize() {
                Ok(data) => {
                    if let Err(e) = self.socket.send_to(&data, addr).await {
                        error!("Failed to send to {}: {}", addr, e);
                    }
                }
                Err(e) => error!("Failed to serialize rejection: {}", e),
            },
            Err(e) => warn!("Cannot reject {}: {}", addr, e),
        }
    }

    fn handle_disconnect(&mut self, addr: SocketAddr, world: &mut GameWorld, authority: &mut AuthorityCoordinator) {
        if let Some(client) = self.clients.remove(&addr) {
            info!("'{}' (participant {}) disconnected", client.name, client.participant_id);
            self.drop_player(client.participant_id, world, authority);
        }
    }

    fn check_timeouts(&mut self, world: &mut GameWorld, authority: &mut AuthorityCoordinator) {
        let timed_out: Vec<SocketAddr> = self
            .clients
            .iter()
            .filter(|(_, c)| c.is_timed_out())
            .map(|(addr, _)| *addr)
            .collect();

        for addr in timed_out {
            if let Some(client) = self.clients.remove(&addr) {
                warn!("'{}' (participant {}) timed out", client.name, client.participant_id);
                self.drop_player(client.participant_id, world, authority);
            }
        }
    }

    fn drop_player(&self, participant_id: ParticipantId, world: &mut GameWorld, authority: &mut AuthorityCoordinator) {
        if world.remove_player(participant_id) {
            emit(authority, ServerMessage::PlayerDespawn { id: participant_id }, BroadcastTarget::All);
        }
    }

    /// Queue this tick's world snapshot
    pub fn broadcast_world_state(&self, world: &GameWorld, authority: &mut AuthorityCoordinator) {
        if self.clients.is_empty() {
            return;
        }
        emit(authority, world.snapshot(), BroadcastTarget::All);
    }

    /// Send everything the coordinator queued since the last tick
    pub async fn process_outgoing(&mut self, authority: &mut AuthorityCoordinator) {
        for outbound in authority.drain_outbox() {
            let data = match outbound.envelope.serialize() {
                Ok(data) => data,
                Err(e) => {
                    error!("Failed to serialize envelope #{}: {}", outbound.envelope.seq, e);
                    continue;
                }
            };

            match outbound.target {
                BroadcastTarget::All => {
                    for addr in self.clients.keys() {
                        if let Err(e) = self.socket.send_to(&data, addr).await {
                            error!("Failed to broadcast to {}: {}", addr, e);
                        }
                    }
                }
                BroadcastTarget::Owner(participant_id) => {
                    let Some(addr) = self.addr_of(participant_id) else {
                        debug!("Owner {} no longer connected, dropping #{}", participant_id, outbound.envelope.seq);
                        continue;
                    };
                    if let Err(e) = self.socket.send_to(&data, addr).await {
                        error!("Failed to send to {}: {}", addr, e);
                    }
                }
            }
        }
    }

    fn addr_of(&self, participant_id: ParticipantId) -> Option<SocketAddr> {
        self.clients
            .values()
            .find(|c| c.participant_id == participant_id)
            .map(|c| c.addr)
    }

    /// Say goodbye to every client; last network step before exit
    pub async fn shutdown(&mut self, world: &mut GameWorld, authority: &mut AuthorityCoordinator) {
        let addrs: Vec<SocketAddr> = self.clients.keys().copied().collect();
        for addr in addrs {
            self.handle_disconnect(addr, world, authority);
        }
        self.process_outgoing(authority).await;
        info!("Network shut down");
    }
}

#[cfg(test)]
impl Server {
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.socket.local_addr()
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }
}

fn emit(authority: &mut AuthorityCoordinator, message: ServerMessage, target: BroadcastTarget) {
    if let Err(e) = authority.broadcast(message, target) {
        warn!("Dropped outgoing message: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use arena_shared::{Envelope, NoPresentation, MAX_DATAGRAM_SIZE};

    use crate::config::ServerConfig;

    async fn recv(socket: &UdpSocket) -> Envelope {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let (len, _) = tokio::time::timeout(Duration::from_secs(2), socket.recv_from(&mut buf))
            .await
            .expect("no datagram from server")
            .unwrap();
        Envelope::deserialize(&buf[..len]).unwrap()
    }

    #[tokio::test]
    async fn test_join_over_loopback() {
        let mut server = Server::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let server_addr = server.local_addr().unwrap();

        let config = ServerConfig { seed: Some(9), ..ServerConfig::with_defaults() };
        let mut world = GameWorld::new(&config, 0, Box::new(NoPresentation));
        let mut authority = AuthorityCoordinator::authority(0);
        world.update(0.05, &mut authority);
        authority.drain_outbox();
        let creeps = world.creep_count();
        assert!(creeps > 0);

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let join = ClientMessage::Join { protocol_version: PROTOCOL_VERSION, name: "tester".to_string() };
        client.send_to(&join.serialize().unwrap(), server_addr).await.unwrap();

        for _ in 0..100 {
            server.process_incoming(&mut world, &mut authority).await;
            if server.client_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(server.client_count(), 1);
        assert!(world.player(1).is_some());

        server.process_outgoing(&mut authority).await;

        let welcome = recv(&client).await;
        assert_eq!(welcome.origin, 0);
        match welcome.message {
            ServerMessage::Welcome { participant_id, authority_id, player } => {
                assert_eq!(participant_id, 1);
                assert_eq!(authority_id, 0);
                assert_eq!(player.name, "tester");
            }
            other => panic!("expected Welcome, got {:?}", other),
        }

        let mut spawns = 0;
        for _ in 0..creeps {
            if matches!(recv(&client).await.message, ServerMessage::CreepSpawn { .. }) {
                spawns += 1;
            }
        }
        assert_eq!(spawns, creeps);
    }

    #[tokio::test]
    async fn test_version_mismatch_is_rejected() {
        let mut server = Server::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let server_addr = server.local_addr().unwrap();
        let mut world = GameWorld::new(&ServerConfig::with_defaults(), 0, Box::new(NoPresentation));
        let mut authority = AuthorityCoordinator::authority(0);

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let join = ClientMessage::Join { protocol_version: PROTOCOL_VERSION + 1, name: "old".to_string() };
        client.send_to(&join.serialize().unwrap(), server_addr).await.unwrap();

        let mut reply = None;
        for _ in 0..100 {
            server.process_incoming(&mut world, &mut authority).await;
            let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
            if let Ok((len, _)) = client.try_recv_from(&mut buf) {
                reply = Some(Envelope::deserialize(&buf[..len]).unwrap());
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(matches!(reply.map(|e| e.message), Some(ServerMessage::JoinRejected { .. })));
        assert_eq!(server.client_count(), 0);
        assert_eq!(world.player_count(), 0);
    }
}
