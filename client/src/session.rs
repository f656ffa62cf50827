//! A replica's view of one arena session.

use std::net::ToSocketAddrs;

use log::{debug, warn};

use arena_shared::{Envelope, NoPresentation, PopulationReplica, PresentationHooks, ServerMessage};

use crate::{ClientError, NetworkClient};

/// Network client plus the population it mirrors
pub struct ClientSession<H: PresentationHooks = NoPresentation> {
    client: NetworkClient,
    replica: PopulationReplica,
    hooks: H,
    position: [f32; 3],
    rotation: f32,
}

impl<H: PresentationHooks> ClientSession<H> {
    pub fn new(hooks: H) -> Self {
        Self {
            client: NetworkClient::new(),
            replica: PopulationReplica::new(),
            hooks,
            position: [0.0; 3],
            rotation: 0.0,
        }
    }

    pub fn join<A: ToSocketAddrs>(&mut self, server: A, name: &str) -> Result<(), ClientError> {
        self.replica = PopulationReplica::new();
        self.client.join(server, name)
    }

    /// Per-frame update: drain the socket, apply what the authority decided,
    /// keep the connection alive and interpolate. Returns how many envelopes
    /// changed the replica.
    pub fn update(&mut self, delta: f32) -> usize {
        let mut applied = 0;
        for envelope in self.client.poll() {
            if !self.is_binding(&envelope) {
                warn!(
                    "Ignoring message #{} from participant {} (not the authority)",
                    envelope.seq, envelope.origin
                );
                continue;
            }
            if self.replica.apply(&envelope, &mut self.hooks) {
                applied += 1;
            } else {
                debug!("Envelope #{} from {} changed nothing", envelope.seq, envelope.origin);
            }
        }

        if self.client.should_send_heartbeat() {
            if let Err(e) = self.client.send_player_update(self.position, self.rotation) {
                warn!("Heartbeat failed: {}", e);
            }
        }

        self.replica.advance(delta);
        applied
    }

    /// Only the authority's envelopes are applied. Before the welcome there
    /// is no role yet and only a rejection can matter.
    fn is_binding(&self, envelope: &Envelope) -> bool {
        match self.client.coordinator() {
            Some(coordinator) => coordinator.accepts(envelope),
            None => matches!(envelope.message, ServerMessage::JoinRejected { .. }),
        }
    }

    /// Report the local player's movement
    pub fn move_to(&mut self, position: [f32; 3], rotation: f32) -> Result<(), ClientError> {
        self.position = position;
        self.rotation = rotation;
        self.client.send_player_update(position, rotation)
    }

    /// Ask the authority to resolve an attack; the outcome arrives later
    pub fn attack(&mut self, target_id: u64) -> Result<(), ClientError> {
        self.client.send_attack(target_id)
    }

    pub fn request_respawn(&mut self) -> Result<(), ClientError> {
        self.client.send_respawn_request()
    }

    pub fn leave(&mut self) {
        self.client.disconnect();
    }

    pub fn replica(&self) -> &PopulationReplica {
        &self.replica
    }

    pub fn client(&self) -> &NetworkClient {
        &self.client
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }
}

impl Default for ClientSession<NoPresentation> {
    fn default() -> Self {
        Self::new(NoPresentation)
    }
}
