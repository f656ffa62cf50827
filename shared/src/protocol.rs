//! Network protocol definitions shared between participants.
//!
//! The authority serializes every mutating decision into a [`ServerMessage`],
//! wraps it in an [`Envelope`] naming its origin, and ships it with bincode.
//! Replicas only ever send [`ClientMessage`] requests.

use serde::{Deserialize, Serialize};

use crate::entities::{CreepState, PlayerState, RewardGrant};

/// Protocol version for compatibility checking
pub const PROTOCOL_VERSION: u32 = 3;

/// Server tick rate in Hz
pub const SERVER_TICK_RATE: u32 = 20;

/// Default server port
pub const DEFAULT_PORT: u16 = 7777;

/// Maximum size of a client request datagram
pub const MAX_PACKET_SIZE: usize = 1200;

/// Receive buffer for authority datagrams (snapshots can be large)
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Participant id reserved for the authority host
pub const AUTHORITY_PARTICIPANT_ID: u64 = 0;

/// Identifies one networked participant (the authority or a replica)
pub type ParticipantId = u64;

// =============================================================================
// Client -> Server Messages
// =============================================================================

/// Requests sent from a replica to the authority
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Join the arena with a display name
    Join {
        protocol_version: u32,
        name: String,
    },

    /// Disconnect gracefully
    Disconnect,

    /// Player position update (sent frequently, doubles as heartbeat)
    PlayerUpdate {
        position: [f32; 3],
        rotation: f32,
    },

    /// Attack request against a creep
    Attack {
        target_id: u64,
    },

    /// Request respawn after death
    RespawnRequest,
}

// =============================================================================
// Server -> Client Messages
// =============================================================================

/// Decisions and state pushed from the authority to replicas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Join accepted
    Welcome {
        participant_id: ParticipantId,
        authority_id: ParticipantId,
        player: PlayerState,
    },

    /// Join refused (bad protocol version, server full...)
    JoinRejected {
        reason: String,
    },

    /// Another player joined
    PlayerSpawn {
        player: PlayerState,
    },

    /// Another player left
    PlayerDespawn {
        id: u64,
    },

    /// A creep was spawned by a spawn point
    CreepSpawn {
        creep: CreepState,
    },

    /// A creep started an attack (animation trigger)
    CreepAttack {
        creep_id: u64,
        target_id: u64,
    },

    /// Damage was resolved by the authority
    DamageEvent {
        target_id: u64,
        source_id: Option<u64>,
        amount: f32,
        remaining_health: f32,
        max_health: f32,
        died: bool,
    },

    /// A creep entered its dying state
    CreepDeath {
        creep_id: u64,
        killer_id: Option<u64>,
        respawn_delay: f64,
    },

    /// A creep finished dying and was removed from simulation
    CreepDespawn {
        creep_id: u64,
    },

    /// A kill reward was applied to the receiving participant's player
    RewardGranted {
        grant: RewardGrant,
        level: u32,
        experience: u64,
        gold: u64,
    },

    /// Player respawn response
    PlayerRespawned {
        player: PlayerState,
    },

    /// World snapshot (sent every server tick)
    WorldState {
        tick: u64,
        creeps: Vec<CreepState>,
        players: Vec<PlayerState>,
    },
}

/// Delivery target for a broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BroadcastTarget {
    /// Every joined participant
    All,
    /// Only the participant controlling the given id
    Owner(ParticipantId),
}

/// A server message stamped with the participant that originated it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub origin: ParticipantId,
    /// Per-origin sequence number, monotonically increasing
    pub seq: u64,
    pub message: ServerMessage,
}

// =============================================================================
// Serialization helpers
// =============================================================================

impl ClientMessage {
    pub fn serialize(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

impl Envelope {
    pub fn serialize(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_survives_the_wire() {
        let envelope = Envelope {
            origin: AUTHORITY_PARTICIPANT_ID,
            seq: 42,
            message: ServerMessage::CreepDeath {
                creep_id: 10_001,
                killer_id: Some(3),
                respawn_delay: 60.0,
            },
        };

        let bytes = envelope.serialize().unwrap();
        assert!(bytes.len() <= MAX_PACKET_SIZE);
        assert_eq!(Envelope::deserialize(&bytes).unwrap(), envelope);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(ClientMessage::deserialize(&[0xff, 0xff, 0xff, 0xff, 0x01]).is_err());
    }
}
