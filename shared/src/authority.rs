//! Single-writer arbitration.
//!
//! Exactly one participant per session is the authority. It is the only one
//! allowed to originate population and combat decisions; it stamps each one
//! into an [`Envelope`] and queues it for the transport. Every other
//! participant applies those envelopes and never originates its own.

use log::{debug, info, warn};
use thiserror::Error;

use crate::protocol::{BroadcastTarget, Envelope, ParticipantId, ServerMessage};

/// Role of the local participant, resolved once per session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Authority,
    Replica { authority: ParticipantId },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorityError {
    #[error("participant {0} is not the authority and cannot originate decisions")]
    NotAuthority(ParticipantId),
}

/// A stamped message waiting for the transport
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub target: BroadcastTarget,
    pub envelope: Envelope,
}

/// Decides who may write and routes what they write
#[derive(Debug)]
pub struct AuthorityCoordinator {
    local: ParticipantId,
    role: Role,
    next_seq: u64,
    outbox: Vec<Outbound>,
    rejected: u64,
}

impl AuthorityCoordinator {
    /// Coordinator for the participant that owns the session
    pub fn authority(local: ParticipantId) -> Self {
        info!("Participant {} is the authority", local);
        Self::with_role(local, Role::Authority)
    }

    /// Coordinator for a participant that only replicates `authority`
    pub fn replica(local: ParticipantId, authority: ParticipantId) -> Self {
        info!("Participant {} replicates authority {}", local, authority);
        Self::with_role(local, Role::Replica { authority })
    }

    /// Coordinator for a replica, learned from the authority's `Welcome`.
    ///
    /// Only a welcome that comes from the authority it names counts; anything
    /// else leaves the participant without a role.
    pub fn from_welcome(envelope: &Envelope) -> Option<Self> {
        match &envelope.message {
            ServerMessage::Welcome { participant_id, authority_id, .. } if envelope.origin == *authority_id => {
                Some(Self::replica(*participant_id, *authority_id))
            }
            _ => None,
        }
    }

    fn with_role(local: ParticipantId, role: Role) -> Self {
        Self {
            local,
            role,
            next_seq: 1,
            outbox: Vec::new(),
            rejected: 0,
        }
    }

    pub fn is_authority(&self) -> bool {
        matches!(self.role, Role::Authority)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn local_id(&self) -> ParticipantId {
        self.local
    }

    /// Participant whose decisions are binding
    pub fn authority_id(&self) -> ParticipantId {
        match self.role {
            Role::Authority => self.local,
            Role::Replica { authority } => authority,
        }
    }

    /// Stamp a message with this participant as origin.
    /// Fails for non-authority participants.
    pub fn envelope(&mut self, message: ServerMessage) -> Result<Envelope, AuthorityError> {
        if !self.is_authority() {
            self.rejected += 1;
            warn!(
                "Participant {} tried to originate {:?}; only {} may",
                self.local,
                message_kind(&message),
                self.authority_id()
            );
            return Err(AuthorityError::NotAuthority(self.local));
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        Ok(Envelope { origin: self.local, seq, message })
    }

    /// Queue a decision for delivery. Returns the envelope's sequence number.
    pub fn broadcast(&mut self, message: ServerMessage, target: BroadcastTarget) -> Result<u64, AuthorityError> {
        let envelope = self.envelope(message)?;
        let seq = envelope.seq;
        self.outbox.push(Outbound { target, envelope });
        Ok(seq)
    }

    /// Whether an inbound envelope is binding for this participant
    pub fn accepts(&self, envelope: &Envelope) -> bool {
        let binding = envelope.origin == self.authority_id();
        if !binding {
            debug!(
                "Dropping envelope #{} from {}: not the authority",
                envelope.seq, envelope.origin
            );
        }
        binding
    }

    /// Hand everything queued since the last drain to the transport
    pub fn drain_outbox(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbox)
    }

    pub fn pending(&self) -> usize {
        self.outbox.len()
    }

    /// Number of decisions refused because this participant is not the authority
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Drop anything still queued; called last during shutdown
    pub fn shutdown(&mut self) {
        if !self.outbox.is_empty() {
            info!("Discarding {} undelivered messages", self.outbox.len());
        }
        self.outbox.clear();
    }
}

fn message_kind(message: &ServerMessage) -> &'static str {
    match message {
        ServerMessage::Welcome { .. } => "Welcome",
        ServerMessage::JoinRejected { .. } => "JoinRejected",
        ServerMessage::PlayerSpawn { .. } => "PlayerSpawn",
        ServerMessage::PlayerDespawn { .. } => "PlayerDespawn",
        ServerMessage::CreepSpawn { .. } => "CreepSpawn",
        ServerMessage::CreepAttack { .. } => "CreepAttack",
        ServerMessage::DamageEvent { .. } => "DamageEvent",
        ServerMessage::CreepDeath { .. } => "CreepDeath",
        ServerMessage::CreepDespawn { .. } => "CreepDespawn",
        ServerMessage::RewardGranted { .. } => "RewardGranted",
        ServerMessage::PlayerRespawned { .. } => "PlayerRespawned",
        ServerMessage::WorldState { .. } => "WorldState",
    }
}
