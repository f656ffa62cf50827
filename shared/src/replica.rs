//! Read-only mirror of the creep population for non-authority participants.
//!
//! A replica never decides an outcome. It applies what the authority
//! broadcast, tolerating duplicated, delayed, reordered and lost delivery,
//! and interpolates positions between snapshots so movement looks smooth.
//! Deciding which envelopes are binding is the session's job; everything
//! handed to [`PopulationReplica::apply`] is assumed to come from the
//! authority.
//!
//! Every applied envelope's sequence number is remembered per entity. A
//! message older than what an entity already reflects changes nothing, and a
//! full snapshot newer than a creep's last update that no longer lists it
//! retires that creep.

use std::collections::{HashMap, HashSet, VecDeque};

use log::{debug, info, warn};

use crate::entities::{BehaviorState, CreepState, PlayerState, RewardGrant};
use crate::presentation::PresentationHooks;
use crate::protocol::{Envelope, ParticipantId, ServerMessage};

/// How many despawned creeps and departed players are remembered
const TOMBSTONE_CAPACITY: usize = 4096;

/// How many shown kill rewards are remembered
const REWARD_MEMORY: usize = 1024;

/// Snap distance below which interpolation just jumps to the target
const SNAP_DISTANCE: f32 = 0.01;

/// Ids retired at some sequence number, forgetting the oldest past capacity
#[derive(Debug)]
struct Retired {
    at: HashMap<u64, u64>,
    order: VecDeque<u64>,
    capacity: usize,
}

impl Retired {
    fn with_capacity(capacity: usize) -> Self {
        Self { at: HashMap::new(), order: VecDeque::new(), capacity }
    }

    /// Returns false if the id was already retired
    fn insert(&mut self, id: u64, seq: u64) -> bool {
        if self.at.contains_key(&id) {
            return false;
        }
        self.at.insert(id, seq);
        self.order.push_back(id);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.at.remove(&oldest);
            }
        }
        true
    }

    fn contains(&self, id: u64) -> bool {
        self.at.contains_key(&id)
    }

    fn retired_at(&self, id: u64) -> Option<u64> {
        self.at.get(&id).copied()
    }

    fn len(&self) -> usize {
        self.at.len()
    }
}

/// Replicated view of one creep
#[derive(Debug, Clone)]
pub struct CreepView {
    pub state: CreepState,
    /// Last authoritative position; `state.position` moves toward it
    pub target_position: [f32; 3],
    /// Sequence number of the newest envelope applied to this creep
    last_seq: u64,
    dead: bool,
}

impl CreepView {
    fn new(state: CreepState, seq: u64) -> Self {
        let dead = state.behavior.is_terminal();
        Self {
            target_position: state.position,
            state,
            last_seq: seq,
            dead,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }
}

#[derive(Debug, Clone)]
struct PlayerView {
    state: PlayerState,
    last_seq: u64,
}

/// Reward shown to the local player (display only, never re-applied)
#[derive(Debug, Clone, PartialEq)]
pub struct RewardNotice {
    pub grant: RewardGrant,
    pub level: u32,
    pub experience: u64,
    pub gold: u64,
}

/// Population mirror fed by authority broadcasts
#[derive(Debug)]
pub struct PopulationReplica {
    local_participant: Option<ParticipantId>,
    authority: Option<ParticipantId>,
    creeps: HashMap<u64, CreepView>,
    players: HashMap<u64, PlayerView>,
    despawned: Retired,
    departed: Retired,
    rewarded_kills: Retired,
    last_reward: Option<RewardNotice>,
}

impl Default for PopulationReplica {
    fn default() -> Self {
        Self {
            local_participant: None,
            authority: None,
            creeps: HashMap::new(),
            players: HashMap::new(),
            despawned: Retired::with_capacity(TOMBSTONE_CAPACITY),
            departed: Retired::with_capacity(TOMBSTONE_CAPACITY),
            rewarded_kills: Retired::with_capacity(REWARD_MEMORY),
            last_reward: None,
        }
    }
}

impl PopulationReplica {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one binding envelope. Returns true if the replica changed.
    pub fn apply(&mut self, envelope: &Envelope, hooks: &mut dyn PresentationHooks) -> bool {
        let seq = envelope.seq;
        match &envelope.message {
            ServerMessage::Welcome { participant_id, authority_id, player } => {
                if self.authority.is_some() {
                    return false;
                }
                info!("Joined as participant {} (authority {})", participant_id, authority_id);
                self.local_participant = Some(*participant_id);
                self.authority = Some(*authority_id);
                self.apply_player(seq, player);
                true
            }
            ServerMessage::JoinRejected { reason } => {
                warn!("Join rejected: {}", reason);
                false
            }
            ServerMessage::PlayerSpawn { player } | ServerMessage::PlayerRespawned { player } => {
                self.apply_player(seq, player)
            }
            ServerMessage::PlayerDespawn { id } => self.apply_player_despawn(seq, *id),
            ServerMessage::CreepSpawn { creep } => self.apply_spawn(seq, creep, hooks),
            ServerMessage::CreepAttack { creep_id, target_id } => {
                match self.creeps.get(creep_id) {
                    Some(view) if !view.dead => {
                        hooks.on_attack(*creep_id, *target_id);
                        true
                    }
                    _ => false,
                }
            }
            ServerMessage::DamageEvent { target_id, remaining_health, max_health, .. } => {
                self.apply_damage(seq, *target_id, *remaining_health, *max_health, hooks)
            }
            ServerMessage::CreepDeath { creep_id, .. } => self.apply_death(seq, *creep_id, hooks),
            ServerMessage::CreepDespawn { creep_id } => self.apply_despawn(seq, *creep_id, hooks),
            ServerMessage::RewardGranted { grant, level, experience, gold } => {
                self.apply_reward(seq, grant, *level, *experience, *gold)
            }
            ServerMessage::WorldState { creeps, players, .. } => {
                self.apply_snapshot(seq, creeps, players, hooks);
                true
            }
        }
    }

    fn apply_player(&mut self, seq: u64, player: &PlayerState) -> bool {
        if let Some(left_at) = self.departed.retired_at(player.id) {
            if seq <= left_at {
                debug!("Ignoring stale state #{} for departed player {}", seq, player.id);
                return false;
            }
        }
        match self.players.get_mut(&player.id) {
            Some(view) if seq <= view.last_seq => false,
            Some(view) => {
                view.state = player.clone();
                view.last_seq = seq;
                true
            }
            None => {
                self.players.insert(player.id, PlayerView { state: player.clone(), last_seq: seq });
                true
            }
        }
    }

    fn apply_player_despawn(&mut self, seq: u64, id: u64) -> bool {
        self.departed.insert(id, seq);
        self.players.remove(&id).is_some()
    }

    fn apply_spawn(&mut self, seq: u64, creep: &CreepState, hooks: &mut dyn PresentationHooks) -> bool {
        if self.despawned.contains(creep.id) || self.creeps.contains_key(&creep.id) {
            debug!("Duplicate or stale spawn for creep {}", creep.id);
            return false;
        }
        hooks.on_spawn(creep);
        hooks.health_bar(creep.id, creep.health, creep.max_health);
        self.creeps.insert(creep.id, CreepView::new(creep.clone(), seq));
        true
    }

    fn apply_damage(
        &mut self,
        seq: u64,
        target_id: u64,
        remaining_health: f32,
        max_health: f32,
        hooks: &mut dyn PresentationHooks,
    ) -> bool {
        if let Some(view) = self.creeps.get_mut(&target_id) {
            // An older update arriving late must not roll health back.
            if view.dead || seq <= view.last_seq {
                return false;
            }
            view.last_seq = seq;
            view.state.health = remaining_health;
            hooks.health_bar(target_id, remaining_health, max_health);
            return true;
        }

        if let Some(view) = self.players.get_mut(&target_id) {
            if seq <= view.last_seq {
                return false;
            }
            view.last_seq = seq;
            view.state.health = remaining_health.max(0.0) as u32;
            hooks.health_bar(target_id, remaining_health, max_health);
            return true;
        }

        false
    }

    fn apply_death(&mut self, seq: u64, creep_id: u64, hooks: &mut dyn PresentationHooks) -> bool {
        match self.creeps.get_mut(&creep_id) {
            Some(view) if !view.dead => {
                view.dead = true;
                view.last_seq = view.last_seq.max(seq);
                view.state.behavior = BehaviorState::Dying;
                view.state.target_id = None;
                view.state.health = 0.0;
                hooks.on_death(creep_id, view.state.position);
                true
            }
            _ => false,
        }
    }

    /// Remove a creep for good. A creep that never got its death message
    /// dies first so its death is still presented exactly once.
    fn apply_despawn(&mut self, seq: u64, creep_id: u64, hooks: &mut dyn PresentationHooks) -> bool {
        self.apply_death(seq, creep_id, hooks);
        self.despawned.insert(creep_id, seq);
        self.creeps.remove(&creep_id).is_some()
    }

    fn apply_reward(&mut self, seq: u64, grant: &RewardGrant, level: u32, experience: u64, gold: u64) -> bool {
        if Some(grant.beneficiary) != self.local_participant {
            return false;
        }
        if !self.rewarded_kills.insert(grant.kill_id, seq) {
            debug!("Reward for kill {} already shown", grant.kill_id);
            return false;
        }
        if let Some(view) = self.players.get_mut(&grant.beneficiary) {
            view.state.level = level;
        }
        self.last_reward = Some(RewardNotice {
            grant: grant.clone(),
            level,
            experience,
            gold,
        });
        true
    }

    fn apply_snapshot(
        &mut self,
        seq: u64,
        creeps: &[CreepState],
        players: &[PlayerState],
        hooks: &mut dyn PresentationHooks,
    ) {
        let mut dying = Vec::new();
        for creep in creeps {
            if self.despawned.contains(creep.id) {
                continue;
            }
            match self.creeps.get_mut(&creep.id) {
                Some(view) => {
                    if seq <= view.last_seq {
                        continue;
                    }
                    view.last_seq = seq;
                    view.target_position = creep.position;
                    view.state.rotation = creep.rotation;
                    if view.dead {
                        continue;
                    }
                    if creep.behavior.is_terminal() {
                        // Missed the death message.
                        dying.push(creep.id);
                        continue;
                    }
                    view.state.behavior = creep.behavior;
                    view.state.target_id = creep.target_id;
                    view.state.health = creep.health;
                }
                None => {
                    // Missed the spawn message; the snapshot is enough to catch up.
                    self.apply_spawn(seq, creep, hooks);
                }
            }
        }
        for id in dying {
            self.apply_death(seq, id, hooks);
        }

        // Missed the despawn: the authority no longer simulates these.
        let listed: HashSet<u64> = creeps.iter().map(|c| c.id).collect();
        let mut gone: Vec<u64> = self
            .creeps
            .iter()
            .filter(|(id, view)| !listed.contains(*id) && seq > view.last_seq)
            .map(|(id, _)| *id)
            .collect();
        gone.sort_unstable();
        for id in gone {
            debug!("Creep {} missing from snapshot #{}, retiring it", id, seq);
            self.apply_despawn(seq, id, hooks);
        }

        for player in players {
            self.apply_player(seq, player);
        }
    }

    /// Interpolate creep positions toward the last authoritative snapshot
    pub fn advance(&mut self, delta: f32) {
        for view in self.creeps.values_mut() {
            let dx = view.target_position[0] - view.state.position[0];
            let dy = view.target_position[1] - view.state.position[1];
            let dz = view.target_position[2] - view.state.position[2];
            let dist = (dx * dx + dy * dy + dz * dz).sqrt();
            if dist <= SNAP_DISTANCE {
                view.state.position = view.target_position;
                continue;
            }
            let step = (view.state.move_speed * delta).max(0.0);
            let ratio = (step / dist).min(1.0);
            view.state.position[0] += dx * ratio;
            view.state.position[1] += dy * ratio;
            view.state.position[2] += dz * ratio;
        }
    }

    pub fn local_participant(&self) -> Option<ParticipantId> {
        self.local_participant
    }

    pub fn authority(&self) -> Option<ParticipantId> {
        self.authority
    }

    pub fn creep(&self, id: u64) -> Option<&CreepView> {
        self.creeps.get(&id)
    }

    /// Creeps that are not dying or dead
    pub fn live_creeps(&self) -> impl Iterator<Item = &CreepView> {
        self.creeps.values().filter(|v| !v.dead)
    }

    pub fn creep_count(&self) -> usize {
        self.creeps.len()
    }

    pub fn player(&self, id: u64) -> Option<&PlayerState> {
        self.players.get(&id).map(|view| &view.state)
    }

    pub fn last_reward(&self) -> Option<&RewardNotice> {
        self.last_reward.as_ref()
    }

    /// Kill rewards remembered to suppress duplicates
    pub fn remembered_rewards(&self) -> usize {
        self.rewarded_kills.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::RecordedHooks;

    const AUTHORITY: u64 = 0;

    fn envelope(seq: u64, message: ServerMessage) -> Envelope {
        Envelope { origin: AUTHORITY, seq, message }
    }

    fn player(id: u64) -> PlayerState {
        PlayerState {
            id,
            name: format!("player{}", id),
            position: [0.0; 3],
            rotation: 0.0,
            health: 100,
            max_health: 100,
            mana: 50,
            max_mana: 50,
            level: 1,
        }
    }

    fn creep(id: u64) -> CreepState {
        CreepState {
            id,
            spawn_point: 0,
            archetype: "wolf".to_string(),
            level: 1,
            position: [0.0; 3],
            rotation: 0.0,
            health: 100.0,
            max_health: 100.0,
            move_speed: 4.0,
            behavior: BehaviorState::Patrol,
            target_id: None,
        }
    }

    fn welcomed() -> PopulationReplica {
        let mut replica = PopulationReplica::new();
        let welcome = envelope(
            1,
            ServerMessage::Welcome { participant_id: 7, authority_id: AUTHORITY, player: player(7) },
        );
        assert!(replica.apply(&welcome, &mut RecordedHooks::default()));
        replica
    }

    #[test]
    fn test_duplicate_spawn_and_death_fire_hooks_once() {
        let mut replica = welcomed();
        let mut hooks = RecordedHooks::default();

        let spawn = envelope(2, ServerMessage::CreepSpawn { creep: creep(1) });
        assert!(replica.apply(&spawn, &mut hooks));
        assert!(!replica.apply(&spawn, &mut hooks));

        let death = envelope(
            3,
            ServerMessage::CreepDeath { creep_id: 1, killer_id: Some(7), respawn_delay: 60.0 },
        );
        assert!(replica.apply(&death, &mut hooks));
        assert!(!replica.apply(&death, &mut hooks));

        assert_eq!(hooks.spawns(), 1);
        assert_eq!(hooks.deaths(), 1);
        assert!(replica.creep(1).unwrap().is_dead());
    }

    #[test]
    fn test_late_damage_does_not_roll_back_health() {
        let mut replica = welcomed();
        let mut hooks = RecordedHooks::default();
        replica.apply(&envelope(2, ServerMessage::CreepSpawn { creep: creep(1) }), &mut hooks);

        let damage = |seq, remaining| {
            envelope(
                seq,
                ServerMessage::DamageEvent {
                    target_id: 1,
                    source_id: Some(7),
                    amount: 10.0,
                    remaining_health: remaining,
                    max_health: 100.0,
                    died: false,
                },
            )
        };

        assert!(replica.apply(&damage(5, 60.0), &mut hooks));
        assert!(!replica.apply(&damage(4, 80.0), &mut hooks));
        assert_eq!(replica.creep(1).unwrap().state.health, 60.0);
    }

    #[test]
    fn test_despawned_creep_is_not_resurrected() {
        let mut replica = welcomed();
        let mut hooks = RecordedHooks::default();
        replica.apply(&envelope(2, ServerMessage::CreepSpawn { creep: creep(1) }), &mut hooks);
        replica.apply(&envelope(3, ServerMessage::CreepDespawn { creep_id: 1 }), &mut hooks);

        // Delayed spawn and a stale snapshot both still mention creep 1.
        replica.apply(&envelope(2, ServerMessage::CreepSpawn { creep: creep(1) }), &mut hooks);
        let snapshot = ServerMessage::WorldState { tick: 1, creeps: vec![creep(1)], players: vec![] };
        replica.apply(&envelope(4, snapshot), &mut hooks);

        assert!(replica.creep(1).is_none());
        assert_eq!(hooks.spawns(), 1);
    }

    #[test]
    fn test_snapshot_does_not_revive_dying_creep() {
        let mut replica = welcomed();
        let mut hooks = RecordedHooks::default();
        replica.apply(&envelope(2, ServerMessage::CreepSpawn { creep: creep(1) }), &mut hooks);
        replica.apply(
            &envelope(3, ServerMessage::CreepDeath { creep_id: 1, killer_id: None, respawn_delay: 5.0 }),
            &mut hooks,
        );

        let snapshot = ServerMessage::WorldState { tick: 1, creeps: vec![creep(1)], players: vec![] };
        replica.apply(&envelope(4, snapshot), &mut hooks);

        let view = replica.creep(1).unwrap();
        assert!(view.is_dead());
        assert_eq!(view.state.behavior, BehaviorState::Dying);
        assert_eq!(replica.live_creeps().count(), 0);
    }

    #[test]
    fn test_reward_is_mirrored_once_for_local_player_only() {
        let mut replica = welcomed();
        let mut hooks = RecordedHooks::default();

        let grant = |beneficiary| RewardGrant {
            kill_id: 11,
            beneficiary,
            experience: 30,
            gold: 5,
            health_restore: 0,
            mana_restore: 0,
        };
        let reward = |beneficiary| ServerMessage::RewardGranted {
            grant: grant(beneficiary),
            level: 2,
            experience: 130,
            gold: 5,
        };

        assert!(!replica.apply(&envelope(2, reward(8)), &mut hooks));
        assert!(replica.last_reward().is_none());

        assert!(replica.apply(&envelope(3, reward(7)), &mut hooks));
        assert!(!replica.apply(&envelope(3, reward(7)), &mut hooks));
        assert_eq!(replica.last_reward().unwrap().level, 2);
        assert_eq!(replica.player(7).unwrap().level, 2);
    }

    #[test]
    fn test_advance_interpolates_toward_snapshot() {
        let mut replica = welcomed();
        let mut hooks = RecordedHooks::default();
        replica.apply(&envelope(2, ServerMessage::CreepSpawn { creep: creep(1) }), &mut hooks);

        let mut moved = creep(1);
        moved.position = [8.0, 0.0, 0.0];
        let snapshot = ServerMessage::WorldState { tick: 1, creeps: vec![moved], players: vec![] };
        replica.apply(&envelope(3, snapshot), &mut hooks);

        replica.advance(1.0);
        assert!((replica.creep(1).unwrap().state.position[0] - 4.0).abs() < 0.001);
        replica.advance(1.0);
        assert!((replica.creep(1).unwrap().state.position[0] - 8.0).abs() < 0.001);
    }

    fn snapshot(seq: u64, creeps: Vec<CreepState>, players: Vec<PlayerState>) -> Envelope {
        envelope(seq, ServerMessage::WorldState { tick: seq, creeps, players })
    }

    #[test]
    fn test_snapshot_settles_missed_death_and_despawn() {
        let mut replica = welcomed();
        let mut hooks = RecordedHooks::default();
        replica.apply(&envelope(2, ServerMessage::CreepSpawn { creep: creep(1) }), &mut hooks);
        replica.apply(&envelope(3, ServerMessage::CreepSpawn { creep: creep(2) }), &mut hooks);

        // The death of 1 and the despawn of 2 were both lost.
        let mut dying = creep(1);
        dying.behavior = BehaviorState::Dying;
        for seq in 4..14 {
            replica.apply(&snapshot(seq, vec![dying.clone()], vec![]), &mut hooks);
        }

        let view = replica.creep(1).unwrap();
        assert!(view.is_dead());
        assert_eq!(view.state.behavior, BehaviorState::Dying);
        assert!(replica.creep(2).is_none());
        assert_eq!(replica.live_creeps().count(), 0);
        assert_eq!(hooks.deaths(), 2);

        // The late despawn of 2 and a late spawn both change nothing.
        assert!(!replica.apply(&envelope(5, ServerMessage::CreepDespawn { creep_id: 2 }), &mut hooks));
        assert!(!replica.apply(&envelope(3, ServerMessage::CreepSpawn { creep: creep(2) }), &mut hooks));

        replica.apply(&snapshot(14, vec![], vec![]), &mut hooks);
        assert_eq!(replica.creep_count(), 0);
        assert_eq!(hooks.deaths(), 2);
    }

    #[test]
    fn test_older_snapshot_keeps_newer_spawn() {
        let mut replica = welcomed();
        let mut hooks = RecordedHooks::default();
        replica.apply(&envelope(5, ServerMessage::CreepSpawn { creep: creep(3) }), &mut hooks);

        replica.apply(&snapshot(4, vec![], vec![]), &mut hooks);
        assert!(replica.creep(3).is_some());

        replica.apply(&snapshot(6, vec![creep(3)], vec![]), &mut hooks);
        assert!(replica.creep(3).is_some());
        assert_eq!(hooks.spawns(), 1);
    }

    #[test]
    fn test_despawn_of_live_creep_presents_death_once() {
        let mut replica = welcomed();
        let mut hooks = RecordedHooks::default();
        replica.apply(&envelope(2, ServerMessage::CreepSpawn { creep: creep(1) }), &mut hooks);

        assert!(replica.apply(&envelope(4, ServerMessage::CreepDespawn { creep_id: 1 }), &mut hooks));
        assert!(!replica.apply(
            &envelope(3, ServerMessage::CreepDeath { creep_id: 1, killer_id: None, respawn_delay: 5.0 }),
            &mut hooks,
        ));
        assert_eq!(hooks.deaths(), 1);
        assert!(replica.creep(1).is_none());
    }

    #[test]
    fn test_reward_memory_is_bounded() {
        let mut replica = welcomed();
        let mut hooks = RecordedHooks::default();
        for kill_id in 0..5_000u64 {
            let grant = RewardGrant {
                kill_id,
                beneficiary: 7,
                experience: 1,
                gold: 0,
                health_restore: 0,
                mana_restore: 0,
            };
            let message = ServerMessage::RewardGranted { grant, level: 1, experience: kill_id, gold: 0 };
            assert!(replica.apply(&envelope(kill_id + 2, message), &mut hooks));
        }
        assert_eq!(replica.remembered_rewards(), REWARD_MEMORY);
        assert_eq!(replica.last_reward().unwrap().grant.kill_id, 4_999);
    }

    #[test]
    fn test_late_player_updates_are_ignored() {
        let mut replica = welcomed();
        let mut hooks = RecordedHooks::default();
        replica.apply(&envelope(2, ServerMessage::PlayerSpawn { player: player(8) }), &mut hooks);

        let hit = |seq, remaining| {
            envelope(
                seq,
                ServerMessage::DamageEvent {
                    target_id: 8,
                    source_id: Some(10_000),
                    amount: 10.0,
                    remaining_health: remaining,
                    max_health: 100.0,
                    died: false,
                },
            )
        };
        assert!(replica.apply(&hit(5, 40.0), &mut hooks));
        assert!(!replica.apply(&hit(4, 90.0), &mut hooks));
        replica.apply(&snapshot(3, vec![], vec![player(8)]), &mut hooks);
        assert_eq!(replica.player(8).unwrap().health, 40);

        assert!(replica.apply(&envelope(6, ServerMessage::PlayerDespawn { id: 8 }), &mut hooks));
        replica.apply(&snapshot(5, vec![], vec![player(8)]), &mut hooks);
        assert!(!replica.apply(&envelope(4, ServerMessage::PlayerRespawned { player: player(8) }), &mut hooks));
        assert!(replica.player(8).is_none());
    }
}
