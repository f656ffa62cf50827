//! Game world management.
//!
//! The world owns every player, creep and spawn point and advances them once
//! per tick. All outcomes (spawns, hits, deaths, rewards) are decided here on
//! the authority and handed to the [`AuthorityCoordinator`] for delivery.

mod archetypes;
mod clock;
mod spawn_point;
mod subscriptions;

pub use archetypes::ArchetypeCatalog;
pub use clock::GameClock;
pub use spawn_point::{SpawnPoint, SpawnRequest};
pub use subscriptions::DeathSubscriptions;

use std::collections::HashMap;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use arena_shared::{
    AuthorityCoordinator, BroadcastTarget, CreepState, ParticipantId, PlayerState, PresentationHooks, RewardGrant,
    ServerMessage,
};

use crate::combat::{DamageEvent, DamageOutcome};
use crate::config::ServerConfig;
use crate::entities::creep::{AttackIntent, CreepActor, DeathNotice, Hostile};
use crate::entities::player::{ServerPlayer, PLAYER_ATTACK_INTERVAL, PLAYER_ATTACK_RANGE};
use crate::navigation::distance_xz;
use crate::rewards::{GrantOutcome, RewardLedger};

/// Creep ids start high so they never collide with player ids
const FIRST_CREEP_ID: u64 = 10_000;

/// The game world containing all entities
pub struct GameWorld {
    clock: GameClock,
    players: HashMap<u64, ServerPlayer>,
    creeps: HashMap<u64, CreepActor>,
    spawn_points: Vec<SpawnPoint>,
    catalog: ArchetypeCatalog,
    subscriptions: DeathSubscriptions,
    ledger: RewardLedger,
    /// Participant that owns player progression in this world
    local: ParticipantId,
    rng: StdRng,
    next_creep_id: u64,
    hooks: Box<dyn PresentationHooks + Send>,
}

impl GameWorld {
    pub fn new(config: &ServerConfig, local: ParticipantId, hooks: Box<dyn PresentationHooks + Send>) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let spawn_points: Vec<SpawnPoint> = config
            .spawn_points
            .iter()
            .enumerate()
            .map(|(index, point)| SpawnPoint::from_config(index as u32 + 1, point))
            .collect();

        info!(
            "World created with {} archetypes and {} spawn points",
            config.archetypes.len(),
            spawn_points.len()
        );

        Self {
            clock: GameClock::new(),
            players: HashMap::new(),
            creeps: HashMap::new(),
            spawn_points,
            catalog: ArchetypeCatalog::new(config.archetypes.clone()),
            subscriptions: DeathSubscriptions::new(),
            ledger: RewardLedger::new(local),
            local,
            rng,
            next_creep_id: FIRST_CREEP_ID,
            hooks,
        }
    }

    /// Update the world (called every tick).
    /// Non-authority worlds only keep time.
    pub fn update(&mut self, delta: f64, authority: &mut AuthorityCoordinator) {
        self.clock.advance(delta);
        if !authority.is_authority() {
            return;
        }

        self.run_spawn_points(authority);
        self.update_creeps(authority);
        self.finish_dying_creeps(authority);
    }

    fn run_spawn_points(&mut self, authority: &mut AuthorityCoordinator) {
        let now = self.clock.now;
        for index in 0..self.spawn_points.len() {
            let creeps = &self.creeps;
            let is_live = |id: u64| creeps.get(&id).map_or(false, |c| !c.is_dead());
            let request = self.spawn_points[index].tick(now, authority, is_live, &mut self.rng);
            if let Some(request) = request {
                self.spawn_creep(index, request, authority);
            }
        }
    }

    fn spawn_creep(&mut self, index: usize, request: SpawnRequest, authority: &mut AuthorityCoordinator) {
        let now = self.clock.now;
        let point = &mut self.spawn_points[index];

        let archetype = match self.catalog.resolve(&request.archetype) {
            Ok(archetype) => archetype,
            Err(err) => {
                point.report_failure(err);
                return;
            }
        };

        let id = self.next_creep_id;
        if let Err(err) = point.register(id, now) {
            point.report_failure(err);
            return;
        }
        self.next_creep_id += 1;

        let creep = CreepActor::spawn(
            id,
            point.id,
            archetype,
            request.position,
            point.respawn_delay,
            now,
            &mut self.rng,
        );
        self.subscriptions.subscribe(id, point.id);
        info!("Spawned {} #{} at '{}'", creep.archetype, id, point.name);

        let state = creep.to_state();
        self.hooks.on_spawn(&state);
        self.creeps.insert(id, creep);
        emit(authority, ServerMessage::CreepSpawn { creep: state }, BroadcastTarget::All);
    }

    fn update_creeps(&mut self, authority: &mut AuthorityCoordinator) {
        let mut hostiles: Vec<Hostile> = self
            .players
            .values()
            .map(|p| Hostile { id: p.id, position: p.position, alive: !p.is_dead() })
            .collect();
        hostiles.sort_by_key(|h| h.id);

        let mut ids: Vec<u64> = self.creeps.keys().copied().collect();
        ids.sort_unstable();

        let mut intents = Vec::new();
        for id in ids {
            if let Some(creep) = self.creeps.get_mut(&id) {
                if let Some(intent) = creep.update(&self.clock, &hostiles, &mut self.rng) {
                    intents.push(intent);
                }
            }
        }

        for intent in intents {
            self.resolve_creep_attack(intent, authority);
        }
    }

    fn resolve_creep_attack(&mut self, intent: AttackIntent, authority: &mut AuthorityCoordinator) {
        let Some(player) = self.players.get_mut(&intent.target_id) else {
            debug!("Creep {} attacked missing player {}", intent.attacker_id, intent.target_id);
            return;
        };
        if player.is_dead() {
            return;
        }

        self.hooks.on_attack(intent.attacker_id, intent.target_id);
        emit(
            authority,
            ServerMessage::CreepAttack { creep_id: intent.attacker_id, target_id: intent.target_id },
            BroadcastTarget::All,
        );

        let outcome = player.take_damage(&intent.damage);
        self.hooks.health_bar(player.id, player.health as f32, player.max_health as f32);
        emit(
            authority,
            ServerMessage::DamageEvent {
                target_id: player.id,
                source_id: Some(intent.attacker_id),
                amount: outcome.amount,
                remaining_health: player.health as f32,
                max_health: player.max_health as f32,
                died: outcome.died,
            },
            BroadcastTarget::All,
        );

        if outcome.died {
            info!("Player {} was killed by creep {}", player.id, intent.attacker_id);
        }
    }

    fn finish_dying_creeps(&mut self, authority: &mut AuthorityCoordinator) {
        let now = self.clock.now;
        let mut finished: Vec<u64> = self
            .creeps
            .values_mut()
            .filter_map(|creep| creep.finish_dying(now).then_some(creep.id))
            .collect();
        finished.sort_unstable();

        for id in finished {
            self.despawn_creep(id, authority);
        }
    }

    fn despawn_creep(&mut self, id: u64, authority: &mut AuthorityCoordinator) {
        if self.creeps.remove(&id).is_none() {
            return;
        }
        self.subscriptions.unsubscribe(id);
        debug!("Creep {} removed from simulation", id);
        emit(authority, ServerMessage::CreepDespawn { creep_id: id }, BroadcastTarget::All);
    }

    /// Apply a damage event to a creep.
    ///
    /// Returns `None` when nothing was applied: not the authority, unknown
    /// creep, or the creep is already dying.
    pub fn apply_damage(
        &mut self,
        creep_id: u64,
        event: DamageEvent,
        authority: &mut AuthorityCoordinator,
    ) -> Option<DamageOutcome> {
        if !authority.is_authority() {
            warn!("Participant {} may not apply damage to creep {}", authority.local_id(), creep_id);
            return None;
        }

        let now = self.clock.now;
        let creep = self.creeps.get_mut(&creep_id)?;
        let report = creep.take_damage(&event, now)?;
        let max_health = creep.stats.max_health;

        self.hooks.health_bar(creep_id, report.outcome.remaining_health, max_health);
        emit(
            authority,
            ServerMessage::DamageEvent {
                target_id: creep_id,
                source_id: event.source,
                amount: report.outcome.amount,
                remaining_health: report.outcome.remaining_health,
                max_health,
                died: report.outcome.died,
            },
            BroadcastTarget::All,
        );

        if let Some(death) = report.death {
            self.handle_death(death, authority);
        }
        Some(report.outcome)
    }

    fn handle_death(&mut self, death: DeathNotice, authority: &mut AuthorityCoordinator) {
        info!("Creep {} died, killer {:?}", death.creep_id, death.killer);
        self.hooks.on_death(death.creep_id, death.position);

        match death.killer {
            Some(killer) => self.grant_kill_reward(death.creep_id, killer, authority),
            None => debug!("Creep {} had no killer, no reward", death.creep_id),
        }

        match self.subscriptions.take(death.creep_id) {
            Some(point_id) => {
                let now = self.clock.now;
                if let Some(point) = self.spawn_points.iter_mut().find(|p| p.id == point_id) {
                    point.on_unit_death(death.creep_id, death.respawn_delay, now, authority);
                }
            }
            None => debug!("Death of creep {} has no subscriber", death.creep_id),
        }

        emit(
            authority,
            ServerMessage::CreepDeath {
                creep_id: death.creep_id,
                killer_id: death.killer,
                respawn_delay: death.respawn_delay,
            },
            BroadcastTarget::All,
        );
    }

    fn grant_kill_reward(&mut self, creep_id: u64, killer: u64, authority: &mut AuthorityCoordinator) {
        let Some(block) = self.creeps.get(&creep_id).map(|c| c.rewards.clone()) else {
            return;
        };
        let grant = RewardGrant::from_block(creep_id, killer, &block);

        match self.ledger.grant(&grant, self.players.get_mut(&killer)) {
            GrantOutcome::Applied { leveled_up } => {
                let Some(player) = self.players.get(&killer) else {
                    return;
                };
                if leveled_up {
                    info!("Player {} reached level {}", player.id, player.level);
                }
                let message = ServerMessage::RewardGranted {
                    grant,
                    level: player.level,
                    experience: player.experience,
                    gold: player.gold,
                };
                emit(authority, message, BroadcastTarget::Owner(killer));
            }
            GrantOutcome::Duplicate | GrantOutcome::Unresolved => {}
        }
    }

    /// A player swings at a creep. Range-checked and rate-limited.
    pub fn player_attack(
        &mut self,
        player_id: u64,
        target_id: u64,
        authority: &mut AuthorityCoordinator,
    ) -> Option<DamageOutcome> {
        if !authority.is_authority() {
            return None;
        }
        let now = self.clock.now;
        let player = self.players.get_mut(&player_id)?;
        if player.is_dead() {
            return None;
        }
        if now < player.attack_ready_at {
            debug!("Player {} attacked too soon", player_id);
            return None;
        }
        let creep = self.creeps.get(&target_id)?;
        if !creep.is_collidable() {
            return None;
        }
        if distance_xz(player.position, creep.position) > PLAYER_ATTACK_RANGE {
            debug!("Attack from player {} on creep {} out of range", player_id, target_id);
            return None;
        }

        player.attack_ready_at = now + PLAYER_ATTACK_INTERVAL;
        let event = DamageEvent::physical(player.attack_damage, Some(player_id));
        self.apply_damage(target_id, event, authority)
    }

    /// Spawn a player for a joining participant
    pub fn add_player(&mut self, id: u64, name: String) -> PlayerState {
        let player = ServerPlayer::new(id, name, self.local);
        let state = player.to_state();
        self.players.insert(id, player);
        state
    }

    pub fn remove_player(&mut self, id: u64) -> bool {
        self.players.remove(&id).is_some()
    }

    /// Update player state from client input
    pub fn update_player_position(&mut self, id: u64, position: [f32; 3], rotation: f32) {
        if let Some(player) = self.players.get_mut(&id) {
            if player.is_dead() {
                return;
            }
            player.position = position;
            player.rotation = rotation;
        }
    }

    /// Bring a dead player back. Returns `None` if the player is alive or unknown.
    pub fn respawn_player(&mut self, id: u64) -> Option<PlayerState> {
        let player = self.players.get_mut(&id)?;
        if !player.is_dead() {
            return None;
        }
        player.respawn();
        info!("Player {} respawned", id);
        Some(player.to_state())
    }

    /// Every creep still in simulation, ordered by id
    pub fn creep_states(&self) -> Vec<CreepState> {
        let mut creeps: Vec<CreepState> = self.creeps.values().map(|c| c.to_state()).collect();
        creeps.sort_by_key(|c| c.id);
        creeps
    }

    pub fn player_states(&self) -> Vec<PlayerState> {
        let mut players: Vec<PlayerState> = self.players.values().map(|p| p.to_state()).collect();
        players.sort_by_key(|p| p.id);
        players
    }

    /// Full world snapshot for this tick
    pub fn snapshot(&self) -> ServerMessage {
        ServerMessage::WorldState {
            tick: self.clock.tick,
            creeps: self.creep_states(),
            players: self.player_states(),
        }
    }

    /// Tear down a spawn point and every death subscription it holds.
    /// Its creeps keep living but no longer feed its schedule.
    pub fn remove_spawn_point(&mut self, id: u32) -> bool {
        let Some(index) = self.spawn_points.iter().position(|p| p.id == id) else {
            return false;
        };
        let point = self.spawn_points.remove(index);
        let released = self.subscriptions.unsubscribe_spawn_point(id);
        info!("Removed spawn point '{}', released {} subscriptions", point.name, released.len());
        true
    }

    /// Remove every spawn point and its subscriptions; first step of server teardown
    pub fn shutdown(&mut self) {
        info!(
            "World shutting down with {} creeps and {} players",
            self.creeps.len(),
            self.players.len()
        );
        let ids: Vec<u32> = self.spawn_points.iter().map(|p| p.id).collect();
        for id in ids {
            self.remove_spawn_point(id);
        }
        if !self.subscriptions.is_empty() {
            debug!("Dropping {} orphaned death subscriptions", self.subscriptions.len());
            self.subscriptions.clear();
        }
    }
}

#[cfg(test)]
impl GameWorld {
    pub fn clock(&self) -> &GameClock {
        &self.clock
    }

    pub fn creep(&self, id: u64) -> Option<&CreepActor> {
        self.creeps.get(&id)
    }

    pub fn creep_count(&self) -> usize {
        self.creeps.len()
    }

    pub fn player(&self, id: u64) -> Option<&ServerPlayer> {
        self.players.get(&id)
    }

    pub fn player_mut(&mut self, id: u64) -> Option<&mut ServerPlayer> {
        self.players.get_mut(&id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn spawn_point(&self, id: u32) -> Option<&SpawnPoint> {
        self.spawn_points.iter().find(|p| p.id == id)
    }

    pub fn spawn_point_mut(&mut self, id: u32) -> Option<&mut SpawnPoint> {
        self.spawn_points.iter_mut().find(|p| p.id == id)
    }

    pub fn subscriptions(&self) -> &DeathSubscriptions {
        &self.subscriptions
    }
}

/// Queue a decision, logging if the coordinator refuses it
fn emit(authority: &mut AuthorityCoordinator, message: ServerMessage, target: BroadcastTarget) {
    if let Err(err) = authority.broadcast(message, target) {
        warn!("Dropped world event: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::archetypes::SpawnError;
    use super::*;
    use crate::config::SpawnPointConfig;
    use crate::entities::creep::DEATH_ANIMATION_SECS;
    use arena_shared::{BehaviorState, CreepArchetype, CreepStats, NoPresentation, Outbound, RewardBlock};

    fn config() -> ServerConfig {
        let mut dummy = CreepArchetype::new("dummy");
        dummy.stats = CreepStats {
            max_health: 100.0,
            attack_damage: 10.0,
            attack_speed: 1.0,
            move_speed: 0.0,
            armor: 0.0,
            magic_resistance: 0.0,
            magic_attack: false,
        };
        dummy.rewards = RewardBlock { experience: 50, gold: 7, health_restore: 0, mana_restore: 0 };
        dummy.patrol_radius = 0.0;

        ServerConfig {
            seed: Some(42),
            archetypes: vec![dummy],
            spawn_points: vec![SpawnPointConfig {
                name: "pit".to_string(),
                position: [0.0, 0.0, 0.0],
                archetypes: vec!["dummy".to_string()],
                capacity: 1,
                spawn_interval: 30.0,
                spawn_radius: 0.0,
                respawn_delay: 60.0,
            }],
            ..ServerConfig::with_defaults()
        }
    }

    fn world() -> (GameWorld, AuthorityCoordinator) {
        let world = GameWorld::new(&config(), 0, Box::new(NoPresentation));
        (world, AuthorityCoordinator::authority(0))
    }

    fn count(messages: &[Outbound], pred: impl Fn(&ServerMessage) -> bool) -> usize {
        messages.iter().filter(|o| pred(&o.envelope.message)).count()
    }

    #[test]
    fn test_lethal_hit_dies_once_and_schedules_respawn() {
        let (mut world, mut authority) = world();
        world.update(0.25, &mut authority);
        assert_eq!(world.creep_count(), 1);
        let creep_id = FIRST_CREEP_ID;

        world.add_player(1, "hero".to_string());
        world.update_player_position(1, [50.0, 0.0, 50.0], 0.0);
        authority.drain_outbox();

        let outcome = world
            .apply_damage(creep_id, DamageEvent::physical(120.0, Some(1)), &mut authority)
            .unwrap();
        assert!(outcome.died);
        assert_eq!(world.creep(creep_id).unwrap().state, BehaviorState::Dying);
        assert_eq!(world.spawn_point(1).unwrap().next_spawn_at(), 0.25 + 60.0);

        // Redelivered hits are no-ops.
        assert!(world
            .apply_damage(creep_id, DamageEvent::physical(120.0, Some(1)), &mut authority)
            .is_none());

        let out = authority.drain_outbox();
        assert_eq!(count(&out, |m| matches!(m, ServerMessage::CreepDeath { .. })), 1);
        assert_eq!(count(&out, |m| matches!(m, ServerMessage::RewardGranted { .. })), 1);
        let reward = out
            .iter()
            .find(|o| matches!(o.envelope.message, ServerMessage::RewardGranted { .. }))
            .unwrap();
        assert_eq!(reward.target, BroadcastTarget::Owner(1));
        assert_eq!(world.player(1).unwrap().gold, 7);
        assert_eq!(world.player(1).unwrap().experience, 50);

        world.update(1.0, &mut authority);
        assert!(world.creep(creep_id).is_some());
        world.update(DEATH_ANIMATION_SECS - 1.0, &mut authority);
        assert!(world.creep(creep_id).is_none());
        assert!(!world.subscriptions().is_subscribed(creep_id));
        let out = authority.drain_outbox();
        assert_eq!(count(&out, |m| matches!(m, ServerMessage::CreepDespawn { .. })), 1);

        // Now at 2.25; nothing until 60.25.
        world.update(57.0, &mut authority);
        assert_eq!(world.creep_count(), 0);
        world.update(1.0, &mut authority);
        assert_eq!(world.creep_count(), 1);
        assert!(world.creep(creep_id + 1).is_some());
    }

    #[test]
    fn test_kill_without_killer_grants_nothing() {
        let (mut world, mut authority) = world();
        world.update(0.25, &mut authority);
        world.add_player(1, "hero".to_string());
        world.update_player_position(1, [50.0, 0.0, 50.0], 0.0);
        authority.drain_outbox();

        world.apply_damage(FIRST_CREEP_ID, DamageEvent::magical(500.0, None), &mut authority);
        let out = authority.drain_outbox();
        assert_eq!(count(&out, |m| matches!(m, ServerMessage::RewardGranted { .. })), 0);
        assert_eq!(count(&out, |m| matches!(m, ServerMessage::CreepDeath { killer_id: None, .. })), 1);
        assert_eq!(world.player(1).unwrap().gold, 0);
        assert_eq!(world.spawn_point(1).unwrap().next_spawn_at(), 60.25);
    }

    #[test]
    fn test_capacity_is_never_exceeded() {
        let (mut world, mut authority) = world();
        for _ in 0..200 {
            world.update(1.0, &mut authority);
            assert!(world.spawn_point(1).unwrap().live_count() <= 1);
            assert!(world.creep_count() <= 1);
        }
    }

    #[test]
    fn test_creep_attacks_nearby_player() {
        let (mut world, mut authority) = world();
        world.add_player(1, "hero".to_string());
        world.update_player_position(1, [1.0, 0.0, 0.0], 0.0);

        for _ in 0..4 {
            world.update(0.5, &mut authority);
        }
        let player = world.player(1).unwrap();
        assert!(player.health < player.max_health);
        let out = authority.drain_outbox();
        assert!(count(&out, |m| matches!(m, ServerMessage::CreepAttack { target_id: 1, .. })) >= 1);
        assert!(count(&out, |m| matches!(m, ServerMessage::DamageEvent { target_id: 1, .. })) >= 1);
    }

    #[test]
    fn test_player_attack_checks_range_and_cooldown() {
        let (mut world, mut authority) = world();
        world.update(0.25, &mut authority);
        world.add_player(1, "hero".to_string());
        world.update_player_position(1, [1.0, 0.0, 0.0], 0.0);

        let hit = world.player_attack(1, FIRST_CREEP_ID, &mut authority).unwrap();
        assert_eq!(hit.remaining_health, 80.0);
        assert!(world.player_attack(1, FIRST_CREEP_ID, &mut authority).is_none());

        world.update(1.0, &mut authority);
        assert!(world.player_attack(1, FIRST_CREEP_ID, &mut authority).is_some());

        world.update(1.0, &mut authority);
        world.update_player_position(1, [10.0, 0.0, 0.0], 0.0);
        assert!(world.player_attack(1, FIRST_CREEP_ID, &mut authority).is_none());
    }

    #[test]
    fn test_replica_world_decides_nothing() {
        let mut world = GameWorld::new(&config(), 2, Box::new(NoPresentation));
        let mut replica = AuthorityCoordinator::replica(2, 0);
        world.update(1.0, &mut replica);
        assert_eq!(world.creep_count(), 0);
        assert!(world.apply_damage(FIRST_CREEP_ID, DamageEvent::physical(10.0, None), &mut replica).is_none());
        assert_eq!(replica.pending(), 0);
        assert_eq!(world.clock().tick, 1);
    }

    #[test]
    fn test_removed_spawn_point_drops_subscriptions() {
        let (mut world, mut authority) = world();
        world.update(0.25, &mut authority);
        assert!(world.subscriptions().is_subscribed(FIRST_CREEP_ID));

        assert!(world.remove_spawn_point(1));
        assert!(!world.subscriptions().is_subscribed(FIRST_CREEP_ID));
        assert!(!world.remove_spawn_point(1));

        // The orphan still dies cleanly.
        let outcome = world.apply_damage(FIRST_CREEP_ID, DamageEvent::physical(500.0, None), &mut authority);
        assert!(outcome.unwrap().died);
    }

    #[test]
    fn test_dead_player_respawns_on_request() {
        let (mut world, _) = world();
        world.add_player(1, "hero".to_string());
        assert!(world.respawn_player(1).is_none());

        world.player_mut(1).unwrap().health = 0;
        let state = world.respawn_player(1).unwrap();
        assert_eq!(state.health, state.max_health);
    }

    #[test]
    fn test_unresolvable_archetypes_are_reported_once_and_retried() {
        let mut config = config();
        config.spawn_points[0].archetypes = vec!["ghost".to_string(), "phantom".to_string()];
        let mut world = GameWorld::new(&config, 0, Box::new(NoPresentation));
        let mut authority = AuthorityCoordinator::authority(0);

        for _ in 0..200 {
            world.update(0.05, &mut authority);
        }
        assert_eq!(world.creep_count(), 0);
        let point = world.spawn_point(1).unwrap();
        assert_eq!(point.reported_count(), 2);
        assert!(point.has_reported(&SpawnError::UnknownArchetype("ghost".to_string())));
        assert!(point.has_reported(&SpawnError::UnknownArchetype("phantom".to_string())));
        assert_eq!(point.next_spawn_at(), 0.0);
        assert_eq!(count(&authority.drain_outbox(), |m| matches!(m, ServerMessage::CreepSpawn { .. })), 0);

        world.spawn_point_mut(1).unwrap().set_archetypes(vec!["dummy".to_string()]);
        world.update(0.05, &mut authority);
        assert_eq!(world.creep_count(), 1);
        let point = world.spawn_point(1).unwrap();
        assert_eq!(point.reported_count(), 0);
        assert!(point.next_spawn_at() > 10.0);
    }

    #[test]
    fn test_malformed_archetype_never_spawns() {
        let mut config = config();
        config.archetypes[0].stats.attack_speed = 0.0;
        let mut world = GameWorld::new(&config, 0, Box::new(NoPresentation));
        let mut authority = AuthorityCoordinator::authority(0);

        for _ in 0..20 {
            world.update(1.0, &mut authority);
        }
        assert_eq!(world.creep_count(), 0);
        let point = world.spawn_point(1).unwrap();
        assert_eq!(point.reported_count(), 1);
        assert!(!world.subscriptions().is_subscribed(FIRST_CREEP_ID));
    }

    #[test]
    fn test_shutdown_releases_every_subscription() {
        let (mut world, mut authority) = world();
        world.update(0.25, &mut authority);
        assert!(world.subscriptions().is_subscribed(FIRST_CREEP_ID));

        world.shutdown();
        assert!(world.subscriptions().is_empty());
        assert!(world.spawn_point(1).is_none());
    }
}
