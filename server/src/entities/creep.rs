//! Server-side neutral creep with a patrol/combat/dying/dead state machine.
//!
//! Targets are held by id and re-validated against the live hostile list on
//! every tick. Once the death flag is set, no damage, timer or transition
//! touches the creep again except the final Dying -> Dead step.

use log::debug;
use rand::Rng;

use arena_shared::{BehaviorState, CreepArchetype, CreepState, CreepStats, RewardBlock};

use crate::combat::{self, DamageEvent, DamageOutcome, Defenses};
use crate::navigation::{self, distance_xz};
use crate::world::GameClock;

/// Seconds between entering Dying and being removed from simulation
pub const DEATH_ANIMATION_SECS: f64 = 2.0;

/// Distance at which a patrol point counts as reached
const PATROL_ARRIVAL_DISTANCE: f32 = 0.25;

/// Creeps stop chasing at this fraction of their attack radius
const CHASE_STOP_FRACTION: f32 = 0.8;

/// A potential target as seen this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hostile {
    pub id: u64,
    pub position: [f32; 3],
    pub alive: bool,
}

/// An attack the creep wants resolved this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackIntent {
    pub attacker_id: u64,
    pub target_id: u64,
    pub damage: DamageEvent,
}

/// Emitted exactly once, when a creep enters Dying
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeathNotice {
    pub creep_id: u64,
    pub spawn_point: u32,
    /// Source of the killing blow, if it had one
    pub killer: Option<u64>,
    pub respawn_delay: f64,
    pub position: [f32; 3],
}

/// Result of a damage event that was actually applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageReport {
    pub outcome: DamageOutcome,
    pub death: Option<DeathNotice>,
}

/// Server-side creep state
#[derive(Debug)]
pub struct CreepActor {
    pub id: u64,
    pub spawn_point: u32,
    pub archetype: String,
    pub level: u8,
    pub stats: CreepStats,
    pub health: f32,
    pub rewards: RewardBlock,
    pub aggro_radius: f32,
    pub attack_radius: f32,
    pub patrol_radius: f32,
    pub patrol_duration: [f32; 2],
    pub respawn_delay: f64,
    /// Patrol anchor and respawn anchor
    pub origin: [f32; 3],
    pub position: [f32; 3],
    pub rotation: f32,
    pub state: BehaviorState,
    pub target_id: Option<u64>,
    pub attack_ready_at: f64,
    pub patrol_point: [f32; 3],
    pub patrol_deadline: f64,
    pub death_deadline: Option<f64>,
    pub killer_id: Option<u64>,
    dead: bool,
    collidable: bool,
    last_tick: Option<u64>,
}

impl CreepActor {
    /// Instantiate a creep from an archetype at `position`
    pub fn spawn<R: Rng>(
        id: u64,
        spawn_point: u32,
        archetype: &CreepArchetype,
        position: [f32; 3],
        respawn_delay: f64,
        now: f64,
        rng: &mut R,
    ) -> Self {
        let mut creep = Self {
            id,
            spawn_point,
            archetype: archetype.name.clone(),
            level: archetype.level,
            stats: archetype.stats.clone(),
            health: archetype.stats.max_health,
            rewards: archetype.rewards.clone(),
            aggro_radius: archetype.aggro_radius,
            attack_radius: archetype.attack_radius,
            patrol_radius: archetype.patrol_radius,
            patrol_duration: archetype.patrol_duration,
            respawn_delay: archetype.respawn_delay.unwrap_or(respawn_delay),
            origin: position,
            position,
            rotation: 0.0,
            state: BehaviorState::Patrol,
            target_id: None,
            attack_ready_at: now,
            patrol_point: position,
            patrol_deadline: now,
            death_deadline: None,
            killer_id: None,
            dead: false,
            collidable: true,
            last_tick: None,
        };
        creep.pick_patrol_point(now, rng);
        creep
    }

    /// Death flag; set once, never cleared
    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn is_collidable(&self) -> bool {
        self.collidable
    }

    pub fn defenses(&self) -> Defenses {
        Defenses {
            armor: self.stats.armor,
            magic_resistance: self.stats.magic_resistance,
        }
    }

    /// Seconds between two attacks
    pub fn attack_interval(&self) -> f64 {
        1.0 / self.stats.attack_speed.max(f32::EPSILON) as f64
    }

    /// Run one tick of behavior.
    /// Returns an attack to resolve if the creep swung this tick.
    pub fn update<R: Rng>(&mut self, clock: &GameClock, hostiles: &[Hostile], rng: &mut R) -> Option<AttackIntent> {
        if self.dead {
            return None;
        }
        // At most one evaluation per tick.
        if self.last_tick == Some(clock.tick) {
            return None;
        }
        self.last_tick = Some(clock.tick);

        match self.state {
            BehaviorState::Patrol => {
                if let Some(hostile) = self.nearest_hostile(hostiles) {
                    debug!("Creep {} aggroed on {}", self.id, hostile.id);
                    self.state = BehaviorState::Combat;
                    self.target_id = Some(hostile.id);
                    return self.combat_step(clock, hostiles, rng);
                }
                self.patrol_step(clock, rng);
                None
            }
            BehaviorState::Combat => self.combat_step(clock, hostiles, rng),
            BehaviorState::Dying | BehaviorState::Dead => None,
        }
    }

    /// Apply an incoming hit. Returns `None` if the creep is already dying or dead.
    pub fn take_damage(&mut self, event: &DamageEvent, now: f64) -> Option<DamageReport> {
        if self.dead {
            debug!("Creep {} already dead, ignoring damage", self.id);
            return None;
        }

        let outcome = combat::resolve(self.health, self.defenses(), event);
        self.health = outcome.remaining_health;

        if outcome.died {
            let death = self.begin_dying(now, event.source);
            return Some(DamageReport { outcome, death: Some(death) });
        }

        // Retaliate; the target is re-validated on the next tick like any other.
        if self.state == BehaviorState::Patrol {
            if let Some(source) = event.source {
                self.state = BehaviorState::Combat;
                self.target_id = Some(source);
            }
        }

        Some(DamageReport { outcome, death: None })
    }

    /// Dying -> Dead once the death animation window is over
    pub fn finish_dying(&mut self, now: f64) -> bool {
        match (self.state, self.death_deadline) {
            (BehaviorState::Dying, Some(deadline)) if now >= deadline => {
                self.state = BehaviorState::Dead;
                true
            }
            _ => false,
        }
    }

    pub fn to_state(&self) -> CreepState {
        CreepState {
            id: self.id,
            spawn_point: self.spawn_point,
            archetype: self.archetype.clone(),
            level: self.level,
            position: self.position,
            rotation: self.rotation,
            health: self.health,
            max_health: self.stats.max_health,
            move_speed: self.stats.move_speed,
            behavior: self.state,
            target_id: self.target_id,
        }
    }

    fn begin_dying(&mut self, now: f64, killer: Option<u64>) -> DeathNotice {
        self.dead = true;
        self.collidable = false;
        self.state = BehaviorState::Dying;
        self.target_id = None;
        self.killer_id = killer;
        self.death_deadline = Some(now + DEATH_ANIMATION_SECS);
        debug!("Creep {} dying, killer {:?}", self.id, killer);

        DeathNotice {
            creep_id: self.id,
            spawn_point: self.spawn_point,
            killer,
            respawn_delay: self.respawn_delay,
            position: self.position,
        }
    }

    fn combat_step<R: Rng>(&mut self, clock: &GameClock, hostiles: &[Hostile], rng: &mut R) -> Option<AttackIntent> {
        let current = self.target_id.and_then(|id| self.validate_target(id, hostiles));
        let target = match current.or_else(|| self.nearest_hostile(hostiles)) {
            Some(target) => target,
            None => {
                debug!("Creep {} lost its target, back to patrol", self.id);
                self.state = BehaviorState::Patrol;
                self.target_id = None;
                self.pick_patrol_point(clock.now, rng);
                return None;
            }
        };
        self.target_id = Some(target.id);

        let dist = distance_xz(self.position, target.position);
        if dist > self.attack_radius {
            let stop_at = self.attack_radius * CHASE_STOP_FRACTION;
            let travel = (self.stats.move_speed * clock.delta as f32).min(dist - stop_at);
            let step = navigation::step_towards(self.position, target.position, travel, stop_at);
            self.position = step.position;
            if let Some(rotation) = step.rotation {
                self.rotation = rotation;
            }
            return None;
        }

        self.rotation = navigation::heading(self.position, target.position);
        if !clock.has_passed(self.attack_ready_at) {
            return None;
        }
        self.attack_ready_at = clock.now + self.attack_interval();

        let damage = if self.stats.magic_attack {
            DamageEvent::magical(self.stats.attack_damage, Some(self.id))
        } else {
            DamageEvent::physical(self.stats.attack_damage, Some(self.id))
        };
        Some(AttackIntent { attacker_id: self.id, target_id: target.id, damage })
    }

    fn patrol_step<R: Rng>(&mut self, clock: &GameClock, rng: &mut R) {
        if clock.has_passed(self.patrol_deadline) {
            self.pick_patrol_point(clock.now, rng);
        }

        let step = navigation::step_towards(
            self.position,
            self.patrol_point,
            self.stats.move_speed * clock.delta as f32,
            PATROL_ARRIVAL_DISTANCE,
        );
        self.position = step.position;
        if let Some(rotation) = step.rotation {
            self.rotation = rotation;
        }
        if step.arrived {
            self.pick_patrol_point(clock.now, rng);
        }
    }

    fn pick_patrol_point<R: Rng>(&mut self, now: f64, rng: &mut R) {
        self.patrol_point = navigation::sample_disk(self.origin, self.patrol_radius, rng);
        let [a, b] = self.patrol_duration;
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let duration = if hi > lo { rng.gen_range(lo..=hi) } else { lo };
        self.patrol_deadline = now + duration.max(0.0) as f64;
    }

    /// A target is valid if it is still listed, alive, and within aggro range
    fn validate_target(&self, id: u64, hostiles: &[Hostile]) -> Option<Hostile> {
        hostiles
            .iter()
            .find(|h| h.id == id)
            .filter(|h| h.alive && distance_xz(self.position, h.position) <= self.aggro_radius)
            .copied()
    }

    /// Closest live hostile inside aggro range; ties go to the earlier entry
    fn nearest_hostile(&self, hostiles: &[Hostile]) -> Option<Hostile> {
        let mut best: Option<(Hostile, f32)> = None;
        for hostile in hostiles.iter().filter(|h| h.alive) {
            let dist = distance_xz(self.position, hostile.position);
            if dist > self.aggro_radius {
                continue;
            }
            match best {
                Some((_, best_dist)) if dist >= best_dist => {}
                _ => best = Some((*hostile, dist)),
            }
        }
        best.map(|(hostile, _)| hostile)
    }
}
