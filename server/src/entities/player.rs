//! Server-side player entity.

use arena_shared::{ParticipantId, PlayerState, RewardGrant};

use crate::combat::{self, DamageEvent, DamageOutcome, Defenses};
use crate::rewards::RewardRecipient;

/// Maximum reachable level
pub const MAX_LEVEL: u32 = 30;

/// Melee reach of a player attack
pub const PLAYER_ATTACK_RANGE: f32 = 3.0;

/// Seconds between two player attacks
pub const PLAYER_ATTACK_INTERVAL: f64 = 1.0;

/// Where players enter and respawn
pub const ARENA_SPAWN_POSITION: [f32; 3] = [0.0, 0.0, 0.0];

/// Server-side player state
#[derive(Debug)]
pub struct ServerPlayer {
    /// Runtime id, equal to the controlling participant's id
    pub id: u64,
    pub name: String,
    pub position: [f32; 3],
    pub rotation: f32,
    pub health: u32,
    pub max_health: u32,
    pub mana: u32,
    pub max_mana: u32,
    pub attack_damage: f32,
    pub armor: f32,
    pub level: u32,
    /// Experience gathered toward the next level
    pub experience: u64,
    pub gold: u64,
    /// Participant whose world is authoritative over this player's progression
    pub progression_owner: ParticipantId,
    /// Earliest time the next attack request is honored
    pub attack_ready_at: f64,
}

impl ServerPlayer {
    pub fn new(id: u64, name: String, progression_owner: ParticipantId) -> Self {
        Self {
            id,
            name,
            position: ARENA_SPAWN_POSITION,
            rotation: 0.0,
            health: 100,
            max_health: 100,
            mana: 50,
            max_mana: 50,
            attack_damage: 20.0,
            armor: 5.0,
            level: 1,
            experience: 0,
            gold: 0,
            progression_owner,
            attack_ready_at: 0.0,
        }
    }

    /// Experience required to go from `level` to `level + 1`
    pub fn experience_to_next_level(level: u32) -> u64 {
        100 * (level as u64) * (level as u64)
    }

    /// Check if dead
    pub fn is_dead(&self) -> bool {
        self.health == 0
    }

    /// Resolve an incoming hit through the shared mitigation curve
    pub fn take_damage(&mut self, event: &DamageEvent) -> DamageOutcome {
        let defenses = Defenses { armor: self.armor, magic_resistance: 0.0 };
        let outcome = combat::resolve(self.health as f32, defenses, event);
        self.health = if outcome.died { 0 } else { outcome.remaining_health.ceil() as u32 };
        outcome
    }

    /// Add experience, leveling up as thresholds are crossed. Returns true on level-up.
    pub fn add_experience(&mut self, amount: u64) -> bool {
        self.experience += amount;
        let mut leveled_up = false;

        while self.level < MAX_LEVEL {
            let needed = Self::experience_to_next_level(self.level);
            if self.experience < needed {
                break;
            }
            self.experience -= needed;
            self.level += 1;
            self.max_health += 10;
            self.attack_damage += 2.0;
            self.health = self.max_health;
            leveled_up = true;
        }

        if self.level == MAX_LEVEL {
            self.experience = 0;
        }

        leveled_up
    }

    /// Restore health and mana, clamped to their maxima
    pub fn restore(&mut self, health: u32, mana: u32) {
        self.health = self.health.saturating_add(health).min(self.max_health);
        self.mana = self.mana.saturating_add(mana).min(self.max_mana);
    }

    /// Bring a dead player back at the arena spawn with full health
    pub fn respawn(&mut self) {
        self.position = ARENA_SPAWN_POSITION;
        self.health = self.max_health;
        self.mana = self.max_mana;
    }

    pub fn to_state(&self) -> PlayerState {
        PlayerState {
            id: self.id,
            name: self.name.clone(),
            position: self.position,
            rotation: self.rotation,
            health: self.health,
            max_health: self.max_health,
            mana: self.mana,
            max_mana: self.max_mana,
            level: self.level,
        }
    }
}

impl RewardRecipient for ServerPlayer {
    fn is_alive(&self) -> bool {
        !self.is_dead()
    }

    fn progression_owner(&self) -> ParticipantId {
        self.progression_owner
    }

    fn apply_reward(&mut self, grant: &RewardGrant) -> bool {
        self.gold += grant.gold;
        let leveled_up = self.add_experience(grant.experience);
        self.restore(grant.health_restore, grant.mana_restore);
        leveled_up
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> ServerPlayer {
        ServerPlayer::new(1, "tester".to_string(), 0)
    }

    #[test]
    fn test_level_up_carries_overflow() {
        let mut p = player();
        assert!(p.add_experience(150));
        assert_eq!(p.level, 2);
        assert_eq!(p.experience, 50);
        assert_eq!(p.max_health, 110);
        assert_eq!(p.health, 110);
    }

    #[test]
    fn test_restore_is_clamped() {
        let mut p = player();
        p.health = 90;
        p.mana = 10;
        p.restore(50, 15);
        assert_eq!(p.health, 100);
        assert_eq!(p.mana, 25);
    }

    #[test]
    fn test_damage_uses_armor() {
        let mut p = player();
        p.armor = 100.0;
        let outcome = p.take_damage(&DamageEvent::physical(40.0, Some(10_000)));
        assert!((outcome.amount - 20.0).abs() < 0.0001);
        assert_eq!(p.health, 80);
        assert!(!p.is_dead());
    }

    #[test]
    fn test_lethal_damage_zeroes_health() {
        let mut p = player();
        p.armor = 0.0;
        let outcome = p.take_damage(&DamageEvent::physical(500.0, None));
        assert!(outcome.died);
        assert!(p.is_dead());
        p.respawn();
        assert_eq!(p.health, p.max_health);
    }
}
