//! Shared entity definitions.

use serde::{Deserialize, Serialize};

/// Combat stats of a creep archetype
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreepStats {
    pub max_health: f32,
    pub attack_damage: f32,
    /// Attacks per second
    pub attack_speed: f32,
    pub move_speed: f32,
    #[serde(default)]
    pub armor: f32,
    #[serde(default)]
    pub magic_resistance: f32,
    /// Attacks are mitigated by magic resistance instead of armor
    #[serde(default)]
    pub magic_attack: bool,
}

impl Default for CreepStats {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            attack_damage: 10.0,
            attack_speed: 1.0,
            move_speed: 3.0,
            armor: 0.0,
            magic_resistance: 0.0,
            magic_attack: false,
        }
    }
}

/// What the killer of a creep receives
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardBlock {
    #[serde(default)]
    pub experience: u64,
    #[serde(default)]
    pub gold: u64,
    #[serde(default)]
    pub health_restore: u32,
    #[serde(default)]
    pub mana_restore: u32,
}

/// Static definition a creep is instantiated from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreepArchetype {
    pub name: String,
    #[serde(default = "default_level")]
    pub level: u8,
    #[serde(default)]
    pub stats: CreepStats,
    #[serde(default)]
    pub rewards: RewardBlock,
    #[serde(default = "default_aggro_radius")]
    pub aggro_radius: f32,
    #[serde(default = "default_attack_radius")]
    pub attack_radius: f32,
    #[serde(default = "default_patrol_radius")]
    pub patrol_radius: f32,
    /// Min and max seconds before a new patrol point is drawn
    #[serde(default = "default_patrol_duration")]
    pub patrol_duration: [f32; 2],
    /// Overrides the spawn point's respawn delay for units of this archetype
    #[serde(default)]
    pub respawn_delay: Option<f64>,
}

fn default_level() -> u8 {
    1
}

fn default_aggro_radius() -> f32 {
    10.0
}

fn default_attack_radius() -> f32 {
    2.0
}

fn default_patrol_radius() -> f32 {
    6.0
}

fn default_patrol_duration() -> [f32; 2] {
    [3.0, 8.0]
}

impl CreepArchetype {
    /// Archetype with default ranges and stats
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: default_level(),
            stats: CreepStats::default(),
            rewards: RewardBlock::default(),
            aggro_radius: default_aggro_radius(),
            attack_radius: default_attack_radius(),
            patrol_radius: default_patrol_radius(),
            patrol_duration: default_patrol_duration(),
            respawn_delay: None,
        }
    }
}

/// Behavior state of a creep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BehaviorState {
    #[default]
    Patrol,
    Combat,
    Dying,
    Dead,
}

impl BehaviorState {
    /// Dying or dead; nothing leads back out
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Dying | Self::Dead)
    }
}

/// Creep state for spawn messages and world updates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreepState {
    pub id: u64,
    pub spawn_point: u32,
    pub archetype: String,
    pub level: u8,
    pub position: [f32; 3],
    pub rotation: f32,
    pub health: f32,
    pub max_health: f32,
    pub move_speed: f32,
    pub behavior: BehaviorState,
    pub target_id: Option<u64>,
}

/// Player state for world updates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: u64,
    pub name: String,
    pub position: [f32; 3],
    pub rotation: f32,
    pub health: u32,
    pub max_health: u32,
    pub mana: u32,
    pub max_mana: u32,
    pub level: u32,
}

/// A kill reward addressed to one beneficiary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardGrant {
    /// The creep whose death produced this grant; one grant per kill
    pub kill_id: u64,
    pub beneficiary: u64,
    pub experience: u64,
    pub gold: u64,
    pub health_restore: u32,
    pub mana_restore: u32,
}

impl RewardGrant {
    pub fn from_block(kill_id: u64, beneficiary: u64, block: &RewardBlock) -> Self {
        Self {
            kill_id,
            beneficiary,
            experience: block.experience,
            gold: block.gold,
            health_restore: block.health_restore,
            mana_restore: block.mana_restore,
        }
    }
}
