//! Server configuration: creep archetypes and spawn points.
//!
//! Loaded from a JSON file. When no file is given the server falls back to a
//! small built-in arena so it can always start.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use arena_shared::{CreepArchetype, CreepStats, RewardBlock, DEFAULT_PORT, SERVER_TICK_RATE};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "ARENA_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// One spawn point (creep camp)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnPointConfig {
    pub name: String,
    pub position: [f32; 3],
    /// Archetype names, drawn uniformly
    pub archetypes: Vec<String>,
    /// Maximum simultaneous live units
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Seconds between regular spawns
    #[serde(default = "default_spawn_interval")]
    pub spawn_interval: f64,
    #[serde(default = "default_spawn_radius")]
    pub spawn_radius: f32,
    /// Seconds after a death before the next spawn, unless the archetype overrides it
    #[serde(default = "default_respawn_delay")]
    pub respawn_delay: f64,
}

fn default_capacity() -> usize {
    3
}

fn default_spawn_interval() -> f64 {
    30.0
}

fn default_spawn_radius() -> f32 {
    5.0
}

fn default_respawn_delay() -> f64 {
    60.0
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_tick_rate() -> u32 {
    SERVER_TICK_RATE
}

/// Top-level server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_tick_rate")]
    pub tick_rate: u32,
    /// Fixed RNG seed; random when absent
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub archetypes: Vec<CreepArchetype>,
    #[serde(default)]
    pub spawn_points: Vec<SpawnPointConfig>,
}

impl ServerConfig {
    /// Built-in arena: three camps around the center
    pub fn with_defaults() -> Self {
        let goblin = CreepArchetype {
            level: 1,
            stats: CreepStats {
                max_health: 60.0,
                attack_damage: 8.0,
                attack_speed: 0.8,
                move_speed: 3.0,
                armor: 5.0,
                magic_resistance: 0.0,
                magic_attack: false,
            },
            rewards: RewardBlock { experience: 25, gold: 5, health_restore: 0, mana_restore: 0 },
            ..CreepArchetype::new("goblin")
        };
        let wolf = CreepArchetype {
            level: 2,
            stats: CreepStats {
                max_health: 45.0,
                attack_damage: 10.0,
                attack_speed: 1.2,
                move_speed: 5.0,
                armor: 0.0,
                magic_resistance: 10.0,
                magic_attack: false,
            },
            rewards: RewardBlock { experience: 30, gold: 3, health_restore: 10, mana_restore: 0 },
            aggro_radius: 12.0,
            respawn_delay: Some(45.0),
            ..CreepArchetype::new("wolf")
        };
        let skeleton = CreepArchetype {
            level: 3,
            stats: CreepStats {
                max_health: 90.0,
                attack_damage: 14.0,
                attack_speed: 0.7,
                move_speed: 2.5,
                armor: 25.0,
                magic_resistance: 25.0,
                magic_attack: true,
            },
            rewards: RewardBlock { experience: 60, gold: 12, health_restore: 0, mana_restore: 15 },
            ..CreepArchetype::new("skeleton")
        };

        Self {
            port: DEFAULT_PORT,
            tick_rate: SERVER_TICK_RATE,
            seed: None,
            archetypes: vec![goblin, wolf, skeleton],
            spawn_points: vec![
                SpawnPointConfig {
                    name: "north_camp".to_string(),
                    position: [0.0, 0.0, 30.0],
                    archetypes: vec!["goblin".to_string(), "wolf".to_string()],
                    capacity: default_capacity(),
                    spawn_interval: default_spawn_interval(),
                    spawn_radius: default_spawn_radius(),
                    respawn_delay: default_respawn_delay(),
                },
                SpawnPointConfig {
                    name: "east_den".to_string(),
                    position: [30.0, 0.0, 0.0],
                    archetypes: vec!["wolf".to_string()],
                    capacity: 4,
                    spawn_interval: 20.0,
                    spawn_radius: 6.0,
                    respawn_delay: default_respawn_delay(),
                },
                SpawnPointConfig {
                    name: "crypt".to_string(),
                    position: [-30.0, 0.0, -10.0],
                    archetypes: vec!["skeleton".to_string()],
                    capacity: 2,
                    spawn_interval: 45.0,
                    spawn_radius: 4.0,
                    respawn_delay: 90.0,
                },
            ],
        }
    }

    /// Load and validate a config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&content)?;
        info!(
            "Loaded {} archetypes and {} spawn points from {:?}",
            config.archetypes.len(),
            config.spawn_points.len(),
            path
        );
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Structural checks. Individual archetype stats are checked at spawn
    /// time instead, so one bad archetype never takes the server down.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 {
            return Err(ConfigError::Invalid("tick_rate must be at least 1".to_string()));
        }

        let mut names = HashSet::new();
        for point in &self.spawn_points {
            if !names.insert(point.name.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate spawn point '{}'", point.name)));
            }
            if point.capacity == 0 {
                return Err(ConfigError::Invalid(format!("spawn point '{}' has zero capacity", point.name)));
            }
            if !(point.spawn_interval >= 0.0 && point.respawn_delay >= 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "spawn point '{}' has a negative interval or respawn delay",
                    point.name
                )));
            }
            if !(point.spawn_radius >= 0.0) {
                return Err(ConfigError::Invalid(format!("spawn point '{}' has a negative radius", point.name)));
            }
        }

        let mut archetype_names = HashSet::new();
        for archetype in &self.archetypes {
            if !archetype_names.insert(archetype.name.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate archetype '{}'", archetype.name)));
            }
        }

        Ok(())
    }
}

/// Config path from the first CLI argument, else the environment
pub fn config_path_from_env() -> Option<PathBuf> {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_ENV_VAR).ok())
        .map(PathBuf::from)
}
