//! Archetype lookup for spawn points.

use std::collections::HashMap;

use thiserror::Error;

use arena_shared::CreepArchetype;

/// Why a spawn attempt produced no unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum SpawnError {
    #[error("spawn point has no archetypes configured")]
    EmptyArchetypeSet,
    #[error("unknown archetype '{0}'")]
    UnknownArchetype(String),
    #[error("archetype '{name}' is malformed: {reason}")]
    MalformedArchetype { name: String, reason: String },
    #[error("spawn point is at capacity ({0})")]
    AtCapacity(usize),
}

/// All archetypes known to the world, keyed by name
#[derive(Debug, Default)]
pub struct ArchetypeCatalog {
    archetypes: HashMap<String, CreepArchetype>,
}

impl ArchetypeCatalog {
    pub fn new(archetypes: Vec<CreepArchetype>) -> Self {
        Self {
            archetypes: archetypes.into_iter().map(|a| (a.name.clone(), a)).collect(),
        }
    }

    /// Look up an archetype and check that it can actually be spawned
    pub fn resolve(&self, name: &str) -> Result<&CreepArchetype, SpawnError> {
        let archetype = self
            .archetypes
            .get(name)
            .ok_or_else(|| SpawnError::UnknownArchetype(name.to_string()))?;
        validate(archetype)?;
        Ok(archetype)
    }

    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }
}

fn validate(archetype: &CreepArchetype) -> Result<(), SpawnError> {
    let stats = &archetype.stats;
    let reason = if !(stats.max_health > 0.0) {
        "max_health must be positive"
    } else if !(stats.attack_speed > 0.0) {
        "attack_speed must be positive"
    } else if !(stats.move_speed >= 0.0) {
        "move_speed must not be negative"
    } else if !(archetype.patrol_radius >= 0.0) {
        "patrol_radius must not be negative"
    } else if !(archetype.aggro_radius >= archetype.attack_radius) {
        "aggro_radius must be at least attack_radius"
    } else {
        return Ok(());
    };

    Err(SpawnError::MalformedArchetype {
        name: archetype.name.clone(),
        reason: reason.to_string(),
    })
}
