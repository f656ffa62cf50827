//! Death notification routing from creeps to the spawn point that owns them.

use std::collections::HashMap;

use log::debug;

/// Creep id -> owning spawn point id.
///
/// A subscription is consumed by the first death notification, so a
/// redelivered death finds nothing and is dropped.
#[derive(Debug, Default)]
pub struct DeathSubscriptions {
    by_creep: HashMap<u64, u32>,
}

impl DeathSubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, creep_id: u64, spawn_point: u32) {
        if let Some(previous) = self.by_creep.insert(creep_id, spawn_point) {
            debug!(
                "Creep {} resubscribed from spawn point {} to {}",
                creep_id, previous, spawn_point
            );
        }
    }

    /// Consume the subscription for a death notification
    pub fn take(&mut self, creep_id: u64) -> Option<u32> {
        self.by_creep.remove(&creep_id)
    }

    /// Drop the subscription of a destroyed unit
    pub fn unsubscribe(&mut self, creep_id: u64) -> bool {
        self.by_creep.remove(&creep_id).is_some()
    }

    /// Drop every subscription held by a spawn point. Returns the creep ids released.
    pub fn unsubscribe_spawn_point(&mut self, spawn_point: u32) -> Vec<u64> {
        let mut released: Vec<u64> = self
            .by_creep
            .iter()
            .filter(|(_, &owner)| owner == spawn_point)
            .map(|(&creep, _)| creep)
            .collect();
        released.sort_unstable();
        for creep in &released {
            self.by_creep.remove(creep);
        }
        released
    }

    #[cfg(test)]
    pub fn is_subscribed(&self, creep_id: u64) -> bool {
        self.by_creep.contains_key(&creep_id)
    }

    pub fn clear(&mut self) {
        self.by_creep.clear();
    }

    pub fn len(&self) -> usize {
        self.by_creep.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_creep.is_empty()
    }
}
