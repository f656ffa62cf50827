//! Spawn points: bounded creep populations around a fixed camp.
//!
//! A spawn point keeps its live set at or under capacity, spawns one unit per
//! eligible tick, and lets a dying unit's respawn delay decide when the next
//! one appears. Only the authority ever mutates it.

use std::collections::HashSet;

use log::{debug, error, info, warn};
use rand::Rng;

use arena_shared::AuthorityCoordinator;

use crate::config::SpawnPointConfig;
use crate::navigation;

use super::archetypes::SpawnError;

/// A spawn the world should carry out this tick
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    pub spawn_point: u32,
    pub archetype: String,
    pub position: [f32; 3],
}

/// A creep camp
#[derive(Debug)]
pub struct SpawnPoint {
    pub id: u32,
    pub name: String,
    pub position: [f32; 3],
    pub capacity: usize,
    /// Seconds between regular spawns
    pub spawn_interval: f64,
    pub spawn_radius: f32,
    /// Default delay after a death, unless the unit's archetype overrides it
    pub respawn_delay: f64,
    archetypes: Vec<String>,
    live: Vec<u64>,
    next_spawn_at: f64,
    /// Failures already logged; cleared on the next successful spawn
    reported: HashSet<SpawnError>,
}

impl SpawnPoint {
    pub fn from_config(id: u32, config: &SpawnPointConfig) -> Self {
        Self {
            id,
            name: config.name.clone(),
            position: config.position,
            capacity: config.capacity,
            spawn_interval: config.spawn_interval,
            spawn_radius: config.spawn_radius,
            respawn_delay: config.respawn_delay,
            archetypes: config.archetypes.clone(),
            live: Vec::new(),
            next_spawn_at: 0.0,
            reported: HashSet::new(),
        }
    }

    /// Decide whether to spawn this tick.
    ///
    /// `is_live` tells whether a previously registered unit still exists;
    /// units it rejects are pruned before the capacity check.
    pub fn tick<F, R>(
        &mut self,
        now: f64,
        authority: &AuthorityCoordinator,
        is_live: F,
        rng: &mut R,
    ) -> Option<SpawnRequest>
    where
        F: Fn(u64) -> bool,
        R: Rng,
    {
        if !authority.is_authority() {
            return None;
        }

        let before = self.live.len();
        self.live.retain(|&id| is_live(id));
        if self.live.len() != before {
            debug!(
                "Spawn point '{}' pruned {} destroyed units",
                self.name,
                before - self.live.len()
            );
        }

        if self.live.len() >= self.capacity || now < self.next_spawn_at {
            return None;
        }

        if self.archetypes.is_empty() {
            self.report_failure(SpawnError::EmptyArchetypeSet);
            return None;
        }

        let archetype = self.archetypes[rng.gen_range(0..self.archetypes.len())].clone();
        let position = navigation::sample_disk(self.position, self.spawn_radius, rng);

        Some(SpawnRequest {
            spawn_point: self.id,
            archetype,
            position,
        })
    }

    /// Record a unit spawned on behalf of this point and restart the interval
    pub fn register(&mut self, creep_id: u64, now: f64) -> Result<(), SpawnError> {
        if self.live.len() >= self.capacity {
            return Err(SpawnError::AtCapacity(self.capacity));
        }
        self.live.push(creep_id);
        self.next_spawn_at = now + self.spawn_interval;
        if !self.reported.is_empty() {
            info!(
                "Spawn point '{}' spawned again after {} reported failures",
                self.name,
                self.reported.len()
            );
            self.reported.clear();
        }
        Ok(())
    }

    /// Log a failed spawn attempt once per distinct failure. The schedule is
    /// left alone so the attempt is retried on the next tick. Returns true if
    /// this call logged.
    pub fn report_failure(&mut self, err: SpawnError) -> bool {
        if self.reported.contains(&err) {
            return false;
        }
        match &err {
            SpawnError::EmptyArchetypeSet | SpawnError::MalformedArchetype { .. } => {
                error!("Spawn point '{}' cannot spawn: {}", self.name, err)
            }
            SpawnError::UnknownArchetype(_) | SpawnError::AtCapacity(_) => {
                warn!("Spawn point '{}' skipped a spawn: {}", self.name, err)
            }
        }
        self.reported.insert(err);
        true
    }

    /// A unit of this point died; the next spawn follows its respawn delay.
    /// Returns false if the unit was not (or no longer) registered here.
    pub fn on_unit_death(
        &mut self,
        creep_id: u64,
        respawn_delay: f64,
        now: f64,
        authority: &AuthorityCoordinator,
    ) -> bool {
        if !authority.is_authority() {
            return false;
        }
        let Some(index) = self.live.iter().position(|&id| id == creep_id) else {
            debug!("Spawn point '{}' ignoring death of unknown unit {}", self.name, creep_id);
            return false;
        };
        self.live.swap_remove(index);
        self.next_spawn_at = now + respawn_delay.max(0.0);
        debug!(
            "Unit {} of '{}' died, next spawn at {:.1}s",
            creep_id, self.name, self.next_spawn_at
        );
        true
    }

    pub fn next_spawn_at(&self) -> f64 {
        self.next_spawn_at
    }
}

#[cfg(test)]
impl SpawnPoint {
    pub fn set_archetypes(&mut self, archetypes: Vec<String>) {
        self.archetypes = archetypes;
    }

    pub fn archetypes(&self) -> &[String] {
        &self.archetypes
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn has_reported(&self, err: &SpawnError) -> bool {
        self.reported.contains(err)
    }

    pub fn reported_count(&self) -> usize {
        self.reported.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config(capacity: usize) -> SpawnPointConfig {
        SpawnPointConfig {
            name: "camp".to_string(),
            position: [10.0, 0.0, 10.0],
            archetypes: vec!["goblin".to_string(), "wolf".to_string()],
            capacity,
            spawn_interval: 30.0,
            spawn_radius: 5.0,
            respawn_delay: 60.0,
        }
    }

    #[test]
    fn test_capacity_holds_then_refills_immediately() {
        let authority = AuthorityCoordinator::authority(0);
        let mut rng = StdRng::seed_from_u64(1);
        let mut point = SpawnPoint::from_config(1, &config(3));

        for (id, now) in [(1, 0.0), (2, 30.0), (3, 60.0)] {
            let request = point.tick(now, &authority, |_| true, &mut rng).expect("spawn due");
            assert_eq!(request.spawn_point, 1);
            point.register(id, now).unwrap();
        }
        assert_eq!(point.live_count(), 3);

        // Interval has long elapsed but the point is full.
        assert!(point.tick(500.0, &authority, |_| true, &mut rng).is_none());
        assert_eq!(point.register(4, 500.0), Err(SpawnError::AtCapacity(3)));

        // Unit 2 was destroyed; the next tick spawns right away.
        let request = point.tick(500.05, &authority, |id| id != 2, &mut rng);
        assert!(request.is_some());
        assert_eq!(point.live_count(), 2);
    }

    #[test]
    fn test_spawn_position_inside_disk() {
        let authority = AuthorityCoordinator::authority(0);
        let mut rng = StdRng::seed_from_u64(2);
        let mut point = SpawnPoint::from_config(1, &config(100));

        for id in 0..50 {
            let request = point.tick(id as f64 * 30.0, &authority, |_| true, &mut rng).unwrap();
            assert!(navigation::distance_xz(point.position, request.position) <= 5.0 + 0.0001);
            assert!(point.archetypes().contains(&request.archetype));
            point.register(id, id as f64 * 30.0).unwrap();
        }
    }

    #[test]
    fn test_death_uses_unit_respawn_delay() {
        let authority = AuthorityCoordinator::authority(0);
        let mut rng = StdRng::seed_from_u64(3);
        let mut point = SpawnPoint::from_config(1, &config(1));

        point.tick(0.0, &authority, |_| true, &mut rng).unwrap();
        point.register(7, 0.0).unwrap();
        assert_eq!(point.next_spawn_at(), 30.0);

        assert!(point.on_unit_death(7, 60.0, 12.0, &authority));
        assert_eq!(point.next_spawn_at(), 72.0);
        assert!(point.tick(71.9, &authority, |_| true, &mut rng).is_none());
        assert!(point.tick(72.0, &authority, |_| true, &mut rng).is_some());

        // Redelivered death changes nothing.
        assert!(!point.on_unit_death(7, 5.0, 20.0, &authority));
        assert_eq!(point.next_spawn_at(), 72.0);
    }

    #[test]
    fn test_empty_archetype_set_reports_once() {
        let authority = AuthorityCoordinator::authority(0);
        let mut rng = StdRng::seed_from_u64(4);
        let mut point = SpawnPoint::from_config(1, &config(3));
        point.set_archetypes(Vec::new());

        for tick in 0..5 {
            assert!(point.tick(tick as f64, &authority, |_| true, &mut rng).is_none());
        }
        assert!(point.has_reported(&SpawnError::EmptyArchetypeSet));
        assert_eq!(point.reported_count(), 1);

        point.set_archetypes(vec!["goblin".to_string()]);
        assert!(point.tick(6.0, &authority, |_| true, &mut rng).is_some());
        point.register(1, 6.0).unwrap();
        assert_eq!(point.reported_count(), 0);
    }

    #[test]
    fn test_alternating_failures_log_once_each() {
        let mut point = SpawnPoint::from_config(1, &config(3));
        let ghost = SpawnError::UnknownArchetype("ghost".to_string());
        let phantom = SpawnError::UnknownArchetype("phantom".to_string());

        let mut logged = 0;
        for attempt in 0..200 {
            let err = if attempt % 2 == 0 { ghost.clone() } else { phantom.clone() };
            if point.report_failure(err) {
                logged += 1;
            }
        }
        assert_eq!(logged, 2);
        assert_eq!(point.reported_count(), 2);

        point.register(1, 0.0).unwrap();
        assert_eq!(point.reported_count(), 0);
        assert!(point.report_failure(ghost));
    }

    #[test]
    fn test_replica_never_spawns() {
        let replica = AuthorityCoordinator::replica(2, 0);
        let mut rng = StdRng::seed_from_u64(5);
        let mut point = SpawnPoint::from_config(1, &config(3));
        assert!(point.tick(100.0, &replica, |_| true, &mut rng).is_none());
        assert!(!point.on_unit_death(1, 60.0, 100.0, &replica));
    }
}
