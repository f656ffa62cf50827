//! Fire-and-forget presentation hooks.
//!
//! Visual and audio setup lives outside the simulation. The simulation only
//! tells it what happened; nothing returned from a hook feeds back into
//! gameplay.

use log::debug;

use crate::entities::CreepState;

/// Side-effecting presentation collaborator
pub trait PresentationHooks {
    /// A creep appeared and needs its visuals set up
    fn on_spawn(&mut self, _creep: &CreepState) {}

    /// A creep started an attack animation
    fn on_attack(&mut self, _attacker_id: u64, _target_id: u64) {}

    /// A creep entered its dying state
    fn on_death(&mut self, _creep_id: u64, _position: [f32; 3]) {}

    /// Push a new value to an entity's health bar
    fn health_bar(&mut self, _entity_id: u64, _current: f32, _max: f32) {}
}

/// Hooks that do nothing (headless authority, tests)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPresentation;

impl PresentationHooks for NoPresentation {}

/// Hooks that only trace what would have been presented
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPresentation;

impl PresentationHooks for LogPresentation {
    fn on_spawn(&mut self, creep: &CreepState) {
        debug!("present spawn: {} #{} at {:?}", creep.archetype, creep.id, creep.position);
    }

    fn on_attack(&mut self, attacker_id: u64, target_id: u64) {
        debug!("present attack: {} -> {}", attacker_id, target_id);
    }

    fn on_death(&mut self, creep_id: u64, position: [f32; 3]) {
        debug!("present death: #{} at {:?}", creep_id, position);
    }

    fn health_bar(&mut self, entity_id: u64, current: f32, max: f32) {
        debug!("health bar #{}: {:.1}/{:.1}", entity_id, current, max);
    }
}

/// One recorded presentation call
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Clone, PartialEq)]
pub enum HookEvent {
    Spawn(u64),
    Attack { attacker_id: u64, target_id: u64 },
    Death(u64),
    HealthBar { entity_id: u64, current: f32, max: f32 },
}

/// Hooks that remember every call, in order
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Default, Clone)]
pub struct RecordedHooks {
    pub events: Vec<HookEvent>,
}

#[cfg(any(test, feature = "test-util"))]
impl RecordedHooks {
    pub fn deaths(&self) -> usize {
        self.events.iter().filter(|e| matches!(e, HookEvent::Death(_))).count()
    }

    pub fn spawns(&self) -> usize {
        self.events.iter().filter(|e| matches!(e, HookEvent::Spawn(_))).count()
    }
}

#[cfg(any(test, feature = "test-util"))]
impl PresentationHooks for RecordedHooks {
    fn on_spawn(&mut self, creep: &CreepState) {
        self.events.push(HookEvent::Spawn(creep.id));
    }

    fn on_attack(&mut self, attacker_id: u64, target_id: u64) {
        self.events.push(HookEvent::Attack { attacker_id, target_id });
    }

    fn on_death(&mut self, creep_id: u64, _position: [f32; 3]) {
        self.events.push(HookEvent::Death(creep_id));
    }

    fn health_bar(&mut self, entity_id: u64, current: f32, max: f32) {
        self.events.push(HookEvent::HealthBar { entity_id, current, max });
    }
}
