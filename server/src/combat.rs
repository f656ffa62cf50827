//! Damage mitigation and death resolution.
//!
//! Mitigation follows a diminishing-returns curve:
//! `actual = raw * 100 / (100 + resistance)`. Zero resistance lets the full
//! hit through; every extra point helps a little less than the one before.
//! Nothing in here mutates state; callers apply the outcome.

/// Which defense mitigates a hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageKind {
    /// Mitigated by armor
    Physical,
    /// Mitigated by magic resistance
    Magical,
}

/// A single incoming hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageEvent {
    pub amount: f32,
    pub kind: DamageKind,
    /// Entity that dealt the hit; `None` for environmental damage
    pub source: Option<u64>,
}

impl DamageEvent {
    pub fn physical(amount: f32, source: Option<u64>) -> Self {
        Self { amount, kind: DamageKind::Physical, source }
    }

    pub fn magical(amount: f32, source: Option<u64>) -> Self {
        Self { amount, kind: DamageKind::Magical, source }
    }
}

/// Defensive stats of whatever is being hit
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Defenses {
    pub armor: f32,
    pub magic_resistance: f32,
}

impl Defenses {
    fn against(&self, kind: DamageKind) -> f32 {
        match kind {
            DamageKind::Physical => self.armor,
            DamageKind::Magical => self.magic_resistance,
        }
    }
}

/// Result of resolving one hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageOutcome {
    /// Damage after mitigation
    pub amount: f32,
    pub remaining_health: f32,
    pub died: bool,
}

/// Damage left after applying `resistance`. Negative resistance counts as zero.
pub fn mitigate(raw: f32, resistance: f32) -> f32 {
    let resistance = resistance.max(0.0);
    raw.max(0.0) * 100.0 / (100.0 + resistance)
}

/// Resolve a hit against a target with `health` and `defenses`.
pub fn resolve(health: f32, defenses: Defenses, event: &DamageEvent) -> DamageOutcome {
    let amount = mitigate(event.amount, defenses.against(event.kind));
    let remaining = health - amount;
    DamageOutcome {
        amount,
        remaining_health: remaining.max(0.0),
        died: remaining <= 0.0,
    }
}
