//! Kill reward bookkeeping.
//!
//! A reward is applied once per kill, and only where the beneficiary's
//! progression is authoritative. Every other participant just shows it.

use std::collections::{HashSet, VecDeque};

use arena_shared::{ParticipantId, RewardGrant};
use log::{debug, info};

/// How many recent kills are remembered for duplicate suppression
pub const CREDITED_KILL_CAPACITY: usize = 1024;

/// Something that can receive kill rewards
pub trait RewardRecipient {
    fn is_alive(&self) -> bool;

    /// Participant whose world owns this recipient's progression
    fn progression_owner(&self) -> ParticipantId;

    /// Apply the grant. Returns true if it caused a level-up.
    fn apply_reward(&mut self, grant: &RewardGrant) -> bool;
}

/// What happened to a grant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    Applied { leveled_up: bool },
    /// This kill was already settled
    Duplicate,
    /// Beneficiary missing, dead, or not owned by this participant
    Unresolved,
}

/// Applies kill rewards exactly once per kill
#[derive(Debug)]
pub struct RewardLedger {
    local: ParticipantId,
    settled: HashSet<u64>,
    settled_order: VecDeque<u64>,
    capacity: usize,
}

impl RewardLedger {
    pub fn new(local: ParticipantId) -> Self {
        Self::with_capacity(local, CREDITED_KILL_CAPACITY)
    }

    pub fn with_capacity(local: ParticipantId, capacity: usize) -> Self {
        Self {
            local,
            settled: HashSet::new(),
            settled_order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Grant a kill reward to `recipient`, if it resolves here.
    ///
    /// An unresolved grant still settles the kill: whether a kill pays out
    /// is decided at death time and never revisited.
    pub fn grant<R>(&mut self, grant: &RewardGrant, recipient: Option<&mut R>) -> GrantOutcome
    where
        R: RewardRecipient + ?Sized,
    {
        if self.settled.contains(&grant.kill_id) {
            debug!("Kill {} already settled, ignoring repeated grant", grant.kill_id);
            return GrantOutcome::Duplicate;
        }
        self.settle(grant.kill_id);

        let recipient = match recipient {
            Some(r) if r.is_alive() && r.progression_owner() == self.local => r,
            Some(_) => {
                info!(
                    "Reward for kill {} skipped: beneficiary {} is dead or not owned here",
                    grant.kill_id, grant.beneficiary
                );
                return GrantOutcome::Unresolved;
            }
            None => {
                info!(
                    "Reward for kill {} skipped: beneficiary {} not found",
                    grant.kill_id, grant.beneficiary
                );
                return GrantOutcome::Unresolved;
            }
        };

        let leveled_up = recipient.apply_reward(grant);
        debug!(
            "Granted {} xp / {} gold to {} for kill {}",
            grant.experience, grant.gold, grant.beneficiary, grant.kill_id
        );
        GrantOutcome::Applied { leveled_up }
    }

    #[cfg(test)]
    pub fn is_settled(&self, kill_id: u64) -> bool {
        self.settled.contains(&kill_id)
    }

    fn settle(&mut self, kill_id: u64) {
        self.settled.insert(kill_id);
        self.settled_order.push_back(kill_id);
        while self.settled_order.len() > self.capacity {
            if let Some(oldest) = self.settled_order.pop_front() {
                self.settled.remove(&oldest);
            }
        }
    }
}
