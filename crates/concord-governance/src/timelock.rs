//! Timelock.
//!
//! Enforces the minimum delay between queueing an approved proposal and
//! executing it, and holds the guardian override used to cancel.

use std::collections::BTreeMap;

use concord_types::{Address, Timestamp};

use crate::error::{GovernanceError, GovernanceResult};
use crate::roles::{Role, RoleRegistry};

/// A scheduled action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuedAction {
    pub proposal_id: u64,
    pub queued_at: Timestamp,
    /// Earliest execution time
    pub eta: Timestamp,
}

/// Delay enforcer keyed by proposal id.
#[derive(Debug, Clone)]
pub struct Timelock {
    delay: u64,
    guardian: Address,
    queue: BTreeMap<u64, QueuedAction>,
}

impl Timelock {
    pub fn new(delay: u64, guardian: Address) -> Self {
        Self {
            delay,
            guardian,
            queue: BTreeMap::new(),
        }
    }

    pub fn delay(&self) -> u64 {
        self.delay
    }

    pub fn guardian(&self) -> Address {
        self.guardian
    }

    /// Start the clock for `proposal_id`.
    pub fn schedule(&mut self, proposal_id: u64, now: Timestamp) -> GovernanceResult<Timestamp> {
        if self.queue.contains_key(&proposal_id) {
            return Err(GovernanceError::AlreadyQueued(proposal_id));
        }
        let eta = now
            .checked_add(self.delay)
            .ok_or(GovernanceError::ArithmeticOverflow)?;

        self.queue.insert(
            proposal_id,
            QueuedAction {
                proposal_id,
                queued_at: now,
                eta,
            },
        );
        tracing::debug!(proposal_id, eta, "Action scheduled");
        Ok(eta)
    }

    /// Check that `proposal_id` is scheduled and its delay has elapsed.
    pub fn check_ready(&self, proposal_id: u64, now: Timestamp) -> GovernanceResult<&QueuedAction> {
        let action = self
            .queue
            .get(&proposal_id)
            .ok_or(GovernanceError::UnknownQueuedAction(proposal_id))?;
        if now < action.eta {
            return Err(GovernanceError::TimelockNotExpired { now, eta: action.eta });
        }
        Ok(action)
    }

    /// Consume a ready action.
    pub fn execute(&mut self, proposal_id: u64, now: Timestamp) -> GovernanceResult<QueuedAction> {
        let action = *self.check_ready(proposal_id, now)?;
        self.queue.remove(&proposal_id);
        Ok(action)
    }

    /// Whether `caller` may use the guardian override: the guardian set at
    /// construction, or any holder of the `Guardian` role.
    pub fn is_guardian(&self, caller: &Address, roles: &RoleRegistry) -> bool {
        *caller == self.guardian || roles.has(Role::Guardian, caller)
    }

    pub fn ensure_guardian(&self, caller: &Address, roles: &RoleRegistry) -> GovernanceResult<()> {
        if !self.is_guardian(caller, roles) {
            tracing::warn!(caller = %caller, "Cancel rejected: caller is not a guardian");
            return Err(GovernanceError::Unauthorized(
                "Guardian required to cancel".to_string(),
            ));
        }
        Ok(())
    }

    /// Drop a scheduled action. Returns it if one existed.
    pub fn cancel(
        &mut self,
        caller: &Address,
        proposal_id: u64,
        roles: &RoleRegistry,
    ) -> GovernanceResult<Option<QueuedAction>> {
        self.ensure_guardian(caller, roles)?;
        Ok(self.queue.remove(&proposal_id))
    }

    pub fn eta(&self, proposal_id: u64) -> Option<Timestamp> {
        self.queue.get(&proposal_id).map(|a| a.eta)
    }

    pub fn is_queued(&self, proposal_id: u64) -> bool {
        self.queue.contains_key(&proposal_id)
    }

    /// Scheduled actions ordered by proposal id.
    pub fn queued(&self) -> impl Iterator<Item = &QueuedAction> {
        self.queue.values()
    }

    pub(crate) fn restore(&mut self, action: QueuedAction) -> GovernanceResult<()> {
        if action.eta != action.queued_at.saturating_add(self.delay) {
            return Err(GovernanceError::InvalidSnapshot(format!(
                "queued action {} has inconsistent eta",
                action.proposal_id
            )));
        }
        if self.queue.insert(action.proposal_id, action).is_some() {
            return Err(GovernanceError::InvalidSnapshot(format!(
                "proposal {} queued twice",
                action.proposal_id
            )));
        }
        Ok(())
    }
}
