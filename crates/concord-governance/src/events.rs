//! Governance event log.
//!
//! Every successful mutation on the DAO appends one event. Failed calls
//! append nothing, so the log replays exactly the committed history.

use concord_types::{Address, Amount, Timestamp};
use serde::{Deserialize, Serialize};

use crate::proposal::VoteChoice;
use crate::roles::Role;
use crate::treasury::Bucket;

/// Observable state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GovernanceEvent {
    Staked {
        member: Address,
        amount: Amount,
        balance: Amount,
    },
    Delegated {
        delegator: Address,
        delegate: Address,
    },
    DelegationRevoked {
        delegator: Address,
        previous: Address,
    },
    RoleGranted {
        role: Role,
        member: Address,
    },
    RoleRevoked {
        role: Role,
        member: Address,
    },
    ProposalCreated {
        id: u64,
        creator: Address,
        bucket: Option<Bucket>,
    },
    VoteCast {
        id: u64,
        voter: Address,
        choice: VoteChoice,
        weight: Amount,
    },
    ProposalQueued {
        id: u64,
        eta: Timestamp,
    },
    ProposalRejected {
        id: u64,
        for_votes: Amount,
        against_votes: Amount,
    },
    ProposalExecuted {
        id: u64,
        at: Timestamp,
    },
    ProposalCancelled {
        id: u64,
        by: Address,
    },
    TreasuryDeposit {
        from: Address,
        bucket: Bucket,
        amount: Amount,
    },
    TreasuryTransfer {
        bucket: Bucket,
        recipient: Address,
        amount: Amount,
    },
}

impl GovernanceEvent {
    /// Proposal the event refers to, if any.
    pub fn proposal_id(&self) -> Option<u64> {
        match self {
            GovernanceEvent::ProposalCreated { id, .. }
            | GovernanceEvent::VoteCast { id, .. }
            | GovernanceEvent::ProposalQueued { id, .. }
            | GovernanceEvent::ProposalRejected { id, .. }
            | GovernanceEvent::ProposalExecuted { id, .. }
            | GovernanceEvent::ProposalCancelled { id, .. } => Some(*id),
            _ => None,
        }
    }
}

/// Append-only event buffer.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    events: Vec<GovernanceEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: GovernanceEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[GovernanceEvent] {
        &self.events
    }

    /// Take all buffered events, leaving the log empty.
    pub fn drain(&mut self) -> Vec<GovernanceEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
