//! Proposal lifecycle management.
//!
//! Proposals go through states:
//! Pending -> Approved -> Queued -> Executed, with Rejected decided at
//! queue time and Cancelled available to guardians from Approved or Queued.

use std::collections::{HashMap, HashSet};

use concord_types::{Address, Amount, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::{GovernanceError, GovernanceResult};
use crate::treasury::Bucket;

/// Proposal status in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalStatus {
    /// Created, voting open
    Pending,
    /// Quorum and majority met, not yet queued
    Approved,
    /// Timelock running
    Queued,
    /// Executed successfully
    Executed,
    /// Cancelled by a guardian
    Cancelled,
    /// Quorum met but majority against
    Rejected,
}

impl ProposalStatus {
    pub fn can_vote(&self) -> bool {
        matches!(self, ProposalStatus::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProposalStatus::Executed | ProposalStatus::Cancelled | ProposalStatus::Rejected
        )
    }

    pub fn is_cancellable(&self) -> bool {
        matches!(self, ProposalStatus::Approved | ProposalStatus::Queued)
    }
}

/// Vote options, numbered as on the wire (`Against = 0`, `For = 1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteChoice {
    Against = 0,
    For = 1,
}

impl TryFrom<u8> for VoteChoice {
    type Error = GovernanceError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(VoteChoice::Against),
            1 => Ok(VoteChoice::For),
            other => Err(GovernanceError::InvalidVoteChoice(other)),
        }
    }
}

/// Treasury payout carried out when a proposal executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryAction {
    pub bucket: Bucket,
    pub recipient: Address,
    pub amount: Amount,
}

/// A recorded ballot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub choice: VoteChoice,
    /// Weight added to the tally
    pub weight: Amount,
}

/// Governance proposal.
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    pub id: u64,
    pub creator: Address,
    /// Treasury action, absent for non-financial proposals
    pub action: Option<TreasuryAction>,
    pub description: String,
    pub created_at: Timestamp,
    pub status: ProposalStatus,
    pub for_votes: Amount,
    pub against_votes: Amount,
    /// Ballots by voter
    pub voters: HashMap<Address, VoteRecord>,
    /// Members whose stake is already part of the tally
    pub counted: HashSet<Address>,
    pub queued_at: Option<Timestamp>,
    pub executed_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
}

impl Proposal {
    pub fn new(
        id: u64,
        creator: Address,
        action: Option<TreasuryAction>,
        description: String,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            creator,
            action,
            description,
            created_at,
            status: ProposalStatus::Pending,
            for_votes: Amount::ZERO,
            against_votes: Amount::ZERO,
            voters: HashMap::new(),
            counted: HashSet::new(),
            queued_at: None,
            executed_at: None,
            cancelled_at: None,
        }
    }

    /// Check that `voter` may still vote on this proposal.
    pub fn ensure_can_vote(&self, voter: &Address) -> GovernanceResult<()> {
        if !self.status.can_vote() {
            return Err(GovernanceError::ProposalNotOpen {
                id: self.id,
                status: self.status,
            });
        }
        if self.voters.contains_key(voter) {
            return Err(GovernanceError::AlreadyVoted);
        }
        Ok(())
    }

    /// Record a vote of `weight`, contributed by the stake of `sources`.
    pub fn cast_vote(
        &mut self,
        voter: Address,
        choice: VoteChoice,
        weight: Amount,
        sources: &[Address],
    ) -> GovernanceResult<()> {
        self.ensure_can_vote(&voter)?;

        if weight.is_zero() {
            return Err(GovernanceError::NoVotingPower);
        }

        let tally = match choice {
            VoteChoice::For => &mut self.for_votes,
            VoteChoice::Against => &mut self.against_votes,
        };
        *tally = tally
            .checked_add(weight)
            .ok_or(GovernanceError::ArithmeticOverflow)?;

        self.voters.insert(voter, VoteRecord { choice, weight });
        self.counted.extend(sources.iter().copied());
        Ok(())
    }

    /// Total weight cast, for and against.
    pub fn total_votes(&self) -> Amount {
        self.for_votes.saturating_add(self.against_votes)
    }

    pub fn has_voted(&self, voter: &Address) -> bool {
        self.voters.contains_key(voter)
    }

    pub fn vote_of(&self, voter: &Address) -> Option<&VoteRecord> {
        self.voters.get(voter)
    }

    /// Decide the outcome against `quorum_threshold` without changing state.
    ///
    /// Returns `Approved` or `Rejected`; fails with `QuorumNotMet` when the
    /// cast weight does not exceed the threshold.
    pub fn evaluate(&self, quorum_threshold: Amount) -> GovernanceResult<ProposalStatus> {
        if self.status != ProposalStatus::Pending {
            return Err(GovernanceError::ProposalNotOpen {
                id: self.id,
                status: self.status,
            });
        }

        let cast = self.total_votes();
        if cast <= quorum_threshold {
            return Err(GovernanceError::QuorumNotMet {
                cast,
                required: quorum_threshold,
            });
        }

        if self.for_votes > self.against_votes {
            Ok(ProposalStatus::Approved)
        } else {
            Ok(ProposalStatus::Rejected)
        }
    }

    pub(crate) fn approve(&mut self) {
        self.status = ProposalStatus::Approved;
    }

    pub(crate) fn reject(&mut self) {
        self.status = ProposalStatus::Rejected;
    }

    pub(crate) fn mark_queued(&mut self, now: Timestamp) {
        self.status = ProposalStatus::Queued;
        self.queued_at = Some(now);
    }

    pub fn ensure_queued(&self) -> GovernanceResult<()> {
        if self.status != ProposalStatus::Queued {
            return Err(GovernanceError::NotQueued(self.id));
        }
        Ok(())
    }

    pub(crate) fn mark_executed(&mut self, now: Timestamp) {
        self.status = ProposalStatus::Executed;
        self.executed_at = Some(now);
    }

    pub fn ensure_cancellable(&self) -> GovernanceResult<()> {
        if !self.status.is_cancellable() {
            return Err(GovernanceError::NotCancellable {
                id: self.id,
                status: self.status,
            });
        }
        Ok(())
    }

    pub(crate) fn mark_cancelled(&mut self, now: Timestamp) {
        self.status = ProposalStatus::Cancelled;
        self.cancelled_at = Some(now);
    }
}

/// Registry of all proposals with a monotonic id counter.
#[derive(Debug, Clone)]
pub struct ProposalStore {
    proposals: HashMap<u64, Proposal>,
    next_id: u64,
}

impl ProposalStore {
    pub fn new() -> Self {
        Self {
            proposals: HashMap::new(),
            next_id: 1,
        }
    }

    /// Allocate the next id and store a new `Pending` proposal.
    pub fn create(
        &mut self,
        creator: Address,
        action: Option<TreasuryAction>,
        description: String,
        now: Timestamp,
    ) -> GovernanceResult<u64> {
        let id = self.next_id;
        let next = id.checked_add(1).ok_or(GovernanceError::ArithmeticOverflow)?;

        self.proposals
            .insert(id, Proposal::new(id, creator, action, description, now));
        self.next_id = next;
        Ok(id)
    }

    pub fn get(&self, id: u64) -> Option<&Proposal> {
        self.proposals.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: u64) -> Option<&mut Proposal> {
        self.proposals.get_mut(&id)
    }

    /// Lookup that maps a missing id to `UnknownProposal`.
    pub fn require(&self, id: u64) -> GovernanceResult<&Proposal> {
        self.get(id).ok_or(GovernanceError::UnknownProposal(id))
    }

    pub(crate) fn require_mut(&mut self, id: u64) -> GovernanceResult<&mut Proposal> {
        self.get_mut(id).ok_or(GovernanceError::UnknownProposal(id))
    }

    /// Id of the most recently created proposal (0 if none).
    pub fn proposal_count(&self) -> u64 {
        self.next_id - 1
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// All proposals ordered by id.
    pub fn all(&self) -> Vec<&Proposal> {
        let mut all: Vec<&Proposal> = self.proposals.values().collect();
        all.sort_by_key(|p| p.id);
        all
    }

    /// Proposals in `status`, ordered by id.
    pub fn by_status(&self, status: ProposalStatus) -> Vec<&Proposal> {
        self.all()
            .into_iter()
            .filter(|p| p.status == status)
            .collect()
    }

    /// Rebuild from persisted proposals.
    pub(crate) fn from_parts(proposals: Vec<Proposal>, next_id: u64) -> GovernanceResult<Self> {
        if next_id == 0 {
            return Err(GovernanceError::InvalidSnapshot(
                "next proposal id must be at least 1".to_string(),
            ));
        }
        let mut map = HashMap::with_capacity(proposals.len());
        for proposal in proposals {
            if proposal.id == 0 || proposal.id >= next_id {
                return Err(GovernanceError::InvalidSnapshot(format!(
                    "proposal id {} outside 1..{}",
                    proposal.id, next_id
                )));
            }
            if map.insert(proposal.id, proposal).is_some() {
                return Err(GovernanceError::InvalidSnapshot(
                    "duplicate proposal id".to_string(),
                ));
            }
        }
        Ok(Self {
            proposals: map,
            next_id,
        })
    }
}

impl Default for ProposalStore {
    fn default() -> Self {
        Self::new()
    }
}
