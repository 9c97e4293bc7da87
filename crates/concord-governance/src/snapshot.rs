//! Flat, serializable view of the whole governance state.
//!
//! One record per stake, delegation edge, role assignment, proposal, queued
//! action and bucket, plus the treasury history in order. Records are sorted by key, so identical state always
//! serializes to identical bytes. Restoring replays every record through
//! the component that owns it and rejects anything those components would
//! never have produced.

use std::collections::HashSet;

use concord_types::{Address, Amount, Timestamp};
use serde::{Deserialize, Serialize};

use crate::config::GovernanceConfig;
use crate::dao::GovernanceDao;
use crate::delegation::DelegationGraph;
use crate::error::{GovernanceError, GovernanceResult};
use crate::proposal::{
    Proposal, ProposalStatus, ProposalStore, TreasuryAction, VoteChoice, VoteRecord,
};
use crate::roles::{Role, RoleRegistry};
use crate::stake::StakeLedger;
use crate::timelock::{QueuedAction, Timelock};
use crate::treasury::{Bucket, Treasury, TreasuryTransaction};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeRecord {
    pub member: Address,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationRecord {
    pub delegator: Address,
    pub delegate: Address,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub role: Role,
    pub member: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterRecord {
    pub voter: Address,
    pub choice: VoteChoice,
    pub weight: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRecord {
    pub id: u64,
    pub creator: Address,
    pub action: Option<TreasuryAction>,
    pub description: String,
    pub created_at: Timestamp,
    pub status: ProposalStatus,
    pub for_votes: Amount,
    pub against_votes: Amount,
    pub voters: Vec<VoterRecord>,
    /// Members whose stake is already part of the tally
    pub counted: Vec<Address>,
    pub queued_at: Option<Timestamp>,
    pub executed_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedRecord {
    pub proposal_id: u64,
    pub queued_at: Timestamp,
    pub eta: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketRecord {
    pub bucket: Bucket,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutRecord {
    pub recipient: Address,
    pub amount: Amount,
}

/// Complete persisted governance state. Only the event log is left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceSnapshot {
    pub dao: Address,
    pub admin: Address,
    pub guardian: Address,
    pub delay: u64,
    pub config: GovernanceConfig,
    pub next_proposal_id: u64,
    pub stakes: Vec<StakeRecord>,
    pub delegations: Vec<DelegationRecord>,
    pub roles: Vec<RoleRecord>,
    pub proposals: Vec<ProposalRecord>,
    pub queued: Vec<QueuedRecord>,
    pub buckets: Vec<BucketRecord>,
    /// Custodied total; must equal the sum of `buckets`
    pub total_held: Amount,
    pub payouts: Vec<PayoutRecord>,
    /// Treasury transactions, oldest first
    #[serde(default)]
    pub treasury_history: Vec<TreasuryTransaction>,
}

impl From<&Proposal> for ProposalRecord {
    fn from(p: &Proposal) -> Self {
        let mut voters: Vec<VoterRecord> = p
            .voters
            .iter()
            .map(|(voter, record)| VoterRecord {
                voter: *voter,
                choice: record.choice,
                weight: record.weight,
            })
            .collect();
        voters.sort_by_key(|v| v.voter);

        let mut counted: Vec<Address> = p.counted.iter().copied().collect();
        counted.sort();

        Self {
            id: p.id,
            creator: p.creator,
            action: p.action,
            description: p.description.clone(),
            created_at: p.created_at,
            status: p.status,
            for_votes: p.for_votes,
            against_votes: p.against_votes,
            voters,
            counted,
            queued_at: p.queued_at,
            executed_at: p.executed_at,
            cancelled_at: p.cancelled_at,
        }
    }
}

impl TryFrom<ProposalRecord> for Proposal {
    type Error = GovernanceError;

    fn try_from(record: ProposalRecord) -> Result<Self, Self::Error> {
        let mut proposal = Proposal::new(
            record.id,
            record.creator,
            record.action,
            record.description,
            record.created_at,
        );

        let mut tally_for = Amount::ZERO;
        let mut tally_against = Amount::ZERO;
        for v in record.voters {
            let tally = match v.choice {
                VoteChoice::For => &mut tally_for,
                VoteChoice::Against => &mut tally_against,
            };
            *tally = tally
                .checked_add(v.weight)
                .ok_or(GovernanceError::ArithmeticOverflow)?;
            let vote = VoteRecord {
                choice: v.choice,
                weight: v.weight,
            };
            if proposal.voters.insert(v.voter, vote).is_some() {
                return Err(GovernanceError::InvalidSnapshot(format!(
                    "proposal {} has two ballots from {}",
                    record.id, v.voter
                )));
            }
        }
        if tally_for != record.for_votes || tally_against != record.against_votes {
            return Err(GovernanceError::InvalidSnapshot(format!(
                "proposal {} tally does not match its ballots",
                record.id
            )));
        }

        if record.status == ProposalStatus::Queued && record.queued_at.is_none() {
            return Err(GovernanceError::InvalidSnapshot(format!(
                "queued proposal {} has no queue time",
                record.id
            )));
        }

        proposal.status = record.status;
        proposal.for_votes = record.for_votes;
        proposal.against_votes = record.against_votes;
        proposal.counted = record.counted.into_iter().collect();
        proposal.queued_at = record.queued_at;
        proposal.executed_at = record.executed_at;
        proposal.cancelled_at = record.cancelled_at;
        Ok(proposal)
    }
}

fn invalid(context: &str, err: GovernanceError) -> GovernanceError {
    match err {
        GovernanceError::InvalidSnapshot(_) => err,
        other => GovernanceError::InvalidSnapshot(format!("{}: {}", context, other)),
    }
}

impl GovernanceDao {
    /// Capture the current state.
    pub fn snapshot(&self) -> GovernanceSnapshot {
        let mut stakes: Vec<StakeRecord> = self
            .stakes()
            .members()
            .map(|(member, amount)| StakeRecord {
                member: *member,
                amount: *amount,
            })
            .collect();
        stakes.sort_by_key(|s| s.member);

        let mut delegations: Vec<DelegationRecord> = self
            .delegation()
            .edges()
            .map(|d| DelegationRecord {
                delegator: d.delegator,
                delegate: d.delegate,
                created_at: d.created_at,
            })
            .collect();
        delegations.sort_by_key(|d| d.delegator);

        let roles = Role::ALL
            .iter()
            .flat_map(|role| {
                self.roles()
                    .members(*role)
                    .into_iter()
                    .map(|member| RoleRecord { role: *role, member })
            })
            .collect();

        let proposals = self
            .proposals()
            .all()
            .into_iter()
            .map(ProposalRecord::from)
            .collect();

        let queued = self
            .timelock()
            .queued()
            .map(|a| QueuedRecord {
                proposal_id: a.proposal_id,
                queued_at: a.queued_at,
                eta: a.eta,
            })
            .collect();

        let buckets = self
            .treasury()
            .balances()
            .map(|(bucket, amount)| BucketRecord { bucket, amount })
            .collect();

        let mut payouts: Vec<PayoutRecord> = self
            .treasury()
            .payouts()
            .map(|(recipient, amount)| PayoutRecord {
                recipient: *recipient,
                amount: *amount,
            })
            .collect();
        payouts.sort_by_key(|p| p.recipient);

        GovernanceSnapshot {
            dao: self.address(),
            admin: self.roles().admin(),
            guardian: self.timelock().guardian(),
            delay: self.timelock().delay(),
            config: self.config().clone(),
            next_proposal_id: self.proposals().next_id(),
            stakes,
            delegations,
            roles,
            proposals,
            queued,
            buckets,
            total_held: self.treasury().total_held(),
            payouts,
            treasury_history: self.treasury().history().to_vec(),
        }
    }

    /// Rebuild a DAO from a snapshot. The event log starts empty.
    ///
    /// # Errors
    /// `InvalidSnapshot` if any record breaks a component invariant:
    /// a delegation cycle, duplicate keys, tallies that disagree with
    /// ballots, queue entries without a queued proposal, or bucket
    /// balances that do not sum to the custodied total.
    pub fn restore(snapshot: GovernanceSnapshot) -> GovernanceResult<Self> {
        let mut stakes = StakeLedger::new();
        for record in &snapshot.stakes {
            if stakes.is_member(&record.member) {
                return Err(GovernanceError::InvalidSnapshot(format!(
                    "member {} staked twice",
                    record.member
                )));
            }
            stakes
                .stake(record.member, record.amount)
                .map_err(|e| invalid("stake", e))?;
        }

        let mut delegation = DelegationGraph::new();
        for record in &snapshot.delegations {
            if delegation.is_delegating(&record.delegator) {
                return Err(GovernanceError::InvalidSnapshot(format!(
                    "member {} has two delegations",
                    record.delegator
                )));
            }
            delegation
                .delegate(record.delegator, record.delegate, record.created_at)
                .map_err(|e| invalid("delegation", e))?;
        }

        let mut roles = RoleRegistry::new(snapshot.admin);
        for record in &snapshot.roles {
            roles
                .grant(snapshot.admin, record.role, record.member)
                .map_err(|e| invalid("role", e))?;
        }

        let proposals = snapshot
            .proposals
            .into_iter()
            .map(Proposal::try_from)
            .collect::<GovernanceResult<Vec<_>>>()?;
        let queued_ids: HashSet<u64> = proposals
            .iter()
            .filter(|p| p.status == ProposalStatus::Queued)
            .map(|p| p.id)
            .collect();
        let proposals = ProposalStore::from_parts(proposals, snapshot.next_proposal_id)?;

        let mut timelock = Timelock::new(snapshot.delay, snapshot.guardian);
        for record in &snapshot.queued {
            let queued_at = proposals
                .get(record.proposal_id)
                .filter(|p| p.status == ProposalStatus::Queued)
                .and_then(|p| p.queued_at);
            if queued_at != Some(record.queued_at) {
                return Err(GovernanceError::InvalidSnapshot(format!(
                    "queued action {} has no matching queued proposal",
                    record.proposal_id
                )));
            }
            timelock.restore(QueuedAction {
                proposal_id: record.proposal_id,
                queued_at: record.queued_at,
                eta: record.eta,
            })?;
        }
        if queued_ids.iter().any(|id| !timelock.is_queued(*id)) {
            return Err(GovernanceError::InvalidSnapshot(
                "queued proposal missing from timelock".to_string(),
            ));
        }

        let mut treasury = Treasury::from_balances(
            snapshot.dao,
            snapshot.buckets.iter().map(|b| (b.bucket, b.amount)),
        )?;
        if !treasury.check_conservation() || treasury.total_held() != snapshot.total_held {
            return Err(GovernanceError::InvalidSnapshot(format!(
                "bucket balances sum to {}, custodied total is {}",
                treasury.total_held(),
                snapshot.total_held
            )));
        }
        for payout in &snapshot.payouts {
            treasury.restore_payout(payout.recipient, payout.amount)?;
        }
        treasury.restore_history(snapshot.treasury_history)?;

        let dao = GovernanceDao::new(
            snapshot.dao,
            snapshot.config,
            stakes,
            delegation,
            roles,
            timelock,
            treasury,
        )?
        .with_proposals(proposals);

        tracing::info!(
            dao = %dao.address(),
            members = dao.stakes().member_count(),
            proposals = dao.proposal_count(),
            "Governance state restored"
        );
        Ok(dao)
    }
}
