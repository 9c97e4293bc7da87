//! Governance orchestration.
//!
//! `GovernanceDao` owns every component and is the only writer of proposal
//! status. Each entry point checks its capability predicate and every
//! precondition first, then commits; a failed call changes nothing.

use concord_types::{Address, Amount, Timestamp};

use crate::config::GovernanceConfig;
use crate::delegation::DelegationGraph;
use crate::error::{GovernanceError, GovernanceResult};
use crate::events::{EventLog, GovernanceEvent};
use crate::proposal::{Proposal, ProposalStatus, ProposalStore, TreasuryAction, VoteChoice};
use crate::roles::{Role, RoleRegistry};
use crate::stake::StakeLedger;
use crate::timelock::Timelock;
use crate::treasury::{Bucket, Treasury};

/// The governance engine.
#[derive(Debug, Clone)]
pub struct GovernanceDao {
    address: Address,
    config: GovernanceConfig,
    stakes: StakeLedger,
    delegation: DelegationGraph,
    roles: RoleRegistry,
    proposals: ProposalStore,
    timelock: Timelock,
    treasury: Treasury,
    events: EventLog,
}

impl GovernanceDao {
    /// Wire pre-built components together.
    ///
    /// # Errors
    /// `InvalidConfig` if the config is invalid, the treasury answers to a
    /// different DAO identity, or the timelock delay disagrees with the config.
    pub fn new(
        address: Address,
        config: GovernanceConfig,
        stakes: StakeLedger,
        delegation: DelegationGraph,
        roles: RoleRegistry,
        timelock: Timelock,
        treasury: Treasury,
    ) -> GovernanceResult<Self> {
        config.validate()?;

        if treasury.dao() != address {
            return Err(GovernanceError::InvalidConfig(format!(
                "treasury is controlled by {}, not {}",
                treasury.dao(),
                address
            )));
        }
        if timelock.delay() != config.timelock_delay {
            return Err(GovernanceError::InvalidConfig(format!(
                "timelock delay {} does not match configured {}",
                timelock.delay(),
                config.timelock_delay
            )));
        }

        tracing::info!(
            dao = %address,
            admin = %roles.admin(),
            guardian = %timelock.guardian(),
            delay = timelock.delay(),
            "Governance initialized"
        );

        Ok(Self {
            address,
            config,
            stakes,
            delegation,
            roles,
            proposals: ProposalStore::new(),
            timelock,
            treasury,
            events: EventLog::new(),
        })
    }

    /// Fresh DAO with empty components.
    pub fn bootstrap(
        address: Address,
        config: GovernanceConfig,
        admin: Address,
        guardian: Address,
    ) -> GovernanceResult<Self> {
        let timelock = Timelock::new(config.timelock_delay, guardian);
        Self::new(
            address,
            config,
            StakeLedger::new(),
            DelegationGraph::new(),
            RoleRegistry::new(admin),
            timelock,
            Treasury::new(address),
        )
    }

    pub(crate) fn with_proposals(mut self, proposals: ProposalStore) -> Self {
        self.proposals = proposals;
        self
    }

    // === Staking and delegation ===

    pub fn stake(&mut self, member: Address, amount: Amount) -> GovernanceResult<Amount> {
        let balance = self.stakes.stake(member, amount)?;
        self.events.push(GovernanceEvent::Staked {
            member,
            amount,
            balance,
        });
        Ok(balance)
    }

    pub fn delegate(&mut self, from: Address, to: Address, now: Timestamp) -> GovernanceResult<()> {
        let unchanged = self.delegation.delegated_to(&from) == Some(to);
        self.delegation.delegate(from, to, now)?;
        if !unchanged {
            self.events.push(GovernanceEvent::Delegated {
                delegator: from,
                delegate: to,
            });
        }
        Ok(())
    }

    /// Clear `from`'s delegation. A no-op when there is none.
    pub fn revoke_delegation(&mut self, from: Address) -> Option<Address> {
        let previous = self.delegation.revoke(from)?;
        self.events.push(GovernanceEvent::DelegationRevoked {
            delegator: from,
            previous,
        });
        Some(previous)
    }

    // === Roles ===

    pub fn grant_role(&mut self, caller: Address, role: Role, member: Address) -> GovernanceResult<bool> {
        let added = self.roles.grant(caller, role, member)?;
        if added {
            self.events.push(GovernanceEvent::RoleGranted { role, member });
        }
        Ok(added)
    }

    pub fn revoke_role(&mut self, caller: Address, role: Role, member: Address) -> GovernanceResult<bool> {
        let removed = self.roles.revoke(caller, role, member)?;
        if removed {
            self.events.push(GovernanceEvent::RoleRevoked { role, member });
        }
        Ok(removed)
    }

    // === Proposals ===

    /// Create a proposal. The creator needs non-zero resolved voting power.
    ///
    /// Returns the new proposal id.
    pub fn create_proposal(
        &mut self,
        creator: Address,
        action: Option<TreasuryAction>,
        description: impl Into<String>,
        now: Timestamp,
    ) -> GovernanceResult<u64> {
        let description = description.into();
        if description.len() > self.config.max_description_len {
            return Err(GovernanceError::DescriptionTooLong {
                len: description.len(),
                max: self.config.max_description_len,
            });
        }

        if self.resolved_power(creator).is_zero() {
            return Err(GovernanceError::NoVotingPower);
        }

        if let Some(action) = &action {
            if action.amount.is_zero() {
                return Err(GovernanceError::InvalidAmount);
            }
        }

        let bucket = action.map(|a| a.bucket);
        let id = self.proposals.create(creator, action, description, now)?;

        tracing::info!(proposal_id = id, creator = %creator, "Proposal created");
        self.events.push(GovernanceEvent::ProposalCreated { id, creator, bucket });
        Ok(id)
    }

    /// Weight `voter` would add to `proposal` right now, and the members
    /// whose stake it draws on. Stake already counted on the proposal is
    /// skipped.
    fn vote_weight(&self, voter: Address, proposal: &Proposal) -> (Amount, Vec<Address>) {
        let sources: Vec<Address> = self
            .delegation
            .contributors(voter)
            .into_iter()
            .filter(|member| !proposal.counted.contains(member))
            .collect();
        let weight = sources.iter().map(|m| self.stakes.voting_power(m)).sum();
        (weight, sources)
    }

    /// Cast a vote with the voter's resolved power at call time.
    ///
    /// Returns the weight added to the tally.
    pub fn vote(
        &mut self,
        voter: Address,
        proposal_id: u64,
        choice: VoteChoice,
        now: Timestamp,
    ) -> GovernanceResult<Amount> {
        let proposal = self.proposals.require(proposal_id)?;
        proposal.ensure_can_vote(&voter)?;

        let (weight, sources) = self.vote_weight(voter, proposal);
        tracing::debug!(
            proposal_id,
            voter = %voter,
            weight = %weight,
            sources = sources.len(),
            "Resolved vote weight"
        );

        self.proposals
            .require_mut(proposal_id)?
            .cast_vote(voter, choice, weight, &sources)?;

        tracing::info!(proposal_id, voter = %voter, choice = ?choice, weight = %weight, at = now, "Vote cast");
        self.events.push(GovernanceEvent::VoteCast {
            id: proposal_id,
            voter,
            choice,
            weight,
        });
        Ok(weight)
    }

    /// Finalize voting and start the timelock. Open to any caller.
    ///
    /// Returns `Queued` on approval or `Rejected` when quorum is met but the
    /// majority is not for. Missing quorum fails with `QuorumNotMet` and the
    /// proposal stays `Pending`, so it can be queued again later.
    pub fn queue(&mut self, proposal_id: u64, now: Timestamp) -> GovernanceResult<ProposalStatus> {
        let threshold = self.quorum_threshold();
        let proposal = self.proposals.require(proposal_id)?;

        let outcome = match proposal.status {
            ProposalStatus::Pending => proposal.evaluate(threshold)?,
            ProposalStatus::Approved => ProposalStatus::Approved,
            status => {
                return Err(GovernanceError::ProposalNotOpen {
                    id: proposal_id,
                    status,
                })
            }
        };
        tracing::debug!(
            proposal_id,
            cast = %proposal.total_votes(),
            threshold = %threshold,
            "Quorum reached"
        );

        if outcome == ProposalStatus::Rejected {
            let (for_votes, against_votes) = (proposal.for_votes, proposal.against_votes);
            self.proposals.require_mut(proposal_id)?.reject();

            tracing::info!(proposal_id, for_votes = %for_votes, against_votes = %against_votes, "Proposal rejected");
            self.events.push(GovernanceEvent::ProposalRejected {
                id: proposal_id,
                for_votes,
                against_votes,
            });
            return Ok(ProposalStatus::Rejected);
        }

        let eta = self.timelock.schedule(proposal_id, now)?;
        let proposal = self.proposals.require_mut(proposal_id)?;
        proposal.approve();
        proposal.mark_queued(now);

        tracing::info!(proposal_id, eta, "Proposal queued");
        self.events.push(GovernanceEvent::ProposalQueued { id: proposal_id, eta });
        Ok(ProposalStatus::Queued)
    }

    /// Execute a queued proposal once its delay has elapsed. Requires the
    /// `Executor` role. A proposal with a treasury action pays it out; one
    /// without simply moves to `Executed`.
    pub fn execute(&mut self, caller: Address, proposal_id: u64, now: Timestamp) -> GovernanceResult<()> {
        self.roles.require(Role::Executor, &caller)?;

        let proposal = self.proposals.require(proposal_id)?;
        proposal.ensure_queued()?;
        self.timelock.check_ready(proposal_id, now)?;

        // last fallible step: nothing below can fail once the payout succeeds
        if let Some(action) = proposal.action {
            self.treasury.transfer_from_bucket(
                self.address,
                action.bucket,
                action.recipient,
                action.amount,
                now,
            )?;
            self.events.push(GovernanceEvent::TreasuryTransfer {
                bucket: action.bucket,
                recipient: action.recipient,
                amount: action.amount,
            });
        }
        self.timelock.execute(proposal_id, now)?;
        self.proposals.require_mut(proposal_id)?.mark_executed(now);

        tracing::info!(proposal_id, executor = %caller, at = now, "Proposal executed");
        self.events.push(GovernanceEvent::ProposalExecuted { id: proposal_id, at: now });
        Ok(())
    }

    /// Cancel an approved or queued proposal. Guardian only.
    pub fn cancel(&mut self, caller: Address, proposal_id: u64, now: Timestamp) -> GovernanceResult<()> {
        self.timelock.ensure_guardian(&caller, &self.roles)?;
        self.proposals.require(proposal_id)?.ensure_cancellable()?;

        self.timelock.cancel(&caller, proposal_id, &self.roles)?;
        self.proposals.require_mut(proposal_id)?.mark_cancelled(now);

        tracing::info!(proposal_id, guardian = %caller, "Proposal cancelled");
        self.events.push(GovernanceEvent::ProposalCancelled {
            id: proposal_id,
            by: caller,
        });
        Ok(())
    }

    // === Treasury ===

    pub fn deposit(
        &mut self,
        depositor: Address,
        bucket: Bucket,
        amount: Amount,
        now: Timestamp,
    ) -> GovernanceResult<Amount> {
        let balance = self.treasury.deposit(depositor, bucket, amount, now)?;
        self.events.push(GovernanceEvent::TreasuryDeposit {
            from: depositor,
            bucket,
            amount,
        });
        Ok(balance)
    }

    /// Accept funds sent without a bucket. Zero amounts are accepted and
    /// leave no trace.
    pub fn receive_funds(&mut self, from: Address, amount: Amount, now: Timestamp) -> GovernanceResult<Amount> {
        let balance = self.treasury.receive(from, amount, now)?;
        if !amount.is_zero() {
            self.events.push(GovernanceEvent::TreasuryDeposit {
                from,
                bucket: Bucket::Unallocated,
                amount,
            });
        }
        Ok(balance)
    }

    // === Queries ===

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    pub fn stakes(&self) -> &StakeLedger {
        &self.stakes
    }

    pub fn delegation(&self) -> &DelegationGraph {
        &self.delegation
    }

    pub fn roles(&self) -> &RoleRegistry {
        &self.roles
    }

    pub fn proposals(&self) -> &ProposalStore {
        &self.proposals
    }

    pub fn proposal(&self, id: u64) -> Option<&Proposal> {
        self.proposals.get(id)
    }

    pub fn proposal_count(&self) -> u64 {
        self.proposals.proposal_count()
    }

    pub fn timelock(&self) -> &Timelock {
        &self.timelock
    }

    pub fn treasury(&self) -> &Treasury {
        &self.treasury
    }

    /// Current quorum threshold over the total staked supply.
    pub fn quorum_threshold(&self) -> Amount {
        self.config.quorum_threshold(self.stakes.total_staked())
    }

    pub fn resolved_power(&self, member: Address) -> Amount {
        self.delegation.resolved_power(member, &self.stakes)
    }

    pub fn events(&self) -> &[GovernanceEvent] {
        self.events.events()
    }

    pub fn drain_events(&mut self) -> Vec<GovernanceEvent> {
        self.events.drain()
    }
}
