//! Delegation graph.
//!
//! Each member has at most one outgoing edge. Edges form a forest: every
//! chain ends at a root that has not delegated, and `delegate` refuses any
//! edge that would close a cycle. A member's resolved voting power is the
//! stake of everyone whose chain ends at that member.

use std::collections::{HashMap, HashSet};

use concord_types::{Address, Amount, Timestamp};

use crate::error::{GovernanceError, GovernanceResult};
use crate::stake::StakeLedger;

/// Delegation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delegation {
    /// Delegator (who is delegating)
    pub delegator: Address,
    /// Delegate (who receives voting power)
    pub delegate: Address,
    /// When the edge was set
    pub created_at: Timestamp,
}

/// Delegation forest with a reverse index for power resolution.
#[derive(Debug, Default, Clone)]
pub struct DelegationGraph {
    /// delegator -> current delegation
    delegations: HashMap<Address, Delegation>,
    /// delegate -> direct delegators
    delegates: HashMap<Address, Vec<Address>>,
}

impl DelegationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point `delegator`'s edge at `delegate`, replacing any existing edge.
    ///
    /// # Errors
    /// - `SelfDelegation` if both ends are the same member
    /// - `CycleDetected` if `delegate` already reaches `delegator`
    pub fn delegate(
        &mut self,
        delegator: Address,
        delegate: Address,
        now: Timestamp,
    ) -> GovernanceResult<()> {
        if delegator == delegate {
            return Err(GovernanceError::SelfDelegation);
        }

        if self.delegated_to(&delegator) == Some(delegate) {
            return Ok(());
        }

        if self.would_create_cycle(delegator, delegate) {
            return Err(GovernanceError::CycleDetected);
        }

        self.unlink(&delegator);
        self.delegates.entry(delegate).or_default().push(delegator);
        self.delegations.insert(
            delegator,
            Delegation {
                delegator,
                delegate,
                created_at: now,
            },
        );

        tracing::info!(delegator = %delegator, delegate = %delegate, "Delegation set");
        Ok(())
    }

    /// Clear `delegator`'s outgoing edge. Returns the previous delegate, if any.
    pub fn revoke(&mut self, delegator: Address) -> Option<Address> {
        let previous = self.unlink(&delegator);
        if let Some(delegate) = previous {
            tracing::info!(delegator = %delegator, delegate = %delegate, "Delegation revoked");
        }
        previous
    }

    fn unlink(&mut self, delegator: &Address) -> Option<Address> {
        let delegation = self.delegations.remove(delegator)?;
        if let Some(delegators) = self.delegates.get_mut(&delegation.delegate) {
            delegators.retain(|d| d != delegator);
            if delegators.is_empty() {
                self.delegates.remove(&delegation.delegate);
            }
        }
        Some(delegation.delegate)
    }

    /// Path-to-root walk from `delegate`; a cycle closes iff it meets `delegator`.
    fn would_create_cycle(&self, delegator: Address, delegate: Address) -> bool {
        let mut current = delegate;
        while let Some(next) = self.delegated_to(&current) {
            if next == delegator {
                return true;
            }
            current = next;
        }
        false
    }

    /// Direct delegate of `member`, if it has delegated.
    pub fn delegated_to(&self, member: &Address) -> Option<Address> {
        self.delegations.get(member).map(|d| d.delegate)
    }

    pub fn get_delegation(&self, member: &Address) -> Option<&Delegation> {
        self.delegations.get(member)
    }

    pub fn is_delegating(&self, member: &Address) -> bool {
        self.delegations.contains_key(member)
    }

    /// Root of `member`'s chain: the member that ends up casting its weight.
    pub fn resolve_delegate(&self, member: Address) -> Address {
        let mut current = member;
        while let Some(next) = self.delegated_to(&current) {
            current = next;
        }
        current
    }

    /// Direct delegators of `delegate`.
    pub fn delegators(&self, delegate: &Address) -> Vec<Address> {
        self.delegates.get(delegate).cloned().unwrap_or_default()
    }

    /// Every member whose chain terminates at `member`, including `member`
    /// itself. Empty if `member` has delegated away.
    pub fn contributors(&self, member: Address) -> Vec<Address> {
        if self.is_delegating(&member) {
            return Vec::new();
        }

        let mut result = vec![member];
        let mut visited = HashSet::from([member]);
        let mut to_process = vec![member];

        while let Some(current) = to_process.pop() {
            for delegator in self.delegates.get(&current).into_iter().flatten() {
                if visited.insert(*delegator) {
                    result.push(*delegator);
                    to_process.push(*delegator);
                }
            }
        }

        result
    }

    /// Effective voting weight: own stake plus all stake delegated to
    /// `member` directly or transitively. Zero if `member` delegated away.
    pub fn resolved_power(&self, member: Address, stakes: &StakeLedger) -> Amount {
        self.contributors(member)
            .iter()
            .map(|c| stakes.voting_power(c))
            .sum()
    }

    /// All edges, in no particular order.
    pub fn edges(&self) -> impl Iterator<Item = &Delegation> {
        self.delegations.values()
    }

    pub fn edge_count(&self) -> usize {
        self.delegations.len()
    }
}
