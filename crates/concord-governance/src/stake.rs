//! Stake ledger.
//!
//! A member's staked balance is the only source of voting weight. Members
//! are created on their first stake and never removed.

use std::collections::HashMap;

use concord_types::{Address, Amount};

use crate::error::{GovernanceError, GovernanceResult};

/// Staked balances by member.
#[derive(Debug, Default, Clone)]
pub struct StakeLedger {
    balances: HashMap<Address, Amount>,
    total_staked: Amount,
}

impl StakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to the member's stake.
    ///
    /// # Errors
    /// - `InvalidAmount` for a zero amount
    /// - `ArithmeticOverflow` if the member or total balance would overflow
    pub fn stake(&mut self, member: Address, amount: Amount) -> GovernanceResult<Amount> {
        if amount.is_zero() {
            return Err(GovernanceError::InvalidAmount);
        }

        let current = self.voting_power(&member);
        let balance = current
            .checked_add(amount)
            .ok_or(GovernanceError::ArithmeticOverflow)?;
        let total = self
            .total_staked
            .checked_add(amount)
            .ok_or(GovernanceError::ArithmeticOverflow)?;

        self.balances.insert(member, balance);
        self.total_staked = total;

        tracing::info!(member = %member, amount = %amount, balance = %balance, "Stake recorded");
        Ok(balance)
    }

    /// The member's own staked balance. Delegation is not applied here.
    pub fn voting_power(&self, member: &Address) -> Amount {
        self.balances.get(member).copied().unwrap_or(Amount::ZERO)
    }

    pub fn total_staked(&self) -> Amount {
        self.total_staked
    }

    pub fn is_member(&self, member: &Address) -> bool {
        self.balances.contains_key(member)
    }

    /// All members with their balances, in no particular order.
    pub fn members(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.balances.iter()
    }

    pub fn member_count(&self) -> usize {
        self.balances.len()
    }
}
