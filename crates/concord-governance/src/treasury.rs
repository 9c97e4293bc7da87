//! Treasury management for governance funds.
//!
//! Funds sit in named buckets drawn from one custody pool. Anyone may add
//! funds; only the DAO identity fixed at construction may take them out.
//! The bucket balances always sum to the custodied total.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use concord_types::{Address, Amount, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::{GovernanceError, GovernanceResult};

/// Named treasury partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Bucket {
    HighConviction = 0,
    Experimental = 1,
    Operational = 2,
    /// Funds received without a bucket
    Unallocated = 3,
}

impl Bucket {
    pub const ALL: [Bucket; 4] = [
        Bucket::HighConviction,
        Bucket::Experimental,
        Bucket::Operational,
        Bucket::Unallocated,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Bucket::HighConviction => "High Conviction",
            Bucket::Experimental => "Experimental",
            Bucket::Operational => "Operational",
            Bucket::Unallocated => "Unallocated",
        }
    }
}

impl TryFrom<u8> for Bucket {
    type Error = GovernanceError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Bucket::HighConviction),
            1 => Ok(Bucket::Experimental),
            2 => Ok(Bucket::Operational),
            3 => Ok(Bucket::Unallocated),
            other => Err(GovernanceError::InvalidBucket(other)),
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Type of treasury transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    /// Funds deposited into a named bucket
    Deposit,
    /// Unsolicited funds credited to `Unallocated`
    Receive,
    /// Funds paid out on DAO instruction
    Transfer,
}

/// Treasury transaction record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryTransaction {
    pub tx_type: TransactionType,
    pub bucket: Bucket,
    pub amount: Amount,
    /// Depositor, or the recipient of a transfer
    pub counterparty: Address,
    pub at: Timestamp,
}

/// Bucketed treasury.
#[derive(Debug, Clone)]
pub struct Treasury {
    dao: Address,
    buckets: BTreeMap<Bucket, Amount>,
    total_held: Amount,
    paid_out: HashMap<Address, Amount>,
    transactions: Vec<TreasuryTransaction>,
}

impl Treasury {
    /// Create an empty treasury controlled by `dao`.
    pub fn new(dao: Address) -> Self {
        Self {
            dao,
            buckets: BTreeMap::new(),
            total_held: Amount::ZERO,
            paid_out: HashMap::new(),
            transactions: Vec::new(),
        }
    }

    /// The only identity allowed to move funds out.
    pub fn dao(&self) -> Address {
        self.dao
    }

    fn credit(
        &mut self,
        tx_type: TransactionType,
        from: Address,
        bucket: Bucket,
        amount: Amount,
        now: Timestamp,
    ) -> GovernanceResult<Amount> {
        let balance = self
            .balance(bucket)
            .checked_add(amount)
            .ok_or(GovernanceError::ArithmeticOverflow)?;
        let total = self
            .total_held
            .checked_add(amount)
            .ok_or(GovernanceError::ArithmeticOverflow)?;

        self.buckets.insert(bucket, balance);
        self.total_held = total;
        self.transactions.push(TreasuryTransaction {
            tx_type,
            bucket,
            amount,
            counterparty: from,
            at: now,
        });

        tracing::info!(bucket = %bucket, amount = %amount, from = %from, "Treasury credited");
        Ok(balance)
    }

    /// Add funds to a named bucket. Any caller may deposit.
    pub fn deposit(
        &mut self,
        from: Address,
        bucket: Bucket,
        amount: Amount,
        now: Timestamp,
    ) -> GovernanceResult<Amount> {
        if amount.is_zero() {
            return Err(GovernanceError::InvalidAmount);
        }
        self.credit(TransactionType::Deposit, from, bucket, amount, now)
    }

    /// Accept unsolicited funds into `Unallocated`. Never fails on a zero
    /// amount; it simply records nothing.
    pub fn receive(&mut self, from: Address, amount: Amount, now: Timestamp) -> GovernanceResult<Amount> {
        if amount.is_zero() {
            return Ok(self.balance(Bucket::Unallocated));
        }
        self.credit(TransactionType::Receive, from, Bucket::Unallocated, amount, now)
    }

    /// Pay `amount` from `Unallocated` to `recipient`.
    pub fn transfer_funds(
        &mut self,
        caller: Address,
        recipient: Address,
        amount: Amount,
        now: Timestamp,
    ) -> GovernanceResult<()> {
        self.transfer_from_bucket(caller, Bucket::Unallocated, recipient, amount, now)
    }

    /// Check that a bucket payout would succeed, without moving funds.
    pub fn check_transfer(&self, caller: Address, bucket: Bucket, amount: Amount) -> GovernanceResult<()> {
        if caller != self.dao {
            tracing::warn!(caller = %caller, "Treasury transfer rejected: caller is not the DAO");
            return Err(GovernanceError::Unauthorized(
                "Only the DAO can move treasury funds".to_string(),
            ));
        }
        if amount.is_zero() {
            return Err(GovernanceError::InvalidAmount);
        }
        let available = self.balance(bucket);
        if available < amount {
            return Err(GovernanceError::InsufficientBalance {
                bucket,
                available,
                requested: amount,
            });
        }
        Ok(())
    }

    /// Pay `amount` from `bucket` to `recipient`.
    ///
    /// # Errors
    /// - `Unauthorized` unless `caller` is the DAO
    /// - `InvalidAmount` for a zero amount
    /// - `InsufficientBalance` if the bucket holds less than `amount`
    pub fn transfer_from_bucket(
        &mut self,
        caller: Address,
        bucket: Bucket,
        recipient: Address,
        amount: Amount,
        now: Timestamp,
    ) -> GovernanceResult<()> {
        self.check_transfer(caller, bucket, amount)?;

        let balance = self.balance(bucket).saturating_sub(amount);
        let paid = self
            .paid_out(&recipient)
            .checked_add(amount)
            .ok_or(GovernanceError::ArithmeticOverflow)?;

        self.buckets.insert(bucket, balance);
        self.total_held = self.total_held.saturating_sub(amount);
        self.paid_out.insert(recipient, paid);
        self.transactions.push(TreasuryTransaction {
            tx_type: TransactionType::Transfer,
            bucket,
            amount,
            counterparty: recipient,
            at: now,
        });

        tracing::info!(
            bucket = %bucket,
            amount = %amount,
            recipient = %recipient,
            remaining = %balance,
            "Treasury funds transferred"
        );
        Ok(())
    }

    pub fn balance(&self, bucket: Bucket) -> Amount {
        self.buckets.get(&bucket).copied().unwrap_or(Amount::ZERO)
    }

    /// Total custodied funds.
    pub fn total_held(&self) -> Amount {
        self.total_held
    }

    /// Total paid to `recipient` so far.
    pub fn paid_out(&self, recipient: &Address) -> Amount {
        self.paid_out.get(recipient).copied().unwrap_or(Amount::ZERO)
    }

    /// Recipients with their cumulative payouts, in no particular order.
    pub fn payouts(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.paid_out.iter()
    }

    /// Transaction history, oldest first.
    pub fn history(&self) -> &[TreasuryTransaction] {
        &self.transactions
    }

    /// Non-zero bucket balances, in bucket order.
    pub fn balances(&self) -> impl Iterator<Item = (Bucket, Amount)> + '_ {
        self.buckets
            .iter()
            .filter(|(_, amount)| !amount.is_zero())
            .map(|(bucket, amount)| (*bucket, *amount))
    }

    /// Whether the bucket balances sum exactly to the custodied total.
    pub fn check_conservation(&self) -> bool {
        let mut sum = Amount::ZERO;
        for amount in self.buckets.values() {
            match sum.checked_add(*amount) {
                Some(next) => sum = next,
                None => return false,
            }
        }
        sum == self.total_held
    }

    /// Rebuild balances from persisted bucket records.
    pub(crate) fn from_balances(
        dao: Address,
        balances: impl IntoIterator<Item = (Bucket, Amount)>,
    ) -> GovernanceResult<Self> {
        let mut treasury = Self::new(dao);
        for (bucket, amount) in balances {
            if treasury.buckets.insert(bucket, amount).is_some() {
                return Err(GovernanceError::InvalidSnapshot(format!(
                    "bucket {} listed twice",
                    bucket
                )));
            }
            treasury.total_held = treasury
                .total_held
                .checked_add(amount)
                .ok_or(GovernanceError::ArithmeticOverflow)?;
        }
        Ok(treasury)
    }

    /// Replay persisted history. Balances are restored separately, so only
    /// the records themselves are checked.
    pub(crate) fn restore_history(
        &mut self,
        history: impl IntoIterator<Item = TreasuryTransaction>,
    ) -> GovernanceResult<()> {
        let mut last = 0;
        for tx in history {
            if tx.amount.is_zero() {
                return Err(GovernanceError::InvalidSnapshot(
                    "zero-amount treasury transaction".to_string(),
                ));
            }
            if tx.tx_type == TransactionType::Receive && tx.bucket != Bucket::Unallocated {
                return Err(GovernanceError::InvalidSnapshot(format!(
                    "receipt credited to {}",
                    tx.bucket
                )));
            }
            if tx.at < last {
                return Err(GovernanceError::InvalidSnapshot(
                    "treasury history out of order".to_string(),
                ));
            }
            last = tx.at;
            self.transactions.push(tx);
        }
        Ok(())
    }

    pub(crate) fn restore_payout(&mut self, recipient: Address, amount: Amount) -> GovernanceResult<()> {
        if self.paid_out.insert(recipient, amount).is_some() {
            return Err(GovernanceError::InvalidSnapshot(format!(
                "payout to {} listed twice",
                recipient
            )));
        }
        Ok(())
    }
}
