use concord_types::{Amount, Timestamp};
use thiserror::Error;

use crate::proposal::ProposalStatus;
use crate::treasury::Bucket;

/// Errors that can occur in governance operations.
///
/// Every failing call leaves all governance state untouched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GovernanceError {
    #[error("Invalid amount: must be greater than zero")]
    InvalidAmount,

    #[error("Self-delegation not allowed")]
    SelfDelegation,

    #[error("Delegation cycle detected")]
    CycleDetected,

    #[error("Unknown proposal: {0}")]
    UnknownProposal(u64),

    #[error("Proposal {id} is not open (status {status:?})")]
    ProposalNotOpen { id: u64, status: ProposalStatus },

    #[error("Already voted")]
    AlreadyVoted,

    #[error("Quorum not met: {cast} cast, more than {required} required")]
    QuorumNotMet { cast: Amount, required: Amount },

    #[error("Proposal {0} is not queued")]
    NotQueued(u64),

    #[error("Timelock not expired: now {now}, executable at {eta}")]
    TimelockNotExpired { now: Timestamp, eta: Timestamp },

    #[error("Proposal {0} is already queued")]
    AlreadyQueued(u64),

    #[error("Unknown queued action: {0}")]
    UnknownQueuedAction(u64),

    #[error("Insufficient treasury balance in {bucket:?}: {available} available, {requested} requested")]
    InsufficientBalance {
        bucket: Bucket,
        available: Amount,
        requested: Amount,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("No voting power")]
    NoVotingPower,

    #[error("Invalid vote choice: {0}")]
    InvalidVoteChoice(u8),

    #[error("Invalid bucket: {0}")]
    InvalidBucket(u8),

    #[error("Proposal {id} cannot be cancelled from status {status:?}")]
    NotCancellable { id: u64, status: ProposalStatus },

    #[error("Description too long: {len} > {max}")]
    DescriptionTooLong { len: usize, max: usize },

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

pub type GovernanceResult<T> = Result<T, GovernanceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quorum_error() {
        let err = GovernanceError::QuorumNotMet {
            cast: Amount::from_raw(100),
            required: Amount::from_raw(200),
        };
        assert!(err.to_string().starts_with("Quorum not met"));
        assert!(err.to_string().contains("100"));
        assert!(err.to_string().contains("200"));
    }

    #[test]
    fn test_insufficient_balance_error() {
        let err = GovernanceError::InsufficientBalance {
            bucket: Bucket::Unallocated,
            available: Amount::ZERO,
            requested: Amount::UNIT,
        };
        assert!(err.to_string().starts_with("Insufficient treasury balance"));
    }
}
