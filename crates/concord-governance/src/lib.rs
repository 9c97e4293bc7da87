//! Concord Governance - staked DAO governance engine.
//!
//! This crate provides:
//! - Stake ledger and liquid delegation
//! - Role registry for privileged callers
//! - Proposal lifecycle with quorum and timelocked execution
//! - Bucketed treasury that pays out only on DAO instruction
//! - Event log and snapshots of the full state

pub mod config;
pub mod dao;
pub mod delegation;
pub mod error;
pub mod events;
pub mod proposal;
pub mod roles;
pub mod snapshot;
pub mod stake;
pub mod timelock;
pub mod treasury;

pub use config::GovernanceConfig;
pub use dao::GovernanceDao;
pub use delegation::{Delegation, DelegationGraph};
pub use error::{GovernanceError, GovernanceResult};
pub use events::{EventLog, GovernanceEvent};
pub use proposal::{Proposal, ProposalStatus, ProposalStore, TreasuryAction, VoteChoice, VoteRecord};
pub use roles::{Role, RoleRegistry};
pub use snapshot::GovernanceSnapshot;
pub use stake::StakeLedger;
pub use timelock::{QueuedAction, Timelock};
pub use treasury::{Bucket, TransactionType, Treasury, TreasuryTransaction};
