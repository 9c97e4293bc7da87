//! End-to-end governance scenarios.

mod common;

use common::{addr, setup, EXECUTOR, GUARDIAN};
use concord_governance::{
    Bucket, GovernanceError, GovernanceEvent, ProposalStatus, TreasuryAction, VoteChoice,
};
use concord_types::Amount;

/// 0.1 unit
const TENTH: Amount = Amount::from_raw(100_000_000_000_000_000);

#[test]
fn test_small_stake_misses_quorum() {
    let mut dao = setup();
    let member = addr(1);

    dao.stake(member, TENTH).unwrap();
    let id = dao.create_proposal(member, None, "Fund research", 0).unwrap();
    dao.vote(member, id, VoteChoice::For, 1).unwrap();

    let err = dao.queue(id, 2).unwrap_err();
    assert!(err.to_string().starts_with("Quorum not met"));
    assert_eq!(
        err,
        GovernanceError::QuorumNotMet {
            cast: TENTH,
            required: Amount::UNIT,
        }
    );
    assert_eq!(dao.proposal(id).unwrap().status, ProposalStatus::Pending);
    assert!(!dao.timelock().is_queued(id));
}

#[test]
fn test_quorum_miss_can_be_retried() {
    let mut dao = setup();
    dao.stake(addr(1), TENTH).unwrap();
    let id = dao.create_proposal(addr(1), None, "retry", 0).unwrap();
    dao.vote(addr(1), id, VoteChoice::For, 1).unwrap();
    assert!(dao.queue(id, 2).is_err());

    // a new member stakes and votes; the proposal is still open
    dao.stake(addr(2), Amount::from_units(2)).unwrap();
    dao.vote(addr(2), id, VoteChoice::For, 3).unwrap();
    assert_eq!(dao.queue(id, 4).unwrap(), ProposalStatus::Queued);
}

#[test]
fn test_full_lifecycle() {
    let mut dao = setup();
    let (m1, m2, m3) = (addr(1), addr(2), addr(3));

    dao.stake(m1, Amount::from_units(5)).unwrap();
    dao.stake(m2, Amount::from_units(3)).unwrap();
    dao.stake(m3, Amount::from_units(1)).unwrap();

    let id = dao.create_proposal(m1, None, "Adopt charter", 1_000).unwrap();
    assert_eq!(id, 1);
    assert_eq!(dao.proposal_count(), 1);

    dao.vote(m1, id, VoteChoice::For, 1_001).unwrap();
    dao.vote(m2, id, VoteChoice::For, 1_002).unwrap();
    dao.vote(m3, id, VoteChoice::Against, 1_003).unwrap();

    let proposal = dao.proposal(id).unwrap();
    assert_eq!(proposal.for_votes, Amount::from_units(8));
    assert_eq!(proposal.against_votes, Amount::from_units(1));

    assert_eq!(dao.queue(id, 1_010).unwrap(), ProposalStatus::Queued);
    assert_eq!(dao.proposal(id).unwrap().queued_at, Some(1_010));

    let delay = dao.timelock().delay();
    assert_eq!(
        dao.execute(addr(EXECUTOR), id, 1_010 + delay - 1),
        Err(GovernanceError::TimelockNotExpired {
            now: 1_010 + delay - 1,
            eta: 1_010 + delay,
        })
    );

    dao.execute(addr(EXECUTOR), id, 1_010 + delay).unwrap();
    let proposal = dao.proposal(id).unwrap();
    assert_eq!(proposal.status, ProposalStatus::Executed);
    assert_eq!(proposal.executed_at, Some(1_010 + delay));

    // no-op proposal moved no funds
    assert_eq!(dao.treasury().total_held(), Amount::ZERO);
    assert!(dao.treasury().history().is_empty());

    assert_eq!(
        dao.execute(addr(EXECUTOR), id, 1_010 + delay + 1),
        Err(GovernanceError::NotQueued(id))
    );
}

#[test]
fn test_double_vote_rejected() {
    let mut dao = setup();
    dao.stake(addr(1), Amount::from_units(2)).unwrap();
    let id = dao.create_proposal(addr(1), None, "once", 0).unwrap();

    dao.vote(addr(1), id, VoteChoice::For, 1).unwrap();
    assert_eq!(
        dao.vote(addr(1), id, VoteChoice::Against, 2),
        Err(GovernanceError::AlreadyVoted)
    );

    let proposal = dao.proposal(id).unwrap();
    assert_eq!(proposal.for_votes, Amount::from_units(2));
    assert_eq!(proposal.against_votes, Amount::ZERO);
}

#[test]
fn test_vote_errors() {
    let mut dao = setup();
    dao.stake(addr(1), Amount::from_units(2)).unwrap();

    assert_eq!(
        dao.vote(addr(1), 42, VoteChoice::For, 0),
        Err(GovernanceError::UnknownProposal(42))
    );
    assert_eq!(VoteChoice::try_from(7), Err(GovernanceError::InvalidVoteChoice(7)));

    let id = dao.create_proposal(addr(1), None, "closed", 0).unwrap();
    dao.vote(addr(1), id, VoteChoice::For, 0).unwrap();
    dao.queue(id, 1).unwrap();

    dao.stake(addr(2), Amount::UNIT).unwrap();
    assert_eq!(
        dao.vote(addr(2), id, VoteChoice::For, 2),
        Err(GovernanceError::ProposalNotOpen {
            id,
            status: ProposalStatus::Queued,
        })
    );
}

#[test]
fn test_delegated_voting() {
    let mut dao = setup();
    let (alice, bob, carol) = (addr(1), addr(2), addr(3));
    dao.stake(alice, Amount::from_units(4)).unwrap();
    dao.stake(bob, Amount::from_units(1)).unwrap();
    dao.stake(carol, Amount::from_units(2)).unwrap();

    // alice -> bob -> carol
    dao.delegate(alice, bob, 0).unwrap();
    dao.delegate(bob, carol, 0).unwrap();
    assert_eq!(dao.resolved_power(carol), Amount::from_units(7));
    assert_eq!(dao.resolved_power(alice), Amount::ZERO);

    // delegating away gives up the standing to propose
    assert_eq!(
        dao.create_proposal(alice, None, "p", 0),
        Err(GovernanceError::NoVotingPower)
    );
    let id = dao.create_proposal(carol, None, "p", 0).unwrap();
    assert_eq!(dao.vote(carol, id, VoteChoice::For, 1).unwrap(), Amount::from_units(7));
    assert_eq!(dao.vote(bob, id, VoteChoice::Against, 1), Err(GovernanceError::NoVotingPower));
}

#[test]
fn test_delegation_cycles_rejected() {
    let mut dao = setup();
    let (a, b, c) = (addr(1), addr(2), addr(3));

    assert_eq!(dao.delegate(a, a, 0), Err(GovernanceError::SelfDelegation));
    dao.delegate(a, b, 0).unwrap();
    assert_eq!(dao.delegate(b, a, 0), Err(GovernanceError::CycleDetected));
    dao.delegate(b, c, 0).unwrap();
    assert_eq!(dao.delegate(c, a, 0), Err(GovernanceError::CycleDetected));

    assert_eq!(dao.delegation().resolve_delegate(a), c);
    assert_eq!(dao.delegation().delegated_to(&c), None);
}

#[test]
fn test_delegate_then_revoke_restores_power() {
    let mut dao = setup();
    let (u, v) = (addr(1), addr(2));
    dao.stake(u, Amount::from_units(3)).unwrap();
    dao.stake(v, Amount::from_units(2)).unwrap();

    let before = (dao.resolved_power(u), dao.resolved_power(v));
    dao.delegate(u, v, 0).unwrap();
    assert_eq!(dao.resolved_power(v), Amount::from_units(5));
    assert_eq!(dao.revoke_delegation(u), Some(v));
    assert_eq!((dao.resolved_power(u), dao.resolved_power(v)), before);
}

#[test]
fn test_treasury_payout_proposal() {
    let mut dao = setup();
    let donor = addr(9);
    let recipient = addr(77);

    dao.deposit(donor, Bucket::HighConviction, Amount::from_units(10), 0).unwrap();
    dao.deposit(donor, Bucket::Experimental, Amount::from_units(5), 0).unwrap();
    dao.deposit(donor, Bucket::Operational, Amount::from_units(2), 0).unwrap();
    assert_eq!(dao.treasury().total_held(), Amount::from_units(17));

    dao.stake(addr(1), Amount::from_units(5)).unwrap();
    let action = TreasuryAction {
        bucket: Bucket::HighConviction,
        recipient,
        amount: Amount::UNIT,
    };
    let id = dao.create_proposal(addr(1), Some(action), "Grant", 0).unwrap();
    dao.vote(addr(1), id, VoteChoice::For, 1).unwrap();
    dao.queue(id, 2).unwrap();
    dao.execute(addr(EXECUTOR), id, 100).unwrap();

    let treasury = dao.treasury();
    assert_eq!(treasury.balance(Bucket::HighConviction), Amount::from_units(9));
    assert_eq!(treasury.total_held(), Amount::from_units(16));
    assert_eq!(treasury.paid_out(&recipient), Amount::UNIT);
    assert!(treasury.check_conservation());
}

#[test]
fn test_unsolicited_funds_land_unallocated() {
    let mut dao = setup();
    dao.receive_funds(addr(5), Amount::from_units(3), 0).unwrap();
    dao.receive_funds(addr(5), Amount::ZERO, 0).unwrap();
    assert_eq!(dao.treasury().balance(Bucket::Unallocated), Amount::from_units(3));
    assert_eq!(dao.treasury().total_held(), Amount::from_units(3));
}

#[test]
fn test_guardian_cancels_queued_proposal() {
    let mut dao = setup();
    dao.stake(addr(1), Amount::from_units(5)).unwrap();
    let id = dao.create_proposal(addr(1), None, "risky", 0).unwrap();
    dao.vote(addr(1), id, VoteChoice::For, 1).unwrap();
    dao.queue(id, 2).unwrap();

    assert!(matches!(
        dao.cancel(addr(EXECUTOR), id, 3),
        Err(GovernanceError::Unauthorized(_))
    ));
    dao.cancel(addr(GUARDIAN), id, 3).unwrap();
    assert_eq!(dao.proposal(id).unwrap().status, ProposalStatus::Cancelled);
    assert!(matches!(
        dao.cancel(addr(GUARDIAN), id, 4),
        Err(GovernanceError::NotCancellable { .. })
    ));
}

#[test]
fn test_failed_calls_leave_state_unchanged() {
    let mut dao = setup();
    dao.stake(addr(1), Amount::from_units(5)).unwrap();
    dao.deposit(addr(9), Bucket::Operational, Amount::UNIT, 0).unwrap();
    let action = TreasuryAction {
        bucket: Bucket::Operational,
        recipient: addr(50),
        amount: Amount::from_units(2),
    };
    let id = dao.create_proposal(addr(1), Some(action), "overdraw", 0).unwrap();
    dao.vote(addr(1), id, VoteChoice::For, 0).unwrap();
    dao.queue(id, 0).unwrap();

    let before = dao.snapshot();
    let events = dao.events().len();

    assert!(dao.stake(addr(1), Amount::ZERO).is_err());
    assert!(dao.vote(addr(1), id, VoteChoice::For, 1).is_err());
    assert!(dao.queue(id, 1).is_err());
    assert!(dao.execute(addr(EXECUTOR), id, 10).is_err());
    assert!(dao.execute(addr(EXECUTOR), id, 1_000).is_err());
    assert!(dao.execute(addr(1), id, 1_000).is_err());
    assert!(dao.cancel(addr(1), id, 1_000).is_err());
    assert!(dao.deposit(addr(9), Bucket::Operational, Amount::ZERO, 0).is_err());
    assert!(dao.delegate(addr(1), addr(1), 0).is_err());
    assert!(dao.create_proposal(addr(2), None, "no power", 0).is_err());

    assert_eq!(dao.snapshot(), before);
    assert_eq!(dao.events().len(), events);
}

#[test]
fn test_event_trail() {
    let mut dao = setup();
    dao.stake(addr(1), Amount::from_units(5)).unwrap();
    let id = dao.create_proposal(addr(1), None, "trail", 0).unwrap();
    dao.vote(addr(1), id, VoteChoice::For, 1).unwrap();
    dao.queue(id, 2).unwrap();
    dao.execute(addr(EXECUTOR), id, 62).unwrap();

    let events = dao.drain_events();
    let kinds: Vec<&str> = events
        .iter()
        .map(|e| match e {
            GovernanceEvent::Staked { .. } => "staked",
            GovernanceEvent::ProposalCreated { .. } => "created",
            GovernanceEvent::VoteCast { .. } => "vote",
            GovernanceEvent::ProposalQueued { .. } => "queued",
            GovernanceEvent::ProposalExecuted { .. } => "executed",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, vec!["staked", "created", "vote", "queued", "executed"]);
    assert!(events.iter().skip(1).all(|e| e.proposal_id() == Some(id)));
}
