use concord_governance::{
    DelegationGraph, GovernanceConfig, GovernanceDao, Role, StakeLedger, VoteChoice,
};
use concord_types::{Address, Amount};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

fn member(i: u32) -> Address {
    let mut bytes = [0u8; 20];
    bytes[16..].copy_from_slice(&i.to_be_bytes());
    Address::from_bytes(bytes)
}

/// `n` staked members, each delegating to member 0 through a chain of
/// fan-in 4.
fn delegation_tree(n: u32) -> (DelegationGraph, StakeLedger) {
    let mut stakes = StakeLedger::new();
    let mut graph = DelegationGraph::new();
    for i in 0..n {
        stakes.stake(member(i), Amount::from_units(1)).unwrap();
        if i > 0 {
            graph.delegate(member(i), member((i - 1) / 4), 0).unwrap();
        }
    }
    (graph, stakes)
}

fn bench_delegation(c: &mut Criterion) {
    let mut group = c.benchmark_group("delegation");

    for n in [100u32, 1_000, 10_000] {
        let (graph, stakes) = delegation_tree(n);
        group.bench_function(format!("resolved_power_{n}"), |b| {
            b.iter(|| black_box(graph.resolved_power(member(0), &stakes)))
        });
    }

    let (graph, _) = delegation_tree(10_000);
    group.bench_function("cycle_check_deep_leaf", |b| {
        b.iter_batched(
            || graph.clone(),
            |mut graph| black_box(graph.delegate(member(0), member(9_999), 0).is_err()),
            BatchSize::LargeInput,
        )
    });

    group.finish();
}

fn dao_with_members(n: u32) -> GovernanceDao {
    let admin = member(u32::MAX - 1);
    let mut dao = GovernanceDao::bootstrap(
        member(u32::MAX),
        GovernanceConfig::devnet(),
        admin,
        member(u32::MAX - 2),
    )
    .unwrap();
    dao.grant_role(admin, Role::Executor, admin).unwrap();
    for i in 0..n {
        dao.stake(member(i), Amount::from_units(1 + i as u64 % 10)).unwrap();
    }
    dao
}

fn bench_vote_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("vote_path");

    group.bench_function("vote_500_members", |b| {
        b.iter_batched(
            || {
                let mut dao = dao_with_members(500);
                let id = dao.create_proposal(member(0), None, "bench", 0).unwrap();
                (dao, id)
            },
            |(mut dao, id)| {
                for i in 0..500 {
                    let choice = if i % 3 == 0 { VoteChoice::Against } else { VoteChoice::For };
                    dao.vote(member(i), id, choice, 1).unwrap();
                }
                black_box(dao.queue(id, 2).unwrap())
            },
            BatchSize::LargeInput,
        )
    });

    group.bench_function("full_lifecycle", |b| {
        b.iter_batched(
            || dao_with_members(3),
            |mut dao| {
                let id = dao.create_proposal(member(0), None, "bench", 0).unwrap();
                for i in 0..3 {
                    dao.vote(member(i), id, VoteChoice::For, 1).unwrap();
                }
                dao.queue(id, 2).unwrap();
                let executor = member(u32::MAX - 1);
                dao.execute(executor, id, 2 + dao.timelock().delay()).unwrap();
                black_box(dao.drain_events().len())
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_delegation, bench_vote_path);
criterion_main!(benches);
