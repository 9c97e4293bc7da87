use concord_governance::{Bucket, GovernanceConfig, GovernanceDao, VoteChoice};
use concord_storage::SnapshotStore;
use concord_types::{Address, Amount};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use tempfile::TempDir;

fn member(i: u32) -> Address {
    let mut bytes = [0u8; 20];
    bytes[16..].copy_from_slice(&i.to_be_bytes());
    Address::from_bytes(bytes)
}

fn populated(members: u32, proposals: u32) -> GovernanceDao {
    let mut dao = GovernanceDao::bootstrap(
        member(u32::MAX),
        GovernanceConfig::devnet(),
        member(u32::MAX - 1),
        member(u32::MAX - 2),
    )
    .unwrap();
    for i in 0..members {
        dao.stake(member(i), Amount::from_units(1)).unwrap();
        if i % 2 == 1 {
            dao.delegate(member(i), member(i - 1), 0).unwrap();
        }
    }
    dao.deposit(member(0), Bucket::Operational, Amount::from_units(100), 0)
        .unwrap();
    for _ in 0..proposals {
        let id = dao.create_proposal(member(0), None, "bench", 0).unwrap();
        for i in (0..members).step_by(2) {
            dao.vote(member(i), id, VoteChoice::For, 1).unwrap();
        }
    }
    dao
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");
    let dao = populated(1_000, 20);

    group.bench_function("capture", |b| b.iter(|| black_box(dao.snapshot())));

    let snapshot = dao.snapshot();
    group.bench_function("restore", |b| {
        b.iter_batched(
            || snapshot.clone(),
            |snapshot| black_box(GovernanceDao::restore(snapshot).unwrap()),
            BatchSize::LargeInput,
        )
    });

    group.bench_function("save_json", |b| {
        b.iter_batched(
            || {
                let temp_dir = TempDir::new().unwrap();
                let store = SnapshotStore::open(temp_dir.path()).unwrap();
                (temp_dir, store)
            },
            |(_temp_dir, store)| store.save(&snapshot).unwrap(),
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_snapshot);
criterion_main!(benches);
