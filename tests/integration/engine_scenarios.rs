//! End-to-end rank engine scenarios and invariant property tests, independent of the network
//! layer. Scenario numbering follows the concrete walkthroughs used to pin down tie-break and
//! tail-visibility behavior during design.

use proptest::prelude::*;
use sirius::engine::{ArrayEngine, RankEngine, RankEngineConfig, RankUnit, RedundantEngine};

fn unit(id: u64, key: u64, value: &str) -> RankUnit {
    RankUnit {
        id,
        key,
        value: value.as_bytes().to_vec(),
    }
}

fn plain_config(max_size: u32) -> RankEngineConfig {
    RankEngineConfig {
        max_size,
        ..Default::default()
    }
}

#[test]
fn scenario_1_basic_insert_and_rank_order() {
    let mut e = ArrayEngine::new(plain_config(2));
    e.update(unit(1024, 10, "S"));
    e.update(unit(1025, 12, "M"));

    assert_eq!(e.size(), 2);
    let (exist, top) = e.get_by_rank(0);
    assert!(exist);
    assert_eq!((top.id, top.key), (1025, 12));
    let (exist, second) = e.get_by_rank(1);
    assert!(exist);
    assert_eq!((second.id, second.key), (1024, 10));
}

#[test]
fn scenario_2_full_rank_overwrites_the_tail_rather_than_growing() {
    let mut e = ArrayEngine::new(plain_config(2));
    e.update(unit(1024, 10, "S"));
    e.update(unit(1025, 12, "M"));
    e.update(unit(1026, 14, "X"));

    assert_eq!(e.size(), 2);
    let (_, top) = e.get_by_rank(0);
    assert_eq!(top.id, 1026);
    let (_, second) = e.get_by_rank(1);
    assert_eq!(second.id, 1025);
}

#[test]
fn scenario_3_redundant_tail_hides_then_resurfaces_an_evicted_unit() {
    let mut e = RedundantEngine::new(RankEngineConfig {
        max_size: 2,
        redundant_node_num: 1,
        ..Default::default()
    });
    e.update(unit(1024, 10, "a"));
    e.update(unit(1025, 12, "b"));
    e.update(unit(1026, 14, "c"));

    assert_eq!(e.size(), 2);
    let (exist, _, _) = e.get(1024);
    assert!(!exist, "evicted unit must not be visible");

    let (existed, ..) = e.delete(1025);
    assert!(existed);
    let (exist, pos) = e.get_by_rank(1);
    assert!(exist);
    assert_eq!(pos.id, 1024);
}

#[test]
fn scenario_4_cron_snapshots_exactly_once_per_window() {
    use sirius::engine::TimePeriod;

    let mut primary = ArrayEngine::new(plain_config(10));
    primary.update(unit(1024, 10, "a"));
    primary.update(unit(1025, 12, "b"));

    let mut snapshot = ArrayEngine::new(plain_config(10));
    let period = TimePeriod::new(1_000, 5, 1);
    snapshot.set_last_snapshot_time(995);

    let due = |snap: &ArrayEngine, now: u64| {
        !period.empty() && period.next_time(snap.last_snapshot_time()) <= now
    };

    assert!(due(&snapshot, 1_000));
    snapshot.copy_from(&primary);
    snapshot.set_last_snapshot_time(1_000);
    assert_eq!(snapshot.size(), 2);

    assert!(!due(&snapshot, 1_002));
    assert!(!due(&snapshot, 1_004));
}

#[test]
fn replace_with_preserves_sort_order_established_by_get_range() {
    let mut source = ArrayEngine::new(plain_config(10));
    source.update(unit(1, 30, ""));
    source.update(unit(2, 20, ""));
    source.update(unit(3, 10, ""));

    let mut dest = ArrayEngine::new(plain_config(10));
    dest.replace_with(source.get_range(0, source.size()));

    let ids: Vec<u64> = dest.get_range(0, 10).iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

fn rank_unit_strategy() -> impl Strategy<Value = RankUnit> {
    (0u64..50, 0u64..1_000, proptest::collection::vec(any::<u8>(), 0..8)).prop_map(
        |(id, key, value)| RankUnit { id, key, value },
    )
}

fn assert_sorted_and_unique(units: &[RankUnit]) {
    for pair in units.windows(2) {
        assert!(pair[0].key >= pair[1].key, "rank order violated: {:?}", units);
    }
    let mut ids: Vec<u64> = units.iter().map(|u| u.id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), units.len(), "duplicate id survived in {:?}", units);
}

proptest! {
    #[test]
    fn array_engine_stays_sorted_unique_and_within_capacity(
        ops in proptest::collection::vec(rank_unit_strategy(), 0..64),
    ) {
        let mut e = ArrayEngine::new(plain_config(8));
        for op in ops {
            e.update(op);
        }
        let all = e.get_range(0, e.size());
        assert_sorted_and_unique(&all);
        prop_assert!(e.size() <= 8);
    }

    #[test]
    fn redundant_engine_visible_size_never_exceeds_max_size(
        ops in proptest::collection::vec(rank_unit_strategy(), 0..64),
    ) {
        let mut e = RedundantEngine::new(RankEngineConfig {
            max_size: 8,
            redundant_node_num: 4,
            ..Default::default()
        });
        for op in ops {
            e.update(op);
        }
        prop_assert!(e.size() <= 8);
        let visible = e.get_range(0, e.size());
        assert_sorted_and_unique(&visible);
    }

    #[test]
    fn create_snapshot_is_independent_of_later_mutation_prop(
        first in proptest::collection::vec(rank_unit_strategy(), 0..16),
        second in rank_unit_strategy(),
    ) {
        let mut e = ArrayEngine::new(plain_config(16));
        for u in first {
            e.update(u);
        }
        let before = e.get_range(0, e.size());
        let snap = e.create_snapshot();
        e.update(second);
        prop_assert_eq!(snap.get_range(0, snap.size()), before);
    }

    #[test]
    fn time_period_next_time_always_advances_past_from(
        start in 1u64..10_000,
        interval in 1u64..1_000,
        duration in 0u64..1_000,
        from in 0u64..20_000,
    ) {
        let tp = sirius::engine::TimePeriod::new(start, interval, duration);
        let next = tp.next_time(from);
        prop_assert!(next > from);
        if from >= start {
            prop_assert_eq!((next - start) % interval, 0);
        }
    }
}
