//! Property-based tests for coverage balancing
//!
//! - Test allocation invariants over random pools
//! - Simulate many sequential allocations and check coverage stays even
//! - Run with ProptestConfig::with_cases(100)

use std::collections::HashSet;

use dilemma_study::coverage::{coverage_spread, select, PoolCounts};
use dilemma_study::record::TrialId;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

/// Pool of up to `max_trials` trials with counts in `0..max_count`
fn arb_pool(max_trials: usize, max_count: u64) -> impl Strategy<Value = PoolCounts> {
    proptest::collection::vec(0..max_count, 0..=max_trials).prop_map(|counts| {
        counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| (TrialId::new(i as u64 + 1), count))
            .collect()
    })
}

fn zero_pool(trials: usize) -> PoolCounts {
    (1..=trials as u64).map(|id| (TrialId::new(id), 0)).collect()
}

/// Persist a selection the way the store would: one more assignment each
fn apply(counts: &mut PoolCounts, chosen: &[TrialId]) {
    for id in chosen {
        *counts.get_mut(id).expect("chosen trial comes from the pool") += 1;
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // ========================================================================
    // Single-call Selection Properties
    // ========================================================================

    /// Property: result length is min(how_many, pool size)
    #[test]
    fn prop_select_length(
        pool in arb_pool(40, 6),
        how_many in 0usize..50,
        seed in any::<u64>()
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let chosen = select(&pool, how_many, &mut rng);
        prop_assert_eq!(chosen.len(), how_many.min(pool.len()));
    }

    /// Property: no repeats, and every id comes from the pool
    #[test]
    fn prop_select_distinct_members(
        pool in arb_pool(40, 6),
        how_many in 1usize..50,
        seed in any::<u64>()
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let chosen = select(&pool, how_many, &mut rng);

        let unique: HashSet<_> = chosen.iter().collect();
        prop_assert_eq!(unique.len(), chosen.len());
        prop_assert!(chosen.iter().all(|id| pool.contains_key(id)));
    }

    /// Property: nothing left behind has a lower count than something taken
    #[test]
    fn prop_select_least_covered_first(
        pool in arb_pool(40, 6),
        how_many in 1usize..50,
        seed in any::<u64>()
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let chosen: HashSet<TrialId> = select(&pool, how_many, &mut rng).into_iter().collect();

        let max_taken = pool.iter().filter(|(id, _)| chosen.contains(*id)).map(|(_, &c)| c).max();
        let min_left = pool.iter().filter(|(id, _)| !chosen.contains(*id)).map(|(_, &c)| c).min();
        if let (Some(max_taken), Some(min_left)) = (max_taken, min_left) {
            prop_assert!(max_taken <= min_left);
        }
    }

    /// Property: selection order is bucket order (counts non-decreasing)
    #[test]
    fn prop_select_order_follows_buckets(
        pool in arb_pool(40, 6),
        how_many in 1usize..50,
        seed in any::<u64>()
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let chosen = select(&pool, how_many, &mut rng);
        let counts: Vec<u64> = chosen.iter().map(|id| pool[id]).collect();
        prop_assert!(counts.windows(2).all(|w| w[0] <= w[1]));
    }

    /// Property: requesting more than the pool returns exactly the pool
    #[test]
    fn prop_underfill_returns_whole_pool(
        pool in arb_pool(12, 4),
        extra in 1usize..10,
        seed in any::<u64>()
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let chosen: HashSet<TrialId> = select(&pool, pool.len() + extra, &mut rng).into_iter().collect();
        let all: HashSet<TrialId> = pool.keys().copied().collect();
        prop_assert_eq!(chosen, all);
    }

    // ========================================================================
    // Fairness Convergence
    // ========================================================================

    /// Property: from an empty study, spread never exceeds block size, and
    /// stays within 1 whenever the block fits in the pool
    #[test]
    fn prop_fairness_convergence(
        trials in 1usize..40,
        block in 1usize..15,
        participants in 1usize..60,
        seed in any::<u64>()
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut counts = zero_pool(trials);

        for _ in 0..participants {
            let chosen = select(&counts, block, &mut rng);
            apply(&mut counts, &chosen);

            let spread = coverage_spread(&counts).unwrap();
            prop_assert!(spread <= block as u64);
            if block <= trials {
                prop_assert!(spread <= 1, "spread {} with block {} over {} trials", spread, block, trials);
            } else {
                prop_assert_eq!(spread, 0);
            }
        }

        let total: u64 = counts.values().sum();
        prop_assert_eq!(total, (participants * block.min(trials)) as u64);
    }

    /// Property: an uneven pool never gets more uneven than it started
    /// (or than 1, if it started perfectly even)
    #[test]
    fn prop_spread_never_grows(
        pool in arb_pool(30, 8),
        block in 1usize..12,
        rounds in 1usize..30,
        seed in any::<u64>()
    ) {
        prop_assume!(!pool.is_empty());
        let mut rng = StdRng::seed_from_u64(seed);
        let mut counts = pool;
        let bound = coverage_spread(&counts).unwrap().max(1);

        for _ in 0..rounds {
            let chosen = select(&counts, block, &mut rng);
            apply(&mut counts, &chosen);
            prop_assert!(coverage_spread(&counts).unwrap() <= bound);
        }
    }
}

// ============================================================================
// Concrete scenarios
// ============================================================================

#[test]
fn test_two_zero_count_trials_beat_count_two() {
    let pool: PoolCounts = [(TrialId::new(1), 0), (TrialId::new(2), 0), (TrialId::new(3), 2)]
        .into_iter()
        .collect();

    for seed in 0..100 {
        let mut rng = StdRng::seed_from_u64(seed);
        let chosen: HashSet<TrialId> = select(&pool, 2, &mut rng).into_iter().collect();
        assert_eq!(chosen, [TrialId::new(1), TrialId::new(2)].into_iter().collect::<HashSet<_>>());
    }
}

#[test]
fn test_three_trials_block_of_ten() {
    let pool: PoolCounts = (1..=3).map(|id| (TrialId::new(id), 5)).collect();
    let mut rng = StdRng::seed_from_u64(99);

    let chosen = select(&pool, 10, &mut rng);

    assert_eq!(chosen.len(), 3);
    let unique: HashSet<_> = chosen.iter().collect();
    assert_eq!(unique.len(), 3);
}
