//! Coverage-balanced trial selection
//!
//! **Problem**: every participant receives a block of N trials from a shared
//! pool, and each trial should accumulate roughly the same number of
//! assignments over the life of the study.
//!
//! **Solution**: bucketed greedy selection. Trials are grouped by their
//! current assignment count, buckets are drained least-assigned first, and
//! each bucket is shuffled before it is drained so ties break uniformly.
//!
//! ```text
//! counts:  A:0 B:0 C:2 D:1          how_many = 3
//! buckets: 0 -> [A, B]   1 -> [D]   2 -> [C]
//! result:  shuffle([A, B]) ++ [D]   (C is never reached)
//! ```
//!
//! Selection order is presentation order: the caller persists position `i`
//! of the result as the assignment's `order_idx`.
//!
//! With sequential calls and `how_many <= pool size`, a pool whose spread
//! (max count - min count) is at most 1 stays at most 1 after every call.
//!
//! The balancer never fails. An empty result means the eligible pool was
//! empty, and the caller decides which error that is.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::record::TrialId;

/// Eligible trials paired with their current global assignment count.
///
/// Ordered by trial id so bucket contents are deterministic before the
/// shuffle; a seeded RNG then reproduces a selection exactly.
pub type PoolCounts = BTreeMap<TrialId, u64>;

/// Trait for least-covered selection over a pool of counts
pub trait CoverageSelection {
    /// Select up to `how_many` trials, least-assigned first
    ///
    /// # Arguments
    /// * `how_many` - Target block size
    /// * `rng` - Randomness used to break ties within a count bucket
    ///
    /// # Returns
    /// Distinct trial ids in presentation order. Shorter than `how_many` only
    /// when the pool is smaller than requested.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dilemma_study::coverage::{CoverageSelection, PoolCounts};
    /// use dilemma_study::record::TrialId;
    /// use rand::rngs::StdRng;
    /// use rand::SeedableRng;
    ///
    /// let pool: PoolCounts = [(TrialId::new(1), 0), (TrialId::new(2), 0), (TrialId::new(3), 2)]
    ///     .into_iter()
    ///     .collect();
    ///
    /// let mut rng = StdRng::seed_from_u64(7);
    /// let mut chosen = pool.select_least_covered(2, &mut rng);
    /// chosen.sort();
    /// assert_eq!(chosen, vec![TrialId::new(1), TrialId::new(2)]);
    /// ```
    fn select_least_covered<R: Rng + ?Sized>(&self, how_many: usize, rng: &mut R) -> Vec<TrialId>;
}

impl CoverageSelection for PoolCounts {
    fn select_least_covered<R: Rng + ?Sized>(&self, how_many: usize, rng: &mut R) -> Vec<TrialId> {
        select(self, how_many, rng)
    }
}

/// Bucketed greedy selection, least-assigned first, shuffled within buckets
///
/// Time complexity: O(K log K) for K eligible trials.
pub fn select<R: Rng + ?Sized>(pool_counts: &PoolCounts, how_many: usize, rng: &mut R) -> Vec<TrialId> {
    if pool_counts.is_empty() || how_many == 0 {
        return Vec::new();
    }

    let mut buckets: BTreeMap<u64, Vec<TrialId>> = BTreeMap::new();
    for (&trial_id, &count) in pool_counts {
        buckets.entry(count).or_default().push(trial_id);
    }

    let mut chosen = Vec::with_capacity(how_many.min(pool_counts.len()));
    for mut bucket in buckets.into_values() {
        bucket.shuffle(rng);
        let take = (how_many - chosen.len()).min(bucket.len());
        chosen.extend_from_slice(&bucket[..take]);
        if chosen.len() == how_many {
            break;
        }
    }

    chosen
}

/// Difference between the most- and least-assigned trial.
///
/// Returns `None` for an empty pool.
#[must_use]
pub fn coverage_spread(pool_counts: &PoolCounts) -> Option<u64> {
    let min = pool_counts.values().min()?;
    let max = pool_counts.values().max()?;
    Some(max - min)
}

/// Selection engine owning its randomness.
///
/// Production balancers draw a fresh entropy seed so distinct participants
/// drawing from the same bucket get different orders; tests pin the seed.
#[derive(Debug)]
pub struct CoverageBalancer {
    rng: StdRng,
}

impl CoverageBalancer {
    /// Create a balancer seeded from OS entropy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a balancer with a fixed seed (for testing and simulation).
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Select up to `how_many` trials from `pool_counts`.
    pub fn select(&mut self, pool_counts: &PoolCounts, how_many: usize) -> Vec<TrialId> {
        select(pool_counts, how_many, &mut self.rng)
    }
}

impl Default for CoverageBalancer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn pool(entries: &[(u64, u64)]) -> PoolCounts {
        entries
            .iter()
            .map(|&(id, count)| (TrialId::new(id), count))
            .collect()
    }

    fn sorted(mut ids: Vec<TrialId>) -> Vec<TrialId> {
        ids.sort();
        ids
    }

    #[test]
    fn test_empty_pool_returns_empty() {
        let mut balancer = CoverageBalancer::with_seed(1);
        assert!(balancer.select(&PoolCounts::new(), 10).is_empty());
    }

    #[test]
    fn test_zero_requested_returns_empty() {
        let mut balancer = CoverageBalancer::with_seed(1);
        assert!(balancer.select(&pool(&[(1, 0), (2, 0)]), 0).is_empty());
    }

    #[test]
    fn test_two_lowest_beat_higher_bucket() {
        // A:0 B:0 C:2, take 2 -> {A, B}, never C
        for seed in 0..50 {
            let mut balancer = CoverageBalancer::with_seed(seed);
            let chosen = balancer.select(&pool(&[(1, 0), (2, 0), (3, 2)]), 2);
            assert_eq!(sorted(chosen), vec![TrialId::new(1), TrialId::new(2)]);
        }
    }

    #[test]
    fn test_underfill_returns_whole_pool() {
        // A:1 B:1, take 5 -> exactly {A, B}
        let mut balancer = CoverageBalancer::with_seed(3);
        let chosen = balancer.select(&pool(&[(1, 1), (2, 1)]), 5);
        assert_eq!(sorted(chosen), vec![TrialId::new(1), TrialId::new(2)]);
    }

    #[test]
    fn test_spills_into_next_bucket_in_count_order() {
        let mut balancer = CoverageBalancer::with_seed(11);
        let chosen = balancer.select(&pool(&[(1, 5), (2, 0), (3, 1), (4, 1), (5, 9)]), 3);

        assert_eq!(chosen.len(), 3);
        assert_eq!(chosen[0], TrialId::new(2));
        let tail: HashSet<_> = chosen[1..].iter().copied().collect();
        assert_eq!(tail, [TrialId::new(3), TrialId::new(4)].into_iter().collect::<HashSet<_>>());
    }

    #[test]
    fn test_partial_bucket_draws_only_from_lowest() {
        let entries: Vec<(u64, u64)> = (0..20).map(|id| (id, u64::from(id >= 10))).collect();
        let mut balancer = CoverageBalancer::with_seed(5);
        let chosen = balancer.select(&pool(&entries), 4);

        assert_eq!(chosen.len(), 4);
        assert!(chosen.iter().all(|id| id.get() < 10));
    }

    #[test]
    fn test_no_duplicates() {
        let entries: Vec<(u64, u64)> = (0..30).map(|id| (id, id % 4)).collect();
        let mut balancer = CoverageBalancer::with_seed(9);
        let chosen = balancer.select(&pool(&entries), 25);
        let unique: HashSet<_> = chosen.iter().collect();
        assert_eq!(unique.len(), chosen.len());
    }

    #[test]
    fn test_seeded_selection_is_reproducible() {
        let entries: Vec<(u64, u64)> = (0..40).map(|id| (id, 0)).collect();
        let a = CoverageBalancer::with_seed(42).select(&pool(&entries), 10);
        let b = CoverageBalancer::with_seed(42).select(&pool(&entries), 10);
        assert_eq!(a, b);
    }

    #[test]
    fn test_tie_breaking_varies_across_seeds() {
        let entries: Vec<(u64, u64)> = (0..10).map(|id| (id, 0)).collect();
        let orders: HashSet<Vec<TrialId>> = (0..20)
            .map(|seed| CoverageBalancer::with_seed(seed).select(&pool(&entries), 10))
            .collect();
        assert!(orders.len() > 1);
    }

    #[test]
    fn test_coverage_spread() {
        assert_eq!(coverage_spread(&PoolCounts::new()), None);
        assert_eq!(coverage_spread(&pool(&[(1, 3)])), Some(0));
        assert_eq!(coverage_spread(&pool(&[(1, 3), (2, 7), (3, 4)])), Some(4));
    }
}
