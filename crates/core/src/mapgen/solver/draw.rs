//! Seeded random draws used by placement. Every draw goes through the run RNG.

use rand_chacha::ChaCha8Rng;
use rand_chacha::rand_core::Rng;

/// Uniform value in `[0, 1)` with 53 bits of precision.
pub(super) fn unit_interval(rng: &mut ChaCha8Rng) -> f64 {
    (rng.next_u64() >> 11) as f64 * (1.0 / (1_u64 << 53) as f64)
}

pub(super) fn index_below(rng: &mut ChaCha8Rng, len: usize) -> usize {
    debug_assert!(len > 0);
    (rng.next_u64() % len as u64) as usize
}

/// Orders `weights` by repeated weighted draws without replacement.
pub(super) fn weighted_order(rng: &mut ChaCha8Rng, weights: &[f64]) -> Vec<usize> {
    let mut remaining: Vec<usize> = (0..weights.len()).collect();
    let mut order = Vec::with_capacity(weights.len());
    while !remaining.is_empty() {
        let total: f64 = remaining.iter().map(|&index| weights[index]).sum();
        let mut target = unit_interval(rng) * total;
        let mut picked = remaining.len() - 1;
        for (slot, &index) in remaining.iter().enumerate() {
            if target < weights[index] {
                picked = slot;
                break;
            }
            target -= weights[index];
        }
        order.push(remaining.remove(picked));
    }
    order
}

pub(super) fn shuffle<T>(rng: &mut ChaCha8Rng, items: &mut [T]) {
    for upper in (1..items.len()).rev() {
        let swap_with = index_below(rng, upper + 1);
        items.swap(upper, swap_with);
    }
}

/// `count` distinct values from `0..len`, ascending.
pub(super) fn choose_distinct(rng: &mut ChaCha8Rng, len: usize, count: usize) -> Vec<usize> {
    let mut pool: Vec<usize> = (0..len).collect();
    shuffle(rng, &mut pool);
    pool.truncate(count.min(len));
    pool.sort_unstable();
    pool
}
