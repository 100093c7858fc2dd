//! Mining reward halving schedule (spec.md §4.5).
//!
//! Unlike a height-indexed schedule, the reward halves on wall-clock time
//! elapsed since Genesis: `R(t) = max(R0 / 2^floor((t - GENESIS_TIMESTAMP) / H), MINIMUM_REWARD)`.

use ember_core::constants::{GENESIS_TIMESTAMP, HALVING_INTERVAL_SECS, INITIAL_REWARD, MINIMUM_REWARD};

/// The halving epoch `now` falls in, relative to Genesis.
///
/// Saturates to 0 for any `now` at or before `GENESIS_TIMESTAMP`.
pub fn halving_epoch(now: u64) -> u64 {
    now.saturating_sub(GENESIS_TIMESTAMP) / HALVING_INTERVAL_SECS
}

/// The current mining reward at wall-clock time `now` (Unix seconds).
///
/// Floors at [`MINIMUM_REWARD`] once the halving exponent would otherwise
/// drive the reward below it, including once `2^epoch` overflows `f64`
/// precision.
pub fn current_reward(now: u64) -> f64 {
    let epoch = halving_epoch(now);
    if epoch >= 1024 {
        return MINIMUM_REWARD;
    }
    let halved = INITIAL_REWARD / 2f64.powi(epoch as i32);
    halved.max(MINIMUM_REWARD)
}
