//! Deterministic task outcome resolution.
//!
//! Pure functions only: given an agent's overall reputation, a task's
//! difficulty, and a seed, decide success and a quality score. Identical
//! inputs always produce bit-identical outputs.

pub mod rng;

pub use rng::{SplitMix64, stable_seed};

use serde::{Deserialize, Serialize};

/// Fixed base chance added to every success probability.
const BASE_CHANCE: f64 = 0.3;
/// Success probability bounds.
const MIN_CHANCE: f64 = 0.1;
const MAX_CHANCE: f64 = 0.98;

/// Result of resolving a task outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub success: bool,
    /// 0..=100. Only meaningful on success; 0 on failure.
    pub quality: u8,
}

/// Success probability: `clamp(0.1, 0.98, rep/1000 * (1 - d/10) + 0.3)`.
pub fn success_probability(overall: u32, difficulty: u8) -> f64 {
    let normalized = f64::from(overall.min(1000)) / 1000.0;
    let p = normalized * (1.0 - f64::from(difficulty) / 10.0) + BASE_CHANCE;
    p.clamp(MIN_CHANCE, MAX_CHANCE)
}

/// Resolve an outcome deterministically from the seed.
///
/// The first draw decides success; the second supplies quality jitter
/// bounded by ±2·difficulty. Both come from the same SplitMix64 stream so
/// re-running a partially failed tick reproduces the exact outcome.
pub fn resolve_outcome(overall: u32, difficulty: u8, seed: u64) -> Outcome {
    let mut rng = SplitMix64::new(seed);
    let p = success_probability(overall, difficulty);
    let success = rng.next_f64() < p;

    let quality = if success {
        let normalized = f64::from(overall.min(1000)) / 1000.0;
        let jitter = (rng.next_f64() * 2.0 - 1.0) * 2.0 * f64::from(difficulty);
        (50.0 + 40.0 * normalized + jitter).clamp(0.0, 100.0).round() as u8
    } else {
        0
    };

    Outcome { success, quality }
}

/// Reputation delta for an outcome.
///
/// Failure: `-(10 + 5*difficulty)`. Success: `5 + 3*difficulty`, plus a
/// quality bonus (+5 at >= 90, +2 at >= 75) and +10 when the new streak
/// lands on a positive multiple of 5.
pub fn reputation_delta(success: bool, difficulty: u8, quality: u8, new_streak: u32) -> i32 {
    if !success {
        return -(10 + 5 * i32::from(difficulty));
    }
    let mut delta = 5 + 3 * i32::from(difficulty);
    if quality >= 90 {
        delta += 5;
    } else if quality >= 75 {
        delta += 2;
    }
    if new_streak > 0 && new_streak % 5 == 0 {
        delta += 10;
    }
    delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_probability_formula() {
        // 500/1000 * (1 - 3/10) + 0.3 = 0.65
        let p = success_probability(500, 3);
        assert!((p - 0.65).abs() < 1e-9);
        // Floor and ceiling.
        assert_eq!(success_probability(0, 5), 0.3);
        assert!((success_probability(1000, 1) - 0.98).abs() < f64::EPSILON);
    }

    #[test]
    fn test_resolver_is_pure() {
        let first = resolve_outcome(640, 4, 0xDEAD_BEEF);
        for _ in 0..10 {
            assert_eq!(resolve_outcome(640, 4, 0xDEAD_BEEF), first);
        }
    }

    /// Recorded fixture: overall=500, difficulty=3, seed=42.
    /// First draw is ~0.74157 against p=0.65, so the outcome is a failure.
    #[test]
    fn test_golden_midband_failure() {
        let outcome = resolve_outcome(500, 3, 42);
        assert!(!outcome.success);
        assert_eq!(outcome.quality, 0);
    }

    /// Recorded fixture: overall=900, difficulty=1, seed=7.
    /// First draw ~0.38983 against p=0.98 succeeds; quality rounds to 84.
    #[test]
    fn test_golden_highband_success() {
        let outcome = resolve_outcome(900, 1, 7);
        assert!(outcome.success);
        assert_eq!(outcome.quality, 84);
    }

    #[test]
    fn test_failure_delta() {
        assert_eq!(reputation_delta(false, 1, 0, 0), -15);
        assert_eq!(reputation_delta(false, 5, 0, 0), -35);
    }

    #[test]
    fn test_success_delta_with_bonuses() {
        // 5 + 3*2 = 11, no bonuses.
        assert_eq!(reputation_delta(true, 2, 60, 1), 11);
        // +2 quality bonus.
        assert_eq!(reputation_delta(true, 2, 75, 1), 13);
        // +5 quality bonus.
        assert_eq!(reputation_delta(true, 2, 95, 1), 16);
        // +10 streak bonus at a multiple of 5.
        assert_eq!(reputation_delta(true, 2, 60, 5), 21);
        assert_eq!(reputation_delta(true, 2, 60, 10), 21);
        // Streak 0 is not a bonus.
        assert_eq!(reputation_delta(true, 2, 60, 0), 11);
    }

    proptest! {
        #[test]
        fn prop_quality_in_range(overall in 0u32..=1000, difficulty in 1u8..=5, seed: u64) {
            let outcome = resolve_outcome(overall, difficulty, seed);
            prop_assert!(outcome.quality <= 100);
            if !outcome.success {
                prop_assert_eq!(outcome.quality, 0);
            }
        }

        #[test]
        fn prop_probability_bounded(overall in 0u32..=1000, difficulty in 1u8..=5) {
            let p = success_probability(overall, difficulty);
            prop_assert!((0.1..=0.98).contains(&p));
        }
    }
}
