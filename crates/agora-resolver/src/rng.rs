use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Minimal reproducible RNG for outcome resolution.
///
/// SplitMix64: a 64-bit seed and a single `next_f64` operation. Draws are
/// bit-identical for a given seed across calls, processes, and platforms,
/// which is what makes outcome resolution auditable and safe to re-run.
#[derive(Debug, Clone)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform draw in [0, 1) with 53 bits of precision.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}

/// Stable seed for a task outcome: FNV-1a over the task id, assignee id,
/// and assignment timestamp. The same assignment always resolves the same
/// way, no matter when or how often the completion pass re-runs it.
pub fn stable_seed(task_id: Uuid, agent_id: Uuid, accepted_at: DateTime<Utc>) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    let mut fold = |bytes: &[u8]| {
        for &byte in bytes {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
    };
    fold(task_id.as_bytes());
    fold(agent_id.as_bytes());
    fold(&accepted_at.timestamp_nanos_opt().unwrap_or(0).to_le_bytes());
    hash
}
