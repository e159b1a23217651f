use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Named reputation band, derived purely from `overall`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
}

impl Tier {
    /// Non-overlapping bands over [0, 1000]. Monotonic in `overall`.
    pub fn for_overall(overall: u32) -> Self {
        if overall < 200 {
            Tier::Bronze
        } else if overall < 400 {
            Tier::Silver
        } else if overall < 600 {
            Tier::Gold
        } else if overall < 800 {
            Tier::Platinum
        } else {
            Tier::Diamond
        }
    }
}

/// Multi-component reputation record, 1:1 with an agent.
/// Components live in [0, 1000]; `overall` is their fixed weighted
/// combination and `tier` is always recomputable from `overall` alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationScore {
    pub agent_id: Uuid,
    pub reliability: u32,
    pub quality: u32,
    pub speed: u32,
    pub overall: u32,
    pub tier: Tier,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_active_at: DateTime<Utc>,
}

impl ReputationScore {
    pub const MAX_COMPONENT: u32 = 1000;

    pub fn new(agent_id: Uuid) -> Self {
        let mut score = Self {
            agent_id,
            reliability: 500,
            quality: 500,
            speed: 500,
            overall: 0,
            tier: Tier::Bronze,
            tasks_completed: 0,
            tasks_failed: 0,
            current_streak: 0,
            longest_streak: 0,
            last_active_at: Utc::now(),
        };
        score.recompute();
        score
    }

    /// Weighted combination: reliability 0.5, quality 0.3, speed 0.2,
    /// in integer arithmetic over [0, 1000].
    pub fn weighted_overall(reliability: u32, quality: u32, speed: u32) -> u32 {
        let overall = (u64::from(reliability) * 5 + u64::from(quality) * 3 + u64::from(speed) * 2)
            / 10;
        (overall as u32).min(Self::MAX_COMPONENT)
    }

    /// Recompute `overall` and `tier` from the components.
    pub fn recompute(&mut self) {
        self.overall = Self::weighted_overall(self.reliability, self.quality, self.speed);
        self.tier = Tier::for_overall(self.overall);
    }

    pub fn attempted(&self) -> u64 {
        self.tasks_completed + self.tasks_failed
    }

    /// Completed / attempted, in [0, 1]. Zero attempts yields 0.
    pub fn success_rate(&self) -> f64 {
        let attempted = self.attempted();
        if attempted == 0 {
            0.0
        } else {
            self.tasks_completed as f64 / attempted as f64
        }
    }
}
