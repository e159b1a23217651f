use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::AgentRole;
use crate::reputation::Tier;

/// Metric a leaderboard ordering is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardMetric {
    Earnings,
    Reliability,
    Longevity,
    SuccessRate,
}

/// Denormalized per-agent ranking snapshot. Rebuilt wholesale by the
/// recomputer; holds the display fields needed to avoid re-joining the
/// agent, wallet, and reputation tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub agent_id: Uuid,
    pub name: String,
    pub role: AgentRole,
    pub tier: Tier,
    pub rank_earnings: u32,
    pub rank_reliability: u32,
    pub rank_longevity: u32,
    pub rank_success_rate: u32,
    pub total_earned: i64,
    pub reliability: u32,
    pub success_rate: f64,
    pub computed_at: DateTime<Utc>,
}

impl LeaderboardEntry {
    pub fn rank_for(&self, metric: LeaderboardMetric) -> u32 {
        match metric {
            LeaderboardMetric::Earnings => self.rank_earnings,
            LeaderboardMetric::Reliability => self.rank_reliability,
            LeaderboardMetric::Longevity => self.rank_longevity,
            LeaderboardMetric::SuccessRate => self.rank_success_rate,
        }
    }
}
