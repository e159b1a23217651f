use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted singleton recording the engine's progress and cooldowns.
/// Mutated only by the tick orchestrator (and the explicit reset op).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationState {
    pub tick_count: u64,
    pub paused: bool,
    pub last_task_batch_at: Option<DateTime<Utc>>,
    pub last_leaderboard_at: Option<DateTime<Utc>>,
}

/// How a tick invocation terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickStatus {
    /// The tick body ran (possibly with step errors).
    Completed,
    /// Guard held or minimum interval not yet elapsed.
    Skipped,
    /// Simulation state says paused.
    Paused,
    /// Process is draining.
    ShuttingDown,
}

/// Result of one tick trigger. Action counts are partial on failure;
/// the tick is not transactional as a whole.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickResult {
    pub status: TickStatus,
    pub success: bool,
    pub tick_count: u64,
    pub tasks_generated: u32,
    pub tasks_assigned: u32,
    pub tasks_completed: u32,
    pub tasks_failed: u32,
    pub tasks_expired: u32,
    pub agents_archived: u32,
    pub leaderboard_refreshed: bool,
    pub errors: Vec<String>,
}

impl TickResult {
    pub fn empty(status: TickStatus, tick_count: u64) -> Self {
        Self {
            status,
            success: true,
            tick_count,
            tasks_generated: 0,
            tasks_assigned: 0,
            tasks_completed: 0,
            tasks_failed: 0,
            tasks_expired: 0,
            agents_archived: 0,
            leaderboard_refreshed: false,
            errors: Vec::new(),
        }
    }
}

/// Kind of human-readable notification the engine emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityKind {
    TaskCreated,
    TaskAssigned,
    TaskCompleted,
    TaskFailed,
    TaskExpired,
    AgentArchived,
    AgentFunded,
    TierChanged,
    StreakBonus,
}

/// Observational event written by the engine, never read back by it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub id: Uuid,
    pub kind: ActivityKind,
    pub message: String,
    pub agent_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl ActivityEvent {
    pub fn new(
        kind: ActivityKind,
        message: impl Into<String>,
        agent_id: Option<Uuid>,
        task_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
            agent_id,
            task_id,
            created_at: Utc::now(),
        }
    }
}
