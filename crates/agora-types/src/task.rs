use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::AgoraError;

/// Category of work a task represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskCategory {
    DataProcessing,
    CodeGeneration,
    Research,
    Translation,
    Review,
    Creative,
}

/// Derived risk rating computed from difficulty and slash percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskRating {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskRating {
    /// `difficulty * 10 + slash_percent` against fixed thresholds.
    pub fn for_task(difficulty: u8, slash_percent: u8) -> Self {
        let score = u32::from(difficulty) * 10 + u32::from(slash_percent);
        if score < 40 {
            RiskRating::Low
        } else if score < 70 {
            RiskRating::Medium
        } else if score < 100 {
            RiskRating::High
        } else {
            RiskRating::Critical
        }
    }
}

/// Task lifecycle. Transitions form a strict one-way DAG:
/// `Open -> Assigned -> {Completed | Failed}` or `Open -> {Expired | Cancelled}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Open,
    Assigned,
    Completed,
    Failed,
    Expired,
    Cancelled,
}

impl TaskStatus {
    /// Validate a transition, returning the new status or a typed error.
    pub fn transition(self, to: TaskStatus) -> super::error::Result<TaskStatus> {
        match (self, to) {
            (TaskStatus::Open, TaskStatus::Assigned)
            | (TaskStatus::Open, TaskStatus::Expired)
            | (TaskStatus::Open, TaskStatus::Cancelled)
            | (TaskStatus::Assigned, TaskStatus::Completed)
            | (TaskStatus::Assigned, TaskStatus::Failed) => Ok(to),
            (from, to) => Err(AgoraError::InvalidTransition { from, to }),
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskStatus::Open | TaskStatus::Assigned)
    }
}

/// A unit of work posted into the economy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub category: TaskCategory,
    /// 1..=5
    pub difficulty: u8,
    pub reward: i64,
    pub deposit: i64,
    pub slash_percent: u8,
    pub risk: RiskRating,
    /// Minimum `overall` reputation required of the assignee.
    pub min_reputation: u32,
    /// Seconds the assignee has to execute after assignment.
    pub execution_window_secs: i64,
    pub expires_at: DateTime<Utc>,
    pub status: TaskStatus,
    pub poster_id: Uuid,
    pub assigned_agent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Apply a status transition, enforcing the DAG.
    pub fn advance(&mut self, to: TaskStatus) -> super::error::Result<()> {
        self.status = self.status.transition(to)?;
        Ok(())
    }

    /// Set exactly once, at the `Open -> Assigned` transition.
    pub fn assign(
        &mut self,
        agent_id: Uuid,
        at: DateTime<Utc>,
    ) -> super::error::Result<()> {
        self.advance(TaskStatus::Assigned)?;
        self.assigned_agent_id = Some(agent_id);
        self.accepted_at = Some(at);
        Ok(())
    }
}

/// Status of a bid on a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BidStatus {
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
}

/// A bid placed by an agent on a task. At most one bid per task ever
/// reaches `Accepted`; all other pending bids are rejected with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bid {
    pub id: Uuid,
    pub task_id: Uuid,
    pub agent_id: Uuid,
    pub proposed_reward: i64,
    pub estimated_secs: i64,
    pub status: BidStatus,
    pub created_at: DateTime<Utc>,
}

impl Bid {
    pub fn new(task_id: Uuid, agent_id: Uuid, proposed_reward: i64, estimated_secs: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id,
            agent_id,
            proposed_reward,
            estimated_secs,
            status: BidStatus::Pending,
            created_at: Utc::now(),
        }
    }
}
