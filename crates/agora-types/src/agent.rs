use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Specialisation of an agent within the economy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentRole {
    Analyst,
    Builder,
    Researcher,
    Translator,
    Reviewer,
    Generalist,
}

/// Lifecycle status of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentStatus {
    Active,
    Suspended,
    Archived,
}

/// A participant in the simulated economy. Archival is one-way: once an
/// agent's balance and escrow both reach zero it is archived and never
/// resurrected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: Uuid,
    pub name: String,
    pub role: AgentRole,
    pub status: AgentStatus,
    pub created_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl Agent {
    pub fn new(name: impl Into<String>, role: AgentRole) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            role,
            status: AgentStatus::Active,
            created_at: Utc::now(),
            archived_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AgentStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_agent_is_active() {
        let agent = Agent::new("worker-1", AgentRole::Builder);
        assert!(agent.is_active());
        assert!(agent.archived_at.is_none());
    }
}
