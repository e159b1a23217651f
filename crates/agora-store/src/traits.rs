use async_trait::async_trait;
use uuid::Uuid;

use agora_types::{
    ActivityEvent, Agent, AgentStatus, Bid, BidStatus, LeaderboardEntry, LeaderboardMetric,
    ReputationScore, Result, SimulationState, Task, TaskStatus, Transaction, Wallet,
};

/// Agent directory. Archival is one-way; `archive` returns whether the
/// status actually changed so callers can treat a repeat call as a no-op.
#[async_trait]
pub trait AgentStore: Send + Sync {
    async fn insert_agent(&self, agent: Agent) -> Result<()>;
    async fn get_agent(&self, id: Uuid) -> Result<Option<Agent>>;
    async fn list_agents_by_status(&self, status: AgentStatus) -> Result<Vec<Agent>>;
    async fn set_agent_status(&self, id: Uuid, status: AgentStatus) -> Result<()>;
    async fn archive_agent(&self, id: Uuid) -> Result<bool>;
    async fn count_agents_by_status(&self, status: AgentStatus) -> Result<usize>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert_task(&self, task: Task) -> Result<()>;
    async fn get_task(&self, id: Uuid) -> Result<Option<Task>>;
    async fn update_task(&self, task: Task) -> Result<()>;
    async fn list_tasks_by_status(&self, status: TaskStatus, limit: usize) -> Result<Vec<Task>>;
    async fn count_tasks_by_status(&self, status: TaskStatus) -> Result<usize>;
}

#[async_trait]
pub trait BidStore: Send + Sync {
    async fn insert_bid(&self, bid: Bid) -> Result<()>;
    async fn get_bid(&self, id: Uuid) -> Result<Option<Bid>>;
    async fn bids_for_task(&self, task_id: Uuid) -> Result<Vec<Bid>>;
    async fn set_bid_status(&self, id: Uuid, status: BidStatus) -> Result<()>;
}

/// Wallet and transaction persistence, the funds ledger's target.
/// Transactions are append-only and returned in insertion order.
#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn insert_wallet(&self, wallet: Wallet) -> Result<()>;
    async fn get_wallet(&self, agent_id: Uuid) -> Result<Option<Wallet>>;
    async fn update_wallet(&self, wallet: Wallet) -> Result<()>;
    async fn append_transaction(&self, tx: Transaction) -> Result<()>;
    async fn transactions_for(&self, agent_id: Uuid) -> Result<Vec<Transaction>>;
}

#[async_trait]
pub trait ReputationStore: Send + Sync {
    async fn insert_reputation(&self, score: ReputationScore) -> Result<()>;
    async fn get_reputation(&self, agent_id: Uuid) -> Result<Option<ReputationScore>>;
    async fn update_reputation(&self, score: ReputationScore) -> Result<()>;
    async fn list_reputations(&self) -> Result<Vec<ReputationScore>>;
}

#[async_trait]
pub trait LeaderboardStore: Send + Sync {
    async fn upsert_entry(&self, entry: LeaderboardEntry) -> Result<()>;
    async fn get_entry(&self, agent_id: Uuid) -> Result<Option<LeaderboardEntry>>;
    async fn delete_entry(&self, agent_id: Uuid) -> Result<()>;
    async fn list_entries(&self) -> Result<Vec<LeaderboardEntry>>;
    async fn list_ranked_by(&self, metric: LeaderboardMetric) -> Result<Vec<LeaderboardEntry>>;
}

/// Persisted simulation singleton. `load` yields the default state when
/// nothing has been saved yet.
#[async_trait]
pub trait SimStateStore: Send + Sync {
    async fn load_state(&self) -> Result<SimulationState>;
    async fn save_state(&self, state: SimulationState) -> Result<()>;
}

/// Write-only notification sink. The engine appends; only the
/// presentation layer reads.
#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn append_event(&self, event: ActivityEvent) -> Result<()>;
    async fn recent_events(&self, limit: usize) -> Result<Vec<ActivityEvent>>;
    async fn event_count(&self) -> Result<usize>;
}
