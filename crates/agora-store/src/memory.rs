use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use agora_types::{
    ActivityEvent, Agent, AgentStatus, AgoraError, Bid, BidStatus, LeaderboardEntry,
    LeaderboardMetric, ReputationScore, Result, SimulationState, Task, TaskStatus, Transaction,
    Wallet,
};

use crate::traits::{
    ActivityLog, AgentStore, BidStore, LeaderboardStore, ReputationStore, SimStateStore,
    TaskStore, WalletStore,
};

/// In-memory store implementing every collaborator trait (default).
/// Entity maps are `DashMap`s; the append-only transaction and activity
/// journals keep insertion order behind an `RwLock`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    agents: Arc<DashMap<Uuid, Agent>>,
    tasks: Arc<DashMap<Uuid, Task>>,
    bids: Arc<DashMap<Uuid, Bid>>,
    wallets: Arc<DashMap<Uuid, Wallet>>,
    transactions: Arc<RwLock<Vec<Transaction>>>,
    reputations: Arc<DashMap<Uuid, ReputationScore>>,
    leaderboard: Arc<DashMap<Uuid, LeaderboardEntry>>,
    sim_state: Arc<RwLock<Option<SimulationState>>>,
    activity: Arc<RwLock<Vec<ActivityEvent>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Administrative escape hatch: wipe everything back to empty.
    /// Outside normal simulation operation.
    pub async fn reset_all(&self) {
        self.agents.clear();
        self.tasks.clear();
        self.bids.clear();
        self.wallets.clear();
        self.transactions.write().await.clear();
        self.reputations.clear();
        self.leaderboard.clear();
        *self.sim_state.write().await = None;
        self.activity.write().await.clear();
    }
}

#[async_trait]
impl AgentStore for MemoryStore {
    async fn insert_agent(&self, agent: Agent) -> Result<()> {
        self.agents.insert(agent.id, agent);
        Ok(())
    }

    async fn get_agent(&self, id: Uuid) -> Result<Option<Agent>> {
        Ok(self.agents.get(&id).map(|a| a.clone()))
    }

    async fn list_agents_by_status(&self, status: AgentStatus) -> Result<Vec<Agent>> {
        Ok(self
            .agents
            .iter()
            .filter(|a| a.status == status)
            .map(|a| a.clone())
            .collect())
    }

    async fn set_agent_status(&self, id: Uuid, status: AgentStatus) -> Result<()> {
        let mut agent = self
            .agents
            .get_mut(&id)
            .ok_or(AgoraError::AgentNotFound(id))?;
        agent.status = status;
        Ok(())
    }

    async fn archive_agent(&self, id: Uuid) -> Result<bool> {
        let mut agent = self
            .agents
            .get_mut(&id)
            .ok_or(AgoraError::AgentNotFound(id))?;
        if agent.status == AgentStatus::Archived {
            return Ok(false);
        }
        agent.status = AgentStatus::Archived;
        agent.archived_at = Some(Utc::now());
        Ok(true)
    }

    async fn count_agents_by_status(&self, status: AgentStatus) -> Result<usize> {
        Ok(self.agents.iter().filter(|a| a.status == status).count())
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert_task(&self, task: Task) -> Result<()> {
        self.tasks.insert(task.id, task);
        Ok(())
    }

    async fn get_task(&self, id: Uuid) -> Result<Option<Task>> {
        Ok(self.tasks.get(&id).map(|t| t.clone()))
    }

    async fn update_task(&self, task: Task) -> Result<()> {
        if !self.tasks.contains_key(&task.id) {
            return Err(AgoraError::TaskNotFound(task.id));
        }
        self.tasks.insert(task.id, task);
        Ok(())
    }

    async fn list_tasks_by_status(&self, status: TaskStatus, limit: usize) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .tasks
            .iter()
            .filter(|t| t.status == status)
            .map(|t| t.clone())
            .collect();
        // Oldest first so long-waiting tasks are served before fresh ones.
        tasks.sort_by_key(|t| t.created_at);
        tasks.truncate(limit);
        Ok(tasks)
    }

    async fn count_tasks_by_status(&self, status: TaskStatus) -> Result<usize> {
        Ok(self.tasks.iter().filter(|t| t.status == status).count())
    }
}

#[async_trait]
impl BidStore for MemoryStore {
    async fn insert_bid(&self, bid: Bid) -> Result<()> {
        self.bids.insert(bid.id, bid);
        Ok(())
    }

    async fn get_bid(&self, id: Uuid) -> Result<Option<Bid>> {
        Ok(self.bids.get(&id).map(|b| b.clone()))
    }

    async fn bids_for_task(&self, task_id: Uuid) -> Result<Vec<Bid>> {
        Ok(self
            .bids
            .iter()
            .filter(|b| b.task_id == task_id)
            .map(|b| b.clone())
            .collect())
    }

    async fn set_bid_status(&self, id: Uuid, status: BidStatus) -> Result<()> {
        let mut bid = self.bids.get_mut(&id).ok_or(AgoraError::BidNotFound(id))?;
        bid.status = status;
        Ok(())
    }
}

#[async_trait]
impl WalletStore for MemoryStore {
    async fn insert_wallet(&self, wallet: Wallet) -> Result<()> {
        self.wallets.insert(wallet.agent_id, wallet);
        Ok(())
    }

    async fn get_wallet(&self, agent_id: Uuid) -> Result<Option<Wallet>> {
        Ok(self.wallets.get(&agent_id).map(|w| w.clone()))
    }

    async fn update_wallet(&self, wallet: Wallet) -> Result<()> {
        if !self.wallets.contains_key(&wallet.agent_id) {
            return Err(AgoraError::WalletNotFound(wallet.agent_id));
        }
        self.wallets.insert(wallet.agent_id, wallet);
        Ok(())
    }

    async fn append_transaction(&self, tx: Transaction) -> Result<()> {
        self.transactions.write().await.push(tx);
        Ok(())
    }

    async fn transactions_for(&self, agent_id: Uuid) -> Result<Vec<Transaction>> {
        let txs = self.transactions.read().await;
        Ok(txs.iter().filter(|t| t.agent_id == agent_id).cloned().collect())
    }
}

#[async_trait]
impl ReputationStore for MemoryStore {
    async fn insert_reputation(&self, score: ReputationScore) -> Result<()> {
        self.reputations.insert(score.agent_id, score);
        Ok(())
    }

    async fn get_reputation(&self, agent_id: Uuid) -> Result<Option<ReputationScore>> {
        Ok(self.reputations.get(&agent_id).map(|r| r.clone()))
    }

    async fn update_reputation(&self, score: ReputationScore) -> Result<()> {
        if !self.reputations.contains_key(&score.agent_id) {
            return Err(AgoraError::ReputationNotFound(score.agent_id));
        }
        self.reputations.insert(score.agent_id, score);
        Ok(())
    }

    async fn list_reputations(&self) -> Result<Vec<ReputationScore>> {
        Ok(self.reputations.iter().map(|r| r.clone()).collect())
    }
}

#[async_trait]
impl LeaderboardStore for MemoryStore {
    async fn upsert_entry(&self, entry: LeaderboardEntry) -> Result<()> {
        self.leaderboard.insert(entry.agent_id, entry);
        Ok(())
    }

    async fn get_entry(&self, agent_id: Uuid) -> Result<Option<LeaderboardEntry>> {
        Ok(self.leaderboard.get(&agent_id).map(|e| e.clone()))
    }

    async fn delete_entry(&self, agent_id: Uuid) -> Result<()> {
        self.leaderboard.remove(&agent_id);
        Ok(())
    }

    async fn list_entries(&self) -> Result<Vec<LeaderboardEntry>> {
        Ok(self.leaderboard.iter().map(|e| e.clone()).collect())
    }

    async fn list_ranked_by(&self, metric: LeaderboardMetric) -> Result<Vec<LeaderboardEntry>> {
        let mut entries: Vec<LeaderboardEntry> =
            self.leaderboard.iter().map(|e| e.clone()).collect();
        entries.sort_by_key(|e| e.rank_for(metric));
        Ok(entries)
    }
}

#[async_trait]
impl SimStateStore for MemoryStore {
    async fn load_state(&self) -> Result<SimulationState> {
        Ok(self.sim_state.read().await.clone().unwrap_or_default())
    }

    async fn save_state(&self, state: SimulationState) -> Result<()> {
        *self.sim_state.write().await = Some(state);
        Ok(())
    }
}

#[async_trait]
impl ActivityLog for MemoryStore {
    async fn append_event(&self, event: ActivityEvent) -> Result<()> {
        self.activity.write().await.push(event);
        Ok(())
    }

    async fn recent_events(&self, limit: usize) -> Result<Vec<ActivityEvent>> {
        let events = self.activity.read().await;
        Ok(events.iter().rev().take(limit).cloned().collect())
    }

    async fn event_count(&self) -> Result<usize> {
        Ok(self.activity.read().await.len())
    }
}
