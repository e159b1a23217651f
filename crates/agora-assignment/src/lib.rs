//! Auto-assignment: matches open tasks to eligible agents, records the
//! implicitly accepted bid, and escrows the deposit.
//!
//! Eligibility is re-checked against the wallet immediately before each
//! escrow call because escrowing for one task reduces the same agent's
//! availability for later tasks in the same batch.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::prelude::*;
use uuid::Uuid;

use agora_ledger::FundsLedger;
use agora_store::{AgentStore, BidStore, ReputationStore, TaskStore, WalletStore};
use agora_types::{
    Agent, AgentStatus, AgoraError, Bid, BidStatus, Result, Task, TaskStatus,
};

#[derive(Clone)]
pub struct AutoAssigner {
    agents: Arc<dyn AgentStore>,
    tasks: Arc<dyn TaskStore>,
    bids: Arc<dyn BidStore>,
    wallets: Arc<dyn WalletStore>,
    reputations: Arc<dyn ReputationStore>,
    ledger: FundsLedger,
}

/// One successful assignment, reported back for counting and logging.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub task_id: Uuid,
    pub agent_id: Uuid,
    pub deposit: i64,
}

impl AutoAssigner {
    pub fn new(
        agents: Arc<dyn AgentStore>,
        tasks: Arc<dyn TaskStore>,
        bids: Arc<dyn BidStore>,
        wallets: Arc<dyn WalletStore>,
        reputations: Arc<dyn ReputationStore>,
        ledger: FundsLedger,
    ) -> Self {
        Self {
            agents,
            tasks,
            bids,
            wallets,
            reputations,
            ledger,
        }
    }

    /// Process up to `batch` open tasks. Tasks with no eligible agent are
    /// left open for a later tick; that is not an error.
    pub async fn assign_batch(&self, batch: usize, now: DateTime<Utc>) -> Result<Vec<Assignment>> {
        let open = self.tasks.list_tasks_by_status(TaskStatus::Open, batch).await?;
        if open.is_empty() {
            return Ok(Vec::new());
        }
        let active = self.agents.list_agents_by_status(AgentStatus::Active).await?;

        let mut assignments = Vec::new();
        for task in open {
            match self.try_assign(&task, &active, now).await {
                Ok(Some(assignment)) => assignments.push(assignment),
                Ok(None) => {}
                // A single malformed record must not halt the batch.
                Err(err) => {
                    tracing::warn!(task_id = %task.id, %err, "assignment skipped");
                }
            }
        }
        Ok(assignments)
    }

    /// Try to assign one task. `None` means no eligible agent right now.
    async fn try_assign(
        &self,
        task: &Task,
        active: &[Agent],
        now: DateTime<Utc>,
    ) -> Result<Option<Assignment>> {
        let mut eligible = Vec::new();
        for agent in active {
            if self.is_eligible(agent.id, task).await? {
                eligible.push(agent.id);
            }
        }
        let Some(&agent_id) = eligible.choose(&mut rand::thread_rng()) else {
            return Ok(None);
        };

        // Wallet state may have moved since the eligibility scan (earlier
        // assignments in this batch escrow funds); the ledger enforces the
        // balance check atomically, so a late insufficiency just leaves
        // the task open.
        match self.ledger.escrow_deposit(agent_id, task.id, task.deposit).await {
            Ok(_) => {}
            Err(AgoraError::InsufficientFunds { .. }) => return Ok(None),
            Err(err) => return Err(err),
        }

        let mut bid = Bid::new(task.id, agent_id, task.reward, task.execution_window_secs);
        bid.status = BidStatus::Accepted;
        let accepted_id = bid.id;
        self.bids.insert_bid(bid).await?;

        // Exactly one accepted bid per task: every other pending bid is
        // rejected in the same pass.
        for other in self.bids.bids_for_task(task.id).await? {
            if other.id != accepted_id && other.status == BidStatus::Pending {
                self.bids.set_bid_status(other.id, BidStatus::Rejected).await?;
            }
        }

        let mut task = task.clone();
        task.assign(agent_id, now)?;
        self.tasks.update_task(task.clone()).await?;
        tracing::info!(task_id = %task.id, %agent_id, deposit = task.deposit, "task assigned");

        Ok(Some(Assignment {
            task_id: task.id,
            agent_id,
            deposit: task.deposit,
        }))
    }

    /// Reputation meets the task's requirement and the available
    /// (non-escrowed) balance covers the deposit.
    async fn is_eligible(&self, agent_id: Uuid, task: &Task) -> Result<bool> {
        let Some(score) = self.reputations.get_reputation(agent_id).await? else {
            return Ok(false);
        };
        if score.overall < task.min_reputation {
            return Ok(false);
        }
        let Some(wallet) = self.wallets.get_wallet(agent_id).await? else {
            return Ok(false);
        };
        Ok(wallet.available() >= task.deposit)
    }
}
