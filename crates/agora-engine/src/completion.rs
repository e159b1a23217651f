use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use agora_ledger::FundsLedger;
use agora_reputation::ReputationTracker;
use agora_resolver::{resolve_outcome, stable_seed};
use agora_store::{ActivityLog, AgentStore, ReputationStore, TaskStore};
use agora_types::{
    ActivityEvent, ActivityKind, AgoraError, Result, Task, TaskStatus,
};

/// Counts from one completion-processing pass.
#[derive(Debug, Default)]
pub struct CompletionStats {
    pub completed: u32,
    pub failed: u32,
    pub expired: u32,
    pub archived: u32,
    pub errors: Vec<String>,
}

/// Resolves due assigned tasks: deterministic outcome, funds settlement,
/// reputation update, archival check. Per-task errors are collected so a
/// malformed record cannot halt the batch; untouched tasks are naturally
/// retried next tick.
#[derive(Clone)]
pub struct CompletionProcessor {
    agents: Arc<dyn AgentStore>,
    tasks: Arc<dyn TaskStore>,
    reputations: Arc<dyn ReputationStore>,
    ledger: FundsLedger,
    tracker: ReputationTracker,
    activity: Arc<dyn ActivityLog>,
}

impl CompletionProcessor {
    pub fn new(
        agents: Arc<dyn AgentStore>,
        tasks: Arc<dyn TaskStore>,
        reputations: Arc<dyn ReputationStore>,
        ledger: FundsLedger,
        tracker: ReputationTracker,
        activity: Arc<dyn ActivityLog>,
    ) -> Self {
        Self {
            agents,
            tasks,
            reputations,
            ledger,
            tracker,
            activity,
        }
    }

    /// Expire open tasks past their posting window, then resolve assigned
    /// tasks whose execution window has elapsed, up to `batch`.
    pub async fn run(&self, batch: usize, now: DateTime<Utc>) -> CompletionStats {
        let mut stats = CompletionStats::default();

        match self.expire_open(batch, now).await {
            Ok(expired) => stats.expired = expired,
            Err(err) => stats.errors.push(format!("expiry pass: {err}")),
        }

        let assigned = match self.tasks.list_tasks_by_status(TaskStatus::Assigned, batch).await {
            Ok(tasks) => tasks,
            Err(err) => {
                stats.errors.push(format!("listing assigned tasks: {err}"));
                return stats;
            }
        };

        for task in assigned {
            if !is_due(&task, now) {
                continue;
            }
            let task_id = task.id;
            if let Err(err) = self.resolve_one(task, now, &mut stats).await {
                tracing::warn!(%task_id, %err, "completion skipped");
                stats.errors.push(format!("task {task_id}: {err}"));
            }
        }
        stats
    }

    async fn expire_open(&self, batch: usize, now: DateTime<Utc>) -> Result<u32> {
        let mut expired = 0;
        for mut task in self.tasks.list_tasks_by_status(TaskStatus::Open, batch).await? {
            if task.expires_at > now {
                continue;
            }
            task.advance(TaskStatus::Expired)?;
            task.resolved_at = Some(now);
            self.tasks.update_task(task.clone()).await?;
            self.activity
                .append_event(ActivityEvent::new(
                    ActivityKind::TaskExpired,
                    format!("task {} expired unassigned", task.id),
                    None,
                    Some(task.id),
                ))
                .await?;
            expired += 1;
        }
        Ok(expired)
    }

    async fn resolve_one(
        &self,
        mut task: Task,
        now: DateTime<Utc>,
        stats: &mut CompletionStats,
    ) -> Result<()> {
        let agent_id = task
            .assigned_agent_id
            .ok_or_else(|| AgoraError::Internal(format!("assigned task {} has no agent", task.id)))?;
        let accepted_at = task
            .accepted_at
            .ok_or_else(|| AgoraError::Internal(format!("assigned task {} has no timestamp", task.id)))?;
        let score = self
            .reputations
            .get_reputation(agent_id)
            .await?
            .ok_or(AgoraError::ReputationNotFound(agent_id))?;

        let seed = stable_seed(task.id, agent_id, accepted_at);
        let outcome = resolve_outcome(score.overall, task.difficulty, seed);

        if outcome.success {
            self.ledger
                .release_deposit(agent_id, task.id, task.deposit)
                .await?;
            self.ledger.pay_reward(agent_id, task.id, task.reward).await?;
        } else {
            self.ledger
                .slash_deposit(agent_id, task.id, task.deposit, task.slash_percent)
                .await?;
        }

        let applied = self
            .tracker
            .apply_outcome(
                agent_id,
                task.id,
                outcome.success,
                task.difficulty,
                outcome.quality,
                now,
            )
            .await?;

        task.advance(if outcome.success {
            TaskStatus::Completed
        } else {
            TaskStatus::Failed
        })?;
        task.resolved_at = Some(now);
        self.tasks.update_task(task.clone()).await?;

        if outcome.success {
            stats.completed += 1;
            self.activity
                .append_event(ActivityEvent::new(
                    ActivityKind::TaskCompleted,
                    format!(
                        "task {} completed by {} (quality {})",
                        task.id, agent_id, outcome.quality
                    ),
                    Some(agent_id),
                    Some(task.id),
                ))
                .await?;
        } else {
            stats.failed += 1;
            self.activity
                .append_event(ActivityEvent::new(
                    ActivityKind::TaskFailed,
                    format!("task {} failed by {}", task.id, agent_id),
                    Some(agent_id),
                    Some(task.id),
                ))
                .await?;

            // Archival trigger: funds fully drained by the slash.
            if self.ledger.is_broke(agent_id).await?
                && self.agents.archive_agent(agent_id).await?
            {
                stats.archived += 1;
                self.activity
                    .append_event(ActivityEvent::new(
                        ActivityKind::AgentArchived,
                        format!("agent {agent_id} archived with empty wallet"),
                        Some(agent_id),
                        None,
                    ))
                    .await?;
            }
        }

        if let Some((old, new)) = applied.tier_changed {
            self.activity
                .append_event(ActivityEvent::new(
                    ActivityKind::TierChanged,
                    format!("agent {agent_id} moved from {old:?} to {new:?}"),
                    Some(agent_id),
                    None,
                ))
                .await?;
        }
        if applied.streak_bonus {
            self.activity
                .append_event(ActivityEvent::new(
                    ActivityKind::StreakBonus,
                    format!(
                        "agent {agent_id} streak bonus at {} consecutive successes",
                        applied.score.current_streak
                    ),
                    Some(agent_id),
                    None,
                ))
                .await?;
        }

        Ok(())
    }
}

fn is_due(task: &Task, now: DateTime<Utc>) -> bool {
    match task.accepted_at {
        Some(accepted_at) => now >= accepted_at + Duration::seconds(task.execution_window_secs),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_store::{MemoryStore, WalletStore};
    use agora_types::{
        Agent, AgentRole, AgentStatus, ReputationScore, RiskRating, TaskCategory, Wallet,
    };
    use uuid::Uuid;

    fn processor(store: &Arc<MemoryStore>) -> CompletionProcessor {
        CompletionProcessor::new(
            store.clone(),
            store.clone(),
            store.clone(),
            FundsLedger::new(store.clone()),
            ReputationTracker::new(store.clone()),
            store.clone(),
        )
    }

    async fn add_agent(store: &Arc<MemoryStore>, balance: i64, overall_components: u32) -> Uuid {
        let agent = Agent::new("worker", AgentRole::Builder);
        let id = agent.id;
        store.insert_agent(agent).await.unwrap();
        store.insert_wallet(Wallet::new(id)).await.unwrap();
        // Fund through the ledger so the replay invariant covers the
        // seeded amount too.
        if balance > 0 {
            FundsLedger::new(store.clone() as Arc<dyn WalletStore>)
                .fund(id, balance)
                .await
                .unwrap();
        }
        let mut score = ReputationScore::new(id);
        score.reliability = overall_components;
        score.quality = overall_components;
        score.speed = overall_components;
        score.recompute();
        store.insert_reputation(score).await.unwrap();
        id
    }

    fn assigned_task(agent_id: Uuid, deposit: i64, accepted_at: DateTime<Utc>) -> Task {
        Task {
            id: Uuid::new_v4(),
            category: TaskCategory::DataProcessing,
            difficulty: 3,
            reward: 100,
            deposit,
            slash_percent: 20,
            risk: RiskRating::for_task(3, 20),
            min_reputation: 0,
            execution_window_secs: 60,
            expires_at: accepted_at + Duration::hours(1),
            status: TaskStatus::Assigned,
            poster_id: Uuid::new_v4(),
            assigned_agent_id: Some(agent_id),
            created_at: accepted_at,
            accepted_at: Some(accepted_at),
            resolved_at: None,
        }
    }

    #[tokio::test]
    async fn test_not_due_tasks_untouched() {
        let store = Arc::new(MemoryStore::new());
        let agent = add_agent(&store, 500, 900).await;
        let now = Utc::now();
        let task = assigned_task(agent, 100, now);
        let id = task.id;
        store.insert_task(task).await.unwrap();

        // Execution window (60s) has not elapsed.
        let stats = processor(&store).run(10, now).await;
        assert_eq!(stats.completed + stats.failed, 0);
        assert_eq!(
            store.get_task(id).await.unwrap().unwrap().status,
            TaskStatus::Assigned
        );
    }

    #[tokio::test]
    async fn test_due_task_reaches_terminal_state() {
        let store = Arc::new(MemoryStore::new());
        let agent = add_agent(&store, 500, 900).await;
        let accepted = Utc::now() - Duration::minutes(5);
        let task = assigned_task(agent, 100, accepted);
        let id = task.id;
        // Mirror the escrow the assigner would have made.
        let ledger = FundsLedger::new(store.clone() as Arc<dyn WalletStore>);
        ledger.escrow_deposit(agent, id, 100).await.unwrap();
        store.insert_task(task).await.unwrap();

        let stats = processor(&store).run(10, Utc::now()).await;
        assert_eq!(stats.completed + stats.failed, 1);
        assert!(stats.errors.is_empty());

        let task = store.get_task(id).await.unwrap().unwrap();
        assert!(task.status.is_terminal());
        assert!(task.resolved_at.is_some());

        // Escrow was settled either way.
        let wallet = store.get_wallet(agent).await.unwrap().unwrap();
        assert_eq!(wallet.escrowed, 0);

        // Replay still reproduces the wallet.
        let (balance, escrowed) = ledger.replay(agent).await.unwrap();
        assert_eq!((balance, escrowed), (wallet.balance, wallet.escrowed));
    }

    #[tokio::test]
    async fn test_resolution_is_reproducible() {
        // Two identical stores resolve the same assignment identically.
        let accepted = Utc::now() - Duration::minutes(5);
        let mut outcomes = Vec::new();
        let agent_template = Agent::new("worker", AgentRole::Builder);
        let task_template = assigned_task(agent_template.id, 100, accepted);

        for _ in 0..2 {
            let store = Arc::new(MemoryStore::new());
            store.insert_agent(agent_template.clone()).await.unwrap();
            store
                .insert_wallet(Wallet::new(agent_template.id))
                .await
                .unwrap();
            store
                .insert_reputation(ReputationScore::new(agent_template.id))
                .await
                .unwrap();
            let ledger = FundsLedger::new(store.clone() as Arc<dyn WalletStore>);
            ledger.fund(agent_template.id, 500).await.unwrap();
            ledger
                .escrow_deposit(agent_template.id, task_template.id, 100)
                .await
                .unwrap();
            store.insert_task(task_template.clone()).await.unwrap();

            processor(&store).run(10, Utc::now()).await;
            outcomes.push(store.get_task(task_template.id).await.unwrap().unwrap().status);
        }
        assert_eq!(outcomes[0], outcomes[1]);
    }

    #[tokio::test]
    async fn test_open_task_past_expiry_expires() {
        let store = Arc::new(MemoryStore::new());
        let agent = add_agent(&store, 500, 500).await;
        let mut task = assigned_task(agent, 100, Utc::now());
        task.status = TaskStatus::Open;
        task.assigned_agent_id = None;
        task.accepted_at = None;
        task.expires_at = Utc::now() - Duration::minutes(1);
        let id = task.id;
        store.insert_task(task).await.unwrap();

        let stats = processor(&store).run(10, Utc::now()).await;
        assert_eq!(stats.expired, 1);
        assert_eq!(
            store.get_task(id).await.unwrap().unwrap().status,
            TaskStatus::Expired
        );
    }

    #[tokio::test]
    async fn test_missing_reputation_recorded_not_fatal() {
        let store = Arc::new(MemoryStore::new());
        let agent = Agent::new("broken", AgentRole::Analyst);
        let agent_id = agent.id;
        store.insert_agent(agent).await.unwrap();
        store.insert_wallet(Wallet::new(agent_id)).await.unwrap();
        // No reputation row.
        let accepted = Utc::now() - Duration::minutes(5);
        let bad = assigned_task(agent_id, 100, accepted);
        store.insert_task(bad.clone()).await.unwrap();

        // A healthy task in the same batch still settles.
        let healthy_agent = add_agent(&store, 500, 900).await;
        let healthy = assigned_task(healthy_agent, 100, accepted);
        let ledger = FundsLedger::new(store.clone() as Arc<dyn WalletStore>);
        ledger
            .escrow_deposit(healthy_agent, healthy.id, 100)
            .await
            .unwrap();
        store.insert_task(healthy.clone()).await.unwrap();

        let stats = processor(&store).run(10, Utc::now()).await;
        assert_eq!(stats.errors.len(), 1);
        assert_eq!(stats.completed + stats.failed, 1);
        assert_eq!(
            store.get_task(bad.id).await.unwrap().unwrap().status,
            TaskStatus::Assigned
        );
    }

    #[tokio::test]
    async fn test_full_slash_archives_agent_once() {
        let store = Arc::new(MemoryStore::new());
        // Reputation at rock bottom: p = 0.1, nearly certain failure.
        // Find a seed-bearing assignment that fails by trying timestamps.
        let agent = add_agent(&store, 100, 0).await;
        let ledger = FundsLedger::new(store.clone() as Arc<dyn WalletStore>);

        let mut accepted = Utc::now() - Duration::minutes(10);
        let mut failed = false;
        for _ in 0..64 {
            let mut task = assigned_task(agent, 100, accepted);
            task.slash_percent = 100;
            let seed = stable_seed(task.id, agent, accepted);
            if resolve_outcome(0, task.difficulty, seed).success {
                accepted += Duration::seconds(1);
                continue;
            }
            ledger.escrow_deposit(agent, task.id, 100).await.unwrap();
            store.insert_task(task).await.unwrap();
            failed = true;
            break;
        }
        assert!(failed, "expected to find a failing seed");

        let stats = processor(&store).run(10, Utc::now()).await;
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.archived, 1);
        assert_eq!(
            store.get_agent(agent).await.unwrap().unwrap().status,
            AgentStatus::Archived
        );

        // The archival is one-way; a second pass changes nothing.
        let stats = processor(&store).run(10, Utc::now()).await;
        assert_eq!(stats.archived, 0);
    }
}
